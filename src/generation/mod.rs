//! Generation Module
//!
//! Backends that turn a [`Specification`](crate::workflow::Specification)
//! into artifacts, and the engine that drives them.
//!
//! # Components
//!
//! - [`engine`]: `Backend` trait, `Generator` and `generate`
//! - [`docs`]: Markdown documentation with PlantUML diagrams
//! - [`suite`]: Abstract test-suite trees

pub mod docs;
pub mod engine;
pub mod suite;

pub use docs::{DiagramSkin, Document, DocumentSet, DocumentationGenerator};
pub use engine::{generate, generate_workflow, Backend, GenerationFailure, GenerationReport, Generator};
pub use suite::{KeywordCall, SuiteBuilder, SuiteGenerator, TestCase, TestSuite};
