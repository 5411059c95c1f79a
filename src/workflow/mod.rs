//! Workflow Specification Module
//!
//! Provides the specification object model and everything needed to
//! obtain one from a document.
//!
//! # Structure
//!
//! - [`model`]: Core data structures (Specification, Workflow, Step, ...)
//! - [`loader`]: Reading JSON/YAML documents and structural checks
//! - [`builder`]: Raw document to validated model
//! - [`resolver`]: Dependency ordering and cycle detection
//! - [`catalog`]: Operation metadata lookup

pub mod builder;
pub mod catalog;
pub mod loader;
pub mod model;
pub mod resolver;

pub use builder::{build, build_with_locator};
pub use catalog::{InMemoryCatalog, Operation, OperationCatalog};
pub use loader::{
    DefaultLoader, DocumentSchema, FileLoader, Format, HttpLoader, Loader, Locator,
    SchemaValidator, StructuralValidator,
};
pub use model::{
    ActionKind, ComponentSection, Components, Criterion, CriterionKind, FailureAction,
    FailureKind, Info, MetaData, ParameterLocation, ParameterObject, PayloadReplacement,
    RequestBody, ReusableObject, SourceDescription, SourceKind, Specification, Step,
    SuccessAction, Workflow,
};
