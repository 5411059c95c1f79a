//! ArazzoGen - Workflow Specification Generator
//!
//! Reads Arazzo workflow specifications (JSON or YAML, from disk or over
//! HTTP), checks them, orders their workflows by dependency and turns every
//! workflow into human-readable documentation or an executable test suite.
//!
//! # Architecture
//!
//! The library is organized into five main modules:
//!
//! - [`workflow`]: Specification model, loading, building and dependency order
//! - [`visitor`]: Double-dispatch traversal over the model
//! - [`generation`]: Backends (documentation, test suites) and the engine
//! - [`render`]: Writers for Markdown, Robot Framework and JSON output
//! - [`monitoring`]: Generation timeline
//!
//! # Example
//!
//! ```rust,no_run
//! use arazzo_gen::generation::{DocumentationGenerator, Generator};
//! use arazzo_gen::render::MarkdownWriter;
//! use arazzo_gen::load_and_build;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Load, validate and build the specification
//!     let spec = load_and_build("shop.arazzo.yaml")?;
//!
//!     // Generate one document per workflow
//!     let backend = DocumentationGenerator::new();
//!     let mut generator = Generator::new(&backend);
//!     generator.set_max_parallel(4);
//!     let report = generator.run(&spec);
//!
//!     let writer = MarkdownWriter::new("docs");
//!     writer.write_all(report.artifacts().map(|(_, document)| document))?;
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod generation;
pub mod monitoring;
pub mod render;
pub mod visitor;
pub mod workflow;

use log::{debug, info};

// Re-export commonly used types
pub use error::{ArazzoError, GenerationError, LoadError, ValidationError};
pub use workflow::model::{Specification, Step, Workflow};
pub use workflow::{build, build_with_locator};

use workflow::{DefaultLoader, InMemoryCatalog, Loader, SchemaValidator, StructuralValidator};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
pub const APP_NAME: &str = "ArazzoGen";

/// Loads the document at `locator` (file path or http(s) URL), checks its
/// structure and builds the validated model.
pub fn load_and_build(locator: &str) -> Result<Specification, ArazzoError> {
    load_and_build_with(&DefaultLoader::default(), &StructuralValidator::default(), locator)
}

/// Same as [`load_and_build`] with explicit collaborators.
pub fn load_and_build_with(
    loader: &dyn Loader,
    validator: &dyn SchemaValidator,
    locator: &str,
) -> Result<Specification, ArazzoError> {
    info!("Loading specification: {}", locator);
    let raw = loader.load(locator)?;

    validator.validate(&raw).map_err(|e| e.at(locator))?;
    debug!("Structural validation passed");

    let spec = build_with_locator(&raw, locator)?;
    info!(
        "Specification loaded: {} workflows, {} steps",
        spec.workflows().len(),
        spec.step_count()
    );
    Ok(spec)
}

/// Loads an operation catalog: a JSON or YAML mapping from operation id to
/// `{method, path, parameters}`.
pub fn load_catalog(locator: &str) -> Result<InMemoryCatalog, ArazzoError> {
    let raw = DefaultLoader::default().load(locator)?;
    let catalog: InMemoryCatalog = serde_json::from_value(raw).map_err(|e| LoadError::Decode {
        locator: locator.to_string(),
        message: e.to_string(),
    })?;
    info!("Operation catalog loaded: {} operations", catalog.len());
    Ok(catalog)
}
