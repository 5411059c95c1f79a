//! Error Types
//!
//! One error type per failure stage. Loading, schema checks and model
//! building abort before a [`Specification`](crate::workflow::Specification)
//! exists; generation errors are scoped to a single workflow.

use std::path::PathBuf;

use thiserror::Error;

/// The specification document could not be obtained.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("Failed to read specification '{locator}': {source}")]
    Io {
        locator: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to fetch specification '{locator}': {message}")]
    Http { locator: String, message: String },

    #[error("Unsupported specification format for '{locator}'{}", .content_type.as_deref().map(|c| format!(" (content type: {c})")).unwrap_or_default())]
    UnsupportedFormat {
        locator: String,
        content_type: Option<String>,
    },

    #[error("Failed to decode specification '{locator}': {message}")]
    Decode { locator: String, message: String },
}

/// The raw document does not have the shape of a workflow specification.
#[derive(Debug, Error)]
#[error("Invalid specification{}: {message}", .locator.as_deref().map(|l| format!(" '{l}'")).unwrap_or_default())]
pub struct SpecificationError {
    pub locator: Option<String>,
    pub message: String,
}

impl SpecificationError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            locator: None,
            message: message.into(),
        }
    }

    /// Attaches the document locator if none is set yet.
    pub fn at(mut self, locator: impl Into<String>) -> Self {
        if self.locator.is_none() {
            self.locator = Some(locator.into());
        }
        self
    }
}

/// The dependency relation over workflows contains a cycle.
///
/// `cycle` lists the members in traversal order, with the first id
/// repeated at the end.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Cyclic dependency between workflows: {}", .cycle.join(" -> "))]
pub struct CyclicDependencyError {
    pub cycle: Vec<String>,
}

impl CyclicDependencyError {
    /// Returns true if `workflow_id` is part of the cycle.
    pub fn involves(&self, workflow_id: &str) -> bool {
        self.cycle.iter().any(|id| id == workflow_id)
    }
}

/// A model-level invariant does not hold.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error(transparent)]
    Specification(#[from] SpecificationError),

    #[error("Duplicate workflow ID: '{0}'")]
    DuplicateWorkflowId(String),

    #[error("Workflow '{0}' has no steps")]
    EmptyWorkflow(String),

    #[error("Duplicate step ID '{step_id}' in workflow '{workflow_id}'")]
    DuplicateStepId {
        workflow_id: String,
        step_id: String,
    },

    #[error("Workflow '{workflow_id}' depends on unknown workflow '{reference}'")]
    UnknownDependency {
        workflow_id: String,
        reference: String,
    },

    #[error("{location} references unknown workflow '{reference}'")]
    UnknownWorkflowReference { location: String, reference: String },

    #[error("{location} references unknown step '{reference}'")]
    UnknownStepReference { location: String, reference: String },

    #[error("{location}: malformed component reference '{reference}'")]
    MalformedReference { location: String, reference: String },

    #[error("{location} references missing component '{reference}'")]
    UnknownComponent { location: String, reference: String },

    #[error("{location}: '{reference}' cannot be used here (expected {expected})")]
    MisplacedReference {
        location: String,
        reference: String,
        expected: String,
    },

    #[error(transparent)]
    CyclicDependency(#[from] CyclicDependencyError),

    #[error("{} validation errors:\n{}", .0.len(), .0.iter().map(|e| format!("  - {e}")).collect::<Vec<_>>().join("\n"))]
    Multiple(Vec<ValidationError>),
}

impl ValidationError {
    /// Folds a list of collected violations into a single error.
    ///
    /// Returns `None` for an empty list.
    pub fn collect(mut errors: Vec<ValidationError>) -> Option<Self> {
        match errors.len() {
            0 => None,
            1 => errors.pop(),
            _ => Some(Self::Multiple(errors)),
        }
    }

    /// Iterates over the individual violations, flattening `Multiple`.
    pub fn violations(&self) -> Vec<&ValidationError> {
        match self {
            Self::Multiple(errors) => errors.iter().flat_map(|e| e.violations()).collect(),
            other => vec![other],
        }
    }
}

/// A backend failed to emit an artifact.
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error(
        "Workflow '{workflow_id}': participants '{first}' and '{second}' both map to diagram identifier '{identifier}'"
    )]
    ParticipantCollision {
        workflow_id: String,
        identifier: String,
        first: String,
        second: String,
    },

    #[error("No open {0} to write into")]
    NoOpenTarget(&'static str),

    #[error("A {0} is already open")]
    AlreadyOpen(&'static str),

    #[error("Backend produced no artifact for workflow '{0}'")]
    MissingArtifact(String),

    #[error("Workflows '{first}' and '{second}' both produce artifact '{name}'")]
    ArtifactNameCollision {
        name: String,
        first: String,
        second: String,
    },

    #[error("Artifact name '{0}' is not a plain file name")]
    UnsafeArtifactName(String),

    #[error("Failed to render '{name}': {message}")]
    Render { name: String, message: String },

    #[error("Failed to write '{}': {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Generation worker failed: {0}")]
    Worker(String),
}

/// Any failure on the `load_and_build` surface.
#[derive(Debug, Error)]
pub enum ArazzoError {
    #[error(transparent)]
    Load(#[from] LoadError),

    #[error(transparent)]
    Specification(#[from] SpecificationError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Generation(#[from] GenerationError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cycle_display_lists_members() {
        let err = CyclicDependencyError {
            cycle: vec!["a".to_string(), "b".to_string(), "a".to_string()],
        };
        assert_eq!(err.to_string(), "Cyclic dependency between workflows: a -> b -> a");
        assert!(err.involves("a"));
        assert!(err.involves("b"));
        assert!(!err.involves("c"));
    }

    #[test]
    fn test_collect_single_and_multiple() {
        assert!(ValidationError::collect(Vec::new()).is_none());

        let single = ValidationError::collect(vec![ValidationError::DuplicateWorkflowId(
            "checkout".to_string(),
        )])
        .unwrap();
        assert!(matches!(single, ValidationError::DuplicateWorkflowId(_)));

        let multiple = ValidationError::collect(vec![
            ValidationError::DuplicateWorkflowId("a".to_string()),
            ValidationError::EmptyWorkflow("b".to_string()),
        ])
        .unwrap();
        assert_eq!(multiple.violations().len(), 2);
        assert!(multiple.to_string().starts_with("2 validation errors"));
    }

    #[test]
    fn test_specification_error_locator() {
        let err = SpecificationError::new("missing 'workflows'").at("spec.yaml");
        assert_eq!(err.to_string(), "Invalid specification 'spec.yaml': missing 'workflows'");

        let err = err.at("other.yaml");
        assert_eq!(err.locator.as_deref(), Some("spec.yaml"));
    }

    #[test]
    fn test_unsupported_format_display() {
        let err = LoadError::UnsupportedFormat {
            locator: "spec.txt".to_string(),
            content_type: None,
        };
        assert_eq!(err.to_string(), "Unsupported specification format for 'spec.txt'");

        let err = LoadError::UnsupportedFormat {
            locator: "https://example.com/spec".to_string(),
            content_type: Some("text/html".to_string()),
        };
        assert!(err.to_string().contains("text/html"));
    }

    #[test]
    fn test_arazzo_error_wraps_stages() {
        let err: ArazzoError = ValidationError::EmptyWorkflow("wf".to_string()).into();
        assert!(matches!(err, ArazzoError::Validation(_)));
        assert_eq!(err.to_string(), "Workflow 'wf' has no steps");
    }
}
