//! Specification Loader
//!
//! Obtains a raw specification document from a local file or a URL and
//! performs the structural checks that come before model building.
//!
//! Supported formats are JSON (`.json`) and YAML (`.yaml`, `.yml`). For
//! remote documents the `Content-Type` header is consulted first and the
//! URL extension second.

use std::fs;
use std::path::Path;
use std::time::Duration;

use log::{debug, info};
use reqwest::Url;
use serde_json::Value;

use crate::error::{LoadError, SpecificationError};

/// Source of raw specification documents.
pub trait Loader {
    fn load(&self, locator: &str) -> Result<Value, LoadError>;
}

/// Structural check of a raw document. Never mutates the document.
pub trait SchemaValidator {
    fn validate(&self, document: &Value) -> Result<(), SpecificationError>;
}

/// Serialization format of a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Json,
    Yaml,
}

impl Format {
    /// Guesses the format from a path or URL extension.
    pub fn from_extension(locator: &str) -> Option<Self> {
        let lower = locator.to_ascii_lowercase();
        if lower.ends_with(".json") {
            Some(Self::Json)
        } else if lower.ends_with(".yaml") || lower.ends_with(".yml") {
            Some(Self::Yaml)
        } else {
            None
        }
    }

    /// Guesses the format from a `Content-Type` header value.
    pub fn from_content_type(content_type: &str) -> Option<Self> {
        let lower = content_type.to_ascii_lowercase();
        if lower.contains("application/json") {
            Some(Self::Json)
        } else if lower.contains("application/yaml")
            || lower.contains("application/x-yaml")
            || lower.contains("text/yaml")
        {
            Some(Self::Yaml)
        } else {
            None
        }
    }

    /// Decodes `text` into a raw document.
    pub fn decode(&self, locator: &str, text: &str) -> Result<Value, LoadError> {
        let decoded = match self {
            Self::Json => serde_json::from_str(text).map_err(|e| e.to_string()),
            Self::Yaml => serde_yaml::from_str(text).map_err(|e| e.to_string()),
        };

        decoded.map_err(|message| LoadError::Decode {
            locator: locator.to_string(),
            message,
        })
    }
}

/// A locator is a URL when it has both a scheme and a host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Locator {
    Url(String),
    File(String),
}

impl Locator {
    pub fn parse(locator: &str) -> Self {
        match Url::parse(locator) {
            Ok(url) if url.has_host() && !url.scheme().is_empty() => Self::Url(locator.to_string()),
            _ => Self::File(locator.to_string()),
        }
    }
}

/// Reads documents from the local filesystem.
#[derive(Debug, Clone, Default)]
pub struct FileLoader;

impl Loader for FileLoader {
    fn load(&self, locator: &str) -> Result<Value, LoadError> {
        info!("Loading specification from: {}", locator);

        let format = Format::from_extension(locator).ok_or_else(|| LoadError::UnsupportedFormat {
            locator: locator.to_string(),
            content_type: None,
        })?;

        let text = fs::read_to_string(Path::new(locator)).map_err(|source| LoadError::Io {
            locator: locator.to_string(),
            source,
        })?;

        debug!("Specification content loaded ({} bytes)", text.len());
        format.decode(locator, &text)
    }
}

/// Fetches documents over HTTP(S).
#[derive(Debug, Clone)]
pub struct HttpLoader {
    timeout: Duration,
}

impl HttpLoader {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl Default for HttpLoader {
    fn default() -> Self {
        Self::new(Duration::from_secs(30))
    }
}

impl Loader for HttpLoader {
    fn load(&self, locator: &str) -> Result<Value, LoadError> {
        info!("Fetching specification from: {}", locator);

        let http_error = |e: reqwest::Error| LoadError::Http {
            locator: locator.to_string(),
            message: e.to_string(),
        };

        let client = reqwest::blocking::Client::builder()
            .timeout(self.timeout)
            .build()
            .map_err(http_error)?;

        let response = client
            .get(locator)
            .send()
            .and_then(|r| r.error_for_status())
            .map_err(http_error)?;

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        let format = content_type
            .as_deref()
            .and_then(Format::from_content_type)
            .or_else(|| Format::from_extension(locator))
            .ok_or_else(|| LoadError::UnsupportedFormat {
                locator: locator.to_string(),
                content_type: content_type.clone(),
            })?;

        let text = response.text().map_err(http_error)?;
        debug!(
            "Fetched {} bytes ({})",
            text.len(),
            content_type.as_deref().unwrap_or("no content type")
        );

        format.decode(locator, &text)
    }
}

/// Dispatches to [`HttpLoader`] or [`FileLoader`] based on the locator.
#[derive(Debug, Clone, Default)]
pub struct DefaultLoader {
    file: FileLoader,
    http: HttpLoader,
}

impl Loader for DefaultLoader {
    fn load(&self, locator: &str) -> Result<Value, LoadError> {
        match Locator::parse(locator) {
            Locator::Url(url) => self.http.load(&url),
            Locator::File(path) => self.file.load(&path),
        }
    }
}

/// Required fields checked by [`StructuralValidator`].
#[derive(Debug, Clone)]
pub struct DocumentSchema {
    pub root: Vec<String>,
    pub info: Vec<String>,
    pub source_description: Vec<String>,
    pub workflow: Vec<String>,
    pub step: Vec<String>,
}

impl Default for DocumentSchema {
    fn default() -> Self {
        let fields = |names: &[&str]| names.iter().map(|s| s.to_string()).collect();
        Self {
            root: fields(&["arazzo", "info", "workflows"]),
            info: fields(&["title", "version"]),
            source_description: fields(&["name", "url"]),
            workflow: fields(&["workflowId", "steps"]),
            step: fields(&["stepId"]),
        }
    }
}

/// Checks required fields and container types against a [`DocumentSchema`].
#[derive(Debug, Clone, Default)]
pub struct StructuralValidator {
    schema: DocumentSchema,
}

impl StructuralValidator {
    pub fn new(schema: DocumentSchema) -> Self {
        Self { schema }
    }

    fn require(object: &Value, fields: &[String], location: &str, errors: &mut Vec<String>) {
        for field in fields {
            if object.get(field).map_or(true, Value::is_null) {
                errors.push(format!("{} is missing required field '{}'", location, field));
            }
        }
    }

    fn array<'a>(value: &'a Value, field: &str, location: &str, errors: &mut Vec<String>) -> &'a [Value] {
        match value.get(field) {
            Some(Value::Array(items)) => items,
            Some(_) => {
                errors.push(format!("{}: '{}' must be a list", location, field));
                &[]
            }
            None => &[],
        }
    }
}

impl SchemaValidator for StructuralValidator {
    fn validate(&self, document: &Value) -> Result<(), SpecificationError> {
        if !document.is_object() {
            return Err(SpecificationError::new("document root must be a mapping"));
        }

        let mut errors = Vec::new();
        Self::require(document, &self.schema.root, "Document", &mut errors);

        if let Some(info) = document.get("info") {
            if info.is_object() {
                Self::require(info, &self.schema.info, "Info", &mut errors);
            } else {
                errors.push("'info' must be a mapping".to_string());
            }
        }

        for (index, source) in Self::array(document, "sourceDescriptions", "Document", &mut errors)
            .iter()
            .enumerate()
        {
            let location = format!("Source description #{}", index + 1);
            Self::require(source, &self.schema.source_description, &location, &mut errors);
        }

        for (index, workflow) in Self::array(document, "workflows", "Document", &mut errors)
            .iter()
            .enumerate()
        {
            let location = match workflow.get("workflowId").and_then(Value::as_str) {
                Some(id) => format!("Workflow '{}'", id),
                None => format!("Workflow #{}", index + 1),
            };
            Self::require(workflow, &self.schema.workflow, &location, &mut errors);

            for (step_index, step) in Self::array(workflow, "steps", &location, &mut errors)
                .iter()
                .enumerate()
            {
                let step_location = format!("Step #{} in {}", step_index + 1, location);
                Self::require(step, &self.schema.step, &step_location, &mut errors);
            }
        }

        if errors.is_empty() {
            debug!("Document passed structural validation");
            Ok(())
        } else {
            Err(SpecificationError::new(errors.join("; ")))
        }
    }
}
