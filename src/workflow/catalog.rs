//! Operation Catalog
//!
//! Maps operation ids referenced by steps to already-resolved HTTP
//! metadata. Extracting that metadata from API descriptions is left to
//! whoever fills the catalog.

use std::collections::HashMap;

use serde::{Deserialize, Deserializer, Serialize};

/// HTTP metadata for one operation.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Operation {
    /// Upper-case HTTP method, e.g. `GET`
    #[serde(deserialize_with = "uppercase")]
    pub method: String,
    pub path: String,
    /// Names of the parameters the operation accepts
    #[serde(default)]
    pub parameters: Vec<String>,
}

impl Operation {
    pub fn new(method: impl AsRef<str>, path: impl Into<String>) -> Self {
        Self {
            method: method.as_ref().to_ascii_uppercase(),
            path: path.into(),
            parameters: Vec::new(),
        }
    }

    pub fn with_parameter(mut self, name: impl Into<String>) -> Self {
        self.parameters.push(name.into());
        self
    }
}

fn uppercase<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    String::deserialize(deserializer).map(|method| method.to_ascii_uppercase())
}

/// Resolves operation ids to [`Operation`]s.
pub trait OperationCatalog: Send + Sync {
    fn resolve(&self, operation_id: &str) -> Option<Operation>;
}

/// Catalog backed by a map.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InMemoryCatalog {
    operations: HashMap<String, Operation>,
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_operation(mut self, operation_id: impl Into<String>, operation: Operation) -> Self {
        self.insert(operation_id, operation);
        self
    }

    pub fn insert(&mut self, operation_id: impl Into<String>, operation: Operation) {
        self.operations.insert(operation_id.into(), operation);
    }

    pub fn len(&self) -> usize {
        self.operations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }
}

impl OperationCatalog for InMemoryCatalog {
    fn resolve(&self, operation_id: &str) -> Option<Operation> {
        self.operations.get(operation_id).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_known_and_unknown() {
        let catalog = InMemoryCatalog::new()
            .with_operation("getPet", Operation::new("get", "/pets/{id}").with_parameter("id"));

        let operation = catalog.resolve("getPet").unwrap();
        assert_eq!(operation.method, "GET");
        assert_eq!(operation.path, "/pets/{id}");
        assert_eq!(operation.parameters, vec!["id"]);
        assert!(catalog.resolve("deletePet").is_none());
        assert_eq!(catalog.len(), 1);
    }

    #[test]
    fn test_catalog_from_json() {
        let catalog: InMemoryCatalog = serde_json::from_str(
            r#"{"createOrder": {"method": "post", "path": "/orders"}}"#,
        )
        .unwrap();

        let operation = catalog.resolve("createOrder").unwrap();
        assert_eq!(operation.method, "POST");
        assert!(operation.parameters.is_empty());
    }
}
