//! JSON export of test suites.

use super::SuiteRenderer;
use crate::error::GenerationError;
use crate::generation::suite::TestSuite;

#[derive(Debug, Clone, Copy, Default)]
pub struct JsonRenderer;

impl JsonRenderer {
    pub fn new() -> Self {
        Self
    }
}

impl SuiteRenderer for JsonRenderer {
    fn extension(&self) -> &'static str {
        "json"
    }

    fn render(&self, suite: &TestSuite) -> Result<String, GenerationError> {
        let mut text = serde_json::to_string_pretty(suite).map_err(|e| GenerationError::Render {
            name: suite.name.clone(),
            message: e.to_string(),
        })?;
        text.push('\n');
        Ok(text)
    }
}
