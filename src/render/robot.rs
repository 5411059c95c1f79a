//! Robot Framework Renderer
//!
//! Plain-text `.robot` suites: a settings table and a test-case table,
//! cells separated by four spaces.

use super::SuiteRenderer;
use crate::error::GenerationError;
use crate::generation::suite::TestSuite;

const SEPARATOR: &str = "    ";

#[derive(Debug, Clone)]
pub struct RobotRenderer {
    libraries: Vec<String>,
}

impl RobotRenderer {
    pub fn new() -> Self {
        Self {
            libraries: vec!["RequestsLibrary".to_string()],
        }
    }

    /// Adds a library to the settings table.
    pub fn with_library(mut self, library: impl Into<String>) -> Self {
        self.libraries.push(library.into());
        self
    }
}

impl Default for RobotRenderer {
    fn default() -> Self {
        Self::new()
    }
}

/// Escapes a cell so Robot's separator and escape rules keep it intact.
pub fn escape_cell(cell: &str) -> String {
    if cell.is_empty() {
        return "${EMPTY}".to_string();
    }

    let mut escaped = String::with_capacity(cell.len());
    let mut previous_space = true;
    for c in cell.chars() {
        match c {
            '\\' => escaped.push_str("\\\\"),
            '\n' => escaped.push_str("\\n"),
            '\r' => {}
            '\t' => escaped.push_str("\\t"),
            // A leading space or a second consecutive one would end the cell
            ' ' if previous_space => escaped.push_str("${SPACE}"),
            _ => escaped.push(c),
        }
        previous_space = c == ' ';
    }
    if escaped.ends_with(' ') {
        escaped.pop();
        escaped.push_str("${SPACE}");
    }
    escaped
}

impl SuiteRenderer for RobotRenderer {
    fn extension(&self) -> &'static str {
        "robot"
    }

    fn render(&self, suite: &TestSuite) -> Result<String, GenerationError> {
        let mut out = String::from("*** Settings ***\n");
        if !suite.doc.is_empty() {
            out.push_str(&format!("Documentation{}{}\n", SEPARATOR, escape_cell(&suite.doc)));
        }
        for library in &self.libraries {
            out.push_str(&format!("Library{}{}\n", SEPARATOR, library));
        }

        out.push_str("\n*** Test Cases ***\n");
        for (index, test) in suite.tests.iter().enumerate() {
            if index > 0 {
                out.push('\n');
            }
            out.push_str(&escape_cell(&test.name));
            out.push('\n');
            if !test.doc.is_empty() {
                out.push_str(&format!("{0}[Documentation]{0}{1}\n", SEPARATOR, escape_cell(&test.doc)));
            }
            for keyword in &test.body {
                out.push_str(SEPARATOR);
                out.push_str(&keyword.name);
                for arg in &keyword.args {
                    out.push_str(SEPARATOR);
                    out.push_str(&escape_cell(arg));
                }
                out.push('\n');
            }
        }

        Ok(out)
    }
}
