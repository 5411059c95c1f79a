//! Rendering Module
//!
//! Turns generated artifacts into files. Nothing here touches the model
//! or the visitor protocol; renderers only see finished artifacts.
//!
//! # Components
//!
//! - [`MarkdownWriter`]: Writes documentation into an output directory
//! - [`RobotRenderer`]: Robot Framework plain-text suites
//! - [`JsonRenderer`]: JSON export of the suite tree

pub mod json;
pub mod robot;

use std::collections::HashMap;
use std::fs;
use std::path::{Component, Path, PathBuf};

use log::info;

use crate::error::GenerationError;
use crate::generation::docs::{artifact_stem, Document};
use crate::generation::suite::TestSuite;

pub use json::JsonRenderer;
pub use robot::RobotRenderer;

/// Persists documentation artifacts.
pub trait ArtifactWriter {
    fn write(&self, document: &Document) -> Result<PathBuf, GenerationError>;
}

/// Serializes an abstract test suite.
pub trait SuiteRenderer {
    /// File extension without the dot.
    fn extension(&self) -> &'static str;

    fn render(&self, suite: &TestSuite) -> Result<String, GenerationError>;

    /// File name for `suite`, derived from its name.
    fn file_name(&self, suite: &TestSuite) -> String {
        format!("{}.{}", artifact_stem(&suite.name), self.extension())
    }
}

/// Writes Markdown documents into a directory, creating it on first use.
#[derive(Debug, Clone)]
pub struct MarkdownWriter {
    output_dir: PathBuf,
}

impl MarkdownWriter {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Writes every document, refusing the batch up front if two of them
    /// share a file name.
    pub fn write_all<'a, I>(&self, documents: I) -> Result<Vec<PathBuf>, GenerationError>
    where
        I: IntoIterator<Item = &'a Document>,
    {
        let documents: Vec<&Document> = documents.into_iter().collect();
        check_unique(documents.iter().map(|d| (d.name.as_str(), d.workflow_id.as_str())))?;
        documents.into_iter().map(|d| self.write(d)).collect()
    }
}

impl ArtifactWriter for MarkdownWriter {
    fn write(&self, document: &Document) -> Result<PathBuf, GenerationError> {
        let path = artifact_path(&self.output_dir, &document.name)?;
        write_file(&path, &document.content)?;
        info!("Generated: {}", path.display());
        Ok(path)
    }
}

/// Renders every suite with `renderer` and writes it into `output_dir`.
///
/// Two suites mapping to the same file name fail the batch before anything
/// is written. Otherwise stops at the first suite that fails to render or
/// write; files written before that stay in place.
pub fn write_suites<'a, R, I>(
    renderer: &R,
    suites: I,
    output_dir: &Path,
) -> Result<Vec<PathBuf>, GenerationError>
where
    R: SuiteRenderer + ?Sized,
    I: IntoIterator<Item = &'a TestSuite>,
{
    let suites: Vec<(&TestSuite, String)> = suites
        .into_iter()
        .map(|suite| (suite, renderer.file_name(suite)))
        .collect();
    check_unique(suites.iter().map(|(suite, name)| (name.as_str(), suite.name.as_str())))?;

    let mut written = Vec::new();
    for (suite, name) in suites {
        let content = renderer.render(suite)?;
        let path = artifact_path(output_dir, &name)?;
        write_file(&path, &content)?;
        info!("Generated: {}", path.display());
        written.push(path);
    }
    Ok(written)
}

/// Joins `name` onto `output_dir`, accepting only a single plain file name.
fn artifact_path(output_dir: &Path, name: &str) -> Result<PathBuf, GenerationError> {
    let mut components = Path::new(name).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(_)), None) => Ok(output_dir.join(name)),
        _ => Err(GenerationError::UnsafeArtifactName(name.to_string())),
    }
}

/// Fails on the first file name claimed twice. Items are `(file name, owner)`.
fn check_unique<'a>(names: impl Iterator<Item = (&'a str, &'a str)>) -> Result<(), GenerationError> {
    let mut owners: HashMap<&str, &str> = HashMap::new();
    for (name, owner) in names {
        if let Some(first) = owners.insert(name, owner) {
            return Err(GenerationError::ArtifactNameCollision {
                name: name.to_string(),
                first: first.to_string(),
                second: owner.to_string(),
            });
        }
    }
    Ok(())
}

fn write_file(path: &Path, content: &str) -> Result<(), GenerationError> {
    let io_error = |source| GenerationError::Io {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(io_error)?;
    }
    fs::write(path, content).map_err(io_error)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generation::suite::{KeywordCall, TestCase};
    use tempfile::tempdir;

    fn suite(name: &str) -> TestSuite {
        TestSuite {
            name: name.to_string(),
            doc: "Demo".to_string(),
            tests: vec![TestCase {
                name: "ping".to_string(),
                doc: String::new(),
                body: vec![KeywordCall::new("Log", vec!["ping the service".to_string()])],
            }],
        }
    }

    #[test]
    fn test_markdown_writer_creates_directory() {
        let dir = tempdir().unwrap();
        let writer = MarkdownWriter::new(dir.path().join("docs"));

        let document = Document {
            name: "order_flow.md".to_string(),
            workflow_id: "Order Flow".to_string(),
            content: "# Order Flow\n".to_string(),
        };

        let path = writer.write(&document).unwrap();
        assert_eq!(path, dir.path().join("docs").join("order_flow.md"));
        assert_eq!(fs::read_to_string(path).unwrap(), "# Order Flow\n");
    }

    #[test]
    fn test_write_suites_names_files_after_suites() {
        let dir = tempdir().unwrap();
        let suites = vec![suite("Order Flow"), suite("login")];

        let written = write_suites(&RobotRenderer::new(), &suites, dir.path()).unwrap();
        assert_eq!(
            written,
            vec![dir.path().join("order_flow.robot"), dir.path().join("login.robot")]
        );

        let written = write_suites(&JsonRenderer::new(), &suites, dir.path()).unwrap();
        assert!(written[1].ends_with("login.json"));
        assert!(written.iter().all(|p| p.exists()));
    }

    #[test]
    fn test_write_failure_names_path() {
        let dir = tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        fs::write(&blocker, "not a directory").unwrap();

        let writer = MarkdownWriter::new(blocker.join("docs"));
        let document = Document {
            name: "a.md".to_string(),
            workflow_id: "a".to_string(),
            content: String::new(),
        };

        match writer.write(&document).unwrap_err() {
            GenerationError::Io { path, .. } => assert!(path.ends_with("a.md")),
            other => panic!("Expected IO error, got {:?}", other),
        }
    }

    #[test]
    fn test_unsafe_names_are_rejected() {
        let dir = tempdir().unwrap();
        let out = dir.path().join("out");
        let writer = MarkdownWriter::new(&out);

        for name in ["../escaped.md", "a/b.md", "..", ""] {
            let document = Document {
                name: name.to_string(),
                workflow_id: "wf".to_string(),
                content: String::new(),
            };
            assert!(matches!(
                writer.write(&document),
                Err(GenerationError::UnsafeArtifactName(_))
            ));
        }
        assert!(!dir.path().join("escaped.md").exists());
    }

    #[test]
    fn test_suite_names_stay_inside_output_dir() {
        let dir = tempdir().unwrap();
        let out = dir.path().join("out");

        let written = write_suites(&RobotRenderer::new(), &[suite("../escaped")], &out).unwrap();
        assert_eq!(written, vec![out.join("___escaped.robot")]);
        assert!(!dir.path().join("escaped.robot").exists());
    }

    #[test]
    fn test_duplicate_file_names_fail_before_writing() {
        let dir = tempdir().unwrap();
        let suites = vec![suite("Order Flow"), suite("order-flow")];

        match write_suites(&RobotRenderer::new(), &suites, dir.path()).unwrap_err() {
            GenerationError::ArtifactNameCollision { name, first, second } => {
                assert_eq!(name, "order_flow.robot");
                assert_eq!(first, "Order Flow");
                assert_eq!(second, "order-flow");
            }
            other => panic!("Expected name collision, got {:?}", other),
        }
        assert!(!dir.path().join("order_flow.robot").exists());

        let document = |workflow_id: &str| Document {
            name: "order_flow.md".to_string(),
            workflow_id: workflow_id.to_string(),
            content: String::new(),
        };
        let writer = MarkdownWriter::new(dir.path());
        let documents = vec![document("Order Flow"), document("order-flow")];
        assert!(matches!(
            writer.write_all(&documents),
            Err(GenerationError::ArtifactNameCollision { .. })
        ));
        assert!(writer.write_all(&documents[..1]).unwrap()[0].exists());
    }
}
