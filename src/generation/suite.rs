//! Test-Suite Generator
//!
//! Builds one abstract test suite per workflow and one test case per
//! step. The tree is independent of any test-automation library; the
//! renderers in [`crate::render`] turn it into files.

use std::collections::HashMap;
use std::sync::Arc;

use log::{debug, info, warn};
use once_cell::sync::Lazy;
use serde::Serialize;

use super::docs::{artifact_stem, retry_text};
use super::engine::Backend;
use crate::error::GenerationError;
use crate::visitor::{walk_specification, walk_step, walk_workflow, VisitResult, Visitor};
use crate::workflow::catalog::OperationCatalog;
use crate::workflow::model::{
    value_text, ActionKind, Components, Criterion, CriterionKind, FailureAction, FailureKind, Info,
    MetaData, ParameterObject, PayloadReplacement, ReusableObject, SourceDescription,
    Specification, Step, SuccessAction, Workflow,
};

/// Keywords for well-known operation ids, looked up in lower case.
pub static STEP_KEYWORD_MAP: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    HashMap::from([
        ("log", "Log"),
        ("http_request", "RequestsLibrary.Request"),
        ("assert", "Should Be True"),
    ])
});

const DEFAULT_SESSION: &str = "session";

/// A single keyword invocation.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct KeywordCall {
    pub name: String,
    pub args: Vec<String>,
}

impl KeywordCall {
    pub fn new(name: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            name: name.into(),
            args,
        }
    }
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct TestCase {
    pub name: String,
    pub doc: String,
    #[serde(rename = "keywords")]
    pub body: Vec<KeywordCall>,
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct TestSuite {
    pub name: String,
    pub doc: String,
    pub tests: Vec<TestCase>,
}

/// Sink of the test-suite backend.
#[derive(Debug, Default)]
pub struct SuiteBuilder {
    suites: Vec<TestSuite>,
    open: Option<TestSuite>,
    /// Index of the operation call in the current test, if any
    call: Option<usize>,
    /// Parameter names the operation call accepts; `None` accepts any
    accepted: Option<Vec<String>>,
}

impl SuiteBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn suites(&self) -> &[TestSuite] {
        &self.suites
    }

    pub fn into_suites(self) -> Vec<TestSuite> {
        self.suites
    }

    pub fn start_suite(&mut self, name: impl Into<String>, doc: impl Into<String>) -> Result<(), GenerationError> {
        if self.open.is_some() {
            return Err(GenerationError::AlreadyOpen("suite"));
        }
        self.open = Some(TestSuite {
            name: name.into(),
            doc: doc.into(),
            tests: Vec::new(),
        });
        Ok(())
    }

    pub fn start_test(&mut self, name: impl Into<String>, doc: impl Into<String>) -> Result<(), GenerationError> {
        let suite = self.open.as_mut().ok_or(GenerationError::NoOpenTarget("suite"))?;
        suite.tests.push(TestCase {
            name: name.into(),
            doc: doc.into(),
            body: Vec::new(),
        });
        self.call = None;
        self.accepted = None;
        Ok(())
    }

    pub fn keyword(&mut self, name: impl Into<String>, args: Vec<String>) -> Result<(), GenerationError> {
        self.current_test()?.body.push(KeywordCall::new(name, args));
        Ok(())
    }

    /// Adds the keyword that performs the step's operation.
    ///
    /// Later [`call_argument`](Self::call_argument) calls extend it.
    pub fn operation_call(&mut self, name: impl Into<String>, args: Vec<String>) -> Result<(), GenerationError> {
        let test = self.current_test()?;
        test.body.push(KeywordCall::new(name, args));
        let index = test.body.len() - 1;
        self.call = Some(index);
        Ok(())
    }

    /// Appends an argument to the operation call. Returns false when the
    /// current test has none.
    pub fn call_argument(&mut self, arg: impl Into<String>) -> Result<bool, GenerationError> {
        let Some(index) = self.call else {
            return Ok(false);
        };
        let test = self.current_test()?;
        match test.body.get_mut(index) {
            Some(call) => {
                call.args.push(arg.into());
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Restricts the parameters attached to the current operation call.
    pub fn accept_only(&mut self, names: Vec<String>) {
        self.accepted = Some(names);
    }

    /// Whether a parameter called `name` may be attached to the operation call.
    pub fn accepts(&self, name: &str) -> bool {
        self.accepted
            .as_ref()
            .map_or(true, |names| names.iter().any(|n| n == name))
    }

    pub fn finish_suite(&mut self) -> Result<(), GenerationError> {
        let suite = self.open.take().ok_or(GenerationError::NoOpenTarget("suite"))?;
        self.suites.push(suite);
        self.call = None;
        self.accepted = None;
        Ok(())
    }

    fn current_test(&mut self) -> Result<&mut TestCase, GenerationError> {
        self.open
            .as_mut()
            .ok_or(GenerationError::NoOpenTarget("suite"))?
            .tests
            .last_mut()
            .ok_or(GenerationError::NoOpenTarget("test case"))
    }

    fn abandon(&mut self) {
        self.open = None;
        self.call = None;
        self.accepted = None;
    }
}

/// Title-cases an operation id the way unmapped keywords are named:
/// lower case, first letter of every alphabetic run upper case.
pub fn title_case(operation_id: &str) -> String {
    let mut result = String::with_capacity(operation_id.len());
    let mut boundary = true;
    for c in operation_id.chars() {
        if c.is_alphabetic() {
            if boundary {
                result.extend(c.to_uppercase());
            } else {
                result.extend(c.to_lowercase());
            }
            boundary = false;
        } else {
            result.push(c);
            boundary = true;
        }
    }
    result
}

/// Abstract test-suite backend.
#[derive(Clone, Default)]
pub struct SuiteGenerator {
    catalog: Option<Arc<dyn OperationCatalog>>,
    session: Option<String>,
}

impl SuiteGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolves operation ids to HTTP calls through `catalog`.
    pub fn with_catalog(mut self, catalog: Arc<dyn OperationCatalog>) -> Self {
        self.catalog = Some(catalog);
        self
    }

    /// Session alias passed to `<METHOD> On Session` keywords.
    pub fn with_session(mut self, session: impl Into<String>) -> Self {
        self.session = Some(session.into());
        self
    }

    fn session(&self) -> &str {
        self.session.as_deref().unwrap_or(DEFAULT_SESSION)
    }

    fn operation_call(&self, step: &Step, sink: &mut SuiteBuilder) -> VisitResult {
        let reference = step.operation_id.as_deref().or(step.operation_path.as_deref());
        let resolved = reference.and_then(|reference| {
            self.catalog
                .as_ref()
                .and_then(|catalog| catalog.resolve(reference))
        });

        if let Some(operation) = resolved {
            sink.operation_call(
                format!("{} On Session", operation.method),
                vec![self.session().to_string(), operation.path],
            )?;
            if !operation.parameters.is_empty() {
                sink.accept_only(operation.parameters);
            }
            return Ok(());
        }

        if let Some(operation_id) = &step.operation_id {
            let lower = operation_id.to_lowercase();
            let keyword = match STEP_KEYWORD_MAP.get(lower.as_str()) {
                Some(keyword) => keyword.to_string(),
                None => title_case(&lower),
            };
            return sink.operation_call(keyword, Vec::new());
        }

        if let Some(path) = &step.operation_path {
            return sink.operation_call("RequestsLibrary.Request", vec![path.clone()]);
        }

        if step.request_body.is_some() {
            return sink.operation_call("RequestsLibrary.Request", Vec::new());
        }

        let description = step.description_text().trim();
        let message = if description.is_empty() {
            step.step_id.clone()
        } else {
            description.to_string()
        };
        sink.keyword("Log", vec![message])
    }
}

impl Visitor for SuiteGenerator {
    type Sink = SuiteBuilder;

    fn visit_specification(&self, node: &Specification, sink: &mut SuiteBuilder) -> VisitResult {
        info!("Generating test suites for '{}'", node.info().title);
        walk_specification(node, self, sink)
    }

    fn visit_info(&self, _node: &Info, _sink: &mut SuiteBuilder) -> VisitResult {
        Ok(())
    }

    fn visit_source_description(&self, node: &SourceDescription, _sink: &mut SuiteBuilder) -> VisitResult {
        debug!("Source description '{}' at {}", node.name, node.url);
        Ok(())
    }

    fn visit_workflow(&self, node: &Workflow, sink: &mut SuiteBuilder) -> VisitResult {
        debug!("Building suite for workflow '{}'", node.workflow_id);
        sink.start_suite(&node.workflow_id, node.headline().unwrap_or_default())?;

        if let Err(e) = walk_workflow(node, self, sink) {
            sink.abandon();
            return Err(e);
        }
        sink.finish_suite()
    }

    fn visit_step(&self, node: &Step, sink: &mut SuiteBuilder) -> VisitResult {
        sink.start_test(&node.step_id, node.description_text())?;
        self.operation_call(node, sink)?;
        walk_step(node, self, sink)?;

        if let Some(payload) = node.request_body.as_ref().and_then(|b| b.payload.as_ref()) {
            sink.call_argument(payload.to_string())?;
        }
        Ok(())
    }

    fn visit_criterion(&self, node: &Criterion, sink: &mut SuiteBuilder) -> VisitResult {
        let context = || {
            node.context
                .clone()
                .unwrap_or_else(|| "$response.body".to_string())
        };
        let (keyword, args) = match node.kind {
            CriterionKind::Simple => ("Should Be True", vec![node.condition.clone()]),
            CriterionKind::Regex => ("Should Match Regexp", vec![context(), node.condition.clone()]),
            CriterionKind::JsonPath => ("Json Path Should Match", vec![context(), node.condition.clone()]),
            CriterionKind::XPath => ("XPath Should Match", vec![context(), node.condition.clone()]),
        };
        sink.keyword(keyword, args)
    }

    fn visit_parameter(&self, node: &ParameterObject, sink: &mut SuiteBuilder) -> VisitResult {
        let value = node.value_text();
        if value.is_empty() {
            return Ok(());
        }
        if !sink.accepts(&node.name) {
            warn!("Parameter '{}' is not accepted by the operation, dropped", node.name);
            return Ok(());
        }
        if !sink.call_argument(format!("{}={}", node.name, value))? {
            debug!("Parameter '{}' has no operation call to attach to", node.name);
        }
        Ok(())
    }

    fn visit_success_action(&self, node: &SuccessAction, sink: &mut SuiteBuilder) -> VisitResult {
        let message = match &node.kind {
            ActionKind::End => "On success: end workflow".to_string(),
            ActionKind::Goto { workflow_id } => format!("On success: continue to workflow {}", workflow_id),
            ActionKind::GotoStep { step_id } => format!("On success: go to step {}", step_id),
        };
        sink.keyword("Log", vec![message])
    }

    fn visit_failure_action(&self, node: &FailureAction, sink: &mut SuiteBuilder) -> VisitResult {
        let effect = match &node.kind {
            FailureKind::End => "end workflow".to_string(),
            FailureKind::Goto { workflow_id } => format!("continue to workflow {}", workflow_id),
            FailureKind::GotoStep { step_id } => format!("go to step {}", step_id),
            FailureKind::Retry {
                retry_after,
                retry_limit,
            } => retry_text(*retry_after, *retry_limit),
        };
        let message = match node.http_status_code {
            Some(code) => format!("On failure: HTTP {} -> {}", code, effect),
            None => format!("On failure: {}", effect),
        };
        sink.keyword("Log", vec![message])
    }

    fn visit_payload_replacement(&self, node: &PayloadReplacement, sink: &mut SuiteBuilder) -> VisitResult {
        sink.call_argument(format!("{}={}", node.target, value_text(&node.value)))?;
        Ok(())
    }

    fn visit_reusable(&self, _node: &ReusableObject, _sink: &mut SuiteBuilder) -> VisitResult {
        Ok(())
    }

    fn visit_components(&self, _node: &Components, _sink: &mut SuiteBuilder) -> VisitResult {
        Ok(())
    }

    fn visit_metadata(&self, _node: &MetaData, _sink: &mut SuiteBuilder) -> VisitResult {
        Ok(())
    }
}

impl Backend for SuiteGenerator {
    type Artifact = TestSuite;

    fn name(&self) -> &'static str {
        "test-suite"
    }

    fn new_sink(&self) -> SuiteBuilder {
        SuiteBuilder::new()
    }

    fn finish(&self, workflow: &Workflow, sink: SuiteBuilder) -> Result<TestSuite, GenerationError> {
        sink.into_suites()
            .into_iter()
            .find(|s| s.name == workflow.workflow_id)
            .ok_or_else(|| GenerationError::MissingArtifact(workflow.workflow_id.clone()))
    }

    /// Renderers add their own extension to this stem.
    fn artifact_name(&self, workflow: &Workflow) -> Option<String> {
        Some(artifact_stem(&workflow.workflow_id))
    }
}
