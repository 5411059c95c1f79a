//! Specification Data Model
//!
//! Immutable value objects representing a workflow specification.
//! The [`Specification`] owns every other node; workflow-to-workflow
//! relations (`dependsOn`, `goto` actions, delegating steps) are stored
//! as plain ids and resolved through [`Specification::workflow`].
//!
//! # Example YAML Format
//!
//! ```yaml
//! arazzo: 1.0.0
//! info:
//!   title: Shop
//!   version: 1.0.0
//! sourceDescriptions:
//!   - name: shopApi
//!     url: ./openapi.yaml
//!     type: openapi
//! workflows:
//!   - workflowId: checkout
//!     dependsOn: [login]
//!     steps:
//!       - stepId: create-order
//!         description: Create the order
//!         operationId: createOrder
//!         successCriteria:
//!           - condition: $statusCode == 201
//!         onSuccess:
//!           - name: pay
//!             type: goto
//!             workflowId: payment
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Root of the model. Built only by [`build`](super::builder::build).
#[derive(Debug, Clone, PartialEq)]
pub struct Specification {
    arazzo: String,
    info: Info,
    source_descriptions: Vec<SourceDescription>,
    workflows: Vec<Workflow>,
    components: Components,
    metadata: MetaData,
    /// Indices into `workflows`, in generation order
    order: Vec<usize>,
}

impl Specification {
    pub(crate) fn new(
        arazzo: String,
        info: Info,
        source_descriptions: Vec<SourceDescription>,
        workflows: Vec<Workflow>,
        components: Components,
        metadata: MetaData,
        order: Vec<usize>,
    ) -> Self {
        Self {
            arazzo,
            info,
            source_descriptions,
            workflows,
            components,
            metadata,
            order,
        }
    }

    /// Format version declared by the document.
    pub fn arazzo(&self) -> &str {
        &self.arazzo
    }

    pub fn info(&self) -> &Info {
        &self.info
    }

    pub fn source_descriptions(&self) -> &[SourceDescription] {
        &self.source_descriptions
    }

    /// Workflows in document order.
    pub fn workflows(&self) -> &[Workflow] {
        &self.workflows
    }

    pub fn components(&self) -> &Components {
        &self.components
    }

    pub fn metadata(&self) -> &MetaData {
        &self.metadata
    }

    /// Looks up a workflow by id.
    pub fn workflow(&self, workflow_id: &str) -> Option<&Workflow> {
        self.workflows.iter().find(|w| w.workflow_id == workflow_id)
    }

    /// Workflows in dependency order: every workflow comes after the
    /// workflows it depends on, ties keep document order.
    pub fn ordered_workflows(&self) -> impl Iterator<Item = &Workflow> + '_ {
        self.order.iter().map(move |&index| &self.workflows[index])
    }

    /// Workflow ids in dependency order.
    pub fn generation_order(&self) -> Vec<&str> {
        self.ordered_workflows()
            .map(|w| w.workflow_id.as_str())
            .collect()
    }

    /// Total number of steps across all workflows.
    pub fn step_count(&self) -> usize {
        self.workflows.iter().map(|w| w.steps.len()).sum()
    }
}

/// Title and version metadata of the document.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Info {
    pub title: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    pub version: String,
}

/// Kind of document a source description points to.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    /// Another workflow specification
    Arazzo,
    /// An API description providing the operation catalog
    #[serde(rename = "openapi")]
    OpenApi,
}

impl Default for SourceKind {
    fn default() -> Self {
        Self::OpenApi
    }
}

/// External document referenced by the specification.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct SourceDescription {
    pub name: String,
    pub url: String,

    #[serde(rename = "type", default)]
    pub kind: SourceKind,
}

/// A named, ordered sequence of steps.
#[derive(Debug, Clone, PartialEq)]
pub struct Workflow {
    /// Unique identifier within the specification
    pub workflow_id: String,
    pub summary: Option<String>,
    pub description: Option<String>,
    /// Ids of workflows that must be generated before this one
    pub depends_on: Vec<String>,
    /// Input schema, kept opaque
    pub inputs: Option<Value>,
    pub steps: Vec<Step>,
    pub parameters: Vec<ParameterObject>,
    pub success_actions: Vec<SuccessAction>,
    pub failure_actions: Vec<FailureAction>,
    /// Output name -> runtime expression
    pub outputs: BTreeMap<String, String>,
}

impl Workflow {
    /// Creates a workflow with no steps.
    ///
    /// # Example
    ///
    /// ```
    /// use arazzo_gen::workflow::{Step, Workflow};
    ///
    /// let workflow = Workflow::new("checkout")
    ///     .with_description("Buy things")
    ///     .depends_on("login")
    ///     .with_step(Step::new("create-order").with_description("Create the order"));
    /// ```
    pub fn new(workflow_id: impl Into<String>) -> Self {
        Self {
            workflow_id: workflow_id.into().trim().to_string(),
            summary: None,
            description: None,
            depends_on: Vec::new(),
            inputs: None,
            steps: Vec::new(),
            parameters: Vec::new(),
            success_actions: Vec::new(),
            failure_actions: Vec::new(),
            outputs: BTreeMap::new(),
        }
    }

    pub fn with_summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = Some(summary.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Adds a dependency on another workflow.
    pub fn depends_on(mut self, workflow_id: impl Into<String>) -> Self {
        self.depends_on.push(workflow_id.into());
        self
    }

    pub fn with_step(mut self, step: Step) -> Self {
        self.steps.push(step);
        self
    }

    pub fn with_output(mut self, name: impl Into<String>, expression: impl Into<String>) -> Self {
        self.outputs.insert(name.into(), expression.into());
        self
    }

    /// Gets a step by ID.
    pub fn get_step(&self, step_id: &str) -> Option<&Step> {
        self.steps.iter().find(|s| s.step_id == step_id)
    }

    /// Summary if present, otherwise the description.
    pub fn headline(&self) -> Option<&str> {
        self.summary
            .as_deref()
            .or(self.description.as_deref())
            .filter(|s| !s.trim().is_empty())
    }

    /// Ids of every workflow this one refers to through actions or
    /// delegating steps, in document order.
    pub fn referenced_workflows(&self) -> Vec<&str> {
        let mut ids = Vec::new();
        let workflow_actions = self
            .success_actions
            .iter()
            .filter_map(|a| a.kind.target())
            .chain(self.failure_actions.iter().filter_map(|a| a.kind.target()));
        ids.extend(workflow_actions);

        for step in &self.steps {
            ids.extend(step.workflow_id.as_deref());
            ids.extend(step.on_success.iter().filter_map(|a| a.kind.target()));
            ids.extend(step.on_failure.iter().filter_map(|a| a.kind.target()));
        }
        ids
    }

    /// Returns the number of steps in the workflow.
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Returns true if the workflow has no steps.
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

/// One unit of work within a workflow.
#[derive(Debug, Clone, PartialEq)]
pub struct Step {
    /// Unique identifier within the parent workflow
    pub step_id: String,
    pub description: Option<String>,
    /// Reference into an external operation catalog
    pub operation_id: Option<String>,
    pub operation_path: Option<String>,
    /// Workflow this step delegates to
    pub workflow_id: Option<String>,
    pub parameters: Vec<ParameterObject>,
    pub request_body: Option<RequestBody>,
    pub success_criteria: Vec<Criterion>,
    pub on_success: Vec<SuccessAction>,
    pub on_failure: Vec<FailureAction>,
    pub outputs: BTreeMap<String, String>,
}

impl Step {
    pub fn new(step_id: impl Into<String>) -> Self {
        Self {
            step_id: step_id.into().trim().to_string(),
            description: None,
            operation_id: None,
            operation_path: None,
            workflow_id: None,
            parameters: Vec::new(),
            request_body: None,
            success_criteria: Vec::new(),
            on_success: Vec::new(),
            on_failure: Vec::new(),
            outputs: BTreeMap::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_operation(mut self, operation_id: impl Into<String>) -> Self {
        self.operation_id = Some(operation_id.into());
        self
    }

    pub fn with_parameter(mut self, parameter: ParameterObject) -> Self {
        self.parameters.push(parameter);
        self
    }

    pub fn with_request_body(mut self, body: RequestBody) -> Self {
        self.request_body = Some(body);
        self
    }

    pub fn with_criterion(mut self, criterion: Criterion) -> Self {
        self.success_criteria.push(criterion);
        self
    }

    pub fn on_success(mut self, action: SuccessAction) -> Self {
        self.on_success.push(action);
        self
    }

    pub fn on_failure(mut self, action: FailureAction) -> Self {
        self.on_failure.push(action);
        self
    }

    /// Description, or an empty string when none is given.
    pub fn description_text(&self) -> &str {
        self.description.as_deref().unwrap_or_default()
    }
}

/// How a criterion's condition is interpreted.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum CriterionKind {
    #[default]
    Simple,
    Regex,
    #[serde(rename = "jsonpath")]
    JsonPath,
    #[serde(rename = "xpath")]
    XPath,
}

/// A condition that must hold for a step to succeed.
///
/// All criteria of a step form a conjunction.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Criterion {
    pub condition: String,

    /// Runtime expression the condition is applied to (regex/jsonpath)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,

    #[serde(rename = "type", default)]
    pub kind: CriterionKind,
}

impl Criterion {
    pub fn simple(condition: impl Into<String>) -> Self {
        Self {
            condition: condition.into(),
            context: None,
            kind: CriterionKind::Simple,
        }
    }

    pub fn regex(context: impl Into<String>, pattern: impl Into<String>) -> Self {
        Self {
            condition: pattern.into(),
            context: Some(context.into()),
            kind: CriterionKind::Regex,
        }
    }

    pub fn json_path(context: impl Into<String>, expression: impl Into<String>) -> Self {
        Self {
            condition: expression.into(),
            context: Some(context.into()),
            kind: CriterionKind::JsonPath,
        }
    }
}

/// What a success action does.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionKind {
    /// End the current workflow
    End,
    /// Continue with another named workflow
    Goto { workflow_id: String },
    /// Jump to a step of the same workflow
    GotoStep { step_id: String },
}

impl ActionKind {
    /// Workflow id this action continues to, if any.
    pub fn target(&self) -> Option<&str> {
        match self {
            Self::Goto { workflow_id } => Some(workflow_id),
            Self::End | Self::GotoStep { .. } => None,
        }
    }

    /// Step id this action jumps to, if any.
    pub fn step_target(&self) -> Option<&str> {
        match self {
            Self::GotoStep { step_id } => Some(step_id),
            _ => None,
        }
    }
}

/// Follow-up directive when a step succeeds.
#[derive(Debug, Clone, PartialEq)]
pub struct SuccessAction {
    pub name: String,
    pub kind: ActionKind,
    pub criteria: Vec<Criterion>,
    /// Component this action was resolved from
    pub origin: Option<ReusableObject>,
}

impl SuccessAction {
    pub fn end(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: ActionKind::End,
            criteria: Vec::new(),
            origin: None,
        }
    }

    pub fn goto(name: impl Into<String>, workflow_id: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: ActionKind::Goto {
                workflow_id: workflow_id.into(),
            },
            criteria: Vec::new(),
            origin: None,
        }
    }
}

/// What a failure action does.
#[derive(Debug, Clone, PartialEq)]
pub enum FailureKind {
    End,
    Goto {
        workflow_id: String,
    },
    GotoStep {
        step_id: String,
    },
    /// Retry the step, optionally after a delay in seconds
    Retry {
        retry_after: Option<f64>,
        retry_limit: Option<u32>,
    },
}

impl FailureKind {
    pub fn target(&self) -> Option<&str> {
        match self {
            Self::Goto { workflow_id } => Some(workflow_id),
            _ => None,
        }
    }

    pub fn step_target(&self) -> Option<&str> {
        match self {
            Self::GotoStep { step_id } => Some(step_id),
            _ => None,
        }
    }
}

/// Follow-up directive when a step fails.
#[derive(Debug, Clone, PartialEq)]
pub struct FailureAction {
    pub name: String,
    pub kind: FailureKind,
    /// Only applies when the response carries this status code
    pub http_status_code: Option<u16>,
    pub criteria: Vec<Criterion>,
    pub origin: Option<ReusableObject>,
}

impl FailureAction {
    pub fn end(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: FailureKind::End,
            http_status_code: None,
            criteria: Vec::new(),
            origin: None,
        }
    }

    pub fn goto(name: impl Into<String>, workflow_id: impl Into<String>) -> Self {
        Self {
            kind: FailureKind::Goto {
                workflow_id: workflow_id.into(),
            },
            ..Self::end(name)
        }
    }

    pub fn with_status_code(mut self, code: u16) -> Self {
        self.http_status_code = Some(code);
        self
    }
}

/// Where a parameter is placed in the request.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ParameterLocation {
    Path,
    #[default]
    Query,
    Header,
    Cookie,
    Body,
}

impl ParameterLocation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Path => "path",
            Self::Query => "query",
            Self::Header => "header",
            Self::Cookie => "cookie",
            Self::Body => "body",
        }
    }
}

/// A request parameter with a literal or runtime-expression value.
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterObject {
    pub name: String,
    pub location: ParameterLocation,
    pub value: Value,
    pub origin: Option<ReusableObject>,
}

impl ParameterObject {
    pub fn new(name: impl Into<String>, location: ParameterLocation, value: impl Into<Value>) -> Self {
        Self {
            name: name.into(),
            location,
            value: value.into(),
            origin: None,
        }
    }

    /// Value as display text; strings are not quoted.
    pub fn value_text(&self) -> String {
        value_text(&self.value)
    }
}

/// Request body template plus replacements applied to it.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RequestBody {
    pub content_type: Option<String>,
    pub payload: Option<Value>,
    pub replacements: Vec<PayloadReplacement>,
}

/// Replaces the value at `target` in the request body template.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct PayloadReplacement {
    pub target: String,
    pub value: Value,
}

/// Section of [`Components`] a reusable reference points into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComponentSection {
    Inputs,
    Parameters,
    SuccessActions,
    FailureActions,
}

impl ComponentSection {
    /// Parses the wire name used in `$components.<section>.<name>`.
    pub fn from_wire(name: &str) -> Option<Self> {
        match name {
            "inputs" => Some(Self::Inputs),
            "parameters" => Some(Self::Parameters),
            "successActions" => Some(Self::SuccessActions),
            "failureActions" => Some(Self::FailureActions),
            _ => None,
        }
    }

    pub fn wire_name(&self) -> &'static str {
        match self {
            Self::Inputs => "inputs",
            Self::Parameters => "parameters",
            Self::SuccessActions => "successActions",
            Self::FailureActions => "failureActions",
        }
    }
}

/// Named pointer into [`Components`].
#[derive(Debug, Clone, PartialEq)]
pub struct ReusableObject {
    /// Full reference, e.g. `$components.parameters.page`
    pub reference: String,
    pub section: ComponentSection,
    pub name: String,
    /// Value overriding the component's own value (parameters only)
    pub value: Option<Value>,
}

impl ReusableObject {
    /// Parses `$components.<section>.<name>`.
    pub fn parse(reference: &str, value: Option<Value>) -> Option<Self> {
        let rest = reference.trim().strip_prefix("$components.")?;
        let (section, name) = rest.split_once('.')?;
        if name.is_empty() {
            return None;
        }
        Some(Self {
            reference: reference.trim().to_string(),
            section: ComponentSection::from_wire(section)?,
            name: name.to_string(),
            value,
        })
    }
}

/// Named reusable fragments.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Components {
    pub inputs: BTreeMap<String, Value>,
    pub parameters: BTreeMap<String, ParameterObject>,
    pub success_actions: BTreeMap<String, SuccessAction>,
    pub failure_actions: BTreeMap<String, FailureAction>,
}

impl Components {
    /// Returns true if the section holds a component with this name.
    pub fn contains(&self, section: ComponentSection, name: &str) -> bool {
        match section {
            ComponentSection::Inputs => self.inputs.contains_key(name),
            ComponentSection::Parameters => self.parameters.contains_key(name),
            ComponentSection::SuccessActions => self.success_actions.contains_key(name),
            ComponentSection::FailureActions => self.failure_actions.contains_key(name),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.inputs.is_empty()
            && self.parameters.is_empty()
            && self.success_actions.is_empty()
            && self.failure_actions.is_empty()
    }
}

/// Extension fields (`x-*`) carried by the document root.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MetaData {
    pub entries: BTreeMap<String, Value>,
}

impl MetaData {
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.get(key)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Renders a JSON value as plain text; strings are not quoted.
pub fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_workflow_creation() {
        let workflow = Workflow::new(" checkout ")
            .with_summary("Buy")
            .depends_on("login")
            .with_step(Step::new("create-order").with_description("Create"))
            .with_step(Step::new("pay"));

        assert_eq!(workflow.workflow_id, "checkout");
        assert_eq!(workflow.depends_on, vec!["login"]);
        assert_eq!(workflow.len(), 2);
        assert!(!workflow.is_empty());
        assert_eq!(workflow.get_step("pay").unwrap().step_id, "pay");
        assert!(workflow.get_step("ghost").is_none());
    }

    #[test]
    fn test_workflow_headline_prefers_summary() {
        let workflow = Workflow::new("a").with_description("long").with_summary("short");
        assert_eq!(workflow.headline(), Some("short"));

        let workflow = Workflow::new("a").with_description("long");
        assert_eq!(workflow.headline(), Some("long"));

        let workflow = Workflow::new("a").with_summary("   ");
        assert_eq!(workflow.headline(), None);
    }

    #[test]
    fn test_referenced_workflows() {
        let mut delegating = Step::new("delegate");
        delegating.workflow_id = Some("sub".to_string());

        let workflow = Workflow::new("main")
            .with_step(
                Step::new("s1")
                    .on_success(SuccessAction::goto("next", "after"))
                    .on_success(SuccessAction::end("done"))
                    .on_failure(FailureAction::goto("recover", "fallback")),
            )
            .with_step(delegating);

        assert_eq!(workflow.referenced_workflows(), vec!["after", "fallback", "sub"]);
    }

    #[test]
    fn test_reusable_object_parse() {
        let reusable = ReusableObject::parse("$components.parameters.page", Some(json!(2))).unwrap();
        assert_eq!(reusable.section, ComponentSection::Parameters);
        assert_eq!(reusable.name, "page");
        assert_eq!(reusable.value, Some(json!(2)));

        let reusable = ReusableObject::parse("$components.successActions.done", None).unwrap();
        assert_eq!(reusable.section, ComponentSection::SuccessActions);

        assert!(ReusableObject::parse("$components.parameters.", None).is_none());
        assert!(ReusableObject::parse("$components.unknown.x", None).is_none());
        assert!(ReusableObject::parse("#/components/parameters/page", None).is_none());
    }

    #[test]
    fn test_criterion_deserialize_defaults() {
        let criterion: Criterion = serde_json::from_value(json!({"condition": "$statusCode == 200"})).unwrap();
        assert_eq!(criterion.kind, CriterionKind::Simple);
        assert!(criterion.context.is_none());

        let criterion: Criterion = serde_json::from_value(json!({
            "condition": "$.items",
            "context": "$response.body",
            "type": "jsonpath"
        }))
        .unwrap();
        assert_eq!(criterion.kind, CriterionKind::JsonPath);
    }

    #[test]
    fn test_source_kind_wire_names() {
        let source: SourceDescription =
            serde_json::from_value(json!({"name": "api", "url": "api.yaml", "type": "openapi"})).unwrap();
        assert_eq!(source.kind, SourceKind::OpenApi);

        let source: SourceDescription =
            serde_json::from_value(json!({"name": "flows", "url": "flows.yaml", "type": "arazzo"})).unwrap();
        assert_eq!(source.kind, SourceKind::Arazzo);
    }

    #[test]
    fn test_parameter_value_text() {
        let param = ParameterObject::new("id", ParameterLocation::Path, "$inputs.id");
        assert_eq!(param.value_text(), "$inputs.id");

        let param = ParameterObject::new("limit", ParameterLocation::Query, 10);
        assert_eq!(param.value_text(), "10");
        assert_eq!(param.location.as_str(), "query");
    }

    #[test]
    fn test_components_contains() {
        let mut components = Components::default();
        assert!(components.is_empty());

        components.parameters.insert(
            "page".to_string(),
            ParameterObject::new("page", ParameterLocation::Query, 1),
        );
        assert!(components.contains(ComponentSection::Parameters, "page"));
        assert!(!components.contains(ComponentSection::SuccessActions, "page"));
        assert!(!components.is_empty());
    }

    #[test]
    fn test_failure_action_builders() {
        let action = FailureAction::goto("recover", "fallback").with_status_code(503);
        assert_eq!(action.kind.target(), Some("fallback"));
        assert_eq!(action.http_status_code, Some(503));
        assert_eq!(FailureAction::end("stop").kind.target(), None);
    }
}
