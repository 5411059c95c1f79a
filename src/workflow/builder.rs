//! Model Builder
//!
//! Turns a raw (already loaded and schema-checked) document into a
//! [`Specification`]. Enforces the invariants a schema cannot express:
//!
//! - unique workflow ids, unique step ids within a workflow
//! - non-empty workflows
//! - `dependsOn`, `goto` and delegating-step references resolve
//! - reusable `$components.*` references resolve
//! - the `dependsOn` relation is acyclic
//!
//! Violations are collected and reported together. Nothing is returned
//! unless every check passes.

use std::collections::{BTreeMap, HashSet};

use log::{debug, info, warn};
use serde::Deserialize;
use serde_json::Value;

use super::model::{
    ActionKind, ComponentSection, Components, Criterion, FailureAction, FailureKind, Info, MetaData,
    ParameterLocation, ParameterObject, PayloadReplacement, RequestBody, ReusableObject,
    SourceDescription, Specification, Step, SuccessAction, Workflow,
};
use super::resolver;
use crate::error::{SpecificationError, ValidationError};

/// Builds a specification from a raw document.
///
/// # Example
///
/// ```
/// use arazzo_gen::workflow::builder::build;
/// use serde_json::json;
///
/// let raw = json!({
///     "arazzo": "1.0.0",
///     "info": {"title": "Demo", "version": "1.0.0"},
///     "workflows": [
///         {"workflowId": "ping", "steps": [{"stepId": "call", "description": "ping the service"}]}
///     ]
/// });
/// let spec = build(&raw).unwrap();
/// assert_eq!(spec.generation_order(), vec!["ping"]);
/// ```
pub fn build(raw: &Value) -> Result<Specification, ValidationError> {
    let document = RawSpecification::deserialize(raw)
        .map_err(|e| SpecificationError::new(format!("document does not match the model: {}", e)))?;

    info!(
        "Building specification '{}' with {} workflows",
        document.info.title,
        document.workflows.len()
    );

    let mut builder = Builder::default();
    let components = builder.components(document.components);
    let workflows = builder.workflows(document.workflows, &components);

    if let Some(error) = ValidationError::collect(builder.errors) {
        return Err(error);
    }

    let order = resolver::order_indices(&workflows)?;

    let metadata = MetaData {
        entries: document
            .extensions
            .into_iter()
            .filter(|(key, _)| key.starts_with("x-"))
            .collect(),
    };

    let specification = Specification::new(
        document.arazzo,
        document.info,
        document.source_descriptions,
        workflows,
        components,
        metadata,
        order,
    );

    info!(
        "Specification built: {} workflows, {} steps",
        specification.workflows().len(),
        specification.step_count()
    );
    Ok(specification)
}

/// Same as [`build`], with the document locator attached to shape errors.
pub fn build_with_locator(raw: &Value, locator: &str) -> Result<Specification, ValidationError> {
    build(raw).map_err(|error| match error {
        ValidationError::Specification(e) => ValidationError::Specification(e.at(locator)),
        other => other,
    })
}

// Wire shapes. Field names follow the document's camelCase.

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawSpecification {
    arazzo: String,
    info: Info,
    #[serde(default)]
    source_descriptions: Vec<SourceDescription>,
    #[serde(default)]
    workflows: Vec<RawWorkflow>,
    #[serde(default)]
    components: RawComponents,
    #[serde(flatten)]
    extensions: BTreeMap<String, Value>,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct RawComponents {
    #[serde(default)]
    inputs: BTreeMap<String, Value>,
    #[serde(default)]
    parameters: BTreeMap<String, RawParameter>,
    #[serde(default)]
    success_actions: BTreeMap<String, RawSuccessAction>,
    #[serde(default)]
    failure_actions: BTreeMap<String, RawFailureAction>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawWorkflow {
    workflow_id: String,
    summary: Option<String>,
    description: Option<String>,
    #[serde(default)]
    depends_on: Vec<String>,
    inputs: Option<Value>,
    #[serde(default)]
    steps: Vec<RawStep>,
    #[serde(default)]
    parameters: Vec<Entry<RawParameter>>,
    #[serde(default)]
    success_actions: Vec<Entry<RawSuccessAction>>,
    #[serde(default)]
    failure_actions: Vec<Entry<RawFailureAction>>,
    #[serde(default)]
    outputs: BTreeMap<String, String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawStep {
    step_id: String,
    description: Option<String>,
    operation_id: Option<String>,
    operation_path: Option<String>,
    workflow_id: Option<String>,
    #[serde(default)]
    parameters: Vec<Entry<RawParameter>>,
    request_body: Option<RawRequestBody>,
    #[serde(default)]
    success_criteria: Vec<Criterion>,
    #[serde(default)]
    on_success: Vec<Entry<RawSuccessAction>>,
    #[serde(default)]
    on_failure: Vec<Entry<RawFailureAction>>,
    #[serde(default)]
    outputs: BTreeMap<String, String>,
}

/// A list entry that is either inline or a `$components` reference.
#[derive(Deserialize)]
#[serde(untagged)]
enum Entry<T> {
    Reusable {
        reference: String,
        value: Option<Value>,
    },
    Inline(T),
}

#[derive(Deserialize, Clone)]
struct RawParameter {
    name: String,
    #[serde(rename = "in", default)]
    location: ParameterLocation,
    #[serde(default)]
    value: Value,
}

#[derive(Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
enum RawActionType {
    End,
    Goto,
    Retry,
}

#[derive(Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
struct RawSuccessAction {
    name: String,
    #[serde(rename = "type")]
    kind: RawActionType,
    workflow_id: Option<String>,
    step_id: Option<String>,
    #[serde(default)]
    criteria: Vec<Criterion>,
}

#[derive(Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
struct RawFailureAction {
    name: String,
    #[serde(rename = "type")]
    kind: RawActionType,
    workflow_id: Option<String>,
    step_id: Option<String>,
    retry_after: Option<f64>,
    retry_limit: Option<u32>,
    http_status_code: Option<u16>,
    #[serde(default)]
    criteria: Vec<Criterion>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawRequestBody {
    content_type: Option<String>,
    payload: Option<Value>,
    #[serde(default)]
    replacements: Vec<PayloadReplacement>,
}

/// Accumulates violations while converting wire shapes into the model.
#[derive(Default)]
struct Builder {
    errors: Vec<ValidationError>,
}

impl Builder {
    fn components(&mut self, raw: RawComponents) -> Components {
        let parameters = raw
            .parameters
            .into_iter()
            .map(|(key, p)| (key, convert_parameter(p)))
            .collect();

        let mut success_actions = BTreeMap::new();
        for (key, action) in raw.success_actions {
            let location = format!("Component 'successActions.{}'", key);
            if let Some(action) = self.convert_success_action(action, &location) {
                success_actions.insert(key, action);
            }
        }

        let mut failure_actions = BTreeMap::new();
        for (key, action) in raw.failure_actions {
            let location = format!("Component 'failureActions.{}'", key);
            if let Some(action) = self.convert_failure_action(action, &location) {
                failure_actions.insert(key, action);
            }
        }

        Components {
            inputs: raw.inputs,
            parameters,
            success_actions,
            failure_actions,
        }
    }

    fn workflows(&mut self, raw: Vec<RawWorkflow>, components: &Components) -> Vec<Workflow> {
        let mut seen_ids: HashSet<String> = HashSet::new();
        for workflow in &raw {
            let workflow_id = workflow.workflow_id.trim();
            if !seen_ids.insert(workflow_id.to_string()) {
                self.errors
                    .push(ValidationError::DuplicateWorkflowId(workflow_id.to_string()));
            }
        }

        let workflows: Vec<Workflow> = raw
            .into_iter()
            .map(|w| self.workflow(w, components))
            .collect();

        for workflow in &workflows {
            self.check_references(workflow, &seen_ids);
        }

        workflows
    }

    fn workflow(&mut self, raw: RawWorkflow, components: &Components) -> Workflow {
        let workflow_id = raw.workflow_id.trim().to_string();
        let location = format!("Workflow '{}'", workflow_id);
        debug!("Building workflow '{}' ({} steps)", workflow_id, raw.steps.len());

        if raw.steps.is_empty() {
            self.errors
                .push(ValidationError::EmptyWorkflow(workflow_id.clone()));
        }

        let mut step_ids: HashSet<String> = HashSet::new();
        for step in &raw.steps {
            if !step_ids.insert(step.step_id.trim().to_string()) {
                self.errors.push(ValidationError::DuplicateStepId {
                    workflow_id: workflow_id.clone(),
                    step_id: step.step_id.clone(),
                });
            }
        }

        let mut depends_on: Vec<String> = Vec::new();
        for dependency in raw.depends_on {
            if depends_on.contains(&dependency) {
                warn!(
                    "Workflow '{}' lists dependency '{}' more than once",
                    workflow_id, dependency
                );
                continue;
            }
            depends_on.push(dependency);
        }

        let parameters = self.parameters(raw.parameters, components, &location);
        let success_actions = self.success_actions(raw.success_actions, components, &location);
        let failure_actions = self.failure_actions(raw.failure_actions, components, &location);

        let steps = raw
            .steps
            .into_iter()
            .map(|s| self.step(s, &workflow_id, components))
            .collect();

        Workflow {
            workflow_id,
            summary: raw.summary,
            description: raw.description,
            depends_on,
            inputs: raw.inputs,
            steps,
            parameters,
            success_actions,
            failure_actions,
            outputs: raw.outputs,
        }
    }

    fn step(&mut self, raw: RawStep, workflow_id: &str, components: &Components) -> Step {
        let step_id = raw.step_id.trim().to_string();
        let location = format!("Step '{}' in workflow '{}'", step_id, workflow_id);

        for criterion in &raw.success_criteria {
            if criterion.condition.trim().is_empty() {
                warn!("{}: success criterion has an empty condition", location);
            }
        }

        let request_body = raw.request_body.map(|body| RequestBody {
            content_type: body.content_type,
            payload: body.payload,
            replacements: body.replacements,
        });

        Step {
            parameters: self.parameters(raw.parameters, components, &location),
            on_success: self.success_actions(raw.on_success, components, &location),
            on_failure: self.failure_actions(raw.on_failure, components, &location),
            step_id,
            description: raw.description,
            operation_id: raw.operation_id,
            operation_path: raw.operation_path,
            workflow_id: raw.workflow_id,
            request_body,
            success_criteria: raw.success_criteria,
            outputs: raw.outputs,
        }
    }

    fn parameters(
        &mut self,
        entries: Vec<Entry<RawParameter>>,
        components: &Components,
        location: &str,
    ) -> Vec<ParameterObject> {
        entries
            .into_iter()
            .filter_map(|entry| match entry {
                Entry::Inline(raw) => Some(convert_parameter(raw)),
                Entry::Reusable { reference, value } => {
                    let reusable =
                        self.reusable(&reference, value, ComponentSection::Parameters, location)?;
                    let Some(component) = components.parameters.get(&reusable.name) else {
                        self.missing_component(&reference, location);
                        return None;
                    };
                    let mut parameter = component.clone();
                    if let Some(value) = &reusable.value {
                        parameter.value = value.clone();
                    }
                    parameter.origin = Some(reusable);
                    Some(parameter)
                }
            })
            .collect()
    }

    fn success_actions(
        &mut self,
        entries: Vec<Entry<RawSuccessAction>>,
        components: &Components,
        location: &str,
    ) -> Vec<SuccessAction> {
        entries
            .into_iter()
            .filter_map(|entry| match entry {
                Entry::Inline(raw) => self.convert_success_action(raw, location),
                Entry::Reusable { reference, value } => {
                    let reusable =
                        self.reusable(&reference, value, ComponentSection::SuccessActions, location)?;
                    let Some(component) = components.success_actions.get(&reusable.name) else {
                        self.missing_component(&reference, location);
                        return None;
                    };
                    Some(SuccessAction {
                        origin: Some(reusable),
                        ..component.clone()
                    })
                }
            })
            .collect()
    }

    fn failure_actions(
        &mut self,
        entries: Vec<Entry<RawFailureAction>>,
        components: &Components,
        location: &str,
    ) -> Vec<FailureAction> {
        entries
            .into_iter()
            .filter_map(|entry| match entry {
                Entry::Inline(raw) => self.convert_failure_action(raw, location),
                Entry::Reusable { reference, value } => {
                    let reusable =
                        self.reusable(&reference, value, ComponentSection::FailureActions, location)?;
                    let Some(component) = components.failure_actions.get(&reusable.name) else {
                        self.missing_component(&reference, location);
                        return None;
                    };
                    Some(FailureAction {
                        origin: Some(reusable),
                        ..component.clone()
                    })
                }
            })
            .collect()
    }

    /// Parses a reference and checks it points into the expected section.
    fn reusable(
        &mut self,
        reference: &str,
        value: Option<Value>,
        expected: ComponentSection,
        location: &str,
    ) -> Option<ReusableObject> {
        let Some(reusable) = ReusableObject::parse(reference, value) else {
            self.errors.push(ValidationError::MalformedReference {
                location: location.to_string(),
                reference: reference.to_string(),
            });
            return None;
        };

        if reusable.section != expected {
            self.errors.push(ValidationError::MisplacedReference {
                location: location.to_string(),
                reference: reference.to_string(),
                expected: format!("$components.{}.*", expected.wire_name()),
            });
            return None;
        }

        Some(reusable)
    }

    fn missing_component(&mut self, reference: &str, location: &str) {
        self.errors.push(ValidationError::UnknownComponent {
            location: location.to_string(),
            reference: reference.to_string(),
        });
    }

    fn convert_success_action(
        &mut self,
        raw: RawSuccessAction,
        location: &str,
    ) -> Option<SuccessAction> {
        let kind = match raw.kind {
            RawActionType::End => ActionKind::End,
            RawActionType::Goto => match (raw.workflow_id, raw.step_id) {
                (Some(workflow_id), None) => ActionKind::Goto { workflow_id },
                (None, Some(step_id)) => ActionKind::GotoStep { step_id },
                _ => {
                    self.malformed_action(location, &raw.name, "goto needs exactly one of workflowId or stepId");
                    return None;
                }
            },
            RawActionType::Retry => {
                self.malformed_action(location, &raw.name, "retry is only allowed on failure");
                return None;
            }
        };

        Some(SuccessAction {
            name: raw.name,
            kind,
            criteria: raw.criteria,
            origin: None,
        })
    }

    fn convert_failure_action(
        &mut self,
        raw: RawFailureAction,
        location: &str,
    ) -> Option<FailureAction> {
        let kind = match raw.kind {
            RawActionType::End => FailureKind::End,
            RawActionType::Retry => FailureKind::Retry {
                retry_after: raw.retry_after,
                retry_limit: raw.retry_limit,
            },
            RawActionType::Goto => match (raw.workflow_id, raw.step_id) {
                (Some(workflow_id), None) => FailureKind::Goto { workflow_id },
                (None, Some(step_id)) => FailureKind::GotoStep { step_id },
                _ => {
                    self.malformed_action(location, &raw.name, "goto needs exactly one of workflowId or stepId");
                    return None;
                }
            },
        };

        Some(FailureAction {
            name: raw.name,
            kind,
            http_status_code: raw.http_status_code,
            criteria: raw.criteria,
            origin: None,
        })
    }

    fn malformed_action(&mut self, location: &str, name: &str, reason: &str) {
        self.errors
            .push(ValidationError::Specification(SpecificationError::new(format!(
                "{}: action '{}': {}",
                location, name, reason
            ))));
    }

    /// Checks every named reference a workflow makes.
    fn check_references(&mut self, workflow: &Workflow, workflow_ids: &HashSet<String>) {
        let location = format!("Workflow '{}'", workflow.workflow_id);

        for dependency in &workflow.depends_on {
            if !workflow_ids.contains(dependency) {
                self.errors.push(ValidationError::UnknownDependency {
                    workflow_id: workflow.workflow_id.clone(),
                    reference: dependency.clone(),
                });
            }
        }

        let workflow_targets = workflow
            .success_actions
            .iter()
            .map(|a| (a.kind.target(), a.kind.step_target()))
            .chain(
                workflow
                    .failure_actions
                    .iter()
                    .map(|a| (a.kind.target(), a.kind.step_target())),
            );
        for (target, step_target) in workflow_targets {
            self.check_target(workflow, workflow_ids, &location, target, step_target);
        }

        for step in &workflow.steps {
            let location = format!(
                "Step '{}' in workflow '{}'",
                step.step_id, workflow.workflow_id
            );

            if let Some(delegate) = &step.workflow_id {
                self.check_target(workflow, workflow_ids, &location, Some(delegate), None);
            }

            let targets: Vec<_> = step
                .on_success
                .iter()
                .map(|a| (a.kind.target(), a.kind.step_target()))
                .chain(
                    step.on_failure
                        .iter()
                        .map(|a| (a.kind.target(), a.kind.step_target())),
                )
                .collect();
            for (target, step_target) in targets {
                self.check_target(workflow, workflow_ids, &location, target, step_target);
            }
        }
    }

    fn check_target(
        &mut self,
        workflow: &Workflow,
        workflow_ids: &HashSet<String>,
        location: &str,
        target: Option<&str>,
        step_target: Option<&str>,
    ) {
        if let Some(target) = target {
            if !workflow_ids.contains(target) {
                self.errors.push(ValidationError::UnknownWorkflowReference {
                    location: location.to_string(),
                    reference: target.to_string(),
                });
            } else if target == workflow.workflow_id {
                warn!("{} continues to its own workflow '{}'", location, target);
            }
        }

        if let Some(step_target) = step_target {
            if workflow.get_step(step_target).is_none() {
                self.errors.push(ValidationError::UnknownStepReference {
                    location: location.to_string(),
                    reference: step_target.to_string(),
                });
            }
        }
    }
}

fn convert_parameter(raw: RawParameter) -> ParameterObject {
    ParameterObject::new(raw.name, raw.location, raw.value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflow::model::CriterionKind;

    fn parse(yaml: &str) -> Value {
        serde_yaml::from_str(yaml).unwrap()
    }

    const HEADER: &str = r#"
arazzo: 1.0.0
info:
  title: Shop
  version: 1.0.0
"#;

    fn spec(body: &str) -> Value {
        parse(&format!("{}{}", HEADER, body))
    }

    #[test]
    fn test_build_full_document() {
        let raw = spec(
            r#"
x-owner: platform-team
sourceDescriptions:
  - name: shopApi
    url: ./shop.yaml
    type: openapi
components:
  parameters:
    page:
      name: page
      in: query
      value: 1
  successActions:
    done:
      name: done
      type: end
workflows:
  - workflowId: checkout
    summary: Buy things
    dependsOn: [login]
    steps:
      - stepId: create-order
        description: Create the order
        operationId: createOrder
        parameters:
          - name: id
            in: path
            value: $inputs.id
          - reference: $components.parameters.page
            value: 3
        requestBody:
          contentType: application/json
          payload: {"item": "book"}
          replacements:
            - target: /item
              value: $inputs.item
        successCriteria:
          - condition: $statusCode == 201
          - context: $response.body
            condition: ^ok
            type: regex
        onSuccess:
          - reference: $components.successActions.done
        onFailure:
          - name: unavailable
            type: goto
            workflowId: login
            httpStatusCode: 503
          - name: again
            type: retry
            retryAfter: 1.5
            retryLimit: 3
    outputs:
      orderId: $steps.create-order.outputs.id
  - workflowId: login
    steps:
      - stepId: authenticate
"#,
        );

        let spec = build(&raw).unwrap();
        assert_eq!(spec.arazzo(), "1.0.0");
        assert_eq!(spec.info().title, "Shop");
        assert_eq!(spec.source_descriptions().len(), 1);
        assert_eq!(spec.generation_order(), vec!["login", "checkout"]);
        assert_eq!(
            spec.metadata().get("x-owner"),
            Some(&Value::String("platform-team".to_string()))
        );

        let checkout = spec.workflow("checkout").unwrap();
        assert_eq!(checkout.outputs.len(), 1);

        let step = checkout.get_step("create-order").unwrap();
        assert_eq!(step.parameters.len(), 2);
        assert_eq!(step.parameters[0].location, ParameterLocation::Path);
        assert!(step.parameters[0].origin.is_none());

        let page = &step.parameters[1];
        assert_eq!(page.name, "page");
        assert_eq!(page.value, Value::from(3));
        assert_eq!(page.origin.as_ref().unwrap().name, "page");

        let body = step.request_body.as_ref().unwrap();
        assert_eq!(body.content_type.as_deref(), Some("application/json"));
        assert_eq!(body.replacements.len(), 1);

        assert_eq!(step.success_criteria.len(), 2);
        assert_eq!(step.success_criteria[1].kind, CriterionKind::Regex);

        assert_eq!(step.on_success.len(), 1);
        assert_eq!(step.on_success[0].kind, ActionKind::End);
        assert!(step.on_success[0].origin.is_some());

        assert_eq!(step.on_failure[0].http_status_code, Some(503));
        assert_eq!(step.on_failure[0].kind.target(), Some("login"));
        assert_eq!(
            step.on_failure[1].kind,
            FailureKind::Retry {
                retry_after: Some(1.5),
                retry_limit: Some(3)
            }
        );
    }

    #[test]
    fn test_duplicate_workflow_id_rejected() {
        let raw = spec(
            r#"
workflows:
  - workflowId: checkout
    steps: [{stepId: a}]
  - workflowId: checkout
    steps: [{stepId: b}]
"#,
        );

        let err = build(&raw).unwrap_err();
        assert!(matches!(err, ValidationError::DuplicateWorkflowId(ref id) if id == "checkout"));
    }

    #[test]
    fn test_unknown_dependency_rejected() {
        let raw = spec(
            r#"
workflows:
  - workflowId: checkout
    dependsOn: [ghost]
    steps: [{stepId: a}]
"#,
        );

        let err = build(&raw).unwrap_err();
        assert!(matches!(
            err,
            ValidationError::UnknownDependency { ref reference, .. } if reference == "ghost"
        ));
    }

    #[test]
    fn test_duplicate_step_id_rejected() {
        let raw = spec(
            r#"
workflows:
  - workflowId: checkout
    steps:
      - stepId: pay
      - stepId: pay
"#,
        );

        let err = build(&raw).unwrap_err();
        assert!(matches!(err, ValidationError::DuplicateStepId { ref step_id, .. } if step_id == "pay"));
    }

    #[test]
    fn test_same_step_id_in_different_workflows_allowed() {
        let raw = spec(
            r#"
workflows:
  - workflowId: a
    steps: [{stepId: call}]
  - workflowId: b
    steps: [{stepId: call}]
"#,
        );
        assert!(build(&raw).is_ok());
    }

    #[test]
    fn test_empty_workflow_rejected() {
        let raw = spec(
            r#"
workflows:
  - workflowId: hollow
    steps: []
"#,
        );
        let err = build(&raw).unwrap_err();
        assert!(matches!(err, ValidationError::EmptyWorkflow(ref id) if id == "hollow"));
    }

    #[test]
    fn test_cycle_surfaces_as_validation_error() {
        let raw = spec(
            r#"
workflows:
  - workflowId: a
    dependsOn: [b]
    steps: [{stepId: s}]
  - workflowId: b
    dependsOn: [a]
    steps: [{stepId: s}]
"#,
        );

        match build(&raw).unwrap_err() {
            ValidationError::CyclicDependency(cycle) => {
                assert!(cycle.involves("a"));
                assert!(cycle.involves("b"));
            }
            other => panic!("Expected cyclic dependency, got {:?}", other),
        }
    }

    #[test]
    fn test_unknown_action_targets_rejected() {
        let raw = spec(
            r#"
workflows:
  - workflowId: main
    steps:
      - stepId: first
        onSuccess:
          - name: next
            type: goto
            workflowId: nowhere
        onFailure:
          - name: back
            type: goto
            stepId: missing
"#,
        );

        let err = build(&raw).unwrap_err();
        let violations = err.violations();
        assert_eq!(violations.len(), 2);
        assert!(violations.iter().any(|e| matches!(
            e,
            ValidationError::UnknownWorkflowReference { reference, .. } if reference == "nowhere"
        )));
        assert!(violations.iter().any(|e| matches!(
            e,
            ValidationError::UnknownStepReference { reference, .. } if reference == "missing"
        )));
    }

    #[test]
    fn test_goto_step_within_workflow_allowed() {
        let raw = spec(
            r#"
workflows:
  - workflowId: main
    steps:
      - stepId: first
        onFailure:
          - name: again
            type: goto
            stepId: first
"#,
        );

        let spec = build(&raw).unwrap();
        let step = &spec.workflow("main").unwrap().steps[0];
        assert_eq!(step.on_failure[0].kind.step_target(), Some("first"));
    }

    #[test]
    fn test_delegating_step_must_name_known_workflow() {
        let raw = spec(
            r#"
workflows:
  - workflowId: main
    steps:
      - stepId: delegate
        workflowId: ghost
"#,
        );
        let err = build(&raw).unwrap_err();
        assert!(matches!(err, ValidationError::UnknownWorkflowReference { .. }));
    }

    #[test]
    fn test_missing_component_rejected() {
        let raw = spec(
            r#"
workflows:
  - workflowId: main
    steps:
      - stepId: first
        parameters:
          - reference: $components.parameters.absent
"#,
        );

        let err = build(&raw).unwrap_err();
        assert!(matches!(
            err,
            ValidationError::UnknownComponent { ref reference, .. } if reference == "$components.parameters.absent"
        ));
    }

    #[test]
    fn test_misplaced_and_malformed_references_rejected() {
        let raw = spec(
            r#"
components:
  successActions:
    done:
      name: done
      type: end
workflows:
  - workflowId: main
    steps:
      - stepId: first
        onFailure:
          - reference: $components.successActions.done
        parameters:
          - reference: components/parameters/page
"#,
        );

        let err = build(&raw).unwrap_err();
        let violations = err.violations();
        assert!(violations
            .iter()
            .any(|e| matches!(e, ValidationError::MisplacedReference { .. })));
        assert!(violations
            .iter()
            .any(|e| matches!(e, ValidationError::MalformedReference { .. })));
    }

    #[test]
    fn test_goto_without_target_rejected() {
        let raw = spec(
            r#"
workflows:
  - workflowId: main
    steps:
      - stepId: first
        onSuccess:
          - name: lost
            type: goto
"#,
        );
        let err = build(&raw).unwrap_err();
        assert!(matches!(err, ValidationError::Specification(_)));
        assert!(err.to_string().contains("lost"));
    }

    #[test]
    fn test_malformed_document_reports_locator() {
        let raw = parse("info: {title: x, version: '1'}\nworkflows: []\n");
        let err = build_with_locator(&raw, "spec.yaml").unwrap_err();
        match err {
            ValidationError::Specification(e) => {
                assert_eq!(e.locator.as_deref(), Some("spec.yaml"));
                assert!(e.message.contains("arazzo"));
            }
            other => panic!("Expected specification error, got {:?}", other),
        }
    }

    #[test]
    fn test_collects_all_violations() {
        let raw = spec(
            r#"
workflows:
  - workflowId: a
    dependsOn: [ghost]
    steps: []
  - workflowId: a
    steps: [{stepId: x}, {stepId: x}]
"#,
        );

        let err = build(&raw).unwrap_err();
        assert_eq!(err.violations().len(), 4);
    }

    #[test]
    fn test_duplicate_dependencies_collapsed() {
        let raw = spec(
            r#"
workflows:
  - workflowId: b
    dependsOn: [a, a]
    steps: [{stepId: s}]
  - workflowId: a
    steps: [{stepId: s}]
"#,
        );
        let spec = build(&raw).unwrap();
        assert_eq!(spec.workflow("b").unwrap().depends_on, vec!["a"]);
    }
}
