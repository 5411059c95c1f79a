//! Documentation Generator
//!
//! Emits one Markdown document per workflow with an embedded PlantUML
//! diagram and a section per step.

use std::collections::BTreeMap;

use log::{debug, info};

use super::engine::Backend;
use crate::error::GenerationError;
use crate::visitor::{walk_specification, walk_step, walk_workflow, Accept, VisitResult, Visitor};
use crate::workflow::model::{
    value_text, ActionKind, Components, Criterion, CriterionKind, FailureAction, FailureKind, Info,
    MetaData, ParameterObject, PayloadReplacement, ReusableObject, SourceDescription,
    Specification, Step, SuccessAction, Workflow,
};

/// Replaces characters PlantUML does not accept in identifiers.
pub fn sanitize(name: &str) -> String {
    name.replace(|c: char| c == ' ' || c == '-', "_")
}

/// File stem shared by every artifact generated for `workflow_id`.
///
/// Lower-cased [`sanitize`] output with path separators replaced and
/// leading dots turned into underscores, so the result is always a single
/// plain file name.
pub fn artifact_stem(workflow_id: &str) -> String {
    let stem: String = sanitize(workflow_id)
        .to_lowercase()
        .chars()
        .map(|c| if matches!(c, '/' | '\\' | ':' | '\0') { '_' } else { c })
        .collect();
    let dots = stem.len() - stem.trim_start_matches('.').len();
    let stem = format!("{}{}", "_".repeat(dots), &stem[dots..]);
    if stem.is_empty() {
        "_".to_string()
    } else {
        stem
    }
}

/// File name of the document generated for `workflow_id`.
pub fn document_name(workflow_id: &str) -> String {
    format!("{}.md", artifact_stem(workflow_id))
}

/// Folds line breaks so a label stays on one diagram line.
fn diagram_label(text: &str) -> String {
    text.replace("\r\n", "\\n")
        .replace(|c: char| c == '\r' || c == '\n', "\\n")
}

/// Display name of a participant; PlantUML has no escape for `"`.
fn display_name(name: &str) -> String {
    diagram_label(name).replace('"', "'")
}

/// A finished Markdown document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    /// File name, e.g. `order_flow.md`
    pub name: String,
    pub workflow_id: String,
    pub content: String,
}

#[derive(Debug)]
struct OpenDocument {
    workflow_id: String,
    content: String,
    /// Diagram identifier -> original name
    participants: BTreeMap<String, String>,
    /// Heading of the list currently being written
    section: Option<&'static str>,
}

impl OpenDocument {
    fn participant(&mut self, original: &str) -> Result<String, GenerationError> {
        self.register(sanitize(original), original)
    }

    /// Participant standing for a workflow this one depends on.
    fn dependency(&mut self, workflow_id: &str) -> Result<String, GenerationError> {
        self.register(format!("WF_{}", sanitize(workflow_id)), workflow_id)
    }

    fn register(&mut self, identifier: String, original: &str) -> Result<String, GenerationError> {
        if let Some(first) = self.participants.get(&identifier) {
            return Err(GenerationError::ParticipantCollision {
                workflow_id: self.workflow_id.clone(),
                identifier,
                first: first.clone(),
                second: original.to_string(),
            });
        }
        self.participants.insert(identifier.clone(), original.to_string());
        Ok(identifier)
    }

    /// Starts a bulleted list under `heading` unless it is already open.
    fn section(&mut self, heading: &'static str) {
        if self.section != Some(heading) {
            self.end_section();
            self.content.push_str(&format!("**{}**:\n\n", heading));
            self.section = Some(heading);
        }
    }

    fn end_section(&mut self) {
        if self.section.take().is_some() {
            self.content.push('\n');
        }
    }
}

/// Sink of the documentation backend.
///
/// Holds finished documents plus at most one document being written.
#[derive(Debug, Default)]
pub struct DocumentSet {
    documents: Vec<Document>,
    open: Option<OpenDocument>,
}

impl DocumentSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn documents(&self) -> &[Document] {
        &self.documents
    }

    pub fn into_documents(self) -> Vec<Document> {
        self.documents
    }

    fn begin(&mut self, workflow_id: &str) -> Result<&mut OpenDocument, GenerationError> {
        if self.open.is_some() {
            return Err(GenerationError::AlreadyOpen("document"));
        }
        Ok(self.open.insert(OpenDocument {
            workflow_id: workflow_id.to_string(),
            content: String::new(),
            participants: BTreeMap::new(),
            section: None,
        }))
    }

    fn current(&mut self) -> Result<&mut OpenDocument, GenerationError> {
        self.open.as_mut().ok_or(GenerationError::NoOpenTarget("document"))
    }

    fn close(&mut self) -> Result<(), GenerationError> {
        let mut open = self.open.take().ok_or(GenerationError::NoOpenTarget("document"))?;
        open.end_section();
        self.documents.push(Document {
            name: document_name(&open.workflow_id),
            workflow_id: open.workflow_id,
            content: open.content,
        });
        Ok(())
    }

    /// Drops a half-written document after a failure.
    fn abandon(&mut self) {
        self.open = None;
    }
}

/// Diagram styling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiagramSkin {
    pub background_color: String,
    pub handwritten: bool,
}

impl Default for DiagramSkin {
    fn default() -> Self {
        Self {
            background_color: "#EEEBDC".to_string(),
            handwritten: true,
        }
    }
}

/// Markdown + PlantUML documentation backend.
#[derive(Debug, Clone, Default)]
pub struct DocumentationGenerator {
    skin: DiagramSkin,
}

impl DocumentationGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_skin(mut self, skin: DiagramSkin) -> Self {
        self.skin = skin;
        self
    }

    fn write_workflow(&self, workflow: &Workflow, sink: &mut DocumentSet) -> VisitResult {
        let doc = sink.begin(&workflow.workflow_id)?;

        doc.content.push_str(&format!("# {}\n\n", workflow.workflow_id));
        if let Some(headline) = workflow.headline() {
            doc.content.push_str(&format!("{}\n\n", headline.trim()));
        }

        doc.content.push_str("## Workflow Diagram\n\n```plantuml\n@startuml\n");
        doc.content.push_str(&format!("skinparam backgroundColor {}\n", self.skin.background_color));
        doc.content.push_str(&format!("skinparam handwritten {}\n\n", self.skin.handwritten));

        let workflow_participant = doc.participant(&workflow.workflow_id)?;
        doc.content.push_str(&format!(
            "participant \"{}\" as {}\n",
            display_name(&workflow.workflow_id),
            workflow_participant
        ));

        let mut step_participants = Vec::with_capacity(workflow.steps.len());
        for step in &workflow.steps {
            let participant = doc.participant(&step.step_id)?;
            doc.content.push_str(&format!(
                "participant \"{}\" as {}\n",
                display_name(&step.step_id),
                participant
            ));
            step_participants.push(participant);
        }

        for dependency in &workflow.depends_on {
            let participant = doc.dependency(dependency)?;
            doc.content.push_str(&format!("{} --> {}\n", participant, workflow_participant));
        }

        for (step, participant) in workflow.steps.iter().zip(&step_participants) {
            let label = diagram_label(step.description_text().trim());
            if label.is_empty() {
                doc.content.push_str(&format!("{} --> {}\n", workflow_participant, participant));
            } else {
                doc.content.push_str(&format!("{} --> {} : {}\n", workflow_participant, participant, label));
            }
        }

        doc.content.push_str("@enduml\n```\n\n## Steps\n\n");

        walk_workflow(workflow, self, sink)?;

        if !workflow.outputs.is_empty() {
            let doc = sink.current()?;
            doc.end_section();
            doc.content.push_str("## Outputs\n\n| Name | Expression |\n|------|------------|\n");
            for (name, expression) in &workflow.outputs {
                doc.content.push_str(&format!("| {} | `{}` |\n", name, expression));
            }
            doc.content.push('\n');
        }

        sink.close()
    }
}

impl Visitor for DocumentationGenerator {
    type Sink = DocumentSet;

    fn visit_specification(&self, node: &Specification, sink: &mut DocumentSet) -> VisitResult {
        info!("Generating documentation for '{}'", node.info().title);
        walk_specification(node, self, sink)
    }

    fn visit_info(&self, _node: &Info, _sink: &mut DocumentSet) -> VisitResult {
        Ok(())
    }

    fn visit_source_description(&self, _node: &SourceDescription, _sink: &mut DocumentSet) -> VisitResult {
        Ok(())
    }

    fn visit_workflow(&self, node: &Workflow, sink: &mut DocumentSet) -> VisitResult {
        debug!("Documenting workflow '{}'", node.workflow_id);
        let result = self.write_workflow(node, sink);
        if result.is_err() {
            sink.abandon();
        }
        result
    }

    fn visit_step(&self, node: &Step, sink: &mut DocumentSet) -> VisitResult {
        let doc = sink.current()?;
        doc.end_section();

        doc.content.push_str(&format!("### {}\n\n**ID**: {}\n\n", node.step_id, node.step_id));
        let description = node.description_text().trim();
        if !description.is_empty() {
            doc.content.push_str(&format!("{}\n\n", description));
        }
        if let Some(operation_id) = &node.operation_id {
            doc.content.push_str(&format!("**Operation**: `{}`\n\n", operation_id));
        } else if let Some(path) = &node.operation_path {
            doc.content.push_str(&format!("**Operation path**: `{}`\n\n", path));
        }
        if let Some(workflow_id) = &node.workflow_id {
            doc.content.push_str(&format!("**Runs workflow**: `{}`\n\n", workflow_id));
        }

        walk_step(node, self, sink)?;
        sink.current()?.end_section();
        Ok(())
    }

    fn visit_criterion(&self, node: &Criterion, sink: &mut DocumentSet) -> VisitResult {
        let doc = sink.current()?;
        doc.section("Success criteria");

        let kind = match node.kind {
            CriterionKind::Simple => None,
            CriterionKind::Regex => Some("regex"),
            CriterionKind::JsonPath => Some("jsonpath"),
            CriterionKind::XPath => Some("xpath"),
        };
        let line = match (kind, &node.context) {
            (Some(kind), Some(context)) => format!("- {} on `{}`: `{}`\n", kind, context, node.condition),
            (Some(kind), None) => format!("- {}: `{}`\n", kind, node.condition),
            (None, _) => format!("- `{}`\n", node.condition),
        };
        doc.content.push_str(&line);
        Ok(())
    }

    fn visit_parameter(&self, node: &ParameterObject, sink: &mut DocumentSet) -> VisitResult {
        let doc = sink.current()?;
        doc.section("Parameters");
        doc.content.push_str(&format!(
            "- `{}` ({}): `{}`",
            node.name,
            node.location.as_str(),
            node.value_text()
        ));
        if let Some(origin) = &node.origin {
            origin.accept(self, sink)?;
        }
        sink.current()?.content.push('\n');
        Ok(())
    }

    fn visit_success_action(&self, node: &SuccessAction, sink: &mut DocumentSet) -> VisitResult {
        let doc = sink.current()?;
        doc.section("On success");
        let effect = match &node.kind {
            ActionKind::End => "end workflow".to_string(),
            ActionKind::Goto { workflow_id } => format!("continue to workflow `{}`", workflow_id),
            ActionKind::GotoStep { step_id } => format!("go to step `{}`", step_id),
        };
        doc.content.push_str(&format!("- `{}`: {}", node.name, effect));
        if let Some(origin) = &node.origin {
            origin.accept(self, sink)?;
        }
        sink.current()?.content.push('\n');
        Ok(())
    }

    fn visit_failure_action(&self, node: &FailureAction, sink: &mut DocumentSet) -> VisitResult {
        let doc = sink.current()?;
        doc.section("On failure");
        let effect = match &node.kind {
            FailureKind::End => "end workflow".to_string(),
            FailureKind::Goto { workflow_id } => format!("continue to workflow `{}`", workflow_id),
            FailureKind::GotoStep { step_id } => format!("go to step `{}`", step_id),
            FailureKind::Retry {
                retry_after,
                retry_limit,
            } => retry_text(*retry_after, *retry_limit),
        };
        doc.content.push_str(&format!("- `{}`: {}", node.name, effect));
        if let Some(code) = node.http_status_code {
            doc.content.push_str(&format!(" (HTTP {})", code));
        }
        if let Some(origin) = &node.origin {
            origin.accept(self, sink)?;
        }
        sink.current()?.content.push('\n');
        Ok(())
    }

    fn visit_payload_replacement(&self, node: &PayloadReplacement, sink: &mut DocumentSet) -> VisitResult {
        let doc = sink.current()?;
        doc.section("Request body replacements");
        doc.content.push_str(&format!("- `{}` = `{}`\n", node.target, value_text(&node.value)));
        Ok(())
    }

    fn visit_reusable(&self, node: &ReusableObject, sink: &mut DocumentSet) -> VisitResult {
        sink.current()?.content.push_str(&format!(" (from `{}`)", node.reference));
        Ok(())
    }

    fn visit_components(&self, _node: &Components, _sink: &mut DocumentSet) -> VisitResult {
        Ok(())
    }

    fn visit_metadata(&self, _node: &MetaData, _sink: &mut DocumentSet) -> VisitResult {
        Ok(())
    }
}

impl Backend for DocumentationGenerator {
    type Artifact = Document;

    fn name(&self) -> &'static str {
        "documentation"
    }

    fn new_sink(&self) -> DocumentSet {
        DocumentSet::new()
    }

    fn finish(&self, workflow: &Workflow, sink: DocumentSet) -> Result<Document, GenerationError> {
        sink.into_documents()
            .into_iter()
            .find(|d| d.workflow_id == workflow.workflow_id)
            .ok_or_else(|| GenerationError::MissingArtifact(workflow.workflow_id.clone()))
    }

    fn artifact_name(&self, workflow: &Workflow) -> Option<String> {
        Some(document_name(&workflow.workflow_id))
    }
}

pub(crate) fn retry_text(retry_after: Option<f64>, retry_limit: Option<u32>) -> String {
    let mut text = String::from("retry");
    if let Some(after) = retry_after {
        text.push_str(&format!(" after {}s", after));
    }
    if let Some(limit) = retry_limit {
        text.push_str(&format!(" (at most {} times)", limit));
    }
    text
}
