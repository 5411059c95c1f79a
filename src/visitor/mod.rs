//! Visitor Protocol
//!
//! Double dispatch between model nodes and generation backends. Every
//! node implements [`Accept`], which calls exactly the matching
//! capability on a [`Visitor`]. Output goes into an explicit sink passed
//! down with every call; visitors themselves hold no traversal state.
//!
//! The walk helpers fix the traversal order backends may rely on:
//!
//! 1. `info`, then source descriptions
//! 2. workflows in dependency order
//! 3. steps in document order
//! 4. per step: parameters, payload replacements, success criteria,
//!    failure actions, success actions

use crate::error::GenerationError;
use crate::workflow::model::{
    Components, Criterion, FailureAction, Info, MetaData, ParameterObject, PayloadReplacement,
    ReusableObject, SourceDescription, Specification, Step, SuccessAction, Workflow,
};

/// Result of a single visit.
pub type VisitResult = Result<(), GenerationError>;

/// One capability per node variant.
///
/// Variants a backend does not care about are implemented as no-ops.
pub trait Visitor {
    /// Output accumulated while visiting.
    type Sink;

    fn visit_specification(&self, node: &Specification, sink: &mut Self::Sink) -> VisitResult;
    fn visit_info(&self, node: &Info, sink: &mut Self::Sink) -> VisitResult;
    fn visit_source_description(&self, node: &SourceDescription, sink: &mut Self::Sink) -> VisitResult;
    fn visit_workflow(&self, node: &Workflow, sink: &mut Self::Sink) -> VisitResult;
    fn visit_step(&self, node: &Step, sink: &mut Self::Sink) -> VisitResult;
    fn visit_criterion(&self, node: &Criterion, sink: &mut Self::Sink) -> VisitResult;
    fn visit_parameter(&self, node: &ParameterObject, sink: &mut Self::Sink) -> VisitResult;
    fn visit_success_action(&self, node: &SuccessAction, sink: &mut Self::Sink) -> VisitResult;
    fn visit_failure_action(&self, node: &FailureAction, sink: &mut Self::Sink) -> VisitResult;
    fn visit_payload_replacement(&self, node: &PayloadReplacement, sink: &mut Self::Sink) -> VisitResult;
    fn visit_reusable(&self, node: &ReusableObject, sink: &mut Self::Sink) -> VisitResult;
    fn visit_components(&self, node: &Components, sink: &mut Self::Sink) -> VisitResult;
    fn visit_metadata(&self, node: &MetaData, sink: &mut Self::Sink) -> VisitResult;
}

/// Implemented by every model node.
pub trait Accept {
    fn accept<V: Visitor + ?Sized>(&self, visitor: &V, sink: &mut V::Sink) -> VisitResult;
}

macro_rules! accept_via {
    ($($node:ty => $capability:ident),* $(,)?) => {
        $(
            impl Accept for $node {
                fn accept<V: Visitor + ?Sized>(&self, visitor: &V, sink: &mut V::Sink) -> VisitResult {
                    visitor.$capability(self, sink)
                }
            }
        )*
    };
}

accept_via! {
    Specification => visit_specification,
    Info => visit_info,
    SourceDescription => visit_source_description,
    Workflow => visit_workflow,
    Step => visit_step,
    Criterion => visit_criterion,
    ParameterObject => visit_parameter,
    SuccessAction => visit_success_action,
    FailureAction => visit_failure_action,
    PayloadReplacement => visit_payload_replacement,
    ReusableObject => visit_reusable,
    Components => visit_components,
    MetaData => visit_metadata,
}

/// Closed set of model nodes.
#[derive(Debug, Clone, Copy)]
pub enum Node<'a> {
    Specification(&'a Specification),
    Info(&'a Info),
    SourceDescription(&'a SourceDescription),
    Workflow(&'a Workflow),
    Step(&'a Step),
    Criterion(&'a Criterion),
    Parameter(&'a ParameterObject),
    SuccessAction(&'a SuccessAction),
    FailureAction(&'a FailureAction),
    PayloadReplacement(&'a PayloadReplacement),
    Reusable(&'a ReusableObject),
    Components(&'a Components),
    MetaData(&'a MetaData),
}

impl Accept for Node<'_> {
    fn accept<V: Visitor + ?Sized>(&self, visitor: &V, sink: &mut V::Sink) -> VisitResult {
        match *self {
            Node::Specification(node) => node.accept(visitor, sink),
            Node::Info(node) => node.accept(visitor, sink),
            Node::SourceDescription(node) => node.accept(visitor, sink),
            Node::Workflow(node) => node.accept(visitor, sink),
            Node::Step(node) => node.accept(visitor, sink),
            Node::Criterion(node) => node.accept(visitor, sink),
            Node::Parameter(node) => node.accept(visitor, sink),
            Node::SuccessAction(node) => node.accept(visitor, sink),
            Node::FailureAction(node) => node.accept(visitor, sink),
            Node::PayloadReplacement(node) => node.accept(visitor, sink),
            Node::Reusable(node) => node.accept(visitor, sink),
            Node::Components(node) => node.accept(visitor, sink),
            Node::MetaData(node) => node.accept(visitor, sink),
        }
    }
}

impl Node<'_> {
    /// Variant name, mostly for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            Node::Specification(_) => "specification",
            Node::Info(_) => "info",
            Node::SourceDescription(_) => "source description",
            Node::Workflow(_) => "workflow",
            Node::Step(_) => "step",
            Node::Criterion(_) => "criterion",
            Node::Parameter(_) => "parameter",
            Node::SuccessAction(_) => "success action",
            Node::FailureAction(_) => "failure action",
            Node::PayloadReplacement(_) => "payload replacement",
            Node::Reusable(_) => "reusable",
            Node::Components(_) => "components",
            Node::MetaData(_) => "metadata",
        }
    }
}

/// Visits `info`, the source descriptions and then every workflow in
/// dependency order.
pub fn walk_specification<V: Visitor + ?Sized>(
    spec: &Specification,
    visitor: &V,
    sink: &mut V::Sink,
) -> VisitResult {
    spec.info().accept(visitor, sink)?;
    for source in spec.source_descriptions() {
        source.accept(visitor, sink)?;
    }
    for workflow in spec.ordered_workflows() {
        workflow.accept(visitor, sink)?;
    }
    Ok(())
}

/// Visits the steps of a workflow in document order.
pub fn walk_workflow<V: Visitor + ?Sized>(
    workflow: &Workflow,
    visitor: &V,
    sink: &mut V::Sink,
) -> VisitResult {
    for step in &workflow.steps {
        step.accept(visitor, sink)?;
    }
    Ok(())
}

/// Visits the children of a step.
pub fn walk_step<V: Visitor + ?Sized>(step: &Step, visitor: &V, sink: &mut V::Sink) -> VisitResult {
    for parameter in &step.parameters {
        parameter.accept(visitor, sink)?;
    }
    if let Some(body) = &step.request_body {
        for replacement in &body.replacements {
            replacement.accept(visitor, sink)?;
        }
    }
    for criterion in &step.success_criteria {
        criterion.accept(visitor, sink)?;
    }
    for action in &step.on_failure {
        action.accept(visitor, sink)?;
    }
    for action in &step.on_success {
        action.accept(visitor, sink)?;
    }
    Ok(())
}
