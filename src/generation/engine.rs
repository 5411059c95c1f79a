//! Generation Engine
//!
//! Drives a [`Backend`] over every workflow of a [`Specification`]:
//! - Workflows are processed in dependency order
//! - Each workflow is emitted into its own fresh sink, so an artifact is
//!   either complete or absent
//! - Optional parallel generation over scoped worker threads; results are
//!   reassembled in dependency order before being returned
//! - Backend failures are scoped to a workflow and collected in the report
//! - A workflow whose artifact name is already taken fails instead of
//!   replacing the earlier artifact

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::mpsc::{channel, Sender};
use std::thread;

use log::{debug, error, info, warn};

use crate::error::GenerationError;
use crate::monitoring::{EventType, GenerationTimeline};
use crate::visitor::{Accept, Visitor};
use crate::workflow::{Specification, Workflow};

/// A visitor that turns one workflow at a time into an artifact.
pub trait Backend: Visitor + Sync {
    /// What one workflow turns into.
    type Artifact: Send;

    /// Short name used in log output.
    fn name(&self) -> &'static str;

    /// Creates the empty sink a workflow is emitted into.
    fn new_sink(&self) -> Self::Sink;

    /// Extracts the artifact once the workflow has been visited.
    fn finish(&self, workflow: &Workflow, sink: Self::Sink) -> Result<Self::Artifact, GenerationError>;

    /// Name the artifact of `workflow` is stored under, if it has one.
    ///
    /// Two workflows mapping to the same name fail the later one.
    fn artifact_name(&self, _workflow: &Workflow) -> Option<String> {
        None
    }
}

/// Emits a single workflow through `backend`.
pub fn generate_workflow<B: Backend + ?Sized>(
    backend: &B,
    workflow: &Workflow,
) -> Result<B::Artifact, GenerationError> {
    let mut sink = backend.new_sink();
    workflow.accept(backend, &mut sink)?;
    backend.finish(workflow, sink)
}

/// Runs `backend` over every workflow sequentially, continuing past failures.
///
/// # Example
///
/// ```rust,no_run
/// use arazzo_gen::generation::{generate, DocumentationGenerator};
/// use arazzo_gen::load_and_build;
///
/// fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let spec = load_and_build("shop.arazzo.yaml")?;
///     let report = generate(&spec, &DocumentationGenerator::new());
///     for (workflow_id, document) in report.artifacts() {
///         println!("{}: {}", workflow_id, document.name);
///     }
///     Ok(())
/// }
/// ```
pub fn generate<B: Backend>(spec: &Specification, backend: &B) -> GenerationReport<B::Artifact> {
    Generator::new(backend).run(spec)
}

/// A backend failure for one workflow.
#[derive(Debug)]
pub struct GenerationFailure {
    pub workflow_id: String,
    pub error: GenerationError,
}

/// Outcome of a generation run, in dependency order.
#[derive(Debug)]
pub struct GenerationReport<A> {
    artifacts: Vec<(String, A)>,
    failures: Vec<GenerationFailure>,
    skipped: Vec<String>,
    timeline: GenerationTimeline,
}

impl<A> GenerationReport<A> {
    /// Artifacts keyed by workflow id.
    pub fn artifacts(&self) -> impl Iterator<Item = (&str, &A)> + '_ {
        self.artifacts.iter().map(|(id, a)| (id.as_str(), a))
    }

    pub fn into_artifacts(self) -> Vec<(String, A)> {
        self.artifacts
    }

    pub fn failures(&self) -> &[GenerationFailure] {
        &self.failures
    }

    /// Workflows never attempted because the run stopped early.
    pub fn skipped(&self) -> &[String] {
        &self.skipped
    }

    pub fn timeline(&self) -> &GenerationTimeline {
        &self.timeline
    }

    /// Returns true if every workflow produced an artifact.
    pub fn is_success(&self) -> bool {
        self.failures.is_empty() && self.skipped.is_empty()
    }
}

enum WorkerEvent<A> {
    Started(usize),
    Finished(usize, Result<A, GenerationError>),
}

/// Configurable generation driver.
///
/// # Example
///
/// ```rust,no_run
/// use arazzo_gen::generation::{Generator, SuiteGenerator};
/// use arazzo_gen::load_and_build;
///
/// fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let spec = load_and_build("shop.arazzo.yaml")?;
///     let backend = SuiteGenerator::new();
///     let mut generator = Generator::new(&backend);
///     generator.set_max_parallel(4);
///     generator.set_fail_fast(true);
///
///     let report = generator.run(&spec);
///     println!("{} suites", report.artifacts().count());
///     Ok(())
/// }
/// ```
pub struct Generator<'a, B: Backend> {
    backend: &'a B,
    max_parallel: usize,
    fail_fast: bool,
}

impl<'a, B: Backend> Generator<'a, B> {
    /// Creates a sequential generator.
    pub fn new(backend: &'a B) -> Self {
        Self {
            backend,
            max_parallel: 1,
            fail_fast: false,
        }
    }

    /// Sets the number of worker threads; `0` means one per CPU.
    pub fn set_max_parallel(&mut self, max: usize) {
        self.max_parallel = if max == 0 { num_cpus::get() } else { max };
    }

    /// Stops at the first failing workflow instead of continuing.
    pub fn set_fail_fast(&mut self, fail_fast: bool) {
        self.fail_fast = fail_fast;
    }

    /// Generates every workflow of `spec`.
    pub fn run(&self, spec: &Specification) -> GenerationReport<B::Artifact> {
        let workflows: Vec<&Workflow> = spec.ordered_workflows().collect();
        let workers = self.max_parallel.min(workflows.len()).max(1);

        info!(
            "Generating {} workflows with {} backend (workers: {}, fail fast: {})",
            workflows.len(),
            self.backend.name(),
            workers,
            self.fail_fast
        );

        let mut timeline = GenerationTimeline::new();
        let results = if workers == 1 {
            self.run_sequential(&workflows, &mut timeline)
        } else {
            self.run_parallel(&workflows, workers, &mut timeline)
        };

        let mut report = GenerationReport {
            artifacts: Vec::new(),
            failures: Vec::new(),
            skipped: Vec::new(),
            timeline,
        };

        // artifact name -> workflow that claimed it first
        let mut names: HashMap<String, String> = HashMap::new();

        for (workflow, result) in workflows.iter().zip(results) {
            let workflow_id = workflow.workflow_id.clone();
            let result = match (result, self.backend.artifact_name(workflow)) {
                (Some(Ok(artifact)), Some(name)) => match names.get(&name) {
                    Some(first) => {
                        error!("Workflow '{}' overwrites artifact '{}' of '{}'", workflow_id, name, first);
                        Some(Err(GenerationError::ArtifactNameCollision {
                            name,
                            first: first.clone(),
                            second: workflow_id.clone(),
                        }))
                    }
                    None => {
                        names.insert(name, workflow_id.clone());
                        Some(Ok(artifact))
                    }
                },
                (result, _) => result,
            };
            match result {
                Some(Ok(artifact)) => report.artifacts.push((workflow_id, artifact)),
                Some(Err(error)) => report.failures.push(GenerationFailure { workflow_id, error }),
                None => report.skipped.push(workflow_id),
            }
        }

        if !report.skipped.is_empty() {
            warn!("Skipped workflows: {:?}", report.skipped);
        }
        info!(
            "Generation finished: {} artifacts, {} failures",
            report.artifacts.len(),
            report.failures.len()
        );

        report
    }

    fn run_sequential(
        &self,
        workflows: &[&Workflow],
        timeline: &mut GenerationTimeline,
    ) -> Vec<Option<Result<B::Artifact, GenerationError>>> {
        let mut results = Vec::with_capacity(workflows.len());

        for workflow in workflows {
            if self.fail_fast && results.iter().any(|r| matches!(r, Some(Err(_)))) {
                results.push(None);
                continue;
            }

            timeline.record(&workflow.workflow_id, EventType::Started);
            let result = generate_workflow(self.backend, workflow);
            self.log_result(&workflow.workflow_id, &result, timeline);
            results.push(Some(result));
        }

        results
    }

    fn run_parallel(
        &self,
        workflows: &[&Workflow],
        workers: usize,
        timeline: &mut GenerationTimeline,
    ) -> Vec<Option<Result<B::Artifact, GenerationError>>> {
        let mut results: Vec<Option<Result<B::Artifact, GenerationError>>> =
            (0..workflows.len()).map(|_| None).collect();

        let next = AtomicUsize::new(0);
        let stop = AtomicBool::new(false);
        let (tx, rx) = channel::<WorkerEvent<B::Artifact>>();

        thread::scope(|scope| {
            let handles: Vec<_> = (0..workers)
                .map(|worker| {
                    let tx: Sender<WorkerEvent<B::Artifact>> = tx.clone();
                    let (next, stop) = (&next, &stop);
                    scope.spawn(move || {
                        debug!("Worker {} started", worker);
                        while !stop.load(Ordering::Relaxed) {
                            let position = next.fetch_add(1, Ordering::Relaxed);
                            let Some(workflow) = workflows.get(position) else {
                                break;
                            };
                            if tx.send(WorkerEvent::Started(position)).is_err() {
                                break;
                            }
                            let result = generate_workflow(self.backend, workflow);
                            if result.is_err() && self.fail_fast {
                                stop.store(true, Ordering::Relaxed);
                            }
                            if let Err(e) = tx.send(WorkerEvent::Finished(position, result)) {
                                error!("Failed to send generation result: {}", e);
                                break;
                            }
                        }
                    })
                })
                .collect();
            drop(tx);

            for event in rx {
                match event {
                    WorkerEvent::Started(position) => {
                        timeline.record(&workflows[position].workflow_id, EventType::Started);
                    }
                    WorkerEvent::Finished(position, result) => {
                        self.log_result(&workflows[position].workflow_id, &result, timeline);
                        results[position] = Some(result);
                    }
                }
            }

            for handle in handles {
                if handle.join().is_err() {
                    error!("Generation worker panicked");
                }
            }
        });

        // A workflow that started but never reported back lost its worker
        let started: Vec<usize> = timeline
            .events()
            .iter()
            .filter(|e| e.event_type == EventType::Started)
            .filter_map(|e| workflows.iter().position(|w| w.workflow_id == e.workflow_id))
            .collect();
        for position in started {
            if results[position].is_none() {
                results[position] = Some(Err(GenerationError::Worker(format!(
                    "worker stopped while generating '{}'",
                    workflows[position].workflow_id
                ))));
            }
        }

        results
    }

    fn log_result(
        &self,
        workflow_id: &str,
        result: &Result<B::Artifact, GenerationError>,
        timeline: &mut GenerationTimeline,
    ) {
        match result {
            Ok(_) => {
                debug!("Workflow '{}' generated", workflow_id);
                timeline.record(workflow_id, EventType::Completed);
            }
            Err(e) => {
                error!("Workflow '{}' failed: {}", workflow_id, e);
                timeline.record(workflow_id, EventType::Failed);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::visitor::{walk_step, walk_workflow, VisitResult};
    use crate::workflow::build;
    use crate::workflow::model::*;
    use serde_json::json;

    /// Emits "workflow:step,step" and fails on workflows named "broken".
    struct Listing;

    impl Visitor for Listing {
        type Sink = Vec<String>;

        fn visit_specification(&self, _: &Specification, _: &mut Vec<String>) -> VisitResult {
            Ok(())
        }
        fn visit_info(&self, _: &Info, _: &mut Vec<String>) -> VisitResult {
            Ok(())
        }
        fn visit_source_description(&self, _: &SourceDescription, _: &mut Vec<String>) -> VisitResult {
            Ok(())
        }
        fn visit_workflow(&self, node: &Workflow, sink: &mut Vec<String>) -> VisitResult {
            if node.workflow_id == "broken" {
                return Err(GenerationError::Render {
                    name: node.workflow_id.clone(),
                    message: "refused".to_string(),
                });
            }
            sink.push(node.workflow_id.clone());
            walk_workflow(node, self, sink)
        }
        fn visit_step(&self, node: &Step, sink: &mut Vec<String>) -> VisitResult {
            sink.push(node.step_id.clone());
            walk_step(node, self, sink)
        }
        fn visit_criterion(&self, _: &Criterion, _: &mut Vec<String>) -> VisitResult {
            Ok(())
        }
        fn visit_parameter(&self, _: &ParameterObject, _: &mut Vec<String>) -> VisitResult {
            Ok(())
        }
        fn visit_success_action(&self, _: &SuccessAction, _: &mut Vec<String>) -> VisitResult {
            Ok(())
        }
        fn visit_failure_action(&self, _: &FailureAction, _: &mut Vec<String>) -> VisitResult {
            Ok(())
        }
        fn visit_payload_replacement(&self, _: &PayloadReplacement, _: &mut Vec<String>) -> VisitResult {
            Ok(())
        }
        fn visit_reusable(&self, _: &ReusableObject, _: &mut Vec<String>) -> VisitResult {
            Ok(())
        }
        fn visit_components(&self, _: &Components, _: &mut Vec<String>) -> VisitResult {
            Ok(())
        }
        fn visit_metadata(&self, _: &MetaData, _: &mut Vec<String>) -> VisitResult {
            Ok(())
        }
    }

    impl Backend for Listing {
        type Artifact = String;

        fn name(&self) -> &'static str {
            "listing"
        }

        fn new_sink(&self) -> Vec<String> {
            Vec::new()
        }

        fn finish(&self, _workflow: &Workflow, sink: Vec<String>) -> Result<String, GenerationError> {
            let (head, steps) = sink.split_first().ok_or(GenerationError::NoOpenTarget("listing"))?;
            Ok(format!("{}:{}", head, steps.join(",")))
        }
    }

    fn spec(ids: &[&str]) -> Specification {
        let workflows: Vec<_> = ids
            .iter()
            .enumerate()
            .map(|(index, id)| {
                let mut workflow = json!({
                    "workflowId": id,
                    "steps": [{"stepId": "s1"}, {"stepId": "s2"}]
                });
                // Chain every workflow onto the previous one, in reverse
                if index + 1 < ids.len() {
                    workflow["dependsOn"] = json!([ids[index + 1]]);
                }
                workflow
            })
            .collect();

        build(&json!({
            "arazzo": "1.0.0",
            "info": {"title": "Test", "version": "1"},
            "workflows": workflows
        }))
        .unwrap()
    }

    #[test]
    fn test_generate_in_dependency_order() {
        let spec = spec(&["c", "b", "a"]);
        let report = generate(&spec, &Listing);

        assert!(report.is_success());
        let artifacts: Vec<_> = report.artifacts().map(|(_, a)| a.as_str()).collect();
        assert_eq!(artifacts, vec!["a:s1,s2", "b:s1,s2", "c:s1,s2"]);
        assert_eq!(report.timeline().count(EventType::Completed), 3);
    }

    #[test]
    fn test_failure_is_scoped_to_workflow() {
        let spec = spec(&["c", "broken", "a"]);
        let report = generate(&spec, &Listing);

        assert!(!report.is_success());
        assert_eq!(report.failures().len(), 1);
        assert_eq!(report.failures()[0].workflow_id, "broken");

        let ids: Vec<_> = report.artifacts().map(|(id, _)| id).collect();
        assert_eq!(ids, vec!["a", "c"]);
    }

    #[test]
    fn test_fail_fast_skips_remaining() {
        let spec = spec(&["c", "broken", "a"]);
        let mut generator = Generator::new(&Listing);
        generator.set_fail_fast(true);

        let report = generator.run(&spec);
        assert_eq!(report.failures().len(), 1);
        assert_eq!(report.skipped(), &["c".to_string()]);
        assert_eq!(report.artifacts().count(), 1);
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let ids: Vec<String> = (0..12).map(|i| format!("wf{:02}", i)).collect();
        let ids: Vec<&str> = ids.iter().map(String::as_str).collect();
        let spec = spec(&ids);

        let sequential = generate(&spec, &Listing).into_artifacts();

        let mut generator = Generator::new(&Listing);
        generator.set_max_parallel(4);
        let parallel = generator.run(&spec).into_artifacts();

        assert_eq!(sequential, parallel);
        assert_eq!(parallel.len(), 12);
    }

    #[test]
    fn test_parallel_failure_reported() {
        let spec = spec(&["c", "broken", "a"]);
        let mut generator = Generator::new(&Listing);
        generator.set_max_parallel(3);

        let report = generator.run(&spec);
        assert_eq!(report.failures().len(), 1);
        assert_eq!(report.artifacts().count(), 2);
        assert_eq!(report.timeline().count(EventType::Failed), 1);
    }

    #[test]
    fn test_artifact_name_collision_fails_later_workflow() {
        use crate::generation::{DocumentationGenerator, SuiteGenerator};

        let spec = build(&json!({
            "arazzo": "1.0.0",
            "info": {"title": "Test", "version": "1"},
            "workflows": [
                {"workflowId": "Order Flow", "steps": [{"stepId": "a"}]},
                {"workflowId": "order-flow", "steps": [{"stepId": "b"}]}
            ]
        }))
        .unwrap();

        let docs = generate(&spec, &DocumentationGenerator::new());
        assert!(!docs.is_success());
        let names: Vec<_> = docs.artifacts().map(|(_, d)| d.name.as_str()).collect();
        assert_eq!(names, vec!["order_flow.md"]);
        match &docs.failures()[0].error {
            GenerationError::ArtifactNameCollision { name, first, second } => {
                assert_eq!(name, "order_flow.md");
                assert_eq!(first, "Order Flow");
                assert_eq!(second, "order-flow");
            }
            other => panic!("Expected artifact name collision, got {:?}", other),
        }

        let backend = SuiteGenerator::new();
        let mut generator = Generator::new(&backend);
        generator.set_max_parallel(2);
        let suites = generator.run(&spec);
        assert_eq!(suites.artifacts().count(), 1);
        assert_eq!(suites.failures()[0].workflow_id, "order-flow");
    }

    #[test]
    fn test_zero_parallel_uses_cpu_count() {
        let mut generator = Generator::new(&Listing);
        generator.set_max_parallel(0);
        assert_eq!(generator.max_parallel, num_cpus::get());
    }
}
