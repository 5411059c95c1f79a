//! Dependency Resolver
//!
//! Orders workflows so that every workflow comes after the workflows
//! named in its `dependsOn`. Uses Kahn's algorithm; among workflows that
//! are ready at the same time the one declared first in the document wins,
//! which keeps the output stable across runs.

use std::collections::{BTreeSet, HashMap};

use log::debug;

use super::model::Workflow;
use crate::error::CyclicDependencyError;

/// Returns workflow ids in generation order.
///
/// Ids in `dependsOn` that name no workflow in `workflows` are ignored here;
/// the builder reports them.
///
/// # Example
///
/// ```
/// use arazzo_gen::workflow::{resolver, Workflow};
///
/// let workflows = vec![
///     Workflow::new("checkout").depends_on("login"),
///     Workflow::new("login"),
/// ];
/// assert_eq!(resolver::order(&workflows).unwrap(), vec!["login", "checkout"]);
/// ```
pub fn order(workflows: &[Workflow]) -> Result<Vec<String>, CyclicDependencyError> {
    Ok(order_indices(workflows)?
        .into_iter()
        .map(|index| workflows[index].workflow_id.clone())
        .collect())
}

/// Same as [`order`] but yields indices into `workflows`.
pub fn order_indices(workflows: &[Workflow]) -> Result<Vec<usize>, CyclicDependencyError> {
    let index_of: HashMap<&str, usize> = workflows
        .iter()
        .enumerate()
        .map(|(index, w)| (w.workflow_id.as_str(), index))
        .collect();

    // dependencies[i] = indices workflow i waits for, dependents[j] = indices waiting for j
    let mut dependencies: Vec<BTreeSet<usize>> = vec![BTreeSet::new(); workflows.len()];
    let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); workflows.len()];

    for (index, workflow) in workflows.iter().enumerate() {
        for dependency in &workflow.depends_on {
            let Some(&dep_index) = index_of.get(dependency.as_str()) else {
                continue;
            };
            if dependencies[index].insert(dep_index) {
                dependents[dep_index].push(index);
            }
        }
    }

    let mut in_degree: Vec<usize> = dependencies.iter().map(BTreeSet::len).collect();

    // Ready set ordered by document index
    let mut ready: BTreeSet<usize> = in_degree
        .iter()
        .enumerate()
        .filter(|(_, degree)| **degree == 0)
        .map(|(index, _)| index)
        .collect();

    let mut sorted_order = Vec::with_capacity(workflows.len());

    while let Some(current) = ready.pop_first() {
        sorted_order.push(current);

        for &dependent in &dependents[current] {
            in_degree[dependent] -= 1;
            if in_degree[dependent] == 0 {
                ready.insert(dependent);
            }
        }
    }

    if sorted_order.len() != workflows.len() {
        let cycle = find_cycle(workflows, &dependencies, &in_degree);
        debug!("Dependency cycle detected: {:?}", cycle);
        return Err(CyclicDependencyError { cycle });
    }

    debug!(
        "Generation order: {:?}",
        sorted_order
            .iter()
            .map(|&index| &workflows[index].workflow_id)
            .collect::<Vec<_>>()
    );

    Ok(sorted_order)
}

/// Extracts one concrete cycle from the workflows left unsorted.
///
/// Every unsorted workflow still waits on at least one unsorted
/// dependency, so following those edges must revisit a workflow.
fn find_cycle(
    workflows: &[Workflow],
    dependencies: &[BTreeSet<usize>],
    in_degree: &[usize],
) -> Vec<String> {
    let unresolved = |index: usize| in_degree[index] > 0;

    let Some(start) = (0..workflows.len()).find(|&index| unresolved(index)) else {
        return Vec::new();
    };

    let mut path: Vec<usize> = Vec::new();
    let mut position: HashMap<usize, usize> = HashMap::new();
    let mut current = start;

    loop {
        if let Some(&first) = position.get(&current) {
            let mut cycle: Vec<String> = path[first..]
                .iter()
                .map(|&index| workflows[index].workflow_id.clone())
                .collect();
            cycle.push(workflows[current].workflow_id.clone());
            return cycle;
        }

        position.insert(current, path.len());
        path.push(current);

        match dependencies[current].iter().copied().find(|&dep| unresolved(dep)) {
            Some(next) => current = next,
            None => {
                return path
                    .iter()
                    .map(|&index| workflows[index].workflow_id.clone())
                    .collect()
            }
        }
    }
}
