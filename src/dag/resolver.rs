// src/dag/resolver.rs

//! Dependency resolution: registry -> deterministic execution order.

use std::collections::{BTreeSet, HashMap};
use std::fmt;

use tracing::debug;

use crate::dag::graph::DependencyGraph;
use crate::dag::registry::{StageName, StageRegistry};
use crate::errors::ResolutionError;

/// A linearization of the dependency graph: every stage appears exactly
/// once, after all of its dependencies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionOrder(Vec<StageName>);

impl ExecutionOrder {
    /// Wrap an explicit order without validating it.
    ///
    /// The executor still refuses orders that name unregistered stages, but
    /// it trusts the caller on dependency placement.
    pub fn from_unchecked(stages: Vec<StageName>) -> Self {
        Self(stages)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|s| s.as_str())
    }

    pub fn as_slice(&self) -> &[StageName] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn position(&self, stage: &str) -> Option<usize> {
        self.0.iter().position(|s| s == stage)
    }

    /// Last stage of the order, whose output is the run result.
    pub fn terminal(&self) -> Option<&str> {
        self.0.last().map(|s| s.as_str())
    }

    pub fn into_vec(self) -> Vec<StageName> {
        self.0
    }
}

impl fmt::Display for ExecutionOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.join(" -> "))
    }
}

/// Compute the execution order for every stage in `registry`.
///
/// Kahn's algorithm: repeatedly take the ready stage (all dependencies
/// placed) with the lowest registration index, so the result is stable for a
/// given registration sequence.
pub fn resolve<T>(registry: &StageRegistry<T>) -> Result<ExecutionOrder, ResolutionError> {
    let graph = DependencyGraph::from_registry(registry);
    resolve_graph(&graph)
}

/// Same as [`resolve`], over an already-derived graph.
pub fn resolve_graph(graph: &DependencyGraph) -> Result<ExecutionOrder, ResolutionError> {
    // Every dependency must name a registered stage.
    for stage in graph.stages() {
        for dep in graph.dependencies_of(stage) {
            if graph.index_of(dep).is_none() {
                return Err(ResolutionError::UnknownDependency {
                    stage: stage.to_string(),
                    dependency: dep.clone(),
                });
            }
        }
    }

    let names: Vec<&str> = graph.stages().collect();
    let mut remaining: HashMap<&str, usize> = names
        .iter()
        .map(|&name| (name, graph.dependencies_of(name).len()))
        .collect();

    // Ready set keyed by registration index.
    let mut ready: BTreeSet<usize> = names
        .iter()
        .enumerate()
        .filter(|(_, name)| remaining[*name] == 0)
        .map(|(i, _)| i)
        .collect();

    let mut order: Vec<StageName> = Vec::with_capacity(names.len());

    while let Some(i) = ready.pop_first() {
        let name = names[i];
        order.push(name.to_string());

        for dependent in graph.dependents_of(name) {
            if let Some(count) = remaining.get_mut(dependent.as_str()) {
                *count -= 1;
                if *count == 0 {
                    if let Some(j) = graph.index_of(dependent) {
                        ready.insert(j);
                    }
                }
            }
        }
    }

    if order.len() < names.len() {
        let unresolved: Vec<&str> = names
            .iter()
            .copied()
            .filter(|name| !order.iter().any(|o| o == name))
            .collect();

        // Stages downstream of a cycle are unresolved too; report the cycle
        // itself when one can be isolated.
        let stages = graph
            .find_cycle(&unresolved)
            .unwrap_or_else(|| unresolved.iter().map(|s| s.to_string()).collect());

        return Err(ResolutionError::CyclicDependency { stages });
    }

    debug!(order = ?order, "resolved execution order");
    Ok(ExecutionOrder(order))
}
