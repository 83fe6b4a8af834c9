// src/dag/graph.rs

use std::collections::HashMap;

use petgraph::algo::tarjan_scc;
use petgraph::graphmap::DiGraphMap;

use crate::dag::registry::{StageName, StageRegistry};

/// Internal node structure: stores immediate deps and dependents.
#[derive(Debug, Clone)]
struct DagNode {
    /// Registration position; used for deterministic tie-breaking.
    index: usize,
    /// Direct dependencies, de-duplicated, in declaration order.
    deps: Vec<StageName>,
    /// Direct dependents, in registration order.
    dependents: Vec<StageName>,
}

/// Dependency graph derived from a [`StageRegistry`].
///
/// Nothing here is stored independently of the registry; it is rebuilt on
/// demand and only holds adjacency information. Dependencies that name an
/// unregistered stage are kept in `deps` so the resolver can report them.
#[derive(Debug, Clone)]
pub struct DependencyGraph {
    nodes: HashMap<StageName, DagNode>,
    /// Stage names in registration order.
    order: Vec<StageName>,
}

impl DependencyGraph {
    pub fn from_registry<T>(registry: &StageRegistry<T>) -> Self {
        let mut nodes: HashMap<StageName, DagNode> = HashMap::new();
        let mut order = Vec::with_capacity(registry.len());

        // First pass: create nodes with their dependency lists.
        for (index, stage) in registry.stages().enumerate() {
            let mut deps: Vec<StageName> = Vec::new();
            for dep in stage.dependencies() {
                if !deps.contains(dep) {
                    deps.push(dep.clone());
                }
            }
            nodes.insert(
                stage.name().to_string(),
                DagNode {
                    index,
                    deps,
                    dependents: Vec::new(),
                },
            );
            order.push(stage.name().to_string());
        }

        // Second pass: populate dependents based on deps. Walking in
        // registration order keeps every dependents list in that order.
        for name in order.iter() {
            let deps = nodes
                .get(name)
                .map(|n| n.deps.clone())
                .unwrap_or_default();

            for dep in deps {
                if let Some(dep_node) = nodes.get_mut(&dep) {
                    dep_node.dependents.push(name.clone());
                }
            }
        }

        Self { nodes, order }
    }

    /// All stage names, in registration order.
    pub fn stages(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(|s| s.as_str())
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Registration position of a stage.
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.nodes.get(name).map(|n| n.index)
    }

    /// Immediate dependencies of a stage, de-duplicated.
    pub fn dependencies_of(&self, name: &str) -> &[StageName] {
        self.nodes
            .get(name)
            .map(|n| n.deps.as_slice())
            .unwrap_or(&[])
    }

    /// Immediate dependents of a stage, in registration order.
    pub fn dependents_of(&self, name: &str) -> &[StageName] {
        self.nodes
            .get(name)
            .map(|n| n.dependents.as_slice())
            .unwrap_or(&[])
    }

    /// Stages with no declared dependencies.
    pub fn roots(&self) -> impl Iterator<Item = &str> {
        self.stages()
            .filter(|name| self.dependencies_of(name).is_empty())
    }

    /// Find one dependency cycle among the given stages.
    ///
    /// Edges are restricted to `within`. Returns the members of the first
    /// strongly connected component (in registration order of its earliest
    /// member) that is a real cycle: more than one stage, or a stage that
    /// depends on itself. Members are sorted by registration order.
    pub fn find_cycle(&self, within: &[&str]) -> Option<Vec<StageName>> {
        // Edge direction: dep -> stage.
        let mut graph: DiGraphMap<&str, ()> = DiGraphMap::new();
        for &name in within {
            graph.add_node(name);
        }
        for &name in within {
            for dep in self.dependencies_of(name) {
                if graph.contains_node(dep.as_str()) {
                    graph.add_edge(dep.as_str(), name, ());
                }
            }
        }

        let mut cycles: Vec<Vec<&str>> = tarjan_scc(&graph)
            .into_iter()
            .filter(|component| {
                component.len() > 1
                    || component
                        .first()
                        .is_some_and(|&n| graph.contains_edge(n, n))
            })
            .collect();

        for component in cycles.iter_mut() {
            component.sort_by_key(|n| self.index_of(n).unwrap_or(usize::MAX));
        }
        cycles.sort_by_key(|c| c.first().and_then(|n| self.index_of(n)).unwrap_or(usize::MAX));

        cycles
            .into_iter()
            .next()
            .map(|c| c.into_iter().map(|s| s.to_string()).collect())
    }
}
