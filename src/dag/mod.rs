// src/dag/mod.rs

//! Stage graph: registration, resolution and execution.
//!
//! - [`registry`] holds named stages and their declared dependencies.
//! - [`graph`] derives the dependency graph from a registry.
//! - [`resolver`] computes a deterministic topological execution order.
//! - [`executor`] runs stages in that order, threading outputs into inputs.

pub mod executor;
pub mod graph;
pub mod registry;
pub mod resolver;

pub use executor::{run, Pipeline, RunContext, RunResult};
pub use graph::DependencyGraph;
pub use registry::{RegistryBuilder, Stage, StageFn, StageInputs, StageName, StageRegistry};
pub use resolver::{resolve, resolve_graph, ExecutionOrder};
