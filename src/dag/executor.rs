// src/dag/executor.rs

//! Pipeline executor: run stages in resolved order, wiring outputs to
//! dependents, and fail fast on the first stage error.

use std::collections::{BTreeMap, HashMap};

use tracing::{debug, error, info, info_span};

use crate::dag::registry::{StageInputs, StageName, StageRegistry};
use crate::dag::resolver::{resolve, ExecutionOrder};
use crate::errors::{PipelineError, ResolutionError, StageExecutionError};

/// Outputs produced so far in a single run, keyed by stage name.
///
/// Owned by one [`run`] call and dropped when it returns, whether the run
/// succeeded or not.
#[derive(Debug)]
pub struct RunContext<T> {
    outputs: HashMap<StageName, Option<T>>,
}

impl<T> RunContext<T> {
    fn new() -> Self {
        Self {
            outputs: HashMap::new(),
        }
    }

    /// Build the inputs for a stage from its declared dependencies.
    fn inputs_for<'a>(&'a self, stage: &'a str, deps: &'a [StageName]) -> StageInputs<'a, T> {
        let values: BTreeMap<&str, Option<&T>> = deps
            .iter()
            .map(|dep| {
                let value = self.outputs.get(dep).and_then(|o| o.as_ref());
                (dep.as_str(), value)
            })
            .collect();
        StageInputs::new(stage, values)
    }

    fn contains(&self, stage: &str) -> bool {
        self.outputs.contains_key(stage)
    }

    fn store(&mut self, stage: &str, output: Option<T>) {
        self.outputs.insert(stage.to_string(), output);
    }

    fn take(&mut self, stage: &str) -> Option<T> {
        self.outputs.remove(stage).flatten()
    }
}

/// Result of a successful run.
#[derive(Debug)]
pub struct RunResult<T> {
    /// Output of the terminal stage; `None` for an effectful sink.
    pub output: Option<T>,
    /// The terminal (last executed) stage, `None` for an empty pipeline.
    pub terminal: Option<StageName>,
    /// Stages that ran, in order.
    pub executed: Vec<StageName>,
}

/// Execute every stage of `order` against `registry`.
///
/// Every stage in `order` must be registered; this is checked before any
/// stage runs. Dependencies are expected to appear earlier in `order` (as
/// guaranteed by [`resolve`]); a stage whose dependency has not run yet fails
/// with a [`StageExecutionError`].
pub fn run<T>(order: &ExecutionOrder, registry: &StageRegistry<T>) -> Result<RunResult<T>, PipelineError> {
    // Look up every stage up front so a bad order fails before anything runs.
    let stages = order
        .iter()
        .map(|name| registry.get(name))
        .collect::<Result<Vec<_>, _>>()?;

    let span = info_span!("pipeline_run", stages = stages.len());
    let _guard = span.enter();

    info!(%order, "starting pipeline run");

    let mut context: RunContext<T> = RunContext::new();
    let mut executed = Vec::with_capacity(stages.len());

    for stage in stages {
        let name = stage.name();

        if let Some(missing) = stage.dependencies().iter().find(|d| !context.contains(d)) {
            error!(stage = %name, dependency = %missing, "dependency has not run yet; aborting run");
            return Err(StageExecutionError {
                stage: name.to_string(),
                source: anyhow::anyhow!(
                    "dependency '{missing}' has not run before stage '{name}'"
                ),
            }
            .into());
        }

        debug!(stage = %name, deps = ?stage.dependencies(), "invoking stage");

        let result = {
            let inputs = context.inputs_for(name, stage.dependencies());
            stage.invoke(&inputs)
        };

        match result {
            Ok(output) => {
                debug!(stage = %name, has_output = output.is_some(), "stage completed");
                context.store(name, output);
                executed.push(name.to_string());
            }
            Err(source) => {
                error!(stage = %name, error = %format!("{source:#}"), "stage failed; aborting run");
                // `context` is dropped here with everything produced so far.
                return Err(StageExecutionError {
                    stage: name.to_string(),
                    source,
                }
                .into());
            }
        }
    }

    let terminal = order.terminal().map(str::to_string);
    let output = terminal.as_deref().and_then(|t| context.take(t));

    info!(executed = executed.len(), terminal = ?terminal, "pipeline run finished");

    Ok(RunResult {
        output,
        terminal,
        executed,
    })
}

/// A registry bundled with its resolved execution order.
///
/// Resolution happens once, at construction; a `Pipeline` therefore never
/// starts a run against an invalid graph.
#[derive(Debug)]
pub struct Pipeline<T> {
    registry: StageRegistry<T>,
    order: ExecutionOrder,
}

impl<T> Pipeline<T> {
    pub fn new(registry: StageRegistry<T>) -> Result<Self, ResolutionError> {
        let order = resolve(&registry)?;
        Ok(Self { registry, order })
    }

    pub fn order(&self) -> &ExecutionOrder {
        &self.order
    }

    pub fn registry(&self) -> &StageRegistry<T> {
        &self.registry
    }

    pub fn run(&self) -> Result<RunResult<T>, PipelineError> {
        run(&self.order, &self.registry)
    }
}
