// src/dag/registry.rs

//! Stage registry: named, dependency-annotated transformation units.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

use anyhow::anyhow;
use tracing::debug;

use crate::errors::RegistrationError;

/// Canonical stage name type used throughout the engine.
pub type StageName = String;

/// Signature of a stage function.
///
/// A stage receives the outputs of its declared dependencies and produces a
/// single output. `Ok(None)` is the explicit "no output" of an effectful sink
/// stage.
pub type StageFn<T> =
    Arc<dyn Fn(&StageInputs<'_, T>) -> anyhow::Result<Option<T>> + Send + Sync>;

/// Outputs of a stage's declared dependencies, keyed by dependency name.
pub struct StageInputs<'a, T> {
    stage: &'a str,
    values: BTreeMap<&'a str, Option<&'a T>>,
}

impl<'a, T> StageInputs<'a, T> {
    pub(crate) fn new(stage: &'a str, values: BTreeMap<&'a str, Option<&'a T>>) -> Self {
        Self { stage, values }
    }

    /// Name of the stage these inputs belong to.
    pub fn stage(&self) -> &str {
        self.stage
    }

    /// Output of the dependency `name`.
    ///
    /// Fails if `name` is not a declared dependency, or if that dependency
    /// produced no output.
    pub fn get(&self, name: &str) -> anyhow::Result<&'a T> {
        match self.values.get(name) {
            Some(Some(value)) => Ok(*value),
            Some(None) => Err(anyhow!(
                "dependency '{name}' of stage '{}' produced no output",
                self.stage
            )),
            None => Err(anyhow!(
                "'{name}' is not a declared dependency of stage '{}'",
                self.stage
            )),
        }
    }

    /// Declared dependency names, sorted.
    pub fn names(&self) -> impl Iterator<Item = &str> + '_ {
        self.values.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// A single registered stage.
pub struct Stage<T> {
    name: StageName,
    deps: Vec<StageName>,
    func: StageFn<T>,
}

impl<T> Stage<T> {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared upstream dependencies, in declaration order.
    pub fn dependencies(&self) -> &[StageName] {
        &self.deps
    }

    pub(crate) fn invoke(&self, inputs: &StageInputs<'_, T>) -> anyhow::Result<Option<T>> {
        (self.func)(inputs)
    }
}

impl<T> fmt::Debug for Stage<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Stage")
            .field("name", &self.name)
            .field("deps", &self.deps)
            .finish_non_exhaustive()
    }
}

/// All registered stages, in registration order.
pub struct StageRegistry<T> {
    stages: Vec<Stage<T>>,
    index: HashMap<StageName, usize>,
}

impl<T> StageRegistry<T> {
    pub fn new() -> Self {
        Self {
            stages: Vec::new(),
            index: HashMap::new(),
        }
    }

    pub fn builder() -> RegistryBuilder<T> {
        RegistryBuilder::new()
    }

    /// Register a stage.
    ///
    /// Dependencies are checked at resolution time, not here, so stages may
    /// be registered in any order.
    pub fn register<F>(
        &mut self,
        name: impl Into<StageName>,
        dependencies: &[&str],
        func: F,
    ) -> Result<(), RegistrationError>
    where
        F: Fn(&StageInputs<'_, T>) -> anyhow::Result<Option<T>> + Send + Sync + 'static,
    {
        let name = name.into();
        if self.index.contains_key(&name) {
            return Err(RegistrationError::DuplicateStage(name));
        }

        let deps: Vec<StageName> = dependencies.iter().map(|d| d.to_string()).collect();
        debug!(stage = %name, ?deps, "registered stage");

        self.index.insert(name.clone(), self.stages.len());
        self.stages.push(Stage {
            name,
            deps,
            func: Arc::new(func),
        });
        Ok(())
    }

    pub fn get(&self, name: &str) -> Result<&Stage<T>, RegistrationError> {
        self.index
            .get(name)
            .map(|&i| &self.stages[i])
            .ok_or_else(|| RegistrationError::UnknownStage(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Position of `name` in registration order.
    pub fn registration_index(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    /// Stages in registration order.
    pub fn stages(&self) -> impl Iterator<Item = &Stage<T>> {
        self.stages.iter()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.stages.iter().map(|s| s.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }
}

impl<T> Default for StageRegistry<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for StageRegistry<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.stages.iter()).finish()
    }
}

/// Chained registration. The first failure is kept and reported by
/// [`RegistryBuilder::build`]; later calls are ignored once one failed.
pub struct RegistryBuilder<T> {
    registry: StageRegistry<T>,
    error: Option<RegistrationError>,
}

impl<T> RegistryBuilder<T> {
    pub fn new() -> Self {
        Self {
            registry: StageRegistry::new(),
            error: None,
        }
    }

    pub fn stage<F>(mut self, name: impl Into<StageName>, dependencies: &[&str], func: F) -> Self
    where
        F: Fn(&StageInputs<'_, T>) -> anyhow::Result<Option<T>> + Send + Sync + 'static,
    {
        if self.error.is_none() {
            if let Err(e) = self.registry.register(name, dependencies, func) {
                self.error = Some(e);
            }
        }
        self
    }

    pub fn build(self) -> Result<StageRegistry<T>, RegistrationError> {
        match self.error {
            Some(e) => Err(e),
            None => Ok(self.registry),
        }
    }
}

impl<T> Default for RegistryBuilder<T> {
    fn default() -> Self {
        Self::new()
    }
}
