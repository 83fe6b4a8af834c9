use std::str::FromStr;
use serde::Deserialize;

/// Behaviour when a trigger arrives while a pipeline run is already in flight.
///
/// - `Queue`: remember the trigger and start one follow-up run when the
///   current one finishes (default behaviour).
/// - `Skip`: drop the trigger. A sensor trigger dropped this way is not
///   replayed; its inputs are already in the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TriggerWhileRunningBehaviour {
    Queue,
    Skip,
}

impl Default for TriggerWhileRunningBehaviour {
    fn default() -> Self {
        TriggerWhileRunningBehaviour::Queue
    }
}

impl FromStr for TriggerWhileRunningBehaviour {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "queue" => Ok(TriggerWhileRunningBehaviour::Queue),
            "skip" => Ok(TriggerWhileRunningBehaviour::Skip),
            other => Err(format!(
                "invalid triggered_while_running_behaviour: {other} (expected \"queue\" or \"skip\")"
            )),
        }
    }
}

/// How the sensor identifies an observed input file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IdentityMode {
    /// The file path (`<watch_dir>/<name>`). A rewritten file is not new.
    Path,
    /// The file path plus a blake3 hash of its contents, so a rewritten
    /// file counts as a new input.
    Content,
}

impl Default for IdentityMode {
    fn default() -> Self {
        IdentityMode::Path
    }
}
