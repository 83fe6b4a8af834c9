// src/trigger/watcher.rs

use std::path::PathBuf;

use anyhow::{Context, Result};
use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::trigger::path_utils::relative_str;
use crate::trigger::patterns::InputPatterns;

/// Handle for the filesystem watcher.
///
/// Keeps the underlying `RecommendedWatcher` alive. Dropping this handle
/// stops the wakeups.
pub struct WatcherHandle {
    _inner: RecommendedWatcher,
}

impl std::fmt::Debug for WatcherHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatcherHandle").finish()
    }
}

/// Watch `watch_dir` (non-recursive) and send a wakeup on `wake_tx` whenever
/// a file matching `patterns` is created or modified.
///
/// Wakeups carry no payload. The sensor still lists the directory and
/// consults the ledger itself, so a spurious or coalesced wakeup is harmless.
pub fn spawn_input_watcher(
    watch_dir: impl Into<PathBuf>,
    patterns: InputPatterns,
    wake_tx: mpsc::Sender<()>,
) -> Result<WatcherHandle> {
    let watch_dir = watch_dir.into();
    let root = watch_dir.canonicalize().unwrap_or_else(|_| watch_dir.clone());

    // Channel from the blocking notify callback into the async world.
    let (event_tx, mut event_rx) = mpsc::unbounded_channel::<Event>();

    let mut watcher = RecommendedWatcher::new(
        move |res: notify::Result<Event>| match res {
            Ok(event) => {
                if let Err(err) = event_tx.send(event) {
                    eprintln!("stagedag: failed to forward notify event: {err}");
                }
            }
            Err(err) => {
                eprintln!("stagedag: file watch error: {err}");
            }
        },
        Config::default(),
    )
    .context("creating input watcher")?;

    watcher
        .watch(&root, RecursiveMode::NonRecursive)
        .with_context(|| format!("watching input directory {root:?}"))?;

    info!("input watcher started on {:?}", root);

    tokio::spawn(async move {
        while let Some(event) = event_rx.recv().await {
            if !matches!(event.kind, EventKind::Create(_) | EventKind::Modify(_)) {
                continue;
            }

            let relevant = event.paths.iter().any(|path| {
                relative_str(&root, path).is_some_and(|rel| patterns.matches(&rel))
            });
            if !relevant {
                continue;
            }

            debug!(paths = ?event.paths, "input change; waking sensor");
            // A full channel already holds a pending wakeup.
            match wake_tx.try_send(()) {
                Ok(()) | Err(mpsc::error::TrySendError::Full(())) => {}
                Err(mpsc::error::TrySendError::Closed(())) => break,
            }
        }
        debug!("input watcher loop finished");
    });

    Ok(WatcherHandle { _inner: watcher })
}
