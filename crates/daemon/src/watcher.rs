// SPDX-License-Identifier: MIT

//! Debounced config-file watching.
//!
//! Watches the daemon's config files and reports which one changed,
//! coalescing editor write bursts with a 100 ms debounce.

use std::path::{Path, PathBuf};
use std::time::Duration;

use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// Debounce window for change bursts.
pub const DEBOUNCE: Duration = Duration::from_millis(100);

/// Which config file changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigChange {
    WindowRules,
    AppClasses,
    OutputStates,
}

/// Watch the given files; changes arrive debounced on the returned
/// receiver. The watcher lives as long as the returned guard.
pub fn watch_config_files(
    window_rules: &Path,
    app_classes: &Path,
    output_states: &Path,
) -> Result<(RecommendedWatcher, mpsc::UnboundedReceiver<ConfigChange>), notify::Error> {
    let (raw_tx, mut raw_rx) = mpsc::unbounded_channel::<PathBuf>();
    let (tx, rx) = mpsc::unbounded_channel();

    let mut watcher = notify::recommended_watcher(move |result: Result<notify::Event, _>| {
        match result {
            Ok(event) => {
                for path in event.paths {
                    let _ = raw_tx.send(path);
                }
            }
            Err(e) => warn!(error = %e, "config watcher error"),
        }
    })?;

    // Watch parent directories: editors replace files via rename, which
    // drops a watch placed on the file itself
    let mut watched_dirs: Vec<PathBuf> = Vec::new();
    for path in [window_rules, app_classes, output_states] {
        if let Some(parent) = path.parent() {
            if !watched_dirs.contains(&parent.to_path_buf()) && parent.exists() {
                watcher.watch(parent, RecursiveMode::NonRecursive)?;
                watched_dirs.push(parent.to_path_buf());
            }
        }
    }

    let window_rules = window_rules.to_path_buf();
    let app_classes = app_classes.to_path_buf();
    let output_states = output_states.to_path_buf();

    tokio::spawn(async move {
        while let Some(first) = raw_rx.recv().await {
            let mut changed: Vec<PathBuf> = vec![first];

            // Debounce: absorb everything else arriving in the window
            let deadline = tokio::time::Instant::now() + DEBOUNCE;
            loop {
                match tokio::time::timeout_at(deadline, raw_rx.recv()).await {
                    Ok(Some(path)) => changed.push(path),
                    Ok(None) => return,
                    Err(_) => break,
                }
            }

            let mut kinds = Vec::new();
            for path in &changed {
                let kind = if path == &window_rules {
                    Some(ConfigChange::WindowRules)
                } else if path == &app_classes {
                    Some(ConfigChange::AppClasses)
                } else if path == &output_states {
                    Some(ConfigChange::OutputStates)
                } else {
                    None
                };
                if let Some(kind) = kind {
                    if !kinds.contains(&kind) {
                        kinds.push(kind);
                    }
                }
            }

            for kind in kinds {
                debug!(?kind, "config change detected");
                if tx.send(kind).is_err() {
                    return;
                }
            }
        }
    });

    Ok((watcher, rx))
}

#[cfg(test)]
#[path = "watcher_tests.rs"]
mod tests;
