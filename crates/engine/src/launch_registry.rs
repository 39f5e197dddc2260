// SPDX-License-Identifier: MIT

//! Registry of pending launches awaiting window correlation.
//!
//! Launches expire after 5 s; the registry is bounded at 1000 pending
//! entries and rejects new notifications at capacity rather than
//! evicting.

use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info};

use i3pm_core::{
    launch_confidence, Clock, CorrelationSignals, LaunchCorrelation, PendingLaunch,
    MATCH_THRESHOLD,
};

/// Default launch TTL.
pub const DEFAULT_LAUNCH_TTL_MS: u64 = 5_000;

/// Hard bound on concurrently pending launches.
pub const MAX_PENDING: usize = 1_000;

#[derive(Debug, Error)]
pub enum LaunchRegistryError {
    #[error("too many pending launches ({max}); wait for existing launches to expire or match")]
    Full { max: usize },
}

/// Registry statistics for diagnostics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LaunchStats {
    pub pending: usize,
    pub total_notifications: u64,
    pub total_matched: u64,
    pub total_expired: u64,
    pub total_failed_correlations: u64,
}

/// A successful match.
#[derive(Debug, Clone, PartialEq)]
pub struct LaunchMatch {
    pub launch: PendingLaunch,
    pub correlation: LaunchCorrelation,
}

/// Short-TTL store of launch notifications.
pub struct LaunchRegistry {
    launches: HashMap<String, PendingLaunch>,
    ttl_ms: u64,
    clock: Arc<dyn Clock>,
    stats: LaunchStats,
}

impl LaunchRegistry {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self::with_ttl(clock, DEFAULT_LAUNCH_TTL_MS)
    }

    pub fn with_ttl(clock: Arc<dyn Clock>, ttl_ms: u64) -> Self {
        Self {
            launches: HashMap::new(),
            ttl_ms,
            clock,
            stats: LaunchStats::default(),
        }
    }

    /// Register a launch notification. Expired entries are swept first;
    /// at capacity the notification is rejected.
    pub fn add(
        &mut self,
        app_name: &str,
        project: Option<&str>,
        expected_class: &str,
        workspace_number: Option<i32>,
    ) -> Result<String, LaunchRegistryError> {
        self.expire_old();

        if self.launches.len() >= MAX_PENDING {
            return Err(LaunchRegistryError::Full { max: MAX_PENDING });
        }

        let timestamp_ms = self.clock.now_ms();
        let launch_id = format!("{app_name}-{timestamp_ms}-{}", uuid::Uuid::new_v4());

        self.launches.insert(
            launch_id.clone(),
            PendingLaunch {
                launch_id: launch_id.clone(),
                app_name: app_name.to_string(),
                project: project.map(String::from),
                expected_class: expected_class.to_string(),
                workspace_number,
                timestamp_ms,
                matched: false,
            },
        );
        self.stats.total_notifications += 1;

        info!(
            %launch_id,
            app_name,
            ?project,
            expected_class,
            ?workspace_number,
            "registered pending launch"
        );
        Ok(launch_id)
    }

    /// Find the best pending launch for a new window.
    ///
    /// Candidates below the acceptance threshold are ignored; among those
    /// above, highest confidence wins and ties go to the earliest launch.
    /// The winner is marked matched so it cannot be claimed twice.
    pub fn find_match(
        &mut self,
        window_class: &str,
        window_workspace: Option<i32>,
    ) -> Option<LaunchMatch> {
        self.expire_old();
        let now_ms = self.clock.now_ms();

        let mut best: Option<(f64, CorrelationSignals, String, u64)> = None;
        for launch in self.launches.values().filter(|l| !l.matched) {
            let (confidence, signals) =
                launch_confidence(launch, window_class, window_workspace, now_ms);
            if confidence < MATCH_THRESHOLD {
                continue;
            }

            let candidate = (confidence, signals, launch.launch_id.clone(), launch.timestamp_ms);
            best = match best {
                None => Some(candidate),
                Some(current) => {
                    let (best_conf, _, _, best_ts) = current;
                    if confidence > best_conf || (confidence == best_conf && launch.timestamp_ms < best_ts)
                    {
                        Some(candidate)
                    } else {
                        Some(current)
                    }
                }
            };
        }

        let Some((confidence, signals, launch_id, _)) = best else {
            self.stats.total_failed_correlations += 1;
            debug!(window_class, "no pending launch matched window");
            return None;
        };

        let launch = self.launches.get_mut(&launch_id)?;
        launch.matched = true;
        self.stats.total_matched += 1;

        Some(LaunchMatch {
            launch: launch.clone(),
            correlation: LaunchCorrelation {
                launch_id,
                confidence,
                signals,
            },
        })
    }

    /// Unmatched pending launches, oldest first.
    pub fn pending(&self) -> Vec<PendingLaunch> {
        let mut out: Vec<PendingLaunch> = self
            .launches
            .values()
            .filter(|l| !l.matched)
            .cloned()
            .collect();
        out.sort_by_key(|l| l.timestamp_ms);
        out
    }

    pub fn stats(&self) -> LaunchStats {
        LaunchStats {
            pending: self.launches.len(),
            ..self.stats
        }
    }

    fn expire_old(&mut self) {
        let now_ms = self.clock.now_ms();
        let ttl = self.ttl_ms;
        let before = self.launches.len();
        self.launches
            .retain(|_, l| now_ms.saturating_sub(l.timestamp_ms) < ttl);
        self.stats.total_expired += (before - self.launches.len()) as u64;
    }
}

#[cfg(test)]
#[path = "launch_registry_tests.rs"]
mod tests;
