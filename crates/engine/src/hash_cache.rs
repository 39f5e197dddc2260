// SPDX-License-Identifier: MIT

//! TTL cache of node fingerprints for Merkle pruning.
//!
//! Entries expire after 60 s. An opportunistic sweep runs during updates
//! when 10 s have passed since the last one; the router additionally
//! drives a periodic sweep every 60 s.

use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;

use i3pm_core::{Clock, NodeFingerprint};

/// Fingerprint TTL.
pub const DEFAULT_MAX_AGE_MS: u64 = 60_000;

/// Minimum spacing between opportunistic sweeps.
pub const CLEANUP_INTERVAL_MS: u64 = 10_000;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CacheStats {
    pub size: usize,
    pub max_age_ms: u64,
    pub avg_age_ms: u64,
    pub oldest_age_ms: u64,
}

/// Bounded-staleness fingerprint cache.
pub struct HashCache {
    fingerprints: HashMap<i64, NodeFingerprint>,
    max_age_ms: u64,
    last_cleanup_ms: u64,
    clock: Arc<dyn Clock>,
}

impl HashCache {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self::with_max_age(clock, DEFAULT_MAX_AGE_MS)
    }

    pub fn with_max_age(clock: Arc<dyn Clock>, max_age_ms: u64) -> Self {
        let now = clock.now_ms();
        Self {
            fingerprints: HashMap::new(),
            max_age_ms,
            last_cleanup_ms: now,
            clock,
        }
    }

    /// Cached fingerprint, or `None` when absent or expired (expired
    /// entries are dropped on access).
    pub fn get(&mut self, node_id: i64) -> Option<NodeFingerprint> {
        let now = self.clock.now_ms();
        let fp = self.fingerprints.get(&node_id).copied()?;
        if now.saturating_sub(fp.timestamp_ms) < self.max_age_ms {
            Some(fp)
        } else {
            self.fingerprints.remove(&node_id);
            None
        }
    }

    pub fn get_subtree_hash(&mut self, node_id: i64) -> Option<u64> {
        self.get(node_id).map(|fp| fp.subtree_hash)
    }

    pub fn update(&mut self, node_id: i64, content_hash: u64, subtree_hash: u64) {
        let now = self.clock.now_ms();
        self.fingerprints.insert(
            node_id,
            NodeFingerprint {
                node_id,
                content_hash,
                subtree_hash,
                timestamp_ms: now,
            },
        );
        self.opportunistic_cleanup(now);
    }

    /// Bulk update from a full-tree hash collection.
    pub fn update_batch(&mut self, hashes: &HashMap<i64, (u64, u64)>) {
        let now = self.clock.now_ms();
        for (node_id, (content_hash, subtree_hash)) in hashes {
            self.fingerprints.insert(
                *node_id,
                NodeFingerprint {
                    node_id: *node_id,
                    content_hash: *content_hash,
                    subtree_hash: *subtree_hash,
                    timestamp_ms: now,
                },
            );
        }
        self.opportunistic_cleanup(now);
    }

    pub fn invalidate(&mut self, node_id: i64) {
        self.fingerprints.remove(&node_id);
    }

    pub fn clear(&mut self) {
        self.fingerprints.clear();
    }

    /// Drop all expired fingerprints; returns how many were removed.
    pub fn cleanup_expired(&mut self) -> usize {
        let now = self.clock.now_ms();
        let before = self.fingerprints.len();
        let max_age = self.max_age_ms;
        self.fingerprints
            .retain(|_, fp| now.saturating_sub(fp.timestamp_ms) < max_age);
        self.last_cleanup_ms = now;
        before - self.fingerprints.len()
    }

    fn opportunistic_cleanup(&mut self, now: u64) {
        if now.saturating_sub(self.last_cleanup_ms) >= CLEANUP_INTERVAL_MS {
            self.cleanup_expired();
        }
    }

    pub fn len(&self) -> usize {
        self.fingerprints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fingerprints.is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        let now = self.clock.now_ms();
        let ages: Vec<u64> = self
            .fingerprints
            .values()
            .map(|fp| now.saturating_sub(fp.timestamp_ms))
            .collect();

        CacheStats {
            size: ages.len(),
            max_age_ms: self.max_age_ms,
            avg_age_ms: if ages.is_empty() {
                0
            } else {
                ages.iter().sum::<u64>() / ages.len() as u64
            },
            oldest_age_ms: ages.iter().copied().max().unwrap_or(0),
        }
    }
}

#[cfg(test)]
#[path = "hash_cache_tests.rs"]
mod tests;
