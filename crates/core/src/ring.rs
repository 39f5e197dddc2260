// SPDX-License-Identifier: MIT

//! Bounded FIFO of domain events with monotonic IDs.
//!
//! The ring is single-writer (the event router) and many-reader; queries
//! return copies so readers never hold the ring across I/O. Broadcast to
//! RPC subscribers happens outside the ring: the router forwards the entry
//! returned by [`EventRing::add`] onto the notification channel.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::event::{Event, Source};

/// Default ring capacity.
pub const DEFAULT_RING_CAPACITY: usize = 500;

/// One recorded event with its ring-assigned identity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RingEntry {
    pub event_id: u64,
    pub timestamp_ms: u64,
    pub source: Source,
    #[serde(flatten)]
    pub event: Event,
}

/// Ring statistics for `get_statistics`-style queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RingStats {
    /// Total events ever accepted (including evicted ones).
    pub total_events: u64,
    /// Entries currently buffered.
    pub buffer_size: usize,
    pub max_size: usize,
}

/// Fixed-capacity event buffer.
#[derive(Debug)]
pub struct EventRing {
    entries: VecDeque<RingEntry>,
    next_id: u64,
    total: u64,
    max_size: usize,
}

impl EventRing {
    pub fn new(max_size: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(max_size),
            next_id: 1,
            total: 0,
            max_size,
        }
    }

    /// Append an event, assigning the next monotonic ID.
    ///
    /// Evicts the oldest entry when over capacity. Returns a clone of the
    /// stored entry for broadcast fan-out.
    pub fn add(&mut self, event: Event, source: Source, timestamp_ms: u64) -> RingEntry {
        let entry = RingEntry {
            event_id: self.next_id,
            timestamp_ms,
            source,
            event,
        };
        self.next_id += 1;
        self.total += 1;

        self.entries.push_back(entry.clone());
        if self.entries.len() > self.max_size {
            self.entries.pop_front();
        }

        entry
    }

    /// Filtered query, most recent first.
    ///
    /// `event_type` filters by prefix (`"window"` matches `window::new`
    /// and `window::close`); `since_id` keeps only newer entries.
    pub fn query(
        &self,
        limit: usize,
        event_type: Option<&str>,
        since_id: Option<u64>,
    ) -> Vec<RingEntry> {
        let mut out: Vec<RingEntry> = self
            .entries
            .iter()
            .filter(|e| match event_type {
                Some(prefix) => e.event.event_type().starts_with(prefix),
                None => true,
            })
            .filter(|e| match since_id {
                Some(id) => e.event_id > id,
                None => true,
            })
            .cloned()
            .collect();

        out.reverse();
        out.truncate(limit);
        out
    }

    /// Look up a single entry by ID.
    pub fn get(&self, event_id: u64) -> Option<RingEntry> {
        self.entries.iter().find(|e| e.event_id == event_id).cloned()
    }

    pub fn stats(&self) -> RingStats {
        RingStats {
            total_events: self.total,
            buffer_size: self.entries.len(),
            max_size: self.max_size,
        }
    }

    /// ID the next accepted event will receive.
    pub fn next_id(&self) -> u64 {
        self.next_id
    }
}

impl Default for EventRing {
    fn default() -> Self {
        Self::new(DEFAULT_RING_CAPACITY)
    }
}

#[cfg(test)]
#[path = "ring_tests.rs"]
mod tests;
