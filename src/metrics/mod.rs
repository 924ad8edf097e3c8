// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Shared counters.
//!
//! Message uids and engine-wide processed counts are shared mutable state. They are
//! modeled as cloneable handles over one atomic so they can be injected into the
//! engine and environment, and reset per test instead of living in a process-wide static.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::message::{Content, Message};

/// Cloneable handle to a thread-safe monotonic counter.
#[derive(Debug, Clone, Default)]
pub struct SharedCounter(Arc<AtomicU64>);

impl SharedCounter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn starting_at(value: u64) -> Self {
        Self(Arc::new(AtomicU64::new(value)))
    }

    /// Adds one and returns the value before the increment.
    pub fn increment(&self) -> u64 {
        self.0.fetch_add(1, Ordering::Relaxed)
    }

    pub fn add(&self, amount: u64) -> u64 {
        self.0.fetch_add(amount, Ordering::Relaxed)
    }

    pub fn get(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }

    pub fn reset(&self) {
        self.0.store(0, Ordering::Relaxed);
    }
}

/// Issues unique, monotonically increasing message uids.
#[derive(Debug, Clone, Default)]
pub struct UidGenerator {
    counter: SharedCounter,
}

impl UidGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_counter(counter: SharedCounter) -> Self {
        Self { counter }
    }

    pub fn next_uid(&self) -> u64 {
        self.counter.increment()
    }

    pub fn message(&self, content: Content) -> Message {
        Message::with_uid(self.next_uid(), content)
    }

    pub fn text(&self, text: impl Into<String>) -> Message {
        self.message(Content::Text(text.into()))
    }
}

/// Per-operator counters, readable while the operator is executing.
#[derive(Debug, Default)]
pub struct OperatorStats {
    processed: AtomicU64,
    output: AtomicU64,
}

impl OperatorStats {
    pub fn record_processed(&self) {
        self.processed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_output(&self, records: u64) {
        self.output.fetch_add(records, Ordering::Relaxed);
    }

    pub fn processed(&self) -> u64 {
        self.processed.load(Ordering::Relaxed)
    }

    pub fn output(&self) -> u64 {
        self.output.load(Ordering::Relaxed)
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            processed: self.processed(),
            output: self.output(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StatsSnapshot {
    pub processed: u64,
    pub output: u64,
}
