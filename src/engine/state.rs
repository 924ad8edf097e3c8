// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::fmt;

use serde::Deserialize;

/// Engine-assigned id of a submitted graph. Distinct from operator ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct GraphId(u64);

impl GraphId {
    pub fn value(&self) -> u64 {
        self.0
    }
}

impl From<u64> for GraphId {
    fn from(value: u64) -> Self {
        GraphId(value)
    }
}

impl fmt::Display for GraphId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lifecycle of a graph inside the engine.
///
/// `Unknown` is reported for ids that were never submitted (or were removed).
/// `Completed`, `Stopped` and `Error` are terminal: running again requires a new submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GraphState {
    Unknown,
    Submitted,
    Running,
    Completed,
    Stopped,
    Error,
}

impl GraphState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            GraphState::Completed | GraphState::Stopped | GraphState::Error
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            GraphState::Unknown => "UNKNOWN",
            GraphState::Submitted => "SUBMITTED",
            GraphState::Running => "RUNNING",
            GraphState::Completed => "COMPLETED",
            GraphState::Stopped => "STOPPED",
            GraphState::Error => "ERROR",
        }
    }
}

impl fmt::Display for GraphState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How the next execution is scheduled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionMode {
    /// One worker drives the whole graph in topological order.
    #[default]
    SingleThreaded,
    /// One task per operator, bounded by the thread count.
    MultiThreaded,
    /// `execute_graph` returns once the run has started in the background.
    Async,
}

impl fmt::Display for ExecutionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ExecutionMode::SingleThreaded => "single_threaded",
            ExecutionMode::MultiThreaded => "multi_threaded",
            ExecutionMode::Async => "async",
        };
        f.write_str(name)
    }
}
