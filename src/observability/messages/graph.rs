// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Message types for graph submission, rejection, stop and removal.

use std::fmt::{Display, Formatter};

use tracing::Span;

use crate::engine::{GraphId, GraphState};
use crate::graph::OperatorId;
use crate::observability::messages::StructuredLog;

/// # Log Level
/// `info!` - Important operational event
pub struct GraphSubmitted {
    pub graph_id: GraphId,
    pub operator_count: usize,
}

impl Display for GraphSubmitted {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Graph {} submitted with {} operators",
            self.graph_id, self.operator_count
        )
    }
}

impl StructuredLog for GraphSubmitted {
    fn log(&self) {
        tracing::info!(
            graph_id = %self.graph_id,
            operator_count = self.operator_count,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!(
            "graph_submitted",
            span_name = name,
            graph_id = %self.graph_id,
            operator_count = self.operator_count,
        )
    }
}

/// Submission refused because the graph contains a cycle.
///
/// # Log Level
/// `warn!` - Caller error, no graph id assigned
pub struct CycleDetected<'a> {
    pub cycle: &'a [OperatorId],
}

impl Display for CycleDetected<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        let path: Vec<String> = self.cycle.iter().map(ToString::to_string).collect();
        write!(f, "Graph rejected, cycle detected: {}", path.join(" -> "))
    }
}

impl StructuredLog for CycleDetected<'_> {
    fn log(&self) {
        tracing::warn!(cycle_length = self.cycle.len(), "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::warn_span!("cycle_detected", span_name = name, cycle_length = self.cycle.len())
    }
}

/// # Log Level
/// `info!` - Important operational event
pub struct StopRequested {
    pub graph_id: GraphId,
    pub state: GraphState,
}

impl Display for StopRequested {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Stop requested for graph {} while {}", self.graph_id, self.state)
    }
}

impl StructuredLog for StopRequested {
    fn log(&self) {
        tracing::info!(graph_id = %self.graph_id, state = %self.state, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!(
            "stop_requested",
            span_name = name,
            graph_id = %self.graph_id,
            state = %self.state,
        )
    }
}

/// # Log Level
/// `debug!` - Bookkeeping detail
pub struct GraphRemoved {
    pub graph_id: GraphId,
}

impl Display for GraphRemoved {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Graph {} removed", self.graph_id)
    }
}

impl StructuredLog for GraphRemoved {
    fn log(&self) {
        tracing::debug!(graph_id = %self.graph_id, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::debug_span!("graph_removed", span_name = name, graph_id = %self.graph_id)
    }
}
