// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Message types for the execution lifecycle of submitted graphs.

use std::fmt::{Display, Formatter};
use std::time::Duration;

use tracing::Span;

use crate::engine::{ExecutionMode, GraphId};
use crate::observability::messages::StructuredLog;

/// Execution started.
///
/// # Log Level
/// `info!` - Important operational event
pub struct ExecutionStarted<'a> {
    pub graph_id: GraphId,
    pub strategy: &'a str,
    pub operator_count: usize,
    pub thread_count: usize,
}

impl Display for ExecutionStarted<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Starting graph {} with {} strategy: {} operators, thread_count={}",
            self.graph_id, self.strategy, self.operator_count, self.thread_count
        )
    }
}

impl StructuredLog for ExecutionStarted<'_> {
    fn log(&self) {
        tracing::info!(
            graph_id = %self.graph_id,
            strategy = self.strategy,
            operator_count = self.operator_count,
            thread_count = self.thread_count,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!(
            "execution",
            span_name = name,
            graph_id = %self.graph_id,
            strategy = self.strategy,
            operator_count = self.operator_count,
            thread_count = self.thread_count,
        )
    }
}

/// Execution completed normally.
///
/// # Log Level
/// `info!` - Important operational event
pub struct ExecutionCompleted<'a> {
    pub graph_id: GraphId,
    pub strategy: &'a str,
    pub processed: u64,
    pub duration: Duration,
}

impl Display for ExecutionCompleted<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Graph {} completed with {} strategy: {} records processed in {:?}",
            self.graph_id, self.strategy, self.processed, self.duration
        )
    }
}

impl StructuredLog for ExecutionCompleted<'_> {
    fn log(&self) {
        tracing::info!(
            graph_id = %self.graph_id,
            strategy = self.strategy,
            processed = self.processed,
            duration_ms = self.duration.as_millis() as u64,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!(
            "execution_completed",
            span_name = name,
            graph_id = %self.graph_id,
            strategy = self.strategy,
            duration = ?self.duration,
        )
    }
}

/// Execution failed; the graph is now in the error state.
///
/// # Log Level
/// `error!` - Failure requiring attention
pub struct ExecutionFailed<'a> {
    pub graph_id: GraphId,
    pub strategy: &'a str,
    pub error: &'a dyn std::error::Error,
}

impl Display for ExecutionFailed<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Graph {} failed with {} strategy: {}",
            self.graph_id, self.strategy, self.error
        )
    }
}

impl StructuredLog for ExecutionFailed<'_> {
    fn log(&self) {
        tracing::error!(
            graph_id = %self.graph_id,
            strategy = self.strategy,
            error = %self.error,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::error_span!(
            "execution_failed",
            span_name = name,
            graph_id = %self.graph_id,
            strategy = self.strategy,
            error = %self.error,
        )
    }
}

/// A run observed its stop gate closed and wound down.
///
/// # Log Level
/// `info!` - Important operational event
pub struct ExecutionStopped {
    pub graph_id: GraphId,
    pub duration: Duration,
}

impl Display for ExecutionStopped {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Graph {} stopped after {:?}", self.graph_id, self.duration)
    }
}

impl StructuredLog for ExecutionStopped {
    fn log(&self) {
        tracing::info!(
            graph_id = %self.graph_id,
            duration_ms = self.duration.as_millis() as u64,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!("execution_stopped", span_name = name, graph_id = %self.graph_id)
    }
}

/// Scheduling settings changed; applies from the next execution.
///
/// # Log Level
/// `debug!` - Configuration detail
pub struct SchedulingChanged {
    pub mode: ExecutionMode,
    pub thread_count: usize,
}

impl Display for SchedulingChanged {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Scheduling set to {} with thread_count={}",
            self.mode, self.thread_count
        )
    }
}

impl StructuredLog for SchedulingChanged {
    fn log(&self) {
        tracing::debug!(
            mode = %self.mode,
            thread_count = self.thread_count,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::debug_span!(
            "scheduling_changed",
            span_name = name,
            mode = %self.mode,
            thread_count = self.thread_count,
        )
    }
}

/// Engine shutdown requested.
///
/// # Log Level
/// `info!` - Important operational event
pub struct EngineShutdown {
    pub graph_count: usize,
}

impl Display for EngineShutdown {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Shutting down engine: stopping {} graphs", self.graph_count)
    }
}

impl StructuredLog for EngineShutdown {
    fn log(&self) {
        tracing::info!(graph_count = self.graph_count, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!("engine_shutdown", span_name = name, graph_count = self.graph_count)
    }
}
