// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Message types for operator lifecycle and per-record recovery.

use std::fmt::{Display, Formatter};

use tracing::Span;

use crate::engine::GraphId;
use crate::errors::DataErrorPolicy;
use crate::graph::OperatorId;
use crate::observability::messages::StructuredLog;
use crate::operator::OperatorKind;

/// # Log Level
/// `debug!` - Lifecycle detail
pub struct OperatorOpened<'a> {
    pub graph_id: GraphId,
    pub operator_id: OperatorId,
    pub operator: &'a str,
    pub kind: OperatorKind,
}

impl Display for OperatorOpened<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Opened {} operator '{}' ({}) in graph {}",
            self.kind, self.operator, self.operator_id, self.graph_id
        )
    }
}

impl StructuredLog for OperatorOpened<'_> {
    fn log(&self) {
        tracing::debug!(
            graph_id = %self.graph_id,
            operator_id = %self.operator_id,
            operator = self.operator,
            kind = %self.kind,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::debug_span!(
            "operator",
            span_name = name,
            graph_id = %self.graph_id,
            operator_id = %self.operator_id,
            operator = self.operator,
        )
    }
}

/// # Log Level
/// `debug!` - Lifecycle detail
pub struct OperatorClosed<'a> {
    pub graph_id: GraphId,
    pub operator_id: OperatorId,
    pub operator: &'a str,
    pub processed: u64,
    pub output: u64,
}

impl Display for OperatorClosed<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Closed operator '{}' ({}) in graph {}: processed={}, output={}",
            self.operator, self.operator_id, self.graph_id, self.processed, self.output
        )
    }
}

impl StructuredLog for OperatorClosed<'_> {
    fn log(&self) {
        tracing::debug!(
            graph_id = %self.graph_id,
            operator_id = %self.operator_id,
            operator = self.operator,
            processed = self.processed,
            output = self.output,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::debug_span!(
            "operator_closed",
            span_name = name,
            graph_id = %self.graph_id,
            operator_id = %self.operator_id,
        )
    }
}

/// A function rejected one message; the operator dropped it or passed it through.
///
/// # Log Level
/// `warn!` - Data problem, graph continues
pub struct DataErrorRecovered<'a> {
    pub operator: &'a str,
    pub uid: u64,
    pub reason: &'a str,
    pub policy: DataErrorPolicy,
}

impl Display for DataErrorRecovered<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        let action = match self.policy {
            DataErrorPolicy::Drop => "dropped",
            DataErrorPolicy::PassThrough => "passed through",
        };
        write!(
            f,
            "Operator '{}' {} message {}: {}",
            self.operator, action, self.uid, self.reason
        )
    }
}

impl StructuredLog for DataErrorRecovered<'_> {
    fn log(&self) {
        tracing::warn!(
            operator = self.operator,
            uid = self.uid,
            policy = self.policy.as_str(),
            reason = self.reason,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::warn_span!(
            "data_error",
            span_name = name,
            operator = self.operator,
            uid = self.uid,
        )
    }
}

/// An event-time window received a message older than every open window.
///
/// # Log Level
/// `debug!` - Expected under out-of-order input
pub struct LateMessageDropped<'a> {
    pub operator: &'a str,
    pub uid: u64,
    pub timestamp_ms: u64,
    pub window_start_ms: u64,
}

impl Display for LateMessageDropped<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Window '{}' dropped late message {} (timestamp {} < window start {})",
            self.operator, self.uid, self.timestamp_ms, self.window_start_ms
        )
    }
}

impl StructuredLog for LateMessageDropped<'_> {
    fn log(&self) {
        tracing::debug!(
            operator = self.operator,
            uid = self.uid,
            timestamp_ms = self.timestamp_ms,
            window_start_ms = self.window_start_ms,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::debug_span!("late_message", span_name = name, operator = self.operator)
    }
}
