// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use tokio_util::sync::CancellationToken;

use crate::engine::GraphId;
use crate::errors::OperatorError;
use crate::graph::OperatorId;
use crate::message::{Message, Record};
use crate::operator::OperatorKind;

/// An executable graph node.
///
/// Lifecycle per instance is `open → process* → close`. The engine guarantees a single
/// writer per operator during an execution, so implementations need no internal locking.
/// Inputs are received by value; whatever is pushed into the [`Emitter`] is owned by the
/// engine once the call returns.
pub trait Operator: Send {
    fn kind(&self) -> OperatorKind;

    fn name(&self) -> &str;

    fn open(&mut self, _ctx: &OperatorContext) -> Result<(), OperatorError> {
        Ok(())
    }

    /// Consume one record. Returns whether any output was emitted.
    fn process(&mut self, input: Record, out: &mut Emitter) -> Result<bool, OperatorError>;

    /// Release resources and flush anything buffered into `out`.
    fn close(&mut self, _out: &mut Emitter) -> Result<(), OperatorError> {
        Ok(())
    }

    /// Sources only: whether another call to `process` may produce data.
    fn has_next(&self) -> bool {
        false
    }
}

/// Collects the records an operator emits during one call.
#[derive(Debug, Default)]
pub struct Emitter {
    records: Vec<Record>,
}

impl Emitter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Empty records are ignored.
    pub fn emit(&mut self, record: Record) {
        if !record.is_empty() {
            self.records.push(record);
        }
    }

    pub fn emit_message(&mut self, message: Message) {
        self.records.push(Record::single(message));
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn into_records(self) -> Vec<Record> {
        self.records
    }
}

/// Handed to [`Operator::open`].
#[derive(Debug, Clone)]
pub struct OperatorContext {
    pub graph_id: GraphId,
    pub operator_id: OperatorId,
    /// Cancelled when the graph is stopped or aborted. Long-blocking sources and sinks poll it.
    pub cancellation: CancellationToken,
}

impl OperatorContext {
    pub fn is_cancelled(&self) -> bool {
        self.cancellation.is_cancelled()
    }
}
