// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::fmt;
use std::sync::{Mutex, MutexGuard};

use crate::errors::OperatorError;
use crate::message::Record;
use crate::metrics::{OperatorStats, StatsSnapshot};
use crate::operator::OperatorKind;
use crate::traits::{Emitter, Operator, OperatorContext};

/// Identifies an operator within one graph. Assigned at insertion, never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct OperatorId(pub(crate) usize);

impl OperatorId {
    pub fn index(&self) -> usize {
        self.0
    }
}

impl fmt::Display for OperatorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    Created,
    Open,
    Closed,
}

impl Lifecycle {
    fn as_str(&self) -> &'static str {
        match self {
            Lifecycle::Created => "created",
            Lifecycle::Open => "open",
            Lifecycle::Closed => "closed",
        }
    }
}

struct OperatorCell {
    operator: Box<dyn Operator>,
    lifecycle: Lifecycle,
}

/// A graph-owned operator: the operator itself behind a single-writer lock, its
/// lifecycle state and its counters.
///
/// Counters are atomics so stats can be read while another task holds the lock.
pub struct OperatorNode {
    name: String,
    kind: OperatorKind,
    cell: Mutex<OperatorCell>,
    stats: OperatorStats,
}

impl OperatorNode {
    pub(crate) fn new(operator: Box<dyn Operator>) -> Self {
        Self {
            name: operator.name().to_string(),
            kind: operator.kind(),
            cell: Mutex::new(OperatorCell {
                operator,
                lifecycle: Lifecycle::Created,
            }),
            stats: OperatorStats::default(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> OperatorKind {
        self.kind
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    pub fn lifecycle(&self) -> Lifecycle {
        match self.cell.lock() {
            Ok(cell) => cell.lifecycle,
            Err(poisoned) => poisoned.into_inner().lifecycle,
        }
    }

    /// Opens the operator. A closed operator may be reopened for another execution.
    pub fn open(&self, ctx: &OperatorContext) -> Result<(), OperatorError> {
        let mut cell = self.lock()?;
        if cell.lifecycle == Lifecycle::Open {
            return Err(self.lifecycle_error("open", cell.lifecycle));
        }
        cell.operator.open(ctx)?;
        cell.lifecycle = Lifecycle::Open;
        Ok(())
    }

    /// Runs one `process` call and returns what the operator emitted.
    ///
    /// The operator's name is appended to the trace of every input message; for sources,
    /// which take no input, it is appended to every produced message instead.
    pub fn invoke(&self, mut input: Record) -> Result<Vec<Record>, OperatorError> {
        let mut cell = self.lock()?;
        if cell.lifecycle != Lifecycle::Open {
            return Err(self.lifecycle_error("process", cell.lifecycle));
        }

        for message in input.messages_mut() {
            message.push_trace(&self.name);
        }

        let mut out = Emitter::new();
        cell.operator.process(input, &mut out)?;
        drop(cell);

        let mut records = out.into_records();
        if self.kind == OperatorKind::Source {
            for record in records.iter_mut() {
                for message in record.messages_mut() {
                    message.push_trace(&self.name);
                }
            }
        }

        self.stats.record_processed();
        self.stats.record_output(records.len() as u64);
        Ok(records)
    }

    /// Closes the operator and returns whatever it flushed.
    pub fn close(&self) -> Result<Vec<Record>, OperatorError> {
        let mut cell = self.lock()?;
        if cell.lifecycle != Lifecycle::Open {
            return Err(self.lifecycle_error("close", cell.lifecycle));
        }
        cell.lifecycle = Lifecycle::Closed;

        let mut out = Emitter::new();
        cell.operator.close(&mut out)?;
        let records = out.into_records();
        self.stats.record_output(records.len() as u64);
        Ok(records)
    }

    /// Sources only. A poisoned operator reports no more data.
    pub fn has_next(&self) -> bool {
        match self.cell.lock() {
            Ok(cell) => cell.lifecycle == Lifecycle::Open && cell.operator.has_next(),
            Err(_) => false,
        }
    }

    pub(crate) fn into_operator(self) -> Box<dyn Operator> {
        match self.cell.into_inner() {
            Ok(cell) => cell.operator,
            Err(poisoned) => poisoned.into_inner().operator,
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, OperatorCell>, OperatorError> {
        self.cell.lock().map_err(|_| OperatorError::Poisoned {
            operator: self.name.clone(),
        })
    }

    fn lifecycle_error(&self, action: &'static str, state: Lifecycle) -> OperatorError {
        OperatorError::Lifecycle {
            operator: self.name.clone(),
            action,
            state: state.as_str(),
        }
    }
}

impl fmt::Debug for OperatorNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OperatorNode")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("stats", &self.stats.snapshot())
            .finish()
    }
}
