// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! One execution of a submitted graph and the gate that stops it.

use std::cell::RefCell;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard};

use tokio_util::sync::CancellationToken;

use crate::engine::GraphId;
use crate::errors::EngineError;
use crate::graph::{ExecutionGraph, Lifecycle, OperatorId, OperatorNode};
use crate::message::Record;
use crate::metrics::SharedCounter;
use crate::observability::messages::operator::{OperatorClosed, OperatorOpened};
use crate::observability::messages::StructuredLog;
use crate::operator::OperatorKind;
use crate::traits::OperatorContext;

thread_local! {
    /// Gates whose operator call is in progress on this thread.
    static ENTERED: RefCell<Vec<usize>> = const { RefCell::new(Vec::new()) };
}

/// Stop gate for one execution.
///
/// Every operator call runs while holding a read guard. [`stop`](Self::stop) takes the
/// write lock, so it returns only after in-flight calls have finished, and no call can
/// start afterwards.
///
/// A stop issued from inside an operator call of the same run cannot wait for its own
/// guard. It only raises the stop flag: no new call starts, but calls already running
/// on other threads may still be finishing when it returns.
#[derive(Debug, Default)]
pub struct RunGate {
    stopped: RwLock<bool>,
    requested: AtomicBool,
    token: CancellationToken,
}

/// Read guard held for the duration of one operator call.
pub struct GateGuard<'a> {
    _open: RwLockReadGuard<'a, bool>,
}

impl Drop for GateGuard<'_> {
    fn drop(&mut self) {
        ENTERED.with(|entered| {
            entered.borrow_mut().pop();
        });
    }
}

impl RunGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Holds the gate open for one operator call; `None` once stopped.
    pub fn enter(&self) -> Option<GateGuard<'_>> {
        let guard = self.stopped.read().unwrap_or_else(PoisonError::into_inner);
        if *guard || self.requested.load(Ordering::SeqCst) {
            return None;
        }
        ENTERED.with(|entered| entered.borrow_mut().push(self.address()));
        Some(GateGuard { _open: guard })
    }

    pub fn stop(&self) {
        self.requested.store(true, Ordering::SeqCst);
        if !self.entered_on_this_thread() {
            let mut stopped = self.stopped.write().unwrap_or_else(PoisonError::into_inner);
            *stopped = true;
        }
        self.token.cancel();
    }

    pub fn is_stopped(&self) -> bool {
        self.requested.load(Ordering::SeqCst)
            || *self.stopped.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Cancelled on stop; handed to operators so blocking sources can poll it.
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    fn entered_on_this_thread(&self) -> bool {
        let address = self.address();
        ENTERED.with(|entered| entered.borrow().contains(&address))
    }

    fn address(&self) -> usize {
        self as *const Self as usize
    }
}

/// Everything an executor needs for one run.
#[derive(Clone)]
pub struct GraphRun {
    pub graph_id: GraphId,
    pub graph: Arc<ExecutionGraph>,
    /// Topological order, computed by the engine before the run starts.
    pub order: Vec<OperatorId>,
    pub gate: Arc<RunGate>,
    /// Engine-wide processed-record counter.
    pub processed: SharedCounter,
}

impl GraphRun {
    pub(crate) fn node(&self, id: OperatorId) -> Result<&OperatorNode, EngineError> {
        self.graph
            .node(id)
            .ok_or_else(|| EngineError::Runtime(format!("operator {id} missing from graph {}", self.graph_id)))
    }

    /// Operators that pull from a source function, in topological order.
    pub(crate) fn sources(&self) -> Vec<OperatorId> {
        self.order
            .iter()
            .copied()
            .filter(|id| {
                self.graph
                    .node(*id)
                    .is_some_and(|node| node.kind() == OperatorKind::Source)
            })
            .collect()
    }

    /// Opens every operator in topological order.
    pub(crate) fn open_all(&self) -> Result<(), EngineError> {
        for &id in &self.order {
            let node = self.node(id)?;
            let ctx = OperatorContext {
                graph_id: self.graph_id,
                operator_id: id,
                cancellation: self.gate.token().clone(),
            };
            node.open(&ctx)
                .map_err(|error| EngineError::from_execution(id, node.name(), error))?;
            OperatorOpened {
                graph_id: self.graph_id,
                operator_id: id,
                operator: node.name(),
                kind: node.kind(),
            }
            .log();
        }
        Ok(())
    }

    /// One `process` call behind the gate. `Ok(None)` means the run was stopped.
    pub(crate) fn invoke(
        &self,
        id: OperatorId,
        input: Record,
    ) -> Result<Option<Vec<Record>>, EngineError> {
        let node = self.node(id)?;
        let Some(_open) = self.gate.enter() else {
            return Ok(None);
        };
        let records = node
            .invoke(input)
            .map_err(|error| EngineError::from_execution(id, node.name(), error))?;

        let passed = match node.kind() {
            OperatorKind::Source => records.len() as u64,
            _ => 1,
        };
        self.processed.add(passed);
        Ok(Some(records))
    }

    /// Closes one operator and returns what it flushed.
    pub(crate) fn close(&self, id: OperatorId) -> Result<Vec<Record>, EngineError> {
        let node = self.node(id)?;
        let flushed = node
            .close()
            .map_err(|error| EngineError::from_execution(id, node.name(), error))?;
        let stats = node.stats();
        OperatorClosed {
            graph_id: self.graph_id,
            operator_id: id,
            operator: node.name(),
            processed: stats.processed,
            output: stats.output,
        }
        .log();
        Ok(flushed)
    }

    /// Closes whatever is still open after a failure. Close errors are logged and dropped.
    pub(crate) fn close_open(&self) {
        for &id in &self.order {
            let Some(node) = self.graph.node(id) else {
                continue;
            };
            if node.lifecycle() == Lifecycle::Open {
                if let Err(error) = node.close() {
                    tracing::debug!(operator = node.name(), error = %error, "close after failure failed");
                }
            }
        }
    }

    pub(crate) fn is_stopped(&self) -> bool {
        self.gate.is_stopped()
    }
}
