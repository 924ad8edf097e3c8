// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Cooperative single-worker scheduling.
//!
//! Operators run strictly in topological order. Each round pulls one record from every
//! live source and then drains all inboxes in topological order, so a record emitted by
//! an operator reaches every successor before the next source record is pulled. Inboxes
//! are FIFO per operator and each edge delivers in emission order.

use std::collections::{HashMap, VecDeque};

use async_trait::async_trait;

use crate::engine::GraphRun;
use crate::errors::EngineError;
use crate::graph::{ExecutionGraph, OperatorId};
use crate::message::Record;
use crate::traits::GraphExecutor;

type Inboxes = HashMap<OperatorId, VecDeque<Record>>;

#[derive(Debug, Default)]
pub struct SingleThreadedExecutor;

impl SingleThreadedExecutor {
    pub fn new() -> Self {
        Self
    }

    async fn drive(&self, run: &GraphRun) -> Result<(), EngineError> {
        run.open_all()?;

        let mut inboxes: Inboxes = run.order.iter().map(|id| (*id, VecDeque::new())).collect();
        let mut live = run.sources();
        let mut stopped = false;

        'rounds: while !live.is_empty() {
            live.retain(|id| run.graph.node(*id).is_some_and(|node| node.has_next()));
            for &source in &live {
                let Some(records) = run.invoke(source, Record::empty())? else {
                    stopped = true;
                    break 'rounds;
                };
                deliver(&run.graph, source, records, &mut inboxes);
                if !drain(run, &mut inboxes)? {
                    stopped = true;
                    break 'rounds;
                }
            }
            // Lets a stop request or other tasks in on a current-thread runtime.
            tokio::task::yield_now().await;
        }

        for &id in &run.order {
            let flushed = run.close(id)?;
            if stopped || run.is_stopped() {
                continue;
            }
            deliver(&run.graph, id, flushed, &mut inboxes);
            if !drain(run, &mut inboxes)? {
                stopped = true;
            }
        }
        Ok(())
    }
}

/// Hands records to every successor: clones for all but the last, which takes the original.
pub(crate) fn deliver(
    graph: &ExecutionGraph,
    from: OperatorId,
    records: Vec<Record>,
    inboxes: &mut Inboxes,
) {
    let successors = graph.successors(from);
    let Some((last, rest)) = successors.split_last() else {
        return;
    };
    for record in records {
        for successor in rest {
            if let Some(inbox) = inboxes.get_mut(successor) {
                inbox.push_back(record.clone());
            }
        }
        if let Some(inbox) = inboxes.get_mut(last) {
            inbox.push_back(record);
        }
    }
}

/// Processes queued records in topological order until every inbox is empty.
/// Returns `false` if the run was stopped meanwhile.
fn drain(run: &GraphRun, inboxes: &mut Inboxes) -> Result<bool, EngineError> {
    for &id in &run.order {
        while let Some(record) = inboxes.get_mut(&id).and_then(VecDeque::pop_front) {
            let Some(records) = run.invoke(id, record)? else {
                return Ok(false);
            };
            deliver(&run.graph, id, records, inboxes);
        }
    }
    Ok(true)
}

#[async_trait]
impl GraphExecutor for SingleThreadedExecutor {
    fn strategy(&self) -> &'static str {
        "single_threaded"
    }

    async fn run(&self, run: GraphRun) -> Result<(), EngineError> {
        let result = self.drive(&run).await;
        if result.is_err() {
            run.close_open();
        }
        result
    }
}
