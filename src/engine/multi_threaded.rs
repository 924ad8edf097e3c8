// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! One task per operator, connected by bounded channels.
//!
//! Each operator owns one inbox shared by all of its predecessors; a producer sends in
//! emission order, so every edge stays FIFO. A semaphore bounds how many `process` calls
//! run at once. A task closes its operator once its inbox is closed (all producers done)
//! and then drops its senders, which lets completion ripple downstream. The first
//! failure cancels every other task.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{mpsc, Semaphore};
use tokio_util::sync::CancellationToken;

use crate::config::consts::{DEFAULT_CHANNEL_CAPACITY, FALLBACK_THREAD_COUNT};
use crate::engine::GraphRun;
use crate::errors::EngineError;
use crate::graph::OperatorId;
use crate::message::Record;
use crate::operator::OperatorKind;
use crate::traits::GraphExecutor;

pub struct MultiThreadedExecutor {
    thread_count: usize,
    channel_capacity: usize,
}

impl MultiThreadedExecutor {
    pub fn new(thread_count: usize, channel_capacity: usize) -> Self {
        Self {
            thread_count: thread_count.max(1),
            channel_capacity: channel_capacity.max(1),
        }
    }

    pub fn thread_count(&self) -> usize {
        self.thread_count
    }
}

impl Default for MultiThreadedExecutor {
    fn default() -> Self {
        let threads = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(FALLBACK_THREAD_COUNT);
        Self::new(threads, DEFAULT_CHANNEL_CAPACITY)
    }
}

struct OperatorTask {
    id: OperatorId,
    run: Arc<GraphRun>,
    inbox: mpsc::Receiver<Record>,
    outputs: Vec<mpsc::Sender<Record>>,
    semaphore: Arc<Semaphore>,
    cancel: CancellationToken,
}

impl OperatorTask {
    async fn execute(mut self) -> Result<(), EngineError> {
        let result = self.process_all().await;
        if let Err(error) = result {
            self.cancel.cancel();
            return Err(error);
        }

        // Peers were cancelled by a failure or a stop: release resources, forward nothing.
        let flushed = match self.run.close(self.id) {
            Ok(flushed) => flushed,
            Err(_) if self.cancel.is_cancelled() => return Ok(()),
            Err(error) => {
                self.cancel.cancel();
                return Err(error);
            }
        };
        if !self.cancel.is_cancelled() {
            self.send(flushed).await;
        }
        Ok(())
    }

    async fn process_all(&mut self) -> Result<(), EngineError> {
        let is_source = self
            .run
            .node(self.id)?
            .kind()
            == OperatorKind::Source;

        loop {
            let input = if is_source {
                if self.cancel.is_cancelled() || !self.run.node(self.id)?.has_next() {
                    return Ok(());
                }
                Record::empty()
            } else {
                tokio::select! {
                    _ = self.cancel.cancelled() => return Ok(()),
                    received = self.inbox.recv() => match received {
                        Some(record) => record,
                        None => return Ok(()),
                    },
                }
            };

            let permit = tokio::select! {
                _ = self.cancel.cancelled() => return Ok(()),
                permit = self.semaphore.clone().acquire_owned() => permit
                    .map_err(|e| EngineError::Runtime(format!("scheduler closed: {e}")))?,
            };
            let output = self.run.invoke(self.id, input)?;
            drop(permit);

            match output {
                Some(records) => self.send(records).await,
                None => return Ok(()),
            }
            if is_source {
                tokio::task::yield_now().await;
            }
        }
    }

    /// Fans records out to every successor: clones for all but the last.
    async fn send(&self, records: Vec<Record>) {
        let Some((last, rest)) = self.outputs.split_last() else {
            return;
        };
        for record in records {
            for output in rest {
                self.send_one(output, record.clone()).await;
            }
            self.send_one(last, record).await;
        }
    }

    async fn send_one(&self, output: &mpsc::Sender<Record>, record: Record) {
        // A closed receiver means the consumer already stopped; nothing to deliver to.
        tokio::select! {
            _ = self.cancel.cancelled() => {}
            _ = output.send(record) => {}
        }
    }
}

#[async_trait]
impl GraphExecutor for MultiThreadedExecutor {
    fn strategy(&self) -> &'static str {
        "multi_threaded"
    }

    async fn run(&self, run: GraphRun) -> Result<(), EngineError> {
        if let Err(error) = run.open_all() {
            run.close_open();
            return Err(error);
        }

        let run = Arc::new(run);
        let cancel = run.gate.token().child_token();
        let semaphore = Arc::new(Semaphore::new(self.thread_count));

        let mut senders = HashMap::new();
        let mut receivers = HashMap::new();
        for &id in &run.order {
            let (sender, receiver) = mpsc::channel(self.channel_capacity);
            senders.insert(id, sender);
            receivers.insert(id, receiver);
        }

        let mut tasks = Vec::with_capacity(run.order.len());
        for &id in &run.order {
            let Some(inbox) = receivers.remove(&id) else {
                continue;
            };
            let outputs = run
                .graph
                .successors(id)
                .iter()
                .filter_map(|successor| senders.get(successor).cloned())
                .collect();
            let task = OperatorTask {
                id,
                run: run.clone(),
                inbox,
                outputs,
                semaphore: semaphore.clone(),
                cancel: cancel.clone(),
            };
            tasks.push(tokio::spawn(task.execute()));
        }
        // Only producer tasks hold senders now, so inboxes close as producers finish.
        drop(senders);

        let mut failure = None;
        for task in tasks {
            match task.await {
                Ok(Ok(())) => {}
                Ok(Err(error)) => {
                    failure.get_or_insert(error);
                }
                Err(join_error) => {
                    cancel.cancel();
                    failure.get_or_insert(EngineError::Runtime(format!(
                        "operator task failed: {join_error}"
                    )));
                }
            }
        }

        if failure.is_some() {
            run.close_open();
        }
        match failure {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}
