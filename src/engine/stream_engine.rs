// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! The engine: graph registry, state machine and execution entry points.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;

use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::Instrument;

use crate::config::EngineConfig;
use crate::engine::{ExecutionMode, ExecutorFactory, GraphId, GraphRun, GraphState, RunGate};
use crate::errors::{EngineError, GraphError};
use crate::graph::{ExecutionGraph, OperatorId};
use crate::metrics::{SharedCounter, StatsSnapshot};
use crate::observability::messages::engine::{
    EngineShutdown, ExecutionCompleted, ExecutionFailed, ExecutionStarted, ExecutionStopped,
    SchedulingChanged,
};
use crate::observability::messages::graph::{
    CycleDetected, GraphRemoved, GraphSubmitted, StopRequested,
};
use crate::observability::messages::StructuredLog;
use crate::traits::GraphExecutor;

#[derive(Debug, Clone, Copy)]
struct Settings {
    mode: ExecutionMode,
    thread_count: usize,
    channel_capacity: usize,
}

struct GraphEntry {
    graph: Arc<ExecutionGraph>,
    state: GraphState,
    gate: Arc<RunGate>,
}

struct Shared {
    settings: Mutex<Settings>,
    graphs: Mutex<HashMap<GraphId, GraphEntry>>,
    next_graph_id: AtomicU64,
    processed: SharedCounter,
    metrics_epoch: Mutex<Instant>,
}

/// Runs submitted graphs.
///
/// A cheap, cloneable handle: clones share the registry, settings and counters, so the
/// state of a graph running in the background can be polled from any thread.
#[derive(Clone)]
pub struct StreamEngine {
    shared: Arc<Shared>,
}

/// Bookkeeping maps hold plain data, so a panic elsewhere cannot leave them half-written.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl Default for StreamEngine {
    fn default() -> Self {
        Self::new(&EngineConfig::default())
    }
}

impl StreamEngine {
    pub fn new(config: &EngineConfig) -> Self {
        Self::with_counter(config, SharedCounter::new())
    }

    /// Uses `processed` as the engine-wide processed-record counter.
    pub fn with_counter(config: &EngineConfig, processed: SharedCounter) -> Self {
        let settings = Settings {
            mode: config.execution_mode,
            thread_count: config.thread_count().max(1),
            channel_capacity: config.channel_capacity().max(1),
        };
        Self {
            shared: Arc::new(Shared {
                settings: Mutex::new(settings),
                graphs: Mutex::new(HashMap::new()),
                next_graph_id: AtomicU64::new(0),
                processed,
                metrics_epoch: Mutex::new(Instant::now()),
            }),
        }
    }

    /// A fresh empty graph, not yet tracked by the engine.
    pub fn create_graph(&self) -> ExecutionGraph {
        ExecutionGraph::new()
    }

    /// Validates and registers a graph in the `Submitted` state.
    ///
    /// A rejected graph is not registered and consumes no id.
    pub fn submit_graph(&self, graph: ExecutionGraph) -> Result<GraphId, EngineError> {
        if let Err(error) = graph.validate() {
            if let GraphError::Cycle { cycle } = &error {
                CycleDetected { cycle }.log();
            }
            return Err(error.into());
        }

        let mut graphs = lock(&self.shared.graphs);
        let graph_id = GraphId::from(self.shared.next_graph_id.fetch_add(1, Ordering::SeqCst));
        GraphSubmitted {
            graph_id,
            operator_count: graph.len(),
        }
        .log();
        graphs.insert(
            graph_id,
            GraphEntry {
                graph: Arc::new(graph),
                state: GraphState::Submitted,
                gate: Arc::new(RunGate::new()),
            },
        );
        Ok(graph_id)
    }

    /// Runs a submitted graph to completion.
    ///
    /// In `Async` mode the run is started in the background and this returns once the
    /// graph is `Running`. Failures leave the graph in `Error`, inspectable through
    /// [`graph_state`](Self::graph_state).
    pub async fn execute_graph(&self, graph_id: GraphId) -> Result<(), EngineError> {
        let settings = self.settings();
        if settings.mode == ExecutionMode::Async {
            self.execute_graph_async(graph_id)?;
            return Ok(());
        }
        let (run, executor) = self.prepare(graph_id, settings)?;
        self.drive(run, executor).await
    }

    /// Starts a submitted graph on the current tokio runtime and returns its handle.
    pub fn execute_graph_async(
        &self,
        graph_id: GraphId,
    ) -> Result<JoinHandle<Result<(), EngineError>>, EngineError> {
        let handle = Handle::try_current()
            .map_err(|e| EngineError::Runtime(format!("no tokio runtime available: {e}")))?;
        let (run, executor) = self.prepare(graph_id, self.settings())?;

        let span = ExecutionStarted {
            graph_id,
            strategy: executor.strategy(),
            operator_count: run.graph.len(),
            thread_count: self.thread_count(),
        }
        .span("background_execution");
        let engine = self.clone();
        Ok(handle.spawn(async move { engine.drive(run, executor).await }.instrument(span)))
    }

    /// Moves the graph to `Running` and builds its run. Only `Submitted` graphs may start.
    fn prepare(
        &self,
        graph_id: GraphId,
        settings: Settings,
    ) -> Result<(GraphRun, Box<dyn GraphExecutor>), EngineError> {
        let mut graphs = lock(&self.shared.graphs);
        let entry = graphs
            .get_mut(&graph_id)
            .ok_or(EngineError::GraphNotFound(graph_id))?;
        if entry.state != GraphState::Submitted {
            return Err(EngineError::InvalidState {
                graph_id,
                state: entry.state,
            });
        }

        let order = match entry.graph.topological_order() {
            Ok(order) => order,
            Err(GraphError::Cycle { cycle }) => {
                entry.state = GraphState::Error;
                return Err(EngineError::CyclicGraph { graph_id, cycle });
            }
            Err(other) => {
                entry.state = GraphState::Error;
                return Err(other.into());
            }
        };
        entry.state = GraphState::Running;

        let run = GraphRun {
            graph_id,
            graph: entry.graph.clone(),
            order,
            gate: entry.gate.clone(),
            processed: self.shared.processed.clone(),
        };
        let executor = ExecutorFactory::for_mode(
            settings.mode,
            settings.thread_count,
            settings.channel_capacity,
        );
        Ok((run, executor))
    }

    async fn drive(
        &self,
        run: GraphRun,
        executor: Box<dyn GraphExecutor>,
    ) -> Result<(), EngineError> {
        let graph_id = run.graph_id;
        let gate = run.gate.clone();
        let strategy = executor.strategy();
        ExecutionStarted {
            graph_id,
            strategy,
            operator_count: run.graph.len(),
            thread_count: self.thread_count(),
        }
        .log();

        let started = Instant::now();
        let processed_before = self.shared.processed.get();
        let survivor = run.clone();
        // Spawned so a panicking operator surfaces as a join error instead of unwinding here.
        let result = match tokio::spawn(async move { executor.run(run).await }).await {
            Ok(result) => result,
            Err(error) => {
                survivor.close_open();
                let reason = if error.is_panic() { "panicked" } else { "was cancelled" };
                Err(EngineError::Runtime(format!("graph execution {reason}: {error}")))
            }
        };
        let duration = started.elapsed();

        let mut graphs = lock(&self.shared.graphs);
        let Some(entry) = graphs.get_mut(&graph_id) else {
            // Removed while running.
            return result;
        };

        if gate.is_stopped() {
            entry.state = GraphState::Stopped;
            ExecutionStopped { graph_id, duration }.log();
            return Ok(());
        }
        match result {
            Ok(()) => {
                entry.state = GraphState::Completed;
                ExecutionCompleted {
                    graph_id,
                    strategy,
                    processed: self.shared.processed.get().saturating_sub(processed_before),
                    duration,
                }
                .log();
                Ok(())
            }
            Err(error) => {
                entry.state = GraphState::Error;
                ExecutionFailed {
                    graph_id,
                    strategy,
                    error: &error,
                }
                .log();
                Err(error)
            }
        }
    }

    /// Stops a graph. Unknown, completed or already stopped graphs are left alone.
    ///
    /// Returns after in-flight operator calls have finished; no further call starts.
    /// Called from inside an operator of the same graph, it returns without waiting for
    /// calls running on other threads.
    pub fn stop_graph(&self, graph_id: GraphId) {
        let gate = {
            let graphs = lock(&self.shared.graphs);
            match graphs.get(&graph_id) {
                Some(entry) if matches!(entry.state, GraphState::Running | GraphState::Submitted) => {
                    StopRequested {
                        graph_id,
                        state: entry.state,
                    }
                    .log();
                    entry.gate.clone()
                }
                _ => return,
            }
        };

        gate.stop();

        let mut graphs = lock(&self.shared.graphs);
        if let Some(entry) = graphs.get_mut(&graph_id) {
            if matches!(entry.state, GraphState::Running | GraphState::Submitted) {
                entry.state = GraphState::Stopped;
            }
        }
    }

    /// Stops then forgets a graph. Returns whether it was registered.
    pub fn remove_graph(&self, graph_id: GraphId) -> bool {
        self.stop_graph(graph_id);
        let removed = lock(&self.shared.graphs).remove(&graph_id).is_some();
        if removed {
            GraphRemoved { graph_id }.log();
        }
        removed
    }

    pub fn graph_state(&self, graph_id: GraphId) -> GraphState {
        lock(&self.shared.graphs)
            .get(&graph_id)
            .map(|entry| entry.state)
            .unwrap_or(GraphState::Unknown)
    }

    pub fn is_graph_running(&self, graph_id: GraphId) -> bool {
        self.graph_state(graph_id) == GraphState::Running
    }

    /// Registered graph ids, ascending.
    pub fn submitted_graphs(&self) -> Vec<GraphId> {
        let mut ids: Vec<GraphId> = lock(&self.shared.graphs).keys().copied().collect();
        ids.sort();
        ids
    }

    /// Read-only view of a registered graph.
    pub fn graph(&self, graph_id: GraphId) -> Option<Arc<ExecutionGraph>> {
        lock(&self.shared.graphs)
            .get(&graph_id)
            .map(|entry| entry.graph.clone())
    }

    /// Per-operator counters of a registered graph.
    pub fn operator_stats(
        &self,
        graph_id: GraphId,
    ) -> Result<BTreeMap<OperatorId, StatsSnapshot>, EngineError> {
        let graph = self
            .graph(graph_id)
            .ok_or(EngineError::GraphNotFound(graph_id))?;
        Ok(graph.nodes().map(|(id, node)| (id, node.stats())).collect())
    }

    /// Applies from the next execution; running graphs are unaffected.
    pub fn set_execution_mode(&self, mode: ExecutionMode) {
        let mut settings = lock(&self.shared.settings);
        settings.mode = mode;
        SchedulingChanged {
            mode,
            thread_count: settings.thread_count,
        }
        .log();
    }

    pub fn execution_mode(&self) -> ExecutionMode {
        self.settings().mode
    }

    /// Clamped to at least 1. Applies from the next execution.
    pub fn set_thread_count(&self, thread_count: usize) {
        let mut settings = lock(&self.shared.settings);
        settings.thread_count = thread_count.max(1);
        SchedulingChanged {
            mode: settings.mode,
            thread_count: settings.thread_count,
        }
        .log();
    }

    pub fn thread_count(&self) -> usize {
        self.settings().thread_count
    }

    /// Records passed through any operator since construction or the last reset.
    pub fn total_processed_messages(&self) -> u64 {
        self.shared.processed.get()
    }

    /// Processed records per second since construction or the last reset.
    pub fn throughput(&self) -> f64 {
        let elapsed = lock(&self.shared.metrics_epoch).elapsed().as_secs_f64();
        if elapsed <= f64::EPSILON {
            return 0.0;
        }
        self.total_processed_messages() as f64 / elapsed
    }

    pub fn reset_metrics(&self) {
        self.shared.processed.reset();
        *lock(&self.shared.metrics_epoch) = Instant::now();
    }

    /// Stops every submitted or running graph.
    pub fn shutdown(&self) {
        let ids = self.submitted_graphs();
        EngineShutdown {
            graph_count: ids.len(),
        }
        .log();
        for graph_id in ids {
            self.stop_graph(graph_id);
        }
    }

    /// Whether both handles refer to the same engine.
    pub fn ptr_eq(&self, other: &StreamEngine) -> bool {
        Arc::ptr_eq(&self.shared, &other.shared)
    }

    fn settings(&self) -> Settings {
        *lock(&self.shared.settings)
    }
}
