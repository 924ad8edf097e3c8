// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Fluent pipeline builder.
//!
//! A [`DataStream`] owns the graph it is building and tracks the operator the next step
//! attaches to. Every step consumes the handle and returns it, so a graph has exactly one
//! mutator until it is finalized and handed to the engine.

use tokio::task::JoinHandle;

use crate::engine::{GraphId, GraphState, StreamEngine};
use crate::errors::{DataErrorPolicy, EngineError, FunctionError};
use crate::function::{
    BatchSink, FieldKey, FilterFunction, FlatMapFunction, FnFilter, FnFlatMap, FnMap, FnSink,
    GeneratorSource, JoinFunction, KeySelector, MapFunction, SinkFunction, SourceFunction,
};
use crate::graph::{ExecutionGraph, OperatorId};
use crate::message::Message;
use crate::metrics::UidGenerator;
use crate::operator::{
    build_operator, AggregateConfig, AggregateOperator, FilterOperator, FlatMapOperator,
    KeyByConfig, KeyByOperator, MapOperator, OperatorConfig, OperatorKind, SinkOperator,
    SourceOperator, TopKConfig, TopKOperator, UnionOperator, WindowConfig, WindowOperator,
};
use crate::traits::Operator;

/// The operator the next step connects from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Tail {
    Empty,
    At(OperatorId),
}

enum Phase {
    Building(ExecutionGraph),
    Finalized(GraphId),
}

pub struct DataStream {
    engine: StreamEngine,
    uids: UidGenerator,
    policy: DataErrorPolicy,
    phase: Phase,
    tail: Tail,
}

impl DataStream {
    /// An empty stream that will run on `engine`. `uids` issues ids for messages that
    /// operators create (configured sources, aggregate summaries).
    pub fn new(engine: StreamEngine, uids: UidGenerator) -> Self {
        Self {
            engine,
            uids,
            policy: DataErrorPolicy::default(),
            phase: Phase::Building(ExecutionGraph::new()),
            tail: Tail::Empty,
        }
    }

    /// Policy for data errors in operators added after this call.
    pub fn with_data_error_policy(mut self, policy: DataErrorPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn from_source(self, function: impl SourceFunction + 'static) -> Result<Self, EngineError> {
        let source = SourceOperator::new(self.next_name(OperatorKind::Source), function)
            .with_policy(self.policy);
        self.start(Box::new(source))
    }

    /// Source driven by `generator`; stops after `max_messages` (0 means unlimited).
    pub fn from_generator<F>(self, generator: F, max_messages: u64) -> Result<Self, EngineError>
    where
        F: FnMut() -> Option<Message> + Send + 'static,
    {
        self.from_source(GeneratorSource::with_limit(generator, max_messages))
    }

    pub fn map<F>(self, f: F) -> Result<Self, EngineError>
    where
        F: FnMut(Message) -> Result<Message, FunctionError> + Send + 'static,
    {
        self.map_with(FnMap::new(f))
    }

    pub fn map_with(self, function: impl MapFunction + 'static) -> Result<Self, EngineError> {
        let map = MapOperator::new(self.next_name(OperatorKind::Map), function).with_policy(self.policy);
        self.push(Box::new(map))
    }

    pub fn filter<F>(self, predicate: F) -> Result<Self, EngineError>
    where
        F: FnMut(&Message) -> bool + Send + 'static,
    {
        self.filter_with(FnFilter::new(predicate))
    }

    pub fn filter_with(self, function: impl FilterFunction + 'static) -> Result<Self, EngineError> {
        let filter = FilterOperator::new(self.next_name(OperatorKind::Filter), function);
        self.push(Box::new(filter))
    }

    pub fn flat_map<F>(self, f: F) -> Result<Self, EngineError>
    where
        F: FnMut(Message) -> Result<Vec<Message>, FunctionError> + Send + 'static,
    {
        self.flat_map_with(FnFlatMap::new(f))
    }

    pub fn flat_map_with(
        self,
        function: impl FlatMapFunction + 'static,
    ) -> Result<Self, EngineError> {
        let flat_map = FlatMapOperator::new(self.next_name(OperatorKind::FlatMap), function)
            .with_policy(self.policy);
        self.push(Box::new(flat_map))
    }

    pub fn key_by(
        self,
        selector: impl KeySelector + 'static,
        config: &KeyByConfig,
    ) -> Result<Self, EngineError> {
        let selector: Box<dyn KeySelector> = Box::new(selector);
        let key_by = KeyByOperator::new(self.next_name(OperatorKind::KeyBy), Some(selector), config)
        .map_err(EngineError::from_construction)?;
        self.push(Box::new(key_by))
    }

    /// Keys by a metadata field with the default hash partitioning.
    pub fn key_by_field(self, field: &str) -> Result<Self, EngineError> {
        self.key_by(FieldKey::new(field), &KeyByConfig::default())
    }

    pub fn window(self, config: &WindowConfig) -> Result<Self, EngineError> {
        let window = WindowOperator::new(self.next_name(OperatorKind::Window), config)
            .map_err(EngineError::from_construction)?;
        self.push(Box::new(window))
    }

    pub fn aggregate(self, config: &AggregateConfig) -> Result<Self, EngineError> {
        let aggregate = AggregateOperator::new(
            self.next_name(OperatorKind::Aggregate),
            config,
            self.uids.clone(),
        )
        .map_err(EngineError::from_construction)?;
        self.push(Box::new(aggregate))
    }

    pub fn top_k(self, config: &TopKConfig) -> Result<Self, EngineError> {
        let top_k = TopKOperator::new(self.next_name(OperatorKind::TopK), config)
            .map_err(EngineError::from_construction)?;
        self.push(Box::new(top_k))
    }

    /// Adds an operator described by configuration. A source configuration starts the stream.
    pub fn apply(self, config: &OperatorConfig) -> Result<Self, EngineError> {
        let kind = match config {
            OperatorConfig::Source(_) => OperatorKind::Source,
            OperatorConfig::KeyBy(_) => OperatorKind::KeyBy,
            OperatorConfig::Window(_) => OperatorKind::Window,
            OperatorConfig::Aggregate(_) => OperatorKind::Aggregate,
            OperatorConfig::TopK(_) => OperatorKind::TopK,
        };
        let operator = build_operator(&self.next_name(kind), config, &self.uids)
            .map_err(EngineError::from_construction)?;
        match kind {
            OperatorKind::Source => self.start(operator),
            _ => self.push(operator),
        }
    }

    /// Merges `other` into this stream. Both branches feed a pass-through union operator,
    /// which becomes the new tail.
    pub fn union(mut self, other: DataStream) -> Result<Self, EngineError> {
        let left = self.require_tail(OperatorKind::Union)?;
        let (other_graph, right) = match (other.phase, other.tail) {
            (Phase::Building(graph), Tail::At(tail)) => (graph, tail),
            (Phase::Building(_), Tail::Empty) => {
                return Err(EngineError::InvalidGraph(
                    "cannot union a stream that has no source".into(),
                ))
            }
            (Phase::Finalized(graph_id), _) => {
                return Err(EngineError::InvalidGraph(format!(
                    "cannot union graph {graph_id}: it is already finalized"
                )))
            }
        };

        let graph = self.graph_mut()?;
        let mapping = graph.absorb(other_graph);
        let right = mapping.get(&right).copied().ok_or_else(|| {
            EngineError::Runtime(format!("operator {right} lost while merging streams"))
        })?;
        let name = format!("{}_{}", OperatorKind::Union, graph.len());
        let union = graph.add(UnionOperator::new(name));
        graph.connect_operators(left, union)?;
        graph.connect_operators(right, union)?;
        self.tail = Tail::At(union);
        Ok(self)
    }

    /// Two-input joins are not supported; this always fails with `NotImplemented`.
    pub fn connect(
        self,
        other: DataStream,
        join: impl JoinFunction + 'static,
    ) -> Result<Self, EngineError> {
        drop((other, join));
        Err(EngineError::NotImplemented("connect: two-input join streams"))
    }

    /// Adds a closure sink, then finalizes, submits and runs the graph to completion.
    /// The returned handle can be inspected with [`state`](Self::state).
    pub async fn sink<F>(self, f: F) -> Result<Self, EngineError>
    where
        F: FnMut(Message) + Send + 'static,
    {
        let mut stream = self.add_sink(f)?;
        stream.execute().await?;
        Ok(stream)
    }

    /// Adds a closure sink and finalizes; execution is deferred.
    pub fn add_sink<F>(self, f: F) -> Result<Self, EngineError>
    where
        F: FnMut(Message) + Send + 'static,
    {
        self.add_sink_with(FnSink::new(f))
    }

    pub fn add_sink_with(self, function: impl SinkFunction + 'static) -> Result<Self, EngineError> {
        let sink = SinkOperator::new(self.next_name(OperatorKind::Sink), function);
        let mut stream = self.push(Box::new(sink))?;
        stream.finalize()?;
        Ok(stream)
    }

    /// Sink that hands `batch_size` messages at a time to `on_batch`; the last partial
    /// batch is delivered when the graph closes.
    pub fn batch_sink<F>(self, batch_size: usize, on_batch: F) -> Result<Self, EngineError>
    where
        F: FnMut(Vec<Message>) -> Result<(), FunctionError> + Send + 'static,
    {
        self.add_sink_with(BatchSink::new(batch_size, on_batch))
    }

    /// Validates the graph and submits it to the engine. Repeated calls return the same id.
    pub fn finalize(&mut self) -> Result<GraphId, EngineError> {
        let graph = match &mut self.phase {
            Phase::Finalized(graph_id) => return Ok(*graph_id),
            Phase::Building(graph) => graph,
        };
        if graph.is_empty() {
            return Err(EngineError::InvalidGraph(
                "cannot finalize a stream with no operators".into(),
            ));
        }
        graph.validate()?;
        let graph_id = self.engine.submit_graph(std::mem::take(graph))?;
        self.phase = Phase::Finalized(graph_id);
        Ok(graph_id)
    }

    /// Finalizes if needed, then runs the graph with the engine's current mode.
    pub async fn execute(&mut self) -> Result<(), EngineError> {
        let graph_id = self.finalize()?;
        self.engine.execute_graph(graph_id).await
    }

    /// Finalizes if needed, then starts the graph in the background.
    pub fn execute_async(&mut self) -> Result<JoinHandle<Result<(), EngineError>>, EngineError> {
        let graph_id = self.finalize()?;
        self.engine.execute_graph_async(graph_id)
    }

    /// No-op before finalization. Safe to call from inside one of the stream's own
    /// functions; see [`StreamEngine::stop_graph`].
    pub fn stop(&self) {
        if let Phase::Finalized(graph_id) = self.phase {
            self.engine.stop_graph(graph_id);
        }
    }

    /// `Unknown` until finalized.
    pub fn state(&self) -> GraphState {
        match self.phase {
            Phase::Finalized(graph_id) => self.engine.graph_state(graph_id),
            Phase::Building(_) => GraphState::Unknown,
        }
    }

    pub fn graph_id(&self) -> Option<GraphId> {
        match self.phase {
            Phase::Finalized(graph_id) => Some(graph_id),
            Phase::Building(_) => None,
        }
    }

    pub fn operator_count(&self) -> usize {
        match &self.phase {
            Phase::Building(graph) => graph.len(),
            Phase::Finalized(graph_id) => self
                .engine
                .graph(*graph_id)
                .map_or(0, |graph| graph.len()),
        }
    }

    pub fn is_executing(&self) -> bool {
        self.state() == GraphState::Running
    }

    pub fn last_operator(&self) -> Option<OperatorId> {
        match self.tail {
            Tail::At(id) => Some(id),
            Tail::Empty => None,
        }
    }

    pub fn engine(&self) -> &StreamEngine {
        &self.engine
    }

    fn next_name(&self, kind: OperatorKind) -> String {
        format!("{kind}_{}", self.operator_count())
    }

    fn graph_mut(&mut self) -> Result<&mut ExecutionGraph, EngineError> {
        match &mut self.phase {
            Phase::Building(graph) => Ok(graph),
            Phase::Finalized(graph_id) => Err(EngineError::InvalidGraph(format!(
                "stream already finalized as graph {graph_id}"
            ))),
        }
    }

    fn require_tail(&mut self, kind: OperatorKind) -> Result<OperatorId, EngineError> {
        self.graph_mut()?;
        match self.tail {
            Tail::At(id) => Ok(id),
            Tail::Empty => Err(EngineError::InvalidGraph(format!(
                "{kind} requires a source upstream"
            ))),
        }
    }

    fn start(mut self, source: Box<dyn Operator>) -> Result<Self, EngineError> {
        let graph = self.graph_mut()?;
        if !graph.is_empty() {
            return Err(EngineError::InvalidGraph(
                "stream already has a source; use union to merge streams".into(),
            ));
        }
        let id = graph.add_operator(source);
        self.tail = Tail::At(id);
        Ok(self)
    }

    fn push(mut self, operator: Box<dyn Operator>) -> Result<Self, EngineError> {
        let previous = self.require_tail(operator.kind())?;
        let graph = self.graph_mut()?;
        let id = graph.add_operator(operator);
        graph.connect_operators(previous, id)?;
        self.tail = Tail::At(id);
        Ok(self)
    }
}
