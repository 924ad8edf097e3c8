// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Named execution context that owns an engine and the streams submitted to it.

use std::collections::BTreeMap;

use tokio::task::JoinHandle;

use crate::api::DataStream;
use crate::config::EngineConfig;
use crate::engine::{ExecutionMode, GraphId, GraphState, StreamEngine};
use crate::errors::{DataErrorPolicy, EngineError};
use crate::function::{IterSource, SourceFunction};
use crate::message::Message;
use crate::metrics::UidGenerator;
use crate::observability::messages::environment::{EnvironmentClosed, StreamsLaunched};
use crate::observability::messages::StructuredLog;

type RunHandle = JoinHandle<Result<(), EngineError>>;

pub struct Environment {
    name: String,
    engine: StreamEngine,
    uids: UidGenerator,
    policy: DataErrorPolicy,
    properties: BTreeMap<String, String>,
    streams: Vec<GraphId>,
    running: Vec<RunHandle>,
}

impl Environment {
    pub fn new(name: impl Into<String>) -> Self {
        Self::from_config(name, &EngineConfig::default())
    }

    /// Engine settings, data error policy and initial properties come from `config`.
    pub fn from_config(name: impl Into<String>, config: &EngineConfig) -> Self {
        Self {
            name: name.into(),
            engine: StreamEngine::new(config),
            uids: UidGenerator::new(),
            policy: config.data_error_policy,
            properties: config.properties.clone(),
            streams: Vec::new(),
            running: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// An empty stream bound to this environment's engine.
    pub fn stream(&self) -> DataStream {
        DataStream::new(self.engine.clone(), self.uids.clone()).with_data_error_policy(self.policy)
    }

    pub fn from_source(
        &self,
        function: impl SourceFunction + 'static,
    ) -> Result<DataStream, EngineError> {
        self.stream().from_source(function)
    }

    /// Stops after `max_messages` (0 means unlimited).
    pub fn from_generator<F>(&self, generator: F, max_messages: u64) -> Result<DataStream, EngineError>
    where
        F: FnMut() -> Option<Message> + Send + 'static,
    {
        self.stream().from_generator(generator, max_messages)
    }

    pub fn from_iter<I>(&self, messages: I) -> Result<DataStream, EngineError>
    where
        I: IntoIterator<Item = Message>,
        I::IntoIter: Send + 'static,
    {
        self.stream().from_source(IterSource::new(messages))
    }

    pub fn set_thread_count(&self, thread_count: usize) {
        self.engine.set_thread_count(thread_count);
    }

    pub fn set_execution_mode(&self, mode: ExecutionMode) {
        self.engine.set_execution_mode(mode);
    }

    pub fn set_property(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.properties.insert(key.into(), value.into());
    }

    pub fn property(&self, key: &str) -> Option<&str> {
        self.properties.get(key).map(String::as_str)
    }

    /// Finalizes `stream` and registers it for the next batch or streaming run.
    pub fn submit(&mut self, mut stream: DataStream) -> Result<GraphId, EngineError> {
        if !stream.engine().ptr_eq(&self.engine) {
            return Err(EngineError::InvalidGraph(format!(
                "stream was built for another engine than environment '{}'",
                self.name
            )));
        }
        let graph_id = stream.finalize()?;
        if !self.streams.contains(&graph_id) {
            self.streams.push(graph_id);
        }
        Ok(graph_id)
    }

    /// Runs every stream that has not run yet, one after another, each to completion.
    ///
    /// Every stream is attempted; the first failure is returned.
    pub async fn run_batch(&mut self) -> Result<(), EngineError> {
        let pending = self.pending();
        StreamsLaunched {
            environment: &self.name,
            run_kind: "batch",
            stream_count: pending.len(),
        }
        .log();

        let mut first_error = None;
        for graph_id in pending {
            let outcome = match self.engine.execute_graph_async(graph_id) {
                Ok(handle) => join(handle).await,
                Err(error) => Err(error),
            };
            if let Err(error) = outcome {
                first_error.get_or_insert(error);
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    /// Starts every stream that has not run yet in the background and returns.
    pub fn run_streaming(&mut self) -> Result<(), EngineError> {
        let pending = self.pending();
        StreamsLaunched {
            environment: &self.name,
            run_kind: "streaming",
            stream_count: pending.len(),
        }
        .log();

        for graph_id in pending {
            let handle = self.engine.execute_graph_async(graph_id)?;
            self.running.push(handle);
        }
        Ok(())
    }

    /// Waits for every stream started by [`run_streaming`](Self::run_streaming).
    /// Every run is awaited; the first failure is returned.
    pub async fn wait(&mut self) -> Result<(), EngineError> {
        let mut first_error = None;
        for handle in std::mem::take(&mut self.running) {
            if let Err(error) = join(handle).await {
                first_error.get_or_insert(error);
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    /// Stops every submitted stream.
    pub fn stop(&self) {
        for graph_id in &self.streams {
            self.engine.stop_graph(*graph_id);
        }
    }

    /// Stops everything and forgets all streams. Background runs are detached and wind
    /// down on their own once stopped.
    pub fn close(&mut self) {
        self.stop();
        EnvironmentClosed {
            environment: &self.name,
            stream_count: self.streams.len(),
        }
        .log();
        for graph_id in self.streams.drain(..) {
            self.engine.remove_graph(graph_id);
        }
        self.running.clear();
    }

    pub fn is_running(&self) -> bool {
        self.running_stream_count() > 0
    }

    pub fn submitted_stream_count(&self) -> usize {
        self.streams.len()
    }

    pub fn running_stream_count(&self) -> usize {
        self.streams
            .iter()
            .filter(|graph_id| self.engine.is_graph_running(**graph_id))
            .count()
    }

    pub fn stream_state(&self, graph_id: GraphId) -> GraphState {
        self.engine.graph_state(graph_id)
    }

    pub fn uid_generator(&self) -> &UidGenerator {
        &self.uids
    }

    pub fn engine(&self) -> &StreamEngine {
        &self.engine
    }

    fn pending(&self) -> Vec<GraphId> {
        self.streams
            .iter()
            .copied()
            .filter(|graph_id| self.engine.graph_state(*graph_id) == GraphState::Submitted)
            .collect()
    }
}

async fn join(handle: RunHandle) -> Result<(), EngineError> {
    handle
        .await
        .map_err(|e| EngineError::Runtime(format!("stream task failed: {e}")))?
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_properties_seeded_from_config() {
        let mut config = EngineConfig::default();
        config.properties.insert("job".into(), "nightly".into());
        let mut env = Environment::from_config("etl", &config);

        assert_eq!(env.name(), "etl");
        assert_eq!(env.property("job"), Some("nightly"));
        env.set_property("job", "hourly");
        assert_eq!(env.property("job"), Some("hourly"));
        assert_eq!(env.property("missing"), None);
    }

    #[test]
    fn test_submit_rejects_foreign_stream() {
        let mut env = Environment::new("a");
        let other = Environment::new("b");
        let stream = other
            .from_iter(vec![other.uid_generator().text("x")])
            .unwrap()
            .add_sink(|_| {})
            .unwrap();
        assert!(matches!(env.submit(stream), Err(EngineError::InvalidGraph(_))));
        assert_eq!(env.submitted_stream_count(), 0);
    }

    #[test]
    fn test_settings_forward_to_engine() {
        let env = Environment::new("tuning");
        env.set_thread_count(3);
        env.set_execution_mode(ExecutionMode::MultiThreaded);
        assert_eq!(env.engine().thread_count(), 3);
        assert_eq!(env.engine().execution_mode(), ExecutionMode::MultiThreaded);
    }
}
