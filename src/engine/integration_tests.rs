//! Engine-level scenarios: hand-wired graphs of real operators run through every
//! scheduling mode.

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex, OnceLock};
    use std::time::Duration;

    use crate::config::EngineConfig;
    use crate::engine::{ExecutionMode, GraphId, GraphState, StreamEngine};
    use crate::errors::{EngineError, FunctionError};
    use crate::function::{BatchSink, FnFilter, FnMap, FnSink, GeneratorSource, IterSource};
    use crate::graph::{ExecutionGraph, OperatorId};
    use crate::message::Message;
    use crate::metrics::UidGenerator;
    use crate::operator::{
        AggregateConfig, AggregateOperator, FilterOperator, MapOperator, SinkOperator,
        SourceOperator, WindowConfig, WindowOperator,
    };

    type Collected = Arc<Mutex<Vec<Message>>>;

    fn text_source(uids: &UidGenerator, items: &[&str]) -> SourceOperator {
        let messages: Vec<Message> = items.iter().map(|text| uids.text(*text)).collect();
        SourceOperator::new("source", IterSource::new(messages))
    }

    fn collecting_sink(name: &str) -> (SinkOperator, Collected) {
        let collected: Collected = Arc::new(Mutex::new(Vec::new()));
        let sink_store = collected.clone();
        let sink = SinkOperator::new(
            name,
            FnSink::new(move |message: Message| sink_store.lock().unwrap().push(message)),
        );
        (sink, collected)
    }

    fn prefix_map(name: &str, prefix: &'static str) -> MapOperator {
        MapOperator::new(
            name,
            FnMap::new(move |mut message: Message| {
                let text = format!("{prefix}{}", message.text().unwrap_or_default());
                message.set_text(text);
                Ok(message)
            }),
        )
    }

    fn texts(collected: &Collected) -> Vec<String> {
        collected
            .lock()
            .unwrap()
            .iter()
            .map(|m| m.text().unwrap_or_default().to_string())
            .collect()
    }

    fn connect_chain(graph: &mut ExecutionGraph, ids: &[OperatorId]) {
        for pair in ids.windows(2) {
            graph.connect_operators(pair[0], pair[1]).unwrap();
        }
    }

    /// source -> map("X:") -> filter(len > 4) -> sink
    fn basic_pipeline(uids: &UidGenerator) -> (ExecutionGraph, Collected) {
        let mut graph = ExecutionGraph::new();
        let (sink, collected) = collecting_sink("sink");
        let ids = [
            graph.add(text_source(uids, &["a", "bb", "ccc", "dddd", "eeeee"])),
            graph.add(prefix_map("prefix", "X:")),
            graph.add(FilterOperator::new(
                "long",
                FnFilter::new(|m: &Message| m.text().map_or(false, |t| t.len() > 4)),
            )),
            graph.add(sink),
        ];
        connect_chain(&mut graph, &ids);
        (graph, collected)
    }

    /// Passes messages through, panicking on the text "bad".
    fn fragile_map(name: &str) -> MapOperator {
        MapOperator::new(
            name,
            FnMap::new(|message: Message| {
                if message.text() == Some("bad") {
                    panic!("unparseable payload");
                }
                Ok(message)
            }),
        )
    }

    fn fragile_pipeline(uids: &UidGenerator) -> (ExecutionGraph, Collected) {
        let mut graph = ExecutionGraph::new();
        let (sink, collected) = collecting_sink("sink");
        let ids = [
            graph.add(text_source(uids, &["ok", "bad", "late"])),
            graph.add(fragile_map("fragile")),
            graph.add(sink),
        ];
        connect_chain(&mut graph, &ids);
        (graph, collected)
    }

    /// Unbounded "tick" generator.
    fn ticks(uids: &UidGenerator) -> SourceOperator {
        let generated = uids.clone();
        SourceOperator::new(
            "ticks",
            GeneratorSource::new(move || Some(generated.text("tick"))),
        )
    }

    fn engine_with(mode: ExecutionMode, threads: usize) -> StreamEngine {
        StreamEngine::new(
            &EngineConfig::default()
                .with_execution_mode(mode)
                .with_thread_count(threads),
        )
    }

    #[tokio::test]
    async fn test_basic_pipeline_single_threaded() {
        let uids = UidGenerator::new();
        let engine = engine_with(ExecutionMode::SingleThreaded, 1);
        let (graph, collected) = basic_pipeline(&uids);

        let id = engine.submit_graph(graph).unwrap();
        engine.execute_graph(id).await.unwrap();

        assert_eq!(engine.graph_state(id), GraphState::Completed);
        assert_eq!(texts(&collected), ["X:ccc", "X:dddd", "X:eeeee"]);
        let first = &collected.lock().unwrap()[0];
        assert_eq!(first.processing_trace(), ["source", "prefix", "long", "sink"]);
        assert!(engine.total_processed_messages() >= 5);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_basic_pipeline_multi_threaded() {
        let uids = UidGenerator::new();
        let engine = engine_with(ExecutionMode::MultiThreaded, 4);
        let (graph, collected) = basic_pipeline(&uids);

        let id = engine.submit_graph(graph).unwrap();
        engine.execute_graph(id).await.unwrap();

        assert_eq!(engine.graph_state(id), GraphState::Completed);
        assert_eq!(texts(&collected), ["X:ccc", "X:dddd", "X:eeeee"]);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_diamond_preserves_per_branch_order() {
        let uids = UidGenerator::new();
        let engine = engine_with(ExecutionMode::MultiThreaded, 3);
        let mut graph = ExecutionGraph::new();
        let (sink, collected) = collecting_sink("sink");

        let items: Vec<String> = (0..20).map(|i| i.to_string()).collect();
        let refs: Vec<&str> = items.iter().map(String::as_str).collect();
        let source = graph.add(text_source(&uids, &refs));
        let left = graph.add(prefix_map("left", "L"));
        let right = graph.add(prefix_map("right", "R"));
        let sink = graph.add(sink);
        connect_chain(&mut graph, &[source, left, sink]);
        connect_chain(&mut graph, &[source, right, sink]);

        let id = engine.submit_graph(graph).unwrap();
        engine.execute_graph(id).await.unwrap();

        let seen = texts(&collected);
        assert_eq!(seen.len(), 40);
        for prefix in ["L", "R"] {
            let branch: Vec<String> = seen
                .iter()
                .filter(|t| t.starts_with(prefix))
                .cloned()
                .collect();
            let expected: Vec<String> = items.iter().map(|i| format!("{prefix}{i}")).collect();
            assert_eq!(branch, expected);
        }
    }

    #[tokio::test]
    async fn test_diamond_single_threaded_clones_for_fan_out() {
        let uids = UidGenerator::new();
        let engine = StreamEngine::default();
        let mut graph = ExecutionGraph::new();
        let (sink, collected) = collecting_sink("sink");
        let source = graph.add(text_source(&uids, &["m"]));
        let left = graph.add(prefix_map("left", "L"));
        let right = graph.add(prefix_map("right", "R"));
        let sink = graph.add(sink);
        connect_chain(&mut graph, &[source, left, sink]);
        connect_chain(&mut graph, &[source, right, sink]);

        let id = engine.submit_graph(graph).unwrap();
        engine.execute_graph(id).await.unwrap();

        let mut seen = texts(&collected);
        seen.sort();
        assert_eq!(seen, ["Lm", "Rm"]);
    }

    #[tokio::test]
    async fn test_generator_source_stops_when_exhausted() {
        let uids = UidGenerator::new();
        let engine = StreamEngine::default();
        let mut graph = ExecutionGraph::new();
        let (sink, collected) = collecting_sink("sink");

        let generated = uids.clone();
        let mut remaining = 4;
        let source = graph.add(SourceOperator::new(
            "numbers",
            GeneratorSource::new(move || {
                if remaining == 0 {
                    return None;
                }
                remaining -= 1;
                Some(generated.text(remaining.to_string()))
            }),
        ));
        let sink = graph.add(sink);
        graph.connect_operators(source, sink).unwrap();

        let id = engine.submit_graph(graph).unwrap();
        engine.execute_graph(id).await.unwrap();
        assert_eq!(texts(&collected), ["3", "2", "1", "0"]);
    }

    #[tokio::test]
    async fn test_data_error_does_not_fail_graph() {
        let uids = UidGenerator::new();
        let engine = StreamEngine::default();
        let mut graph = ExecutionGraph::new();
        let (sink, collected) = collecting_sink("sink");

        let parse = MapOperator::new(
            "parse",
            FnMap::new(|message: Message| {
                match message.text().map(str::parse::<i64>) {
                    Some(Ok(_)) => Ok(message),
                    _ => Err(FunctionError::record(message, "not a number")),
                }
            }),
        );
        let ids = [
            graph.add(text_source(&uids, &["1", "two", "3"])),
            graph.add(parse),
            graph.add(sink),
        ];
        connect_chain(&mut graph, &ids);

        let id = engine.submit_graph(graph).unwrap();
        engine.execute_graph(id).await.unwrap();
        assert_eq!(engine.graph_state(id), GraphState::Completed);
        assert_eq!(texts(&collected), ["1", "3"]);
    }

    #[tokio::test]
    async fn test_unconfigured_map_fails_graph() {
        let uids = UidGenerator::new();
        let engine = StreamEngine::default();
        let mut graph = ExecutionGraph::new();
        let (sink, _) = collecting_sink("sink");
        let ids = [
            graph.add(text_source(&uids, &["a"])),
            graph.add(MapOperator::unconfigured("missing")),
            graph.add(sink),
        ];
        connect_chain(&mut graph, &ids);

        let id = engine.submit_graph(graph).unwrap();
        let err = engine.execute_graph(id).await.unwrap_err();
        assert!(matches!(err, EngineError::OperatorNotConfigured { .. }));
        assert_eq!(engine.graph_state(id), GraphState::Error);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_fatal_error_fails_multi_threaded_graph() {
        let uids = UidGenerator::new();
        let engine = engine_with(ExecutionMode::MultiThreaded, 2);
        let mut graph = ExecutionGraph::new();
        let (sink, _) = collecting_sink("sink");
        let explode = MapOperator::new(
            "explode",
            FnMap::new(|_| Err(FunctionError::fatal("downstream store unavailable"))),
        );
        let ids = [
            graph.add(text_source(&uids, &["a", "b", "c"])),
            graph.add(explode),
            graph.add(sink),
        ];
        connect_chain(&mut graph, &ids);

        let id = engine.submit_graph(graph).unwrap();
        let err = engine.execute_graph(id).await.unwrap_err();
        assert!(matches!(err, EngineError::OperatorFailed { .. }));
        assert_eq!(engine.graph_state(id), GraphState::Error);
    }

    #[tokio::test]
    async fn test_stop_halts_unbounded_source() {
        let uids = UidGenerator::new();
        let engine = StreamEngine::default();
        let mut graph = ExecutionGraph::new();
        let (sink, collected) = collecting_sink("sink");
        let generated = uids.clone();
        let source = graph.add(SourceOperator::new(
            "ticks",
            GeneratorSource::new(move || Some(generated.text("tick"))),
        ));
        let sink = graph.add(sink);
        graph.connect_operators(source, sink).unwrap();

        let id = engine.submit_graph(graph).unwrap();
        let handle = engine.execute_graph_async(id).unwrap();
        assert_eq!(engine.graph_state(id), GraphState::Running);

        while collected.lock().unwrap().len() < 10 {
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
        engine.stop_graph(id);
        assert_eq!(engine.graph_state(id), GraphState::Stopped);
        let seen_at_stop = collected.lock().unwrap().len();

        handle.await.unwrap().unwrap();
        assert_eq!(engine.graph_state(id), GraphState::Stopped);
        assert_eq!(collected.lock().unwrap().len(), seen_at_stop);

        engine.stop_graph(id);
        assert_eq!(engine.graph_state(id), GraphState::Stopped);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_stop_multi_threaded_waits_for_in_flight_calls() {
        let uids = UidGenerator::new();
        let engine = engine_with(ExecutionMode::MultiThreaded, 4);
        let mut graph = ExecutionGraph::new();
        let (sink, collected) = collecting_sink("sink");
        let ids = [
            graph.add(ticks(&uids)),
            graph.add(prefix_map("prefix", "T:")),
            graph.add(sink),
        ];
        connect_chain(&mut graph, &ids);

        let id = engine.submit_graph(graph).unwrap();
        let handle = engine.execute_graph_async(id).unwrap();
        while collected.lock().unwrap().len() < 100 {
            tokio::time::sleep(Duration::from_millis(1)).await;
        }

        engine.stop_graph(id);
        assert_eq!(engine.graph_state(id), GraphState::Stopped);
        let seen_at_stop = collected.lock().unwrap().len();
        let processed_at_stop = engine.total_processed_messages();

        handle.await.unwrap().unwrap();
        assert_eq!(engine.graph_state(id), GraphState::Stopped);
        assert_eq!(collected.lock().unwrap().len(), seen_at_stop);
        assert_eq!(engine.total_processed_messages(), processed_at_stop);
    }

    #[tokio::test]
    async fn test_sink_can_stop_its_own_graph() {
        let uids = UidGenerator::new();
        let engine = StreamEngine::default();
        let own_id: Arc<OnceLock<GraphId>> = Arc::new(OnceLock::new());
        let collected: Collected = Arc::new(Mutex::new(Vec::new()));

        let (stopper, target, store) = (engine.clone(), own_id.clone(), collected.clone());
        let sink = SinkOperator::new(
            "enough",
            FnSink::new(move |message: Message| {
                let mut seen = store.lock().unwrap();
                seen.push(message);
                if seen.len() == 3 {
                    if let Some(id) = target.get() {
                        stopper.stop_graph(*id);
                    }
                }
            }),
        );
        let mut graph = ExecutionGraph::new();
        let ids = [graph.add(ticks(&uids)), graph.add(sink)];
        connect_chain(&mut graph, &ids);

        let id = engine.submit_graph(graph).unwrap();
        own_id.set(id).unwrap();
        engine.execute_graph(id).await.unwrap();

        assert_eq!(engine.graph_state(id), GraphState::Stopped);
        assert_eq!(collected.lock().unwrap().len(), 3);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_sink_can_stop_its_own_multi_threaded_graph() {
        let uids = UidGenerator::new();
        let engine = engine_with(ExecutionMode::MultiThreaded, 4);
        let own_id: Arc<OnceLock<GraphId>> = Arc::new(OnceLock::new());
        let collected: Collected = Arc::new(Mutex::new(Vec::new()));

        let (stopper, target, store) = (engine.clone(), own_id.clone(), collected.clone());
        let sink = SinkOperator::new(
            "enough",
            FnSink::new(move |message: Message| {
                let mut seen = store.lock().unwrap();
                seen.push(message);
                if seen.len() == 3 {
                    if let Some(id) = target.get() {
                        stopper.stop_graph(*id);
                    }
                }
            }),
        );
        let mut graph = ExecutionGraph::new();
        let ids = [graph.add(ticks(&uids)), graph.add(sink)];
        connect_chain(&mut graph, &ids);

        let id = engine.submit_graph(graph).unwrap();
        own_id.set(id).unwrap();
        let handle = engine.execute_graph_async(id).unwrap();
        tokio::time::timeout(Duration::from_secs(10), handle)
            .await
            .expect("run did not finish after stopping itself")
            .unwrap()
            .unwrap();

        assert_eq!(engine.graph_state(id), GraphState::Stopped);
        assert_eq!(collected.lock().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_panicking_operator_fails_single_threaded_graph() {
        let uids = UidGenerator::new();
        let engine = StreamEngine::default();
        let (graph, collected) = fragile_pipeline(&uids);

        let id = engine.submit_graph(graph).unwrap();
        let err = engine.execute_graph(id).await.unwrap_err();

        assert!(matches!(err, EngineError::Runtime(_)));
        assert_eq!(engine.graph_state(id), GraphState::Error);
        assert_eq!(texts(&collected), ["ok"]);
        let stats = engine.operator_stats(id).unwrap();
        assert_eq!(stats.values().last().map(|s| s.processed), Some(1));
    }

    #[tokio::test]
    async fn test_panicking_operator_fails_background_run() {
        let uids = UidGenerator::new();
        let engine = StreamEngine::default();
        let (graph, _) = fragile_pipeline(&uids);

        let id = engine.submit_graph(graph).unwrap();
        let handle = engine.execute_graph_async(id).unwrap();
        let result = handle.await.unwrap();

        assert!(matches!(result, Err(EngineError::Runtime(_))));
        assert_eq!(engine.graph_state(id), GraphState::Error);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_panicking_operator_fails_multi_threaded_graph() {
        let uids = UidGenerator::new();
        let engine = engine_with(ExecutionMode::MultiThreaded, 2);
        let (graph, _) = fragile_pipeline(&uids);

        let id = engine.submit_graph(graph).unwrap();
        let err = engine.execute_graph(id).await.unwrap_err();

        assert!(matches!(err, EngineError::Runtime(_)));
        assert_eq!(engine.graph_state(id), GraphState::Error);
    }

    #[tokio::test]
    async fn test_async_mode_returns_while_running() {
        let uids = UidGenerator::new();
        let engine = engine_with(ExecutionMode::Async, 1);
        let (graph, collected) = basic_pipeline(&uids);

        let id = engine.submit_graph(graph).unwrap();
        engine.execute_graph(id).await.unwrap();
        assert_ne!(engine.graph_state(id), GraphState::Submitted);

        while engine.graph_state(id) == GraphState::Running {
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
        assert_eq!(engine.graph_state(id), GraphState::Completed);
        assert_eq!(texts(&collected).len(), 3);
    }

    #[tokio::test]
    async fn test_batch_sink_flushes_partial_batch_on_close() {
        let uids = UidGenerator::new();
        let engine = StreamEngine::default();
        let mut graph = ExecutionGraph::new();
        let batches = Arc::new(Mutex::new(Vec::new()));
        let store = batches.clone();
        let source = graph.add(text_source(&uids, &["a", "b", "c", "d", "e"]));
        let sink = graph.add(SinkOperator::new(
            "batches",
            BatchSink::new(2, move |batch: Vec<Message>| {
                store.lock().unwrap().push(batch.len());
                Ok(())
            }),
        ));
        graph.connect_operators(source, sink).unwrap();

        let id = engine.submit_graph(graph).unwrap();
        engine.execute_graph(id).await.unwrap();
        assert_eq!(*batches.lock().unwrap(), vec![2, 2, 1]);
    }

    #[tokio::test]
    async fn test_window_then_aggregate() {
        let uids = UidGenerator::new();
        let engine = StreamEngine::default();
        let mut graph = ExecutionGraph::new();
        let (sink, collected) = collecting_sink("sink");
        let ids = [
            graph.add(text_source(&uids, &["a", "bb", "ccc", "dddd", "eeeee"])),
            graph.add(WindowOperator::new("pairs", &WindowConfig::tumbling("2")).unwrap()),
            graph.add(
                AggregateOperator::new(
                    "lengths",
                    &AggregateConfig::new().with("content_length", "sum"),
                    uids.clone(),
                )
                .unwrap(),
            ),
            graph.add(sink),
        ];
        connect_chain(&mut graph, &ids);

        let id = engine.submit_graph(graph).unwrap();
        engine.execute_graph(id).await.unwrap();

        let sums: Vec<String> = collected
            .lock()
            .unwrap()
            .iter()
            .map(|m| m.metadata_value("content_length_sum").unwrap_or_default().to_string())
            .collect();
        assert_eq!(sums, ["3", "7", "5"]);
    }

    #[tokio::test]
    async fn test_operator_stats_and_metrics_reset() {
        let uids = UidGenerator::new();
        let engine = StreamEngine::default();
        let (graph, _) = basic_pipeline(&uids);
        let id = engine.submit_graph(graph).unwrap();
        engine.execute_graph(id).await.unwrap();

        let stats = engine.operator_stats(id).unwrap();
        let counts: Vec<u64> = stats.values().map(|s| s.processed).collect();
        // Each process call on the source pulls one record; the final call finds it exhausted.
        assert_eq!(counts, [6, 5, 5, 3]);
        assert!(engine.throughput() >= 0.0);

        engine.reset_metrics();
        assert_eq!(engine.total_processed_messages(), 0);
    }
}
