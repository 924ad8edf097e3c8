//! End-to-end pipelines built through the environment and the fluent builder.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::api::Environment;
use crate::config::EngineConfig;
use crate::engine::{ExecutionMode, GraphState};
use crate::errors::{DataErrorPolicy, EngineError, FunctionError};
use crate::message::Message;
use crate::operator::{AggregateConfig, KeyByConfig, OperatorConfig, TopKConfig, WindowConfig};

type Collected = Arc<Mutex<Vec<Message>>>;

fn collector() -> (Collected, impl FnMut(Message) + Send + 'static) {
    let collected: Collected = Arc::new(Mutex::new(Vec::new()));
    let store = collected.clone();
    (collected, move |message: Message| store.lock().unwrap().push(message))
}

fn texts(collected: &Collected) -> Vec<String> {
    collected
        .lock()
        .unwrap()
        .iter()
        .map(|m| m.text().unwrap_or_default().to_string())
        .collect()
}

#[tokio::test]
async fn test_run_batch_executes_every_stream() {
    let mut env = Environment::new("batch");
    let uids = env.uid_generator().clone();

    let (upper, upper_sink) = collector();
    let shout = env
        .from_iter(vec![uids.text("hello"), uids.text("world")])
        .unwrap()
        .map(|mut m: Message| {
            let text = m.text().unwrap_or_default().to_uppercase();
            m.set_text(text);
            Ok(m)
        })
        .unwrap()
        .add_sink(upper_sink)
        .unwrap();

    let (split, split_sink) = collector();
    let words = env
        .from_iter(vec![uids.text("a b c")])
        .unwrap()
        .flat_map(|m: Message| {
            let pieces: Vec<Message> = m
                .text()
                .unwrap_or_default()
                .split(' ')
                .map(|word| {
                    let mut piece = m.clone();
                    piece.set_text(word);
                    piece
                })
                .collect();
            Ok(pieces)
        })
        .unwrap()
        .add_sink(split_sink)
        .unwrap();

    let shout_id = env.submit(shout).unwrap();
    let words_id = env.submit(words).unwrap();
    assert_eq!(env.submitted_stream_count(), 2);

    env.run_batch().await.unwrap();

    assert_eq!(env.stream_state(shout_id), GraphState::Completed);
    assert_eq!(env.stream_state(words_id), GraphState::Completed);
    assert_eq!(texts(&upper), ["HELLO", "WORLD"]);
    assert_eq!(texts(&split), ["a", "b", "c"]);
    assert!(!env.is_running());
}

#[tokio::test]
async fn test_run_batch_reports_failure_but_runs_the_rest() {
    let mut env = Environment::new("partial");
    let uids = env.uid_generator().clone();

    let broken = env
        .from_iter(vec![uids.text("x")])
        .unwrap()
        .map(|_| Err(FunctionError::fatal("schema registry unreachable")))
        .unwrap()
        .add_sink(|_| {})
        .unwrap();
    let (seen, sink) = collector();
    let healthy = env
        .from_iter(vec![uids.text("y")])
        .unwrap()
        .add_sink(sink)
        .unwrap();

    let broken_id = env.submit(broken).unwrap();
    let healthy_id = env.submit(healthy).unwrap();

    let err = env.run_batch().await.unwrap_err();
    assert!(matches!(err, EngineError::OperatorFailed { .. }));
    assert_eq!(env.stream_state(broken_id), GraphState::Error);
    assert_eq!(env.stream_state(healthy_id), GraphState::Completed);
    assert_eq!(texts(&seen), ["y"]);
}

#[tokio::test]
async fn test_run_batch_reports_a_panicking_function() {
    let mut env = Environment::new("panicking");
    let uids = env.uid_generator().clone();

    let (seen, sink) = collector();
    let fragile = env
        .from_iter(vec![uids.text("ok"), uids.text("bad"), uids.text("late")])
        .unwrap()
        .map(|m: Message| {
            if m.text() == Some("bad") {
                panic!("unparseable payload");
            }
            Ok(m)
        })
        .unwrap()
        .add_sink(sink)
        .unwrap();
    let id = env.submit(fragile).unwrap();

    let err = env.run_batch().await.unwrap_err();
    assert!(matches!(err, EngineError::Runtime(_)));
    assert_eq!(env.stream_state(id), GraphState::Error);
    assert_eq!(texts(&seen), ["ok"]);
    assert!(!env.is_running());
}

#[tokio::test]
async fn test_streaming_run_stops_on_request() {
    let mut env = Environment::new("streaming");
    let uids = env.uid_generator().clone();
    let (seen, sink) = collector();

    let ticks = env
        .from_generator(move || Some(uids.text("tick")), 0)
        .unwrap()
        .add_sink(sink)
        .unwrap();
    let id = env.submit(ticks).unwrap();

    env.run_streaming().unwrap();
    assert!(env.is_running());
    assert_eq!(env.running_stream_count(), 1);

    while seen.lock().unwrap().len() < 5 {
        tokio::time::sleep(Duration::from_millis(1)).await;
    }
    env.stop();
    env.wait().await.unwrap();

    assert_eq!(env.stream_state(id), GraphState::Stopped);
    assert_eq!(env.running_stream_count(), 0);

    env.close();
    assert_eq!(env.submitted_stream_count(), 0);
    assert_eq!(env.stream_state(id), GraphState::Unknown);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_multi_threaded_environment_from_config() {
    let config = EngineConfig::default()
        .with_execution_mode(ExecutionMode::MultiThreaded)
        .with_thread_count(4);
    let mut env = Environment::from_config("parallel", &config);
    let uids = env.uid_generator().clone();
    let (seen, sink) = collector();

    let numbers: Vec<Message> = (1..=50).map(|i| uids.text(i.to_string())).collect();
    let stream = env
        .from_iter(numbers)
        .unwrap()
        .filter(|m: &Message| {
            m.text()
                .and_then(|t| t.parse::<u32>().ok())
                .map_or(false, |n| n % 5 == 0)
        })
        .unwrap()
        .add_sink(sink)
        .unwrap();
    env.submit(stream).unwrap();
    env.run_batch().await.unwrap();

    let expected: Vec<String> = (1..=10).map(|i| (i * 5).to_string()).collect();
    assert_eq!(texts(&seen), expected);
}

#[tokio::test]
async fn test_keyed_event_time_window_aggregate() {
    let env = Environment::new("windows");
    let uids = env.uid_generator().clone();
    let (seen, sink) = collector();

    let events = [(0, "a"), (100, "a"), (1_100, "b"), (1_200, "a"), (2_500, "b")];
    let messages: Vec<Message> = events
        .iter()
        .map(|(ts, user)| uids.text("click").with_timestamp(*ts).with_metadata("user", *user))
        .collect();

    let stream = env
        .from_iter(messages)
        .unwrap()
        .key_by_field("user")
        .unwrap()
        .window(&WindowConfig::tumbling("1s"))
        .unwrap()
        .aggregate(&AggregateConfig::new().with("content_length", "count").grouped())
        .unwrap()
        .sink(sink)
        .await
        .unwrap();
    assert_eq!(stream.state(), GraphState::Completed);

    let summaries: Vec<(String, String)> = seen
        .lock()
        .unwrap()
        .iter()
        .map(|m| {
            (
                m.metadata_value("key").unwrap_or_default().to_string(),
                m.metadata_value("message_count").unwrap_or_default().to_string(),
            )
        })
        .collect();
    assert_eq!(
        summaries,
        [
            ("a".to_string(), "2".to_string()),
            ("a".to_string(), "1".to_string()),
            ("b".to_string(), "1".to_string()),
            ("b".to_string(), "1".to_string()),
        ]
    );
}

#[tokio::test]
async fn test_top_k_keeps_highest_scores_per_window() {
    let env = Environment::new("ranking");
    let uids = env.uid_generator().clone();
    let (seen, sink) = collector();

    let scores = [0.2, 0.9, 0.5, 0.7];
    let messages: Vec<Message> = scores
        .iter()
        .enumerate()
        .map(|(i, score)| uids.text(format!("doc{i}")).with_quality_score(*score))
        .collect();

    env.from_iter(messages)
        .unwrap()
        .window(&WindowConfig::tumbling("4"))
        .unwrap()
        .top_k(&TopKConfig {
            k: 2,
            field: None,
        })
        .unwrap()
        .sink(sink)
        .await
        .unwrap();

    assert_eq!(texts(&seen), ["doc1", "doc3"]);
}

#[tokio::test]
async fn test_environment_policy_applies_to_builder_operators() {
    let config = EngineConfig {
        data_error_policy: DataErrorPolicy::PassThrough,
        ..EngineConfig::default()
    };
    let env = Environment::from_config("lenient", &config);
    let uids = env.uid_generator().clone();
    let (seen, sink) = collector();

    env.from_iter(vec![uids.text("1"), uids.text("x"), uids.text("3")])
        .unwrap()
        .map(|m: Message| match m.text().map(str::parse::<i32>) {
            Some(Ok(_)) => Ok(m),
            _ => Err(FunctionError::record(m, "not numeric")),
        })
        .unwrap()
        .sink(sink)
        .await
        .unwrap();

    assert_eq!(texts(&seen), ["1", "x", "3"]);
}

#[test]
fn test_configured_key_by_requires_a_source() {
    let env = Environment::new("strict");
    let config = OperatorConfig::KeyBy(KeyByConfig {
        field: Some("user".into()),
        ..KeyByConfig::default()
    });
    assert!(matches!(
        env.stream().apply(&config),
        Err(EngineError::InvalidGraph(_))
    ));
}
