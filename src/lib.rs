// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Embeddable streaming dataflow engine.
//!
//! Pipelines are DAGs of operators over an owned [`message::Message`] type. Build them
//! with the fluent [`api::DataStream`] builder (usually from an [`api::Environment`]) or
//! wire an [`graph::ExecutionGraph`] by hand, then run them on a [`engine::StreamEngine`]
//! single-threaded, multi-threaded or in the background.

pub mod api;           // fluent builder + environment
pub mod config;        // engine configuration
pub mod engine;        // graph registry, state machine, executors
pub mod errors;        // error handling
pub mod function;      // user-supplied delegates
pub mod graph;         // DAG + validation
pub mod message;       // the unit of data
pub mod metrics;       // shared counters
pub mod observability;
pub mod operator;      // concrete operators
pub mod traits;        // unified abstractions

pub use api::{DataStream, Environment};
pub use engine::{ExecutionMode, GraphId, GraphState, StreamEngine};
pub use errors::{DataErrorPolicy, EngineError, FunctionError};
pub use graph::{ExecutionGraph, OperatorId};
pub use message::{Content, Message, Record};
