// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Structured logging for the engine.
//!
//! Log lines come from small message structs in [`messages`] that implement `Display`
//! and [`StructuredLog`](messages::StructuredLog), so every event carries typed fields
//! rather than ad hoc strings.
//!
//! Messages are organized by subsystem:
//! * `messages::engine` - execution lifecycle of submitted graphs
//! * `messages::environment` - batch and streaming runs of an environment
//! * `messages::graph` - submission, rejection and removal of graphs
//! * `messages::operator` - operator lifecycle and per-record recovery
//!
//! # Usage
//!
//! ```rust
//! use streamdag::observability::messages::{graph::GraphRemoved, StructuredLog};
//! use streamdag::engine::GraphId;
//!
//! GraphRemoved { graph_id: GraphId::from(3) }.log();
//! ```

pub mod messages;

use tracing_subscriber::EnvFilter;

/// Installs a fmt subscriber filtered by `RUST_LOG`, falling back to `default_directive`.
///
/// Safe to call more than once; only the first call installs a subscriber.
pub fn init_tracing(default_directive: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}
