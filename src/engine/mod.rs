// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

pub mod factory;
pub mod multi_threaded;
mod run;
pub mod single_threaded;
mod state;
mod stream_engine;
#[cfg(test)]
pub mod integration_tests;

pub use factory::ExecutorFactory;
pub use multi_threaded::MultiThreadedExecutor;
pub use run::{GateGuard, GraphRun, RunGate};
pub use single_threaded::SingleThreadedExecutor;
pub use state::{ExecutionMode, GraphId, GraphState};
pub use stream_engine::StreamEngine;
