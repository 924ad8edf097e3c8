// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use crate::engine::multi_threaded::MultiThreadedExecutor;
use crate::engine::single_threaded::SingleThreadedExecutor;
use crate::engine::ExecutionMode;
use crate::traits::GraphExecutor;

/// Factory for creating graph executors from the engine's scheduling settings
pub struct ExecutorFactory;

impl ExecutorFactory {
    /// Create the executor for `mode`.
    ///
    /// `Async` only changes how `execute_graph` returns; its background run is
    /// multi-threaded when more than one thread is allowed.
    pub fn for_mode(
        mode: ExecutionMode,
        thread_count: usize,
        channel_capacity: usize,
    ) -> Box<dyn GraphExecutor> {
        match mode {
            ExecutionMode::SingleThreaded => Box::new(SingleThreadedExecutor::new()),
            ExecutionMode::MultiThreaded => {
                Box::new(MultiThreadedExecutor::new(thread_count, channel_capacity))
            }
            ExecutionMode::Async if thread_count > 1 => {
                Box::new(MultiThreadedExecutor::new(thread_count, channel_capacity))
            }
            ExecutionMode::Async => Box::new(SingleThreadedExecutor::new()),
        }
    }
}
