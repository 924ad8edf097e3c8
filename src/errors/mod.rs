// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

mod config;
mod engine;
mod function;
mod graph;
mod operator;

pub use config::ConfigError;
pub use engine::EngineError;
pub use function::{DataErrorPolicy, FunctionError};
pub use graph::GraphError;
pub use operator::OperatorError;
