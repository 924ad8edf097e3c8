// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! High-level API: the fluent [`DataStream`] builder and the [`Environment`] that
//! owns an engine and runs submitted streams.

mod datastream;
mod environment;

#[cfg(test)]
mod integration_tests;

pub use datastream::DataStream;
pub use environment::Environment;
