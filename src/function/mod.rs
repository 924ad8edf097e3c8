// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Reusable processing logic, independent of graph wiring.
//!
//! Functions are delegates: an operator owns a boxed function and calls it once per
//! message. The same function type can back operators wired into different graphs.
//! Closure adapters (`Fn*`, [`GeneratorSource`], [`IterSource`]) cover the common case.

mod join;
mod key;
mod sink;
mod source;
mod transform;

pub use join::{FnJoin, JoinFunction};
pub use key::{FieldKey, FnKey, KeySelector};
pub use sink::{BatchSink, FnSink, SinkFunction};
pub use source::{GeneratorSource, IterSource, SourceFunction};
pub use transform::{FilterFunction, FlatMapFunction, FnFilter, FnFlatMap, FnMap, MapFunction};
