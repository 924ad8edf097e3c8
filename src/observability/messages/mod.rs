// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Message types for structured logging, grouped by subsystem.
//!
//! Each type implements `Display` for the human-readable line and [`StructuredLog`]
//! to emit it at its level with typed fields attached.

pub mod engine;
pub mod environment;
pub mod graph;
pub mod operator;

use tracing::Span;

pub trait StructuredLog {
    /// Emit the event at the level appropriate for this message.
    fn log(&self);

    /// A span carrying the same fields, for instrumenting the work the message describes.
    fn span(&self, name: &str) -> Span;
}
