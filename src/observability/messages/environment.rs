// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Message types for environment-wide batch and streaming runs.

use std::fmt::{Display, Formatter};

use tracing::Span;

use crate::observability::messages::StructuredLog;

/// # Log Level
/// `info!` - Important operational event
pub struct StreamsLaunched<'a> {
    pub environment: &'a str,
    /// `batch` or `streaming`
    pub run_kind: &'static str,
    pub stream_count: usize,
}

impl Display for StreamsLaunched<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Environment '{}' launching {} streams ({})",
            self.environment, self.stream_count, self.run_kind
        )
    }
}

impl StructuredLog for StreamsLaunched<'_> {
    fn log(&self) {
        tracing::info!(
            environment = self.environment,
            run_kind = self.run_kind,
            stream_count = self.stream_count,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!(
            "streams_launched",
            span_name = name,
            environment = self.environment,
            run_kind = self.run_kind,
            stream_count = self.stream_count,
        )
    }
}

/// # Log Level
/// `info!` - Important operational event
pub struct EnvironmentClosed<'a> {
    pub environment: &'a str,
    pub stream_count: usize,
}

impl Display for EnvironmentClosed<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Environment '{}' closed, {} streams released",
            self.environment, self.stream_count
        )
    }
}

impl StructuredLog for EnvironmentClosed<'_> {
    fn log(&self) {
        tracing::info!(
            environment = self.environment,
            stream_count = self.stream_count,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!(
            "environment_closed",
            span_name = name,
            environment = self.environment,
            stream_count = self.stream_count,
        )
    }
}
