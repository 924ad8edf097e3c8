// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Errors raised by user functions.
//!
//! Data errors concern one record and never abort a graph: the function hands the
//! untouched message back and the owning operator applies its [`DataErrorPolicy`].
//! Fatal errors abort the graph's execution.

use serde::Deserialize;
use thiserror::Error;

use crate::message::Message;

#[derive(Error, Debug)]
pub enum FunctionError {
    /// One message could not be handled. Ownership of the message returns to the operator.
    #[error("record {} rejected: {reason}", .message.uid())]
    Record {
        message: Box<Message>,
        reason: String,
    },

    /// The function cannot continue; the graph must stop.
    #[error(transparent)]
    Fatal(#[from] anyhow::Error),
}

impl FunctionError {
    pub fn record(message: Message, reason: impl Into<String>) -> Self {
        FunctionError::Record {
            message: Box::new(message),
            reason: reason.into(),
        }
    }

    pub fn fatal(reason: impl Into<String>) -> Self {
        FunctionError::Fatal(anyhow::anyhow!(reason.into()))
    }
}

/// What an operator does with a message whose function reported a data error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataErrorPolicy {
    /// Discard the message.
    #[default]
    Drop,
    /// Forward the message unmodified.
    PassThrough,
}

impl DataErrorPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            DataErrorPolicy::Drop => "drop",
            DataErrorPolicy::PassThrough => "pass_through",
        }
    }
}
