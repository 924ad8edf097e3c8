// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Errors raised by operators during construction and execution.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum OperatorError {
    /// A composition operator was used before its delegate function was set.
    #[error("Operator '{operator}' has no function configured")]
    NotConfigured { operator: String },

    /// Operator construction rejected its configuration.
    #[error("Invalid configuration for operator '{operator}': {reason}")]
    InvalidConfiguration { operator: String, reason: String },

    /// `process` or `close` called outside the Open state.
    #[error("Operator '{operator}' cannot {action} while {state}")]
    Lifecycle {
        operator: String,
        action: &'static str,
        state: &'static str,
    },

    /// A previous call panicked while holding the operator lock.
    #[error("Operator '{operator}' is poisoned by an earlier panic")]
    Poisoned { operator: String },

    /// The delegate function failed fatally.
    #[error("Operator '{operator}' failed: {source}")]
    Function {
        operator: String,
        #[source]
        source: anyhow::Error,
    },
}

impl OperatorError {
    pub fn invalid_config(operator: &str, reason: impl Into<String>) -> Self {
        OperatorError::InvalidConfiguration {
            operator: operator.to_string(),
            reason: reason.into(),
        }
    }

    pub fn not_configured(operator: &str) -> Self {
        OperatorError::NotConfigured {
            operator: operator.to_string(),
        }
    }
}
