// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Errors surfaced by the engine, the builder and the environment.

use thiserror::Error;

use crate::engine::{GraphId, GraphState};
use crate::errors::{GraphError, OperatorError};
use crate::graph::OperatorId;

#[derive(Error, Debug)]
pub enum EngineError {
    /// Cycle at submission/finalization, or a builder step that would corrupt the graph.
    #[error("Invalid graph: {0}")]
    InvalidGraph(String),

    #[error("Graph {0} not found")]
    GraphNotFound(GraphId),

    /// Topological sort failed during execution. Unreachable when graphs are validated on submit.
    #[error("Graph {graph_id} is cyclic: {cycle:?}")]
    CyclicGraph {
        graph_id: GraphId,
        cycle: Vec<OperatorId>,
    },

    #[error("Invalid configuration for operator '{operator}': {reason}")]
    InvalidConfiguration { operator: String, reason: String },

    #[error("Operator '{operator}' used before its function was configured")]
    OperatorNotConfigured { operator: String },

    #[error("Not implemented: {0}")]
    NotImplemented(&'static str),

    #[error("Operator {operator_id} ('{operator}') failed: {source}")]
    OperatorFailed {
        operator_id: OperatorId,
        operator: String,
        #[source]
        source: OperatorError,
    },

    #[error("Graph {graph_id} cannot be executed while {state}")]
    InvalidState { graph_id: GraphId, state: GraphState },

    #[error("Runtime error: {0}")]
    Runtime(String),
}

impl EngineError {
    /// Maps an error raised while constructing an operator.
    pub fn from_construction(error: OperatorError) -> Self {
        match error {
            OperatorError::InvalidConfiguration { operator, reason } => {
                EngineError::InvalidConfiguration { operator, reason }
            }
            OperatorError::NotConfigured { operator } => {
                EngineError::OperatorNotConfigured { operator }
            }
            other => EngineError::InvalidGraph(other.to_string()),
        }
    }

    /// Maps an error raised by a running operator.
    pub fn from_execution(operator_id: OperatorId, operator: &str, error: OperatorError) -> Self {
        match error {
            OperatorError::NotConfigured { operator } => {
                EngineError::OperatorNotConfigured { operator }
            }
            source => EngineError::OperatorFailed {
                operator_id,
                operator: operator.to_string(),
                source,
            },
        }
    }
}

impl From<GraphError> for EngineError {
    fn from(error: GraphError) -> Self {
        EngineError::InvalidGraph(error.to_string())
    }
}
