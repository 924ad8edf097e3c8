// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::fmt;

use crate::graph::OperatorId;

/// Errors raised by execution graph mutation and validation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GraphError {
    /// The graph contains a cycle (a self-loop counts)
    Cycle {
        /// The cycle path, ending with the node that closes it
        cycle: Vec<OperatorId>,
    },
    /// An edge referenced an operator id that is not in the graph
    UnknownOperator(OperatorId),
}

impl fmt::Display for GraphError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GraphError::Cycle { cycle } => {
                let path: Vec<String> = cycle.iter().map(ToString::to_string).collect();
                write!(f, "Cycle detected: {}", path.join(" -> "))
            }
            GraphError::UnknownOperator(id) => {
                write!(f, "Operator {} does not exist in this graph", id)
            }
        }
    }
}

impl std::error::Error for GraphError {}
