// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Concrete operators.
//!
//! Composition operators (source, map, filter, flat map, sink) own a boxed function and
//! delegate to it. Typed operators (key by, window, aggregate, top k) are built from a
//! configuration value that is validated at construction.

mod aggregate;
mod config;
mod factory;
mod key_by;
mod kind;
mod sink;
mod source;
mod top_k;
mod transform;
mod union;
mod window;

pub use aggregate::AggregateOperator;
pub use config::{AggregateConfig, KeyByConfig, OperatorConfig, SourceConfig, TopKConfig, WindowConfig};
pub use factory::build_operator;
pub use key_by::KeyByOperator;
pub use kind::OperatorKind;
pub use sink::SinkOperator;
pub use source::SourceOperator;
pub use top_k::TopKOperator;
pub use transform::{FilterOperator, FlatMapOperator, MapOperator};
pub use union::UnionOperator;
pub use window::WindowOperator;

use crate::errors::{DataErrorPolicy, FunctionError, OperatorError};
use crate::message::Message;
use crate::observability::messages::operator::DataErrorRecovered;
use crate::observability::messages::StructuredLog;

/// Converts a function failure that must abort the graph.
pub(crate) fn function_failure(operator: &str, error: FunctionError) -> OperatorError {
    let source = match error {
        FunctionError::Fatal(source) => source,
        FunctionError::Record { message, reason } => {
            anyhow::anyhow!("message {} rejected outside of processing: {}", message.uid(), reason)
        }
    };
    OperatorError::Function {
        operator: operator.to_string(),
        source,
    }
}

/// Applies `policy` to a data error, returning the message to forward if any.
/// Fatal errors are returned as `Err`.
pub(crate) fn recover(
    operator: &str,
    policy: DataErrorPolicy,
    error: FunctionError,
) -> Result<Option<Message>, OperatorError> {
    match error {
        FunctionError::Record { message, reason } => {
            DataErrorRecovered {
                operator,
                uid: message.uid(),
                reason: &reason,
                policy,
            }
            .log();
            Ok(match policy {
                DataErrorPolicy::Drop => None,
                DataErrorPolicy::PassThrough => Some(*message),
            })
        }
        fatal => Err(function_failure(operator, fatal)),
    }
}

/// Numeric view of a message field: metadata parsed as a number, or one of the
/// pseudo-fields `quality_score` and `content_length`.
pub(crate) fn numeric_field(message: &Message, field: &str) -> Option<f64> {
    match field {
        "quality_score" => message.quality_score().map(f64::from),
        "content_length" => Some(message.content().len() as f64),
        _ => message
            .metadata_value(field)
            .and_then(|value| value.trim().parse::<f64>().ok()),
    }
}
