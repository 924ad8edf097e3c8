// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use crate::errors::OperatorError;
use crate::function::IterSource;
use crate::metrics::UidGenerator;
use crate::operator::{
    AggregateOperator, KeyByOperator, OperatorConfig, SourceOperator, TopKOperator,
    WindowOperator,
};
use crate::traits::Operator;

/// Builds an operator from its typed configuration.
///
/// `uids` issues uids for messages the operator creates (source messages, aggregate
/// summaries). Configuration errors surface here as `InvalidConfiguration`.
pub fn build_operator(
    name: &str,
    config: &OperatorConfig,
    uids: &UidGenerator,
) -> Result<Box<dyn Operator>, OperatorError> {
    match config {
        OperatorConfig::Source(source) => {
            let messages: Vec<_> = source.messages.iter().map(|text| uids.text(text.as_str())).collect();
            Ok(Box::new(SourceOperator::new(name, IterSource::new(messages))))
        }
        OperatorConfig::KeyBy(key_by) => Ok(Box::new(KeyByOperator::new(name, None, key_by)?)),
        OperatorConfig::Window(window) => Ok(Box::new(WindowOperator::new(name, window)?)),
        OperatorConfig::Aggregate(aggregate) => Ok(Box::new(AggregateOperator::new(
            name,
            aggregate,
            uids.clone(),
        )?)),
        OperatorConfig::TopK(top_k) => Ok(Box::new(TopKOperator::new(name, top_k)?)),
    }
}
