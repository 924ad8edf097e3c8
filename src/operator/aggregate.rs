use std::collections::BTreeMap;

use crate::errors::OperatorError;
use crate::message::{Content, Message, Record};
use crate::metrics::UidGenerator;
use crate::operator::{numeric_field, AggregateConfig, OperatorKind};
use crate::traits::{Emitter, Operator};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AggregateOp {
    Count,
    Sum,
    Avg,
    Min,
    Max,
}

impl AggregateOp {
    fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "count" => Some(AggregateOp::Count),
            "sum" => Some(AggregateOp::Sum),
            "avg" | "mean" => Some(AggregateOp::Avg),
            "min" => Some(AggregateOp::Min),
            "max" => Some(AggregateOp::Max),
            _ => None,
        }
    }

    fn as_str(&self) -> &'static str {
        match self {
            AggregateOp::Count => "count",
            AggregateOp::Sum => "sum",
            AggregateOp::Avg => "avg",
            AggregateOp::Min => "min",
            AggregateOp::Max => "max",
        }
    }
}

#[derive(Debug, Default)]
struct Accumulator {
    count: u64,
    sum: f64,
    min: Option<f64>,
    max: Option<f64>,
}

impl Accumulator {
    fn add(&mut self, value: f64) {
        self.count += 1;
        self.sum += value;
        self.min = Some(self.min.map_or(value, |min| min.min(value)));
        self.max = Some(self.max.map_or(value, |max| max.max(value)));
    }

    fn result(&self, op: AggregateOp) -> Option<f64> {
        match op {
            AggregateOp::Count => Some(self.count as f64),
            AggregateOp::Sum => Some(self.sum),
            AggregateOp::Avg if self.count > 0 => Some(self.sum / self.count as f64),
            AggregateOp::Avg => None,
            AggregateOp::Min => self.min,
            AggregateOp::Max => self.max,
        }
    }
}

/// Summarizes each input record into one metadata-only message per group.
///
/// Output metadata holds `<field>_<op>` for every configured operation, `message_count`,
/// and `key` when grouping by key. Paired with a window upstream this yields windowed
/// aggregates.
pub struct AggregateOperator {
    name: String,
    operations: Vec<(String, AggregateOp)>,
    group_by_key: bool,
    uids: UidGenerator,
}

impl AggregateOperator {
    pub fn new(
        name: impl Into<String>,
        config: &AggregateConfig,
        uids: UidGenerator,
    ) -> Result<Self, OperatorError> {
        let name = name.into();
        if config.operations.values().all(Vec::is_empty) {
            return Err(OperatorError::invalid_config(&name, "no aggregate operations configured"));
        }
        let operations = config
            .operations
            .iter()
            .flat_map(|(field, ops)| ops.iter().map(move |op| (field, op)))
            .map(|(field, op)| {
                AggregateOp::parse(op)
                    .map(|op| (field.clone(), op))
                    .ok_or_else(|| {
                        OperatorError::invalid_config(
                            &name,
                            format!("unknown aggregate operation '{op}' for field '{field}'"),
                        )
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            name,
            operations,
            group_by_key: config.group_by_key,
            uids,
        })
    }

    fn summarize(&self, group: Option<&str>, messages: &[&Message]) -> Message {
        let mut summary = self.uids.message(Content::MetadataOnly);
        if let Some(latest) = messages.iter().map(|m| m.timestamp_ms()).max() {
            summary = summary.with_timestamp(latest);
        }

        for (field, op) in &self.operations {
            let mut acc = Accumulator::default();
            for message in messages {
                match op {
                    AggregateOp::Count => acc.add(0.0),
                    _ => {
                        if let Some(value) = numeric_field(message, field) {
                            acc.add(value);
                        }
                    }
                }
            }
            if let Some(value) = acc.result(*op) {
                summary.insert_metadata(format!("{field}_{}", op.as_str()), value.to_string());
            }
        }

        summary.insert_metadata("message_count", messages.len().to_string());
        if let Some(group) = group {
            summary.insert_metadata("key", group);
        }
        summary
    }
}

impl Operator for AggregateOperator {
    fn kind(&self) -> OperatorKind {
        OperatorKind::Aggregate
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn process(&mut self, input: Record, out: &mut Emitter) -> Result<bool, OperatorError> {
        if input.is_empty() {
            return Ok(false);
        }

        let summaries: Vec<Message> = if self.group_by_key {
            let mut groups: BTreeMap<&str, Vec<&Message>> = BTreeMap::new();
            for message in input.messages() {
                let key = message.metadata_value("key").unwrap_or_default();
                groups.entry(key).or_default().push(message);
            }
            groups
                .into_iter()
                .map(|(key, messages)| self.summarize(Some(key), &messages))
                .collect()
        } else {
            let messages: Vec<&Message> = input.messages().iter().collect();
            vec![self.summarize(None, &messages)]
        };

        for summary in summaries {
            out.emit_message(summary);
        }
        Ok(true)
    }
}
