use std::cmp::Ordering;

use crate::errors::OperatorError;
use crate::message::{Message, Record};
use crate::operator::{numeric_field, OperatorKind, TopKConfig};
use crate::traits::{Emitter, Operator};

/// Keeps the `k` highest-scoring messages of each input record, best first, and writes
/// their 1-based `rank` into metadata. Unscored messages rank last; ties keep input order.
pub struct TopKOperator {
    name: String,
    k: usize,
    field: Option<String>,
}

impl TopKOperator {
    pub fn new(name: impl Into<String>, config: &TopKConfig) -> Result<Self, OperatorError> {
        let name = name.into();
        if config.k == 0 {
            return Err(OperatorError::invalid_config(&name, "k must be at least 1"));
        }
        Ok(Self {
            name,
            k: config.k,
            field: config.field.clone(),
        })
    }

    fn score(&self, message: &Message) -> Option<f64> {
        match &self.field {
            Some(field) => numeric_field(message, field),
            None => message.quality_score().map(f64::from),
        }
    }
}

impl Operator for TopKOperator {
    fn kind(&self) -> OperatorKind {
        OperatorKind::TopK
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn process(&mut self, input: Record, out: &mut Emitter) -> Result<bool, OperatorError> {
        let mut scored: Vec<(Option<f64>, Message)> = input
            .into_iter()
            .map(|message| (self.score(&message), message))
            .collect();

        scored.sort_by(|(a, _), (b, _)| match (a, b) {
            (Some(a), Some(b)) => b.partial_cmp(a).unwrap_or(Ordering::Equal),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        });

        let top: Vec<Message> = scored
            .into_iter()
            .take(self.k)
            .enumerate()
            .map(|(rank, (_, message))| message.with_metadata("rank", (rank + 1).to_string()))
            .collect();

        let emitted = !top.is_empty();
        out.emit(Record::new(top));
        Ok(emitted)
    }
}
