use crate::errors::OperatorError;
use crate::message::Record;
use crate::operator::OperatorKind;
use crate::traits::{Emitter, Operator};

/// Merges its upstream branches by forwarding every record unchanged.
pub struct UnionOperator {
    name: String,
}

impl UnionOperator {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl Operator for UnionOperator {
    fn kind(&self) -> OperatorKind {
        OperatorKind::Union
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn process(&mut self, input: Record, out: &mut Emitter) -> Result<bool, OperatorError> {
        let emitted = !input.is_empty();
        out.emit(input);
        Ok(emitted)
    }
}
