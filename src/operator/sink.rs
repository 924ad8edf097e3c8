use crate::errors::{DataErrorPolicy, OperatorError};
use crate::function::SinkFunction;
use crate::message::Record;
use crate::operator::{function_failure, recover, OperatorKind};
use crate::traits::{Emitter, Operator, OperatorContext};

/// Terminal operator: hands every message to its function and forwards nothing.
pub struct SinkOperator {
    name: String,
    function: Option<Box<dyn SinkFunction>>,
}

impl SinkOperator {
    pub fn new(name: impl Into<String>, function: impl SinkFunction + 'static) -> Self {
        Self::from_boxed(name, Box::new(function))
    }

    pub fn from_boxed(name: impl Into<String>, function: Box<dyn SinkFunction>) -> Self {
        Self {
            name: name.into(),
            function: Some(function),
        }
    }

    pub fn unconfigured(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            function: None,
        }
    }

    pub fn set_function(&mut self, function: Box<dyn SinkFunction>) {
        self.function = Some(function);
    }

    fn function(&mut self) -> Result<&mut Box<dyn SinkFunction>, OperatorError> {
        self.function
            .as_mut()
            .ok_or_else(|| OperatorError::not_configured(&self.name))
    }
}

impl Operator for SinkOperator {
    fn kind(&self) -> OperatorKind {
        OperatorKind::Sink
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn open(&mut self, ctx: &OperatorContext) -> Result<(), OperatorError> {
        let name = self.name.clone();
        self.function()?
            .open(ctx)
            .map_err(|error| function_failure(&name, error))
    }

    fn process(&mut self, input: Record, _out: &mut Emitter) -> Result<bool, OperatorError> {
        let name = self.name.clone();
        let function = self.function()?;
        for message in input {
            if let Err(error) = function.invoke(message) {
                // Nothing downstream of a sink, so a rejected message is always dropped.
                recover(&name, DataErrorPolicy::Drop, error)?;
            }
        }
        Ok(false)
    }

    fn close(&mut self, _out: &mut Emitter) -> Result<(), OperatorError> {
        let name = self.name.clone();
        self.function()?
            .close()
            .map_err(|error| function_failure(&name, error))
    }
}
