use crate::errors::{DataErrorPolicy, OperatorError};
use crate::function::SourceFunction;
use crate::message::Record;
use crate::operator::{function_failure, recover, OperatorKind};
use crate::traits::{Emitter, Operator, OperatorContext};

/// Pulls one message from its function per `process` call.
pub struct SourceOperator {
    name: String,
    function: Option<Box<dyn SourceFunction>>,
    policy: DataErrorPolicy,
}

impl SourceOperator {
    pub fn new(name: impl Into<String>, function: impl SourceFunction + 'static) -> Self {
        Self::from_boxed(name, Box::new(function))
    }

    pub fn from_boxed(name: impl Into<String>, function: Box<dyn SourceFunction>) -> Self {
        Self {
            name: name.into(),
            function: Some(function),
            policy: DataErrorPolicy::default(),
        }
    }

    /// A source with no function yet; fails on open until one is set.
    pub fn unconfigured(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            function: None,
            policy: DataErrorPolicy::default(),
        }
    }

    pub fn set_function(&mut self, function: Box<dyn SourceFunction>) {
        self.function = Some(function);
    }

    pub fn with_policy(mut self, policy: DataErrorPolicy) -> Self {
        self.policy = policy;
        self
    }

    fn function(&mut self) -> Result<&mut Box<dyn SourceFunction>, OperatorError> {
        self.function
            .as_mut()
            .ok_or_else(|| OperatorError::not_configured(&self.name))
    }
}

impl Operator for SourceOperator {
    fn kind(&self) -> OperatorKind {
        OperatorKind::Source
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

    fn process(&mut self, _input: Record, out: &mut Emitter) -> Result<bool, OperatorError> {
        let (name, policy) = (self.name.clone(), self.policy);
        match self.function()?.next() {
            Ok(Some(message)) => {
                out.emit_message(message);
                Ok(true)
            }
            Ok(None) => Ok(false),
            Err(error) => match recover(&name, policy, error)? {
                Some(message) => {
                    out.emit_message(message);
                    Ok(true)
                }
                None => Ok(false),
            },
        }
    }

    fn close(&mut self, _out: &mut Emitter) -> Result<(), OperatorError> {
        let name = self.name.clone();
        self.function()?
            .close()
            .map_err(|error| function_failure(&name, error))
    }

    fn has_next(&self) -> bool {
        self.function.as_ref().is_some_and(|function| function.has_next())
    }
}
