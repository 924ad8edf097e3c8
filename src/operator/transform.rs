use crate::errors::{DataErrorPolicy, OperatorError};
use crate::function::{FilterFunction, FlatMapFunction, MapFunction};
use crate::message::Record;
use crate::operator::{recover, OperatorKind};
use crate::traits::{Emitter, Operator};

/// Applies a [`MapFunction`] to every message, keeping the input record's grouping.
pub struct MapOperator {
    name: String,
    function: Option<Box<dyn MapFunction>>,
    policy: DataErrorPolicy,
}

impl MapOperator {
    pub fn new(name: impl Into<String>, function: impl MapFunction + 'static) -> Self {
        Self::from_boxed(name, Box::new(function))
    }

    pub fn from_boxed(name: impl Into<String>, function: Box<dyn MapFunction>) -> Self {
        Self {
            name: name.into(),
            function: Some(function),
            policy: DataErrorPolicy::default(),
        }
    }

    /// A map with no function yet; fails on open until one is set.
    pub fn unconfigured(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            function: None,
            policy: DataErrorPolicy::default(),
        }
    }

    pub fn set_function(&mut self, function: Box<dyn MapFunction>) {
        self.function = Some(function);
    }

    pub fn with_policy(mut self, policy: DataErrorPolicy) -> Self {
        self.policy = policy;
        self
    }
}

impl Operator for MapOperator {
    fn kind(&self) -> OperatorKind {
        OperatorKind::Map
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn open(&mut self, _ctx: &crate::traits::OperatorContext) -> Result<(), OperatorError> {
        match self.function {
            Some(_) => Ok(()),
            None => Err(OperatorError::not_configured(&self.name)),
        }
    }

    fn process(&mut self, input: Record, out: &mut Emitter) -> Result<bool, OperatorError> {
        let function = self
            .function
            .as_mut()
            .ok_or_else(|| OperatorError::not_configured(&self.name))?;

        let mut output = Record::empty();
        for message in input {
            match function.map(message) {
                Ok(mapped) => output.push(mapped),
                Err(error) => {
                    if let Some(message) = recover(&self.name, self.policy, error)? {
                        output.push(message);
                    }
                }
            }
        }

        let emitted = !output.is_empty();
        out.emit(output);
        Ok(emitted)
    }
}

/// Forwards the messages for which a [`FilterFunction`] holds.
pub struct FilterOperator {
    name: String,
    function: Option<Box<dyn FilterFunction>>,
}

impl FilterOperator {
    pub fn new(name: impl Into<String>, function: impl FilterFunction + 'static) -> Self {
        Self::from_boxed(name, Box::new(function))
    }

    pub fn from_boxed(name: impl Into<String>, function: Box<dyn FilterFunction>) -> Self {
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

    pub fn set_function(&mut self, function: Box<dyn FilterFunction>) {
        self.function = Some(function);
    }
}

impl Operator for FilterOperator {
    fn kind(&self) -> OperatorKind {
        OperatorKind::Filter
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn open(&mut self, _ctx: &crate::traits::OperatorContext) -> Result<(), OperatorError> {
        match self.function {
            Some(_) => Ok(()),
            None => Err(OperatorError::not_configured(&self.name)),
        }
    }

    fn process(&mut self, input: Record, out: &mut Emitter) -> Result<bool, OperatorError> {
        let function = self
            .function
            .as_mut()
            .ok_or_else(|| OperatorError::not_configured(&self.name))?;

        let kept: Vec<_> = input
            .into_iter()
            .filter(|message| function.filter(message))
            .collect();

        let emitted = !kept.is_empty();
        out.emit(Record::new(kept));
        Ok(emitted)
    }
}

/// Expands every message into zero or more messages.
pub struct FlatMapOperator {
    name: String,
    function: Option<Box<dyn FlatMapFunction>>,
    policy: DataErrorPolicy,
}

impl FlatMapOperator {
    pub fn new(name: impl Into<String>, function: impl FlatMapFunction + 'static) -> Self {
        Self::from_boxed(name, Box::new(function))
    }

    pub fn from_boxed(name: impl Into<String>, function: Box<dyn FlatMapFunction>) -> Self {
        Self {
            name: name.into(),
            function: Some(function),
            policy: DataErrorPolicy::default(),
        }
    }

    pub fn unconfigured(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            function: None,
            policy: DataErrorPolicy::default(),
        }
    }

    pub fn set_function(&mut self, function: Box<dyn FlatMapFunction>) {
        self.function = Some(function);
    }

    pub fn with_policy(mut self, policy: DataErrorPolicy) -> Self {
        self.policy = policy;
        self
    }
}

impl Operator for FlatMapOperator {
    fn kind(&self) -> OperatorKind {
        OperatorKind::FlatMap
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn open(&mut self, _ctx: &crate::traits::OperatorContext) -> Result<(), OperatorError> {
        match self.function {
            Some(_) => Ok(()),
            None => Err(OperatorError::not_configured(&self.name)),
        }
    }

    fn process(&mut self, input: Record, out: &mut Emitter) -> Result<bool, OperatorError> {
        let function = self
            .function
            .as_mut()
            .ok_or_else(|| OperatorError::not_configured(&self.name))?;

        let mut output = Record::empty();
        for message in input {
            match function.flat_map(message) {
                Ok(expanded) => expanded.into_iter().for_each(|m| output.push(m)),
                Err(error) => {
                    if let Some(message) = recover(&self.name, self.policy, error)? {
                        output.push(message);
                    }
                }
            }
        }

        let emitted = !output.is_empty();
        out.emit(output);
        Ok(emitted)
    }
}
