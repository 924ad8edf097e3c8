use crate::errors::FunctionError;
use crate::message::Message;

/// One-to-one transformation. Returning `FunctionError::Record` hands the message back.
pub trait MapFunction: Send {
    fn map(&mut self, message: Message) -> Result<Message, FunctionError>;
}

/// Keeps messages for which the predicate holds.
pub trait FilterFunction: Send {
    fn filter(&mut self, message: &Message) -> bool;
}

/// One-to-many transformation. An empty vector drops the message.
pub trait FlatMapFunction: Send {
    fn flat_map(&mut self, message: Message) -> Result<Vec<Message>, FunctionError>;
}

pub struct FnMap<F>(pub F);

impl<F> FnMap<F>
where
    F: FnMut(Message) -> Result<Message, FunctionError> + Send,
{
    pub fn new(f: F) -> Self {
        Self(f)
    }
}

impl<F> MapFunction for FnMap<F>
where
    F: FnMut(Message) -> Result<Message, FunctionError> + Send,
{
    fn map(&mut self, message: Message) -> Result<Message, FunctionError> {
        (self.0)(message)
    }
}

pub struct FnFilter<F>(pub F);

impl<F> FnFilter<F>
where
    F: FnMut(&Message) -> bool + Send,
{
    pub fn new(f: F) -> Self {
        Self(f)
    }
}

impl<F> FilterFunction for FnFilter<F>
where
    F: FnMut(&Message) -> bool + Send,
{
    fn filter(&mut self, message: &Message) -> bool {
        (self.0)(message)
    }
}

pub struct FnFlatMap<F>(pub F);

impl<F> FnFlatMap<F>
where
    F: FnMut(Message) -> Result<Vec<Message>, FunctionError> + Send,
{
    pub fn new(f: F) -> Self {
        Self(f)
    }
}

impl<F> FlatMapFunction for FnFlatMap<F>
where
    F: FnMut(Message) -> Result<Vec<Message>, FunctionError> + Send,
{
    fn flat_map(&mut self, message: Message) -> Result<Vec<Message>, FunctionError> {
        (self.0)(message)
    }
}
