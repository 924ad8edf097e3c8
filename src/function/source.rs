use crate::errors::FunctionError;
use crate::message::Message;
use crate::traits::OperatorContext;

/// Produces messages until it signals exhaustion.
///
/// `next` returning `Ok(None)` means the source is exhausted; the engine will not call
/// it again during this execution.
pub trait SourceFunction: Send {
    fn open(&mut self, _ctx: &OperatorContext) -> Result<(), FunctionError> {
        Ok(())
    }

    fn has_next(&self) -> bool;

    fn next(&mut self) -> Result<Option<Message>, FunctionError>;

    fn close(&mut self) -> Result<(), FunctionError> {
        Ok(())
    }
}

/// Source driven by a generator closure; `None` ends the stream.
pub struct GeneratorSource<F> {
    generator: F,
    max_messages: u64,
    produced: u64,
    exhausted: bool,
}

impl<F> GeneratorSource<F>
where
    F: FnMut() -> Option<Message> + Send,
{
    pub fn new(generator: F) -> Self {
        Self::with_limit(generator, 0)
    }

    /// Stops after `max_messages` messages; 0 means unlimited.
    pub fn with_limit(generator: F, max_messages: u64) -> Self {
        Self {
            generator,
            max_messages,
            produced: 0,
            exhausted: false,
        }
    }
}

impl<F> SourceFunction for GeneratorSource<F>
where
    F: FnMut() -> Option<Message> + Send,
{
    fn has_next(&self) -> bool {
        !self.exhausted && (self.max_messages == 0 || self.produced < self.max_messages)
    }

    fn next(&mut self) -> Result<Option<Message>, FunctionError> {
        if !self.has_next() {
            return Ok(None);
        }
        let message = (self.generator)();
        match message {
            Some(_) => self.produced += 1,
            None => self.exhausted = true,
        }
        Ok(message)
    }
}

/// Source over any iterator of messages.
pub struct IterSource<I> {
    iter: I,
    exhausted: bool,
}

impl<I> IterSource<I>
where
    I: Iterator<Item = Message> + Send,
{
    pub fn new(iter: impl IntoIterator<IntoIter = I>) -> Self {
        Self {
            iter: iter.into_iter(),
            exhausted: false,
        }
    }
}

impl<I> SourceFunction for IterSource<I>
where
    I: Iterator<Item = Message> + Send,
{
    fn has_next(&self) -> bool {
        !self.exhausted
    }

    fn next(&mut self) -> Result<Option<Message>, FunctionError> {
        let message = self.iter.next();
        self.exhausted = message.is_none();
        Ok(message)
    }
}
