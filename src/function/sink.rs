use crate::errors::FunctionError;
use crate::message::Message;
use crate::traits::OperatorContext;

/// Consumes messages and never forwards them.
///
/// Implementations must not retain a message past `invoke` other than in their own
/// buffer, and must write out any buffer in `close`.
pub trait SinkFunction: Send {
    fn open(&mut self, _ctx: &OperatorContext) -> Result<(), FunctionError> {
        Ok(())
    }

    fn invoke(&mut self, message: Message) -> Result<(), FunctionError>;

    fn close(&mut self) -> Result<(), FunctionError> {
        Ok(())
    }
}

pub struct FnSink<F>(pub F);

impl<F> FnSink<F>
where
    F: FnMut(Message) + Send,
{
    pub fn new(f: F) -> Self {
        Self(f)
    }
}

impl<F> SinkFunction for FnSink<F>
where
    F: FnMut(Message) + Send,
{
    fn invoke(&mut self, message: Message) -> Result<(), FunctionError> {
        (self.0)(message);
        Ok(())
    }
}

/// Buffers messages and hands them to a callback `batch_size` at a time.
/// The final partial batch is delivered on close.
pub struct BatchSink<F> {
    batch_size: usize,
    buffer: Vec<Message>,
    on_batch: F,
}

impl<F> BatchSink<F>
where
    F: FnMut(Vec<Message>) -> Result<(), FunctionError> + Send,
{
    /// `batch_size` is clamped to at least 1.
    pub fn new(batch_size: usize, on_batch: F) -> Self {
        let batch_size = batch_size.max(1);
        Self {
            batch_size,
            buffer: Vec::with_capacity(batch_size),
            on_batch,
        }
    }

    fn flush(&mut self) -> Result<(), FunctionError> {
        if self.buffer.is_empty() {
            return Ok(());
        }
        let batch = std::mem::replace(&mut self.buffer, Vec::with_capacity(self.batch_size));
        (self.on_batch)(batch)
    }
}

impl<F> SinkFunction for BatchSink<F>
where
    F: FnMut(Vec<Message>) -> Result<(), FunctionError> + Send,
{
    fn invoke(&mut self, message: Message) -> Result<(), FunctionError> {
        self.buffer.push(message);
        if self.buffer.len() >= self.batch_size {
            self.flush()?;
        }
        Ok(())
    }

    fn close(&mut self) -> Result<(), FunctionError> {
        self.flush()
    }
}
