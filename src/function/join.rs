use crate::errors::FunctionError;
use crate::message::Message;

/// Two-input function: combines one message from each side of a connected stream.
///
/// No join operator is wired yet; `DataStream::connect` accepts an implementation and
/// reports `NotImplemented`.
pub trait JoinFunction: Send {
    fn join(&mut self, left: Message, right: Message) -> Result<Option<Message>, FunctionError>;
}

pub struct FnJoin<F>(pub F);

impl<F> FnJoin<F>
where
    F: FnMut(Message, Message) -> Result<Option<Message>, FunctionError> + Send,
{
    pub fn new(f: F) -> Self {
        Self(f)
    }
}

impl<F> JoinFunction for FnJoin<F>
where
    F: FnMut(Message, Message) -> Result<Option<Message>, FunctionError> + Send,
{
    fn join(&mut self, left: Message, right: Message) -> Result<Option<Message>, FunctionError> {
        (self.0)(left, right)
    }
}
