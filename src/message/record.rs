use super::Message;

/// An ordered batch of messages: the unit passed into and out of `process`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record {
    messages: Vec<Message>,
}

impl Record {
    pub fn new(messages: Vec<Message>) -> Self {
        Self { messages }
    }

    pub fn single(message: Message) -> Self {
        Self {
            messages: vec![message],
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn messages_mut(&mut self) -> &mut [Message] {
        &mut self.messages
    }

    pub fn push(&mut self, message: Message) {
        self.messages.push(message);
    }

    pub fn into_messages(self) -> Vec<Message> {
        self.messages
    }
}

impl From<Message> for Record {
    fn from(message: Message) -> Self {
        Record::single(message)
    }
}

impl From<Vec<Message>> for Record {
    fn from(messages: Vec<Message>) -> Self {
        Record::new(messages)
    }
}

impl IntoIterator for Record {
    type Item = Message;
    type IntoIter = std::vec::IntoIter<Message>;

    fn into_iter(self) -> Self::IntoIter {
        self.messages.into_iter()
    }
}
