use crate::message::Message;

/// Extracts the partitioning key of a message.
pub trait KeySelector: Send {
    fn key(&mut self, message: &Message) -> String;
}

pub struct FnKey<F>(pub F);

impl<F> FnKey<F>
where
    F: FnMut(&Message) -> String + Send,
{
    pub fn new(f: F) -> Self {
        Self(f)
    }
}

impl<F> KeySelector for FnKey<F>
where
    F: FnMut(&Message) -> String + Send,
{
    fn key(&mut self, message: &Message) -> String {
        (self.0)(message)
    }
}

/// Reads the key from a metadata field; missing fields map to the empty key.
pub struct FieldKey {
    field: String,
}

impl FieldKey {
    pub fn new(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
        }
    }
}

impl KeySelector for FieldKey {
    fn key(&mut self, message: &Message) -> String {
        message
            .metadata_value(&self.field)
            .unwrap_or_default()
            .to_string()
    }
}
