use postbox_storage::Document;
use serde::{Deserialize, Serialize};
use std::convert::TryFrom;

/// An inspirational message from a mood collection.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct Message {
    pub content: String,
}

impl Message {
    pub fn new<S: Into<String>>(content: S) -> Message {
        Message {
            content: content.into(),
        }
    }
}

impl TryFrom<Document> for Message {
    type Error = String;

    fn try_from(value: Document) -> Result<Self, Self::Error> {
        let content = value.extract_string("content")?;
        Ok(Message { content })
    }
}

impl From<Message> for Document {
    fn from(value: Message) -> Self {
        let mut doc = Document::default();
        doc.insert("content", value.content);
        doc
    }
}
