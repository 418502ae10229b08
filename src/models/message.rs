//! Channel message data structures.

use serde::{Deserialize, Serialize};

/// Message body as delivered by the feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageText {
    /// Raw text, split on line breaks before classification
    Raw(String),
    /// Already split segments, each one classified on its own
    Segments(Vec<String>),
}

impl Default for MessageText {
    fn default() -> Self {
        Self::Raw(String::new())
    }
}

impl From<&str> for MessageText {
    fn from(text: &str) -> Self {
        Self::Raw(text.to_string())
    }
}

impl From<String> for MessageText {
    fn from(text: String) -> Self {
        Self::Raw(text)
    }
}

/// A post fetched from the channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Sequential post id within the channel
    pub id: u64,

    /// Author label shown on the post
    #[serde(default)]
    pub author: String,

    /// Post body
    #[serde(default)]
    pub text: MessageText,

    /// Post time in the display timezone, `YYYY-MM-DD HH:MM:SS`
    #[serde(default)]
    pub timestamp: String,
}

impl Message {
    pub fn new(
        id: u64,
        author: impl Into<String>,
        text: impl Into<MessageText>,
        timestamp: impl Into<String>,
    ) -> Self {
        Self {
            id,
            author: author.into(),
            text: text.into(),
            timestamp: timestamp.into(),
        }
    }

    /// Single-line rendering used in debug output.
    pub fn summary(&self) -> String {
        let text = match &self.text {
            MessageText::Raw(text) => text.clone(),
            MessageText::Segments(segments) => segments.join(" | "),
        };
        format!("[{}] {} ({}): {}", self.id, self.author, self.timestamp, text)
    }
}

/// One classification unit cut from a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Line {
    pub message_id: u64,
    pub author: String,
    pub timestamp: String,
    pub text: String,
}

impl Line {
    /// Audit text stored as an entity's `reason`.
    pub fn reason(&self, timestamp: &str) -> String {
        let mut formatted = format!("[{}]", self.message_id);
        if !timestamp.is_empty() {
            formatted.push_str(&format!(" ({timestamp})"));
        }
        formatted.push_str(": ");
        formatted.push_str(&self.text);
        formatted
    }
}
