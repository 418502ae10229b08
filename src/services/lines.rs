//! Line splitting: one message becomes one or more classification units.

use std::sync::LazyLock;

use regex::Regex;

use crate::models::{Line, Message, MessageText};

static LINE_BREAK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\r\n|\r|\n").expect("valid line break pattern"));

/// Split a message into trimmed, non-empty lines sharing its metadata.
pub fn split_lines(message: &Message) -> Vec<Line> {
    let pieces: Vec<&str> = match &message.text {
        MessageText::Segments(segments) => segments.iter().map(String::as_str).collect(),
        MessageText::Raw(text) => LINE_BREAK.split(text).collect(),
    };

    pieces
        .into_iter()
        .map(str::trim)
        .filter(|piece| !piece.is_empty())
        .map(|piece| Line {
            message_id: message.id,
            author: message.author.clone(),
            timestamp: message.timestamp.clone(),
            text: piece.to_string(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raw_text_split_on_any_break() {
        let message = Message::new(7, "bot", "a\r\nb\rc\n\n  d  ", "2024-01-01 00:00:00");
        let texts: Vec<String> = split_lines(&message).into_iter().map(|l| l.text).collect();
        assert_eq!(texts, vec!["a", "b", "c", "d"]);
    }

    #[test]
    fn test_segments_kept_as_lines() {
        let message = Message::new(
            8,
            "bot",
            MessageText::Segments(vec!["first line".into(), "  ".into(), "second\nline".into()]),
            "2024-01-01 00:00:00",
        );
        let lines = split_lines(&message);
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[1].text, "second\nline");
        assert!(lines.iter().all(|line| line.message_id == 8));
        assert!(lines.iter().all(|line| line.author == "bot"));
    }

    #[test]
    fn test_empty_message_has_no_lines() {
        let message = Message::new(9, "", "   ", "");
        assert!(split_lines(&message).is_empty());
    }
}
