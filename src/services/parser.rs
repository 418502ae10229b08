//! Channel page decoding and parsing.
//!
//! A page arrives as a JSON string wrapping an HTML fragment. Each post in the
//! fragment becomes a [`Message`] with its id, author, flattened text and a
//! timestamp in the display timezone.

use chrono::DateTime;
use chrono_tz::Tz;
use scraper::{ElementRef, Html, Node, Selector};

use crate::error::{AppError, Result};
use crate::models::Message;

const MESSAGE_SELECTOR: &str = r#"[class*="tgme_widget_message"][data-post]"#;
const AUTHOR_SELECTOR: &str = r#"[class*="tgme_widget_message_author"] span"#;
const TEXT_SELECTOR: &str = r#"[class*="tgme_widget_message_text"]"#;
const TIME_SELECTOR: &str = r#"[class*="tgme_widget_message_footer"] time[datetime]"#;

/// Display format of message timestamps.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Unwrap the HTML fragment from a JSON string payload.
pub fn decode_payload(body: &str) -> Result<String> {
    if body.is_empty() {
        return Err(AppError::payload("Feed responded with an empty body"));
    }

    let decoded: serde_json::Value = serde_json::from_str(body)
        .map_err(|e| AppError::payload(format!("Feed payload is not valid JSON: {e}")))?;

    match decoded {
        serde_json::Value::String(html) => Ok(html),
        _ => Err(AppError::payload(
            "Feed payload was not the expected JSON string",
        )),
    }
}

/// Parser for channel preview fragments.
#[derive(Debug, Clone)]
pub struct PageParser {
    timezone: Tz,
}

impl PageParser {
    pub fn new(timezone: Tz) -> Self {
        Self { timezone }
    }

    /// Extract messages in document order; posts without id or time are dropped.
    pub fn parse(&self, html: &str) -> Result<Vec<Message>> {
        let document = Html::parse_fragment(html);

        let message_sel = parse_selector(MESSAGE_SELECTOR)?;
        let author_sel = parse_selector(AUTHOR_SELECTOR)?;
        let text_sel = parse_selector(TEXT_SELECTOR)?;
        let time_sel = parse_selector(TIME_SELECTOR)?;

        let messages = document
            .select(&message_sel)
            .filter_map(|node| self.parse_message(node, &author_sel, &text_sel, &time_sel))
            .collect();

        Ok(messages)
    }

    fn parse_message(
        &self,
        node: ElementRef<'_>,
        author_sel: &Selector,
        text_sel: &Selector,
        time_sel: &Selector,
    ) -> Option<Message> {
        let id = node
            .value()
            .attr("data-post")
            .and_then(|post| post.rsplit('/').next())
            .and_then(|segment| segment.trim().parse::<u64>().ok())?;

        let author = node
            .select(author_sel)
            .next()
            .map(|el| el.text().collect::<String>().trim().to_string())
            .unwrap_or_default();

        let blocks: Vec<String> = node
            .select(text_sel)
            .map(block_text)
            .filter(|block| !block.is_empty())
            .collect();
        let text = collapse_whitespace(&blocks.join(" "));

        let timestamp = node
            .select(time_sel)
            .next()
            .and_then(|el| el.value().attr("datetime"))
            .and_then(|raw| self.format_timestamp(raw))?;

        Some(Message::new(id, author, text, timestamp))
    }

    /// Convert a machine-readable datetime to the display timezone.
    pub fn format_timestamp(&self, raw: &str) -> Option<String> {
        match DateTime::parse_from_rfc3339(raw.trim()) {
            Ok(datetime) => Some(
                datetime
                    .with_timezone(&self.timezone)
                    .format(TIMESTAMP_FORMAT)
                    .to_string(),
            ),
            Err(e) => {
                log::warn!("Unparseable message datetime \"{}\": {}", raw, e);
                None
            }
        }
    }
}

/// Text content of a block with `<br>` read as a space.
fn block_text(block: ElementRef<'_>) -> String {
    let mut raw = String::new();
    for node in block.descendants() {
        match node.value() {
            Node::Text(text) => raw.push_str(text),
            Node::Element(element) if element.name() == "br" => raw.push(' '),
            _ => {}
        }
    }
    collapse_whitespace(&raw)
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn parse_selector(s: &str) -> Result<Selector> {
    Selector::parse(s).map_err(|e| AppError::selector(s, format!("{e:?}")))
}
