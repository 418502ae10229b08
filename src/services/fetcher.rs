//! Channel feed fetching.
//!
//! The preview endpoint serves pages of posts in reverse-chronological
//! windows. Walking backward with a `before` cursor, the fetcher collects
//! either an initial backlog or everything newer than its high-water mark,
//! and hands the result over oldest first.

use std::collections::HashSet;

use tokio_util::sync::CancellationToken;

use crate::error::{AppError, Result};
use crate::models::{FeedConfig, Message};
use crate::services::parser::{PageParser, decode_payload};
use crate::services::retry::RetryPolicy;
use crate::utils::http::{FeedRequest, Transport};

const ACCEPT: &str = "application/json, text/javascript, */*; q=0.01";
const CONTENT_TYPE: &str = "application/x-www-form-urlencoded; charset=UTF-8";

/// Incremental fetcher over a channel preview feed.
pub struct FeedFetcher<T: Transport> {
    transport: T,
    config: FeedConfig,
    parser: PageParser,
    retry: RetryPolicy,
    shutdown: CancellationToken,
    last_message_id: u64,
    last_error: Option<String>,
}

impl<T: Transport> FeedFetcher<T> {
    /// Create a fetcher. A backlog size of 0 is raised to 1.
    pub fn new(transport: T, mut config: FeedConfig) -> Self {
        config.backlog_size = config.backlog_size.max(1);
        let parser = PageParser::new(config.tz());
        let retry = RetryPolicy::new(config.max_retries, config.retry_delay());
        Self {
            transport,
            config,
            parser,
            retry,
            shutdown: CancellationToken::new(),
            last_message_id: 0,
            last_error: None,
        }
    }

    /// Share a shutdown token with the caller so waits end early.
    pub fn with_shutdown(mut self, shutdown: CancellationToken) -> Self {
        self.shutdown = shutdown;
        self
    }

    /// Replace the retry policy derived from the config.
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Highest id handed out so far, 0 before the first successful fetch.
    pub fn last_message_id(&self) -> u64 {
        self.last_message_id
    }

    pub fn set_last_message_id(&mut self, id: u64) {
        self.last_message_id = id;
    }

    /// Failure recorded by the most recent page fetch, if any.
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Fetch the backlog on first use, then only posts newer than the mark.
    pub async fn fetch_messages(&mut self) -> Vec<Message> {
        if self.config.channel.trim().is_empty() {
            log::error!("Channel name cannot be empty");
            return Vec::new();
        }

        if self.last_message_id == 0 {
            self.fetch_backlog().await
        } else {
            self.fetch_new().await
        }
    }

    async fn fetch_backlog(&mut self) -> Vec<Message> {
        let backlog_size = self.config.backlog_size;
        let mut result: Vec<Message> = Vec::new();
        let mut before = None;
        let mut seen_before = HashSet::new();

        while result.len() < backlog_size {
            let page = self.fetch_page(before).await;
            let Some(oldest) = oldest_id(&page) else {
                break;
            };

            result = merge_messages(page, result);
            if result.len() >= backlog_size || !seen_before.insert(oldest) {
                break;
            }
            before = Some(oldest);
        }

        let result = limit_messages(dedup_messages(result), backlog_size);
        self.advance_mark(&result);
        log::debug!("Backlog fetch returned {} message(s)", result.len());
        result
    }

    async fn fetch_new(&mut self) -> Vec<Message> {
        let after = self.last_message_id;
        let mut messages: Vec<Message> = Vec::new();
        let mut before = None;
        let mut seen_before = HashSet::new();

        loop {
            let page = self.fetch_page(before).await;
            let Some(oldest) = oldest_id(&page) else {
                break;
            };

            messages = merge_messages(page, messages);
            if messages.first().is_none_or(|m| m.id <= after) {
                break;
            }
            if !seen_before.insert(oldest) {
                break;
            }
            before = Some(oldest);
        }

        let result: Vec<Message> = messages.into_iter().filter(|m| m.id > after).collect();
        let result = dedup_messages(result);
        self.advance_mark(&result);
        log::debug!(
            "Incremental fetch after {} returned {} message(s)",
            after,
            result.len()
        );
        result
    }

    /// Fetch and parse one page. Failures are logged and yield no messages.
    pub async fn fetch_page(&mut self, before: Option<u64>) -> Vec<Message> {
        let request = match self.build_request(before) {
            Ok(request) => request,
            Err(e) => {
                log::error!("Unable to build feed request: {}", e);
                self.last_error = Some(e.to_string());
                return Vec::new();
            }
        };

        let this = &*self;
        let outcome = this
            .retry
            .run("Feed request", &this.shutdown, |_| this.attempt(&request))
            .await;

        match outcome {
            Ok(messages) => {
                self.last_error = None;
                messages
            }
            Err(AppError::Cancelled) => {
                log::info!("Feed fetch cancelled");
                self.last_error = Some(AppError::Cancelled.to_string());
                Vec::new()
            }
            Err(e) => {
                log::error!("Unable to fetch messages after retries: {}", e);
                self.last_error = Some(e.to_string());
                Vec::new()
            }
        }
    }

    async fn attempt(&self, request: &FeedRequest) -> Result<Vec<Message>> {
        let response = tokio::select! {
            _ = self.shutdown.cancelled() => return Err(AppError::Cancelled),
            response = self.transport.send(request) => response?,
        };

        if !response.is_success() {
            return Err(AppError::Status {
                status: response.status,
            });
        }

        let html = decode_payload(&response.body)?;
        self.parser.parse(&html)
    }

    fn build_request(&self, before: Option<u64>) -> Result<FeedRequest> {
        let url = self.config.channel_url()?.to_string();
        let headers = vec![
            ("Accept".to_string(), ACCEPT.to_string()),
            ("Content-Type".to_string(), CONTENT_TYPE.to_string()),
            ("X-Requested-With".to_string(), "XMLHttpRequest".to_string()),
            ("User-Agent".to_string(), self.config.user_agent.clone()),
            ("Referer".to_string(), url.clone()),
        ];

        Ok(FeedRequest {
            url,
            before,
            cursor_placement: self.config.cursor_placement,
            headers,
        })
    }

    fn advance_mark(&mut self, messages: &[Message]) {
        if let Some(max) = messages.iter().map(|m| m.id).max() {
            self.last_message_id = self.last_message_id.max(max);
        }
    }
}

/// Keep the first-seen message per id and order ascending by id.
pub fn dedup_messages(messages: Vec<Message>) -> Vec<Message> {
    let mut seen = HashSet::new();
    let mut unique: Vec<Message> = messages
        .into_iter()
        .filter(|m| seen.insert(m.id))
        .collect();
    unique.sort_by_key(|m| m.id);
    unique
}

/// Prepend an older page to the accumulator and dedup.
pub fn merge_messages(page: Vec<Message>, accumulated: Vec<Message>) -> Vec<Message> {
    let mut merged = page;
    merged.extend(accumulated);
    dedup_messages(merged)
}

/// Keep the `limit` most recent messages of an ascending list.
pub fn limit_messages(mut messages: Vec<Message>, limit: usize) -> Vec<Message> {
    if messages.len() > limit {
        messages.drain(..messages.len() - limit);
    }
    messages
}

fn oldest_id(page: &[Message]) -> Option<u64> {
    page.iter().map(|m| m.id).min()
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;

    use super::*;
    use crate::models::{CursorPlacement, MessageText};
    use crate::utils::http::FeedResponse;

    fn message(id: u64, text: &str) -> Message {
        Message::new(id, "", text, "2024-01-01 00:00:00")
    }

    fn ids(messages: &[Message]) -> Vec<u64> {
        messages.iter().map(|m| m.id).collect()
    }

    fn render_page(ids: &[u64]) -> String {
        let html: String = ids
            .iter()
            .map(|id| {
                format!(
                    r#"<div class="tgme_widget_message js-widget_message" data-post="air_alert_ua/{id}">
                         <div class="tgme_widget_message_text">Пост {id}</div>
                         <div class="tgme_widget_message_footer"><time datetime="2024-03-01T08:00:00+00:00"></time></div>
                       </div>"#
                )
            })
            .collect();
        serde_json::to_string(&html).unwrap()
    }

    /// Channel with ascending ids, served newest window first.
    struct FakeFeed {
        ids: Mutex<Vec<u64>>,
        page_size: usize,
        ignore_cursor: bool,
        requests: Mutex<Vec<FeedRequest>>,
    }

    impl FakeFeed {
        fn new(ids: impl IntoIterator<Item = u64>, page_size: usize) -> Self {
            Self {
                ids: Mutex::new(ids.into_iter().collect()),
                page_size,
                ignore_cursor: false,
                requests: Mutex::new(Vec::new()),
            }
        }

        fn publish(&self, id: u64) {
            self.ids.lock().unwrap().push(id);
        }

        fn cursors(&self) -> Vec<Option<u64>> {
            self.requests.lock().unwrap().iter().map(|r| r.before).collect()
        }
    }

    #[async_trait]
    impl<'a> Transport for &'a FakeFeed {
        async fn send(&self, request: &FeedRequest) -> Result<FeedResponse> {
            self.requests.lock().unwrap().push(request.clone());

            let ids = self.ids.lock().unwrap();
            let visible: Vec<u64> = ids
                .iter()
                .copied()
                .filter(|id| self.ignore_cursor || request.before.is_none_or(|b| *id < b))
                .collect();
            let start = visible.len().saturating_sub(self.page_size);

            Ok(FeedResponse {
                status: 200,
                body: render_page(&visible[start..]),
            })
        }
    }

    struct FailingFeed {
        attempts: AtomicU32,
        status: u16,
    }

    #[async_trait]
    impl<'a> Transport for &'a FailingFeed {
        async fn send(&self, _request: &FeedRequest) -> Result<FeedResponse> {
            self.attempts.fetch_add(1, Ordering::SeqCst);
            Ok(FeedResponse {
                status: self.status,
                body: String::new(),
            })
        }
    }

    fn config(backlog_size: usize) -> FeedConfig {
        FeedConfig {
            backlog_size,
            max_retries: 3,
            retry_delay_secs: 0,
            ..FeedConfig::default()
        }
    }

    #[test]
    fn test_dedup_overlapping_windows() {
        let merged = merge_messages(
            vec![message(5, "a"), message(6, "b"), message(7, "first")],
            vec![message(7, "second"), message(8, "c"), message(9, "d")],
        );
        assert_eq!(ids(&merged), vec![5, 6, 7, 8, 9]);
        assert_eq!(merged[2].text, MessageText::from("first"));
    }

    #[test]
    fn test_dedup_sorts_ascending() {
        let result = dedup_messages(vec![message(9, ""), message(3, ""), message(9, "")]);
        assert_eq!(ids(&result), vec![3, 9]);
    }

    #[test]
    fn test_limit_keeps_most_recent() {
        let messages: Vec<Message> = (1..=10).map(|id| message(id, "")).collect();
        assert_eq!(ids(&limit_messages(messages, 3)), vec![8, 9, 10]);
        assert_eq!(limit_messages(vec![message(1, "")], 3).len(), 1);
    }

    #[tokio::test]
    async fn test_backlog_capped_to_most_recent() {
        let feed = FakeFeed::new(1..=10, 4);
        let mut fetcher = FeedFetcher::new(&feed, config(3));

        let messages = fetcher.fetch_messages().await;

        assert_eq!(ids(&messages), vec![8, 9, 10]);
        assert_eq!(fetcher.last_message_id(), 10);
        assert_eq!(feed.cursors(), vec![None]);
        assert_eq!(messages[0].text, MessageText::from("Пост 8"));
        assert_eq!(messages[0].timestamp, "2024-03-01 10:00:00");
    }

    #[tokio::test]
    async fn test_zero_backlog_still_sets_mark() {
        let feed = FakeFeed::new(1..=10, 4);
        let mut fetcher = FeedFetcher::new(&feed, config(0));

        let messages = fetcher.fetch_messages().await;
        assert_eq!(ids(&messages), vec![10]);
        assert_eq!(fetcher.last_message_id(), 10);

        feed.publish(11);
        assert_eq!(ids(&fetcher.fetch_messages().await), vec![11]);
    }

    #[tokio::test]
    async fn test_backlog_walks_back_through_pages() {
        let feed = FakeFeed::new(1..=10, 4);
        let mut fetcher = FeedFetcher::new(&feed, config(7));

        let messages = fetcher.fetch_messages().await;

        assert_eq!(ids(&messages), vec![4, 5, 6, 7, 8, 9, 10]);
        assert_eq!(feed.cursors(), vec![None, Some(7)]);
    }

    #[tokio::test]
    async fn test_backlog_stops_at_channel_start() {
        let feed = FakeFeed::new(1..=5, 2);
        let mut fetcher = FeedFetcher::new(&feed, config(100));

        let messages = fetcher.fetch_messages().await;

        assert_eq!(ids(&messages), vec![1, 2, 3, 4, 5]);
        // Last request finds nothing older than id 1.
        assert_eq!(feed.cursors(), vec![None, Some(4), Some(2), Some(1)]);
    }

    #[tokio::test]
    async fn test_incremental_fetch_after_mark() {
        let feed = FakeFeed::new(1..=10, 4);
        let mut fetcher = FeedFetcher::new(&feed, config(3));
        fetcher.fetch_messages().await;

        for id in 11..=13 {
            feed.publish(id);
        }
        let messages = fetcher.fetch_messages().await;
        assert_eq!(ids(&messages), vec![11, 12, 13]);
        assert_eq!(fetcher.last_message_id(), 13);

        let messages = fetcher.fetch_messages().await;
        assert!(messages.is_empty());
        assert_eq!(fetcher.last_message_id(), 13);
    }

    #[tokio::test]
    async fn test_incremental_walks_back_to_mark() {
        let feed = FakeFeed::new(1..=20, 4);
        let mut fetcher = FeedFetcher::new(&feed, config(3));
        fetcher.set_last_message_id(11);

        let messages = fetcher.fetch_messages().await;

        assert_eq!(ids(&messages), (12..=20).collect::<Vec<_>>());
        assert_eq!(feed.cursors(), vec![None, Some(17), Some(13)]);
    }

    #[tokio::test]
    async fn test_repeated_cursor_ends_walk() {
        let mut feed = FakeFeed::new([5, 6, 7], 3);
        feed.ignore_cursor = true;
        let mut fetcher = FeedFetcher::new(&feed, config(100));

        let messages = fetcher.fetch_messages().await;

        assert_eq!(ids(&messages), vec![5, 6, 7]);
        assert_eq!(feed.cursors(), vec![None, Some(5)]);
    }

    #[tokio::test]
    async fn test_retries_then_gives_up() {
        let feed = FailingFeed {
            attempts: AtomicU32::new(0),
            status: 500,
        };
        let mut fetcher = FeedFetcher::new(&feed, config(10));

        let messages = fetcher.fetch_messages().await;

        assert!(messages.is_empty());
        assert_eq!(feed.attempts.load(Ordering::SeqCst), 3);
        assert_eq!(fetcher.last_message_id(), 0);
        assert!(fetcher.last_error().is_some_and(|e| e.contains("500")));
    }

    #[tokio::test]
    async fn test_undecodable_payload_is_retried() {
        let feed = FailingFeed {
            attempts: AtomicU32::new(0),
            status: 200,
        };
        let mut fetcher =
            FeedFetcher::new(&feed, config(10)).with_retry(RetryPolicy::new(2, Duration::ZERO));

        assert!(fetcher.fetch_messages().await.is_empty());
        assert_eq!(feed.attempts.load(Ordering::SeqCst), 2);
        assert!(fetcher.last_error().is_some_and(|e| e.contains("empty body")));
    }

    #[tokio::test]
    async fn test_empty_channel_fetches_nothing() {
        let feed = FakeFeed::new(1..=3, 3);
        let mut fetcher = FeedFetcher::new(
            &feed,
            FeedConfig {
                channel: " ".to_string(),
                ..config(3)
            },
        );

        assert!(fetcher.fetch_messages().await.is_empty());
        assert!(feed.cursors().is_empty());
    }

    #[test]
    fn test_request_headers_and_cursor() {
        let feed = FakeFeed::new(std::iter::empty(), 1);
        let fetcher = FeedFetcher::new(
            &feed,
            FeedConfig {
                cursor_placement: CursorPlacement::Query,
                ..config(3)
            },
        );

        let request = fetcher.build_request(Some(42)).unwrap();
        assert_eq!(request.url, "https://t.me/s/air_alert_ua");
        assert_eq!(request.before, Some(42));
        assert_eq!(request.cursor_placement, CursorPlacement::Query);
        assert!(
            request
                .headers
                .contains(&("X-Requested-With".to_string(), "XMLHttpRequest".to_string()))
        );
        assert!(
            request
                .headers
                .contains(&("Referer".to_string(), "https://t.me/s/air_alert_ua".to_string()))
        );
    }
}
