// src/utils/http.rs

//! HTTP client utilities and the feed transport seam.

use std::time::Duration;

use async_trait::async_trait;

use crate::error::Result;
use crate::models::{CursorPlacement, FeedConfig};

/// One page request against the channel preview endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedRequest {
    pub url: String,
    /// Pagination cursor: only posts older than this id
    pub before: Option<u64>,
    pub cursor_placement: CursorPlacement,
    pub headers: Vec<(String, String)>,
}

/// Raw answer of the feed endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedResponse {
    pub status: u16,
    pub body: String,
}

impl FeedResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Performs feed requests. `Err` means the request never got a response.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: &FeedRequest) -> Result<FeedResponse>;
}

/// Create a configured asynchronous HTTP client.
pub fn create_async_client(config: &FeedConfig) -> Result<reqwest::Client> {
    let client = reqwest::Client::builder()
        .user_agent(&config.user_agent)
        .timeout(Duration::from_secs(config.timeout_secs))
        .build()?;
    Ok(client)
}

/// [`Transport`] backed by reqwest.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }

    pub fn from_config(config: &FeedConfig) -> Result<Self> {
        Ok(Self::new(create_async_client(config)?))
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: &FeedRequest) -> Result<FeedResponse> {
        let mut builder = self.client.post(&request.url);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        builder = match (request.before, request.cursor_placement) {
            (Some(before), CursorPlacement::Query) => builder.query(&[("before", before)]),
            (Some(before), CursorPlacement::Form) => builder.body(form_body(before)),
            (None, _) => builder.body(String::new()),
        };

        let response = builder.send().await?;
        let status = response.status().as_u16();
        let body = response.text().await?;
        Ok(FeedResponse { status, body })
    }
}

fn form_body(before: u64) -> String {
    url::form_urlencoded::Serializer::new(String::new())
        .append_pair("before", &before.to_string())
        .finish()
}
