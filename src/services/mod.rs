//! Service layer for the alert feed.
//!
//! This module contains the business logic for:
//! - Feed fetching and pagination (`FeedFetcher`)
//! - Page decoding (`PageParser`)
//! - Alert status detection (`StatusClassifier`)
//! - Location lookup and matching (`LocationIndex`, `match_locations`)
//! - Applying updates to the hierarchy (`StateSynchronizer`)

pub mod classifier;
pub mod fetcher;
pub mod lines;
pub mod locations;
pub mod matcher;
pub mod parser;
pub mod retry;
pub mod synchronizer;

pub use classifier::StatusClassifier;
pub use fetcher::{FeedFetcher, dedup_messages};
pub use lines::split_lines;
pub use locations::{LocationIndex, LocationTarget, normalize_key};
pub use matcher::match_locations;
pub use parser::{PageParser, decode_payload};
pub use retry::RetryPolicy;
pub use synchronizer::StateSynchronizer;
