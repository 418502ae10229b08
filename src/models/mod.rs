// src/models/mod.rs

//! Domain models for the alert feed service.
//!
//! This module contains all data structures used throughout the application,
//! organized by their primary purpose.

mod config;
mod message;
mod region;
mod seed;

// Re-export all public types
pub use config::{
    ClassifierConfig, Config, CursorPlacement, FeedConfig, KeywordRule, LoggingConfig, PollConfig,
    StorageConfig,
};
pub use message::{Line, Message, MessageText};
pub use region::{Hierarchy, NEVER_CHANGED, Region, Scope, SubArea};
pub use seed::Seed;
