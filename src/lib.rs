// src/lib.rs

//! skogen: air raid alert feed ingester
//!
//! Follows a public channel feed, classifies each post as raising or
//! clearing alerts for regions, districts and communities, and keeps a
//! persisted, consistent alert state for the whole hierarchy.

pub mod error;
pub mod models;
pub mod pipeline;
pub mod services;
pub mod storage;
pub mod utils;
