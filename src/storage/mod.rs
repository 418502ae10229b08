//! Persistence of the region hierarchy.
//!
//! The state lives in a single JSON file holding the region array in its
//! stable order:
//!
//! ```text
//! data/
//! ├── config.toml
//! ├── states.json       # persisted hierarchy, rewritten on every change
//! └── states.json.tmp   # transient, renamed over states.json
//! ```

pub mod local;

use async_trait::async_trait;

use crate::error::Result;
use crate::models::Region;

pub use local::LocalStorage;

/// What a load attempt found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadOutcome {
    /// Nothing stored yet
    Missing,
    /// Stored data exists but is not a region array
    Invalid(String),
    Loaded(Vec<Region>),
}

/// Trait for state storage backends.
#[async_trait]
pub trait StateStorage: Send + Sync {
    /// Read the stored regions. Unreadable storage is an error, unusable
    /// content is [`LoadOutcome::Invalid`].
    async fn load_regions(&self) -> Result<LoadOutcome>;

    /// Replace the stored regions in full.
    async fn save_regions(&self, regions: &[Region]) -> Result<()>;

    /// Human-readable location for log lines.
    fn describe(&self) -> String;
}
