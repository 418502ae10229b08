//! Seed data: the default region hierarchy used when no saved state exists.

use std::fs;
use std::path::Path;

use crate::error::{AppError, Result};
use crate::models::{Hierarchy, Region};

/// Dataset compiled into the binary.
const BUNDLED_STATES: &str = include_str!("../../data/default_states.json");

/// Root seed data structure.
#[derive(Debug, Clone)]
pub struct Seed {
    pub regions: Vec<Region>,
}

impl Seed {
    /// Parse the bundled dataset.
    pub fn bundled() -> Result<Self> {
        Self::parse(BUNDLED_STATES)
    }

    /// Load seed data from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Load an override file if configured, otherwise the bundled dataset.
    pub fn load_or_bundled(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path).map_err(|e| {
                AppError::config(format!("Seed file {} unusable: {e}", path.display()))
            }),
            None => Self::bundled(),
        }
    }

    fn parse(content: &str) -> Result<Self> {
        let regions: Vec<Region> = serde_json::from_str(content)?;
        Ok(Self { regions })
    }

    /// Validate that the dataset can back a hierarchy.
    pub fn validate(&self) -> Result<()> {
        if self.regions.is_empty() {
            return Err(AppError::validation("No regions defined in seed data"));
        }
        Hierarchy::new(self.regions.clone()).map(|_| ())
    }

    pub fn district_count(&self) -> usize {
        self.regions.iter().map(|region| region.districts.len()).sum()
    }

    pub fn community_count(&self) -> usize {
        self.regions.iter().map(|region| region.community.len()).sum()
    }
}
