// src/pipeline/status.rs

//! Read-only projection of the persisted states for downstream consumers.

use indexmap::IndexMap;
use serde::Serialize;

use crate::error::Result;
use crate::models::{Region, SubArea};
use crate::storage::{LoadOutcome, StateStorage};

/// Projected alert state of a district or community.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AreaStatus {
    pub name: String,
    pub alert: bool,
    pub changed: String,
}

impl From<&SubArea> for AreaStatus {
    fn from(area: &SubArea) -> Self {
        Self {
            name: area.name.clone(),
            alert: area.alert,
            changed: area.changed.clone(),
        }
    }
}

/// Projected alert state of a region.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RegionStatus {
    pub name: String,
    pub alert: bool,
    pub changed: String,
    pub districts: Vec<AreaStatus>,
    pub community: Vec<AreaStatus>,
}

impl From<&Region> for RegionStatus {
    fn from(region: &Region) -> Self {
        Self {
            name: region.name.clone(),
            alert: region.alert,
            changed: region.changed.clone(),
            districts: region.districts.iter().map(AreaStatus::from).collect(),
            community: region.community.iter().map(AreaStatus::from).collect(),
        }
    }
}

/// Region statuses keyed by region id, in stored order.
pub type StatusProjection = IndexMap<String, RegionStatus>;

/// Project regions, skipping entries without an id.
pub fn project(regions: &[Region]) -> StatusProjection {
    regions
        .iter()
        .filter(|region| !region.id.trim().is_empty())
        .map(|region| (region.id.clone(), RegionStatus::from(region)))
        .collect()
}

/// Project the stored states; missing or unusable data projects to empty.
pub async fn load_projection(storage: &dyn StateStorage) -> Result<StatusProjection> {
    let outcome = match storage.load_regions().await {
        Ok(outcome) => outcome,
        Err(e) => {
            log::warn!("Stored states at {} not readable: {}", storage.describe(), e);
            return Ok(StatusProjection::new());
        }
    };

    match outcome {
        LoadOutcome::Loaded(regions) => Ok(project(&regions)),
        LoadOutcome::Missing => {
            log::warn!("No stored states at {}", storage.describe());
            Ok(StatusProjection::new())
        }
        LoadOutcome::Invalid(reason) => {
            log::warn!("Stored states at {} unreadable: {}", storage.describe(), reason);
            Ok(StatusProjection::new())
        }
    }
}

/// Render the stored states as pretty JSON.
pub async fn run_status(storage: &dyn StateStorage) -> Result<String> {
    let projection = load_projection(storage).await?;
    Ok(serde_json::to_string_pretty(&projection)?)
}
