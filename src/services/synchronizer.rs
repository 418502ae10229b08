//! Alert state synchronization.
//!
//! Applies classified lines to the region hierarchy and keeps every region
//! consistent with its children: a region alerts when it was raised
//! explicitly or when any of its districts or communities alerts. The state
//! is persisted after each message that changed anything.

use chrono::Local;

use crate::error::{AppError, Result};
use crate::models::{Hierarchy, Message, Region, Scope, Seed};
use crate::services::classifier::StatusClassifier;
use crate::services::lines::split_lines;
use crate::services::locations::{LocationIndex, LocationTarget};
use crate::services::matcher::match_locations;
use crate::services::parser::TIMESTAMP_FORMAT;
use crate::storage::{LoadOutcome, StateStorage};
use crate::utils::report;

/// Owner of the live hierarchy.
pub struct StateSynchronizer<S: StateStorage> {
    storage: S,
    classifier: StatusClassifier,
    hierarchy: Hierarchy,
    index: LocationIndex,
}

impl<S: StateStorage> StateSynchronizer<S> {
    /// Load the stored hierarchy, or seed and save it when nothing usable
    /// is stored.
    pub async fn open(storage: S, classifier: StatusClassifier, seed: Seed) -> Result<Self> {
        let (hierarchy, context) = match storage.load_regions().await? {
            LoadOutcome::Loaded(regions) if regions.is_empty() => {
                log::warn!("Stored states at {} are empty", storage.describe());
                (seed_hierarchy(&storage, seed).await?, "Reinitialized states storage")
            }
            LoadOutcome::Loaded(regions) => match Hierarchy::new(regions) {
                Ok(hierarchy) => (hierarchy, "Loaded saved states"),
                Err(e) => {
                    log::warn!("Stored states at {} rejected: {}", storage.describe(), e);
                    (seed_hierarchy(&storage, seed).await?, "Reinitialized states storage")
                }
            },
            LoadOutcome::Invalid(reason) => {
                log::warn!("Stored states at {} unreadable: {}", storage.describe(), reason);
                (seed_hierarchy(&storage, seed).await?, "Reinitialized states storage")
            }
            LoadOutcome::Missing => (
                seed_hierarchy(&storage, seed).await?,
                "Created new states storage",
            ),
        };

        report::region_states(context, &hierarchy);
        let index = LocationIndex::build(&hierarchy);
        log::debug!("Location index holds {} key(s)", index.len());

        Ok(Self {
            storage,
            classifier,
            hierarchy,
            index,
        })
    }

    pub fn hierarchy(&self) -> &Hierarchy {
        &self.hierarchy
    }

    pub fn regions(&self) -> &[Region] {
        self.hierarchy.regions()
    }

    pub fn index(&self) -> &LocationIndex {
        &self.index
    }

    /// Apply every line of a message. Returns whether any state changed.
    ///
    /// Lines that cannot be classified or located are skipped with a
    /// warning. Only a failed save is an error.
    pub async fn parse_message(&mut self, message: &Message) -> Result<bool> {
        let mut updated = false;

        for line in split_lines(message) {
            let timestamp = if line.timestamp.is_empty() {
                Local::now().format(TIMESTAMP_FORMAT).to_string()
            } else {
                line.timestamp.clone()
            };
            let reason = line.reason(&timestamp);

            if self.classifier.is_ignored(&line.text) {
                log::info!("Skipped: {}", reason);
                continue;
            }

            let status = self.classifier.classify(&line.text);
            let targets = match_locations(&line.text, &self.index);

            if status.is_none() {
                log::warn!("Unable to detect alert status: {}", reason);
            }
            if targets.is_empty() {
                log::warn!("Unable to detect alert location: {}", reason);
            }
            let Some(status) = status else {
                continue;
            };

            for target in &targets {
                if self.apply(target, status, &timestamp, &reason) {
                    updated = true;
                }
            }
        }

        if updated {
            self.storage.save_regions(self.hierarchy.regions()).await?;
            self.index = LocationIndex::build(&self.hierarchy);
        }

        Ok(updated)
    }

    fn apply(&mut self, target: &LocationTarget, status: bool, timestamp: &str, reason: &str) -> bool {
        let Some(region) = self.hierarchy.region_mut(&target.region_id) else {
            log::warn!("Location points at unknown region \"{}\"", target.region_id);
            return false;
        };

        let Some(position) = target.child else {
            let explicit_changed = region.explicit_alert != status;
            region.explicit_alert = status;
            return sync_region(region, timestamp, reason) || explicit_changed;
        };

        let region_name = region.name.clone();
        let Some(child) = region.child_mut(target.scope, position) else {
            log::warn!(
                "Location points at missing {} #{} of \"{}\"",
                target.scope,
                position,
                region_name
            );
            return false;
        };

        let child_flipped = child.alert != status;
        if child_flipped {
            child.alert = status;
            child.changed = timestamp.to_string();
            child.reason = reason.to_string();
            log_update(&region_name, Some((target.scope, &child.name)), status, reason);
        }

        sync_region(region, timestamp, reason) || child_flipped
    }
}

async fn seed_hierarchy<S: StateStorage>(storage: &S, seed: Seed) -> Result<Hierarchy> {
    if seed.regions.is_empty() {
        return Err(AppError::config("Seed data defines no regions"));
    }
    let hierarchy = Hierarchy::new(seed.regions)?;
    storage.save_regions(hierarchy.regions()).await?;
    log::info!("Seeded {} region(s) into {}", hierarchy.len(), storage.describe());
    Ok(hierarchy)
}

/// Re-derive a region's alert from its explicit flag and children.
fn sync_region(region: &mut Region, timestamp: &str, reason: &str) -> bool {
    let alert = region.derived_alert();
    if alert == region.alert {
        return false;
    }

    region.alert = alert;
    region.changed = timestamp.to_string();
    region.reason = reason.to_string();
    log_update(&region.name, None, alert, reason);
    true
}

fn log_update(region: &str, child: Option<(Scope, &str)>, alert: bool, reason: &str) {
    let subject = match child {
        Some((Scope::District, name)) => format!("State \"{}\" District \"{}\"", region, name),
        Some((Scope::Community, name)) => format!("State \"{}\" Community \"{}\"", region, name),
        _ => format!("State \"{}\"", region),
    };
    log::info!("{} alert => {} because of \"{}\"", subject, alert, reason);
}
