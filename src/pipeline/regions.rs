// src/pipeline/regions.rs

//! Human-readable dump of the region hierarchy.

use std::fmt::Write as _;

use crate::error::Result;
use crate::models::{Hierarchy, Region, Seed, SubArea};
use crate::storage::{LoadOutcome, StateStorage};

/// Stored hierarchy when usable, the seed otherwise.
pub async fn load_hierarchy(storage: &dyn StateStorage, seed: Seed) -> Result<Hierarchy> {
    if let LoadOutcome::Loaded(regions) = storage.load_regions().await? {
        match Hierarchy::new(regions) {
            Ok(hierarchy) if !hierarchy.is_empty() => return Ok(hierarchy),
            Ok(_) => log::warn!("Stored states are empty, showing seed data"),
            Err(e) => log::warn!("Stored states rejected ({}), showing seed data", e),
        }
    } else {
        log::info!("No usable stored states, showing seed data");
    }
    Hierarchy::new(seed.regions)
}

/// Render regions and their children as an indented tree.
pub fn render_tree(hierarchy: &Hierarchy) -> String {
    let mut out = String::new();
    for region in hierarchy.regions() {
        render_region(&mut out, region);
    }
    out
}

fn render_region(out: &mut String, region: &Region) {
    let _ = write!(out, "{} [{}]", region.name, region.id);
    if let Some(name_en) = &region.name_en {
        let _ = write!(out, " ({})", name_en);
    }
    let _ = writeln!(out, ": {}", flag(region.alert, &region.changed));

    render_children(out, "Districts", &region.districts);
    render_children(out, "Communities", &region.community);
}

fn render_children(out: &mut String, title: &str, children: &[SubArea]) {
    if children.is_empty() {
        return;
    }
    let _ = writeln!(out, "  {}:", title);
    for child in children {
        let _ = writeln!(out, "    - {}: {}", child.name, flag(child.alert, &child.changed));
    }
}

fn flag(alert: bool, changed: &str) -> String {
    if alert {
        format!("ALERT since {}", changed)
    } else {
        "clear".to_string()
    }
}
