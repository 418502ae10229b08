//! Location index over the region hierarchy.
//!
//! Maps normalized names to every entity registered under them. A key may
//! resolve to several targets when different entities share a name; all of
//! them receive the match.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;

use crate::models::{Hierarchy, Scope};

static WHITESPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("valid whitespace pattern"));

/// Normalize a name or a line for lookups.
///
/// Hashtags and underscores become spaces so `#Київська_область` reads as
/// `київська область`; typographic apostrophes fold into `'`.
pub fn normalize_key(value: &str) -> String {
    let replaced = value.replace(['#', '_'], " ").replace('’', "'");
    let collapsed = WHITESPACE.replace_all(&replaced, " ");
    collapsed.trim().to_lowercase()
}

/// An entity a location name points to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LocationTarget {
    pub scope: Scope,
    pub region_id: String,
    /// Position within the region's districts or community list
    pub child: Option<usize>,
}

impl LocationTarget {
    pub fn region(region_id: impl Into<String>) -> Self {
        Self {
            scope: Scope::Region,
            region_id: region_id.into(),
            child: None,
        }
    }

    pub fn child(scope: Scope, region_id: impl Into<String>, index: usize) -> Self {
        Self {
            scope,
            region_id: region_id.into(),
            child: Some(index),
        }
    }
}

/// Normalized name → targets lookup, derived from a hierarchy snapshot.
#[derive(Debug, Clone, Default)]
pub struct LocationIndex {
    entries: HashMap<String, Vec<LocationTarget>>,
    /// Keys ordered longest first, ties broken alphabetically
    keys_by_length: Vec<String>,
}

impl LocationIndex {
    /// Build the index from scratch.
    pub fn build(hierarchy: &Hierarchy) -> Self {
        let mut entries: HashMap<String, Vec<LocationTarget>> = HashMap::new();

        for region in hierarchy.regions() {
            register(&mut entries, &region.name, LocationTarget::region(&region.id));
            if let Some(name_en) = region.name_en.as_deref() {
                register(&mut entries, name_en, LocationTarget::region(&region.id));
            }

            for scope in [Scope::District, Scope::Community] {
                for (index, child) in region.children(scope).iter().enumerate() {
                    register(
                        &mut entries,
                        &child.name,
                        LocationTarget::child(scope, &region.id, index),
                    );
                }
            }
        }

        let mut keys_by_length: Vec<String> = entries.keys().cloned().collect();
        keys_by_length.sort_by(|a, b| {
            b.chars()
                .count()
                .cmp(&a.chars().count())
                .then_with(|| a.cmp(b))
        });

        Self {
            entries,
            keys_by_length,
        }
    }

    /// Targets registered under an already normalized key.
    pub fn lookup(&self, key: &str) -> Option<&[LocationTarget]> {
        self.entries.get(key).map(Vec::as_slice)
    }

    /// Keys in matching order.
    pub fn keys_by_length(&self) -> &[String] {
        &self.keys_by_length
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn register(entries: &mut HashMap<String, Vec<LocationTarget>>, name: &str, target: LocationTarget) {
    let key = normalize_key(name);
    if key.is_empty() {
        return;
    }
    entries.entry(key).or_default().push(target);
}
