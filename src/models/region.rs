//! Region hierarchy: regions with their districts and communities.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

/// `changed` value of an entity that never flipped.
pub const NEVER_CHANGED: &str = "1970-01-01 03:00:00";

fn never_changed() -> String {
    NEVER_CHANGED.to_string()
}

/// Level of an entity in the hierarchy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scope {
    Region,
    District,
    Community,
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scope::Region => write!(f, "region"),
            Scope::District => write!(f, "district"),
            Scope::Community => write!(f, "community"),
        }
    }
}

/// A district or community, a leaf of the hierarchy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "SubAreaRepr")]
pub struct SubArea {
    pub name: String,
    pub alert: bool,
    pub changed: String,
    pub reason: String,
}

impl SubArea {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            alert: false,
            changed: never_changed(),
            reason: String::new(),
        }
    }
}

/// Stored sub-areas are either a bare name or a full object.
#[derive(Deserialize)]
#[serde(untagged)]
enum SubAreaRepr {
    Name(String),
    Full {
        #[serde(default)]
        name: String,
        #[serde(default)]
        alert: bool,
        #[serde(default = "never_changed")]
        changed: String,
        #[serde(default)]
        reason: String,
    },
}

impl From<SubAreaRepr> for SubArea {
    fn from(repr: SubAreaRepr) -> Self {
        match repr {
            SubAreaRepr::Name(name) => SubArea::new(name),
            SubAreaRepr::Full {
                name,
                alert,
                changed,
                reason,
            } => SubArea {
                name,
                alert,
                changed,
                reason,
            },
        }
    }
}

/// Top-level geographic entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Region {
    /// Stable external identifier
    pub id: String,

    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name_en: Option<String>,

    #[serde(default)]
    pub alert: bool,

    /// Set by region-level lines; children alone never set it
    #[serde(default)]
    pub explicit_alert: bool,

    #[serde(default = "never_changed")]
    pub changed: String,

    #[serde(default)]
    pub reason: String,

    #[serde(default)]
    pub districts: Vec<SubArea>,

    #[serde(default)]
    pub community: Vec<SubArea>,
}

impl Region {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            name_en: None,
            alert: false,
            explicit_alert: false,
            changed: never_changed(),
            reason: String::new(),
            districts: Vec::new(),
            community: Vec::new(),
        }
    }

    pub fn with_name_en(mut self, name_en: impl Into<String>) -> Self {
        self.name_en = Some(name_en.into());
        self
    }

    pub fn with_district(mut self, name: impl Into<String>) -> Self {
        self.districts.push(SubArea::new(name));
        self
    }

    pub fn with_community(mut self, name: impl Into<String>) -> Self {
        self.community.push(SubArea::new(name));
        self
    }

    /// Whether any district or community currently alerts.
    pub fn children_alerting(&self) -> bool {
        self.districts
            .iter()
            .chain(self.community.iter())
            .any(|child| child.alert)
    }

    /// Alert value implied by the explicit flag and the children.
    pub fn derived_alert(&self) -> bool {
        self.explicit_alert || self.children_alerting()
    }

    pub fn children(&self, scope: Scope) -> &[SubArea] {
        match scope {
            Scope::District => &self.districts,
            Scope::Community => &self.community,
            Scope::Region => &[],
        }
    }

    pub fn child_mut(&mut self, scope: Scope, index: usize) -> Option<&mut SubArea> {
        match scope {
            Scope::District => self.districts.get_mut(index),
            Scope::Community => self.community.get_mut(index),
            Scope::Region => None,
        }
    }

    /// Drop nameless children and restore the alert invariant.
    ///
    /// Files written before `explicit_alert` existed carry only `alert`; a
    /// region alerting without any alerting child must have been raised
    /// explicitly.
    fn normalize(mut self) -> Self {
        self.districts.retain(|child| !child.name.trim().is_empty());
        self.community.retain(|child| !child.name.trim().is_empty());
        if self.alert && !self.children_alerting() {
            self.explicit_alert = true;
        }
        self.alert = self.derived_alert();
        self
    }
}

/// Ordered region store with an id lookup.
#[derive(Debug, Clone, Default)]
pub struct Hierarchy {
    regions: Vec<Region>,
    positions: HashMap<String, usize>,
}

impl Hierarchy {
    /// Build the store, rejecting empty or duplicate ids.
    pub fn new(regions: Vec<Region>) -> Result<Self> {
        let mut positions = HashMap::with_capacity(regions.len());
        let regions: Vec<Region> = regions.into_iter().map(Region::normalize).collect();

        for (position, region) in regions.iter().enumerate() {
            if region.id.trim().is_empty() {
                return Err(AppError::validation(format!(
                    "Region \"{}\" has an empty id",
                    region.name
                )));
            }
            if positions.insert(region.id.clone(), position).is_some() {
                return Err(AppError::validation(format!(
                    "Duplicate region id \"{}\"",
                    region.id
                )));
            }
        }

        Ok(Self { regions, positions })
    }

    pub fn regions(&self) -> &[Region] {
        &self.regions
    }

    pub fn region(&self, id: &str) -> Option<&Region> {
        self.positions.get(id).map(|&position| &self.regions[position])
    }

    pub fn region_mut(&mut self, id: &str) -> Option<&mut Region> {
        let position = *self.positions.get(id)?;
        self.regions.get_mut(position)
    }

    pub fn len(&self) -> usize {
        self.regions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }

    /// Number of regions currently alerting.
    pub fn alerting_count(&self) -> usize {
        self.regions.iter().filter(|region| region.alert).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tolerant_deserialization() {
        let regions: Vec<Region> = serde_json::from_str(
            r#"[{
                "id": "UA-32",
                "name": "Київська область",
                "districts": ["Бучанський район", {"name": "Обухівський район", "alert": true}],
                "community": [{"alert": true}]
            }]"#,
        )
        .unwrap();

        let hierarchy = Hierarchy::new(regions).unwrap();
        let region = hierarchy.region("UA-32").unwrap();
        assert_eq!(region.changed, NEVER_CHANGED);
        assert_eq!(region.districts.len(), 2);
        assert_eq!(region.districts[0].name, "Бучанський район");
        assert!(!region.districts[0].alert);
        assert_eq!(region.districts[1].changed, NEVER_CHANGED);
        // Nameless community entry is dropped.
        assert!(region.community.is_empty());
        // Alerting district lifts the region on load.
        assert!(region.alert);
        assert!(!region.explicit_alert);
    }

    #[test]
    fn test_legacy_alert_becomes_explicit() {
        let mut region = Region::new("UA-46", "Львівська область");
        region.alert = true;
        let hierarchy = Hierarchy::new(vec![region]).unwrap();

        let region = hierarchy.region("UA-46").unwrap();
        assert!(region.alert);
        assert!(region.explicit_alert);
    }

    #[test]
    fn test_duplicate_ids_rejected() {
        let result = Hierarchy::new(vec![Region::new("A", "One"), Region::new("A", "Two")]);
        assert!(matches!(result, Err(AppError::Validation(_))));

        let result = Hierarchy::new(vec![Region::new(" ", "Blank")]);
        assert!(result.is_err());
    }

    #[test]
    fn test_lookup_by_id_follows_order() {
        let hierarchy = Hierarchy::new(vec![
            Region::new("B", "Second"),
            Region::new("A", "First"),
        ])
        .unwrap();

        assert_eq!(hierarchy.regions()[0].id, "B");
        assert_eq!(hierarchy.region("A").unwrap().name, "First");
        assert!(hierarchy.region("C").is_none());
        assert_eq!(hierarchy.len(), 2);
    }

    #[test]
    fn test_name_en_skipped_when_absent() {
        let json = serde_json::to_string(&Region::new("A", "Одна")).unwrap();
        assert!(!json.contains("name_en"));
        assert!(json.contains("Одна"));
    }
}
