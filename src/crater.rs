//! Crater identities as they move through reconciliation.
//!
//! A `CraterEntry` starts as a bare catalog v1 identifier taken from a label
//! file and gains coordinates, a v2 identifier and a degradation state in
//! three separate resolution steps. Each step consumes the entry and returns
//! a new one; nothing is mutated in place.

use crate::tile::tile_name;

#[derive(Debug, Clone, PartialEq, Default)]
pub struct CraterEntry {
    /// Catalog v1 identifier, as found in the label corpus.
    pub v1_id: String,
    /// Catalog v2 identifier. Empty when no v2 crater matched.
    pub v2_id: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub degradation_state: Option<u32>,
}

impl CraterEntry {
    pub fn new(v1_id: impl Into<String>) -> Self {
        Self {
            v1_id: v1_id.into(),
            ..Default::default()
        }
    }

    pub fn with_coordinates(self, latitude: f64, longitude: f64) -> Self {
        Self {
            latitude: Some(latitude),
            longitude: Some(longitude),
            ..self
        }
    }

    pub fn with_v2_id(self, v2_id: impl Into<String>) -> Self {
        Self {
            v2_id: v2_id.into(),
            ..self
        }
    }

    pub fn with_degradation_state(self, degradation_state: Option<u32>) -> Self {
        Self {
            degradation_state,
            ..self
        }
    }

    /// `true` once a v2 crater has been matched.
    pub fn is_matched(&self) -> bool {
        !self.v2_id.is_empty()
    }

    /// The classified view of this entry, if it has coordinates and a degradation state.
    pub fn classified(&self) -> Option<ClassifiedCrater> {
        let (latitude, longitude) = (self.latitude?, self.longitude?);
        let degradation_state = self.degradation_state?;
        Some(ClassifiedCrater {
            v1_id: self.v1_id.clone(),
            v2_id: self.v2_id.clone(),
            latitude,
            longitude,
            degradation_state,
            tile: tile_name(latitude, longitude),
        })
    }
}

/// A crater with a known degradation state, placed on its image tile.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassifiedCrater {
    pub v1_id: String,
    pub v2_id: String,
    pub latitude: f64,
    pub longitude: f64,
    pub degradation_state: u32,
    /// Name of the 1°×1° tile containing the crater.
    pub tile: String,
}

impl ClassifiedCrater {
    /// Zero-indexed class label used by the detector (`degradation_state - 1`).
    pub fn class_id(&self) -> u32 {
        self.degradation_state.saturating_sub(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stages_build_a_new_value_each_time() {
        let bare = CraterEntry::new("A1");
        let located = bare.clone().with_coordinates(10.3, -5.7);
        assert_eq!(bare.latitude, None);
        assert_eq!(located.latitude, Some(10.3));

        let matched = located.with_v2_id("B9");
        assert!(matched.is_matched());
        assert_eq!(matched.classified(), None);

        let classified = matched.with_degradation_state(Some(3)).classified().unwrap();
        assert_eq!(classified.v2_id, "B9");
        assert_eq!(classified.tile, "11_-6");
        assert_eq!(classified.class_id(), 2);
    }
}
