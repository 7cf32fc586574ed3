//! Identity resolution between the two catalog revisions.
//!
//! The revisions use incompatible identifier schemes, so a v1 crater is
//! carried over to v2 through its position:
//!
//! 1. v1 id → `(latitude, longitude)` from catalog v1
//! 2. `(latitude, longitude)` → v2 id from catalog v2
//! 3. v2 id → degradation state from catalog v2
//!
//! Step 1 failing means the label corpus and catalog v1 disagree, which is a
//! hard error. Step 2 failing is routine (v2 covers a different crater set)
//! and is reported as a miss. Step 3 failing just leaves the crater
//! unclassified.

use thiserror::Error;

use crate::cratercatalog::{V1Index, V2Index};
use crate::crater::CraterEntry;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ResolveError {
    #[error("crater {0} is not in catalog v1")]
    UnknownV1Id(String),

    #[error("no catalog v2 crater at ({latitude}, {longitude})")]
    NotFound { latitude: f64, longitude: f64 },
}

/// How catalog v1 coordinates are matched against catalog v2.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum CoordinateMatch {
    /// Bit-exact equality of both coordinates.
    #[default]
    Exact,
    /// Nearest v2 crater no further than `max_deg` degrees.
    Tolerance { max_deg: f64 },
}

/// Outcome of resolving one entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolveStatus {
    /// Matched in v2 and has a degradation state.
    Classified,
    /// Matched in v2 but v2 carries no degradation state.
    Unclassified,
    /// No v2 crater at the v1 position.
    Missed,
}

pub struct IdentityResolver<'a> {
    v1: &'a V1Index,
    v2: &'a V2Index,
    policy: CoordinateMatch,
}

impl<'a> IdentityResolver<'a> {
    pub fn new(v1: &'a V1Index, v2: &'a V2Index) -> Self {
        Self::with_policy(v1, v2, CoordinateMatch::Exact)
    }

    pub fn with_policy(v1: &'a V1Index, v2: &'a V2Index, policy: CoordinateMatch) -> Self {
        Self { v1, v2, policy }
    }

    pub fn policy(&self) -> CoordinateMatch {
        self.policy
    }

    pub fn resolve_coordinates(&self, v1_id: &str) -> Result<(f64, f64), ResolveError> {
        self.v1
            .get(v1_id)
            .map(|r| (r.latitude, r.longitude))
            .ok_or_else(|| ResolveError::UnknownV1Id(v1_id.to_string()))
    }

    pub fn resolve_v2(&self, latitude: f64, longitude: f64) -> Result<&'a str, ResolveError> {
        let hit = match self.policy {
            CoordinateMatch::Exact => self.v2.find_exact(latitude, longitude),
            CoordinateMatch::Tolerance { max_deg } => {
                self.v2.find_nearest(latitude, longitude, max_deg)
            }
        };
        hit.map(|r| r.id.as_str())
            .ok_or(ResolveError::NotFound {
                latitude,
                longitude,
            })
    }

    pub fn resolve_degradation_state(&self, v2_id: &str) -> Option<u32> {
        self.v2.get(v2_id).and_then(|r| r.degradation_state)
    }

    /// Run all three steps on an entry.
    ///
    /// Only an unknown v1 id is an error; a v2 miss returns the entry with
    /// coordinates set and the remaining fields unset.
    pub fn resolve(&self, entry: CraterEntry) -> Result<(CraterEntry, ResolveStatus), ResolveError> {
        let (latitude, longitude) = self.resolve_coordinates(&entry.v1_id)?;
        let entry = entry.with_coordinates(latitude, longitude);

        let v2_id = match self.resolve_v2(latitude, longitude) {
            Ok(id) => id,
            Err(ResolveError::NotFound { .. }) => return Ok((entry, ResolveStatus::Missed)),
            Err(e) => return Err(e),
        };

        let state = self.resolve_degradation_state(v2_id);
        let entry = entry.with_v2_id(v2_id).with_degradation_state(state);
        let status = if state.is_some() {
            ResolveStatus::Classified
        } else {
            ResolveStatus::Unclassified
        };
        Ok((entry, status))
    }
}
