//! In-memory indices over the two crater catalog revisions.
//!
//! `V1Index` answers "where is crater `id`?". `V2Index` answers the reverse
//! question for the second revision: "which crater sits at this coordinate?",
//! either by exact coordinate equality or, optionally, by nearest record
//! within a tolerance.
//!
//! For the tolerance query, records are binned on a regular latitude/longitude
//! grid of `CELL_DEG` cells. Each cell maps to a compact slice of record
//! indices, so a query only scans the cells overlapping its search box.
//!
//! Duplicate keys resolve to the first record in catalog row order.

use std::collections::HashMap;
use std::path::Path;

use tracing::info;

use crate::catalogs::robbins::{read_v1_csv, read_v2_csv, CatalogRecordV1, CatalogRecordV2};
use crate::catalogs::CatalogLoadError;

/// Edge length of a spatial bin in degrees.
pub const CELL_DEG: f64 = 1.0;

/// Load both catalog revisions and build their indices.
pub fn load_catalogs<P: AsRef<Path>, Q: AsRef<Path>>(
    path_v1: P,
    path_v2: Q,
) -> Result<(V1Index, V2Index), CatalogLoadError> {
    let v1 = V1Index::new(read_v1_csv(&path_v1)?);
    info!(
        "Loaded {} catalog v1 craters from {}",
        v1.len(),
        path_v1.as_ref().display()
    );
    let v2 = V2Index::new(read_v2_csv(&path_v2)?);
    info!(
        "Loaded {} catalog v2 craters from {}",
        v2.len(),
        path_v2.as_ref().display()
    );
    Ok((v1, v2))
}

/// Exact-equality key for a coordinate pair.
///
/// `-0.0` and `0.0` are folded together so that the key agrees with `==`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct CoordinateKey(u64, u64);

impl CoordinateKey {
    fn new(latitude: f64, longitude: f64) -> Self {
        Self((latitude + 0.0).to_bits(), (longitude + 0.0).to_bits())
    }
}

#[derive(Debug, Clone)]
pub struct V1Index {
    records: Vec<CatalogRecordV1>,
    by_id: HashMap<String, usize>,
}

impl V1Index {
    pub fn new(records: Vec<CatalogRecordV1>) -> Self {
        let mut by_id = HashMap::with_capacity(records.len());
        for (idx, record) in records.iter().enumerate() {
            by_id.entry(record.id.clone()).or_insert(idx);
        }
        Self { records, by_id }
    }

    pub fn get(&self, id: &str) -> Option<&CatalogRecordV1> {
        self.by_id.get(id).map(|&idx| &self.records[idx])
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[CatalogRecordV1] {
        &self.records
    }
}

#[derive(Debug, Clone)]
pub struct V2Index {
    records: Vec<CatalogRecordV2>,
    by_id: HashMap<String, usize>,
    by_coordinate: HashMap<CoordinateKey, usize>,
    n_lat: u32,
    n_lon: u32,
    cell_offsets: Vec<u32>,
    record_indices: Vec<u32>,
}

impl V2Index {
    /// Build all lookups over owned records, keeping catalog order.
    pub fn new(records: Vec<CatalogRecordV2>) -> Self {
        let n_lat = (180.0 / CELL_DEG).ceil() as u32;
        let n_lon = (360.0 / CELL_DEG).ceil() as u32;
        let n_cells = (n_lat * n_lon) as usize;

        let mut by_id = HashMap::with_capacity(records.len());
        let mut by_coordinate = HashMap::with_capacity(records.len());
        let mut bins: Vec<Vec<u32>> = vec![Vec::new(); n_cells];
        for (idx, record) in records.iter().enumerate() {
            by_id.entry(record.id.clone()).or_insert(idx);
            by_coordinate
                .entry(CoordinateKey::new(record.latitude, record.longitude))
                .or_insert(idx);
            let (lat_bin, lon_bin) = cell_of(n_lat, n_lon, record.latitude, record.longitude);
            bins[(lat_bin * n_lon + lon_bin) as usize].push(idx as u32);
        }

        let mut cell_offsets = Vec::with_capacity(n_cells + 1);
        let mut record_indices = Vec::with_capacity(records.len());
        cell_offsets.push(0);
        for bin in bins {
            record_indices.extend(bin);
            cell_offsets.push(record_indices.len() as u32);
        }

        Self {
            records,
            by_id,
            by_coordinate,
            n_lat,
            n_lon,
            cell_offsets,
            record_indices,
        }
    }

    pub fn get(&self, id: &str) -> Option<&CatalogRecordV2> {
        self.by_id.get(id).map(|&idx| &self.records[idx])
    }

    /// First record (catalog order) whose coordinates equal `(latitude, longitude)` exactly.
    pub fn find_exact(&self, latitude: f64, longitude: f64) -> Option<&CatalogRecordV2> {
        self.by_coordinate
            .get(&CoordinateKey::new(latitude, longitude))
            .map(|&idx| &self.records[idx])
    }

    /// Nearest record within `max_deg` of `(latitude, longitude)`.
    ///
    /// Distance is Euclidean in degrees, with the longitude difference
    /// wrapped to `[-180, 180]`. Equal distances resolve to the earlier record.
    pub fn find_nearest(
        &self,
        latitude: f64,
        longitude: f64,
        max_deg: f64,
    ) -> Option<&CatalogRecordV2> {
        if self.records.is_empty() || !(max_deg >= 0.0) {
            return None;
        }
        let reach = ((max_deg / CELL_DEG).ceil() as i64).min(self.n_lon as i64);
        let (lat_bin, lon_bin) = cell_of(self.n_lat, self.n_lon, latitude, longitude);

        let lon_bins: Vec<u32> = if 2 * reach + 1 >= self.n_lon as i64 {
            (0..self.n_lon).collect()
        } else {
            (-reach..=reach)
                .map(|d| (lon_bin as i64 + d).rem_euclid(self.n_lon as i64) as u32)
                .collect()
        };

        let mut best: Option<(f64, usize)> = None;
        for d_lat in -reach..=reach {
            let lb = lat_bin as i64 + d_lat;
            if lb < 0 || lb >= self.n_lat as i64 {
                continue;
            }
            for &lon_b in &lon_bins {
                let cell = (lb as u32 * self.n_lon + lon_b) as usize;
                let start = self.cell_offsets[cell] as usize;
                let end = self.cell_offsets[cell + 1] as usize;
                for &idx in &self.record_indices[start..end] {
                    let idx = idx as usize;
                    let record = &self.records[idx];
                    let dist = coordinate_distance(
                        latitude,
                        longitude,
                        record.latitude,
                        record.longitude,
                    );
                    if dist > max_deg {
                        continue;
                    }
                    let better = match best {
                        None => true,
                        Some((best_dist, best_idx)) => {
                            dist < best_dist || (dist == best_dist && idx < best_idx)
                        }
                    };
                    if better {
                        best = Some((dist, idx));
                    }
                }
            }
        }
        best.map(|(_, idx)| &self.records[idx])
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[CatalogRecordV2] {
        &self.records
    }
}

fn cell_of(n_lat: u32, n_lon: u32, latitude: f64, longitude: f64) -> (u32, u32) {
    let lat_bin = (((latitude + 90.0) / CELL_DEG).floor().max(0.0) as u32).min(n_lat - 1);
    let lon_bin = ((longitude.rem_euclid(360.0) / CELL_DEG).floor() as u32).min(n_lon - 1);
    (lat_bin, lon_bin)
}

fn coordinate_distance(lat_a: f64, lon_a: f64, lat_b: f64, lon_b: f64) -> f64 {
    let d_lat = lat_a - lat_b;
    let mut d_lon = (lon_a - lon_b).rem_euclid(360.0);
    if d_lon > 180.0 {
        d_lon -= 360.0;
    }
    d_lat.hypot(d_lon)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v2(id: &str, latitude: f64, longitude: f64, state: Option<u32>) -> CatalogRecordV2 {
        CatalogRecordV2 {
            id: id.to_string(),
            latitude,
            longitude,
            degradation_state: state,
        }
    }

    #[test]
    fn exact_lookup_takes_first_in_catalog_order() {
        let index = V2Index::new(vec![
            v2("B1", 10.3, -5.7, Some(1)),
            v2("B2", 10.3, -5.7, Some(2)),
            v2("B3", 10.3, -5.8, None),
        ]);
        assert_eq!(index.find_exact(10.3, -5.7).unwrap().id, "B1");
        assert_eq!(index.find_exact(10.3, -5.8).unwrap().id, "B3");
        assert!(index.find_exact(10.3, -5.70001).is_none());
    }

    #[test]
    fn exact_lookup_folds_negative_zero() {
        let index = V2Index::new(vec![v2("Z", -0.0, 0.0, None)]);
        assert_eq!(index.find_exact(0.0, -0.0).unwrap().id, "Z");
    }

    #[test]
    fn id_lookup_takes_first_in_catalog_order() {
        let index = V2Index::new(vec![v2("B1", 1.0, 1.0, Some(4)), v2("B1", 2.0, 2.0, None)]);
        assert_eq!(index.get("B1").unwrap().degradation_state, Some(4));
        assert!(index.get("B2").is_none());

        let v1 = V1Index::new(vec![CatalogRecordV1 {
            id: "A1".to_string(),
            latitude: 10.3,
            longitude: -5.7,
        }]);
        assert_eq!(v1.get("A1").unwrap().longitude, -5.7);
        assert!(v1.get("A2").is_none());
    }

    #[test]
    fn nearest_prefers_closer_record() {
        let index = V2Index::new(vec![
            v2("far", 10.0005, 20.0, None),
            v2("near", 10.0001, 20.0, None),
            v2("out", 10.5, 20.0, None),
        ]);
        assert_eq!(index.find_nearest(10.0, 20.0, 0.001).unwrap().id, "near");
        assert!(index.find_nearest(10.2, 20.0, 0.001).is_none());
    }

    #[test]
    fn nearest_crosses_cell_and_antimeridian_boundaries() {
        let index = V2Index::new(vec![
            v2("east", 5.0, 179.9999, None),
            v2("north", 6.00005, 40.0, None),
        ]);
        assert_eq!(index.find_nearest(5.0, -180.0, 0.001).unwrap().id, "east");
        assert_eq!(index.find_nearest(5.99999, 40.0, 0.001).unwrap().id, "north");
    }

    #[test]
    fn nearest_with_zero_tolerance_is_exact() {
        let index = V2Index::new(vec![v2("B9", 10.3, -5.7, Some(3))]);
        assert_eq!(index.find_nearest(10.3, -5.7, 0.0).unwrap().id, "B9");
        assert!(index.find_nearest(10.3, -5.7000001, 0.0).is_none());
    }
}
