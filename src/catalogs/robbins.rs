//! Readers for the two revisions of the Robbins Mars crater database.
//!
//! Revision 1 supplies the crater identifiers embedded in the tile labels.
//! Revision 2 renumbers every crater and adds the `DEGRADATION_STATE`
//! classification. The revisions share no key, only crater positions, so
//! coordinates are parsed as `f64` straight from the CSV text and never
//! rounded.
//!
//! Both files carry many more columns than are used here; required columns
//! are located by header name and everything else is ignored.

use std::io::Read;
use std::path::Path;

use super::{parse_degradation_state, CatalogLoadError};

pub const ID_COLUMN: &str = "CRATER_ID";
pub const LATITUDE_COLUMN: &str = "LATITUDE_CIRCLE_IMAGE";
pub const LONGITUDE_COLUMN: &str = "LONGITUDE_CIRCLE_IMAGE";
pub const DEGRADATION_COLUMN: &str = "DEGRADATION_STATE";

/// A crater from revision 1 of the catalog.
#[derive(Debug, Clone, PartialEq)]
pub struct CatalogRecordV1 {
    pub id: String,
    /// Planetocentric latitude in degrees.
    pub latitude: f64,
    /// Longitude in degrees.
    pub longitude: f64,
}

/// A crater from revision 2 of the catalog.
#[derive(Debug, Clone, PartialEq)]
pub struct CatalogRecordV2 {
    pub id: String,
    pub latitude: f64,
    pub longitude: f64,
    /// Erosion/age class, `1..=N`. Many records are unclassified.
    pub degradation_state: Option<u32>,
}

pub fn read_v1_csv<P: AsRef<Path>>(
    path: P,
) -> Result<Vec<CatalogRecordV1>, CatalogLoadError> {
    let path = path.as_ref();
    let origin = path.display().to_string();
    let rdr = open(path, &origin)?;
    read_v1(rdr, &origin)
}

pub fn read_v2_csv<P: AsRef<Path>>(
    path: P,
) -> Result<Vec<CatalogRecordV2>, CatalogLoadError> {
    let path = path.as_ref();
    let origin = path.display().to_string();
    let rdr = open(path, &origin)?;
    read_v2(rdr, &origin)
}

/// Read revision 1 records from any CSV source. `origin` names the source in errors.
pub fn read_v1<R: Read>(
    mut rdr: csv::Reader<R>,
    origin: &str,
) -> Result<Vec<CatalogRecordV1>, CatalogLoadError> {
    let columns = Columns::locate(&mut rdr, origin, false)?;
    rdr.records()
        .map(|result| {
            let record = result.map_err(|source| read_error(origin, source))?;
            Ok(CatalogRecordV1 {
                id: field(&record, columns.id).to_string(),
                latitude: coordinate(&record, columns.latitude, LATITUDE_COLUMN, origin)?,
                longitude: coordinate(&record, columns.longitude, LONGITUDE_COLUMN, origin)?,
            })
        })
        .collect()
}

/// Read revision 2 records from any CSV source. `origin` names the source in errors.
pub fn read_v2<R: Read>(
    mut rdr: csv::Reader<R>,
    origin: &str,
) -> Result<Vec<CatalogRecordV2>, CatalogLoadError> {
    let columns = Columns::locate(&mut rdr, origin, true)?;
    let degradation = columns.degradation.unwrap_or_default();
    rdr.records()
        .map(|result| {
            let record = result.map_err(|source| read_error(origin, source))?;
            let raw_state = field(&record, degradation);
            let degradation_state =
                parse_degradation_state(raw_state).ok_or_else(|| CatalogLoadError::InvalidValue {
                    origin: origin.to_string(),
                    line: line_of(&record),
                    column: DEGRADATION_COLUMN,
                    value: raw_state.to_string(),
                })?;
            Ok(CatalogRecordV2 {
                id: field(&record, columns.id).to_string(),
                latitude: coordinate(&record, columns.latitude, LATITUDE_COLUMN, origin)?,
                longitude: coordinate(&record, columns.longitude, LONGITUDE_COLUMN, origin)?,
                degradation_state,
            })
        })
        .collect()
}

fn open(path: &Path, origin: &str) -> Result<csv::Reader<std::fs::File>, CatalogLoadError> {
    csv::ReaderBuilder::new()
        .flexible(true)
        .from_path(path)
        .map_err(|source| read_error(origin, source))
}

struct Columns {
    id: usize,
    latitude: usize,
    longitude: usize,
    degradation: Option<usize>,
}

impl Columns {
    fn locate<R: Read>(
        rdr: &mut csv::Reader<R>,
        origin: &str,
        with_degradation: bool,
    ) -> Result<Self, CatalogLoadError> {
        let headers = rdr
            .headers()
            .map_err(|source| read_error(origin, source))?
            .clone();
        let find = |column: &'static str| {
            headers
                .iter()
                .position(|h| h.trim() == column)
                .ok_or_else(|| CatalogLoadError::MissingColumn {
                    origin: origin.to_string(),
                    column,
                })
        };
        Ok(Self {
            id: find(ID_COLUMN)?,
            latitude: find(LATITUDE_COLUMN)?,
            longitude: find(LONGITUDE_COLUMN)?,
            degradation: if with_degradation {
                Some(find(DEGRADATION_COLUMN)?)
            } else {
                None
            },
        })
    }
}

fn field(record: &csv::StringRecord, idx: usize) -> &str {
    record.get(idx).unwrap_or("").trim()
}

fn coordinate(
    record: &csv::StringRecord,
    idx: usize,
    column: &'static str,
    origin: &str,
) -> Result<f64, CatalogLoadError> {
    let raw = field(record, idx);
    match raw.parse::<f64>() {
        Ok(v) if v.is_finite() => Ok(v),
        _ => Err(CatalogLoadError::InvalidValue {
            origin: origin.to_string(),
            line: line_of(record),
            column,
            value: raw.to_string(),
        }),
    }
}

fn line_of(record: &csv::StringRecord) -> u64 {
    record.position().map(|p| p.line()).unwrap_or(0)
}

fn read_error(origin: &str, source: csv::Error) -> CatalogLoadError {
    CatalogLoadError::Read {
        origin: origin.to_string(),
        source,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reader(data: &str) -> csv::Reader<&[u8]> {
        csv::ReaderBuilder::new()
            .flexible(true)
            .from_reader(data.as_bytes())
    }

    #[test]
    fn reads_v1_ignoring_extra_columns() {
        let data = "\
CRATER_ID,DIAM_CIRCLE_IMAGE,LATITUDE_CIRCLE_IMAGE,LONGITUDE_CIRCLE_IMAGE
01-000000,82.10,84.367,108.746
01-000001, 5.2 ,-10.3,-5.7
";
        let records = read_v1(reader(data), "v1").unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].id, "01-000000");
        assert_eq!(records[1].latitude, -10.3);
        assert_eq!(records[1].longitude, -5.7);
    }

    #[test]
    fn reads_v2_with_missing_states() {
        let data = "\
CRATER_ID,LATITUDE_CIRCLE_IMAGE,LONGITUDE_CIRCLE_IMAGE,DEGRADATION_STATE
B9,10.3,-5.7,3
C1,11.0,-4.0,
C2,12.0,-4.0,2.0
";
        let records = read_v2(reader(data), "v2").unwrap();
        assert_eq!(records[0].degradation_state, Some(3));
        assert_eq!(records[1].degradation_state, None);
        assert_eq!(records[2].degradation_state, Some(2));
    }

    #[test]
    fn missing_column_is_reported() {
        let data = "CRATER_ID,LATITUDE_CIRCLE_IMAGE,LONGITUDE_CIRCLE_IMAGE\nB9,1,2\n";
        match read_v2(reader(data), "v2") {
            Err(CatalogLoadError::MissingColumn { column, .. }) => {
                assert_eq!(column, DEGRADATION_COLUMN)
            }
            other => panic!("expected missing column, got {:?}", other),
        }
    }

    #[test]
    fn bad_coordinate_is_reported() {
        let data = "CRATER_ID,LATITUDE_CIRCLE_IMAGE,LONGITUDE_CIRCLE_IMAGE\nA1,north,2\n";
        match read_v1(reader(data), "v1") {
            Err(CatalogLoadError::InvalidValue { column, line, .. }) => {
                assert_eq!(column, LATITUDE_COLUMN);
                assert_eq!(line, 2);
            }
            other => panic!("expected invalid value, got {:?}", other),
        }
    }

    #[test]
    fn missing_file_is_an_error() {
        assert!(matches!(
            read_v1_csv("does/not/exist.csv"),
            Err(CatalogLoadError::Read { .. })
        ));
    }
}
