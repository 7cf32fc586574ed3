//! Raw crater catalogs; currently the two Robbins database revisions

pub mod robbins;

use thiserror::Error;

/// Failure to load a catalog table. Always fatal for a run.
#[derive(Debug, Error)]
pub enum CatalogLoadError {
    #[error("cannot read catalog {origin}: {source}")]
    Read {
        origin: String,
        #[source]
        source: csv::Error,
    },

    #[error("catalog {origin} is missing required column {column}")]
    MissingColumn { origin: String, column: &'static str },

    #[error("catalog {origin} line {line}: invalid {column} value {value:?}")]
    InvalidValue {
        origin: String,
        line: u64,
        column: &'static str,
        value: String,
    },
}

/// Parse a degradation-state cell.
///
/// Empty and `NaN` cells mean "no classification". Integral float spellings
/// such as `3.0` are accepted, as written by exporters that store integer
/// columns with gaps as floats. Returns `None` for anything else, including
/// states below 1.
pub(crate) fn parse_degradation_state(raw: &str) -> Option<Option<u32>> {
    let raw = raw.trim();
    if raw.is_empty() || raw.eq_ignore_ascii_case("nan") {
        return Some(None);
    }
    let state = match raw.parse::<u32>() {
        Ok(v) => v,
        Err(_) => {
            let v: f64 = raw.parse().ok()?;
            if v.fract() != 0.0 || v < 0.0 || v > u32::MAX as f64 {
                return None;
            }
            v as u32
        }
    };
    (state >= 1).then_some(Some(state))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn degradation_state_spellings() {
        assert_eq!(parse_degradation_state(""), Some(None));
        assert_eq!(parse_degradation_state(" NaN "), Some(None));
        assert_eq!(parse_degradation_state("3"), Some(Some(3)));
        assert_eq!(parse_degradation_state("4.0"), Some(Some(4)));
        assert_eq!(parse_degradation_state("2.5"), None);
        assert_eq!(parse_degradation_state("0"), None);
        assert_eq!(parse_degradation_state("fresh"), None);
    }
}
