//! Naming of the 1°×1° image tiles cut from the global mosaic.
//!
//! A tile is named `"{lat}_{lon}"` after its top-left (north-west) corner.
//! The rule must match the tile generator exactly, since tile names are the
//! only link between craters and image/label files.

/// Name of the tile containing a crater at `(latitude, longitude)` degrees.
///
/// Both components are truncated toward zero. A positive latitude moves one
/// tile up to the northern edge; a negative longitude moves one tile left to
/// the western edge.
///
/// ```
/// use cratersort::tile_name;
///
/// assert_eq!(tile_name(12.5, -47.2), "13_-48");
/// assert_eq!(tile_name(-3.1, 10.9), "-3_10");
/// ```
pub fn tile_name(latitude: f64, longitude: f64) -> String {
    let mut lat = latitude.trunc() as i64;
    let mut lon = longitude.trunc() as i64;
    if latitude > 0.0 {
        lat += 1;
    }
    if longitude < 0.0 {
        lon -= 1;
    }
    format!("{}_{}", lat, lon)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_follow_tile_generator() {
        assert_eq!(tile_name(12.5, -47.2), "13_-48");
        assert_eq!(tile_name(-3.1, 10.9), "-3_10");
        assert_eq!(tile_name(10.3, -5.7), "11_-6");
    }

    #[test]
    fn zero_is_neither_north_nor_west() {
        assert_eq!(tile_name(0.0, 0.0), "0_0");
        assert_eq!(tile_name(-0.0, -0.0), "0_0");
    }

    #[test]
    fn integral_coordinates_and_small_magnitudes() {
        assert_eq!(tile_name(5.0, -5.0), "6_-6");
        assert_eq!(tile_name(0.2, -0.2), "1_-1");
        assert_eq!(tile_name(-0.2, 0.2), "0_0");
        assert_eq!(tile_name(-89.9, 179.9), "-89_179");
    }
}
