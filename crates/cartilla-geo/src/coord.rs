//! Coordinate parsing and validation.
//!
//! The store serves coordinates as numbers, comma-decimal strings
//! (`"-28,4696"`), nulls, or literal zeros. Zero doubles as the upstream
//! missing-data sentinel, so an exact 0 parses as absent. No point in
//! Argentina sits on the equator or prime meridian, but reusing these
//! tables elsewhere would need the sentinel revisited.

use cartilla_core::RawCoord;
use serde::Serialize;

/// Where a coordinate's values came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CoordSource {
    /// Served by the store as numeric geodata.
    Gps,
    /// Overridden by the capital-corrections table.
    Corrected,
    /// Recovered from a string field or computed from other coordinates.
    Raw,
}

/// A validated coordinate pair.
///
/// Invariants: latitude ∈ [-90, 90], longitude ∈ [-180, 180], both finite
/// and non-zero. Construction goes through [`Coordinate::new`] or
/// [`Coordinate::from_raw`]; a value that fails to parse is represented as
/// the absence of a `Coordinate`, never as a silent (0, 0).
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
    pub source: CoordSource,
}

impl Coordinate {
    /// Validate a numeric pair into a `Coordinate`.
    #[must_use]
    pub fn new(latitude: f64, longitude: f64, source: CoordSource) -> Option<Self> {
        if !latitude.is_finite() || !longitude.is_finite() {
            return None;
        }
        if latitude == 0.0 || longitude == 0.0 {
            return None;
        }
        if !(-90.0..=90.0).contains(&latitude) || !(-180.0..=180.0).contains(&longitude) {
            return None;
        }
        Some(Self {
            latitude,
            longitude,
            source,
        })
    }

    /// Parse a pair of raw store values into a validated coordinate.
    ///
    /// The source is [`CoordSource::Gps`] when both axes arrived numeric,
    /// [`CoordSource::Raw`] when either had to be recovered from a string.
    #[must_use]
    pub fn from_raw(lat: Option<&RawCoord>, lon: Option<&RawCoord>) -> Option<Self> {
        let latitude = parse_axis(lat)?;
        let longitude = parse_axis(lon)?;
        let source = match (lat, lon) {
            (Some(RawCoord::Num(_)), Some(RawCoord::Num(_))) => CoordSource::Gps,
            _ => CoordSource::Raw,
        };
        Self::new(latitude, longitude, source)
    }
}

/// Parse a single raw axis value.
///
/// Numbers pass through. Strings get their first comma replaced with a
/// period (locale decimal convention) and are parsed as `f64`. Nulls,
/// unparseable strings, non-finite values, and exact zeros are all absent.
/// Never panics.
#[must_use]
pub fn parse_axis(raw: Option<&RawCoord>) -> Option<f64> {
    let value = match raw? {
        RawCoord::Num(n) => *n,
        RawCoord::Text(s) => s.trim().replacen(',', ".", 1).parse::<f64>().ok()?,
    };
    if !value.is_finite() || value == 0.0 {
        return None;
    }
    Some(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn num(v: f64) -> Option<RawCoord> {
        Some(RawCoord::Num(v))
    }

    fn text(s: &str) -> Option<RawCoord> {
        Some(RawCoord::Text(s.to_string()))
    }

    #[test]
    fn parse_axis_passes_numbers_through() {
        assert_eq!(parse_axis(num(-28.4696).as_ref()), Some(-28.4696));
    }

    #[test]
    fn parse_axis_comma_decimal_equals_period_decimal() {
        let comma = parse_axis(text("-28,4696").as_ref());
        let period = parse_axis(text("-28.4696").as_ref());
        assert_eq!(comma, Some(-28.4696));
        assert_eq!(comma, period);
    }

    #[test]
    fn parse_axis_trims_whitespace() {
        assert_eq!(parse_axis(text("  -65,7852 ").as_ref()), Some(-65.7852));
    }

    #[test]
    fn parse_axis_rejects_null_and_garbage() {
        assert_eq!(parse_axis(None), None);
        assert_eq!(parse_axis(text("").as_ref()), None);
        assert_eq!(parse_axis(text("s/d").as_ref()), None);
    }

    #[test]
    fn parse_axis_treats_zero_as_missing() {
        assert_eq!(parse_axis(num(0.0).as_ref()), None);
        assert_eq!(parse_axis(text("0").as_ref()), None);
        assert_eq!(parse_axis(text("0,0").as_ref()), None);
    }

    #[test]
    fn parse_axis_rejects_non_finite() {
        assert_eq!(parse_axis(num(f64::NAN).as_ref()), None);
        assert_eq!(parse_axis(num(f64::INFINITY).as_ref()), None);
    }

    #[test]
    fn parse_axis_is_idempotent_for_valid_values() {
        let parsed = parse_axis(text("-58,3816").as_ref()).expect("parses");
        assert_eq!(parse_axis(num(parsed).as_ref()), Some(parsed));
    }

    #[test]
    fn parse_axis_replaces_only_the_first_comma() {
        // A second comma makes the string unparseable, not silently truncated.
        assert_eq!(parse_axis(text("-28,46,96").as_ref()), None);
    }

    #[test]
    fn from_raw_requires_both_axes() {
        assert!(Coordinate::from_raw(num(-28.4696).as_ref(), None).is_none());
        assert!(Coordinate::from_raw(None, num(-65.7852).as_ref()).is_none());
    }

    #[test]
    fn from_raw_tags_numeric_pairs_as_gps() {
        let c = Coordinate::from_raw(num(-28.4696).as_ref(), num(-65.7852).as_ref()).unwrap();
        assert_eq!(c.source, CoordSource::Gps);
    }

    #[test]
    fn from_raw_tags_string_pairs_as_raw() {
        let c = Coordinate::from_raw(text("-28,4696").as_ref(), num(-65.7852).as_ref()).unwrap();
        assert_eq!(c.source, CoordSource::Raw);
        assert!((c.latitude - (-28.4696)).abs() < 1e-9);
    }

    #[test]
    fn new_enforces_range_invariants() {
        assert!(Coordinate::new(-91.0, -65.0, CoordSource::Gps).is_none());
        assert!(Coordinate::new(-28.0, -181.0, CoordSource::Gps).is_none());
        assert!(Coordinate::new(-28.0, -65.0, CoordSource::Gps).is_some());
    }

    #[test]
    fn new_rejects_the_zero_sentinel() {
        assert!(Coordinate::new(0.0, -65.0, CoordSource::Gps).is_none());
        assert!(Coordinate::new(-28.0, 0.0, CoordSource::Gps).is_none());
    }
}
