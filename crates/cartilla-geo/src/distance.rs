//! Great-circle distance.
//!
//! The single Haversine implementation for the whole workspace; every call
//! site that needs a distance goes through here.

/// Mean Earth radius in kilometers.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Haversine distance in kilometers between two lat/lon points in degrees.
///
/// Pure and total over the valid coordinate ranges; identical points yield
/// exactly 0.
#[must_use]
pub fn haversine_km(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let dlat = (lat2 - lat1).to_radians();
    let dlon = (lon2 - lon1).to_radians();

    let a = (dlat / 2.0).sin().powi(2)
        + lat1.to_radians().cos() * lat2.to_radians().cos() * (dlon / 2.0).sin().powi(2);

    let c = 2.0 * a.sqrt().asin();
    EARTH_RADIUS_KM * c
}

/// Canonical presentation rounding for distances in entity lists.
#[must_use]
pub fn round1(km: f64) -> f64 {
    (km * 10.0).round() / 10.0
}

/// Two-decimal rounding, used only in diagnostic output.
#[must_use]
pub fn round2(km: f64) -> f64 {
    (km * 100.0).round() / 100.0
}

/// Euclidean distance on raw lat/lon degrees.
///
/// Used only for sub-cluster reference-point assignment, where anchors sit
/// close together and the map consumer needs roughly even groupings rather
/// than geodesic accuracy. Kept planar on purpose; switching this to
/// Haversine would move entities near bucket boundaries.
pub(crate) fn planar_degrees(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    ((lat1 - lat2).powi(2) + (lon1 - lon2).powi(2)).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_points_are_zero() {
        assert!(haversine_km(-34.6037, -58.3816, -34.6037, -58.3816).abs() < f64::EPSILON);
    }

    #[test]
    fn distance_is_symmetric() {
        let ab = haversine_km(-34.6037, -58.3816, -28.4696, -65.7852);
        let ba = haversine_km(-28.4696, -65.7852, -34.6037, -58.3816);
        assert!((ab - ba).abs() < 1e-9);
    }

    #[test]
    fn caba_to_catamarca_is_about_950km() {
        // Obelisco to San Fernando del Valle de Catamarca.
        let d = haversine_km(-34.6037, -58.3816, -28.4696, -65.7852);
        assert!((900.0..1000.0).contains(&d), "got {d}");
    }

    #[test]
    fn caba_to_la_plata_is_about_53km() {
        let d = haversine_km(-34.6037, -58.3816, -34.9215, -57.9545);
        assert!((50.0..56.0).contains(&d), "got {d}");
    }

    #[test]
    fn rounding_helpers() {
        assert!((round1(12.3456) - 12.3).abs() < 1e-9);
        assert!((round2(12.3456) - 12.35).abs() < 1e-9);
        assert!((round1(0.04) - 0.0).abs() < 1e-9);
    }

    #[test]
    fn planar_is_pythagorean_on_degrees() {
        assert!((planar_degrees(0.0, 0.0, 3.0, 4.0) - 5.0).abs() < 1e-9);
    }
}
