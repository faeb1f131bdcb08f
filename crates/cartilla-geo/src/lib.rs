//! Geographic core for the cartilla directory: coordinate normalization,
//! great-circle distance, radius filtering, and province/sub-region
//! clustering.
//!
//! Everything here is pure and synchronous. The store has no geospatial
//! query capability, so all filtering and aggregation happens in memory
//! after a fetch; at the directory's volume (~20k rows) a linear scan is
//! the intended design. A spatial grid would be the natural upgrade if the
//! dataset ever grows an order of magnitude.

pub mod cluster;
pub mod coord;
pub mod distance;
pub mod proximity;
pub mod resolve;

pub use cluster::{
    aggregate_by_region, aggregate_by_subregion, reference_points_for, validate_region_span,
    GeoCluster, SpanWarning, DEFAULT_DRILLDOWN_THRESHOLD, DEFAULT_SUBCLUSTER_CAP,
};
pub use coord::{CoordSource, Coordinate};
pub use distance::{haversine_km, round1, round2, EARTH_RADIUS_KM};
pub use proximity::{
    count_within_radius, filter_by_radius, filter_with_fallback, ProximityResult, RadiusSearch,
    SearchKind, DEFAULT_FALLBACK_LIMIT,
};
pub use resolve::{rank_candidates, score_candidate, ResolvedLocation, SearchCandidate};

use cartilla_core::{Localidad, Prestador, RawCoord};

/// Minimal read surface the geographic core needs from a directory row.
pub trait GeoEntity {
    /// Display name.
    fn name(&self) -> &str;
    /// Latitude exactly as the store served it.
    fn raw_latitude(&self) -> Option<&RawCoord>;
    /// Longitude exactly as the store served it.
    fn raw_longitude(&self) -> Option<&RawCoord>;
    /// Free-text administrative region (province) label.
    fn region(&self) -> Option<&str>;

    /// Parsed, validated coordinate, or `None` when the row has no usable
    /// geodata.
    fn coordinate(&self) -> Option<Coordinate> {
        Coordinate::from_raw(self.raw_latitude(), self.raw_longitude())
    }
}

impl<T: GeoEntity + ?Sized> GeoEntity for &T {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn raw_latitude(&self) -> Option<&RawCoord> {
        (**self).raw_latitude()
    }

    fn raw_longitude(&self) -> Option<&RawCoord> {
        (**self).raw_longitude()
    }

    fn region(&self) -> Option<&str> {
        (**self).region()
    }
}

impl GeoEntity for Prestador {
    fn name(&self) -> &str {
        &self.nombre
    }

    fn raw_latitude(&self) -> Option<&RawCoord> {
        self.latitud.as_ref()
    }

    fn raw_longitude(&self) -> Option<&RawCoord> {
        self.longitud.as_ref()
    }

    fn region(&self) -> Option<&str> {
        self.provincia.as_deref()
    }
}

impl GeoEntity for Localidad {
    fn name(&self) -> &str {
        &self.nombre
    }

    fn raw_latitude(&self) -> Option<&RawCoord> {
        self.latitud.as_ref()
    }

    fn raw_longitude(&self) -> Option<&RawCoord> {
        self.longitud.as_ref()
    }

    fn region(&self) -> Option<&str> {
        self.provincia.as_deref()
    }
}
