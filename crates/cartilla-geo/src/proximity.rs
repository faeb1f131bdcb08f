//! Radius filtering over directory entities.
//!
//! Entities with unusable coordinates are excluded and counted, never
//! errored on. When nothing falls inside the radius the caller can ask for
//! the closest entities instead; the two result kinds are kept distinct so
//! the UI can message "nothing within X km, showing nearest" rather than
//! silently widening the search.

use serde::Serialize;

use crate::coord::Coordinate;
use crate::distance::haversine_km;
use crate::GeoEntity;

/// How many closest entities the nearest-fallback returns by default.
pub const DEFAULT_FALLBACK_LIMIT: usize = 20;

/// An entity annotated with its distance from the query origin.
///
/// `distance_km` carries full precision for sorting; presentation rounding
/// happens at serialization.
#[derive(Debug, Clone, Serialize)]
pub struct ProximityResult<T> {
    pub entity: T,
    pub distance_km: f64,
}

/// Which policy produced a [`RadiusSearch`]'s results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchKind {
    /// Every result is within the requested radius.
    WithinRadius,
    /// Nothing was within the radius; results are the closest entities
    /// regardless of distance.
    NearestFallback,
}

/// Result of a radius search, with entity-level exclusion diagnostics.
#[derive(Debug, Clone, Serialize)]
pub struct RadiusSearch<T> {
    pub kind: SearchKind,
    pub results: Vec<ProximityResult<T>>,
    /// Entities excluded because their coordinates failed to parse.
    /// Observability only; never used for control flow.
    pub invalid_coordinates: usize,
}

/// Annotate every entity with a valid coordinate with its distance from
/// `origin`, sorted ascending. The sort is stable, so equidistant entities
/// keep their input order.
fn ranked_by_distance<T: GeoEntity>(
    origin: Coordinate,
    entities: Vec<T>,
) -> (Vec<ProximityResult<T>>, usize) {
    let mut invalid = 0usize;
    let mut ranked: Vec<ProximityResult<T>> = entities
        .into_iter()
        .filter_map(|entity| match entity.coordinate() {
            Some(c) => Some(ProximityResult {
                distance_km: haversine_km(
                    origin.latitude,
                    origin.longitude,
                    c.latitude,
                    c.longitude,
                ),
                entity,
            }),
            None => {
                invalid += 1;
                None
            }
        })
        .collect();
    ranked.sort_by(|a, b| a.distance_km.total_cmp(&b.distance_km));
    (ranked, invalid)
}

/// Entities within `radius_km` of `origin`, sorted ascending by distance.
#[must_use]
pub fn filter_by_radius<T: GeoEntity>(
    origin: Coordinate,
    radius_km: f64,
    entities: Vec<T>,
) -> RadiusSearch<T> {
    let (mut ranked, invalid_coordinates) = ranked_by_distance(origin, entities);
    ranked.retain(|r| r.distance_km <= radius_km);
    RadiusSearch {
        kind: SearchKind::WithinRadius,
        results: ranked,
        invalid_coordinates,
    }
}

/// Like [`filter_by_radius`], but when the radius yields nothing, returns
/// the `fallback_limit` closest entities flagged
/// [`SearchKind::NearestFallback`].
#[must_use]
pub fn filter_with_fallback<T: GeoEntity>(
    origin: Coordinate,
    radius_km: f64,
    entities: Vec<T>,
    fallback_limit: usize,
) -> RadiusSearch<T> {
    let (mut ranked, invalid_coordinates) = ranked_by_distance(origin, entities);
    let within = ranked.iter().take_while(|r| r.distance_km <= radius_km).count();

    if within > 0 || ranked.is_empty() {
        ranked.truncate(within);
        return RadiusSearch {
            kind: SearchKind::WithinRadius,
            results: ranked,
            invalid_coordinates,
        };
    }

    ranked.truncate(fallback_limit);
    RadiusSearch {
        kind: SearchKind::NearestFallback,
        results: ranked,
        invalid_coordinates,
    }
}

/// How many entities sit within `radius_km` of `origin`. Borrowing variant
/// used when only the count matters (locality candidate ranking).
#[must_use]
pub fn count_within_radius<T: GeoEntity>(origin: Coordinate, radius_km: f64, entities: &[T]) -> usize {
    entities
        .iter()
        .filter_map(GeoEntity::coordinate)
        .filter(|c| {
            haversine_km(origin.latitude, origin.longitude, c.latitude, c.longitude) <= radius_km
        })
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coord::CoordSource;
    use cartilla_core::{Prestador, RawCoord};

    fn prestador(id: i64, nombre: &str, lat: Option<f64>, lon: Option<f64>) -> Prestador {
        Prestador {
            id,
            nombre: nombre.to_string(),
            especialidad: None,
            domicilio: None,
            localidad: None,
            provincia: None,
            telefono: None,
            latitud: lat.map(RawCoord::Num),
            longitud: lon.map(RawCoord::Num),
        }
    }

    fn catamarca_origin() -> Coordinate {
        Coordinate::new(-28.4696, -65.7852, CoordSource::Corrected).expect("valid origin")
    }

    #[test]
    fn includes_only_entities_within_radius() {
        // San Fernando del Valle de Catamarca vs the Obelisco, radius 50 km.
        let entities = vec![
            prestador(1, "Clínica Local", Some(-28.47), Some(-65.78)),
            prestador(2, "Hospital Porteño", Some(-34.60), Some(-58.38)),
        ];
        let search = filter_by_radius(catamarca_origin(), 50.0, entities);
        assert_eq!(search.kind, SearchKind::WithinRadius);
        assert_eq!(search.results.len(), 1);
        assert_eq!(search.results[0].entity.id, 1);
        let d = search.results[0].distance_km;
        assert!((0.01..=1.0).contains(&d), "expected sub-km distance, got {d}");
    }

    #[test]
    fn soundness_and_completeness_against_brute_force() {
        let origin = catamarca_origin();
        let radius = 300.0;
        let entities: Vec<Prestador> = (0..40)
            .map(|i| {
                let lat = -34.0 + f64::from(i) * 0.3;
                let lon = -66.0 + f64::from(i % 7) * 0.5;
                prestador(i64::from(i), "P", Some(lat), Some(lon))
            })
            .collect();

        let expected: Vec<i64> = entities
            .iter()
            .filter(|e| {
                haversine_km(
                    origin.latitude,
                    origin.longitude,
                    e.latitud.as_ref().map_or(0.0, |c| match c {
                        RawCoord::Num(n) => *n,
                        RawCoord::Text(_) => 0.0,
                    }),
                    e.longitud.as_ref().map_or(0.0, |c| match c {
                        RawCoord::Num(n) => *n,
                        RawCoord::Text(_) => 0.0,
                    }),
                ) <= radius
            })
            .map(|e| e.id)
            .collect();

        let search = filter_by_radius(origin, radius, entities);
        let mut got: Vec<i64> = search.results.iter().map(|r| r.entity.id).collect();
        got.sort_unstable();
        let mut expected = expected;
        expected.sort_unstable();
        assert_eq!(got, expected, "filter must match brute-force membership");
    }

    #[test]
    fn results_are_sorted_non_decreasing() {
        let entities = vec![
            prestador(1, "Lejos", Some(-30.0), Some(-65.0)),
            prestador(2, "Cerca", Some(-28.5), Some(-65.8)),
            prestador(3, "Medio", Some(-29.0), Some(-65.5)),
        ];
        let search = filter_by_radius(catamarca_origin(), 1000.0, entities);
        let distances: Vec<f64> = search.results.iter().map(|r| r.distance_km).collect();
        assert!(
            distances.windows(2).all(|w| w[0] <= w[1]),
            "distances not sorted: {distances:?}"
        );
    }

    #[test]
    fn ties_keep_input_order() {
        // Two entities at the exact same point; ids must come out in input order.
        let entities = vec![
            prestador(7, "Primero", Some(-28.5), Some(-65.8)),
            prestador(3, "Segundo", Some(-28.5), Some(-65.8)),
        ];
        let search = filter_by_radius(catamarca_origin(), 50.0, entities);
        let ids: Vec<i64> = search.results.iter().map(|r| r.entity.id).collect();
        assert_eq!(ids, vec![7, 3]);
    }

    #[test]
    fn invalid_coordinates_are_excluded_and_counted() {
        let entities = vec![
            prestador(1, "Sin coords", None, None),
            prestador(2, "Cero", Some(0.0), Some(0.0)),
            prestador(3, "Válido", Some(-28.5), Some(-65.8)),
        ];
        let search = filter_by_radius(catamarca_origin(), 50.0, entities);
        assert_eq!(search.results.len(), 1);
        assert_eq!(search.invalid_coordinates, 2);
    }

    #[test]
    fn empty_radius_without_fallback_is_empty_within_radius() {
        let entities = vec![prestador(1, "Hospital Porteño", Some(-34.60), Some(-58.38))];
        let search = filter_by_radius(catamarca_origin(), 50.0, entities);
        assert_eq!(search.kind, SearchKind::WithinRadius);
        assert!(search.results.is_empty());
    }

    #[test]
    fn fallback_returns_nearest_flagged_distinctly() {
        // Nothing within 50 km of Catamarca; fallback must return the CABA
        // entity with its true ~950 km distance.
        let entities = vec![prestador(1, "Hospital Porteño", Some(-34.60), Some(-58.38))];
        let search =
            filter_with_fallback(catamarca_origin(), 50.0, entities, DEFAULT_FALLBACK_LIMIT);
        assert_eq!(search.kind, SearchKind::NearestFallback);
        assert_eq!(search.results.len(), 1);
        let d = search.results[0].distance_km;
        assert!((600.0..1100.0).contains(&d), "expected ~950 km, got {d}");
    }

    #[test]
    fn fallback_not_used_when_radius_matches() {
        let entities = vec![
            prestador(1, "Cerca", Some(-28.5), Some(-65.8)),
            prestador(2, "Lejos", Some(-34.60), Some(-58.38)),
        ];
        let search = filter_with_fallback(catamarca_origin(), 50.0, entities, 20);
        assert_eq!(search.kind, SearchKind::WithinRadius);
        assert_eq!(search.results.len(), 1);
    }

    #[test]
    fn fallback_respects_limit() {
        let entities: Vec<Prestador> = (0..30)
            .map(|i| prestador(i, "P", Some(-34.0 - f64::from(i as i32) * 0.01), Some(-58.4)))
            .collect();
        let search = filter_with_fallback(catamarca_origin(), 1.0, entities, 20);
        assert_eq!(search.kind, SearchKind::NearestFallback);
        assert_eq!(search.results.len(), 20);
    }

    #[test]
    fn count_within_radius_borrows() {
        let entities = vec![
            prestador(1, "Cerca", Some(-28.5), Some(-65.8)),
            prestador(2, "Lejos", Some(-34.60), Some(-58.38)),
            prestador(3, "Sin coords", None, None),
        ];
        assert_eq!(count_within_radius(catamarca_origin(), 50.0, &entities), 1);
        // Entities still usable afterwards.
        assert_eq!(entities.len(), 3);
    }
}
