use std::time::Instant;

use axum::{extract::Query, extract::State, Extension, Json};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use cartilla_core::{Prestador, RawCoord};
use cartilla_geo::{
    filter_by_radius, filter_with_fallback, round1, round2, CoordSource, Coordinate, GeoEntity,
    ProximityResult, SearchKind,
};

use crate::middleware::RequestId;

use super::{load_prestadores, ApiError, AppState};

#[derive(Debug, Deserialize)]
pub(super) struct SearchParams {
    /// Latitude; accepted as a plain or comma-decimal string, same as store
    /// data.
    pub lat: Option<String>,
    pub lng: Option<String>,
    /// Radius in kilometers.
    pub radio: Option<String>,
    pub especialidad: Option<String>,
    pub prestador: Option<String>,
    /// Load the whole directory without distance filtering.
    pub todos: Option<bool>,
    /// When the radius is empty, return the nearest entities instead.
    pub fallback: Option<bool>,
}

#[derive(Debug, Serialize)]
pub(super) struct PrestadorItem {
    pub id: i64,
    pub nombre: String,
    pub especialidad: Option<String>,
    pub domicilio: Option<String>,
    pub localidad: Option<String>,
    pub provincia: Option<String>,
    pub telefono: Option<String>,
    pub lat: Option<f64>,
    pub lng: Option<f64>,
    /// Canonical one-decimal rounding.
    pub distancia_km: Option<f64>,
}

impl PrestadorItem {
    pub(super) fn new(prestador: &Prestador, distancia_km: Option<f64>) -> Self {
        let coordinate = prestador.coordinate();
        Self {
            id: prestador.id,
            nombre: prestador.nombre.clone(),
            especialidad: prestador.especialidad.clone(),
            domicilio: prestador.domicilio.clone(),
            localidad: prestador.localidad.clone(),
            provincia: prestador.provincia.clone(),
            telefono: prestador.telefono.clone(),
            lat: coordinate.map(|c| c.latitude),
            lng: coordinate.map(|c| c.longitude),
            distancia_km: distancia_km.map(round1),
        }
    }
}

#[derive(Debug, Serialize)]
pub(super) struct SearchDebug {
    /// Rows fetched from the store before geographic filtering.
    pub consultados: usize,
    /// Rows excluded for unusable coordinates.
    pub invalidas: usize,
    pub radio_km: Option<f64>,
    /// Two-decimal diagnostic rounding.
    pub mas_cercano_km: Option<f64>,
    pub desde_cache: bool,
    pub duracion_ms: u64,
    pub generado_el: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub(super) struct SearchResponse {
    pub success: bool,
    pub prestadores: Vec<PrestadorItem>,
    pub total: usize,
    pub fallback: bool,
    pub debug: SearchDebug,
}

/// Parse a query coordinate the same way store data is parsed: plain or
/// comma-decimal, zero treated as absent.
fn parse_query_axis(raw: Option<&String>) -> Option<f64> {
    let text = RawCoord::Text(raw?.clone());
    cartilla_geo::coord::parse_axis(Some(&text))
}

pub(super) async fn search_prestadores(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(params): Query<SearchParams>,
) -> Result<Json<SearchResponse>, ApiError> {
    let started = Instant::now();

    let origin = parse_query_axis(params.lat.as_ref())
        .zip(parse_query_axis(params.lng.as_ref()))
        .and_then(|(lat, lng)| Coordinate::new(lat, lng, CoordSource::Gps));

    let load_all = params.todos.unwrap_or(false);
    if origin.is_none() && !load_all {
        return Err(ApiError::bad_request(
            "coordenadas inválidas: se requieren lat y lng, o todos=true",
        ));
    }

    let radio_km = match params.radio.as_ref() {
        None => state.settings.default_radius_km,
        Some(raw) => match raw.trim().replacen(',', ".", 1).parse::<f64>() {
            Ok(r) if r > 0.0 && r.is_finite() => r,
            _ => return Err(ApiError::bad_request("radio inválido")),
        },
    };

    let (rows, desde_cache) = load_prestadores(
        &state,
        params.especialidad.as_deref(),
        params.prestador.as_deref(),
    )
    .await
    .map_err(|e| ApiError::upstream(&req_id.0, &e))?;

    let Some(origin) = origin else {
        // todos=true: the whole directory, no distance annotation.
        let prestadores: Vec<PrestadorItem> =
            rows.iter().map(|p| PrestadorItem::new(p, None)).collect();
        let total = prestadores.len();
        return Ok(Json(SearchResponse {
            success: true,
            prestadores,
            total,
            fallback: false,
            debug: SearchDebug {
                consultados: rows.len(),
                invalidas: 0,
                radio_km: None,
                mas_cercano_km: None,
                desde_cache,
                duracion_ms: elapsed_ms(started),
                generado_el: Utc::now(),
            },
        }));
    };

    let entities: Vec<&Prestador> = rows.iter().collect();
    let search = if params.fallback.unwrap_or(false) {
        filter_with_fallback(origin, radio_km, entities, state.settings.fallback_limit)
    } else {
        filter_by_radius(origin, radio_km, entities)
    };

    let mas_cercano_km = search.results.first().map(|r| round2(r.distance_km));
    let prestadores: Vec<PrestadorItem> = search
        .results
        .iter()
        .map(|r: &ProximityResult<&Prestador>| PrestadorItem::new(r.entity, Some(r.distance_km)))
        .collect();
    let total = prestadores.len();

    tracing::debug!(
        request_id = %req_id.0,
        total,
        invalidas = search.invalid_coordinates,
        radio_km,
        "radius search complete"
    );

    Ok(Json(SearchResponse {
        success: true,
        prestadores,
        total,
        fallback: search.kind == SearchKind::NearestFallback,
        debug: SearchDebug {
            consultados: rows.len(),
            invalidas: search.invalid_coordinates,
            radio_km: Some(radio_km),
            mas_cercano_km,
            desde_cache,
            duracion_ms: elapsed_ms(started),
            generado_el: Utc::now(),
        },
    }))
}

fn elapsed_ms(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_query_axis_accepts_comma_decimals() {
        let raw = Some("-28,4696".to_string());
        assert_eq!(parse_query_axis(raw.as_ref()), Some(-28.4696));
    }

    #[test]
    fn parse_query_axis_rejects_garbage_and_zero() {
        assert_eq!(parse_query_axis(Some(&"abc".to_string())), None);
        assert_eq!(parse_query_axis(Some(&"0".to_string())), None);
        assert_eq!(parse_query_axis(None), None);
    }

    #[test]
    fn prestador_item_rounds_to_one_decimal() {
        let p = Prestador {
            id: 1,
            nombre: "CEM".to_string(),
            especialidad: None,
            domicilio: None,
            localidad: None,
            provincia: None,
            telefono: None,
            latitud: Some(RawCoord::Num(-28.47)),
            longitud: Some(RawCoord::Num(-65.78)),
        };
        let item = PrestadorItem::new(&p, Some(12.3456));
        assert_eq!(item.distancia_km, Some(12.3));
        assert_eq!(item.lat, Some(-28.47));
    }
}
