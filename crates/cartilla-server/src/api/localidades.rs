use axum::{
    extract::{Query, State},
    Extension, Json,
};
use serde::{Deserialize, Serialize};

use cartilla_core::Localidad;
use cartilla_geo::{
    count_within_radius, rank_candidates, CoordSource, Coordinate, GeoEntity, SearchCandidate,
};

use crate::middleware::RequestId;

use super::{load_prestadores, ApiError, AppState};

const CANDIDATE_LIMIT: usize = 20;

#[derive(Debug, Deserialize)]
pub(super) struct LocalidadParams {
    pub q: Option<String>,
    /// Radius in kilometers used to count nearby providers per candidate.
    pub radio: Option<String>,
}

#[derive(Debug, Serialize)]
pub(super) struct LocalidadItem {
    pub id: i64,
    pub nombre: String,
    pub provincia: Option<String>,
    pub departamento: Option<String>,
    pub lat: Option<f64>,
    pub lng: Option<f64>,
    /// Where the coordinates came from: `gps`, `corrected`, or `raw`.
    pub fuente: Option<CoordSource>,
    /// Providers within the query radius of this locality.
    pub cercanos: usize,
    pub prioridad: i64,
}

impl LocalidadItem {
    fn new(candidate: &SearchCandidate<Localidad>) -> Self {
        Self {
            id: candidate.entity.id,
            nombre: candidate.entity.nombre.clone(),
            provincia: candidate.entity.provincia.clone(),
            departamento: candidate.entity.departamento.clone(),
            lat: candidate.coordinate.map(|c| c.latitude),
            lng: candidate.coordinate.map(|c| c.longitude),
            fuente: candidate.coordinate.map(|c| c.source),
            cercanos: candidate.nearby_count,
            prioridad: candidate.priority,
        }
    }
}

#[derive(Debug, Serialize)]
pub(super) struct LocalidadesResponse {
    pub success: bool,
    /// Best match; `null` only when nothing matched at all.
    pub localidad: Option<LocalidadItem>,
    pub alternativas: Vec<LocalidadItem>,
    pub total: usize,
}

/// Resolve a free-text locality query to coordinates.
///
/// Candidates come from the store by `ilike` name match; the corrections
/// table overrides geodata for capitals known to be wrong; candidates are
/// ranked by name-match quality and nearby provider density. Ambiguity is
/// never an error — the best guess comes back with the alternates.
pub(super) async fn resolve_localidad(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(params): Query<LocalidadParams>,
) -> Result<Json<LocalidadesResponse>, ApiError> {
    let Some(term) = params.q.as_deref().map(str::trim).filter(|t| !t.is_empty()) else {
        return Err(ApiError::bad_request("se requiere el parámetro q"));
    };

    let radio_km = match params.radio.as_ref() {
        None => state.settings.default_radius_km,
        Some(raw) => match raw.trim().replacen(',', ".", 1).parse::<f64>() {
            Ok(r) if r > 0.0 && r.is_finite() => r,
            _ => return Err(ApiError::bad_request("radio inválido")),
        },
    };

    let localidades =
        cartilla_store::search_localidades(&state.store, term, CANDIDATE_LIMIT)
            .await
            .map_err(|e| ApiError::upstream(&req_id.0, &e))?;

    let (prestadores, _) = load_prestadores(&state, None, None)
        .await
        .map_err(|e| ApiError::upstream(&req_id.0, &e))?;

    let candidates: Vec<SearchCandidate<Localidad>> = localidades
        .into_iter()
        .map(|localidad| {
            // The corrections table wins over the store's own geodata.
            let coordinate = state
                .regions
                .correction_for(&localidad.nombre)
                .and_then(|p| Coordinate::new(p.lat, p.lon, CoordSource::Corrected))
                .or_else(|| localidad.coordinate());
            let nearby = coordinate
                .map_or(0, |c| count_within_radius(c, radio_km, prestadores.as_slice()));
            SearchCandidate::new(localidad, coordinate, nearby)
        })
        .collect();

    let total = candidates.len();
    let resolved = rank_candidates(term, candidates);

    tracing::debug!(
        request_id = %req_id.0,
        term,
        total,
        resolved = resolved.is_some(),
        "locality resolution complete"
    );

    let (localidad, alternativas) = match resolved {
        Some(r) => (
            Some(LocalidadItem::new(&r.best)),
            r.alternates.iter().map(LocalidadItem::new).collect(),
        ),
        None => (None, Vec::new()),
    };

    Ok(Json(LocalidadesResponse {
        success: true,
        localidad,
        alternativas,
        total,
    }))
}
