use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use serde::{Deserialize, Serialize};

use cartilla_core::Prestador;
use cartilla_geo::{
    aggregate_by_region, aggregate_by_subregion, reference_points_for, validate_region_span,
    GeoEntity,
};

use crate::middleware::RequestId;

use super::search::PrestadorItem;
use super::{load_prestadores, ApiError, AppState};

#[derive(Debug, Deserialize)]
pub(super) struct ProvinciasParams {
    pub especialidad: Option<String>,
    pub prestador: Option<String>,
}

#[derive(Debug, Serialize)]
pub(super) struct ProvinciaItem {
    pub provincia: String,
    pub cantidad: usize,
    pub lat: f64,
    pub lng: f64,
    /// Whether the map view should offer the sub-cluster drill-down.
    pub subdividible: bool,
}

#[derive(Debug, Serialize)]
pub(super) struct ProvinciasResponse {
    pub success: bool,
    pub provincias: Vec<ProvinciaItem>,
    /// Aggregated provider count across all provinces.
    pub total: usize,
}

/// One cluster per province, sorted by descending member count.
pub(super) async fn list_provincias(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(params): Query<ProvinciasParams>,
) -> Result<Json<ProvinciasResponse>, ApiError> {
    let (rows, _) = load_prestadores(
        &state,
        params.especialidad.as_deref(),
        params.prestador.as_deref(),
    )
    .await
    .map_err(|e| ApiError::upstream(&req_id.0, &e))?;

    let entities: Vec<&Prestador> = rows.iter().collect();
    let mut clusters = aggregate_by_region(entities, &state.regions);
    clusters.sort_by(|a, b| b.member_count.cmp(&a.member_count));

    for cluster in &clusters {
        if let Some(warning) = validate_region_span(&cluster.label, &cluster.members, &state.regions)
        {
            tracing::warn!(
                request_id = %req_id.0,
                region = warning.region,
                lat_span = warning.lat_span,
                lon_span = warning.lon_span,
                limit = warning.limit,
                "region members span more ground than plausible; check geocoding"
            );
        }
    }

    let total = clusters.iter().map(|c| c.member_count).sum();
    let provincias = clusters
        .into_iter()
        .map(|c| ProvinciaItem {
            provincia: c.label,
            cantidad: c.member_count,
            lat: c.centroid.latitude,
            lng: c.centroid.longitude,
            subdividible: c.member_count > state.settings.drilldown_threshold,
        })
        .collect();

    Ok(Json(ProvinciasResponse {
        success: true,
        provincias,
        total,
    }))
}

#[derive(Debug, Serialize)]
pub(super) struct ClusterItem {
    pub id: String,
    pub etiqueta: String,
    pub lat: f64,
    pub lng: f64,
    pub cantidad: usize,
    /// Truncated for payload size; `cantidad` stays authoritative.
    pub miembros: Vec<PrestadorItem>,
}

#[derive(Debug, Serialize)]
pub(super) struct ClustersResponse {
    pub success: bool,
    pub provincia: String,
    pub clusters: Vec<ClusterItem>,
    pub total: usize,
}

/// Sub-cluster drill-down for one province.
pub(super) async fn province_clusters(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(provincia): Path<String>,
    Query(params): Query<ProvinciasParams>,
) -> Result<Json<ClustersResponse>, ApiError> {
    let (rows, _) = load_prestadores(
        &state,
        params.especialidad.as_deref(),
        params.prestador.as_deref(),
    )
    .await
    .map_err(|e| ApiError::upstream(&req_id.0, &e))?;

    let label = state
        .regions
        .canonical(&provincia)
        .map_or_else(|| provincia.trim().to_string(), |p| p.name.clone());
    let wanted = cartilla_core::regions::fold_key(&label);

    let entities: Vec<&Prestador> = rows
        .iter()
        .filter(|p| {
            p.region().map(str::trim).is_some_and(|raw| {
                state
                    .regions
                    .canonical(raw)
                    .map_or_else(|| cartilla_core::regions::fold_key(raw), |prov| {
                        cartilla_core::regions::fold_key(&prov.name)
                    })
                    == wanted
            })
        })
        .collect();

    if let Some(warning) = validate_region_span(&label, &entities, &state.regions) {
        tracing::warn!(
            request_id = %req_id.0,
            region = warning.region,
            lat_span = warning.lat_span,
            lon_span = warning.lon_span,
            "drill-down members span more ground than plausible"
        );
    }

    let anchors = reference_points_for(&label, &entities, &state.regions);
    let total = entities.len();
    let clusters = aggregate_by_subregion(entities, &label, &anchors, state.settings.subcluster_cap);

    let members_cap = state.settings.cluster_members_cap;
    let clusters = clusters
        .into_iter()
        .map(|c| ClusterItem {
            id: c.id,
            etiqueta: c.label,
            lat: c.centroid.latitude,
            lng: c.centroid.longitude,
            cantidad: c.member_count,
            miembros: c
                .members
                .iter()
                .take(members_cap)
                .map(|p| PrestadorItem::new(p, None))
                .collect(),
        })
        .collect();

    Ok(Json(ClustersResponse {
        success: true,
        provincia: label,
        clusters,
        total,
    }))
}
