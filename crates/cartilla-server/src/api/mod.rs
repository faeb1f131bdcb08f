mod localidades;
mod provincias;
mod search;

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::State,
    http::{header, HeaderName, Method, StatusCode},
    response::IntoResponse,
    routing::get,
    Extension, Json, Router,
};
use serde::Serialize;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;

use cartilla_core::regions::RegionTable;
use cartilla_core::{AppConfig, Prestador};
use cartilla_store::{StoreClient, StoreError};

use crate::cache::ProviderCache;
use crate::middleware::{enforce_rate_limit, request_id, RateLimitState, RequestId};

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<StoreClient>,
    pub regions: Arc<RegionTable>,
    pub settings: Arc<SearchSettings>,
    pub cache: ProviderCache,
}

/// Search and clustering knobs, lifted out of [`AppConfig`] so handlers
/// don't carry store credentials around.
#[derive(Debug, Clone)]
pub struct SearchSettings {
    pub default_radius_km: f64,
    pub fallback_limit: usize,
    pub fetch_cap: usize,
    pub drilldown_threshold: usize,
    pub subcluster_cap: usize,
    pub cluster_members_cap: usize,
}

impl SearchSettings {
    #[must_use]
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            default_radius_km: config.default_radius_km,
            fallback_limit: config.fallback_limit,
            fetch_cap: config.fetch_cap,
            drilldown_threshold: config.drilldown_threshold,
            subcluster_cap: config.subcluster_cap,
            cluster_members_cap: config.cluster_members_cap,
        }
    }
}

/// Request-level failure, serialized as `{ "success": false, "error": … }`.
///
/// Entity-level anomalies (bad coordinates) never reach this type — they
/// are excluded and counted in the response's `debug` block instead.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

#[derive(Debug, Serialize)]
struct ApiErrorBody {
    success: bool,
    error: String,
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }

    /// Store failure: surfaced verbatim with the store's own message, no
    /// retry here beyond what the client already did.
    pub fn upstream(request_id: &str, error: &StoreError) -> Self {
        tracing::error!(request_id, error = %error, "store query failed");
        Self {
            status: StatusCode::BAD_GATEWAY,
            message: error.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        (
            self.status,
            Json(ApiErrorBody {
                success: false,
                error: self.message,
            }),
        )
            .into_response()
    }
}

/// Load the provider set, going through the cache only for unfiltered
/// requests (the cache holds the full directory, nothing else). Returns
/// the rows and whether they came from the cache.
pub(super) async fn load_prestadores(
    state: &AppState,
    especialidad: Option<&str>,
    nombre: Option<&str>,
) -> Result<(Arc<Vec<Prestador>>, bool), StoreError> {
    let filtered = especialidad.is_some_and(|t| !t.trim().is_empty())
        || nombre.is_some_and(|t| !t.trim().is_empty());

    if !filtered {
        if let Some(rows) = state.cache.get().await {
            return Ok((rows, true));
        }
    }

    let rows = Arc::new(
        cartilla_store::fetch_prestadores(
            &state.store,
            especialidad,
            nombre,
            state.settings.fetch_cap,
        )
        .await?,
    );

    if !filtered {
        state.cache.put(Arc::clone(&rows)).await;
    }

    Ok((rows, false))
}

fn build_cors() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET])
        .allow_headers([
            header::CONTENT_TYPE,
            HeaderName::from_static("x-request-id"),
        ])
}

fn api_router(rate_limit: RateLimitState) -> Router<AppState> {
    Router::new()
        .route("/api/v1/prestadores/search", get(search::search_prestadores))
        .route(
            "/api/v1/prestadores/provincias",
            get(provincias::list_provincias),
        )
        .route(
            "/api/v1/prestadores/provincias/{provincia}/clusters",
            get(provincias::province_clusters),
        )
        .route(
            "/api/v1/localidades/search",
            get(localidades::resolve_localidad),
        )
        .layer(axum::middleware::from_fn_with_state(
            rate_limit,
            enforce_rate_limit,
        ))
}

pub fn build_app(state: AppState, rate_limit: RateLimitState) -> Router {
    let public_routes = Router::new().route("/api/v1/health", get(health));

    Router::new()
        .merge(public_routes)
        .merge(api_router(rate_limit))
        .layer(
            ServiceBuilder::new()
                .layer(build_cors())
                .layer(axum::middleware::from_fn(request_id)),
        )
        .with_state(state)
}

#[derive(Debug, Serialize, PartialEq, Eq)]
struct HealthData {
    success: bool,
    status: &'static str,
    store: &'static str,
}

async fn health(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> impl IntoResponse {
    match state.store.health().await {
        Ok(()) => (
            StatusCode::OK,
            Json(HealthData {
                success: true,
                status: "ok",
                store: "ok",
            }),
        ),
        Err(e) => {
            tracing::warn!(request_id = %req_id.0, error = %e, "health check: store unavailable");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(HealthData {
                    success: false,
                    status: "degraded",
                    store: "unavailable",
                }),
            )
        }
    }
}

pub fn default_rate_limit_state() -> RateLimitState {
    RateLimitState::new(120, Duration::from_secs(60))
}
