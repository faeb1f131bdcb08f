mod api;
mod cache;
mod middleware;

use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use crate::api::{build_app, default_rate_limit_state, AppState, SearchSettings};
use crate::cache::ProviderCache;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = cartilla_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let regions = match cartilla_core::regions::RegionTable::load(&config.regions_path) {
        Ok(table) => table,
        Err(cartilla_core::ConfigError::RegionsFileIo { path, source }) => {
            tracing::warn!(path, error = %source, "regions file missing; using compiled-in dataset");
            cartilla_core::regions::RegionTable::argentina()
        }
        Err(e) => return Err(e.into()),
    };

    let store = cartilla_store::StoreClient::new(
        &config.store_url,
        &config.store_api_key,
        config.store_timeout_secs,
    )?
    .with_retry_policy(config.store_max_retries, config.store_retry_backoff_ms);

    let state = AppState {
        store: Arc::new(store),
        regions: Arc::new(regions),
        settings: Arc::new(SearchSettings::from_app_config(&config)),
        cache: ProviderCache::new(config.cache_ttl_secs),
    };
    let app = build_app(state, default_rate_limit_state());

    tracing::info!(addr = %config.bind_addr, env = %config.env, "cartilla server listening");
    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to listen for ctrl-c");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("received shutdown signal, starting graceful shutdown");
}
