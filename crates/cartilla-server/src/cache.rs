//! Optional TTL cache of the full provider set.
//!
//! Strictly a performance knob: with the default TTL of zero every request
//! re-fetches, matching the store-is-source-of-truth behavior. Results only
//! ever lag the store by at most the configured TTL. Filtered fetches
//! bypass the cache entirely — only the unfiltered "all providers" set is
//! cached.

use std::sync::Arc;
use std::time::{Duration, Instant};

use cartilla_core::Prestador;
use tokio::sync::Mutex;

struct CacheEntry {
    fetched_at: Instant,
    rows: Arc<Vec<Prestador>>,
}

#[derive(Clone)]
pub struct ProviderCache {
    ttl: Duration,
    inner: Arc<Mutex<Option<CacheEntry>>>,
}

impl ProviderCache {
    #[must_use]
    pub fn new(ttl_secs: u64) -> Self {
        Self {
            ttl: Duration::from_secs(ttl_secs),
            inner: Arc::new(Mutex::new(None)),
        }
    }

    /// The cached provider set, if caching is enabled and the entry is
    /// still fresh.
    pub async fn get(&self) -> Option<Arc<Vec<Prestador>>> {
        if self.ttl.is_zero() {
            return None;
        }
        let guard = self.inner.lock().await;
        guard
            .as_ref()
            .filter(|entry| entry.fetched_at.elapsed() < self.ttl)
            .map(|entry| Arc::clone(&entry.rows))
    }

    /// Store a freshly fetched provider set. No-op when caching is disabled.
    pub async fn put(&self, rows: Arc<Vec<Prestador>>) {
        if self.ttl.is_zero() {
            return;
        }
        let mut guard = self.inner.lock().await;
        *guard = Some(CacheEntry {
            fetched_at: Instant::now(),
            rows,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rows() -> Arc<Vec<Prestador>> {
        Arc::new(vec![Prestador {
            id: 1,
            nombre: "CEM".to_string(),
            especialidad: None,
            domicilio: None,
            localidad: None,
            provincia: None,
            telefono: None,
            latitud: None,
            longitud: None,
        }])
    }

    #[tokio::test]
    async fn disabled_cache_never_stores() {
        let cache = ProviderCache::new(0);
        cache.put(rows()).await;
        assert!(cache.get().await.is_none());
    }

    #[tokio::test]
    async fn enabled_cache_round_trips() {
        let cache = ProviderCache::new(300);
        assert!(cache.get().await.is_none(), "empty cache misses");
        cache.put(rows()).await;
        let hit = cache.get().await.expect("fresh entry hits");
        assert_eq!(hit.len(), 1);
    }
}
