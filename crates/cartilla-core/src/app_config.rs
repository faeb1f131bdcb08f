use std::net::SocketAddr;
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Production => write!(f, "production"),
        }
    }
}

#[derive(Clone)]
pub struct AppConfig {
    pub store_url: String,
    pub store_api_key: String,
    pub env: Environment,
    pub bind_addr: SocketAddr,
    pub log_level: String,
    pub regions_path: PathBuf,
    pub store_timeout_secs: u64,
    pub store_max_retries: u32,
    pub store_retry_backoff_ms: u64,
    pub fetch_cap: usize,
    pub default_radius_km: f64,
    pub fallback_limit: usize,
    pub drilldown_threshold: usize,
    pub subcluster_cap: usize,
    pub cluster_members_cap: usize,
    pub cache_ttl_secs: u64,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("store_url", &self.store_url)
            .field("store_api_key", &"[redacted]")
            .field("env", &self.env)
            .field("bind_addr", &self.bind_addr)
            .field("log_level", &self.log_level)
            .field("regions_path", &self.regions_path)
            .field("store_timeout_secs", &self.store_timeout_secs)
            .field("store_max_retries", &self.store_max_retries)
            .field("store_retry_backoff_ms", &self.store_retry_backoff_ms)
            .field("fetch_cap", &self.fetch_cap)
            .field("default_radius_km", &self.default_radius_km)
            .field("fallback_limit", &self.fallback_limit)
            .field("drilldown_threshold", &self.drilldown_threshold)
            .field("subcluster_cap", &self.subcluster_cap)
            .field("cluster_members_cap", &self.cluster_members_cap)
            .field("cache_ttl_secs", &self.cache_ttl_secs)
            .finish()
    }
}
