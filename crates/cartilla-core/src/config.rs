use crate::app_config::{AppConfig, Environment};
use crate::ConfigError;

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load application configuration from environment variables already in the process.
///
/// Unlike [`load_app_config`], this does NOT load `.env` files — useful for testing
/// or when the caller manages env setup.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
///
/// This is the core parsing/validation logic, decoupled from the actual environment
/// so it can be tested with a pure `HashMap` lookup — no `set_var`/`remove_var` needed.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    use std::net::SocketAddr;
    use std::path::PathBuf;

    let require = |var: &str| -> Result<String, ConfigError> {
        lookup(var).map_err(|_| ConfigError::MissingEnvVar(var.to_string()))
    };

    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let parse_addr = |var: &str, default: &str| -> Result<SocketAddr, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<SocketAddr>()
            .map_err(|e| ConfigError::InvalidEnvVar {
                var: var.to_string(),
                reason: e.to_string(),
            })
    };

    let parse_u32 = |var: &str, default: &str| -> Result<u32, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<u32>().map_err(|e| ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: e.to_string(),
        })
    };

    let parse_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<u64>().map_err(|e| ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: e.to_string(),
        })
    };

    let parse_usize = |var: &str, default: &str| -> Result<usize, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<usize>()
            .map_err(|e| ConfigError::InvalidEnvVar {
                var: var.to_string(),
                reason: e.to_string(),
            })
    };

    let parse_f64 = |var: &str, default: &str| -> Result<f64, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<f64>().map_err(|e| ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: e.to_string(),
        })
    };

    let store_url = require("CARTILLA_STORE_URL")?;
    let store_api_key = require("CARTILLA_STORE_API_KEY")?;

    let env = parse_environment(&or_default("CARTILLA_ENV", "development"));

    let bind_addr = parse_addr("CARTILLA_BIND_ADDR", "0.0.0.0:3000")?;
    let log_level = or_default("CARTILLA_LOG_LEVEL", "info");
    let regions_path = PathBuf::from(or_default("CARTILLA_REGIONS_PATH", "./config/regions.yaml"));

    let store_timeout_secs = parse_u64("CARTILLA_STORE_TIMEOUT_SECS", "30")?;
    let store_max_retries = parse_u32("CARTILLA_STORE_MAX_RETRIES", "3")?;
    let store_retry_backoff_ms = parse_u64("CARTILLA_STORE_RETRY_BACKOFF_MS", "1000")?;
    let fetch_cap = parse_usize("CARTILLA_FETCH_CAP", "20000")?;

    let default_radius_km = parse_f64("CARTILLA_DEFAULT_RADIUS_KM", "10")?;
    let fallback_limit = parse_usize("CARTILLA_FALLBACK_LIMIT", "20")?;
    let drilldown_threshold = parse_usize("CARTILLA_DRILLDOWN_THRESHOLD", "1000")?;
    let subcluster_cap = parse_usize("CARTILLA_SUBCLUSTER_CAP", "1200")?;
    let cluster_members_cap = parse_usize("CARTILLA_CLUSTER_MEMBERS_CAP", "500")?;
    let cache_ttl_secs = parse_u64("CARTILLA_CACHE_TTL_SECS", "0")?;

    Ok(AppConfig {
        store_url,
        store_api_key,
        env,
        bind_addr,
        log_level,
        regions_path,
        store_timeout_secs,
        store_max_retries,
        store_retry_backoff_ms,
        fetch_cap,
        default_radius_km,
        fallback_limit,
        drilldown_threshold,
        subcluster_cap,
        cluster_members_cap,
        cache_ttl_secs,
    })
}

/// Parse a string into an `Environment` variant.
///
/// Unrecognized values default to `Environment::Development`.
fn parse_environment(s: &str) -> Environment {
    match s {
        "production" => Environment::Production,
        "test" => Environment::Test,
        _ => Environment::Development,
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::env::VarError;

    use super::*;

    fn lookup_from_map<'a>(
        map: &'a HashMap<&'a str, &'a str>,
    ) -> impl Fn(&str) -> Result<String, VarError> + 'a {
        move |key| {
            map.get(key)
                .map(|v| (*v).to_string())
                .ok_or(VarError::NotPresent)
        }
    }

    /// Returns a map with all required env vars populated with valid defaults.
    fn full_env<'a>() -> HashMap<&'a str, &'a str> {
        let mut m = HashMap::new();
        m.insert("CARTILLA_STORE_URL", "https://example.supabase.co");
        m.insert("CARTILLA_STORE_API_KEY", "test-anon-key");
        m
    }

    #[test]
    fn parse_environment_production() {
        assert_eq!(parse_environment("production"), Environment::Production);
    }

    #[test]
    fn parse_environment_unknown_defaults_to_development() {
        assert_eq!(parse_environment("staging"), Environment::Development);
    }

    #[test]
    fn build_app_config_fails_without_store_url() {
        let map: HashMap<&str, &str> = HashMap::new();
        let result = build_app_config(lookup_from_map(&map));
        assert!(
            matches!(result, Err(ConfigError::MissingEnvVar(ref v)) if v == "CARTILLA_STORE_URL"),
            "expected MissingEnvVar(CARTILLA_STORE_URL), got: {result:?}"
        );
    }

    #[test]
    fn build_app_config_fails_without_api_key() {
        let mut map: HashMap<&str, &str> = HashMap::new();
        map.insert("CARTILLA_STORE_URL", "https://example.supabase.co");
        let result = build_app_config(lookup_from_map(&map));
        assert!(
            matches!(result, Err(ConfigError::MissingEnvVar(ref v)) if v == "CARTILLA_STORE_API_KEY"),
            "expected MissingEnvVar(CARTILLA_STORE_API_KEY), got: {result:?}"
        );
    }

    #[test]
    fn build_app_config_fails_with_invalid_bind_addr() {
        let mut map = full_env();
        map.insert("CARTILLA_BIND_ADDR", "not-a-socket-addr");
        let result = build_app_config(lookup_from_map(&map));
        assert!(
            matches!(result, Err(ConfigError::InvalidEnvVar { ref var, .. }) if var == "CARTILLA_BIND_ADDR"),
            "expected InvalidEnvVar(CARTILLA_BIND_ADDR), got: {result:?}"
        );
    }

    #[test]
    fn build_app_config_succeeds_with_all_required_vars() {
        let map = full_env();
        let result = build_app_config(lookup_from_map(&map));
        assert!(result.is_ok(), "expected Ok, got: {result:?}");
        let cfg = result.unwrap();
        assert_eq!(cfg.env, Environment::Development);
        assert_eq!(cfg.bind_addr.to_string(), "0.0.0.0:3000");
        assert_eq!(cfg.log_level, "info");
        assert_eq!(cfg.store_timeout_secs, 30);
        assert_eq!(cfg.store_max_retries, 3);
        assert_eq!(cfg.fetch_cap, 20_000);
        assert!((cfg.default_radius_km - 10.0).abs() < f64::EPSILON);
        assert_eq!(cfg.fallback_limit, 20);
        assert_eq!(cfg.drilldown_threshold, 1000);
        assert_eq!(cfg.subcluster_cap, 1200);
        assert_eq!(cfg.cluster_members_cap, 500);
        assert_eq!(cfg.cache_ttl_secs, 0, "cache is disabled by default");
    }

    #[test]
    fn build_app_config_radius_override() {
        let mut map = full_env();
        map.insert("CARTILLA_DEFAULT_RADIUS_KM", "25.5");
        let cfg = build_app_config(lookup_from_map(&map)).unwrap();
        assert!((cfg.default_radius_km - 25.5).abs() < f64::EPSILON);
    }

    #[test]
    fn build_app_config_radius_invalid() {
        let mut map = full_env();
        map.insert("CARTILLA_DEFAULT_RADIUS_KM", "ten");
        let result = build_app_config(lookup_from_map(&map));
        assert!(
            matches!(result, Err(ConfigError::InvalidEnvVar { ref var, .. }) if var == "CARTILLA_DEFAULT_RADIUS_KM"),
            "expected InvalidEnvVar(CARTILLA_DEFAULT_RADIUS_KM), got: {result:?}"
        );
    }

    #[test]
    fn build_app_config_cache_ttl_override() {
        let mut map = full_env();
        map.insert("CARTILLA_CACHE_TTL_SECS", "120");
        let cfg = build_app_config(lookup_from_map(&map)).unwrap();
        assert_eq!(cfg.cache_ttl_secs, 120);
    }

    #[test]
    fn build_app_config_fetch_cap_invalid() {
        let mut map = full_env();
        map.insert("CARTILLA_FETCH_CAP", "-1");
        let result = build_app_config(lookup_from_map(&map));
        assert!(
            matches!(result, Err(ConfigError::InvalidEnvVar { ref var, .. }) if var == "CARTILLA_FETCH_CAP"),
            "expected InvalidEnvVar(CARTILLA_FETCH_CAP), got: {result:?}"
        );
    }
}
