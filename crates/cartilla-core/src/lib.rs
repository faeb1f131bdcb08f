mod app_config;
mod config;
pub mod regions;

pub use app_config::{AppConfig, Environment};
pub use config::{load_app_config, load_app_config_from_env};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A latitude or longitude value exactly as the store serves it.
///
/// The hosted directory tables are inconsistent: some rows carry numeric
/// coordinates, others carry strings with a comma decimal separator
/// (`"-28,4696"`). Deserializing into this untagged enum preserves the raw
/// value; interpretation happens in `cartilla-geo`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawCoord {
    Num(f64),
    Text(String),
}

/// A medical provider ("prestador") row from the directory table.
///
/// Read-only from this system's perspective; rows are created and
/// maintained upstream.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Prestador {
    pub id: i64,
    pub nombre: String,
    #[serde(default)]
    pub especialidad: Option<String>,
    #[serde(default)]
    pub domicilio: Option<String>,
    #[serde(default)]
    pub localidad: Option<String>,
    #[serde(default)]
    pub provincia: Option<String>,
    #[serde(default)]
    pub telefono: Option<String>,
    #[serde(default)]
    pub latitud: Option<RawCoord>,
    #[serde(default)]
    pub longitud: Option<RawCoord>,
}

/// A locality ("localidad") row from the geographic reference table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Localidad {
    pub id: i64,
    pub nombre: String,
    #[serde(default)]
    pub provincia: Option<String>,
    #[serde(default)]
    pub departamento: Option<String>,
    #[serde(default)]
    pub latitud: Option<RawCoord>,
    #[serde(default)]
    pub longitud: Option<RawCoord>,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),
    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },
    #[error("failed to read regions file {path}: {source}")]
    RegionsFileIo {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse regions file: {0}")]
    RegionsFileParse(#[from] serde_yaml::Error),
    #[error("invalid regions data: {0}")]
    Validation(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_coord_deserializes_numbers() {
        let v: RawCoord = serde_json::from_str("-28.4696").expect("numeric coord");
        assert_eq!(v, RawCoord::Num(-28.4696));
    }

    #[test]
    fn raw_coord_deserializes_comma_strings() {
        let v: RawCoord = serde_json::from_str("\"-28,4696\"").expect("string coord");
        assert_eq!(v, RawCoord::Text("-28,4696".to_string()));
    }

    #[test]
    fn prestador_tolerates_missing_optional_fields() {
        let row: Prestador =
            serde_json::from_str(r#"{"id": 7, "nombre": "Dr. Pérez"}"#).expect("sparse row");
        assert_eq!(row.id, 7);
        assert!(row.latitud.is_none());
        assert!(row.provincia.is_none());
    }

    #[test]
    fn prestador_accepts_mixed_coordinate_representations() {
        let row: Prestador = serde_json::from_str(
            r#"{"id": 1, "nombre": "CEM", "latitud": -34.6, "longitud": "-58,38"}"#,
        )
        .expect("mixed coords");
        assert_eq!(row.latitud, Some(RawCoord::Num(-34.6)));
        assert_eq!(row.longitud, Some(RawCoord::Text("-58,38".to_string())));
    }
}
