//! Pluggable geographic reference data for Argentine provinces.
//!
//! The store's own geographic reference table has known-bad coordinates for
//! several provincial capitals, and province names arrive in many spellings
//! ("CABA", "Capital Federal", "C.A.B.A."). This module owns the lookup
//! tables that paper over both problems: alias → canonical province,
//! canonical province → administrative centroid (plus optional sub-cluster
//! anchors and a plausible coordinate span), and locality name → trusted
//! capital coordinates.
//!
//! Tables load from YAML (`config/regions.yaml`) so they can be updated
//! without a code change; [`RegionTable::argentina`] is the compiled-in
//! fallback dataset.

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::ConfigError;

/// A bare coordinate pair used by the reference tables.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lon: f64,
}

/// A labeled anchor coordinate used for sub-cluster assignment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamedPoint {
    pub label: String,
    pub lat: f64,
    pub lon: f64,
}

/// Reference data for one province.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProvinceRef {
    pub name: String,
    #[serde(default)]
    pub aliases: Vec<String>,
    pub centroid: GeoPoint,
    /// Hardcoded sub-cluster anchors for high-volume provinces. Provinces
    /// without anchors get bounding-box midpoints computed from the data.
    #[serde(default)]
    pub anchors: Vec<NamedPoint>,
    /// Largest believable lat/lon span for this province, in degrees.
    /// Only compact regions set this; a capital district spanning 2° of
    /// latitude means the underlying rows are mis-geocoded.
    #[serde(default)]
    pub plausible_span_degrees: Option<f64>,
}

/// Trusted coordinates for a locality, overriding the store's geodata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorrectionEntry {
    pub name: String,
    pub lat: f64,
    pub lon: f64,
}

/// On-disk shape of `regions.yaml`.
#[derive(Debug, Deserialize)]
pub struct RegionsFile {
    pub fallback_centroid: GeoPoint,
    pub provinces: Vec<ProvinceRef>,
    #[serde(default)]
    pub corrections: Vec<CorrectionEntry>,
}

/// Indexed, validated view over [`RegionsFile`].
#[derive(Debug, Clone)]
pub struct RegionTable {
    fallback_centroid: GeoPoint,
    provinces: Vec<ProvinceRef>,
    by_key: HashMap<String, usize>,
    corrections: HashMap<String, GeoPoint>,
}

impl RegionTable {
    /// Load and validate the regions table from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the file cannot be read, parsed, or fails
    /// validation.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::RegionsFileIo {
            path: path.display().to_string(),
            source: e,
        })?;
        Self::from_yaml_str(&content)
    }

    /// Parse and validate a regions table from YAML text.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` on parse or validation failure.
    pub fn from_yaml_str(content: &str) -> Result<Self, ConfigError> {
        let file: RegionsFile = serde_yaml::from_str(content)?;
        Self::from_file(file)
    }

    /// Build the indexed table from an already-parsed [`RegionsFile`].
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Validation` on empty names, out-of-range
    /// coordinates, or duplicate alias keys.
    pub fn from_file(file: RegionsFile) -> Result<Self, ConfigError> {
        validate_regions(&file)?;

        let mut by_key = HashMap::new();
        for (idx, province) in file.provinces.iter().enumerate() {
            by_key.insert(fold_key(&province.name), idx);
            for alias in &province.aliases {
                by_key.insert(fold_key(alias), idx);
            }
        }

        let corrections = file
            .corrections
            .iter()
            .map(|c| {
                (
                    fold_key(&c.name),
                    GeoPoint {
                        lat: c.lat,
                        lon: c.lon,
                    },
                )
            })
            .collect();

        Ok(Self {
            fallback_centroid: file.fallback_centroid,
            provinces: file.provinces,
            by_key,
            corrections,
        })
    }

    /// Resolve a raw province label to its reference entry.
    ///
    /// Matching is case- and accent-insensitive and ignores dots, so
    /// "C.A.B.A.", "caba" and "Capital Federal" all resolve to the same
    /// province.
    #[must_use]
    pub fn canonical(&self, raw: &str) -> Option<&ProvinceRef> {
        self.by_key.get(&fold_key(raw)).map(|&i| &self.provinces[i])
    }

    /// Centroid used when a region label resolves to no known province.
    #[must_use]
    pub fn fallback_centroid(&self) -> GeoPoint {
        self.fallback_centroid
    }

    /// Trusted coordinates for a locality name, when the correction table
    /// has an entry for it.
    #[must_use]
    pub fn correction_for(&self, locality_name: &str) -> Option<GeoPoint> {
        self.corrections.get(&fold_key(locality_name)).copied()
    }

    /// All known provinces, in table order.
    #[must_use]
    pub fn provinces(&self) -> &[ProvinceRef] {
        &self.provinces
    }

    /// Compiled-in reference dataset for Argentina: the 23 provinces plus
    /// CABA, capital corrections for the entries known to be bad in the
    /// store, and sub-cluster anchors for the two highest-volume regions.
    #[must_use]
    pub fn argentina() -> Self {
        let file = RegionsFile {
            // Geographic center of Argentina, used for unrecognized regions.
            fallback_centroid: GeoPoint {
                lat: -38.4161,
                lon: -63.6167,
            },
            provinces: argentina_provinces(),
            corrections: argentina_corrections(),
        };
        Self::from_file(file).expect("compiled-in Argentina dataset must validate")
    }
}

/// Normalize a label for table lookup: lowercase, accents folded, dots and
/// commas dropped, whitespace collapsed.
#[must_use]
pub fn fold_key(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut pending_space = false;
    for c in raw.trim().to_lowercase().chars() {
        let folded = match c {
            'á' | 'à' | 'ä' | 'â' => 'a',
            'é' | 'è' | 'ë' | 'ê' => 'e',
            'í' | 'ì' | 'ï' | 'î' => 'i',
            'ó' | 'ò' | 'ö' | 'ô' => 'o',
            'ú' | 'ù' | 'ü' | 'û' => 'u',
            'ñ' => 'n',
            '.' | ',' => continue,
            c if c.is_whitespace() => {
                pending_space = true;
                continue;
            }
            c => c,
        };
        if pending_space && !out.is_empty() {
            out.push(' ');
        }
        pending_space = false;
        out.push(folded);
    }
    out
}

/// Generate a URL-safe slug from a display label.
#[must_use]
pub fn slug(label: &str) -> String {
    fold_key(label)
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' {
                c
            } else if c == ' ' {
                '-'
            } else {
                '\0'
            }
        })
        .filter(|&c| c != '\0')
        .collect::<String>()
        .split('-')
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("-")
}

fn validate_regions(file: &RegionsFile) -> Result<(), ConfigError> {
    let check_point = |context: &str, lat: f64, lon: f64| -> Result<(), ConfigError> {
        if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lon) {
            return Err(ConfigError::Validation(format!(
                "{context} has out-of-range coordinates ({lat}, {lon})"
            )));
        }
        Ok(())
    };

    check_point(
        "fallback centroid",
        file.fallback_centroid.lat,
        file.fallback_centroid.lon,
    )?;

    let mut seen_keys = HashMap::new();
    for province in &file.provinces {
        if province.name.trim().is_empty() {
            return Err(ConfigError::Validation(
                "province name must be non-empty".to_string(),
            ));
        }
        check_point(&province.name, province.centroid.lat, province.centroid.lon)?;
        for anchor in &province.anchors {
            check_point(&anchor.label, anchor.lat, anchor.lon)?;
        }

        for key in std::iter::once(&province.name).chain(&province.aliases) {
            let folded = fold_key(key);
            if let Some(owner) = seen_keys.insert(folded, province.name.clone()) {
                if owner != province.name {
                    return Err(ConfigError::Validation(format!(
                        "alias '{key}' of province '{}' collides with '{owner}'",
                        province.name
                    )));
                }
            }
        }
    }

    for correction in &file.corrections {
        if correction.name.trim().is_empty() {
            return Err(ConfigError::Validation(
                "correction name must be non-empty".to_string(),
            ));
        }
        check_point(&correction.name, correction.lat, correction.lon)?;
    }

    Ok(())
}

fn province(
    name: &str,
    aliases: &[&str],
    lat: f64,
    lon: f64,
    span: Option<f64>,
    anchors: Vec<NamedPoint>,
) -> ProvinceRef {
    ProvinceRef {
        name: name.to_string(),
        aliases: aliases.iter().map(|a| (*a).to_string()).collect(),
        centroid: GeoPoint { lat, lon },
        anchors,
        plausible_span_degrees: span,
    }
}

fn anchor(label: &str, lat: f64, lon: f64) -> NamedPoint {
    NamedPoint {
        label: label.to_string(),
        lat,
        lon,
    }
}

#[allow(clippy::too_many_lines)]
fn argentina_provinces() -> Vec<ProvinceRef> {
    vec![
        province(
            "Ciudad Autónoma de Buenos Aires",
            &[
                "caba",
                "capital federal",
                "capital",
                "ciudad de buenos aires",
                "cdad autonoma de buenos aires",
            ],
            -34.6037,
            -58.3816,
            Some(0.5),
            vec![
                anchor("CABA Centro", -34.6083, -58.3712),
                anchor("CABA Norte", -34.5627, -58.4566),
                anchor("CABA Oeste", -34.6345, -58.4638),
                anchor("CABA Sur", -34.6515, -58.4030),
            ],
        ),
        province(
            "Buenos Aires",
            &["bs as", "bsas", "pcia de buenos aires", "provincia de buenos aires", "gba"],
            -36.6769,
            -60.5588,
            None,
            vec![
                anchor("Buenos Aires Norte", -34.4587, -58.9137),
                anchor("Buenos Aires La Plata", -34.9215, -57.9545),
                anchor("Buenos Aires Atlántica", -38.0055, -57.5426),
                anchor("Buenos Aires Sur", -38.7196, -62.2724),
                anchor("Buenos Aires Noroeste", -34.5703, -60.9451),
            ],
        ),
        province("Catamarca", &[], -27.3358, -66.9476, None, vec![]),
        province("Chaco", &[], -26.3864, -60.7658, None, vec![]),
        province("Chubut", &[], -43.7886, -68.5267, None, vec![]),
        province("Córdoba", &["cba"], -32.1429, -63.8017, None, vec![]),
        province("Corrientes", &["ctes"], -28.7743, -57.8012, None, vec![]),
        province("Entre Ríos", &[], -32.0589, -59.2014, None, vec![]),
        province("Formosa", &[], -24.8950, -59.9324, None, vec![]),
        province("Jujuy", &[], -23.3201, -65.7643, None, vec![]),
        province("La Pampa", &[], -37.1316, -65.4466, None, vec![]),
        province("La Rioja", &[], -29.6857, -67.1817, None, vec![]),
        province("Mendoza", &["mza"], -34.6298, -68.5831, None, vec![]),
        province("Misiones", &[], -26.8754, -54.6516, None, vec![]),
        province("Neuquén", &["nqn"], -38.6417, -70.1185, None, vec![]),
        province("Río Negro", &[], -40.4057, -67.2294, None, vec![]),
        province("Salta", &[], -24.2992, -64.8142, None, vec![]),
        province("San Juan", &[], -30.8653, -68.8894, None, vec![]),
        province("San Luis", &[], -33.7577, -66.0281, None, vec![]),
        province("Santa Cruz", &[], -48.8155, -69.9557, None, vec![]),
        province("Santa Fe", &["sta fe"], -30.7069, -60.9499, None, vec![]),
        province(
            "Santiago del Estero",
            &["sgo del estero", "santiago"],
            -27.7824,
            -63.2523,
            None,
            vec![],
        ),
        province(
            "Tierra del Fuego",
            &["tierra del fuego antartida e islas del atlantico sur", "tdf"],
            -54.3000,
            -67.7000,
            None,
            vec![],
        ),
        province("Tucumán", &[], -26.9478, -65.3648, None, vec![]),
    ]
}

/// Capitals whose coordinates are wrong in the store's geographic table.
fn argentina_corrections() -> Vec<CorrectionEntry> {
    let correction = |name: &str, lat: f64, lon: f64| CorrectionEntry {
        name: name.to_string(),
        lat,
        lon,
    };
    vec![
        correction("San Fernando del Valle de Catamarca", -28.4696, -65.7852),
        correction("Santiago del Estero", -27.7834, -64.2642),
        correction("San Salvador de Jujuy", -24.1858, -65.2995),
        correction("Ushuaia", -54.8019, -68.3030),
        correction("Viedma", -40.8135, -62.9967),
        correction("Rawson", -43.3002, -65.1023),
        correction("Santa Rosa", -36.6167, -64.2833),
        correction("Formosa", -26.1775, -58.1781),
        correction("Resistencia", -27.4606, -58.9839),
        correction("San Luis", -33.2950, -66.3356),
    ]
}
