//! Thin typed query helpers over [`StoreClient`] for the two tables this
//! system reads.

use cartilla_core::{Localidad, Prestador};

use crate::client::{Filter, StoreClient};
use crate::error::StoreError;

pub const PRESTADORES_TABLE: &str = "prestadores";
pub const LOCALIDADES_TABLE: &str = "localidades";

/// Fetch the provider directory, optionally narrowed by specialty and/or
/// provider name (`ilike` substring matches), up to `cap` rows.
///
/// # Errors
///
/// Propagates [`StoreError`] from the underlying fetch.
pub async fn fetch_prestadores(
    client: &StoreClient,
    especialidad: Option<&str>,
    nombre: Option<&str>,
    cap: usize,
) -> Result<Vec<Prestador>, StoreError> {
    let mut filters = Vec::new();
    if let Some(term) = especialidad.map(str::trim).filter(|t| !t.is_empty()) {
        filters.push(Filter::ilike("especialidad", term));
    }
    if let Some(term) = nombre.map(str::trim).filter(|t| !t.is_empty()) {
        filters.push(Filter::ilike("nombre", term));
    }
    client.fetch_all(PRESTADORES_TABLE, &filters, cap).await
}

/// Search localities by name (`ilike` substring match).
///
/// # Errors
///
/// Propagates [`StoreError`] from the underlying query.
pub async fn search_localidades(
    client: &StoreClient,
    term: &str,
    limit: usize,
) -> Result<Vec<Localidad>, StoreError> {
    let filters = [Filter::ilike("nombre", term.trim())];
    client.query(LOCALIDADES_TABLE, &filters, limit, 0).await
}
