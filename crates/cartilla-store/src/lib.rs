//! Async client for the hosted directory store (PostgREST conventions).
//!
//! The store has no geospatial query capability; this crate only covers
//! filter-by-field reads with pagination. Radius filtering and clustering
//! happen in `cartilla-geo` after the fetch.

mod client;
mod error;
mod queries;
mod retry;

pub use client::{Filter, FilterOp, StoreClient, DEFAULT_FETCH_CAP, DEFAULT_PAGE_SIZE};
pub use error::StoreError;
pub use queries::{
    fetch_prestadores, search_localidades, LOCALIDADES_TABLE, PRESTADORES_TABLE,
};
