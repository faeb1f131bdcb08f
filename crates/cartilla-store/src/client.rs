//! HTTP client for the hosted directory store.
//!
//! Wraps `reqwest` with the store's REST conventions: `rest/v1/{table}`
//! paths, `field=op.value` filter params, `apikey`/`Authorization` headers,
//! offset pagination, and transient-error retry. Errors surface the store's
//! own message so callers can relay it verbatim.

use std::time::Duration;

use reqwest::{Client, Url};
use serde::de::DeserializeOwned;

use crate::error::StoreError;
use crate::retry::retry_with_backoff;

/// Rows fetched per page by [`StoreClient::fetch_all`].
pub const DEFAULT_PAGE_SIZE: usize = 1000;

/// Safety cap on rows fetched by one logical [`StoreClient::fetch_all`]
/// call. The store paginates via offset/limit only; without a cap a bad
/// filter would walk the whole table.
pub const DEFAULT_FETCH_CAP: usize = 20_000;

const DEFAULT_MAX_RETRIES: u32 = 3;
const DEFAULT_BACKOFF_BASE_MS: u64 = 1_000;

/// Supported filter operators. The store exposes more; these are the only
/// ones this system uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOp {
    Eq,
    Ilike,
    NotNull,
}

/// One `field=op.value` query filter.
#[derive(Debug, Clone)]
pub struct Filter {
    pub field: String,
    pub op: FilterOp,
    pub value: String,
}

impl Filter {
    #[must_use]
    pub fn eq(field: &str, value: &str) -> Self {
        Self {
            field: field.to_string(),
            op: FilterOp::Eq,
            value: value.to_string(),
        }
    }

    /// Case-insensitive substring match; the value is wrapped in wildcards.
    #[must_use]
    pub fn ilike(field: &str, value: &str) -> Self {
        Self {
            field: field.to_string(),
            op: FilterOp::Ilike,
            value: value.to_string(),
        }
    }

    #[must_use]
    pub fn not_null(field: &str) -> Self {
        Self {
            field: field.to_string(),
            op: FilterOp::NotNull,
            value: String::new(),
        }
    }

    fn render(&self) -> (String, String) {
        let rendered = match self.op {
            FilterOp::Eq => format!("eq.{}", self.value),
            FilterOp::Ilike => format!("ilike.*{}*", self.value),
            FilterOp::NotNull => "not.is.null".to_string(),
        };
        (self.field.clone(), rendered)
    }
}

/// Client for the hosted directory store.
///
/// Use [`StoreClient::new`] for production or point `base_url` at a mock
/// server in tests.
pub struct StoreClient {
    client: Client,
    base_url: Url,
    api_key: String,
    max_retries: u32,
    backoff_base_ms: u64,
}

impl StoreClient {
    /// Creates a new client for the store at `base_url`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed, or [`StoreError::InvalidBaseUrl`] if
    /// `base_url` does not parse.
    pub fn new(base_url: &str, api_key: &str, timeout_secs: u64) -> Result<Self, StoreError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent("cartilla/0.1 (provider-directory)")
            .build()?;

        // Normalise: ensure the base URL ends with exactly one slash so that
        // join() appends rather than replacing the last path segment.
        let normalised = format!("{}/", base_url.trim_end_matches('/'));
        let base_url = Url::parse(&normalised)
            .map_err(|_| StoreError::InvalidBaseUrl(base_url.to_string()))?;

        Ok(Self {
            client,
            base_url,
            api_key: api_key.to_owned(),
            max_retries: DEFAULT_MAX_RETRIES,
            backoff_base_ms: DEFAULT_BACKOFF_BASE_MS,
        })
    }

    /// Override the retry policy (attempts beyond the first, base delay).
    #[must_use]
    pub fn with_retry_policy(mut self, max_retries: u32, backoff_base_ms: u64) -> Self {
        self.max_retries = max_retries;
        self.backoff_base_ms = backoff_base_ms;
        self
    }

    /// Fetch one page of rows from `table`.
    ///
    /// # Errors
    ///
    /// - [`StoreError::Api`] when the store answers non-2xx.
    /// - [`StoreError::Http`] on network failure.
    /// - [`StoreError::Deserialize`] if the body does not match `T`.
    pub async fn query<T: DeserializeOwned>(
        &self,
        table: &str,
        filters: &[Filter],
        limit: usize,
        offset: usize,
    ) -> Result<Vec<T>, StoreError> {
        let url = self.table_url(table, filters, limit, offset)?;
        retry_with_backoff(self.max_retries, self.backoff_base_ms, || {
            let url = url.clone();
            async move { self.request_rows(&url).await }
        })
        .await
    }

    /// Fetch every row matching `filters`, paging until a short page or the
    /// safety `cap`, whichever comes first.
    ///
    /// # Errors
    ///
    /// Same as [`StoreClient::query`]; the first failing page aborts the
    /// fetch.
    pub async fn fetch_all<T: DeserializeOwned>(
        &self,
        table: &str,
        filters: &[Filter],
        cap: usize,
    ) -> Result<Vec<T>, StoreError> {
        let mut rows: Vec<T> = Vec::new();
        loop {
            let remaining = cap.saturating_sub(rows.len());
            if remaining == 0 {
                tracing::warn!(table, cap, "fetch cap reached; result truncated");
                break;
            }
            let limit = remaining.min(DEFAULT_PAGE_SIZE);
            let page = self.query::<T>(table, filters, limit, rows.len()).await?;
            let page_len = page.len();
            rows.extend(page);
            if page_len < limit {
                break;
            }
        }
        Ok(rows)
    }

    /// Cheap reachability probe used by the health endpoint.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Api`] or [`StoreError::Http`] when the store
    /// is unreachable or refuses the request.
    pub async fn health(&self) -> Result<(), StoreError> {
        let url = self
            .base_url
            .join("rest/v1/")
            .map_err(|_| StoreError::InvalidBaseUrl(self.base_url.to_string()))?;
        let response = self
            .client
            .get(url)
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
            .send()
            .await?;
        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(StoreError::Api {
                status: status.as_u16(),
                message: response.text().await.unwrap_or_default(),
            })
        }
    }

    /// Builds the full table URL with filter, limit, and offset parameters.
    fn table_url(
        &self,
        table: &str,
        filters: &[Filter],
        limit: usize,
        offset: usize,
    ) -> Result<Url, StoreError> {
        let mut url = self
            .base_url
            .join(&format!("rest/v1/{table}"))
            .map_err(|_| StoreError::InvalidBaseUrl(self.base_url.to_string()))?;
        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("select", "*");
            for filter in filters {
                let (field, rendered) = filter.render();
                pairs.append_pair(&field, &rendered);
            }
            pairs.append_pair("limit", &limit.to_string());
            pairs.append_pair("offset", &offset.to_string());
        }
        Ok(url)
    }

    /// Sends a GET request and parses the response body as a row array.
    async fn request_rows<T: DeserializeOwned>(&self, url: &Url) -> Result<Vec<T>, StoreError> {
        let response = self
            .client
            .get(url.clone())
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(StoreError::Api {
                status: status.as_u16(),
                message: extract_store_message(&body),
            });
        }

        serde_json::from_str(&body).map_err(|e| StoreError::Deserialize {
            context: url.to_string(),
            source: e,
        })
    }
}

/// Pull the `"message"` field out of a store error body, falling back to
/// the raw body when it isn't the usual JSON shape.
fn extract_store_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v.get("message").and_then(|m| m.as_str()).map(String::from))
        .unwrap_or_else(|| body.trim().to_string())
}
