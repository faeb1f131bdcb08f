use thiserror::Error;

/// Errors returned by the store client.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Network or TLS failure from the underlying HTTP client.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The store answered with a non-2xx status; the message is the store's
    /// own, surfaced verbatim to callers.
    #[error("store error (status {status}): {message}")]
    Api { status: u16, message: String },

    /// The response body could not be deserialized into the expected type.
    #[error("JSON deserialization error for {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    /// The configured store base URL is not a valid URL.
    #[error("invalid store base URL '{0}'")]
    InvalidBaseUrl(String),
}
