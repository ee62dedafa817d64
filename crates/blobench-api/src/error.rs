use thiserror::Error;

/// Top-level error type for the `blobench-api` crate.
///
/// Covers transport failures, Grafana API errors, response decoding, and the
/// one-time provisioning bootstrap. `blobench-core` maps these into its own
/// query-error variant.
#[derive(Debug, Error)]
pub enum ApiError {
    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error (connection refused, DNS failure, etc.)
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Credential material could not be turned into a request header.
    #[error("Invalid credential: {message}")]
    InvalidCredential { message: String },

    // ── Grafana API ─────────────────────────────────────────────────
    /// Non-success status from the Grafana HTTP API.
    #[error("Grafana API error (HTTP {status}): {message}")]
    Api { status: u16, message: String },

    // ── Data ────────────────────────────────────────────────────────
    /// JSON deserialization failed, with the raw body for debugging.
    #[error("Deserialization error: {message}")]
    Deserialization { message: String, body: String },

    // ── Provisioning ────────────────────────────────────────────────
    /// Service-account / token / datasource bootstrap failed.
    #[error("Provisioning failed: {message}")]
    Provisioning { message: String },
}

impl ApiError {
    /// Returns `true` if this is a transient error worth retrying.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(e) => e.is_timeout() || e.is_connect(),
            _ => false,
        }
    }
}
