// Shared transport configuration for building reqwest::Client instances.
//
// The query client and the provisioner share timeout and header settings
// through this module, avoiding duplicated builder logic.

use std::time::Duration;

/// Shared transport configuration for building HTTP clients.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    pub timeout: Duration,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
        }
    }
}

impl TransportConfig {
    /// Build a `reqwest::Client` from this config.
    pub fn build_client(&self) -> Result<reqwest::Client, crate::error::ApiError> {
        self.builder().build().map_err(crate::error::ApiError::from)
    }

    /// Build a `reqwest::Client` with additional default headers.
    ///
    /// Used by [`GrafanaClient`](crate::GrafanaClient) to inject the
    /// `Authorization` bearer header on every request.
    pub fn build_client_with_headers(
        &self,
        headers: reqwest::header::HeaderMap,
    ) -> Result<reqwest::Client, crate::error::ApiError> {
        self.builder()
            .default_headers(headers)
            .build()
            .map_err(crate::error::ApiError::from)
    }

    fn builder(&self) -> reqwest::ClientBuilder {
        reqwest::Client::builder()
            .timeout(self.timeout)
            .user_agent("blobench/0.1.0")
    }
}
