// Hand-crafted async HTTP client for Grafana's datasource-query API.
//
// Endpoint: POST /api/ds/query
// Auth: Authorization bearer token (service-account token)

use reqwest::header::{HeaderMap, HeaderValue};
use secrecy::ExposeSecret;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;
use url::Url;

use crate::error::ApiError;
use crate::transport::TransportConfig;
use crate::types::QueryResponse;

// ── Error response shape from the Grafana API ───────────────────────

#[derive(serde::Deserialize)]
struct ErrorResponse {
    #[serde(default)]
    message: Option<String>,
}

// ── Query request body ───────────────────────────────────────────────

#[derive(Serialize)]
struct QueryBody<'a> {
    queries: [QueryItem<'a>; 1],
    from: &'a str,
    to: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct QueryItem<'a> {
    ref_id: &'a str,
    expr: &'a str,
    instant: bool,
    datasource: DatasourceRef<'a>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct DatasourceRef<'a> {
    #[serde(rename = "type")]
    kind: &'a str,
    uid: &'a str,
}

// ── Client ───────────────────────────────────────────────────────────

/// Async client for Grafana's Prometheus datasource-query endpoint.
///
/// Issues instant queries against a fixed datasource UID and decodes the
/// frame/schema/field envelope into [`QueryResponse`].
pub struct GrafanaClient {
    http: reqwest::Client,
    base_url: Url,
    datasource_uid: String,
}

impl GrafanaClient {
    // ── Constructors ─────────────────────────────────────────────────

    /// Build from a service-account token, datasource UID, and transport
    /// config. Injects `Authorization: Bearer <token>` as a sensitive
    /// default header on every request.
    pub fn new(
        base_url: &str,
        token: &secrecy::SecretString,
        datasource_uid: impl Into<String>,
        transport: &TransportConfig,
    ) -> Result<Self, ApiError> {
        let mut headers = HeaderMap::new();
        let mut auth_value = HeaderValue::from_str(&format!("Bearer {}", token.expose_secret()))
            .map_err(|e| ApiError::InvalidCredential {
                message: format!("invalid API token header value: {e}"),
            })?;
        auth_value.set_sensitive(true);
        headers.insert(reqwest::header::AUTHORIZATION, auth_value);

        let http = transport.build_client_with_headers(headers)?;
        let base_url = normalize_base_url(base_url)?;

        Ok(Self {
            http,
            base_url,
            datasource_uid: datasource_uid.into(),
        })
    }

    /// Wrap an existing `reqwest::Client` (caller manages auth headers).
    pub fn from_reqwest(
        base_url: &str,
        http: reqwest::Client,
        datasource_uid: impl Into<String>,
    ) -> Result<Self, ApiError> {
        let base_url = normalize_base_url(base_url)?;
        Ok(Self {
            http,
            base_url,
            datasource_uid: datasource_uid.into(),
        })
    }

    /// The datasource UID queries are issued against.
    pub fn datasource_uid(&self) -> &str {
        &self.datasource_uid
    }

    // ── Queries ──────────────────────────────────────────────────────

    /// Run a single instant Prometheus query and decode the frame envelope.
    pub async fn query(&self, expr: &str) -> Result<QueryResponse, ApiError> {
        let url = self.url("api/ds/query");
        debug!(%url, expr, "grafana query");

        let body = QueryBody {
            queries: [QueryItem {
                ref_id: "A",
                expr,
                instant: true,
                datasource: DatasourceRef {
                    kind: "prometheus",
                    uid: &self.datasource_uid,
                },
            }],
            from: "now-5m",
            to: "now",
        };

        let resp = self.http.post(url).json(&body).send().await?;
        handle_response(resp).await
    }

    // ── URL builder ──────────────────────────────────────────────────

    /// Join a relative path (e.g. `"api/ds/query"`) onto the base URL.
    fn url(&self, path: &str) -> Url {
        // base_url always ends with `/`, so joining `api/…` works.
        self.base_url
            .join(path)
            .expect("path should be valid relative URL")
    }
}

/// Ensure the base URL ends with a single trailing slash so relative
/// joins behave.
pub(crate) fn normalize_base_url(raw: &str) -> Result<Url, ApiError> {
    let mut url = Url::parse(raw)?;
    let path = url.path().trim_end_matches('/').to_owned();
    url.set_path(&format!("{path}/"));
    Ok(url)
}

// ── Response handling ────────────────────────────────────────────────

pub(crate) async fn handle_response<T: DeserializeOwned>(
    resp: reqwest::Response,
) -> Result<T, ApiError> {
    let status = resp.status();
    if status.is_success() {
        let body = resp.text().await?;
        serde_json::from_str(&body).map_err(|e| {
            let preview = &body[..body.len().min(200)];
            ApiError::Deserialization {
                message: format!("{e} (body preview: {preview:?})"),
                body,
            }
        })
    } else {
        Err(parse_error(status, resp).await)
    }
}

pub(crate) async fn parse_error(status: reqwest::StatusCode, resp: reqwest::Response) -> ApiError {
    let raw = resp.text().await.unwrap_or_default();

    let message = serde_json::from_str::<ErrorResponse>(&raw)
        .ok()
        .and_then(|e| e.message)
        .unwrap_or_else(|| {
            if raw.is_empty() {
                status.to_string()
            } else {
                raw
            }
        });

    ApiError::Api {
        status: status.as_u16(),
        message,
    }
}

#[cfg(test)]
mod tests {
    use super::normalize_base_url;

    #[test]
    fn normalize_appends_single_trailing_slash() {
        let url = normalize_base_url("http://127.0.0.1:3000").unwrap();
        assert_eq!(url.as_str(), "http://127.0.0.1:3000/");

        let url = normalize_base_url("http://127.0.0.1:3000///").unwrap();
        assert_eq!(url.as_str(), "http://127.0.0.1:3000/");
    }
}
