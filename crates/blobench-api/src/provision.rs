// One-time Grafana bootstrap: datasource discovery and service-account
// token creation.
//
// Used only when the operator has not supplied GRAFANA_API_TOKEN /
// GRAFANA_DATASOURCE_ID. All calls authenticate with the Grafana admin
// account (basic auth), which a freshly provisioned test stack exposes.

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::info;
use url::Url;

use crate::client::{handle_response, normalize_base_url, parse_error};
use crate::error::ApiError;
use crate::transport::TransportConfig;
use crate::types::Datasource;

const SERVICE_ACCOUNT_NAME: &str = "benchmarks";

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ServiceAccountRequest<'a> {
    name: &'a str,
    role: &'a str,
    is_disabled: bool,
}

#[derive(Deserialize)]
struct ServiceAccountResponse {
    id: i64,
}

#[derive(Serialize)]
struct TokenRequest<'a> {
    name: &'a str,
}

#[derive(Deserialize)]
struct TokenResponse {
    key: String,
}

/// Admin-authenticated client for the provisioning endpoints.
pub struct Provisioner {
    http: reqwest::Client,
    base_url: Url,
    admin_user: String,
    admin_password: SecretString,
}

impl Provisioner {
    pub fn new(
        base_url: &str,
        admin_user: impl Into<String>,
        admin_password: SecretString,
        transport: &TransportConfig,
    ) -> Result<Self, ApiError> {
        Ok(Self {
            http: transport.build_client()?,
            base_url: normalize_base_url(base_url)?,
            admin_user: admin_user.into(),
            admin_password,
        })
    }

    /// Discover the UID of the first configured datasource.
    ///
    /// The test stack provisions exactly one Prometheus datasource, so
    /// "first" is unambiguous in practice.
    pub async fn datasource_uid(&self) -> Result<String, ApiError> {
        let url = self.url("api/datasources");
        info!(%url, "listing grafana datasources");

        let resp = self
            .http
            .get(url)
            .basic_auth(&self.admin_user, Some(self.admin_password.expose_secret()))
            .send()
            .await?;
        let datasources: Vec<Datasource> = handle_response(resp).await?;

        let first = datasources.first().ok_or_else(|| ApiError::Provisioning {
            message: "no datasources found".into(),
        })?;

        info!(uid = %first.uid, name = %first.name, kind = %first.kind, "using datasource");
        Ok(first.uid.clone())
    }

    /// Create the `benchmarks` service account and mint a token for it.
    ///
    /// Returns the token secret. The account is created as a Viewer; a
    /// token-mint failure after account creation surfaces as an error and
    /// leaves the account behind for the next run to reuse-by-recreate.
    pub async fn service_account_token(&self) -> Result<SecretString, ApiError> {
        let account_id = self.create_service_account().await?;
        self.create_token(account_id).await
    }

    async fn create_service_account(&self) -> Result<i64, ApiError> {
        let url = self.url("api/serviceaccounts");
        info!(name = SERVICE_ACCOUNT_NAME, "creating grafana service account");

        let resp = self
            .http
            .post(url)
            .basic_auth(&self.admin_user, Some(self.admin_password.expose_secret()))
            .json(&ServiceAccountRequest {
                name: SERVICE_ACCOUNT_NAME,
                role: "Viewer",
                is_disabled: false,
            })
            .send()
            .await?;

        // The API answers 201 on creation; anything else (409 for an
        // existing account included) is surfaced to the operator.
        let status = resp.status();
        if status != reqwest::StatusCode::CREATED {
            return Err(parse_error(status, resp).await);
        }

        let account: ServiceAccountResponse = handle_response(resp).await?;
        Ok(account.id)
    }

    async fn create_token(&self, account_id: i64) -> Result<SecretString, ApiError> {
        let url = self.url(&format!("api/serviceaccounts/{account_id}/tokens"));
        info!(account_id, "creating grafana service account token");

        let resp = self
            .http
            .post(url)
            .basic_auth(&self.admin_user, Some(self.admin_password.expose_secret()))
            .json(&TokenRequest {
                name: SERVICE_ACCOUNT_NAME,
            })
            .send()
            .await?;

        let token: TokenResponse = handle_response(resp).await?;
        Ok(SecretString::from(token.key))
    }

    fn url(&self, path: &str) -> Url {
        self.base_url
            .join(path)
            .expect("path should be valid relative URL")
    }
}
