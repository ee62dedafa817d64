// blobench-api: Async Rust client for the Grafana metrics backend
// (Prometheus datasource queries + one-time provisioning bootstrap).

pub mod client;
pub mod error;
pub mod provision;
pub mod transport;
pub mod types;

pub use client::GrafanaClient;
pub use error::ApiError;
pub use provision::Provisioner;
pub use transport::TransportConfig;
pub use types::QueryResponse;
