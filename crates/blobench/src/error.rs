//! CLI error types with miette diagnostics.
//!
//! Maps core, config, and API errors into user-facing diagnostics with
//! actionable help text and stable exit codes. Setup failures are fatal;
//! normal completion and user interrupt both exit zero.

use miette::Diagnostic;
use thiserror::Error;

use blobench_core::CoreError;

/// Exit codes for process termination.
pub mod exit_code {
    pub const SUCCESS: i32 = 0;
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const SETUP: i32 = 3;
    pub const CONNECTION: i32 = 7;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Environment / setup ──────────────────────────────────────────

    #[error("Test setup failed: {message}")]
    #[diagnostic(
        code(blobench::setup_failed),
        help(
            "Check that the Kurtosis enclave is running and the target\n\
             service exists. List enclaves with: kurtosis enclave ls"
        )
    )]
    Setup { message: String },

    #[error("Could not reach the metrics backend: {message}")]
    #[diagnostic(
        code(blobench::metrics_unreachable),
        help(
            "Verify the Grafana service is up in the enclave, or point\n\
             grafana.base_url / GRAFANA_API_TOKEN at a reachable instance."
        )
    )]
    MetricsBackend { message: String },

    // ── Validation ───────────────────────────────────────────────────

    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(blobench::validation))]
    Validation { field: String, reason: String },

    // ── Unimplemented ────────────────────────────────────────────────

    #[error("'{feature}' is not yet implemented")]
    #[diagnostic(
        code(blobench::not_implemented),
        help("Only min-bandwidth is available in this release.")
    )]
    NotYetImplemented { feature: String },

    // ── Configuration ────────────────────────────────────────────────

    #[error(transparent)]
    #[diagnostic(code(blobench::config))]
    Config(#[from] blobench_config::ConfigError),

    // ── Internal ─────────────────────────────────────────────────────

    #[error("Internal error: {0}")]
    #[diagnostic(code(blobench::internal))]
    Internal(String),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Setup { .. } => exit_code::SETUP,
            Self::MetricsBackend { .. } => exit_code::CONNECTION,
            Self::Validation { .. } | Self::NotYetImplemented { .. } => exit_code::USAGE,
            _ => exit_code::GENERAL,
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::InvalidConfig { reason } => CliError::Validation {
                field: "degradation config".into(),
                reason,
            },
            CoreError::Query(api) => CliError::MetricsBackend {
                message: api.to_string(),
            },
            // Shaping and exec failures that escape the controller are
            // setup-phase by construction; steady-state ones are logged
            // and swallowed inside the decay loop.
            other => CliError::Setup {
                message: other.to_string(),
            },
        }
    }
}

impl From<blobench_api::ApiError> for CliError {
    fn from(err: blobench_api::ApiError) -> Self {
        CliError::MetricsBackend {
            message: err.to_string(),
        }
    }
}

impl From<blobench_core::ExecError> for CliError {
    fn from(err: blobench_core::ExecError) -> Self {
        CliError::Setup {
            message: err.to_string(),
        }
    }
}
