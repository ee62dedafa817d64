//! Kurtosis-backed implementation of the remote-exec seam.
//!
//! The enclave runtime is an external collaborator: commands run through
//! `kurtosis service exec`, and the Grafana endpoint resolves through
//! `kurtosis port print`. Non-zero exits of the *remote* command surface as
//! `ExecOutput`; failures to run the `kurtosis` binary itself are dispatch
//! errors.

use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;

use blobench_core::{ExecError, ExecOutput, RemoteExec};

/// Executes commands inside one enclave service via the `kurtosis` CLI.
#[derive(Debug, Clone)]
pub struct KurtosisExec {
    enclave: String,
    service: String,
}

impl KurtosisExec {
    pub fn new(enclave: impl Into<String>, service: impl Into<String>) -> Self {
        Self {
            enclave: enclave.into(),
            service: service.into(),
        }
    }
}

#[async_trait]
impl RemoteExec for KurtosisExec {
    async fn exec(&self, argv: &[&str]) -> Result<ExecOutput, ExecError> {
        let command = argv.join(" ");
        debug!(enclave = %self.enclave, service = %self.service, %command, "kurtosis service exec");

        let output = Command::new("kurtosis")
            .args(["service", "exec", &self.enclave, &self.service, &command])
            .output()
            .await
            .map_err(|e| ExecError::new(format!("failed to run kurtosis service exec: {e}")))?;

        let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
        combined.push_str(&String::from_utf8_lossy(&output.stderr));

        Ok(ExecOutput {
            exit_code: output.status.code().unwrap_or(-1),
            output: combined,
        })
    }
}

/// Resolve the public Grafana base URL of an enclave.
pub async fn grafana_base_url(enclave: &str) -> Result<String, ExecError> {
    let output = Command::new("kurtosis")
        .args(["port", "print", enclave, "grafana", "http"])
        .output()
        .await
        .map_err(|e| ExecError::new(format!("failed to run kurtosis port print: {e}")))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(ExecError::new(format!(
            "kurtosis port print failed for enclave '{enclave}': {}",
            stderr.trim()
        )));
    }

    let url = String::from_utf8_lossy(&output.stdout).trim().to_owned();
    if url.is_empty() {
        return Err(ExecError::new(format!(
            "kurtosis reported no grafana http port for enclave '{enclave}'"
        )));
    }

    Ok(url)
}
