//! `min-bandwidth` command: wire up the collaborators, run the degradation
//! controller on its own task, and always restore the target's unshaped
//! network state afterwards.

use secrecy::SecretString;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use blobench_api::{GrafanaClient, Provisioner, TransportConfig};
use blobench_config::Config;
use blobench_core::{
    Bandwidth, CheckConfig, CheckRunner, DegradationConfig, MinBandwidthTest, TrafficShaper,
    checks::register_default_checks,
};

use crate::cli::{GlobalOpts, MinBandwidthArgs};
use crate::error::CliError;
use crate::kurtosis::{self, KurtosisExec};

pub async fn handle(args: MinBandwidthArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let cfg = Config::load(global.config.as_deref())?;

    // Validate flags before touching the enclave.
    let config = DegradationConfig::new(
        Bandwidth::from_mbit(args.bandwidth_mbit),
        Bandwidth::from_mbit(args.floor_mbit),
        args.decay_percent,
        args.blobs,
    )?;
    let timing = cfg.epoch_timing()?;

    let enclave = global
        .enclave
        .clone()
        .unwrap_or_else(|| cfg.target.enclave.clone());
    let service = global
        .service
        .clone()
        .unwrap_or_else(|| cfg.target.service.clone());

    info!(%enclave, %service, "starting min-bandwidth test");

    let exec = KurtosisExec::new(&enclave, &service);
    let grafana = build_grafana_client(&cfg, &enclave).await?;

    let mut runner = CheckRunner::new(CheckConfig {
        network: cfg.target.network.clone(),
        consensus_client: cfg.target.consensus_client.clone(),
        execution_client: cfg.target.execution_client.clone(),
        blobs_per_block: args.blobs,
    });
    register_default_checks(&mut runner);

    let mut test = MinBandwidthTest::new(
        config,
        timing,
        TrafficShaper::new(exec.clone()),
        runner,
        grafana,
    );

    // The controller runs on its own task; this one just waits for either
    // a user interrupt or completion, then performs cleanup.
    let cancel = CancellationToken::new();
    let task_cancel = cancel.clone();
    let mut test_task = tokio::spawn(async move { test.run(&task_cancel).await });

    let joined = tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("stopping test...");
            cancel.cancel();
            (&mut test_task).await
        }
        joined = &mut test_task => joined,
    };

    // Cleanup is scoped here, not in the controller: whatever the outcome,
    // the target gets its unshaped network back. Best-effort only.
    info!("cleaning up bandwidth controls...");
    let cleanup = TrafficShaper::new(exec);
    if let Err(e) = cleanup.remove_all().await {
        warn!(error = %e, "bandwidth control cleanup reported errors");
    }

    let outcome = joined
        .map_err(|e| CliError::Internal(format!("test task failed: {e}")))??;

    info!(
        reason = %outcome.reason,
        final_bandwidth = %outcome.final_bandwidth,
        reductions = outcome.reductions,
        epochs = outcome.epochs_elapsed,
        "test finished"
    );

    if !global.quiet {
        println!("test terminated: {}", outcome.reason);
        println!(
            "last applied upload bandwidth: {} after {} reductions over {} epochs",
            outcome.final_bandwidth, outcome.reductions, outcome.epochs_elapsed
        );
    }

    Ok(())
}

/// Resolve endpoint + credentials and build the query client.
///
/// Endpoint comes from config or `kurtosis port print`; token and
/// datasource come from the environment/config or, failing that, a
/// one-time provisioning bootstrap through the Grafana admin account.
async fn build_grafana_client(cfg: &Config, enclave: &str) -> Result<GrafanaClient, CliError> {
    let base_url = match &cfg.grafana.base_url {
        Some(url) => url.clone(),
        None => kurtosis::grafana_base_url(enclave).await?,
    };
    info!(%base_url, "resolved grafana endpoint");

    let transport = TransportConfig::default();

    let (token, datasource) = match (cfg.grafana_token(), cfg.grafana_datasource_id()) {
        (Some(token), Some(datasource)) => (token, datasource),
        (token, datasource) => {
            let provisioner = Provisioner::new(
                &base_url,
                cfg.grafana.admin_user.clone(),
                SecretString::from(cfg.grafana.admin_password.clone()),
                &transport,
            )?;

            let token = match token {
                Some(token) => token,
                None => {
                    let minted = provisioner.service_account_token().await?;
                    info!("created grafana service account token");
                    minted
                }
            };
            let datasource = match datasource {
                Some(datasource) => datasource,
                None => {
                    let uid = provisioner.datasource_uid().await?;
                    info!(%uid, "discovered grafana datasource");
                    uid
                }
            };
            (token, datasource)
        }
    };

    Ok(GrafanaClient::new(&base_url, &token, datasource, &transport)?)
}
