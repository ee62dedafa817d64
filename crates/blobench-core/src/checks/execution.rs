//! Execution-layer probes: sync status and block-height progress.

use async_trait::async_trait;
use blobench_api::{ApiError, GrafanaClient};

use super::consensus::classify_matched_instances;
use super::{Category, Check, CheckConfig, CheckResult, ClientKind};

/// Verifies execution nodes report themselves synced.
pub struct SyncCheck;

#[async_trait]
impl Check for SyncCheck {
    fn name(&self) -> &'static str {
        "execution node syncing"
    }

    fn category(&self) -> Category {
        Category::Sync
    }

    fn client_kind(&self) -> ClientKind {
        ClientKind::Execution
    }

    async fn run(
        &self,
        grafana: &GrafanaClient,
        config: &CheckConfig,
    ) -> Result<CheckResult, ApiError> {
        let query = format!(
            r#"eth_exe_sync_is_syncing{{network=~"{}", client_name=~"{}"}} == 1"#,
            config.network, config.execution_client,
        );
        let response = grafana.query(&query).await?;

        Ok(classify_matched_instances(
            self.name(),
            self.category(),
            &response,
            &query,
            "All execution nodes are synced",
            "Some execution nodes are still syncing",
        ))
    }
}

/// Verifies no execution node's block height lags the network head.
pub struct BlockHeightCheck;

#[async_trait]
impl Check for BlockHeightCheck {
    fn name(&self) -> &'static str {
        "execution block height lagging"
    }

    fn category(&self) -> Category {
        Category::Sync
    }

    fn client_kind(&self) -> ClientKind {
        ClientKind::Execution
    }

    async fn run(
        &self,
        grafana: &GrafanaClient,
        config: &CheckConfig,
    ) -> Result<CheckResult, ApiError> {
        let query = format!(
            r#"(max(eth_exe_block_height{{network=~"{net}"}}) - eth_exe_block_height{{network=~"{net}", client_name=~"{client}"}}) > 3"#,
            net = config.network,
            client = config.execution_client,
        );
        let response = grafana.query(&query).await?;

        Ok(classify_matched_instances(
            self.name(),
            self.category(),
            &response,
            &query,
            "Block height is advancing on all execution nodes",
            "Block height is lagging on some execution nodes",
        ))
    }
}
