//! Consensus-layer probes: sync status, head-slot progress, finalization.
//!
//! Each finds series whose labels implicate an unhealthy node; the distinct
//! `instance` labels become the affected-node list.

use async_trait::async_trait;
use blobench_api::{ApiError, GrafanaClient};

use super::{Category, Check, CheckConfig, CheckResult, ClientKind};

/// Build a pass/fail result from the distinct instances a query matched.
pub(super) fn classify_matched_instances(
    name: &'static str,
    category: Category,
    response: &blobench_api::QueryResponse,
    query: &str,
    ok_description: &str,
    fail_description: &str,
) -> CheckResult {
    let affected = response.distinct_label_values("instance");
    if affected.is_empty() {
        CheckResult::passing(name, category, ok_description, query)
    } else {
        CheckResult::failing(name, category, fail_description, query, affected)
    }
}

/// Verifies consensus nodes report themselves synced.
pub struct SyncCheck;

#[async_trait]
impl Check for SyncCheck {
    fn name(&self) -> &'static str {
        "consensus node syncing"
    }

    fn category(&self) -> Category {
        Category::Sync
    }

    fn client_kind(&self) -> ClientKind {
        ClientKind::Consensus
    }

    async fn run(
        &self,
        grafana: &GrafanaClient,
        config: &CheckConfig,
    ) -> Result<CheckResult, ApiError> {
        let query = format!(
            r#"eth_con_sync_is_syncing{{network=~"{}", client_name=~"{}"}} == 1"#,
            config.network, config.consensus_client,
        );
        let response = grafana.query(&query).await?;

        Ok(classify_matched_instances(
            self.name(),
            self.category(),
            &response,
            &query,
            "All consensus nodes are synced",
            "Some consensus nodes are still syncing",
        ))
    }
}

/// Verifies the head slot keeps advancing on every consensus node.
pub struct HeadSlotCheck;

#[async_trait]
impl Check for HeadSlotCheck {
    fn name(&self) -> &'static str {
        "head slot advancing"
    }

    fn category(&self) -> Category {
        Category::Sync
    }

    fn client_kind(&self) -> ClientKind {
        ClientKind::Consensus
    }

    async fn run(
        &self,
        grafana: &GrafanaClient,
        config: &CheckConfig,
    ) -> Result<CheckResult, ApiError> {
        let query = format!(
            r#"increase(eth_con_head_slot{{network=~"{}", client_name=~"{}"}}[2m]) == 0"#,
            config.network, config.consensus_client,
        );
        let response = grafana.query(&query).await?;

        Ok(classify_matched_instances(
            self.name(),
            self.category(),
            &response,
            &query,
            "Head slot is advancing on all consensus nodes",
            "Head slot is stalled on some consensus nodes",
        ))
    }
}

/// Verifies no consensus node's finalized epoch lags the network head.
pub struct FinalizedEpochCheck;

#[async_trait]
impl Check for FinalizedEpochCheck {
    fn name(&self) -> &'static str {
        "finalized epoch lagging"
    }

    fn category(&self) -> Category {
        Category::Sync
    }

    fn client_kind(&self) -> ClientKind {
        ClientKind::Consensus
    }

    async fn run(
        &self,
        grafana: &GrafanaClient,
        config: &CheckConfig,
    ) -> Result<CheckResult, ApiError> {
        let query = format!(
            r#"(max(eth_con_finalized_epoch{{network=~"{net}"}}) - eth_con_finalized_epoch{{network=~"{net}", client_name=~"{client}"}}) > 2"#,
            net = config.network,
            client = config.consensus_client,
        );
        let response = grafana.query(&query).await?;

        Ok(classify_matched_instances(
            self.name(),
            self.category(),
            &response,
            &query,
            "Finalization is keeping up on all consensus nodes",
            "Finalization is lagging on some consensus nodes",
        ))
    }
}
