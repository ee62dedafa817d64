//! Validator-duty probes: failed attestations and failed proposals.
//!
//! Both follow the same shape: find series with bad-duty labels, extract
//! `(instance, pubkey)` pairs, dedupe by instance, and fail with the
//! affected node list attached when any remain.

use async_trait::async_trait;
use blobench_api::{ApiError, GrafanaClient, QueryResponse};

use super::{Category, Check, CheckConfig, CheckResult, ClientKind};

/// Classify a bad-duty query response: dedupe failing `(instance, pubkey)`
/// pairs by instance and build the pass/fail result.
fn classify_failing_validators(
    name: &'static str,
    response: &QueryResponse,
    query: &str,
    ok_description: &str,
    fail_description: &str,
) -> CheckResult {
    let pairs = response.label_pairs("instance", "pubkey");
    if pairs.is_empty() {
        return CheckResult::passing(name, Category::General, ok_description, query);
    }

    let mut affected_nodes: Vec<String> = Vec::new();
    let mut validator_details: Vec<String> = Vec::with_capacity(pairs.len());
    for (instance, pubkey) in &pairs {
        if !affected_nodes.iter().any(|n| n == instance) {
            affected_nodes.push(instance.clone());
        }
        validator_details.push(format!("instance: {instance}, pubkey: {pubkey}"));
    }

    CheckResult::failing(name, Category::General, fail_description, query, affected_nodes)
        .with_detail("failing_validators", validator_details.join("\n"))
}

/// Verifies no validators are failing attestations.
pub struct FailedAttestationsCheck;

#[async_trait]
impl Check for FailedAttestationsCheck {
    fn name(&self) -> &'static str {
        "validators failing attestations"
    }

    fn category(&self) -> Category {
        Category::General
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
            r#"validator_failed_attestations{{network=~"{}", client_name=~"{}"}} > 0"#,
            config.network, config.consensus_client,
        );
        let response = grafana.query(&query).await?;

        Ok(classify_failing_validators(
            self.name(),
            &response,
            &query,
            "All validators are attesting properly",
            "Some validators are failing attestations",
        ))
    }
}

/// Verifies no validators are failing block proposals.
pub struct FailedProposalsCheck;

#[async_trait]
impl Check for FailedProposalsCheck {
    fn name(&self) -> &'static str {
        "validators failing proposals"
    }

    fn category(&self) -> Category {
        Category::General
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
            r#"validator_failed_proposals{{network=~"{}", client_name=~"{}"}} > 0"#,
            config.network, config.consensus_client,
        );
        let response = grafana.query(&query).await?;

        Ok(classify_failing_validators(
            self.name(),
            &response,
            &query,
            "All validators are proposing properly",
            "Some validators are failing proposals",
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::classify_failing_validators;
    use crate::checks::CheckStatus;

    fn response(json: serde_json::Value) -> blobench_api::QueryResponse {
        serde_json::from_value(json).unwrap()
    }

    #[test]
    fn empty_response_passes() {
        let resp = response(serde_json::json!({ "results": {} }));
        let result =
            classify_failing_validators("t", &resp, "q", "all good", "some bad");
        assert_eq!(result.status, CheckStatus::Ok);
        assert!(result.affected_nodes.is_empty());
        assert_eq!(result.description, "all good");
    }

    #[test]
    fn two_pubkeys_on_one_instance_yield_one_affected_node() {
        let resp = response(serde_json::json!({
            "results": { "A": { "frames": [
                { "schema": { "fields": [
                    { "labels": { "instance": "cl-1-prysm-geth", "pubkey": "0xaa" } },
                    { "labels": { "instance": "cl-1-prysm-geth", "pubkey": "0xbb" } },
                ]}},
            ]}}
        }));

        let result =
            classify_failing_validators("t", &resp, "q", "all good", "some bad");
        assert_eq!(result.status, CheckStatus::Fail);
        assert_eq!(result.affected_nodes, vec!["cl-1-prysm-geth"]);

        let details = result.details["failing_validators"].as_str().unwrap();
        assert!(details.contains("0xaa"));
        assert!(details.contains("0xbb"));
    }

    #[test]
    fn distinct_instances_each_reported_once_in_order() {
        let resp = response(serde_json::json!({
            "results": { "A": { "frames": [
                { "schema": { "fields": [
                    { "labels": { "instance": "cl-2", "pubkey": "0xaa" } },
                    { "labels": { "instance": "cl-1", "pubkey": "0xbb" } },
                    { "labels": { "instance": "cl-2", "pubkey": "0xcc" } },
                ]}},
            ]}}
        }));

        let result =
            classify_failing_validators("t", &resp, "q", "all good", "some bad");
        assert_eq!(result.affected_nodes, vec!["cl-2", "cl-1"]);
    }
}
