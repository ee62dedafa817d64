// ── Health check registry and runner ──
//
// Probes are independent, stateless queries against the Grafana backend,
// classified by category and the client they observe. The runner executes
// them in registration order and aggregates verdicts into a report. A probe
// error aborts the whole run: a broken observability query makes the entire
// health picture untrustworthy.

pub mod consensus;
pub mod execution;
pub mod validator;

use std::collections::BTreeMap;
use std::fmt;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use blobench_api::{ApiError, GrafanaClient};

// ── Classification enums ────────────────────────────────────────────

/// Verdict of a single probe invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "UPPERCASE")]
pub enum CheckStatus {
    Ok,
    Fail,
    Skip,
    Error,
}

/// Probe category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum Category {
    General,
    Sync,
}

/// Which client a probe observes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum ClientKind {
    Consensus,
    Execution,
}

// ── Shared probe configuration ──────────────────────────────────────

/// Configuration shared by every probe in a run.
#[derive(Debug, Clone)]
pub struct CheckConfig {
    /// Network label probes match on (e.g. `kurtosis`).
    pub network: String,
    /// Consensus client identity (e.g. `prysm`).
    pub consensus_client: String,
    /// Execution client identity (e.g. `geth`).
    pub execution_client: String,
    /// Blobs per block the workload is configured for.
    pub blobs_per_block: u64,
}

// ── Results ─────────────────────────────────────────────────────────

/// Outcome of one probe invocation. Immutable after creation.
#[derive(Debug, Clone)]
pub struct CheckResult {
    pub name: String,
    pub category: Category,
    pub status: CheckStatus,
    pub description: String,
    pub timestamp: DateTime<Utc>,
    /// Distinct node identifiers implicated by the probe.
    pub affected_nodes: Vec<String>,
    /// Free-form diagnostic values (query text, failing series, ...).
    pub details: BTreeMap<String, serde_json::Value>,
}

impl CheckResult {
    /// Passing result carrying the query for diagnostics.
    pub fn passing(
        name: impl Into<String>,
        category: Category,
        description: impl Into<String>,
        query: &str,
    ) -> Self {
        Self {
            name: name.into(),
            category,
            status: CheckStatus::Ok,
            description: description.into(),
            timestamp: Utc::now(),
            affected_nodes: Vec::new(),
            details: BTreeMap::from([("query".into(), query.into())]),
        }
    }

    /// Failing result with the implicated nodes attached.
    pub fn failing(
        name: impl Into<String>,
        category: Category,
        description: impl Into<String>,
        query: &str,
        affected_nodes: Vec<String>,
    ) -> Self {
        Self {
            name: name.into(),
            category,
            status: CheckStatus::Fail,
            description: description.into(),
            timestamp: Utc::now(),
            affected_nodes,
            details: BTreeMap::from([("query".into(), query.into())]),
        }
    }

    pub fn with_detail(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.details.insert(key.into(), value.into());
        self
    }
}

/// Ordered sequence of probe results from one runner invocation.
#[derive(Debug, Clone, Default)]
pub struct CheckReport {
    results: Vec<CheckResult>,
}

impl CheckReport {
    pub fn results(&self) -> &[CheckResult] {
        &self.results
    }

    /// Overall verdict: failing if any individual result failed.
    pub fn failed(&self) -> bool {
        self.results.iter().any(|r| r.status == CheckStatus::Fail)
    }

    /// Textual summary: counts per status plus failing check names.
    pub fn analysis(&self) -> ReportAnalysis<'_> {
        ReportAnalysis { report: self }
    }
}

/// Lazily rendered summary of a [`CheckReport`].
pub struct ReportAnalysis<'a> {
    report: &'a CheckReport,
}

impl fmt::Display for ReportAnalysis<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let count = |status| {
            self.report
                .results
                .iter()
                .filter(|r| r.status == status)
                .count()
        };
        write!(
            f,
            "{} ok, {} failed, {} skipped, {} errored",
            count(CheckStatus::Ok),
            count(CheckStatus::Fail),
            count(CheckStatus::Skip),
            count(CheckStatus::Error),
        )?;

        let failing: Vec<&str> = self
            .report
            .results
            .iter()
            .filter(|r| r.status == CheckStatus::Fail)
            .map(|r| r.name.as_str())
            .collect();
        if !failing.is_empty() {
            write!(f, "; failing: {}", failing.join(", "))?;
        }
        Ok(())
    }
}

// ── Probe contract ──────────────────────────────────────────────────

/// An independent observability probe.
#[async_trait]
pub trait Check: Send + Sync {
    fn name(&self) -> &'static str;
    fn category(&self) -> Category;
    fn client_kind(&self) -> ClientKind;
    async fn run(
        &self,
        grafana: &GrafanaClient,
        config: &CheckConfig,
    ) -> Result<CheckResult, ApiError>;
}

// ── Runner ──────────────────────────────────────────────────────────

/// Ordered probe registry; registration order is execution order.
pub struct CheckRunner {
    checks: Vec<Box<dyn Check>>,
    config: CheckConfig,
    last_report: Option<CheckReport>,
}

impl CheckRunner {
    pub fn new(config: CheckConfig) -> Self {
        Self {
            checks: Vec::new(),
            config,
            last_report: None,
        }
    }

    /// Append a probe. No de-duplication is performed.
    pub fn register(&mut self, check: Box<dyn Check>) {
        self.checks.push(check);
    }

    pub fn config(&self) -> &CheckConfig {
        &self.config
    }

    /// Execute every registered probe sequentially and store the report.
    ///
    /// The first probe error aborts the run and propagates; no partial
    /// report is recorded for that invocation.
    pub async fn run_checks(&mut self, grafana: &GrafanaClient) -> Result<&CheckReport, ApiError> {
        let mut results = Vec::with_capacity(self.checks.len());
        for check in &self.checks {
            let result = check.run(grafana, &self.config).await?;
            tracing::debug!(
                check = check.name(),
                status = %result.status,
                affected = result.affected_nodes.len(),
                "check completed"
            );
            results.push(result);
        }
        Ok(self.last_report.insert(CheckReport { results }))
    }

    /// Most recent completed report, if any.
    pub fn last_report(&self) -> Option<&CheckReport> {
        self.last_report.as_ref()
    }

    /// Summary of the most recent report, if any.
    pub fn analysis(&self) -> Option<ReportAnalysis<'_>> {
        self.last_report.as_ref().map(CheckReport::analysis)
    }
}

/// Register the full probe set used by the min-bandwidth test.
pub fn register_default_checks(runner: &mut CheckRunner) {
    runner.register(Box::new(consensus::SyncCheck));
    runner.register(Box::new(consensus::HeadSlotCheck));
    runner.register(Box::new(consensus::FinalizedEpochCheck));
    runner.register(Box::new(execution::SyncCheck));
    runner.register(Box::new(execution::BlockHeightCheck));
    runner.register(Box::new(validator::FailedAttestationsCheck));
    runner.register(Box::new(validator::FailedProposalsCheck));
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use blobench_api::{ApiError, GrafanaClient};

    use super::{
        Category, Check, CheckConfig, CheckResult, CheckRunner, CheckStatus, ClientKind,
    };

    fn test_config() -> CheckConfig {
        CheckConfig {
            network: "kurtosis".into(),
            consensus_client: "prysm".into(),
            execution_client: "geth".into(),
            blobs_per_block: 6,
        }
    }

    /// Client pointed at an unroutable address; probes that would touch it
    /// are bugs in these tests.
    fn offline_grafana() -> GrafanaClient {
        GrafanaClient::from_reqwest("http://127.0.0.1:9", reqwest_client(), "uid").unwrap()
    }

    fn reqwest_client() -> reqwest::Client {
        reqwest::Client::new()
    }

    struct StaticCheck {
        name: &'static str,
        status: CheckStatus,
    }

    #[async_trait]
    impl Check for StaticCheck {
        fn name(&self) -> &'static str {
            self.name
        }
        fn category(&self) -> Category {
            Category::General
        }
        fn client_kind(&self) -> ClientKind {
            ClientKind::Consensus
        }
        async fn run(
            &self,
            _grafana: &GrafanaClient,
            _config: &CheckConfig,
        ) -> Result<CheckResult, ApiError> {
            let mut result =
                CheckResult::passing(self.name, Category::General, "static", "up");
            result.status = self.status;
            Ok(result)
        }
    }

    struct FailingQueryCheck;

    #[async_trait]
    impl Check for FailingQueryCheck {
        fn name(&self) -> &'static str {
            "broken query"
        }
        fn category(&self) -> Category {
            Category::General
        }
        fn client_kind(&self) -> ClientKind {
            ClientKind::Consensus
        }
        async fn run(
            &self,
            _grafana: &GrafanaClient,
            _config: &CheckConfig,
        ) -> Result<CheckResult, ApiError> {
            Err(ApiError::Provisioning {
                message: "datasource gone".into(),
            })
        }
    }

    #[tokio::test]
    async fn results_preserve_registration_order() {
        let mut runner = CheckRunner::new(test_config());
        runner.register(Box::new(StaticCheck { name: "b", status: CheckStatus::Ok }));
        runner.register(Box::new(StaticCheck { name: "a", status: CheckStatus::Fail }));
        runner.register(Box::new(StaticCheck { name: "c", status: CheckStatus::Ok }));

        let report = runner.run_checks(&offline_grafana()).await.unwrap();
        let names: Vec<&str> = report.results().iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["b", "a", "c"]);
        assert!(report.failed());
    }

    #[tokio::test]
    async fn probe_error_aborts_run_and_keeps_previous_report() {
        let mut runner = CheckRunner::new(test_config());
        runner.register(Box::new(StaticCheck { name: "ok", status: CheckStatus::Ok }));

        runner.run_checks(&offline_grafana()).await.unwrap();
        assert_eq!(runner.last_report().unwrap().results().len(), 1);

        runner.register(Box::new(FailingQueryCheck));
        let err = runner.run_checks(&offline_grafana()).await.unwrap_err();
        assert!(matches!(err, ApiError::Provisioning { .. }), "got {err:?}");

        // The aborted run did not clobber the previous report.
        assert_eq!(runner.last_report().unwrap().results().len(), 1);
    }

    #[tokio::test]
    async fn empty_registry_yields_empty_passing_report() {
        let mut runner = CheckRunner::new(test_config());
        let report = runner.run_checks(&offline_grafana()).await.unwrap();
        assert!(report.results().is_empty());
        assert!(!report.failed());
    }

    #[tokio::test]
    async fn analysis_counts_and_names_failures() {
        let mut runner = CheckRunner::new(test_config());
        runner.register(Box::new(StaticCheck { name: "sync", status: CheckStatus::Ok }));
        runner.register(Box::new(StaticCheck { name: "attestations", status: CheckStatus::Fail }));
        runner.register(Box::new(StaticCheck { name: "proposals", status: CheckStatus::Skip }));

        let report = runner.run_checks(&offline_grafana()).await.unwrap();
        assert_eq!(
            report.analysis().to_string(),
            "1 ok, 1 failed, 1 skipped, 0 errored; failing: attestations"
        );
    }
}
