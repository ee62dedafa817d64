//! Degradation-testing logic for blob-carrying validator nodes.
//!
//! This crate owns the state machine and domain types behind the
//! `min-bandwidth` test:
//!
//! - **[`MinBandwidthTest`]** — the adaptive degradation controller.
//!   [`run()`](MinBandwidthTest::run) installs the shaping tool, applies the
//!   initial rate limits, takes a baseline health report, then decays the
//!   upload rate on the target chain's epoch cadence until the configured
//!   floor is reached or the caller cancels.
//!
//! - **[`TrafficShaper`]** — translates [`Bandwidth`] rates into `tc`
//!   commands executed on the target through the [`RemoteExec`] seam:
//!   a token-bucket qdisc for upload, an ingress qdisc + policing filter
//!   pair for download.
//!
//! - **[`CheckRunner`]** — ordered registry of [`Check`] probes that query
//!   the Grafana backend and aggregate per-probe verdicts into a
//!   [`CheckReport`]. Health is observability-only: the test terminates on
//!   the bandwidth floor, never on a failing probe.
//!
//! - **[`elapsed_epochs`]** — the pure epoch clock that gates decay
//!   decisions to the target system's own cadence.

pub mod checks;
pub mod degrade;
pub mod epoch;
pub mod error;
pub mod exec;
pub mod rate;
pub mod shaper;

// ── Primary re-exports ──────────────────────────────────────────────
pub use checks::{Category, Check, CheckConfig, CheckReport, CheckResult, CheckRunner, CheckStatus, ClientKind};
pub use degrade::{DegradationConfig, MinBandwidthTest, TerminationReason, TestOutcome};
pub use epoch::{EpochTiming, elapsed_epochs};
pub use error::CoreError;
pub use exec::{ExecError, ExecOutput, RemoteExec};
pub use rate::Bandwidth;
pub use shaper::TrafficShaper;
