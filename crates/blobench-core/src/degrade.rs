// ── Adaptive degradation controller ──
//
// Drives the upload rate limit down a monotonically decreasing schedule
// synchronized to the target chain's epochs, re-running health checks at
// each decision point. Health is observability-only: the stop condition is
// the bandwidth floor. The caller owns cleanup (remove_all) scoped around
// the controller's lifetime — the controller itself never removes rules on
// termination, so the last applied rate stays in effect.

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use blobench_api::GrafanaClient;

use crate::checks::CheckRunner;
use crate::epoch::{EpochTiming, elapsed_epochs};
use crate::error::CoreError;
use crate::exec::RemoteExec;
use crate::rate::Bandwidth;
use crate::shaper::TrafficShaper;

/// Fixed download ceiling applied once at setup. Only upload decays; the
/// ceiling just keeps ingress from being a confound.
pub const DOWNLOAD_CEILING: Bandwidth = Bandwidth::from_gbit(10);

// ── Configuration ───────────────────────────────────────────────────

/// Immutable parameters of one min-bandwidth test.
#[derive(Debug, Clone, Copy)]
pub struct DegradationConfig {
    pub initial: Bandwidth,
    pub floor: Bandwidth,
    /// Percentage removed from the current rate per decay event, in (0, 100).
    pub decay_percent: u64,
    pub blobs_per_block: u64,
}

impl DegradationConfig {
    pub fn new(
        initial: Bandwidth,
        floor: Bandwidth,
        decay_percent: u64,
        blobs_per_block: u64,
    ) -> Result<Self, CoreError> {
        if floor > initial {
            return Err(CoreError::InvalidConfig {
                reason: format!("floor {floor} exceeds initial bandwidth {initial}"),
            });
        }
        if decay_percent == 0 || decay_percent >= 100 {
            return Err(CoreError::InvalidConfig {
                reason: format!("decay percent {decay_percent} must be within (0, 100)"),
            });
        }
        if blobs_per_block == 0 {
            return Err(CoreError::InvalidConfig {
                reason: "blobs per block must be positive".into(),
            });
        }
        Ok(Self {
            initial,
            floor,
            decay_percent,
            blobs_per_block,
        })
    }
}

// ── Outcome ─────────────────────────────────────────────────────────

/// Why the test stopped. Setup failures surface as `Err(CoreError)`
/// instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
pub enum TerminationReason {
    /// The next decay step would have gone below the floor.
    FloorReached,
    /// The caller requested early termination.
    Cancelled,
}

/// Final report handed back to the caller.
#[derive(Debug, Clone, Copy)]
pub struct TestOutcome {
    pub reason: TerminationReason,
    /// Last successfully applied upload rate; still in effect on the target.
    pub final_bandwidth: Bandwidth,
    pub reductions: u64,
    pub epochs_elapsed: u64,
}

/// Mutable loop state; lives and dies with one `run()` call.
#[derive(Debug, Clone, Copy)]
struct DegradationState {
    current: Bandwidth,
    reductions: u64,
}

// ── Controller ──────────────────────────────────────────────────────

/// The min-bandwidth degradation test.
///
/// States: Initializing → Probing(baseline) → Decaying → Terminated.
pub struct MinBandwidthTest<E> {
    config: DegradationConfig,
    timing: EpochTiming,
    shaper: TrafficShaper<E>,
    checks: CheckRunner,
    grafana: GrafanaClient,
}

impl<E: RemoteExec> MinBandwidthTest<E> {
    pub fn new(
        config: DegradationConfig,
        timing: EpochTiming,
        shaper: TrafficShaper<E>,
        checks: CheckRunner,
        grafana: GrafanaClient,
    ) -> Self {
        Self {
            config,
            timing,
            shaper,
            checks,
            grafana,
        }
    }

    /// Run the test to termination.
    ///
    /// Setup errors are fatal and propagate. Once decaying, the loop only
    /// ends on the bandwidth floor or cancellation; the caller is expected
    /// to remove the shaping rules afterwards regardless of the outcome.
    pub async fn run(&mut self, cancel: &CancellationToken) -> Result<TestOutcome, CoreError> {
        self.setup().await?;
        self.baseline().await;
        Ok(self.decay_loop(cancel).await)
    }

    /// Initializing: shaping tool, stale-rule cleanup, initial rates.
    async fn setup(&self) -> Result<(), CoreError> {
        info!(
            initial = %self.config.initial,
            floor = %self.config.floor,
            decay_percent = self.config.decay_percent,
            blobs_per_block = self.config.blobs_per_block,
            "setting up min-bandwidth test"
        );

        self.shaper.install().await?;

        // Clear rules a previous run may have left behind. "Nothing to
        // remove" exits non-zero and is expected here.
        if let Err(e) = self.shaper.remove_all().await {
            debug!(error = %e, "stale shaping rule cleanup reported errors");
        }

        self.shaper.set_download(DOWNLOAD_CEILING).await?;
        self.shaper.set_upload(self.config.initial).await?;
        Ok(())
    }

    /// Probing: one diagnostic baseline report; never fatal.
    async fn baseline(&mut self) {
        match self.checks.run_checks(&self.grafana).await {
            Ok(report) => info!(analysis = %report.analysis(), "baseline health report"),
            Err(e) => warn!(error = %e, "baseline health checks failed"),
        }
    }

    /// Decaying: tick once per slot, decay at most once per two epochs.
    async fn decay_loop(&mut self, cancel: &CancellationToken) -> TestOutcome {
        let mut state = DegradationState {
            current: self.config.initial,
            reductions: 0,
        };
        let started = tokio::time::Instant::now();
        let mut ticker = tokio::time::interval(self.timing.slot_duration);
        ticker.tick().await; // consume the immediate first tick

        loop {
            tokio::select! {
                biased;
                () = cancel.cancelled() => {
                    info!("cancellation requested, stopping test");
                    return self.outcome(TerminationReason::Cancelled, state, started);
                }
                _ = ticker.tick() => {}
            }

            let epochs = elapsed_epochs(started.elapsed(), &self.timing);
            if state.reductions >= epochs / 2 {
                // Decay never fires early; wait for the epoch cadence to
                // catch up with the reduction count.
                continue;
            }

            self.observe_health().await;

            let reduction = state.current.as_bps() * self.config.decay_percent / 100;
            let next = state.current.as_bps().saturating_sub(reduction);
            // Integer truncation makes the step zero once the rate is tiny;
            // there is nothing left to decay either way.
            if reduction == 0 || next < self.config.floor.as_bps() {
                info!(
                    current = %state.current,
                    floor = %self.config.floor,
                    "next reduction would cross the bandwidth floor"
                );
                return self.outcome(TerminationReason::FloorReached, state, started);
            }

            let next = Bandwidth::bits_per_second(next);
            match self.shaper.update_upload(next).await {
                Ok(()) => {
                    state.current = next;
                    state.reductions += 1;
                    info!(
                        bandwidth = %next,
                        reductions = state.reductions,
                        "upload bandwidth reduced"
                    );
                }
                Err(e) => {
                    // Skipped decay step; retried at the next cadence
                    // opportunity since the count was not incremented.
                    warn!(error = %e, "bandwidth update failed");
                }
            }
        }
    }

    /// Health is tracked for visibility only; failures never stop the loop.
    async fn observe_health(&mut self) {
        match self.checks.run_checks(&self.grafana).await {
            Ok(report) if report.failed() => {
                warn!(analysis = %report.analysis(), "health checks failing");
            }
            Ok(report) => info!(analysis = %report.analysis(), "health checks passing"),
            Err(e) => warn!(error = %e, "health check run failed"),
        }
    }

    fn outcome(
        &self,
        reason: TerminationReason,
        state: DegradationState,
        started: tokio::time::Instant,
    ) -> TestOutcome {
        TestOutcome {
            reason,
            final_bandwidth: state.current,
            reductions: state.reductions,
            epochs_elapsed: elapsed_epochs(started.elapsed(), &self.timing),
        }
    }
}
