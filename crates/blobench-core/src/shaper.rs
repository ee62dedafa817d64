// ── Traffic shaper ──
//
// Translates bandwidth rates into `tc` rules on the target's interface.
// Upload is a token-bucket qdisc on the egress root; download is an ingress
// qdisc plus a policing filter that drops packets over the rate. `tc` has no
// replace semantics for these rules: install into an occupied slot fails, and
// delete of an absent rule exits non-zero — callers on cleanup paths treat
// the latter as expected.

use tracing::{debug, info};

use crate::error::{CoreError, Direction};
use crate::exec::{ExecOutput, RemoteExec};
use crate::rate::Bandwidth;

const DEVICE: &str = "eth0";
const BURST: &str = "16kb";
const LATENCY: &str = "50ms";

/// Installs, updates, and removes rate-limiting rules on one target node.
pub struct TrafficShaper<E> {
    exec: E,
}

impl<E: RemoteExec> TrafficShaper<E> {
    pub fn new(exec: E) -> Self {
        Self { exec }
    }

    /// Ensure `tc` is available on the target, installing it through the
    /// image's package manager if absent.
    pub async fn install(&self) -> Result<(), CoreError> {
        info!("updating apt cache");
        self.run("apt update", tool_install).await?;

        info!("installing tc");
        self.run("apt install iproute2 -y", tool_install).await?;

        Ok(())
    }

    /// Token-bucket limiter on the egress path.
    pub async fn set_upload(&self, rate: Bandwidth) -> Result<(), CoreError> {
        info!(%rate, "setting upload bandwidth control");
        let cmd =
            format!("tc qdisc add dev {DEVICE} root tbf rate {rate} burst {BURST} latency {LATENCY}");
        self.run(&cmd, |r| apply_err(Direction::Upload, r)).await
    }

    /// Ingress qdisc plus policing filter dropping packets over `rate`.
    ///
    /// Two remote commands; if the filter step fails the target is left
    /// with a bare ingress qdisc, which a later
    /// [`remove_download`](Self::remove_download) cleans up.
    pub async fn set_download(&self, rate: Bandwidth) -> Result<(), CoreError> {
        debug!("creating ingress qdisc for download bandwidth control");
        let cmd = format!("tc qdisc add dev {DEVICE} handle ffff: ingress");
        self.run(&cmd, |r| apply_err(Direction::Download, r)).await?;

        info!(%rate, "setting download bandwidth control");
        let cmd = format!(
            "tc filter add dev {DEVICE} parent ffff: protocol ip prio 1 u32 match ip src 0.0.0.0/0 police rate {rate} burst {BURST} drop flowid :1"
        );
        self.run(&cmd, |r| apply_err(Direction::Download, r)).await
    }

    pub async fn remove_upload(&self) -> Result<(), CoreError> {
        debug!("removing upload bandwidth control");
        let cmd = format!("tc qdisc del dev {DEVICE} root");
        self.run(&cmd, |r| remove_err(Direction::Upload, r)).await
    }

    /// Deleting the ingress qdisc drops its attached filter too, so this
    /// also cleans up a partial install that only got the qdisc in place.
    pub async fn remove_download(&self) -> Result<(), CoreError> {
        debug!("removing download bandwidth control");
        let cmd = format!("tc qdisc del dev {DEVICE} handle ffff: ingress");
        self.run(&cmd, |r| remove_err(Direction::Download, r)).await
    }

    /// Remove both directions without short-circuiting: the two rules use
    /// independent mechanisms and one's failure must not block the other's
    /// cleanup. Both failures are aggregated into one error.
    pub async fn remove_all(&self) -> Result<(), CoreError> {
        let upload = self.remove_upload().await;
        let download = self.remove_download().await;

        match (upload, download) {
            (Ok(()), Ok(())) => Ok(()),
            (Err(u), Err(d)) => Err(CoreError::ShapingRemoveBoth {
                upload: Box::new(u),
                download: Box::new(d),
            }),
            (Err(u), Ok(())) => Err(u),
            (Ok(()), Err(d)) => Err(d),
        }
    }

    /// Remove-then-set for the decay loop. A removal failure is usually
    /// "nothing to remove", so the install is attempted regardless.
    pub async fn update_upload(&self, rate: Bandwidth) -> Result<(), CoreError> {
        info!(%rate, "updating upload bandwidth control");
        if let Err(e) = self.remove_upload().await {
            debug!(error = %e, "upload rule removal failed before update");
        }
        self.set_upload(rate).await
    }

    async fn run(
        &self,
        cmd: &str,
        to_error: impl FnOnce(&ExecOutput) -> CoreError,
    ) -> Result<(), CoreError> {
        let argv: Vec<&str> = cmd.split(' ').collect();
        let result = self.exec.exec(&argv).await?;
        if result.success() {
            Ok(())
        } else {
            Err(to_error(&result))
        }
    }
}

fn tool_install(result: &ExecOutput) -> CoreError {
    CoreError::ToolInstall {
        reason: exit_reason(result),
    }
}

fn apply_err(direction: Direction, result: &ExecOutput) -> CoreError {
    CoreError::ShapingApply {
        direction,
        reason: exit_reason(result),
    }
}

fn remove_err(direction: Direction, result: &ExecOutput) -> CoreError {
    CoreError::ShapingRemove {
        direction,
        reason: exit_reason(result),
    }
}

fn exit_reason(result: &ExecOutput) -> String {
    format!("exit {}: {}", result.exit_code, result.output.trim())
}

#[cfg(test)]
mod tests {
    use super::TrafficShaper;
    use crate::error::CoreError;
    use crate::exec::mock::MockExec;
    use crate::rate::Bandwidth;

    #[tokio::test]
    async fn set_upload_builds_token_bucket_command() {
        let exec = MockExec::new();
        let shaper = TrafficShaper::new(exec.clone());

        shaper.set_upload(Bandwidth::from_mbit(50)).await.unwrap();

        assert_eq!(
            exec.recorded(),
            vec!["tc qdisc add dev eth0 root tbf rate 50mbit burst 16kb latency 50ms"]
        );
    }

    #[tokio::test]
    async fn set_download_issues_qdisc_then_filter() {
        let exec = MockExec::new();
        let shaper = TrafficShaper::new(exec.clone());

        shaper.set_download(Bandwidth::from_gbit(10)).await.unwrap();

        let recorded = exec.recorded();
        assert_eq!(recorded.len(), 2);
        assert_eq!(recorded[0], "tc qdisc add dev eth0 handle ffff: ingress");
        assert_eq!(
            recorded[1],
            "tc filter add dev eth0 parent ffff: protocol ip prio 1 u32 match ip src 0.0.0.0/0 police rate 10gbit burst 16kb drop flowid :1"
        );
    }

    #[tokio::test]
    async fn set_download_stops_after_failed_qdisc_step() {
        let exec = MockExec::new();
        exec.fail_matching("handle ffff: ingress");
        let shaper = TrafficShaper::new(exec.clone());

        let err = shaper.set_download(Bandwidth::from_gbit(10)).await.unwrap_err();
        assert!(matches!(err, CoreError::ShapingApply { .. }), "got {err:?}");
        // The filter command is never attempted.
        assert_eq!(exec.recorded().len(), 1);
    }

    #[tokio::test]
    async fn remove_all_attempts_both_directions_without_short_circuit() {
        let exec = MockExec::new();
        exec.fail_matching("qdisc del");
        let shaper = TrafficShaper::new(exec.clone());

        let err = shaper.remove_all().await.unwrap_err();
        assert!(matches!(err, CoreError::ShapingRemoveBoth { .. }), "got {err:?}");

        let recorded = exec.recorded();
        assert_eq!(recorded.len(), 2);
        assert!(recorded[0].contains("del dev eth0 root"));
        assert!(recorded[1].contains("del dev eth0 handle ffff: ingress"));
    }

    #[tokio::test]
    async fn remove_all_reports_single_direction_failure() {
        let exec = MockExec::new();
        exec.fail_matching("del dev eth0 root");
        let shaper = TrafficShaper::new(exec.clone());

        let err = shaper.remove_all().await.unwrap_err();
        assert!(err.is_remove_failure());
        assert!(matches!(err, CoreError::ShapingRemove { .. }), "got {err:?}");
        assert_eq!(exec.recorded().len(), 2);
    }

    #[tokio::test]
    async fn remove_all_twice_stays_a_remove_failure() {
        // Second pass hits "nothing to remove" everywhere; still classified
        // as a remove failure, never escalated.
        let exec = MockExec::new();
        let shaper = TrafficShaper::new(exec.clone());

        shaper.remove_all().await.unwrap();

        exec.fail_matching("qdisc del");
        let err = shaper.remove_all().await.unwrap_err();
        assert!(err.is_remove_failure());
    }

    #[tokio::test]
    async fn update_upload_still_installs_after_failed_removal() {
        let exec = MockExec::new();
        exec.fail_matching("qdisc del");
        let shaper = TrafficShaper::new(exec.clone());

        shaper.update_upload(Bandwidth::from_mbit(25)).await.unwrap();

        let recorded = exec.recorded();
        assert_eq!(recorded.len(), 2);
        assert!(recorded[0].contains("qdisc del dev eth0 root"));
        assert!(recorded[1].contains("rate 25mbit"));
    }

    #[tokio::test]
    async fn dispatch_failure_is_an_exec_error() {
        let exec = MockExec::new();
        exec.dispatch_error_on("apt update");
        let shaper = TrafficShaper::new(exec);

        let err = shaper.install().await.unwrap_err();
        assert!(matches!(err, CoreError::Exec(_)), "got {err:?}");
    }

    #[tokio::test]
    async fn install_surfaces_nonzero_exit_output() {
        let exec = MockExec::new();
        exec.fail_matching("apt install");
        let shaper = TrafficShaper::new(exec);

        let err = shaper.install().await.unwrap_err();
        match err {
            CoreError::ToolInstall { reason } => assert!(reason.contains("exit 2")),
            other => panic!("expected ToolInstall, got {other:?}"),
        }
    }
}
