// ── Core error types ──
//
// Setup-phase errors (tool install, initial rule application) are fatal and
// propagate to the caller. Steady-state decay-loop errors are logged and the
// loop continues. Cleanup errors are aggregated and reported, never re-raised
// as test failure.

use thiserror::Error;

use crate::exec::ExecError;

/// Traffic direction a shaping rule applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum Direction {
    Upload,
    Download,
}

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Traffic shaping ──────────────────────────────────────────────
    #[error("failed to install traffic shaping tool: {reason}")]
    ToolInstall { reason: String },

    #[error("failed to apply {direction} shaping rule: {reason}")]
    ShapingApply { direction: Direction, reason: String },

    /// Distinguished from apply: "remove when nothing installed" exits
    /// non-zero and is an expected variant for cleanup callers.
    #[error("failed to remove {direction} shaping rule: {reason}")]
    ShapingRemove { direction: Direction, reason: String },

    /// Both directions failed during `remove_all`; carries both causes.
    #[error("failed to remove upload and download shaping rules: {upload}; {download}")]
    ShapingRemoveBoth {
        upload: Box<CoreError>,
        download: Box<CoreError>,
    },

    // ── Collaborators ────────────────────────────────────────────────
    #[error("remote command dispatch failed: {0}")]
    Exec(#[from] ExecError),

    #[error("metrics query failed: {0}")]
    Query(#[from] blobench_api::ApiError),

    // ── Configuration ────────────────────────────────────────────────
    #[error("invalid degradation config: {reason}")]
    InvalidConfig { reason: String },
}

impl CoreError {
    /// Returns `true` if this is a rule-removal failure (single direction
    /// or aggregated), the expected outcome when no rule was installed.
    pub fn is_remove_failure(&self) -> bool {
        matches!(
            self,
            Self::ShapingRemove { .. } | Self::ShapingRemoveBoth { .. }
        )
    }
}
