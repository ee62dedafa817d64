// ── Remote command execution seam ──
//
// The controller never talks to the enclave runtime directly; everything
// flows through this trait. A non-zero exit code is an application-level
// outcome the caller interprets ("remove when absent" is expected in some
// call sites, fatal in others) — only dispatch failures are `ExecError`.

use async_trait::async_trait;
use thiserror::Error;

/// Captured result of one remote command.
#[derive(Debug, Clone)]
pub struct ExecOutput {
    pub exit_code: i32,
    /// Combined stdout + stderr as the runtime reports it.
    pub output: String,
}

impl ExecOutput {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Transport-level failure: the command could not be dispatched at all.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct ExecError {
    pub message: String,
}

impl ExecError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Executes shell commands on the target node.
#[async_trait]
pub trait RemoteExec: Send + Sync {
    /// Run `argv` on the target, capturing exit status and combined output.
    async fn exec(&self, argv: &[&str]) -> Result<ExecOutput, ExecError>;
}

// ── Test double ─────────────────────────────────────────────────────

#[cfg(test)]
pub(crate) mod mock {
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;

    use super::{ExecError, ExecOutput, RemoteExec};

    struct FailRule {
        needle: String,
        /// `None` fails every match; `Some(n)` fails the next n matches.
        remaining: Option<u32>,
    }

    /// Scripted in-memory executor recording every command it receives.
    #[derive(Clone, Default)]
    pub(crate) struct MockExec {
        commands: Arc<Mutex<Vec<String>>>,
        fail_rules: Arc<Mutex<Vec<FailRule>>>,
        dispatch_error_on: Arc<Mutex<Option<String>>>,
    }

    impl MockExec {
        pub(crate) fn new() -> Self {
            Self::default()
        }

        /// Every command containing `needle` exits non-zero.
        pub(crate) fn fail_matching(&self, needle: &str) {
            self.fail_rules.lock().unwrap().push(FailRule {
                needle: needle.to_owned(),
                remaining: None,
            });
        }

        /// The next command containing `needle` exits non-zero, once.
        pub(crate) fn fail_once(&self, needle: &str) {
            self.fail_rules.lock().unwrap().push(FailRule {
                needle: needle.to_owned(),
                remaining: Some(1),
            });
        }

        /// Commands containing `needle` fail at the dispatch level.
        pub(crate) fn dispatch_error_on(&self, needle: &str) {
            *self.dispatch_error_on.lock().unwrap() = Some(needle.to_owned());
        }

        pub(crate) fn recorded(&self) -> Vec<String> {
            self.commands.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl RemoteExec for MockExec {
        async fn exec(&self, argv: &[&str]) -> Result<ExecOutput, ExecError> {
            let joined = argv.join(" ");
            self.commands.lock().unwrap().push(joined.clone());

            if let Some(needle) = self.dispatch_error_on.lock().unwrap().as_ref() {
                if joined.contains(needle.as_str()) {
                    return Err(ExecError::new("connection to enclave lost"));
                }
            }

            let mut rules = self.fail_rules.lock().unwrap();
            for rule in rules.iter_mut() {
                if !joined.contains(&rule.needle) {
                    continue;
                }
                match &mut rule.remaining {
                    None => {
                        return Ok(ExecOutput {
                            exit_code: 2,
                            output: "RTNETLINK answers: No such file or directory".into(),
                        });
                    }
                    Some(0) => {}
                    Some(n) => {
                        *n -= 1;
                        return Ok(ExecOutput {
                            exit_code: 2,
                            output: "RTNETLINK answers: Invalid argument".into(),
                        });
                    }
                }
            }

            Ok(ExecOutput {
                exit_code: 0,
                output: String::new(),
            })
        }
    }
}
