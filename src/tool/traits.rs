//! Traits and types for running the external media tool

use super::Invocation;
use async_trait::async_trait;

/// How the external tool exited
#[must_use]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ToolExit {
    /// Exit code, or None if the process was terminated by a signal
    pub code: Option<i32>,
}

impl ToolExit {
    /// Exit with the given code
    pub fn with_code(code: i32) -> Self {
        Self { code: Some(code) }
    }

    /// Whether the tool exited with code 0
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}

impl From<std::process::ExitStatus> for ToolExit {
    fn from(status: std::process::ExitStatus) -> Self {
        Self {
            code: status.code(),
        }
    }
}

/// Capability to spawn the external tool and wait for it to exit
///
/// The dispatcher only ever talks to the tool through this trait, so tests
/// can substitute a fake that records invocations instead of launching
/// processes.
#[async_trait]
pub trait ToolRunner: Send + Sync {
    /// Run the tool with the given invocation and wait for it to exit
    ///
    /// The output routing in [`Invocation::output`] must be honored: a log
    /// file receives the combined stdout and stderr, replacing any earlier
    /// content.
    ///
    /// # Errors
    ///
    /// Returns an error if the diagnostic log cannot be created or the
    /// process cannot be spawned. A non-zero exit is not an error; it is
    /// reported through [`ToolExit`].
    async fn run(&self, invocation: &Invocation) -> crate::Result<ToolExit>;

    /// Human-readable name for logging
    fn name(&self) -> &'static str;
}
