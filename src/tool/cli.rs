//! ffmpeg runner using the external binary

use super::invocation::{Invocation, ToolOutput};
use super::traits::{ToolExit, ToolRunner};
use crate::config::ToolsConfig;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;

const FFMPEG: &str = "ffmpeg";

/// Runs invocations through the external `ffmpeg` binary
///
/// # Examples
///
/// ```no_run
/// use hls_dl::tool::FfmpegRunner;
/// use std::path::PathBuf;
///
/// // Create with explicit path
/// let runner = FfmpegRunner::new(PathBuf::from("/usr/bin/ffmpeg"));
///
/// // Or auto-discover from PATH
/// let runner = FfmpegRunner::from_path().expect("ffmpeg not found in PATH");
/// ```
#[derive(Debug, Clone)]
pub struct FfmpegRunner {
    binary_path: PathBuf,
}

impl FfmpegRunner {
    /// Create a runner with an explicit binary path
    pub fn new(binary_path: PathBuf) -> Self {
        Self { binary_path }
    }

    /// Attempt to find ffmpeg in PATH
    ///
    /// Returns `None` if no `ffmpeg` binary is on the PATH.
    pub fn from_path() -> Option<Self> {
        which::which(FFMPEG).ok().map(Self::new)
    }

    /// Resolve the binary from tool settings
    ///
    /// An explicit `ffmpeg_path` wins; otherwise PATH is searched when
    /// `search_path` is set. If neither yields a binary the bare program name
    /// is used, leaving resolution to the OS at spawn time; every task will
    /// then fail to spawn and be reported as failed.
    pub fn from_config(tools: &ToolsConfig) -> Self {
        if let Some(path) = &tools.ffmpeg_path {
            return Self::new(path.clone());
        }

        if tools.search_path {
            if let Some(runner) = Self::from_path() {
                tracing::debug!(path = ?runner.binary_path, "found ffmpeg in PATH");
                return runner;
            }
            tracing::warn!("ffmpeg not found in PATH; downloads will fail until it is installed");
        }

        Self::new(PathBuf::from(FFMPEG))
    }

    /// Path of the binary this runner spawns
    pub fn binary_path(&self) -> &Path {
        &self.binary_path
    }
}

#[async_trait]
impl ToolRunner for FfmpegRunner {
    async fn run(&self, invocation: &Invocation) -> crate::Result<ToolExit> {
        let (stdout, stderr) = match invocation.output() {
            ToolOutput::File(path) => {
                // One handle for both streams keeps their interleaving intact
                let file = std::fs::File::create(path)?;
                let err_file = file.try_clone()?;
                (Stdio::from(file), Stdio::from(err_file))
            }
            ToolOutput::Inherit => (Stdio::inherit(), Stdio::inherit()),
            ToolOutput::Discard => (Stdio::null(), Stdio::null()),
        };

        let status = Command::new(&self.binary_path)
            .args(invocation.args())
            .stdin(Stdio::null())
            .stdout(stdout)
            .stderr(stderr)
            .status()
            .await
            .map_err(|e| crate::Error::ExternalTool(format!("Failed to execute ffmpeg: {}", e)))?;

        Ok(ToolExit::from(status))
    }

    fn name(&self) -> &'static str {
        "cli-ffmpeg"
    }
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_path_consistency_with_which_crate() {
        let which_result = which::which(FFMPEG);
        let from_path_result = FfmpegRunner::from_path();

        assert_eq!(
            which_result.is_ok(),
            from_path_result.is_some(),
            "from_path() should return Some if and only if which::which() succeeds"
        );
    }

    #[test]
    fn explicit_path_wins_over_search() {
        let tools = ToolsConfig {
            ffmpeg_path: Some(PathBuf::from("/opt/custom/ffmpeg")),
            search_path: true,
            forward_output: false,
        };

        let runner = FfmpegRunner::from_config(&tools);
        assert_eq!(runner.binary_path(), Path::new("/opt/custom/ffmpeg"));
        assert_eq!(runner.name(), "cli-ffmpeg");
    }

    #[test]
    fn no_search_falls_back_to_program_name() {
        let tools = ToolsConfig {
            ffmpeg_path: None,
            search_path: false,
            forward_output: false,
        };

        let runner = FfmpegRunner::from_config(&tools);
        assert_eq!(runner.binary_path(), Path::new("ffmpeg"));
    }

    #[tokio::test]
    async fn invalid_binary_path_is_external_tool_error() {
        let runner = FfmpegRunner::new(PathBuf::from("/nonexistent/path/to/ffmpeg"));
        let invocation = Invocation::new(["-version"], ToolOutput::Discard);

        match runner.run(&invocation).await {
            Err(crate::Error::ExternalTool(msg)) => {
                assert!(msg.contains("Failed to execute ffmpeg"), "got: {msg}");
            }
            other => panic!("Expected ExternalTool error, got: {:?}", other),
        }
    }

    #[tokio::test]
    async fn unwritable_log_path_is_io_error() {
        let runner = FfmpegRunner::new(PathBuf::from("/nonexistent/path/to/ffmpeg"));
        let invocation = Invocation::new(
            ["-version"],
            ToolOutput::File(PathBuf::from("/nonexistent/dir/task.log")),
        );

        assert!(matches!(
            runner.run(&invocation).await,
            Err(crate::Error::Io(_))
        ));
    }
}
