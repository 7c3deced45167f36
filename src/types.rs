//! Core types and events

use crate::downloader::OutputClaim;
use crate::error::{Error, Result};
use crate::tool::Invocation;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::oneshot;

/// Unique identifier for a submitted download task
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(pub u64);

impl TaskId {
    /// Get the inner u64 value
    pub fn get(&self) -> u64 {
        self.0
    }
}

impl From<u64> for TaskId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for TaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One unit of work for the [`Dispatcher`](crate::Dispatcher): a prepared
/// ffmpeg invocation plus the metadata used to report on it
///
/// Tasks are immutable once built and are dropped as soon as their execution
/// has been reported.
#[derive(Debug)]
pub struct DownloadTask {
    id: TaskId,
    source: String,
    filename: String,
    output_path: PathBuf,
    log_path: Option<PathBuf>,
    invocation: Invocation,
    /// Reservation of `filename`, released when the task is dropped
    pub(crate) claim: Option<OutputClaim>,
}

impl DownloadTask {
    /// Assemble a task from its parts
    pub fn new(
        id: TaskId,
        source: impl Into<String>,
        filename: impl Into<String>,
        output_path: PathBuf,
        log_path: Option<PathBuf>,
        invocation: Invocation,
    ) -> Self {
        Self {
            id,
            source: source.into(),
            filename: filename.into(),
            output_path,
            log_path,
            invocation,
            claim: None,
        }
    }

    pub(crate) fn with_claim(mut self, claim: OutputClaim) -> Self {
        self.claim = Some(claim);
        self
    }

    /// Task identifier
    pub fn id(&self) -> TaskId {
        self.id
    }

    /// Playlist path or URL, passed to ffmpeg untouched
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Requested output filename; doubles as the task title in logs
    pub fn filename(&self) -> &str {
        &self.filename
    }

    /// Resolved path of the output file
    pub fn output_path(&self) -> &Path {
        &self.output_path
    }

    /// Diagnostic log file, if diagnostic logging is enabled
    pub fn log_path(&self) -> Option<&Path> {
        self.log_path.as_deref()
    }

    /// The ffmpeg invocation for this task
    pub fn invocation(&self) -> &Invocation {
        &self.invocation
    }
}

/// Outcome of running one task
#[must_use]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionResult {
    /// Exit code of the tool (None if it could not be spawned or was killed by a signal)
    pub exit_code: Option<i32>,
    /// Wall-clock time between spawn and exit
    pub duration: Duration,
    /// Whether the tool exited with code 0
    pub succeeded: bool,
    /// Diagnostic log holding the tool's combined output, if one was written
    pub log_path: Option<PathBuf>,
    /// Spawn error message when the tool never ran
    pub error: Option<String>,
}

/// What happened to a `download()` call
#[derive(Debug)]
pub enum Submission {
    /// The task was handed to the dispatcher
    Queued(TaskHandle),
    /// The output already exists (or is being produced); nothing was spawned
    Skipped {
        /// Requested filename
        filename: String,
        /// Path that already exists or is already claimed
        path: PathBuf,
    },
}

impl Submission {
    /// Whether the request was skipped as a duplicate
    pub fn is_skipped(&self) -> bool {
        matches!(self, Submission::Skipped { .. })
    }

    /// The result handle, if the request was queued
    pub fn into_handle(self) -> Option<TaskHandle> {
        match self {
            Submission::Queued(handle) => Some(handle),
            Submission::Skipped { .. } => None,
        }
    }
}

/// Optional handle to the result of a submitted task
///
/// Dropping the handle does not affect the task; it still runs and reports
/// through logs and events.
#[derive(Debug)]
pub struct TaskHandle {
    id: TaskId,
    filename: String,
    rx: oneshot::Receiver<ExecutionResult>,
}

impl TaskHandle {
    pub(crate) fn new(id: TaskId, filename: String, rx: oneshot::Receiver<ExecutionResult>) -> Self {
        Self { id, filename, rx }
    }

    /// Task identifier
    pub fn id(&self) -> TaskId {
        self.id
    }

    /// Output filename of the task
    pub fn filename(&self) -> &str {
        &self.filename
    }

    /// Wait for the task to finish
    ///
    /// # Errors
    ///
    /// Returns [`Error::TaskAbandoned`] if the task was dropped without
    /// running, which only happens when the runtime shuts down underneath it.
    pub async fn wait(self) -> Result<ExecutionResult> {
        self.rx.await.map_err(|_| Error::TaskAbandoned)
    }
}

/// Lifecycle events broadcast by the downloader
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// Task accepted and queued
    Submitted {
        /// Task ID
        id: TaskId,
        /// Output filename
        filename: String,
    },

    /// Request skipped because the output already exists or is in flight
    Skipped {
        /// Output filename
        filename: String,
        /// Output path that already exists or is already claimed
        path: PathBuf,
    },

    /// ffmpeg is about to be spawned for the task
    Started {
        /// Task ID
        id: TaskId,
        /// Output filename
        filename: String,
    },

    /// ffmpeg exited with code 0
    Completed {
        /// Task ID
        id: TaskId,
        /// Output filename
        filename: String,
        /// Time spent in ffmpeg
        duration: Duration,
    },

    /// ffmpeg failed to spawn or exited with a non-zero code
    Failed {
        /// Task ID
        id: TaskId,
        /// Output filename
        filename: String,
        /// Exit code, if the process ran to exit
        exit_code: Option<i32>,
        /// Diagnostic log for post-mortem inspection
        #[serde(skip_serializing_if = "Option::is_none")]
        log_path: Option<PathBuf>,
        /// Spawn error message
        #[serde(skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },

    /// All submitted tasks finished and the downloader stopped accepting work
    Shutdown,
}
