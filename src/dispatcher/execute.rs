//! Execution of a single task: spawn, time, report.

use super::Job;
use crate::error::Error;
use crate::tool::ToolRunner;
use crate::types::{DownloadTask, Event, ExecutionResult};
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::broadcast;
use tracing::Dispatch;

/// Shared state every execution needs
pub(crate) struct ExecContext {
    pub(crate) runner: Arc<dyn ToolRunner>,
    pub(crate) events: broadcast::Sender<Event>,
    pub(crate) log: Dispatch,
}

/// Run one job to completion and report its outcome
///
/// Failures never propagate: they are logged, broadcast as
/// [`Event::Failed`] and delivered through the task's handle.
pub(crate) async fn execute(ctx: &ExecContext, job: Job) {
    let Job { task, result_tx } = job;

    ctx.events
        .send(Event::Started {
            id: task.id(),
            filename: task.filename().to_string(),
        })
        .ok();

    tracing::debug!(
        task = %task.filename(),
        runner = ctx.runner.name(),
        command = %task.invocation(),
        "running ffmpeg"
    );

    let started = Instant::now();
    let outcome = ctx.runner.run(task.invocation()).await;
    let duration = started.elapsed();

    let log_path = task
        .log_path()
        .filter(|path| path.exists())
        .map(Path::to_path_buf);

    let mut not_started = None;
    let result = match outcome {
        Ok(exit) => ExecutionResult {
            exit_code: exit.code,
            duration,
            succeeded: exit.success(),
            log_path,
            error: None,
        },
        Err(e) => {
            not_started = Some(NotStarted::from(&e));
            ExecutionResult {
                exit_code: None,
                duration,
                succeeded: false,
                log_path,
                error: Some(e.to_string()),
            }
        }
    };

    report(ctx, &task, &result, not_started);

    // Release the filename claim before the caller can observe the result
    drop(task);
    result_tx.send(result).ok();
}

/// Why the runner returned before ffmpeg ran
#[derive(Clone, Copy)]
enum NotStarted {
    /// The diagnostic log file could not be opened
    LogFile,
    /// The process could not be spawned
    Spawn,
}

impl From<&Error> for NotStarted {
    fn from(error: &Error) -> Self {
        match error {
            Error::Io(_) => NotStarted::LogFile,
            _ => NotStarted::Spawn,
        }
    }
}

fn report(
    ctx: &ExecContext,
    task: &DownloadTask,
    result: &ExecutionResult,
    not_started: Option<NotStarted>,
) {
    if result.succeeded {
        tracing::info!(
            task = %task.filename(),
            elapsed = ?result.duration,
            "download succeeded"
        );
        ctx.events
            .send(Event::Completed {
                id: task.id(),
                filename: task.filename().to_string(),
                duration: result.duration,
            })
            .ok();
        return;
    }

    match (&result.log_path, &result.error, not_started) {
        (_, Some(error), Some(NotStarted::LogFile)) => tracing::error!(
            task = %task.filename(),
            log = ?task.log_path(),
            error = %error,
            "download failed, ffmpeg log could not be opened"
        ),
        (Some(log), _, _) => tracing::error!(
            task = %task.filename(),
            exit_code = ?result.exit_code,
            error = ?result.error,
            log = %log.display(),
            "download failed, ffmpeg output kept for inspection"
        ),
        (None, Some(error), _) => tracing::error!(
            task = %task.filename(),
            error = %error,
            "download failed, ffmpeg could not be started"
        ),
        (None, None, _) => tracing::error!(
            task = %task.filename(),
            exit_code = ?result.exit_code,
            "download failed, ffmpeg did not exit cleanly"
        ),
    }

    ctx.events
        .send(Event::Failed {
            id: task.id(),
            filename: task.filename().to_string(),
            exit_code: result.exit_code,
            log_path: result.log_path.clone(),
            error: result.error.clone(),
        })
        .ok();
}
