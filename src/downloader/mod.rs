//! Downloader front end, split into focused submodules.
//!
//! The `Downloader` struct and its methods are organized by concern:
//! - [`claims`] - In-flight reservation of output filenames
//! - [`lifecycle`] - Event subscription, shutdown and scoped use
//!
//! Task execution itself lives in [`crate::dispatcher`].

mod claims;
mod lifecycle;

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
pub(crate) mod test_helpers;
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;

pub(crate) use claims::{ClaimRegistry, OutputClaim};
pub use lifecycle::shutdown_on_signal;

use crate::config::Config;
use crate::dispatcher::Dispatcher;
use crate::error::{Error, Result};
use crate::tool::{FfmpegRunner, Invocation, ToolOutput, ToolRunner};
use crate::types::{DownloadTask, Event, Submission, TaskId};
use crate::utils::{ensure_dir, log_file_name, validate_filename};
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use tokio::sync::broadcast;
use tracing::Dispatch;
use tracing::instrument::WithSubscriber;

/// Buffer size of the event broadcast channel
const EVENT_CHANNEL_CAPACITY: usize = 1000;

/// Downloads HLS streams by handing each request to ffmpeg
///
/// Cloning is cheap; all clones share the same configuration, queue and
/// worker pool.
///
/// # Lifetime
///
/// Submitted downloads keep running after [`download`](Self::download)
/// returns. Before the downloader goes away, all of them must finish:
///
/// - [`Downloader::scope`] runs a closure and drains afterwards, on every
///   exit path including panics.
/// - [`shutdown`](Self::shutdown) drains explicitly.
/// - Dropping the last clone without either still drains, blocking the
///   dropping thread, when the downloader was built on a multi-threaded
///   Tokio runtime. This holds inside that runtime and outside any runtime.
/// - A downloader built on a current-thread runtime cannot be drained by a
///   drop, whether it happens inside `block_on` or after it returned. The
///   drop stops the queue and logs a warning; queued and running tasks stay
///   on that runtime and only progress while it is driven again. Call
///   [`shutdown`](Self::shutdown) before dropping in that setup.
#[derive(Clone)]
pub struct Downloader {
    /// Configuration (wrapped in Arc for sharing across tasks)
    pub(crate) config: Arc<Config>,
    /// ffmpeg `-http_proxy` value, rendered once at construction
    pub(crate) proxy_url: Option<Arc<str>>,
    /// Bounded worker pool running the ffmpeg invocations
    pub(crate) dispatcher: Dispatcher,
    /// Filenames whose tasks have not finished yet
    pub(crate) claims: ClaimRegistry,
    /// Event broadcast channel sender (multiple subscribers supported)
    pub(crate) event_tx: broadcast::Sender<Event>,
    /// Log sink for everything this downloader and its tasks record
    pub(crate) log: Dispatch,
    /// Next task ID
    pub(crate) next_id: Arc<AtomicU64>,
    /// Set once shutdown has begun
    pub(crate) shutting_down: Arc<AtomicBool>,
}

/// Builder for a [`Downloader`] with a custom tool runner or log sink
pub struct DownloaderBuilder {
    config: Config,
    runner: Option<Arc<dyn ToolRunner>>,
    log: Option<Dispatch>,
}

impl DownloaderBuilder {
    /// Use `runner` instead of locating ffmpeg from the tool settings
    pub fn runner(mut self, runner: Arc<dyn ToolRunner>) -> Self {
        self.runner = Some(runner);
        self
    }

    /// Send all log records to `log` instead of the dispatcher that is
    /// current when [`build`](Self::build) runs
    pub fn log_sink(mut self, log: Dispatch) -> Self {
        self.log = Some(log);
        self
    }

    /// Validate the configuration, create directories and start the worker pool
    ///
    /// # Errors
    ///
    /// - [`Error::Config`] if the configuration is invalid
    /// - [`Error::Filesystem`] if the output or log directory cannot be created
    pub async fn build(self) -> Result<Downloader> {
        let log = self
            .log
            .unwrap_or_else(|| tracing::dispatcher::get_default(Dispatch::clone));

        Self::build_with(self.config, self.runner, log.clone())
            .with_subscriber(log)
            .await
    }

    async fn build_with(
        config: Config,
        runner: Option<Arc<dyn ToolRunner>>,
        log: Dispatch,
    ) -> Result<Downloader> {
        config.validate()?;

        ensure_dir(&config.output_dir, "output").await?;
        if let Some(log_dir) = &config.log_dir {
            ensure_dir(log_dir, "ffmpeg log").await?;
        }

        let runner: Arc<dyn ToolRunner> = match runner {
            Some(runner) => runner,
            None => Arc::new(FfmpegRunner::from_config(&config.tools)),
        };

        let proxy_url: Option<Arc<str>> = config.proxy.as_ref().map(|p| Arc::from(p.url()));

        let (event_tx, _rx) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let dispatcher = Dispatcher::new(
            config.max_concurrent_downloads,
            runner,
            event_tx.clone(),
            log.clone(),
        );

        tracing::info!(
            max_concurrent = dispatcher.capacity(),
            output_dir = %config.output_dir.display(),
            proxy = ?proxy_url,
            "maximum number of parallel downloads is set to {}",
            dispatcher.capacity()
        );

        Ok(Downloader {
            config: Arc::new(config),
            proxy_url,
            dispatcher,
            claims: ClaimRegistry::default(),
            event_tx,
            log,
            next_id: Arc::new(AtomicU64::new(1)),
            shutting_down: Arc::new(AtomicBool::new(false)),
        })
    }
}

impl Downloader {
    /// Create a downloader that runs the ffmpeg found via the tool settings
    /// and logs to the current default `tracing` dispatcher
    ///
    /// # Errors
    ///
    /// - [`Error::Config`] if the configuration is invalid
    /// - [`Error::Filesystem`] if the output or log directory cannot be created
    pub async fn new(config: Config) -> Result<Self> {
        Self::builder(config).build().await
    }

    /// Start building a downloader with a custom runner or log sink
    pub fn builder(config: Config) -> DownloaderBuilder {
        DownloaderBuilder {
            config,
            runner: None,
            log: None,
        }
    }

    /// Download the stream referenced by `source` into `filename` inside the
    /// output directory
    ///
    /// Returns once the task has been queued; the download itself runs in the
    /// background and reports through logs, [`Event`]s and the returned
    /// [`TaskHandle`](crate::TaskHandle), which may be ignored.
    ///
    /// If `filename` already exists in the output directory, or another
    /// task for the same name has not finished yet, nothing is spawned, a
    /// warning is logged and [`Submission::Skipped`] is returned. This is not
    /// an error.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidFilename`] if `filename` is not a plain file name
    /// - [`Error::ShuttingDown`] after [`shutdown`](Self::shutdown)
    pub async fn download(
        &self,
        source: impl Into<String>,
        filename: impl Into<String>,
    ) -> Result<Submission> {
        self.submit(source.into(), filename.into())
            .with_subscriber(self.log.clone())
            .await
    }

    async fn submit(&self, source: String, filename: String) -> Result<Submission> {
        if self.shutting_down.load(Ordering::SeqCst) {
            return Err(Error::ShuttingDown);
        }
        validate_filename(&filename)?;

        let output_path = self.config.output_dir.join(&filename);

        // Unreadable metadata is treated as absent; ffmpeg's -n still refuses to overwrite
        let exists = tokio::fs::try_exists(&output_path).await.unwrap_or(false);
        let claim = if exists {
            None
        } else {
            self.claims.try_claim(&filename)
        };

        let Some(claim) = claim else {
            tracing::warn!(
                task = %filename,
                path = %output_path.display(),
                in_flight = !exists,
                "skipped duplicate name"
            );
            self.event_tx
                .send(Event::Skipped {
                    filename: filename.clone(),
                    path: output_path.clone(),
                })
                .ok();
            return Ok(Submission::Skipped {
                filename,
                path: output_path,
            });
        };

        let log_path = self
            .config
            .log_dir
            .as_ref()
            .map(|dir| dir.join(log_file_name(&chrono::Local::now(), &filename)));

        let output = match &log_path {
            Some(path) => ToolOutput::File(path.clone()),
            None if self.config.tools.forward_output => ToolOutput::Inherit,
            None => ToolOutput::Discard,
        };

        let invocation =
            Invocation::ffmpeg_copy(&source, &output_path, self.proxy_url.as_deref(), output);

        let id = TaskId(self.next_id.fetch_add(1, Ordering::SeqCst));
        let task = DownloadTask::new(id, source, filename, output_path, log_path, invocation)
            .with_claim(claim);

        let handle = self.dispatcher.submit(task)?;
        Ok(Submission::Queued(handle))
    }

    /// The configuration this downloader was built with
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Directory downloads are written to
    pub fn output_dir(&self) -> &Path {
        &self.config.output_dir
    }

    /// The `-http_proxy` value passed to ffmpeg, if a proxy is configured
    pub fn proxy_url(&self) -> Option<&str> {
        self.proxy_url.as_deref()
    }

    /// Maximum number of ffmpeg processes running at once
    pub fn max_concurrent(&self) -> usize {
        self.dispatcher.capacity()
    }

    /// Number of downloads currently executing
    pub fn running(&self) -> usize {
        self.dispatcher.running()
    }

    /// Whether a task for `filename` is queued or running
    pub fn is_in_flight(&self, filename: &str) -> bool {
        self.claims.is_claimed(filename)
    }
}
