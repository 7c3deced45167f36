//! Event subscription, shutdown and scoped use.

use crate::config::Config;
use crate::error::{Error, Result};
use crate::types::Event;
use futures::FutureExt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::Ordering;
use tokio::sync::broadcast;
use tracing::instrument::WithSubscriber;

use super::{Downloader, DownloaderBuilder};

impl Downloader {
    /// Subscribe to lifecycle events
    ///
    /// Each subscriber receives every event sent after it subscribed. A
    /// subscriber that falls more than the channel capacity behind skips the
    /// oldest events (`RecvError::Lagged`).
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.event_tx.subscribe()
    }

    /// Stop accepting downloads and wait for every submitted one to finish
    ///
    /// Running ffmpeg processes are never interrupted. Calling this more than
    /// once is harmless; [`Event::Shutdown`] is emitted only by the first call.
    pub async fn shutdown(&self) {
        self.shutdown_inner()
            .with_subscriber(self.log.clone())
            .await
    }

    async fn shutdown_inner(&self) {
        let first = !self.shutting_down.swap(true, Ordering::SeqCst);
        if first {
            tracing::info!(
                running = self.dispatcher.running(),
                "waiting for submitted downloads to finish"
            );
        }

        self.dispatcher.drain().await;

        if first {
            self.event_tx.send(Event::Shutdown).ok();
            tracing::info!("finished running, downloader shut down");
        }
    }

    /// Build a downloader, run `f` with it, then shut it down
    ///
    /// Shutdown happens however `f` ends: normal return or panic. A panic is
    /// re-raised once every submitted download has finished.
    ///
    /// # Errors
    ///
    /// Returns the construction errors of [`Downloader::new`].
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use hls_dl::{Config, Downloader};
    ///
    /// # #[tokio::main]
    /// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
    /// Downloader::scope(Config::new("downloads"), |dl| async move {
    ///     dl.download("https://example.com/a/index.m3u8", "a.mp4").await?;
    ///     dl.download("https://example.com/b/index.m3u8", "b.mp4").await?;
    ///     Ok::<_, hls_dl::Error>(())
    /// })
    /// .await??;
    /// # Ok(())
    /// # }
    /// ```
    pub async fn scope<F, Fut, T>(config: Config, f: F) -> Result<T>
    where
        F: FnOnce(Downloader) -> Fut,
        Fut: Future<Output = T>,
    {
        Self::builder(config).scope(f).await
    }
}

impl DownloaderBuilder {
    /// Build the downloader, run `f` with it, then shut it down
    ///
    /// See [`Downloader::scope`].
    ///
    /// # Errors
    ///
    /// Returns the construction errors of [`build`](Self::build).
    pub async fn scope<F, Fut, T>(self, f: F) -> Result<T>
    where
        F: FnOnce(Downloader) -> Fut,
        Fut: Future<Output = T>,
    {
        let downloader = self.build().await?;

        let user = downloader.clone();
        let outcome = AssertUnwindSafe(async move { f(user).await })
            .catch_unwind()
            .await;

        downloader.shutdown().await;

        match outcome {
            Ok(value) => Ok(value),
            Err(panic) => std::panic::resume_unwind(panic),
        }
    }
}

/// Drain `downloader`, giving up early on SIGINT/SIGTERM (Ctrl+C elsewhere)
///
/// ffmpeg processes still running when the signal arrives are not killed and
/// may outlive this process.
///
/// # Errors
///
/// Returns [`Error::Interrupted`] if a signal arrived before draining finished.
///
/// # Example
///
/// ```no_run
/// use hls_dl::{Config, Downloader, shutdown_on_signal};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let downloader = Downloader::new(Config::new("downloads")).await?;
///     downloader.download("https://example.com/index.m3u8", "a.mp4").await?;
///
///     shutdown_on_signal(&downloader).await?;
///     Ok(())
/// }
/// ```
pub async fn shutdown_on_signal(downloader: &Downloader) -> Result<()> {
    let log = downloader.log.clone();

    async {
        tokio::select! {
            _ = downloader.shutdown() => Ok(()),
            _ = wait_for_signal() => {
                tracing::warn!(
                    running = downloader.running(),
                    "interrupted while draining; running ffmpeg processes may be orphaned"
                );
                Err(Error::Interrupted)
            }
        }
    }
    .with_subscriber(log)
    .await
}

/// Resolve on SIGTERM or SIGINT; never resolves if neither can be observed
#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    match signal(SignalKind::terminate()) {
        Ok(mut sigterm) => tokio::select! {
            _ = sigterm.recv() => tracing::info!(signal = "SIGTERM", "termination requested"),
            _ = interrupt() => {}
        },
        Err(e) => {
            tracing::warn!(error = %e, "cannot listen for SIGTERM, only Ctrl+C stops the drain");
            interrupt().await;
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    interrupt().await;
}

async fn interrupt() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!(signal = "SIGINT", "termination requested"),
        Err(e) => {
            // Without a handler the drain simply runs to completion
            tracing::warn!(error = %e, "cannot listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    }
}
