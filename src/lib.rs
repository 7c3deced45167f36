//! # hls-dl
//!
//! Concurrent HLS stream downloader backed by ffmpeg.
//!
//! ## Design Philosophy
//!
//! hls-dl is designed to be:
//! - **Fire and forget** - `download()` queues work and returns immediately
//! - **Bounded** - at most `max_concurrent_downloads` ffmpeg processes run at once
//! - **Non-destructive** - an existing output file is never overwritten
//! - **Library-first** - no CLI, purely a Rust crate for embedding
//!
//! Each download is a single ffmpeg run that copies the stream into a local
//! container without re-encoding. Outcomes are reported through `tracing`
//! records, broadcast [`Event`]s and an optional per-task [`TaskHandle`].
//!
//! ## Quick Start
//!
//! ```no_run
//! use hls_dl::{Config, Downloader, ProxyConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut config = Config::new("downloads");
//!     config.max_concurrent_downloads = 3;
//!     config.log_dir = Some("downloads/logs".into());
//!     config.proxy = Some(ProxyConfig::new("127.0.0.1", 10809));
//!
//!     let downloader = Downloader::new(config).await?;
//!
//!     // Subscribe to events
//!     let mut events = downloader.subscribe();
//!     tokio::spawn(async move {
//!         while let Ok(event) = events.recv().await {
//!             println!("Event: {:?}", event);
//!         }
//!     });
//!
//!     downloader.download("https://example.com/a/index.m3u8", "a.mp4").await?;
//!     downloader.download("https://example.com/b/index.m3u8", "b.mp4").await?;
//!
//!     // Wait for both downloads before exiting
//!     downloader.shutdown().await;
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// Configuration types
pub mod config;
/// Bounded-concurrency task execution
pub mod dispatcher;
/// Downloader front end (decomposed into focused submodules)
pub mod downloader;
/// Error types
pub mod error;
/// External media tool invocation
pub mod tool;
/// Core types and events
pub mod types;
/// Utility functions
pub mod utils;

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
pub(crate) mod test_helpers;

// Re-export commonly used types
pub use config::{Config, ProxyConfig, ToolsConfig};
pub use dispatcher::Dispatcher;
pub use downloader::{Downloader, DownloaderBuilder, shutdown_on_signal};
pub use error::{Error, Result};
pub use tool::{FfmpegRunner, Invocation, ToolExit, ToolOutput, ToolRunner};
pub use types::{DownloadTask, Event, ExecutionResult, Submission, TaskHandle, TaskId};
