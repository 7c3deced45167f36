//! Shared test helpers for creating Downloader instances in tests.

use crate::config::Config;
use crate::downloader::Downloader;
use crate::test_helpers::{FakeRunner, LogCapture};
use std::sync::Arc;
use tempfile::{TempDir, tempdir};

/// A downloader wired to a fake runner and a log capture
pub(crate) struct TestDownloader {
    pub(crate) downloader: Downloader,
    pub(crate) runner: Arc<FakeRunner>,
    pub(crate) logs: LogCapture,
    /// Keeps the output and log directories alive
    pub(crate) temp_dir: TempDir,
}

/// Helper to create a test Downloader writing into a fresh temp directory.
///
/// `configure` can adjust the config before construction; the output
/// directory defaults to `<temp>/out` (created by the downloader itself).
pub(crate) async fn create_test_downloader(
    runner: FakeRunner,
    configure: impl FnOnce(&mut Config, &TempDir),
) -> TestDownloader {
    let temp_dir = tempdir().unwrap();
    let mut config = Config::new(temp_dir.path().join("out"));
    configure(&mut config, &temp_dir);

    let runner = Arc::new(runner);
    let logs = LogCapture::new();
    let downloader = Downloader::builder(config)
        .runner(runner.clone())
        .log_sink(logs.dispatch())
        .build()
        .await
        .unwrap();

    TestDownloader {
        downloader,
        runner,
        logs,
        temp_dir,
    }
}
