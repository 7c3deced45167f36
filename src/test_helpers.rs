//! Shared test helpers: a fake tool runner and a log capture sink.

use crate::Result;
use crate::tool::{Invocation, ToolExit, ToolOutput, ToolRunner};
use async_trait::async_trait;
use std::io;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::Dispatch;
use tracing_subscriber::fmt::MakeWriter;

type ExitPolicy = dyn Fn(&Invocation) -> Result<ToolExit> + Send + Sync;

/// Stand-in for ffmpeg that records how it is used
///
/// Writes a line to the diagnostic log when one is requested, optionally
/// creates the output file on success, and tracks how many runs overlap.
pub(crate) struct FakeRunner {
    policy: Box<ExitPolicy>,
    delay: Duration,
    create_output: bool,
    spawns: AtomicUsize,
    running: AtomicUsize,
    peak: AtomicUsize,
    invocations: Mutex<Vec<Invocation>>,
}

impl FakeRunner {
    fn with_policy(policy: Box<ExitPolicy>) -> Self {
        Self {
            policy,
            delay: Duration::ZERO,
            create_output: false,
            spawns: AtomicUsize::new(0),
            running: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
            invocations: Mutex::new(Vec::new()),
        }
    }

    /// Every run exits with code 0
    pub(crate) fn succeeding() -> Self {
        Self::exiting_with(0)
    }

    /// Every run exits with `code`
    pub(crate) fn exiting_with(code: i32) -> Self {
        Self::with_policy(Box::new(move |_| Ok(ToolExit::with_code(code))))
    }

    /// Runs whose output path ends with `suffix` exit with 1, all others with 0
    pub(crate) fn failing_for(suffix: &'static str) -> Self {
        Self::with_policy(Box::new(move |inv| {
            let failed = output_path(inv)
                .map(|p| p.to_string_lossy().ends_with(suffix))
                .unwrap_or(false);
            Ok(ToolExit::with_code(if failed { 1 } else { 0 }))
        }))
    }

    /// Every run fails to spawn
    pub(crate) fn unspawnable() -> Self {
        Self::with_policy(Box::new(|_| {
            Err(crate::Error::ExternalTool(
                "Failed to execute ffmpeg: No such file or directory".into(),
            ))
        }))
    }

    /// Keep each run alive for `delay`
    pub(crate) fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Write the output file when a run succeeds
    pub(crate) fn creating_outputs(mut self) -> Self {
        self.create_output = true;
        self
    }

    /// Number of times the tool was started
    pub(crate) fn spawns(&self) -> usize {
        self.spawns.load(Ordering::SeqCst)
    }

    /// Highest number of overlapping runs observed
    pub(crate) fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    /// Invocations in the order they were started
    pub(crate) fn invocations(&self) -> Vec<Invocation> {
        self.invocations.lock().unwrap().clone()
    }

    /// Output paths in the order runs were started
    pub(crate) fn started_outputs(&self) -> Vec<PathBuf> {
        self.invocations().iter().filter_map(output_path).collect()
    }
}

#[async_trait]
impl ToolRunner for FakeRunner {
    async fn run(&self, invocation: &Invocation) -> Result<ToolExit> {
        self.invocations.lock().unwrap().push(invocation.clone());

        let exit = (self.policy)(invocation);
        if exit.is_err() {
            return exit;
        }

        self.spawns.fetch_add(1, Ordering::SeqCst);
        let now = self.running.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);

        if let ToolOutput::File(path) = invocation.output() {
            std::fs::write(path, "fake ffmpeg: combined stdout and stderr\n")?;
        }

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        if self.create_output
            && matches!(&exit, Ok(e) if e.success())
            && let Some(path) = output_path(invocation)
        {
            std::fs::write(path, b"remuxed")?;
        }

        self.running.fetch_sub(1, Ordering::SeqCst);
        exit
    }

    fn name(&self) -> &'static str {
        "fake-ffmpeg"
    }
}

/// The output path is always the last argument of a copy invocation
fn output_path(invocation: &Invocation) -> Option<PathBuf> {
    invocation.args().last().map(PathBuf::from)
}

/// In-memory log sink for asserting on emitted records
#[derive(Clone, Default)]
pub(crate) struct LogCapture {
    buf: Arc<Mutex<Vec<u8>>>,
}

impl LogCapture {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// A tracing dispatcher writing plain-text records into this capture
    pub(crate) fn dispatch(&self) -> Dispatch {
        let subscriber = tracing_subscriber::fmt()
            .with_writer(self.clone())
            .with_ansi(false)
            .with_max_level(tracing::Level::DEBUG)
            .finish();
        Dispatch::new(subscriber)
    }

    /// All captured lines
    pub(crate) fn lines(&self) -> Vec<String> {
        let buf = self.buf.lock().unwrap();
        String::from_utf8_lossy(&buf)
            .lines()
            .map(str::to_string)
            .collect()
    }

    /// Lines containing every one of `needles`
    pub(crate) fn matching(&self, needles: &[&str]) -> Vec<String> {
        self.lines()
            .into_iter()
            .filter(|line| needles.iter().all(|n| line.contains(n)))
            .collect()
    }
}

impl io::Write for LogCapture {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        self.buf.lock().unwrap().extend_from_slice(data);
        Ok(data.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for LogCapture {
    type Writer = LogCapture;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}
