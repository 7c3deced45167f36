use super::test_helpers::{TestDownloader, create_test_downloader};
use crate::config::{Config, ProxyConfig};
use crate::downloader::Downloader;
use crate::error::Error;
use crate::test_helpers::{FakeRunner, LogCapture};
use crate::tool::ToolOutput;
use crate::types::{Event, Submission};
use std::ffi::OsString;
use std::sync::Arc;
use std::time::Duration;
use tempfile::tempdir;
use tokio::sync::broadcast;


/// Everything currently buffered on an event receiver
fn collect_events(rx: &mut broadcast::Receiver<Event>) -> Vec<Event> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

fn arg_strings(args: &[OsString]) -> Vec<String> {
    args.iter()
        .map(|a| a.to_string_lossy().into_owned())
        .collect()
}
