//! Basic download example
//!
//! This example demonstrates the core functionality of hls-dl:
//! - Configuring output and log directories
//! - Creating a downloader instance
//! - Subscribing to events
//! - Queueing HLS streams
//! - Draining on completion or Ctrl+C
//!
//! Usage:
//!
//! ```text
//! cargo run --example basic_download -- <output-dir> <url> <filename> [<url> <filename> ...]
//! ```
//!
//! Set `HLS_PROXY=host:port` to route ffmpeg through an HTTP proxy and
//! `RUST_LOG=debug` to see the exact ffmpeg command lines.

use hls_dl::{Config, Downloader, Event, ProxyConfig, Submission, shutdown_on_signal};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let mut args = std::env::args().skip(1);
    let Some(output_dir) = args.next() else {
        eprintln!("usage: basic_download <output-dir> <url> <filename> [<url> <filename> ...]");
        std::process::exit(2);
    };
    let pairs: Vec<String> = args.collect();
    if pairs.is_empty() || pairs.len() % 2 != 0 {
        eprintln!("expected one or more <url> <filename> pairs");
        std::process::exit(2);
    }

    // Build configuration
    let mut config = Config::new(&output_dir);
    config.max_concurrent_downloads = 3;
    config.log_dir = Some(std::path::Path::new(&output_dir).join("logs"));
    if let Ok(proxy) = std::env::var("HLS_PROXY")
        && let Some((host, port)) = proxy.rsplit_once(':')
    {
        config.proxy = Some(ProxyConfig::new(host, port.parse()?));
    }

    // Create downloader instance
    let downloader = Downloader::new(config).await?;

    // Subscribe to events
    let mut events = downloader.subscribe();
    tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            match event {
                Event::Started { filename, .. } => println!("started   {filename}"),
                Event::Completed {
                    filename, duration, ..
                } => println!("completed {filename} in {duration:?}"),
                Event::Failed {
                    filename, log_path, ..
                } => match log_path {
                    Some(log) => println!("failed    {filename}, see {}", log.display()),
                    None => println!("failed    {filename}"),
                },
                _ => {}
            }
        }
    });

    for pair in pairs.chunks(2) {
        if let Submission::Skipped { path, .. } = downloader.download(&pair[0], &pair[1]).await? {
            println!("skipped   {} (already exists)", path.display());
        }
    }

    // Wait for every download, or stop waiting on Ctrl+C
    shutdown_on_signal(&downloader).await?;
    Ok(())
}
