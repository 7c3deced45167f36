//! Configuration types for hls-dl

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// HTTP proxy that ffmpeg should route its requests through
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProxyConfig {
    /// Proxy host name or IP address
    pub host: String,
    /// Proxy port
    pub port: u16,
}

impl ProxyConfig {
    /// Create a proxy configuration from a host and port
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    /// Proxy address in the form ffmpeg's `-http_proxy` option expects
    pub fn url(&self) -> String {
        format!("http://{}:{}/", self.host, self.port)
    }
}

/// External tool settings
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ToolsConfig {
    /// Path to the ffmpeg executable (auto-detected if None)
    #[serde(default)]
    pub ffmpeg_path: Option<PathBuf>,

    /// Whether to search PATH for ffmpeg if no explicit path is set (default: true)
    #[serde(default = "default_true")]
    pub search_path: bool,

    /// Let ffmpeg write to this process's stdout/stderr when no diagnostic
    /// log directory is configured (default: false, output is discarded)
    #[serde(default)]
    pub forward_output: bool,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            ffmpeg_path: None,
            search_path: true,
            forward_output: false,
        }
    }
}

/// Main configuration for [`Downloader`](crate::Downloader)
///
/// Every field has a default, so an empty JSON/TOML document is a valid
/// configuration that downloads into the current directory one stream at a
/// time.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Config {
    /// Directory the downloaded videos are written to (default: ".")
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Optional HTTP proxy passed to ffmpeg
    #[serde(default)]
    pub proxy: Option<ProxyConfig>,

    /// Directory for per-task ffmpeg logs (None = no diagnostic logs)
    #[serde(default)]
    pub log_dir: Option<PathBuf>,

    /// Maximum number of ffmpeg processes running at once (default: 1)
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent_downloads: usize,

    /// External tool settings
    #[serde(default)]
    pub tools: ToolsConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            proxy: None,
            log_dir: None,
            max_concurrent_downloads: default_max_concurrent(),
            tools: ToolsConfig::default(),
        }
    }
}

impl Config {
    /// Configuration writing into `output_dir` with all other settings at their defaults
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
            ..Default::default()
        }
    }

    /// Check settings that serde cannot enforce on its own
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the concurrency limit is zero or the proxy
    /// host is blank.
    pub fn validate(&self) -> Result<()> {
        if self.max_concurrent_downloads == 0 {
            return Err(Error::config(
                "max_concurrent_downloads",
                "must be at least 1",
            ));
        }

        if let Some(proxy) = &self.proxy
            && proxy.host.trim().is_empty()
        {
            return Err(Error::config("proxy.host", "proxy host must not be empty"));
        }

        if self.output_dir.as_os_str().is_empty() {
            return Err(Error::config("output_dir", "output directory must not be empty"));
        }

        Ok(())
    }
}

// Default value functions
fn default_output_dir() -> PathBuf {
    PathBuf::from(".")
}

fn default_max_concurrent() -> usize {
    1
}

fn default_true() -> bool {
    true
}
