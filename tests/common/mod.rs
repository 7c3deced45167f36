//! Common test utilities for hls-dl integration tests

use hls_dl::Config;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use tempfile::TempDir;

/// Shell stand-in for ffmpeg
///
/// Echoes its arguments to stdout and a marker to stderr, refuses to touch an
/// existing output (like `-n`), exits with 3 when the output name contains
/// `fail`, and otherwise writes the output file.
const FAKE_FFMPEG: &str = r#"#!/bin/sh
for arg in "$@"; do out="$arg"; done
echo "fake-ffmpeg args: $*"
echo "fake-ffmpeg stderr marker" >&2
case "${out##*/}" in
  *fail*) echo "Server returned 404 Not Found" >&2; exit 3 ;;
esac
if [ -e "$out" ]; then
  echo "File '$out' already exists. Exiting." >&2
  exit 1
fi
sleep 0.1
printf 'remuxed' > "$out"
"#;

static FAKE: OnceLock<(TempDir, PathBuf)> = OnceLock::new();

/// Path of the fake ffmpeg script, written once per test binary
///
/// Writing it once, before any test can spawn it, avoids "text file busy"
/// errors from forks racing an open write handle.
pub fn fake_ffmpeg() -> &'static Path {
    let (_dir, path) = FAKE.get_or_init(|| {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ffmpeg");
        std::fs::write(&path, FAKE_FFMPEG).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        (dir, path)
    });
    path
}

/// Config writing into `<temp>/out` with logs in `<temp>/logs`, using the fake ffmpeg
pub fn fake_config(temp: &TempDir, max_concurrent: usize) -> Config {
    let mut config = Config::new(temp.path().join("out"));
    config.log_dir = Some(temp.path().join("logs"));
    config.max_concurrent_downloads = max_concurrent;
    config.tools.ffmpeg_path = Some(fake_ffmpeg().to_path_buf());
    config
}
