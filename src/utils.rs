//! Utility functions for path handling and log file naming

use crate::error::{Error, Result};
use chrono::{DateTime, TimeZone};
use std::fmt::Display;
use std::path::{Component, Path};

/// Timestamp prefix of diagnostic log file names
pub const LOG_TIMESTAMP_FORMAT: &str = "%Y%m%d-%H%M%S";

/// Name of the diagnostic log for `filename` started at `at`:
/// `{YYYYMMDD-HHMMSS}-{filename}.log`
pub fn log_file_name<Tz>(at: &DateTime<Tz>, filename: &str) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    format!("{}-{}.log", at.format(LOG_TIMESTAMP_FORMAT), filename)
}

/// Check that `filename` is a plain file name that stays inside the output directory
///
/// # Errors
///
/// Returns [`Error::InvalidFilename`] for empty names, `.`/`..`, absolute
/// paths and anything containing a path separator.
pub fn validate_filename(filename: &str) -> Result<()> {
    let mut components = Path::new(filename).components();
    let single_normal =
        matches!(components.next(), Some(Component::Normal(_))) && components.next().is_none();

    if filename.is_empty() || filename.contains(['/', '\\']) || !single_normal {
        return Err(Error::InvalidFilename(filename.to_string()));
    }
    Ok(())
}

/// Create `path` (and its parents) unless it already is a directory
///
/// `purpose` only feeds the log line, e.g. "output" or "ffmpeg log".
pub(crate) async fn ensure_dir(path: &Path, purpose: &str) -> Result<()> {
    match tokio::fs::metadata(path).await {
        Ok(meta) if meta.is_dir() => return Ok(()),
        Ok(_) => {
            return Err(Error::Filesystem {
                path: path.to_path_buf(),
                source: std::io::Error::new(
                    std::io::ErrorKind::AlreadyExists,
                    "path exists but is not a directory",
                ),
            });
        }
        Err(_) => {}
    }

    tokio::fs::create_dir_all(path)
        .await
        .map_err(|source| Error::Filesystem {
            path: path.to_path_buf(),
            source,
        })?;

    tracing::info!(path = %path.display(), "created {} directory", purpose);
    Ok(())
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, Utc};
    use tempfile::tempdir;

    #[test]
    fn log_file_name_uses_compact_timestamp() {
        let at = NaiveDate::from_ymd_opt(2024, 3, 9)
            .unwrap()
            .and_hms_opt(7, 5, 2)
            .unwrap()
            .and_utc();

        assert_eq!(log_file_name(&at, "a.mp4"), "20240309-070502-a.mp4.log");
    }

    #[test]
    fn log_file_name_timestamp_parses_back() {
        let name = log_file_name(&Utc::now(), "clip.ts");
        let stamp = &name[..15];
        chrono::NaiveDateTime::parse_from_str(stamp, LOG_TIMESTAMP_FORMAT).unwrap();
        assert!(name.ends_with("-clip.ts.log"));
    }

    #[test]
    fn plain_names_are_valid() {
        for name in ["a.mp4", "episode 01.mkv", ".hidden.mp4", "weird;name&.ts"] {
            validate_filename(name).unwrap_or_else(|e| panic!("{name}: {e}"));
        }
    }

    #[test]
    fn names_escaping_the_output_dir_are_rejected() {
        for name in ["", ".", "..", "../a.mp4", "sub/a.mp4", "/abs.mp4", "sub\\a.mp4", "a.mp4/"] {
            assert!(
                matches!(validate_filename(name), Err(Error::InvalidFilename(_))),
                "{name:?} should be rejected"
            );
        }
    }

    #[tokio::test]
    async fn ensure_dir_creates_nested_directories() {
        let temp = tempdir().unwrap();
        let nested = temp.path().join("a/b/c");

        ensure_dir(&nested, "output").await.unwrap();
        assert!(nested.is_dir());

        // Existing directory is fine
        ensure_dir(&nested, "output").await.unwrap();
    }

    #[tokio::test]
    async fn ensure_dir_rejects_regular_file() {
        let temp = tempdir().unwrap();
        let file = temp.path().join("not-a-dir");
        std::fs::write(&file, b"x").unwrap();

        match ensure_dir(&file, "output").await {
            Err(Error::Filesystem { path, .. }) => assert_eq!(path, file),
            other => panic!("expected Filesystem error, got {other:?}"),
        }
    }
}
