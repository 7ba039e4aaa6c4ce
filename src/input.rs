//! Access log file reading.
//!
//! Reads the configured log file, falling back to a same-named copy in the
//! fallback directory (useful when developing away from the server). When
//! neither file exists the pipeline proceeds with zero records; a missing log
//! is not an error.

use std::path::{Path, PathBuf};

use log::{info, warn};
use tokio::io::{AsyncBufReadExt, BufReader};

/// Reads all lines from the log at `path`, or from
/// `<fallback_dir>/<file name>` when `path` is missing.
///
/// Returns an empty vector when no log is available.
pub async fn read_log_lines(path: &Path, fallback_dir: &Path) -> Vec<String> {
    match read_lines(path).await {
        Some(lines) => lines,
        None => {
            let fallback: Option<PathBuf> = path.file_name().map(|name| fallback_dir.join(name));
            match fallback {
                Some(fallback_path) => {
                    warn!(
                        "File '{}' not found. Trying local copy '{}'",
                        path.display(),
                        fallback_path.display()
                    );
                    match read_lines(&fallback_path).await {
                        Some(lines) => lines,
                        None => {
                            warn!("Local file not found. No logs available.");
                            Vec::new()
                        }
                    }
                }
                None => {
                    warn!("Local file not found. No logs available.");
                    Vec::new()
                }
            }
        }
    }
}

async fn read_lines(path: &Path) -> Option<Vec<String>> {
    let file = tokio::fs::File::open(path).await.ok()?;
    let mut reader = BufReader::new(file).lines();
    let mut lines = Vec::new();
    while let Ok(Some(line)) = reader.next_line().await {
        lines.push(line);
    }
    info!("Loaded {} lines from {}", lines.len(), path.display());
    Some(lines)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[tokio::test]
    async fn test_reads_primary_path() {
        let dir = tempfile::tempdir().unwrap();
        let log_path = dir.path().join("access.log");
        let mut file = std::fs::File::create(&log_path).unwrap();
        writeln!(file, "line one").unwrap();
        writeln!(file, "line two").unwrap();

        let lines = read_log_lines(&log_path, dir.path()).await;
        assert_eq!(lines, vec!["line one".to_string(), "line two".to_string()]);
    }

    #[tokio::test]
    async fn test_falls_back_to_local_copy() {
        let dir = tempfile::tempdir().unwrap();
        let fallback_dir = dir.path().join("nginx");
        std::fs::create_dir(&fallback_dir).unwrap();
        let mut file = std::fs::File::create(fallback_dir.join("access.log")).unwrap();
        writeln!(file, "fallback line").unwrap();

        let missing_primary = dir.path().join("access.log");
        let lines = read_log_lines(&missing_primary, &fallback_dir).await;
        assert_eq!(lines, vec!["fallback line".to_string()]);
    }

    #[tokio::test]
    async fn test_missing_everywhere_yields_zero_records() {
        let dir = tempfile::tempdir().unwrap();
        let lines = read_log_lines(&dir.path().join("nope.log"), &dir.path().join("nginx")).await;
        assert!(lines.is_empty());
    }
}
