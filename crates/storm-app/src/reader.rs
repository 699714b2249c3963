//! Line-by-line JSON input.

use std::path::{Path, PathBuf};

use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, BufReader, Lines};
use tracing::{debug, info, warn};

use storm_core::{Event, Result};
use storm_insight::InsightError;

/// Per-run record accounting.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ReadCounts {
    pub read: u64,
    pub emitted: u64,
    pub malformed: u64,
    pub missing_timestamp: u64,
}

impl ReadCounts {
    /// Count a record that could not be turned into an event.
    pub fn skip(&mut self, line_number: u64, error: &InsightError) {
        match error {
            InsightError::MissingTimestamp => {
                self.missing_timestamp += 1;
                debug!(line = line_number, "Skipping record without timestamp");
            }
            _ => {
                self.malformed += 1;
                warn!(line = line_number, error = %error, "Skipping malformed record");
            }
        }
    }

    pub fn log_summary(&self, path: &Path) {
        info!(
            path = %path.display(),
            read = self.read,
            emitted = self.emitted,
            malformed = self.malformed,
            missing_timestamp = self.missing_timestamp,
            "Input processed"
        );
    }
}

/// Reads a JSON-lines file, skipping blank lines.
pub struct LineReader {
    path: PathBuf,
    lines: Lines<BufReader<File>>,
    line_number: u64,
}

impl LineReader {
    pub async fn open(path: &Path) -> Result<Self> {
        let file = File::open(path).await?;
        debug!(path = %path.display(), "Input opened");
        Ok(Self {
            path: path.to_path_buf(),
            lines: BufReader::new(file).lines(),
            line_number: 0,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// One-based number of the line last returned.
    pub fn line_number(&self) -> u64 {
        self.line_number
    }

    pub async fn next_line(&mut self) -> Result<Option<String>> {
        while let Some(line) = self.lines.next_line().await? {
            self.line_number += 1;
            if !line.trim().is_empty() {
                return Ok(Some(line));
            }
        }
        Ok(None)
    }
}

/// Parse one canonical event line.
pub fn parse_event(line: &str) -> std::result::Result<Event, InsightError> {
    Ok(serde_json::from_str(line)?)
}
