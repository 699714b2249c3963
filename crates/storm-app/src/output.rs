//! Event rendering and output file routing.

use std::collections::HashMap;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

use chrono::{FixedOffset, Utc};
use tokio::fs::{File, OpenOptions};
use tokio::io::{AsyncWriteExt, BufWriter};
use tracing::{debug, info};

use storm_core::{Event, Result, StormError};
use storm_insight::short_hash;

use crate::cli::OutputFormat;

/// File-name label for events with no subject.
const UNKNOWN_SUBJECT: &str = "unknown";

impl OutputFormat {
    /// Parse the configured default.
    pub fn from_config(value: &str) -> Result<Self> {
        match value.to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "text" => Ok(Self::Text),
            other => Err(StormError::Config(format!("unknown output format '{}'", other))),
        }
    }
}

/// Renders one event per line.
#[derive(Clone, Debug)]
pub struct EventFormatter {
    format: OutputFormat,
    salt: String,
    offset: FixedOffset,
}

impl EventFormatter {
    pub fn new(format: OutputFormat, salt: impl Into<String>, offset: FixedOffset) -> Self {
        Self {
            format,
            salt: salt.into(),
            offset,
        }
    }

    pub fn format(&self, event: &Event) -> Result<String> {
        match self.format {
            OutputFormat::Json => Ok(serde_json::to_string(event)?),
            OutputFormat::Text => self.text_line(event),
        }
    }

    /// `DD/MM/YY HH:MM:SS [cats] hash (type[, duplicate][, authorIsSubject]) "text"`
    pub fn text_line(&self, event: &Event) -> Result<String> {
        let time = event.time_stamp.with_timezone(&self.offset);
        let mut type_info = event.post_type.as_str().to_string();
        if event.is_duplicate() {
            type_info.push_str(", duplicate");
        }
        if event.author_is_subject() {
            type_info.push_str(", authorIsSubject");
        }

        Ok(format!(
            "{} [{}] {} ({}) {}",
            time.format("%d/%m/%y %H:%M:%S"),
            event.categories.join(","),
            short_hash(&self.salt, &event.author.screen_name, 6),
            type_info,
            serde_json::to_string(&event.text)?
        ))
    }
}

/// `[cats] subject <= author (type) "text"`
pub fn pretty_line(event: &Event) -> Result<String> {
    Ok(format!(
        "[{}] {} <= {} ({}) {}",
        event.categories.join(","),
        event.subject.screen_name,
        event.author.screen_name,
        event.post_type,
        serde_json::to_string(&event.text)?
    ))
}

/// `<base>_<suffix>.txt`
pub fn variant_path(base: &Path, suffix: &str) -> PathBuf {
    let mut name = OsString::from(base.as_os_str());
    name.push(format!("_{}.txt", suffix));
    PathBuf::from(name)
}

/// How events are spread over output files.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Routing {
    /// Everything into the base path.
    Single,
    /// `<base>_<subject>.txt`, lowercase, `unknown` when there is none.
    BySubject,
    /// `<base>_<YYYYMMDD>.txt` with today's local date.
    ByDate,
}

/// Appends formatted events to one or more files.
pub struct EventWriter {
    base: PathBuf,
    routing: Routing,
    formatter: EventFormatter,
    offset: FixedOffset,
    files: HashMap<PathBuf, BufWriter<File>>,
    written: u64,
    progress_interval: u64,
}

impl EventWriter {
    pub fn new(
        base: PathBuf,
        routing: Routing,
        formatter: EventFormatter,
        offset: FixedOffset,
        progress_interval: u64,
    ) -> Self {
        Self {
            base,
            routing,
            formatter,
            offset,
            files: HashMap::new(),
            written: 0,
            progress_interval,
        }
    }

    /// Destination file for `event`.
    pub fn path_for(&self, event: &Event) -> PathBuf {
        match self.routing {
            Routing::Single => self.base.clone(),
            Routing::BySubject => {
                let subject = if event.subject.screen_name.is_empty() {
                    UNKNOWN_SUBJECT.to_string()
                } else {
                    event.subject.screen_name.to_lowercase()
                };
                variant_path(&self.base, &subject)
            }
            Routing::ByDate => {
                let today = Utc::now().with_timezone(&self.offset);
                variant_path(&self.base, &today.format("%Y%m%d").to_string())
            }
        }
    }

    pub async fn write(&mut self, event: &Event) -> Result<()> {
        let line = self.formatter.format(event)?;
        let path = self.path_for(event);

        if !self.files.contains_key(&path) {
            let file = open_append(&path).await?;
            debug!(path = %path.display(), "Output opened");
            self.files.insert(path.clone(), BufWriter::new(file));
        }
        if let Some(writer) = self.files.get_mut(&path) {
            writer.write_all(line.as_bytes()).await?;
            writer.write_all(b"\n").await?;
        }

        self.written += 1;
        if self.progress_interval > 0 && self.written % self.progress_interval == 0 {
            info!(written = self.written, "Events output");
        }
        Ok(())
    }

    /// Flush every open file. Returns the number of events written.
    pub async fn finish(mut self) -> Result<u64> {
        for (path, writer) in self.files.iter_mut() {
            writer.flush().await?;
            debug!(path = %path.display(), "Output flushed");
        }
        Ok(self.written)
    }
}

async fn open_append(path: &Path) -> Result<File> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent).await?;
        }
    }
    Ok(OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .await?)
}

/// Reject runs that would overwrite their own input.
pub fn check_distinct(input: &Path, output: &Path) -> Result<()> {
    let same = match (std::fs::canonicalize(input), std::fs::canonicalize(output)) {
        (Ok(a), Ok(b)) => a == b,
        _ => input == output,
    };
    if same {
        return Err(StormError::InvalidInput(format!(
            "input and output must differ: {}",
            input.display()
        )));
    }
    Ok(())
}
