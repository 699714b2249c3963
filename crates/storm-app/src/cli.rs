//! CLI argument definitions for the Stormwatch application.
//!
//! Uses `clap` with derive macros. Every subcommand reads one JSON-lines
//! file. Priority resolution: CLI args > env vars > config file > defaults.

use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand, ValueEnum};

use storm_insight::FilterOptions;

/// Stormwatch - detects reply storms aimed at monitored accounts.
#[derive(Parser, Debug)]
#[command(name = "stormwatch", version, about)]
pub struct CliArgs {
    /// Path to the configuration file.
    #[arg(short = 'c', long = "config", global = true)]
    pub config: Option<PathBuf>,

    /// Subject list (JSON array of user records).
    #[arg(long = "subjects", global = true)]
    pub subjects: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short = 'l', long = "log-level", global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Convert raw platform payloads into canonical events.
    Normalize {
        input: PathBuf,
        #[command(flatten)]
        output: OutputArgs,
        #[command(flatten)]
        filter: FilterArgs,
    },
    /// Print one readable line per event to stdout.
    PrettyPrint {
        input: PathBuf,
        #[command(flatten)]
        filter: FilterArgs,
        /// Print per-subject counts when done.
        #[arg(short = 't', long = "stats")]
        stats: bool,
    },
    /// Copy the events that pass the filters.
    Extract {
        input: PathBuf,
        #[command(flatten)]
        output: OutputArgs,
        #[command(flatten)]
        filter: FilterArgs,
        /// Write one `<output>_<subject>.txt` file per subject.
        #[arg(long = "split-by-subject", conflicts_with = "date_suffix")]
        split_by_subject: bool,
        /// Write to `<output>_<YYYYMMDD>.txt`, dated today.
        #[arg(long = "date-suffix")]
        date_suffix: bool,
    },
    /// Tag events with the corpus phrases they contain.
    Categorize {
        input: PathBuf,
        /// Phrase list, one per line; only the first `|` column is used.
        #[arg(short = 'r', long = "corpus")]
        corpus: PathBuf,
        #[command(flatten)]
        output: OutputArgs,
        #[command(flatten)]
        filter: FilterArgs,
    },
    /// Mark each event as the first or a repeat sighting of its message.
    IdentifyDuplicates {
        input: PathBuf,
        #[command(flatten)]
        output: OutputArgs,
        #[command(flatten)]
        filter: FilterArgs,
    },
    /// Bucket events in time, flag storms and list duplicate clusters.
    Statistics {
        input: PathBuf,
        /// Report file.
        #[arg(short = 'o', long = "output")]
        output: Option<PathBuf>,
        #[command(flatten)]
        filter: FilterArgs,
        /// Bucket by hour instead of by day.
        #[arg(long = "by-hour")]
        by_hour: bool,
        /// Print per-subject counts when done.
        #[arg(short = 't', long = "stats")]
        stats: bool,
    },
}

impl Command {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Normalize { .. } => "normalize",
            Self::PrettyPrint { .. } => "pretty-print",
            Self::Extract { .. } => "extract",
            Self::Categorize { .. } => "categorize",
            Self::IdentifyDuplicates { .. } => "identify-duplicates",
            Self::Statistics { .. } => "statistics",
        }
    }
}

/// Event output options.
#[derive(Args, Debug, Clone)]
pub struct OutputArgs {
    /// File to write to.
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,

    /// Event output format. Defaults to the configured format.
    #[arg(short = 'm', long = "format", value_enum)]
    pub format: Option<OutputFormat>,

    /// Print per-subject counts when done.
    #[arg(short = 't', long = "stats")]
    pub stats: bool,
}

impl OutputArgs {
    pub fn output_or(&self, default: &str) -> PathBuf {
        self.output
            .clone()
            .unwrap_or_else(|| PathBuf::from(default))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Json,
    Text,
}

/// Event selection options shared by every subcommand.
#[derive(Args, Debug, Clone, Default)]
pub struct FilterArgs {
    /// Keep only events about this subject.
    #[arg(short = 'f', long = "filter-subject")]
    pub filter_subject: Option<String>,

    /// Keep only events written by this account.
    #[arg(short = 'a', long = "filter-author")]
    pub filter_author: Option<String>,

    /// Drop repeat sightings of a message.
    #[arg(short = 'd', long = "remove-duplicates", conflicts_with = "only_duplicates")]
    pub remove_duplicates: bool,

    /// Keep only events an earlier identify-duplicates run marked as repeats.
    #[arg(short = 'D', long = "only-duplicates")]
    pub only_duplicates: bool,

    /// Drop events without categories.
    #[arg(short = 'u', long = "categorized-only")]
    pub categorized_only: bool,
}

impl FilterArgs {
    pub fn to_options(&self, identify_duplicates: bool) -> FilterOptions {
        FilterOptions {
            subject: self.filter_subject.clone(),
            author: self.filter_author.clone(),
            categorized_only: self.categorized_only,
            remove_duplicates: self.remove_duplicates,
            only_duplicates: self.only_duplicates,
            identify_duplicates,
        }
    }
}

impl CliArgs {
    /// Resolve the configuration file path.
    ///
    /// Priority: --config flag > STORMWATCH_CONFIG env var > ./stormwatch.toml.
    pub fn resolve_config_path(&self) -> PathBuf {
        resolve_config_path(self.config.as_deref(), std::env::var("STORMWATCH_CONFIG").ok())
    }

    /// Resolve the subject list path.
    ///
    /// Priority: --subjects flag > config file value.
    pub fn resolve_subjects_path(&self, config_value: &str) -> PathBuf {
        self.subjects
            .clone()
            .unwrap_or_else(|| PathBuf::from(config_value))
    }

    /// Resolve the log level.
    ///
    /// Priority: --log-level flag > config file value.
    pub fn resolve_log_level(&self, config_value: &str) -> String {
        self.log_level
            .clone()
            .unwrap_or_else(|| config_value.to_string())
    }
}

fn resolve_config_path(flag: Option<&Path>, env: Option<String>) -> PathBuf {
    if let Some(p) = flag {
        return p.to_path_buf();
    }
    if let Some(p) = env.filter(|p| !p.is_empty()) {
        return PathBuf::from(p);
    }
    PathBuf::from("stormwatch.toml")
}
