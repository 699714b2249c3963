//! Subcommand runners.

use std::path::{Path, PathBuf};

use chrono::{FixedOffset, NaiveDate};
use tracing::{info, warn};

use storm_core::{Result, StormConfig, SubjectRecord};
use storm_insight::{
    AnomalyDetector, Canonicalizer, CategoryMatcher, Corpus, CountingPass, EventFilter,
    EventNormalizer, FilterOptions, Granularity, StormThresholds, SubjectRegistry,
    TemporalAggregator,
};

use crate::cli::{Command, FilterArgs, OutputArgs, OutputFormat};
use crate::output::{check_distinct, pretty_line, EventFormatter, EventWriter, Routing};
use crate::report::{append_summary, report_handle, ReportWriter};
use crate::source::{EventSource, Stage};

/// Settings and inputs shared by every command.
pub struct Context {
    pub config: StormConfig,
    pub subjects: SubjectRegistry,
    pub epoch: NaiveDate,
    pub offset: FixedOffset,
}

impl Context {
    pub fn new(config: StormConfig, subjects_path: &Path) -> Result<Self> {
        let epoch = config.detection.epoch_date()?;
        let offset = config.detection.utc_offset()?;

        let subjects = if subjects_path.exists() {
            SubjectRegistry::load(subjects_path)?
        } else {
            warn!(path = %subjects_path.display(), "Subject list not found, no subjects will be identified");
            SubjectRegistry::default()
        };

        Ok(Self {
            config,
            subjects,
            epoch,
            offset,
        })
    }
}

pub async fn run(command: &Command, ctx: &Context) -> Result<()> {
    info!(command = command.name(), "Running");

    match command {
        Command::Normalize {
            input,
            output,
            filter,
        } => {
            let stage = Stage::Normalize(EventNormalizer::new(ctx.subjects.clone()));
            let target = output.output_or("tweetsNormalized.txt");
            copy_events(ctx, input, target, output, Routing::Single, stage, filter.to_options(false)).await
        }
        Command::PrettyPrint {
            input,
            filter,
            stats,
        } => pretty_print(ctx, input, filter, *stats).await,
        Command::Extract {
            input,
            output,
            filter,
            split_by_subject,
            date_suffix,
        } => {
            let routing = if *split_by_subject {
                Routing::BySubject
            } else if *date_suffix {
                Routing::ByDate
            } else {
                Routing::Single
            };
            let target = output.output_or("tweetsExtracted.txt");
            copy_events(ctx, input, target, output, routing, Stage::Events, filter.to_options(false)).await
        }
        Command::Categorize {
            input,
            corpus,
            output,
            filter,
        } => {
            let corpus = Corpus::load(corpus)?;
            let stage = Stage::Categorize(CategoryMatcher::new(corpus));
            let target = output.output_or("tweetsCategorized.txt");
            copy_events(ctx, input, target, output, Routing::Single, stage, filter.to_options(false)).await
        }
        Command::IdentifyDuplicates {
            input,
            output,
            filter,
        } => {
            let target = output.output_or("tweetsDeduplicated.txt");
            copy_events(ctx, input, target, output, Routing::Single, Stage::Events, filter.to_options(true)).await
        }
        Command::Statistics {
            input,
            output,
            filter,
            by_hour,
            stats,
        } => {
            let target = output.clone().unwrap_or_else(|| PathBuf::from("stats.txt"));
            let granularity = if *by_hour {
                Granularity::Hour
            } else {
                Granularity::Day
            };
            statistics(ctx, input, &target, filter, granularity, *stats).await
        }
    }
}

async fn copy_events(
    ctx: &Context,
    input: &Path,
    target: PathBuf,
    output: &OutputArgs,
    routing: Routing,
    stage: Stage,
    options: FilterOptions,
) -> Result<()> {
    check_distinct(input, &target)?;

    let format = match output.format {
        Some(format) => format,
        None => OutputFormat::from_config(&ctx.config.output.format)?,
    };
    let formatter = EventFormatter::new(format, ctx.config.output.author_salt.clone(), ctx.offset);
    let mut writer = EventWriter::new(
        target.clone(),
        routing,
        formatter,
        ctx.offset,
        ctx.config.output.progress_interval,
    );

    let filter = EventFilter::new(options, Canonicalizer::new());
    let mut source = EventSource::open(input, stage, filter).await?;
    if output.stats {
        source = source.with_tally(ctx.subjects.records());
    }

    while let Some(event) = source.next().await? {
        writer.write(&event).await?;
    }

    let written = writer.finish().await?;
    info!(path = %target.display(), written, "Events written");
    source.report();
    Ok(())
}

async fn pretty_print(ctx: &Context, input: &Path, filter: &FilterArgs, stats: bool) -> Result<()> {
    let filter = EventFilter::new(filter.to_options(false), Canonicalizer::new());
    let mut source = EventSource::open(input, Stage::Events, filter).await?;
    if stats {
        source = source.with_tally(ctx.subjects.records());
    }

    while let Some(event) = source.next().await? {
        println!("{}", pretty_line(&event)?);
    }

    source.report();
    Ok(())
}

async fn statistics(
    ctx: &Context,
    input: &Path,
    target: &Path,
    filter: &FilterArgs,
    granularity: Granularity,
    stats: bool,
) -> Result<()> {
    check_distinct(input, target)?;

    let canonicalizer = Canonicalizer::new();
    let options = filter.to_options(false);
    let aggregator = TemporalAggregator::new(ctx.epoch, ctx.offset);
    let detector = AnomalyDetector::new(StormThresholds::from(&ctx.config.detection));

    let mut counting = CountingPass::new(canonicalizer.clone(), aggregator, detector);
    let mut source = EventSource::open(
        input,
        Stage::Events,
        EventFilter::new(options.clone(), canonicalizer.clone()),
    )
    .await?;
    while let Some(event) = source.next().await? {
        counting.record(&event);
    }
    source.counts().log_summary(input);

    let mut aggregating = counting.close();
    let mut source = EventSource::open(
        input,
        Stage::Events,
        EventFilter::new(options, canonicalizer.clone()),
    )
    .await?;
    if stats {
        source = source.with_tally(ctx.subjects.records());
    }
    while let Some(event) = source.next().await? {
        aggregating.aggregate(&event);
    }
    source.report();

    let outcome = aggregating.finish(granularity);

    let handle = report_handle(filter.filter_subject.as_deref(), target);
    let subject = ctx
        .subjects
        .by_screen_name(&handle)
        .cloned()
        .unwrap_or_else(SubjectRecord::unknown);
    let report = ReportWriter {
        handle: &handle,
        subject: &subject,
        duplicate_limit: ctx.config.output.duplicate_report_limit,
        offset: ctx.offset,
        canonicalizer: &canonicalizer,
    };

    if let Some(parent) = target.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent).await?;
        }
    }
    tokio::fs::write(target, report.render(&outcome)?).await?;
    append_summary(
        Path::new(&ctx.config.output.summary_file),
        &report.summary_row(&outcome.storms),
    )
    .await?;

    info!(
        path = %target.display(),
        storms = outcome.storms.num_storm_windows,
        clusters = outcome.duplicates.len(),
        "Statistics report written"
    );
    println!(
        "{}, storm {}s => {}",
        target.display(),
        granularity.as_str(),
        outcome.storms.num_storm_windows
    );
    Ok(())
}
