//! Statistics report and run summary rendering.
//!
//! The layout is comma-separated text read by existing spreadsheets, so
//! labels and column order are fixed.

use std::path::Path;

use chrono::FixedOffset;
use tokio::io::AsyncWriteExt;
use tracing::info;

use storm_core::{Result, SubjectRecord};
use storm_insight::{Canonicalizer, DuplicateCluster, StatisticsOutcome, StormReport};

pub const BUCKET_HEADER: &str =
    "title,timepoint,isStorm,count,unclassified,unclassifiedDuplicate,classified,classifiedDuplicate,stddevs";

pub const DUPLICATE_HEADER: &str = "count,authorIsSubject,time,original_tweet";

pub const SUMMARY_HEADER: &str = "screen_name, name, followers, numStormDays, median, mean, standardDeviation, count, unclassified, unclassifiedDuplicate, classified, classifiedDuplicate";

/// The subject a report is about: the filtered subject if given, otherwise
/// the part of the output file name after its last `_`, up to the first `.`.
pub fn report_handle(filter_subject: Option<&str>, output: &Path) -> String {
    if let Some(subject) = filter_subject {
        return subject.to_lowercase();
    }
    let name = output
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let tail = name.rsplit('_').next().unwrap_or_default();
    tail.split('.').next().unwrap_or_default().to_lowercase()
}

fn flag(value: bool) -> u8 {
    u8::from(value)
}

/// Renders the statistics report for one run.
pub struct ReportWriter<'a> {
    pub handle: &'a str,
    pub subject: &'a SubjectRecord,
    pub duplicate_limit: usize,
    pub offset: FixedOffset,
    pub canonicalizer: &'a Canonicalizer,
}

impl ReportWriter<'_> {
    pub fn render(&self, outcome: &StatisticsOutcome) -> Result<String> {
        let report = &outcome.storms;
        let stats = &report.stats;
        let mut out = String::new();

        out.push_str(&format!("Screen name,\"{}\"\n", self.handle));
        out.push_str(&format!("Name,\"{}\"\n", self.subject.name));
        out.push_str(&format!(
            "Description,\"{}\"\n",
            self.subject.description.as_deref().unwrap_or_default()
        ));
        out.push_str(&format!("Followers,{}\n", self.subject.followers_count));

        out.push_str(&format!("Num Storm Days,{}\n", report.num_storm_windows));
        out.push_str(&format!("Median,{}\n", stats.median));
        out.push_str(&format!("Mean,{}\n", stats.mean));
        out.push_str(&format!("Standard deviation,{}\n", stats.standard_deviation));
        out.push_str(&format!("Sum,{}\n", stats.sum));

        out.push_str(&format!("\n{}\n", BUCKET_HEADER));
        for b in &report.buckets {
            out.push_str(&format!(
                "{},{},{},{},{},{},{},{},{}\n",
                b.title,
                b.point,
                flag(b.is_storm),
                b.counts.count,
                b.counts.unclassified,
                b.counts.unclassified_duplicate,
                b.counts.classified,
                b.counts.classified_duplicate,
                b.stddev_score
            ));
        }

        for author_is_subject in [false, true] {
            out.push_str(&format!("\n{}\n", DUPLICATE_HEADER));
            for cluster in outcome
                .duplicates
                .top(self.duplicate_limit, author_is_subject)
            {
                out.push_str(&self.duplicate_row(cluster)?);
                out.push('\n');
            }
        }

        Ok(out)
    }

    fn duplicate_row(&self, cluster: &DuplicateCluster) -> Result<String> {
        let exemplar = &cluster.exemplar;
        let time = exemplar.time_stamp.with_timezone(&self.offset);
        let text = self.canonicalizer.clean_message(&exemplar.text);
        Ok(format!(
            "{},{},\"{}\",{}",
            cluster.count,
            flag(exemplar.author_is_subject()),
            time.format("%d/%m/%y %H:%M:%S"),
            serde_json::to_string(&text)?
        ))
    }

    /// One line for the cross-run summary file.
    pub fn summary_row(&self, report: &StormReport) -> String {
        let stats = &report.stats;
        format!(
            "\"{}\", \"{}\", {}, {},{},{},{},{},{},{},{},{}",
            self.handle,
            self.subject.name,
            self.subject.followers_count,
            report.num_storm_windows,
            stats.median,
            stats.mean,
            stats.standard_deviation,
            stats.totals.count,
            stats.totals.unclassified,
            stats.totals.unclassified_duplicate,
            stats.totals.classified,
            stats.totals.classified_duplicate
        )
    }
}

/// Append `row` to the summary file, writing the header first if the file
/// is new.
pub async fn append_summary(path: &Path, row: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent).await?;
        }
    }
    let is_new = !tokio::fs::try_exists(path).await?;

    let mut file = tokio::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .await?;
    if is_new {
        file.write_all(SUMMARY_HEADER.as_bytes()).await?;
        file.write_all(b"\n").await?;
    }
    file.write_all(row.as_bytes()).await?;
    file.write_all(b"\n").await?;
    file.flush().await?;

    info!(path = %path.display(), "Summary row appended");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use storm_core::{Author, Event, SubjectRef};
    use storm_insight::{
        AnomalyDetector, Bucket, BucketCounts, DuplicateReport, Granularity, StormThresholds,
    };

    fn subject() -> SubjectRecord {
        SubjectRecord {
            id: 1,
            screen_name: "MinisterA".to_string(),
            name: "Minister A".to_string(),
            description: Some("Water".to_string()),
            followers_count: 5000,
            location: None,
            handle: None,
        }
    }

    fn bucket(point: f64, title: &str, unclassified: u64, classified: u64) -> Bucket {
        Bucket {
            point,
            title: title.to_string(),
            counts: BucketCounts {
                count: unclassified + classified,
                unclassified,
                classified,
                ..BucketCounts::default()
            },
            stddev_score: 0.0,
            is_storm: false,
        }
    }

    fn cluster(count: u64, author_id: u64, subject_id: u64, text: &str) -> DuplicateCluster {
        let ts = Utc.with_ymd_and_hms(2020, 3, 1, 10, 0, 0).unwrap();
        let screen_name = if author_id == subject_id {
            "MinisterA".to_string()
        } else {
            format!("user{}", author_id)
        };
        let author = Author {
            id: author_id,
            screen_name,
            ..Author::default()
        };
        let mut exemplar = Event::new(author_id, ts, text, author);
        exemplar.subject = SubjectRef::new(subject_id, "MinisterA");
        DuplicateCluster {
            key: Canonicalizer::new().canonical_key(text),
            count,
            exemplar,
        }
    }

    fn outcome() -> StatisticsOutcome {
        let detector = AnomalyDetector::new(StormThresholds {
            zscore: 1.5,
            min_count: 1,
        });
        let storms = detector.finalize(
            Granularity::Day,
            vec![
                bucket(60.0, "01/03/20", 1, 0),
                bucket(61.0, "02/03/20", 0, 1),
                bucket(62.0, "03/03/20", 1, 0),
                bucket(63.0, "04/03/20", 2, 0),
            ],
        );
        let duplicates = DuplicateReport::new(vec![
            cluster(3, 9, 1, "RT @x: said  it"),
            cluster(2, 1, 1, "own words"),
        ]);
        StatisticsOutcome { storms, duplicates }
    }

    #[test]
    fn test_report_handle() {
        assert_eq!(report_handle(Some("MinisterA"), Path::new("stats.txt")), "ministera");
        assert_eq!(
            report_handle(None, Path::new("out/stats_MinisterB.txt")),
            "ministerb"
        );
        assert_eq!(report_handle(None, Path::new("stats.txt")), "stats");
    }

    #[test]
    fn test_render_report() {
        let canonicalizer = Canonicalizer::new();
        let subject = subject();
        let writer = ReportWriter {
            handle: "ministera",
            subject: &subject,
            duplicate_limit: 200,
            offset: FixedOffset::east_opt(0).unwrap(),
            canonicalizer: &canonicalizer,
        };
        let text = writer.render(&outcome()).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines[0], "Screen name,\"ministera\"");
        assert_eq!(lines[1], "Name,\"Minister A\"");
        assert_eq!(lines[2], "Description,\"Water\"");
        assert_eq!(lines[3], "Followers,5000");
        assert_eq!(lines[4], "Num Storm Days,1");
        assert_eq!(lines[5], "Median,1");
        assert_eq!(lines[6], "Mean,1.25");
        assert!(lines[7].starts_with("Standard deviation,0.433"));
        assert_eq!(lines[8], "Sum,5");
        assert_eq!(lines[9], "");
        assert_eq!(lines[10], BUCKET_HEADER);
        assert!(lines[11].starts_with("01/03/20,60,0,1,1,0,0,0,0.577"));
        assert!(lines[14].starts_with("04/03/20,63,1,2,2,0,0,0,1.732"));
        assert_eq!(lines[15], "");
        assert_eq!(lines[16], DUPLICATE_HEADER);
        assert_eq!(lines[17], "3,0,\"01/03/20 10:00:00\",\"RT @x: said it\"");
        assert_eq!(lines[18], "");
        assert_eq!(lines[19], DUPLICATE_HEADER);
        assert_eq!(lines[20], "2,1,\"01/03/20 10:00:00\",\"own words\"");
        assert_eq!(lines.len(), 21);
    }

    #[test]
    fn test_duplicate_limit_applies_per_section() {
        let canonicalizer = Canonicalizer::new();
        let subject = subject();
        let writer = ReportWriter {
            handle: "ministera",
            subject: &subject,
            duplicate_limit: 0,
            offset: FixedOffset::east_opt(0).unwrap(),
            canonicalizer: &canonicalizer,
        };
        let text = writer.render(&outcome()).unwrap();
        assert_eq!(text.matches(DUPLICATE_HEADER).count(), 2);
        assert!(!text.contains("own words"));
    }

    #[test]
    fn test_summary_row() {
        let canonicalizer = Canonicalizer::new();
        let subject = subject();
        let writer = ReportWriter {
            handle: "ministera",
            subject: &subject,
            duplicate_limit: 200,
            offset: FixedOffset::east_opt(0).unwrap(),
            canonicalizer: &canonicalizer,
        };
        let row = writer.summary_row(&outcome().storms);
        assert!(row.starts_with("\"ministera\", \"Minister A\", 5000, 1,1,1.25,0.433"));
        assert!(row.ends_with(",5,4,0,1,0"));
    }

    #[tokio::test]
    async fn test_append_summary_writes_header_once() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("output").join("stormStats.txt");
        append_summary(&path, "row one").await.unwrap();
        append_summary(&path, "row two").await.unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines, vec![SUMMARY_HEADER, "row one", "row two"]);
    }
}
