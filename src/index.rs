use std::fmt;

use anyhow::Result;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, info, warn};

use crate::db::{IndexRecord, Store};
use crate::fetch::{self, Fetch};

const FIELD_SEPARATOR: char = '|';
const FIELD_COUNT: usize = 5;

/// A (year, quarter) window covered by one `master.idx`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Period {
    pub year: i32,
    pub quarter: u8,
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/QTR{}", self.year, self.quarter)
    }
}

impl Period {
    pub fn index_url(&self, archive_root: &str) -> String {
        format!(
            "{}edgar/full-index/{}/QTR{}/master.idx",
            archive_root, self.year, self.quarter
        )
    }
}

/// Every quarter from `start_year` Q1 through `end` inclusive, oldest first.
pub fn periods(start_year: i32, end: Period) -> Vec<Period> {
    (start_year..=end.year)
        .flat_map(|year| {
            let last = if year == end.year { end.quarter } else { 4 };
            (1..=last).map(move |quarter| Period { year, quarter })
        })
        .collect()
}

/// `cik|company|form|date|path`. Anything without exactly five fields is `None`.
pub fn parse_index_line(line: &str) -> Option<IndexRecord> {
    let fields: Vec<&str> = line.split(FIELD_SEPARATOR).collect();
    if fields.len() != FIELD_COUNT {
        return None;
    }
    Some(IndexRecord {
        cik: fields[0].to_string(),
        company_name: fields[1].to_string(),
        form_type: fields[2].to_string(),
        filing_date: fields[3].to_string(),
        document_path: fields[4].to_string(),
    })
}

/// Parse an index document body, skipping its preamble.
/// Returns the records and the number of dropped lines.
pub fn parse_index(text: &str, preamble_lines: usize) -> (Vec<IndexRecord>, usize) {
    let mut records = Vec::new();
    let mut dropped = 0;
    for line in text.lines().skip(preamble_lines) {
        match parse_index_line(line) {
            Some(record) => records.push(record),
            None => dropped += 1,
        }
    }
    (records, dropped)
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct IngestStats {
    pub periods: usize,
    pub loaded: usize,
    pub failed: usize,
    pub records: usize,
    pub malformed: usize,
}

pub struct IngestOptions<'a> {
    pub archive_root: &'a str,
    pub start_year: i32,
    pub end: Period,
    pub preamble_lines: usize,
}

/// Rebuild the index table from the archive. A period that cannot be fetched
/// is logged and skipped. An unreachable archive is fatal and leaves the
/// existing index untouched.
pub async fn ingest<F: Fetch>(
    store: &Store,
    fetcher: &F,
    opts: &IngestOptions<'_>,
) -> Result<IngestStats> {
    let periods = periods(opts.start_year, opts.end);
    fetch::check_reachable(fetcher, opts.archive_root).await?;
    store.create_or_clear::<IndexRecord>()?;

    let pb = ProgressBar::new(periods.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40} {pos}/{len} {msg}")?
            .progress_chars("=> "),
    );

    let mut stats = IngestStats {
        periods: periods.len(),
        ..Default::default()
    };

    for period in &periods {
        pb.set_message(period.to_string());
        let url = period.index_url(opts.archive_root);

        let body = match fetcher.fetch(&url).await {
            Ok(body) => body,
            Err(e) => {
                warn!(%period, error = %e, "skipping index period");
                stats.failed += 1;
                pb.inc(1);
                continue;
            }
        };

        let (records, dropped) = parse_index(&body, opts.preamble_lines);
        if dropped > 0 {
            debug!(%period, dropped, "dropped malformed index lines");
        }
        store.append_many(&records)?;

        info!(%period, records = records.len(), dropped, "loaded index period");
        stats.loaded += 1;
        stats.records += records.len();
        stats.malformed += dropped;
        pb.inc(1);
    }

    pb.finish_and_clear();

    Ok(stats)
}
