use std::collections::HashSet;
use std::sync::Arc;

use anyhow::Result;
use indicatif::{ProgressBar, ProgressStyle};
use tokio::sync::{mpsc, Semaphore};
use tracing::{debug, info, warn};

use crate::db::{ExtractedFiling, Store};
use crate::fetch::{self, Fetch};
use crate::parser;
use crate::worklist::{self, Worklist};

/// One document to fetch, tagged with the grouping it was listed under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkItem {
    pub url: String,
    pub category: String,
}

/// Run stats returned after completion.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct RunStats {
    pub total: usize,
    pub ok: usize,
    pub errors: usize,
}

enum Outcome {
    Extracted(ExtractedFiling),
    Failed,
}

/// Everything still to do across all worklists, each URL once, capped at `limit`.
pub fn residual_work(
    worklists: &[Worklist],
    scraped: &HashSet<String>,
    limit: Option<usize>,
) -> Vec<WorkItem> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut items = Vec::new();
    if limit == Some(0) {
        return items;
    }
    for list in worklists {
        for url in worklist::residual(&list.urls, scraped) {
            if !seen.insert(url.clone()) {
                continue;
            }
            items.push(WorkItem {
                url,
                category: list.category.clone(),
            });
            if limit.is_some_and(|n| items.len() >= n) {
                return items;
            }
        }
    }
    items
}

/// Fetch and extract every item on a bounded pool of tasks. Results drain
/// through one channel into the store, so the output table has one writer.
///
/// The archive root is checked once up front; after that a failed URL only
/// counts towards `errors`.
pub async fn run<F>(
    store: &Store,
    fetcher: Arc<F>,
    items: Vec<WorkItem>,
    workers: usize,
    archive_root: &str,
) -> Result<RunStats>
where
    F: Fetch + 'static,
{
    let total = items.len();
    if total == 0 {
        return Ok(RunStats::default());
    }
    fetch::check_reachable(fetcher.as_ref(), archive_root).await?;

    let semaphore = Arc::new(Semaphore::new(workers.max(1)));

    let pb = ProgressBar::new(total as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40} {pos}/{len} ({per_sec}, eta {eta})")?
            .progress_chars("=> "),
    );

    let (tx, mut rx) = mpsc::channel::<Outcome>(workers.max(1) * 2);

    for item in items {
        let fetcher = Arc::clone(&fetcher);
        let sem = Arc::clone(&semaphore);
        let tx = tx.clone();

        tokio::spawn(async move {
            let Ok(_permit) = sem.acquire().await else {
                return;
            };
            let outcome = match fetcher.fetch(&item.url).await {
                Ok(body) => {
                    let filing = parser::process_document(&body).into_filing(&item.url, &item.category);
                    debug!(url = %item.url, cik = %filing.cik, "extracted");
                    Outcome::Extracted(filing)
                }
                Err(e) => {
                    warn!(url = %item.url, error = %e, "fetch failed, leaving for next run");
                    Outcome::Failed
                }
            };
            let _ = tx.send(outcome).await;
        });
    }

    // Drop our copy of tx so rx closes when all spawned tasks finish
    drop(tx);

    let mut stats = RunStats {
        total,
        ..Default::default()
    };

    while let Some(outcome) = rx.recv().await {
        match outcome {
            Outcome::Extracted(filing) => {
                store.append(&filing)?;
                stats.ok += 1;
            }
            Outcome::Failed => stats.errors += 1,
        }
        pb.inc(1);
    }

    pb.finish_and_clear();
    info!(total, ok = stats.ok, errors = stats.errors, "fetch-extract finished");

    Ok(stats)
}
