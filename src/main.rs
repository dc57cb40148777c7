mod db;
mod error;
mod fetch;
mod index;
mod parser;
mod pipeline;
mod settings;
mod worklist;

#[cfg(test)]
mod testing;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use clap::{Args, Parser, Subcommand};

use db::{ExtractedFiling, IndexRecord, Store};
use fetch::HttpFetcher;
use index::{IngestOptions, Period};
use settings::Settings;

#[derive(Parser)]
#[command(name = "edgar_scraper", about = "EDGAR filing catalog and restructuring-keyword extractor")]
struct Cli {
    /// SQLite file holding the index and output tables
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct FormArgs {
    /// Form type to track (repeatable; overrides configuration)
    #[arg(short, long = "form")]
    forms: Vec<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Rebuild the filing index from the archive's quarterly master files
    Index {
        #[arg(long)]
        start_year: Option<i32>,
        #[arg(long)]
        end_year: Option<i32>,
        #[arg(long)]
        end_quarter: Option<u8>,
    },
    /// Fetch and extract every tracked filing not yet in the output table
    Run {
        /// Concurrent fetch workers (default: CPU count)
        #[arg(short, long)]
        workers: Option<usize>,
        /// Max filings to fetch this run (default: all remaining)
        #[arg(short = 'n', long, value_parser = clap::builder::RangedU64ValueParser::<usize>::new().range(1..))]
        limit: Option<usize>,
        #[command(flatten)]
        forms: FormArgs,
    },
    /// Completed vs remaining filings per category
    Progress {
        /// Emit the report as JSON
        #[arg(long)]
        json: bool,
        #[command(flatten)]
        forms: FormArgs,
    },
    /// Row counts of the stored tables
    Stats,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let t0 = Instant::now();
    let cli = Cli::parse();

    let mut settings = Settings::load()?;
    if let Some(db) = cli.db {
        settings.db_path = db;
    }

    let result = match cli.command {
        Commands::Index {
            start_year,
            end_year,
            end_quarter,
        } => {
            if let Some(y) = start_year {
                settings.start_year = y;
            }
            if let Some(y) = end_year {
                settings.end_year = y;
            }
            if let Some(q) = end_quarter {
                settings.end_quarter = q;
            }
            settings.validate()?;

            let store = Store::open(&settings.db_path)?;
            let fetcher = HttpFetcher::new(&settings.user_agent, settings.request_timeout)?;
            let end = Period {
                year: settings.end_year,
                quarter: settings.end_quarter,
            };
            println!(
                "Building index {}/QTR1 .. {} from {}",
                settings.start_year, end, settings.archive_root_url
            );
            let stats = index::ingest(
                &store,
                &fetcher,
                &IngestOptions {
                    archive_root: &settings.archive_root_url,
                    start_year: settings.start_year,
                    end,
                    preamble_lines: settings.index_preamble_lines,
                },
            )
            .await?;
            println!(
                "Loaded {} records from {}/{} periods ({} failed, {} malformed lines dropped).",
                stats.records, stats.loaded, stats.periods, stats.failed, stats.malformed
            );
            Ok(())
        }
        Commands::Run {
            workers,
            limit,
            forms,
        } => {
            if let Some(n) = workers {
                settings.worker_pool_size = n;
            }
            apply_forms(&mut settings, forms);
            settings.validate()?;

            let store = open_store(&settings)?;
            let worklists = load_worklists(&store, &settings)?;
            if worklists.iter().all(|w| w.urls.is_empty()) {
                println!("No tracked filings in the index. Run 'index' first.");
                return Ok(());
            }

            let scraped = store.scraped_urls()?;
            let items = pipeline::residual_work(&worklists, &scraped, limit);
            if items.is_empty() {
                println!("Nothing left to fetch: all tracked filings are extracted.");
                return Ok(());
            }

            let fetcher = Arc::new(HttpFetcher::new(
                &settings.user_agent,
                settings.request_timeout,
            )?);
            println!(
                "Fetching {} filings with {} workers ({} already extracted)...",
                items.len(),
                settings.worker_pool_size,
                scraped.len()
            );
            let stats = pipeline::run(
                &store,
                fetcher,
                items,
                settings.worker_pool_size,
                &settings.archive_root_url,
            )
            .await?;
            println!(
                "Done: {} fetched ({} ok, {} errors).",
                stats.total, stats.ok, stats.errors
            );
            if stats.errors > 0 {
                println!("Failed filings stay queued; re-run to retry them.");
            }
            Ok(())
        }
        Commands::Progress { json, forms } => {
            apply_forms(&mut settings, forms);
            settings.validate()?;

            let store = open_store(&settings)?;
            let worklists = load_worklists(&store, &settings)?;
            let report = worklist::progress(&worklists, &store.scraped_urls()?);

            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
                return Ok(());
            }

            println!(
                "{:<12} | {:>9} | {:>9} | {:>9}",
                "Category", "Total", "Completed", "Residual"
            );
            println!("{}", "-".repeat(48));
            for p in &report {
                println!(
                    "{:<12} | {:>9} | {:>9} | {:>9}",
                    p.category, p.total, p.completed, p.residual
                );
            }
            println!("{}", "-".repeat(48));
            println!(
                "{:<12} | {:>9} | {:>9} | {:>9}",
                "all",
                report.iter().map(|p| p.total).sum::<usize>(),
                report.iter().map(|p| p.completed).sum::<usize>(),
                report.iter().map(|p| p.residual).sum::<usize>()
            );
            Ok(())
        }
        Commands::Stats => {
            let store = open_store(&settings)?;
            println!("Index records:     {}", store.count::<IndexRecord>()?);
            println!("Extracted filings: {}", store.count::<ExtractedFiling>()?);

            let mut by_category: Vec<_> = store.completed_by_category()?.into_iter().collect();
            by_category.sort();
            for (category, n) in by_category {
                println!("  {:<15}  {}", category, n);
            }
            Ok(())
        }
    };

    let elapsed = t0.elapsed();
    if elapsed.as_secs() >= 1 {
        println!("\nDone in {}", format_duration(elapsed));
    }

    result
}

fn apply_forms(settings: &mut Settings, forms: FormArgs) {
    if !forms.forms.is_empty() {
        settings.set_form_types(forms.forms);
    }
}

/// Open the store with both tables present; existing rows are left alone.
fn open_store(settings: &Settings) -> anyhow::Result<Store> {
    let store = Store::open(&settings.db_path)?;
    store.ensure::<IndexRecord>()?;
    store.ensure::<ExtractedFiling>()?;
    Ok(store)
}

fn load_worklists(store: &Store, settings: &Settings) -> anyhow::Result<Vec<worklist::Worklist>> {
    let records = store.read_all::<IndexRecord>()?;
    Ok(worklist::build_worklists(
        &records,
        &settings.tracked_form_types,
        &settings.archive_root_url,
    ))
}

fn format_duration(d: std::time::Duration) -> String {
    let secs = d.as_secs();
    if secs < 60 {
        format!("{:.1}s", d.as_secs_f64())
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
    }
}
