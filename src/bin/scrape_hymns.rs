//! CLI entry point: scrape one hymn source and import the results.
//!
//! Usage:
//!   scrape_hymns <source> [--limit N] [--dry-run] [--config PATH]
//!
//! `<source>` is one of the registered source names. `--dry-run` runs the
//! full scrape and dedup classification without writing to the database.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{bail, Context, Result};
use tracing::error;

use hymnscribe::application::{run_ingest, Caller, IngestRequest};
use hymnscribe::infrastructure::logging::init_logging;
use hymnscribe::infrastructure::{AppConfig, HttpClient, SongRepository};
use hymnscribe::scraping::sources;

struct CliArgs {
    source: String,
    limit: Option<usize>,
    dry_run: bool,
    config_path: PathBuf,
}

fn usage() -> String {
    format!(
        "usage: scrape_hymns <source> [--limit N] [--dry-run] [--config PATH]\n\
         sources: {}",
        sources::source_names().join(", ")
    )
}

fn parse_args(args: &[String]) -> Result<CliArgs> {
    let mut source = None;
    let mut limit = None;
    let mut dry_run = false;
    let mut config_path = PathBuf::from("./hymnscribe.json");

    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--limit" => {
                let value = iter.next().context("--limit requires a number")?;
                limit = Some(value.parse().context("--limit must be a number")?);
            }
            "--dry-run" => dry_run = true,
            "--config" => {
                let value = iter.next().context("--config requires a path")?;
                config_path = PathBuf::from(value);
            }
            "--help" | "-h" => bail!("{}", usage()),
            name if !name.starts_with('-') && source.is_none() => {
                source = Some(name.to_string());
            }
            other => bail!("unknown argument '{other}'\n{}", usage()),
        }
    }

    let source = source.with_context(|| format!("missing source name\n{}", usage()))?;
    if !sources::source_names().contains(&source.as_str()) {
        bail!("unknown source '{source}'\n{}", usage());
    }
    Ok(CliArgs {
        source,
        limit,
        dry_run,
        config_path,
    })
}

async fn run(args: CliArgs) -> Result<()> {
    let config = AppConfig::load_or_create(&args.config_path).await?;

    let repository = SongRepository::connect(&config.database_path).await?;
    repository.migrate().await?;

    let client = HttpClient::new(config.http.clone())?;
    let request = IngestRequest {
        limit: args.limit,
        dry_run: args.dry_run,
        delay_ms: Some(config.scrape_delay_ms),
    };

    let response = run_ingest(
        &Caller::Service,
        &client,
        &repository,
        &args.source,
        &request,
    )
    .await?;

    println!(
        "{}: scraped {}, inserted {}, skipped {}, failed {}{}",
        args.source,
        response.scraped,
        response.inserted,
        response.skipped,
        response.failed,
        if args.dry_run { " (dry run)" } else { "" },
    );
    for failure in &response.failures {
        println!("  failed: {} ({})", failure.url, failure.error);
    }
    if response.failed > response.failures.len() {
        println!("  ... and {} more", response.failed - response.failures.len());
    }
    println!("database now holds {} songs", repository.count().await?);
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    init_logging();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let parsed = match parse_args(&args) {
        Ok(parsed) => parsed,
        Err(e) => {
            eprintln!("{e}");
            return ExitCode::from(2);
        }
    };

    match run(parsed).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}
