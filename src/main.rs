// src/main.rs
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{ArgAction, Parser};
use shelf_scrape::{CrawlConfig, CrawlSummary, Result, logging, run_crawl};
use tokio_util::sync::CancellationToken;
use tracing::{error, warn};

/// Crawl e-commerce catalog categories into one CSV file each.
#[derive(Debug, Parser)]
#[command(name = "shelf_scrape", version)]
struct Cli {
    /// TOML configuration file. Built-in test-site categories are used when omitted.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Only crawl this category. Repeatable.
    #[arg(short = 'c', long = "category")]
    categories: Vec<String>,

    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    #[arg(long)]
    webdriver_url: Option<String>,

    /// Also append logs to this file.
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Print the configured categories and exit.
    #[arg(long)]
    list: bool,

    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    if let Err(e) = logging::init(cli.verbose, cli.log_file.as_deref()) {
        eprintln!("{e}");
        return ExitCode::FAILURE;
    }

    match run(cli).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            error!(error = %e, "crawl aborted");
            eprintln!("An error occurred during scraping: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<bool> {
    let mut config = match &cli.config {
        Some(path) => CrawlConfig::load(path)?,
        None => CrawlConfig::default(),
    };
    if let Some(dir) = cli.output_dir {
        config.output_dir = dir;
    }
    if let Some(url) = cli.webdriver_url {
        config.webdriver.url = url;
    }
    config.validate()?;

    if cli.list {
        for category in &config.categories {
            let strategy = format!("{:?}", category.strategy);
            println!("{:<18} {:<16} {}", category.name, strategy, category.url);
        }
        return Ok(true);
    }

    let categories = config.select(&cli.categories)?;

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received, stopping after the current step");
            on_interrupt.cancel();
        }
    });

    let summary = run_crawl(&config, &categories, cancel).await?;
    print_summary(&summary);
    Ok(summary.all_succeeded())
}

fn print_summary(summary: &CrawlSummary) {
    let elapsed = summary.finished_at - summary.started_at;
    println!("\n--- Scraping finished (run {}) in {:.1}s ---", summary.run_id, elapsed.num_milliseconds() as f64 / 1000.0);
    for report in &summary.reports {
        match (&report.output, &report.error) {
            (Some(path), _) => println!("{:<18} {:>5} products -> {}", report.name, report.products, path.display()),
            (None, Some(error)) => println!("{:<18} FAILED: {error}", report.name),
            (None, None) => println!("{:<18} no output", report.name),
        }
    }
}
