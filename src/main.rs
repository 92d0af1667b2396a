mod config;
mod db;
mod error;
mod extractor;
mod load;
mod model;
mod parser;
mod sink;
mod transform;

use std::path::PathBuf;
use std::time::Instant;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::{error, info};

use crate::config::{ProcessorSettings, ScraperSettings, Settings};
use crate::error::EtlError;
use crate::extractor::ScrapeStats;
use crate::load::Destination;
use crate::sink::CsvAppendSink;

#[derive(Parser)]
#[command(name = "pokedex_etl", about = "Pokedex scraper with CSV / SQLite ETL")]
struct Cli {
    /// YAML config file (missing file = defaults + environment)
    #[arg(short, long, global = true, default_value = crate::config::DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch the pokedex table and append it to the scraped CSV
    Scrape,
    /// Transform the scraped CSV and load it into the destination
    Process,
    /// Scrape + process
    Run,
    /// Summarize what the destination currently holds
    Stats,
    /// Pokemons in the destination with their types and metrics
    Overview {
        /// Max rows to display
        #[arg(short = 'n', long, default_value = "25")]
        limit: usize,
    },
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
    let settings = crate::config::load(&cli.config)?;

    let result = dispatch(cli.command, &settings).await;

    let elapsed = t0.elapsed();
    if elapsed.as_secs() >= 1 {
        println!("\nDone in {}", format_duration(elapsed));
    }

    result
}

// ── Stages ──

/// Stage failures come back as the result so the caller still reports wall time.
async fn dispatch(command: Commands, settings: &Settings) -> anyhow::Result<()> {
    match command {
        Commands::Scrape => scrape_stage(&settings.scraper)
            .await
            .map(|stats| stats.print(&settings.scraper))
            .map_err(anyhow::Error::from),
        Commands::Process => process_stage(&settings.processor)
            .map(|counts| counts.print())
            .map_err(anyhow::Error::from),
        Commands::Run => run(settings).await,
        Commands::Stats => print_stats(settings),
        Commands::Overview { limit } => print_overview(settings, limit),
    }
}

async fn run(settings: &Settings) -> anyhow::Result<()> {
    let stats = scrape_stage(&settings.scraper).await?;
    stats.print(&settings.scraper);
    let counts = process_stage(&settings.processor)?;
    counts.print();
    Ok(())
}

async fn scrape_stage(settings: &ScraperSettings) -> Result<ScrapeStats, EtlError> {
    info!(">>>>>> Web scraping stage started <<<<<<");
    let result = match CsvAppendSink::open(&settings.scraped_data_path, settings.clear_contents) {
        Ok(mut sink) => extractor::scrape(settings, &mut sink).await,
        Err(e) => Err(e),
    };

    match &result {
        Ok(_) => info!(">>>>>> Web scraping stage completed <<<<<<"),
        Err(e) => log_failure("Web scraping stage", e),
    }
    result
}

struct ProcessCounts {
    scraped: usize,
    rows: usize,
    destination: Destination,
}

impl ProcessCounts {
    fn print(&self) {
        println!(
            "Transformed {} scraped rows into {} rows -> {}",
            self.scraped,
            self.rows,
            self.destination.path().display()
        );
    }
}

impl ScrapeStats {
    fn print(&self, settings: &ScraperSettings) {
        println!(
            "Caught {} of {} pokemons in {:.1}s -> {}",
            self.written,
            self.found,
            self.elapsed.as_secs_f64(),
            settings.scraped_data_path.display()
        );
    }
}

fn process_stage(settings: &ProcessorSettings) -> Result<ProcessCounts, EtlError> {
    info!(">>>>>> Data processing stage started <<<<<<");
    let result = process(settings);
    match &result {
        Ok(_) => info!(">>>>>> Data processing stage completed <<<<<<"),
        Err(e) => log_failure("Data processing stage", e),
    }
    result
}

fn process(settings: &ProcessorSettings) -> Result<ProcessCounts, EtlError> {
    info!("Loading the scraped data");
    let records = sink::read_scraped(&settings.scraped_data_path)?;
    info!("Scraped data loaded: {} rows", records.len());

    let rows = transform::transform(&records, settings.metric_set)?;
    info!("Data transformation completed: {} rows", rows.len());

    let destination = Destination::from_settings(settings);
    load::load(&rows, &destination)?;

    Ok(ProcessCounts {
        scraped: records.len(),
        rows: rows.len(),
        destination,
    })
}

fn log_failure(stage: &str, err: &EtlError) {
    let mut chain = err.to_string();
    let mut source = std::error::Error::source(err);
    while let Some(cause) = source {
        chain.push_str(": ");
        chain.push_str(&cause.to_string());
        source = cause.source();
    }
    error!("{} failed: {}", stage, chain);
}

// ── Reports ──

fn print_stats(settings: &Settings) -> anyhow::Result<()> {
    let destination = Destination::from_settings(&settings.processor);
    let rows = load::read_back(&destination)
        .with_context(|| format!("Cannot read {}", destination.path().display()))?;
    let s = load::summarize(&rows);

    let metrics: Vec<&str> = s.metrics.iter().map(|m| m.label()).collect();
    println!("Destination:  {}", destination.path().display());
    println!("Pokemons:     {}", s.pokemons);
    println!("Type rows:    {}", s.pokemon_types);
    println!("Metric rows:  {}", s.metric_rows);
    println!("Metrics:      {}", metrics.join(", "));
    println!("Data as on:   {}", s.data_as_on.as_deref().unwrap_or("-"));
    Ok(())
}

fn print_overview(settings: &Settings, limit: usize) -> anyhow::Result<()> {
    let destination = Destination::from_settings(&settings.processor);
    let rows = load::read_back(&destination)
        .with_context(|| format!("Cannot read {}", destination.path().display()))?;
    let groups = transform::group_by_id(&rows);
    if groups.is_empty() {
        println!("No pokemons found. Run 'process' first.");
        return Ok(());
    }

    println!(
        "{:<7} | {:>5} | {:<28} | {:<18} | Metrics",
        "PokeID", "Rank", "Pokemon", "Type"
    );
    println!("{}", "-".repeat(100));

    for g in groups.iter().take(limit) {
        let metrics: Vec<String> = g
            .metrics
            .iter()
            .map(|(m, v)| format!("{}={}", m, v))
            .collect();
        println!(
            "{:<7} | {:>5} | {:<28} | {:<18} | {}",
            g.poke_id,
            g.rank,
            truncate(&g.pokemon, 28),
            truncate(&g.types.join(", "), 18),
            metrics.join(" ")
        );
    }

    println!("\n{} of {} pokemons", groups.len().min(limit), groups.len());
    Ok(())
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let truncated: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", truncated)
    }
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
