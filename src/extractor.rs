use std::time::{Duration, Instant};

use indicatif::{ProgressBar, ProgressStyle};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT_LANGUAGE};
use scraper::Html;
use tracing::{debug, info};
use url::Url;

use crate::config::ScraperSettings;
use crate::error::{EtlError, Result};
use crate::parser;
use crate::sink::RecordSink;
use crate::transform::TS_FORMAT;

/// Scrape stats returned after completion.
#[derive(Debug)]
pub struct ScrapeStats {
    pub found: usize,
    pub written: usize,
    pub elapsed: Duration,
}

/// Fetch the pokedex page once, then stream every table row into `sink`.
/// Each record is stamped with the local time at which its row was parsed.
pub async fn scrape<S: RecordSink>(settings: &ScraperSettings, sink: &mut S) -> Result<ScrapeStats> {
    let root = Url::parse(&settings.root_url)
        .map_err(|e| EtlError::parse_with(format!("bad root url {:?}", settings.root_url), e))?;

    let html = fetch_document(settings).await?;

    let start = Instant::now();
    let (found, written) = extract_into(&html, &root, local_now, sink)?;
    let elapsed = start.elapsed();

    info!("Time taken for scraping: {:.2} seconds", elapsed.as_secs_f64());
    Ok(ScrapeStats {
        found,
        written,
        elapsed,
    })
}

fn local_now() -> String {
    chrono::Local::now().format(TS_FORMAT).to_string()
}

/// Single GET with the configured timeout and identification headers.
pub async fn fetch_document(settings: &ScraperSettings) -> Result<String> {
    let url = settings.data_url.as_str();

    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US"));

    let client = reqwest::Client::builder()
        .user_agent(settings.user_agent.as_str())
        .default_headers(headers)
        .timeout(settings.timeout())
        .build()
        .map_err(|e| EtlError::fetch(url, e))?;

    info!("Fetching pokedex: {}", url);
    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| EtlError::fetch(url, e))?;
    info!("Request responded with the status code: {}", response.status());

    response
        .error_for_status()
        .map_err(|e| EtlError::fetch(url, e))?
        .text()
        .await
        .map_err(|e| EtlError::fetch(url, e))
}

/// Parse `html` and write one record per row. Returns (rows found, rows written).
/// The first bad row aborts; rows already written stay in the sink.
pub fn extract_into<S: RecordSink>(
    html: &str,
    root: &Url,
    mut stamp: impl FnMut() -> String,
    sink: &mut S,
) -> Result<(usize, usize)> {
    let doc = Html::parse_document(html);
    let rows = parser::table_rows(&doc)?;
    info!("Total entries found in Pokedex: {}", rows.len());

    let pb = ProgressBar::new(rows.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40} {pos}/{len} ({per_sec}, eta {eta})")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=> "),
    );

    let mut written = 0usize;
    for row in &rows {
        let record = parser::parse_row(*row, root, &stamp())?;
        sink.write(&record)?;
        written += 1;
        debug!("{} pokemons scraped ({})", written, record.name);
        pb.inc(1);
    }

    pb.finish_and_clear();
    Ok((rows.len(), written))
}

// ── Tests ──
