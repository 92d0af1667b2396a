use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::model::MetricSet;

pub const DEFAULT_CONFIG_PATH: &str = "conf/configs.yaml";
const ENV_PREFIX: &str = "POKEDEX";
const DEFAULT_SCRAPED_PATH: &str = "data/scraped/pokemons_scraped_data.csv";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub scraper: ScraperSettings,
    pub processor: ProcessorSettings,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ScraperSettings {
    pub root_url: String,
    pub data_url: String,
    pub user_agent: String,
    pub timeout_secs: u64,
    /// Truncate the scraped file before a run instead of appending to it.
    pub clear_contents: bool,
    pub scraped_data_path: PathBuf,
}

impl Default for ScraperSettings {
    fn default() -> Self {
        ScraperSettings {
            root_url: "https://pokemondb.net/".to_string(),
            data_url: "https://pokemondb.net/pokedex/all".to_string(),
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                         (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36"
                .to_string(),
            timeout_secs: 30,
            clear_contents: true,
            scraped_data_path: PathBuf::from(DEFAULT_SCRAPED_PATH),
        }
    }
}

impl ScraperSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DestinationKind {
    #[default]
    Csv,
    Sqlite,
}

impl DestinationKind {
    pub fn default_path(self) -> PathBuf {
        match self {
            DestinationKind::Csv => PathBuf::from("data/processed/pokedex_data.csv"),
            DestinationKind::Sqlite => PathBuf::from("data/processed/pokedex.sqlite"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ProcessorSettings {
    pub scraped_data_path: PathBuf,
    /// Unset: the default path of `destination`.
    pub processed_data_path: Option<PathBuf>,
    pub destination: DestinationKind,
    pub metric_set: MetricSet,
}

impl Default for ProcessorSettings {
    fn default() -> Self {
        ProcessorSettings {
            scraped_data_path: PathBuf::from(DEFAULT_SCRAPED_PATH),
            processed_data_path: None,
            destination: DestinationKind::default(),
            metric_set: MetricSet::default(),
        }
    }
}

impl ProcessorSettings {
    pub fn processed_path(&self) -> PathBuf {
        self.processed_data_path
            .clone()
            .unwrap_or_else(|| self.destination.default_path())
    }
}

/// YAML file (optional) overlaid by `POKEDEX_<SECTION>__<KEY>` environment variables.
pub fn load(path: &Path) -> Result<Settings> {
    let settings = ::config::Config::builder()
        .add_source(::config::File::from(path).required(false))
        .add_source(
            ::config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        )
        .build()
        .with_context(|| format!("Failed to read configuration from {}", path.display()))?;

    settings
        .try_deserialize()
        .context("Invalid configuration")
}
