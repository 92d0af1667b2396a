use std::collections::{HashMap, HashSet};

use chrono::NaiveDateTime;
use tracing::info;

use crate::error::{EtlError, Result};
use crate::model::{EntityRow, Metric, MetricRow, MetricSet, PokedexRow, ScrapedRecord};

pub const ID_OFFSET: usize = 1000;
pub const ID_PREFIX: &str = "P";
pub const TS_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
const TYPE_SEPARATOR: char = ',';

struct Tagged<'a> {
    poke_id: String,
    pokemon_type: String,
    record: &'a ScrapedRecord,
}

/// Scraped rows → long-form pokedex table.
///
/// Ids are assigned before the type column is exploded, so every type row of
/// one pokemon shares its id. Output is metric-major: all rows for the first
/// metric, then the next, each in exploded order. Exact duplicates are dropped
/// keeping the first occurrence.
pub fn transform(records: &[ScrapedRecord], metric_set: MetricSet) -> Result<Vec<PokedexRow>> {
    let ids = assign_ids(records.len());
    info!("Added custom id column ({} rows)", ids.len());

    let exploded: Vec<Tagged> = ids
        .into_iter()
        .zip(records)
        .flat_map(|(poke_id, record)| {
            split_types(&record.types)
                .into_iter()
                .map(move |pokemon_type| Tagged {
                    poke_id: poke_id.clone(),
                    pokemon_type,
                    record,
                })
        })
        .collect();
    info!("Split the pokemon types column into rows ({} rows)", exploded.len());

    let data_as_on = latest_timestamp(records)?;
    info!("Data as on {}", data_as_on.as_deref().unwrap_or("-"));

    let metrics = metric_set.metrics();
    let mut rows = Vec::with_capacity(exploded.len() * metrics.len());
    for &metric in metrics {
        for t in &exploded {
            rows.push(PokedexRow {
                poke_id: t.poke_id.clone(),
                rank: t.record.rank,
                pokemon: t.record.name.clone(),
                pokemon_type: t.pokemon_type.clone(),
                metric,
                value: metric_set.value(metric, t.record),
                icon: t.record.icon_url.clone(),
                details_link: t.record.details_url.clone(),
                data_as_on: data_as_on.clone().unwrap_or_default(),
            });
        }
    }
    info!("Unpivoted {} metric columns ({} rows)", metrics.len(), rows.len());

    let rows = dedup(rows);
    info!("Dropped duplicate rows ({} rows left)", rows.len());
    Ok(rows)
}

pub fn assign_ids(n: usize) -> Vec<String> {
    (ID_OFFSET..ID_OFFSET + n)
        .map(|i| format!("{}{}", ID_PREFIX, i))
        .collect()
}

/// Never drops a row: an empty field yields one empty type.
pub fn split_types(types: &str) -> Vec<String> {
    types
        .split(TYPE_SEPARATOR)
        .map(|t| t.trim().to_string())
        .collect()
}

fn latest_timestamp(records: &[ScrapedRecord]) -> Result<Option<String>> {
    let mut latest: Option<NaiveDateTime> = None;
    for r in records {
        let ts = NaiveDateTime::parse_from_str(r.scrape_ts.trim(), TS_FORMAT).map_err(|e| {
            EtlError::transform_with(
                format!("bad scrape_ts {:?} (rank {})", r.scrape_ts, r.rank),
                e,
            )
        })?;
        latest = latest.max(Some(ts));
    }
    Ok(latest.map(|ts| ts.format(TS_FORMAT).to_string()))
}

fn dedup(rows: Vec<PokedexRow>) -> Vec<PokedexRow> {
    let mut seen = HashSet::with_capacity(rows.len());
    rows.into_iter()
        .filter(|r| seen.insert(r.clone()))
        .collect()
}

// ── Relational split ──

/// Entity rows (one per id + type, first-seen order) and metric rows (one per flat row).
pub fn split_tables(rows: &[PokedexRow]) -> (Vec<EntityRow>, Vec<MetricRow>) {
    let mut seen = HashSet::new();
    let mut entities = Vec::new();
    let mut metrics = Vec::with_capacity(rows.len());

    for r in rows {
        let entity = EntityRow {
            poke_id: r.poke_id.clone(),
            rank: r.rank,
            pokemon: r.pokemon.clone(),
            pokemon_type: r.pokemon_type.clone(),
            icon: r.icon.clone(),
            details_link: r.details_link.clone(),
            data_as_on: r.data_as_on.clone(),
        };
        if seen.insert(entity.clone()) {
            entities.push(entity);
        }
        metrics.push(MetricRow {
            poke_id: r.poke_id.clone(),
            pokemon_type: r.pokemon_type.clone(),
            metric: r.metric,
            value: r.value,
        });
    }

    (entities, metrics)
}

// ── Regrouping ──

#[derive(Debug, Clone, PartialEq)]
pub struct PokemonSummary {
    pub poke_id: String,
    pub rank: u32,
    pub pokemon: String,
    pub types: Vec<String>,
    pub metrics: Vec<(Metric, i64)>,
}

/// Regroup long-form rows by id, in first-seen order.
pub fn group_by_id(rows: &[PokedexRow]) -> Vec<PokemonSummary> {
    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut groups: Vec<PokemonSummary> = Vec::new();

    for r in rows {
        let i = *index.entry(r.poke_id.as_str()).or_insert_with(|| {
            groups.push(PokemonSummary {
                poke_id: r.poke_id.clone(),
                rank: r.rank,
                pokemon: r.pokemon.clone(),
                types: Vec::new(),
                metrics: Vec::new(),
            });
            groups.len() - 1
        });
        let g = &mut groups[i];
        if !g.types.contains(&r.pokemon_type) {
            g.types.push(r.pokemon_type.clone());
        }
        if !g.metrics.iter().any(|(m, _)| *m == r.metric) {
            g.metrics.push((r.metric, r.value));
        }
    }

    groups
}

// ── Tests ──
