use std::collections::BTreeSet;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::config::{DestinationKind, ProcessorSettings};
use crate::db;
use crate::error::{EtlError, Result};
use crate::model::{Metric, PokedexRow};
use crate::transform::split_tables;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Destination {
    /// One flat long-form table.
    Csv(PathBuf),
    /// `pokemons` + `stats` tables.
    Sqlite(PathBuf),
}

impl Destination {
    pub fn from_settings(settings: &ProcessorSettings) -> Self {
        let path = settings.processed_path();
        match settings.destination {
            DestinationKind::Csv => Destination::Csv(path),
            DestinationKind::Sqlite => Destination::Sqlite(path),
        }
    }

    pub fn path(&self) -> &Path {
        match self {
            Destination::Csv(p) | Destination::Sqlite(p) => p,
        }
    }
}

/// Fully replace whatever is at the destination.
pub fn load(rows: &[PokedexRow], dest: &Destination) -> Result<()> {
    let path = dest.path();
    db::ensure_parent(path).map_err(|e| EtlError::write(path, e))?;

    match dest {
        Destination::Csv(path) => {
            let file = File::create(path).map_err(|e| EtlError::write(path, e))?;
            write_flat(file, rows).map_err(|e| EtlError::write(path, e))?;
            info!("Exported {} rows to {}", rows.len(), path.display());
        }
        Destination::Sqlite(path) => {
            let (entities, metrics) = split_tables(rows);
            let conn = db::connect(path).map_err(|e| EtlError::write(path, e))?;
            db::replace_tables(&conn, &entities, &metrics)
                .map_err(|e| EtlError::write(path, e))?;
            conn.close().map_err(|(_, e)| EtlError::write(path, e))?;
            info!(
                "Loaded {} pokemons rows and {} stats rows into {}",
                entities.len(),
                metrics.len(),
                path.display()
            );
        }
    }
    Ok(())
}

pub fn write_flat<W: Write>(w: W, rows: &[PokedexRow]) -> csv::Result<()> {
    let mut wtr = csv::Writer::from_writer(w);
    for r in rows {
        wtr.serialize(r)?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn read_flat<R: std::io::Read>(r: R) -> csv::Result<Vec<PokedexRow>> {
    let mut rdr = csv::Reader::from_reader(r);
    rdr.deserialize::<PokedexRow>().collect()
}

/// Reload the long-form table from whichever destination holds it.
pub fn read_back(dest: &Destination) -> anyhow::Result<Vec<PokedexRow>> {
    match dest {
        Destination::Csv(path) => Ok(read_flat(File::open(path)?)?),
        Destination::Sqlite(path) => {
            let conn = db::connect(path)?;
            Ok(db::read_flat(&conn)?)
        }
    }
}

// ── Summary ──

#[derive(Debug, PartialEq)]
pub struct Summary {
    pub pokemons: usize,
    pub pokemon_types: usize,
    pub metric_rows: usize,
    pub metrics: Vec<Metric>,
    pub data_as_on: Option<String>,
}

pub fn summarize(rows: &[PokedexRow]) -> Summary {
    let ids: BTreeSet<&str> = rows.iter().map(|r| r.poke_id.as_str()).collect();
    let pairs: BTreeSet<(&str, &str)> = rows
        .iter()
        .map(|r| (r.poke_id.as_str(), r.pokemon_type.as_str()))
        .collect();
    let metrics: BTreeSet<Metric> = rows.iter().map(|r| r.metric).collect();

    Summary {
        pokemons: ids.len(),
        pokemon_types: pairs.len(),
        metric_rows: rows.len(),
        metrics: metrics.into_iter().collect(),
        data_as_on: rows.iter().map(|r| r.data_as_on.clone()).max(),
    }
}

// ── Tests ──
