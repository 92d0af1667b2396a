use std::fs;
use std::path::Path;

use rusqlite::Connection;

use crate::model::{EntityRow, Metric, MetricRow, PokedexRow};

pub fn connect(path: &Path) -> rusqlite::Result<Connection> {
    let conn = Connection::open(path)?;
    conn.execute_batch("PRAGMA journal_mode=WAL;")?;
    Ok(conn)
}

pub fn ensure_parent(path: &Path) -> std::io::Result<()> {
    match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => fs::create_dir_all(dir),
        _ => Ok(()),
    }
}

/// Drop and recreate both tables, then fill them, in one transaction.
///
/// `pokemons` has no surrogate key. `stats.stat_id` is the 0-based row index,
/// needed because `poke_id` repeats once per type and metric.
pub fn replace_tables(
    conn: &Connection,
    entities: &[EntityRow],
    metrics: &[MetricRow],
) -> rusqlite::Result<()> {
    let tx = conn.unchecked_transaction()?;
    tx.execute_batch(
        "
        DROP TABLE IF EXISTS pokemons;
        DROP TABLE IF EXISTS stats;

        CREATE TABLE pokemons (
            poke_id      TEXT NOT NULL,
            rank         INTEGER NOT NULL,
            pokemon      TEXT NOT NULL,
            type         TEXT NOT NULL,
            icon         TEXT NOT NULL,
            details_link TEXT NOT NULL,
            data_as_on   TEXT NOT NULL
        );

        CREATE TABLE stats (
            stat_id  INTEGER PRIMARY KEY,
            poke_id  TEXT NOT NULL,
            type     TEXT NOT NULL,
            metric   TEXT NOT NULL,
            value    INTEGER NOT NULL
        );
        CREATE INDEX idx_stats_poke ON stats(poke_id);
        ",
    )?;
    {
        let mut p_stmt = tx.prepare(
            "INSERT INTO pokemons (poke_id, rank, pokemon, type, icon, details_link, data_as_on)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        )?;
        for e in entities {
            p_stmt.execute(rusqlite::params![
                e.poke_id, e.rank, e.pokemon, e.pokemon_type, e.icon, e.details_link, e.data_as_on,
            ])?;
        }

        let mut s_stmt = tx.prepare(
            "INSERT INTO stats (stat_id, poke_id, type, metric, value)
             VALUES (?1, ?2, ?3, ?4, ?5)",
        )?;
        for (i, m) in metrics.iter().enumerate() {
            s_stmt.execute(rusqlite::params![
                i as i64, m.poke_id, m.pokemon_type, m.metric.label(), m.value,
            ])?;
        }
    }
    tx.commit()
}

/// Join the two tables back into long-form rows, in `stat_id` order.
pub fn read_flat(conn: &Connection) -> rusqlite::Result<Vec<PokedexRow>> {
    let mut stmt = conn.prepare(
        "SELECT s.poke_id, p.rank, p.pokemon, s.type, s.metric, s.value,
                p.icon, p.details_link, p.data_as_on
         FROM stats s
         JOIN pokemons p ON p.poke_id = s.poke_id AND p.type = s.type
         ORDER BY s.stat_id",
    )?;
    let rows = stmt
        .query_map([], |row| {
            let label: String = row.get(4)?;
            let metric = Metric::from_label(&label).ok_or_else(|| {
                rusqlite::Error::FromSqlConversionFailure(
                    4,
                    rusqlite::types::Type::Text,
                    format!("unknown metric {:?}", label).into(),
                )
            })?;
            Ok(PokedexRow {
                poke_id: row.get(0)?,
                rank: row.get(1)?,
                pokemon: row.get(2)?,
                pokemon_type: row.get(3)?,
                metric,
                value: row.get(5)?,
                icon: row.get(6)?,
                details_link: row.get(7)?,
                data_as_on: row.get(8)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

// ── Tests ──
