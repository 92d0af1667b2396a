use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};

use tracing::info;

use crate::error::{EtlError, Result};
use crate::model::ScrapedRecord;

/// Destination for scraped records, owned by whoever drives the scrape.
pub trait RecordSink {
    fn write(&mut self, record: &ScrapedRecord) -> Result<()>;
}

/// Buffers everything in memory; nothing is durable until the caller writes it out.
impl RecordSink for Vec<ScrapedRecord> {
    fn write(&mut self, record: &ScrapedRecord) -> Result<()> {
        self.push(record.clone());
        Ok(())
    }
}

/// Appends one row at a time and flushes after each, so a crash keeps the rows
/// written so far. The header goes out only when the file starts empty.
pub struct CsvAppendSink {
    path: PathBuf,
    writer: csv::Writer<File>,
}

impl CsvAppendSink {
    pub fn open(path: &Path, clear_contents: bool) -> Result<Self> {
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir).map_err(|e| EtlError::write(dir, e))?;
        }

        if clear_contents && path.exists() {
            File::create(path).map_err(|e| EtlError::write(path, e))?;
            info!("Cleared existing contents from {}", path.display());
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|e| EtlError::write(path, e))?;
        let is_empty = file
            .metadata()
            .map_err(|e| EtlError::write(path, e))?
            .len()
            == 0;

        let writer = csv::WriterBuilder::new()
            .has_headers(is_empty)
            .from_writer(file);

        Ok(CsvAppendSink {
            path: path.to_path_buf(),
            writer,
        })
    }
}

impl RecordSink for CsvAppendSink {
    fn write(&mut self, record: &ScrapedRecord) -> Result<()> {
        self.writer
            .serialize(record)
            .map_err(|e| EtlError::write(&self.path, e))?;
        self.writer
            .flush()
            .map_err(|e| EtlError::write(&self.path, e))?;
        Ok(())
    }
}

/// Read the whole scraped file. Missing columns and non-integer numbers fail here.
pub fn read_scraped(path: &Path) -> Result<Vec<ScrapedRecord>> {
    let mut reader = csv::Reader::from_path(path).map_err(|e| {
        EtlError::transform_with(format!("cannot open {}", path.display()), e)
    })?;
    reader
        .deserialize::<ScrapedRecord>()
        .enumerate()
        .map(|(i, row)| {
            row.map_err(|e| {
                EtlError::transform_with(format!("bad scraped row {} in {}", i + 1, path.display()), e)
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(rank: u32, name: &str) -> ScrapedRecord {
        ScrapedRecord {
            rank,
            name: name.to_string(),
            types: "Fire, Flying".to_string(),
            total_power: 534,
            hit_points: 78,
            attack: 84,
            defense: 78,
            special_attack: 109,
            special_defense: 85,
            speed: 100,
            icon_url: "https://img.pokemondb.net/sprites/scarlet-violet/icon/charizard.png".into(),
            details_url: "https://pokemondb.net/pokedex/charizard".into(),
            scrape_ts: "2024-05-01 10:00:00".into(),
        }
    }

    #[test]
    fn header_written_once() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scraped/pokemons.csv");

        let mut sink = CsvAppendSink::open(&path, false).unwrap();
        sink.write(&record(1, "Bulbasaur")).unwrap();
        sink.write(&record(2, "Ivysaur")).unwrap();
        drop(sink);

        let text = fs::read_to_string(&path).unwrap();
        let mut lines = text.lines();
        assert_eq!(
            lines.next(),
            Some("rank,name,types,total_power,hit_points,attack,defense,special_attack,special_defense,speed,icon_url,details_url,scrape_ts")
        );
        assert_eq!(lines.count(), 2);
    }

    #[test]
    fn append_keeps_previous_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pokemons.csv");

        let mut first = CsvAppendSink::open(&path, false).unwrap();
        first.write(&record(1, "Bulbasaur")).unwrap();
        drop(first);

        let mut second = CsvAppendSink::open(&path, false).unwrap();
        second.write(&record(2, "Ivysaur")).unwrap();
        drop(second);

        let recs = read_scraped(&path).unwrap();
        let names: Vec<&str> = recs.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["Bulbasaur", "Ivysaur"]);
    }

    #[test]
    fn clear_contents_truncates() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pokemons.csv");

        let mut first = CsvAppendSink::open(&path, false).unwrap();
        first.write(&record(1, "Bulbasaur")).unwrap();
        drop(first);

        let mut second = CsvAppendSink::open(&path, true).unwrap();
        second.write(&record(6, "Charizard")).unwrap();
        drop(second);

        let recs = read_scraped(&path).unwrap();
        assert_eq!(recs, vec![record(6, "Charizard")]);
    }

    #[test]
    fn quoted_types_survive() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pokemons.csv");
        let mut sink = CsvAppendSink::open(&path, true).unwrap();
        sink.write(&record(6, "Charizard (Mega Charizard X)")).unwrap();
        drop(sink);

        let recs = read_scraped(&path).unwrap();
        assert_eq!(recs[0].types, "Fire, Flying");
        assert_eq!(recs[0].name, "Charizard (Mega Charizard X)");
    }

    #[test]
    fn vec_sink_buffers() {
        let mut buf: Vec<ScrapedRecord> = Vec::new();
        buf.write(&record(1, "Bulbasaur")).unwrap();
        assert_eq!(buf.len(), 1);
    }

    #[test]
    fn missing_column_is_transform_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.csv");
        fs::write(&path, "rank,name\n1,Bulbasaur\n").unwrap();
        assert!(matches!(read_scraped(&path), Err(EtlError::Transform { .. })));
    }

    #[test]
    fn non_integer_stat_is_transform_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.csv");
        fs::write(
            &path,
            "rank,name,types,total_power,hit_points,attack,defense,special_attack,special_defense,speed,icon_url,details_url,scrape_ts\n\
             1,Bulbasaur,Grass,318,forty,49,49,65,65,45,i,d,2024-05-01 10:00:00\n",
        )
        .unwrap();
        let err = read_scraped(&path).unwrap_err();
        assert!(err.to_string().contains("bad scraped row 1"));
    }
}
