use std::fmt;

use serde::{Deserialize, Serialize};

/// One scraped pokedex row. Field order is the column order of the scraped CSV.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScrapedRecord {
    pub rank: u32,
    pub name: String,
    pub types: String,
    pub total_power: u32,
    pub hit_points: u32,
    pub attack: u32,
    pub defense: u32,
    pub special_attack: u32,
    pub special_defense: u32,
    pub speed: u32,
    pub icon_url: String,
    pub details_url: String,
    pub scrape_ts: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Metric {
    #[serde(rename = "HP")]
    Hp,
    Attack,
    Defense,
    #[serde(rename = "Special Attack")]
    SpecialAttack,
    #[serde(rename = "Special Defense")]
    SpecialDefense,
    Speed,
}

impl Metric {
    pub fn label(self) -> &'static str {
        match self {
            Metric::Hp => "HP",
            Metric::Attack => "Attack",
            Metric::Defense => "Defense",
            Metric::SpecialAttack => "Special Attack",
            Metric::SpecialDefense => "Special Defense",
            Metric::Speed => "Speed",
        }
    }

    pub fn from_label(label: &str) -> Option<Metric> {
        match label {
            "HP" => Some(Metric::Hp),
            "Attack" => Some(Metric::Attack),
            "Defense" => Some(Metric::Defense),
            "Special Attack" => Some(Metric::SpecialAttack),
            "Special Defense" => Some(Metric::SpecialDefense),
            "Speed" => Some(Metric::Speed),
            _ => None,
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Which numeric columns get unpivoted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricSet {
    /// HP, Attack (attack + special attack), Defense (defense + special defense), Speed.
    #[default]
    Derived,
    /// All six raw attributes.
    Raw,
}

impl MetricSet {
    pub fn metrics(self) -> &'static [Metric] {
        match self {
            MetricSet::Derived => &[Metric::Hp, Metric::Attack, Metric::Defense, Metric::Speed],
            MetricSet::Raw => &[
                Metric::Hp,
                Metric::Attack,
                Metric::Defense,
                Metric::SpecialAttack,
                Metric::SpecialDefense,
                Metric::Speed,
            ],
        }
    }

    pub fn value(self, metric: Metric, rec: &ScrapedRecord) -> i64 {
        let raw = |v: u32| i64::from(v);
        match (self, metric) {
            (_, Metric::Hp) => raw(rec.hit_points),
            (_, Metric::Speed) => raw(rec.speed),
            (MetricSet::Derived, Metric::Attack) => raw(rec.attack) + raw(rec.special_attack),
            (MetricSet::Derived, Metric::Defense) => raw(rec.defense) + raw(rec.special_defense),
            (_, Metric::Attack) => raw(rec.attack),
            (_, Metric::Defense) => raw(rec.defense),
            (_, Metric::SpecialAttack) => raw(rec.special_attack),
            (_, Metric::SpecialDefense) => raw(rec.special_defense),
        }
    }
}

// ── Normalized tables ──

/// Flat long-form row: one per (entity, category, metric).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PokedexRow {
    #[serde(rename = "PokeID")]
    pub poke_id: String,
    #[serde(rename = "Rank")]
    pub rank: u32,
    #[serde(rename = "Pokemon")]
    pub pokemon: String,
    #[serde(rename = "Type")]
    pub pokemon_type: String,
    #[serde(rename = "Metric")]
    pub metric: Metric,
    #[serde(rename = "Values")]
    pub value: i64,
    #[serde(rename = "Icon")]
    pub icon: String,
    #[serde(rename = "Details Link")]
    pub details_link: String,
    #[serde(rename = "Data As On")]
    pub data_as_on: String,
}

/// One row per (entity, category) pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EntityRow {
    pub poke_id: String,
    pub rank: u32,
    pub pokemon: String,
    pub pokemon_type: String,
    pub icon: String,
    pub details_link: String,
    pub data_as_on: String,
}

/// One row per (entity, category, metric). `poke_id` is not unique here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricRow {
    pub poke_id: String,
    pub pokemon_type: String,
    pub metric: Metric,
    pub value: i64,
}
