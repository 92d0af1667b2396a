pub mod cells;

use std::sync::LazyLock;

use scraper::{ElementRef, Html, Selector};
use url::Url;

use crate::error::{EtlError, Result};
use crate::model::ScrapedRecord;

fn sel(css: &str) -> Selector {
    Selector::parse(css).unwrap()
}

static TABLE: LazyLock<Selector> = LazyLock::new(|| sel("table#pokedex"));
static TBODY: LazyLock<Selector> = LazyLock::new(|| sel("tbody"));
static ROW: LazyLock<Selector> = LazyLock::new(|| sel("tr"));
static RANK: LazyLock<Selector> = LazyLock::new(|| sel("span.infocard-cell-data"));
static NAME: LazyLock<Selector> = LazyLock::new(|| sel("a.ent-name"));
static VARIANT: LazyLock<Selector> = LazyLock::new(|| sel("small.text-muted"));
static TYPE: LazyLock<Selector> = LazyLock::new(|| sel("a.type-icon"));
static TOTAL: LazyLock<Selector> = LazyLock::new(|| sel("td.cell-total"));
static NUM: LazyLock<Selector> = LazyLock::new(|| sel("td.cell-num"));
static ICON: LazyLock<Selector> = LazyLock::new(|| sel("img.icon-pkmn"));

/// `td.cell-num` cells before the stats: the rank cell and the total cell.
const LEADING_NUM_CELLS: usize = 2;
const STAT_COUNT: usize = 6;

/// Rows of `table#pokedex > tbody` in document order.
pub fn table_rows(doc: &Html) -> Result<Vec<ElementRef<'_>>> {
    let table = doc
        .select(&TABLE)
        .next()
        .ok_or_else(|| EtlError::parse("table#pokedex not found"))?;
    let tbody = table
        .select(&TBODY)
        .next()
        .ok_or_else(|| EtlError::parse("table#pokedex has no tbody"))?;
    Ok(tbody
        .children()
        .filter_map(ElementRef::wrap)
        .filter(|el| ROW.matches(el))
        .collect())
}

/// Parse one `<tr>`. Stats are mapped by column position, not by header label.
pub fn parse_row(row: ElementRef, root: &Url, captured_at: &str) -> Result<ScrapedRecord> {
    let rank_text = cells::text(cells::first(row, &RANK, "rank label")?);
    let rank = cells::positive(&rank_text, "rank")?;
    let at = |what: &str| format!("{} (rank {})", what, rank);

    let name_link = cells::first(row, &NAME, &at("name link"))?;
    let base_name = cells::text(name_link);
    let name = match row.select(&VARIANT).next() {
        Some(variant) => format!("{} ({})", base_name, cells::text(variant)),
        None => base_name,
    };

    let href = cells::attr(name_link, "href", &at("name link"))?;
    let details_url = root
        .join(&href)
        .map_err(|e| EtlError::parse_with(format!("bad details link {:?}", href), e))?
        .to_string();

    let types = row
        .select(&TYPE)
        .map(cells::text)
        .collect::<Vec<_>>()
        .join(", ");

    let total_text = cells::text(cells::first(row, &TOTAL, &at("total cell"))?);
    let total_power = cells::number(&total_text, "total_power")?;

    let stats: Vec<String> = row
        .select(&NUM)
        .skip(LEADING_NUM_CELLS)
        .take(STAT_COUNT)
        .map(cells::text)
        .collect();
    if stats.len() < STAT_COUNT {
        return Err(EtlError::parse(format!(
            "expected {} stat cells, found {} (rank {})",
            STAT_COUNT,
            stats.len(),
            rank
        )));
    }

    let icon = cells::first(row, &ICON, &at("icon"))?;
    let icon_url = cells::attr(icon, "src", &at("icon"))?;

    Ok(ScrapedRecord {
        rank,
        name,
        types,
        total_power,
        hit_points: cells::number(&stats[0], "hit_points")?,
        attack: cells::number(&stats[1], "attack")?,
        defense: cells::number(&stats[2], "defense")?,
        special_attack: cells::number(&stats[3], "special_attack")?,
        special_defense: cells::number(&stats[4], "special_defense")?,
        speed: cells::number(&stats[5], "speed")?,
        icon_url,
        details_url,
        scrape_ts: captured_at.to_string(),
    })
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;

    const TS: &str = "2024-05-01 10:00:00";

    fn root() -> Url {
        Url::parse("https://pokemondb.net/").unwrap()
    }

    fn parse_fixture(name: &str) -> Result<Vec<ScrapedRecord>> {
        let html = std::fs::read_to_string(format!("tests/fixtures/{}.html", name)).unwrap();
        let doc = Html::parse_document(&html);
        table_rows(&doc)?
            .into_iter()
            .map(|row| parse_row(row, &root(), TS))
            .collect()
    }

    fn parse_one(row_html: &str) -> Result<ScrapedRecord> {
        let html = format!(
            "<table id=\"pokedex\"><tbody>{}</tbody></table>",
            row_html
        );
        let doc = Html::parse_document(&html);
        let rows = table_rows(&doc)?;
        parse_row(rows[0], &root(), TS)
    }

    #[test]
    fn fixture_rows_in_order() {
        let recs = parse_fixture("pokedex").unwrap();
        let ranks: Vec<u32> = recs.iter().map(|r| r.rank).collect();
        assert_eq!(ranks, vec![1, 6, 6, 132]);
    }

    #[test]
    fn bulbasaur_positional_stats() {
        let recs = parse_fixture("pokedex").unwrap();
        let b = &recs[0];
        assert_eq!(b.name, "Bulbasaur");
        assert_eq!(b.types, "Grass, Poison");
        assert_eq!(b.total_power, 318);
        assert_eq!(
            (b.hit_points, b.attack, b.defense, b.special_attack, b.special_defense, b.speed),
            (45, 49, 49, 65, 65, 45)
        );
        assert_eq!(b.details_url, "https://pokemondb.net/pokedex/bulbasaur");
        assert_eq!(b.icon_url, "https://img.pokemondb.net/sprites/scarlet-violet/icon/bulbasaur.png");
        assert_eq!(b.scrape_ts, TS);
    }

    #[test]
    fn variant_name_is_composite() {
        let recs = parse_fixture("pokedex").unwrap();
        assert_eq!(recs[1].name, "Charizard");
        assert_eq!(recs[2].name, "Charizard (Mega Charizard X)");
        assert_eq!(recs[2].types, "Fire, Dragon");
        assert_eq!(recs[2].attack, 130);
    }

    #[test]
    fn single_type() {
        let recs = parse_fixture("pokedex").unwrap();
        assert_eq!(recs[3].name, "Ditto");
        assert_eq!(recs[3].types, "Normal");
    }

    #[test]
    fn missing_table_is_parse_error() {
        let doc = Html::parse_document("<table id=\"other\"><tbody><tr></tr></tbody></table>");
        assert!(matches!(table_rows(&doc), Err(EtlError::Parse { .. })));
    }

    #[test]
    fn short_row_is_parse_error() {
        let row = r#"<tr>
            <td class="cell-num cell-fixed"><span class="infocard-cell-data">0010</span>
              <img class="img-fixed icon-pkmn" src="/caterpie.png"></td>
            <td class="cell-name"><a class="ent-name" href="/pokedex/caterpie">Caterpie</a></td>
            <td class="cell-icon"><a class="type-icon type-bug" href="/type/bug">Bug</a></td>
            <td class="cell-num cell-total">195</td>
            <td class="cell-num">45</td><td class="cell-num">30</td>
        </tr>"#;
        let err = parse_one(row).unwrap_err();
        assert!(err.to_string().contains("expected 6 stat cells, found 2"));
    }

    #[test]
    fn zero_rank_is_parse_error() {
        let row = r#"<tr>
            <td class="cell-num cell-fixed"><span class="infocard-cell-data">0000</span>
              <img class="img-fixed icon-pkmn" src="/missingno.png"></td>
            <td class="cell-name"><a class="ent-name" href="/pokedex/missingno">MissingNo</a></td>
            <td class="cell-icon"><a class="type-icon type-normal" href="/type/normal">Normal</a></td>
            <td class="cell-num cell-total">300</td>
            <td class="cell-num">50</td><td class="cell-num">50</td><td class="cell-num">50</td>
            <td class="cell-num">50</td><td class="cell-num">50</td><td class="cell-num">50</td>
        </tr>"#;
        let err = parse_one(row).unwrap_err();
        assert!(matches!(err, EtlError::Parse { .. }));
        assert!(err.to_string().contains("rank is not a positive number"));
    }

    #[test]
    fn non_numeric_stat_is_parse_error() {
        let row = r#"<tr>
            <td class="cell-num cell-fixed"><span class="infocard-cell-data">0010</span>
              <img class="img-fixed icon-pkmn" src="/caterpie.png"></td>
            <td class="cell-name"><a class="ent-name" href="/pokedex/caterpie">Caterpie</a></td>
            <td class="cell-icon"><a class="type-icon type-bug" href="/type/bug">Bug</a></td>
            <td class="cell-num cell-total">195</td>
            <td class="cell-num">45</td><td class="cell-num">30</td><td class="cell-num">35</td>
            <td class="cell-num">20</td><td class="cell-num">20</td><td class="cell-num">??</td>
        </tr>"#;
        assert!(matches!(parse_one(row), Err(EtlError::Parse { .. })));
    }

    #[test]
    fn untyped_row_has_empty_types() {
        let row = r#"<tr>
            <td class="cell-num cell-fixed"><span class="infocard-cell-data">0999</span>
              <img class="img-fixed icon-pkmn" src="/x.png"></td>
            <td class="cell-name"><a class="ent-name" href="/pokedex/x">X</a></td>
            <td class="cell-icon"></td>
            <td class="cell-num cell-total">6</td>
            <td class="cell-num">1</td><td class="cell-num">1</td><td class="cell-num">1</td>
            <td class="cell-num">1</td><td class="cell-num">1</td><td class="cell-num">1</td>
        </tr>"#;
        let rec = parse_one(row).unwrap();
        assert_eq!(rec.types, "");
        assert_eq!(rec.icon_url, "/x.png");
        assert_eq!(rec.details_url, "https://pokemondb.net/pokedex/x");
    }
}
