use std::num::NonZeroU32;
use std::sync::LazyLock;

use regex::Regex;
use scraper::{ElementRef, Selector};

use crate::error::{EtlError, Result};

static WS_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

/// Concatenated text of an element, whitespace collapsed and trimmed.
pub fn text(el: ElementRef) -> String {
    let raw: String = el.text().collect();
    WS_RE.replace_all(&raw, " ").trim().to_string()
}

pub fn first<'a>(row: ElementRef<'a>, sel: &Selector, what: &str) -> Result<ElementRef<'a>> {
    row.select(sel)
        .next()
        .ok_or_else(|| EtlError::parse(format!("missing {}", what)))
}

pub fn attr(el: ElementRef, name: &str, what: &str) -> Result<String> {
    el.value()
        .attr(name)
        .map(str::to_string)
        .ok_or_else(|| EtlError::parse(format!("{} has no {} attribute", what, name)))
}

pub fn number(raw: &str, field: &str) -> Result<u32> {
    raw.parse::<u32>()
        .map_err(|e| EtlError::parse_with(format!("{} is not a number: {:?}", field, raw), e))
}

/// Like [`number`], but `0` is rejected.
pub fn positive(raw: &str, field: &str) -> Result<u32> {
    raw.parse::<NonZeroU32>()
        .map(NonZeroU32::get)
        .map_err(|e| EtlError::parse_with(format!("{} is not a positive number: {:?}", field, raw), e))
}
