//! Strategies over parsed HTML documents.

use std::sync::LazyLock;

use scraper::{ElementRef, Html, Selector};
use serde_json::Value;

use super::images::split_srcset;
use super::json::path_texts;
use super::text::{collapse_whitespace, strip_html};

static META: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("meta").expect("valid selector"));
static TITLE: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("title").expect("valid selector"));
static ROW: LazyLock<Selector> = LazyLock::new(|| Selector::parse("tr").expect("valid selector"));
static CELL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("th, td").expect("valid selector"));
static DL_ITEM: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("dt, dd").expect("valid selector"));
static JSON_LD: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(r#"script[type="application/ld+json"]"#).expect("valid selector")
});

/// Parse a configured selector. Selectors are checked when a run starts, so
/// a failure here only drops the strategy.
pub(crate) fn selector(raw: &str) -> Option<Selector> {
    Selector::parse(raw).ok()
}

/// Element text with markup removed and line structure kept.
pub(crate) fn element_text(element: &ElementRef<'_>) -> String {
    strip_html(&element.inner_html())
}

pub(crate) fn css(doc: &Html, raw_selector: &str, attrs: &[String]) -> Vec<String> {
    let Some(sel) = selector(raw_selector) else {
        return Vec::new();
    };
    let mut out = Vec::new();
    for element in doc.select(&sel) {
        let attr_value = attrs.iter().find_map(|attr| {
            element
                .value()
                .attr(attr)
                .filter(|v| !v.trim().is_empty())
                .map(|v| (attr, v))
        });
        match attr_value {
            Some((attr, value)) if attr.ends_with("srcset") => out.extend(split_srcset(value)),
            Some((_, value)) => out.push(value.trim().to_owned()),
            None => out.push(element_text(&element)),
        }
    }
    out
}

/// `content` of `<meta>` tags whose `name`, `property` or `itemprop` matches.
pub(crate) fn meta(doc: &Html, name: &str) -> Vec<String> {
    doc.select(&META)
        .filter(|el| {
            ["name", "property", "itemprop"]
                .iter()
                .any(|key| el.value().attr(key).is_some_and(|v| v.eq_ignore_ascii_case(name)))
        })
        .filter_map(|el| el.value().attr("content"))
        .map(str::to_owned)
        .collect()
}

pub(crate) fn title(doc: &Html, separator: Option<&str>) -> Vec<String> {
    doc.select(&TITLE)
        .next()
        .map(|el| {
            let full = collapse_whitespace(&el.text().collect::<String>());
            match separator {
                Some(sep) => full
                    .split_once(sep)
                    .map_or(full.clone(), |(head, _)| head.trim().to_owned()),
                None => full,
            }
        })
        .into_iter()
        .collect()
}

/// First two cells of every row with at least two cells.
pub(crate) fn spec_table(doc: &Html, raw_selector: &str) -> Vec<(String, String)> {
    let Some(sel) = selector(raw_selector) else {
        return Vec::new();
    };
    let mut pairs = Vec::new();
    for table in doc.select(&sel) {
        for row in table.select(&ROW) {
            let cells: Vec<String> = row
                .select(&CELL)
                .map(|c| collapse_whitespace(&element_text(&c)))
                .collect();
            // A repeated cell is a section header, not a pair.
            if let [key, value, ..] = cells.as_slice() {
                if key != value {
                    pairs.push((key.clone(), value.clone()));
                }
            }
        }
    }
    pairs
}

pub(crate) fn definition_list(doc: &Html, raw_selector: &str) -> Vec<(String, String)> {
    let Some(sel) = selector(raw_selector) else {
        return Vec::new();
    };
    let mut pairs = Vec::new();
    for list in doc.select(&sel) {
        let mut pending: Option<String> = None;
        for item in list.select(&DL_ITEM) {
            let text = collapse_whitespace(&element_text(&item));
            match item.value().name() {
                "dt" => pending = Some(text),
                _ => {
                    if let Some(key) = pending.take() {
                        pairs.push((key, text));
                    }
                }
            }
        }
    }
    pairs
}

/// Zip key and value elements inside each container, in document order.
pub(crate) fn spec_pairs(
    doc: &Html,
    container: &str,
    key: &str,
    value: &str,
) -> Vec<(String, String)> {
    let (Some(container), Some(key), Some(value)) =
        (selector(container), selector(key), selector(value))
    else {
        return Vec::new();
    };
    let mut pairs = Vec::new();
    for block in doc.select(&container) {
        let keys = block.select(&key).map(|k| collapse_whitespace(&element_text(&k)));
        let values = block.select(&value).map(|v| collapse_whitespace(&element_text(&v)));
        pairs.extend(keys.zip(values));
    }
    pairs
}

/// Scalars at `path` inside the first JSON-LD `Product` node.
pub(crate) fn json_ld(doc: &Html, path: &str) -> Vec<String> {
    product_node(doc)
        .map(|node| path_texts(&node, path))
        .unwrap_or_default()
}

fn product_node(doc: &Html) -> Option<Value> {
    ld_nodes(doc).into_iter().find(|node| has_type(node, "Product"))
}

/// Item URLs of every JSON-LD `ItemList` on the page, in list order.
///
/// Entries carry the URL either directly or on a nested `item`.
pub(crate) fn item_list_urls(doc: &Html) -> Vec<String> {
    ld_nodes(doc)
        .iter()
        .filter(|node| has_type(node, "ItemList"))
        .filter_map(|list| list.get("itemListElement").and_then(Value::as_array))
        .flatten()
        .filter_map(|entry| {
            entry
                .get("url")
                .or_else(|| entry.get("item").and_then(|item| item.get("url")))
                .and_then(Value::as_str)
        })
        .map(str::trim)
        .filter(|url| !url.is_empty())
        .map(str::to_owned)
        .collect()
}

/// Every JSON-LD node on the page, script order first.
fn ld_nodes(doc: &Html) -> Vec<Value> {
    let mut nodes = Vec::new();
    for script in doc.select(&JSON_LD) {
        let raw = script.text().collect::<String>();
        let Ok(value) = serde_json::from_str::<Value>(raw.trim()) else {
            continue;
        };

        // Top-level object, array, or an `@graph` container.
        let candidates: Vec<Value> = match value {
            Value::Array(items) => items,
            other => vec![other],
        };
        let graphs: Vec<Value> = candidates
            .iter()
            .filter_map(|c| c.get("@graph").and_then(Value::as_array))
            .flatten()
            .cloned()
            .collect();
        nodes.extend(candidates);
        nodes.extend(graphs);
    }
    nodes
}

fn has_type(node: &Value, wanted: &str) -> bool {
    match node.get("@type") {
        Some(Value::String(t)) => t.eq_ignore_ascii_case(wanted),
        Some(Value::Array(types)) => types
            .iter()
            .filter_map(Value::as_str)
            .any(|t| t.eq_ignore_ascii_case(wanted)),
        _ => false,
    }
}
