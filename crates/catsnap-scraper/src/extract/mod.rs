//! Field extraction: ordered strategy chains evaluated against one record.
//!
//! Each canonical field is resolved by trying its strategies in order. Scalar
//! fields stop at the first strategy that yields a usable value; list fields
//! (images, colours, highlights, tags) merge candidates from every strategy,
//! keeping first-seen order. A field nothing could determine is left out of the result.

mod html;
mod images;
mod json;
mod price;
mod text;

use std::cell::OnceCell;
use std::collections::{BTreeMap, HashMap, HashSet};

use catsnap_core::{Field, FieldKind, FieldRules, SourceConfig, SourceKind, Strategy, VariantDescriptor};
use regex::{Regex, RegexBuilder};
use rust_decimal::Decimal;
use scraper::Html;
use serde_json::Value;

use crate::error::ScraperError;

pub(crate) use html::item_list_urls;
pub use images::ImageFilter;
pub use price::parse_price;
pub use text::{collapse_whitespace, parse_availability, strip_html};

/// One resolved field value.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Text(String),
    Number(Decimal),
    Flag(bool),
    List(Vec<String>),
    Mapping(BTreeMap<String, String>),
    Variants(Vec<VariantDescriptor>),
}

/// Canonical field → value for one record. Missing keys mean "not found".
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExtractionResult {
    values: BTreeMap<Field, FieldValue>,
}

impl ExtractionResult {
    pub fn set(&mut self, field: Field, value: FieldValue) {
        self.values.insert(field, value);
    }

    #[must_use]
    pub fn get(&self, field: Field) -> Option<&FieldValue> {
        self.values.get(&field)
    }

    #[must_use]
    pub fn contains(&self, field: Field) -> bool {
        self.values.contains_key(&field)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    #[must_use]
    pub fn text(&self, field: Field) -> Option<&str> {
        match self.values.get(&field) {
            Some(FieldValue::Text(s)) => Some(s),
            _ => None,
        }
    }

    #[must_use]
    pub fn number(&self, field: Field) -> Option<Decimal> {
        match self.values.get(&field) {
            Some(FieldValue::Number(n)) => Some(*n),
            _ => None,
        }
    }

    #[must_use]
    pub fn flag(&self, field: Field) -> Option<bool> {
        match self.values.get(&field) {
            Some(FieldValue::Flag(b)) => Some(*b),
            _ => None,
        }
    }

    #[must_use]
    pub fn list(&self, field: Field) -> &[String] {
        match self.values.get(&field) {
            Some(FieldValue::List(items)) => items,
            _ => &[],
        }
    }

    #[must_use]
    pub fn variants(&self) -> &[VariantDescriptor] {
        match self.values.get(&Field::Variants) {
            Some(FieldValue::Variants(items)) => items,
            _ => &[],
        }
    }

    /// Removes and returns the specification mapping.
    pub fn take_specifications(&mut self) -> BTreeMap<String, String> {
        match self.values.remove(&Field::Specifications) {
            Some(FieldValue::Mapping(map)) => map,
            _ => BTreeMap::new(),
        }
    }

    /// Copy fields from `other` that this result is missing.
    pub fn fill_from(&mut self, other: ExtractionResult) {
        for (field, value) in other.values {
            self.values.entry(field).or_insert(value);
        }
    }
}

/// A raw record as the strategies see it.
#[derive(Clone, Copy)]
pub enum RecordView<'a> {
    Json(&'a Value),
    Html {
        doc: &'a Html,
        body: &'a str,
        url: &'a str,
    },
}

/// Highlights shorter than this are labels rather than feature text.
const MIN_HIGHLIGHT_CHARS: usize = 6;

/// Evaluates strategy chains for one source.
pub struct Extractor<'a> {
    origin: &'a str,
    images: ImageFilter,
    /// `text_pattern` regexes, compiled once per source.
    patterns: HashMap<&'a str, Regex>,
}

/// What one strategy produced before field coercion.
enum Candidate {
    Texts(Vec<String>),
    Pairs(Vec<(String, String)>),
    Variants(Vec<VariantDescriptor>),
}

impl<'a> Extractor<'a> {
    #[must_use]
    pub fn new(source: &'a SourceConfig) -> Self {
        let mut patterns = HashMap::new();
        for rules in source_rules(source) {
            for raw in rules.values().flatten().filter_map(Strategy::pattern) {
                if patterns.contains_key(raw) {
                    continue;
                }
                match compile_pattern(raw) {
                    Ok(re) => {
                        patterns.insert(raw, re);
                    }
                    Err(e) => tracing::warn!(pattern = raw, error = %e, "dropping text pattern"),
                }
            }
        }
        Self {
            origin: &source.origin,
            images: ImageFilter::new(&source.origin, &source.images),
            patterns,
        }
    }

    /// Resolve every field in `rules` against `record`.
    #[must_use]
    pub fn extract(&self, record: RecordView<'_>, rules: &FieldRules) -> ExtractionResult {
        let visible_text = OnceCell::new();
        let session = Session {
            record,
            visible_text: &visible_text,
            patterns: &self.patterns,
        };
        let base = match record {
            RecordView::Html { url, .. } => url,
            RecordView::Json(_) => self.origin,
        };

        let mut result = ExtractionResult::default();
        for (field, chain) in rules {
            if let Some(value) = self.resolve_field(*field, chain, &session, base) {
                result.set(*field, value);
            }
        }
        result
    }

    fn resolve_field(
        &self,
        field: Field,
        chain: &[Strategy],
        session: &Session<'_, '_>,
        base: &str,
    ) -> Option<FieldValue> {
        if field.merges_candidates() {
            return self.merge_list(field, chain, session, base);
        }

        chain.iter().find_map(|strategy| {
            let candidate = session.run(strategy);
            coerce(field, candidate)
        })
    }

    fn merge_list(
        &self,
        field: Field,
        chain: &[Strategy],
        session: &Session<'_, '_>,
        base: &str,
    ) -> Option<FieldValue> {
        let mut seen = HashSet::new();
        let mut merged = Vec::new();
        for strategy in chain {
            let Candidate::Texts(texts) = session.run(strategy) else {
                continue;
            };
            for raw in texts {
                for item in self.list_items(field, &raw, base) {
                    let key = match field {
                        Field::Images => item.clone(),
                        _ => item.to_lowercase(),
                    };
                    if seen.insert(key) {
                        merged.push(item);
                    }
                }
            }
        }
        (!merged.is_empty()).then_some(FieldValue::List(merged))
    }

    /// Items one raw candidate contributes to a list field.
    fn list_items(&self, field: Field, raw: &str, base: &str) -> Vec<String> {
        match field {
            Field::Images => self.images.normalize(raw, base).into_iter().collect(),
            Field::Tags => raw
                .split(',')
                .map(collapse_whitespace)
                .filter(|t| !t.is_empty())
                .collect(),
            Field::Highlights => Some(collapse_whitespace(raw))
                .filter(|h| h.chars().count() >= MIN_HIGHLIGHT_CHARS)
                .into_iter()
                .collect(),
            _ => Some(collapse_whitespace(raw))
                .filter(|c| !c.is_empty() && !text::is_color_label(c))
                .into_iter()
                .collect(),
        }
    }
}

/// Coerce one strategy's output into `field`'s value kind. `None` means the
/// strategy failed and the next one should be tried.
fn coerce(field: Field, candidate: Candidate) -> Option<FieldValue> {
    match (field.kind(), candidate) {
        (FieldKind::Text, Candidate::Texts(texts)) => texts
            .iter()
            .map(|t| {
                if field == Field::Description {
                    strip_html(t)
                } else {
                    collapse_whitespace(t)
                }
            })
            .find(|t| !t.is_empty())
            .map(FieldValue::Text),
        (FieldKind::Number, Candidate::Texts(texts)) => texts
            .iter()
            .find_map(|t| parse_price(t))
            .map(FieldValue::Number),
        (FieldKind::Flag, Candidate::Texts(texts)) => {
            let flags: Vec<bool> = texts.iter().filter_map(|t| parse_availability(t)).collect();
            (!flags.is_empty()).then(|| FieldValue::Flag(flags.contains(&true)))
        }
        (FieldKind::List, Candidate::Texts(texts)) => {
            let items: Vec<String> = texts
                .iter()
                .map(|t| collapse_whitespace(t))
                .filter(|t| !t.is_empty())
                .collect();
            (!items.is_empty()).then_some(FieldValue::List(items))
        }
        (FieldKind::Mapping, Candidate::Pairs(pairs)) => {
            let mut map = BTreeMap::new();
            for (key, value) in pairs {
                let key = collapse_whitespace(&key);
                let value = collapse_whitespace(&value);
                if !key.is_empty() && !value.is_empty() {
                    map.entry(key).or_insert(value);
                }
            }
            (!map.is_empty()).then_some(FieldValue::Mapping(map))
        }
        (FieldKind::Variants, Candidate::Variants(variants)) => {
            (!variants.is_empty()).then_some(FieldValue::Variants(variants))
        }
        _ => None,
    }
}

struct Session<'r, 'c> {
    record: RecordView<'r>,
    visible_text: &'c OnceCell<String>,
    patterns: &'c HashMap<&'c str, Regex>,
}

impl Session<'_, '_> {
    fn visible_text(&self) -> &str {
        self.visible_text.get_or_init(|| match self.record {
            RecordView::Json(value) => json::all_text(value),
            RecordView::Html { body, .. } => strip_html(body),
        })
    }

    fn run(&self, strategy: &Strategy) -> Candidate {
        let empty = Candidate::Texts(Vec::new());
        match (strategy, self.record) {
            (Strategy::JsonPath { path }, RecordView::Json(value)) => {
                Candidate::Texts(json::path_texts(value, path))
            }
            (
                Strategy::JsonVariants {
                    path,
                    name,
                    hex,
                    price,
                    compare_price,
                    available,
                    sku,
                },
                RecordView::Json(value),
            ) => {
                let fields = json::VariantFields {
                    name,
                    hex: hex.as_deref(),
                    price: price.as_deref(),
                    compare_price: compare_price.as_deref(),
                    available: available.as_deref(),
                    sku: sku.as_deref(),
                };
                Candidate::Variants(json::variants(value, path, &fields))
            }
            (Strategy::JsonSpecs { path, key, value: v }, RecordView::Json(value)) => {
                Candidate::Pairs(json::spec_pairs(value, path, key, v))
            }
            (Strategy::JsonLd { path }, RecordView::Html { doc, .. }) => {
                Candidate::Texts(html::json_ld(doc, path))
            }
            (Strategy::Css { selector, attrs }, RecordView::Html { doc, .. }) => {
                Candidate::Texts(html::css(doc, selector, attrs))
            }
            (Strategy::Meta { name }, RecordView::Html { doc, .. }) => {
                Candidate::Texts(html::meta(doc, name))
            }
            (Strategy::Title { separator }, RecordView::Html { doc, .. }) => {
                Candidate::Texts(html::title(doc, separator.as_deref()))
            }
            (Strategy::SpecTable { selector }, RecordView::Html { doc, .. }) => {
                Candidate::Pairs(html::spec_table(doc, selector))
            }
            (Strategy::DefinitionList { selector }, RecordView::Html { doc, .. }) => {
                Candidate::Pairs(html::definition_list(doc, selector))
            }
            (
                Strategy::SpecPairs {
                    container,
                    key,
                    value,
                },
                RecordView::Html { doc, .. },
            ) => Candidate::Pairs(html::spec_pairs(doc, container, key, value)),
            (Strategy::TextPattern { pattern }, _) => {
                let Some(re) = self.patterns.get(pattern.as_str()) else {
                    return empty;
                };
                let found = re
                    .captures_iter(self.visible_text())
                    .filter_map(|caps| caps.get(1).or_else(|| caps.get(0)))
                    .map(|m| m.as_str().to_owned())
                    .collect();
                Candidate::Texts(found)
            }
            _ => empty,
        }
    }
}

/// Check every CSS selector and text pattern a source configures, so typos
/// fail the run up front instead of silently yielding nothing.
///
/// # Errors
///
/// Returns [`ScraperError::InvalidRule`] for the first selector that does not
/// parse or pattern that does not compile.
pub fn check_rules(source: &SourceConfig) -> Result<(), ScraperError> {
    let mut selectors: Vec<&str> = Vec::new();
    for rules in source_rules(source) {
        rule_selectors(rules, &mut selectors);
    }
    if let SourceKind::Html(html) = &source.fetch {
        for listing in &html.listings {
            selectors.push(&listing.link_selector);
            if let Some(card) = &listing.card_selector {
                selectors.push(card);
            }
        }
    }

    for raw in selectors {
        scraper::Selector::parse(raw).map_err(|e| ScraperError::InvalidRule {
            rule: raw.to_owned(),
            reason: e.to_string(),
        })?;
    }
    for rules in source_rules(source) {
        for raw in rules.values().flatten().filter_map(Strategy::pattern) {
            compile_pattern(raw).map_err(|e| ScraperError::InvalidRule {
                rule: raw.to_owned(),
                reason: e.to_string(),
            })?;
        }
    }
    Ok(())
}

/// Detail-page rules followed by each listing's card rules.
fn source_rules(source: &SourceConfig) -> Vec<&FieldRules> {
    let mut all = vec![&source.fields];
    if let SourceKind::Html(html) = &source.fetch {
        all.extend(html.listings.iter().map(|l| &l.card_fields));
    }
    all
}

fn compile_pattern(raw: &str) -> Result<Regex, regex::Error> {
    RegexBuilder::new(raw).case_insensitive(true).build()
}

fn rule_selectors<'s>(rules: &'s FieldRules, out: &mut Vec<&'s str>) {
    for strategy in rules.values().flatten() {
        match strategy {
            Strategy::Css { selector, .. }
            | Strategy::SpecTable { selector }
            | Strategy::DefinitionList { selector } => out.push(selector),
            Strategy::SpecPairs {
                container,
                key,
                value,
            } => out.extend([container.as_str(), key.as_str(), value.as_str()]),
            _ => {}
        }
    }
}

#[cfg(test)]
#[path = "../extract_test.rs"]
mod tests;
