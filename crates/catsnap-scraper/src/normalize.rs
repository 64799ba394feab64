//! Normalization from an [`ExtractionResult`] to a [`CanonicalProduct`], and
//! per-run deduplication.

use std::collections::{BTreeMap, HashSet};

use catsnap_core::{slugify, CanonicalProduct, Field, SourceConfig, VariantDescriptor};

use crate::client::resolve_url;
use crate::error::ScraperError;
use crate::extract::{collapse_whitespace, ExtractionResult};

/// Storefront placeholder name for the only variant of a variant-less product.
const PLACEHOLDER_VARIANT: &str = "Default Title";

/// Maps one record's extracted fields onto a [`CanonicalProduct`].
///
/// `specifications` is the record's mapping after noise filtering.
/// `page_url` is the detail page an HTML record came from; it is the
/// fallback `source_url`.
///
/// # Errors
///
/// Returns [`ScraperError::Normalization`] if the record has no name, or no
/// identity key can be derived.
pub fn normalize_record(
    source: &SourceConfig,
    result: &ExtractionResult,
    specifications: BTreeMap<String, String>,
    page_url: Option<&str>,
) -> Result<CanonicalProduct, ScraperError> {
    let name = result
        .text(Field::Name)
        .map(collapse_whitespace)
        .filter(|n| !n.is_empty())
        .ok_or_else(|| ScraperError::Normalization {
            record: page_url.unwrap_or("<unnamed>").to_owned(),
            reason: "no name".into(),
        })?;

    let variants = record_variants(result);
    let primary = source.primary_variant.pick(&variants);

    let (price, compare_candidate) = match result.number(Field::Price) {
        Some(price) => (Some(price), result.number(Field::ComparePrice)),
        None => (
            primary.and_then(|v| v.price),
            result
                .number(Field::ComparePrice)
                .or_else(|| primary.and_then(|v| v.compare_price)),
        ),
    };
    let compare_price = match (price, compare_candidate) {
        (Some(p), Some(c)) if c > p => Some(c),
        _ => None,
    };

    let source_url = result
        .text(Field::SourceUrl)
        .and_then(|raw| absolute_product_url(source, raw))
        .or_else(|| page_url.map(str::to_owned));

    let id = identity_key(result, &variants, &name, source_url.as_deref()).ok_or_else(|| {
        ScraperError::Normalization {
            record: name.clone(),
            reason: "no identity key".into(),
        }
    })?;

    Ok(CanonicalProduct {
        id,
        in_stock: availability(source, result, &variants),
        name,
        price,
        compare_price,
        images: result.list(Field::Images).to_vec(),
        specifications,
        variants: variants
            .into_iter()
            .filter(|v| !v.name.is_empty() && !v.name.eq_ignore_ascii_case(PLACEHOLDER_VARIANT))
            .collect(),
        description: result.text(Field::Description).map(str::to_owned),
        source_url,
        highlights: result.list(Field::Highlights).to_vec(),
        tags: result.list(Field::Tags).to_vec(),
    })
}

/// Structured variants, else colours as name-only variants.
fn record_variants(result: &ExtractionResult) -> Vec<VariantDescriptor> {
    let variants = result.variants();
    if variants.is_empty() {
        result
            .list(Field::Colors)
            .iter()
            .map(VariantDescriptor::named)
            .collect()
    } else {
        variants.to_vec()
    }
}

/// Any variant with stock data decides; otherwise the record's own flag,
/// otherwise the source default.
fn availability(
    source: &SourceConfig,
    result: &ExtractionResult,
    variants: &[VariantDescriptor],
) -> bool {
    let reported: Vec<bool> = variants.iter().filter_map(|v| v.in_stock).collect();
    if reported.is_empty() {
        result
            .flag(Field::InStock)
            .unwrap_or(source.assume_in_stock)
    } else {
        reported.contains(&true)
    }
}

/// Explicit id, else the first variant SKU, else the name slug, else the URL.
///
/// Derived keys carry their tier as a prefix: `sku:`, `name:` or `url:`.
fn identity_key(
    result: &ExtractionResult,
    variants: &[VariantDescriptor],
    name: &str,
    source_url: Option<&str>,
) -> Option<String> {
    result
        .text(Field::Id)
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(str::to_owned)
        .or_else(|| {
            variants
                .iter()
                .filter_map(|v| v.sku.as_deref())
                .map(str::trim)
                .find(|sku| !sku.is_empty())
                .map(|sku| format!("sku:{sku}"))
        })
        .or_else(|| {
            Some(slugify(name))
                .filter(|slug| !slug.is_empty())
                .map(|slug| format!("name:{slug}"))
        })
        .or_else(|| source_url.map(|url| format!("url:{url}")))
}

fn absolute_product_url(source: &SourceConfig, raw: &str) -> Option<String> {
    let raw = raw.trim();
    if raw.starts_with("http://") || raw.starts_with("https://") {
        return Some(raw.to_owned());
    }
    match &source.product_url_prefix {
        Some(prefix) if !raw.starts_with("//") => Some(format!(
            "{}/{}",
            prefix.trim_end_matches('/'),
            raw.trim_start_matches('/')
        )),
        _ => resolve_url(&source.origin, raw),
    }
}

/// First-seen-wins filter over product ids.
#[derive(Debug, Default)]
pub struct Deduplicator {
    seen: HashSet<String>,
    dropped: usize,
}

impl Deduplicator {
    /// Returns `true` if `product` is the first with its id. Later ones are counted.
    pub fn admit(&mut self, product: &CanonicalProduct) -> bool {
        if self.seen.insert(product.id.clone()) {
            true
        } else {
            self.dropped += 1;
            tracing::debug!(id = %product.id, name = %product.name, "duplicate product dropped");
            false
        }
    }

    #[must_use]
    pub fn dropped(&self) -> usize {
        self.dropped
    }
}

#[cfg(test)]
#[path = "normalize_test.rs"]
mod tests;
