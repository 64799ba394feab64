use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Which variant supplies the product-level price when the record itself
/// carries none. Chosen per source with `primary_variant`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VariantSelection {
    /// The first priced variant in source order (the storefront default).
    First,
    /// The lowest-priced variant.
    Cheapest,
}

/// Selection used by sources that do not name one.
pub const PRIMARY_VARIANT_SELECTION: VariantSelection = VariantSelection::First;

impl Default for VariantSelection {
    fn default() -> Self {
        PRIMARY_VARIANT_SELECTION
    }
}

impl VariantSelection {
    /// Pick the primary variant among those with a price.
    #[must_use]
    pub fn pick(self, variants: &[VariantDescriptor]) -> Option<&VariantDescriptor> {
        let mut priced = variants.iter().filter(|v| v.price.is_some());
        match self {
            VariantSelection::First => priced.next(),
            VariantSelection::Cheapest => priced.min_by_key(|v| v.price),
        }
    }
}

/// One purchasable variation of a product: a colour, frame size, or trim.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VariantDescriptor {
    pub name: String,
    /// Colour swatch, e.g. `"#1a1a1a"`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hex: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sku: Option<String>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "rust_decimal::serde::float_option"
    )]
    pub price: Option<Decimal>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "rust_decimal::serde::float_option"
    )]
    pub compare_price: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub in_stock: Option<bool>,
}

impl VariantDescriptor {
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }
}

/// The source-independent product shape every snapshot carries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalProduct {
    /// Identity key, unique within one snapshot.
    pub id: String,
    pub name: String,
    /// Absent when the source gave no positive, parseable price. Never zero.
    #[serde(default, with = "rust_decimal::serde::float_option")]
    pub price: Option<Decimal>,
    /// Pre-discount price. Absent unless strictly greater than `price`.
    #[serde(default, with = "rust_decimal::serde::float_option")]
    pub compare_price: Option<Decimal>,
    pub in_stock: bool,
    /// Absolute URLs, primary image first, no duplicates.
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub specifications: BTreeMap<String, String>,
    #[serde(default)]
    pub variants: Vec<VariantDescriptor>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub source_url: Option<String>,
    /// Feature bullet points, in page order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub highlights: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
}

impl CanonicalProduct {
    /// Discount relative to `compare_price`, if both prices are known.
    #[must_use]
    pub fn discount(&self) -> Option<Decimal> {
        match (self.price, self.compare_price) {
            (Some(price), Some(compare)) if compare > price => Some(compare - price),
            _ => None,
        }
    }
}

/// One run's output for one source. Written once, superseded by the next run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub fetched_at: DateTime<Utc>,
    pub source: String,
    pub count: usize,
    pub products: Vec<CanonicalProduct>,
}

impl Snapshot {
    #[must_use]
    pub fn new(source: impl Into<String>, products: Vec<CanonicalProduct>) -> Self {
        Self {
            fetched_at: Utc::now(),
            source: source.into(),
            count: products.len(),
            products,
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }

    #[must_use]
    pub fn in_stock_count(&self) -> usize {
        self.products.iter().filter(|p| p.in_stock).count()
    }
}
