//! Extraction strategy descriptors.
//!
//! A source's `fields` table maps each canonical [`Field`] to an ordered list
//! of [`Strategy`] values. The extraction engine in `catsnap-scraper` walks
//! that list in order; nothing here knows how to evaluate a strategy, only
//! what it needs and what shape of value it yields.

use serde::{Deserialize, Serialize};

/// A canonical product attribute that can be extracted from a raw record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    Id,
    Name,
    Price,
    ComparePrice,
    InStock,
    Description,
    Images,
    Colors,
    Specifications,
    Variants,
    SourceUrl,
    Highlights,
    Tags,
}

/// The value shape a [`Field`] resolves to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    Number,
    Flag,
    List,
    Mapping,
    Variants,
}

impl Field {
    pub const ALL: [Field; 13] = [
        Field::Id,
        Field::Name,
        Field::Price,
        Field::ComparePrice,
        Field::InStock,
        Field::Description,
        Field::Images,
        Field::Colors,
        Field::Specifications,
        Field::Variants,
        Field::SourceUrl,
        Field::Highlights,
        Field::Tags,
    ];

    #[must_use]
    pub fn kind(self) -> FieldKind {
        match self {
            Field::Id | Field::Name | Field::Description | Field::SourceUrl => FieldKind::Text,
            Field::Price | Field::ComparePrice => FieldKind::Number,
            Field::InStock => FieldKind::Flag,
            Field::Images | Field::Colors | Field::Highlights | Field::Tags => FieldKind::List,
            Field::Specifications => FieldKind::Mapping,
            Field::Variants => FieldKind::Variants,
        }
    }

    /// List fields collect candidates from every strategy instead of
    /// stopping at the first one that yields something.
    #[must_use]
    pub fn merges_candidates(self) -> bool {
        self.kind() == FieldKind::List
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Field::Id => "id",
            Field::Name => "name",
            Field::Price => "price",
            Field::ComparePrice => "compare_price",
            Field::InStock => "in_stock",
            Field::Description => "description",
            Field::Images => "images",
            Field::Colors => "colors",
            Field::Specifications => "specifications",
            Field::Variants => "variants",
            Field::SourceUrl => "source_url",
            Field::Highlights => "highlights",
            Field::Tags => "tags",
        }
    }
}

impl std::fmt::Display for Field {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One extraction attempt, described as data.
///
/// JSON paths are dot-separated: `title`, `variants.0.price`, `images.*.src`.
/// A `*` segment fans out over every array element (or object value).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Strategy {
    /// Scalar values at a path inside a JSON record.
    JsonPath { path: String },

    /// An array of variant objects inside a JSON record.
    JsonVariants {
        path: String,
        /// Candidate name fields, first non-empty wins.
        #[serde(default)]
        name: Vec<String>,
        #[serde(default)]
        hex: Option<String>,
        #[serde(default)]
        price: Option<String>,
        #[serde(default)]
        compare_price: Option<String>,
        #[serde(default)]
        available: Option<String>,
        #[serde(default)]
        sku: Option<String>,
    },

    /// Key/value pairs from an array of `{key, value}` objects, or from a
    /// plain JSON object of strings.
    JsonSpecs {
        path: String,
        #[serde(default = "default_spec_key")]
        key: String,
        #[serde(default = "default_spec_value")]
        value: String,
    },

    /// A path inside the first embedded `application/ld+json` node whose
    /// `@type` is `Product`.
    JsonLd { path: String },

    /// Elements matched by a CSS selector. The first attribute present wins;
    /// with no attributes (or none present) the element text is used.
    Css {
        selector: String,
        #[serde(default)]
        attrs: Vec<String>,
    },

    /// `<meta name=..>` or `<meta property=..>` content.
    Meta { name: String },

    /// The document `<title>`, optionally cut at the first separator.
    Title {
        #[serde(default)]
        separator: Option<String>,
    },

    /// Two-cell rows of tables matched by `selector`.
    SpecTable {
        #[serde(default = "default_table_selector")]
        selector: String,
    },

    /// `<dt>`/`<dd>` pairs of definition lists matched by `selector`.
    DefinitionList {
        #[serde(default = "default_dl_selector")]
        selector: String,
    },

    /// Sibling key/value elements inside a container, zipped in document order.
    SpecPairs {
        container: String,
        key: String,
        value: String,
    },

    /// A regular expression over the record's visible text. Capture group 1
    /// is used when present, otherwise the whole match.
    TextPattern { pattern: String },
}

/// The shape of value a strategy yields before field-specific coercion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrategyOutput {
    Texts,
    Pairs,
    Variants,
}

/// Which kind of raw record a strategy can run against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordScope {
    Json,
    Html,
    Any,
}

impl Strategy {
    #[must_use]
    pub fn output(&self) -> StrategyOutput {
        match self {
            Strategy::JsonVariants { .. } => StrategyOutput::Variants,
            Strategy::JsonSpecs { .. }
            | Strategy::SpecTable { .. }
            | Strategy::DefinitionList { .. }
            | Strategy::SpecPairs { .. } => StrategyOutput::Pairs,
            Strategy::JsonPath { .. }
            | Strategy::JsonLd { .. }
            | Strategy::Css { .. }
            | Strategy::Meta { .. }
            | Strategy::Title { .. }
            | Strategy::TextPattern { .. } => StrategyOutput::Texts,
        }
    }

    #[must_use]
    pub fn scope(&self) -> RecordScope {
        match self {
            Strategy::JsonPath { .. } | Strategy::JsonVariants { .. } | Strategy::JsonSpecs { .. } => {
                RecordScope::Json
            }
            Strategy::JsonLd { .. }
            | Strategy::Css { .. }
            | Strategy::Meta { .. }
            | Strategy::Title { .. }
            | Strategy::SpecTable { .. }
            | Strategy::DefinitionList { .. }
            | Strategy::SpecPairs { .. } => RecordScope::Html,
            Strategy::TextPattern { .. } => RecordScope::Any,
        }
    }

    /// Whether this strategy's output can be coerced into `field`.
    #[must_use]
    pub fn supports(&self, field: Field) -> bool {
        match (self.output(), field.kind()) {
            (StrategyOutput::Texts, kind) => matches!(
                kind,
                FieldKind::Text | FieldKind::Number | FieldKind::Flag | FieldKind::List
            ),
            (StrategyOutput::Pairs, kind) => kind == FieldKind::Mapping,
            (StrategyOutput::Variants, kind) => kind == FieldKind::Variants,
        }
    }

    /// Regex patterns embedded in the descriptor, for load-time validation.
    #[must_use]
    pub fn pattern(&self) -> Option<&str> {
        match self {
            Strategy::TextPattern { pattern } => Some(pattern),
            _ => None,
        }
    }
}

fn default_spec_key() -> String {
    "name".to_string()
}

fn default_spec_value() -> String {
    "value".to_string()
}

fn default_table_selector() -> String {
    "table".to_string()
}

fn default_dl_selector() -> String {
    "dl".to_string()
}
