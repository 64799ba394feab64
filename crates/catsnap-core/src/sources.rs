use std::collections::{BTreeMap, HashSet};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::products::VariantSelection;
use crate::strategy::{Field, RecordScope, Strategy};
use crate::ConfigError;

/// Ordered strategy chains keyed by canonical field.
pub type FieldRules = BTreeMap<Field, Vec<Strategy>>;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    pub name: String,
    /// Scheme and host used to absolutize relative URLs, e.g. `https://example.com`.
    pub origin: String,
    pub fetch: SourceKind,
    pub fields: FieldRules,
    #[serde(default)]
    pub noise: NoiseConfig,
    #[serde(default)]
    pub images: ImageRules,
    /// Overrides `CATSNAP_POLITENESS_DELAY_MS` for this source.
    #[serde(default)]
    pub politeness_delay_ms: Option<u64>,
    /// Stock flag used when neither variants nor the record report availability.
    #[serde(default)]
    pub assume_in_stock: bool,
    /// Prefix for relative product URLs. Defaults to `origin`.
    #[serde(default)]
    pub product_url_prefix: Option<String>,
    /// Variant that supplies the price when the record has none.
    #[serde(default)]
    pub primary_variant: VariantSelection,
}

impl SourceConfig {
    /// Generate a URL-safe slug from the source name.
    #[must_use]
    pub fn slug(&self) -> String {
        slugify(&self.name)
    }

    #[must_use]
    pub fn strategies(&self, field: Field) -> &[Strategy] {
        self.fields.get(&field).map_or(&[], Vec::as_slice)
    }

    fn record_scope(&self) -> RecordScope {
        match self.fetch {
            SourceKind::Json(_) => RecordScope::Json,
            SourceKind::Html(_) => RecordScope::Html,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum SourceKind {
    Json(JsonSource),
    Html(HtmlSource),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonSource {
    pub endpoint: String,
    /// Envelope key holding the record array. Absent means the body is the array.
    #[serde(default)]
    pub collection: Option<String>,
    #[serde(default)]
    pub pagination: Option<PaginationConfig>,
    /// Records whose flag is `false` are skipped.
    #[serde(default)]
    pub inactive_flag: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaginationConfig {
    #[serde(default = "default_page_limit")]
    pub limit: usize,
    #[serde(default = "default_page_param")]
    pub page_param: String,
    #[serde(default = "default_limit_param")]
    pub limit_param: String,
    #[serde(default = "default_first_page")]
    pub first_page: u32,
    #[serde(default = "default_max_pages")]
    pub max_pages: u32,
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            limit: default_page_limit(),
            page_param: default_page_param(),
            limit_param: default_limit_param(),
            first_page: default_first_page(),
            max_pages: default_max_pages(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HtmlSource {
    #[serde(default)]
    pub sitemap: Option<String>,
    /// Category pages, read in order.
    #[serde(default)]
    pub listings: Vec<ListingConfig>,
    #[serde(default)]
    pub extra_urls: Vec<String>,
    #[serde(default)]
    pub urls: UrlFilter,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListingConfig {
    pub url: String,
    #[serde(default = "default_link_selector")]
    pub link_selector: String,
    /// Product cards on the listing page. Card values fill gaps left by the
    /// detail page.
    #[serde(default)]
    pub card_selector: Option<String>,
    #[serde(default)]
    pub card_fields: FieldRules,
    /// Also collect `url`s from a JSON-LD `ItemList` on the page.
    #[serde(default)]
    pub item_list: bool,
}

/// Case-insensitive regex lists applied to discovered detail URLs.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UrlFilter {
    #[serde(default)]
    pub include: Vec<String>,
    #[serde(default)]
    pub exclude: Vec<String>,
}

/// Source-specific additions to the built-in specification noise lists.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NoiseConfig {
    #[serde(default)]
    pub keys: Vec<String>,
    #[serde(default)]
    pub patterns: Vec<String>,
    #[serde(default)]
    pub max_key_len: Option<usize>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ImageRules {
    /// Extra substrings that mark an image URL as non-product.
    #[serde(default)]
    pub blocklist: Vec<String>,
    /// When non-empty, only images on these hosts are kept.
    #[serde(default)]
    pub allow_hosts: Vec<String>,
    #[serde(default)]
    pub rewrites: Vec<UrlRewrite>,
}

/// Literal substring replacement applied to image URLs, e.g. thumbnail to full size.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UrlRewrite {
    pub from: String,
    pub to: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SourcesFile {
    pub sources: Vec<SourceConfig>,
}

impl SourcesFile {
    /// Find a source by name or slug, case-insensitively.
    #[must_use]
    pub fn find(&self, key: &str) -> Option<&SourceConfig> {
        let wanted = slugify(key);
        self.sources
            .iter()
            .find(|s| s.name.eq_ignore_ascii_case(key.trim()) || s.slug() == wanted)
    }
}

/// Lowercase, ASCII-only, dash-separated form of `input`.
#[must_use]
pub fn slugify(input: &str) -> String {
    input
        .to_lowercase()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' {
                c
            } else if c.is_whitespace() {
                '-'
            } else {
                '\0'
            }
        })
        .filter(|&c| c != '\0')
        .collect::<String>()
        .split('-')
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("-")
}

/// Load and validate the sources configuration from a YAML file.
///
/// # Errors
///
/// Returns `ConfigError` if the file cannot be read, parsed, or fails validation.
pub fn load_sources(path: &Path) -> Result<SourcesFile, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::SourcesFileIo {
        path: path.display().to_string(),
        source: e,
    })?;

    let sources_file: SourcesFile =
        serde_yaml::from_str(&content).map_err(ConfigError::SourcesFileParse)?;

    validate_sources(&sources_file)?;

    Ok(sources_file)
}

fn validate_sources(sources_file: &SourcesFile) -> Result<(), ConfigError> {
    let mut seen_names = HashSet::new();
    let mut seen_slugs = HashSet::new();

    for source in &sources_file.sources {
        if source.name.trim().is_empty() {
            return Err(ConfigError::Validation(
                "source name must be non-empty".to_string(),
            ));
        }

        if !seen_names.insert(source.name.to_lowercase()) {
            return Err(ConfigError::Validation(format!(
                "duplicate source name: '{}'",
                source.name
            )));
        }

        let slug = source.slug();
        if slug.is_empty() {
            return Err(ConfigError::Validation(format!(
                "source '{}' has no usable slug characters",
                source.name
            )));
        }
        if !seen_slugs.insert(slug.clone()) {
            return Err(ConfigError::Validation(format!(
                "duplicate source slug: '{}' (from source '{}')",
                slug, source.name
            )));
        }

        validate_source(source)?;
    }

    Ok(())
}

fn validate_source(source: &SourceConfig) -> Result<(), ConfigError> {
    if !is_http_url(&source.origin) {
        return Err(ConfigError::Validation(format!(
            "source '{}' origin must be an absolute http(s) URL, got '{}'",
            source.name, source.origin
        )));
    }

    if source.strategies(Field::Name).is_empty() {
        return Err(ConfigError::Validation(format!(
            "source '{}' has no strategies for field 'name'",
            source.name
        )));
    }

    let scope = source.record_scope();
    validate_rules(&source.name, &source.fields, scope)?;

    match &source.fetch {
        SourceKind::Json(json) => {
            if !is_http_url(&json.endpoint) {
                return Err(ConfigError::Validation(format!(
                    "source '{}' endpoint must be an absolute http(s) URL",
                    source.name
                )));
            }
            if let Some(pagination) = &json.pagination {
                if pagination.limit == 0 || pagination.max_pages == 0 {
                    return Err(ConfigError::Validation(format!(
                        "source '{}' pagination limit and max_pages must be positive",
                        source.name
                    )));
                }
            }
        }
        SourceKind::Html(html) => {
            if html.sitemap.is_none() && html.listings.is_empty() && html.extra_urls.is_empty() {
                return Err(ConfigError::Validation(format!(
                    "source '{}' needs a sitemap, a listing, or extra_urls",
                    source.name
                )));
            }
            for listing in &html.listings {
                if !is_http_url(&listing.url) && !listing.url.starts_with('/') {
                    return Err(ConfigError::Validation(format!(
                        "source '{}' listing url must be absolute or root-relative, got '{}'",
                        source.name, listing.url
                    )));
                }
                validate_rules(&source.name, &listing.card_fields, RecordScope::Html)?;
            }
            for pattern in html.urls.include.iter().chain(&html.urls.exclude) {
                compile_check(&source.name, pattern)?;
            }
        }
    }

    for pattern in &source.noise.patterns {
        compile_check(&source.name, pattern)?;
    }

    Ok(())
}

fn validate_rules(name: &str, rules: &FieldRules, scope: RecordScope) -> Result<(), ConfigError> {
    for (field, chain) in rules {
        for strategy in chain {
            if !strategy.supports(*field) {
                return Err(ConfigError::Validation(format!(
                    "source '{name}': strategy {strategy:?} cannot produce field '{field}'"
                )));
            }
            let strategy_scope = strategy.scope();
            if strategy_scope != RecordScope::Any && strategy_scope != scope {
                return Err(ConfigError::Validation(format!(
                    "source '{name}': strategy {strategy:?} for field '{field}' does not apply to this source kind"
                )));
            }
            if let Some(pattern) = strategy.pattern() {
                compile_check(name, pattern)?;
            }
        }
    }
    Ok(())
}

fn compile_check(name: &str, pattern: &str) -> Result<(), ConfigError> {
    regex::RegexBuilder::new(pattern)
        .case_insensitive(true)
        .build()
        .map(|_| ())
        .map_err(|e| {
            ConfigError::Validation(format!("source '{name}': invalid pattern '{pattern}': {e}"))
        })
}

fn is_http_url(value: &str) -> bool {
    let rest = value
        .strip_prefix("https://")
        .or_else(|| value.strip_prefix("http://"));
    rest.is_some_and(|r| !r.is_empty() && !r.starts_with('/'))
}

fn default_page_limit() -> usize {
    250
}

fn default_page_param() -> String {
    "page".to_string()
}

fn default_limit_param() -> String {
    "limit".to_string()
}

fn default_first_page() -> u32 {
    1
}

fn default_max_pages() -> u32 {
    200
}

fn default_link_selector() -> String {
    "a[href]".to_string()
}
