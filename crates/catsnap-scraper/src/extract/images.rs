//! Image URL normalization and classification.

use catsnap_core::{ImageRules, UrlRewrite};

use crate::client::resolve_url;

/// URL fragments that mark site chrome rather than product photos.
const DEFAULT_BLOCKLIST: &[&str] = &[
    "logo",
    "icon",
    "favicon",
    "banner",
    "arrow",
    "close",
    "spinner",
    "loading",
    "placeholder",
    "pixel",
    "tracking",
    "social",
    "facebook",
    "twitter",
    "instagram",
    "youtube",
    "payment",
    "visa",
    "mastercard",
    "upi",
];

const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "webp", "gif", "avif"];

/// Turns raw `src`-like values into absolute product image URLs.
#[derive(Debug, Clone)]
pub struct ImageFilter {
    origin: String,
    scheme: String,
    blocklist: Vec<String>,
    allow_hosts: Vec<String>,
    rewrites: Vec<UrlRewrite>,
}

impl ImageFilter {
    #[must_use]
    pub fn new(origin: &str, rules: &ImageRules) -> Self {
        let origin = origin.trim_end_matches('/').to_owned();
        let scheme = origin
            .split_once("://")
            .map_or("https", |(scheme, _)| scheme)
            .to_owned();
        let blocklist = DEFAULT_BLOCKLIST
            .iter()
            .map(|s| (*s).to_owned())
            .chain(rules.blocklist.iter().map(|s| s.to_lowercase()))
            .collect();
        Self {
            origin,
            scheme,
            blocklist,
            allow_hosts: rules.allow_hosts.iter().map(|h| h.to_lowercase()).collect(),
            rewrites: rules.rewrites.clone(),
        }
    }

    /// Absolute, rewritten URL for `raw`, or `None` when it is not a product image.
    ///
    /// `base` resolves path-relative values (usually the page URL).
    #[must_use]
    pub fn normalize(&self, raw: &str, base: &str) -> Option<String> {
        let raw = raw.trim();
        if raw.is_empty() || raw.to_ascii_lowercase().starts_with("data:") {
            return None;
        }

        let absolute = if raw.starts_with("//") {
            format!("{}:{raw}", self.scheme)
        } else if raw.starts_with('/') {
            format!("{}{raw}", self.origin)
        } else if raw.starts_with("http://") || raw.starts_with("https://") {
            raw.to_owned()
        } else {
            resolve_url(base, raw)?
        };

        let rewritten = self
            .rewrites
            .iter()
            .fold(absolute, |url, rw| url.replace(&rw.from, &rw.to));

        let url = reqwest::Url::parse(&rewritten).ok()?;
        if !matches!(url.scheme(), "http" | "https") {
            return None;
        }

        let host = url.host_str().unwrap_or_default().to_lowercase();
        if !self.allow_hosts.is_empty()
            && !self
                .allow_hosts
                .iter()
                .any(|h| host == *h || host.ends_with(&format!(".{h}")))
        {
            return None;
        }

        let path = url.path().to_lowercase();
        if !has_image_shape(&path, url.as_str()) {
            return None;
        }
        let target = match url.query() {
            Some(q) => format!("{path}?{}", q.to_lowercase()),
            None => path,
        };
        if self.blocklist.iter().any(|b| target.contains(b.as_str())) {
            return None;
        }

        Some(url.to_string())
    }
}

/// Image extension on the path, or an extensionless dynamic image endpoint.
fn has_image_shape(path: &str, full: &str) -> bool {
    let file = path.rsplit('/').next().unwrap_or_default();
    match file.rsplit_once('.') {
        Some((_, ext)) => IMAGE_EXTENSIONS.contains(&ext),
        None => {
            let lower = full.to_lowercase();
            lower.contains("image") || lower.contains("/img")
        }
    }
}

/// Split a `srcset` value into its candidate URLs.
#[must_use]
pub fn split_srcset(srcset: &str) -> Vec<String> {
    srcset
        .split(',')
        .filter_map(|entry| entry.split_whitespace().next())
        .map(str::to_owned)
        .collect()
}
