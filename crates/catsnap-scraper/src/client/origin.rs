//! URL origin and join helpers.

/// Extracts the scheme+host origin from a URL.
///
/// Given `"https://shop.example/collections/all"`, returns `"https://shop.example"`.
#[must_use]
pub fn extract_origin(url: &str) -> String {
    reqwest::Url::parse(url).map_or_else(
        |e| {
            tracing::warn!(
                url,
                error = %e,
                "could not parse URL, falling back to string split for origin extraction"
            );
            url.trim_end_matches('/')
                .splitn(4, '/')
                .take(3)
                .collect::<Vec<_>>()
                .join("/")
        },
        |u| u.origin().ascii_serialization(),
    )
}

/// Resolves `href` against `base`. Absolute `http(s)` hrefs are returned
/// as-is; protocol-relative and relative ones are joined.
///
/// Returns `None` for fragments, `mailto:`, `javascript:`, `data:` and
/// anything that does not resolve to an `http(s)` URL.
#[must_use]
pub fn resolve_url(base: &str, href: &str) -> Option<String> {
    let href = href.trim();
    if href.is_empty() || href.starts_with('#') {
        return None;
    }
    let lower = href.to_ascii_lowercase();
    if ["mailto:", "javascript:", "data:", "tel:"]
        .iter()
        .any(|p| lower.starts_with(p))
    {
        return None;
    }

    let joined = match reqwest::Url::parse(href) {
        Ok(absolute) => absolute,
        Err(_) => reqwest::Url::parse(base).ok()?.join(href).ok()?,
    };

    matches!(joined.scheme(), "http" | "https").then(|| joined.to_string())
}
