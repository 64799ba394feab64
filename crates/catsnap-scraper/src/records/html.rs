//! HTML storefronts: detail URL discovery and detail page fetching.

use std::collections::{HashMap, HashSet};

use catsnap_core::{HtmlSource, ListingConfig, RunStats, SourceConfig, UrlFilter};
use percent_encoding::percent_decode_str;
use regex::{Regex, RegexBuilder};
use scraper::{ElementRef, Html, Selector};

use super::sitemap::parse_sitemap;
use super::{HtmlPage, Pacer};
use crate::client::{resolve_url, FetchedBody, Fetcher};
use crate::error::ScraperError;
use crate::extract::{item_list_urls, ExtractionResult, Extractor, RecordView};

/// Detail URLs to fetch, in discovery order, and listing card data by URL.
#[derive(Debug, Default)]
pub(crate) struct Discovered {
    pub urls: Vec<String>,
    pub cards: HashMap<String, ExtractionResult>,
}

/// Gathers detail URLs from the sitemap, then each listing page, then
/// `extra_urls`, and filters them.
///
/// A listing page that is permanently unavailable is skipped; the other
/// listings still contribute.
pub(crate) async fn discover(
    fetcher: &Fetcher,
    source: &SourceConfig,
    html: &HtmlSource,
    pacer: &mut Pacer,
    stats: &mut RunStats,
) -> Result<Discovered, ScraperError> {
    let mut found: Vec<String> = Vec::new();
    let mut cards = HashMap::new();

    if let Some(sitemap_url) = &html.sitemap {
        pacer.wait().await;
        let sitemap = fetcher.fetch_text(sitemap_url).await?;
        stats.pages_fetched += 1;
        let locs = parse_sitemap(&sitemap.body);
        tracing::info!(url = %sitemap_url, count = locs.len(), "read sitemap");
        found.extend(locs.iter().filter_map(|loc| resolve_url(&sitemap.url, loc)));
    }

    for listing in &html.listings {
        let Some(listing_url) = resolve_url(&source.origin, &listing.url) else {
            tracing::warn!(url = %listing.url, "unusable listing url, skipping");
            continue;
        };
        pacer.wait().await;
        let page = match fetcher.fetch_text(&listing_url).await {
            Ok(page) => page,
            Err(err) if err.is_permanent_fetch_failure() => {
                tracing::warn!(url = %listing_url, error = %err, "listing page unavailable, skipping");
                continue;
            }
            Err(err) => return Err(err),
        };
        stats.pages_fetched += 1;
        let (links, listing_cards) = read_listing(source, listing, &page)?;
        tracing::info!(
            url = %listing_url,
            links = links.len(),
            cards = listing_cards.len(),
            "read listing page"
        );
        found.extend(links);
        for (url, card) in listing_cards {
            cards.entry(url).or_insert(card);
        }
    }

    found.extend(
        html.extra_urls
            .iter()
            .filter_map(|u| resolve_url(&source.origin, u)),
    );

    let urls = filter_urls(found, &html.urls)?;
    cards.retain(|url, _| urls.contains(url));
    Ok(Discovered { urls, cards })
}

/// Links (and card extractions) from one listing page. With `item_list`
/// set, URLs from the page's JSON-LD `ItemList` follow the anchor links.
fn read_listing(
    source: &SourceConfig,
    listing: &ListingConfig,
    page: &FetchedBody,
) -> Result<(Vec<String>, Vec<(String, ExtractionResult)>), ScraperError> {
    let link_selector = parse_selector(&listing.link_selector)?;
    let doc = Html::parse_document(&page.body);
    let base = page.url.as_str();
    let listed = || -> Vec<String> {
        if !listing.item_list {
            return Vec::new();
        }
        item_list_urls(&doc)
            .iter()
            .filter_map(|u| resolve_url(base, u))
            .collect()
    };

    let Some(card_raw) = &listing.card_selector else {
        let mut links: Vec<String> = doc
            .select(&link_selector)
            .filter_map(|a| link_url(&a, base))
            .collect();
        links.extend(listed());
        return Ok((links, Vec::new()));
    };

    let card_selector = parse_selector(card_raw)?;
    let extractor = Extractor::new(source);
    let mut links = Vec::new();
    let mut cards = Vec::new();

    for card in doc.select(&card_selector) {
        let own = link_selector.matches(&card).then_some(card);
        let Some(url) = own
            .into_iter()
            .chain(card.select(&link_selector))
            .find_map(|a| link_url(&a, base))
        else {
            continue;
        };

        if !listing.card_fields.is_empty() {
            let card_html = card.html();
            let fragment = Html::parse_fragment(&card_html);
            let view = RecordView::Html {
                doc: &fragment,
                body: &card_html,
                url: &url,
            };
            let result = extractor.extract(view, &listing.card_fields);
            if !result.is_empty() {
                cards.push((url.clone(), result));
            }
        }
        links.push(url);
    }
    links.extend(listed());

    Ok((links, cards))
}

fn link_url(element: &ElementRef<'_>, base: &str) -> Option<String> {
    element
        .value()
        .attr("href")
        .and_then(|href| resolve_url(base, href))
}

fn parse_selector(raw: &str) -> Result<Selector, ScraperError> {
    Selector::parse(raw).map_err(|e| ScraperError::InvalidRule {
        rule: raw.to_owned(),
        reason: e.to_string(),
    })
}

/// Applies include/exclude patterns to the percent-decoded URL and drops
/// repeats, keeping first-seen order. With no include patterns every URL
/// not excluded is kept.
///
/// # Errors
///
/// Returns [`ScraperError::InvalidRule`] if a pattern does not compile.
pub fn filter_urls(urls: Vec<String>, filter: &UrlFilter) -> Result<Vec<String>, ScraperError> {
    let include = compile_all(&filter.include)?;
    let exclude = compile_all(&filter.exclude)?;

    let mut seen = HashSet::new();
    let mut kept = Vec::new();
    for url in urls {
        let decoded = percent_decode_str(&url).decode_utf8_lossy().into_owned();
        let included = include.is_empty() || include.iter().any(|re| re.is_match(&decoded));
        let excluded = exclude.iter().any(|re| re.is_match(&decoded));
        if included && !excluded && seen.insert(decoded) {
            kept.push(url);
        }
    }
    Ok(kept)
}

fn compile_all(patterns: &[String]) -> Result<Vec<Regex>, ScraperError> {
    patterns
        .iter()
        .map(|p| {
            RegexBuilder::new(p)
                .case_insensitive(true)
                .build()
                .map_err(|e| ScraperError::InvalidRule {
                    rule: p.clone(),
                    reason: e.to_string(),
                })
        })
        .collect()
}

/// Fetches every discovered detail page, pausing between requests.
///
/// A page that is permanently gone (404, other 4xx) is skipped and counted,
/// unless its listing card can stand in for it.
pub(crate) async fn fetch_details(
    fetcher: &Fetcher,
    discovered: Discovered,
    pacer: &mut Pacer,
    stats: &mut RunStats,
) -> Result<Vec<HtmlPage>, ScraperError> {
    let Discovered { urls, mut cards } = discovered;
    let total = urls.len();
    let mut pages = Vec::with_capacity(total);

    for (index, url) in urls.into_iter().enumerate() {
        pacer.wait().await;
        let card = cards.remove(&url);

        match fetcher.fetch_text(&url).await {
            Ok(fetched) => {
                stats.pages_fetched += 1;
                tracing::info!(
                    url = %url,
                    page = index + 1,
                    total,
                    bytes = fetched.content_length.unwrap_or(fetched.body.len() as u64),
                    "fetched product page"
                );
                pages.push(HtmlPage {
                    url,
                    body: Some(fetched.body),
                    card,
                });
            }
            Err(err) if err.is_permanent_fetch_failure() => {
                if card.is_some() {
                    tracing::warn!(url = %url, error = %err, "product page unavailable, using listing card");
                    pages.push(HtmlPage {
                        url,
                        body: None,
                        card,
                    });
                } else {
                    tracing::warn!(url = %url, error = %err, "product page unavailable, skipping");
                    stats.records_skipped += 1;
                }
            }
            Err(err) => return Err(err),
        }
    }

    Ok(pages)
}
