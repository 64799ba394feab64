use std::time::Duration;

use catsnap_core::{JsonSource, PaginationConfig, RunStats};
use serde_json::Value;

use crate::client::Fetcher;
use crate::error::ScraperError;
use crate::pagination::{fetch_all_pages, PageWalk};

pub(crate) async fn fetch_records(
    fetcher: &Fetcher,
    source: &JsonSource,
    delay: Duration,
    stats: &mut RunStats,
) -> Result<Vec<Value>, ScraperError> {
    let collection = source.collection.as_deref();

    let records = match &source.pagination {
        Some(pagination) => {
            let walk = PageWalk {
                url: &source.endpoint,
                limit: pagination.limit,
                first_page: pagination.first_page,
                max_pages: pagination.max_pages,
                delay,
            };
            let fetched = fetch_all_pages(&walk, |page| {
                let url = page_url(&source.endpoint, pagination, page);
                async move { fetcher.fetch_collection(&url?, collection).await }
            })
            .await?;
            stats.pages_fetched += fetched.pages;
            fetched.items
        }
        None => {
            let items = fetcher
                .fetch_collection(&source.endpoint, collection)
                .await?;
            stats.pages_fetched += 1;
            tracing::info!(url = %source.endpoint, count = items.len(), "fetched records");
            items
        }
    };

    let Some(flag) = &source.inactive_flag else {
        return Ok(records);
    };
    let before = records.len();
    let active: Vec<Value> = records
        .into_iter()
        .filter(|record| is_active(record, flag))
        .collect();
    let skipped = before - active.len();
    if skipped > 0 {
        tracing::info!(flag = %flag, skipped, "skipped inactive records");
    }
    stats.inactive_skipped += skipped;
    Ok(active)
}

/// `endpoint` with the page and page-size query parameters appended.
pub(crate) fn page_url(
    endpoint: &str,
    pagination: &PaginationConfig,
    page: u32,
) -> Result<String, ScraperError> {
    let mut url = reqwest::Url::parse(endpoint).map_err(|e| ScraperError::InvalidUrl {
        url: endpoint.to_owned(),
        reason: e.to_string(),
    })?;
    url.query_pairs_mut()
        .append_pair(&pagination.limit_param, &pagination.limit.to_string())
        .append_pair(&pagination.page_param, &page.to_string());
    Ok(url.to_string())
}

/// Only an explicit `false` marks a record inactive.
fn is_active(record: &Value, flag: &str) -> bool {
    match record.get(flag) {
        Some(Value::Bool(active)) => *active,
        Some(Value::String(s)) => !s.trim().eq_ignore_ascii_case("false"),
        _ => true,
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn page_url_appends_limit_and_page() {
        let pagination = PaginationConfig::default();
        assert_eq!(
            page_url("https://aoki.example/products.json", &pagination, 3).unwrap(),
            "https://aoki.example/products.json?limit=250&page=3"
        );
    }

    #[test]
    fn page_url_keeps_existing_query() {
        let pagination = PaginationConfig {
            limit: 50,
            page_param: "p".to_owned(),
            limit_param: "per_page".to_owned(),
            ..PaginationConfig::default()
        };
        assert_eq!(
            page_url("https://api.example/v1/bikes?lang=en", &pagination, 1).unwrap(),
            "https://api.example/v1/bikes?lang=en&per_page=50&p=1"
        );
    }

    #[test]
    fn page_url_rejects_relative_endpoint() {
        let err = page_url("/products.json", &PaginationConfig::default(), 1).unwrap_err();
        assert!(matches!(err, ScraperError::InvalidUrl { .. }));
    }

    #[test]
    fn only_explicit_false_is_inactive() {
        assert!(!is_active(&json!({"active": false}), "active"));
        assert!(!is_active(&json!({"active": "False"}), "active"));
        assert!(is_active(&json!({"active": true}), "active"));
        assert!(is_active(&json!({"name": "Zeeta"}), "active"));
        assert!(is_active(&json!({"active": null}), "active"));
    }
}
