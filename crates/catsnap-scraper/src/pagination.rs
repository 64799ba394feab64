//! Page-number pagination.
//!
//! The driver asks for page `first_page`, `first_page + 1`, ... and stops on
//! the first page that is empty or shorter than `limit`. A page of exactly
//! `limit` items always triggers one more request: a full last page cannot
//! be told apart from a full middle page, so the following empty page
//! confirms termination.

use std::future::Future;
use std::time::Duration;

use crate::error::ScraperError;

/// Inputs for one paginated walk.
#[derive(Debug, Clone)]
pub struct PageWalk<'a> {
    /// Identifies the endpoint in errors and logs.
    pub url: &'a str,
    pub limit: usize,
    pub first_page: u32,
    pub max_pages: u32,
    /// Pause between consecutive page requests. Not applied before the first.
    pub delay: Duration,
}

/// Records from every page, in fetch order.
#[derive(Debug)]
pub struct Paginated<T> {
    pub items: Vec<T>,
    pub pages: usize,
}

/// Drives `fetch_page` until a terminal page.
///
/// **All-or-nothing**: if any page fails, already-fetched records are
/// discarded and the error is returned. A half-fetched catalog must not be
/// promoted to a snapshot.
///
/// # Errors
///
/// Propagates any error from `fetch_page`. Returns
/// [`ScraperError::PaginationLimit`] when more than `max_pages` pages would
/// be requested.
pub async fn fetch_all_pages<T, F, Fut>(
    walk: &PageWalk<'_>,
    mut fetch_page: F,
) -> Result<Paginated<T>, ScraperError>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<Vec<T>, ScraperError>>,
{
    let mut items: Vec<T> = Vec::new();
    let mut pages = 0usize;
    let mut page = walk.first_page;

    loop {
        if pages >= walk.max_pages as usize {
            return Err(ScraperError::PaginationLimit {
                url: walk.url.to_owned(),
                max_pages: walk.max_pages,
            });
        }

        if pages > 0 && !walk.delay.is_zero() {
            tokio::time::sleep(walk.delay).await;
        }

        let batch = fetch_page(page).await?;
        pages += 1;
        let count = batch.len();
        items.extend(batch);

        tracing::info!(url = walk.url, page, count, total = items.len(), "fetched page");

        if count == 0 || count < walk.limit {
            break;
        }
        page += 1;
    }

    Ok(Paginated { items, pages })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    fn walk(limit: usize, max_pages: u32) -> PageWalk<'static> {
        PageWalk {
            url: "https://shop.example/products.json",
            limit,
            first_page: 1,
            max_pages,
            delay: Duration::ZERO,
        }
    }

    /// A source with `sizes[i]` records on page `i + 1` and nothing after.
    fn source(
        sizes: Vec<usize>,
        calls: Arc<AtomicU32>,
    ) -> impl FnMut(u32) -> std::future::Ready<Result<Vec<u32>, ScraperError>> {
        move |page| {
            calls.fetch_add(1, Ordering::SeqCst);
            let idx = (page - 1) as usize;
            let n = sizes.get(idx).copied().unwrap_or(0);
            std::future::ready(Ok((0..n).map(|i| page * 1000 + i as u32).collect()))
        }
    }

    #[tokio::test]
    async fn stops_on_short_page() {
        let calls = Arc::new(AtomicU32::new(0));
        let result = fetch_all_pages(&walk(3, 200), source(vec![3, 3, 2], Arc::clone(&calls)))
            .await
            .unwrap();
        assert_eq!(result.items.len(), 8);
        assert_eq!(result.pages, 3);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn exact_limit_last_page_costs_one_extra_fetch() {
        let calls = Arc::new(AtomicU32::new(0));
        let result = fetch_all_pages(&walk(3, 200), source(vec![3, 3], Arc::clone(&calls)))
            .await
            .unwrap();
        assert_eq!(result.items.len(), 6);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn empty_first_page_yields_nothing() {
        let calls = Arc::new(AtomicU32::new(0));
        let result = fetch_all_pages(&walk(3, 200), source(vec![], Arc::clone(&calls)))
            .await
            .unwrap();
        assert!(result.items.is_empty());
        assert_eq!(result.pages, 1);
    }

    #[tokio::test]
    async fn preserves_fetch_order() {
        let calls = Arc::new(AtomicU32::new(0));
        let result = fetch_all_pages(&walk(2, 200), source(vec![2, 1], calls))
            .await
            .unwrap();
        assert_eq!(result.items, vec![1000, 1001, 2000]);
    }

    #[tokio::test]
    async fn page_cap_is_an_error() {
        let calls = Arc::new(AtomicU32::new(0));
        let result =
            fetch_all_pages(&walk(1, 2), source(vec![1, 1, 1, 1], Arc::clone(&calls))).await;
        assert!(matches!(
            result,
            Err(ScraperError::PaginationLimit { max_pages: 2, .. })
        ));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn page_error_discards_partial_results() {
        let result = fetch_all_pages(&walk(1, 200), |page| {
            std::future::ready(if page < 3 {
                Ok(vec![page])
            } else {
                Err(ScraperError::FetchExhausted {
                    url: "https://shop.example/products.json?page=3".to_owned(),
                    attempts: 3,
                    source: Box::new(ScraperError::UnexpectedStatus {
                        status: 502,
                        url: "https://shop.example/products.json?page=3".to_owned(),
                    }),
                })
            })
        })
        .await;
        assert!(matches!(result, Err(ScraperError::FetchExhausted { .. })));
    }

    #[tokio::test]
    async fn first_page_is_configurable() {
        let mut seen = Vec::new();
        let mut w = walk(5, 200);
        w.first_page = 0;
        let result = fetch_all_pages(&w, |page| {
            seen.push(page);
            std::future::ready(Ok::<Vec<u32>, ScraperError>(vec![]))
        })
        .await
        .unwrap();
        assert_eq!(result.pages, 1);
        assert_eq!(seen, vec![0]);
    }
}
