//! Raw record collection: JSON endpoints and HTML storefronts.
//!
//! Records are fetched strictly one request at a time. Everything collected
//! here belongs to one run and is consumed once by extraction.

mod html;
mod json;
mod sitemap;

use std::time::Duration;

use catsnap_core::{RunContext, SourceKind};
use serde_json::Value;

use crate::client::Fetcher;
use crate::error::ScraperError;
use crate::extract::ExtractionResult;

pub use html::filter_urls;

/// One unprocessed item from a source.
#[derive(Debug)]
pub enum RawRecord {
    Json(Value),
    Html(HtmlPage),
}

/// A product detail page, plus whatever its listing card already told us.
#[derive(Debug)]
pub struct HtmlPage {
    pub url: String,
    /// `None` when the detail page was gone but the listing card was usable.
    pub body: Option<String>,
    pub card: Option<ExtractionResult>,
}

/// Collects every raw record for `ctx.source`.
///
/// # Errors
///
/// Any fetch failure that is not a permanently missing detail page aborts
/// the collection; partial results are discarded.
pub async fn collect_records(
    fetcher: &Fetcher,
    ctx: &mut RunContext,
) -> Result<Vec<RawRecord>, ScraperError> {
    let records: Vec<RawRecord> = match &ctx.source.fetch {
        SourceKind::Json(source) => {
            json::fetch_records(fetcher, source, ctx.politeness_delay, &mut ctx.stats)
                .await?
                .into_iter()
                .map(RawRecord::Json)
                .collect()
        }
        SourceKind::Html(source) => {
            let mut pacer = Pacer::new(ctx.politeness_delay);
            let discovered =
                html::discover(fetcher, &ctx.source, source, &mut pacer, &mut ctx.stats).await?;
            tracing::info!(
                source = %ctx.source.name,
                count = discovered.urls.len(),
                "discovered product pages"
            );
            html::fetch_details(fetcher, discovered, &mut pacer, &mut ctx.stats)
                .await?
                .into_iter()
                .map(RawRecord::Html)
                .collect()
        }
    };

    ctx.stats.records_fetched = records.len();
    Ok(records)
}

/// Sleeps `delay` before every request but the first.
#[derive(Debug)]
pub(crate) struct Pacer {
    delay: Duration,
    started: bool,
}

impl Pacer {
    pub(crate) fn new(delay: Duration) -> Self {
        Self {
            delay,
            started: false,
        }
    }

    pub(crate) async fn wait(&mut self) {
        if self.started && !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.started = true;
    }
}

#[cfg(test)]
mod tests {
    use std::time::Instant;

    use super::*;

    #[tokio::test]
    async fn pacer_skips_the_first_wait() {
        let mut pacer = Pacer::new(Duration::from_millis(30));
        let started = Instant::now();
        pacer.wait().await;
        assert!(started.elapsed() < Duration::from_millis(30));
        pacer.wait().await;
        assert!(started.elapsed() >= Duration::from_millis(30));
    }
}
