use std::fmt;
use std::time::Duration;

use crate::sources::SourceConfig;

/// Counters for one pipeline run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunStats {
    pub pages_fetched: usize,
    pub records_fetched: usize,
    /// Records dropped for errors: failed detail pages, normalization failures.
    pub records_skipped: usize,
    pub inactive_skipped: usize,
    pub duplicates_dropped: usize,
    pub noise_removed: usize,
    pub products: usize,
    pub in_stock: usize,
    pub out_of_stock: usize,
}

impl fmt::Display for RunStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "pages={} fetched={} products={} skipped={} inactive={} duplicates={} noise={} in_stock={} out_of_stock={}",
            self.pages_fetched,
            self.records_fetched,
            self.products,
            self.records_skipped,
            self.inactive_skipped,
            self.duplicates_dropped,
            self.noise_removed,
            self.in_stock,
            self.out_of_stock,
        )
    }
}

/// State threaded through one fetch → extract → normalize → persist run.
///
/// Created at run start, dropped at exit. Nothing outlives it.
#[derive(Debug)]
pub struct RunContext {
    pub source: SourceConfig,
    pub dry_run: bool,
    pub politeness_delay: Duration,
    pub stats: RunStats,
}

impl RunContext {
    /// `default_delay` applies unless the source overrides it.
    #[must_use]
    pub fn new(source: SourceConfig, default_delay: Duration, dry_run: bool) -> Self {
        let politeness_delay = source
            .politeness_delay_ms
            .map_or(default_delay, Duration::from_millis);
        Self {
            source,
            dry_run,
            politeness_delay,
            stats: RunStats::default(),
        }
    }

    /// Human-readable one-line summary for the final status output.
    #[must_use]
    pub fn summary(&self) -> String {
        format!("{}: {}", self.source.name, self.stats)
    }
}
