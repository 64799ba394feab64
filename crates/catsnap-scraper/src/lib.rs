pub mod client;
pub mod error;
pub mod extract;
pub mod noise;
pub mod normalize;
pub mod pagination;
pub mod pipeline;
pub mod records;
mod retry;

pub use client::{FetchedBody, Fetcher};
pub use error::ScraperError;
pub use extract::{check_rules, ExtractionResult, Extractor, FieldValue, RecordView};
pub use noise::NoiseFilter;
pub use normalize::{normalize_record, Deduplicator};
pub use pagination::{fetch_all_pages, PageWalk, Paginated};
pub use pipeline::{collect_products, process_records};
pub use records::{collect_records, HtmlPage, RawRecord};
