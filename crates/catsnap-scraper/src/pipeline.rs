//! One source run: collect, extract, filter, normalize, deduplicate.

use catsnap_core::{CanonicalProduct, Field, RunContext, RunStats, SourceConfig};
use scraper::Html;

use crate::client::Fetcher;
use crate::error::ScraperError;
use crate::extract::{check_rules, ExtractionResult, Extractor, RecordView};
use crate::noise::NoiseFilter;
use crate::normalize::{normalize_record, Deduplicator};
use crate::records::{collect_records, RawRecord};

/// Runs collection and processing for `ctx.source`, updating `ctx.stats`.
///
/// An empty result is returned as-is; refusing to persist it is the
/// caller's decision.
///
/// # Errors
///
/// - [`ScraperError::InvalidRule`] if a configured selector or pattern is invalid.
/// - Any fetch error that aborts collection (see [`collect_records`]).
pub async fn collect_products(
    fetcher: &Fetcher,
    ctx: &mut RunContext,
) -> Result<Vec<CanonicalProduct>, ScraperError> {
    check_rules(&ctx.source)?;
    let noise = NoiseFilter::new(&ctx.source.noise)?;

    let records = collect_records(fetcher, ctx).await?;
    Ok(process_records(&ctx.source, &noise, records, &mut ctx.stats))
}

/// Extracts and normalizes every record. Records that fail normalization
/// are logged and counted, never fatal.
#[must_use]
pub fn process_records(
    source: &SourceConfig,
    noise: &NoiseFilter,
    records: Vec<RawRecord>,
    stats: &mut RunStats,
) -> Vec<CanonicalProduct> {
    let extractor = Extractor::new(source);
    let mut dedup = Deduplicator::default();
    let mut products = Vec::new();

    for record in records {
        let (mut result, page_url) = extract_record(&extractor, source, record);

        let (specifications, removed) = noise.apply(result.take_specifications());
        stats.noise_removed += removed;

        match normalize_record(source, &result, specifications, page_url.as_deref()) {
            Ok(product) => {
                if dedup.admit(&product) {
                    products.push(product);
                }
            }
            Err(err) => {
                let name = result
                    .text(Field::Name)
                    .or(page_url.as_deref())
                    .unwrap_or("<unnamed>");
                tracing::warn!(record = %name, error = %err, "skipping record");
                stats.records_skipped += 1;
            }
        }
    }

    stats.duplicates_dropped += dedup.dropped();
    stats.products = products.len();
    stats.in_stock = products.iter().filter(|p| p.in_stock).count();
    stats.out_of_stock = products.len() - stats.in_stock;

    tracing::info!(
        source = %source.name,
        products = stats.products,
        skipped = stats.records_skipped,
        duplicates = stats.duplicates_dropped,
        "normalized records"
    );
    products
}

/// The parsed document lives only for the duration of this call.
fn extract_record(
    extractor: &Extractor<'_>,
    source: &SourceConfig,
    record: RawRecord,
) -> (ExtractionResult, Option<String>) {
    match record {
        RawRecord::Json(value) => (
            extractor.extract(RecordView::Json(&value), &source.fields),
            None,
        ),
        RawRecord::Html(page) => {
            let mut result = match &page.body {
                Some(body) => {
                    let doc = Html::parse_document(body);
                    let view = RecordView::Html {
                        doc: &doc,
                        body,
                        url: &page.url,
                    };
                    extractor.extract(view, &source.fields)
                }
                None => ExtractionResult::default(),
            };
            if let Some(card) = page.card {
                result.fill_from(card);
            }
            (result, Some(page.url))
        }
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use catsnap_core::{HtmlSource, ImageRules, JsonSource, NoiseConfig, SourceKind};
    use rust_decimal::Decimal;
    use serde_json::json;

    use super::*;
    use crate::extract::FieldValue;
    use crate::records::HtmlPage;

    fn json_source(fields: &str) -> SourceConfig {
        SourceConfig {
            name: "Aoki".to_owned(),
            origin: "https://aoki.example".to_owned(),
            fetch: SourceKind::Json(JsonSource {
                endpoint: "https://aoki.example/products.json".to_owned(),
                collection: Some("products".to_owned()),
                pagination: None,
                inactive_flag: None,
            }),
            fields: serde_yaml::from_str(fields).unwrap(),
            noise: NoiseConfig::default(),
            images: ImageRules::default(),
            politeness_delay_ms: None,
            assume_in_stock: false,
            product_url_prefix: None,
            primary_variant: catsnap_core::VariantSelection::First,
        }
    }

    const SHOPIFY_FIELDS: &str = r"
id:
  - kind: json_path
    path: id
name:
  - kind: json_path
    path: title
variants:
  - kind: json_variants
    path: variants
    name: [title]
    price: price
    available: available
    sku: sku
images:
  - kind: json_path
    path: images.*.src
";

    fn noise() -> NoiseFilter {
        NoiseFilter::new(&NoiseConfig::default()).unwrap()
    }

    #[test]
    fn zeeta_record_normalizes_end_to_end() {
        let source = json_source(SHOPIFY_FIELDS);
        let record = json!({
            "title": "  Zeeta  Plus ",
            "variants": [
                {"price": "29999.00", "available": true},
                {"price": "31999.00", "available": false}
            ],
            "images": [{"src": "//cdn/a.jpg"}]
        });
        let mut stats = RunStats::default();
        let products = process_records(&source, &noise(), vec![RawRecord::Json(record)], &mut stats);

        assert_eq!(products.len(), 1);
        let zeeta = &products[0];
        assert_eq!(zeeta.name, "Zeeta Plus");
        assert_eq!(zeeta.price, Some(Decimal::from_str("29999").unwrap()));
        assert!(zeeta.in_stock);
        assert_eq!(zeeta.images, vec!["https://cdn/a.jpg"]);
        assert_eq!(stats.products, 1);
        assert_eq!(stats.in_stock, 1);
    }

    #[test]
    fn same_sku_and_same_name_collapse() {
        let source = json_source(SHOPIFY_FIELDS);
        let records = vec![
            json!({"title": "Zeeta", "variants": [{"sku": "ZP-1", "price": "1"}]}),
            json!({"title": "Zeeta Plus", "variants": [{"sku": "ZP-1", "price": "2"}]}),
            json!({"title": "Lectro C3"}),
            json!({"title": "Lectro C3"}),
        ];
        let mut stats = RunStats::default();
        let products = process_records(
            &source,
            &noise(),
            records.into_iter().map(RawRecord::Json).collect(),
            &mut stats,
        );
        let names: Vec<&str> = products.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, ["Zeeta", "Lectro C3"]);
        assert_eq!(stats.duplicates_dropped, 2);
    }

    #[test]
    fn unnamed_records_are_skipped_and_counted() {
        let source = json_source(SHOPIFY_FIELDS);
        let records = vec![json!({"title": "  "}), json!({"title": "Zeeta"})];
        let mut stats = RunStats::default();
        let products = process_records(
            &source,
            &noise(),
            records.into_iter().map(RawRecord::Json).collect(),
            &mut stats,
        );
        assert_eq!(products.len(), 1);
        assert_eq!(stats.records_skipped, 1);
        assert_eq!(stats.out_of_stock, 1);
    }

    #[test]
    fn html_page_merges_card_and_filters_noise() {
        let mut source = json_source(
            r"
name:
  - kind: css
    selector: h1
specifications:
  - kind: spec_table
",
        );
        source.fetch = SourceKind::Html(HtmlSource::default());

        let mut card = ExtractionResult::default();
        card.set(Field::Name, FieldValue::Text("Card Name".to_owned()));
        card.set(Field::Price, FieldValue::Number(Decimal::from(34_999)));

        let body = r"<html><body><h1>Meraki</h1><table>
            <tr><td>Motor</td><td>250W</td></tr>
            <tr><td>Bank Name/ Tenure</td><td>3 Months</td></tr>
            <tr><td>HDFC</td><td>14.00%</td></tr>
        </table></body></html>";
        let page = HtmlPage {
            url: "https://o91.example/buy/meraki".to_owned(),
            body: Some(body.to_owned()),
            card: Some(card),
        };

        let mut stats = RunStats::default();
        let products = process_records(&source, &noise(), vec![RawRecord::Html(page)], &mut stats);

        let meraki = &products[0];
        assert_eq!(meraki.name, "Meraki");
        assert_eq!(meraki.price, Some(Decimal::from(34_999)));
        assert_eq!(meraki.specifications.len(), 1);
        assert_eq!(stats.noise_removed, 2);
        assert_eq!(meraki.id, "name:meraki");
        assert_eq!(
            meraki.source_url.as_deref(),
            Some("https://o91.example/buy/meraki")
        );
    }

    #[test]
    fn card_alone_stands_in_for_missing_page() {
        let mut source = json_source("name: [{kind: css, selector: h1}]");
        source.fetch = SourceKind::Html(HtmlSource::default());
        let mut card = ExtractionResult::default();
        card.set(Field::Name, FieldValue::Text("Enduro".to_owned()));
        let page = HtmlPage {
            url: "https://o91.example/buy/enduro".to_owned(),
            body: None,
            card: Some(card),
        };
        let mut stats = RunStats::default();
        let products = process_records(&source, &noise(), vec![RawRecord::Html(page)], &mut stats);
        assert_eq!(products[0].name, "Enduro");
    }
}
