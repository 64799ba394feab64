use serde_json::json;

use super::*;

#[test]
fn take_collection_reads_envelope_key() {
    let body = json!({"products": [{"id": 1}, {"id": 2}]});
    let items = take_collection(body, Some("products")).unwrap();
    assert_eq!(items.len(), 2);
}

#[test]
fn take_collection_accepts_top_level_array() {
    let body = json!([{"name": "T-Rex"}]);
    let items = take_collection(body, None).unwrap();
    assert_eq!(items[0]["name"], "T-Rex");
}

#[test]
fn take_collection_rejects_missing_key() {
    let err = take_collection(json!({"items": []}), Some("products")).unwrap_err();
    assert!(err.contains("missing \"products\""), "{err}");
}

#[test]
fn take_collection_rejects_non_array() {
    let err = take_collection(json!({"products": {"id": 1}}), Some("products")).unwrap_err();
    assert!(err.contains("got an object"), "{err}");
    let err = take_collection(json!("oops"), None).unwrap_err();
    assert!(err.contains("got a string"), "{err}");
}

#[test]
fn parse_json_reports_malformed_body() {
    let fetched = FetchedBody {
        url: "https://shop.example/products.json".to_owned(),
        body: "<html>maintenance</html>".to_owned(),
        content_length: None,
    };
    let err = parse_json(&fetched).unwrap_err();
    assert!(matches!(err, ScraperError::MalformedBody { .. }), "{err:?}");
    assert!(err.is_transient());
}

#[test]
fn fetcher_builds_from_app_config() {
    let config = AppConfig {
        log_level: "info".to_owned(),
        sources_path: "./config/sources.yaml".into(),
        output_dir: "./snapshots".into(),
        request_timeout_secs: 5,
        user_agent: "catsnap-test/0.1".to_owned(),
        max_attempts: 2,
        retry_delay_ms: 0,
        politeness_delay_ms: 0,
    };
    let fetcher = Fetcher::from_config(&config).unwrap();
    assert_eq!(fetcher.max_attempts, 2);
    assert_eq!(fetcher.retry_delay, Duration::ZERO);
}
