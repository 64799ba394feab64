use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use catsnap_core::{CanonicalProduct, SourceConfig};
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use super::*;
use crate::fetch::{preview, run_fetch, status_line, FetchOptions, DRY_RUN_PREVIEW};

// ---------------------------------------------------------------------------
// argument parsing
// ---------------------------------------------------------------------------

#[test]
fn parses_fetch_with_defaults() {
    let cli = Cli::try_parse_from(["catsnap", "fetch", "hero-lectro"]).expect("valid cli args");
    assert!(!cli.verbose);
    assert!(cli.sources.is_none());
    match cli.command {
        Commands::Fetch {
            source,
            output,
            dry_run,
            all,
        } => {
            assert_eq!(source, "hero-lectro");
            assert!(output.is_none());
            assert!(!dry_run);
            assert!(!all);
        }
        other => panic!("expected fetch, got {other:?}"),
    }
}

#[test]
fn parses_fetch_flags_in_any_position() {
    let cli = Cli::try_parse_from([
        "catsnap",
        "--verbose",
        "fetch",
        "aoki",
        "--dry-run",
        "--all",
        "--output",
        "/tmp/out",
        "--sources",
        "custom.yaml",
    ])
    .expect("valid cli args");

    assert!(cli.verbose);
    assert_eq!(cli.sources.as_deref(), Some(Path::new("custom.yaml")));
    assert!(matches!(
        cli.command,
        Commands::Fetch {
            dry_run: true,
            all: true,
            output: Some(_),
            ..
        }
    ));
}

#[test]
fn parses_sources_and_show() {
    let cli = Cli::try_parse_from(["catsnap", "sources"]).expect("valid cli args");
    assert!(matches!(cli.command, Commands::Sources));

    let cli = Cli::try_parse_from(["catsnap", "show", "Emotorad", "--output", "snaps"])
        .expect("valid cli args");
    match cli.command {
        Commands::Show { source, output } => {
            assert_eq!(source, "Emotorad");
            assert_eq!(output.as_deref(), Some(Path::new("snaps")));
        }
        other => panic!("expected show, got {other:?}"),
    }
}

#[test]
fn fetch_requires_a_source() {
    assert!(Cli::try_parse_from(["catsnap", "fetch"]).is_err());
    assert!(Cli::try_parse_from(["catsnap"]).is_err());
}

// ---------------------------------------------------------------------------
// helpers
// ---------------------------------------------------------------------------

fn source(base: &str) -> SourceConfig {
    let yaml = format!(
        r"
name: Aoki Bikes
origin: {base}
fetch:
  kind: json
  endpoint: {base}/products.json
  collection: products
fields:
  id:
    - kind: json_path
      path: id
  name:
    - kind: json_path
      path: title
  price:
    - kind: json_path
      path: price
"
    );
    serde_yaml::from_str(&yaml).expect("valid source yaml")
}

fn product(id: &str) -> CanonicalProduct {
    CanonicalProduct {
        id: id.to_owned(),
        name: format!("Bike {id}"),
        price: None,
        compare_price: None,
        in_stock: false,
        images: vec![],
        specifications: BTreeMap::new(),
        variants: vec![],
        description: None,
        source_url: None,
        highlights: vec![],
        tags: vec![],
    }
}

fn fetcher() -> catsnap_scraper::Fetcher {
    catsnap_scraper::Fetcher::new(
        Duration::from_secs(5),
        "catsnap-test/0.1",
        1,
        Duration::from_millis(10),
    )
    .expect("failed to build test Fetcher")
}

async fn serve_products(server: &MockServer, body: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path("/products.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

#[test]
fn preview_limits_unless_all() {
    let products: Vec<CanonicalProduct> = ["a", "b", "c", "d", "e"].map(product).into();
    assert_eq!(preview(&products, false).len(), DRY_RUN_PREVIEW);
    assert_eq!(preview(&products, true).len(), 5);
    assert_eq!(preview(&products[..1], false).len(), 1);
}

#[test]
fn status_line_names_outcome_and_counters() {
    let mut ctx = RunContext::new(source("https://shop.example"), Duration::ZERO, false);
    ctx.stats.products = 4;
    ctx.stats.records_skipped = 1;
    let line = status_line("ok", &ctx);
    assert!(line.starts_with("ok: Aoki Bikes: "));
    assert!(line.contains("products=4"));
    assert!(line.contains("skipped=1"));
}

#[test]
fn describe_source_shows_slug_and_kind() {
    let line = show::describe_source(&source("https://shop.example"));
    assert!(line.starts_with("aoki-bikes"));
    assert!(line.contains("json"));
    assert!(line.contains("(https://shop.example)"));
}

#[test]
fn unknown_source_lists_known_slugs() {
    let sources = SourcesFile {
        sources: vec![source("https://shop.example")],
    };
    assert!(find_source(&sources, "AOKI BIKES").is_ok());
    let err = find_source(&sources, "hero").unwrap_err().to_string();
    assert!(err.contains("'hero'"));
    assert!(err.contains("aoki-bikes"));
}

#[test]
fn describe_snapshot_prints_one_field_per_line() {
    let mut stocked = product("a");
    stocked.in_stock = true;
    let snapshot = catsnap_core::Snapshot::new("https://shop.example", vec![stocked, product("b")]);
    let text = show::describe_snapshot(Path::new("snaps/aoki-bikes.json"), &snapshot);

    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 5);
    assert_eq!(lines[0], "path:       snaps/aoki-bikes.json");
    assert_eq!(lines[1], "source:     https://shop.example");
    assert!(lines[2].starts_with("fetched_at: "));
    assert_eq!(lines[3], "products:   2 (1 in stock, 1 out of stock)");
    assert_eq!(lines[4], "discounted: 0");
    assert!(text.ends_with('\n'));
}

// ---------------------------------------------------------------------------
// fetch runs
// ---------------------------------------------------------------------------

#[tokio::test]
async fn fetch_writes_snapshot_and_show_reads_it() {
    let server = MockServer::start().await;
    serve_products(
        &server,
        json!({"products": [
            {"id": 1, "title": "Zeeta", "price": "29,999"},
            {"id": 2, "title": "C3", "price": "24999"}
        ]}),
    )
    .await;
    let out = tempfile::tempdir().unwrap();
    let options = FetchOptions {
        output_dir: out.path().join("snaps"),
        print_all: false,
    };

    let ctx = RunContext::new(source(&server.uri()), Duration::ZERO, false);
    let code = run_fetch(&fetcher(), ctx, &options).await;
    assert_eq!(code, ExitCode::SUCCESS);

    let path = catsnap_store::snapshot_path(&options.output_dir, "aoki-bikes");
    let snapshot = catsnap_store::read_snapshot(&path).unwrap();
    assert_eq!(snapshot.count, 2);
    assert_eq!(snapshot.source, server.uri());

    let text = show::describe_snapshot(&path, &snapshot);
    assert!(text.contains("products:   2 (0 in stock, 2 out of stock)"));
    assert!(text.contains("discounted: 0"));
}

#[tokio::test]
async fn dry_run_writes_nothing() {
    let server = MockServer::start().await;
    serve_products(&server, json!({"products": [{"id": 1, "title": "Zeeta"}]})).await;
    let out = tempfile::tempdir().unwrap();
    let options = FetchOptions {
        output_dir: out.path().join("snaps"),
        print_all: true,
    };

    let ctx = RunContext::new(source(&server.uri()), Duration::ZERO, true);
    let code = run_fetch(&fetcher(), ctx, &options).await;
    assert_eq!(code, ExitCode::SUCCESS);
    assert!(!options.output_dir.exists());
}

#[tokio::test]
async fn empty_result_fails_and_keeps_previous_snapshot() {
    let server = MockServer::start().await;
    serve_products(&server, json!({"products": []})).await;
    let out = tempfile::tempdir().unwrap();
    let previous = catsnap_core::Snapshot::new("earlier", vec![product("old")]);
    catsnap_store::write_snapshot(out.path(), "aoki-bikes", &previous).unwrap();
    let options = FetchOptions {
        output_dir: out.path().to_path_buf(),
        print_all: false,
    };

    let ctx = RunContext::new(source(&server.uri()), Duration::ZERO, false);
    let code = run_fetch(&fetcher(), ctx, &options).await;
    assert_eq!(code, ExitCode::FAILURE);

    let kept =
        catsnap_store::read_snapshot(&catsnap_store::snapshot_path(out.path(), "aoki-bikes"))
            .unwrap();
    assert_eq!(kept.source, "earlier");
}

#[tokio::test]
async fn exhausted_fetch_fails_the_run() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/products.json"))
        .respond_with(ResponseTemplate::new(503))
        .expect(1)
        .mount(&server)
        .await;
    let out = tempfile::tempdir().unwrap();
    let options = FetchOptions {
        output_dir: out.path().to_path_buf(),
        print_all: false,
    };

    let ctx = RunContext::new(source(&server.uri()), Duration::ZERO, false);
    let code = run_fetch(&fetcher(), ctx, &options).await;
    assert_eq!(code, ExitCode::FAILURE);
    assert!(!catsnap_store::snapshot_path(out.path(), "aoki-bikes").exists());
}
