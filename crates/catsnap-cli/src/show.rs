//! Read-only commands: `sources` and `show`.

use std::path::Path;

use anyhow::Context;
use catsnap_core::{Snapshot, SourceConfig, SourceKind, SourcesFile};

pub(crate) fn list_sources(sources: &SourcesFile) {
    for source in &sources.sources {
        println!("{}", describe_source(source));
    }
}

pub(crate) fn describe_source(source: &SourceConfig) -> String {
    let kind = match source.fetch {
        SourceKind::Json(_) => "json",
        SourceKind::Html(_) => "html",
    };
    format!("{:<16} {:<5} {} ({})", source.slug(), kind, source.name, source.origin)
}

pub(crate) fn show_snapshot(dir: &Path, source: &SourceConfig) -> anyhow::Result<()> {
    let path = catsnap_store::snapshot_path(dir, &source.slug());
    let snapshot = catsnap_store::read_snapshot(&path)
        .with_context(|| format!("no readable snapshot for {}", source.name))?;
    print!("{}", describe_snapshot(&path, &snapshot));
    Ok(())
}

pub(crate) fn describe_snapshot(path: &Path, snapshot: &Snapshot) -> String {
    let in_stock = snapshot.in_stock_count();
    let discounted = snapshot
        .products
        .iter()
        .filter(|p| p.discount().is_some())
        .count();
    format!(
        "path:       {}\n\
         source:     {}\n\
         fetched_at: {}\n\
         products:   {} ({in_stock} in stock, {} out of stock)\n\
         discounted: {discounted}\n",
        path.display(),
        snapshot.source,
        snapshot.fetched_at.to_rfc3339(),
        snapshot.count,
        snapshot.count.saturating_sub(in_stock),
    )
}
