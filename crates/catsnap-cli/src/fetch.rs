//! The `fetch` command: one source, one pipeline run, one snapshot.
//!
//! Every outcome ends with a single status line on stdout. Failures are
//! reported through the exit code rather than propagated, so the counters
//! gathered before the failure still reach the user.

use std::path::PathBuf;
use std::process::ExitCode;

use catsnap_core::{CanonicalProduct, RunContext, Snapshot};
use catsnap_scraper::{collect_products, Fetcher};

/// Conventional exit status for a run stopped by Ctrl-C.
pub(crate) const EXIT_INTERRUPTED: u8 = 130;

/// Products printed by a dry run without `--all`.
pub(crate) const DRY_RUN_PREVIEW: usize = 3;

#[derive(Debug)]
pub(crate) struct FetchOptions {
    pub output_dir: PathBuf,
    pub print_all: bool,
}

pub(crate) async fn run_fetch(
    fetcher: &Fetcher,
    mut ctx: RunContext,
    options: &FetchOptions,
) -> ExitCode {
    tracing::info!(
        source = %ctx.source.name,
        dry_run = ctx.dry_run,
        "starting run"
    );

    let collected = tokio::select! {
        result = collect_products(fetcher, &mut ctx) => Some(result),
        () = interrupted() => None,
    };

    let Some(result) = collected else {
        tracing::warn!(source = %ctx.source.name, "interrupted, no snapshot written");
        println!("{}", status_line("interrupted", &ctx));
        return ExitCode::from(EXIT_INTERRUPTED);
    };

    let products = match result {
        Ok(products) => products,
        Err(e) => {
            tracing::error!(source = %ctx.source.name, error = %e, "collection failed");
            println!("{}", status_line("failed", &ctx));
            return ExitCode::FAILURE;
        }
    };

    if products.is_empty() {
        tracing::error!(
            source = %ctx.source.name,
            "no products collected, previous snapshot left in place"
        );
        println!("{}", status_line("failed", &ctx));
        return ExitCode::FAILURE;
    }

    if ctx.dry_run {
        for product in preview(&products, options.print_all) {
            match serde_json::to_string_pretty(product) {
                Ok(json) => println!("{json}"),
                Err(e) => tracing::warn!(id = %product.id, error = %e, "could not render product"),
            }
        }
        println!("{}", status_line("dry-run", &ctx));
        return ExitCode::SUCCESS;
    }

    let snapshot = Snapshot::new(ctx.source.origin.clone(), products);
    match catsnap_store::write_snapshot(&options.output_dir, &ctx.source.slug(), &snapshot) {
        Ok(path) => {
            println!("{} -> {}", status_line("ok", &ctx), path.display());
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!(source = %ctx.source.name, error = %e, "snapshot write failed");
            println!("{}", status_line("failed", &ctx));
            ExitCode::FAILURE
        }
    }
}

/// Resolves on Ctrl-C. Never resolves if the handler cannot be installed.
async fn interrupted() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "could not listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
}

pub(crate) fn preview(products: &[CanonicalProduct], all: bool) -> &[CanonicalProduct] {
    if all {
        products
    } else {
        &products[..products.len().min(DRY_RUN_PREVIEW)]
    }
}

pub(crate) fn status_line(outcome: &str, ctx: &RunContext) -> String {
    format!("{outcome}: {}", ctx.summary())
}
