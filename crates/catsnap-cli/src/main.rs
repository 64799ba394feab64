mod fetch;
mod show;

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use catsnap_core::{AppConfig, RunContext, SourcesFile};

#[derive(Debug, Parser)]
#[command(name = "catsnap")]
#[command(about = "Fetch product catalogs and publish them as JSON snapshots")]
struct Cli {
    /// Sources file (defaults to `CATSNAP_SOURCES_PATH`)
    #[arg(long, global = true)]
    sources: Option<PathBuf>,
    /// Log at debug level regardless of `RUST_LOG`
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Fetch one source and write its snapshot
    Fetch {
        /// Source name or slug
        source: String,
        /// Snapshot directory (defaults to `CATSNAP_OUTPUT_DIR`)
        #[arg(long)]
        output: Option<PathBuf>,
        /// Print products instead of writing the snapshot
        #[arg(long)]
        dry_run: bool,
        /// With --dry-run, print every product rather than the first few
        #[arg(long)]
        all: bool,
    },
    /// List configured sources
    Sources,
    /// Print metadata of the latest snapshot for a source
    Show {
        /// Source name or slug
        source: String,
        /// Snapshot directory (defaults to `CATSNAP_OUTPUT_DIR`)
        #[arg(long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match catsnap_core::load_app_config() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("error: {e}");
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = init_tracing(&config.log_level, cli.verbose) {
        eprintln!("error: invalid log filter: {e}");
        return ExitCode::FAILURE;
    }

    match run(cli, &config).await {
        Ok(code) => code,
        Err(e) => {
            tracing::error!(error = %format!("{e:#}"), "run failed");
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

/// `RUST_LOG` wins over the configured level; `--verbose` wins over both.
fn init_tracing(level: &str, verbose: bool) -> anyhow::Result<()> {
    let env_filter = if verbose {
        EnvFilter::try_new("debug")?
    } else {
        EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(level))?
    };
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();
    Ok(())
}

async fn run(cli: Cli, config: &AppConfig) -> anyhow::Result<ExitCode> {
    let sources_path = cli
        .sources
        .unwrap_or_else(|| config.sources_path.clone());
    let sources = catsnap_core::load_sources(&sources_path)
        .with_context(|| format!("loading sources from {}", sources_path.display()))?;

    match cli.command {
        Commands::Fetch {
            source,
            output,
            dry_run,
            all,
        } => {
            let source = find_source(&sources, &source)?.clone();
            let fetcher = catsnap_scraper::Fetcher::from_config(config)
                .map_err(|e| anyhow::anyhow!("failed to build fetcher: {e}"))?;
            let ctx = RunContext::new(
                source,
                std::time::Duration::from_millis(config.politeness_delay_ms),
                dry_run,
            );
            let options = fetch::FetchOptions {
                output_dir: output.unwrap_or_else(|| config.output_dir.clone()),
                print_all: all,
            };
            Ok(fetch::run_fetch(&fetcher, ctx, &options).await)
        }
        Commands::Sources => {
            show::list_sources(&sources);
            Ok(ExitCode::SUCCESS)
        }
        Commands::Show { source, output } => {
            let source = find_source(&sources, &source)?;
            let dir = output.unwrap_or_else(|| config.output_dir.clone());
            show::show_snapshot(&dir, source)?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn find_source<'a>(
    sources: &'a SourcesFile,
    key: &str,
) -> anyhow::Result<&'a catsnap_core::SourceConfig> {
    sources.find(key).ok_or_else(|| {
        let known: Vec<String> = sources.sources.iter().map(|s| s.slug()).collect();
        anyhow::anyhow!("source '{key}' not found (known: {})", known.join(", "))
    })
}

#[cfg(test)]
mod tests;
