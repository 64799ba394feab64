pub mod app_config;
pub mod config;
pub mod products;
pub mod run;
pub mod sources;
pub mod strategy;

use thiserror::Error;

pub use app_config::AppConfig;
pub use config::{load_app_config, load_app_config_from_env};
pub use products::{
    CanonicalProduct, Snapshot, VariantDescriptor, VariantSelection, PRIMARY_VARIANT_SELECTION,
};
pub use run::{RunContext, RunStats};
pub use sources::{
    load_sources, slugify, FieldRules, HtmlSource, ImageRules, JsonSource, ListingConfig, NoiseConfig,
    PaginationConfig, SourceConfig, SourceKind, SourcesFile, UrlFilter, UrlRewrite,
};
pub use strategy::{Field, FieldKind, RecordScope, Strategy, StrategyOutput};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },

    #[error("failed to read sources file {path}: {source}")]
    SourcesFileIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse sources file: {0}")]
    SourcesFileParse(#[from] serde_yaml::Error),

    #[error("sources validation error: {0}")]
    Validation(String),
}
