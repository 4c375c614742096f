//! CLI error type.

use thiserror::Error;

use globetiles::config::ConfigError;
use globetiles::crs::CrsError;
use globetiles::layer::LayerError;
use globetiles::source::SourceError;
use globetiles::tile::HierarchyError;

#[derive(Debug, Error)]
pub enum CliError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    ConfigFile(#[from] ConfigError),

    #[error(transparent)]
    Crs(#[from] CrsError),

    #[error(transparent)]
    Source(#[from] SourceError),

    #[error(transparent)]
    Hierarchy(#[from] HierarchyError),

    #[error(transparent)]
    Layer(#[from] LayerError),

    #[error("Failed to start async runtime: {0}")]
    Runtime(#[source] std::io::Error),
}
