//! Shared setup for commands that run the engine.

use std::sync::Arc;

use tracing::info;

use globetiles::config::{config_file_path, ConfigFile};
use globetiles::crs::CrsRegistry;
use globetiles::logging::{init_logging, WorkerGuard};

use crate::error::CliError;

/// Loaded configuration, CRS registry and logging for one CLI invocation.
pub struct CliRunner {
    config: ConfigFile,
    registry: Arc<CrsRegistry>,
    _log_guard: Option<WorkerGuard>,
}

impl CliRunner {
    /// Load and validate the configuration, then install logging.
    pub fn new() -> Result<Self, CliError> {
        let config = ConfigFile::load()?;
        let registry = Arc::new(CrsRegistry::new());
        config.validate(&registry)?;
        let log_guard = init_logging(&config.logging);

        Ok(Self {
            config,
            registry,
            _log_guard: log_guard,
        })
    }

    pub fn config(&self) -> &ConfigFile {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut ConfigFile {
        &mut self.config
    }

    pub fn registry(&self) -> &Arc<CrsRegistry> {
        &self.registry
    }

    pub fn log_startup(&self, command: &str) {
        info!(
            command,
            version = env!("CARGO_PKG_VERSION"),
            config = %config_file_path().display(),
            "GlobeTiles starting"
        );
    }
}
