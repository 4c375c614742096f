//! Configuration file support.
//!
//! Settings live in an INI file, by default
//! `~/.config/globetiles/config.ini`:
//!
//! ```ini
//! [subdivision]
//! max_level = 18
//! sse_threshold = 1.0
//!
//! [cache]
//! capacity = 500
//! texture_ttl_ms = 900000
//!
//! [crs]
//! tile_crs = EPSG:4326
//!
//! [logging]
//! level = info
//! ```
//!
//! Missing keys keep their defaults. Every key can be read and written by
//! name through [`ConfigKey`].

mod keys;

use std::path::{Path, PathBuf};

use ini::Ini;
use thiserror::Error;
use tracing::{debug, warn};

use crate::cache::{CachePolicy, DEFAULT_CACHE_CAPACITY};
use crate::crs::{CrsError, CrsRegistry, EPSG_4326};
use crate::logging::LoggingConfig;
use crate::lod::{SubdivisionConfig, MAX_SUBDIVISION_LEVEL};

pub use keys::ConfigKey;

pub const CONFIG_DIR_NAME: &str = "globetiles";
pub const CONFIG_FILE_NAME: &str = "config.ini";

/// TTL of texture and elevation entries, in milliseconds.
pub const DEFAULT_RESOURCE_TTL_MS: u64 = 900_000;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read { path: PathBuf, source: ini::Error },

    #[error("Failed to write config file {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid value '{value}' for {key}: {reason}")]
    InvalidValue {
        key: String,
        value: String,
        reason: String,
    },

    #[error("Unknown configuration key '{0}'")]
    UnknownKey(String),

    #[error(transparent)]
    Crs(#[from] CrsError),
}

/// `[cache]` section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheSettings {
    /// Maximum live entries per resource cache.
    pub capacity: usize,
    /// `None` keeps textures until evicted by capacity.
    pub texture_ttl_ms: Option<u64>,
    pub elevation_ttl_ms: Option<u64>,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CACHE_CAPACITY,
            texture_ttl_ms: Some(DEFAULT_RESOURCE_TTL_MS),
            elevation_ttl_ms: Some(DEFAULT_RESOURCE_TTL_MS),
        }
    }
}

impl CacheSettings {
    pub fn texture_policy(&self) -> CachePolicy {
        CachePolicy::from_millis(self.texture_ttl_ms)
    }

    pub fn elevation_policy(&self) -> CachePolicy {
        CachePolicy::from_millis(self.elevation_ttl_ms)
    }
}

/// `[crs]` section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrsSettings {
    /// CRS the tile scheme is expressed in.
    pub tile_crs: String,
    /// CRS the imagery source serves.
    pub source_crs: String,
}

impl Default for CrsSettings {
    fn default() -> Self {
        Self {
            tile_crs: EPSG_4326.to_string(),
            source_crs: EPSG_4326.to_string(),
        }
    }
}

/// Whole configuration file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfigFile {
    pub subdivision: SubdivisionConfig,
    pub cache: CacheSettings,
    pub crs: CrsSettings,
    pub logging: LoggingConfig,
}

impl ConfigFile {
    /// Load from [`config_file_path`]; defaults when the file is absent.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&config_file_path())
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            debug!(path = %path.display(), "No config file, using defaults");
            return Ok(Self::default());
        }

        let ini = Ini::load_from_file(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_ini(&ini)
    }

    /// Parse an in-memory INI document.
    pub fn from_ini(ini: &Ini) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        for (section, properties) in ini.iter() {
            let Some(section) = section else {
                continue;
            };
            for (key, value) in properties.iter() {
                let name = format!("{}.{}", section, key);
                match name.parse::<ConfigKey>() {
                    Ok(config_key) => config_key.set(&mut config, value)?,
                    Err(_) => warn!(key = %name, "Ignoring unknown configuration key"),
                }
            }
        }
        Ok(config)
    }

    pub fn to_ini(&self) -> Ini {
        let mut ini = Ini::new();
        for key in ConfigKey::all() {
            let value = key.get(self);
            if !value.is_empty() {
                ini.with_section(Some(key.section()))
                    .set(key.key_name(), value);
            }
        }
        ini
    }

    /// Save to [`config_file_path`].
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&config_file_path())
    }

    /// Save to `path`, creating parent directories.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let write_error = |source| ConfigError::Write {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(write_error)?;
        }
        self.to_ini().write_to_file(path).map_err(write_error)?;
        debug!(path = %path.display(), "Saved configuration");
        Ok(())
    }

    /// Reject identifiers the registry does not know.
    pub fn validate(&self, registry: &CrsRegistry) -> Result<(), ConfigError> {
        registry.assert_valid(&self.crs.tile_crs)?;
        registry.assert_valid(&self.crs.source_crs)?;

        let subdivision = &self.subdivision;
        if subdivision.max_subdivision_level > MAX_SUBDIVISION_LEVEL {
            return Err(ConfigError::InvalidValue {
                key: ConfigKey::MaxLevel.name(),
                value: subdivision.max_subdivision_level.to_string(),
                reason: format!("must be at most {MAX_SUBDIVISION_LEVEL}"),
            });
        }
        if subdivision.min_subdivision_level > subdivision.max_subdivision_level {
            return Err(ConfigError::InvalidValue {
                key: ConfigKey::MinLevel.name(),
                value: subdivision.min_subdivision_level.to_string(),
                reason: "exceeds subdivision.max_level".to_string(),
            });
        }
        Ok(())
    }
}

/// `<config dir>/globetiles`, falling back to the working directory.
pub fn config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(CONFIG_DIR_NAME)
}

pub fn config_file_path() -> PathBuf {
    config_dir().join(CONFIG_FILE_NAME)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crs::EPSG_3857;
    use std::time::Duration;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = ConfigFile::load_from(&dir.path().join("absent.ini")).unwrap();
        assert_eq!(config, ConfigFile::default());
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join(CONFIG_FILE_NAME);

        let mut config = ConfigFile::default();
        config.subdivision = config
            .subdivision
            .with_max_subdivision_level(12)
            .with_sse_threshold(2.5);
        config.cache.capacity = 64;
        config.cache.texture_ttl_ms = None;
        config.crs.tile_crs = EPSG_3857.to_string();
        config.logging.file = Some(dir.path().join("run.log"));
        config.save_to(&path).unwrap();

        let loaded = ConfigFile::load_from(&path).unwrap();
        assert_eq!(loaded, config);
        assert_eq!(loaded.cache.texture_policy(), CachePolicy::Infinite);
        assert_eq!(
            loaded.cache.elevation_policy().ttl(),
            Some(Duration::from_millis(900_000))
        );
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        std::fs::write(&path, "[subdivision]\nmax_level = 7\n\n[extra]\nfoo = bar\n").unwrap();

        let config = ConfigFile::load_from(&path).unwrap();
        assert_eq!(config.subdivision.max_subdivision_level, 7);
        assert_eq!(config.subdivision.sse_threshold, 1.0);
        assert_eq!(config.cache, CacheSettings::default());
    }

    #[test]
    fn test_invalid_value_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        std::fs::write(&path, "[subdivision]\nmax_level = deep\n").unwrap();

        let err = ConfigFile::load_from(&path).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));
        assert!(err.to_string().contains("subdivision.max_level"));
    }

    #[test]
    fn test_validate_rejects_unknown_crs() {
        let registry = CrsRegistry::new();
        let mut config = ConfigFile::default();
        assert!(config.validate(&registry).is_ok());

        config.crs.source_crs = "EPSG:2154".to_string();
        assert!(matches!(
            config.validate(&registry),
            Err(ConfigError::Crs(CrsError::InvalidCrs(_)))
        ));
    }

    #[test]
    fn test_validate_rejects_inverted_levels() {
        let registry = CrsRegistry::new();
        let mut config = ConfigFile::default();
        config.subdivision = config
            .subdivision
            .with_min_subdivision_level(10)
            .with_max_subdivision_level(4);
        assert!(matches!(
            config.validate(&registry),
            Err(ConfigError::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_validate_rejects_unaddressable_max_level() {
        let registry = CrsRegistry::new();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.ini");
        std::fs::write(&path, "[subdivision]\nmax_level = 40\n").unwrap();

        let config = ConfigFile::load_from(&path).unwrap();
        assert_eq!(config.subdivision.max_subdivision_level, 40);
        match config.validate(&registry) {
            Err(ConfigError::InvalidValue { key, value, .. }) => {
                assert_eq!(key, ConfigKey::MaxLevel.name());
                assert_eq!(value, "40");
            }
            other => panic!("expected InvalidValue, got {other:?}"),
        }
    }

    #[test]
    fn test_config_file_path() {
        let path = config_file_path();
        assert!(path.ends_with("globetiles/config.ini"));
    }
}
