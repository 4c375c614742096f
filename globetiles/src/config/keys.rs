//! Addressing individual settings as `section.key`.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use super::{ConfigError, ConfigFile};

/// Value written for a TTL of "never expires".
const INFINITE_TTL: &str = "infinite";

/// A single configuration setting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConfigKey {
    // subdivision
    MaxLevel,
    MinLevel,
    MaxDeltaElevationLevel,
    SseThreshold,
    MergeHysteresis,
    TilePixelSize,
    MinCullingLevel,
    HorizonCulling,
    RequireAncestorResources,
    // cache
    CacheCapacity,
    TextureTtl,
    ElevationTtl,
    // crs
    TileCrs,
    SourceCrs,
    // logging
    LogLevel,
    LogFile,
}

impl ConfigKey {
    /// Every key, grouped by section.
    pub fn all() -> &'static [ConfigKey] {
        use ConfigKey::*;
        &[
            MaxLevel,
            MinLevel,
            MaxDeltaElevationLevel,
            SseThreshold,
            MergeHysteresis,
            TilePixelSize,
            MinCullingLevel,
            HorizonCulling,
            RequireAncestorResources,
            CacheCapacity,
            TextureTtl,
            ElevationTtl,
            TileCrs,
            SourceCrs,
            LogLevel,
            LogFile,
        ]
    }

    pub fn section(&self) -> &'static str {
        use ConfigKey::*;
        match self {
            MaxLevel
            | MinLevel
            | MaxDeltaElevationLevel
            | SseThreshold
            | MergeHysteresis
            | TilePixelSize
            | MinCullingLevel
            | HorizonCulling
            | RequireAncestorResources => "subdivision",
            CacheCapacity | TextureTtl | ElevationTtl => "cache",
            TileCrs | SourceCrs => "crs",
            LogLevel | LogFile => "logging",
        }
    }

    pub fn key_name(&self) -> &'static str {
        use ConfigKey::*;
        match self {
            MaxLevel => "max_level",
            MinLevel => "min_level",
            MaxDeltaElevationLevel => "max_delta_elevation_level",
            SseThreshold => "sse_threshold",
            MergeHysteresis => "merge_hysteresis",
            TilePixelSize => "tile_pixel_size",
            MinCullingLevel => "min_culling_level",
            HorizonCulling => "horizon_culling",
            RequireAncestorResources => "require_ancestor_resources",
            CacheCapacity => "capacity",
            TextureTtl => "texture_ttl_ms",
            ElevationTtl => "elevation_ttl_ms",
            TileCrs => "tile_crs",
            SourceCrs => "source_crs",
            LogLevel => "level",
            LogFile => "file",
        }
    }

    /// Full name, `section.key`.
    pub fn name(&self) -> String {
        format!("{}.{}", self.section(), self.key_name())
    }

    /// Current value as written to the file; empty when unset.
    pub fn get(&self, config: &ConfigFile) -> String {
        use ConfigKey::*;
        let s = &config.subdivision;
        match self {
            MaxLevel => s.max_subdivision_level.to_string(),
            MinLevel => s.min_subdivision_level.to_string(),
            MaxDeltaElevationLevel => s.max_delta_elevation_level.to_string(),
            SseThreshold => s.sse_threshold.to_string(),
            MergeHysteresis => s.merge_hysteresis.to_string(),
            TilePixelSize => s.tile_pixel_size.to_string(),
            MinCullingLevel => s.min_culling_level.to_string(),
            HorizonCulling => s.horizon_culling.to_string(),
            RequireAncestorResources => s.require_ancestor_resources.to_string(),
            CacheCapacity => config.cache.capacity.to_string(),
            TextureTtl => format_ttl(config.cache.texture_ttl_ms),
            ElevationTtl => format_ttl(config.cache.elevation_ttl_ms),
            TileCrs => config.crs.tile_crs.clone(),
            SourceCrs => config.crs.source_crs.clone(),
            LogLevel => config.logging.level.clone(),
            LogFile => config
                .logging
                .file
                .as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_default(),
        }
    }

    /// Parse `value` and store it.
    pub fn set(&self, config: &mut ConfigFile, value: &str) -> Result<(), ConfigError> {
        use ConfigKey::*;
        let value = value.trim();
        let s = &mut config.subdivision;
        match self {
            MaxLevel => s.max_subdivision_level = self.parse(value)?,
            MinLevel => s.min_subdivision_level = self.parse(value)?,
            MaxDeltaElevationLevel => s.max_delta_elevation_level = self.parse(value)?,
            SseThreshold => s.sse_threshold = self.parse_positive(value)?,
            MergeHysteresis => {
                let hysteresis: f64 = self.parse_positive(value)?;
                if hysteresis > 1.0 {
                    return Err(self.invalid(value, "must not exceed 1.0"));
                }
                s.merge_hysteresis = hysteresis;
            }
            TilePixelSize => s.tile_pixel_size = self.parse_positive(value)?,
            MinCullingLevel => s.min_culling_level = self.parse(value)?,
            HorizonCulling => s.horizon_culling = self.parse(value)?,
            RequireAncestorResources => s.require_ancestor_resources = self.parse(value)?,
            CacheCapacity => {
                let capacity: usize = self.parse(value)?;
                if capacity == 0 {
                    return Err(self.invalid(value, "must be at least 1"));
                }
                config.cache.capacity = capacity;
            }
            TextureTtl => config.cache.texture_ttl_ms = self.parse_ttl(value)?,
            ElevationTtl => config.cache.elevation_ttl_ms = self.parse_ttl(value)?,
            TileCrs => config.crs.tile_crs = value.to_string(),
            SourceCrs => config.crs.source_crs = value.to_string(),
            LogLevel => config.logging.level = value.to_string(),
            LogFile => {
                config.logging.file = if value.is_empty() {
                    None
                } else {
                    Some(PathBuf::from(value))
                }
            }
        }
        Ok(())
    }

    fn parse<T>(&self, value: &str) -> Result<T, ConfigError>
    where
        T: FromStr,
        T::Err: fmt::Display,
    {
        value.parse().map_err(|e: T::Err| self.invalid(value, e))
    }

    fn parse_positive(&self, value: &str) -> Result<f64, ConfigError> {
        let parsed: f64 = self.parse(value)?;
        if !(parsed.is_finite() && parsed > 0.0) {
            return Err(self.invalid(value, "must be a positive number"));
        }
        Ok(parsed)
    }

    fn parse_ttl(&self, value: &str) -> Result<Option<u64>, ConfigError> {
        if value.eq_ignore_ascii_case(INFINITE_TTL) {
            Ok(None)
        } else {
            self.parse(value).map(Some)
        }
    }

    fn invalid(&self, value: &str, reason: impl fmt::Display) -> ConfigError {
        ConfigError::InvalidValue {
            key: self.name(),
            value: value.to_string(),
            reason: reason.to_string(),
        }
    }
}

fn format_ttl(ttl_ms: Option<u64>) -> String {
    match ttl_ms {
        Some(ms) => ms.to_string(),
        None => INFINITE_TTL.to_string(),
    }
}

impl FromStr for ConfigKey {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ConfigKey::all()
            .iter()
            .copied()
            .find(|key| key.name() == s)
            .ok_or_else(|| ConfigError::UnknownKey(s.to_string()))
    }
}

impl fmt::Display for ConfigKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names_parse_back() {
        for key in ConfigKey::all() {
            assert_eq!(key.name().parse::<ConfigKey>().unwrap(), *key);
        }
        assert!(matches!(
            "cache.size".parse::<ConfigKey>(),
            Err(ConfigError::UnknownKey(_))
        ));
    }

    #[test]
    fn test_set_and_get() {
        let mut config = ConfigFile::default();
        ConfigKey::SseThreshold.set(&mut config, " 4 ").unwrap();
        assert_eq!(config.subdivision.sse_threshold, 4.0);
        assert_eq!(ConfigKey::SseThreshold.get(&config), "4");

        ConfigKey::HorizonCulling.set(&mut config, "false").unwrap();
        assert!(!config.subdivision.horizon_culling);
    }

    #[test]
    fn test_ttl_accepts_infinite() {
        let mut config = ConfigFile::default();
        ConfigKey::TextureTtl.set(&mut config, "Infinite").unwrap();
        assert_eq!(config.cache.texture_ttl_ms, None);
        assert_eq!(ConfigKey::TextureTtl.get(&config), "infinite");

        ConfigKey::TextureTtl.set(&mut config, "1000").unwrap();
        assert_eq!(config.cache.texture_ttl_ms, Some(1000));
    }

    #[test]
    fn test_rejects_out_of_range_values() {
        let mut config = ConfigFile::default();
        assert!(ConfigKey::SseThreshold.set(&mut config, "-1").is_err());
        assert!(ConfigKey::MergeHysteresis.set(&mut config, "1.5").is_err());
        assert!(ConfigKey::CacheCapacity.set(&mut config, "0").is_err());
        assert!(ConfigKey::MaxLevel.set(&mut config, "300").is_err());
        assert_eq!(config, ConfigFile::default());
    }
}
