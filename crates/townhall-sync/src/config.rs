//! Runtime configuration
//!
//! [`LiveConfig`] carries the store collection path, session code policy,
//! demo seeding and logging defaults. Loadable from TOML; every field has a
//! default so an empty file is a valid config.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use townhall_core::{DEFAULT_AUTHOR, DEFAULT_CODE_MAX, DEFAULT_CODE_MIN, DEFAULT_TITLE};

/// Live session configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LiveConfig {
    /// Store collection holding every session document
    pub collection_path: String,
    /// Lowest generated session code
    pub code_min: u32,
    /// Highest generated session code
    pub code_max: u32,
    /// Regenerate this many times when a new code is already taken (0 = never check)
    pub code_collision_retries: u32,
    /// Seed the demo session into fresh registries
    pub seed_demo: bool,
    /// Title for sessions created without one
    pub default_title: String,
    /// Author for questions submitted without a name
    pub default_author: String,
    /// Logging defaults
    pub logging: LoggingConfig,
}

impl LiveConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With store collection path
    #[inline]
    #[must_use]
    pub fn with_collection_path(mut self, path: impl Into<String>) -> Self {
        self.collection_path = path.into();
        self
    }

    /// With code generation range
    #[inline]
    #[must_use]
    pub fn with_code_range(mut self, min: u32, max: u32) -> Self {
        self.code_min = min;
        self.code_max = max;
        self
    }

    /// With collision retries
    #[inline]
    #[must_use]
    pub fn with_collision_retries(mut self, retries: u32) -> Self {
        self.code_collision_retries = retries;
        self
    }

    /// With or without the demo session
    #[inline]
    #[must_use]
    pub fn with_seed_demo(mut self, seed: bool) -> Self {
        self.seed_demo = seed;
        self
    }

    /// Parse and validate TOML
    ///
    /// # Errors
    /// - `ConfigError::Parse` on malformed TOML
    /// - `ConfigError::Invalid` on inconsistent values
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML file
    ///
    /// # Errors
    /// - `ConfigError::Io` if the file cannot be read
    /// - see [`Self::from_toml_str`]
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    /// Check value consistency
    ///
    /// # Errors
    /// - `ConfigError::Invalid` describing the first bad value
    pub fn validate(&self) -> Result<(), ConfigError> {
        let collection = self.collection_path.trim_matches('/');
        if collection.is_empty() {
            return Err(ConfigError::Invalid("collection_path is empty".to_string()));
        }
        if self.code_min > self.code_max {
            return Err(ConfigError::Invalid(format!(
                "code_min {} exceeds code_max {}",
                self.code_min, self.code_max
            )));
        }
        if self.default_title.trim().is_empty() {
            return Err(ConfigError::Invalid("default_title is empty".to_string()));
        }
        if self.default_author.trim().is_empty() {
            return Err(ConfigError::Invalid("default_author is empty".to_string()));
        }
        Ok(())
    }
}

impl Default for LiveConfig {
    fn default() -> Self {
        Self {
            collection_path: "events".to_string(),
            code_min: DEFAULT_CODE_MIN,
            code_max: DEFAULT_CODE_MAX,
            code_collision_retries: 0,
            seed_demo: true,
            default_title: DEFAULT_TITLE.to_string(),
            default_author: DEFAULT_AUTHOR.to_string(),
            logging: LoggingConfig::default(),
        }
    }
}

/// Logging defaults, overridden by `RUST_LOG`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `EnvFilter` directive used when `RUST_LOG` is unset
    pub filter: String,
    /// Emit JSON lines instead of human-readable output
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
            json: false,
        }
    }
}
