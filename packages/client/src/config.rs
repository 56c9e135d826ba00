//! Client configuration.
//!
//! Values come from three layers, later ones winning:
//!
//! 1. `config/default.toml`, embedded at compile time,
//! 2. an optional TOML file (only the keys it sets are overridden),
//! 3. the `SAFE_ROUTE_API_URL` and `SAFE_ROUTE_AUTH_TOKEN` environment
//!    variables.

use std::path::{Path, PathBuf};

use safe_route_geography_models::GeoPoint;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Environment variable overriding [`ClientConfig::api_url`].
pub const API_URL_ENV: &str = "SAFE_ROUTE_API_URL";

/// Environment variable overriding [`ClientConfig::auth_token`].
pub const AUTH_TOKEN_ENV: &str = "SAFE_ROUTE_AUTH_TOKEN";

const DEFAULT_CONFIG: &str = include_str!("../config/default.toml");

/// Highest zoom a map surface supports.
const MAX_ZOOM: u8 = 19;

/// Errors loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("failed to read config file {path}: {source}")]
    Io {
        /// File that failed.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
    /// The TOML could not be parsed or did not match the expected shape.
    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),
    /// A value parsed but is out of range.
    #[error("invalid config value: {message}")]
    Invalid {
        /// What is wrong.
        message: String,
    },
}

/// Initial map view.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MapConfig {
    /// Center before the user is located.
    pub center: GeoPoint,
    /// Starting zoom.
    pub zoom: u8,
    /// Map width in pixels.
    pub width_px: u32,
    /// Map height in pixels.
    pub height_px: u32,
}

/// Incident clustering tuning.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClusterConfig {
    /// Merge distance in screen pixels.
    pub grid_size_px: f64,
    /// Clustering is disabled above this zoom.
    pub max_zoom: u8,
    /// Smallest group drawn as a cluster.
    pub minimum_cluster_size: usize,
}

/// Layout settling.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayoutConfig {
    /// Delays after which the map is asked to re-measure itself.
    pub resize_delays_ms: Vec<u64>,
}

/// Everything the client needs to talk to the backend and lay out the map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Backend base URL.
    pub api_url: String,
    /// Bearer token sent with every request, if any.
    #[serde(default)]
    pub auth_token: Option<String>,
    /// Per-request timeout.
    pub request_timeout_secs: u64,
    /// Retries for transient failures.
    pub max_retries: u32,
    /// Initial map view.
    pub map: MapConfig,
    /// Clustering tuning.
    pub cluster: ClusterConfig,
    /// Layout settling.
    pub layout: LayoutConfig,
}

impl ClientConfig {
    /// The embedded defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the embedded TOML is invalid.
    pub fn embedded() -> Result<Self, ConfigError> {
        Self::from_toml_str("")
    }

    /// Parses `overrides` on top of the embedded defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] for malformed TOML or mistyped keys,
    /// and [`ConfigError::Invalid`] for out-of-range values.
    pub fn from_toml_str(overrides: &str) -> Result<Self, ConfigError> {
        let mut merged: toml::Table = toml::from_str(DEFAULT_CONFIG)?;
        let overrides: toml::Table = toml::from_str(overrides)?;
        merge_tables(&mut merged, overrides);

        let config: Self = toml::Value::Table(merged).try_into()?;
        config.validate()?;
        Ok(config)
    }

    /// Loads the defaults, then `path` if given, then the environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the file cannot be read or parsed, or a
    /// value is out of range.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let overrides = match path {
            Some(path) => {
                log::debug!("Loading config from {}", path.display());
                std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
                    path: path.to_path_buf(),
                    source,
                })?
            }
            None => String::new(),
        };

        Self::from_toml_str(&overrides)?.with_env_overrides(|key| std::env::var(key).ok())
    }

    /// Applies environment overrides looked up through `lookup`.
    ///
    /// Empty values are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] if the resulting config is invalid.
    pub fn with_env_overrides<F>(mut self, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let present = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        if let Some(url) = present(API_URL_ENV) {
            log::debug!("{API_URL_ENV} overrides api_url");
            self.api_url = url;
        }
        if let Some(token) = present(AUTH_TOKEN_ENV) {
            self.auth_token = Some(token);
        }

        self.validate()?;
        Ok(self)
    }

    /// Checks every value is in range.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] describing the first bad value.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |message: String| Err(ConfigError::Invalid { message });

        if !(self.api_url.starts_with("http://") || self.api_url.starts_with("https://")) {
            return invalid(format!("api_url must be an http(s) URL, got {:?}", self.api_url));
        }
        if let Err(e) = self.map.center.validate() {
            return invalid(format!("map.center: {e}"));
        }
        if self.map.zoom > MAX_ZOOM {
            return invalid(format!("map.zoom {} exceeds {MAX_ZOOM}", self.map.zoom));
        }
        if self.request_timeout_secs == 0 {
            return invalid("request_timeout_secs must be at least 1".to_string());
        }
        if self.map.width_px == 0 || self.map.height_px == 0 {
            return invalid("map dimensions must be non-zero".to_string());
        }
        if !(self.cluster.grid_size_px.is_finite() && self.cluster.grid_size_px > 0.0) {
            return invalid(format!(
                "cluster.grid_size_px must be positive, got {}",
                self.cluster.grid_size_px
            ));
        }
        if self.cluster.max_zoom > MAX_ZOOM {
            return invalid(format!(
                "cluster.max_zoom {} exceeds {MAX_ZOOM}",
                self.cluster.max_zoom
            ));
        }
        Ok(())
    }
}

/// Recursively overlays `overrides` onto `base`. Nested tables merge key by
/// key; any other value replaces the base value.
fn merge_tables(base: &mut toml::Table, overrides: toml::Table) {
    for (key, value) in overrides {
        match (base.get_mut(&key), value) {
            (Some(toml::Value::Table(existing)), toml::Value::Table(incoming)) => {
                merge_tables(existing, incoming);
            }
            (_, value) => {
                base.insert(key, value);
            }
        }
    }
}
