//! Application configuration loaded from `config.toml`.

use anyhow::Context;
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::fresnel::DEFAULT_RESOLUTION;
use crate::geodesy::LatLng;
use crate::scene::model::DEFAULT_FREQUENCY_GHZ;
use crate::tiles::projection::{MAX_ZOOM, MIN_ZOOM};

/// Environment variable that overrides the config file location.
pub const CONFIG_PATH_ENV: &str = "FRESNEL_PLANNER_CONFIG";

const DEFAULT_CONFIG_FILE: &str = "config.toml";

/// Endpoints and defaults. Every key is optional; omitted keys take the
/// values from [`AppConfig::default`].
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "kebab-case", default)]
pub struct AppConfig {
    /// Open-Elevation compatible lookup endpoint.
    pub elevation_api_url: String,
    /// HTTP timeout for elevation and tile requests.
    pub request_timeout_secs: u64,
    /// Number of path segments per zone (samples = resolution + 1).
    pub sample_resolution: usize,
    /// Frequency given to newly placed towers.
    pub default_frequency_ghz: f64,
    /// XYZ tile URL template with `{z}`, `{x}` and `{y}` placeholders.
    pub tile_url: String,
    pub tiles_enabled: bool,
    /// Pause between consecutive tile downloads.
    pub tile_request_spacing_ms: u64,
    /// Map center on first start as `[lat, lng]`.
    pub initial_center: [f64; 2],
    pub initial_zoom: u8,
    pub user_agent: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            elevation_api_url: "https://api.open-elevation.com/api/v1/lookup".to_string(),
            request_timeout_secs: 30,
            sample_resolution: DEFAULT_RESOLUTION,
            default_frequency_ghz: DEFAULT_FREQUENCY_GHZ,
            tile_url: "https://tile.openstreetmap.org/{z}/{x}/{y}.png".to_string(),
            tiles_enabled: true,
            tile_request_spacing_ms: 50,
            initial_center: [20.5937, 78.9629],
            initial_zoom: 5,
            user_agent: concat!("fresnel-link-planner/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl AppConfig {
    /// Parse a TOML document, then clamp values into their usable ranges.
    pub fn parse(content: &str) -> anyhow::Result<Self> {
        let config: AppConfig = toml::from_str(content).context("Invalid config format")?;
        Ok(config.sanitized())
    }

    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path).with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::parse(&content).with_context(|| format!("Failed to parse config file {}", path.display()))
    }

    /// `$FRESNEL_PLANNER_CONFIG` if set, otherwise `config.toml` in the working directory.
    pub fn config_path() -> PathBuf {
        std::env::var_os(CONFIG_PATH_ENV).map(PathBuf::from).unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE))
    }

    /// Load the config file if it exists. A missing file selects the defaults
    /// silently; an unreadable or invalid one selects the defaults and returns
    /// a message for the user.
    pub fn load_or_default() -> (Self, Option<String>) {
        let path = Self::config_path();
        if !path.exists() {
            log::debug!("No config file at {}, using defaults", path.display());
            return (Self::default(), None);
        }
        match Self::load(&path) {
            Ok(config) => {
                log::info!("Loaded config from {}", path.display());
                (config, None)
            }
            Err(e) => {
                let message = format!("{:#}. Using default settings.", e);
                log::warn!("{}", message);
                (Self::default(), Some(message))
            }
        }
    }

    pub fn initial_center(&self) -> LatLng {
        LatLng::new(self.initial_center[0], self.initial_center[1])
    }

    fn sanitized(mut self) -> Self {
        self.sample_resolution = self.sample_resolution.max(1);
        if !(self.default_frequency_ghz.is_finite() && self.default_frequency_ghz > 0.0) {
            self.default_frequency_ghz = DEFAULT_FREQUENCY_GHZ;
        }
        self.initial_zoom = self.initial_zoom.clamp(MIN_ZOOM, MAX_ZOOM);
        self.request_timeout_secs = self.request_timeout_secs.max(1);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_yields_defaults() {
        assert_eq!(AppConfig::parse("").unwrap(), AppConfig::default());
    }

    #[test]
    fn kebab_case_keys_override_defaults() {
        let config = AppConfig::parse(
            r#"
            elevation-api-url = "http://localhost:8080/api/v1/lookup"
            sample-resolution = 80
            default-frequency-ghz = 2.4
            tiles-enabled = false
            initial-center = [47.4979, 19.0402]
            initial-zoom = 11
            "#,
        )
        .unwrap();
        assert_eq!(config.elevation_api_url, "http://localhost:8080/api/v1/lookup");
        assert_eq!(config.sample_resolution, 80);
        assert_eq!(config.default_frequency_ghz, 2.4);
        assert!(!config.tiles_enabled);
        assert_eq!(config.initial_center(), LatLng::new(47.4979, 19.0402));
        assert_eq!(config.initial_zoom, 11);
        assert_eq!(config.request_timeout_secs, 30);
    }

    #[test]
    fn out_of_range_values_are_clamped() {
        let config = AppConfig::parse(
            r#"
            sample-resolution = 0
            default-frequency-ghz = -1.0
            initial-zoom = 40
            request-timeout-secs = 0
            "#,
        )
        .unwrap();
        assert_eq!(config.sample_resolution, 1);
        assert_eq!(config.default_frequency_ghz, DEFAULT_FREQUENCY_GHZ);
        assert_eq!(config.initial_zoom, MAX_ZOOM);
        assert_eq!(config.request_timeout_secs, 1);
    }

    #[test]
    fn invalid_toml_is_an_error() {
        let err = AppConfig::parse("sample-resolution = \"many\"").unwrap_err();
        assert!(format!("{:#}", err).contains("Invalid config format"));
    }

    #[test]
    fn missing_file_is_reported_with_its_path() {
        let err = AppConfig::load(Path::new("/definitely/not/here.toml")).unwrap_err();
        assert!(err.to_string().contains("/definitely/not/here.toml"));
    }
}
