//! Blocking raster tile downloader.

use reqwest::blocking::Client;
use std::time::Duration;

use super::projection::TileKey;
use crate::config::AppConfig;

pub struct TileClient {
    client: Client,
    url_template: String,
}

impl TileClient {
    /// Tile servers such as tile.openstreetmap.org reject requests without an
    /// identifying User-Agent, so the configured one is always sent.
    pub fn new(config: &AppConfig) -> Result<Self, String> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| format!("Failed to create HTTP client: {}", e))?;

        Ok(Self {
            client,
            url_template: config.tile_url.clone(),
        })
    }

    /// Download the encoded image bytes for one tile.
    pub fn fetch(&self, key: TileKey) -> Result<Vec<u8>, String> {
        let url = key.url(&self.url_template);
        let response = self.client.get(&url).send().map_err(|e| format!("Request failed for {}: {}", url, e))?;
        let status = response.status();
        if !status.is_success() {
            return Err(format!("Tile server returned {} for {}", status, url));
        }
        let bytes = response.bytes().map_err(|e| format!("Failed to read tile {}: {}", url, e))?;
        Ok(bytes.to_vec())
    }
}
