//! Application configuration: a small JSON file with sane defaults, created
//! on first run so operators have something to edit.

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::infrastructure::http_client::HttpClientConfig;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Path of the SQLite database file.
    pub database_path: String,
    pub http: HttpClientConfig,
    /// Delay between consecutive song-page fetches.
    pub scrape_delay_ms: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database_path: "./hymns.db".to_string(),
            http: HttpClientConfig::default(),
            scrape_delay_ms: 1000,
        }
    }
}

impl AppConfig {
    /// Load the config file, writing defaults first if it does not exist.
    pub async fn load_or_create(path: &Path) -> Result<Self> {
        if !path.exists() {
            let config = Self::default();
            config.save(path).await?;
            return Ok(config);
        }
        let text = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("failed to read config at {}", path.display()))?;
        serde_json::from_str(&text)
            .with_context(|| format!("invalid config at {}", path.display()))
    }

    pub async fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await.ok();
        }
        let text = serde_json::to_string_pretty(self).context("failed to serialize config")?;
        tokio::fs::write(path, text)
            .await
            .with_context(|| format!("failed to write config at {}", path.display()))?;
        Ok(())
    }
}
