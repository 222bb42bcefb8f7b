use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::api::DEFAULT_BASE_URL;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_api_url")]
    pub api_url: String,
    #[serde(default = "default_tick_rate")]
    pub tick_rate_fps: f64,
    #[serde(default = "default_countdown_period_ms")]
    pub countdown_period_ms: u64,
    #[serde(default)]
    pub show_summaries: bool,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_api_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_tick_rate() -> f64 {
    30.0
}

fn default_countdown_period_ms() -> u64 {
    1_000
}

fn default_request_timeout_secs() -> u64 {
    60
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            tick_rate_fps: default_tick_rate(),
            countdown_period_ms: default_countdown_period_ms(),
            show_summaries: false,
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl AppConfig {
    pub fn countdown_period(&self) -> Duration {
        Duration::from_millis(self.countdown_period_ms.max(1))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Parse `api_url`, rejecting anything that is not an absolute http(s) URL.
    pub fn validated_api_url(&self) -> color_eyre::Result<Url> {
        let url = Url::parse(&self.api_url)
            .map_err(|e| color_eyre::eyre::eyre!("invalid api_url {:?}: {e}", self.api_url))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(color_eyre::eyre::eyre!(
                "api_url must be http or https, got {:?}",
                self.api_url
            ));
        }
        Ok(url)
    }
}

fn config_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".config/sumxtui"))
}

/// Return candidate .env paths in priority order.
fn env_file_paths() -> Vec<PathBuf> {
    let mut paths = Vec::new();
    if let Some(dir) = config_dir() {
        paths.push(dir.join(".env"));
    }
    paths.push(PathBuf::from(".env"));
    paths
}

/// Load .env files. Earlier files win because dotenvy does not overwrite
/// variables that are already set, and the real environment wins over all.
pub fn load_env_files() {
    for path in env_file_paths() {
        if path.exists()
            && let Err(e) = dotenvy::from_path(&path)
        {
            tracing::warn!(path = %path.display(), "failed to load env file: {e}");
        }
    }
}

fn parse_config(contents: &str) -> AppConfig {
    toml::from_str(contents).unwrap_or_default()
}

/// Load `~/.config/sumxtui/config.toml`, then apply `SUMX_API_URL`.
pub fn load_config() -> AppConfig {
    load_env_files();

    let mut config = config_dir()
        .map(|dir| dir.join("config.toml"))
        .and_then(|path| fs::read_to_string(path).ok())
        .map(|contents| parse_config(&contents))
        .unwrap_or_default();

    if let Ok(url) = std::env::var("SUMX_API_URL")
        && !url.is_empty()
    {
        config.api_url = url;
    }

    config
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_config_uses_defaults() {
        let config = parse_config("api_url = \"https://sumx.example\"\nshow_summaries = true\n");
        assert_eq!(config.api_url, "https://sumx.example");
        assert!(config.show_summaries);
        assert_eq!(config.countdown_period(), Duration::from_secs(1));
        assert_eq!(config.request_timeout(), Duration::from_secs(60));
    }

    #[test]
    fn test_broken_config_falls_back_to_default() {
        let config = parse_config("api_url = [");
        assert_eq!(config.api_url, DEFAULT_BASE_URL);
    }

    #[test]
    fn test_validated_api_url() {
        let mut config = AppConfig::default();
        assert!(config.validated_api_url().is_ok());

        config.api_url = "not a url".into();
        assert!(config.validated_api_url().is_err());

        config.api_url = "ftp://example.com".into();
        assert!(config.validated_api_url().is_err());
    }
}
