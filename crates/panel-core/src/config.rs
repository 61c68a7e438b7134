use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use anyhow::{Context, Result, anyhow};

use crate::evaluation::{RatingScale, DEFAULT_TURN_TIMEOUT};

const APP_DIR: &str = "interview-panel";

fn default_turn_timeout_secs() -> u64 {
    DEFAULT_TURN_TIMEOUT.as_secs()
}

fn default_rating_min() -> f64 {
    1.0
}

fn default_rating_max() -> f64 {
    10.0
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Config {
    pub provider: Option<String>,
    pub default_model: Option<String>,
    pub claude_api_key: Option<String>,
    pub openai_api_key: Option<String>,
    /// Base URL of a chat service speaking the turn protocol directly
    #[serde(default)]
    pub chat_endpoint: Option<String>,
    #[serde(default)]
    pub ollama_url: Option<String>,
    /// Base URL of the interview/expert REST API
    #[serde(default)]
    pub api_base_url: Option<String>,
    #[serde(default)]
    pub api_token: Option<String>,
    #[serde(default = "default_turn_timeout_secs")]
    pub turn_timeout_secs: u64,
    #[serde(default = "default_rating_min")]
    pub rating_min: f64,
    #[serde(default = "default_rating_max")]
    pub rating_max: f64,
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

impl Config {
    pub fn new() -> Self {
        Self {
            provider: Some("ollama".to_string()),
            default_model: None,
            claude_api_key: None,
            openai_api_key: None,
            chat_endpoint: None,
            ollama_url: None,
            api_base_url: None,
            api_token: None,
            turn_timeout_secs: default_turn_timeout_secs(),
            rating_min: default_rating_min(),
            rating_max: default_rating_max(),
        }
    }

    pub fn load() -> Result<Self> {
        Self::load_from(&Self::get_config_path()?)
    }

    /// Read the config at `path`, falling back to defaults if it doesn't exist
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::new());
        }

        let config_content = fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        let config: Config = serde_json::from_str(&config_content)
            .with_context(|| format!("parsing {}", path.display()))?;
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::get_config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        // Create config directory if it doesn't exist
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let config_content = serde_json::to_string_pretty(self)?;
        fs::write(path, config_content)?;
        Ok(())
    }

    pub fn turn_timeout(&self) -> Duration {
        Duration::from_secs(self.turn_timeout_secs.max(1))
    }

    pub fn rating_scale(&self) -> Result<RatingScale> {
        RatingScale::new(self.rating_min, self.rating_max).map_err(|e| anyhow!("{}", e))
    }

    pub fn config_dir() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow!("Could not determine config directory"))?;

        Ok(config_dir.join(APP_DIR))
    }

    fn get_config_path() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join("config.json"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn missing_file_gives_defaults() {
        let dir = TempDir::new().unwrap();
        let config = Config::load_from(&dir.path().join("config.json")).unwrap();
        assert_eq!(config, Config::new());
        assert_eq!(config.turn_timeout(), Duration::from_secs(15));
        assert_eq!(config.rating_scale().unwrap(), RatingScale::default());
    }

    #[test]
    fn save_then_load_keeps_settings() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("config.json");

        let mut config = Config::new();
        config.provider = Some("endpoint".to_string());
        config.chat_endpoint = Some("http://localhost:8080".to_string());
        config.api_token = Some("secret".to_string());
        config.turn_timeout_secs = 30;
        config.save_to(&path).unwrap();

        assert_eq!(Config::load_from(&path).unwrap(), config);
    }

    #[test]
    fn older_config_files_fill_in_new_fields() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        fs::write(
            &path,
            r#"{"provider":"claude","default_model":"claude-3-5-haiku-20241022","claude_api_key":null,"openai_api_key":null}"#,
        )
        .unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.provider.as_deref(), Some("claude"));
        assert_eq!(config.turn_timeout_secs, 15);
        assert_eq!(config.rating_max, 10.0);
    }

    #[test]
    fn inverted_rating_scale_is_rejected() {
        let mut config = Config::new();
        config.rating_min = 10.0;
        config.rating_max = 1.0;
        assert!(config.rating_scale().is_err());
    }
}
