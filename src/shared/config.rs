use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

use crate::energy::ModelTier;

/// Application configuration
///
/// Every field has a default; CLI flags override whatever is loaded here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Claude data directory holding `projects/`
    pub claude_dir: PathBuf,
    /// Exported conversations archive
    pub conversations_path: PathBuf,
    /// Requested topic cluster count (0 disables clustering)
    pub default_clusters: usize,
    /// Model tier assumed when token counts come from the byte heuristic
    pub default_model_tier: ModelTier,
}

impl Default for Config {
    fn default() -> Self {
        let home = dirs::home_dir().unwrap_or_default();
        Self {
            claude_dir: home.join(".claude"),
            conversations_path: home
                .join(".claude")
                .join("conversations")
                .join("conversations.json"),
            default_clusters: 15,
            default_model_tier: ModelTier::Default,
        }
    }
}

impl Config {
    /// Load configuration from file, falling back to defaults when the file
    /// is missing or unparsable.
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;

        let config = if config_path.exists() {
            let content = fs::read_to_string(&config_path)?;
            serde_json::from_str(&content).unwrap_or_else(|_| {
                let default_config = Config::default();
                let _ = default_config.save();
                default_config
            })
        } else {
            let default_config = Config::default();
            let _ = default_config.save();
            default_config
        };

        Ok(config)
    }

    /// Save configuration to file
    pub fn save(&self) -> Result<()> {
        let config_path = Self::config_path()?;

        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self)?;
        fs::write(&config_path, content)?;
        Ok(())
    }

    /// Get the configuration file path
    fn config_path() -> Result<PathBuf> {
        let home_dir =
            dirs::home_dir().ok_or_else(|| anyhow::anyhow!("Could not find home directory"))?;

        // Use XDG config directory standard or fallback to ~/.config
        let config_dir = if let Ok(xdg_config) = std::env::var("XDG_CONFIG_HOME") {
            PathBuf::from(xdg_config)
        } else {
            home_dir.join(".config")
        };

        Ok(config_dir.join("cc-insights").join("config.json"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.default_clusters, 15);
        assert_eq!(config.default_model_tier, ModelTier::Default);
        assert!(config.claude_dir.ends_with(".claude"));
        assert!(config.conversations_path.ends_with("conversations.json"));
    }

    #[test]
    fn test_config_round_trips_through_json() {
        let config = Config {
            claude_dir: PathBuf::from("/data/claude"),
            conversations_path: PathBuf::from("/data/conversations.json"),
            default_clusters: 8,
            default_model_tier: ModelTier::Opus,
        };
        let serialized = serde_json::to_string(&config).unwrap();
        let parsed: Config = serde_json::from_str(&serialized).unwrap();
        assert_eq!(parsed.default_clusters, 8);
        assert_eq!(parsed.default_model_tier, ModelTier::Opus);
        assert_eq!(parsed.claude_dir, PathBuf::from("/data/claude"));
    }

    #[test]
    fn test_unparsable_config_content_falls_back() {
        let parsed: Result<Config, _> = serde_json::from_str("{not valid json");
        assert!(parsed.is_err());
        // load() substitutes defaults in this case; the fallback value is
        // exactly Config::default()
        let fallback = Config::default();
        assert_eq!(fallback.default_clusters, 15);
    }
}
