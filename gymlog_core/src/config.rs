//! Configuration file support for gymlog.
//!
//! Configuration is loaded from `$XDG_CONFIG_HOME/gymlog/config.toml`.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Application configuration
#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub data: DataConfig,

    #[serde(default)]
    pub history: HistoryConfig,

    #[serde(default)]
    pub bot: BotConfig,
}

/// Data storage configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DataConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
        }
    }
}

impl DataConfig {
    /// Directory holding one cached in-progress session per user
    pub fn sessions_dir(&self) -> PathBuf {
        self.data_dir.join("sessions")
    }
}

/// History query windows
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct HistoryConfig {
    /// Window used by history listings when no bounds are given
    #[serde(default = "default_window_days")]
    pub default_window_days: i64,

    /// How far back progression series reach
    #[serde(default = "default_progression_lookback_days")]
    pub progression_lookback_days: i64,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            default_window_days: default_window_days(),
            progression_lookback_days: default_progression_lookback_days(),
        }
    }
}

/// Conversation front-end configuration
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct BotConfig {
    /// Credited in the greeting when set
    #[serde(default)]
    pub author_name: Option<String>,

    /// Muscle groups offered in pickers and accepted when creating exercises
    #[serde(default = "default_muscle_groups")]
    pub muscle_groups: Vec<String>,

    #[serde(default = "default_page_size")]
    pub page_size: usize,

    /// Distinct session dates shown as "last sets" when an exercise is picked
    #[serde(default = "default_last_sets_days")]
    pub last_sets_days: usize,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            author_name: None,
            muscle_groups: default_muscle_groups(),
            page_size: default_page_size(),
            last_sets_days: default_last_sets_days(),
        }
    }
}

// Default value functions
fn default_data_dir() -> PathBuf {
    let base = dirs::data_local_dir()
        .or_else(|| dirs::home_dir().map(|home| home.join(".local/share")))
        .unwrap_or_else(|| PathBuf::from("."));
    base.join("gymlog")
}

fn default_window_days() -> i64 {
    14
}

fn default_progression_lookback_days() -> i64 {
    365
}

fn default_muscle_groups() -> Vec<String> {
    vec!["back".into(), "chest".into(), "legs".into(), "arms".into()]
}

fn default_page_size() -> usize {
    5
}

fn default_last_sets_days() -> usize {
    3
}

impl Config {
    /// Load configuration from the standard config path
    pub fn load() -> Result<Self> {
        let config_path = Self::default_config_path();
        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            tracing::info!(
                "No config file found at {:?}, using defaults",
                config_path
            );
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        tracing::info!("Loaded config from {:?}", path);
        Ok(config)
    }

    /// Reject values the router and service cannot work with
    pub fn validate(&self) -> Result<()> {
        if self.bot.page_size == 0 {
            return Err(Error::Config("bot.page_size must be positive".into()));
        }
        if self.bot.muscle_groups.is_empty() {
            return Err(Error::Config("bot.muscle_groups must not be empty".into()));
        }
        if self.bot.muscle_groups.iter().any(|g| g.contains(':') || g.trim().is_empty()) {
            return Err(Error::Config(
                "bot.muscle_groups entries must be non-empty and contain no ':'".into(),
            ));
        }
        if self.history.default_window_days < 0 || self.history.progression_lookback_days < 0 {
            return Err(Error::Config("history windows must not be negative".into()));
        }
        Ok(())
    }

    /// Get the default config file path
    pub fn default_config_path() -> PathBuf {
        let base = dirs::config_dir()
            .or_else(|| dirs::home_dir().map(|home| home.join(".config")))
            .unwrap_or_else(|| PathBuf::from("."));
        base.join("gymlog").join("config.toml")
    }

    /// Save the current configuration to the default path
    pub fn save(&self) -> Result<()> {
        let config_path = Self::default_config_path();
        self.save_to(&config_path)
    }

    /// Save the current configuration to a specific path
    pub fn save_to(&self, path: &Path) -> Result<()> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, contents)?;
        tracing::info!("Saved config to {:?}", path);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.history.default_window_days, 14);
        assert_eq!(config.history.progression_lookback_days, 365);
        assert_eq!(config.bot.page_size, 5);
        assert_eq!(config.bot.last_sets_days, 3);
        assert!(config.bot.author_name.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_roundtrip() {
        let mut config = Config::default();
        config.bot.author_name = Some("Coach".into());
        let toml_str = toml::to_string(&config).unwrap();
        let parsed: Config = toml::from_str(&toml_str).unwrap();

        assert_eq!(config.bot, parsed.bot);
        assert_eq!(config.history, parsed.history);
    }

    #[test]
    fn test_partial_config() {
        let toml_str = r#"
[bot]
page_size = 8
"#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.bot.page_size, 8);
        assert_eq!(config.bot.last_sets_days, 3); // default
        assert_eq!(config.history.default_window_days, 14);
    }

    #[test]
    fn test_save_and_load_from() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("gymlog/config.toml");

        let mut config = Config::default();
        config.data.data_dir = temp_dir.path().join("data");
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.data.data_dir, temp_dir.path().join("data"));
        assert_eq!(loaded.data.sessions_dir(), temp_dir.path().join("data/sessions"));
    }

    #[test]
    fn test_invalid_page_size_rejected() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("config.toml");
        std::fs::write(&path, "[bot]\npage_size = 0\n").unwrap();

        let err = Config::load_from(&path).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }
}
