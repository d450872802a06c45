use std::fs;
use std::path::PathBuf;

use anyhow::Result;
use serde::{Deserialize, Serialize};

pub const MIN_TARGET_WPM: u32 = 1;
pub const MAX_TARGET_WPM: u32 = 200;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Config {
    /// Phrases are recorded only above this session average.
    #[serde(default = "default_target_wpm")]
    pub target_wpm: u32,
    #[serde(default = "default_theme")]
    pub theme: String,
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    #[serde(default = "default_log_file")]
    pub log_file: PathBuf,
}

fn default_target_wpm() -> u32 {
    10
}
fn default_theme() -> String {
    "terminal-default".to_string()
}
fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("keystep")
}
fn default_log_file() -> PathBuf {
    default_data_dir().join("keystep.log")
}

impl Default for Config {
    fn default() -> Self {
        Self {
            target_wpm: default_target_wpm(),
            theme: default_theme(),
            data_dir: default_data_dir(),
            log_file: default_log_file(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let path = Self::config_path();
        if path.exists() {
            let content = fs::read_to_string(&path)?;
            let config: Config = toml::from_str(&content)?;
            Ok(config)
        } else {
            Ok(Config::default())
        }
    }

    pub fn save(&self) -> Result<()> {
        let path = Self::config_path();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        fs::write(&path, content)?;
        Ok(())
    }

    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("keystep")
            .join("config.toml")
    }

    /// Clamp `target_wpm` and reset an unknown theme to the default.
    /// Call after deserialization and after CLI overrides.
    pub fn validate(&mut self, valid_themes: &[&str]) {
        let clamped = self.target_wpm.clamp(MIN_TARGET_WPM, MAX_TARGET_WPM);
        if clamped != self.target_wpm {
            tracing::warn!(
                target_wpm = self.target_wpm,
                clamped,
                "target_wpm out of range"
            );
            self.target_wpm = clamped;
        }
        if !valid_themes.contains(&self.theme.as_str()) {
            tracing::warn!(theme = %self.theme, "unknown theme, using default");
            self.theme = default_theme();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const THEMES: &[&str] = &["terminal-default", "catppuccin-mocha"];

    #[test]
    fn test_config_serde_defaults_from_empty() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.target_wpm, 10);
        assert_eq!(config.theme, "terminal-default");
        assert!(config.data_dir.ends_with("keystep"));
        assert!(config.log_file.ends_with("keystep.log"));
    }

    #[test]
    fn test_config_serde_partial_file() {
        let toml_str = r#"
target_wpm = 25
theme = "catppuccin-mocha"
"#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.target_wpm, 25);
        assert_eq!(config.theme, "catppuccin-mocha");
        assert_eq!(config.data_dir, default_data_dir());
    }

    #[test]
    fn test_config_serde_roundtrip() {
        let mut config = Config::default();
        config.data_dir = PathBuf::from("/tmp/keystep-data");
        let serialized = toml::to_string_pretty(&config).unwrap();
        let deserialized: Config = toml::from_str(&serialized).unwrap();
        assert_eq!(config.target_wpm, deserialized.target_wpm);
        assert_eq!(config.data_dir, deserialized.data_dir);
        assert_eq!(config.log_file, deserialized.log_file);
    }

    #[test]
    fn test_validate_clamps_target_wpm() {
        let mut config = Config::default();
        config.target_wpm = 0;
        config.validate(THEMES);
        assert_eq!(config.target_wpm, MIN_TARGET_WPM);

        config.target_wpm = 500;
        config.validate(THEMES);
        assert_eq!(config.target_wpm, MAX_TARGET_WPM);

        config.target_wpm = 42;
        config.validate(THEMES);
        assert_eq!(config.target_wpm, 42);
    }

    #[test]
    fn test_validate_unknown_theme_resets() {
        let mut config = Config::default();
        config.theme = "solarized-neon".to_string();
        config.validate(THEMES);
        assert_eq!(config.theme, "terminal-default");
    }

    #[test]
    fn test_validate_known_theme_unchanged() {
        let mut config = Config::default();
        config.theme = "catppuccin-mocha".to_string();
        config.validate(THEMES);
        assert_eq!(config.theme, "catppuccin-mocha");
    }
}
