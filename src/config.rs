use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_API_URL: &str = "https://med-assyst-ai-server.vercel.app/api/";

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Base URL of the MedAssyst REST API
    pub api_url: String,

    /// Per-request timeout in seconds
    pub request_timeout_secs: u64,

    /// Default tracing filter when RUST_LOG is unset
    pub log_level: String,

    /// Typing reveal tuning
    pub reveal: RevealConfig,

    /// UI preferences
    pub ui: UiConfig,

    /// Directory holding config and session files
    #[serde(skip)]
    pub home: PathBuf,
}

/// Cadence of the simulated typing reveal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RevealConfig {
    pub chars_per_step: usize,
    pub step_interval_ms: u64,
}

/// UI configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UiConfig {
    pub theme: Theme,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, strum::EnumString, strum::AsRefStr)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Theme {
    #[default]
    Dark,
    Light,
}

impl Default for RevealConfig {
    fn default() -> Self {
        Self {
            chars_per_step: 3,
            step_interval_ms: 10,
        }
    }
}

impl RevealConfig {
    pub fn step_interval(&self) -> Duration {
        Duration::from_millis(self.step_interval_ms)
    }
}

impl Default for UiConfig {
    fn default() -> Self {
        Self { theme: Theme::Dark }
    }
}

impl Default for Config {
    fn default() -> Self {
        let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("~"));

        Config {
            api_url: DEFAULT_API_URL.to_string(),
            request_timeout_secs: 30,
            log_level: "info".to_string(),
            reveal: RevealConfig::default(),
            ui: UiConfig::default(),
            home: home.join(".medassyst"),
        }
    }
}

impl Config {
    /// Load configuration from ~/.medassyst/config.toml, applying env overrides
    pub fn load() -> Result<Self> {
        let home = dirs::home_dir().context("Could not find home directory")?;
        Self::load_from(&home.join(".medassyst"))
    }

    /// Load configuration rooted at an explicit directory
    pub fn load_from(home: &Path) -> Result<Self> {
        fs::create_dir_all(home).context("Failed to create .medassyst directory")?;

        let config_path = home.join("config.toml");
        let mut config = if config_path.exists() {
            let content = fs::read_to_string(&config_path).context("Failed to read config file")?;
            toml::from_str::<Config>(&content).context("Failed to parse config file")?
        } else {
            Config::default()
        };

        config.home = home.to_path_buf();
        config.apply_env_overrides();
        config.normalize();

        Ok(config)
    }

    /// Save configuration to file
    pub fn save(&self) -> Result<()> {
        fs::create_dir_all(&self.home).context("Failed to create .medassyst directory")?;
        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        fs::write(self.config_path(), content).context("Failed to write config file")?;
        Ok(())
    }

    pub fn config_path(&self) -> PathBuf {
        self.home.join("config.toml")
    }

    pub fn session_path(&self) -> PathBuf {
        self.home.join("session.json")
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Token supplied through the environment, bypassing the stored session
    pub fn env_token(&self) -> Option<String> {
        std::env::var("MEDASSYST_TOKEN").ok().filter(|t| !t.trim().is_empty())
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(url) = std::env::var("MEDASSYST_API_URL") {
            if !url.trim().is_empty() {
                self.api_url = url;
            }
        }
    }

    fn normalize(&mut self) {
        if !self.api_url.ends_with('/') {
            self.api_url.push('/');
        }
        // a zero step would never finish a reveal
        if self.reveal.chars_per_step == 0 {
            self.reveal.chars_per_step = RevealConfig::default().chars_per_step;
        }
    }
}
