use crate::events::Preferences;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const ENDPOINT_ENV: &str = "CHATBITE_ENDPOINT";
pub const DOWNLOAD_DIR_ENV: &str = "CHATBITE_DOWNLOAD_DIR";

/// Main application configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Recipe chat endpoint (POST, JSON)
    pub endpoint: String,

    /// Where downloaded recipes are written
    pub download_dir: PathBuf,

    /// Request timeout in seconds, 0 disables it
    pub request_timeout_secs: u64,

    /// How long a notice stays on screen
    pub notice_millis: u64,

    /// Render replies as markdown; plain text when off
    pub render_markdown: bool,

    /// Preferences selected when a session starts
    pub preferences: Preferences,

    /// ChatBite home directory
    #[serde(skip)]
    pub chatbite_home: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("~"));
        let download_dir = dirs::download_dir()
            .or_else(|| std::env::current_dir().ok())
            .unwrap_or_else(|| PathBuf::from("."));

        Config {
            endpoint: "http://127.0.0.1:5000/api/chat".to_string(),
            download_dir,
            request_timeout_secs: 0,
            notice_millis: 3200,
            render_markdown: true,
            preferences: Preferences::default(),
            chatbite_home: home.join(".chatbite"),
        }
    }
}

impl Config {
    /// Load configuration from `~/.chatbite/config.toml`, creating it with
    /// defaults on first run, then apply environment overrides.
    pub fn load() -> Result<Self> {
        let mut config = Self::load_stored()?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Configuration exactly as stored on disk, without environment overrides.
    pub fn load_stored() -> Result<Self> {
        let home = dirs::home_dir().context("Could not find home directory")?;
        Self::load_from(&home.join(".chatbite"))
    }

    /// Load configuration rooted at an explicit home directory.
    pub fn load_from(chatbite_home: &Path) -> Result<Self> {
        fs::create_dir_all(chatbite_home)
            .context("Failed to create .chatbite directory")?;

        let config_path = chatbite_home.join("config.toml");
        let mut config = if config_path.exists() {
            let content = fs::read_to_string(&config_path)
                .context("Failed to read config file")?;
            toml::from_str(&content).context("Failed to parse config file")?
        } else {
            let config = Config {
                chatbite_home: chatbite_home.to_path_buf(),
                ..Config::default()
            };
            config.save()?;
            config
        };

        config.chatbite_home = chatbite_home.to_path_buf();
        Ok(config)
    }

    /// Save configuration to file
    pub fn save(&self) -> Result<()> {
        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        fs::write(self.config_path(), content).context("Failed to write config file")?;
        Ok(())
    }

    pub fn config_path(&self) -> PathBuf {
        self.chatbite_home.join("config.toml")
    }

    pub fn log_path(&self) -> PathBuf {
        self.chatbite_home.join("chatbite.log")
    }

    fn apply_env_overrides(&mut self) {
        self.apply_overrides(
            std::env::var(ENDPOINT_ENV).ok(),
            std::env::var(DOWNLOAD_DIR_ENV).ok(),
        );
    }

    fn apply_overrides(&mut self, endpoint: Option<String>, download_dir: Option<String>) {
        if let Some(endpoint) = endpoint.filter(|value| !value.trim().is_empty()) {
            self.endpoint = endpoint.trim().to_string();
        }
        if let Some(dir) = download_dir.filter(|value| !value.trim().is_empty()) {
            self.download_dir = PathBuf::from(dir.trim());
        }
    }

    /// Update the endpoint
    pub fn set_endpoint(&mut self, endpoint: String) {
        self.endpoint = endpoint;
    }

    /// Update the download directory
    pub fn set_download_dir(&mut self, dir: PathBuf) {
        self.download_dir = dir;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{MealType, SkillLevel};

    #[test]
    fn first_load_writes_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_from(dir.path()).unwrap();

        assert!(dir.path().join("config.toml").exists());
        assert_eq!(config.notice_millis, 3200);
        assert_eq!(config.chatbite_home, dir.path());
    }

    #[test]
    fn saved_changes_survive_reload() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::load_from(dir.path()).unwrap();
        config.set_endpoint("http://kitchen.local/api/chat".to_string());
        config.preferences.meal_type = MealType::Dinner;
        config.preferences.skill_level = SkillLevel::Beginner;
        config.save().unwrap();

        let reloaded = Config::load_from(dir.path()).unwrap();
        assert_eq!(reloaded, config);
    }

    #[test]
    fn partial_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("config.toml"), "render_markdown = false\n").unwrap();

        let config = Config::load_from(dir.path()).unwrap();
        assert!(!config.render_markdown);
        assert_eq!(config.notice_millis, 3200);
        assert_eq!(config.preferences, Preferences::default());
    }

    #[test]
    fn overrides_ignore_blank_values() {
        let mut config = Config::default();
        let original = config.endpoint.clone();
        config.apply_overrides(Some("  ".to_string()), None);
        assert_eq!(config.endpoint, original);

        config.apply_overrides(
            Some("http://other/api/chat".to_string()),
            Some("/tmp/recipes".to_string()),
        );
        assert_eq!(config.endpoint, "http://other/api/chat");
        assert_eq!(config.download_dir, PathBuf::from("/tmp/recipes"));
    }
}
