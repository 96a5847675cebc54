use crate::git::Identity;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Main configuration structure for gitpad
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Where the content lives and which branches to use
    pub repository: RepositorySettings,
    /// History listing defaults
    pub history: HistorySettings,
    /// Publish commit settings
    pub publish: PublishSettings,
    /// Identity recorded on commits, git's user.name/user.email when absent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<Author>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RepositorySettings {
    /// Path to the content repository
    pub path: PathBuf,
    /// Working line every save lands on
    pub master_branch: String,
    /// Branch published content is collected on
    pub staging_branch: String,
    /// Prefix of the throw-away branch used by selective publishing
    pub temp_branch_prefix: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct HistorySettings {
    /// Number of commits listed when no limit is given
    pub default_limit: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PublishSettings {
    /// Date format string (chrono format) used in publish messages
    pub date_format: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Author {
    pub name: String,
    pub email: String,
}

impl Default for RepositorySettings {
    fn default() -> Self {
        RepositorySettings {
            path: PathBuf::from("."),
            master_branch: "master".to_string(),
            staging_branch: "staging".to_string(),
            temp_branch_prefix: "publish-".to_string(),
        }
    }
}

impl Default for HistorySettings {
    fn default() -> Self {
        HistorySettings { default_limit: 10 }
    }
}

impl Default for PublishSettings {
    fn default() -> Self {
        PublishSettings {
            date_format: "%Y-%m-%d %H:%M".to_string(),
        }
    }
}

impl From<Author> for Identity {
    fn from(author: Author) -> Self {
        Identity {
            name: author.name,
            email: author.email,
        }
    }
}

impl Config {
    /// Get the default configuration file path
    /// Returns ~/.config/gitpad/config.yaml on Unix-like systems
    /// Returns %APPDATA%\gitpad\config.yaml on Windows
    pub fn default_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .context("Could not determine config directory")?
            .join("gitpad");

        Ok(config_dir.join("config.yaml"))
    }

    /// Load configuration from a YAML file
    /// If the file doesn't exist, returns the default configuration
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            return Ok(Config::default());
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Load configuration from the default path
    pub fn load() -> Result<Self> {
        let path = Self::default_path()?;
        Self::load_from_file(path)
    }

    /// Save configuration to a YAML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let yaml = serde_yaml::to_string(self).context("Failed to serialize configuration")?;

        fs::write(path, yaml)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    /// Create a new default configuration file at the default path
    /// Only creates the file if it doesn't already exist
    pub fn init_default() -> Result<PathBuf> {
        let path = Self::default_path()?;

        if path.exists() {
            return Ok(path);
        }

        Config::default().save_to_file(&path)?;

        Ok(path)
    }
}
