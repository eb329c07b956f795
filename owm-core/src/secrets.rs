use anyhow::{Context, Result, anyhow};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf};

/// Secrets stored on disk, queried once when a connection is constructed
/// without an explicit credential.
///
/// Example TOML:
/// appid = "0123456789abcdef"
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Secrets {
    /// OpenWeatherMap AppID / API key.
    pub appid: Option<String>,
}

impl Secrets {
    /// Returns the stored AppID; empty strings count as absent.
    pub fn appid(&self) -> Option<&str> {
        self.appid.as_deref().filter(|id| !id.is_empty())
    }

    /// Load secrets from disk, or return an empty default if the file doesn't exist yet.
    pub fn load() -> Result<Self> {
        let path = Self::secrets_file_path()?;
        if !path.exists() {
            // First run: no secrets file, return empty.
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read secrets file: {}", path.display()))?;

        let secrets: Secrets = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse secrets file: {}", path.display()))?;

        Ok(secrets)
    }

    /// Save secrets to disk, creating parent directories as needed.
    pub fn save(&self) -> Result<()> {
        let path = Self::secrets_file_path()?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create secrets directory: {}", parent.display())
            })?;
        }

        let toml = toml::to_string_pretty(self).context("Failed to serialize secrets to TOML")?;

        fs::write(&path, toml)
            .with_context(|| format!("Failed to write secrets file: {}", path.display()))?;

        Ok(())
    }

    /// Path to the secrets file.
    pub fn secrets_file_path() -> Result<PathBuf> {
        let dirs = ProjectDirs::from("dev", "owm-connection", "owm-cli")
            .ok_or_else(|| anyhow!("Could not determine platform config directory"))?;

        Ok(dirs.config_dir().join("secrets.toml"))
    }
}
