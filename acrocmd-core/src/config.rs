use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{CommanderError, Result};

/// File name of the config file inside `~/.config`
pub const CONFIG_FILE_NAME: &str = "acro-commander.config.json";

/// Connection settings for the checking service
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    pub server_address: String,
    pub access_token: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub guidance_profile: Option<String>,
}

/// On-disk shape before validation; every field may be absent
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawConfig {
    server_address: Option<String>,
    access_token: Option<String>,
    guidance_profile: Option<String>,
}

impl Config {
    /// Load config from ~/.config/acro-commander.config.json
    pub fn load() -> Result<Self> {
        Self::load_from(Self::config_path())
    }

    /// Load config from an explicit path
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|err| {
            if err.kind() == std::io::ErrorKind::NotFound {
                CommanderError::ConfigNotFound {
                    path: path.to_path_buf(),
                }
            } else {
                CommanderError::from(err)
            }
        })?;
        Self::from_json(&content)
    }

    /// Parse and validate config JSON
    ///
    /// `accessToken` is checked before `serverAddress`; empty strings count
    /// as missing.
    pub fn from_json(content: &str) -> Result<Self> {
        let raw: RawConfig = serde_json::from_str(content)
            .map_err(|err| CommanderError::json("config file", err))?;

        let access_token = non_empty(raw.access_token)
            .ok_or_else(|| CommanderError::missing_config_field("accessToken"))?;
        let server_address = non_empty(raw.server_address)
            .ok_or_else(|| CommanderError::missing_config_field("serverAddress"))?;

        Ok(Self {
            server_address,
            access_token,
            guidance_profile: non_empty(raw.guidance_profile),
        })
    }

    /// Get config file path: ~/.config/acro-commander.config.json
    pub fn config_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".config")
            .join(CONFIG_FILE_NAME)
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}
