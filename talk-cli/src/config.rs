//! Settings and configuration management for talk-cli.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use talk_client::ClientConfig;

const SETTINGS_FILE: &str = "settings.json";
const CLIENT_CONFIG_FILE: &str = "client.toml";

/// Login settings stored locally.
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    /// Identifier used for the last login (kept only when remembered).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identifier: Option<String>,
    /// Secret used for the last login (kept only when remembered).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret: Option<String>,
    /// Session token from the last successful login.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth_token: Option<String>,
    /// Whether the identifier and secret are remembered.
    #[serde(default)]
    pub remember: bool,
}

impl fmt::Debug for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Settings")
            .field("identifier", &self.identifier)
            .field("secret", &self.secret.as_ref().map(|_| "<redacted>"))
            .field("auth_token", &self.auth_token.as_ref().map(|_| "<redacted>"))
            .field("remember", &self.remember)
            .finish()
    }
}

impl Settings {
    /// Load settings from a directory. A missing file yields defaults.
    pub async fn load(data_dir: &Path) -> Result<Self> {
        let path = data_dir.join(SETTINGS_FILE);
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents = tokio::fs::read_to_string(&path)
            .await
            .context("Failed to read settings")?;
        serde_json::from_str(&contents).context("Invalid settings file")
    }

    /// Save settings to a directory.
    pub async fn save(&self, data_dir: &Path) -> Result<()> {
        let path = data_dir.join(SETTINGS_FILE);
        let contents = serde_json::to_string_pretty(self)?;
        tokio::fs::write(&path, contents)
            .await
            .context("Failed to save settings")?;
        set_file_permissions_0600(&path).await?;
        Ok(())
    }

    /// Record a successful login.
    ///
    /// The identifier and secret are kept only when `remember` is set.
    pub fn record_login(&mut self, identifier: &str, secret: &str, token: String, remember: bool) {
        self.auth_token = Some(token);
        self.remember = remember;
        if remember {
            self.identifier = Some(identifier.to_string());
            self.secret = Some(secret.to_string());
        } else {
            self.identifier = None;
            self.secret = None;
        }
    }

    /// Remembered secret for `identifier`, if any.
    pub fn remembered_secret(&self, identifier: &str) -> Option<&str> {
        if !self.remember || self.identifier.as_deref() != Some(identifier) {
            return None;
        }
        self.secret.as_deref()
    }

    /// Stored session token, or an error telling the user to log in.
    pub fn require_token(&self) -> Result<&str> {
        self.auth_token
            .as_deref()
            .context("Not logged in. Run 'talk-cli login' first.")
    }
}

/// Load the client configuration.
///
/// An explicit path must exist. Otherwise `client.toml` in the data directory
/// is used when present, else defaults.
pub fn load_client_config(data_dir: &Path, explicit: Option<&Path>) -> Result<ClientConfig> {
    if let Some(path) = explicit {
        return ClientConfig::from_file(path)
            .with_context(|| format!("Failed to load {}", path.display()));
    }

    let path = data_dir.join(CLIENT_CONFIG_FILE);
    if path.exists() {
        ClientConfig::from_file(&path)
            .with_context(|| format!("Failed to load {}", path.display()))
    } else {
        Ok(ClientConfig::default())
    }
}

/// Set file permissions to 0600 (owner read/write only) on Unix.
/// No-op on non-Unix platforms.
async fn set_file_permissions_0600(path: &Path) -> Result<()> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        tokio::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))
            .await
            .context("Failed to set file permissions")?;
    }
    #[cfg(not(unix))]
    {
        let _ = path;
    }
    Ok(())
}

/// Set directory permissions to 0700 (owner only) on Unix.
/// No-op on non-Unix platforms.
pub async fn set_dir_permissions_0700(path: &Path) -> Result<()> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        tokio::fs::set_permissions(path, std::fs::Permissions::from_mode(0o700))
            .await
            .context("Failed to set directory permissions")?;
    }
    #[cfg(not(unix))]
    {
        let _ = path;
    }
    Ok(())
}
