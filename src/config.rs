// Configuration module: the single persisted record the CLI works from,
// the rules that pick the active instance URL and token out of it, and the
// TOML file backend that loads and stores it.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::debug;
use url::Url;

use crate::error::ApiError;

/// Instance used when the user has not configured one.
pub const DEFAULT_INSTANCE_URL: &str = "http://localhost:8000";

/// Name of the settings file inside the config directory.
pub const SETTINGS_FILE: &str = "settings.toml";

const ALLOWED_SCHEMES: [&str; 2] = ["http", "https"];

/// Persisted client settings. Loaded once per invocation and passed
/// explicitly to whatever needs it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Configuration {
    pub default_instance_url: String,
    /// Overrides `default_instance_url` when non-empty.
    pub custom_instance_url: String,
    /// Absent until a login succeeds.
    pub auth_token: Option<String>,
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            default_instance_url: DEFAULT_INSTANCE_URL.to_string(),
            custom_instance_url: String::new(),
            auth_token: None,
        }
    }
}

/// Requested changes for `update_config`. `None` means "leave as is".
#[derive(Debug, Clone, Default)]
pub struct ConfigUpdate {
    pub instance_url: Option<String>,
    pub token: Option<String>,
}

/// Fields touched by a successful `update_config`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdatedField {
    InstanceUrl,
    Token,
}

impl fmt::Display for UpdatedField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UpdatedField::InstanceUrl => write!(f, "instance URL"),
            UpdatedField::Token => write!(f, "token"),
        }
    }
}

/// The instance every request goes to: the custom URL if set, otherwise
/// the default. The two are never combined.
pub fn effective_instance_url(config: &Configuration) -> &str {
    if config.custom_instance_url.is_empty() {
        &config.default_instance_url
    } else {
        &config.custom_instance_url
    }
}

pub fn effective_token(config: &Configuration) -> Option<&str> {
    config.auth_token.as_deref()
}

/// Check that `candidate` names an explicit http(s) scheme and parses as a
/// URL. Returns the parsed URL on success.
pub fn validate_scheme(candidate: &str) -> Result<Url, ApiError> {
    let scheme = split_scheme(candidate).ok_or(ApiError::MissingScheme)?;
    let scheme = scheme.to_ascii_lowercase();
    if !ALLOWED_SCHEMES.contains(&scheme.as_str()) {
        return Err(ApiError::UnsupportedScheme(scheme));
    }
    Url::parse(candidate).map_err(|e| ApiError::InvalidUrl {
        url: candidate.to_string(),
        reason: e.to_string(),
    })
}

// Scheme per RFC 3986: ALPHA *( ALPHA / DIGIT / "+" / "-" / "." ) followed by ':'.
fn split_scheme(candidate: &str) -> Option<&str> {
    let (scheme, _) = candidate.trim().split_once(':')?;
    let mut chars = scheme.chars();
    let first = chars.next()?;
    if !first.is_ascii_alphabetic() {
        return None;
    }
    if chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.')) {
        Some(scheme)
    } else {
        None
    }
}

/// Apply `update` to a copy of `config`. The instance URL is validated
/// before anything else is touched, so a failure leaves nothing changed.
/// An empty updated-set means the caller must not write to storage.
pub fn update_config(
    config: &Configuration,
    update: ConfigUpdate,
) -> Result<(Configuration, Vec<UpdatedField>), ApiError> {
    let mut next = config.clone();
    let mut updated = Vec::new();

    if let Some(instance_url) = update.instance_url.filter(|u| !u.is_empty()) {
        validate_scheme(&instance_url)?;
        next.custom_instance_url = instance_url;
        updated.push(UpdatedField::InstanceUrl);
    }

    if let Some(token) = update.token.filter(|t| !t.is_empty()) {
        next.auth_token = Some(token);
        updated.push(UpdatedField::Token);
    }

    Ok((next, updated))
}

/// Persistence backend for `Configuration`.
pub trait ConfigurationStore {
    fn load(&self) -> Result<Configuration>;
    fn save(&self, config: &Configuration) -> Result<()>;

    /// Where the settings live, for display. Not every backend has a path.
    fn location(&self) -> Option<&Path> {
        None
    }
}

// On-disk layout of settings.toml.
#[derive(Serialize, Deserialize, Debug, Default)]
struct SettingsFile {
    #[serde(default)]
    default: InstanceSection,
    #[serde(default)]
    custom: InstanceSection,
    #[serde(default)]
    authentication: AuthSection,
}

#[derive(Serialize, Deserialize, Debug, Default)]
struct InstanceSection {
    #[serde(default)]
    instance_url: String,
}

#[derive(Serialize, Deserialize, Debug, Default)]
struct AuthSection {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    token: Option<String>,
}

impl From<SettingsFile> for Configuration {
    fn from(file: SettingsFile) -> Self {
        let default_instance_url = if file.default.instance_url.is_empty() {
            DEFAULT_INSTANCE_URL.to_string()
        } else {
            file.default.instance_url
        };
        Configuration {
            default_instance_url,
            custom_instance_url: file.custom.instance_url,
            auth_token: file.authentication.token.filter(|t| !t.is_empty()),
        }
    }
}

impl From<&Configuration> for SettingsFile {
    fn from(config: &Configuration) -> Self {
        SettingsFile {
            default: InstanceSection { instance_url: config.default_instance_url.clone() },
            custom: InstanceSection { instance_url: config.custom_instance_url.clone() },
            authentication: AuthSection { token: config.auth_token.clone() },
        }
    }
}

/// Stores the configuration as a TOML document at a fixed path.
#[derive(Debug, Clone)]
pub struct TomlFileStore {
    path: PathBuf,
}

impl TomlFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `<config dir>/lnkshrt/settings.toml`, falling back to the working
    /// directory when the platform has no config dir.
    pub fn default_path() -> PathBuf {
        let dir = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
        dir.join("lnkshrt").join(SETTINGS_FILE)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ConfigurationStore for TomlFileStore {
    /// A missing file is not an error: it loads as the default configuration.
    fn load(&self) -> Result<Configuration> {
        if !self.path.exists() {
            debug!(path = %self.path.display(), "no settings file, using defaults");
            return Ok(Configuration::default());
        }
        let contents = std::fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read settings from {}", self.path.display()))?;
        let file: SettingsFile = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse settings in {}", self.path.display()))?;
        Ok(file.into())
    }

    fn save(&self, config: &Configuration) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).context("Failed to create config directory")?;
        }
        let contents = toml::to_string_pretty(&SettingsFile::from(config))
            .context("Failed to serialize settings")?;
        std::fs::write(&self.path, contents)
            .with_context(|| format!("Failed to write settings to {}", self.path.display()))?;
        debug!(path = %self.path.display(), "settings saved");
        Ok(())
    }

    fn location(&self) -> Option<&Path> {
        Some(&self.path)
    }
}
