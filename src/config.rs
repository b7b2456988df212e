//! Engine configuration parsing (`~/.wsnap/config.toml`)
//!
//! Configuration is read once by the host and passed explicitly into the
//! adapters. The pinning credential is only ever taken from this value.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use url::Url;

use crate::snapshot::{IgnoreRules, SerializerOptions, DEFAULT_MAX_FILES, DEFAULT_MAX_FILE_BYTES};
use crate::snapshot::ignore::DEFAULT_IGNORE_PATTERNS;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Config file not found: {0}")]
    NotFound(String),
    #[error("Failed to read config: {0}")]
    ReadError(String),
    #[error("Failed to parse config: {0}")]
    ParseError(String),
    #[error("Missing credential: {0}")]
    MissingCredential(String),
    #[error("Invalid URL for {0}")]
    InvalidUrl(String),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct EngineConfig {
    #[serde(default)]
    pub store: StoreSection,
    #[serde(default)]
    pub pinning: PinningConfig,
    #[serde(default)]
    pub local: LocalSection,
    #[serde(default)]
    pub registry: RegistrySection,
    #[serde(default)]
    pub scan: ScanSection,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StoreKind {
    #[default]
    Pinning,
    Local,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct StoreSection {
    #[serde(default)]
    pub kind: StoreKind,
}

/// Pinning service endpoint and credential
///
/// The credential is never serialized and is redacted from `Debug` output.
#[derive(Clone, Serialize, Deserialize)]
pub struct PinningConfig {
    #[serde(default = "default_api_url")]
    pub api_url: String,
    #[serde(default = "default_gateway_url")]
    pub gateway_url: String,
    #[serde(default, skip_serializing)]
    pub jwt: Option<String>,
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

impl Default for PinningConfig {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            gateway_url: default_gateway_url(),
            jwt: None,
            timeout_secs: default_timeout(),
        }
    }
}

impl fmt::Debug for PinningConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PinningConfig")
            .field("api_url", &self.api_url)
            .field("gateway_url", &self.gateway_url)
            .field("jwt", &self.jwt.as_ref().map(|_| "<redacted>"))
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

fn default_api_url() -> String {
    "https://api.pinata.cloud".to_string()
}

fn default_gateway_url() -> String {
    "https://gateway.pinata.cloud".to_string()
}

fn default_timeout() -> u64 {
    60
}

impl PinningConfig {
    /// The bearer token; absent or blank is an error
    pub fn credential(&self) -> Result<&str, ConfigError> {
        match self.jwt.as_deref().map(str::trim) {
            Some(jwt) if !jwt.is_empty() => Ok(jwt),
            _ => Err(ConfigError::MissingCredential(
                "pinning.jwt is not set".to_string(),
            )),
        }
    }

    pub fn api_url(&self) -> Result<Url, ConfigError> {
        parse_http_url("pinning.api_url", &self.api_url)
    }

    pub fn gateway_url(&self) -> Result<Url, ConfigError> {
        parse_http_url("pinning.gateway_url", &self.gateway_url)
    }
}

fn parse_http_url(field: &str, value: &str) -> Result<Url, ConfigError> {
    let url = Url::parse(value).map_err(|e| ConfigError::InvalidUrl(format!("{}: {}", field, e)))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(ConfigError::InvalidUrl(format!(
            "{}: unsupported scheme '{}'",
            field, other
        ))),
    }
}

/// `[local]`: directory store used when `store.kind = "local"`.
///
/// This store deletes a superseded blob when it is unpinned, so only the
/// current snapshot of each workspace stays restorable.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct LocalSection {
    pub dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct RegistrySection {
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanSection {
    #[serde(default = "default_ignore")]
    pub ignore: Vec<String>,
    #[serde(default = "default_max_files")]
    pub max_files: usize,
    #[serde(default = "default_max_file_bytes")]
    pub max_file_bytes: u64,
}

impl Default for ScanSection {
    fn default() -> Self {
        Self {
            ignore: default_ignore(),
            max_files: default_max_files(),
            max_file_bytes: default_max_file_bytes(),
        }
    }
}

fn default_ignore() -> Vec<String> {
    DEFAULT_IGNORE_PATTERNS.iter().map(|s| s.to_string()).collect()
}

fn default_max_files() -> usize {
    DEFAULT_MAX_FILES
}

fn default_max_file_bytes() -> u64 {
    DEFAULT_MAX_FILE_BYTES
}

impl EngineConfig {
    /// `~/.wsnap`
    pub fn home_dir() -> Result<PathBuf, ConfigError> {
        dirs::home_dir()
            .map(|home| home.join(".wsnap"))
            .ok_or_else(|| ConfigError::Invalid("cannot determine home directory".to_string()))
    }

    pub fn default_path() -> Result<PathBuf, ConfigError> {
        Ok(Self::home_dir()?.join("config.toml"))
    }

    /// Load config from an explicit file; a missing file is an error
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.display().to_string()));
        }
        let content =
            fs::read_to_string(path).map_err(|e| ConfigError::ReadError(e.to_string()))?;
        Self::parse(&content)
    }

    /// Load the default config file, or defaults if it does not exist
    pub fn load_default() -> Result<Self, ConfigError> {
        let path = Self::default_path()?;
        if !path.exists() {
            return Ok(Self::default());
        }
        Self::load(&path)
    }

    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let config: Self =
            toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.scan.max_files == 0 {
            return Err(ConfigError::Invalid("scan.max_files must be > 0".to_string()));
        }
        if self.pinning.timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "pinning.timeout_secs must be > 0".to_string(),
            ));
        }
        Ok(())
    }

    pub fn serializer_options(&self) -> SerializerOptions {
        SerializerOptions {
            ignore: IgnoreRules::new(&self.scan.ignore),
            max_files: self.scan.max_files,
            max_file_bytes: self.scan.max_file_bytes,
        }
    }

    pub fn blob_dir(&self) -> Result<PathBuf, ConfigError> {
        match &self.local.dir {
            Some(dir) => Ok(dir.clone()),
            None => Ok(Self::home_dir()?.join("blobs")),
        }
    }

    pub fn registry_path(&self) -> Result<PathBuf, ConfigError> {
        match &self.registry.path {
            Some(path) => Ok(path.clone()),
            None => Ok(Self::home_dir()?.join("pointers.json")),
        }
    }
}
