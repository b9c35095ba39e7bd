//! Credential Source: where the API secrets file lives, and its contents.
//!
//! Resolution order: `GRIDCHECK_SECRETS`, then `<config dir>/gridcheck/secrets.json`.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::ApiError;

pub const SECRETS_ENV: &str = "GRIDCHECK_SECRETS";

/// API base URL and bearer token.
#[derive(Debug, Clone, Deserialize)]
pub struct Secrets {
    #[serde(alias = "apiUrl")]
    pub api_url: String,
    #[serde(alias = "accessToken")]
    pub token: String,
}

/// Accepts the flat form or the same fields nested under `api`.
#[derive(Deserialize)]
#[serde(untagged)]
enum SecretsFile {
    Flat(Secrets),
    Nested { api: Secrets },
}

impl Secrets {
    pub fn load(path: &Path) -> Result<Self, ApiError> {
        let err = |message: String| ApiError::Secrets { path: Some(path.to_path_buf()), message };
        let contents = std::fs::read_to_string(path).map_err(|e| err(e.to_string()))?;
        let file: SecretsFile = serde_json::from_str(&contents).map_err(|e| err(e.to_string()))?;
        let secrets = match file {
            SecretsFile::Flat(s) | SecretsFile::Nested { api: s } => s,
        };
        if secrets.api_url.trim().is_empty() || secrets.token.trim().is_empty() {
            return Err(err("api_url and token must be non-empty".into()));
        }
        Ok(secrets)
    }
}

pub trait CredentialSource {
    fn secrets_location(&self) -> Result<PathBuf, ApiError>;

    fn load(&self) -> Result<Secrets, ApiError> {
        Secrets::load(&self.secrets_location()?)
    }
}

/// Environment variable, then the per-user config directory.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultCredentials;

impl CredentialSource for DefaultCredentials {
    fn secrets_location(&self) -> Result<PathBuf, ApiError> {
        if let Some(path) = std::env::var_os(SECRETS_ENV).filter(|p| !p.is_empty()) {
            return Ok(PathBuf::from(path));
        }
        default_secrets_path().ok_or_else(|| ApiError::Secrets {
            path: None,
            message: format!("no config directory; set {SECRETS_ENV}"),
        })
    }
}

/// A fixed path, e.g. from a command-line flag.
#[derive(Debug, Clone)]
pub struct SecretsFilePath(pub PathBuf);

impl CredentialSource for SecretsFilePath {
    fn secrets_location(&self) -> Result<PathBuf, ApiError> {
        Ok(self.0.clone())
    }
}

pub fn default_secrets_path() -> Option<PathBuf> {
    dirs::config_dir().map(|c| c.join("gridcheck/secrets.json"))
}
