use std::path::PathBuf;

use anyhow::Context;
use serde::Deserialize;

/// Passphrase used when `CREDENTIAL_PASSPHRASE` is not set. Only acceptable
/// for local development; deployments must override it.
pub const DEFAULT_CREDENTIAL_PASSPHRASE: &str = "eventboard-credential-key!";

/// How stored passwords are produced and checked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PasswordScheme {
    /// Reversible AES encryption, verified by decrypt-and-compare.
    Reversible,
    /// Salted one-way Argon2id hash.
    Argon2,
}

impl std::str::FromStr for PasswordScheme {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "reversible" => Ok(Self::Reversible),
            "argon2" => Ok(Self::Argon2),
            other => anyhow::bail!("unknown PASSWORD_SCHEME: {other}"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CredentialConfig {
    pub passphrase: String,
    pub scheme: PasswordScheme,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UploadConfig {
    pub dir: PathBuf,
    pub url_prefix: String,
    pub max_bytes: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    pub cookie_name: String,
    pub idle_minutes: i64,
    /// Adds the `Secure` attribute; leave off when serving plain HTTP.
    pub secure_cookie: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub credentials: CredentialConfig,
    pub uploads: UploadConfig,
    pub session: SessionConfig,
    pub latest_events_count: i64,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL is not set")?;
        let credentials = CredentialConfig {
            passphrase: std::env::var("CREDENTIAL_PASSPHRASE")
                .unwrap_or_else(|_| DEFAULT_CREDENTIAL_PASSPHRASE.into()),
            scheme: match std::env::var("PASSWORD_SCHEME") {
                Ok(v) => v.parse()?,
                Err(_) => PasswordScheme::Reversible,
            },
        };
        let uploads = UploadConfig {
            dir: std::env::var("UPLOAD_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("wwwroot/uploads/events")),
            url_prefix: std::env::var("UPLOAD_URL_PREFIX")
                .unwrap_or_else(|_| "/uploads/events".into()),
            max_bytes: std::env::var("MAX_IMAGE_BYTES")
                .ok()
                .and_then(|v| v.parse::<u64>().ok())
                .unwrap_or(crate::validation::MAX_IMAGE_BYTES),
        };
        let session = SessionConfig {
            cookie_name: std::env::var("SESSION_COOKIE")
                .unwrap_or_else(|_| "eventboard_sid".into()),
            idle_minutes: std::env::var("SESSION_IDLE_MINUTES")
                .ok()
                .and_then(|v| v.parse::<i64>().ok())
                .unwrap_or(30),
            secure_cookie: std::env::var("SESSION_COOKIE_SECURE")
                .map(|v| v == "true" || v == "1")
                .unwrap_or(false),
        };
        let latest_events_count = std::env::var("LATEST_EVENTS_COUNT")
            .ok()
            .and_then(|v| v.parse::<i64>().ok())
            .unwrap_or(5);

        Ok(Self {
            database_url,
            credentials,
            uploads,
            session,
            latest_events_count,
        })
    }
}
