//! Application configuration module
//!
//! Configuration is layered: built-in defaults, then an optional TOML file,
//! then environment variables. The result is validated before the server
//! starts.

use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

const DAY_SECS: u64 = 24 * 60 * 60;
/// Longest accepted upload URL lifetime
pub const MAX_UPLOAD_TICKET_TTL_SECS: u64 = 7 * DAY_SECS;
/// Longest accepted message retention
pub const MAX_RETENTION_TTL_SECS: u64 = 5 * 365 * DAY_SECS;
/// Longest accepted pause between retention sweeps
pub const MAX_RETENTION_INTERVAL_SECS: u64 = 7 * DAY_SECS;

/// Token verification and webhook settings
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// HS256 shared secret
    pub jwt_secret: Option<String>,
    /// RS256 public key of the identity provider (PEM)
    pub jwt_public_key_pem: Option<String>,
    /// Expected `iss` claim; also prefixes token identifiers of webhook users
    pub jwt_issuer: Option<String>,
    /// Svix signing secret (`whsec_...`) for identity-provider webhooks
    pub webhook_signing_secret: Option<String>,
}

/// Web push settings; pushes are skipped when the VAPID keys are absent
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PushConfig {
    /// Application server public key (base64url, uncompressed P-256 point)
    pub vapid_public_key: Option<String>,
    /// Application server private key (PKCS#8 PEM)
    pub vapid_private_key_pem: Option<String>,
    /// `sub` claim of the VAPID token
    pub contact: String,
}

impl Default for PushConfig {
    fn default() -> Self {
        Self {
            vapid_public_key: None,
            vapid_private_key_pem: None,
            contact: "mailto:notifications@localhost".to_string(),
        }
    }
}

impl PushConfig {
    pub fn is_enabled(&self) -> bool {
        self.vapid_public_key.is_some() && self.vapid_private_key_pem.is_some()
    }
}

/// Retention sweep settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RetentionConfig {
    /// Messages older than this are purged
    pub ttl_secs: u64,
    /// Rows deleted per batch
    pub batch_size: u32,
    /// How often the sweep runs
    pub interval_secs: u64,
}

impl Default for RetentionConfig {
    fn default() -> Self {
        Self {
            ttl_secs: 24 * 60 * 60,
            batch_size: 500,
            interval_secs: 60 * 60,
        }
    }
}

impl RetentionConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

/// Application configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// sqlx connection string
    pub database_url: String,
    /// Port the HTTP server binds to
    pub server_port: u16,
    /// Base used to build blob and upload URLs
    pub public_base_url: String,
    /// Directory holding blob bytes
    pub blob_dir: PathBuf,
    /// Default tracing filter when `RUST_LOG` is unset
    pub log_level: String,
    /// How long an upload URL stays valid
    pub upload_ticket_ttl_secs: u64,
    pub auth: AuthConfig,
    pub push: PushConfig,
    pub retention: RetentionConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database_url: "sqlite://wazap.db?mode=rwc".to_string(),
            server_port: 3000,
            public_base_url: "http://127.0.0.1:3000".to_string(),
            blob_dir: PathBuf::from("blobs"),
            log_level: "info".to_string(),
            upload_ticket_ttl_secs: 60 * 60,
            auth: AuthConfig::default(),
            push: PushConfig::default(),
            retention: RetentionConfig::default(),
        }
    }
}

impl AppConfig {
    /// Create a new AppConfigBuilder
    pub fn builder() -> AppConfigBuilder {
        AppConfigBuilder::default()
    }

    /// Parse a TOML document; missing keys keep their defaults
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        toml::from_str(source).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Override fields from environment-style variables
    ///
    /// `lookup` is `std::env::var` in production; tests pass a map.
    pub fn apply_env<F>(mut self, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("DATABASE_URL") {
            self.database_url = v;
        }
        if let Some(v) = lookup("SERVER_PORT") {
            self.server_port = parse_number("SERVER_PORT", &v)?;
        }
        if let Some(v) = lookup("PUBLIC_BASE_URL") {
            self.public_base_url = v;
        }
        if let Some(v) = lookup("BLOB_DIR") {
            self.blob_dir = PathBuf::from(v);
        }
        if let Some(v) = lookup("LOG_LEVEL") {
            self.log_level = v;
        }
        if let Some(v) = lookup("UPLOAD_TICKET_TTL_SECS") {
            self.upload_ticket_ttl_secs = parse_number("UPLOAD_TICKET_TTL_SECS", &v)?;
        }
        if let Some(v) = lookup("JWT_SECRET") {
            self.auth.jwt_secret = Some(v);
        }
        if let Some(v) = lookup("JWT_PUBLIC_KEY_PEM") {
            self.auth.jwt_public_key_pem = Some(v);
        }
        if let Some(v) = lookup("JWT_ISSUER") {
            self.auth.jwt_issuer = Some(v);
        }
        if let Some(v) = lookup("WEBHOOK_SIGNING_SECRET") {
            self.auth.webhook_signing_secret = Some(v);
        }
        if let Some(v) = lookup("VAPID_PUBLIC_KEY") {
            self.push.vapid_public_key = Some(v);
        }
        if let Some(v) = lookup("VAPID_PRIVATE_KEY_PEM") {
            self.push.vapid_private_key_pem = Some(v);
        }
        if let Some(v) = lookup("WEB_PUSH_CONTACT") {
            self.push.contact = v;
        }
        if let Some(v) = lookup("RETENTION_TTL_SECS") {
            self.retention.ttl_secs = parse_number("RETENTION_TTL_SECS", &v)?;
        }
        if let Some(v) = lookup("RETENTION_BATCH_SIZE") {
            self.retention.batch_size = parse_number("RETENTION_BATCH_SIZE", &v)?;
        }
        if let Some(v) = lookup("RETENTION_INTERVAL_SECS") {
            self.retention.interval_secs = parse_number("RETENTION_INTERVAL_SECS", &v)?;
        }
        Ok(self)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.public_base_url.starts_with("http://")
            || self.public_base_url.starts_with("https://"))
        {
            return Err(ConfigError::InvalidUrl(self.public_base_url.clone()));
        }
        if self.auth.jwt_secret.is_none() && self.auth.jwt_public_key_pem.is_none() {
            return Err(ConfigError::MissingValue("JWT_SECRET or JWT_PUBLIC_KEY_PEM"));
        }
        if self
            .auth
            .jwt_issuer
            .as_deref()
            .map_or(true, |issuer| issuer.trim().is_empty())
        {
            return Err(ConfigError::MissingValue("JWT_ISSUER"));
        }
        if self.retention.batch_size == 0 {
            return Err(ConfigError::InvalidValue {
                key: "RETENTION_BATCH_SIZE",
                value: "0".to_string(),
            });
        }
        check_range(
            "UPLOAD_TICKET_TTL_SECS",
            self.upload_ticket_ttl_secs,
            MAX_UPLOAD_TICKET_TTL_SECS,
        )?;
        check_range("RETENTION_TTL_SECS", self.retention.ttl_secs, MAX_RETENTION_TTL_SECS)?;
        check_range(
            "RETENTION_INTERVAL_SECS",
            self.retention.interval_secs,
            MAX_RETENTION_INTERVAL_SECS,
        )?;
        Ok(())
    }
}

/// Durations must be positive and at most `max` seconds
fn check_range(key: &'static str, value: u64, max: u64) -> Result<(), ConfigError> {
    if value == 0 || value > max {
        return Err(ConfigError::InvalidValue {
            key,
            value: value.to_string(),
        });
    }
    Ok(())
}

fn parse_number<T: std::str::FromStr>(key: &'static str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidValue {
        key,
        value: value.to_string(),
    })
}

/// Builder for AppConfig
#[derive(Debug, Default)]
pub struct AppConfigBuilder {
    config: AppConfig,
}

impl AppConfigBuilder {
    pub fn database_url(mut self, url: impl Into<String>) -> Self {
        self.config.database_url = url.into();
        self
    }

    pub fn public_base_url(mut self, url: impl Into<String>) -> Self {
        self.config.public_base_url = url.into();
        self
    }

    pub fn blob_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.blob_dir = dir.into();
        self
    }

    pub fn jwt_secret(mut self, secret: impl Into<String>) -> Self {
        self.config.auth.jwt_secret = Some(secret.into());
        self
    }

    pub fn jwt_issuer(mut self, issuer: impl Into<String>) -> Self {
        self.config.auth.jwt_issuer = Some(issuer.into());
        self
    }

    pub fn webhook_signing_secret(mut self, secret: impl Into<String>) -> Self {
        self.config.auth.webhook_signing_secret = Some(secret.into());
        self
    }

    pub fn retention(mut self, retention: RetentionConfig) -> Self {
        self.config.retention = retention;
        self
    }

    pub fn push(mut self, push: PushConfig) -> Self {
        self.config.push = push;
        self
    }

    /// Build the configuration
    pub fn build(self) -> Result<AppConfig, ConfigError> {
        self.config.validate()?;
        Ok(self.config)
    }
}

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid URL: {0}")]
    InvalidUrl(String),
    #[error("missing value: {0}")]
    MissingValue(&'static str),
    #[error("invalid value for {key}: {value}")]
    InvalidValue { key: &'static str, value: String },
    #[error("failed to parse config file: {0}")]
    Parse(String),
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
}
