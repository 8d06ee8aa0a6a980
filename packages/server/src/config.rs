use std::path::PathBuf;

use common::config::RetryConfig;
use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct CorsConfig {
    pub allow_origins: Vec<String>,
    pub max_age: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub cors: CorsConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
}

/// Shared secret of the identity provider that signs bearer tokens.
#[derive(Debug, Deserialize, Clone)]
pub struct AuthConfig {
    pub jwt_secret: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StorageConfig {
    pub images_dir: PathBuf,
    /// Maximum accepted image upload, in bytes.
    pub max_image_size: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            images_dir: PathBuf::from("./data/images"),
            max_image_size: 8 * 1024 * 1024,
        }
    }
}

/// How confirmation messages leave the process.
#[derive(Debug, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TransportKind {
    Smtp,
    /// Render and log only; used when no mail relay is configured.
    #[default]
    Log,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SmtpConfig {
    pub host: String,
    /// 465 uses implicit TLS, anything else STARTTLS.
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    pub from_address: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct NotificationConfig {
    pub transport: TransportKind,
    pub smtp: Option<SmtpConfig>,
    /// Display name of the club, used as sender name and in the template.
    pub club_name: String,
    /// Public events listing linked from the confirmation message.
    pub events_url: String,
    pub support_email: String,
    #[serde(default)]
    pub retry: RetryConfig,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            transport: TransportKind::Log,
            smtp: None,
            club_name: "Debug Club".into(),
            events_url: "http://localhost:3000/events".into(),
            support_email: "support@debugclub.com".into(),
            retry: RetryConfig::default(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    pub storage: StorageConfig,
    pub notification: NotificationConfig,
}

/// Upper bound for retry delays and the stale window: one year.
const MAX_RETRY_WINDOW_SECS: u64 = 365 * 24 * 60 * 60;

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        let s = Config::builder()
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 3000)?
            .set_default("server.cors.allow_origins", Vec::<String>::new())?
            .set_default("server.cors.max_age", 3600)?
            .set_default("storage.images_dir", "./data/images")?
            .set_default("storage.max_image_size", 8 * 1024 * 1024)?
            .set_default("notification.transport", "log")?
            .set_default("notification.club_name", "Debug Club")?
            .set_default("notification.events_url", "http://localhost:3000/events")?
            .set_default("notification.support_email", "support@debugclub.com")?
            // Load from config/config.toml
            .add_source(File::with_name("config/config").required(false))
            // Override from environment (e.g., CLUBREG__AUTH__JWT_SECRET)
            .add_source(Environment::with_prefix("CLUBREG").separator("__"))
            .build()?;

        let config: Self = s.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.auth.jwt_secret.len() < 16 {
            return Err(ConfigError::Message(
                "auth.jwt_secret must be at least 16 bytes".into(),
            ));
        }
        if self.notification.transport == TransportKind::Smtp && self.notification.smtp.is_none() {
            return Err(ConfigError::Message(
                "notification.transport = \"smtp\" requires a [notification.smtp] section".into(),
            ));
        }
        let retry = &self.notification.retry;
        if retry.stale_after_secs > MAX_RETRY_WINDOW_SECS
            || retry.max_secs > MAX_RETRY_WINDOW_SECS
        {
            return Err(ConfigError::Message(format!(
                "notification.retry.stale_after_secs and max_secs must not exceed {MAX_RETRY_WINDOW_SECS}"
            )));
        }
        Ok(())
    }
}
