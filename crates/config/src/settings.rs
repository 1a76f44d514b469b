use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    pub app: AppSettings,
    pub database: DatabaseSettings,
    pub jwt: JwtSettings,
    pub push: PushSettings,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppSettings {
    pub host: String,
    pub port: u16,
    pub cors_origins: Vec<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseSettings {
    /// `mongodb://...` for MongoDB, `memory://` for the in-process store.
    pub url: String,
    pub name: String,
    /// Reported to the server in the connection handshake.
    pub app_name: String,
    pub server_selection_timeout_secs: u64,
    pub max_pool_size: Option<u32>,
    pub min_pool_size: Option<u32>,
}

impl DatabaseSettings {
    pub fn is_memory(&self) -> bool {
        self.url.starts_with("memory://")
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct JwtSettings {
    pub secret: String,
    pub access_token_ttl_secs: u64,
    pub refresh_token_ttl_secs: u64,
    pub issuer: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct PushSettings {
    pub enabled: bool,
    /// Path to a Firebase service-account JSON key.
    pub credentials_path: Option<String>,
    pub queue_capacity: usize,
    pub timeout_secs: u64,
    pub click_action: String,
}

impl Settings {
    pub fn load() -> Result<Self, ConfigError> {
        let config = Config::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))
            .add_source(
                Environment::default()
                    .separator("__")
                    .prefix("LEADFLOW"),
            )
            .set_default("app.host", "0.0.0.0")?
            .set_default("app.port", 5000)?
            .set_default("app.cors_origins", Vec::<String>::new())?
            .set_default("database.url", "mongodb://localhost:27017")?
            .set_default("database.name", "crm")?
            .set_default("database.app_name", "leadflow")?
            .set_default("database.server_selection_timeout_secs", 10)?
            .set_default("jwt.secret", "change-me-in-production")?
            .set_default("jwt.access_token_ttl_secs", 3600)?
            .set_default("jwt.refresh_token_ttl_secs", 604800)?
            .set_default("jwt.issuer", "leadflow")?
            .set_default("push.enabled", false)?
            .set_default("push.queue_capacity", 1024)?
            .set_default("push.timeout_secs", 5)?
            .set_default("push.click_action", "FLUTTER_NOTIFICATION_CLICK")?
            .build()?;

        config.try_deserialize()
    }
}
