use config::{Config, ConfigError, Environment, File};
use secrecy::Secret;
use serde::Deserialize;

/// Process configuration, loaded once at startup and immutable afterwards.
///
/// Sources, in override order: defaults, an optional `config.json` in the
/// working directory, then `KEYGATE_`-prefixed environment variables with
/// `__` as the section separator (`KEYGATE_AUTH__SIGNING_KEY=...`).
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub application: ApplicationSettings,
    pub auth: AuthSettings,
    pub postgres: PostgresSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApplicationSettings {
    pub address: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthSettings {
    pub signing_key: Secret<String>,
    pub static_salt: Secret<String>,
    pub access_token_ttl_secs: i64,
    pub refresh_token_ttl_secs: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PostgresSettings {
    pub url: Secret<String>,
    pub max_connections: u32,
}

impl Settings {
    pub fn load() -> Result<Self, ConfigError> {
        Config::builder()
            .set_default("application.address", "0.0.0.0:3000")?
            .set_default("auth.access_token_ttl_secs", 15 * 60)?
            .set_default("auth.refresh_token_ttl_secs", 30 * 24 * 60 * 60)?
            .set_default("postgres.max_connections", 5)?
            .add_source(File::with_name("config").required(false))
            .add_source(Environment::with_prefix("KEYGATE").separator("__"))
            .build()?
            .try_deserialize()
    }
}
