use std::env;

use thiserror::Error;

use crate::identity::IdentityField;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
}

/// Runtime settings, read once from the environment at startup.
#[derive(Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub port: u16,
    pub require_tls: bool,
    pub admin_password: String,
    pub reveal_password: String,
    pub review_identity: IdentityField,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let database_url = require("DATABASE_URL")?;
        let admin_password = require("ADMIN_PASSWORD")?;
        let reveal_password = require("REVEAL_PASSWORD")?;

        let port = env::var("PORT")
            .ok()
            .and_then(|value| value.parse().ok())
            .unwrap_or(3000);

        let require_tls = env::var("APP_ENV")
            .map(|value| value == "production")
            .unwrap_or(false);

        let review_identity = match env::var("REVIEW_IDENTITY").ok().as_deref() {
            Some("cpf") => IdentityField::TaxId,
            Some("phone") | None => IdentityField::Phone,
            Some(other) => {
                log::warn!("Unknown REVIEW_IDENTITY '{other}'. Falling back to phone.");
                IdentityField::Phone
            }
        };

        if admin_password == reveal_password {
            log::warn!("REVEAL_PASSWORD equals ADMIN_PASSWORD. Set a distinct reveal secret.");
        }

        Ok(AppConfig {
            database_url,
            port,
            require_tls,
            admin_password,
            reveal_password,
            review_identity,
        })
    }
}

fn require(name: &'static str) -> Result<String, ConfigError> {
    env::var(name)
        .ok()
        .filter(|value| !value.trim().is_empty())
        .ok_or(ConfigError::Missing(name))
}
