use std::env;
use std::net::SocketAddr;

use pbkdf2::password_hash::PasswordHash;
use thiserror::Error;

const MIN_SECRET_LEN: usize = 32;
const MAX_TTL_MINUTES: i64 = 60 * 24 * 30;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{key} is invalid: {reason}")]
    Invalid { key: &'static str, reason: String },
}

#[derive(Clone, PartialEq, Eq)]
pub enum Backend {
    Rest { url: String, api_key: String },
    Postgres { url: String },
    Memory,
}

impl Backend {
    pub fn name(&self) -> &'static str {
        match self {
            Backend::Rest { .. } => "rest",
            Backend::Postgres { .. } => "postgres",
            Backend::Memory => "memory",
        }
    }
}

/// Runtime settings. Secrets have no defaults. Not `Debug`: it holds secrets.
#[derive(Clone)]
pub struct Config {
    pub bind: SocketAddr,
    pub backend: Backend,
    pub table: String,
    pub admin_username: String,
    pub admin_password_hash: String,
    pub session_secret: String,
    pub session_ttl_minutes: i64,
    pub cookie_secure: bool,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        let with_default = |key: &str, default: &str| {
            var(key).unwrap_or_else(|| {
                log::info!("{} not set, using default: {}", key, default);
                default.to_string()
            })
        };

        let bind = with_default("BIND_ADDR", "127.0.0.1:3000")
            .parse::<SocketAddr>()
            .map_err(|e| ConfigError::Invalid {
                key: "BIND_ADDR",
                reason: e.to_string(),
            })?;

        let backend = match with_default("STORE_BACKEND", "rest").as_str() {
            "rest" => Backend::Rest {
                url: var("STORE_URL").ok_or(ConfigError::Missing("STORE_URL"))?,
                api_key: var("STORE_API_KEY").ok_or(ConfigError::Missing("STORE_API_KEY"))?,
            },
            "postgres" => Backend::Postgres {
                url: var("DATABASE_URL").ok_or(ConfigError::Missing("DATABASE_URL"))?,
            },
            "memory" => {
                log::warn!("Using the in-memory store; records are lost on exit");
                Backend::Memory
            }
            other => {
                return Err(ConfigError::Invalid {
                    key: "STORE_BACKEND",
                    reason: format!("unknown backend `{}`", other),
                })
            }
        };

        let table = with_default("STORE_TABLE", "students");
        if !is_identifier(&table) {
            return Err(ConfigError::Invalid {
                key: "STORE_TABLE",
                reason: "must be letters, digits and underscores".to_string(),
            });
        }

        let admin_password_hash =
            var("ADMIN_PASSWORD_HASH").ok_or(ConfigError::Missing("ADMIN_PASSWORD_HASH"))?;
        PasswordHash::new(&admin_password_hash).map_err(|e| ConfigError::Invalid {
            key: "ADMIN_PASSWORD_HASH",
            reason: e.to_string(),
        })?;

        let session_secret = var("SESSION_SECRET").ok_or(ConfigError::Missing("SESSION_SECRET"))?;
        if session_secret.len() < MIN_SECRET_LEN {
            return Err(ConfigError::Invalid {
                key: "SESSION_SECRET",
                reason: format!("must be at least {} bytes", MIN_SECRET_LEN),
            });
        }

        let session_ttl_minutes = with_default("SESSION_TTL_MINUTES", "120")
            .parse::<i64>()
            .ok()
            .filter(|ttl| (1..=MAX_TTL_MINUTES).contains(ttl))
            .ok_or_else(|| ConfigError::Invalid {
                key: "SESSION_TTL_MINUTES",
                reason: format!("must be a whole number between 1 and {}", MAX_TTL_MINUTES),
            })?;

        let cookie_secure = match with_default("COOKIE_SECURE", "false").as_str() {
            "1" | "true" | "yes" => true,
            "0" | "false" | "no" => false,
            other => {
                return Err(ConfigError::Invalid {
                    key: "COOKIE_SECURE",
                    reason: format!("expected true or false, got `{}`", other),
                })
            }
        };

        Ok(Self {
            bind,
            backend,
            table,
            admin_username: with_default("ADMIN_USERNAME", "admin"),
            admin_password_hash,
            session_secret,
            session_ttl_minutes,
            cookie_secure,
        })
    }
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
