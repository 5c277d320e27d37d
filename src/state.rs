use std::sync::Arc;

use anyhow::Context;
use chrono::Duration;

use crate::auth::{CookieSigner, Gate, Pbkdf2Verifier, SessionStore};
use crate::config::{Backend, Config};
use crate::store::{MemoryStore, PgStore, RestStore, StudentStore};
use crate::students::Students;

#[derive(Clone)]
pub struct AppState {
    pub students: Students,
    pub gate: Arc<Gate>,
}

impl AppState {
    pub fn new(students: Students, gate: Gate) -> Self {
        Self {
            students,
            gate: Arc::new(gate),
        }
    }

    pub async fn from_config(config: &Config) -> anyhow::Result<Self> {
        let store: Arc<dyn StudentStore> = match &config.backend {
            Backend::Rest { url, api_key } => Arc::new(
                RestStore::new(url, api_key, &config.table)
                    .context("building the remote store client")?,
            ),
            Backend::Postgres { url } => Arc::new(
                PgStore::connect(url, &config.table)
                    .await
                    .context("connecting to Postgres")?,
            ),
            Backend::Memory => Arc::new(MemoryStore::new()),
        };
        log::info!(
            "Using the {} store for table `{}`",
            config.backend.name(),
            config.table
        );

        let verifier = Pbkdf2Verifier::new(&config.admin_username, &config.admin_password_hash)?;
        let signer = CookieSigner::new(config.session_secret.as_bytes())?;
        let sessions = SessionStore::new(Duration::minutes(config.session_ttl_minutes));
        let gate = Gate::new(Arc::new(verifier), sessions, signer, config.cookie_secure);

        Ok(Self::new(Students::new(store), gate))
    }
}
