//! Backends holding the `students` table.
//!
//! Every backend answers the same four calls. Zero affected rows is not an
//! error at this level: `update` yields `None` and `delete` yields `false`,
//! and the caller decides what that means.

use async_trait::async_trait;
use thiserror::Error;

use crate::models::{NewStudent, Student};

pub mod memory;
pub mod pg;
pub mod rest;

pub use memory::MemoryStore;
pub use pg::PgStore;
pub use rest::RestStore;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("transport failure: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("remote store answered {status}: {body}")]
    Status { status: u16, body: String },

    #[error("remote store returned no row for {0}")]
    MissingRow(&'static str),

    #[error("API key cannot be sent as a header")]
    InvalidApiKey,

    #[error("database failure: {0}")]
    Database(#[from] sqlx::Error),
}

#[async_trait]
pub trait StudentStore: Send + Sync {
    /// All rows ordered by ascending id.
    async fn list(&self) -> Result<Vec<Student>, StoreError>;

    async fn insert(&self, student: &NewStudent) -> Result<Student, StoreError>;

    async fn update(&self, id: i64, student: &NewStudent) -> Result<Option<Student>, StoreError>;

    async fn delete(&self, id: i64) -> Result<bool, StoreError>;
}
