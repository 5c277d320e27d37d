use std::sync::Arc;

use crate::err::Error;
use crate::models::{Student, StudentPayload};
use crate::store::{StoreError, StudentStore};

/// Result of listing students. A failed remote call still yields a
/// (possibly empty) list; `failed` lets a page tell the operator about it.
#[derive(Debug, Clone, Default)]
pub struct Listing {
    pub students: Vec<Student>,
    pub failed: bool,
}

/// Validates input and forwards the four table operations to the store.
/// No store failure leaves this type unclassified.
#[derive(Clone)]
pub struct Students {
    store: Arc<dyn StudentStore>,
}

pub fn parse_id(raw: &str) -> Result<i64, Error> {
    raw.trim()
        .parse::<i64>()
        .map_err(|_| Error::validation("Student id must be a valid integer"))
}

fn transport(operation: &'static str, err: StoreError) -> Error {
    log::error!("Error during {}: {}", operation, err);
    Error::Transport { operation }
}

impl Students {
    pub fn new(store: Arc<dyn StudentStore>) -> Self {
        Self { store }
    }

    pub async fn list(&self) -> Listing {
        match self.store.list().await {
            Ok(students) => {
                log::info!("Retrieved {} students from database", students.len());
                Listing {
                    students,
                    failed: false,
                }
            }
            Err(err) => {
                log::error!("Error fetching students: {}", err);
                Listing {
                    students: Vec::new(),
                    failed: true,
                }
            }
        }
    }

    pub async fn create(&self, payload: StudentPayload) -> Result<Student, Error> {
        let student = payload.validate()?;
        let created = self
            .store
            .insert(&student)
            .await
            .map_err(|err| transport("create", err))?;
        log::info!(
            "Added new student {}: {}, age {}",
            created.id,
            created.name,
            created.age
        );
        Ok(created)
    }

    pub async fn update(&self, id: i64, payload: StudentPayload) -> Result<Student, Error> {
        let student = payload.validate()?;
        match self
            .store
            .update(id, &student)
            .await
            .map_err(|err| transport("update", err))?
        {
            Some(updated) => {
                log::info!(
                    "Updated student {}: {}, age {}",
                    id,
                    updated.name,
                    updated.age
                );
                Ok(updated)
            }
            None => {
                log::warn!("Failed to update student {}: no such row", id);
                Err(Error::not_found(format!("Student {} not found", id)))
            }
        }
    }

    pub async fn delete(&self, id: i64) -> Result<(), Error> {
        let removed = self
            .store
            .delete(id)
            .await
            .map_err(|err| transport("delete", err))?;
        if removed {
            log::info!("Deleted student {}", id);
            Ok(())
        } else {
            log::warn!("Failed to delete student {}: no such row", id);
            Err(Error::not_found(format!("Student {} not found", id)))
        }
    }
}
