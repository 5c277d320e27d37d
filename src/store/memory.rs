use std::collections::BTreeMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{StoreError, StudentStore};
use crate::models::{NewStudent, Student};

/// Process-local table, for tests and local runs without a remote store.
pub struct MemoryStore {
    table: RwLock<Table>,
}

struct Table {
    next_id: i64,
    rows: BTreeMap<i64, Student>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            table: RwLock::new(Table {
                next_id: 1,
                rows: BTreeMap::new(),
            }),
        }
    }

    pub async fn len(&self) -> usize {
        self.table.read().await.rows.len()
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StudentStore for MemoryStore {
    async fn list(&self) -> Result<Vec<Student>, StoreError> {
        Ok(self.table.read().await.rows.values().cloned().collect())
    }

    async fn insert(&self, student: &NewStudent) -> Result<Student, StoreError> {
        let mut table = self.table.write().await;
        let id = table.next_id;
        table.next_id += 1;
        let row = Student {
            id,
            name: student.name.clone(),
            age: student.age,
        };
        table.rows.insert(id, row.clone());
        Ok(row)
    }

    async fn update(&self, id: i64, student: &NewStudent) -> Result<Option<Student>, StoreError> {
        let mut table = self.table.write().await;
        Ok(table.rows.get_mut(&id).map(|row| {
            row.name = student.name.clone();
            row.age = student.age;
            row.clone()
        }))
    }

    async fn delete(&self, id: i64) -> Result<bool, StoreError> {
        Ok(self.table.write().await.rows.remove(&id).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_student(name: &str, age: i32) -> NewStudent {
        NewStudent {
            name: name.to_string(),
            age,
        }
    }

    #[tokio::test]
    async fn ids_are_never_reused() {
        let store = MemoryStore::new();
        let first = store.insert(&new_student("Ada", 30)).await.unwrap();
        assert!(store.delete(first.id).await.unwrap());
        let second = store.insert(&new_student("Grace", 28)).await.unwrap();
        assert!(second.id > first.id);
    }

    #[tokio::test]
    async fn list_is_ordered_by_id() {
        let store = MemoryStore::new();
        for (name, age) in [("c", 3), ("a", 1), ("b", 2)] {
            store.insert(&new_student(name, age)).await.unwrap();
        }
        let ids: Vec<i64> = store.list().await.unwrap().iter().map(|s| s.id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn zero_row_mutations_are_reported() {
        let store = MemoryStore::new();
        assert_eq!(store.update(9, &new_student("x", 1)).await.unwrap(), None);
        assert!(!store.delete(9).await.unwrap());
        assert_eq!(store.len().await, 0);
    }
}
