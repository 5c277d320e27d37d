use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

use super::{StoreError, StudentStore};
use crate::models::{NewStudent, Student};

/// Direct Postgres access to an existing `(id BIGINT, name TEXT, age INTEGER)`
/// table. The table name is checked by the config layer before it gets here.
pub struct PgStore {
    pool: PgPool,
    table: String,
}

impl PgStore {
    pub async fn connect(url: &str, table: &str) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new().max_connections(5).connect(url).await?;
        Ok(Self {
            pool,
            table: table.to_string(),
        })
    }
}

#[async_trait]
impl StudentStore for PgStore {
    async fn list(&self) -> Result<Vec<Student>, StoreError> {
        let sql = format!("SELECT id, name, age FROM {} ORDER BY id ASC", self.table);
        let students = sqlx::query_as::<_, Student>(&sql)
            .fetch_all(&self.pool)
            .await?;
        Ok(students)
    }

    async fn insert(&self, student: &NewStudent) -> Result<Student, StoreError> {
        let sql = format!(
            "INSERT INTO {} (name, age) VALUES ($1, $2) RETURNING id, name, age",
            self.table
        );
        let created = sqlx::query_as::<_, Student>(&sql)
            .bind(&student.name)
            .bind(student.age)
            .fetch_one(&self.pool)
            .await?;
        Ok(created)
    }

    async fn update(&self, id: i64, student: &NewStudent) -> Result<Option<Student>, StoreError> {
        let sql = format!(
            "UPDATE {} SET name = $1, age = $2 WHERE id = $3 RETURNING id, name, age",
            self.table
        );
        let updated = sqlx::query_as::<_, Student>(&sql)
            .bind(&student.name)
            .bind(student.age)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(updated)
    }

    async fn delete(&self, id: i64) -> Result<bool, StoreError> {
        let sql = format!("DELETE FROM {} WHERE id = $1", self.table);
        let affected = sqlx::query(&sql).bind(id).execute(&self.pool).await?;
        Ok(affected.rows_affected() >= 1)
    }
}
