use sqlx::sqlite::SqlitePool;

use crate::auth::{Principal, Role};

/// Store for conference chairs. Chairs are provisioned by an operator,
/// never created through a login.
#[derive(Clone)]
pub struct ChairStore {
    pool: SqlitePool,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Chair {
    pub id: i64,
    pub email: String,
    pub name: String,
}

impl From<Chair> for Principal {
    fn from(chair: Chair) -> Self {
        Self {
            id: chair.id,
            email: chair.email,
            name: chair.name,
            role: Role::Chair,
        }
    }
}

impl ChairStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create a new chair. Returns the chair ID.
    pub async fn create(&self, email: &str, name: &str) -> Result<i64, sqlx::Error> {
        let result = sqlx::query("INSERT INTO chairs (email, name) VALUES (?, ?)")
            .bind(email)
            .bind(name)
            .execute(&self.pool)
            .await?;
        Ok(result.last_insert_rowid())
    }

    /// Get a chair by email (case-insensitive).
    pub async fn get_by_email(&self, email: &str) -> Result<Option<Chair>, sqlx::Error> {
        sqlx::query_as("SELECT id, email, name FROM chairs WHERE email = ?")
            .bind(email)
            .fetch_optional(&self.pool)
            .await
    }

    /// Delete a chair by ID.
    pub async fn delete(&self, id: i64) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM chairs WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
