//! Refresh token storage, one record per principal email.
//!
//! Only the SHA-256 digest of a refresh token is stored. Access tokens are
//! stateless and never reach the database.

use sqlx::sqlite::SqlitePool;

/// A stored refresh token record.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct RefreshTokenRecord {
    pub user_email: String,
    pub hashed_token: String,
    pub created_at: String,
    pub expires_at: String,
}

/// Store for the single active refresh token of each principal.
pub struct RefreshTokenStore {
    pool: SqlitePool,
}

impl RefreshTokenStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Insert the record for `email`, or overwrite the existing one.
    /// Any previously stored token for this email stops being valid.
    pub async fn upsert(
        &self,
        email: &str,
        hashed_token: &str,
        ttl_secs: u64,
    ) -> Result<(), sqlx::Error> {
        // Both timestamps come from SQLite's clock, the same one expiry checks use
        sqlx::query(
            "INSERT INTO refresh_tokens (user_email, hashed_token, created_at, expires_at)
             VALUES (?, ?, datetime('now'), datetime('now', ?))
             ON CONFLICT(user_email) DO UPDATE SET
                hashed_token = excluded.hashed_token,
                created_at = excluded.created_at,
                expires_at = excluded.expires_at",
        )
        .bind(email)
        .bind(hashed_token)
        .bind(format!("+{} seconds", ttl_secs))
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Get the stored hash for `email` if the record has not expired.
    /// Expired and missing records both yield `None`.
    pub async fn lookup_valid(&self, email: &str) -> Result<Option<String>, sqlx::Error> {
        let row: Option<(String,)> = sqlx::query_as(
            "SELECT hashed_token FROM refresh_tokens WHERE user_email = ? AND expires_at > datetime('now')",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|(hash,)| hash))
    }

    /// Get the full record for `email`, expired or not.
    pub async fn get(&self, email: &str) -> Result<Option<RefreshTokenRecord>, sqlx::Error> {
        sqlx::query_as(
            "SELECT user_email, hashed_token, created_at, expires_at FROM refresh_tokens WHERE user_email = ?",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await
    }

    /// Delete the record for `email`. Deleting a missing record is not an error.
    pub async fn delete(&self, email: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM refresh_tokens WHERE user_email = ?")
            .bind(email)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Delete all expired records.
    pub async fn delete_expired(&self) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM refresh_tokens WHERE expires_at <= datetime('now')")
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}
