//! SQLite implementation of IDirectory
//!
//! Read-only lookups against the `admins` and `members` tables. The wider
//! membership backend owns these tables; this adapter only decorates audit
//! history with current identity details.

use sqlx::{Row, SqlitePool};

use vestry_core::ports::{IDirectory, IdentitySummary};

/// SQLite-based implementation of the directory port
pub struct SqliteDirectory {
    pool: SqlitePool,
}

impl SqliteDirectory {
    /// Creates a new directory instance with the given connection pool
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl IDirectory for SqliteDirectory {
    async fn find_admin(&self, id: &str) -> anyhow::Result<Option<IdentitySummary>> {
        let row = sqlx::query("SELECT id, name, email, role FROM admins WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(|r| IdentitySummary {
            id: r.get("id"),
            name: r.get("name"),
            email: r.get("email"),
            role: r.get("role"),
            status: None,
        }))
    }

    async fn find_member(&self, id: &str) -> anyhow::Result<Option<IdentitySummary>> {
        let row = sqlx::query("SELECT id, name, email, status FROM members WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(|r| IdentitySummary {
            id: r.get("id"),
            name: r.get("name"),
            email: r.get("email"),
            role: None,
            status: r.get("status"),
        }))
    }
}
