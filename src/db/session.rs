//! Refresh session storage.
//!
//! Each row backs one opaque refresh token, looked up by the token's SHA-256
//! digest. Rows are never updated except to set `revoked_at`, and only ever
//! from NULL, so revocation is terminal. Timestamps are Unix seconds.

use sqlx::sqlite::SqlitePool;

/// A persisted refresh session.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct RefreshSession {
    pub id: i64,
    pub uuid: String,
    pub user_id: i64,
    pub token_hash: String,
    pub created_at: i64,
    pub expires_at: i64,
    pub revoked_at: Option<i64>,
    pub ip: Option<String>,
    pub user_agent: Option<String>,
}

impl RefreshSession {
    pub fn is_revoked(&self) -> bool {
        self.revoked_at.is_some()
    }

    pub fn is_expired(&self, now: i64) -> bool {
        now >= self.expires_at
    }

    /// Not revoked and not yet expired.
    pub fn is_valid(&self, now: i64) -> bool {
        !self.is_revoked() && !self.is_expired(now)
    }
}

/// Fields for a session about to be inserted.
#[derive(Debug, Clone)]
pub struct NewSession<'a> {
    pub user_id: i64,
    pub token_hash: &'a str,
    pub created_at: i64,
    pub expires_at: i64,
    pub ip: Option<&'a str>,
    pub user_agent: Option<&'a str>,
}

/// Store for refresh sessions.
pub struct SessionStore {
    pool: SqlitePool,
}

impl SessionStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Insert a session inside the caller's transaction. Returns the session UUID.
    pub async fn create(
        &self,
        tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
        session: &NewSession<'_>,
    ) -> Result<String, sqlx::Error> {
        let uuid = uuid::Uuid::new_v4().to_string();

        sqlx::query(
            "INSERT INTO refresh_sessions (uuid, user_id, token_hash, created_at, expires_at, ip, user_agent) VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&uuid)
        .bind(session.user_id)
        .bind(session.token_hash)
        .bind(session.created_at)
        .bind(session.expires_at)
        .bind(session.ip)
        .bind(session.user_agent)
        .execute(&mut **tx)
        .await?;

        Ok(uuid)
    }

    /// Find a session by token hash and hold its lock until the transaction ends.
    ///
    /// The no-op UPDATE makes this the transaction's first write, so SQLite
    /// takes the database write lock before the row is read. A concurrent
    /// caller for the same token blocks here (busy timeout) and then sees the
    /// row as left by the first transaction.
    pub async fn lock_by_token_hash(
        &self,
        tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
        token_hash: &str,
    ) -> Result<Option<RefreshSession>, sqlx::Error> {
        sqlx::query_as(
            "UPDATE refresh_sessions SET token_hash = token_hash WHERE token_hash = ?
             RETURNING id, uuid, user_id, token_hash, created_at, expires_at, revoked_at, ip, user_agent",
        )
        .bind(token_hash)
        .fetch_optional(&mut **tx)
        .await
    }

    /// Find a session by token hash without locking.
    pub async fn find_by_token_hash(
        &self,
        token_hash: &str,
    ) -> Result<Option<RefreshSession>, sqlx::Error> {
        sqlx::query_as(
            "SELECT id, uuid, user_id, token_hash, created_at, expires_at, revoked_at, ip, user_agent FROM refresh_sessions WHERE token_hash = ?",
        )
        .bind(token_hash)
        .fetch_optional(&self.pool)
        .await
    }

    /// Get a session by its public UUID.
    pub async fn get_by_uuid(&self, uuid: &str) -> Result<Option<RefreshSession>, sqlx::Error> {
        sqlx::query_as(
            "SELECT id, uuid, user_id, token_hash, created_at, expires_at, revoked_at, ip, user_agent FROM refresh_sessions WHERE uuid = ?",
        )
        .bind(uuid)
        .fetch_optional(&self.pool)
        .await
    }

    /// List a user's valid sessions, newest first.
    pub async fn list_active_by_user(
        &self,
        user_id: i64,
        now: i64,
    ) -> Result<Vec<RefreshSession>, sqlx::Error> {
        sqlx::query_as(
            "SELECT id, uuid, user_id, token_hash, created_at, expires_at, revoked_at, ip, user_agent FROM refresh_sessions WHERE user_id = ? AND revoked_at IS NULL AND expires_at > ? ORDER BY created_at DESC, id DESC",
        )
        .bind(user_id)
        .bind(now)
        .fetch_all(&self.pool)
        .await
    }

    /// Revoke a session. Returns false if it was already revoked (or missing).
    pub async fn revoke(&self, id: i64, now: i64) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE refresh_sessions SET revoked_at = ? WHERE id = ? AND revoked_at IS NULL",
        )
        .bind(now)
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Revoke a session inside the caller's transaction.
    pub async fn revoke_in(
        &self,
        tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
        id: i64,
        now: i64,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE refresh_sessions SET revoked_at = ? WHERE id = ? AND revoked_at IS NULL",
        )
        .bind(now)
        .bind(id)
        .execute(&mut **tx)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Revoke every unrevoked session of a user with one timestamp.
    pub async fn revoke_all_by_user(
        &self,
        tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
        user_id: i64,
        now: i64,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE refresh_sessions SET revoked_at = ? WHERE user_id = ? AND revoked_at IS NULL",
        )
        .bind(now)
        .bind(user_id)
        .execute(&mut **tx)
        .await?;
        Ok(result.rows_affected())
    }

    /// Delete all sessions of a user (account deletion).
    pub async fn delete_by_user(
        &self,
        tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
        user_id: i64,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM refresh_sessions WHERE user_id = ?")
            .bind(user_id)
            .execute(&mut **tx)
            .await?;
        Ok(result.rows_affected())
    }
}
