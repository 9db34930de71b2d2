//! Mutual-exclusion locking over the `locks` table.
//!
//! Per §4.7: the lock must be backed by the same store as transactions so a
//! hold survives process restarts, and release must be fenced against a
//! holder whose TTL already expired and was reissued to someone else.

use sea_orm::{ConnectionTrait, DatabaseConnection, DbBackend, Statement};
use uuid::Uuid;

use crate::errors::{EngineError, EngineResult};

pub struct RecordLocker;

impl RecordLocker {
    /// Acquires `key` for `ttl`, returning a fencing token on success. An
    /// existing non-expired row blocks acquisition; an expired row is
    /// reclaimed atomically via the upsert's `WHERE` clause.
    pub async fn acquire(db: &DatabaseConnection, key: &str, ttl: chrono::Duration) -> EngineResult<Option<String>> {
        let token = Uuid::new_v4().to_string();
        let expires_at = chrono::Utc::now().naive_utc() + ttl;

        let stmt = Statement::from_sql_and_values(
            DbBackend::Postgres,
            r#"
            INSERT INTO locks (key, token, expires_at)
            VALUES ($1, $2, $3)
            ON CONFLICT (key) DO UPDATE
                SET token = EXCLUDED.token, expires_at = EXCLUDED.expires_at
                WHERE locks.expires_at < now()
            RETURNING token
            "#,
            [key.into(), token.clone().into(), expires_at.into()],
        );

        let row = db.query_one(stmt).await?;
        match row {
            Some(row) => {
                let held_token: String = row.try_get("", "token").map_err(|e| EngineError::internal(e.to_string()))?;
                if held_token == token {
                    Ok(Some(token))
                } else {
                    Ok(None)
                }
            }
            None => Ok(None),
        }
    }

    /// Releases `key` only if `token` matches the current holder. A mismatch
    /// (stale holder, already reissued) is not an error — the caller simply
    /// lost the race and must not proceed as if it held the lock.
    pub async fn release(db: &DatabaseConnection, key: &str, token: &str) -> EngineResult<bool> {
        let stmt = Statement::from_sql_and_values(
            DbBackend::Postgres,
            "DELETE FROM locks WHERE key = $1 AND token = $2 RETURNING key",
            [key.into(), token.into()],
        );

        let row = db.query_one(stmt).await?;
        Ok(row.is_some())
    }

    /// Runs `f` while holding the lock on `key`, releasing it on every exit
    /// path. A normal return releases inline; if the `with_lock` future
    /// itself is dropped before completion (caller cancelled, a surrounding
    /// `timeout` fired), `LockGuard::drop` still fires the release so the
    /// held row never outlives the call by more than the fire-and-forget
    /// release task takes to run.
    pub async fn with_lock<T, F, Fut>(db: &DatabaseConnection, key: &str, ttl: chrono::Duration, f: F) -> EngineResult<T>
    where
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = EngineResult<T>>,
    {
        let token = Self::acquire(db, key, ttl)
            .await?
            .ok_or_else(|| EngineError::lock(format!("could not acquire lock for {key}")))?;

        let guard = LockGuard::new(db.clone(), key.to_string(), token);

        let result = f().await;

        guard.release().await;

        result
    }
}

/// Holds a lock's release obligation. `release()` consumes it on the normal
/// path; if dropped while still armed (the owning future was cancelled), it
/// spawns a detached task to release the row instead, since `Drop` cannot
/// `.await`.
struct LockGuard {
    db: DatabaseConnection,
    key: String,
    token: String,
    armed: bool,
}

impl LockGuard {
    fn new(db: DatabaseConnection, key: String, token: String) -> Self {
        Self { db, key, token, armed: true }
    }

    async fn release(mut self) {
        self.armed = false;
        if let Err(e) = RecordLocker::release(&self.db, &self.key, &self.token).await {
            tracing::warn!(lock_key = %self.key, error = %e, "failed to release lock after operation");
        }
    }
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let db = self.db.clone();
        let key = self.key.clone();
        let token = self.token.clone();
        tokio::spawn(async move {
            if let Err(e) = RecordLocker::release(&db, &key, &token).await {
                tracing::warn!(lock_key = %key, error = %e, "failed to release abandoned lock");
            }
        });
    }
}
