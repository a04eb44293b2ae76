//! SurrealDB-backed security stores: token revocation, login lockout,
//! and password-reset tokens.
//!
//! All three sets live in the shared database so every server process
//! sees the same state. Entries carry their own `expires_at` and are
//! ignored once past it; `cleanup_expired` sweeps them out.

use chrono::{DateTime, Duration, Utc};
use ims_core::error::ImsResult;
use ims_core::repository::{LockoutStore, ResetTokenStore, RevocationStore};
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use crate::error::DbError;

#[derive(Debug, SurrealValue)]
struct JtiRow {
    #[allow(dead_code)]
    jti: String,
}

#[derive(Debug, SurrealValue)]
struct AttemptRow {
    attempts: u64,
}

#[derive(Debug, SurrealValue)]
struct LockRow {
    #[allow(dead_code)]
    locked_until: Option<DateTime<Utc>>,
}

#[derive(Debug, SurrealValue)]
struct ResetRow {
    user_id: String,
}

#[derive(Debug, SurrealValue)]
struct CountRow {
    total: u64,
}

/// SurrealDB implementation of the shared security stores.
#[derive(Clone)]
pub struct SurrealSecurityStore<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealSecurityStore<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

impl<C: Connection> RevocationStore for SurrealSecurityStore<C> {
    async fn revoke(&self, jti: Uuid, expires_at: DateTime<Utc>) -> ImsResult<()> {
        let result = self
            .db
            .query(
                "CREATE revoked_token SET \
                 jti = $jti, expires_at = $expires_at",
            )
            .bind(("jti", jti.to_string()))
            .bind(("expires_at", expires_at))
            .await
            .map_err(DbError::from)?;

        // Revoking an already-revoked token is a no-op, not an error.
        if let Err(e) = result.check() {
            if !crate::error::is_unique_violation(&e) {
                return Err(DbError::Query(e.to_string()).into());
            }
        }

        Ok(())
    }

    async fn is_revoked(&self, jti: Uuid) -> ImsResult<bool> {
        let mut result = self
            .db
            .query(
                "SELECT jti FROM revoked_token \
                 WHERE jti = $jti AND expires_at > time::now()",
            )
            .bind(("jti", jti.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<JtiRow> = result.take(0).map_err(DbError::from)?;
        Ok(!rows.is_empty())
    }

    async fn cleanup_expired(&self) -> ImsResult<u64> {
        let mut count_result = self
            .db
            .query(
                "SELECT count() AS total FROM revoked_token \
                 WHERE expires_at <= time::now() GROUP ALL",
            )
            .await
            .map_err(DbError::from)?;
        let rows: Vec<CountRow> = count_result.take(0).map_err(DbError::from)?;
        let total = rows.first().map(|r| r.total).unwrap_or(0);

        self.db
            .query("DELETE revoked_token WHERE expires_at <= time::now()")
            .await
            .map_err(DbError::from)?;

        Ok(total)
    }
}

impl<C: Connection> LockoutStore for SurrealSecurityStore<C> {
    async fn record_failure(&self, username: &str, window_secs: u64) -> ImsResult<u64> {
        let expires_at = Utc::now() + Duration::seconds(window_secs as i64);

        // Increment a live counter or start a fresh one; stale rows
        // (past their window) are replaced rather than resumed.
        let result = self
            .db
            .query(
                "BEGIN TRANSACTION; \
                 LET $live = (SELECT attempts FROM login_attempt \
                 WHERE username = $username AND expires_at > time::now()); \
                 IF array::len($live) > 0 { \
                     UPDATE login_attempt SET \
                     attempts += 1, expires_at = $expires_at \
                     WHERE username = $username; \
                 } ELSE { \
                     DELETE login_attempt WHERE username = $username; \
                     CREATE login_attempt SET \
                     username = $username, attempts = 1, \
                     locked_until = NONE, expires_at = $expires_at; \
                 }; \
                 COMMIT TRANSACTION;",
            )
            .bind(("username", username.to_string()))
            .bind(("expires_at", expires_at))
            .await
            .map_err(DbError::from)?;

        result.check().map_err(|e| DbError::Query(e.to_string()))?;

        let mut result = self
            .db
            .query("SELECT attempts FROM login_attempt WHERE username = $username")
            .bind(("username", username.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<AttemptRow> = result.take(0).map_err(DbError::from)?;
        Ok(rows.first().map(|r| r.attempts).unwrap_or(0))
    }

    async fn lock(&self, username: &str, duration_secs: u64) -> ImsResult<()> {
        let until = Utc::now() + Duration::seconds(duration_secs as i64);

        self.db
            .query(
                "UPDATE login_attempt SET \
                 locked_until = $until, expires_at = $until \
                 WHERE username = $username",
            )
            .bind(("username", username.to_string()))
            .bind(("until", until))
            .await
            .map_err(DbError::from)?;

        Ok(())
    }

    async fn is_locked(&self, username: &str) -> ImsResult<bool> {
        let mut result = self
            .db
            .query(
                "SELECT locked_until FROM login_attempt \
                 WHERE username = $username \
                 AND locked_until != NONE \
                 AND locked_until > time::now()",
            )
            .bind(("username", username.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<LockRow> = result.take(0).map_err(DbError::from)?;
        Ok(!rows.is_empty())
    }

    async fn clear(&self, username: &str) -> ImsResult<()> {
        self.db
            .query("DELETE login_attempt WHERE username = $username")
            .bind(("username", username.to_string()))
            .await
            .map_err(DbError::from)?;

        Ok(())
    }
}

impl<C: Connection> ResetTokenStore for SurrealSecurityStore<C> {
    async fn insert(&self, token: &str, user_id: Uuid, ttl_secs: u64) -> ImsResult<()> {
        let expires_at = Utc::now() + Duration::seconds(ttl_secs as i64);

        self.db
            .query(
                "CREATE reset_token SET \
                 token = $tok, user_id = $user_id, \
                 expires_at = $expires_at",
            )
            .bind(("tok", token.to_string()))
            .bind(("user_id", user_id.to_string()))
            .bind(("expires_at", expires_at))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(|e| DbError::Query(e.to_string()))?;

        Ok(())
    }

    async fn consume(&self, token: &str) -> ImsResult<Option<Uuid>> {
        // Single-use: the lookup deletes the row in the same
        // transaction, so a token can never be redeemed twice.
        let mut result = self
            .db
            .query(
                "BEGIN TRANSACTION; \
                 LET $hit = (SELECT user_id FROM reset_token \
                 WHERE token = $tok AND expires_at > time::now()); \
                 DELETE reset_token WHERE token = $tok; \
                 RETURN $hit; \
                 COMMIT TRANSACTION;",
            )
            .bind(("tok", token.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<ResetRow> = result.take(0).map_err(DbError::from)?;
        let Some(row) = rows.into_iter().next() else {
            return Ok(None);
        };

        let user_id = Uuid::parse_str(&row.user_id)
            .map_err(|e| DbError::Query(format!("invalid user UUID: {e}")))?;
        Ok(Some(user_id))
    }
}
