//! Integration tests for the shared security store: token revocation,
//! login lockout counters, and password-reset tokens.

use chrono::{Duration, Utc};
use ims_core::repository::{LockoutStore, ResetTokenStore, RevocationStore};
use ims_db::repository::SurrealSecurityStore;
use surrealdb::Surreal;
use surrealdb::engine::local::Mem;
use uuid::Uuid;

/// Helper: spin up in-memory DB and run migrations.
async fn setup() -> SurrealSecurityStore<surrealdb::engine::local::Db> {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();
    ims_db::run_migrations(&db).await.unwrap();
    SurrealSecurityStore::new(db)
}

#[tokio::test]
async fn revoked_jti_is_reported_until_expiry() {
    let store = setup().await;
    let jti = Uuid::new_v4();

    assert!(!store.is_revoked(jti).await.unwrap());

    store
        .revoke(jti, Utc::now() + Duration::hours(1))
        .await
        .unwrap();
    assert!(store.is_revoked(jti).await.unwrap());

    // Revoking twice is a no-op, not an error.
    store
        .revoke(jti, Utc::now() + Duration::hours(1))
        .await
        .unwrap();
}

#[tokio::test]
async fn expired_revocations_no_longer_match_and_get_swept() {
    let store = setup().await;
    let jti = Uuid::new_v4();

    // Entry whose TTL has already elapsed.
    store
        .revoke(jti, Utc::now() - Duration::seconds(5))
        .await
        .unwrap();
    assert!(!store.is_revoked(jti).await.unwrap());

    let swept = store.cleanup_expired().await.unwrap();
    assert_eq!(swept, 1);
    assert_eq!(store.cleanup_expired().await.unwrap(), 0);
}

#[tokio::test]
async fn failure_counter_increments_per_username() {
    let store = setup().await;

    assert_eq!(store.record_failure("mallory", 900).await.unwrap(), 1);
    assert_eq!(store.record_failure("mallory", 900).await.unwrap(), 2);
    assert_eq!(store.record_failure("mallory", 900).await.unwrap(), 3);
    // Counters are independent between usernames.
    assert_eq!(store.record_failure("trent", 900).await.unwrap(), 1);
}

#[tokio::test]
async fn lock_and_clear_lifecycle() {
    let store = setup().await;

    store.record_failure("mallory", 900).await.unwrap();
    assert!(!store.is_locked("mallory").await.unwrap());

    store.lock("mallory", 900).await.unwrap();
    assert!(store.is_locked("mallory").await.unwrap());

    // Clearing (successful login) releases the lock and the counter.
    store.clear("mallory").await.unwrap();
    assert!(!store.is_locked("mallory").await.unwrap());
    assert_eq!(store.record_failure("mallory", 900).await.unwrap(), 1);
}

#[tokio::test]
async fn an_expired_lock_no_longer_holds() {
    let store = setup().await;

    store.record_failure("mallory", 900).await.unwrap();
    // Zero-duration lock: already past its own expiry.
    store.lock("mallory", 0).await.unwrap();
    assert!(!store.is_locked("mallory").await.unwrap());
}

#[tokio::test]
async fn reset_tokens_are_single_use() {
    let store = setup().await;
    let user_id = Uuid::new_v4();

    store.insert("reset-abc", user_id, 1800).await.unwrap();

    assert_eq!(store.consume("reset-abc").await.unwrap(), Some(user_id));
    // Second redemption fails: the token was deleted with the lookup.
    assert_eq!(store.consume("reset-abc").await.unwrap(), None);

    assert_eq!(store.consume("never-issued").await.unwrap(), None);
}

#[tokio::test]
async fn expired_reset_token_is_rejected() {
    let store = setup().await;

    store.insert("stale", Uuid::new_v4(), 0).await.unwrap();
    assert_eq!(store.consume("stale").await.unwrap(), None);
}
