//! Schema definitions and migration runner for SurrealDB.
//!
//! All table definitions use SCHEMAFULL mode for data integrity.
//! UUIDs are stored as strings. Enums are stored as strings with
//! ASSERT constraints for validation.

use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use tracing::info;

use crate::error::DbError;

// -----------------------------------------------------------------------
// Migration tracking
// -----------------------------------------------------------------------

const MIGRATION_TABLE_DDL: &str = "\
DEFINE TABLE IF NOT EXISTS _migration SCHEMAFULL;
DEFINE FIELD IF NOT EXISTS version ON TABLE _migration TYPE int;
DEFINE FIELD IF NOT EXISTS name ON TABLE _migration TYPE string;
DEFINE FIELD IF NOT EXISTS applied_at ON TABLE _migration TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX IF NOT EXISTS idx_migration_version ON TABLE _migration \
    COLUMNS version UNIQUE;
";

#[derive(Debug, SurrealValue)]
struct MigrationRecord {
    version: u32,
    #[allow(dead_code)]
    name: String,
}

struct Migration {
    version: u32,
    name: &'static str,
    sql: &'static str,
}

static MIGRATIONS: &[Migration] = &[Migration {
    version: 1,
    name: "initial_schema",
    sql: SCHEMA_V1,
}];

// -----------------------------------------------------------------------
// Schema v1 — initial table definitions
// -----------------------------------------------------------------------

const SCHEMA_V1: &str = "\
-- =======================================================================
-- Users (global scope)
-- =======================================================================
DEFINE TABLE user SCHEMAFULL;
DEFINE FIELD username ON TABLE user TYPE string;
DEFINE FIELD email ON TABLE user TYPE string;
DEFINE FIELD password_hash ON TABLE user TYPE string;
DEFINE FIELD is_active ON TABLE user TYPE bool DEFAULT true;
DEFINE FIELD last_login ON TABLE user TYPE option<datetime>;
DEFINE FIELD created_at ON TABLE user TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE user TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_user_username ON TABLE user COLUMNS username UNIQUE;
DEFINE INDEX idx_user_email ON TABLE user COLUMNS email UNIQUE;

-- =======================================================================
-- Sites (the tenancy boundary)
-- =======================================================================
DEFINE TABLE site SCHEMAFULL;
DEFINE FIELD name ON TABLE site TYPE string;
DEFINE FIELD description ON TABLE site TYPE string DEFAULT '';
DEFINE FIELD is_active ON TABLE site TYPE bool DEFAULT true;
DEFINE FIELD created_at ON TABLE site TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE site TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_site_name ON TABLE site COLUMNS name UNIQUE;

-- =======================================================================
-- Memberships (user x site, the authorization edge)
-- =======================================================================
DEFINE TABLE membership SCHEMAFULL;
DEFINE FIELD user_id ON TABLE membership TYPE string;
DEFINE FIELD site_id ON TABLE membership TYPE string;
DEFINE FIELD role ON TABLE membership TYPE string \
    ASSERT $value IN ['Admin', 'User'];
DEFINE FIELD assigned_at ON TABLE membership TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_membership_user_site ON TABLE membership \
    COLUMNS user_id, site_id UNIQUE;
DEFINE INDEX idx_membership_site ON TABLE membership COLUMNS site_id;
DEFINE INDEX idx_membership_site_role ON TABLE membership \
    COLUMNS site_id, role;

-- =======================================================================
-- Interactions (site-scoped tenant records)
-- =======================================================================
DEFINE TABLE interaction SCHEMAFULL;
DEFINE FIELD site_id ON TABLE interaction TYPE string;
DEFINE FIELD title ON TABLE interaction TYPE string;
DEFINE FIELD kind ON TABLE interaction TYPE string \
    ASSERT $value IN ['Meeting', 'Call', 'Email', 'Update', \
    'Training', 'Review', 'Presentation', 'Conference', 'Workshop', \
    'Other'];
DEFINE FIELD lead ON TABLE interaction TYPE string;
DEFINE FIELD start_datetime ON TABLE interaction TYPE datetime;
DEFINE FIELD end_datetime ON TABLE interaction TYPE option<datetime>;
DEFINE FIELD timezone ON TABLE interaction TYPE string;
DEFINE FIELD location ON TABLE interaction TYPE option<string>;
DEFINE FIELD description ON TABLE interaction TYPE option<string>;
DEFINE FIELD notes ON TABLE interaction TYPE option<string>;
DEFINE FIELD created_by ON TABLE interaction TYPE string;
DEFINE FIELD created_at ON TABLE interaction TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_by ON TABLE interaction TYPE option<string>;
DEFINE FIELD updated_at ON TABLE interaction TYPE option<datetime>;
DEFINE INDEX idx_interaction_site ON TABLE interaction \
    COLUMNS site_id;
DEFINE INDEX idx_interaction_site_start ON TABLE interaction \
    COLUMNS site_id, start_datetime;

-- =======================================================================
-- Revoked tokens (shared revocation set, self-pruning)
-- =======================================================================
DEFINE TABLE revoked_token SCHEMAFULL;
DEFINE FIELD jti ON TABLE revoked_token TYPE string;
DEFINE FIELD expires_at ON TABLE revoked_token TYPE datetime;
DEFINE INDEX idx_revoked_jti ON TABLE revoked_token \
    COLUMNS jti UNIQUE;

-- =======================================================================
-- Login attempts (shared lockout counters, self-pruning)
-- =======================================================================
DEFINE TABLE login_attempt SCHEMAFULL;
DEFINE FIELD username ON TABLE login_attempt TYPE string;
DEFINE FIELD attempts ON TABLE login_attempt TYPE int DEFAULT 0;
DEFINE FIELD locked_until ON TABLE login_attempt \
    TYPE option<datetime>;
DEFINE FIELD expires_at ON TABLE login_attempt TYPE datetime;
DEFINE INDEX idx_login_attempt_username ON TABLE login_attempt \
    COLUMNS username UNIQUE;

-- =======================================================================
-- Password reset tokens (single-use, short-lived)
-- =======================================================================
DEFINE TABLE reset_token SCHEMAFULL;
DEFINE FIELD token ON TABLE reset_token TYPE string;
DEFINE FIELD user_id ON TABLE reset_token TYPE string;
DEFINE FIELD expires_at ON TABLE reset_token TYPE datetime;
DEFINE INDEX idx_reset_token ON TABLE reset_token \
    COLUMNS token UNIQUE;
";

// -----------------------------------------------------------------------
// Public API
// -----------------------------------------------------------------------

/// Run all pending migrations against the given SurrealDB client.
///
/// Creates a `_migration` tracking table on first run, then applies
/// each migration whose version exceeds the current maximum.
/// All DEFINE statements are idempotent so re-running is safe.
pub async fn run_migrations<C: Connection>(db: &Surreal<C>) -> Result<(), DbError> {
    // Ensure migration tracking table exists (idempotent).
    db.query(MIGRATION_TABLE_DDL)
        .await?
        .check()
        .map_err(|e| DbError::Query(e.to_string()))?;

    // Determine current schema version.
    let mut result = db
        .query("SELECT * FROM _migration ORDER BY version DESC LIMIT 1")
        .await?;
    let records: Vec<MigrationRecord> = result.take(0)?;
    let current_version = records.first().map(|m| m.version).unwrap_or(0);

    for migration in MIGRATIONS {
        if migration.version > current_version {
            info!(
                version = migration.version,
                name = migration.name,
                "Applying migration"
            );
            db.query(migration.sql).await?.check().map_err(|e| {
                DbError::Query(format!(
                    "Migration v{} '{}' failed: {}",
                    migration.version, migration.name, e,
                ))
            })?;

            // Record the applied migration.
            db.query(
                "CREATE _migration SET version = $version, \
                 name = $name",
            )
            .bind(("version", migration.version))
            .bind(("name", migration.name))
            .await?
            .check()
            .map_err(|e| {
                DbError::Query(format!(
                    "Failed to record migration v{}: {}",
                    migration.version, e,
                ))
            })?;

            info!(
                version = migration.version,
                "Migration applied successfully"
            );
        }
    }

    Ok(())
}

/// Returns the raw schema DDL for version 1.
///
/// Exposed for testing with in-memory SurrealDB instances that
/// bypass the migration runner.
pub fn schema_v1() -> &'static str {
    SCHEMA_V1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_v1_is_nonempty() {
        assert!(!SCHEMA_V1.is_empty());
    }

    #[test]
    fn migrations_are_ordered() {
        for window in MIGRATIONS.windows(2) {
            assert!(
                window[0].version < window[1].version,
                "Migrations must be in ascending version order"
            );
        }
    }
}
