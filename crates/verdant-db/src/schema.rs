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
// Schema v1: profiles, requests, file records, audits
// -----------------------------------------------------------------------

const SCHEMA_V1: &str = "\
-- =======================================================================
-- Profiles (one per identity-provider subject)
-- =======================================================================
DEFINE TABLE profile SCHEMAFULL;
DEFINE FIELD user_id ON TABLE profile TYPE string;
DEFINE FIELD role ON TABLE profile TYPE string \
    ASSERT $value IN ['owner', 'admin', 'auditor'];
DEFINE FIELD organization_name ON TABLE profile TYPE option<string>;
DEFINE FIELD phone_number ON TABLE profile TYPE option<string>;
DEFINE FIELD address ON TABLE profile TYPE option<string>;
DEFINE FIELD created_at ON TABLE profile TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE profile TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_profile_user ON TABLE profile COLUMNS user_id UNIQUE;
DEFINE INDEX idx_profile_role ON TABLE profile COLUMNS role;

-- =======================================================================
-- Certification requests
-- =======================================================================
DEFINE TABLE request SCHEMAFULL;
DEFINE FIELD user_id ON TABLE request TYPE string;
DEFINE FIELD auditor_id ON TABLE request TYPE option<string>;
DEFINE FIELD status ON TABLE request TYPE string \
    ASSERT $value IN ['submitted', 'quoted', 'contract_signed', \
    'files_uploaded', 'auditor_assigned', 'audit_in_progress', \
    'audit_submitted', 'approved', 'rejected', 'certificate_issued'];
DEFINE FIELD project_type ON TABLE request TYPE string;
DEFINE FIELD project_area ON TABLE request TYPE option<string>;
DEFINE FIELD location ON TABLE request TYPE option<string>;
DEFINE FIELD description ON TABLE request TYPE option<string>;
DEFINE FIELD price_quote ON TABLE request TYPE option<int> \
    ASSERT $value = NONE OR $value > 0;
DEFINE FIELD admin_comment ON TABLE request TYPE option<string>;
DEFINE FIELD created_at ON TABLE request TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE request TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_request_user ON TABLE request COLUMNS user_id;
DEFINE INDEX idx_request_auditor ON TABLE request COLUMNS auditor_id;

-- =======================================================================
-- File records (append-only metadata of uploaded objects)
-- =======================================================================
DEFINE TABLE file_record SCHEMAFULL
    PERMISSIONS
        FOR create FULL
        FOR select FULL
        FOR update NONE
        FOR delete NONE;
DEFINE FIELD request_id ON TABLE file_record TYPE string;
DEFINE FIELD user_id ON TABLE file_record TYPE string;
DEFINE FIELD url ON TABLE file_record TYPE string;
DEFINE FIELD name ON TABLE file_record TYPE string;
DEFINE FIELD category ON TABLE file_record TYPE string \
    ASSERT $value IN ['project_file', 'contract', 'audit_report', \
    'certificate', 'other'];
DEFINE FIELD created_at ON TABLE file_record TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_file_request_category ON TABLE file_record \
    COLUMNS request_id, category;

-- =======================================================================
-- Audits (at most one per request, keyed by the request id)
-- =======================================================================
DEFINE TABLE audit SCHEMAFULL;
DEFINE FIELD request_id ON TABLE audit TYPE string;
DEFINE FIELD auditor_id ON TABLE audit TYPE string;
DEFINE FIELD checklist ON TABLE audit TYPE object FLEXIBLE DEFAULT {};
DEFINE FIELD conclusion ON TABLE audit TYPE option<string>;
DEFINE FIELD submitted_at ON TABLE audit TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_audit_request ON TABLE audit COLUMNS request_id UNIQUE;
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
        .map_err(|e| DbError::Migration(e.to_string()))?;

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
                DbError::Migration(format!(
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
                DbError::Migration(format!(
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
