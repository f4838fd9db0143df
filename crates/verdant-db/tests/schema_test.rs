//! Integration tests for schema initialization using in-memory SurrealDB.

use surrealdb::Surreal;
use surrealdb::engine::local::{Db, Mem};

async fn migrated() -> Surreal<Db> {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();
    verdant_db::run_migrations(&db).await.unwrap();
    db
}

#[tokio::test]
async fn schema_migration_applies_successfully() {
    let db = migrated().await;

    let mut result = db.query("INFO FOR DB").await.unwrap();
    let info: Option<surrealdb_types::Value> = result.take(0).unwrap();
    let info = info.expect("INFO FOR DB should return a value");
    let info_str = format!("{:?}", info);

    for table in ["profile", "request", "file_record", "audit", "_migration"] {
        assert!(info_str.contains(table), "missing {table} table");
    }
}

#[tokio::test]
async fn migration_is_idempotent() {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();

    verdant_db::run_migrations(&db).await.unwrap();
    verdant_db::run_migrations(&db).await.unwrap();

    let mut result = db.query("SELECT * FROM _migration").await.unwrap();
    let records: Vec<surrealdb_types::Value> = result.take(0).unwrap();
    assert_eq!(records.len(), 1, "expected exactly one migration record");
}

#[tokio::test]
async fn unknown_status_is_rejected_by_the_schema() {
    let db = migrated().await;

    let result = db
        .query(
            "CREATE request SET user_id = 'u1', status = 'archived', \
             project_type = 'residential'",
        )
        .await
        .unwrap()
        .check();

    assert!(result.is_err(), "status outside the workflow should fail");
}

#[tokio::test]
async fn unknown_role_is_rejected_by_the_schema() {
    let db = migrated().await;

    let result = db
        .query("CREATE profile SET user_id = 'u1', role = 'superuser'")
        .await
        .unwrap()
        .check();

    assert!(result.is_err(), "role outside owner/admin/auditor should fail");
}

#[tokio::test]
async fn unique_index_prevents_second_profile_for_subject() {
    let db = migrated().await;

    db.query("CREATE profile SET user_id = 'u1', role = 'owner'")
        .await
        .unwrap()
        .check()
        .unwrap();

    let result = db
        .query("CREATE profile SET user_id = 'u1', role = 'admin'")
        .await
        .unwrap()
        .check();

    assert!(result.is_err(), "duplicate user_id should be rejected");
}

#[tokio::test]
async fn non_positive_quote_is_rejected_by_the_schema() {
    let db = migrated().await;

    let result = db
        .query(
            "CREATE request SET user_id = 'u1', status = 'quoted', \
             project_type = 'residential', price_quote = 0",
        )
        .await
        .unwrap()
        .check();

    assert!(result.is_err(), "zero quote should be rejected");
}
