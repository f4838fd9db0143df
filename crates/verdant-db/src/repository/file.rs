//! SurrealDB implementation of [`FileRepository`].
//!
//! File records are append-only: the table refuses updates and deletes.

use chrono::{DateTime, Utc};
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;
use verdant_core::error::VerdantResult;
use verdant_core::models::file::{CreateFileRecord, FileCategory, FileRecord};
use verdant_core::repository::FileRepository;

use crate::error::DbError;

#[derive(Debug, SurrealValue)]
struct FileRow {
    request_id: String,
    user_id: String,
    url: String,
    name: String,
    category: String,
    created_at: DateTime<Utc>,
}

#[derive(Debug, SurrealValue)]
struct FileRowWithId {
    record_id: String,
    request_id: String,
    user_id: String,
    url: String,
    name: String,
    category: String,
    created_at: DateTime<Utc>,
}

/// Row struct for count queries.
#[derive(Debug, SurrealValue)]
struct CountRow {
    total: u64,
}

fn parse_category(s: &str) -> Result<FileCategory, DbError> {
    s.parse::<FileCategory>()
        .map_err(|_| DbError::Decode(format!("unknown file category: {s}")))
}

fn parse_request_id(s: &str) -> Result<Uuid, DbError> {
    Uuid::parse_str(s).map_err(|e| DbError::Decode(format!("invalid request UUID: {e}")))
}

impl FileRow {
    fn into_file(self, id: Uuid) -> Result<FileRecord, DbError> {
        Ok(FileRecord {
            id,
            request_id: parse_request_id(&self.request_id)?,
            user_id: self.user_id,
            url: self.url,
            name: self.name,
            category: parse_category(&self.category)?,
            created_at: self.created_at,
        })
    }
}

impl FileRowWithId {
    fn try_into_file(self) -> Result<FileRecord, DbError> {
        let id = Uuid::parse_str(&self.record_id)
            .map_err(|e| DbError::Decode(format!("invalid file UUID: {e}")))?;
        Ok(FileRecord {
            id,
            request_id: parse_request_id(&self.request_id)?,
            user_id: self.user_id,
            url: self.url,
            name: self.name,
            category: parse_category(&self.category)?,
            created_at: self.created_at,
        })
    }
}

/// SurrealDB implementation of the File repository.
#[derive(Clone)]
pub struct SurrealFileRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealFileRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

impl<C: Connection> FileRepository for SurrealFileRepository<C> {
    async fn create(&self, input: CreateFileRecord) -> VerdantResult<FileRecord> {
        let id = Uuid::new_v4();
        let id_str = id.to_string();

        let result = self
            .db
            .query(
                "CREATE type::record('file_record', $id) SET \
                 request_id = $request_id, user_id = $user_id, \
                 url = $url, name = $name, category = $category",
            )
            .bind(("id", id_str.clone()))
            .bind(("request_id", input.request_id.to_string()))
            .bind(("user_id", input.user_id))
            .bind(("url", input.url))
            .bind(("name", input.name))
            .bind(("category", input.category.as_str().to_string()))
            .await
            .map_err(DbError::from)?;

        let mut result = result
            .check()
            .map_err(|e| DbError::from_statement("file_record", &id_str, e.to_string()))?;

        let rows: Vec<FileRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "file_record".into(),
            id: id_str,
        })?;

        Ok(row.into_file(id)?)
    }

    async fn list_by_request(&self, request_id: Uuid) -> VerdantResult<Vec<FileRecord>> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM file_record \
                 WHERE request_id = $request_id \
                 ORDER BY created_at ASC",
            )
            .bind(("request_id", request_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<FileRowWithId> = result.take(0).map_err(DbError::from)?;
        let files = rows
            .into_iter()
            .map(|r| r.try_into_file())
            .collect::<Result<Vec<_>, _>>()?;

        Ok(files)
    }

    async fn count_by_category(
        &self,
        request_id: Uuid,
        category: FileCategory,
    ) -> VerdantResult<u64> {
        let mut result = self
            .db
            .query(
                "SELECT count() AS total FROM file_record \
                 WHERE request_id = $request_id AND category = $category \
                 GROUP ALL",
            )
            .bind(("request_id", request_id.to_string()))
            .bind(("category", category.as_str().to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<CountRow> = result.take(0).map_err(DbError::from)?;
        Ok(rows.first().map(|r| r.total).unwrap_or(0))
    }

    async fn latest_by_category(
        &self,
        request_id: Uuid,
        category: FileCategory,
    ) -> VerdantResult<Option<FileRecord>> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM file_record \
                 WHERE request_id = $request_id AND category = $category \
                 ORDER BY created_at DESC LIMIT 1",
            )
            .bind(("request_id", request_id.to_string()))
            .bind(("category", category.as_str().to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<FileRowWithId> = result.take(0).map_err(DbError::from)?;
        let file = rows.into_iter().next().map(|r| r.try_into_file()).transpose()?;
        Ok(file)
    }
}
