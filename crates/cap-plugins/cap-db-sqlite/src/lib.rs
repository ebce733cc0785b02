//! # cap-db-sqlite Implementation
//!
//! This module implements the data mapping between the SQLite relational
//! model and the `cap-core` domain models.

use std::str::FromStr;

use async_trait::async_trait;
use cap_core::error::AppError;
use cap_core::models::{ImageRecord, ImageStatus, NewImage};
use cap_core::traits::ImageRepo;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqliteRow};
use sqlx::Row;
use uuid::Uuid;

pub struct SqliteImageRepo {
    pool: SqlitePool,
}

// Helpers for UUID conversion
fn uuid_to_blob(id: Uuid) -> Vec<u8> {
    id.as_bytes().to_vec()
}

fn blob_to_uuid(blob: &[u8]) -> Uuid {
    Uuid::from_slice(blob).unwrap_or_default()
}

impl SqliteImageRepo {
    /// Connects (creating the database file if needed) and bootstraps
    /// the schema.
    pub async fn new(url: &str) -> anyhow::Result<Self> {
        let options = SqliteConnectOptions::from_str(url)?.create_if_missing(true);
        let pool = SqlitePool::connect_with(options).await?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS images (
                id                 BLOB PRIMARY KEY,
                owner_id           TEXT NOT NULL,
                original_filename  TEXT NOT NULL,
                stored_filename    TEXT NOT NULL,
                content_type       TEXT NOT NULL,
                size_bytes         INTEGER NOT NULL,
                status             TEXT NOT NULL,
                description        TEXT,
                ai_model           TEXT NOT NULL,
                processing_time_ms INTEGER,
                created_at         TEXT NOT NULL
            )",
        )
        .execute(&pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_images_owner_created
             ON images (owner_id, created_at DESC)",
        )
        .execute(&pool)
        .await?;

        log::info!("image store ready at {url}");
        Ok(Self { pool })
    }
}

/// Maps a SQL row back to the domain model. An unknown status string
/// means the row was written by something other than this store.
fn map_row(row: &SqliteRow) -> anyhow::Result<ImageRecord> {
    let status_raw: String = row.get("status");
    let status = ImageStatus::parse(&status_raw)
        .ok_or_else(|| AppError::Internal(format!("unknown image status '{status_raw}'")))?;

    Ok(ImageRecord {
        id: blob_to_uuid(row.get::<Vec<u8>, _>("id").as_slice()),
        owner_id: row.get("owner_id"),
        original_filename: row.get("original_filename"),
        stored_filename: row.get("stored_filename"),
        content_type: row.get("content_type"),
        size_bytes: row.get("size_bytes"),
        status,
        description: row.get("description"),
        ai_model: row.get("ai_model"),
        processing_time_ms: row.get("processing_time_ms"),
        created_at: row.get("created_at"),
    })
}

const UPSERT: &str = "INSERT OR REPLACE INTO images
    (id, owner_id, original_filename, stored_filename, content_type,
     size_bytes, status, description, ai_model, processing_time_ms, created_at)
    VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)";

async fn save(pool: &SqlitePool, record: &ImageRecord) -> anyhow::Result<()> {
    sqlx::query(UPSERT)
        .bind(uuid_to_blob(record.id))
        .bind(&record.owner_id)
        .bind(&record.original_filename)
        .bind(&record.stored_filename)
        .bind(&record.content_type)
        .bind(record.size_bytes)
        .bind(record.status.as_str())
        .bind(&record.description)
        .bind(&record.ai_model)
        .bind(record.processing_time_ms)
        .bind(record.created_at)
        .execute(pool)
        .await?;
    Ok(())
}

#[async_trait]
impl ImageRepo for SqliteImageRepo {
    async fn create(&self, new: NewImage) -> anyhow::Result<ImageRecord> {
        let record = new.into_record();
        save(&self.pool, &record).await?;
        Ok(record)
    }

    /// Full replace, last-write-wins. No version token, so overlapping
    /// updates on the same id silently take the later write.
    async fn update(&self, record: &ImageRecord) -> anyhow::Result<ImageRecord> {
        save(&self.pool, record).await?;
        Ok(record.clone())
    }

    async fn get_by_id(&self, id: Uuid) -> anyhow::Result<Option<ImageRecord>> {
        let row = sqlx::query("SELECT * FROM images WHERE id = ?")
            .bind(uuid_to_blob(id))
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(map_row).transpose()
    }

    async fn list_by_owner(&self, owner_id: &str) -> anyhow::Result<Vec<ImageRecord>> {
        let rows =
            sqlx::query("SELECT * FROM images WHERE owner_id = ? ORDER BY created_at DESC")
                .bind(owner_id)
                .fetch_all(&self.pool)
                .await?;

        rows.iter().map(map_row).collect()
    }

    async fn list_by_owner_and_status(
        &self,
        owner_id: &str,
        status: ImageStatus,
    ) -> anyhow::Result<Vec<ImageRecord>> {
        let rows = sqlx::query("SELECT * FROM images WHERE owner_id = ? AND status = ?")
            .bind(owner_id)
            .bind(status.as_str())
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(map_row).collect()
    }

    async fn count_by_owner(&self, owner_id: &str) -> anyhow::Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM images WHERE owner_id = ?")
            .bind(owner_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    async fn search_by_filename(
        &self,
        owner_id: &str,
        term: &str,
    ) -> anyhow::Result<Vec<ImageRecord>> {
        let rows = sqlx::query(
            "SELECT * FROM images
             WHERE owner_id = ? AND original_filename LIKE '%' || ? || '%'
             ORDER BY created_at DESC",
        )
        .bind(owner_id)
        .bind(term)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(map_row).collect()
    }

    async fn delete_by_id(&self, id: Uuid) -> anyhow::Result<bool> {
        let result = sqlx::query("DELETE FROM images WHERE id = ?")
            .bind(uuid_to_blob(id))
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
