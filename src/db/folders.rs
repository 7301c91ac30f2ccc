//! Folder repository

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::error::{AppError, Result};
use crate::library::{Folder, FolderMetadata, FolderStatus, ImageFileMeta};
use crate::ocr::OcrRegion;

/// Raw folder row; JSON columns are expanded in `into_folder`
#[derive(Debug, sqlx::FromRow)]
struct FolderRow {
    id: String,
    name: String,
    folder_name: String,
    status: String,
    image_files: String,
    ocr_results: String,
    total_images: i64,
    processed_images: i64,
    calibrated_images: i64,
    created_at: String,
    updated_at: String,
}

impl FolderRow {
    fn into_folder(self) -> Result<Folder> {
        let status = FolderStatus::parse(&self.status)
            .ok_or_else(|| AppError::Internal(format!("unknown folder status: {}", self.status)))?;

        let image_files: Vec<ImageFileMeta> = serde_json::from_str(&self.image_files)
            .map_err(|e| AppError::Internal(format!("corrupt image_files column: {}", e)))?;

        let ocr_results: HashMap<String, Vec<OcrRegion>> = serde_json::from_str(&self.ocr_results)
            .map_err(|e| AppError::Internal(format!("corrupt ocr_results column: {}", e)))?;

        Ok(Folder {
            id: self.id,
            name: self.name,
            folder_name: self.folder_name,
            status,
            image_files,
            ocr_results,
            metadata: FolderMetadata {
                total_images: self.total_images as usize,
                processed_images: self.processed_images as usize,
                calibrated_images: self.calibrated_images as usize,
            },
            created_at: parse_timestamp(&self.created_at)?,
            updated_at: parse_timestamp(&self.updated_at)?,
        })
    }
}

fn parse_timestamp(s: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| AppError::Internal(format!("corrupt timestamp: {}", e)))
}

const FOLDER_COLUMNS: &str = "id, name, folder_name, status, image_files, ocr_results, \
     total_images, processed_images, calibrated_images, created_at, updated_at";

/// Folder repository
pub struct FolderRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> FolderRepository<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Insert a new folder, assigning its id
    pub async fn create(&self, folder: &mut Folder) -> Result<()> {
        folder.id = Uuid::new_v4().to_string();
        folder.touch();

        sqlx::query(
            r#"
            INSERT INTO folders (id, name, folder_name, status, image_files, ocr_results,
                                 total_images, processed_images, calibrated_images,
                                 created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&folder.id)
        .bind(&folder.name)
        .bind(&folder.folder_name)
        .bind(folder.status.as_str())
        .bind(to_json(&folder.image_files)?)
        .bind(to_json(&folder.ocr_results)?)
        .bind(folder.metadata.total_images as i64)
        .bind(folder.metadata.processed_images as i64)
        .bind(folder.metadata.calibrated_images as i64)
        .bind(folder.created_at.to_rfc3339())
        .bind(folder.updated_at.to_rfc3339())
        .execute(self.pool)
        .await?;

        tracing::info!(
            folder_id = %folder.id,
            name = %folder.name,
            images = folder.image_files.len(),
            "Created folder"
        );

        Ok(())
    }

    pub async fn get(&self, id: &str) -> Result<Option<Folder>> {
        let row = sqlx::query_as::<_, FolderRow>(&format!(
            "SELECT {} FROM folders WHERE id = ?",
            FOLDER_COLUMNS
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        row.map(FolderRow::into_folder).transpose()
    }

    /// All folders, most recently created first
    pub async fn list(&self) -> Result<Vec<Folder>> {
        let rows = sqlx::query_as::<_, FolderRow>(&format!(
            "SELECT {} FROM folders ORDER BY created_at DESC",
            FOLDER_COLUMNS
        ))
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(FolderRow::into_folder).collect()
    }

    /// Persist the folder's current state.
    ///
    /// Counters are recomputed here from actual cardinalities (the
    /// annotation record count is queried, never trusted from the
    /// caller), and `updated_at` is refreshed. Last write wins.
    pub async fn save(&self, folder: &mut Folder) -> Result<()> {
        let calibrated: (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM annotations WHERE folder_id = ?")
                .bind(&folder.id)
                .fetch_one(self.pool)
                .await?;

        folder.recompute_metadata(calibrated.0 as usize);
        folder.touch();

        let result = sqlx::query(
            r#"
            UPDATE folders
            SET name = ?, folder_name = ?, status = ?, image_files = ?, ocr_results = ?,
                total_images = ?, processed_images = ?, calibrated_images = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(&folder.name)
        .bind(&folder.folder_name)
        .bind(folder.status.as_str())
        .bind(to_json(&folder.image_files)?)
        .bind(to_json(&folder.ocr_results)?)
        .bind(folder.metadata.total_images as i64)
        .bind(folder.metadata.processed_images as i64)
        .bind(folder.metadata.calibrated_images as i64)
        .bind(folder.updated_at.to_rfc3339())
        .bind(&folder.id)
        .execute(self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Folder not found: {}", folder.id)));
        }

        Ok(())
    }

    /// Delete a folder and cascade to its chunks and annotation records
    pub async fn delete(&self, id: &str) -> Result<bool> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM image_chunks WHERE folder_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM annotations WHERE folder_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        let result = sqlx::query("DELETE FROM folders WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        let deleted = result.rows_affected() > 0;
        if deleted {
            tracing::info!(folder_id = %id, "Deleted folder");
        }
        Ok(deleted)
    }
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<String> {
    serde_json::to_string(value).map_err(|e| AppError::Internal(format!("serialize: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_util::test_pool;
    use crate::ocr::normalize_items;
    use serde_json::json;

    fn image(name: &str) -> ImageFileMeta {
        ImageFileMeta {
            name: name.to_string(),
            mime_type: "image/jpeg".to_string(),
            size: 42,
            width: Some(100),
            height: Some(80),
            last_modified: 7,
        }
    }

    #[tokio::test]
    async fn test_create_and_get() {
        let (pool, _dir) = test_pool().await;
        let repo = FolderRepository::new(&pool);

        let mut folder = Folder::new("scans", vec![image("a.jpg"), image("b.jpg")]);
        repo.create(&mut folder).await.unwrap();
        assert!(!folder.id.is_empty());

        let loaded = repo.get(&folder.id).await.unwrap().unwrap();
        assert_eq!(loaded.name, "scans");
        assert_eq!(loaded.folder_name, "scans");
        assert_eq!(loaded.status, FolderStatus::Unprocessed);
        assert_eq!(loaded.image_files.len(), 2);
        assert_eq!(loaded.metadata.total_images, 2);
    }

    #[tokio::test]
    async fn test_save_recomputes_counters() {
        let (pool, _dir) = test_pool().await;
        let repo = FolderRepository::new(&pool);

        let mut folder = Folder::new("scans", vec![image("a.jpg")]);
        repo.create(&mut folder).await.unwrap();

        folder.ocr_results.insert(
            "a.jpg".to_string(),
            normalize_items(&[json!({ "text": "x" })]),
        );
        folder.status = FolderStatus::Processed;
        // Deliberately wrong counters: save must recompute
        folder.metadata.processed_images = 99;
        repo.save(&mut folder).await.unwrap();

        let loaded = repo.get(&folder.id).await.unwrap().unwrap();
        assert_eq!(loaded.status, FolderStatus::Processed);
        assert_eq!(loaded.metadata.processed_images, 1);
        assert_eq!(loaded.metadata.calibrated_images, 0);
        assert!(loaded.updated_at >= loaded.created_at);
    }

    #[tokio::test]
    async fn test_save_missing_folder_fails() {
        let (pool, _dir) = test_pool().await;
        let repo = FolderRepository::new(&pool);

        let mut folder = Folder::new("ghost", vec![]);
        folder.id = "no-such-id".to_string();
        let result = repo.save(&mut folder).await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_list_newest_first() {
        let (pool, _dir) = test_pool().await;
        let repo = FolderRepository::new(&pool);

        let mut first = Folder::new("first", vec![]);
        repo.create(&mut first).await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        let mut second = Folder::new("second", vec![]);
        repo.create(&mut second).await.unwrap();

        let folders = repo.list().await.unwrap();
        assert_eq!(folders.len(), 2);
        assert_eq!(folders[0].name, "second");
    }

    #[tokio::test]
    async fn test_delete_cascades() {
        let (pool, _dir) = test_pool().await;
        let repo = FolderRepository::new(&pool);

        let mut folder = Folder::new("doomed", vec![image("a.jpg")]);
        repo.create(&mut folder).await.unwrap();

        // Plant chunk and annotation records for the cascade
        sqlx::query(
            "INSERT INTO image_chunks (folder_id, image_name, image_index, chunk_index, total_chunks, data, chunk_hash, file_type, file_size, last_modified)
             VALUES (?, 'a.jpg', 0, 0, 1, x'00', 'h', 'image/jpeg', 1, 0)",
        )
        .bind(&folder.id)
        .execute(&pool)
        .await
        .unwrap();
        sqlx::query("INSERT INTO annotations (folder_id, image_name, text_regions) VALUES (?, 'a.jpg', '[]')")
            .bind(&folder.id)
            .execute(&pool)
            .await
            .unwrap();

        assert!(repo.delete(&folder.id).await.unwrap());
        assert!(repo.get(&folder.id).await.unwrap().is_none());

        let chunks: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM image_chunks WHERE folder_id = ?")
            .bind(&folder.id)
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(chunks.0, 0);

        let annotations: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM annotations WHERE folder_id = ?")
            .bind(&folder.id)
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(annotations.0, 0);

        // Double delete is not an error
        assert!(!repo.delete(&folder.id).await.unwrap());
    }
}
