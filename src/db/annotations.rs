//! Annotation set repository
//!
//! One record per (folder, image). Saving a session snapshot replaces
//! the folder's records wholesale in a single transaction, which makes
//! repeated saves of the same state idempotent.

use chrono::Utc;
use sqlx::SqlitePool;

use crate::annotations::{Annotation, AnnotationSet};
use crate::error::{AppError, Result};

#[derive(Debug, sqlx::FromRow)]
struct AnnotationRow {
    image_name: String,
    text_regions: String,
}

impl AnnotationRow {
    fn into_set(self) -> Result<AnnotationSet> {
        let text_regions: Vec<Annotation> = serde_json::from_str(&self.text_regions)
            .map_err(|e| AppError::Internal(format!("corrupt text_regions column: {}", e)))?;

        Ok(AnnotationSet {
            image_name: self.image_name,
            text_regions,
        })
    }
}

/// Annotation repository
pub struct AnnotationRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> AnnotationRepository<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn get(&self, folder_id: &str, image_name: &str) -> Result<Option<AnnotationSet>> {
        let row = sqlx::query_as::<_, AnnotationRow>(
            "SELECT image_name, text_regions FROM annotations WHERE folder_id = ? AND image_name = ?",
        )
        .bind(folder_id)
        .bind(image_name)
        .fetch_optional(self.pool)
        .await?;

        row.map(AnnotationRow::into_set).transpose()
    }

    /// All saved sets for a folder, ordered by image name
    pub async fn list_for_folder(&self, folder_id: &str) -> Result<Vec<AnnotationSet>> {
        let rows = sqlx::query_as::<_, AnnotationRow>(
            "SELECT image_name, text_regions FROM annotations WHERE folder_id = ? ORDER BY image_name",
        )
        .bind(folder_id)
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(AnnotationRow::into_set).collect()
    }

    /// Upsert a single image's set
    pub async fn save_set(&self, folder_id: &str, set: &AnnotationSet) -> Result<()> {
        let regions = serde_json::to_string(&set.text_regions)
            .map_err(|e| AppError::Internal(format!("serialize: {}", e)))?;

        sqlx::query(
            r#"
            INSERT INTO annotations (folder_id, image_name, text_regions, updated_at)
            VALUES (?, ?, ?, ?)
            ON CONFLICT (folder_id, image_name)
            DO UPDATE SET text_regions = excluded.text_regions, updated_at = excluded.updated_at
            "#,
        )
        .bind(folder_id)
        .bind(&set.image_name)
        .bind(regions)
        .bind(Utc::now().to_rfc3339())
        .execute(self.pool)
        .await?;

        Ok(())
    }

    /// Replace all of a folder's records with a session snapshot, in
    /// one transaction
    pub async fn save_all(&self, folder_id: &str, sets: &[AnnotationSet]) -> Result<()> {
        let now = Utc::now().to_rfc3339();
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM annotations WHERE folder_id = ?")
            .bind(folder_id)
            .execute(&mut *tx)
            .await?;

        for set in sets {
            let regions = serde_json::to_string(&set.text_regions)
                .map_err(|e| AppError::Internal(format!("serialize: {}", e)))?;

            sqlx::query(
                "INSERT INTO annotations (folder_id, image_name, text_regions, updated_at) VALUES (?, ?, ?, ?)",
            )
            .bind(folder_id)
            .bind(&set.image_name)
            .bind(regions)
            .bind(&now)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        tracing::debug!(folder_id = %folder_id, sets = sets.len(), "Saved annotation snapshot");
        Ok(())
    }

    pub async fn count_for_folder(&self, folder_id: &str) -> Result<usize> {
        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM annotations WHERE folder_id = ?")
            .bind(folder_id)
            .fetch_one(self.pool)
            .await?;

        Ok(count.0 as usize)
    }

    pub async fn delete_for_folder(&self, folder_id: &str) -> Result<usize> {
        let result = sqlx::query("DELETE FROM annotations WHERE folder_id = ?")
            .bind(folder_id)
            .execute(self.pool)
            .await?;

        Ok(result.rows_affected() as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_util::test_pool;
    use crate::geometry::Rect;

    fn set(image: &str, texts: &[&str]) -> AnnotationSet {
        AnnotationSet {
            image_name: image.to_string(),
            text_regions: texts
                .iter()
                .enumerate()
                .map(|(i, t)| Annotation {
                    id: format!("id-{}", i),
                    text: t.to_string(),
                    region: Rect::new(0, 0, 10, 10),
                    is_manual: false,
                    confidence: Some(0.9),
                })
                .collect(),
        }
    }

    #[tokio::test]
    async fn test_save_set_round_trip() {
        let (pool, _dir) = test_pool().await;
        let repo = AnnotationRepository::new(&pool);

        repo.save_set("f1", &set("a.jpg", &["hello", "world"])).await.unwrap();

        let loaded = repo.get("f1", "a.jpg").await.unwrap().unwrap();
        assert_eq!(loaded.text_regions.len(), 2);
        assert_eq!(loaded.text_regions[0].text, "hello");

        // Upsert replaces
        repo.save_set("f1", &set("a.jpg", &["edited"])).await.unwrap();
        let loaded = repo.get("f1", "a.jpg").await.unwrap().unwrap();
        assert_eq!(loaded.text_regions.len(), 1);
        assert_eq!(loaded.text_regions[0].text, "edited");
    }

    #[tokio::test]
    async fn test_save_all_replaces_snapshot() {
        let (pool, _dir) = test_pool().await;
        let repo = AnnotationRepository::new(&pool);

        repo.save_all("f1", &[set("a.jpg", &["x"]), set("b.jpg", &["y"])])
            .await
            .unwrap();
        assert_eq!(repo.count_for_folder("f1").await.unwrap(), 2);

        // Saving the same snapshot twice is idempotent
        repo.save_all("f1", &[set("a.jpg", &["x"]), set("b.jpg", &["y"])])
            .await
            .unwrap();
        assert_eq!(repo.count_for_folder("f1").await.unwrap(), 2);

        // A smaller snapshot drops the stale record
        repo.save_all("f1", &[set("a.jpg", &["x"])]).await.unwrap();
        assert_eq!(repo.count_for_folder("f1").await.unwrap(), 1);
        assert!(repo.get("f1", "b.jpg").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_folders_are_isolated() {
        let (pool, _dir) = test_pool().await;
        let repo = AnnotationRepository::new(&pool);

        repo.save_set("f1", &set("a.jpg", &["x"])).await.unwrap();
        repo.save_set("f2", &set("a.jpg", &["y"])).await.unwrap();

        assert_eq!(repo.delete_for_folder("f1").await.unwrap(), 1);
        assert_eq!(repo.count_for_folder("f2").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_empty_set_is_persisted() {
        let (pool, _dir) = test_pool().await;
        let repo = AnnotationRepository::new(&pool);

        // A cleared image keeps its (empty) record, so it stays seeded
        // across reloads
        repo.save_set("f1", &set("a.jpg", &[])).await.unwrap();
        let loaded = repo.get("f1", "a.jpg").await.unwrap().unwrap();
        assert!(loaded.text_regions.is_empty());
        assert_eq!(repo.count_for_folder("f1").await.unwrap(), 1);
    }
}
