//! Chunked image storage
//!
//! Image binaries are split into bounded-size chunks so no single
//! record exceeds the store's comfort zone. Writes are full-replace:
//! any existing chunk set for the image is deleted and the new set
//! inserted inside one transaction, so a failed write leaves no partial
//! set behind. Reads verify the chunk count and per-chunk hashes anyway
//! and treat an incomplete or tampered set as a corrupt image: that
//! image is skipped with a warning, never allowed to fail the rest of
//! the folder.

use sha2::{Digest, Sha256};
use sqlx::SqlitePool;

use crate::error::Result;
use crate::library::ImageFileMeta;

/// Split a payload into chunks of at most `chunk_size` bytes.
///
/// An empty payload still yields one (empty) chunk, so every stored
/// image has at least one record and `total_chunks >= 1`.
pub fn chunk_payload(data: &[u8], chunk_size: usize) -> Vec<&[u8]> {
    if data.is_empty() {
        return vec![&[]];
    }
    data.chunks(chunk_size.max(1)).collect()
}

fn chunk_hash(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

#[derive(Debug, sqlx::FromRow)]
struct ChunkRow {
    image_name: String,
    chunk_index: i64,
    total_chunks: i64,
    data: Vec<u8>,
    chunk_hash: String,
}

/// Chunked binary storage over the `image_chunks` table
#[derive(Clone)]
pub struct ChunkStore {
    pool: SqlitePool,
    chunk_size: usize,
}

impl ChunkStore {
    pub fn new(pool: SqlitePool, chunk_size: usize) -> Self {
        Self { pool, chunk_size }
    }

    /// Store an image payload, replacing any existing chunk set for
    /// `(folder_id, image)` in the same transaction. Returns the number
    /// of chunks written.
    pub async fn store_image(
        &self,
        folder_id: &str,
        image: &ImageFileMeta,
        image_index: usize,
        data: &[u8],
    ) -> Result<usize> {
        let chunks = chunk_payload(data, self.chunk_size);
        let total = chunks.len();

        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM image_chunks WHERE folder_id = ? AND image_name = ?")
            .bind(folder_id)
            .bind(&image.name)
            .execute(&mut *tx)
            .await?;

        for (index, chunk) in chunks.iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO image_chunks
                    (folder_id, image_name, image_index, chunk_index, total_chunks,
                     data, chunk_hash, file_type, file_size, last_modified)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(folder_id)
            .bind(&image.name)
            .bind(image_index as i64)
            .bind(index as i64)
            .bind(total as i64)
            .bind(*chunk)
            .bind(chunk_hash(chunk))
            .bind(&image.mime_type)
            .bind(image.size as i64)
            .bind(image.last_modified)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        tracing::debug!(
            folder_id = %folder_id,
            image = %image.name,
            chunks = total,
            bytes = data.len(),
            "Stored image chunks"
        );

        Ok(total)
    }

    /// Reassemble one image; `None` when absent or corrupt
    pub async fn load_image(&self, folder_id: &str, image_name: &str) -> Result<Option<Vec<u8>>> {
        let rows = sqlx::query_as::<_, ChunkRow>(
            r#"
            SELECT image_name, chunk_index, total_chunks, data, chunk_hash
            FROM image_chunks
            WHERE folder_id = ? AND image_name = ?
            ORDER BY chunk_index
            "#,
        )
        .bind(folder_id)
        .bind(image_name)
        .fetch_all(self.pool())
        .await?;

        if rows.is_empty() {
            return Ok(None);
        }

        Ok(reassemble(folder_id, image_name, rows))
    }

    /// Reassemble every image in a folder, in upload order.
    ///
    /// A corrupt image is logged and omitted; the others still load.
    pub async fn load_folder_images(&self, folder_id: &str) -> Result<Vec<(String, Vec<u8>)>> {
        let rows = sqlx::query_as::<_, ChunkRow>(
            r#"
            SELECT image_name, chunk_index, total_chunks, data, chunk_hash
            FROM image_chunks
            WHERE folder_id = ?
            ORDER BY image_index, chunk_index
            "#,
        )
        .bind(folder_id)
        .fetch_all(self.pool())
        .await?;

        let mut images = Vec::new();
        let mut group: Vec<ChunkRow> = Vec::new();

        for row in rows {
            if let Some(last) = group.last() {
                if last.image_name != row.image_name {
                    let name = last.image_name.clone();
                    if let Some(data) = reassemble(folder_id, &name, std::mem::take(&mut group)) {
                        images.push((name, data));
                    }
                }
            }
            group.push(row);
        }

        if let Some(last) = group.last() {
            let name = last.image_name.clone();
            if let Some(data) = reassemble(folder_id, &name, group) {
                images.push((name, data));
            }
        }

        Ok(images)
    }

    /// Delete one image's chunk set; returns the number of chunks removed
    pub async fn delete_image(&self, folder_id: &str, image_name: &str) -> Result<usize> {
        let result = sqlx::query("DELETE FROM image_chunks WHERE folder_id = ? AND image_name = ?")
            .bind(folder_id)
            .bind(image_name)
            .execute(self.pool())
            .await?;

        Ok(result.rows_affected() as usize)
    }

    /// Delete all chunk records for a folder
    pub async fn delete_folder(&self, folder_id: &str) -> Result<usize> {
        let result = sqlx::query("DELETE FROM image_chunks WHERE folder_id = ?")
            .bind(folder_id)
            .execute(self.pool())
            .await?;

        Ok(result.rows_affected() as usize)
    }

    fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

/// Concatenate a sorted chunk group, or `None` when the set is corrupt
fn reassemble(folder_id: &str, image_name: &str, group: Vec<ChunkRow>) -> Option<Vec<u8>> {
    let expected = group.first()?.total_chunks as usize;

    if group.len() != expected {
        tracing::warn!(
            folder_id = %folder_id,
            image = %image_name,
            expected = expected,
            found = group.len(),
            "Incomplete chunk set, skipping image"
        );
        return None;
    }

    for (i, row) in group.iter().enumerate() {
        if row.chunk_index as usize != i {
            tracing::warn!(
                folder_id = %folder_id,
                image = %image_name,
                chunk_index = row.chunk_index,
                "Chunk index gap, skipping image"
            );
            return None;
        }
        if chunk_hash(&row.data) != row.chunk_hash {
            tracing::warn!(
                folder_id = %folder_id,
                image = %image_name,
                chunk_index = row.chunk_index,
                "Chunk hash mismatch, skipping image"
            );
            return None;
        }
    }

    let mut payload = Vec::with_capacity(group.iter().map(|r| r.data.len()).sum());
    for row in &group {
        payload.extend_from_slice(&row.data);
    }
    Some(payload)
}
