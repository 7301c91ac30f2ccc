//! SQLite persistence
//!
//! Three collections: `folders` (one record per folder, JSON columns
//! for image descriptors and OCR results), `annotations` (one record
//! per folder/image pair), and `image_chunks` (bounded-size slices of
//! image binaries). Folder and annotation reads go through a small LRU
//! metadata cache; reassembled image payloads are never cached.

mod annotations;
mod cache;
mod chunks;
mod folders;
mod schema;

pub use annotations::AnnotationRepository;
pub use cache::MetadataCache;
pub use chunks::{chunk_payload, ChunkStore};
pub use folders::FolderRepository;
pub use schema::initialize_schema;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;

use crate::error::Result;

/// Create a new database connection pool
pub async fn create_pool(database_url: &str) -> Result<SqlitePool> {
    let options = SqliteConnectOptions::from_str(database_url)?
        .create_if_missing(true)
        .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
        .synchronous(sqlx::sqlite::SqliteSynchronous::Normal);

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await?;

    initialize_schema(&pool).await?;

    Ok(pool)
}
