//! Database schema initialization

use sqlx::SqlitePool;

use crate::error::Result;

/// Initialize the database schema
pub async fn initialize_schema(pool: &SqlitePool) -> Result<()> {
    sqlx::query(SCHEMA_SQL).execute(pool).await?;

    Ok(())
}

const SCHEMA_SQL: &str = r#"
-- Folders: one record per uploaded unit of work.
-- image_files and ocr_results are JSON columns; counters are
-- recomputed from actual cardinalities on every save.
CREATE TABLE IF NOT EXISTS folders (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    folder_name TEXT NOT NULL,
    status TEXT NOT NULL DEFAULT 'unprocessed',
    image_files TEXT NOT NULL DEFAULT '[]',
    ocr_results TEXT NOT NULL DEFAULT '{}',
    total_images INTEGER NOT NULL DEFAULT 0,
    processed_images INTEGER NOT NULL DEFAULT 0,
    calibrated_images INTEGER NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL DEFAULT (datetime('now')),
    updated_at TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE INDEX IF NOT EXISTS idx_folders_name ON folders(name);
CREATE INDEX IF NOT EXISTS idx_folders_status ON folders(status);
CREATE INDEX IF NOT EXISTS idx_folders_created ON folders(created_at);
CREATE INDEX IF NOT EXISTS idx_folders_updated ON folders(updated_at);

-- Image chunks: bounded-size slices of image binaries. The compound
-- primary key doubles as the lookup index for single-image reads; the
-- folder_id index serves whole-folder loads without a table scan.
CREATE TABLE IF NOT EXISTS image_chunks (
    folder_id TEXT NOT NULL,
    image_name TEXT NOT NULL,
    image_index INTEGER NOT NULL,
    chunk_index INTEGER NOT NULL,
    total_chunks INTEGER NOT NULL,
    data BLOB NOT NULL,
    chunk_hash TEXT NOT NULL,
    file_type TEXT NOT NULL,
    file_size INTEGER NOT NULL,
    last_modified INTEGER NOT NULL,

    PRIMARY KEY (folder_id, image_name, chunk_index)
);

CREATE INDEX IF NOT EXISTS idx_chunks_folder_id ON image_chunks(folder_id);

-- Annotation sets: one record per (folder, image).
CREATE TABLE IF NOT EXISTS annotations (
    folder_id TEXT NOT NULL,
    image_name TEXT NOT NULL,
    text_regions TEXT NOT NULL DEFAULT '[]',
    updated_at TEXT NOT NULL DEFAULT (datetime('now')),

    PRIMARY KEY (folder_id, image_name)
);

CREATE INDEX IF NOT EXISTS idx_annotations_folder_id ON annotations(folder_id);
"#;
