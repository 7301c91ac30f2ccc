//! Calibration session manager
//!
//! One session per folder under calibration. The session's store is the
//! only copy holding uncommitted edits; callers flush it with an
//! explicit save (see the annotation routes), and the manager never
//! writes behind their back.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;

use super::store::AnnotationStore;
use super::types::{AnnotationSet, AnnotationStats};
use crate::error::{AppError, Result};
use crate::geometry::Rect;
use crate::ocr::OcrRegion;

/// Manages in-memory annotation stores for active calibration sessions
#[derive(Clone)]
pub struct CalibrationManager {
    inner: Arc<CalibrationManagerInner>,
}

struct CalibrationManagerInner {
    /// Active stores indexed by folder id
    sessions: RwLock<HashMap<String, AnnotationStore>>,
}

impl CalibrationManager {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(CalibrationManagerInner {
                sessions: RwLock::new(HashMap::new()),
            }),
        }
    }

    /// Open a session for a folder, loading its saved sets.
    ///
    /// Reopening an already-open session keeps the in-memory state
    /// (which may hold unsaved edits) rather than reloading.
    pub async fn open(&self, folder_id: &str, saved_sets: Vec<AnnotationSet>) {
        let mut sessions = self.inner.sessions.write().await;
        if !sessions.contains_key(folder_id) {
            sessions.insert(folder_id.to_string(), AnnotationStore::from_sets(saved_sets));
            tracing::info!(folder_id = %folder_id, "Opened calibration session");
        }
    }

    pub async fn is_open(&self, folder_id: &str) -> bool {
        self.inner.sessions.read().await.contains_key(folder_id)
    }

    /// Seed an image's list from OCR output; at most once per image
    pub async fn seed(&self, folder_id: &str, image_name: &str, regions: &[OcrRegion]) -> Result<bool> {
        let mut sessions = self.inner.sessions.write().await;
        let store = Self::store_mut(&mut sessions, folder_id)?;
        Ok(store.seed(image_name, regions))
    }

    /// Add a manual annotation; returns the new id
    pub async fn add(&self, folder_id: &str, image_name: &str, region: Rect, text: &str) -> Result<String> {
        let mut sessions = self.inner.sessions.write().await;
        let store = Self::store_mut(&mut sessions, folder_id)?;
        Ok(store.add(image_name, region, text))
    }

    pub async fn edit(&self, folder_id: &str, image_name: &str, id: &str, text: &str) -> Result<()> {
        let mut sessions = self.inner.sessions.write().await;
        let store = Self::store_mut(&mut sessions, folder_id)?;
        store.edit(image_name, id, text);
        Ok(())
    }

    pub async fn delete(&self, folder_id: &str, image_name: &str, id: &str) -> Result<()> {
        let mut sessions = self.inner.sessions.write().await;
        let store = Self::store_mut(&mut sessions, folder_id)?;
        store.delete(image_name, id);
        Ok(())
    }

    pub async fn clear(&self, folder_id: &str, image_name: &str) -> Result<()> {
        let mut sessions = self.inner.sessions.write().await;
        let store = Self::store_mut(&mut sessions, folder_id)?;
        store.clear(image_name);
        Ok(())
    }

    pub async fn stats(&self, folder_id: &str, image_name: &str) -> Result<AnnotationStats> {
        let sessions = self.inner.sessions.read().await;
        let store = sessions
            .get(folder_id)
            .ok_or_else(|| AppError::NotFound(format!("No calibration session for folder {}", folder_id)))?;
        Ok(store.stats(image_name))
    }

    pub async fn get_set(&self, folder_id: &str, image_name: &str) -> Result<Option<AnnotationSet>> {
        let sessions = self.inner.sessions.read().await;
        let store = sessions
            .get(folder_id)
            .ok_or_else(|| AppError::NotFound(format!("No calibration session for folder {}", folder_id)))?;
        Ok(store.get(image_name).cloned())
    }

    /// Snapshot all sets for persisting
    pub async fn snapshot(&self, folder_id: &str) -> Result<Vec<AnnotationSet>> {
        let sessions = self.inner.sessions.read().await;
        let store = sessions
            .get(folder_id)
            .ok_or_else(|| AppError::NotFound(format!("No calibration session for folder {}", folder_id)))?;
        Ok(store.snapshot())
    }

    /// Close a session, discarding any unsaved edits
    pub async fn close(&self, folder_id: &str) {
        let mut sessions = self.inner.sessions.write().await;
        if sessions.remove(folder_id).is_some() {
            tracing::info!(folder_id = %folder_id, "Closed calibration session");
        }
    }

    fn store_mut<'a>(
        sessions: &'a mut HashMap<String, AnnotationStore>,
        folder_id: &str,
    ) -> Result<&'a mut AnnotationStore> {
        sessions
            .get_mut(folder_id)
            .ok_or_else(|| AppError::NotFound(format!("No calibration session for folder {}", folder_id)))
    }
}

impl Default for CalibrationManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ocr::normalize_items;
    use serde_json::json;

    #[tokio::test]
    async fn test_open_seed_edit_snapshot() {
        let manager = CalibrationManager::new();
        manager.open("f1", Vec::new()).await;

        let regions = normalize_items(&[json!({
            "text": "hello",
            "text_region": [[0, 0], [10, 0], [10, 5], [0, 5]]
        })]);
        assert!(manager.seed("f1", "a.jpg", &regions).await.unwrap());
        assert!(!manager.seed("f1", "a.jpg", &regions).await.unwrap());

        let id = manager
            .add("f1", "a.jpg", Rect::new(1, 1, 2, 2), "note")
            .await
            .unwrap();
        manager.edit("f1", "a.jpg", &id, "edited").await.unwrap();

        let snapshot = manager.snapshot("f1").await.unwrap();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].text_regions.len(), 2);
        assert_eq!(snapshot[0].text_regions[1].text, "edited");
    }

    #[tokio::test]
    async fn test_reopen_keeps_unsaved_edits() {
        let manager = CalibrationManager::new();
        manager.open("f1", Vec::new()).await;
        manager
            .add("f1", "a.jpg", Rect::new(0, 0, 1, 1), "unsaved")
            .await
            .unwrap();

        // A second open with stale saved state must not clobber
        manager.open("f1", Vec::new()).await;
        assert_eq!(manager.stats("f1", "a.jpg").await.unwrap().count, 1);
    }

    #[tokio::test]
    async fn test_ops_without_session_fail() {
        let manager = CalibrationManager::new();
        let result = manager.add("nope", "a.jpg", Rect::new(0, 0, 1, 1), "x").await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_close_discards_state() {
        let manager = CalibrationManager::new();
        manager.open("f1", Vec::new()).await;
        manager.close("f1").await;
        assert!(!manager.is_open("f1").await);
    }
}
