//! Folder types

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ocr::OcrRegion;

/// Folder lifecycle status
///
/// Moves forward under normal flow; an explicit reprocess resets it to
/// `Unprocessed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FolderStatus {
    /// Uploaded, OCR not yet run
    Unprocessed,
    /// OCR output present
    Processed,
    /// Calibration explicitly completed
    Calibrated,
}

impl FolderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unprocessed => "unprocessed",
            Self::Processed => "processed",
            Self::Calibrated => "calibrated",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "unprocessed" => Some(Self::Unprocessed),
            "processed" => Some(Self::Processed),
            "calibrated" => Some(Self::Calibrated),
            _ => None,
        }
    }
}

/// Descriptor for one uploaded image; the binary itself is chunked in
/// the chunk store under `(folder_id, name)`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageFileMeta {
    /// Join key for OCR results and annotations; unique within a folder
    pub name: String,
    #[serde(rename = "type")]
    pub mime_type: String,
    pub size: u64,
    /// Pixel dimensions sniffed at upload time, for display-scale math
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
    pub last_modified: i64,
}

/// Derived counters, recomputed on every save
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FolderMetadata {
    pub total_images: usize,
    pub processed_images: usize,
    pub calibrated_images: usize,
}

/// One uploaded unit of work
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Folder {
    /// Assigned by storage on first save; stable thereafter
    pub id: String,
    pub name: String,
    /// Legacy duplicate of `name`; kept identical, `name` is the
    /// source of truth
    pub folder_name: String,
    pub status: FolderStatus,
    /// Ordered image descriptors
    pub image_files: Vec<ImageFileMeta>,
    /// Image name -> normalized OCR output; write-once per image,
    /// overwritten only by explicit reprocess
    pub ocr_results: HashMap<String, Vec<OcrRegion>>,
    pub metadata: FolderMetadata,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Folder {
    /// Build a fresh folder; the id comes from the repository on save
    pub fn new(name: &str, image_files: Vec<ImageFileMeta>) -> Self {
        let now = Utc::now();
        let mut folder = Self {
            id: String::new(),
            name: name.to_string(),
            folder_name: name.to_string(),
            status: FolderStatus::Unprocessed,
            image_files,
            ocr_results: HashMap::new(),
            metadata: FolderMetadata::default(),
            created_at: now,
            updated_at: now,
        };
        folder.recompute_metadata(0);
        folder
    }

    /// Rename, keeping the legacy duplicate in sync
    pub fn set_name(&mut self, name: &str) {
        self.name = name.to_string();
        self.folder_name = name.to_string();
    }

    /// Recompute counters from actual cardinalities.
    ///
    /// `calibrated_count` is the number of saved annotation records for
    /// this folder; the annotations collection owns that number.
    pub fn recompute_metadata(&mut self, calibrated_count: usize) {
        self.metadata = FolderMetadata {
            total_images: self.image_files.len(),
            processed_images: self.ocr_results.len(),
            calibrated_images: calibrated_count,
        };
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    pub fn image_meta(&self, image_name: &str) -> Option<&ImageFileMeta> {
        self.image_files.iter().find(|f| f.name == image_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ocr::normalize_items;
    use serde_json::json;

    fn image(name: &str) -> ImageFileMeta {
        ImageFileMeta {
            name: name.to_string(),
            mime_type: "image/jpeg".to_string(),
            size: 1024,
            width: Some(800),
            height: Some(600),
            last_modified: 0,
        }
    }

    #[test]
    fn test_new_folder_counters() {
        let folder = Folder::new("scans", vec![image("a.jpg"), image("b.jpg")]);
        assert_eq!(folder.status, FolderStatus::Unprocessed);
        assert_eq!(folder.metadata.total_images, 2);
        assert_eq!(folder.metadata.processed_images, 0);
        assert_eq!(folder.name, folder.folder_name);
    }

    #[test]
    fn test_recompute_tracks_ocr_results() {
        let mut folder = Folder::new("scans", vec![image("a.jpg"), image("b.jpg")]);
        folder.ocr_results.insert(
            "a.jpg".to_string(),
            normalize_items(&[json!({ "text": "x" })]),
        );
        folder.recompute_metadata(1);

        assert_eq!(folder.metadata.processed_images, 1);
        assert_eq!(folder.metadata.calibrated_images, 1);
    }

    #[test]
    fn test_set_name_keeps_fields_identical() {
        let mut folder = Folder::new("old", vec![]);
        folder.set_name("new");
        assert_eq!(folder.name, "new");
        assert_eq!(folder.folder_name, "new");
    }

    #[test]
    fn test_status_round_trip() {
        for status in [
            FolderStatus::Unprocessed,
            FolderStatus::Processed,
            FolderStatus::Calibrated,
        ] {
            assert_eq!(FolderStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(FolderStatus::parse("bogus"), None);
    }
}
