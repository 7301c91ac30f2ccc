//! Export document types
//!
//! Serialized field names are the external contract; downstream
//! consumers of exported files match on them verbatim.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::geometry::Rect;
use crate::library::FolderStatus;

/// Top-level export file
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportDocument {
    pub export_info: ExportInfo,
    pub summary: ExportSummary,
    pub folders: Vec<FolderExport>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportInfo {
    pub exported_at: DateTime<Utc>,
    pub version: String,
}

#[derive(Debug, Default, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ExportSummary {
    pub total_folders: usize,
    pub total_images: usize,
    pub processed_images: usize,
    pub calibrated_images: usize,
}

/// One folder's reconciled output
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FolderExport {
    pub folder_id: String,
    pub folder_name: String,
    pub status: FolderStatus,
    pub images: Vec<ImageExport>,
}

/// One image's reconciled output
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageExport {
    pub image_name: String,
    /// Read-only view of the OCR snapshot; absent if never processed
    #[serde(rename = "originalOCR", skip_serializing_if = "Option::is_none")]
    pub original_ocr: Option<Vec<OcrTriple>>,
    /// Present only once calibration has touched this image
    #[serde(skip_serializing_if = "Option::is_none")]
    pub calibrated_text: Option<CalibratedText>,
    pub modifications: Modifications,
}

/// `{text, position, confidence}` triple from the OCR snapshot
#[derive(Debug, Serialize)]
pub struct OcrTriple {
    pub text: String,
    pub position: Rect,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CalibratedText {
    /// Space-joined, trimmed concatenation of region texts in list order
    pub full_text: String,
    pub text_regions: Vec<ExportRegion>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportRegion {
    pub id: String,
    pub text: String,
    pub region: Rect,
    pub is_manually_added: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
}

/// Diff summary between the OCR snapshot and the calibrated state.
///
/// `annotations_deleted` is a best-effort estimate: it cannot tell an
/// edited text from a replaced region. Consumers treat it as a
/// statistic, not an exact diff.
#[derive(Debug, Default, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Modifications {
    pub annotations_added: usize,
    pub annotations_deleted: usize,
    pub total_edits: usize,
    pub text_changed: bool,
}
