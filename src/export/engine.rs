//! Reconciliation engine
//!
//! Pure over its inputs: reads the folder's OCR snapshot and the saved
//! annotation sets, mutates neither. Export can therefore run any
//! number of times, concurrently with editing, without corrupting
//! state.

use std::collections::HashMap;

use chrono::Utc;

use super::types::{
    CalibratedText, ExportDocument, ExportInfo, ExportRegion, ExportSummary, FolderExport,
    ImageExport, Modifications, OcrTriple,
};
use crate::annotations::AnnotationSet;
use crate::library::Folder;

/// Reconcile one folder against its saved annotation sets
pub fn reconcile_folder(folder: &Folder, annotations: &[AnnotationSet]) -> FolderExport {
    let images = folder
        .image_files
        .iter()
        .map(|file| {
            let original = folder.ocr_results.get(&file.name);
            let calibrated = annotations.iter().find(|s| s.image_name == file.name);
            reconcile_image(&file.name, original, calibrated)
        })
        .collect();

    FolderExport {
        folder_id: folder.id.clone(),
        folder_name: folder.name.clone(),
        status: folder.status,
        images,
    }
}

/// Build the full export document for a set of folders
pub fn export_document(folders: &[(Folder, Vec<AnnotationSet>)]) -> ExportDocument {
    let mut summary = ExportSummary {
        total_folders: folders.len(),
        ..Default::default()
    };

    let folder_exports = folders
        .iter()
        .map(|(folder, annotations)| {
            summary.total_images += folder.image_files.len();
            summary.processed_images += folder.ocr_results.len();
            summary.calibrated_images += annotations.len();
            reconcile_folder(folder, annotations)
        })
        .collect();

    ExportDocument {
        export_info: ExportInfo {
            exported_at: Utc::now(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        },
        summary,
        folders: folder_exports,
    }
}

fn reconcile_image(
    image_name: &str,
    original: Option<&Vec<crate::ocr::OcrRegion>>,
    calibrated: Option<&AnnotationSet>,
) -> ImageExport {
    let original_ocr = original.map(|regions| {
        regions
            .iter()
            .map(|r| OcrTriple {
                text: r.text.clone(),
                position: r.region,
                confidence: r.confidence,
            })
            .collect()
    });

    let calibrated_text = calibrated.map(|set| CalibratedText {
        full_text: join_region_texts(set),
        text_regions: set
            .text_regions
            .iter()
            .map(|a| ExportRegion {
                id: a.id.clone(),
                text: a.text.clone(),
                region: a.region,
                is_manually_added: a.is_manual,
                confidence: a.confidence,
            })
            .collect(),
    });

    let modifications = compute_modifications(original, calibrated);

    ImageExport {
        image_name: image_name.to_string(),
        original_ocr,
        calibrated_text,
        modifications,
    }
}

fn join_region_texts(set: &AnnotationSet) -> String {
    let joined = set
        .text_regions
        .iter()
        .map(|a| a.text.as_str())
        .collect::<Vec<_>>()
        .join(" ");
    joined.trim().to_string()
}

fn compute_modifications(
    original: Option<&Vec<crate::ocr::OcrRegion>>,
    calibrated: Option<&AnnotationSet>,
) -> Modifications {
    let Some(set) = calibrated else {
        return Modifications::default();
    };

    let original_count = original.map(|r| r.len()).unwrap_or(0) as i64;
    let calibrated_count = set.text_regions.len() as i64;
    let manual_count = set.text_regions.iter().filter(|a| a.is_manual).count() as i64;

    // Best-effort estimate; cannot distinguish an edited region from a
    // delete-plus-add
    let deleted = (original_count - (calibrated_count - manual_count)).max(0);
    let total_edits = (original_count - calibrated_count).abs() + manual_count;

    // Seeded annotations keep the id of the OCR region they came from,
    // so each machine-origin annotation is compared against its own
    // original text, regardless of deletions elsewhere in the list
    let machine_texts_changed = match original {
        Some(regions) => {
            let original_texts: HashMap<&str, &str> = regions
                .iter()
                .map(|r| (r.id.as_str(), r.text.as_str()))
                .collect();
            set.text_regions
                .iter()
                .filter(|a| !a.is_manual)
                .any(|a| {
                    original_texts
                        .get(a.id.as_str())
                        .is_some_and(|orig| *orig != a.text)
                })
        }
        None => false,
    };

    Modifications {
        annotations_added: manual_count as usize,
        annotations_deleted: deleted as usize,
        total_edits: total_edits as usize,
        text_changed: original_count != calibrated_count || machine_texts_changed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotations::AnnotationStore;
    use crate::geometry::Rect;
    use crate::library::ImageFileMeta;
    use crate::ocr::normalize_items;
    use serde_json::json;

    fn folder_with(names: &[&str]) -> Folder {
        let files = names
            .iter()
            .map(|n| ImageFileMeta {
                name: n.to_string(),
                mime_type: "image/jpeg".to_string(),
                size: 10,
                width: Some(100),
                height: Some(100),
                last_modified: 0,
            })
            .collect();
        let mut folder = Folder::new("scans", files);
        folder.id = "f1".to_string();
        folder
    }

    #[test]
    fn test_calibration_scenario_end_to_end() {
        // OCR produced one region for a.jpg; the user edits its text
        let mut folder = folder_with(&["a.jpg", "b.jpg"]);
        let regions = normalize_items(&[json!({
            "text": "你好",
            "text_region": [[10, 10], [50, 10], [50, 30], [10, 30]],
            "confidence": 0.9
        })]);
        folder.ocr_results.insert("a.jpg".to_string(), regions.clone());

        let mut store = AnnotationStore::new();
        store.seed("a.jpg", &regions);
        let seeded = store.get("a.jpg").unwrap().text_regions[0].clone();
        assert_eq!(seeded.region, Rect::new(10, 10, 40, 20));
        assert!(!seeded.is_manual);

        store.edit("a.jpg", &seeded.id, "你好吗");
        assert_eq!(store.stats("a.jpg").count, 1);
        assert_eq!(store.stats("a.jpg").total_chars, 3);

        let annotations = store.snapshot();
        let export = reconcile_folder(&folder, &annotations);

        assert_eq!(export.images.len(), 2);
        let a = &export.images[0];
        assert_eq!(a.image_name, "a.jpg");
        assert_eq!(a.calibrated_text.as_ref().unwrap().full_text, "你好吗");
        assert!(a.modifications.text_changed);
        assert_eq!(a.modifications.annotations_added, 0);
        assert_eq!(a.modifications.annotations_deleted, 0);
        assert_eq!(a.modifications.total_edits, 0);

        // b.jpg was never processed or calibrated
        let b = &export.images[1];
        assert!(b.original_ocr.is_none());
        assert!(b.calibrated_text.is_none());
        assert_eq!(b.modifications, Modifications::default());
    }

    #[test]
    fn test_manual_add_and_delete_counts() {
        let mut folder = folder_with(&["a.jpg"]);
        let regions = normalize_items(&[
            json!({ "text": "one", "text_region": [[0,0],[10,0],[10,5],[0,5]] }),
            json!({ "text": "two", "text_region": [[0,10],[10,10],[10,15],[0,15]] }),
        ]);
        folder.ocr_results.insert("a.jpg".to_string(), regions.clone());

        let mut store = AnnotationStore::new();
        store.seed("a.jpg", &regions);
        // Delete one OCR region, add one manual region
        let victim = store.get("a.jpg").unwrap().text_regions[1].id.clone();
        store.delete("a.jpg", &victim);
        store.add("a.jpg", Rect::new(0, 20, 10, 5), "manual");

        let annotations = store.snapshot();
        let export = reconcile_folder(&folder, &annotations);
        let m = &export.images[0].modifications;

        // original=2, calibrated=2, manual=1
        assert_eq!(m.annotations_added, 1);
        assert_eq!(m.annotations_deleted, 1);
        assert_eq!(m.total_edits, 1);
        // Counts still match and no machine text was edited
        assert!(!m.text_changed);
    }

    #[test]
    fn test_delete_first_region_with_manual_add_is_not_text_changed() {
        let mut folder = folder_with(&["a.jpg"]);
        let regions = normalize_items(&[
            json!({ "text": "one", "text_region": [[0,0],[10,0],[10,5],[0,5]] }),
            json!({ "text": "two", "text_region": [[0,10],[10,10],[10,15],[0,15]] }),
        ]);
        folder.ocr_results.insert("a.jpg".to_string(), regions.clone());

        let mut store = AnnotationStore::new();
        store.seed("a.jpg", &regions);
        // Deleting the FIRST region shifts the list; the survivor must
        // still be compared against its own original, not positionally
        let victim = store.get("a.jpg").unwrap().text_regions[0].id.clone();
        store.delete("a.jpg", &victim);
        store.add("a.jpg", Rect::new(0, 20, 10, 5), "manual");

        let export = reconcile_folder(&folder, &store.snapshot());
        let m = &export.images[0].modifications;

        assert_eq!(m.annotations_added, 1);
        assert_eq!(m.annotations_deleted, 1);
        assert!(!m.text_changed);

        // Editing the survivor flips it
        let survivor = store.get("a.jpg").unwrap().text_regions[0].id.clone();
        store.edit("a.jpg", &survivor, "edited");
        let export = reconcile_folder(&folder, &store.snapshot());
        assert!(export.images[0].modifications.text_changed);
    }

    #[test]
    fn test_untouched_image_not_marked_changed() {
        let mut folder = folder_with(&["a.jpg"]);
        let regions = normalize_items(&[json!({
            "text": "same",
            "text_region": [[0,0],[10,0],[10,5],[0,5]]
        })]);
        folder.ocr_results.insert("a.jpg".to_string(), regions.clone());

        let mut store = AnnotationStore::new();
        store.seed("a.jpg", &regions);

        let annotations = store.snapshot();
        let export = reconcile_folder(&folder, &annotations);
        let m = &export.images[0].modifications;
        assert!(!m.text_changed);
        assert_eq!(m.total_edits, 0);
    }

    #[test]
    fn test_reconcile_does_not_mutate_inputs() {
        let mut folder = folder_with(&["a.jpg"]);
        let regions = normalize_items(&[json!({ "text": "x" })]);
        folder.ocr_results.insert("a.jpg".to_string(), regions.clone());
        let annotations = vec![AnnotationSet::new("a.jpg")];

        let before = serde_json::to_string(&folder).unwrap();
        let _ = reconcile_folder(&folder, &annotations);
        let _ = reconcile_folder(&folder, &annotations);
        assert_eq!(serde_json::to_string(&folder).unwrap(), before);
    }

    #[test]
    fn test_export_document_field_names() {
        let mut folder = folder_with(&["a.jpg"]);
        let regions = normalize_items(&[json!({
            "text": "hi",
            "text_region": [[0,0],[10,0],[10,5],[0,5]],
            "confidence": 0.5
        })]);
        folder.ocr_results.insert("a.jpg".to_string(), regions.clone());

        let mut store = AnnotationStore::new();
        store.seed("a.jpg", &regions);
        store.add("a.jpg", Rect::new(1, 1, 2, 2), "added");

        let doc = export_document(&[(folder, store.snapshot())]);
        let json = serde_json::to_value(&doc).unwrap();

        assert!(json.get("exportInfo").is_some());
        assert!(json.get("summary").is_some());
        let image = &json["folders"][0]["images"][0];
        assert!(image.get("originalOCR").is_some());
        assert!(image.get("calibratedText").is_some());
        assert!(image.get("modifications").is_some());
        assert!(image["calibratedText"].get("fullText").is_some());
        assert!(image["calibratedText"]["textRegions"][0]
            .get("isManuallyAdded")
            .is_some());
        assert!(image["originalOCR"][0].get("position").is_some());
        assert_eq!(json["summary"]["totalFolders"], 1);
    }
}
