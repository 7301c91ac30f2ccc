//! OCR processing handlers

use std::collections::HashMap;

use axum::extract::{Path, State};
use axum::Json;
use serde::Serialize;

use super::load_folder;
use crate::db::FolderRepository;
use crate::error::{AppError, Result};
use crate::library::FolderStatus;
use crate::ocr::{BatchReport, OcrPipeline};
use crate::state::AppState;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessResponse {
    pub success_count: usize,
    pub failure_count: usize,
    pub items: Vec<ProcessItem>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessItem {
    pub image_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub regions: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl From<BatchReport> for ProcessResponse {
    fn from(report: BatchReport) -> Self {
        Self {
            success_count: report.success_count,
            failure_count: report.failure_count,
            items: report
                .items
                .iter()
                .map(|item| ProcessItem {
                    image_name: item.image_name.clone(),
                    regions: item.regions.as_ref().map(|r| r.len()),
                    error: item.error.clone(),
                })
                .collect(),
        }
    }
}

/// POST /api/folders/:id/process
///
/// Runs OCR for every image that has no result yet. Existing results
/// are write-once and never re-run here; `reprocess` is the explicit
/// path for that.
pub async fn process_folder(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ProcessResponse>> {
    let mut folder = load_folder(&state, &id).await?;

    if folder.image_files.is_empty() {
        return Err(AppError::InvalidInput("folder has no images".into()));
    }

    let mut loaded: HashMap<String, Vec<u8>> = state
        .chunks()
        .load_folder_images(&id)
        .await?
        .into_iter()
        .collect();

    // An image whose chunk set is missing or corrupt cannot be
    // recognized, but it still gets an entry in the report
    let mut batch = Vec::new();
    let mut unreadable = Vec::new();
    for file in &folder.image_files {
        if folder.ocr_results.contains_key(&file.name) {
            continue;
        }
        match loaded.remove(&file.name) {
            Some(data) => batch.push((file.name.clone(), data)),
            None => unreadable.push(file.name.clone()),
        }
    }

    if batch.is_empty() && unreadable.is_empty() {
        return Err(AppError::InvalidInput("no unprocessed images".into()));
    }

    let mut response = if batch.is_empty() {
        ProcessResponse {
            success_count: 0,
            failure_count: 0,
            items: Vec::new(),
        }
    } else {
        let pipeline = OcrPipeline::new(state.ocr());
        let report = pipeline.run(batch).await?;

        for item in &report.items {
            if let Some(regions) = &item.regions {
                folder
                    .ocr_results
                    .insert(item.image_name.clone(), regions.clone());
            }
        }

        report.into()
    };

    for name in unreadable {
        tracing::warn!(folder_id = %id, image = %name, "Image data unavailable for OCR");
        response.failure_count += 1;
        response.items.push(ProcessItem {
            image_name: name,
            regions: None,
            error: Some("image data missing or corrupt".to_string()),
        });
    }

    if response.success_count > 0 {
        folder.status = FolderStatus::Processed;
    }

    FolderRepository::new(state.db()).save(&mut folder).await?;
    state.cache().invalidate_folder(&id).await;

    Ok(Json(response))
}

/// POST /api/folders/:id/reprocess
///
/// Clears the OCR snapshot and resets the status so the next process
/// run starts fresh. Saved annotations are left untouched.
pub async fn reprocess_folder(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<crate::library::Folder>> {
    let mut folder = load_folder(&state, &id).await?;

    folder.ocr_results.clear();
    folder.status = FolderStatus::Unprocessed;

    FolderRepository::new(state.db()).save(&mut folder).await?;
    state.cache().invalidate_folder(&id).await;

    tracing::info!(folder_id = %id, "Cleared OCR results for reprocessing");
    Ok(Json(folder))
}
