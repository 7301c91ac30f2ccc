//! Calibration session handlers
//!
//! The session store is the single owner of in-flight edits. Nothing
//! hits the database until the explicit save, which flushes the whole
//! snapshot in one transaction.

use axum::extract::{Path, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use super::{load_annotation_sets, load_folder};
use crate::annotations::{AnnotationSet, AnnotationStats};
use crate::db::{AnnotationRepository, FolderRepository};
use crate::error::{AppError, Result};
use crate::geometry::Rect;
use crate::library::{Folder, FolderStatus};
use crate::state::AppState;

#[derive(Serialize)]
pub struct OpenResponse {
    pub open: bool,
    pub images: usize,
}

#[derive(Serialize)]
pub struct SeedResponse {
    pub seeded: bool,
    pub set: Option<AnnotationSet>,
}

#[derive(Deserialize)]
pub struct AddRegionRequest {
    pub region: Rect,
    #[serde(default)]
    pub text: String,
}

#[derive(Deserialize)]
pub struct EditRegionRequest {
    pub text: String,
}

#[derive(Serialize)]
pub struct OkResponse {
    pub ok: bool,
}

fn ok() -> Json<OkResponse> {
    Json(OkResponse { ok: true })
}

/// POST /api/folders/:id/calibration/open
pub async fn open_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<OpenResponse>> {
    load_folder(&state, &id).await?;
    let saved = load_annotation_sets(&state, &id).await?;
    let images = saved.len();

    state.calibration().open(&id, saved).await;
    Ok(Json(OpenResponse { open: true, images }))
}

/// POST /api/folders/:id/calibration/:image/seed
pub async fn seed_image(
    State(state): State<AppState>,
    Path((id, image)): Path<(String, String)>,
) -> Result<Json<SeedResponse>> {
    let folder = load_folder(&state, &id).await?;
    if folder.image_meta(&image).is_none() {
        return Err(AppError::NotFound(format!("Image not found: {}", image)));
    }

    let regions = folder.ocr_results.get(&image).cloned().unwrap_or_default();
    let seeded = state.calibration().seed(&id, &image, &regions).await?;
    let set = state.calibration().get_set(&id, &image).await?;

    Ok(Json(SeedResponse { seeded, set }))
}

/// GET /api/folders/:id/calibration/:image
pub async fn get_set(
    State(state): State<AppState>,
    Path((id, image)): Path<(String, String)>,
) -> Result<Json<Option<AnnotationSet>>> {
    state.calibration().get_set(&id, &image).await.map(Json)
}

/// GET /api/folders/:id/calibration/:image/stats
pub async fn get_stats(
    State(state): State<AppState>,
    Path((id, image)): Path<(String, String)>,
) -> Result<Json<AnnotationStats>> {
    state.calibration().stats(&id, &image).await.map(Json)
}

/// POST /api/folders/:id/calibration/:image/regions
pub async fn add_region(
    State(state): State<AppState>,
    Path((id, image)): Path<(String, String)>,
    Json(request): Json<AddRegionRequest>,
) -> Result<Json<serde_json::Value>> {
    let region_id = state
        .calibration()
        .add(&id, &image, request.region, &request.text)
        .await?;
    Ok(Json(serde_json::json!({ "id": region_id })))
}

/// PUT /api/folders/:id/calibration/:image/regions/:region_id
pub async fn edit_region(
    State(state): State<AppState>,
    Path((id, image, region_id)): Path<(String, String, String)>,
    Json(request): Json<EditRegionRequest>,
) -> Result<Json<OkResponse>> {
    state
        .calibration()
        .edit(&id, &image, &region_id, &request.text)
        .await?;
    Ok(ok())
}

/// DELETE /api/folders/:id/calibration/:image/regions/:region_id
pub async fn delete_region(
    State(state): State<AppState>,
    Path((id, image, region_id)): Path<(String, String, String)>,
) -> Result<Json<OkResponse>> {
    state.calibration().delete(&id, &image, &region_id).await?;
    Ok(ok())
}

/// DELETE /api/folders/:id/calibration/:image/regions
pub async fn clear_regions(
    State(state): State<AppState>,
    Path((id, image)): Path<(String, String)>,
) -> Result<Json<OkResponse>> {
    state.calibration().clear(&id, &image).await?;
    Ok(ok())
}

/// POST /api/folders/:id/calibration/save
///
/// Flushes the session snapshot: annotation records are replaced in one
/// transaction, then the folder's counters are recomputed and saved.
pub async fn save_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Folder>> {
    let snapshot = state.calibration().snapshot(&id).await?;
    flush(&state, &id, snapshot).await.map(Json)
}

/// POST /api/folders/:id/complete
///
/// Flushes any open session, then marks the folder calibrated.
pub async fn complete_folder(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Folder>> {
    let mut folder = if state.calibration().is_open(&id).await {
        let snapshot = state.calibration().snapshot(&id).await?;
        flush(&state, &id, snapshot).await?
    } else {
        load_folder(&state, &id).await?
    };

    folder.status = FolderStatus::Calibrated;
    FolderRepository::new(state.db()).save(&mut folder).await?;
    state.cache().invalidate_folder(&id).await;

    tracing::info!(folder_id = %id, "Calibration completed");
    Ok(Json(folder))
}

/// POST /api/folders/:id/calibration/close: discard unsaved edits
pub async fn close_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<OkResponse>> {
    state.calibration().close(&id).await;
    Ok(ok())
}

async fn flush(state: &AppState, folder_id: &str, snapshot: Vec<AnnotationSet>) -> Result<Folder> {
    AnnotationRepository::new(state.db())
        .save_all(folder_id, &snapshot)
        .await?;

    let mut folder = FolderRepository::new(state.db())
        .get(folder_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Folder not found: {}", folder_id)))?;
    FolderRepository::new(state.db()).save(&mut folder).await?;

    state.cache().invalidate_folder(folder_id).await;
    tracing::info!(
        folder_id = %folder_id,
        images = snapshot.len(),
        "Saved calibration snapshot"
    );
    Ok(folder)
}
