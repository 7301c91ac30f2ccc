//! HTTP API
//!
//! Thin handlers over the library modules. Route layout:
//!
//! - `/health`
//! - `/api/folders`: upload (multipart or JSON data-URIs), list
//! - `/api/folders/:id`: detail, delete (cascades)
//! - `/api/folders/:id/images/:image`: reassembled image bytes
//! - `/api/folders/:id/process`, `/reprocess`: OCR batch
//! - `/api/folders/:id/calibration/...`: session operations
//! - `/api/folders/:id/export`, `/api/export`: export documents

mod calibration;
mod export;
mod folders;
mod process;

use axum::extract::State;
use axum::routing::{get, post, put};
use axum::{Json, Router};
use serde::Serialize;

use crate::annotations::AnnotationSet;
use crate::db::{AnnotationRepository, FolderRepository};
use crate::error::{AppError, Result};
use crate::library::Folder;
use crate::state::AppState;

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

async fn health_check(State(_state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Build the application router
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/api/folders", post(folders::create_folder).get(folders::list_folders))
        .route("/api/folders/json", post(folders::create_folder_json))
        .route(
            "/api/folders/:id",
            get(folders::get_folder).delete(folders::delete_folder),
        )
        .route("/api/folders/:id/images/:image", get(folders::get_image))
        .route("/api/folders/:id/process", post(process::process_folder))
        .route("/api/folders/:id/reprocess", post(process::reprocess_folder))
        .route("/api/folders/:id/complete", post(calibration::complete_folder))
        .route("/api/folders/:id/calibration/open", post(calibration::open_session))
        .route("/api/folders/:id/calibration/save", post(calibration::save_session))
        .route("/api/folders/:id/calibration/close", post(calibration::close_session))
        .route(
            "/api/folders/:id/calibration/:image",
            get(calibration::get_set),
        )
        .route(
            "/api/folders/:id/calibration/:image/seed",
            post(calibration::seed_image),
        )
        .route(
            "/api/folders/:id/calibration/:image/stats",
            get(calibration::get_stats),
        )
        .route(
            "/api/folders/:id/calibration/:image/regions",
            post(calibration::add_region).delete(calibration::clear_regions),
        )
        .route(
            "/api/folders/:id/calibration/:image/regions/:region_id",
            put(calibration::edit_region).delete(calibration::delete_region),
        )
        .route("/api/folders/:id/export", get(export::export_folder))
        .route("/api/export", get(export::export_all))
        .with_state(state)
}

/// Cache-first folder load
pub(crate) async fn load_folder(state: &AppState, id: &str) -> Result<Folder> {
    if let Some(folder) = state.cache().get_folder(id).await {
        return Ok(folder);
    }

    let folder = FolderRepository::new(state.db())
        .get(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Folder not found: {}", id)))?;

    state.cache().put_folder(folder.clone()).await;
    Ok(folder)
}

/// Cache-first load of a folder's saved annotation sets
pub(crate) async fn load_annotation_sets(
    state: &AppState,
    folder_id: &str,
) -> Result<Vec<AnnotationSet>> {
    if let Some(sets) = state.cache().get_annotation_sets(folder_id).await {
        return Ok(sets);
    }

    let sets = AnnotationRepository::new(state.db())
        .list_for_folder(folder_id)
        .await?;

    state
        .cache()
        .put_annotation_sets(folder_id, sets.clone())
        .await;
    Ok(sets)
}
