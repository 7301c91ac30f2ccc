//! Export handlers

use axum::extract::{Path, State};
use axum::Json;

use super::{load_annotation_sets, load_folder};
use crate::db::{AnnotationRepository, FolderRepository};
use crate::error::Result;
use crate::export::{export_document, ExportDocument};
use crate::state::AppState;

/// GET /api/folders/:id/export
pub async fn export_folder(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ExportDocument>> {
    let folder = load_folder(&state, &id).await?;
    let annotations = load_annotation_sets(&state, &id).await?;

    Ok(Json(export_document(&[(folder, annotations)])))
}

/// GET /api/export: every folder, reconciled
pub async fn export_all(State(state): State<AppState>) -> Result<Json<ExportDocument>> {
    let folders = FolderRepository::new(state.db()).list().await?;
    let repo = AnnotationRepository::new(state.db());

    let mut pairs = Vec::with_capacity(folders.len());
    for folder in folders {
        let annotations = repo.list_for_folder(&folder.id).await?;
        pairs.push((folder, annotations));
    }

    Ok(Json(export_document(&pairs)))
}
