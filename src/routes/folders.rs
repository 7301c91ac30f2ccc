//! Folder upload and management handlers

use axum::extract::{Multipart, Path, State};
use axum::http::header;
use axum::response::IntoResponse;
use axum::Json;
use serde::{Deserialize, Serialize};

use super::load_folder;
use crate::db::FolderRepository;
use crate::error::{AppError, Result};
use crate::library::{decode_data_uri, sniff_dimensions, validate_file, Folder, ImageFileMeta};
use crate::state::AppState;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    pub folder: Folder,
    pub accepted: Vec<String>,
    pub rejected: Vec<RejectedFile>,
}

#[derive(Serialize)]
pub struct RejectedFile {
    pub name: String,
    pub reason: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JsonUploadRequest {
    pub name: String,
    pub files: Vec<JsonUploadFile>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JsonUploadFile {
    pub name: String,
    pub data_uri: String,
    #[serde(default)]
    pub last_modified: i64,
}

struct IncomingFile {
    name: String,
    bytes: Vec<u8>,
    last_modified: i64,
}

/// POST /api/folders (multipart): `name` field plus one part per image
pub async fn create_folder(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>> {
    let mut folder_name: Option<String> = None;
    let mut files = Vec::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::InvalidInput(format!("malformed multipart body: {}", e)))?
    {
        if field.name() == Some("name") {
            folder_name = Some(
                field
                    .text()
                    .await
                    .map_err(|e| AppError::InvalidInput(format!("bad name field: {}", e)))?,
            );
            continue;
        }

        let Some(file_name) = field.file_name().map(str::to_string) else {
            continue;
        };
        let bytes = field
            .bytes()
            .await
            .map_err(|e| AppError::InvalidInput(format!("failed to read {}: {}", file_name, e)))?;

        files.push(IncomingFile {
            name: file_name,
            bytes: bytes.to_vec(),
            last_modified: 0,
        });
    }

    let name = folder_name.ok_or_else(|| AppError::InvalidInput("missing folder name".into()))?;
    ingest(&state, &name, files).await.map(Json)
}

/// POST /api/folders/json: data-URI upload for clients without multipart
pub async fn create_folder_json(
    State(state): State<AppState>,
    Json(request): Json<JsonUploadRequest>,
) -> Result<Json<UploadResponse>> {
    let mut files = Vec::new();
    let mut rejected = Vec::new();

    for file in request.files {
        match decode_data_uri(&file.data_uri) {
            Ok((_mime, bytes)) => files.push(IncomingFile {
                name: file.name,
                bytes,
                last_modified: file.last_modified,
            }),
            Err(reason) => rejected.push(RejectedFile {
                name: file.name,
                reason,
            }),
        }
    }

    let mut response = ingest(&state, &request.name, files).await?;
    response.rejected.extend(rejected);
    Ok(Json(response))
}

/// Validate each file, create the folder record, chunk the accepted
/// payloads. One bad file never blocks its siblings.
async fn ingest(state: &AppState, name: &str, files: Vec<IncomingFile>) -> Result<UploadResponse> {
    if name.trim().is_empty() {
        return Err(AppError::InvalidInput("folder name must not be empty".into()));
    }
    if files.is_empty() {
        return Err(AppError::InvalidInput("upload contains no files".into()));
    }

    let max_size = state.config().storage.max_file_size;
    let mut accepted: Vec<(ImageFileMeta, Vec<u8>)> = Vec::new();
    let mut rejected = Vec::new();

    for file in files {
        if accepted.iter().any(|(meta, _)| meta.name == file.name) {
            rejected.push(RejectedFile {
                name: file.name,
                reason: "duplicate image name".to_string(),
            });
            continue;
        }

        match validate_file(&file.name, file.bytes.len() as u64, max_size) {
            Ok(mime) => {
                let dims = sniff_dimensions(&file.bytes);
                accepted.push((
                    ImageFileMeta {
                        name: file.name,
                        mime_type: mime,
                        size: file.bytes.len() as u64,
                        width: dims.map(|(w, _)| w),
                        height: dims.map(|(_, h)| h),
                        last_modified: file.last_modified,
                    },
                    file.bytes,
                ));
            }
            Err(reason) => rejected.push(RejectedFile {
                name: file.name,
                reason,
            }),
        }
    }

    if accepted.is_empty() {
        return Err(AppError::InvalidInput(format!(
            "no valid image files ({} rejected)",
            rejected.len()
        )));
    }

    let metas: Vec<ImageFileMeta> = accepted.iter().map(|(meta, _)| meta.clone()).collect();
    let mut folder = Folder::new(name, metas);
    FolderRepository::new(state.db()).create(&mut folder).await?;

    for (index, (meta, bytes)) in accepted.iter().enumerate() {
        state
            .chunks()
            .store_image(&folder.id, meta, index, bytes)
            .await?;
    }

    Ok(UploadResponse {
        accepted: folder.image_files.iter().map(|f| f.name.clone()).collect(),
        rejected,
        folder,
    })
}

/// GET /api/folders
pub async fn list_folders(State(state): State<AppState>) -> Result<Json<Vec<Folder>>> {
    let folders = FolderRepository::new(state.db()).list().await?;
    Ok(Json(folders))
}

/// GET /api/folders/:id
pub async fn get_folder(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Folder>> {
    load_folder(&state, &id).await.map(Json)
}

/// DELETE /api/folders/:id
pub async fn delete_folder(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>> {
    let deleted = FolderRepository::new(state.db()).delete(&id).await?;
    if !deleted {
        return Err(AppError::NotFound(format!("Folder not found: {}", id)));
    }

    state.cache().invalidate_folder(&id).await;
    state.calibration().close(&id).await;

    Ok(Json(serde_json::json!({ "deleted": true })))
}

/// GET /api/folders/:id/images/:image: reassembled image bytes
pub async fn get_image(
    State(state): State<AppState>,
    Path((id, image)): Path<(String, String)>,
) -> Result<impl IntoResponse> {
    let folder = load_folder(&state, &id).await?;
    let meta = folder
        .image_meta(&image)
        .ok_or_else(|| AppError::NotFound(format!("Image not found: {}", image)))?;

    let data = state
        .chunks()
        .load_image(&id, &image)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Image data missing or corrupt: {}", image)))?;

    Ok(([(header::CONTENT_TYPE, meta.mime_type.clone())], data))
}
