use axum::body::Body;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Multipart, Path, State};
use axum::http::header;
use axum::response::Response;
use axum::Json;
use serde::{Deserialize, Serialize};
use std::path::Path as FsPath;
use std::str::FromStr;
use tokio_util::io::ReaderStream;

use crate::cleanup;
use crate::formats::{mime_type_for, MediaKind, StorageArea};
use crate::http::{download_url, AppError, AppState};
use crate::pipeline::CompressionRequest;
use crate::quality::Quality;
use crate::resize::ResizeConstraints;
use crate::utils::format_file_size;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

#[derive(Serialize)]
pub struct UploadResponse {
    pub success: bool,
    pub filename: String,
    pub original_name: String,
    pub file_size: String,
    pub file_type: &'static str,
    pub download_url: String,
}

pub async fn upload(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, AppError> {
    let mut file: Option<(String, Vec<u8>)> = None;
    let mut file_type: Option<String> = None;

    while let Some(field) = multipart.next_field().await? {
        let field_name = field.name().unwrap_or_default().to_string();
        match field_name.as_str() {
            "file" => {
                let filename = field.file_name().unwrap_or_default().to_string();
                let bytes = field.bytes().await?;
                file = Some((filename, bytes.to_vec()));
            }
            "file_type" => {
                file_type = Some(field.text().await?);
            }
            _ => {}
        }
    }

    let (original_name, bytes) = file.ok_or_else(|| AppError::bad_request("No file uploaded"))?;
    if original_name.is_empty() {
        return Err(AppError::bad_request("No file selected"));
    }
    let kind = match file_type.as_deref() {
        None | Some("") => MediaKind::Image,
        Some(value) => MediaKind::from_str(value)?,
    };

    let store = state.compressor.store().clone();
    let asset = tokio::task::spawn_blocking(move || store.save_upload(&original_name, kind, &bytes))
        .await?
        .map_err(|err| {
            tracing::warn!(error = %err, "upload rejected");
            AppError::from(err)
        })?;

    Ok(Json(UploadResponse {
        success: true,
        download_url: download_url(StorageArea::Original, &asset.name),
        file_size: format_file_size(asset.size),
        filename: asset.name,
        original_name: asset.original_name,
        file_type: asset.kind.as_str(),
    }))
}

#[derive(Deserialize)]
pub struct CompressPayload {
    pub filename: Option<String>,
    pub file_type: Option<String>,
    pub quality: Option<i64>,
    pub max_width: Option<i64>,
    pub max_height: Option<i64>,
}

#[derive(Serialize)]
pub struct CompressResponse {
    pub success: bool,
    pub compressed_filename: String,
    pub compressed_size: String,
    pub compression_ratio: f64,
    pub original_bytes: u64,
    pub compressed_bytes: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
    pub download_url: String,
}

pub async fn compress(
    State(state): State<AppState>,
    payload: Result<Json<CompressPayload>, JsonRejection>,
) -> Result<Json<CompressResponse>, AppError> {
    let Json(payload) = payload?;

    let filename = payload
        .filename
        .filter(|name| !name.is_empty())
        .ok_or_else(|| AppError::bad_request("No filename provided"))?;

    // Fall back to the stored name's extension when no kind is declared
    let kind = match payload.file_type.as_deref() {
        Some(value) if !value.is_empty() => MediaKind::from_str(value)?,
        _ => MediaKind::from_path(FsPath::new(&filename))
            .ok_or_else(|| AppError::bad_request("No file type provided"))?,
    };

    let quality = match payload.quality {
        Some(pct) => Quality::new(pct)?,
        None => Quality::default(),
    };
    let constraints = ResizeConstraints::from_request(payload.max_width, payload.max_height)?;

    let request = CompressionRequest {
        source_name: filename,
        kind,
        quality,
        constraints,
    };

    let compressor = state.compressor.clone();
    let result = tokio::task::spawn_blocking(move || compressor.compress(&request))
        .await?
        .map_err(|err| {
            tracing::error!(error = %err, kind = %kind, "compression request failed");
            AppError::from(err)
        })?;

    Ok(Json(CompressResponse {
        success: true,
        compressed_size: format_file_size(result.compressed_bytes),
        compression_ratio: result.ratio,
        original_bytes: result.original_bytes,
        compressed_bytes: result.compressed_bytes,
        width: result.dimensions.map(|(w, _)| w),
        height: result.dimensions.map(|(_, h)| h),
        download_url: download_url(StorageArea::Compressed, &result.compressed_name),
        compressed_filename: result.compressed_name,
    }))
}

pub async fn download(
    State(state): State<AppState>,
    Path((area, filename)): Path<(String, String)>,
) -> Result<Response, AppError> {
    let area = StorageArea::from_str(&area)?;
    let path = state.compressor.store().resolve(area, &filename)?;

    let file = tokio::fs::File::open(&path).await.map_err(|err| {
        tracing::error!(error = %err, path = %path.display(), "failed to open stored file");
        match err.kind() {
            std::io::ErrorKind::NotFound => AppError::not_found("File not found"),
            _ => AppError::internal(err.to_string()),
        }
    })?;
    let size = file
        .metadata()
        .await
        .map_err(|err| AppError::internal(err.to_string()))?
        .len();

    Response::builder()
        .header(header::CONTENT_TYPE, mime_type_for(&filename))
        .header(header::CONTENT_LENGTH, size)
        .header(
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", filename),
        )
        .body(Body::from_stream(ReaderStream::new(file)))
        .map_err(|err| AppError::internal(err.to_string()))
}

#[derive(Serialize)]
pub struct CleanupResponse {
    pub success: bool,
    pub message: &'static str,
    pub scanned: usize,
    pub removed: usize,
}

pub async fn cleanup(State(state): State<AppState>) -> Result<Json<CleanupResponse>, AppError> {
    let store = state.compressor.store().clone();
    let retention = state.config.retention;
    let report = tokio::task::spawn_blocking(move || cleanup::sweep(&store, retention)).await?;

    Ok(Json(CleanupResponse {
        success: true,
        message: "Cleanup completed",
        scanned: report.scanned,
        removed: report.removed,
    }))
}
