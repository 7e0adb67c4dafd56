//! HTTP handlers for Blob service

use std::sync::Arc;

use axum::{
    body::Body,
    extract::{
        multipart::MultipartError,
        rejection::{PathRejection, QueryRejection},
        DefaultBodyLimit, Multipart, Path, Query, State,
    },
    http::{header, StatusCode},
    response::IntoResponse,
    routing::{delete, get, post},
    Json, Router,
};
use blobgate_core::problemdetails::{self, Problem, ProblemDetails};
use tracing::{debug, error};
use utoipa::OpenApi;

use super::types::*;
use crate::error::BlobError;

/// OpenAPI documentation for Blob API
#[derive(OpenApi)]
#[openapi(
    paths(upload_file, read_file, download_file, delete_file, list_files),
    components(schemas(BlobResponse, UploadForm, ProblemDetails)),
    tags((name = "Blob", description = "Blob storage operations"))
)]
pub struct BlobApiDoc;

/// Configure blob routes
pub fn configure_routes() -> Router<Arc<BlobAppState>> {
    Router::new()
        .route("/upload", post(upload_file))
        .route("/read-file", get(read_file))
        .route("/download-file", get(download_file))
        .route("/delete/{filename}", delete(delete_file))
        .route("/listAll", get(list_files))
}

/// Blob routes bound to `state`, with the configured upload size limit
pub fn build_router(state: Arc<BlobAppState>) -> Router {
    let max_upload_bytes = state.config.max_upload_bytes;
    configure_routes()
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .with_state(state)
}

fn multipart_problem(err: MultipartError) -> Problem {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        return problemdetails::new(StatusCode::PAYLOAD_TOO_LARGE)
            .with_title("Upload Too Large")
            .with_detail(err.body_text());
    }
    BlobError::MalformedUpload(err.body_text()).into()
}

fn rejection_problem(operation: &'static str, reason: String) -> Problem {
    let error = BlobError::InvalidRequest { operation, reason };
    debug!("{}", error);
    error.into()
}

fn file_query(
    operation: &'static str,
    query: Result<Query<FileQuery>, QueryRejection>,
) -> Result<FileQuery, Problem> {
    query
        .map(|Query(query)| query)
        .map_err(|rejection| rejection_problem(operation, rejection.body_text()))
}

/// Upload a file
#[utoipa::path(
    tag = "Blob",
    post,
    path = "/upload",
    request_body(content = UploadForm, content_type = "multipart/form-data"),
    responses(
        (status = 201, description = "File uploaded successfully", body = BlobResponse),
        (status = 400, description = "Upload failed", body = ProblemDetails),
        (status = 413, description = "Upload exceeds the configured size limit", body = ProblemDetails)
    )
)]
async fn upload_file(
    State(state): State<Arc<BlobAppState>>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, Problem> {
    while let Some(field) = multipart.next_field().await.map_err(multipart_problem)? {
        if field.name() != Some(UPLOAD_FIELD) {
            debug!("Skipping multipart field {:?}", field.name());
            continue;
        }

        let original_name = field.file_name().map(str::to_owned).ok_or_else(|| {
            BlobError::MalformedUpload(format!("the '{}' field has no file name", UPLOAD_FIELD))
        })?;
        let body = field.bytes().await.map_err(multipart_problem)?;

        let info = state
            .blob_service
            .upload_file(body, &original_name, &state.config.default_container)
            .await
            .inspect_err(|e| error!("{}", e))?;

        return Ok((StatusCode::CREATED, Json(BlobResponse::from(info))));
    }

    Err(BlobError::MissingFile(UPLOAD_FIELD.to_string()).into())
}

/// Stream a file's raw content
#[utoipa::path(
    tag = "Blob",
    get,
    path = "/read-file",
    params(FileQuery),
    responses(
        (status = 200, description = "Raw file content"),
        (status = 400, description = "File could not be read", body = ProblemDetails)
    )
)]
async fn read_file(
    State(state): State<Arc<BlobAppState>>,
    query: Result<Query<FileQuery>, QueryRejection>,
) -> Result<impl IntoResponse, Problem> {
    let query = file_query("get file", query)?;
    let stream = state
        .blob_service
        .get_file(&query.filename, &state.config.default_container)
        .await
        .inspect_err(|e| error!("{}", e))?;

    Ok((StatusCode::OK, Body::from_stream(stream)))
}

/// Download a file as an attachment
#[utoipa::path(
    tag = "Blob",
    get,
    path = "/download-file",
    params(FileQuery),
    responses(
        (status = 200, description = "File content with Content-Disposition: attachment"),
        (status = 400, description = "File could not be read", body = ProblemDetails)
    )
)]
async fn download_file(
    State(state): State<Arc<BlobAppState>>,
    query: Result<Query<FileQuery>, QueryRejection>,
) -> Result<impl IntoResponse, Problem> {
    let query = file_query("get file", query)?;
    let stream = state
        .blob_service
        .get_file(&query.filename, &state.config.default_container)
        .await
        .inspect_err(|e| error!("{}", e))?;

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, guess_content_type(&query.filename).to_string()),
            (header::CONTENT_DISPOSITION, content_disposition(&query.filename)),
        ],
        Body::from_stream(stream),
    ))
}

/// Delete a file
#[utoipa::path(
    tag = "Blob",
    delete,
    path = "/delete/{filename}",
    params(
        ("filename" = String, Path, description = "Object key returned by the upload"),
    ),
    responses(
        (status = 200, description = "Confirmation message", body = String, content_type = "text/plain"),
        (status = 400, description = "File could not be deleted", body = ProblemDetails)
    )
)]
async fn delete_file(
    State(state): State<Arc<BlobAppState>>,
    filename: Result<Path<String>, PathRejection>,
) -> Result<impl IntoResponse, Problem> {
    let Path(filename) =
        filename.map_err(|rejection| rejection_problem("delete file", rejection.body_text()))?;
    let message = state
        .blob_service
        .delete_file(&filename, &state.config.default_container)
        .await
        .inspect_err(|e| error!("{}", e))?;

    Ok((StatusCode::OK, message))
}

/// List every file with a fresh temporary URL
#[utoipa::path(
    tag = "Blob",
    get,
    path = "/listAll",
    responses(
        (status = 200, description = "Files in the container", body = Vec<BlobResponse>),
        (status = 400, description = "Files could not be listed", body = ProblemDetails)
    )
)]
async fn list_files(State(state): State<Arc<BlobAppState>>) -> Result<impl IntoResponse, Problem> {
    let files = state
        .blob_service
        .list_files(&state.config.default_container)
        .await
        .inspect_err(|e| error!("{}", e))?;

    Ok(Json(
        files.into_iter().map(BlobResponse::from).collect::<Vec<_>>(),
    ))
}

/// `Content-Disposition` value for an attachment named `file_name`.
/// Names that are not plain ASCII get an RFC 6266 `filename*` parameter.
fn content_disposition(file_name: &str) -> String {
    let plain = |c: char| c.is_ascii_graphic() && c != '"' && c != '\\' || c == ' ';
    if file_name.chars().all(plain) {
        return format!("attachment; filename=\"{}\"", file_name);
    }

    let fallback: String = file_name
        .chars()
        .map(|c| if plain(c) { c } else { '_' })
        .collect();
    format!(
        "attachment; filename=\"{}\"; filename*=UTF-8''{}",
        fallback,
        urlencoding::encode(file_name)
    )
}

/// Guess content type from a file name's extension
fn guess_content_type(file_name: &str) -> &'static str {
    let extension = match file_name.rsplit_once('.') {
        Some((_, extension)) => extension.to_lowercase(),
        None => return "application/octet-stream",
    };

    match extension.as_str() {
        // Images
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "svg" => "image/svg+xml",
        "ico" => "image/x-icon",
        "bmp" => "image/bmp",
        // Documents
        "pdf" => "application/pdf",
        "doc" => "application/msword",
        "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        "xls" => "application/vnd.ms-excel",
        "xlsx" => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        "ppt" => "application/vnd.ms-powerpoint",
        "pptx" => "application/vnd.openxmlformats-officedocument.presentationml.presentation",
        // Text
        "txt" => "text/plain",
        "csv" => "text/csv",
        "md" => "text/markdown",
        "html" | "htm" => "text/html",
        "css" => "text/css",
        "js" => "application/javascript",
        "json" => "application/json",
        "xml" => "application/xml",
        // Archives
        "zip" => "application/zip",
        "tar" => "application/x-tar",
        "gz" | "gzip" => "application/gzip",
        // Media
        "mp3" => "audio/mpeg",
        "wav" => "audio/wav",
        "mp4" => "video/mp4",
        "webm" => "video/webm",
        _ => "application/octet-stream",
    }
}
