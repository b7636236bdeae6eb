//! HTTP handlers for the video lifecycle.
//! Each handler only shapes input and output; the work happens in `MediaService`.

use crate::{
    errors::AppError,
    models::{
        media::FileId,
        responses::{
            DeleteResponse, DirectUrlResponse, DownloadResponse, LinkResponse, MediaRequest,
        },
    },
    services::media_service::{MediaError, MediaService},
};
use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
};

/// `POST /download` — download, upload and link a post's video.
pub async fn download_video(
    State(service): State<MediaService>,
    payload: Result<Json<MediaRequest>, JsonRejection>,
) -> Result<Json<DownloadResponse>, AppError> {
    let source_url = source_url(payload)?;
    Ok(Json(service.create(&source_url).await?))
}

/// `POST /resolve` — direct media URL only, nothing is stored.
pub async fn resolve_video(
    State(service): State<MediaService>,
    payload: Result<Json<MediaRequest>, JsonRejection>,
) -> Result<Json<DirectUrlResponse>, AppError> {
    let source_url = source_url(payload)?;
    Ok(Json(service.resolve_direct(&source_url).await?))
}

/// `GET /url/{fileId}` — regenerate the read link of an upload.
pub async fn get_video_url(
    State(service): State<MediaService>,
    Path(file_id): Path<String>,
) -> Result<Json<LinkResponse>, AppError> {
    let file_id = parse_file_id(&file_id)?;
    Ok(Json(service.refresh_link(file_id).await?))
}

/// `DELETE /delete/{fileId}` — remove an upload from storage.
pub async fn delete_video(
    State(service): State<MediaService>,
    Path(file_id): Path<String>,
) -> Result<Json<DeleteResponse>, AppError> {
    let file_id = parse_file_id(&file_id)?;
    Ok(Json(service.delete(file_id).await?))
}

/// Pull the source URL out of the body. Unreadable bodies count as a missing URL.
fn source_url(payload: Result<Json<MediaRequest>, JsonRejection>) -> Result<String, AppError> {
    match payload {
        Ok(Json(request)) => Ok(request.url.unwrap_or_default()),
        Err(JsonRejection::MissingJsonContentType(_)) => Ok(String::new()),
        Err(rejection) => {
            Err(AppError::from(MediaError::MissingSourceUrl).with_details(rejection.body_text()))
        }
    }
}

fn parse_file_id(raw: &str) -> Result<FileId, AppError> {
    raw.trim().parse().map_err(|err: uuid::Error| {
        AppError::bad_request("Invalid file ID").with_details(err.to_string())
    })
}
