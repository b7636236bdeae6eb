//! JSON bodies returned by the HTTP API.
//!
//! Field names are camelCase on the wire; `urlExpiresIn`/`urlExpiresAt` are
//! `null` when links come from a fixed public prefix.

use super::media::{FileId, serialize_seconds};
use serde::{Deserialize, Serialize};

/// Request body of `POST /download` and `POST /resolve`.
#[derive(Debug, Default, Deserialize)]
pub struct MediaRequest {
    #[serde(default)]
    pub url: Option<String>,
}

/// Response of `POST /download`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DownloadResponse {
    pub url: String,
    pub r2_key: String,
    pub bucket: String,
    pub file_id: FileId,
    pub description: String,
    pub title: String,
    #[serde(serialize_with = "serialize_seconds")]
    pub duration: f64,
    pub size: u64,
    pub size_formatted: String,
    pub uploaded_at: String,
    pub url_expires_in: Option<u64>,
    pub url_expires_at: Option<String>,
}

/// Response of `GET /url/{fileId}`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkResponse {
    pub url: String,
    pub r2_key: String,
    pub file_id: FileId,
    pub url_expires_in: Option<u64>,
    pub url_expires_at: Option<String>,
}

/// Response of `DELETE /delete/{fileId}`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteResponse {
    pub success: bool,
    pub message: String,
    pub file_id: FileId,
    pub r2_key: String,
    pub deleted_at: String,
}

/// Response of `POST /resolve`.
#[derive(Debug, Serialize)]
pub struct DirectUrlResponse {
    pub url: String,
}
