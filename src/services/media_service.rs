//! src/services/media_service.rs
//!
//! MediaService — the download → upload → link lifecycle of one video.
//! Every request gets a fresh `FileId`; the staged local file belongs to that
//! request alone and is removed before the request completes, whatever the
//! outcome. No state is kept between requests.

use crate::{
    models::{
        media::{FileId, VIDEO_CONTENT_TYPE, VideoMetadata, format_file_size, iso_timestamp},
        responses::{DeleteResponse, DirectUrlResponse, DownloadResponse, LinkResponse},
    },
    services::{
        extractor::{Extractor, ExtractorError},
        object_store::{AccessLink, ObjectStore, StoreError, sanitize_metadata},
    },
};
use bytes::Bytes;
use chrono::{DateTime, Utc};
use std::{
    collections::HashMap,
    io::{self, ErrorKind},
    path::{Path, PathBuf},
    sync::Arc,
};
use thiserror::Error;
use tokio::fs;
use tracing::{debug, info, warn};

#[derive(Debug, Error)]
pub enum MediaError {
    #[error("source url missing")]
    MissingSourceUrl,
    #[error("direct url lookup failed: {0}")]
    Resolve(#[source] ExtractorError),
    #[error("download failed: {0}")]
    Download(#[source] ExtractorError),
    #[error("staged file unreadable: {0}")]
    Staging(#[source] io::Error),
    #[error("upload failed: {0}")]
    Upload(#[source] StoreError),
    #[error("link generation failed: {0}")]
    Link(#[source] StoreError),
    #[error("delete failed: {0}")]
    Delete(#[source] StoreError),
}

pub type MediaResult<T> = Result<T, MediaError>;

/// Local scratch file owned by exactly one request.
///
/// Removed explicitly via [`StagedFile::discard`]; dropping it without
/// discarding (e.g. a cancelled request) removes it synchronously. Either way
/// every sibling named `<staged name>*` goes too, so `.part` or `.ytdl`
/// leftovers of an interrupted tool run never outlive the request.
struct StagedFile {
    path: PathBuf,
    discarded: bool,
}

impl StagedFile {
    fn new(path: PathBuf) -> Self {
        Self {
            path,
            discarded: false,
        }
    }

    fn path(&self) -> &Path {
        &self.path
    }

    /// `true` for the staged path itself and anything the tool derived from it.
    fn owns(&self, candidate: &Path) -> bool {
        match (self.path.file_name(), candidate.file_name()) {
            (Some(staged), Some(name)) => name
                .to_string_lossy()
                .starts_with(staged.to_string_lossy().as_ref()),
            _ => false,
        }
    }

    fn staging_dir(&self) -> &Path {
        self.path.parent().unwrap_or_else(|| Path::new("."))
    }

    /// Remove the file and its leftovers. A file that was never written is
    /// not an error; other failures are logged and never replace the request
    /// outcome.
    async fn discard(mut self) {
        self.discarded = true;
        let mut targets = vec![self.path.clone()];
        match fs::read_dir(self.staging_dir()).await {
            Ok(mut entries) => loop {
                match entries.next_entry().await {
                    Ok(Some(entry)) => {
                        let path = entry.path();
                        if path != self.path && self.owns(&path) {
                            targets.push(path);
                        }
                    }
                    Ok(None) => break,
                    Err(err) => {
                        warn!(error = %err, "failed to list staging directory");
                        break;
                    }
                }
            },
            Err(err) => warn!(error = %err, "failed to list staging directory"),
        }

        for target in targets {
            match fs::remove_file(&target).await {
                Ok(()) => debug!("removed staged file {}", target.display()),
                Err(err) if err.kind() == ErrorKind::NotFound => {}
                Err(err) => warn!(
                    error = %err,
                    "failed to remove staged file {}",
                    target.display()
                ),
            }
        }
    }
}

impl Drop for StagedFile {
    fn drop(&mut self) {
        if self.discarded {
            return;
        }
        let mut targets = vec![self.path.clone()];
        if let Ok(entries) = std::fs::read_dir(self.staging_dir()) {
            targets.extend(
                entries
                    .filter_map(Result::ok)
                    .map(|entry| entry.path())
                    .filter(|path| *path != self.path && self.owns(path)),
            );
        }
        for target in targets {
            if let Err(err) = std::fs::remove_file(&target) {
                if err.kind() != ErrorKind::NotFound {
                    warn!(
                        error = %err,
                        "failed to remove abandoned staged file {}",
                        target.display()
                    );
                }
            }
        }
    }
}

/// Orchestrates the extractor and object store for the HTTP layer.
///
/// Cheap to clone; used directly as router state.
#[derive(Clone)]
pub struct MediaService {
    extractor: Arc<dyn Extractor>,
    store: Arc<dyn ObjectStore>,
    /// Directory for staged downloads. Must exist before the first request.
    pub staging_dir: PathBuf,
    pub bucket: String,
}

impl MediaService {
    pub fn new(
        extractor: Arc<dyn Extractor>,
        store: Arc<dyn ObjectStore>,
        staging_dir: impl Into<PathBuf>,
        bucket: impl Into<String>,
    ) -> Self {
        Self {
            extractor,
            store,
            staging_dir: staging_dir.into(),
            bucket: bucket.into(),
        }
    }

    /// Download the post's video, upload it and return a read link.
    ///
    /// - Metadata lookup is best effort; failures fall back to empty metadata.
    /// - The staged file is removed on every path once it may exist.
    /// - A link failure after a successful upload is reported, never retried.
    pub async fn create(&self, source_url: &str) -> MediaResult<DownloadResponse> {
        let source_url = require_source(source_url)?;

        let file_id = FileId::generate();
        let key = file_id.object_key();

        let metadata = match self.extractor.fetch_metadata(source_url).await {
            Ok(metadata) => metadata,
            Err(err) => {
                warn!(error = %err, source_url, "metadata lookup failed, continuing without it");
                VideoMetadata::default()
            }
        };

        let staged = StagedFile::new(self.staging_dir.join(file_id.staging_file_name()));
        let uploaded = self
            .stage_and_upload(source_url, &key, &metadata, staged.path())
            .await;
        staged.discard().await;
        let size = uploaded?;

        let link = self.store.read_link(&key).await.map_err(MediaError::Link)?;
        let now = Utc::now();
        let (url_expires_in, url_expires_at) = expiry_fields(&link, now);

        Ok(DownloadResponse {
            url: link.url,
            r2_key: key,
            bucket: self.bucket.clone(),
            file_id,
            description: metadata.description,
            title: metadata.title,
            duration: metadata.duration_seconds,
            size,
            size_formatted: format_file_size(size),
            uploaded_at: iso_timestamp(now),
            url_expires_in,
            url_expires_at,
        })
    }

    /// Download into `staged_path`, read it back and put it at `key`.
    /// Returns the uploaded byte count. Leaves cleanup to the caller.
    async fn stage_and_upload(
        &self,
        source_url: &str,
        key: &str,
        metadata: &VideoMetadata,
        staged_path: &Path,
    ) -> MediaResult<u64> {
        self.extractor
            .download_to_path(source_url, staged_path)
            .await
            .map_err(|err| {
                warn!(error = %err, source_url, "download failed");
                MediaError::Download(err)
            })?;

        let body = Bytes::from(fs::read(staged_path).await.map_err(MediaError::Staging)?);
        let size = body.len() as u64;

        let object_metadata = HashMap::from([
            ("original-url".to_string(), sanitize_metadata(source_url)),
            (
                "description".to_string(),
                sanitize_metadata(&metadata.description),
            ),
            ("title".to_string(), sanitize_metadata(&metadata.title)),
        ]);

        self.store
            .put_object(key, body, VIDEO_CONTENT_TYPE, object_metadata)
            .await
            .map_err(MediaError::Upload)?;

        info!(key, size_bytes = size, "video relayed to object storage");
        Ok(size)
    }

    /// Regenerate a read link for an earlier upload.
    ///
    /// The object's existence is not checked; a link for a missing object is
    /// produced all the same and 404s when fetched.
    pub async fn refresh_link(&self, file_id: FileId) -> MediaResult<LinkResponse> {
        let key = file_id.object_key();
        let link = self.store.read_link(&key).await.map_err(MediaError::Link)?;
        let (url_expires_in, url_expires_at) = expiry_fields(&link, Utc::now());

        Ok(LinkResponse {
            url: link.url,
            r2_key: key,
            file_id,
            url_expires_in,
            url_expires_at,
        })
    }

    /// Delete an uploaded video. Absent objects delete successfully.
    pub async fn delete(&self, file_id: FileId) -> MediaResult<DeleteResponse> {
        let key = file_id.object_key();
        self.store
            .delete_object(&key)
            .await
            .map_err(MediaError::Delete)?;

        Ok(DeleteResponse {
            success: true,
            message: "File deleted successfully".into(),
            file_id,
            r2_key: key,
            deleted_at: iso_timestamp(Utc::now()),
        })
    }

    /// Proxy-only variant: resolve the post to a direct media URL, no upload.
    pub async fn resolve_direct(&self, source_url: &str) -> MediaResult<DirectUrlResponse> {
        let source_url = require_source(source_url)?;
        let url = self
            .extractor
            .fetch_direct_url(source_url)
            .await
            .map_err(MediaError::Resolve)?;
        Ok(DirectUrlResponse { url })
    }
}

fn require_source(source_url: &str) -> MediaResult<&str> {
    let trimmed = source_url.trim();
    if trimmed.is_empty() {
        return Err(MediaError::MissingSourceUrl);
    }
    Ok(trimmed)
}

fn expiry_fields(link: &AccessLink, now: DateTime<Utc>) -> (Option<u64>, Option<String>) {
    match link.expires_in {
        Some(expires_in) => {
            let expires_at = chrono::Duration::from_std(expires_in)
                .ok()
                .and_then(|d| now.checked_add_signed(d))
                .map(iso_timestamp);
            (Some(expires_in.as_secs()), expires_at)
        }
        None => (None, None),
    }
}
