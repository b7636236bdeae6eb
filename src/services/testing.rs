//! In-memory stand-ins for the extraction tool and object storage.

use crate::{
    models::media::VideoMetadata,
    services::{
        extractor::{Extractor, ExtractorError, ExtractorResult},
        object_store::{AccessLink, ObjectStore, StoreError, StoreResult},
    },
};
use async_trait::async_trait;
use bytes::Bytes;
use std::{
    collections::HashMap,
    path::{Path, PathBuf},
    sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

enum DownloadBehavior {
    Write(Vec<u8>),
    Fail { stderr: String, partial: bool },
    Silent,
}

/// Extractor returning canned metadata and writing canned bytes.
pub struct FakeExtractor {
    metadata: Option<VideoMetadata>,
    download: DownloadBehavior,
    direct_url: Option<String>,
    calls: Arc<AtomicUsize>,
}

impl FakeExtractor {
    fn new(download: DownloadBehavior) -> Self {
        Self {
            metadata: Some(VideoMetadata::default()),
            download,
            direct_url: None,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn with_video(title: &str, description: &str, duration: f64, bytes: Vec<u8>) -> Self {
        Self {
            metadata: Some(VideoMetadata {
                title: title.into(),
                description: description.into(),
                duration_seconds: duration,
            }),
            ..Self::new(DownloadBehavior::Write(bytes))
        }
    }

    pub fn failing_download(stderr: &str) -> Self {
        Self::new(DownloadBehavior::Fail {
            stderr: stderr.into(),
            partial: false,
        })
    }

    /// Tool "succeeds" but writes no file.
    pub fn silent_download() -> Self {
        Self::new(DownloadBehavior::Silent)
    }

    pub fn with_direct_url(url: &str) -> Self {
        Self {
            direct_url: Some(url.into()),
            ..Self::new(DownloadBehavior::Silent)
        }
    }

    pub fn failing_metadata(mut self) -> Self {
        self.metadata = None;
        self
    }

    /// Write a partial file before failing the download.
    pub fn leaving_partial_file(mut self) -> Self {
        if let DownloadBehavior::Fail { partial, .. } = &mut self.download {
            *partial = true;
        }
        self
    }

    /// Shared counter of every adapter call made.
    pub fn calls(&self) -> Arc<AtomicUsize> {
        self.calls.clone()
    }
}

#[async_trait]
impl Extractor for FakeExtractor {
    async fn fetch_direct_url(&self, _source_url: &str) -> ExtractorResult<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.direct_url
            .clone()
            .ok_or_else(|| ExtractorError::ToolFailed {
                status: "exit status: 1".into(),
                stderr: "ERROR: no video formats found".into(),
            })
    }

    async fn fetch_metadata(&self, _source_url: &str) -> ExtractorResult<VideoMetadata> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.metadata
            .clone()
            .ok_or_else(|| ExtractorError::ToolFailed {
                status: "exit status: 1".into(),
                stderr: "ERROR: unable to extract metadata".into(),
            })
    }

    async fn download_to_path(&self, _source_url: &str, destination: &Path) -> ExtractorResult<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.download {
            DownloadBehavior::Write(bytes) => {
                tokio::fs::write(destination, bytes).await.unwrap();
                Ok(())
            }
            DownloadBehavior::Fail { stderr, partial } => {
                if *partial {
                    tokio::fs::write(destination, b"partial").await.unwrap();
                    let mut fragment = destination.as_os_str().to_owned();
                    fragment.push(".part");
                    tokio::fs::write(fragment, b"partial").await.unwrap();
                }
                Err(ExtractorError::ToolFailed {
                    status: "exit status: 1".into(),
                    stderr: stderr.clone(),
                })
            }
            DownloadBehavior::Silent => Err(ExtractorError::FileMissing {
                path: destination.to_path_buf(),
            }),
        }
    }
}

/// One recorded `put_object` call.
#[derive(Clone, Debug)]
pub struct PutRecord {
    pub key: String,
    pub size: usize,
    pub content_type: String,
    pub metadata: HashMap<String, String>,
}

enum LinkMode {
    Public(String),
    Presigned(Duration),
}

/// Object store recording calls in memory.
pub struct FakeStore {
    link: LinkMode,
    fail_put: bool,
    fail_link: bool,
    fail_delete: bool,
    signatures: AtomicUsize,
    puts: Mutex<Vec<PutRecord>>,
    deletes: Mutex<Vec<String>>,
}

impl FakeStore {
    fn new(link: LinkMode) -> Self {
        Self {
            link,
            fail_put: false,
            fail_link: false,
            fail_delete: false,
            signatures: AtomicUsize::new(0),
            puts: Mutex::new(Vec::new()),
            deletes: Mutex::new(Vec::new()),
        }
    }

    /// Every link is `url`, with no expiry.
    pub fn public(url: &str) -> Self {
        Self::new(LinkMode::Public(url.into()))
    }

    /// Links embed the key and a fresh signature each call.
    pub fn presigned(expires_in: Duration) -> Self {
        Self::new(LinkMode::Presigned(expires_in))
    }

    pub fn failing_put(mut self) -> Self {
        self.fail_put = true;
        self
    }

    pub fn failing_link(mut self) -> Self {
        self.fail_link = true;
        self
    }

    pub fn failing_delete(mut self) -> Self {
        self.fail_delete = true;
        self
    }

    pub fn puts(&self) -> Vec<PutRecord> {
        self.puts.lock().unwrap().clone()
    }

    pub fn deletes(&self) -> Vec<String> {
        self.deletes.lock().unwrap().clone()
    }
}

#[async_trait]
impl ObjectStore for FakeStore {
    async fn put_object(
        &self,
        key: &str,
        body: Bytes,
        content_type: &str,
        metadata: HashMap<String, String>,
    ) -> StoreResult<()> {
        self.puts.lock().unwrap().push(PutRecord {
            key: key.into(),
            size: body.len(),
            content_type: content_type.into(),
            metadata,
        });
        if self.fail_put {
            return Err(StoreError::Put {
                key: key.into(),
                message: "AccessDenied".into(),
            });
        }
        Ok(())
    }

    async fn read_link(&self, key: &str) -> StoreResult<AccessLink> {
        if self.fail_link {
            return Err(StoreError::Link {
                key: key.into(),
                message: "signing unavailable".into(),
            });
        }
        Ok(match &self.link {
            LinkMode::Public(url) => AccessLink {
                url: url.clone(),
                expires_in: None,
            },
            LinkMode::Presigned(expires_in) => {
                let sig = self.signatures.fetch_add(1, Ordering::SeqCst);
                AccessLink {
                    url: format!(
                        "https://signed.example/{key}?X-Amz-Expires={}&X-Amz-Signature={sig:08x}",
                        expires_in.as_secs()
                    ),
                    expires_in: Some(*expires_in),
                }
            }
        })
    }

    async fn delete_object(&self, key: &str) -> StoreResult<()> {
        if self.fail_delete {
            return Err(StoreError::Delete {
                key: key.into(),
                message: "connection reset".into(),
            });
        }
        self.deletes.lock().unwrap().push(key.into());
        Ok(())
    }
}

/// Shell prologue for stand-in tools: `$out` holds the value given after `-o`.
#[cfg(unix)]
const OUTPUT_ARG: &str = r#"out=""
prev=""
for arg in "$@"; do
  if [ "$prev" = "-o" ]; then out="$arg"; fi
  prev="$arg"
done"#;

/// Write an executable `/bin/sh` script standing in for the extraction tool.
///
/// `body` runs with the tool's argument vector in `$@`.
#[cfg(unix)]
pub fn stand_in_tool(dir: &Path, body: &str) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let path = dir.join("yt-dlp-stand-in");
    std::fs::write(&path, format!("#!/bin/sh\n{OUTPUT_ARG}\n{body}\n")).unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    path
}
