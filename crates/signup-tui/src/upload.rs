//! Feeds a local file into the avatar field as a sequence of upload events.
//!
//! The file is checked against [`UploadConstraints`] up front; accepted
//! files are streamed by a background task that only sends events. The
//! event loop applies them to the field one at a time.

use std::path::{Path, PathBuf};

use tokio::fs::File;
use tokio::io::AsyncReadExt;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::form::{FileInfo, UploadConstraints, FILE_TOO_BIG_MESSAGE};

#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error("Could not open {path}: {source}")]
    Open {
        path: String,
        source: std::io::Error,
    },
    #[error("{0} is not a file")]
    NotAFile(String),
    #[error("{0}")]
    Rejected(String),
    #[error("{}", FILE_TOO_BIG_MESSAGE)]
    TooBig,
    #[error("Could not read file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Upload receiver closed")]
    ReceiverClosed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadEvent {
    Started { name: String, mime: String },
    Chunk(Vec<u8>),
    Succeeded,
    Failed(String),
}

/// An [`UploadEvent`] tagged with the upload it belongs to, so events of a
/// cancelled upload can be told apart from the current one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadMessage {
    pub upload_id: u64,
    pub event: UploadEvent,
}

/// Looks at the file without reading it and applies the constraints.
pub fn inspect(path: &Path, constraints: &UploadConstraints) -> Result<FileInfo, UploadError> {
    let metadata = std::fs::metadata(path).map_err(|source| UploadError::Open {
        path: path.display().to_string(),
        source,
    })?;
    if !metadata.is_file() {
        return Err(UploadError::NotAFile(path.display().to_string()));
    }

    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    let mime = mime_guess::from_path(path)
        .first_or_octet_stream()
        .essence_str()
        .to_string();

    let info = FileInfo {
        name,
        mime,
        size: metadata.len(),
    };
    constraints
        .check(std::slice::from_ref(&info))
        .map_err(UploadError::Rejected)?;
    Ok(info)
}

/// Starts streaming an accepted file. Rejections are returned right away
/// and no event is sent for them.
pub fn start<E>(
    upload_id: u64,
    path: PathBuf,
    constraints: UploadConstraints,
    chunk_size: usize,
    tx: mpsc::Sender<E>,
) -> Result<JoinHandle<()>, UploadError>
where
    E: From<UploadMessage> + Send + 'static,
{
    let info = inspect(&path, &constraints)?;
    tracing::info!(upload_id, name = %info.name, mime = %info.mime, size = info.size, "Starting upload");
    let tag = move |event: UploadEvent| E::from(UploadMessage { upload_id, event });

    Ok(tokio::spawn(async move {
        let started = UploadEvent::Started {
            name: info.name,
            mime: info.mime,
        };
        if tx.send(tag(started)).await.is_err() {
            return;
        }

        let outcome = match stream_file(&path, constraints.max_file_size, chunk_size, &tx, &tag).await {
            Ok(()) => UploadEvent::Succeeded,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Upload failed");
                UploadEvent::Failed(e.to_string())
            }
        };
        let _ = tx.send(tag(outcome)).await;
    }))
}

async fn stream_file<E>(
    path: &Path,
    max_bytes: u64,
    chunk_size: usize,
    tx: &mpsc::Sender<E>,
    tag: impl Fn(UploadEvent) -> E,
) -> Result<(), UploadError> {
    let mut file = File::open(path).await?;
    let mut buf = vec![0u8; chunk_size.max(1)];
    let mut total: u64 = 0;

    loop {
        let n = file.read(&mut buf).await?;
        if n == 0 {
            return Ok(());
        }

        total += n as u64;
        if total > max_bytes {
            return Err(UploadError::TooBig);
        }

        tx.send(tag(UploadEvent::Chunk(buf[..n].to_vec())))
            .await
            .map_err(|_| UploadError::ReceiverClosed)?;
    }
}
