//! Request-scoped temp files for uploads and generated results
//!
//! Layout under the work directory:
//! - `uploads/` holds staged uploads, removed when their request finishes
//! - `results/` holds generated images until they are downloaded or expire,
//!   and results claimed by an in-flight download

mod error;
mod sweeper;

use std::io::{self, Write as _};
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use std::time::Duration;

use axum::body::Bytes;
use futures::{future, stream, Stream, StreamExt};
use regex::Regex;
use tempfile::NamedTempFile;
use tokio::io::AsyncWriteExt;
use tokio_util::io::ReaderStream;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::image::{GeneratedImage, ImageFormat};

pub use error::{StorageError, StorageResult};
pub use sweeper::run_sweeper;

const UPLOAD_PREFIX: &str = "upload-";
const RESULT_PREFIX: &str = "hd-result-";
const CLAIM_PREFIX: &str = "claimed-";

/// Names handed out by [`TempStorage::store_result`]; nothing else is ever served.
static RESULT_NAME_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^hd-result-[0-9a-f]{32}\.(png|jpg|webp|gif|avif|heic|heif)$")
        .expect("Invalid regex")
});

/// Temp file storage rooted at a single work directory
#[derive(Debug)]
pub struct TempStorage {
    uploads_dir: PathBuf,
    results_dir: PathBuf,
}

impl TempStorage {
    /// Creates the storage, making sure both subdirectories exist
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Io` if a directory cannot be created
    pub fn new(work_dir: impl AsRef<Path>) -> StorageResult<Self> {
        let uploads_dir = work_dir.as_ref().join("uploads");
        let results_dir = work_dir.as_ref().join("results");

        std::fs::create_dir_all(&uploads_dir)?;
        std::fs::create_dir_all(&results_dir)?;

        Ok(Self {
            uploads_dir,
            results_dir,
        })
    }

    /// Directory holding staged uploads
    #[must_use]
    pub fn uploads_dir(&self) -> &Path {
        &self.uploads_dir
    }

    /// Directory holding generated results
    #[must_use]
    pub fn results_dir(&self) -> &Path {
        &self.results_dir
    }

    /// Writes uploaded bytes to a fresh, uniquely named file
    ///
    /// The returned guard deletes the file when discarded or dropped.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Io` if the file cannot be created or written
    pub async fn stage_upload(&self, data: Vec<u8>) -> StorageResult<StagedUpload> {
        let dir = self.uploads_dir.clone();

        let file = tokio::task::spawn_blocking(move || -> io::Result<NamedTempFile> {
            let mut file = tempfile::Builder::new()
                .prefix(UPLOAD_PREFIX)
                .tempfile_in(dir)?;
            file.write_all(&data)?;
            file.flush()?;
            Ok(file)
        })
        .await
        .map_err(io::Error::other)??;

        debug!(path = %file.path().display(), "Staged upload");

        Ok(StagedUpload { file })
    }

    /// Persists a generated image and returns its download name
    ///
    /// # Errors
    ///
    /// Returns `StorageError::UnsupportedFormat` if the image's MIME type has no
    /// stored format, `StorageError::Io` if the file cannot be written
    pub async fn store_result(&self, image: &GeneratedImage) -> StorageResult<String> {
        let format = image
            .format()
            .ok_or_else(|| StorageError::UnsupportedFormat(image.mime_type.clone()))?;
        let name = format!(
            "{RESULT_PREFIX}{}.{}",
            Uuid::new_v4().simple(),
            format.extension()
        );
        let path = self.results_dir.join(&name);

        let mut file = tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await?;

        if let Err(e) = write_all_and_flush(&mut file, &image.data).await {
            drop(file);
            remove_quietly(&path).await;
            return Err(e.into());
        }

        debug!(%name, size = image.data.len(), "Stored generated result");

        Ok(name)
    }

    /// Maps a download name to its path inside the results directory
    ///
    /// # Errors
    ///
    /// Returns `StorageError::InvalidName` for any name not produced by `store_result`
    pub fn resolve_result(&self, name: &str) -> StorageResult<PathBuf> {
        if !RESULT_NAME_REGEX.is_match(name) {
            return Err(StorageError::InvalidName(name.to_string()));
        }

        Ok(self.results_dir.join(name))
    }

    /// Claims a stored result for a one-shot download
    ///
    /// The result is renamed out of its download name first, so a concurrent
    /// request for the same name sees `NotFound`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::InvalidName` for names outside the allow-list,
    /// `StorageError::NotFound` if the result is gone or already claimed,
    /// `StorageError::Io` otherwise
    pub async fn open_result(&self, name: &str) -> StorageResult<ResultDownload> {
        let stored = self.resolve_result(name)?;
        let path = self
            .results_dir
            .join(format!("{CLAIM_PREFIX}{}-{name}", Uuid::new_v4().simple()));

        match tokio::fs::rename(&stored, &path).await {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(StorageError::NotFound(name.to_string()));
            }
            Err(e) => return Err(e.into()),
        }

        let file = match tokio::fs::File::open(&path).await {
            Ok(file) => file,
            Err(e) => {
                remove_quietly(&path).await;
                return Err(e.into());
            }
        };

        let format = stored
            .extension()
            .and_then(|ext| ext.to_str())
            .and_then(ImageFormat::from_extension)
            .unwrap_or(ImageFormat::Png);

        Ok(ResultDownload {
            name: name.to_string(),
            format,
            path,
            file,
        })
    }

    /// Removes results and leftover uploads older than `ttl`
    ///
    /// Returns the number of files removed. Entries that cannot be inspected
    /// or removed are logged and skipped.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Io` if a directory cannot be listed
    pub async fn sweep_expired(&self, ttl: Duration) -> StorageResult<usize> {
        let results = sweep_dir(&self.results_dir, ttl, |name| {
            RESULT_NAME_REGEX.is_match(name) || name.starts_with(CLAIM_PREFIX)
        })
        .await?;
        let uploads = sweep_dir(&self.uploads_dir, ttl, |name| {
            name.starts_with(UPLOAD_PREFIX)
        })
        .await?;

        Ok(results + uploads)
    }
}

/// A staged upload; the file is removed when this guard goes away
#[derive(Debug)]
pub struct StagedUpload {
    file: NamedTempFile,
}

impl StagedUpload {
    /// Location of the staged file
    #[must_use]
    pub fn path(&self) -> &Path {
        self.file.path()
    }

    /// Reads the staged file back into memory
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Io` if the file cannot be read
    pub async fn read(&self) -> StorageResult<Vec<u8>> {
        Ok(tokio::fs::read(self.file.path()).await?)
    }

    /// Deletes the staged file now; failures are logged and ignored
    pub fn discard(self) {
        let path = self.file.path().to_path_buf();
        if let Err(e) = self.file.close() {
            debug!("Failed to remove staged upload {}: {e}", path.display());
        }
    }
}

/// An opened result, ready to be streamed once
#[derive(Debug)]
pub struct ResultDownload {
    name: String,
    format: ImageFormat,
    path: PathBuf,
    file: tokio::fs::File,
}

impl ResultDownload {
    /// Download name of the result
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Image format derived from the file extension
    #[must_use]
    pub const fn format(&self) -> ImageFormat {
        self.format
    }

    /// Streams the file contents, deleting the file once the last chunk was read
    ///
    /// A download that is abandoned midway leaves the claimed file for the sweeper.
    pub fn into_stream(self) -> impl Stream<Item = io::Result<Bytes>> + Send + 'static {
        let Self { path, file, .. } = self;

        let cleanup = stream::once(async move {
            match tokio::fs::remove_file(&path).await {
                Ok(()) => debug!(path = %path.display(), "Removed downloaded result"),
                Err(e) => debug!("Failed to remove downloaded result {}: {e}", path.display()),
            }
        })
        .filter_map(|()| future::ready(None::<io::Result<Bytes>>));

        ReaderStream::new(file).chain(cleanup)
    }
}

async fn write_all_and_flush(file: &mut tokio::fs::File, data: &[u8]) -> io::Result<()> {
    file.write_all(data).await?;
    file.flush().await
}

async fn remove_quietly(path: &Path) {
    if let Err(e) = tokio::fs::remove_file(path).await {
        debug!("Failed to remove {}: {e}", path.display());
    }
}

async fn sweep_dir(
    dir: &Path,
    ttl: Duration,
    is_ours: impl Fn(&str) -> bool,
) -> StorageResult<usize> {
    let mut removed = 0;
    let mut entries = tokio::fs::read_dir(dir).await?;

    while let Some(entry) = entries.next_entry().await? {
        let file_name = entry.file_name();
        let Some(name) = file_name.to_str() else {
            continue;
        };
        if !is_ours(name) {
            continue;
        }

        let expired = match entry.metadata().await.and_then(|m| m.modified()) {
            Ok(modified) => modified.elapsed().is_ok_and(|age| age >= ttl),
            Err(e) => {
                warn!("Failed to inspect {name}: {e}");
                continue;
            }
        };

        if expired {
            match tokio::fs::remove_file(entry.path()).await {
                Ok(()) => removed += 1,
                Err(e) => warn!("Failed to remove expired file {name}: {e}"),
            }
        }
    }

    Ok(removed)
}
