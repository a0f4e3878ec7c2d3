use crate::downloader::ArchiveDownloader;
use crate::error::FetchError;
use crate::metrics::ARCHIVE_SOURCES;
use crate::resource_manager::ResourceManager;

use bytes::Bytes;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Archive store.
///
/// Keeps a local copy of every downloaded archive so that a restarted process does not
/// download them again. The published archives are never revised, so a local copy is used as
/// is for as long as it exists.
pub struct ArchiveStore {
    /// Downloader for the remote source.
    downloader: Box<dyn ArchiveDownloader>,

    /// Directory holding the local copies.
    archive_dir: PathBuf,

    /// Retries of transient download failures.
    retries: u32,

    /// Delay before the first retry, doubled on each further retry.
    retry_delay: Duration,
}

impl ArchiveStore {
    /// Initialize the archive store.
    ///
    /// # Arguments
    ///
    /// * `downloader`: Downloader for the remote source
    /// * `archive_dir`: Directory holding the local copies
    /// * `retries`: Number of retries of transient download failures
    /// * `retry_delay`: Delay before the first retry
    pub fn new(
        downloader: Box<dyn ArchiveDownloader>,
        archive_dir: &Path,
        retries: u32,
        retry_delay: Duration,
    ) -> Self {
        Self {
            downloader,
            archive_dir: archive_dir.to_path_buf(),
            retries,
            retry_delay,
        }
    }

    /// Path of the local copy of an archive.
    pub fn path_for(&self, name: &str) -> PathBuf {
        self.archive_dir.join(name)
    }

    /// Get an archive, preferring the local copy.
    ///
    /// Returns bytes.
    ///
    /// # Arguments
    ///
    /// * `name`: File name of the archive
    /// * `resource_manager`: ResourceManager object
    #[tracing::instrument(level = "DEBUG", skip(self, resource_manager))]
    pub async fn get(
        &self,
        name: &str,
        resource_manager: &ResourceManager,
    ) -> Result<Bytes, FetchError> {
        let path = self.path_for(name);
        match tokio::fs::read(&path).await {
            Ok(data) => {
                ARCHIVE_SOURCES.with_label_values(&["local"]).inc();
                return Ok(data.into());
            }
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
            Err(err) => {
                return Err(FetchError::TransferError {
                    name: name.to_string(),
                    reason: format!("failed to read {}: {}", path.display(), err),
                })
            }
        }

        let data = self.download(name, resource_manager).await?;
        ARCHIVE_SOURCES.with_label_values(&["remote"]).inc();

        // Failing to keep a copy only costs a later download.
        if let Err(err) = self.persist(&path, &data).await {
            tracing::warn!(path = %path.display(), "failed to save archive: {}", err);
        }

        Ok(data)
    }

    /// Remove the local copy of an archive, e.g. because it could not be decoded.
    pub async fn discard(&self, name: &str) {
        let path = self.path_for(name);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => tracing::info!(path = %path.display(), "removed local archive"),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
            Err(err) => {
                tracing::warn!(path = %path.display(), "failed to remove local archive: {}", err)
            }
        }
    }

    /// Download an archive, retrying transient failures with exponential backoff.
    async fn download(
        &self,
        name: &str,
        resource_manager: &ResourceManager,
    ) -> Result<Bytes, FetchError> {
        let mut attempt = 0;
        let mut delay = self.retry_delay;
        loop {
            let result = {
                // Acquire download permit to be freed via drop at the end of the attempt
                let _download_permit =
                    resource_manager
                        .download()
                        .await
                        .map_err(|err| FetchError::TransferError {
                            name: name.to_string(),
                            reason: err.to_string(),
                        })?;
                self.downloader.download(name).await
            };
            match result {
                Err(err) if err.is_transient() && attempt < self.retries => {
                    attempt += 1;
                    tracing::warn!(
                        attempt,
                        retries = self.retries,
                        "{}, retrying in {:?}",
                        err,
                        delay
                    );
                    tokio::time::sleep(delay).await;
                    delay = delay.saturating_mul(2);
                }
                result => return result,
            }
        }
    }

    /// Write an archive to its local path.
    ///
    /// The data is written to a partial file first so that an interrupted write never leaves a
    /// truncated archive under the final name.
    async fn persist(&self, path: &Path, data: &Bytes) -> std::io::Result<()> {
        tokio::fs::create_dir_all(&self.archive_dir).await?;
        let mut partial = path.as_os_str().to_owned();
        partial.push(".partial");
        let partial = PathBuf::from(partial);
        tokio::fs::write(&partial, data).await?;
        tokio::fs::rename(&partial, path).await
    }
}
