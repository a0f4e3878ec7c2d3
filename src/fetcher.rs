//! Daily raster fetching.
//!
//! Ties together the archive store, archive extraction and GeoTIFF decoding behind the
//! [ArchiveFetcher] interface used by the grid cache.

use crate::archive_store::ArchiveStore;
use crate::cli::CommandLineArgs;
use crate::compression;
use crate::date_index::format_date;
use crate::downloader::{ArchiveDownloader, HttpArchiveDownloader};
use crate::error::{Arc2Error, FetchError, RasterError};
use crate::raster::{self, DecodedGrid};
use crate::resource_manager::ResourceManager;

use async_trait::async_trait;
use chrono::NaiveDate;
use std::path::PathBuf;
use std::time::Duration;
use url::Url;

/// Source of decoded daily rasters.
#[async_trait]
pub trait ArchiveFetcher: Send + Sync {
    /// Fetch and decode the raster for one day.
    ///
    /// A single call either returns the raster or the reason it is unavailable; the caller
    /// decides whether to ever ask again.
    async fn fetch(&self, date: NaiveDate) -> Result<DecodedGrid, FetchError>;
}

/// File name of the archive for a day.
pub fn archive_name(date: NaiveDate) -> String {
    format!("africa_arc.{}.tif.zip", format_date(date))
}

/// File name of the GeoTIFF inside the archive for a day.
pub fn raster_name(date: NaiveDate) -> String {
    format!("africa_arc.{}.tif", format_date(date))
}

/// Configuration of an [Arc2Fetcher].
#[derive(Clone, Debug)]
pub struct FetcherConfig {
    /// URL of the directory holding the published archives
    pub archive_url: Url,
    /// Directory for local copies of downloaded archives
    pub archive_dir: PathBuf,
    /// Directory for rasters extracted while decoding
    pub scratch_dir: PathBuf,
    /// Upper bound of each download attempt
    pub fetch_timeout: Duration,
    /// Retries of transient download failures
    pub fetch_retries: u32,
    /// Delay before the first retry
    pub fetch_retry_delay: Duration,
    /// Maximum number of concurrent downloads
    pub download_limit: Option<usize>,
    /// Maximum number of concurrent decodes
    pub decode_limit: Option<usize>,
}

impl From<&CommandLineArgs> for FetcherConfig {
    fn from(args: &CommandLineArgs) -> Self {
        let decode_limit = args
            .decode_limit
            .or_else(|| Some(std::cmp::max(num_cpus::get() - 1, 1)));
        Self {
            archive_url: args.archive_url.clone(),
            archive_dir: args.archive_dir.clone(),
            scratch_dir: args.scratch_dir.clone(),
            fetch_timeout: Duration::from_secs(args.fetch_timeout),
            fetch_retries: args.fetch_retries,
            fetch_retry_delay: Duration::from_millis(args.fetch_retry_delay),
            download_limit: Some(args.download_limit as usize),
            decode_limit,
        }
    }
}

/// Fetches ARC2 rasters from local copies or the remote archive.
pub struct Arc2Fetcher {
    store: ArchiveStore,
    scratch_dir: PathBuf,
    resource_manager: ResourceManager,
}

impl Arc2Fetcher {
    /// Create a fetcher downloading over HTTP(S).
    pub fn new(config: &FetcherConfig) -> Result<Self, Arc2Error> {
        let downloader =
            HttpArchiveDownloader::new(config.archive_url.clone(), config.fetch_timeout)?;
        Ok(Self::with_downloader(config, Box::new(downloader)))
    }

    /// Create a fetcher using the given downloader.
    pub fn with_downloader(config: &FetcherConfig, downloader: Box<dyn ArchiveDownloader>) -> Self {
        Self {
            store: ArchiveStore::new(
                downloader,
                &config.archive_dir,
                config.fetch_retries,
                config.fetch_retry_delay,
            ),
            scratch_dir: config.scratch_dir.clone(),
            resource_manager: ResourceManager::new(config.download_limit, config.decode_limit),
        }
    }

    /// Extract and decode an archive on the blocking thread pool.
    async fn decode(
        &self,
        archive: bytes::Bytes,
        date: NaiveDate,
        source: String,
    ) -> Result<DecodedGrid, RasterError> {
        let member = raster_name(date);
        let scratch_dir = self.scratch_dir.clone();
        let task = tokio::task::spawn_blocking(move || {
            let scratch = compression::extract_member(&archive, &member, &scratch_dir)?;
            raster::open_raster(scratch.path(), &source)
        });
        match task.await {
            Ok(result) => result,
            Err(err) => Err(RasterError::Io(std::io::Error::new(
                std::io::ErrorKind::Other,
                err,
            ))),
        }
    }
}

#[async_trait]
impl ArchiveFetcher for Arc2Fetcher {
    #[tracing::instrument(level = "DEBUG", skip(self))]
    async fn fetch(&self, date: NaiveDate) -> Result<DecodedGrid, FetchError> {
        let name = archive_name(date);
        let archive = self.store.get(&name, &self.resource_manager).await?;

        let _decode_permit =
            self.resource_manager
                .decode()
                .await
                .map_err(|err| FetchError::DecodeError {
                    name: name.clone(),
                    reason: err.to_string(),
                })?;
        let source = self.store.path_for(&name).display().to_string();
        match self.decode(archive, date, source).await {
            Ok(grid) => Ok(grid),
            Err(err) => {
                // A corrupt local copy would otherwise fail again on every restart.
                self.store.discard(&name).await;
                Err(FetchError::DecodeError {
                    name,
                    reason: err.describe(),
                })
            }
        }
    }
}
