use crate::error::{Arc2Error, FetchError};

use async_trait::async_trait;
use bytes::Bytes;
use std::error::Error;
use std::time::Duration;
use url::Url;

/// Archive downloader trait.
///
/// Defines the interface for obtaining archive files from the remote source.
#[async_trait]
pub trait ArchiveDownloader: Send + Sync {
    /// Download an archive.
    ///
    /// Returns the archive content.
    ///
    /// # Arguments
    ///
    /// * `name`: File name of the archive on the remote source
    async fn download(&self, name: &str) -> Result<Bytes, FetchError>;
}

/// HTTP archive downloader.
///
/// Implements [ArchiveDownloader] for archives published under a common base URL.
#[derive(Debug)]
pub struct HttpArchiveDownloader {
    reqwest_client: reqwest::Client,
    base_url: Url,
}

impl HttpArchiveDownloader {
    /// Create a new HTTP archive downloader.
    ///
    /// # Arguments
    ///
    /// * `base_url`: URL of the directory holding the archives
    /// * `timeout`: Upper bound for each request, including reading the body
    pub fn new(base_url: Url, timeout: Duration) -> Result<Self, Arc2Error> {
        let reqwest_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(Arc2Error::HttpClient)?;
        Ok(Self {
            reqwest_client,
            base_url,
        })
    }

    /// Returns the URL of an archive.
    pub fn url_for(&self, name: &str) -> String {
        format!("{}/{}", self.base_url.as_str().trim_end_matches('/'), name)
    }
}

/// Map an HTTP response status to a fetch outcome.
pub fn check_status(name: &str, status: reqwest::StatusCode) -> Result<(), FetchError> {
    match status {
        reqwest::StatusCode::OK => Ok(()),
        // Not published yet, or predates the dataset.
        reqwest::StatusCode::NOT_FOUND | reqwest::StatusCode::GONE => Err(FetchError::NotFound {
            name: name.to_string(),
        }),
        _ => Err(FetchError::TransferError {
            name: name.to_string(),
            reason: format!("HTTP request failed with status: {}", status),
        }),
    }
}

fn transfer_error(name: &str, err: reqwest::Error) -> FetchError {
    let reason = if err.is_timeout() {
        "request timed out".to_string()
    } else {
        let mut reason = err.to_string();
        let mut current = err.source();
        while let Some(source) = current {
            reason.push_str(": ");
            reason.push_str(&source.to_string());
            current = source.source();
        }
        reason
    };
    FetchError::TransferError {
        name: name.to_string(),
        reason,
    }
}

#[async_trait]
impl ArchiveDownloader for HttpArchiveDownloader {
    /// Download an archive with a single GET request.
    #[tracing::instrument(level = "DEBUG", skip(self))]
    async fn download(&self, name: &str) -> Result<Bytes, FetchError> {
        let url = self.url_for(name);
        tracing::info!(url = %url, "fetching archive");
        let response = self
            .reqwest_client
            .get(&url)
            .send()
            .await
            .map_err(|err| transfer_error(name, err))?;
        check_status(name, response.status())?;
        response
            .bytes()
            .await
            .map_err(|err| transfer_error(name, err))
    }
}
