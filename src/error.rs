//! Error handling.

use axum::{
    extract::rejection::QueryRejection,
    http::header,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use chrono::NaiveDate;
use ndarray::ShapeError;
use serde::{Deserialize, Serialize};
use std::error::Error;
use thiserror::Error;
use tokio::sync::AcquireError;
use tracing::{event, Level};

use crate::date_index::DATE_FORMAT;

/// ARC2 cache error type
///
/// This type encapsulates the errors that may abort a request.
/// Each variant may result in a different API error response.
/// Per-day archive failures are not part of this type, see [FetchError].
#[derive(Debug, Error)]
pub enum Arc2Error {
    /// No raster has been loaded yet, so coordinates cannot be mapped to pixels
    #[error("no raster has been loaded yet, coordinates cannot be mapped to pixels")]
    CoordinateUnavailable,

    /// Error building the HTTP client used for archive downloads
    #[error("failed to build HTTP client")]
    HttpClient(#[source] reqwest::Error),

    /// The configured cache window is unusable
    #[error("invalid cache window: {reason}")]
    InvalidWindow { reason: String },

    /// The location maps to a pixel outside the raster grid
    #[error("location ({latitude}, {longitude}) is outside the raster grid")]
    OutOfGrid { latitude: f64, longitude: f64 },

    /// Requested date outside the cache window
    #[error(
        "date {} not in cache window ({} .. {})",
        .date.format(DATE_FORMAT),
        .start.format(DATE_FORMAT),
        .end.format(DATE_FORMAT)
    )]
    OutOfWindow {
        date: NaiveDate,
        start: NaiveDate,
        end: NaiveDate,
    },

    /// Error deserialising query parameters
    #[error("request parameters are not valid")]
    RequestQueryRejection(#[from] QueryRejection),

    /// Error validating query parameters
    #[error("request parameters are not valid")]
    RequestValidation(#[from] validator::ValidationErrors),

    /// Error acquiring a semaphore
    #[error("error acquiring resources")]
    SemaphoreAcquireError(#[from] AcquireError),
}

/// Outcome of a failed attempt to fetch one day's raster.
///
/// These are recorded against the day in the cache and never abort a query.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum FetchError {
    /// The remote archive reports that the file does not exist
    #[error("archive {name} not found on remote source")]
    NotFound { name: String },

    /// Network or transport failure, including timeouts
    #[error("failed to transfer archive {name}: {reason}")]
    TransferError { name: String, reason: String },

    /// Archive present but corrupt or unreadable
    #[error("failed to decode archive {name}: {reason}")]
    DecodeError { name: String, reason: String },
}

impl FetchError {
    /// Whether a further attempt may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::TransferError { .. })
    }
}

/// Errors raised while extracting and decoding a raster archive.
#[derive(Debug, Error)]
pub enum RasterError {
    /// I/O error on the archive or scratch file
    #[error("I/O error")]
    Io(#[from] std::io::Error),

    /// Required GeoTIFF tag missing or malformed
    #[error("GeoTIFF tag {tag} is missing or malformed")]
    GeoTag { tag: &'static str },

    /// Raster dimensions disagree with the sample count
    #[error("failed to create array from shape")]
    Shape(#[from] ShapeError),

    /// Error decoding the TIFF image
    #[error("failed to decode TIFF image")]
    Tiff(#[from] tiff::TiffError),

    /// Sample type that cannot be represented as rainfall
    #[error("unsupported sample type {0}")]
    UnsupportedSampleType(&'static str),

    /// Error reading the zip archive
    #[error("failed to read zip archive")]
    Zip(#[from] zip::result::ZipError),
}

impl RasterError {
    /// Flatten the error and its causes into a single line.
    pub fn describe(&self) -> String {
        let mut message = self.to_string();
        let mut current = self.source();
        while let Some(source) = current {
            message.push_str(": ");
            message.push_str(&source.to_string());
            current = source.source();
        }
        message
    }
}

impl IntoResponse for Arc2Error {
    /// Convert from an `Arc2Error` into an [axum::response::Response].
    fn into_response(self) -> Response {
        ErrorResponse::from(self).into_response()
    }
}

/// Body of error response
///
/// Implements serde (de)serialise.
#[derive(Deserialize, Serialize)]
struct ErrorBody {
    /// Main error message
    message: String,

    /// Optional list of causes
    #[serde(skip_serializing_if = "Option::is_none")]
    caused_by: Option<Vec<String>>,
}

impl ErrorBody {
    /// Return a new ErrorBody
    ///
    /// # Arguments
    ///
    /// * `error`: The error that occurred
    fn new<E>(error: &E) -> Self
    where
        E: std::error::Error + Send + Sync,
    {
        let message = error.to_string();
        let mut causes = Vec::new();
        let mut current = error.source();
        while let Some(source) = current {
            causes.push(source.to_string());
            current = source.source();
        }
        // Remove duplicate entries.
        causes.dedup();
        let caused_by = if causes.is_empty() {
            None
        } else {
            Some(causes)
        };
        ErrorBody { message, caused_by }
    }
}

/// A response to send in error cases
///
/// Implements serde (de)serialise.
#[derive(Deserialize, Serialize)]
struct ErrorResponse {
    /// HTTP status of the response
    #[serde(skip)]
    status: StatusCode,

    /// Response body
    error: ErrorBody,
}

impl ErrorResponse {
    /// Return a new ErrorResponse
    ///
    /// # Arguments
    ///
    /// * `status`: HTTP status of the response
    /// * `error`: The error that occurred. This will be formatted into a suitable `ErrorBody`
    fn new<E>(status: StatusCode, error: &E) -> Self
    where
        E: std::error::Error + Send + Sync,
    {
        ErrorResponse {
            status,
            error: ErrorBody::new(error),
        }
    }

    /// Return a 400 bad request ErrorResponse
    fn bad_request<E>(error: &E) -> Self
    where
        E: std::error::Error + Send + Sync,
    {
        Self::new(StatusCode::BAD_REQUEST, error)
    }

    /// Return a 503 service unavailable ErrorResponse
    fn service_unavailable<E>(error: &E) -> Self
    where
        E: std::error::Error + Send + Sync,
    {
        Self::new(StatusCode::SERVICE_UNAVAILABLE, error)
    }

    /// Return a 500 internal server error ErrorResponse
    fn internal_server_error<E>(error: &E) -> Self
    where
        E: std::error::Error + Send + Sync,
    {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, error)
    }
}

impl From<Arc2Error> for ErrorResponse {
    /// Convert from an `Arc2Error` into an `ErrorResponse`.
    fn from(error: Arc2Error) -> Self {
        let response = match &error {
            // Bad request
            Arc2Error::OutOfGrid { .. }
            | Arc2Error::OutOfWindow { .. }
            | Arc2Error::RequestQueryRejection(_)
            | Arc2Error::RequestValidation(_) => Self::bad_request(&error),

            // Nothing loaded yet, the archive may be unreachable
            Arc2Error::CoordinateUnavailable => Self::service_unavailable(&error),

            // Internal server error
            Arc2Error::HttpClient(_)
            | Arc2Error::InvalidWindow { .. }
            | Arc2Error::SemaphoreAcquireError(_) => Self::internal_server_error(&error),
        };

        // Log server errors.
        if response.status.is_server_error() {
            event!(Level::ERROR, "{}", error.to_string());
            let mut current = error.source();
            while let Some(source) = current {
                event!(Level::ERROR, "Caused by: {}", source.to_string());
                current = source.source();
            }
        }

        response
    }
}

impl IntoResponse for ErrorResponse {
    /// Convert from an `ErrorResponse` into an `axum::response::Response`.
    ///
    /// Renders the response as JSON.
    fn into_response(self) -> Response {
        let json_body = serde_json::to_string_pretty(&self);
        match json_body {
            Err(err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Failed to serialise error response: {}", err),
            )
                .into_response(),
            Ok(json_body) => (
                self.status,
                [(&header::CONTENT_TYPE, mime::APPLICATION_JSON.to_string())],
                json_body,
            )
                .into_response(),
        }
    }
}
