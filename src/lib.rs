//! This crate provides a query service for the ARC2 daily rainfall estimates over Africa.
//!
//! ARC2 is published by the NOAA Climate Prediction Center as one zipped GeoTIFF per day. Rather
//! than downloading a raster for every query, the service keeps a dense in-memory grid covering
//! a fixed date window and fills it lazily: the first query touching a day fetches and decodes
//! that day, and every later query reads it from memory. Time series at a point are then a
//! slice along the day axis of the grid.
//!
//! The service is built on top of a number of open source components.
//!
//! * [Tokio](tokio), the most popular asynchronous Rust runtime.
//! * [Axum](axum) web framework, built by the Tokio team, on top of the [hyper] HTTP library.
//! * [reqwest] downloads the daily archives, which are unpacked with [zip] and decoded with
//!   [tiff].
//! * [ndarray] holds the rainfall grid.
//! * [chrono] provides the calendar arithmetic.

pub mod app;
pub mod app_state;
pub mod archive_store;
pub mod cli;
pub mod compression;
pub mod coordinate;
pub mod date_index;
pub mod downloader;
pub mod error;
pub mod fetcher;
pub mod grid_cache;
pub mod metrics;
pub mod models;
pub mod raster;
pub mod resource_manager;
pub mod series;
pub mod server;
#[cfg(test)]
pub mod test_utils;
pub mod tracing;
pub mod validated_query;
