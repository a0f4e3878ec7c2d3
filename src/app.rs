//! HTTP API

use crate::app_state::SharedAppState;
use crate::error::Arc2Error;
use crate::metrics;
use crate::models;
use crate::series;
use crate::validated_query::ValidatedQuery;

use axum::{extract::State, routing::get, Router};
use tower::Layer;
use tower::ServiceBuilder;
use tower_http::normalize_path::{NormalizePath, NormalizePathLayer};
use tower_http::trace::TraceLayer;

/// `axum` service type, with trailing slashes removed from request paths.
pub type Service = NormalizePath<Router>;

/// Returns a [axum::Router] for the ARC2 API
///
/// # Arguments
///
/// * `state`: Shared application state
pub fn router(state: SharedAppState) -> Router {
    Router::new()
        .route("/arc2", get(rainfall))
        .route("/arc2/status", get(status))
        .route("/metrics", get(metrics::metrics_handler))
        .layer(
            ServiceBuilder::new().layer(
                TraceLayer::new_for_http()
                    .on_request(metrics::request_counter)
                    .on_response(metrics::record_response_metrics),
            ),
        )
        .with_state(state)
}

/// Returns an [axum::Router] wrapped in a [NormalizePath] service.
pub fn service(state: SharedAppState) -> Service {
    NormalizePathLayer::trim_trailing_slash().layer(router(state))
}

/// Rainfall series at a location, one `YYYYMMDD value` line per day.
async fn rainfall(
    State(state): State<SharedAppState>,
    ValidatedQuery(query): ValidatedQuery<models::RainfallQuery>,
) -> Result<String, Arc2Error> {
    let series = state
        .grid_cache
        .rainfall(query.lat, query.long, query.date, query.days)
        .await?;
    Ok(series.render())
}

/// Load state of each day, one `YYYYMMDD status` line per day.
async fn status(
    State(state): State<SharedAppState>,
    ValidatedQuery(query): ValidatedQuery<models::StatusQuery>,
) -> Result<String, Arc2Error> {
    let status = state.grid_cache.cache_status(query.date, query.days)?;
    Ok(series::render_lines(status))
}
