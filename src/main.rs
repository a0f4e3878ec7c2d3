//! This file defines the arc2-cache binary entry point.

use arc2_cache::app;
use arc2_cache::app_state::AppState;
use arc2_cache::cli;
use arc2_cache::metrics;
use arc2_cache::server;
use arc2_cache::tracing;

use std::process::exit;
use std::sync::Arc;

/// Application entry point
#[tokio::main]
async fn main() {
    let args = cli::parse();
    tracing::init_tracing();
    ::tracing::debug!("{:?}", args);
    metrics::register_metrics();
    let state = match AppState::new(&args) {
        Ok(state) => state,
        Err(err) => {
            eprintln!("failed to initialise: {}", err);
            exit(1)
        }
    };
    let service = app::service(Arc::new(state));
    if let Err(err) = server::serve(&args, service).await {
        ::tracing::error!("{}", err);
        exit(1)
    }
}
