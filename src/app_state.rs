use crate::cli::CommandLineArgs;
use crate::error::Arc2Error;
use crate::fetcher::{Arc2Fetcher, FetcherConfig};
use crate::grid_cache::{CacheWindow, GridCache};

use std::sync::Arc;

/// Shared application state passed to each request handler.
pub struct AppState {
    /// Rainfall grid cache.
    pub grid_cache: Arc<GridCache>,
}

impl AppState {
    /// Create and return an [AppState].
    ///
    /// Allocates the rainfall grid for the configured window.
    pub fn new(args: &CommandLineArgs) -> Result<Self, Arc2Error> {
        let fetcher = Arc2Fetcher::new(&FetcherConfig::from(args))?;
        let grid_cache = GridCache::new(CacheWindow::from(args), Arc::new(fetcher))?;
        Ok(Self::with_cache(Arc::new(grid_cache)))
    }

    /// Create an [AppState] around an existing cache.
    pub fn with_cache(grid_cache: Arc<GridCache>) -> Self {
        Self { grid_cache }
    }
}

/// AppState wrapped in an Atomic Reference Count (Arc) to allow multiple references.
pub type SharedAppState = Arc<AppState>;
