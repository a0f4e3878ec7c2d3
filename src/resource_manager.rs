//! Resource management

use crate::error::Arc2Error;

use tokio::sync::{Semaphore, SemaphorePermit};

/// [crate::resource_manager::ResourceManager] bounds the work spent on filling the cache.
/// Resource management is performed using a Tokio Semaphore for each type of resource.
#[derive(Debug)]
pub struct ResourceManager {
    /// Optional semaphore for archive downloads.
    downloads: Option<Semaphore>,

    /// Optional semaphore for raster decoding tasks.
    decodes: Option<Semaphore>,
}

impl ResourceManager {
    /// Returns a new ResourceManager object.
    pub fn new(download_limit: Option<usize>, decode_limit: Option<usize>) -> Self {
        Self {
            downloads: download_limit.map(Semaphore::new),
            decodes: decode_limit.map(Semaphore::new),
        }
    }

    /// Acquire a download slot.
    pub async fn download(&self) -> Result<Option<SemaphorePermit>, Arc2Error> {
        optional_acquire(&self.downloads).await
    }

    /// Acquire a decode slot.
    pub async fn decode(&self) -> Result<Option<SemaphorePermit>, Arc2Error> {
        optional_acquire(&self.decodes).await
    }
}

/// Acquire a permit on an optional Semaphore, if present.
async fn optional_acquire(sem: &Option<Semaphore>) -> Result<Option<SemaphorePermit>, Arc2Error> {
    if let Some(sem) = sem {
        sem.acquire().await.map(Some).map_err(|err| err.into())
    } else {
        Ok(None)
    }
}
