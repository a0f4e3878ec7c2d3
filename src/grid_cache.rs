//! Lazy spatiotemporal rainfall grid cache.
//!
//! The cache holds one dense `f32` array spanning every cell of the raster grid and every day
//! of a fixed date window. Days are fetched and decoded the first time a query touches them,
//! after which they stay resident for the life of the process. Each day records whether it was
//! ever attempted, and with what result, so that no day is fetched twice.

use crate::cli::CommandLineArgs;
use crate::coordinate::CoordinateMapper;
use crate::date_index::{format_date, DateIndex};
use crate::error::{Arc2Error, FetchError};
use crate::fetcher::ArchiveFetcher;
use crate::metrics::ARCHIVE_FETCHES;
use crate::raster::DecodedGrid;
use crate::series::RainfallSeries;

use chrono::NaiveDate;
use ndarray::{s, Array2, Array3};
use std::fmt;
use std::sync::{Arc, OnceLock, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use strum_macros::Display;
use tracing::Instrument;

/// Value of every cell of a day that has not been loaded.
pub const NO_DATA: f32 = 999.0;

/// Extent of the cache, fixed for its lifetime.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CacheWindow {
    /// First day held by the cache
    pub start: NaiveDate,
    /// Last day held by the cache
    pub end: NaiveDate,
    /// Rows of each daily raster
    pub grid_height: usize,
    /// Columns of each daily raster
    pub grid_width: usize,
}

impl From<&CommandLineArgs> for CacheWindow {
    fn from(args: &CommandLineArgs) -> Self {
        Self {
            start: args.window_start,
            end: args.window_end,
            grid_height: args.grid_height,
            grid_width: args.grid_width,
        }
    }
}

/// Load state of one day.
#[derive(Clone, Debug, PartialEq)]
pub enum DaySlot {
    /// Never attempted
    Unloaded,
    /// Raster resident in the grid
    Loaded { source: String },
    /// Attempted and failed; the day holds [NO_DATA]
    Failed(FetchError),
}

impl fmt::Display for DaySlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unloaded => write!(f, "unloaded"),
            Self::Loaded { source } => write!(f, "loaded {}", source),
            Self::Failed(err) => write!(f, "failed {}", err),
        }
    }
}

/// Label of the `archive_fetches` metric.
#[derive(Clone, Copy, Debug, Display)]
#[strum(serialize_all = "snake_case")]
enum FetchOutcome {
    Loaded,
    NotFound,
    TransferError,
    DecodeError,
}

impl From<&FetchError> for FetchOutcome {
    fn from(err: &FetchError) -> Self {
        match err {
            FetchError::NotFound { .. } => Self::NotFound,
            FetchError::TransferError { .. } => Self::TransferError,
            FetchError::DecodeError { .. } => Self::DecodeError,
        }
    }
}

/// The rainfall grid cache.
pub struct GridCache {
    /// Calendar of the day axis
    index: DateIndex,
    window: CacheWindow,
    fetcher: Arc<dyn ArchiveFetcher>,
    /// Rainfall indexed by (row, column, day offset)
    grid: RwLock<Array3<f32>>,
    slots: RwLock<Vec<DaySlot>>,
    /// Held while a day is being fetched
    in_flight: Vec<tokio::sync::Mutex<()>>,
    /// Seeded by the first loaded raster
    mapper: OnceLock<CoordinateMapper>,
}

impl GridCache {
    /// Create an empty cache.
    ///
    /// Allocates the full grid up front, filled with [NO_DATA].
    ///
    /// # Arguments
    ///
    /// * `window`: Dates and grid shape held by the cache
    /// * `fetcher`: Source of daily rasters
    pub fn new(window: CacheWindow, fetcher: Arc<dyn ArchiveFetcher>) -> Result<Self, Arc2Error> {
        if window.grid_height == 0 || window.grid_width == 0 {
            return Err(Arc2Error::InvalidWindow {
                reason: format!(
                    "grid shape {}x{} is empty",
                    window.grid_height, window.grid_width
                ),
            });
        }
        let index = DateIndex::new(window.start, window.end)?;
        let days = index.len();
        tracing::info!(
            start = %format_date(window.start),
            end = %format_date(window.end),
            days,
            "allocating {}x{} rainfall grid",
            window.grid_height,
            window.grid_width
        );
        let grid = Array3::from_elem((window.grid_height, window.grid_width, days), NO_DATA);
        Ok(Self {
            index,
            window,
            fetcher,
            grid: RwLock::new(grid),
            slots: RwLock::new(vec![DaySlot::Unloaded; days]),
            in_flight: (0..days).map(|_| tokio::sync::Mutex::new(())).collect(),
            mapper: OnceLock::new(),
        })
    }

    pub fn window(&self) -> &CacheWindow {
        &self.window
    }

    /// The coordinate mapper, once a raster has been loaded.
    pub fn mapper(&self) -> Option<&CoordinateMapper> {
        self.mapper.get()
    }

    /// Returns the rainfall at a location for `days` days from `start`.
    ///
    /// Days from today onwards are not yet published and are left out of the series.
    pub async fn rainfall(
        self: &Arc<Self>,
        latitude: f64,
        longitude: f64,
        start: NaiveDate,
        days: u32,
    ) -> Result<RainfallSeries, Arc2Error> {
        let today = chrono::Local::now().date_naive();
        self.rainfall_as_of(latitude, longitude, start, days, today)
            .await
    }

    /// As [GridCache::rainfall], with an explicit current date.
    #[tracing::instrument(level = "DEBUG", skip(self))]
    pub async fn rainfall_as_of(
        self: &Arc<Self>,
        latitude: f64,
        longitude: f64,
        start: NaiveDate,
        days: u32,
        today: NaiveDate,
    ) -> Result<RainfallSeries, Arc2Error> {
        let span = self.index.span(start, days, Some(today))?;
        self.ensure_loaded_as_of(start, days, today).await?;
        if span.is_empty() {
            return Ok(RainfallSeries::default());
        }

        let mapper = self.mapper.get().ok_or(Arc2Error::CoordinateUnavailable)?;
        let (row, col) = mapper.pixel_of(latitude, longitude)?;
        let grid = self.read_grid();
        let values = grid.slice(s![row, col, span.clone()]);
        let samples = span
            .zip(values.iter())
            .map(|(offset, value)| (self.index.date_at(offset), *value))
            .collect();
        Ok(RainfallSeries::new(samples))
    }

    /// Load every unattempted day of `days` days from `start`, up to but excluding today.
    pub async fn ensure_loaded(
        self: &Arc<Self>,
        start: NaiveDate,
        days: u32,
    ) -> Result<(), Arc2Error> {
        let today = chrono::Local::now().date_naive();
        self.ensure_loaded_as_of(start, days, today).await
    }

    /// As [GridCache::ensure_loaded], with an explicit current date.
    ///
    /// Missing days are fetched concurrently on spawned tasks, which run to completion even if
    /// the caller goes away. Failures are recorded against their day and do not fail the call.
    pub async fn ensure_loaded_as_of(
        self: &Arc<Self>,
        start: NaiveDate,
        days: u32,
        today: NaiveDate,
    ) -> Result<(), Arc2Error> {
        let span = self.index.span(start, days, Some(today))?;
        let pending: Vec<usize> = {
            let slots = self.read_slots();
            span.filter(|offset| slots[*offset] == DaySlot::Unloaded)
                .collect()
        };
        if pending.is_empty() {
            return Ok(());
        }
        tracing::debug!("loading {} days", pending.len());

        let tasks: Vec<_> = pending
            .into_iter()
            .map(|offset| {
                let cache = Arc::clone(self);
                tokio::spawn(async move { cache.load_day(offset).await }.in_current_span())
            })
            .collect();
        for task in tasks {
            if let Err(err) = task.await {
                tracing::error!("day load task failed: {}", err);
            }
        }
        Ok(())
    }

    /// Returns the load state of `days` days from `start`.
    ///
    /// Without a start the listing begins at the first day of the window, and without a day count
    /// it runs to the end of the window. Nothing is fetched.
    pub fn cache_status(
        &self,
        start: Option<NaiveDate>,
        days: Option<u32>,
    ) -> Result<Vec<(NaiveDate, DaySlot)>, Arc2Error> {
        let start = start.unwrap_or_else(|| self.index.start());
        let days = days.unwrap_or(u32::MAX);
        let span = self.index.span(start, days, None)?;
        let slots = self.read_slots();
        Ok(span
            .map(|offset| (self.index.date_at(offset), slots[offset].clone()))
            .collect())
    }

    /// Fetch one day unless it has already been attempted.
    async fn load_day(&self, offset: usize) {
        let _in_flight = self.in_flight[offset].lock().await;
        // Another task may have loaded the day while we waited.
        if self.read_slots()[offset] != DaySlot::Unloaded {
            return;
        }

        let date = self.index.date_at(offset);
        let result = self
            .fetcher
            .fetch(date)
            .await
            .and_then(|grid| self.check_shape(grid));
        let slot = match result {
            Ok(grid) => {
                self.seed_mapper(&grid);
                self.write_day(offset, &grid.data);
                ARCHIVE_FETCHES
                    .with_label_values(&[&FetchOutcome::Loaded.to_string()])
                    .inc();
                tracing::info!(date = %format_date(date), source = %grid.source, "loaded raster");
                DaySlot::Loaded {
                    source: grid.source,
                }
            }
            Err(err) => {
                ARCHIVE_FETCHES
                    .with_label_values(&[&FetchOutcome::from(&err).to_string()])
                    .inc();
                tracing::warn!(date = %format_date(date), "{}", err);
                DaySlot::Failed(err)
            }
        };
        self.write_slots()[offset] = slot;
    }

    fn check_shape(&self, grid: DecodedGrid) -> Result<DecodedGrid, FetchError> {
        let expected = (self.window.grid_height, self.window.grid_width);
        if grid.data.dim() == expected {
            Ok(grid)
        } else {
            Err(FetchError::DecodeError {
                name: grid.source,
                reason: format!(
                    "raster shape {:?} does not match grid shape {:?}",
                    grid.data.dim(),
                    expected
                ),
            })
        }
    }

    fn seed_mapper(&self, grid: &DecodedGrid) {
        let mapper = self.mapper.get_or_init(|| {
            tracing::info!(source = %grid.source, "coordinate mapping established");
            CoordinateMapper::new(grid.transform, self.window.grid_height, self.window.grid_width)
        });
        if *mapper.transform() != grid.transform {
            tracing::warn!(
                source = %grid.source,
                "georeferencing {:?} differs from {:?}, keeping the latter",
                grid.transform,
                mapper.transform()
            );
        }
    }

    fn write_day(&self, offset: usize, data: &Array2<f32>) {
        let mut grid = self.grid.write().unwrap_or_else(PoisonError::into_inner);
        grid.slice_mut(s![.., .., offset]).assign(data);
    }

    fn read_grid(&self) -> RwLockReadGuard<'_, Array3<f32>> {
        self.grid.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn read_slots(&self) -> RwLockReadGuard<'_, Vec<DaySlot>> {
        self.slots.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_slots(&self) -> RwLockWriteGuard<'_, Vec<DaySlot>> {
        self.slots.write().unwrap_or_else(PoisonError::into_inner)
    }
}
