//! Mapping of geographic coordinates to grid cells.

use crate::error::Arc2Error;
use crate::raster::GeoTransform;

/// Translates (latitude, longitude) into (row, column) of the cached grid.
///
/// All daily rasters share one grid, so the georeferencing of the first decoded raster is used
/// for every day.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CoordinateMapper {
    transform: GeoTransform,
    height: usize,
    width: usize,
}

impl CoordinateMapper {
    /// Returns a mapper for a grid of `height` rows and `width` columns.
    pub fn new(transform: GeoTransform, height: usize, width: usize) -> Self {
        Self {
            transform,
            height,
            width,
        }
    }

    /// Georeferencing the mapper was built from.
    pub fn transform(&self) -> &GeoTransform {
        &self.transform
    }

    /// Returns the (row, column) of the cell containing the location.
    ///
    /// # Arguments
    ///
    /// * `latitude`: Latitude in degrees north
    /// * `longitude`: Longitude in degrees east
    pub fn pixel_of(&self, latitude: f64, longitude: f64) -> Result<(usize, usize), Arc2Error> {
        let (row, col) = self.transform.pixel_of(latitude, longitude);
        let in_grid = |index: i64, size: usize| index >= 0 && (index as u64) < size as u64;
        if in_grid(row, self.height) && in_grid(col, self.width) {
            Ok((row as usize, col as usize))
        } else {
            Err(Arc2Error::OutOfGrid {
                latitude,
                longitude,
            })
        }
    }
}
