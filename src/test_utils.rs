use crate::error::FetchError;
use crate::fetcher::{archive_name, raster_name, ArchiveFetcher};
use crate::raster::{DecodedGrid, GeoTransform};

use async_trait::async_trait;
use chrono::{Datelike, NaiveDate};
use ndarray::Array2;
use std::collections::HashMap;
use std::io::{Cursor, Write};
use std::sync::Mutex;
use std::time::Duration;
use tiff::encoder::{colortype, TiffEncoder};
use tiff::tags::Tag;

/// Rows of the test rasters.
pub(crate) const TEST_HEIGHT: usize = 3;
/// Columns of the test rasters.
pub(crate) const TEST_WIDTH: usize = 4;

/// Georeferencing of the test rasters: 0.5 degree cells from 10E, 20N.
pub(crate) fn test_transform() -> GeoTransform {
    GeoTransform {
        origin_longitude: 10.0,
        origin_latitude: 20.0,
        pixel_width: 0.5,
        pixel_height: 0.5,
    }
}

/// A test raster where cell (r, c) holds `base + r * TEST_WIDTH + c`.
pub(crate) fn test_grid(base: f32) -> Array2<f32> {
    Array2::from_shape_fn((TEST_HEIGHT, TEST_WIDTH), |(r, c)| {
        base + (r * TEST_WIDTH + c) as f32
    })
}

/// Encode a float GeoTIFF with tie point and pixel scale tags.
pub(crate) fn encode_geotiff(data: &Array2<f32>, transform: &GeoTransform) -> Vec<u8> {
    let (height, width) = data.dim();
    let samples: Vec<f32> = data.iter().copied().collect();
    let mut buffer = Cursor::new(Vec::new());
    {
        let mut encoder = TiffEncoder::new(&mut buffer).unwrap();
        let mut image = encoder
            .new_image::<colortype::Gray32Float>(width as u32, height as u32)
            .unwrap();
        let tie_point = [
            0.0,
            0.0,
            0.0,
            transform.origin_longitude,
            transform.origin_latitude,
            0.0,
        ];
        let pixel_scale = [transform.pixel_width, transform.pixel_height, 0.0];
        image
            .encoder()
            .write_tag(Tag::ModelTiepointTag, &tie_point[..])
            .unwrap();
        image
            .encoder()
            .write_tag(Tag::ModelPixelScaleTag, &pixel_scale[..])
            .unwrap();
        image.write_data(&samples).unwrap();
    }
    buffer.into_inner()
}

/// Encode a float TIFF without georeferencing.
pub(crate) fn encode_plain_tiff(data: &Array2<f32>) -> Vec<u8> {
    let (height, width) = data.dim();
    let samples: Vec<f32> = data.iter().copied().collect();
    let mut buffer = Cursor::new(Vec::new());
    {
        let mut encoder = TiffEncoder::new(&mut buffer).unwrap();
        encoder
            .write_image::<colortype::Gray32Float>(width as u32, height as u32, &samples)
            .unwrap();
    }
    buffer.into_inner()
}

/// A zip archive holding a single file.
pub(crate) fn zip_archive(name: &str, data: &[u8]) -> Vec<u8> {
    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    let options =
        zip::write::FileOptions::default().compression_method(zip::CompressionMethod::Deflated);
    writer.start_file(name, options).unwrap();
    writer.write_all(data).unwrap();
    writer.finish().unwrap().into_inner()
}

/// The archive published for a day, holding the given raster.
pub(crate) fn test_archive(date: NaiveDate, data: &Array2<f32>) -> Vec<u8> {
    zip_archive(
        &raster_name(date),
        &encode_geotiff(data, &test_transform()),
    )
}

/// Base value of the raster served for a day by [ScriptedFetcher].
pub(crate) fn day_value(date: NaiveDate) -> f32 {
    (date.ordinal() * 100) as f32
}

/// The raster served for a day by [ScriptedFetcher].
pub(crate) fn day_grid(date: NaiveDate) -> DecodedGrid {
    DecodedGrid {
        data: test_grid(day_value(date)),
        transform: test_transform(),
        source: format!("test/{}", archive_name(date)),
    }
}

/// Fetcher serving [day_grid] for every day, unless told otherwise.
///
/// Records the days it was asked for.
pub(crate) struct ScriptedFetcher {
    outcomes: HashMap<NaiveDate, Result<DecodedGrid, FetchError>>,
    delay: Duration,
    calls: Mutex<Vec<NaiveDate>>,
}

impl ScriptedFetcher {
    pub(crate) fn new() -> Self {
        Self {
            outcomes: HashMap::new(),
            delay: Duration::ZERO,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Serve a fixed outcome for one day.
    pub(crate) fn with_outcome(
        mut self,
        date: NaiveDate,
        outcome: Result<DecodedGrid, FetchError>,
    ) -> Self {
        self.outcomes.insert(date, outcome);
        self
    }

    /// Take some time over each fetch.
    pub(crate) fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Days fetched so far, in ascending order.
    pub(crate) fn calls(&self) -> Vec<NaiveDate> {
        let mut calls = self.calls.lock().unwrap().clone();
        calls.sort();
        calls
    }
}

#[async_trait]
impl ArchiveFetcher for ScriptedFetcher {
    async fn fetch(&self, date: NaiveDate) -> Result<DecodedGrid, FetchError> {
        self.calls.lock().unwrap().push(date);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        match self.outcomes.get(&date) {
            Some(outcome) => outcome.clone(),
            None => Ok(day_grid(date)),
        }
    }
}
