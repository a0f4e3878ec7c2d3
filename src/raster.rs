//! GeoTIFF raster decoding.
//!
//! ARC2 rasters are single band GeoTIFFs in geographic coordinates (EPSG:4326). Georeferencing
//! is read from the model tie point and pixel scale tags, which together give an affine mapping
//! between longitude/latitude and pixel columns/rows.

use crate::error::RasterError;

use ndarray::Array2;
use num_traits::AsPrimitive;
use std::fs::File;
use std::io::{BufReader, Read, Seek};
use std::path::Path;
use tiff::decoder::{Decoder, DecodingResult};
use tiff::tags::Tag;

/// Affine mapping between geographic coordinates and pixel indices.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GeoTransform {
    /// Longitude of the left edge of column 0
    pub origin_longitude: f64,
    /// Latitude of the top edge of row 0
    pub origin_latitude: f64,
    /// Width of a pixel in degrees
    pub pixel_width: f64,
    /// Height of a pixel in degrees
    pub pixel_height: f64,
}

impl GeoTransform {
    /// Build a transform from the GeoTIFF `ModelTiepointTag` and `ModelPixelScaleTag` values.
    ///
    /// The tie point is `[i, j, k, x, y, z]` tying raster point (i, j) to model point (x, y),
    /// the scale is `[sx, sy, sz]`.
    pub fn from_tags(tie_point: &[f64], pixel_scale: &[f64]) -> Result<Self, RasterError> {
        if tie_point.len() < 6 {
            return Err(RasterError::GeoTag {
                tag: "ModelTiepointTag",
            });
        }
        if pixel_scale.len() < 2 || pixel_scale[0] <= 0.0 || pixel_scale[1] <= 0.0 {
            return Err(RasterError::GeoTag {
                tag: "ModelPixelScaleTag",
            });
        }
        let (i, j, x, y) = (tie_point[0], tie_point[1], tie_point[3], tie_point[4]);
        let (sx, sy) = (pixel_scale[0], pixel_scale[1]);
        Ok(Self {
            origin_longitude: x - i * sx,
            origin_latitude: y + j * sy,
            pixel_width: sx,
            pixel_height: sy,
        })
    }

    /// Returns the (row, column) of the pixel containing the location.
    ///
    /// The result may lie outside the raster; callers check it against the grid shape.
    pub fn pixel_of(&self, latitude: f64, longitude: f64) -> (i64, i64) {
        let row = ((self.origin_latitude - latitude) / self.pixel_height).floor();
        let col = ((longitude - self.origin_longitude) / self.pixel_width).floor();
        (row as i64, col as i64)
    }
}

/// A decoded daily raster.
#[derive(Clone, Debug)]
pub struct DecodedGrid {
    /// Samples indexed by (row, column)
    pub data: Array2<f32>,
    /// Georeferencing of the samples
    pub transform: GeoTransform,
    /// Where the raster came from, e.g. the archive path
    pub source: String,
}

fn cast<T: AsPrimitive<f32>>(samples: Vec<T>) -> Vec<f32> {
    samples.into_iter().map(|sample| sample.as_()).collect()
}

fn read_geo_tag<R: Read + Seek>(
    decoder: &mut Decoder<R>,
    tag: Tag,
    name: &'static str,
) -> Result<Vec<f64>, RasterError> {
    match decoder.find_tag(tag)? {
        Some(value) => value
            .into_f64_vec()
            .map_err(|_| RasterError::GeoTag { tag: name }),
        None => Err(RasterError::GeoTag { tag: name }),
    }
}

/// Decode a single band GeoTIFF.
///
/// # Arguments
///
/// * `reader`: GeoTIFF data
/// * `source`: Description of where the data came from
pub fn decode_geotiff<R: Read + Seek>(reader: R, source: &str) -> Result<DecodedGrid, RasterError> {
    let mut decoder = Decoder::new(reader)?;
    let (width, height) = decoder.dimensions()?;
    let tie_point = read_geo_tag(&mut decoder, Tag::ModelTiepointTag, "ModelTiepointTag")?;
    let pixel_scale = read_geo_tag(&mut decoder, Tag::ModelPixelScaleTag, "ModelPixelScaleTag")?;
    let transform = GeoTransform::from_tags(&tie_point, &pixel_scale)?;
    let samples = match decoder.read_image()? {
        DecodingResult::F32(samples) => samples,
        DecodingResult::F64(samples) => cast(samples),
        DecodingResult::U8(samples) => cast(samples),
        DecodingResult::U16(samples) => cast(samples),
        DecodingResult::U32(samples) => cast(samples),
        DecodingResult::I16(samples) => cast(samples),
        DecodingResult::I32(samples) => cast(samples),
        _ => return Err(RasterError::UnsupportedSampleType("64-bit integer or 8-bit signed")),
    };
    let data = Array2::from_shape_vec((height as usize, width as usize), samples)?;
    Ok(DecodedGrid {
        data,
        transform,
        source: source.to_string(),
    })
}

/// Decode a GeoTIFF file.
pub fn open_raster(path: &Path, source: &str) -> Result<DecodedGrid, RasterError> {
    let reader = BufReader::new(File::open(path)?);
    decode_geotiff(reader, source)
}
