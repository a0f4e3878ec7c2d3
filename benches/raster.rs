/// Benchmarks for archive extraction and GeoTIFF decoding of full size ARC2 rasters.
use arc2_cache::compression;
use arc2_cache::raster;
use criterion::{black_box, criterion_group, criterion_main, Criterion};

use std::io::{Cursor, Write};
use tiff::encoder::{colortype, TiffEncoder};
use tiff::tags::Tag;

const HEIGHT: u32 = 801;
const WIDTH: u32 = 751;

fn encode_geotiff() -> Vec<u8> {
    let samples: Vec<f32> = (0..HEIGHT * WIDTH).map(|i| (i % 500) as f32 * 0.1).collect();
    let mut buffer = Cursor::new(Vec::new());
    {
        let mut encoder = TiffEncoder::new(&mut buffer).unwrap();
        let mut image = encoder
            .new_image::<colortype::Gray32Float>(WIDTH, HEIGHT)
            .unwrap();
        image
            .encoder()
            .write_tag(
                Tag::ModelTiepointTag,
                &[0.0, 0.0, 0.0, -20.05, 40.05, 0.0][..],
            )
            .unwrap();
        image
            .encoder()
            .write_tag(Tag::ModelPixelScaleTag, &[0.1, 0.1, 0.0][..])
            .unwrap();
        image.write_data(&samples).unwrap();
    }
    buffer.into_inner()
}

fn zip_archive(name: &str, data: &[u8]) -> Vec<u8> {
    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    let options =
        zip::write::FileOptions::default().compression_method(zip::CompressionMethod::Deflated);
    writer.start_file(name, options).unwrap();
    writer.write_all(data).unwrap();
    writer.finish().unwrap().into_inner()
}

fn criterion_benchmark(c: &mut Criterion) {
    let tiff = encode_geotiff();
    let name = "africa_arc.20200101.tif";
    let archive = zip_archive(name, &tiff);
    let scratch_dir = tempfile::tempdir().unwrap();

    c.bench_function("decode_geotiff(801x751)", |b| {
        b.iter(|| {
            raster::decode_geotiff(Cursor::new(black_box(&tiff)), "bench").unwrap();
        })
    });
    c.bench_function("extract_and_decode(801x751)", |b| {
        b.iter(|| {
            let scratch =
                compression::extract_member(black_box(&archive), name, scratch_dir.path())
                    .unwrap();
            raster::open_raster(scratch.path(), "bench").unwrap();
        })
    });
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
