/// Benchmarks for point series queries against a fully loaded cache.
use arc2_cache::error::FetchError;
use arc2_cache::fetcher::ArchiveFetcher;
use arc2_cache::grid_cache::{CacheWindow, GridCache};
use arc2_cache::raster::{DecodedGrid, GeoTransform};
use arc2_cache::series::RainfallSeries;
use criterion::{black_box, criterion_group, criterion_main, Criterion};

use async_trait::async_trait;
use chrono::{Datelike, NaiveDate};
use ndarray::Array2;
use std::sync::Arc;

const HEIGHT: usize = 801;
const WIDTH: usize = 751;

/// Serves a constant raster for every day.
struct ConstantFetcher;

#[async_trait]
impl ArchiveFetcher for ConstantFetcher {
    async fn fetch(&self, date: NaiveDate) -> Result<DecodedGrid, FetchError> {
        Ok(DecodedGrid {
            data: Array2::from_elem((HEIGHT, WIDTH), date.ordinal() as f32 * 0.5),
            transform: GeoTransform {
                origin_longitude: -20.05,
                origin_latitude: 40.05,
                pixel_width: 0.1,
                pixel_height: 0.1,
            },
            source: "bench".to_string(),
        })
    }
}

fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn criterion_benchmark(c: &mut Criterion) {
    let runtime = tokio::runtime::Runtime::new().unwrap();
    let window = CacheWindow {
        start: ymd(2020, 1, 1),
        end: ymd(2020, 3, 31),
        grid_height: HEIGHT,
        grid_width: WIDTH,
    };
    let cache = Arc::new(GridCache::new(window, Arc::new(ConstantFetcher)).unwrap());
    let today = ymd(2021, 1, 1);
    runtime
        .block_on(cache.ensure_loaded_as_of(ymd(2020, 1, 1), 91, today))
        .unwrap();

    for days in [30, 91] {
        let name = format!("rainfall({} days)", days);
        c.bench_function(&name, |b| {
            b.to_async(&runtime).iter(|| async {
                cache
                    .rainfall_as_of(-0.9, 37.7, ymd(2020, 1, 1), black_box(days), today)
                    .await
                    .unwrap()
            })
        });
    }

    let samples = (0..365)
        .map(|offset| (ymd(2020, 1, 1) + chrono::Days::new(offset), offset as f32 * 0.25))
        .collect();
    let series = RainfallSeries::new(samples);
    c.bench_function("render(365 days)", |b| {
        b.iter(|| black_box(&series).render())
    });
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
