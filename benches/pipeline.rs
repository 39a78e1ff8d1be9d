use criterion::{black_box, criterion_group, criterion_main, Criterion};
use image::{GrayImage, Luma};
use perforation_gauge::canny::canny_edges;
use perforation_gauge::{GaugeConfig, GaugePipeline, MonotoneConverter, StampImage};

/// Stamp of about 19 x 23 mm at 800 DPI with round perforations every
/// 46px on all four sides.
fn build_perforated_stamp() -> GrayImage {
    let (width, height) = (600u32, 720u32);
    let margin = 80;
    // perforations start 40px from each corner and stay clear of the far one
    let dent = |pos: u32, len: u32| {
        if pos < 32 || pos + 32 > len {
            return 0.0;
        }
        let phase = ((pos + 6) % 46) as f32;
        let offset = phase.min(46.0 - phase) / 8.0;
        if offset < 1.0 {
            16.0 * (1.0 - offset * offset).sqrt()
        } else {
            0.0
        }
    };

    GrayImage::from_fn(width + 2 * margin, height + 2 * margin, |x, y| {
        if x < margin || y < margin || x >= width + margin || y >= height + margin {
            return Luma([18]);
        }
        let (u, v) = (x - margin, y - margin);
        let (across_h, across_v) = (dent(u, width), dent(v, height));
        let body = (v as f32) >= across_h
            && ((height - 1 - v) as f32) >= across_h
            && (u as f32) >= across_v
            && ((width - 1 - u) as f32) >= across_v;
        Luma([if body { 205 } else { 18 }])
    })
}

fn bench_pipeline(c: &mut Criterion) {
    let image = StampImage::new(build_perforated_stamp(), 800.0).unwrap();
    let pipeline = GaugePipeline::new(GaugeConfig::default()).unwrap();

    c.bench_function("measure_760x880_800dpi", |b| {
        b.iter(|| black_box(pipeline.measure(black_box(&image))))
    });
}

fn bench_stages(c: &mut Criterion) {
    let image = StampImage::new(build_perforated_stamp(), 800.0).unwrap();
    let converter = MonotoneConverter::new(GaugeConfig::default().monotone);
    let mask = converter.convert(&image).unwrap();
    let rendered = mask.to_luma();

    c.bench_function("monotone_convert", |b| {
        b.iter(|| black_box(converter.convert(black_box(&image)).unwrap()))
    });
    c.bench_function("canny_edges_mask", |b| {
        b.iter(|| black_box(canny_edges(black_box(&rendered), 20.0, 60.0)))
    });
}

criterion_group!(benches, bench_pipeline, bench_stages);
criterion_main!(benches);
