use std::time::Instant;

use env_logger::Builder;
use image::{buffer::ConvertBuffer, open, GrayImage, Rgb, RgbImage};
use log::{info, warn};
use perforation_gauge::{GaugeConfig, GaugePipeline, StampImage, Tic};

/// Mark each tic with a small red cross on top of the scan.
fn visualize_tics(image: &GrayImage, tics: &[Tic]) -> RgbImage {
    let mut canvas: RgbImage = image.convert();
    let red = Rgb([255u8, 0, 0]);
    let (width, height) = canvas.dimensions();

    for tic in tics {
        let (cx, cy) = (tic.x.round() as i64, tic.y.round() as i64);
        for d in -3i64..=3 {
            for (x, y) in [(cx + d, cy), (cx, cy + d)] {
                if x >= 0 && y >= 0 && x < width as i64 && y < height as i64 {
                    canvas.put_pixel(x as u32, y as u32, red);
                }
            }
        }
    }
    canvas
}

fn main() {
    Builder::from_default_env().format_timestamp_millis().init();

    let mut args = std::env::args().skip(1);
    let path = args.next().unwrap_or_else(|| "test_image/stamp.png".to_string());
    let dpi: f32 = args.next().and_then(|s| s.parse().ok()).unwrap_or(800.0);
    let overlay = args.next();

    let scan = open(&path).unwrap();
    let image = StampImage::from_dynamic(&scan, dpi).unwrap();
    let pipeline = GaugePipeline::new(GaugeConfig::default()).unwrap();

    let instance = Instant::now();
    let analysis = pipeline.analyze(&image);
    info!("analysis took {:?}", instance.elapsed());

    if let Some(err) = &analysis.failure {
        warn!("{}", err.user_message());
    }
    for report in &analysis.edges {
        match &report.outcome {
            Ok(result) => info!(
                "{}: gauge {:.2}, {} tics, quality {:.2}",
                report.edge, result.gauge, result.tic_count, result.quality
            ),
            Err(err) => warn!("{}", err.user_message()),
        }
    }

    let m = &analysis.measurement;
    println!("{path}: {} (perf {})", m.notation, m.catalog_notation());
    if m.is_compound() {
        println!("compound perforation");
    }
    for anomaly in &m.anomalies {
        println!("warning: {anomaly}");
    }

    if let Some(out) = overlay {
        let tics: Vec<Tic> = analysis
            .edges
            .iter()
            .flat_map(|r| r.tics.iter().copied())
            .collect();
        visualize_tics(image.gray(), &tics).save(&out).unwrap();
        info!("wrote {} tics to {}", tics.len(), out);
    }
}
