//! # Perforation Gauge
//!
//! Measures the perforation gauge of a scanned postage stamp (holes per
//! 20 mm of edge) from the shape of its silhouette, ignoring ink and color.
//!
//! ## Pipeline
//!
//! 1. [`MonotoneConverter`]: Otsu plus adaptive thresholding reduce the scan
//!    to a background / stamp body / perforation hole mask
//! 2. [`StructuralEnhancer`]: parallel Canny edge detection at two
//!    sensitivities bridges broken perforation outlines
//! 3. [`EdgeRegionExtractor`]: one strip per compass edge, traced into a
//!    scalloped boundary line
//! 4. [`TicDetector`] and [`TicClusterer`]: sliding window extrema along the
//!    boundary, one per physical perforation
//! 5. [`GaugeCalculator`]: median spacing to gauge, with a quality score
//! 6. [`SideSelector`]: the better edge of each axis and the catalog notation
//!
//! The four edges are analyzed in parallel with rayon. A failure on one
//! edge leaves the other three untouched; only a scan without a stamp
//! aborts the run.
//!
//! ## Basic Usage
//!
//! ```rust,no_run
//! use perforation_gauge::{GaugeConfig, GaugePipeline, StampImage};
//!
//! let scan = image::open("stamp.png").unwrap();
//! let image = StampImage::from_dynamic(&scan, 800.0)?;
//! let pipeline = GaugePipeline::new(GaugeConfig::default())?;
//!
//! let measurement = pipeline.measure(&image);
//! println!("{} (catalog: perf {})", measurement.notation, measurement.catalog_notation());
//! for anomaly in &measurement.anomalies {
//!     println!("warning: {anomaly}");
//! }
//! # Ok::<(), perforation_gauge::GaugeError>(())
//! ```
//!
//! ## Optional Features
//!
//! ### Logger Feature
//!
//! Enable debug logging to follow each stage:
//!
//! ```toml
//! [dependencies]
//! perforation-gauge = { version = "0.1.0", features = ["logger"] }
//! log = "0.4"
//! env_logger = "0.11"
//! ```
//!
//! ```rust,no_run
//! use perforation_gauge::measure_perforation_gauge;
//!
//! env_logger::init();
//!
//! let gray = image::open("stamp.png").unwrap().to_luma8();
//! let measurement = measure_perforation_gauge(gray, 800.0)?;
//! // With logger feature, you'll see debug messages like:
//! // DEBUG perforation_gauge::monotone: otsu level 97
//! // DEBUG perforation_gauge::gauge: top edge: 12 tics, median 46.00px, gauge 13.69, quality 0.840
//! # Ok::<(), perforation_gauge::GaugeError>(())
//! ```
//!
//! ## Diagnostics
//!
//! [`GaugePipeline::analyze`] returns a [`GaugeAnalysis`] with the traced
//! strip, raw and clustered tics and outcome of every edge, and optionally
//! the enhanced [`StructuralMask`] for rendering. The crate never writes
//! files itself.

use image::GrayImage;

// Conditional logging macros
#[cfg(feature = "logger")]
macro_rules! debug {
    ($($arg:tt)*) => {
        log::debug!($($arg)*);
    };
}

#[cfg(not(feature = "logger"))]
macro_rules! debug {
    ($($arg:tt)*) => {};
}

pub mod canny;
pub mod cluster;
pub mod config;
pub mod edge;
pub mod enhance;
pub mod error;
pub mod gauge;
pub mod mask;
pub mod monotone;
pub mod pipeline;
pub mod raster;
pub mod region;
pub mod select;
pub mod tic;

pub use cluster::TicClusterer;
pub use config::{
    Background, DetectionMode, GaugeConfig, MinSpacingRule, RegionStrategy, TicParams,
};
pub use edge::{Axis, Edge};
pub use enhance::StructuralEnhancer;
pub use error::{GaugeError, Result};
pub use gauge::{format_catalog_gauge, EdgeGaugeResult, GaugeCalculator};
pub use mask::{BoundingBox, MaskClass, StructuralMask};
pub use monotone::MonotoneConverter;
pub use pipeline::{EdgeReport, GaugeAnalysis, GaugePipeline};
pub use raster::StampImage;
pub use region::{BoundaryLine, BoundarySample, EdgeRegion, EdgeRegionExtractor, Rect};
pub use select::{GaugeAnomaly, GaugeMeasurement, SideSelector};
pub use tic::{DetectionPass, Tic, TicDetector};

/// Measure a grayscale scan with the default configuration.
///
/// # Errors
///
/// [`GaugeError::InvalidParameter`] for an empty image or a non-positive
/// DPI. A scan without a stamp is not an error: it yields a measurement with
/// both axes unset.
pub fn measure_perforation_gauge(gray: GrayImage, dpi: f32) -> Result<GaugeMeasurement> {
    let image = StampImage::new(gray, dpi)?;
    let pipeline = GaugePipeline::new(GaugeConfig::default())?;
    Ok(pipeline.measure(&image))
}
