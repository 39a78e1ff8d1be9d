//! Gauge and quality computation for one edge.

use serde::{Deserialize, Serialize};

use crate::config::CalculationConfig;
use crate::edge::Edge;
use crate::error::{GaugeError, Result};
use crate::raster::pixels_per_mm;
use crate::tic::Tic;

/// Length over which perforations are counted, in millimetres
pub const GAUGE_LENGTH_MM: f32 = 20.0;

/// Measured gauge of one edge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EdgeGaugeResult {
    pub edge: Edge,
    /// Perforations per 20 mm, 0 when unset
    pub gauge: f32,
    pub tic_count: usize,
    /// Tics sorted along the edge, in image coordinates
    pub tics: Vec<Tic>,
    pub median_spacing_px: f32,
    pub spacing_mm: f32,
    /// Coefficient of variation of the consecutive spacings
    pub spacing_cv: f32,
    /// Confidence in `[0, 1]`
    pub quality: f32,
}

impl EdgeGaugeResult {
    /// Result with gauge and quality at zero.
    pub fn unset(edge: Edge) -> Self {
        Self {
            edge,
            gauge: 0.0,
            tic_count: 0,
            tics: Vec::new(),
            median_spacing_px: 0.0,
            spacing_mm: 0.0,
            spacing_cv: 0.0,
            quality: 0.0,
        }
    }

    /// Whether this result carries a measured gauge
    pub fn is_valid(&self) -> bool {
        self.gauge > 0.0
    }
}

/// Turns a clustered tic list into an [`EdgeGaugeResult`].
#[derive(Debug, Clone)]
pub struct GaugeCalculator {
    config: CalculationConfig,
    dpi: f32,
}

impl GaugeCalculator {
    pub fn new(config: CalculationConfig, dpi: f32) -> Self {
        Self { config, dpi }
    }

    /// Gauge from the median distance between consecutive tics.
    ///
    /// # Algorithm
    ///
    /// 1. Sort tics along the edge and take consecutive distances
    /// 2. Median distance to millimetres, then `20 / spacing_mm`
    /// 3. Quality blends tic count, spacing uniformity (`1 - cv`) and mean
    ///    depth, each capped at 1
    ///
    /// # Errors
    ///
    /// [`GaugeError::InsufficientTics`] below `min_tics`, and
    /// [`GaugeError::DegenerateSpacing`] when the median spacing is at or
    /// below `degenerate_spacing_px`.
    pub fn calculate(&self, edge: Edge, tics: &[Tic]) -> Result<EdgeGaugeResult> {
        let c = &self.config;
        if tics.len() < c.min_tics {
            return Err(GaugeError::InsufficientTics {
                edge,
                found: tics.len(),
                minimum: c.min_tics,
            });
        }

        let mut sorted = tics.to_vec();
        sorted.sort_by(|a, b| a.along().total_cmp(&b.along()));
        let spacings: Vec<f32> = sorted.windows(2).map(|w| w[0].distance(&w[1])).collect();

        let median_px = median(&spacings);
        if median_px.is_nan() || median_px <= c.degenerate_spacing_px.max(0.0) {
            return Err(GaugeError::DegenerateSpacing {
                edge,
                median_px,
            });
        }
        let spacing_mm = median_px / pixels_per_mm(self.dpi);
        let gauge = GAUGE_LENGTH_MM / spacing_mm;

        let mean = spacings.iter().sum::<f32>() / spacings.len() as f32;
        let variance =
            spacings.iter().map(|s| (s - mean).powi(2)).sum::<f32>() / spacings.len() as f32;
        let cv = if mean > 0.0 { variance.sqrt() / mean } else { 0.0 };
        let avg_depth = sorted.iter().map(|t| t.depth).sum::<f32>() / sorted.len() as f32;

        let count_term = (sorted.len() as f32 / c.count_cap as f32).clamp(0.0, 1.0);
        let uniformity_term = (1.0 - cv).clamp(0.0, 1.0);
        let depth_term = (avg_depth / c.depth_cap).clamp(0.0, 1.0);
        let quality = (c.count_weight * count_term
            + c.uniformity_weight * uniformity_term
            + c.depth_weight * depth_term)
            .clamp(0.0, 1.0);

        debug!(
            "{} edge: {} tics, median {:.2}px, gauge {:.2}, quality {:.3}",
            edge,
            sorted.len(),
            median_px,
            gauge,
            quality
        );

        Ok(EdgeGaugeResult {
            edge,
            gauge,
            tic_count: sorted.len(),
            tics: sorted,
            median_spacing_px: median_px,
            spacing_mm,
            spacing_cv: cv,
            quality,
        })
    }
}

fn median(values: &[f32]) -> f32 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f32::total_cmp);
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}

/// Nearest quarter gauge.
pub fn round_to_quarter(gauge: f32) -> f32 {
    (gauge * 4.0).round() / 4.0
}

/// Catalog rendering of a gauge in quarter steps: `14`, `14¼`, `14½`, `14¾`.
///
/// Non-positive gauges render as `unknown`.
pub fn format_catalog_gauge(gauge: f32) -> String {
    if gauge.is_nan() || gauge <= 0.0 {
        return "unknown".to_string();
    }
    let quarters = (gauge * 4.0).round() as u32;
    let whole = quarters / 4;
    let fraction = match quarters % 4 {
        1 => "¼",
        2 => "½",
        3 => "¾",
        _ => "",
    };
    format!("{whole}{fraction}")
}
