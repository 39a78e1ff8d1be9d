//! Tunable parameters for the perforation gauge pipeline.
//!
//! Every threshold the pipeline uses lives here with its default, grouped by
//! stage. Standard and sensitive tic detection are two [`TicParams`] presets
//! of the same detector rather than separate code paths.
//!
//! ```no_run
//! use perforation_gauge::GaugeConfig;
//! use std::path::Path;
//!
//! // Partial files are fine, missing fields keep their defaults
//! let config = GaugeConfig::from_json_file(Path::new("gauge.json"))?;
//!
//! // Or force the low threshold detector
//! let sensitive = GaugeConfig::sensitive();
//! # Ok::<(), perforation_gauge::GaugeError>(())
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{GaugeError, Result};
use crate::raster::pixels_per_mm;

/// Complete pipeline configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GaugeConfig {
    /// Silhouette segmentation and monotone reduction
    pub monotone: MonotoneConfig,

    /// Edge overlay that bridges broken perforation outlines
    pub enhance: EnhanceConfig,

    /// Edge strip placement and boundary tracing
    pub region: RegionConfig,

    /// Tic detection thresholds and mode selection
    pub detection: DetectionConfig,

    /// Merging of tics that belong to the same perforation
    pub cluster: ClusterConfig,

    /// Gauge and quality score computation
    pub calculation: CalculationConfig,

    /// Keep the enhanced structural mask in the analysis output
    pub keep_mask: bool,
}

impl GaugeConfig {
    /// Defaults with the low threshold detector forced on every edge.
    pub fn sensitive() -> Self {
        let mut config = Self::default();
        config.detection.mode = DetectionMode::Sensitive;
        config
    }

    /// Parse a configuration from JSON text and validate it.
    ///
    /// Any field may be omitted; missing groups and fields keep their
    /// defaults, so `{}` is the default configuration.
    ///
    /// # Arguments
    ///
    /// * `json` - JSON object with any subset of the configuration groups
    ///
    /// # Returns
    ///
    /// The merged configuration, already checked with [`validate`](Self::validate).
    ///
    /// # Errors
    ///
    /// [`GaugeError::InvalidParameter`] for malformed JSON, unknown enum
    /// variants, or values rejected by validation.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use perforation_gauge::{DetectionMode, GaugeConfig};
    ///
    /// let config = GaugeConfig::from_json_str(r#"{ "detection": { "mode": "standard" } }"#)?;
    /// assert_eq!(config.detection.mode, DetectionMode::Standard);
    /// assert_eq!(config.cluster, GaugeConfig::default().cluster);
    /// # Ok::<(), perforation_gauge::GaugeError>(())
    /// ```
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| GaugeError::invalid("config", e))?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse a JSON configuration file.
    ///
    /// # Arguments
    ///
    /// * `path` - File holding a (possibly partial) JSON configuration
    ///
    /// # Errors
    ///
    /// [`GaugeError::ImageLoad`] when the file cannot be read, otherwise the errors of [`from_json_str`](Self::from_json_str).
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)
            .map_err(|e| GaugeError::load(format!("{}: {e}", path.display())))?;
        Self::from_json_str(&json)
    }

    /// Reject values that would make a stage meaningless.
    pub fn validate(&self) -> Result<()> {
        let m = &self.monotone;
        if !(m.background_margin_mm.is_finite() && m.background_margin_mm >= 0.0) {
            return Err(GaugeError::invalid(
                "monotone.background_margin_mm",
                m.background_margin_mm,
            ));
        }
        if m.adaptive_block_radius == 0 {
            return Err(GaugeError::invalid("monotone.adaptive_block_radius", 0));
        }

        for (i, t) in self.enhance.hysteresis.iter().enumerate() {
            if !(t.low >= 0.0 && t.high >= t.low) {
                return Err(GaugeError::invalid(
                    format!("enhance.hysteresis[{i}]"),
                    format!("{}..{}", t.low, t.high),
                ));
            }
        }

        let r = &self.region;
        if r.strategies.is_empty() {
            return Err(GaugeError::invalid("region.strategies", "[]"));
        }
        if r.scan_step == 0 {
            return Err(GaugeError::invalid("region.scan_step", 0));
        }
        if r.bounded_depth_divisor == 0 || r.fixed_depth_divisor == 0 {
            return Err(GaugeError::invalid("region.depth_divisor", 0));
        }

        let d = &self.detection;
        for (name, params) in [("standard", &d.standard), ("sensitive", &d.sensitive)] {
            if params.window == 0 {
                return Err(GaugeError::invalid(format!("detection.{name}.window"), 0));
            }
            if !(params.depth_threshold.is_finite() && params.depth_threshold >= 0.0) {
                return Err(GaugeError::invalid(
                    format!("detection.{name}.depth_threshold"),
                    params.depth_threshold,
                ));
            }
        }
        if !(d.fallback_gain.is_finite() && d.fallback_gain >= 1.0) {
            return Err(GaugeError::invalid("detection.fallback_gain", d.fallback_gain));
        }

        if !(self.cluster.radius_mm.is_finite() && self.cluster.radius_mm >= 0.0) {
            return Err(GaugeError::invalid("cluster.radius_mm", self.cluster.radius_mm));
        }

        let c = &self.calculation;
        if c.min_tics < 2 {
            return Err(GaugeError::invalid("calculation.min_tics", c.min_tics));
        }
        for (name, weight) in [
            ("count_weight", c.count_weight),
            ("uniformity_weight", c.uniformity_weight),
            ("depth_weight", c.depth_weight),
        ] {
            if !(0.0..=1.0).contains(&weight) {
                return Err(GaugeError::invalid(format!("calculation.{name}"), weight));
            }
        }
        if !(c.degenerate_spacing_px.is_finite() && c.degenerate_spacing_px >= 0.0) {
            return Err(GaugeError::invalid(
                "calculation.degenerate_spacing_px",
                c.degenerate_spacing_px,
            ));
        }
        if c.count_cap == 0 || c.depth_cap.is_nan() || c.depth_cap <= 0.0 {
            return Err(GaugeError::invalid(
                "calculation.caps",
                format!("{} / {}", c.count_cap, c.depth_cap),
            ));
        }
        Ok(())
    }
}

/// Which side of the intensity range the scanner background sits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Background {
    /// Decide from the mean intensity of the image border
    Auto,
    /// Black or dark gray scanner bed
    Dark,
    /// White or light gray backing
    Light,
}

/// Silhouette segmentation parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonotoneConfig {
    pub background: Background,

    /// Background added on every side before segmentation, in millimetres.
    /// Gives close-cropped scans a background/stamp transition on each edge.
    pub background_margin_mm: f32,

    /// Images whose intensity range is below this hold no stamp
    pub min_contrast: u8,

    /// Half size of the local mean window for adaptive thresholding
    pub adaptive_block_radius: u32,

    /// A pixel is locally foreground when brighter than its local mean by this much
    pub adaptive_offset: i16,

    /// L1 radius of the close/open pass over the silhouette
    pub morphology_radius: u8,

    /// Silhouette pixels darker than this become perforation holes. Capped
    /// per scan at the midpoint of the background and stamp levels.
    pub hole_cutoff: u8,
}

impl Default for MonotoneConfig {
    fn default() -> Self {
        Self {
            background: Background::Auto,
            background_margin_mm: 1.5,
            min_contrast: 24,
            adaptive_block_radius: 10,
            adaptive_offset: 5,
            morphology_radius: 3,
            hole_cutoff: 60,
        }
    }
}

/// Hysteresis pair for one edge detection sensitivity.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Hysteresis {
    pub low: f32,
    pub high: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnhanceConfig {
    pub enabled: bool,

    /// Edge maps from each pair are OR'd together
    pub hysteresis: Vec<Hysteresis>,

    /// L1 radius of the close pass over the combined edge map
    pub close_radius: u8,
}

impl Default for EnhanceConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            hysteresis: vec![
                Hysteresis { low: 20.0, high: 60.0 },
                Hysteresis { low: 40.0, high: 100.0 },
            ],
            close_radius: 1,
        }
    }
}

/// Ways of placing an edge strip, tried in order until one traces enough
/// boundary samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegionStrategy {
    /// Strip measured inward from the stamp bounding box
    StampBounds,
    /// Strip along the image border
    FixedStrip,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegionConfig {
    pub strategies: Vec<RegionStrategy>,

    /// Bounding box strips are `min(bounded_max_depth_px, shorter / bounded_depth_divisor)` deep
    pub bounded_max_depth_px: u32,
    pub bounded_depth_divisor: u32,

    /// Border strips are `min(fixed_max_depth_px, shorter / fixed_depth_divisor)` deep
    pub fixed_max_depth_px: u32,
    pub fixed_depth_divisor: u32,

    /// Distance in pixels between scan lines
    pub scan_step: u32,

    /// Fewer boundary samples than this skips the edge
    pub min_samples: usize,
}

impl Default for RegionConfig {
    fn default() -> Self {
        Self {
            strategies: vec![RegionStrategy::StampBounds, RegionStrategy::FixedStrip],
            bounded_max_depth_px: 20,
            bounded_depth_divisor: 20,
            fixed_max_depth_px: 25,
            fixed_depth_divisor: 18,
            scan_step: 2,
            min_samples: 10,
        }
    }
}

/// Sliding window parameters for one tic detection pass.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TicParams {
    /// Samples on each side of the candidate
    pub window: usize,

    /// Minimum deviation from the neighborhood mean, in pixels
    pub depth_threshold: f32,
}

impl TicParams {
    pub const fn standard() -> Self {
        Self {
            window: 6,
            depth_threshold: 3.5,
        }
    }

    /// Smaller window and lower threshold for sparse or close-cropped edges
    pub const fn sensitive() -> Self {
        Self {
            window: 4,
            depth_threshold: 1.5,
        }
    }
}

/// Which detection passes to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DetectionMode {
    /// Standard pass, falling back to the sensitive pass on sparse edges
    Auto,
    Standard,
    Sensitive,
}

/// Floor on the distance between two accepted tics.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MinSpacingRule {
    /// Spacing of the finest gauge in use: `max(20 / gauge mm, floor_px)`
    FinestGauge { gauge: f32, floor_px: f32 },
    /// `max(dpi / divisor, floor_px)`
    DpiFraction { divisor: f32, floor_px: f32 },
}

impl Default for MinSpacingRule {
    fn default() -> Self {
        MinSpacingRule::FinestGauge {
            gauge: 18.0,
            floor_px: 30.0,
        }
    }
}

impl MinSpacingRule {
    /// Minimum distance in pixels between two accepted tics.
    ///
    /// # Arguments
    ///
    /// * `dpi` - Scan resolution in dots per inch
    ///
    /// # Returns
    ///
    /// The rule's spacing converted to pixels, never below its floor.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use perforation_gauge::MinSpacingRule;
    ///
    /// let rule = MinSpacingRule::DpiFraction { divisor: 32.0, floor_px: 16.0 };
    /// assert_eq!(rule.min_spacing_px(800.0), 25.0);
    /// assert_eq!(rule.min_spacing_px(300.0), 16.0);
    /// ```
    pub fn min_spacing_px(&self, dpi: f32) -> f32 {
        match *self {
            MinSpacingRule::FinestGauge { gauge, floor_px } => {
                (20.0 / gauge * pixels_per_mm(dpi)).max(floor_px)
            }
            MinSpacingRule::DpiFraction { divisor, floor_px } => (dpi / divisor).max(floor_px),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionConfig {
    pub mode: DetectionMode,
    pub standard: TicParams,
    pub sensitive: TicParams,
    pub min_spacing: MinSpacingRule,

    /// Auto mode retries when the standard pass finds fewer tics than this
    pub fallback_max_tics: usize,

    /// ...and the boundary has at least this many samples
    pub fallback_min_samples: usize,

    /// The sensitive result replaces the standard one only if it has more
    /// than `fallback_gain` times as many tics
    pub fallback_gain: f32,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            mode: DetectionMode::Auto,
            standard: TicParams::standard(),
            sensitive: TicParams::sensitive(),
            min_spacing: MinSpacingRule::default(),
            fallback_max_tics: 8,
            fallback_min_samples: 20,
            fallback_gain: 1.5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusterConfig {
    /// Tics closer than this along the edge belong to one perforation
    pub radius_mm: f32,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self { radius_mm: 0.4 }
    }
}

impl ClusterConfig {
    pub fn radius_px(&self, dpi: f32) -> f32 {
        self.radius_mm * pixels_per_mm(dpi)
    }
}

/// Gauge and quality score parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CalculationConfig {
    pub min_tics: usize,

    /// Median spacings at or below this many pixels are degenerate
    pub degenerate_spacing_px: f32,

    /// Tic count at which the count term saturates
    pub count_cap: usize,

    /// Average depth at which the depth term saturates
    pub depth_cap: f32,

    pub count_weight: f32,
    pub uniformity_weight: f32,
    pub depth_weight: f32,
}

impl Default for CalculationConfig {
    fn default() -> Self {
        Self {
            min_tics: 3,
            degenerate_spacing_px: 0.5,
            count_cap: 20,
            depth_cap: 5.0,
            count_weight: 0.4,
            uniformity_weight: 0.4,
            depth_weight: 0.2,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_validates() {
        assert!(GaugeConfig::default().validate().is_ok());
        assert!(GaugeConfig::sensitive().validate().is_ok());
    }

    #[test]
    fn test_finest_gauge_spacing() {
        let rule = MinSpacingRule::default();
        // 20/18 mm at 800 DPI
        assert!((rule.min_spacing_px(800.0) - 34.996).abs() < 0.01);
        // floor wins at low resolution
        assert_eq!(rule.min_spacing_px(300.0), 30.0);
    }

    #[test]
    fn test_dpi_fraction_spacing() {
        let rule = MinSpacingRule::DpiFraction {
            divisor: 32.0,
            floor_px: 16.0,
        };
        assert_eq!(rule.min_spacing_px(800.0), 25.0);
        assert_eq!(rule.min_spacing_px(400.0), 16.0);
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config = GaugeConfig::from_json_str(
            r#"{ "detection": { "mode": "sensitive" }, "cluster": { "radius_mm": 0.5 } }"#,
        )
        .unwrap();
        assert_eq!(config.detection.mode, DetectionMode::Sensitive);
        assert_eq!(config.detection.standard, TicParams::standard());
        assert_eq!(config.cluster.radius_mm, 0.5);
        assert_eq!(config.region, RegionConfig::default());
    }

    #[test]
    fn test_validate_rejects_zero_window() {
        let mut config = GaugeConfig::default();
        config.detection.sensitive.window = 0;
        assert!(matches!(
            config.validate(),
            Err(GaugeError::InvalidParameter { .. })
        ));
    }

    #[test]
    fn test_validate_rejects_negative_degenerate_spacing() {
        let mut config = GaugeConfig::default();
        config.calculation.degenerate_spacing_px = -0.5;
        assert!(matches!(
            config.validate(),
            Err(GaugeError::InvalidParameter { .. })
        ));
        config.calculation.degenerate_spacing_px = 0.0;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_empty_strategies() {
        let json = r#"{ "region": { "strategies": [] } }"#;
        assert!(GaugeConfig::from_json_str(json).is_err());
    }
}
