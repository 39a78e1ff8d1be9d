//! The full measurement run, from scan to [`GaugeMeasurement`].

use rayon::prelude::*;

use crate::cluster::TicClusterer;
use crate::config::{GaugeConfig, RegionStrategy};
use crate::edge::Edge;
use crate::enhance::StructuralEnhancer;
use crate::error::{GaugeError, Result};
use crate::gauge::{EdgeGaugeResult, GaugeCalculator};
use crate::mask::{BoundingBox, StructuralMask};
use crate::monotone::MonotoneConverter;
use crate::raster::{validate_dpi, StampImage};
use crate::region::{EdgeRegionExtractor, Rect};
use crate::select::{GaugeMeasurement, SideSelector};
use crate::tic::{DetectionPass, Tic, TicDetector};

/// Everything the pipeline learned about one edge.
#[derive(Debug, Clone, PartialEq)]
pub struct EdgeReport {
    pub edge: Edge,
    /// Strategy whose strip was traced, `None` when none gave enough samples
    pub strategy: Option<RegionStrategy>,
    /// Traced strip in mask coordinates
    pub strip: Option<Rect>,
    pub sample_count: usize,
    /// Detector output before clustering, image coordinates
    pub raw_tics: Vec<Tic>,
    /// One tic per perforation, image coordinates
    pub tics: Vec<Tic>,
    pub pass: Option<DetectionPass>,
    pub outcome: Result<EdgeGaugeResult>,
}

impl EdgeReport {
    fn failed(edge: Edge, err: GaugeError) -> Self {
        Self {
            edge,
            strategy: None,
            strip: None,
            sample_count: 0,
            raw_tics: Vec::new(),
            tics: Vec::new(),
            pass: None,
            outcome: Err(err),
        }
    }
}

/// Measurement plus the diagnostics behind it.
#[derive(Debug, Clone, PartialEq)]
pub struct GaugeAnalysis {
    pub measurement: GaugeMeasurement,
    /// Condition that aborted the run, if any
    pub failure: Option<GaugeError>,
    /// Reports in [`Edge::ALL`] order, empty when the run aborted
    pub edges: Vec<EdgeReport>,
    /// Background margin added on each side of the scan
    pub padding_px: u32,
    /// Enhanced mask, kept when [`GaugeConfig::keep_mask`] is set
    pub mask: Option<StructuralMask>,
}

impl GaugeAnalysis {
    fn aborted(err: GaugeError, padding_px: u32) -> Self {
        Self {
            measurement: GaugeMeasurement::empty(),
            failure: Some(err),
            edges: Vec::new(),
            padding_px,
            mask: None,
        }
    }

    pub fn report(&self, edge: Edge) -> Option<&EdgeReport> {
        self.edges.iter().find(|r| r.edge == edge)
    }

    /// Edge local failures, in compass order
    pub fn edge_errors(&self) -> impl Iterator<Item = &GaugeError> {
        self.edges.iter().filter_map(|r| r.outcome.as_ref().err())
    }
}

/// Stateless pipeline; one instance can measure any number of scans.
///
/// ```no_run
/// use perforation_gauge::{GaugeConfig, GaugePipeline, StampImage};
///
/// let scan = image::open("stamp.png").unwrap();
/// let image = StampImage::from_dynamic(&scan, 800.0)?;
/// let pipeline = GaugePipeline::new(GaugeConfig::default())?;
/// let measurement = pipeline.measure(&image);
/// println!("perf {}", measurement.catalog_notation());
/// # Ok::<(), perforation_gauge::GaugeError>(())
/// ```
#[derive(Debug, Clone)]
pub struct GaugePipeline {
    config: GaugeConfig,
}

impl GaugePipeline {
    /// Build a pipeline around a validated configuration.
    ///
    /// # Errors
    ///
    /// [`GaugeError::InvalidParameter`] when [`GaugeConfig::validate`] fails.
    pub fn new(config: GaugeConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &GaugeConfig {
        &self.config
    }

    /// Measure a scan. A run without a stamp yields the empty measurement.
    pub fn measure(&self, image: &StampImage) -> GaugeMeasurement {
        self.analyze(image).measurement
    }

    /// Measure a scan and keep the per-edge diagnostics.
    pub fn analyze(&self, image: &StampImage) -> GaugeAnalysis {
        let converter = MonotoneConverter::new(self.config.monotone.clone());
        let padding_px = converter.margin_px(image.dpi());
        debug!(
            "analyzing {:?} scan at {} dpi, padding {}px",
            image.dimensions(),
            image.dpi(),
            padding_px
        );
        match converter.convert(image) {
            Ok(mask) => self.run(mask, image.dpi(), padding_px),
            Err(err) => {
                debug!("run aborted: {}", err);
                GaugeAnalysis::aborted(err, padding_px)
            }
        }
    }

    /// Run enhancement onward on a caller-supplied mask, without padding.
    ///
    /// # Errors
    ///
    /// [`GaugeError::InvalidParameter`] for a non-positive DPI.
    pub fn analyze_mask(&self, mask: &StructuralMask, dpi: f32) -> Result<GaugeAnalysis> {
        validate_dpi(dpi)?;
        Ok(self.run(mask.clone(), dpi, 0))
    }

    fn run(&self, mask: StructuralMask, dpi: f32, padding_px: u32) -> GaugeAnalysis {
        let Some(bounds) = mask.silhouette_bounds() else {
            return GaugeAnalysis::aborted(GaugeError::NoStampDetected, padding_px);
        };
        let enhanced = StructuralEnhancer::new(self.config.enhance.clone()).enhance(&mask);

        let stages = EdgeStages {
            extractor: EdgeRegionExtractor::new(self.config.region.clone()),
            detector: TicDetector::new(self.config.detection.clone(), dpi),
            clusterer: TicClusterer::from_config(&self.config.cluster, dpi),
            calculator: GaugeCalculator::new(self.config.calculation.clone(), dpi),
            offset: padding_px as f32,
        };

        let edges: Vec<EdgeReport> = Edge::ALL
            .par_iter()
            .map(|&edge| stages.analyze(&enhanced, bounds, edge))
            .collect();

        let results: Vec<EdgeGaugeResult> = edges
            .iter()
            .filter_map(|r| r.outcome.as_ref().ok().cloned())
            .collect();
        let measurement = SideSelector.select(&results);

        GaugeAnalysis {
            measurement,
            failure: None,
            edges,
            padding_px,
            mask: self.config.keep_mask.then_some(enhanced),
        }
    }
}

/// Per-edge stages shared read-only by the parallel edge runs.
struct EdgeStages {
    extractor: EdgeRegionExtractor,
    detector: TicDetector,
    clusterer: TicClusterer,
    calculator: GaugeCalculator,
    offset: f32,
}

impl EdgeStages {
    fn analyze(&self, mask: &StructuralMask, bounds: BoundingBox, edge: Edge) -> EdgeReport {
        let region = match self.extractor.extract_edge(mask, Some(bounds), edge) {
            Ok(region) => region,
            Err(err) => {
                debug!("{}", err);
                return EdgeReport::failed(edge, err);
            }
        };

        let detection = self.detector.detect(&region.line);
        let raw_tics: Vec<Tic> = detection
            .tics
            .into_iter()
            .map(|t| t.translated(-self.offset, -self.offset))
            .collect();
        let tics = self.clusterer.cluster(&raw_tics);
        let outcome = self.calculator.calculate(edge, &tics);
        debug!(
            "{} edge: {} raw tics, {} clustered, gauge {:?}",
            edge,
            raw_tics.len(),
            tics.len(),
            outcome.as_ref().map(|r| r.gauge)
        );

        EdgeReport {
            edge,
            strategy: Some(region.strategy),
            strip: Some(region.rect),
            sample_count: region.line.len(),
            raw_tics,
            tics,
            pass: Some(detection.pass),
            outcome,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mask::MaskClass;

    /// Stamp body with 6px wide, 8px deep slots every `spacing` pixels along
    /// the top edge.
    fn perforated_mask(spacing: u32) -> StructuralMask {
        StructuralMask::from_fn(600, 300, |x, y| {
            let inside = (40..560).contains(&x) && (40..260).contains(&y);
            let notch = y < 48 && (80..520).contains(&x) && (x - 80) % spacing < 6;
            if inside && !notch {
                MaskClass::StampBody
            } else {
                MaskClass::Background
            }
        })
    }

    fn pipeline() -> GaugePipeline {
        GaugePipeline::new(GaugeConfig::default()).unwrap()
    }

    #[test]
    fn test_rejects_invalid_config() {
        let mut config = GaugeConfig::default();
        config.region.strategies.clear();
        assert!(GaugePipeline::new(config).is_err());
    }

    #[test]
    fn test_empty_mask_aborts() {
        let mask = StructuralMask::new(100, 100, MaskClass::Background);
        let analysis = pipeline().analyze_mask(&mask, 800.0).unwrap();
        assert_eq!(analysis.failure, Some(GaugeError::NoStampDetected));
        assert_eq!(analysis.measurement, GaugeMeasurement::empty());
        assert!(analysis.edges.is_empty());
    }

    #[test]
    fn test_invalid_dpi() {
        let mask = StructuralMask::new(10, 10, MaskClass::StampBody);
        assert!(pipeline().analyze_mask(&mask, 0.0).is_err());
    }

    #[test]
    fn test_top_edge_of_notched_mask() {
        let analysis = pipeline().analyze_mask(&perforated_mask(44), 800.0).unwrap();
        assert_eq!(analysis.failure, None);
        assert_eq!(analysis.edges.len(), 4);
        assert_eq!(
            analysis.edges.iter().map(|r| r.edge).collect::<Vec<_>>(),
            Edge::ALL.to_vec()
        );

        let top = analysis.report(Edge::Top).unwrap();
        assert_eq!(top.strategy, Some(RegionStrategy::StampBounds));
        let result = top.outcome.as_ref().unwrap();
        assert_eq!(result.tic_count, 10);
        assert_eq!(result.median_spacing_px, 44.0);

        // the other edges are straight
        for edge in [Edge::Bottom, Edge::Left, Edge::Right] {
            let report = analysis.report(edge).unwrap();
            assert!(matches!(
                report.outcome,
                Err(GaugeError::InsufficientTics { .. })
            ));
        }
        assert_eq!(analysis.measurement.vertical_gauge, 0.0);
        assert!((analysis.measurement.horizontal_gauge - 14.32).abs() < 0.05);
        assert!(analysis.mask.is_none());
    }

    #[test]
    fn test_keep_mask() {
        let config = GaugeConfig {
            keep_mask: true,
            ..GaugeConfig::default()
        };
        let pipeline = GaugePipeline::new(config).unwrap();
        let analysis = pipeline.analyze_mask(&perforated_mask(44), 800.0).unwrap();
        let mask = analysis.mask.unwrap();
        assert_eq!(mask.dimensions(), (600, 300));
        assert!(mask.count(MaskClass::Edge) > 0);
    }
}
