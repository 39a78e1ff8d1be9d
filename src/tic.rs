//! Detection of perforation indentations ("tics") along a boundary line.

use serde::{Deserialize, Serialize};

use crate::config::{DetectionConfig, DetectionMode, TicParams};
use crate::edge::Edge;
use crate::region::{BoundaryLine, BoundarySample};

/// A single perforation indentation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Tic {
    pub x: f32,
    pub y: f32,
    /// Deviation from the neighborhood mean, in pixels
    pub depth: f32,
    pub edge: Edge,
}

impl Tic {
    /// Position along the tic's edge
    pub fn along(&self) -> f32 {
        self.edge.along(self.x, self.y)
    }

    pub fn distance(&self, other: &Tic) -> f32 {
        (self.x - other.x).hypot(self.y - other.y)
    }

    pub fn translated(self, dx: f32, dy: f32) -> Tic {
        Tic {
            x: self.x + dx,
            y: self.y + dy,
            ..self
        }
    }
}

/// Parameter set that produced a tic list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DetectionPass {
    Standard,
    Sensitive,
}

/// Tics found on one boundary and the pass that found them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TicDetection {
    pub tics: Vec<Tic>,
    pub pass: DetectionPass,
}

/// Sliding window extremum detector.
#[derive(Debug, Clone)]
pub struct TicDetector {
    config: DetectionConfig,
    min_spacing_px: f32,
}

impl TicDetector {
    /// Build a detector for scans at `dpi`, resolving the minimum spacing
    /// rule to pixels once.
    pub fn new(config: DetectionConfig, dpi: f32) -> Self {
        let min_spacing_px = config.min_spacing.min_spacing_px(dpi);
        Self {
            config,
            min_spacing_px,
        }
    }

    /// Smallest allowed distance between two accepted tics
    pub fn min_spacing_px(&self) -> f32 {
        self.min_spacing_px
    }

    /// Detect tics according to the configured mode.
    ///
    /// In [`DetectionMode::Auto`] a sparse standard result on a long enough
    /// boundary is retried with the sensitive parameters, and the retry wins
    /// only when it finds materially more tics.
    pub fn detect(&self, line: &BoundaryLine) -> TicDetection {
        match self.config.mode {
            DetectionMode::Standard => TicDetection {
                tics: self.detect_with(line, self.config.standard),
                pass: DetectionPass::Standard,
            },
            DetectionMode::Sensitive => TicDetection {
                tics: self.detect_with(line, self.config.sensitive),
                pass: DetectionPass::Sensitive,
            },
            DetectionMode::Auto => {
                let standard = self.detect_with(line, self.config.standard);
                if standard.len() >= self.config.fallback_max_tics
                    || line.len() < self.config.fallback_min_samples
                {
                    return TicDetection {
                        tics: standard,
                        pass: DetectionPass::Standard,
                    };
                }
                let sensitive = self.detect_with(line, self.config.sensitive);
                debug!(
                    "{} edge: standard pass {} tics, sensitive pass {} tics",
                    line.edge,
                    standard.len(),
                    sensitive.len()
                );
                if sensitive.len() as f32 > standard.len() as f32 * self.config.fallback_gain {
                    TicDetection {
                        tics: sensitive,
                        pass: DetectionPass::Sensitive,
                    }
                } else {
                    TicDetection {
                        tics: standard,
                        pass: DetectionPass::Standard,
                    }
                }
            }
        }
    }

    /// One detection pass with explicit parameters.
    ///
    /// # Arguments
    ///
    /// * `line` - Traced boundary of one edge
    /// * `params` - Window half size in samples and depth threshold in pixels
    ///
    /// # Returns
    ///
    /// Accepted tics in order along the edge, in the line's coordinates.
    /// Lines shorter than one full window yield nothing.
    ///
    /// # Algorithm
    ///
    /// 1. Sort the samples along the edge
    /// 2. Keep samples that are the extremum of their window in the direction
    ///    into the stamp and deviate from the window mean by more than the
    ///    depth threshold
    /// 3. Drop candidates closer than the minimum spacing to an accepted tic
    pub fn detect_with(&self, line: &BoundaryLine, params: TicParams) -> Vec<Tic> {
        let edge = line.edge;
        let window = params.window;
        let mut samples: Vec<BoundarySample> = line.samples.clone();
        samples.sort_by(|a, b| a.position.total_cmp(&b.position));
        if samples.len() < 2 * window + 1 {
            return Vec::new();
        }

        let inward_max = edge.inward_is_increasing();
        let mut tics: Vec<Tic> = Vec::new();
        for i in window..samples.len() - window {
            let neighborhood = &samples[i - window..=i + window];
            let center = samples[i].depth;
            let mean =
                neighborhood.iter().map(|s| s.depth).sum::<f32>() / neighborhood.len() as f32;

            let is_tic = if inward_max {
                neighborhood.iter().all(|s| center >= s.depth)
                    && center > mean + params.depth_threshold
            } else {
                neighborhood.iter().all(|s| center <= s.depth)
                    && center < mean - params.depth_threshold
            };
            if !is_tic {
                continue;
            }

            let (x, y) = edge.to_xy(samples[i].position, center);
            let candidate = Tic {
                x,
                y,
                depth: (center - mean).abs(),
                edge,
            };
            if tics
                .iter()
                .all(|t| t.distance(&candidate) >= self.min_spacing_px)
            {
                tics.push(candidate);
            }
        }
        tics
    }
}
