//! Edge strips and the boundary lines traced inside them.

use serde::{Deserialize, Serialize};

use crate::config::{RegionConfig, RegionStrategy};
use crate::edge::{Axis, Edge};
use crate::error::{GaugeError, Result};
use crate::mask::{BoundingBox, MaskClass, StructuralMask};

/// Pixel rectangle, `x`/`y` is the top-left corner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// One scan line's boundary crossing, in image coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundarySample {
    /// Coordinate along the edge (x for top/bottom, y for left/right)
    pub position: f32,
    /// Perpendicular coordinate of the boundary
    pub depth: f32,
}

/// The scalloped silhouette curve of one edge, ordered along the edge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoundaryLine {
    pub edge: Edge,
    pub samples: Vec<BoundarySample>,
}

impl BoundaryLine {
    /// Build a line, sorting the samples along the edge.
    pub fn new(edge: Edge, mut samples: Vec<BoundarySample>) -> Self {
        samples.sort_by(|a, b| a.position.total_cmp(&b.position));
        Self { edge, samples }
    }

    /// Number of traced scan lines
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

/// Working strip of one edge and its traced boundary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EdgeRegion {
    pub edge: Edge,
    /// Strategy that produced this strip
    pub strategy: RegionStrategy,
    /// Strip in mask coordinates; `(rect.x, rect.y)` is the strip offset
    pub rect: Rect,
    /// Boundary in mask coordinates
    pub line: BoundaryLine,
}

impl EdgeRegion {
    /// Top-left corner of the strip in mask coordinates.
    pub fn offset(&self) -> (u32, u32) {
        (self.rect.x, self.rect.y)
    }
}

/// Places edge strips and traces their boundary lines.
#[derive(Debug, Clone)]
pub struct EdgeRegionExtractor {
    config: RegionConfig,
}

impl EdgeRegionExtractor {
    pub fn new(config: RegionConfig) -> Self {
        Self { config }
    }

    /// One outcome per edge, in [`Edge::ALL`] order.
    pub fn extract(
        &self,
        mask: &StructuralMask,
        bounds: Option<BoundingBox>,
    ) -> Vec<Result<EdgeRegion>> {
        Edge::ALL
            .iter()
            .map(|&edge| self.extract_edge(mask, bounds, edge))
            .collect()
    }

    /// Try each configured strategy in order until one traces at least
    /// `min_samples` boundary samples.
    ///
    /// # Errors
    ///
    /// [`GaugeError::InsufficientBoundarySamples`] with the best sample count
    /// seen when no strategy succeeds.
    pub fn extract_edge(
        &self,
        mask: &StructuralMask,
        bounds: Option<BoundingBox>,
        edge: Edge,
    ) -> Result<EdgeRegion> {
        let minimum = self.config.min_samples;
        let mut best = 0;
        for &strategy in &self.config.strategies {
            let Some(rect) = self.strip(mask, bounds, edge, strategy) else {
                continue;
            };
            let line = self.trace(mask, rect, edge);
            debug!(
                "{} edge: {:?} strip {:?} traced {} samples",
                edge,
                strategy,
                rect,
                line.len()
            );
            if line.len() >= minimum {
                return Ok(EdgeRegion {
                    edge,
                    strategy,
                    rect,
                    line,
                });
            }
            best = best.max(line.len());
        }
        Err(GaugeError::InsufficientBoundarySamples {
            edge,
            samples: best,
            minimum,
        })
    }

    /// Strip rectangle for an edge, `None` when the strategy does not apply.
    pub fn strip(
        &self,
        mask: &StructuralMask,
        bounds: Option<BoundingBox>,
        edge: Edge,
        strategy: RegionStrategy,
    ) -> Option<Rect> {
        let (width, height) = mask.dimensions();
        if width == 0 || height == 0 {
            return None;
        }
        match strategy {
            RegionStrategy::StampBounds => {
                let b = bounds?;
                let depth = (b.shorter_side() / self.config.bounded_depth_divisor)
                    .min(self.config.bounded_max_depth_px)
                    .max(1);
                let rect = match edge {
                    Edge::Top => Rect {
                        x: b.min_x,
                        y: b.min_y,
                        width: b.width(),
                        height: (depth + 1).min(b.height()),
                    },
                    Edge::Bottom => {
                        let y = b.max_y.saturating_sub(depth).max(b.min_y);
                        Rect {
                            x: b.min_x,
                            y,
                            width: b.width(),
                            height: b.max_y - y + 1,
                        }
                    }
                    Edge::Left => Rect {
                        x: b.min_x,
                        y: b.min_y,
                        width: (depth + 1).min(b.width()),
                        height: b.height(),
                    },
                    Edge::Right => {
                        let x = b.max_x.saturating_sub(depth).max(b.min_x);
                        Rect {
                            x,
                            y: b.min_y,
                            width: b.max_x - x + 1,
                            height: b.height(),
                        }
                    }
                };
                Some(rect)
            }
            RegionStrategy::FixedStrip => {
                let depth = (width.min(height) / self.config.fixed_depth_divisor)
                    .min(self.config.fixed_max_depth_px)
                    .max(1);
                let rect = match edge {
                    Edge::Top => Rect {
                        x: 0,
                        y: 0,
                        width,
                        height: depth,
                    },
                    Edge::Bottom => Rect {
                        x: 0,
                        y: height - depth,
                        width,
                        height: depth,
                    },
                    Edge::Left => Rect {
                        x: 0,
                        y: 0,
                        width: depth,
                        height,
                    },
                    Edge::Right => Rect {
                        x: width - depth,
                        y: 0,
                        width: depth,
                        height,
                    },
                };
                Some(rect)
            }
        }
    }

    /// Trace the boundary inside `rect`: one sample per scan line, at the
    /// deepest hole pixel when it lies beyond the first body pixel, else at
    /// the first body pixel met coming in from outside the stamp.
    pub fn trace(&self, mask: &StructuralMask, rect: Rect, edge: Edge) -> BoundaryLine {
        let (along_range, across_range) = match edge.axis() {
            Axis::Horizontal => (rect.x..rect.x + rect.width, rect.y..rect.y + rect.height),
            Axis::Vertical => (rect.y..rect.y + rect.height, rect.x..rect.x + rect.width),
        };
        let inward: Vec<u32> = if edge.inward_is_increasing() {
            across_range.collect()
        } else {
            across_range.rev().collect()
        };

        let samples = along_range
            .step_by(self.config.scan_step.max(1) as usize)
            .filter_map(|along| {
                let mut first_body = None;
                let mut deepest_hole = None;
                for (i, &across) in inward.iter().enumerate() {
                    let (x, y) = match edge.axis() {
                        Axis::Horizontal => (along, across),
                        Axis::Vertical => (across, along),
                    };
                    match mask.get(x, y) {
                        MaskClass::StampBody if first_body.is_none() => {
                            first_body = Some((i, across))
                        }
                        MaskClass::PerforationHole => deepest_hole = Some((i, across)),
                        _ => {}
                    }
                }
                let depth = match (first_body, deepest_hole) {
                    (Some((bi, body)), Some((hi, hole))) => {
                        if hi > bi {
                            hole
                        } else {
                            body
                        }
                    }
                    (Some((_, body)), None) => body,
                    (None, Some((_, hole))) => hole,
                    (None, None) => return None,
                };
                Some(BoundarySample {
                    position: along as f32,
                    depth: depth as f32,
                })
            })
            .collect();

        BoundaryLine::new(edge, samples)
    }
}
