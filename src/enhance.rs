//! Edge overlay that stabilizes boundary tracing on broken outlines.

use image::{GrayImage, Luma};
use imageproc::distance_transform::Norm;
use imageproc::morphology::close;

use crate::canny::canny_edges;
use crate::config::EnhanceConfig;
use crate::mask::{MaskClass, StructuralMask};

/// Marks structural edges of a mask with [`MaskClass::Edge`].
#[derive(Debug, Clone)]
pub struct StructuralEnhancer {
    config: EnhanceConfig,
}

impl StructuralEnhancer {
    pub fn new(config: EnhanceConfig) -> Self {
        Self { config }
    }

    /// Run every configured edge sensitivity over the rendered mask, close
    /// the combined edge map and overwrite edge pixels with the edge marker.
    pub fn enhance(&self, mask: &StructuralMask) -> StructuralMask {
        if !self.config.enabled {
            return mask.clone();
        }
        let edges = self.edge_map(mask);
        let mut enhanced = mask.clone();
        for (x, y, pixel) in edges.enumerate_pixels() {
            if pixel[0] > 0 {
                enhanced.set(x, y, MaskClass::Edge);
            }
        }
        debug!(
            "structural enhancer marked {} edge pixels",
            enhanced.count(MaskClass::Edge)
        );
        enhanced
    }

    /// Combined, closed edge map of the mask, 255 on edges.
    pub fn edge_map(&self, mask: &StructuralMask) -> GrayImage {
        let rendered = mask.to_luma();
        let mut combined = GrayImage::new(mask.width(), mask.height());
        for t in &self.config.hysteresis {
            let edges = canny_edges(&rendered, t.low, t.high);
            for (dst, src) in combined.pixels_mut().zip(edges.pixels()) {
                if src[0] > 0 {
                    *dst = Luma([255]);
                }
            }
        }
        if self.config.close_radius > 0 {
            close(&combined, Norm::L1, self.config.close_radius)
        } else {
            combined
        }
    }
}
