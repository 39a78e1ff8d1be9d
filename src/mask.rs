//! The structural map the pipeline reduces a scan to.

use image::{GrayImage, Luma};
use serde::{Deserialize, Serialize};

/// Symbolic pixel class of a [`StructuralMask`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MaskClass {
    Background,
    StampBody,
    /// Dark pixel inside the stamp silhouette
    PerforationHole,
    /// Transient marker written by the structural enhancer over detected
    /// edges. Boundary tracing treats it as neither body nor hole.
    Edge,
}

impl MaskClass {
    /// Intensity used when rendering the mask
    pub fn luma(self) -> u8 {
        match self {
            MaskClass::Background => 0,
            MaskClass::PerforationHole => 64,
            MaskClass::StampBody => 160,
            MaskClass::Edge => 255,
        }
    }

    /// Part of the stamp silhouette
    pub fn is_silhouette(self) -> bool {
        matches!(self, MaskClass::StampBody | MaskClass::PerforationHole)
    }
}

/// Inclusive pixel rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min_x: u32,
    pub min_y: u32,
    pub max_x: u32,
    pub max_y: u32,
}

impl BoundingBox {
    pub fn width(&self) -> u32 {
        self.max_x - self.min_x + 1
    }

    pub fn height(&self) -> u32 {
        self.max_y - self.min_y + 1
    }

    pub fn shorter_side(&self) -> u32 {
        self.width().min(self.height())
    }
}

/// Raster of [`MaskClass`] values, row major.
///
/// Produced by the monotone converter with three classes only; every
/// perforation hole pixel lies inside the silhouette.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructuralMask {
    width: u32,
    height: u32,
    classes: Vec<MaskClass>,
}

impl StructuralMask {
    pub fn new(width: u32, height: u32, fill: MaskClass) -> Self {
        Self {
            width,
            height,
            classes: vec![fill; (width as usize) * (height as usize)],
        }
    }

    pub fn from_fn<F>(width: u32, height: u32, mut f: F) -> Self
    where
        F: FnMut(u32, u32) -> MaskClass,
    {
        let mut classes = Vec::with_capacity((width as usize) * (height as usize));
        for y in 0..height {
            for x in 0..width {
                classes.push(f(x, y));
            }
        }
        Self {
            width,
            height,
            classes,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Class at `(x, y)`. Panics when out of bounds, like `GrayImage::get_pixel`.
    #[inline]
    pub fn get(&self, x: u32, y: u32) -> MaskClass {
        self.classes[self.index(x, y)]
    }

    #[inline]
    pub fn set(&mut self, x: u32, y: u32, class: MaskClass) {
        let idx = self.index(x, y);
        self.classes[idx] = class;
    }

    pub fn classes(&self) -> &[MaskClass] {
        &self.classes
    }

    pub fn count(&self, class: MaskClass) -> usize {
        self.classes.iter().filter(|&&c| c == class).count()
    }

    /// Bounding box of stamp body and hole pixels, `None` if there are none.
    pub fn silhouette_bounds(&self) -> Option<BoundingBox> {
        let mut bounds: Option<BoundingBox> = None;
        for y in 0..self.height {
            for x in 0..self.width {
                if !self.get(x, y).is_silhouette() {
                    continue;
                }
                bounds = Some(match bounds {
                    None => BoundingBox {
                        min_x: x,
                        min_y: y,
                        max_x: x,
                        max_y: y,
                    },
                    Some(b) => BoundingBox {
                        min_x: b.min_x.min(x),
                        min_y: b.min_y.min(y),
                        max_x: b.max_x.max(x),
                        max_y: b.max_y.max(y),
                    },
                });
            }
        }
        bounds
    }

    /// Render to grayscale using [`MaskClass::luma`] levels.
    pub fn to_luma(&self) -> GrayImage {
        GrayImage::from_fn(self.width, self.height, |x, y| Luma([self.get(x, y).luma()]))
    }

    #[inline]
    fn index(&self, x: u32, y: u32) -> usize {
        assert!(x < self.width && y < self.height, "mask index out of bounds");
        (y as usize) * (self.width as usize) + x as usize
    }
}
