//! Reduction of a scan to the three class structural mask.
//!
//! Ink and color are thrown away: the stamp silhouette is segmented with a
//! global Otsu threshold OR'd with a local adaptive threshold, cleaned with a
//! close/open pass, and pixels inside it that are closer to the background
//! level than to the stamp level are kept as perforation holes.

use image::{GrayImage, Luma};
use imageproc::contrast::otsu_level;
use imageproc::distance_transform::Norm;
use imageproc::filter::box_filter;
use imageproc::morphology::{close, open};

use crate::config::{Background, MonotoneConfig};
use crate::error::{GaugeError, Result};
use crate::mask::{MaskClass, StructuralMask};
use crate::raster::{border_mean, intensity_range, invert, pad, StampImage};

/// Border intensity above which [`Background::Auto`] assumes a light backing
const LIGHT_BACKGROUND_LEVEL: f32 = 128.0;

/// Converts a scan into a [`StructuralMask`].
#[derive(Debug, Clone)]
pub struct MonotoneConverter {
    config: MonotoneConfig,
}

impl MonotoneConverter {
    pub fn new(config: MonotoneConfig) -> Self {
        Self { config }
    }

    /// Background margin in pixels added on each side by [`convert`](Self::convert).
    pub fn margin_px(&self, dpi: f32) -> u32 {
        (self.config.background_margin_mm * crate::raster::pixels_per_mm(dpi)).round() as u32
    }

    /// Segment a scan. The returned mask is larger than the image by
    /// [`margin_px`](Self::margin_px) on every side.
    ///
    /// # Errors
    ///
    /// [`GaugeError::NoStampDetected`] when no silhouette pixel survives.
    pub fn convert(&self, image: &StampImage) -> Result<StructuralMask> {
        let gray = self.normalize(image.gray());
        let margin = self.margin_px(image.dpi());
        self.segment(&pad(&gray, margin, background_fill(&gray)))
    }

    /// Flip a light background scan so the stamp is always the bright side.
    ///
    /// [`Background::Auto`] judges by the image border, so close-cropped
    /// scans whose border is mostly stamp need an explicit background.
    pub fn normalize(&self, gray: &GrayImage) -> GrayImage {
        let light = match self.config.background {
            Background::Dark => false,
            Background::Light => true,
            Background::Auto => border_mean(gray) > LIGHT_BACKGROUND_LEVEL,
        };
        if light {
            debug!("light background, inverting intensities");
            invert(gray)
        } else {
            gray.clone()
        }
    }

    /// Segment an already normalized intensity image without padding it.
    pub fn segment(&self, gray: &GrayImage) -> Result<StructuralMask> {
        let (width, height) = gray.dimensions();
        let (lo, hi) = intensity_range(gray);
        if hi.saturating_sub(lo) < self.config.min_contrast {
            debug!("intensity range {}..{} below contrast floor", lo, hi);
            return Err(GaugeError::NoStampDetected);
        }

        let level = otsu_level(gray);
        let silhouette = self.silhouette(gray, level);
        let cutoff = self.hole_cutoff(gray, level);
        let mask = StructuralMask::from_fn(width, height, |x, y| {
            if silhouette.get_pixel(x, y)[0] == 0 {
                MaskClass::Background
            } else if gray.get_pixel(x, y)[0] < cutoff {
                MaskClass::PerforationHole
            } else {
                MaskClass::StampBody
            }
        });

        let background = mask.count(MaskClass::Background);
        debug!(
            "monotone mask: {} body, {} hole, {} background",
            mask.count(MaskClass::StampBody),
            mask.count(MaskClass::PerforationHole),
            background
        );
        if background == mask.classes().len() {
            return Err(GaugeError::NoStampDetected);
        }
        Ok(mask)
    }

    /// Intensity below which a silhouette pixel shows the backing through a
    /// hole: the configured cutoff, capped at the midpoint between the mean
    /// background and mean stamp levels so pale stamps stay stamp body.
    fn hole_cutoff(&self, gray: &GrayImage, level: u8) -> u8 {
        let (dark, bright) = class_means(gray, level);
        let midpoint = ((dark + bright) / 2.0).round() as u8;
        debug!("class means {:.1} / {:.1}, hole midpoint {}", dark, bright, midpoint);
        self.config.hole_cutoff.min(midpoint)
    }

    /// Binary silhouette: 255 inside the stamp, 0 outside.
    fn silhouette(&self, gray: &GrayImage, level: u8) -> GrayImage {
        let radius = self.config.adaptive_block_radius;
        let local_mean = box_filter(gray, radius, radius);
        let offset = self.config.adaptive_offset;
        debug!("otsu level {}", level);

        let raw = GrayImage::from_fn(gray.width(), gray.height(), |x, y| {
            let v = gray.get_pixel(x, y)[0];
            let global = v > level;
            let local = v as i16 > local_mean.get_pixel(x, y)[0] as i16 + offset;
            Luma([if global || local { 255 } else { 0 }])
        });

        let k = self.config.morphology_radius;
        if k == 0 {
            return raw;
        }
        open(&close(&raw, Norm::L1, k), Norm::L1, k)
    }
}

/// Padding intensity for a normalized scan: the border mean when the border
/// is background, else the darkest pixel.
fn background_fill(gray: &GrayImage) -> u8 {
    let mean = border_mean(gray);
    if mean <= LIGHT_BACKGROUND_LEVEL {
        mean.round() as u8
    } else {
        intensity_range(gray).0
    }
}

/// Mean intensity at or below and above the Otsu level. An empty class
/// takes the level itself.
fn class_means(gray: &GrayImage, level: u8) -> (f32, f32) {
    let (mut dark, mut bright) = ((0u64, 0u64), (0u64, 0u64));
    for &v in gray.as_raw() {
        let class = if v > level { &mut bright } else { &mut dark };
        class.0 += v as u64;
        class.1 += 1;
    }
    let mean = |(sum, count): (u64, u64)| {
        if count == 0 {
            level as f32
        } else {
            sum as f32 / count as f32
        }
    };
    (mean(dark), mean(bright))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stamp_on(background: u8, stamp: u8) -> GrayImage {
        GrayImage::from_fn(80, 60, |x, y| {
            if (20..60).contains(&x) && (15..45).contains(&y) {
                Luma([stamp])
            } else {
                Luma([background])
            }
        })
    }

    #[test]
    fn test_uniform_image_has_no_stamp() {
        let converter = MonotoneConverter::new(MonotoneConfig::default());
        let image = StampImage::new(GrayImage::new(50, 50), 800.0).unwrap();
        assert_eq!(converter.convert(&image), Err(GaugeError::NoStampDetected));
    }

    #[test]
    fn test_segments_bright_stamp_on_dark_bed() {
        let converter = MonotoneConverter::new(MonotoneConfig::default());
        let mask = converter.segment(&stamp_on(15, 200)).unwrap();
        assert_eq!(mask.get(40, 30), MaskClass::StampBody);
        assert_eq!(mask.get(5, 5), MaskClass::Background);
        let bounds = mask.silhouette_bounds().unwrap();
        assert_eq!((bounds.min_x, bounds.max_x), (20, 59));
        assert_eq!((bounds.min_y, bounds.max_y), (15, 44));
    }

    #[test]
    fn test_light_background_is_inverted() {
        let converter = MonotoneConverter::new(MonotoneConfig::default());
        let normalized = converter.normalize(&stamp_on(235, 90));
        assert_eq!(normalized.get_pixel(0, 0)[0], 20);
        assert_eq!(normalized.get_pixel(40, 30)[0], 165);
        let mask = converter.segment(&normalized).unwrap();
        assert_eq!(mask.get(40, 30), MaskClass::StampBody);
    }

    #[test]
    fn test_dark_pixels_inside_silhouette_are_holes() {
        let mut gray = stamp_on(10, 200);
        // a small dark blemish well inside the stamp, closed over by the
        // morphology pass
        for y in 29..31 {
            for x in 39..41 {
                gray.put_pixel(x, y, Luma([10]));
            }
        }
        let converter = MonotoneConverter::new(MonotoneConfig::default());
        let mask = converter.segment(&gray).unwrap();
        assert_eq!(mask.get(39, 29), MaskClass::PerforationHole);
        assert_eq!(mask.get(5, 5), MaskClass::Background);
        for (x, y) in [(39, 29), (40, 30)] {
            assert!(mask.get(x, y).is_silhouette());
        }
    }

    #[test]
    fn test_pale_stamp_on_white_backing_stays_body() {
        let mut gray = stamp_on(245, 205);
        for y in 29..31 {
            for x in 39..41 {
                gray.put_pixel(x, y, Luma([245]));
            }
        }
        let converter = MonotoneConverter::new(MonotoneConfig::default());
        let normalized = converter.normalize(&gray);
        assert_eq!(normalized.get_pixel(40, 20)[0], 50);
        let mask = converter.segment(&normalized).unwrap();
        assert_eq!(mask.get(25, 20), MaskClass::StampBody);
        assert_eq!(mask.get(39, 29), MaskClass::PerforationHole);
        assert_eq!(mask.get(5, 5), MaskClass::Background);
        assert!(mask.count(MaskClass::StampBody) > mask.count(MaskClass::PerforationHole));
    }

    #[test]
    fn test_class_means_split_at_level() {
        let gray = stamp_on(10, 50);
        let (dark, bright) = class_means(&gray, 10);
        assert_eq!((dark, bright), (10.0, 50.0));
        // nothing above the level: the bright class falls back to it
        assert_eq!(class_means(&gray, 50), (20.0, 50.0));
    }

    #[test]
    fn test_convert_pads_by_margin() {
        let converter = MonotoneConverter::new(MonotoneConfig::default());
        let image = StampImage::new(stamp_on(15, 200), 800.0).unwrap();
        let margin = converter.margin_px(800.0);
        assert_eq!(margin, 47);
        let mask = converter.convert(&image).unwrap();
        assert_eq!(mask.dimensions(), (80 + 2 * margin, 60 + 2 * margin));
        assert_eq!(mask.get(40 + margin, 30 + margin), MaskClass::StampBody);
    }

    #[test]
    fn test_close_cropped_scan_gains_a_boundary() {
        // the stamp fills the scan apart from one dark notch on the top row
        let gray = GrayImage::from_fn(60, 40, |x, y| {
            Luma([if y < 4 && (28..32).contains(&x) { 15 } else { 200 }])
        });
        let converter = MonotoneConverter::new(MonotoneConfig {
            background: Background::Dark,
            ..MonotoneConfig::default()
        });
        assert_eq!(background_fill(&gray), 15);

        let image = StampImage::new(gray, 800.0).unwrap();
        let margin = converter.margin_px(800.0);
        let mask = converter.convert(&image).unwrap();
        assert_eq!(mask.get(0, 0), MaskClass::Background);
        assert_eq!(mask.get(margin + 10, margin + 10), MaskClass::StampBody);
        let bounds = mask.silhouette_bounds().unwrap();
        assert_eq!((bounds.min_x, bounds.min_y), (margin, margin));
    }
}
