//! Input raster and the intensity helpers that run before segmentation.

use image::{DynamicImage, GrayImage, Luma};

use crate::error::{GaugeError, Result};

/// Millimetres per inch, for DPI conversions
pub const MM_PER_INCH: f32 = 25.4;

/// Pixels covering one millimetre at the given scan resolution
pub fn pixels_per_mm(dpi: f32) -> f32 {
    dpi / MM_PER_INCH
}

/// A decoded single channel scan and the resolution it was scanned at.
///
/// The pipeline only ever reads from it.
#[derive(Debug, Clone)]
pub struct StampImage {
    gray: GrayImage,
    dpi: f32,
}

impl StampImage {
    /// Wrap an 8-bit grayscale buffer.
    ///
    /// # Errors
    ///
    /// Returns [`GaugeError::InvalidParameter`] when the DPI is not a positive
    /// finite number or the image has no pixels.
    pub fn new(gray: GrayImage, dpi: f32) -> Result<Self> {
        validate_dpi(dpi)?;
        if gray.width() == 0 || gray.height() == 0 {
            return Err(GaugeError::invalid(
                "image",
                format!("{}x{}", gray.width(), gray.height()),
            ));
        }
        Ok(Self { gray, dpi })
    }

    /// Reduce a decoded color or grayscale image to a single intensity channel.
    pub fn from_dynamic(image: &DynamicImage, dpi: f32) -> Result<Self> {
        Self::new(image.to_luma8(), dpi)
    }

    /// The 8-bit intensity buffer, unmodified.
    pub fn gray(&self) -> &GrayImage {
        &self.gray
    }

    /// Scan resolution in dots per inch. All millimetre based thresholds
    /// (margin, cluster radius, minimum tic spacing) scale with it.
    pub fn dpi(&self) -> f32 {
        self.dpi
    }

    /// `(width, height)` in pixels
    pub fn dimensions(&self) -> (u32, u32) {
        self.gray.dimensions()
    }

    /// Pixels covering one millimetre of stamp.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use image::GrayImage;
    /// use perforation_gauge::StampImage;
    ///
    /// let image = StampImage::new(GrayImage::new(10, 10), 254.0)?;
    /// assert!((image.pixels_per_mm() - 10.0).abs() < 1e-4);
    /// # Ok::<(), perforation_gauge::GaugeError>(())
    /// ```
    pub fn pixels_per_mm(&self) -> f32 {
        pixels_per_mm(self.dpi)
    }
}

pub(crate) fn validate_dpi(dpi: f32) -> Result<()> {
    if dpi.is_finite() && dpi > 0.0 {
        Ok(())
    } else {
        Err(GaugeError::invalid("dpi", dpi))
    }
}

/// Mean intensity of the one pixel wide outer ring of the image.
pub(crate) fn border_mean(gray: &GrayImage) -> f32 {
    let (width, height) = gray.dimensions();
    if width == 0 || height == 0 {
        return 0.0;
    }
    let mut sum = 0u64;
    let mut count = 0u64;
    for (x, y, pixel) in gray.enumerate_pixels() {
        if x == 0 || y == 0 || x == width - 1 || y == height - 1 {
            sum += pixel[0] as u64;
            count += 1;
        }
    }
    sum as f32 / count as f32
}

/// Smallest and largest intensity in the image.
pub(crate) fn intensity_range(gray: &GrayImage) -> (u8, u8) {
    gray.as_raw()
        .iter()
        .fold((u8::MAX, u8::MIN), |(lo, hi), &v| (lo.min(v), hi.max(v)))
}

pub(crate) fn invert(gray: &GrayImage) -> GrayImage {
    GrayImage::from_fn(gray.width(), gray.height(), |x, y| {
        Luma([255 - gray.get_pixel(x, y)[0]])
    })
}

/// Surround the image with `margin` pixels of constant intensity.
pub(crate) fn pad(gray: &GrayImage, margin: u32, value: u8) -> GrayImage {
    if margin == 0 {
        return gray.clone();
    }
    let (width, height) = gray.dimensions();
    GrayImage::from_fn(width + 2 * margin, height + 2 * margin, |x, y| {
        if x < margin || y < margin || x >= width + margin || y >= height + margin {
            Luma([value])
        } else {
            *gray.get_pixel(x - margin, y - margin)
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_bad_dpi() {
        let gray = GrayImage::new(4, 4);
        assert!(StampImage::new(gray.clone(), 0.0).is_err());
        assert!(StampImage::new(gray.clone(), f32::NAN).is_err());
        assert!(StampImage::new(gray, 800.0).is_ok());
    }

    #[test]
    fn test_rejects_empty_image() {
        assert!(StampImage::new(GrayImage::new(0, 10), 800.0).is_err());
    }

    #[test]
    fn test_pixels_per_mm() {
        assert!((pixels_per_mm(800.0) - 31.496).abs() < 1e-3);
    }

    #[test]
    fn test_border_mean_ignores_interior() {
        let gray = GrayImage::from_fn(5, 5, |x, y| {
            if x == 2 && y == 2 {
                Luma([255])
            } else {
                Luma([10])
            }
        });
        assert_eq!(border_mean(&gray), 10.0);
    }

    #[test]
    fn test_pad_places_original_in_center() {
        let gray = GrayImage::from_pixel(2, 3, Luma([200]));
        let padded = pad(&gray, 2, 7);
        assert_eq!(padded.dimensions(), (6, 7));
        assert_eq!(padded.get_pixel(0, 0)[0], 7);
        assert_eq!(padded.get_pixel(2, 2)[0], 200);
        assert_eq!(padded.get_pixel(3, 4)[0], 200);
        assert_eq!(padded.get_pixel(4, 4)[0], 7);
    }

    #[test]
    fn test_intensity_range() {
        let gray = GrayImage::from_fn(3, 1, |x, _| Luma([(x as u8) * 40 + 5]));
        assert_eq!(intensity_range(&gray), (5, 85));
    }
}
