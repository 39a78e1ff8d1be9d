//! Canny edge detection over rendered structural masks.
//!
//! Sobel gradients are computed row-parallel with rayon, thinned with
//! non-maximum suppression and linked with hysteresis. No smoothing pass is
//! applied: the input is a piecewise constant mask, not a noisy photograph.

use std::f32::consts::PI;

use image::{GrayImage, ImageBuffer, Luma};
use imageproc::definitions::{HasBlack, HasWhite};
use rayon::prelude::*;

type FloatImage = ImageBuffer<Luma<f32>, Vec<f32>>;

/// Binary edge map of `image`: 255 on edges, 0 elsewhere.
///
/// # Algorithm Pipeline
///
/// 1. Parallel Sobel gradient computation (Gx, Gy)
/// 2. Gradient magnitude
/// 3. Non-maximum suppression along the quantized gradient direction
/// 4. Hysteresis linking of weak edges to strong ones
pub fn canny_edges(image: &GrayImage, low_threshold: f32, high_threshold: f32) -> GrayImage {
    let (width, height) = image.dimensions();
    let (gx, gy) = sobel_gradients(image);

    let magnitude: Vec<f32> = gx
        .par_iter()
        .zip(gy.par_iter())
        .map(|(dx, dy)| dx.hypot(*dy))
        .collect();

    let thinned = non_maximum_suppression(&magnitude, &gx, &gy, width, height);
    hysteresis(&thinned, low_threshold, high_threshold)
}

/// Horizontal and vertical Sobel responses, row major.
///
/// Border rows and columns are left at zero.
///
/// ```text
/// Gx: [-1 0 1]   Gy: [-1 -2 -1]
///     [-2 0 2]       [ 0  0  0]
///     [-1 0 1]       [ 1  2  1]
/// ```
pub fn sobel_gradients(image: &GrayImage) -> (Vec<f32>, Vec<f32>) {
    let (width, height) = image.dimensions();
    let w = width as usize;
    let h = height as usize;
    let mut gx = vec![0.0f32; w * h];
    let mut gy = vec![0.0f32; w * h];
    if w < 3 || h < 3 {
        return (gx, gy);
    }

    let pixels = image.as_raw();
    const SOBEL_KERNEL_X: [f32; 9] = [-1.0, 0.0, 1.0, -2.0, 0.0, 2.0, -1.0, 0.0, 1.0];
    const SOBEL_KERNEL_Y: [f32; 9] = [-1.0, -2.0, -1.0, 0.0, 0.0, 0.0, 1.0, 2.0, 1.0];

    gx.par_chunks_mut(w)
        .zip(gy.par_chunks_mut(w))
        .enumerate()
        .skip(1)
        .take(h - 2)
        .for_each(|(y, (gx_row, gy_row))| {
            let rows = [
                &pixels[(y - 1) * w..y * w],
                &pixels[y * w..(y + 1) * w],
                &pixels[(y + 1) * w..(y + 2) * w],
            ];
            for x in 1..w - 1 {
                let mut sx = 0.0;
                let mut sy = 0.0;
                for (ky, row) in rows.iter().enumerate() {
                    for kx in 0..3 {
                        let pixel = row[x + kx - 1] as f32;
                        sx += pixel * SOBEL_KERNEL_X[ky * 3 + kx];
                        sy += pixel * SOBEL_KERNEL_Y[ky * 3 + kx];
                    }
                }
                gx_row[x] = sx;
                gy_row[x] = sy;
            }
        });

    (gx, gy)
}

/// Keep only pixels that are maximal along their gradient direction.
fn non_maximum_suppression(
    magnitude: &[f32],
    gx: &[f32],
    gy: &[f32],
    width: u32,
    height: u32,
) -> FloatImage {
    const RADIANS_TO_DEGREES: f32 = 180f32 / PI;

    let mut out = ImageBuffer::from_pixel(width, height, Luma([0.0f32]));
    if width < 3 || height < 3 {
        return out;
    }
    let w = width as usize;
    let at = |x: u32, y: u32| magnitude[y as usize * w + x as usize];

    for y in 1..height - 1 {
        for x in 1..width - 1 {
            let idx = y as usize * w + x as usize;
            let pixel = magnitude[idx];
            if pixel == 0.0 {
                continue;
            }

            let mut angle = gy[idx].atan2(gx[idx]) * RADIANS_TO_DEGREES;
            if angle < 0.0 {
                angle += 180.0
            }

            let (cmp1, cmp2) = if !(22.5..157.5).contains(&angle) {
                (at(x - 1, y), at(x + 1, y))
            } else if angle < 67.5 {
                (at(x + 1, y + 1), at(x - 1, y - 1))
            } else if angle < 112.5 {
                (at(x, y - 1), at(x, y + 1))
            } else {
                (at(x - 1, y + 1), at(x + 1, y - 1))
            };

            if pixel >= cmp1 && pixel >= cmp2 {
                out.put_pixel(x, y, Luma([pixel]));
            }
        }
    }
    out
}

/// Trace edges from pixels above `high_thresh` through 8-connected
/// neighbours above `low_thresh`.
fn hysteresis(input: &FloatImage, low_thresh: f32, high_thresh: f32) -> GrayImage {
    let max_brightness = Luma::<u8>::white();
    let (width, height) = input.dimensions();
    let mut out = ImageBuffer::from_pixel(width, height, Luma::<u8>::black());
    let mut stack = Vec::new();

    for y in 0..height {
        for x in 0..width {
            if input.get_pixel(x, y)[0] < high_thresh || out.get_pixel(x, y)[0] != 0 {
                continue;
            }
            out.put_pixel(x, y, max_brightness);
            stack.push((x, y));

            while let Some((nx, ny)) = stack.pop() {
                for dy in -1i64..=1 {
                    for dx in -1i64..=1 {
                        let px = nx as i64 + dx;
                        let py = ny as i64 + dy;
                        if px < 0 || py < 0 || px >= width as i64 || py >= height as i64 {
                            continue;
                        }
                        let (px, py) = (px as u32, py as u32);
                        if input.get_pixel(px, py)[0] >= low_thresh
                            && out.get_pixel(px, py)[0] == 0
                        {
                            out.put_pixel(px, py, max_brightness);
                            stack.push((px, py));
                        }
                    }
                }
            }
        }
    }
    out
}
