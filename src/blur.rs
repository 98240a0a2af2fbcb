//! Separable blurs over RGBA8 bitmaps.
//!
//! Both blurs run a horizontal and then a vertical pass of a 1-D kernel with
//! 16.16 fixed-point weights. Pixels are premultiplied for the passes so that
//! transparent neighbours do not bleed their colour into visible ones. Samples
//! past the edge repeat the edge pixel.

use image::RgbaImage;

/// Gaussian blur with standard deviation `radius`.
///
/// The kernel reaches out to `ceil(3 * radius)` pixels on either side. A radius
/// of zero or less leaves the image untouched.
pub fn gaussian_blur(img: &RgbaImage, radius: f32) -> RgbaImage {
    if radius.is_nan() || radius <= 0.0 {
        return img.clone();
    }
    let reach = kernel_reach(img, (3.0 * radius).ceil());
    let sigma = radius as f64;
    let denom = 2.0 * sigma * sigma;
    let weights: Vec<f64> = (-reach..=reach)
        .map(|i| {
            let x = i as f64;
            (-x * x / denom).exp()
        })
        .collect();
    convolve(img, &quantize(&weights))
}

/// Box blur averaging over `radius` pixels on either side.
///
/// Fractional radii are supported: the outermost pixel on each side contributes
/// with the fractional part of `radius` as its weight. A radius of zero or less
/// leaves the image untouched.
pub fn box_blur(img: &RgbaImage, radius: f32) -> RgbaImage {
    if radius.is_nan() || radius <= 0.0 {
        return img.clone();
    }
    let whole = radius.floor();
    let part = (radius - whole) as f64;
    let reach = kernel_reach(img, if part > 0.0 { whole + 1.0 } else { whole });
    let weights: Vec<f64> = (-reach..=reach)
        .map(|i| {
            if (i.unsigned_abs() as f32) <= whole {
                1.0
            } else {
                part
            }
        })
        .collect();
    convolve(img, &quantize(&weights))
}

/// Half-width of a kernel, never wider than the image itself.
fn kernel_reach(img: &RgbaImage, reach: f32) -> i32 {
    let limit = img.width().max(img.height()).max(1) as f32;
    reach.min(limit) as i32
}

/// Normalise weights to 16.16 fixed point, pushing any rounding slack into the centre tap.
fn quantize(weights: &[f64]) -> Vec<u32> {
    let sum: f64 = weights.iter().sum();
    if sum <= 0.0 {
        return vec![1 << 16];
    }

    let mut q: Vec<u32> = weights
        .iter()
        .map(|w| ((w / sum) * 65536.0).round().clamp(0.0, 65536.0) as u32)
        .collect();
    let acc: i64 = q.iter().map(|&w| i64::from(w)).sum();
    let delta = 65536 - acc;
    if delta != 0 {
        let mid = q.len() / 2;
        q[mid] = (i64::from(q[mid]) + delta).clamp(0, 65536) as u32;
    }
    q
}

fn convolve(img: &RgbaImage, kernel: &[u32]) -> RgbaImage {
    let (width, height) = img.dimensions();
    if width == 0 || height == 0 || kernel.len() <= 1 {
        return img.clone();
    }

    let src = premultiply(img.as_raw());
    let mut tmp = vec![0u8; src.len()];
    let mut out = vec![0u8; src.len()];
    pass(&src, &mut tmp, width, height, kernel, Axis::Horizontal);
    pass(&tmp, &mut out, width, height, kernel, Axis::Vertical);
    unpremultiply(&mut out);

    // buffer length matches the source dimensions by construction
    RgbaImage::from_raw(width, height, out).unwrap_or_else(|| img.clone())
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum Axis {
    Horizontal,
    Vertical,
}

fn pass(src: &[u8], dst: &mut [u8], width: u32, height: u32, kernel: &[u32], axis: Axis) {
    let radius = (kernel.len() / 2) as i32;
    let w = width as i32;
    let h = height as i32;
    for y in 0..h {
        for x in 0..w {
            let mut acc = [0u64; 4];
            for (ki, &kw) in kernel.iter().enumerate() {
                let d = ki as i32 - radius;
                let (sx, sy) = match axis {
                    Axis::Horizontal => ((x + d).clamp(0, w - 1), y),
                    Axis::Vertical => (x, (y + d).clamp(0, h - 1)),
                };
                let idx = ((sy * w + sx) as usize) * 4;
                for c in 0..4 {
                    acc[c] += u64::from(kw) * u64::from(src[idx + c]);
                }
            }
            let out_idx = ((y * w + x) as usize) * 4;
            for c in 0..4 {
                dst[out_idx + c] = q16_to_u8(acc[c]);
            }
        }
    }
}

fn q16_to_u8(acc: u64) -> u8 {
    ((acc + 32768) >> 16).min(255) as u8
}

fn premultiply(raw: &[u8]) -> Vec<u8> {
    let mut out = raw.to_vec();
    for px in out.chunks_exact_mut(4) {
        let a = u32::from(px[3]);
        for c in px.iter_mut().take(3) {
            *c = ((u32::from(*c) * a + 127) / 255) as u8;
        }
    }
    out
}

fn unpremultiply(raw: &mut [u8]) {
    for px in raw.chunks_exact_mut(4) {
        let a = u32::from(px[3]);
        if a == 0 {
            px[..3].fill(0);
            continue;
        }
        for c in px.iter_mut().take(3) {
            *c = ((u32::from(*c) * 255 + a / 2) / a).min(255) as u8;
        }
    }
}
