//! Bitmap operations used by the compositor.
//!
//! The compositor only talks to an [ImageEngine]. [RasterEngine] is the engine the
//! crate ships with: decoding and resizing go through the `image` crate, glyph fills
//! and rotation through `tiny-skia`, and blurs through [crate::blur]. Compositing is a
//! rounded source-over so that opaque pixels stay opaque.

use crate::blur;
use crate::font::SizedFont;
use crate::rect::{Point, Size};
use crate::{PressError, PressResult};
use image::imageops::{self, FilterType};
use image::{ImageReader, Rgba, RgbaImage};
use std::path::Path;
use tiny_skia::{FillRule, FilterQuality, IntSize, Paint, Pixmap, PixmapPaint, Transform};

/// A filter applied to an image area after resizing.
#[derive(Debug, Default, Copy, Clone, PartialEq)]
pub enum Filter {
    #[default]
    None,
    /// Gaussian blur with the given radius
    GaussianBlur(f32),
    /// Box blur with the given radius
    BoxBlur(f32),
}

impl Filter {
    /// The wire name of the filter, or `None` for [Filter::None]
    pub fn name(&self) -> Option<&'static str> {
        match self {
            Filter::None => None,
            Filter::GaussianBlur(_) => Some("gaussian_blur"),
            Filter::BoxBlur(_) => Some("box_blur"),
        }
    }
}

/// The bitmap operations the compositor is built on.
///
/// All bitmaps are straight (non-premultiplied) RGBA8.
pub trait ImageEngine {
    /// Decode the image at `path`, converting it to RGBA.
    fn decode(&self, path: &Path) -> PressResult<RgbaImage>;

    /// A bitmap of `size` filled with `fill`.
    fn new_canvas(&self, size: Size, fill: Rgba<u8>) -> RgbaImage;

    /// Resample `img` to exactly `size`.
    fn resize(&self, img: &RgbaImage, size: Size) -> RgbaImage;

    /// Apply `filter` to `img`.
    fn apply_filter(&self, img: &RgbaImage, filter: Filter) -> RgbaImage;

    /// Replace the alpha channel of every pixel with `alpha`.
    fn set_alpha(&self, img: &mut RgbaImage, alpha: u8);

    /// Rotate `img` counter-clockwise by `degrees`, growing the canvas so that
    /// no corner is cut off.
    fn rotate(&self, img: &RgbaImage, degrees: u32) -> PressResult<RgbaImage>;

    /// Copy `src` into `dst` with its top-left corner at `at`, replacing the
    /// pixels underneath. Parts of `src` outside `dst` are dropped.
    fn paste(&self, dst: &mut RgbaImage, src: &RgbaImage, at: Point);

    /// Composite `top` over `bottom`, aligned at their top-left corners.
    fn alpha_composite(&self, bottom: &RgbaImage, top: &RgbaImage) -> RgbaImage;

    /// Fill one line of text onto `canvas` with its ascender line at `top`.
    fn draw_text(
        &self,
        canvas: &mut RgbaImage,
        font: SizedFont<'_>,
        text: &str,
        left: f32,
        top: f32,
        colour: Rgba<u8>,
    ) -> PressResult<()>;
}

/// The default [ImageEngine].
#[derive(Debug, Default, Copy, Clone)]
pub struct RasterEngine;

impl ImageEngine for RasterEngine {
    fn decode(&self, path: &Path) -> PressResult<RgbaImage> {
        let img = ImageReader::open(path)?.with_guessed_format()?.decode()?;
        Ok(img.into_rgba8())
    }

    fn new_canvas(&self, size: Size, fill: Rgba<u8>) -> RgbaImage {
        RgbaImage::from_pixel(size.width, size.height, fill)
    }

    fn resize(&self, img: &RgbaImage, size: Size) -> RgbaImage {
        if img.dimensions() == (size.width, size.height) {
            return img.clone();
        }
        imageops::resize(img, size.width, size.height, FilterType::CatmullRom)
    }

    fn apply_filter(&self, img: &RgbaImage, filter: Filter) -> RgbaImage {
        match filter {
            Filter::None => img.clone(),
            Filter::GaussianBlur(radius) => blur::gaussian_blur(img, radius),
            Filter::BoxBlur(radius) => blur::box_blur(img, radius),
        }
    }

    fn set_alpha(&self, img: &mut RgbaImage, alpha: u8) {
        for px in img.pixels_mut() {
            px[3] = alpha;
        }
    }

    fn rotate(&self, img: &RgbaImage, degrees: u32) -> PressResult<RgbaImage> {
        if degrees % 360 == 0 || img.width() == 0 || img.height() == 0 {
            return Ok(img.clone());
        }

        let (w, h) = (img.width() as f32, img.height() as f32);
        let radians = (degrees as f32).to_radians();
        let (sin, cos) = (radians.sin().abs(), radians.cos().abs());
        // trim float noise so right angles do not gain a pixel
        let expand = |v: f32| (v - 1e-3).ceil().max(1.0) as u32;
        let new_w = expand(w * cos + h * sin);
        let new_h = expand(w * sin + h * cos);

        let src = to_pixmap(img)?;
        let mut dst = Pixmap::new(new_w, new_h).ok_or(PressError::Raster {
            width: new_w,
            height: new_h,
        })?;

        // tiny-skia rotates clockwise in y-down space
        let transform = Transform::from_translate(-w / 2.0, -h / 2.0)
            .post_concat(Transform::from_rotate(-(degrees as f32)))
            .post_concat(Transform::from_translate(
                new_w as f32 / 2.0,
                new_h as f32 / 2.0,
            ));
        let paint = PixmapPaint {
            quality: FilterQuality::Bilinear,
            ..PixmapPaint::default()
        };
        dst.draw_pixmap(0, 0, src.as_ref(), &paint, transform, None);

        Ok(from_pixmap(&dst))
    }

    fn paste(&self, dst: &mut RgbaImage, src: &RgbaImage, at: Point) {
        imageops::replace(dst, src, i64::from(at.x), i64::from(at.y));
    }

    fn alpha_composite(&self, bottom: &RgbaImage, top: &RgbaImage) -> RgbaImage {
        let mut out = bottom.clone();
        over_in_place(&mut out, top);
        out
    }

    fn draw_text(
        &self,
        canvas: &mut RgbaImage,
        font: SizedFont<'_>,
        text: &str,
        left: f32,
        top: f32,
        colour: Rgba<u8>,
    ) -> PressResult<()> {
        let Some(path) = font.line_path(text, left, top) else {
            return Ok(());
        };

        let (width, height) = canvas.dimensions();
        let mut glyphs = Pixmap::new(width, height).ok_or(PressError::Raster { width, height })?;
        let mut paint = Paint::default();
        paint.set_color_rgba8(colour[0], colour[1], colour[2], colour[3]);
        paint.anti_alias = true;
        glyphs.fill_path(&path, &paint, FillRule::Winding, Transform::identity(), None);

        over_in_place(canvas, &from_pixmap(&glyphs));
        Ok(())
    }
}

/// Source-over of straight RGBA pixels, rounded in premultiplied space so that an
/// opaque destination stays opaque.
fn over(dst: [u8; 4], src: [u8; 4]) -> [u8; 4] {
    let sa = u16::from(src[3]);
    if sa == 0 {
        return dst;
    }
    if sa == 255 || dst[3] == 0 {
        return src;
    }

    let da = u16::from(dst[3]);
    let inv = 255 - sa;
    let dst_weight = mul_div255(da, inv);
    let out_a = src[3].saturating_add(dst_weight);

    let mut out = [0u8; 4];
    for i in 0..3 {
        let premul = u32::from(mul_div255(u16::from(src[i]), sa))
            + u32::from(mul_div255(u16::from(dst[i]), u16::from(dst_weight)));
        out[i] = ((premul * 255 + u32::from(out_a) / 2) / u32::from(out_a)).min(255) as u8;
    }
    out[3] = out_a;
    out
}

/// Composite `top` over `bottom` where the two overlap, anchored at the top-left.
fn over_in_place(bottom: &mut RgbaImage, top: &RgbaImage) {
    let width = bottom.width().min(top.width());
    let height = bottom.height().min(top.height());
    for y in 0..height {
        for x in 0..width {
            let px = bottom.get_pixel_mut(x, y);
            px.0 = over(px.0, top.get_pixel(x, y).0);
        }
    }
}

fn mul_div255(x: u16, y: u16) -> u8 {
    ((u32::from(x) * u32::from(y) + 127) / 255) as u8
}

/// Convert a straight RGBA bitmap into a premultiplied pixmap.
fn to_pixmap(img: &RgbaImage) -> PressResult<Pixmap> {
    let (width, height) = img.dimensions();
    let raster_error = PressError::Raster { width, height };

    let mut data = Vec::with_capacity(img.as_raw().len());
    for px in img.pixels() {
        let [r, g, b, a] = px.0;
        let alpha = a as f32 / 255.0;
        data.push((r as f32 * alpha).round() as u8);
        data.push((g as f32 * alpha).round() as u8);
        data.push((b as f32 * alpha).round() as u8);
        data.push(a);
    }

    let size = IntSize::from_wh(width, height).ok_or(PressError::Raster { width, height })?;
    Pixmap::from_vec(data, size).ok_or(raster_error)
}

/// Convert a premultiplied pixmap back into a straight RGBA bitmap.
fn from_pixmap(pixmap: &Pixmap) -> RgbaImage {
    let mut out = RgbaImage::new(pixmap.width(), pixmap.height());
    for (dst, src) in out.pixels_mut().zip(pixmap.pixels()) {
        let c = src.demultiply();
        *dst = Rgba([c.red(), c.green(), c.blue(), c.alpha()]);
    }
    out
}
