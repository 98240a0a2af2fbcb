//! Painting normalised areas onto a base image.

use crate::image::ImageEngine;
use crate::layout::{fit, line_text, wrap, Line, TextMeasure};
use crate::placements::{AreaKind, AreaSpec, ImageArea, Placements, TextArea};
use crate::rect::Size;
use crate::PressResult;
use image::{DynamicImage, Rgba, RgbaImage};
use std::time::Instant;
use tracing::{debug, info_span};

const TRANSPARENT: Rgba<u8> = Rgba([0, 0, 0, 0]);

/// Paint every area of `placements` onto `base`, in order.
///
/// Each area is rendered on its own, pasted at its position into a transparent layer
/// the size of the base, and alpha-composited with the result so far: over it, or
/// under it when the area is `beneath`. The base is converted to RGBA first.
pub fn compose(
    base: DynamicImage,
    placements: &Placements,
    engine: &dyn ImageEngine,
) -> PressResult<RgbaImage> {
    let mut canvas = base.into_rgba8();
    let canvas_size = Size::new(canvas.width(), canvas.height());

    for (name, area) in placements.iter() {
        let _span = info_span!("area", name, kind = area.kind.name()).entered();
        let started = Instant::now();

        let rendered = render_area(area, engine)?;
        let mut layer = engine.new_canvas(canvas_size, TRANSPARENT);
        engine.paste(&mut layer, &rendered, area.position);

        canvas = if area.beneath {
            engine.alpha_composite(&layer, &canvas)
        } else {
            engine.alpha_composite(&canvas, &layer)
        };

        debug!(
            elapsed_ms = started.elapsed().as_secs_f64() * 1000.0,
            width = rendered.width(),
            height = rendered.height(),
            "composited area"
        );
    }

    Ok(canvas)
}

/// Render one area as a standalone bitmap, rotated and ready to paste.
pub fn render_area(area: &AreaSpec, engine: &dyn ImageEngine) -> PressResult<RgbaImage> {
    let rendered = match &area.kind {
        AreaKind::Image(image) => render_image(image, engine),
        AreaKind::Text(text) => render_text(text, engine)?,
    };
    engine.rotate(&rendered, area.rotation)
}

fn render_image(area: &ImageArea, engine: &dyn ImageEngine) -> RgbaImage {
    let mut img = match area.size {
        Some(size) => engine.resize(&area.bitmap, size),
        None => area.bitmap.as_ref().clone(),
    };
    img = engine.apply_filter(&img, area.filter);
    engine.set_alpha(&mut img, area.opacity);
    debug!(
        filter = area.filter.name().unwrap_or("none"),
        opacity = area.opacity,
        "rendered image"
    );
    img
}

/// Lay out the text of an area, searching for a font size first if the area asks
/// for it. Returns the size the lines were laid out at.
pub fn layout_text(area: &TextArea) -> PressResult<(u32, Vec<Line>)> {
    if area.fit {
        let fitted = fit(&area.text, area.box_size, area.font_size, |size| {
            area.font.at_size(size)
        })?;
        return Ok((fitted.size, fitted.lines));
    }

    let lines = wrap(
        &area.text,
        &area.font.at_size(area.font_size),
        area.box_size,
        false,
    )?;
    Ok((area.font_size, lines))
}

fn render_text(area: &TextArea, engine: &dyn ImageEngine) -> PressResult<RgbaImage> {
    let (size, lines) = layout_text(area)?;
    debug!(size, lines = lines.len(), "laid out text");

    let background = area
        .background_colour
        .with_opacity(area.background_opacity);
    let ink = area.font_colour.with_opacity(area.font_opacity);
    let mut canvas = engine.new_canvas(area.box_size, background);

    let font = area.font.at_size(size);
    let descent = font.descent().0;
    let mut top = -descent / 2.0;
    for line in lines.iter() {
        let text = line_text(line);
        engine.draw_text(&mut canvas, font, &text, 0.0, top, ink)?;
        top += font.measure(&text).height.0 + descent;
    }

    Ok(canvas)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::colour::{colours, Colour};
    use crate::font::{FontFace, SizedFont};
    use crate::image::{Filter, RasterEngine};
    use crate::rect::Point;
    use std::cell::RefCell;
    use std::path::{Path, PathBuf};
    use std::sync::Arc;

    #[derive(Debug, Clone, PartialEq)]
    enum RecordedOp {
        Canvas(Size),
        Resize(Size),
        Filter(Filter),
        SetAlpha(u8),
        Rotate(u32),
        Paste(Point),
        Composite,
        Text { text: String, size: u32, top: f32 },
    }

    /// Records every call and forwards it to the raster engine.
    #[derive(Default)]
    struct RecordingEngine {
        inner: RasterEngine,
        ops: RefCell<Vec<RecordedOp>>,
    }

    impl RecordingEngine {
        fn record(&self, op: RecordedOp) {
            self.ops.borrow_mut().push(op);
        }

        fn ops(&self) -> Vec<RecordedOp> {
            self.ops.borrow().clone()
        }
    }

    impl ImageEngine for RecordingEngine {
        fn decode(&self, path: &Path) -> PressResult<RgbaImage> {
            self.inner.decode(path)
        }

        fn new_canvas(&self, size: Size, fill: Rgba<u8>) -> RgbaImage {
            self.record(RecordedOp::Canvas(size));
            self.inner.new_canvas(size, fill)
        }

        fn resize(&self, img: &RgbaImage, size: Size) -> RgbaImage {
            self.record(RecordedOp::Resize(size));
            self.inner.resize(img, size)
        }

        fn apply_filter(&self, img: &RgbaImage, filter: Filter) -> RgbaImage {
            self.record(RecordedOp::Filter(filter));
            self.inner.apply_filter(img, filter)
        }

        fn set_alpha(&self, img: &mut RgbaImage, alpha: u8) {
            self.record(RecordedOp::SetAlpha(alpha));
            self.inner.set_alpha(img, alpha)
        }

        fn rotate(&self, img: &RgbaImage, degrees: u32) -> PressResult<RgbaImage> {
            self.record(RecordedOp::Rotate(degrees));
            self.inner.rotate(img, degrees)
        }

        fn paste(&self, dst: &mut RgbaImage, src: &RgbaImage, at: Point) {
            self.record(RecordedOp::Paste(at));
            self.inner.paste(dst, src, at)
        }

        fn alpha_composite(&self, bottom: &RgbaImage, top: &RgbaImage) -> RgbaImage {
            self.record(RecordedOp::Composite);
            self.inner.alpha_composite(bottom, top)
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
            self.record(RecordedOp::Text {
                text: text.to_string(),
                size: font.size,
                top,
            });
            self.inner.draw_text(canvas, font, text, left, top, colour)
        }
    }

    fn font() -> FontFace {
        FontFace::load(include_bytes!("../assets/DejaVuSans.ttf").to_vec()).unwrap()
    }

    fn image_area(colour: Rgba<u8>, position: Point, beneath: bool) -> AreaSpec {
        AreaSpec {
            position,
            rotation: 0,
            beneath,
            kind: AreaKind::Image(ImageArea {
                source_path: None,
                bitmap: Arc::new(RgbaImage::from_pixel(2, 2, colour)),
                size: None,
                filter: Filter::None,
                opacity: colour[3],
            }),
        }
    }

    fn text_area(text: &str, box_size: Size, font_size: u32, fit: bool) -> AreaSpec {
        AreaSpec {
            position: Point::new(0, 0),
            rotation: 0,
            beneath: false,
            kind: AreaKind::Text(TextArea {
                font: font(),
                font_path: PathBuf::from("DejaVuSans.ttf"),
                text: text.to_string(),
                box_size,
                background_colour: colours::BLACK,
                background_opacity: 255,
                font_colour: colours::WHITE,
                font_opacity: 255,
                font_size,
                font_variant: None,
                fit,
            }),
        }
    }

    fn placements(areas: Vec<AreaSpec>) -> Placements {
        Placements {
            meta: None,
            areas: areas
                .into_iter()
                .enumerate()
                .map(|(i, a)| (format!("area{i}"), a))
                .collect(),
        }
    }

    fn blank(width: u32, height: u32) -> DynamicImage {
        DynamicImage::ImageRgba8(RgbaImage::from_pixel(width, height, TRANSPARENT))
    }

    #[test]
    fn later_areas_paint_over_earlier_ones() {
        let red = Rgba([255, 0, 0, 255]);
        let blue = Rgba([0, 0, 255, 255]);
        let out = compose(
            blank(4, 4),
            &placements(vec![
                image_area(red, Point::new(0, 0), false),
                image_area(blue, Point::new(1, 1), false),
            ]),
            &RasterEngine,
        )
        .unwrap();
        assert_eq!(*out.get_pixel(0, 0), red);
        assert_eq!(*out.get_pixel(1, 1), blue);
        assert_eq!(*out.get_pixel(3, 3), TRANSPARENT);
    }

    #[test]
    fn beneath_areas_paint_under() {
        let red = Rgba([255, 0, 0, 255]);
        let blue = Rgba([0, 0, 255, 255]);
        let out = compose(
            blank(4, 4),
            &placements(vec![
                image_area(red, Point::new(0, 0), false),
                image_area(blue, Point::new(1, 1), true),
            ]),
            &RasterEngine,
        )
        .unwrap();
        assert_eq!(*out.get_pixel(1, 1), red);
        assert_eq!(*out.get_pixel(2, 2), blue);
    }

    #[test]
    fn base_is_converted_to_rgba() {
        let base = DynamicImage::ImageRgb8(image::RgbImage::from_pixel(3, 3, image::Rgb([9, 9, 9])));
        let out = compose(base, &placements(vec![]), &RasterEngine).unwrap();
        assert_eq!(out.dimensions(), (3, 3));
        assert_eq!(out.get_pixel(0, 0).0, [9, 9, 9, 255]);
    }

    #[test]
    fn image_pipeline_runs_in_order() {
        let engine = RecordingEngine::default();
        let mut area = image_area(Rgba([255, 0, 0, 255]), Point::new(2, 3), false);
        area.rotation = 90;
        if let AreaKind::Image(image) = &mut area.kind {
            image.size = Some(Size::new(4, 2));
            image.filter = Filter::BoxBlur(1.0);
            image.opacity = 128;
        }

        compose(blank(8, 8), &placements(vec![area]), &engine).unwrap();
        assert_eq!(
            engine.ops(),
            vec![
                RecordedOp::Resize(Size::new(4, 2)),
                RecordedOp::Filter(Filter::BoxBlur(1.0)),
                RecordedOp::SetAlpha(128),
                RecordedOp::Rotate(90),
                RecordedOp::Canvas(Size::new(8, 8)),
                RecordedOp::Paste(Point::new(2, 3)),
                RecordedOp::Composite,
            ]
        );
    }

    #[test]
    fn text_lines_step_down_the_box() {
        let engine = RecordingEngine::default();
        let area = text_area("What Goes Up Must Come Down", Size::new(300, 400), 48, false);
        compose(blank(400, 400), &placements(vec![area]), &engine).unwrap();

        let tops: Vec<f32> = engine
            .ops()
            .into_iter()
            .filter_map(|op| match op {
                RecordedOp::Text { top, size, .. } => {
                    assert_eq!(size, 48);
                    Some(top)
                }
                _ => None,
            })
            .collect();
        assert!(tops.len() > 1);
        assert!(tops[0] < 0.0);
        assert!(tops.windows(2).all(|w| w[1] > w[0]));
    }

    #[test]
    fn text_box_is_filled_with_the_background() {
        let mut area = text_area("Hi", Size::new(100, 60), 40, false);
        if let AreaKind::Text(text) = &mut area.kind {
            text.background_colour = Colour::new_rgb_bytes(0, 128, 0);
            text.background_opacity = 200;
        }
        let rendered = render_area(&area, &RasterEngine).unwrap();
        assert_eq!(rendered.dimensions(), (100, 60));
        assert_eq!(rendered.get_pixel(99, 59).0, [0, 128, 0, 200]);
        assert!(rendered.pixels().any(|p| p.0 == [255, 255, 255, 255]));
    }

    #[test]
    fn translucent_text_box_keeps_its_alpha() {
        let mut area = text_area(" ", Size::new(4, 4), 12, false);
        if let AreaKind::Text(text) = &mut area.kind {
            text.background_colour = Colour::new_rgb_bytes(200, 100, 50);
            text.background_opacity = 128;
        }

        let out = compose(blank(6, 6), &placements(vec![area]), &RasterEngine).unwrap();
        assert_eq!(out.get_pixel(1, 1).0, [200, 100, 50, 128]);
        assert_eq!(*out.get_pixel(5, 5), TRANSPARENT);
    }

    #[test]
    fn fit_mode_draws_at_the_fitted_size() {
        let area = text_area("What Goes Up Must Come Down", Size::new(380, 380), 1000, true);
        let AreaKind::Text(text) = &area.kind else {
            unreachable!()
        };
        let (size, lines) = layout_text(text).unwrap();
        assert!(size < 1000);
        assert!(!lines.is_empty());

        let engine = RecordingEngine::default();
        render_area(&area, &engine).unwrap();
        let drawn_sizes: Vec<u32> = engine
            .ops()
            .into_iter()
            .filter_map(|op| match op {
                RecordedOp::Text { size, .. } => Some(size),
                _ => None,
            })
            .collect();
        assert_eq!(drawn_sizes.len(), lines.len());
        assert!(drawn_sizes.iter().all(|s| *s == size));
    }
}
