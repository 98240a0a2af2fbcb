use image::{DynamicImage, Rgba, RgbaImage};
use thumbpress::{compose, RasterEngine, RawPlacements, RawValue};

fn main() {
    tracing_subscriber::fmt::init();

    let engine = RasterEngine;
    let mut raw = RawPlacements::from_json_str(include_str!("../tests/data/placements.json"))
        .expect("placements parse");

    // a generated badge, supplied as a bitmap instead of a path
    let mut badge = RgbaImage::from_pixel(64, 64, Rgba([220, 40, 60, 255]));
    for (x, y, px) in badge.enumerate_pixels_mut() {
        if (x / 8 + y / 8) % 2 == 0 {
            *px = Rgba([250, 250, 250, 255]);
        }
    }
    let RawValue::Map(mut record) = RawValue::from(serde_json::json!({
        "type": "image",
        "xy": [560, 280],
        "wh": [48, 48],
        "filter": "box_blur",
        "filter_data": [1.5],
        "opacity": 230,
        "rotation": 15,
    })) else {
        unreachable!("a JSON object converts to a map");
    };
    record.insert("path".into(), badge.into());
    raw.push("badge", record);

    let placements = raw.normalize(&engine).expect("placements are valid");
    let base = DynamicImage::ImageRgba8(RgbaImage::new(640, 360));
    let out = compose(base, &placements, &engine).expect("can composite");
    out.save("thumbnail.png").expect("can write thumbnail.png");
}
