//! Turning raw placement records into typed areas.
//!
//! A placement source is an ordered mapping of area name to area record. Every
//! record is checked against the schema table for its kind and normalised into an
//! [AreaSpec]: colours are range-checked, opacities and rotations are clamped,
//! paths are made absolute and the files they name are loaded. Any validation
//! failure aborts the whole normalisation; there are no partially built areas.

use crate::colour::Colour;
use crate::font::FontFace;
use crate::image::{Filter, ImageEngine};
use crate::rect::{Point, Size};
use crate::schema::{retrieve_field, Fallback, FieldSpec, FieldType, RawRecord, RawValue};
use crate::{PressError, PressResult};
use image::RgbaImage;
use std::collections::BTreeMap;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};

/// The reserved key for out-of-band metadata. It is carried through untouched and
/// is never treated as an area.
pub const META_KEY: &str = ".meta";

const STR: &[FieldType] = &[FieldType::Str];
const INT: &[FieldType] = &[FieldType::Int];
const BOOL: &[FieldType] = &[FieldType::Bool];
const LIST: &[FieldType] = &[FieldType::List];
const STR_OR_BITMAP: &[FieldType] = &[FieldType::Str, FieldType::Bitmap];

const KIND_FIELD: FieldSpec = FieldSpec::required("type", STR);

/// Schema of an image area
pub const IMAGE_FIELDS: &[FieldSpec] = &[
    KIND_FIELD,
    FieldSpec::required("path", STR_OR_BITMAP),
    FieldSpec::required("xy", LIST),
    FieldSpec::optional("wh", LIST, Fallback::Absent),
    FieldSpec::optional("filter", STR, Fallback::Absent),
    FieldSpec::optional("filter_data", LIST, Fallback::IntList(&[])),
    FieldSpec::optional("opacity", INT, Fallback::Int(255)),
    FieldSpec::optional("rotation", INT, Fallback::Int(0)),
    FieldSpec::optional("beneath", BOOL, Fallback::Bool(false)),
];

/// Schema of a text area
pub const TEXT_FIELDS: &[FieldSpec] = &[
    KIND_FIELD,
    FieldSpec::required("path", STR),
    FieldSpec::required("text", STR),
    FieldSpec::required("xy", LIST),
    FieldSpec::required("wh", LIST),
    FieldSpec::optional("bg_colour", LIST, Fallback::IntList(&[0, 0, 0])),
    FieldSpec::optional("bg_opacity", INT, Fallback::Int(255)),
    FieldSpec::optional("font_colour", LIST, Fallback::IntList(&[255, 255, 255])),
    FieldSpec::required("font_size", INT),
    FieldSpec::optional("font_variant", STR, Fallback::Absent),
    FieldSpec::optional("font_opacity", INT, Fallback::Int(255)),
    FieldSpec::optional("fit", BOOL, Fallback::Bool(false)),
    FieldSpec::optional("beneath", BOOL, Fallback::Bool(false)),
    FieldSpec::optional("rotation", INT, Fallback::Int(0)),
];

/// Placement records as read from a source, in paint order.
#[derive(Debug, Default, Clone)]
pub struct RawPlacements {
    pub meta: Option<serde_json::Value>,
    pub areas: Vec<(String, RawRecord)>,
}

impl RawPlacements {
    pub fn new() -> RawPlacements {
        RawPlacements::default()
    }

    /// Parse a JSON object of area name to area record. Object order is paint order.
    pub fn from_json_str(json: &str) -> PressResult<RawPlacements> {
        let value: serde_json::Value = serde_json::from_str(json)?;
        RawPlacements::from_json(value)
    }

    pub fn from_reader<R: Read>(reader: R) -> PressResult<RawPlacements> {
        let value: serde_json::Value = serde_json::from_reader(reader)?;
        RawPlacements::from_json(value)
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> PressResult<RawPlacements> {
        let file = std::fs::File::open(path)?;
        RawPlacements::from_reader(std::io::BufReader::new(file))
    }

    fn from_json(value: serde_json::Value) -> PressResult<RawPlacements> {
        let map = match value {
            serde_json::Value::Object(map) => map,
            other => {
                return Err(PressError::TypeMismatch {
                    area: "(root)".to_string(),
                    key: "(root)".to_string(),
                    expected: FieldType::Map.to_string(),
                    actual: RawValue::from(other).field_type().to_string(),
                })
            }
        };

        let mut placements = RawPlacements::new();
        for (name, value) in map {
            if name == META_KEY {
                placements.meta = Some(value);
                continue;
            }
            match RawValue::from(value) {
                RawValue::Map(record) => placements.push(name, record),
                other => {
                    return Err(PressError::TypeMismatch {
                        area: name,
                        key: "(record)".to_string(),
                        expected: FieldType::Map.to_string(),
                        actual: other.field_type().to_string(),
                    })
                }
            }
        }
        Ok(placements)
    }

    /// Append an area; it paints after every area already present.
    pub fn push<S: Into<String>>(&mut self, name: S, record: RawRecord) {
        self.areas.push((name.into(), record));
    }

    /// Validate and normalise every area, decoding image sources with `engine`.
    pub fn normalize(&self, engine: &dyn ImageEngine) -> PressResult<Placements> {
        let areas = self
            .areas
            .iter()
            .map(|(name, record)| Ok((name.clone(), normalize_area(name, record, engine)?)))
            .collect::<PressResult<Vec<_>>>()?;

        Ok(Placements {
            meta: self.meta.clone(),
            areas,
        })
    }
}

/// Typed areas ready to be composited, in paint order.
#[derive(Debug)]
pub struct Placements {
    pub meta: Option<serde_json::Value>,
    pub areas: Vec<(String, AreaSpec)>,
}

impl Placements {
    pub fn iter(&self) -> impl Iterator<Item = (&str, &AreaSpec)> {
        self.areas.iter().map(|(name, area)| (name.as_str(), area))
    }

    pub fn get(&self, name: &str) -> Option<&AreaSpec> {
        self.iter().find(|(n, _)| *n == name).map(|(_, area)| area)
    }

    pub fn len(&self) -> usize {
        self.areas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.areas.is_empty()
    }
}

/// One normalised area.
#[derive(Debug)]
pub struct AreaSpec {
    /// Offset of the area's top-left corner on the base image
    pub position: Point,
    /// Counter-clockwise rotation in degrees, within `0..=360`
    pub rotation: u32,
    /// Paint this area under the composition so far instead of over it
    pub beneath: bool,
    pub kind: AreaKind,
}

#[derive(Debug)]
pub enum AreaKind {
    Image(ImageArea),
    Text(TextArea),
}

impl AreaKind {
    pub fn name(&self) -> &'static str {
        match self {
            AreaKind::Image(_) => "image",
            AreaKind::Text(_) => "text",
        }
    }
}

#[derive(Debug, Clone)]
pub struct ImageArea {
    /// Where the bitmap was loaded from; `None` for bitmaps supplied in memory
    pub source_path: Option<PathBuf>,
    pub bitmap: Arc<RgbaImage>,
    /// Resize target; `None` keeps the natural size
    pub size: Option<Size>,
    pub filter: Filter,
    pub opacity: u8,
}

#[derive(Debug)]
pub struct TextArea {
    pub font: FontFace,
    pub font_path: PathBuf,
    pub text: String,
    pub box_size: Size,
    pub background_colour: Colour,
    pub background_opacity: u8,
    pub font_colour: Colour,
    pub font_opacity: u8,
    /// The size to draw at, or the size the fit search starts from
    pub font_size: u32,
    /// The requested variant, whether or not the font could apply it
    pub font_variant: Option<String>,
    pub fit: bool,
}

fn normalize_area(name: &str, record: &RawRecord, engine: &dyn ImageEngine) -> PressResult<AreaSpec> {
    let kind = retrieve_field(record, &KIND_FIELD, name)?
        .and_then(|v| v.as_str().map(str::to_string))
        .unwrap_or_default();

    let table = match kind.as_str() {
        "image" => IMAGE_FIELDS,
        "text" => TEXT_FIELDS,
        _ => {
            return Err(PressError::InvalidKind {
                area: name.to_string(),
                kind,
            })
        }
    };

    let mut values = BTreeMap::new();
    for spec in table {
        if let Some(value) = retrieve_field(record, spec, name)? {
            values.insert(spec.key, value);
        }
    }
    let fields = Fields { area: name, values };

    let position = fields
        .pair("xy")?
        .map(|(x, y)| Point::new(x, y))
        .unwrap_or_default();
    let rotation = clamp_rotation(fields.int("rotation").unwrap_or(0));
    let beneath = fields.bool("beneath").unwrap_or(false);

    let kind = match kind.as_str() {
        "image" => AreaKind::Image(normalize_image(&fields, engine)?),
        _ => AreaKind::Text(normalize_text(&fields)?),
    };
    debug!(area = name, kind = kind.name(), "normalized area");

    Ok(AreaSpec {
        position,
        rotation,
        beneath,
        kind,
    })
}

fn normalize_image(fields: &Fields<'_>, engine: &dyn ImageEngine) -> PressResult<ImageArea> {
    let size = fields.size("wh")?;
    let filter = fields.filter()?;
    let opacity = clamp_opacity(fields.int("opacity").unwrap_or(255));

    // files are only touched once every field is valid
    let (source_path, bitmap) = match fields.values.get("path") {
        Some(RawValue::Bitmap(bitmap)) => (None, bitmap.clone()),
        _ => {
            let path = fields.existing_path("path")?;
            let bitmap = Arc::new(engine.decode(&path)?);
            (Some(path), bitmap)
        }
    };

    Ok(ImageArea {
        source_path,
        bitmap,
        size,
        filter,
        opacity,
    })
}

fn normalize_text(fields: &Fields<'_>) -> PressResult<TextArea> {
    let text = fields.string("text").unwrap_or_default();
    let box_size = fields.size("wh")?.unwrap_or_default();

    let background_colour = fields.colour("bg_colour")?;
    let background_opacity = clamp_opacity(fields.int("bg_opacity").unwrap_or(255));
    let font_colour = fields.colour("font_colour")?;
    let font_opacity = clamp_opacity(fields.int("font_opacity").unwrap_or(255));
    let fit = fields.bool("fit").unwrap_or(false);

    let font_size = fields.int("font_size").unwrap_or_default();
    let font_size = u32::try_from(font_size)
        .ok()
        .filter(|size| *size > 0)
        .ok_or_else(|| fields.mismatch("font_size", "positive int", &font_size.to_string()))?;

    let font_path = fields.existing_path("path")?;
    let mut font = FontFace::open(&font_path)?;
    let font_variant = fields.string("font_variant");
    if let Some(variant) = font_variant.as_deref() {
        if let Err(e) = font.set_variant(variant) {
            warn!(
                area = fields.area,
                variant,
                font = %font_path.display(),
                error = %e,
                "could not apply font variant, keeping the base face"
            );
        }
    }

    Ok(TextArea {
        font,
        font_path,
        text,
        box_size,
        background_colour,
        background_opacity,
        font_colour,
        font_opacity,
        font_size,
        font_variant,
        fit,
    })
}

fn clamp_opacity(value: i64) -> u8 {
    value.clamp(0, 255) as u8
}

fn clamp_rotation(value: i64) -> u32 {
    value.clamp(0, 360) as u32
}

/// The retrieved fields of one area, with the post-processing each field kind needs.
struct Fields<'a> {
    area: &'a str,
    values: BTreeMap<&'static str, RawValue>,
}

impl<'a> Fields<'a> {
    fn mismatch(&self, key: &str, expected: &str, actual: &str) -> PressError {
        PressError::TypeMismatch {
            area: self.area.to_string(),
            key: key.to_string(),
            expected: expected.to_string(),
            actual: actual.to_string(),
        }
    }

    fn string(&self, key: &str) -> Option<String> {
        self.values
            .get(key)
            .and_then(RawValue::as_str)
            .map(str::to_string)
    }

    fn int(&self, key: &str) -> Option<i64> {
        self.values.get(key).and_then(RawValue::as_int)
    }

    fn bool(&self, key: &str) -> Option<bool> {
        self.values.get(key).and_then(RawValue::as_bool)
    }

    /// A list whose elements must all be ints
    fn ints(&self, key: &str) -> PressResult<Option<Vec<i64>>> {
        let Some(items) = self.values.get(key).and_then(RawValue::as_list) else {
            return Ok(None);
        };
        items
            .iter()
            .map(|item| {
                item.as_int().ok_or_else(|| {
                    self.mismatch(key, "list of int", &format!("list containing {}", item.field_type()))
                })
            })
            .collect::<PressResult<Vec<_>>>()
            .map(Some)
    }

    /// A two-component int list
    fn pair(&self, key: &str) -> PressResult<Option<(i32, i32)>> {
        let Some(items) = self.ints(key)? else {
            return Ok(None);
        };
        if items.len() != 2 {
            return Err(PressError::Arity {
                area: self.area.to_string(),
                key: key.to_string(),
                found: items.len(),
                expected: 2,
            });
        }
        let component = |v: i64| {
            i32::try_from(v).map_err(|_| self.mismatch(key, "32-bit int", &v.to_string()))
        };
        Ok(Some((component(items[0])?, component(items[1])?)))
    }

    /// A two-component list of positive dimensions
    fn size(&self, key: &str) -> PressResult<Option<Size>> {
        let Some((w, h)) = self.pair(key)? else {
            return Ok(None);
        };
        let dimension = |v: i32| {
            u32::try_from(v)
                .ok()
                .filter(|v| *v > 0)
                .ok_or_else(|| self.mismatch(key, "positive dimensions", &format!("[{w}, {h}]")))
        };
        Ok(Some(Size::new(dimension(w)?, dimension(h)?)))
    }

    /// An RGB triple with every channel in `0..=255`
    fn colour(&self, key: &str) -> PressResult<Colour> {
        let channels = self.ints(key)?.unwrap_or_default();
        let range_error = |reason: String| PressError::ColourRange {
            area: self.area.to_string(),
            key: key.to_string(),
            reason,
        };

        let &[r, g, b] = channels.as_slice() else {
            return Err(range_error(format!(
                "has {} channels (expected 3)",
                channels.len()
            )));
        };
        let channel = |v: i64| {
            u8::try_from(v).map_err(|_| range_error(format!("has channel {v} outside 0..=255")))
        };
        Ok(Colour::new_rgb_bytes(channel(r)?, channel(g)?, channel(b)?))
    }

    /// A path made absolute against the working directory, which must name a file
    fn existing_path(&self, key: &str) -> PressResult<PathBuf> {
        let raw = self.string(key).unwrap_or_default();
        let path = std::path::absolute(&raw)?;
        if !path.is_file() {
            return Err(PressError::FileNotFound {
                area: self.area.to_string(),
                path,
            });
        }
        Ok(path)
    }

    /// The filter and its single numeric parameter. Names other than the two known
    /// blurs mean no filter, and their data is not inspected.
    fn filter(&self) -> PressResult<Filter> {
        let Some(name) = self.string("filter") else {
            return Ok(Filter::None);
        };
        let make: fn(f32) -> Filter = match name.as_str() {
            "gaussian_blur" => Filter::GaussianBlur,
            "box_blur" => Filter::BoxBlur,
            _ => return Ok(Filter::None),
        };

        let data = self
            .values
            .get("filter_data")
            .and_then(RawValue::as_list)
            .unwrap_or_default();
        let [param] = data else {
            return Err(PressError::FilterArity {
                area: self.area.to_string(),
                filter: name,
                found: data.len(),
                expected: 1,
            });
        };
        let radius = match param {
            RawValue::Int(i) => *i as f32,
            RawValue::Float(x) => *x as f32,
            _ => {
                return Err(PressError::FilterType {
                    area: self.area.to_string(),
                    filter: name,
                })
            }
        };
        Ok(make(radius))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image::RasterEngine;
    use serde_json::json;

    fn record(value: serde_json::Value) -> RawRecord {
        match RawValue::from(value) {
            RawValue::Map(map) => map,
            other => panic!("not a record: {other:?}"),
        }
    }

    fn image_record(extra: serde_json::Value) -> RawRecord {
        let mut rec = record(json!({ "type": "image", "xy": [1, -2] }));
        rec.insert("path".into(), RgbaImage::new(4, 4).into());
        rec.extend(record(extra));
        rec
    }

    fn normalize_one(rec: RawRecord) -> PressResult<AreaSpec> {
        normalize_area("area", &rec, &RasterEngine)
    }

    #[test]
    fn schema_tables_share_the_kind_field() {
        assert_eq!(IMAGE_FIELDS[0], KIND_FIELD);
        assert_eq!(TEXT_FIELDS[0], KIND_FIELD);
        let required: Vec<_> = TEXT_FIELDS.iter().filter(|f| f.required).map(|f| f.key).collect();
        assert_eq!(required, vec!["type", "path", "text", "xy", "wh", "font_size"]);
    }

    #[test]
    fn json_order_is_kept_and_meta_is_set_aside() {
        let raw = RawPlacements::from_json_str(
            r#"{ "zeta": { "type": "image" }, ".meta": { "v": 2 }, "alpha": { "type": "text" } }"#,
        )
        .unwrap();
        let names: Vec<_> = raw.areas.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, vec!["zeta", "alpha"]);
        assert_eq!(raw.meta, Some(json!({ "v": 2 })));
    }

    #[test]
    fn non_object_records_are_rejected() {
        let err = RawPlacements::from_json_str(r#"{ "a": [1, 2] }"#).unwrap_err();
        assert!(matches!(err, PressError::TypeMismatch { .. }));
        let err = RawPlacements::from_json_str("[]").unwrap_err();
        assert!(matches!(err, PressError::TypeMismatch { .. }));
    }

    #[test]
    fn unknown_kind_is_rejected() {
        let err = normalize_one(record(json!({ "type": "video" }))).unwrap_err();
        match err {
            PressError::InvalidKind { area, kind } => {
                assert_eq!(area, "area");
                assert_eq!(kind, "video");
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn image_defaults() {
        let area = normalize_one(image_record(json!({}))).unwrap();
        assert_eq!(area.position, Point::new(1, -2));
        assert_eq!(area.rotation, 0);
        assert!(!area.beneath);
        let AreaKind::Image(image) = area.kind else {
            panic!("expected an image area");
        };
        assert_eq!(image.opacity, 255);
        assert_eq!(image.size, None);
        assert_eq!(image.filter, Filter::None);
        assert_eq!(image.source_path, None);
        assert_eq!(image.bitmap.dimensions(), (4, 4));
    }

    #[test]
    fn opacity_and_rotation_clamp() {
        let area = normalize_one(image_record(json!({ "opacity": 300, "rotation": 720 }))).unwrap();
        assert_eq!(area.rotation, 360);
        let AreaKind::Image(image) = area.kind else {
            panic!("expected an image area");
        };
        assert_eq!(image.opacity, 255);

        let area = normalize_one(image_record(json!({ "opacity": -5, "rotation": -90 }))).unwrap();
        assert_eq!(area.rotation, 0);
        let AreaKind::Image(image) = area.kind else {
            panic!("expected an image area");
        };
        assert_eq!(image.opacity, 0);
    }

    #[test]
    fn position_needs_two_components() {
        let err = normalize_one(image_record(json!({ "xy": [1, 2, 3] }))).unwrap_err();
        assert!(matches!(
            err,
            PressError::Arity {
                found: 3,
                expected: 2,
                ..
            }
        ));
    }

    #[test]
    fn list_elements_must_be_ints() {
        let err = normalize_one(image_record(json!({ "xy": [1.5, 2] }))).unwrap_err();
        assert!(matches!(err, PressError::TypeMismatch { .. }));
        let err = normalize_one(image_record(json!({ "wh": [true, 2] }))).unwrap_err();
        assert!(matches!(err, PressError::TypeMismatch { .. }));
    }

    #[test]
    fn resize_dimensions_must_be_positive() {
        let err = normalize_one(image_record(json!({ "wh": [0, 2] }))).unwrap_err();
        assert!(matches!(err, PressError::TypeMismatch { .. }));

        let area = normalize_one(image_record(json!({ "wh": [8, 2] }))).unwrap();
        let AreaKind::Image(image) = area.kind else {
            panic!("expected an image area");
        };
        assert_eq!(image.size, Some(Size::new(8, 2)));
    }

    #[test]
    fn known_filters_take_one_number() {
        let area = normalize_one(image_record(
            json!({ "filter": "gaussian_blur", "filter_data": [5] }),
        ))
        .unwrap();
        let AreaKind::Image(image) = area.kind else {
            panic!("expected an image area");
        };
        assert_eq!(image.filter, Filter::GaussianBlur(5.0));

        let area =
            normalize_one(image_record(json!({ "filter": "box_blur", "filter_data": [1.5] })))
                .unwrap();
        let AreaKind::Image(image) = area.kind else {
            panic!("expected an image area");
        };
        assert_eq!(image.filter, Filter::BoxBlur(1.5));
    }

    #[test]
    fn filter_arity_and_type_are_checked() {
        let err = normalize_one(image_record(
            json!({ "filter": "gaussian_blur", "filter_data": [5, 2] }),
        ))
        .unwrap_err();
        assert!(matches!(
            err,
            PressError::FilterArity {
                found: 2,
                expected: 1,
                ..
            }
        ));

        let err = normalize_one(image_record(json!({ "filter": "box_blur" }))).unwrap_err();
        assert!(matches!(err, PressError::FilterArity { found: 0, .. }));

        let err = normalize_one(image_record(
            json!({ "filter": "box_blur", "filter_data": ["wide"] }),
        ))
        .unwrap_err();
        assert!(matches!(err, PressError::FilterType { .. }));
    }

    #[test]
    fn unknown_filter_means_no_filter() {
        let area = normalize_one(image_record(
            json!({ "filter": "sepia", "filter_data": ["anything", 1, 2] }),
        ))
        .unwrap();
        let AreaKind::Image(image) = area.kind else {
            panic!("expected an image area");
        };
        assert_eq!(image.filter, Filter::None);
    }

    #[test]
    fn missing_image_file_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.png");
        let rec = record(json!({
            "type": "image",
            "xy": [0, 0],
            "path": missing.to_string_lossy(),
        }));
        let err = normalize_one(rec).unwrap_err();
        match err {
            PressError::FileNotFound { area, path } => {
                assert_eq!(area, "area");
                assert_eq!(path, missing);
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn clamp_helpers() {
        assert_eq!(clamp_opacity(i64::MAX), 255);
        assert_eq!(clamp_opacity(128), 128);
        assert_eq!(clamp_rotation(361), 360);
        assert_eq!(clamp_rotation(i64::MIN), 0);
    }
}
