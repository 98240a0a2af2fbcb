use crate::layout::{TextExtent, TextMeasure};
use crate::{PressResult, Px};
use owned_ttf_parser::{AsFaceRef, FaceMut, GlyphId, OutlineBuilder, OwnedFace, Tag};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tiny_skia::PathBuilder;

/// Reasons a named variant could not be applied to a face. These never fail an
/// area: the caller logs them and keeps the unvaried face.
#[derive(Error, Debug, PartialEq)]
pub enum VariantError {
    #[error("font has no variation instances")]
    NotVariable,

    #[error("font has no instance named {name:?} (available: {available:?})")]
    UnknownInstance {
        name: String,
        available: Vec<String>,
    },

    #[error("font rejected axis {axis} for instance {name:?}")]
    AxisRejected { name: String, axis: String },
}

/// A named instance from the font's `fvar` table, e.g. "Bold" on a variable
/// weight font, with the axis coordinates that select it.
#[derive(Debug, Clone, PartialEq)]
pub struct NamedInstance {
    pub name: String,
    pub coordinates: Vec<(Tag, f32)>,
}

/// A parsed font face loaded from a TTF or OTF file. The face owns its bytes, so
/// it can be resized for any number of layout attempts without touching the disk
/// again; see [FontFace::at_size].
pub struct FontFace {
    pub face: OwnedFace,
    path: Option<PathBuf>,
    variant: Option<String>,
}

impl std::fmt::Debug for FontFace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FontFace")
            .field("path", &self.path)
            .field("family", &self.family())
            .field("variant", &self.variant)
            .finish()
    }
}

impl FontFace {
    /// Load a font from raw bytes, parsing the font and returning an error if the font
    /// could not be parsed
    pub fn load(bytes: Vec<u8>) -> PressResult<FontFace> {
        let face = OwnedFace::from_vec(bytes, 0)?;

        Ok(FontFace {
            face,
            path: None,
            variant: None,
        })
    }

    /// Read and parse a font file
    pub fn open<P: AsRef<Path>>(path: P) -> PressResult<FontFace> {
        let path = path.as_ref();
        let bytes = std::fs::read(path)?;
        let mut font = Self::load(bytes)?;
        font.path = Some(path.to_owned());
        Ok(font)
    }

    /// The named variant currently applied to the face
    pub fn variant(&self) -> Option<&str> {
        self.variant.as_deref()
    }

    /// Obtain the family name of the font, if the font names one
    pub fn family(&self) -> Option<String> {
        self.name_for(owned_ttf_parser::name_id::FAMILY)
    }

    fn name_for(&self, name_id: u16) -> Option<String> {
        self.face
            .as_face_ref()
            .names()
            .into_iter()
            .find(|name| name.name_id == name_id && name.is_unicode())
            .and_then(|name| name.to_string())
    }

    /// List the named instances declared by the font's `fvar` table. Static fonts
    /// have none.
    pub fn named_instances(&self) -> Vec<NamedInstance> {
        let Some(fvar) = self
            .face
            .as_face_ref()
            .raw_face()
            .table(Tag::from_bytes(b"fvar"))
        else {
            return Vec::new();
        };

        parse_fvar_instances(fvar)
            .unwrap_or_default()
            .into_iter()
            .filter_map(|(name_id, coordinates)| {
                self.name_for(name_id)
                    .map(|name| NamedInstance { name, coordinates })
            })
            .collect()
    }

    /// Select a named instance (e.g. "Bold") by setting every axis it specifies.
    /// On failure the face is left as it was.
    pub fn set_variant(&mut self, name: &str) -> Result<(), VariantError> {
        let instances = self.named_instances();
        if instances.is_empty() {
            return Err(VariantError::NotVariable);
        }

        let instance = instances
            .iter()
            .find(|i| i.name == name)
            .ok_or_else(|| VariantError::UnknownInstance {
                name: name.to_string(),
                available: instances.iter().map(|i| i.name.clone()).collect(),
            })?;

        let axes: Vec<Tag> = self
            .face
            .as_face_ref()
            .variation_axes()
            .into_iter()
            .map(|axis| axis.tag)
            .collect();
        if let Some(axis) = unknown_axis(&instance.coordinates, &axes) {
            return Err(VariantError::AxisRejected {
                name: name.to_string(),
                axis: axis.to_string(),
            });
        }

        for &(axis, value) in instance.coordinates.iter() {
            self.face
                .set_variation(axis, value)
                .ok_or_else(|| VariantError::AxisRejected {
                    name: name.to_string(),
                    axis: axis.to_string(),
                })?;
        }

        self.variant = Some(name.to_string());
        Ok(())
    }

    /// Borrow this face at a pixel size for measuring and drawing
    pub fn at_size(&self, size: u32) -> SizedFont<'_> {
        SizedFont { face: self, size }
    }

    fn scaling(&self, size: u32) -> f32 {
        size as f32 / self.face.as_face_ref().units_per_em() as f32
    }

    /// Calculate the ascent (distance from the baseline to the top of the font) for the given font size
    pub fn ascent(&self, size: u32) -> Px {
        Px(self.scaling(size) * self.face.as_face_ref().ascender() as f32)
    }

    /// Calculate the descent (distance from the baseline to the bottom of the font) for the given
    /// font size. Unlike the raw font metric this is positive for fonts that descend below the
    /// baseline.
    pub fn descent(&self, size: u32) -> Px {
        Px(-self.scaling(size) * self.face.as_face_ref().descender() as f32)
    }

    /// Look up the glyph for a character, falling back to the replacement character and then
    /// to a question mark. Returns `None` only for fonts that have neither.
    pub fn glyph_id(&self, ch: char) -> Option<GlyphId> {
        let face = self.face.as_face_ref();
        face.glyph_index(ch)
            .or_else(|| face.glyph_index('\u{FFFD}'))
            .or_else(|| face.glyph_index('?'))
    }
}

/// The first axis an instance sets that the face does not declare.
fn unknown_axis(coordinates: &[(Tag, f32)], axes: &[Tag]) -> Option<Tag> {
    coordinates
        .iter()
        .map(|&(tag, _)| tag)
        .find(|tag| !axes.contains(tag))
}

/// Reads the instance records out of a raw `fvar` table. Returns the subfamily name id of
/// each instance with its per-axis coordinates, or `None` if the table is truncated.
fn parse_fvar_instances(fvar: &[u8]) -> Option<Vec<(u16, Vec<(Tag, f32)>)>> {
    let u16_at = |offset: usize| -> Option<u16> {
        let bytes = fvar.get(offset..offset + 2)?;
        Some(u16::from_be_bytes([bytes[0], bytes[1]]))
    };
    let fixed_at = |offset: usize| -> Option<f32> {
        let bytes = fvar.get(offset..offset + 4)?;
        let raw = i32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
        Some(raw as f32 / 65536.0)
    };

    let axes_offset = u16_at(4)? as usize;
    let axis_count = u16_at(8)? as usize;
    let axis_size = u16_at(10)? as usize;
    let instance_count = u16_at(12)? as usize;
    let instance_size = u16_at(14)? as usize;

    let mut tags = Vec::with_capacity(axis_count);
    for axis in 0..axis_count {
        let start = axes_offset + axis * axis_size;
        let bytes: [u8; 4] = fvar.get(start..start + 4)?.try_into().ok()?;
        tags.push(Tag::from_bytes(&bytes));
    }

    let instances_offset = axes_offset + axis_count * axis_size;
    let mut instances = Vec::with_capacity(instance_count);
    for instance in 0..instance_count {
        let start = instances_offset + instance * instance_size;
        let name_id = u16_at(start)?;
        let coordinates = tags
            .iter()
            .enumerate()
            .map(|(i, &tag)| fixed_at(start + 4 + i * 4).map(|value| (tag, value)))
            .collect::<Option<Vec<_>>>()?;
        instances.push((name_id, coordinates));
    }

    Some(instances)
}

/// A [FontFace] at a fixed pixel size. This is the handle the layout engine measures with
/// and the image engine draws with.
#[derive(Debug, Clone, Copy)]
pub struct SizedFont<'f> {
    pub face: &'f FontFace,
    pub size: u32,
}

impl<'f> SizedFont<'f> {
    /// Distance from the top of a line to its baseline
    pub fn ascent(&self) -> Px {
        self.face.ascent(self.size)
    }

    /// Build a single fill path for a line of text whose ascender line sits at `top`.
    /// Returns `None` when the text has no ink (empty or all whitespace).
    pub fn line_path(&self, text: &str, left: f32, top: f32) -> Option<tiny_skia::Path> {
        let face = self.face.face.as_face_ref();
        let scale = self.face.scaling(self.size);

        let mut converter = PathConverter {
            builder: PathBuilder::new(),
            scale,
            x: left,
            y: top + self.ascent().0,
        };

        for ch in text.chars() {
            let Some(gid) = self.face.glyph_id(ch) else {
                continue;
            };
            face.outline_glyph(gid, &mut converter);
            converter.x += scale * face.glyph_hor_advance(gid).unwrap_or_default() as f32;
        }

        converter.builder.finish()
    }
}

impl<'f> TextMeasure for SizedFont<'f> {
    /// The ink extent of the text laid out on one line: the right-most inked column and
    /// the lowest inked row, both measured from the line's top-left corner at the
    /// ascender line.
    fn measure(&self, text: &str) -> TextExtent {
        let face = self.face.face.as_face_ref();
        let scale = self.face.scaling(self.size);
        let ascent = self.ascent().0;

        let mut pen_x = 0.0f32;
        let mut width = 0.0f32;
        let mut height = 0.0f32;
        for ch in text.chars() {
            let Some(gid) = self.face.glyph_id(ch) else {
                continue;
            };
            if let Some(bbox) = face.glyph_bounding_box(gid) {
                width = width.max(pen_x + bbox.x_max as f32 * scale);
                height = height.max(ascent - bbox.y_min as f32 * scale);
            }
            pen_x += scale * face.glyph_hor_advance(gid).unwrap_or_default() as f32;
        }

        TextExtent {
            width: Px(width).ceil(),
            height: Px(height).ceil(),
        }
    }

    fn descent(&self) -> Px {
        self.face.descent(self.size)
    }
}

/// Adapts font-unit glyph outlines (y up) into a pixel-space path (y down).
struct PathConverter {
    builder: PathBuilder,
    scale: f32,
    x: f32,
    y: f32,
}

impl OutlineBuilder for PathConverter {
    fn move_to(&mut self, px: f32, py: f32) {
        self.builder
            .move_to(self.x + px * self.scale, self.y - py * self.scale);
    }

    fn line_to(&mut self, px: f32, py: f32) {
        self.builder
            .line_to(self.x + px * self.scale, self.y - py * self.scale);
    }

    fn quad_to(&mut self, x1: f32, y1: f32, px: f32, py: f32) {
        self.builder.quad_to(
            self.x + x1 * self.scale,
            self.y - y1 * self.scale,
            self.x + px * self.scale,
            self.y - py * self.scale,
        );
    }

    fn curve_to(&mut self, x1: f32, y1: f32, x2: f32, y2: f32, px: f32, py: f32) {
        self.builder.cubic_to(
            self.x + x1 * self.scale,
            self.y - y1 * self.scale,
            self.x + x2 * self.scale,
            self.y - y2 * self.scale,
            self.x + px * self.scale,
            self.y - py * self.scale,
        );
    }

    fn close(&mut self) {
        self.builder.close();
    }
}
