//! The loosely-typed record model that placements arrive in, and the generic
//! field lookup every area kind is validated with.

use crate::{PressError, PressResult};
use image::RgbaImage;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// A single field value as it arrives from a placement source, before validation.
#[derive(Clone)]
pub enum RawValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    List(Vec<RawValue>),
    Map(BTreeMap<String, RawValue>),
    /// An already decoded image supplied in place of a path
    Bitmap(Arc<RgbaImage>),
}

/// The fields of one area, keyed by field name.
pub type RawRecord = BTreeMap<String, RawValue>;

/// The runtime type of a [RawValue], as named in validation errors.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum FieldType {
    Null,
    Bool,
    Int,
    Float,
    Str,
    List,
    Map,
    Bitmap,
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FieldType::Null => "null",
            FieldType::Bool => "bool",
            FieldType::Int => "int",
            FieldType::Float => "float",
            FieldType::Str => "string",
            FieldType::List => "list",
            FieldType::Map => "object",
            FieldType::Bitmap => "bitmap",
        };
        f.write_str(name)
    }
}

impl RawValue {
    pub fn field_type(&self) -> FieldType {
        match self {
            RawValue::Null => FieldType::Null,
            RawValue::Bool(_) => FieldType::Bool,
            RawValue::Int(_) => FieldType::Int,
            RawValue::Float(_) => FieldType::Float,
            RawValue::Str(_) => FieldType::Str,
            RawValue::List(_) => FieldType::List,
            RawValue::Map(_) => FieldType::Map,
            RawValue::Bitmap(_) => FieldType::Bitmap,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            RawValue::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            RawValue::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            RawValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[RawValue]> {
        match self {
            RawValue::List(items) => Some(items),
            _ => None,
        }
    }
}

impl fmt::Debug for RawValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RawValue::Null => f.write_str("Null"),
            RawValue::Bool(b) => f.debug_tuple("Bool").field(b).finish(),
            RawValue::Int(i) => f.debug_tuple("Int").field(i).finish(),
            RawValue::Float(x) => f.debug_tuple("Float").field(x).finish(),
            RawValue::Str(s) => f.debug_tuple("Str").field(s).finish(),
            RawValue::List(items) => f.debug_tuple("List").field(items).finish(),
            RawValue::Map(map) => f.debug_tuple("Map").field(map).finish(),
            RawValue::Bitmap(img) => write!(f, "Bitmap({}x{})", img.width(), img.height()),
        }
    }
}

impl PartialEq for RawValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (RawValue::Null, RawValue::Null) => true,
            (RawValue::Bool(a), RawValue::Bool(b)) => a == b,
            (RawValue::Int(a), RawValue::Int(b)) => a == b,
            (RawValue::Float(a), RawValue::Float(b)) => a == b,
            (RawValue::Str(a), RawValue::Str(b)) => a == b,
            (RawValue::List(a), RawValue::List(b)) => a == b,
            (RawValue::Map(a), RawValue::Map(b)) => a == b,
            (RawValue::Bitmap(a), RawValue::Bitmap(b)) => Arc::ptr_eq(a, b) || a == b,
            _ => false,
        }
    }
}

impl From<serde_json::Value> for RawValue {
    fn from(value: serde_json::Value) -> Self {
        use serde_json::Value;

        match value {
            Value::Null => RawValue::Null,
            Value::Bool(b) => RawValue::Bool(b),
            Value::Number(n) => n
                .as_i64()
                .map(RawValue::Int)
                .or_else(|| n.as_f64().map(RawValue::Float))
                .unwrap_or(RawValue::Null),
            Value::String(s) => RawValue::Str(s),
            Value::Array(items) => RawValue::List(items.into_iter().map(RawValue::from).collect()),
            Value::Object(map) => RawValue::Map(
                map.into_iter()
                    .map(|(k, v)| (k, RawValue::from(v)))
                    .collect(),
            ),
        }
    }
}

impl From<&str> for RawValue {
    fn from(s: &str) -> Self {
        RawValue::Str(s.to_string())
    }
}

impl From<String> for RawValue {
    fn from(s: String) -> Self {
        RawValue::Str(s)
    }
}

impl From<i64> for RawValue {
    fn from(i: i64) -> Self {
        RawValue::Int(i)
    }
}

impl From<bool> for RawValue {
    fn from(b: bool) -> Self {
        RawValue::Bool(b)
    }
}

impl From<RgbaImage> for RawValue {
    fn from(img: RgbaImage) -> Self {
        RawValue::Bitmap(Arc::new(img))
    }
}

impl<T: Into<RawValue>> From<Vec<T>> for RawValue {
    fn from(items: Vec<T>) -> Self {
        RawValue::List(items.into_iter().map(Into::into).collect())
    }
}

/// What an absent optional field turns into.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum Fallback {
    /// The field stays absent
    Absent,
    Bool(bool),
    Int(i64),
    IntList(&'static [i64]),
}

impl Fallback {
    fn value(self) -> Option<RawValue> {
        match self {
            Fallback::Absent => None,
            Fallback::Bool(b) => Some(RawValue::Bool(b)),
            Fallback::Int(i) => Some(RawValue::Int(i)),
            Fallback::IntList(items) => Some(RawValue::List(
                items.iter().copied().map(RawValue::Int).collect(),
            )),
        }
    }
}

/// One row of an area kind's schema table.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct FieldSpec {
    pub key: &'static str,
    pub types: &'static [FieldType],
    pub required: bool,
    pub fallback: Fallback,
}

impl FieldSpec {
    pub const fn required(key: &'static str, types: &'static [FieldType]) -> FieldSpec {
        FieldSpec {
            key,
            types,
            required: true,
            fallback: Fallback::Absent,
        }
    }

    pub const fn optional(
        key: &'static str,
        types: &'static [FieldType],
        fallback: Fallback,
    ) -> FieldSpec {
        FieldSpec {
            key,
            types,
            required: false,
            fallback,
        }
    }
}

/// Look a field up in `record`, checking its presence and type.
///
/// Absent fields fail with [PressError::MissingField] when `required`, and otherwise
/// yield `fallback` (which may itself be absent). Present fields must have one of
/// `types` exactly; nothing is coerced, so `true` is not an int and `1` is not a
/// float. `area` names the record in errors.
pub fn retrieve(
    record: &RawRecord,
    key: &str,
    types: &[FieldType],
    required: bool,
    fallback: Fallback,
    area: &str,
) -> PressResult<Option<RawValue>> {
    let Some(value) = record.get(key) else {
        if required {
            return Err(PressError::MissingField {
                area: area.to_string(),
                key: key.to_string(),
            });
        }
        return Ok(fallback.value());
    };

    let actual = value.field_type();
    if !types.contains(&actual) {
        return Err(PressError::TypeMismatch {
            area: area.to_string(),
            key: key.to_string(),
            expected: expected_names(types),
            actual: actual.to_string(),
        });
    }

    Ok(Some(value.clone()))
}

/// [retrieve] driven by a schema table row.
pub fn retrieve_field(
    record: &RawRecord,
    spec: &FieldSpec,
    area: &str,
) -> PressResult<Option<RawValue>> {
    retrieve(
        record,
        spec.key,
        spec.types,
        spec.required,
        spec.fallback,
        area,
    )
}

fn expected_names(types: &[FieldType]) -> String {
    types
        .iter()
        .map(FieldType::to_string)
        .collect::<Vec<_>>()
        .join(" or ")
}
