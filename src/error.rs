use std::path::PathBuf;
use thiserror::Error;

/// All errors that the crate can generate
#[derive(Error, Debug)]
pub enum PressError {
    #[error("area {area}: key {key} is required")]
    /// A required key was absent from a raw area record
    MissingField { area: String, key: String },

    #[error("area {area}: key {key} is {actual}, but expected {expected}")]
    /// A key was present but held a value of the wrong type (or out of its range)
    TypeMismatch {
        area: String,
        key: String,
        expected: String,
        actual: String,
    },

    #[error("area {area}: key type has to be \"image\" or \"text\", not \"{kind}\"")]
    /// The `type` key named neither an image nor a text area
    InvalidKind { area: String, kind: String },

    #[error("area {area}: key {key} {reason}")]
    /// A colour was not an RGB triple of bytes
    ColourRange {
        area: String,
        key: String,
        reason: String,
    },

    #[error("area {area}: key {key} has {found} values (expected {expected})")]
    /// A positional list had the wrong number of components
    Arity {
        area: String,
        key: String,
        found: usize,
        expected: usize,
    },

    #[error("area {area}: key filter_data has {found} values (expected {expected} for {filter})")]
    /// A filter was given the wrong number of parameters
    FilterArity {
        area: String,
        filter: String,
        found: usize,
        expected: usize,
    },

    #[error("area {area}: key filter_data has values with unexpected types for {filter}")]
    /// A filter parameter was not numeric
    FilterType { area: String, filter: String },

    #[error("area {area}: {} is non-existent", .path.display())]
    /// A font or image path did not point at a file
    FileNotFound { area: String, path: PathBuf },

    #[error("text does not fit its {width}x{height} box")]
    /// Strict wrapping could not fit text into its box. The fit search consumes this
    /// as a signal to shrink; it only escapes from [crate::layout::wrap] callers that
    /// ask for strict layout themselves.
    Overflow { width: u32, height: u32 },

    #[error("font size search did not settle after {tries} tries (last size {last_size})")]
    /// The font size search ran out of tries or sizes before settling
    FitConvergence { tries: usize, last_size: i64 },

    #[error("could not allocate a {width}x{height} raster")]
    /// [tiny_skia] refused to allocate a pixmap of the given size
    Raster { width: u32, height: u32 },

    #[error(transparent)]
    /// An I/O error occurred
    Io(#[from] std::io::Error),

    #[error(transparent)]
    /// [owned_ttf_parser] failed to parse the font
    FaceParsing(#[from] owned_ttf_parser::FaceParsingError),

    #[error(transparent)]
    /// [image] failed to decode or encode an image
    Image(#[from] image::ImageError),

    #[error(transparent)]
    /// [serde_json] failed to parse a placement source
    Json(#[from] serde_json::Error),
}

/// Shorthand for results carrying a [PressError]
pub type PressResult<T> = Result<T, PressError>;

impl PressError {
    /// True for the internal signal strict wrapping raises when text does not fit
    pub fn is_overflow(&self) -> bool {
        matches!(self, PressError::Overflow { .. })
    }
}
