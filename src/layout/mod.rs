//! Text layout for fixed-size text boxes.
//!
//! Text areas are laid out by a single greedy pass that breaks a paragraph into
//! lines no wider than the box, and gives up with an ellipsis (or an error, in
//! strict mode) once the lines stop fitting vertically. On top of that, the fit
//! search looks for a font size at which the whole paragraph fits.
//!
//! # Layout Functions
//!
//! - [`wrap`](crate::layout::wrap) - greedy word wrap with ellipsis truncation
//! - [`fit`](crate::layout::fit) - step-halving font size search built on strict wrapping
//!
//! Both work against any [TextMeasure], so they can be driven by a real font
//! ([crate::SizedFont]) or by a stand-in with synthetic metrics.
//!
//! # Example
//!
//! ```
//! use thumbpress::{FontFace, Size};
//! use thumbpress::layout::wrap;
//!
//! let font_data = include_bytes!(concat!(env!("CARGO_MANIFEST_DIR"), "/assets/DejaVuSans.ttf"));
//! let font = FontFace::load(font_data.to_vec()).expect("can load font");
//!
//! let lines = wrap(
//!     "What Goes Up Must Come Down",
//!     &font.at_size(48),
//!     Size::new(400, 400),
//!     false,
//! )
//! .expect("non-strict wrapping does not fail");
//! assert!(lines.len() > 1);
//! ```

use crate::units::Px;

mod fit;
mod wrap;

pub use fit::*;
pub use wrap::*;

/// One laid-out line: the words to draw, joined by single spaces.
pub type Line = Vec<String>;

/// The marker that replaces the last visible word when text is truncated.
pub const ELLIPSIS: &str = "\u{2026}";

/// The rendered extent of a run of text on a single line.
#[derive(Debug, Default, Copy, Clone, PartialEq)]
pub struct TextExtent {
    /// Right-most inked column, measured from the line's left edge.
    pub width: Px,
    /// Lowest inked row, measured from the line's top edge.
    pub height: Px,
}

/// The measuring capability the layout engine needs from a font.
pub trait TextMeasure {
    /// Measure `text` as a single line.
    fn measure(&self, text: &str) -> TextExtent;

    /// The font's descent below the baseline, as a positive length.
    fn descent(&self) -> Px;
}

/// Join the words of a line for measuring or drawing.
pub fn line_text(line: &[String]) -> String {
    line.join(" ")
}
