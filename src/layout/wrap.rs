use super::{line_text, Line, TextExtent, TextMeasure, ELLIPSIS};
use crate::rect::Size;
use crate::units::Px;
use crate::{PressError, PressResult};
use tracing::warn;

/// Lays out a paragraph into lines that fit `box_size`, breaking only at whitespace.
///
/// # Wrapping Behavior
///
/// Words are taken left to right and appended to the open line. When the open line
/// becomes wider than the box, the word that tipped it over moves to a fresh line
/// and the previous line is closed. Closed lines are never revisited.
///
/// A word that is wider than the box on its own cannot be wrapped. When the whole
/// text is that one word, strict mode fails with [PressError::Overflow]. Otherwise a
/// warning is logged and the word is left to render past the edge of the box; only
/// the height decides whether text of several words fits.
///
/// # Height Bookkeeping
///
/// Each line contributes `max(height + descent, height)` of its measured ink. The
/// heights of closed lines are summed as they close, and after every word the sum
/// plus the open line's height is compared against the box height. On the first
/// overrun, strict mode fails with [PressError::Overflow]. Non-strict mode drops the
/// open line, replaces the last word of the line above with [ELLIPSIS], and stops.
///
/// # Returns
///
/// The lines in drawing order. The result never starts with an empty line, and is
/// empty only for text without words or text whose first line does not fit.
pub fn wrap<M: TextMeasure + ?Sized>(
    text: &str,
    font: &M,
    box_size: Size,
    strict: bool,
) -> PressResult<Vec<Line>> {
    let words: Vec<&str> = text.split_whitespace().collect();
    let multi_word = words.len() > 1;

    let max_width = box_size.width_px();
    let max_height = box_size.height_px();
    let descent = font.descent();
    let line_height = |extent: TextExtent| (extent.height + descent).max(extent.height);

    let overflow = || PressError::Overflow {
        width: box_size.width,
        height: box_size.height,
    };

    let mut lines: Vec<Line> = Vec::new();
    let mut open: Line = Vec::new();
    let mut closed_height = Px::ZERO;
    let mut open_height = Px::ZERO;
    let mut truncated = false;

    for word in words {
        open.push(word.to_string());
        let extent = font.measure(&line_text(&open));

        if extent.width > max_width && multi_word {
            // roll the word over onto a fresh line
            let moved = open.pop().unwrap_or_default();
            lines.push(std::mem::take(&mut open));
            closed_height += open_height;

            let extent = font.measure(&moved);
            open.push(moved);
            open_height = line_height(extent);

            if extent.width > max_width {
                warn_too_wide(&open, extent, box_size);
            }
        } else {
            if extent.width > max_width {
                if strict {
                    return Err(overflow());
                }
                warn_too_wide(&open, extent, box_size);
            }
            open_height = open_height.max(line_height(extent));
        }

        if closed_height + open_height > max_height {
            if strict {
                return Err(overflow());
            }

            warn!(
                text_height = %(closed_height + open_height),
                box_height = box_size.height,
                "text is too tall for its box, truncating"
            );
            if let Some(last) = lines.last_mut().and_then(|line| line.last_mut()) {
                *last = ELLIPSIS.to_string();
            }
            truncated = true;
            break;
        }
    }

    if !truncated && !open.is_empty() {
        lines.push(open);
    }

    if lines.first().is_some_and(|line| line.is_empty()) {
        lines.remove(0);
    }

    Ok(lines)
}

fn warn_too_wide(line: &[String], extent: TextExtent, box_size: Size) {
    warn!(
        text = %line_text(line),
        text_width = %extent.width,
        text_height = %extent.height,
        box_width = box_size.width,
        box_height = box_size.height,
        "text exceeds the box and will not be displayed properly"
    );
}
