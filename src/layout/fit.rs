use super::{wrap, Line, TextMeasure};
use crate::rect::Size;
use crate::{PressError, PressResult};
use tracing::{debug, info};

/// Upper bound on the number of sizes the fit search will try before giving up.
pub const MAX_FIT_TRIES: usize = 64;

/// The outcome of a successful fit search.
#[derive(Debug, Clone, PartialEq)]
pub struct FittedText {
    /// The font size the search settled on
    pub size: u32,
    /// The paragraph wrapped at `size`
    pub lines: Vec<Line>,
    /// How many sizes were tried
    pub tries: usize,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum Direction {
    Up,
    Down,
}

fn round_tenth(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Search for a font size at which `text` wraps into `box_size` without overflowing.
///
/// The search starts from `start_size` and moves by a step that begins at half of
/// it and halves (rounded to a tenth) after every try. A size that fits sends the
/// next try upwards, a size that overflows sends it downwards. Fractional sizes are
/// floored before laying out, and the search settles once the same whole size is
/// accepted twice.
///
/// `font_at` builds the measuring font for a candidate size; any variant the font
/// carries must already be applied to what it returns.
///
/// # Errors
///
/// [PressError::FitConvergence] if the candidate size drops below 1, or if the
/// search has not settled after [MAX_FIT_TRIES] tries. Errors other than
/// [PressError::Overflow] from wrapping are passed through.
pub fn fit<M, F>(
    text: &str,
    box_size: Size,
    start_size: u32,
    mut font_at: F,
) -> PressResult<FittedText>
where
    M: TextMeasure,
    F: FnMut(u32) -> M,
{
    let mut size = start_size as f64;
    let mut step = round_tenth(size / 2.0);
    let mut direction = Direction::Down;
    let mut last_accepted: Option<u32> = None;
    let mut tries = 0;

    while tries < MAX_FIT_TRIES {
        match direction {
            Direction::Up => size += step,
            Direction::Down => size -= step,
        }
        tries += 1;

        let candidate = size.floor();
        if candidate < 1.0 {
            return Err(PressError::FitConvergence {
                tries,
                last_size: candidate as i64,
            });
        }
        let candidate = candidate as u32;

        match wrap(text, &font_at(candidate), box_size, true) {
            Ok(lines) => {
                debug!(size = candidate, tries, "text fits");
                if last_accepted == Some(candidate) {
                    info!(size = candidate, tries, "settled on font size");
                    return Ok(FittedText {
                        size: candidate,
                        lines,
                        tries,
                    });
                }
                last_accepted = Some(candidate);
                direction = Direction::Up;
            }
            Err(e) if e.is_overflow() => {
                debug!(size = candidate, tries, "text overflows");
                direction = Direction::Down;
            }
            Err(e) => return Err(e),
        }

        step = round_tenth(step / 2.0);
    }

    Err(PressError::FitConvergence {
        tries,
        last_size: size.floor() as i64,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::testing::MonoFont;
    use crate::layout::TextExtent;
    use crate::units::Px;

    #[test]
    fn rounds_steps_to_a_tenth() {
        assert_eq!(round_tenth(12.5), 12.5);
        assert_eq!(round_tenth(6.25), 6.3);
        assert_eq!(round_tenth(0.04), 0.0);
    }

    #[test]
    fn settles_on_the_largest_fitting_size() {
        // "abcd" is 2 * size wide, so 50 is the largest size that fits 100px
        let fitted = fit("abcd", Size::new(100, 1000), 100, MonoFont::at_size).unwrap();
        assert_eq!(fitted.size, 50);
        assert_eq!(fitted.lines, vec![vec!["abcd".to_string()]]);
        assert!(fitted.tries <= MAX_FIT_TRIES);
    }

    #[test]
    fn is_deterministic() {
        let a = fit(
            "What Goes Up Must Come Down",
            Size::new(600, 300),
            200,
            MonoFont::at_size,
        )
        .unwrap();
        let b = fit(
            "What Goes Up Must Come Down",
            Size::new(600, 300),
            200,
            MonoFont::at_size,
        )
        .unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn fitted_lines_wrap_strictly_at_the_chosen_size() {
        let box_size = Size::new(3800, 3800);
        let fitted = fit(
            "What Goes Up Must Come Down",
            box_size,
            1000,
            MonoFont::at_size,
        )
        .unwrap();

        assert!(fitted.size >= 1);
        assert!(!fitted.lines.is_empty());
        let again = wrap(
            "What Goes Up Must Come Down",
            &MonoFont::at_size(fitted.size),
            box_size,
            true,
        )
        .unwrap();
        assert_eq!(again, fitted.lines);
    }

    #[test]
    fn asks_for_each_candidate_size() {
        let mut asked = Vec::new();
        let _ = fit("abcd", Size::new(100, 1000), 100, |size| {
            asked.push(size);
            MonoFont::at_size(size)
        });
        assert_eq!(asked.first(), Some(&50));
        assert_eq!(asked.last(), Some(&50));
        assert!(asked.iter().all(|&s| s >= 1));
    }

    #[test]
    fn text_that_never_fits_fails_to_converge() {
        let err = fit("abcd", Size::new(1, 1000), 10, MonoFont::at_size).unwrap_err();
        assert!(matches!(err, PressError::FitConvergence { .. }));
    }

    /// Fits at any size.
    struct Bottomless;

    impl TextMeasure for Bottomless {
        fn measure(&self, _text: &str) -> TextExtent {
            TextExtent::default()
        }

        fn descent(&self) -> Px {
            Px::ZERO
        }
    }

    /// Fits or overflows at any size, as told.
    struct Switch(bool);

    impl TextMeasure for Switch {
        fn measure(&self, _text: &str) -> TextExtent {
            let width = if self.0 { Px::ZERO } else { Px(f32::MAX) };
            TextExtent {
                width,
                height: Px::ZERO,
            }
        }

        fn descent(&self) -> Px {
            Px::ZERO
        }
    }

    #[test]
    fn search_that_never_settles_hits_the_try_cap() {
        // each size fits only the first time it is asked for, so none is accepted twice
        let mut seen = std::collections::HashSet::new();
        let err = fit("a", Size::new(100, 100), 100, |size| Switch(seen.insert(size)))
            .unwrap_err();
        match err {
            PressError::FitConvergence { tries, last_size } => {
                assert_eq!(tries, MAX_FIT_TRIES);
                assert!(last_size >= 1);
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn start_size_of_one_fails_fast() {
        let err = fit("a", Size::new(100, 100), 1, |_| Bottomless).unwrap_err();
        match err {
            PressError::FitConvergence { tries, last_size } => {
                assert_eq!(tries, 1);
                assert_eq!(last_size, 0);
            }
            other => panic!("unexpected error {other:?}"),
        }
    }
}
