use image::Rgba;

/// An opaque RGB colour. Opacity is carried separately by each area field that
/// uses a colour, and is attached with [Colour::with_opacity] at paint time.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Default)]
pub struct Colour {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Colour {
    /// Create a new colour in the RGB space. r, g, and b range from 0 to 255
    pub fn new_rgb_bytes(r: u8, g: u8, b: u8) -> Colour {
        Colour { r, g, b }
    }

    /// Combine this colour with an alpha value into a straight (non-premultiplied)
    /// RGBA pixel
    pub fn with_opacity(self, opacity: u8) -> Rgba<u8> {
        Rgba([self.r, self.g, self.b, opacity])
    }
}

impl From<[u8; 3]> for Colour {
    fn from(c: [u8; 3]) -> Self {
        let [r, g, b] = c;
        Colour { r, g, b }
    }
}

impl From<(u8, u8, u8)> for Colour {
    fn from(c: (u8, u8, u8)) -> Self {
        Colour {
            r: c.0,
            g: c.1,
            b: c.2,
        }
    }
}

/// A list of pre-defined colour constants
pub mod colours {
    use super::*;

    pub const BLACK: Colour = Colour { r: 0, g: 0, b: 0 };
    pub const WHITE: Colour = Colour {
        r: 255,
        g: 255,
        b: 255,
    };
}
