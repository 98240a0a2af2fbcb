use derive_more::{Add, AddAssign, Display, From, Into, Mul, Sub, Sum};

/// A length in device pixels. Font metrics are scaled from font units into pixels
/// before they reach the layout code, so everything the layout engine compares
/// against a box size is expressed in this unit.
#[derive(
    Debug, Default, Copy, Clone, PartialEq, PartialOrd, Add, AddAssign, Sub, Mul, Sum, From, Into,
    Display,
)]
#[display("{_0}px")]
pub struct Px(pub f32);

impl Px {
    pub const ZERO: Px = Px(0.0);

    /// The larger of two lengths
    pub fn max(self, other: Px) -> Px {
        Px(self.0.max(other.0))
    }

    /// Round up to the next whole pixel
    pub fn ceil(self) -> Px {
        Px(self.0.ceil())
    }
}

impl From<u32> for Px {
    fn from(value: u32) -> Self {
        Px(value as f32)
    }
}
