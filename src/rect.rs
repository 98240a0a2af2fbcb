use crate::units::Px;

/// An integer offset onto the base image. Components may be negative, which places
/// part of an area outside the canvas.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub fn new(x: i32, y: i32) -> Point {
        Point { x, y }
    }
}

/// A width and height in pixels, used both for resize targets and for the bounds
/// that text is wrapped and fitted into.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub struct Size {
    pub width: u32,
    pub height: u32,
}

impl Size {
    pub fn new(width: u32, height: u32) -> Size {
        Size { width, height }
    }

    /// The width as a layout length
    pub fn width_px(&self) -> Px {
        Px::from(self.width)
    }

    /// The height as a layout length
    pub fn height_px(&self) -> Px {
        Px::from(self.height)
    }
}

impl From<(u32, u32)> for Size {
    fn from((width, height): (u32, u32)) -> Self {
        Size { width, height }
    }
}

impl From<(i32, i32)> for Point {
    fn from((x, y): (i32, i32)) -> Self {
        Point { x, y }
    }
}
