//! Composite declarative image and text placements onto a base image.
//!
//! Placements arrive as loosely-typed records ([RawPlacements]), are validated and
//! normalised into typed areas ([Placements]), and are then painted in order by
//! [compose]. Text areas are word-wrapped into their box, and can search for the
//! font size at which they fit; see [layout].
//!
//! ```no_run
//! use thumbpress::{compose, RasterEngine, RawPlacements};
//!
//! let engine = RasterEngine;
//! let placements = RawPlacements::from_path("placements.json")?.normalize(&engine)?;
//! let base = image::open("base.png")?;
//! compose(base, &placements, &engine)?.save("thumbnail.png")?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

mod colour;
pub use colour::*;

mod compositor;
pub use compositor::*;

mod font;
pub use font::*;

mod image;
pub use self::image::*;

/// Word wrapping and font size fitting for text boxes
pub mod layout;

/// Separable blur kernels used by the image filters
pub mod blur;

mod placements;
pub use placements::*;

mod rect;
pub use rect::*;

mod schema;
pub use schema::*;

mod units;
pub use units::*;

mod error;
pub use error::*;
