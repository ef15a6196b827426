pub mod allocation;
pub mod error;
pub mod font;
pub mod geometry;
pub mod glyph_cache;
pub mod math;
pub mod operations;
pub mod tessellation;

pub use error::{GlyphforgeError, Result};
