pub mod bezier;
pub mod predicates;

/// 2D point type. Glyph geometry is stored in single precision.
pub type Point2 = nalgebra::Point2<f32>;

/// Default absolute tolerance for point-on-edge and edge-on-edge tests.
pub const EPSILON: f32 = 1e-6;
