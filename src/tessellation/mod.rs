//! Glyph tessellation.
//!
//! A [`Tessellator`] walks a glyph outline from a [`FontProvider`], breaks it
//! into contours over a shared vertex buffer and turns it into GPU-ready
//! index buffers according to its [`TessellationStrategy`].

mod compositor;
mod decompose;
mod distance_field;
mod glyph;
mod sdf;
mod tessellation_shaders;
mod triangulate;
mod triangulation;
mod winding_number;

pub use compositor::GlyphCompositor;
pub use distance_field::SdfTile;
pub use glyph::{BoundingBox, Glyph, IndexBufferKind};

use tracing::{trace, warn};

use crate::error::{GlyphforgeError, Result, TessellationError};
use crate::font::{FontProvider, GlyphId};
use crate::geometry::Outline;
use crate::math::{Point2, EPSILON};
use crate::operations::polygon::PolygonOperator;

use self::decompose::OutlineDecomposer;

/// How a glyph is turned into drawable geometry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TessellationStrategy {
    /// Curves are flattened and the filled area is triangulated.
    #[default]
    Triangulation,
    /// The area inside the curve chords is triangulated; curves are kept as
    /// `start, control, end` triples for a tessellation shader.
    TessellationShaders,
    /// A bounding box quad, filled from a signed distance field.
    Sdf,
    /// A bounding box quad plus the raw line and curve segments, filled by
    /// evaluating the winding number per fragment.
    WindingNumber,
}

/// Largest side length accepted for generated distance tiles.
pub const MAX_SDF_RESOLUTION: u32 = 4096;

/// Parameters controlling tessellation quality.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TessellationParams {
    /// Maximum distance between a quadratic curve and its flattened polyline.
    pub flatness: f32,
    /// Tolerance of the polygon union predicates.
    pub epsilon: f32,
    /// Maximum recursion depth when subdividing a curve.
    pub max_subdivision_depth: u32,
    /// Margin added around the bounding box quad of SDF glyphs.
    pub sdf_padding: f32,
    /// Side length of the distance tile generated for SDF glyphs, at most
    /// [`MAX_SDF_RESOLUTION`]. `None` leaves the distance field to an
    /// external atlas.
    pub sdf_resolution: Option<u32>,
}

impl Default for TessellationParams {
    fn default() -> Self {
        Self {
            flatness: 0.25,
            epsilon: EPSILON,
            max_subdivision_depth: 8,
            sdf_padding: 1.0,
            sdf_resolution: None,
        }
    }
}

impl TessellationParams {
    /// Checks that every parameter is usable.
    ///
    /// # Errors
    ///
    /// Returns [`TessellationError::InvalidParameters`] naming the first bad field.
    pub fn validate(&self) -> std::result::Result<(), TessellationError> {
        if !(self.flatness.is_finite() && self.flatness > 0.0) {
            return Err(TessellationError::InvalidParameters(format!(
                "flatness must be positive, got {}",
                self.flatness
            )));
        }
        if !(self.epsilon.is_finite() && self.epsilon > 0.0) {
            return Err(TessellationError::InvalidParameters(format!(
                "epsilon must be positive, got {}",
                self.epsilon
            )));
        }
        if !(self.sdf_padding.is_finite() && self.sdf_padding >= 0.0) {
            return Err(TessellationError::InvalidParameters(format!(
                "sdf_padding must be non-negative, got {}",
                self.sdf_padding
            )));
        }
        if let Some(resolution) = self.sdf_resolution {
            if !(1..=MAX_SDF_RESOLUTION).contains(&resolution) {
                return Err(TessellationError::InvalidParameters(format!(
                    "sdf_resolution must be within 1..={MAX_SDF_RESOLUTION}, got {resolution}"
                )));
            }
        }
        Ok(())
    }
}

/// Composes glyphs from font outlines.
///
/// Holds scratch state reused between glyphs, so one instance serves one
/// thread at a time.
#[derive(Debug)]
pub struct Tessellator {
    strategy: TessellationStrategy,
    params: TessellationParams,
    decomposer: OutlineDecomposer,
    operator: PolygonOperator,
}

impl Tessellator {
    /// Creates a tessellator for `strategy`.
    ///
    /// # Errors
    ///
    /// Returns an error if `params` does not validate.
    pub fn new(strategy: TessellationStrategy, params: TessellationParams) -> Result<Self> {
        params.validate()?;
        Ok(Self {
            strategy,
            params,
            decomposer: OutlineDecomposer::default(),
            operator: PolygonOperator::with_epsilon(params.epsilon),
        })
    }

    #[must_use]
    pub fn strategy(&self) -> TessellationStrategy {
        self.strategy
    }

    #[must_use]
    pub fn params(&self) -> &TessellationParams {
        &self.params
    }

    /// Composes `glyph_id` of `font` at `font_size`.
    ///
    /// Glyphs without contours come back empty. If the outline cannot be
    /// unioned or triangulated the glyph falls back to the winding number
    /// strategy, which is recorded in [`Glyph::strategy`].
    ///
    /// # Errors
    ///
    /// Returns an error if the font size or the font's units per em is not
    /// positive, or if the font cannot provide the glyph.
    pub fn compose_glyph(
        &mut self,
        font: &dyn FontProvider,
        glyph_id: GlyphId,
        font_size: f32,
    ) -> Result<Glyph> {
        let units_per_em = font.units_per_em();
        if !(font_size > 0.0 && units_per_em > 0.0) {
            return Err(TessellationError::InvalidParameters(format!(
                "cannot scale glyph {glyph_id}: font size {font_size}, units per em {units_per_em}"
            ))
            .into());
        }
        let scale = font_size / units_per_em;
        let metrics = font.glyph_metrics(glyph_id)?.scaled(scale);

        self.decomposer.begin(scale);
        font.outline(glyph_id, &mut self.decomposer)?;
        let outline = self.decomposer.finish();

        let mut glyph = Glyph::empty(glyph_id, self.strategy, metrics);
        if outline.contours.is_empty() {
            trace!(glyph_id, "glyph has no contours");
            return Ok(glyph);
        }

        let composed = match self.strategy {
            TessellationStrategy::Triangulation => {
                triangulation::build(&mut glyph, &outline, &self.params, &mut self.operator)
            }
            TessellationStrategy::TessellationShaders => {
                tessellation_shaders::build(&mut glyph, &outline, &mut self.operator)
            }
            TessellationStrategy::Sdf => {
                sdf::build(&mut glyph, &outline, &self.params);
                Ok(())
            }
            TessellationStrategy::WindingNumber => {
                winding_number::build(&mut glyph, &outline);
                Ok(())
            }
        };

        match composed {
            Ok(()) => Ok(glyph),
            Err(err @ (GlyphforgeError::Geometry(_) | GlyphforgeError::Tessellation(_))) => {
                warn!(glyph_id, strategy = ?self.strategy, error = %err, "falling back to winding number rendering");
                glyph.clear_geometry();
                glyph.strategy = TessellationStrategy::WindingNumber;
                winding_number::build(&mut glyph, &outline);
                Ok(glyph)
            }
            Err(err) => Err(err),
        }
    }
}

/// Unions all contours of a glyph into simple outlines in one pass, so the
/// nonzero fill sees the winding of every contour at once.
fn union_all(
    operator: &mut PolygonOperator,
    vertices: &mut Vec<Point2>,
    outlines: &[Outline],
) -> Result<Vec<Outline>> {
    Ok(operator.join(vertices, outlines, &[])?.to_vec())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
pub(crate) mod tests {
    use super::*;
    use crate::error::FontError;
    use crate::font::{GlyphMetrics, OutlineSink};
    use crate::math::predicates;
    use approx::assert_relative_eq;

    /// Glyph 1 is a rectangle, 2 a square with a square hole, 3 a rounded
    /// bump, 4 two overlapping squares and 32 a space.
    ///
    /// Glyph 5 is a triangle with a subnormal corner coordinate, which the
    /// CDT refuses to insert; glyph 6 adds a separate square to it. Glyphs 7
    /// and 8 are a square crossed by a bar and cut by a counter, with the
    /// bar and counter contours in opposite order.
    pub(crate) struct TestFont;

    fn tiny_triangle() -> [(f32, f32); 3] {
        [(f32::from_bits(1), 0.0), (40.0, 0.0), (0.0, 40.0)]
    }

    const OUTER: [(f32, f32); 4] = [(0.0, 0.0), (0.0, 100.0), (100.0, 100.0), (100.0, 0.0)];
    const BAR: [(f32, f32); 4] = [(45.0, -10.0), (45.0, 110.0), (55.0, 110.0), (55.0, -10.0)];
    const COUNTER: [(f32, f32); 4] = [(30.0, 30.0), (70.0, 30.0), (70.0, 70.0), (30.0, 70.0)];

    fn polygon(sink: &mut dyn OutlineSink, points: &[(f32, f32)]) {
        let Some((&(x, y), rest)) = points.split_first() else {
            return;
        };
        sink.move_to(x, y);
        for &(x, y) in rest {
            sink.line_to(x, y);
        }
        sink.close();
    }

    impl FontProvider for TestFont {
        fn name(&self) -> &str {
            "test"
        }

        fn units_per_em(&self) -> f32 {
            64.0
        }

        fn glyph_metrics(&self, glyph_id: GlyphId) -> Result<GlyphMetrics> {
            match glyph_id {
                1..=8 | 32 => Ok(GlyphMetrics {
                    width: 40.0,
                    height: 40.0,
                    bearing_x: 0.0,
                    bearing_y: 40.0,
                    advance_x: 48.0,
                    advance_y: 0.0,
                }),
                _ => Err(FontError::GlyphNotFound(glyph_id).into()),
            }
        }

        fn outline(&self, glyph_id: GlyphId, sink: &mut dyn OutlineSink) -> Result<()> {
            match glyph_id {
                1 => {
                    sink.move_to(0.0, 0.0);
                    sink.line_to(32.0, 0.0);
                    sink.line_to(32.0, 16.0);
                    sink.line_to(0.0, 16.0);
                    sink.close();
                }
                2 => {
                    sink.move_to(0.0, 0.0);
                    sink.line_to(0.0, 40.0);
                    sink.line_to(40.0, 40.0);
                    sink.line_to(40.0, 0.0);
                    sink.close();
                    sink.move_to(10.0, 10.0);
                    sink.line_to(30.0, 10.0);
                    sink.line_to(30.0, 30.0);
                    sink.line_to(10.0, 30.0);
                    sink.close();
                }
                3 => {
                    sink.move_to(0.0, 0.0);
                    sink.line_to(40.0, 0.0);
                    sink.quad_to(20.0, 40.0, 0.0, 0.0);
                    sink.close();
                }
                4 => {
                    sink.move_to(0.0, 0.0);
                    sink.line_to(20.0, 0.0);
                    sink.line_to(20.0, 20.0);
                    sink.line_to(0.0, 20.0);
                    sink.close();
                    sink.move_to(10.0, 10.0);
                    sink.line_to(30.0, 10.0);
                    sink.line_to(30.0, 30.0);
                    sink.line_to(10.0, 30.0);
                    sink.close();
                }
                5 => polygon(sink, &tiny_triangle()),
                6 => {
                    polygon(sink, &tiny_triangle());
                    polygon(sink, &[(60.0, 0.0), (80.0, 0.0), (80.0, 20.0), (60.0, 20.0)]);
                }
                7 => {
                    for contour in [&OUTER, &BAR, &COUNTER] {
                        polygon(sink, contour);
                    }
                }
                8 => {
                    for contour in [&OUTER, &COUNTER, &BAR] {
                        polygon(sink, contour);
                    }
                }
                32 => {}
                _ => return Err(FontError::GlyphNotFound(glyph_id).into()),
            }
            Ok(())
        }
    }

    fn compose(strategy: TessellationStrategy, glyph_id: GlyphId) -> Glyph {
        let mut tessellator = Tessellator::new(strategy, TessellationParams::default()).unwrap();
        tessellator.compose_glyph(&TestFont, glyph_id, 64.0).unwrap()
    }

    #[test]
    fn invalid_params_are_rejected() {
        let params = TessellationParams {
            flatness: 0.0,
            ..TessellationParams::default()
        };
        assert!(Tessellator::new(TessellationStrategy::Triangulation, params).is_err());
        for resolution in [0, MAX_SDF_RESOLUTION + 1, u32::MAX] {
            let params = TessellationParams {
                sdf_resolution: Some(resolution),
                ..TessellationParams::default()
            };
            assert!(matches!(
                params.validate(),
                Err(TessellationError::InvalidParameters(_))
            ));
        }
        let params = TessellationParams {
            sdf_resolution: Some(MAX_SDF_RESOLUTION),
            ..TessellationParams::default()
        };
        assert!(params.validate().is_ok());
    }

    #[test]
    fn non_positive_font_size_is_rejected() {
        let mut tessellator =
            Tessellator::new(TessellationStrategy::Triangulation, TessellationParams::default())
                .unwrap();
        assert!(tessellator.compose_glyph(&TestFont, 1, 0.0).is_err());
    }

    #[test]
    fn missing_glyph_is_an_error() {
        let mut tessellator =
            Tessellator::new(TessellationStrategy::Sdf, TessellationParams::default()).unwrap();
        let err = tessellator.compose_glyph(&TestFont, 99, 16.0).unwrap_err();
        assert!(matches!(err, GlyphforgeError::Font(FontError::GlyphNotFound(99))));
    }

    #[test]
    fn space_is_empty_for_every_strategy() {
        for strategy in [
            TessellationStrategy::Triangulation,
            TessellationStrategy::TessellationShaders,
            TessellationStrategy::Sdf,
            TessellationStrategy::WindingNumber,
        ] {
            let glyph = compose(strategy, 32);
            assert!(glyph.is_empty());
            for kind in [
                IndexBufferKind::Triangles,
                IndexBufferKind::Curves,
                IndexBufferKind::Lines,
            ] {
                assert_eq!(glyph.index_count(kind), 0);
            }
            assert_relative_eq!(glyph.metrics.advance_x, 48.0);
        }
    }

    #[test]
    fn triangulated_hole_is_left_open() {
        let glyph = compose(TessellationStrategy::Triangulation, 2);
        assert_eq!(glyph.strategy, TessellationStrategy::Triangulation);
        assert_eq!(glyph.vertices.len(), 8);
        assert_relative_eq!(glyph.triangle_area(), 1200.0, epsilon = 1e-3);
    }

    #[test]
    fn overlapping_contours_are_unioned_before_triangulation() {
        let glyph = compose(TessellationStrategy::Triangulation, 4);
        assert_eq!(glyph.strategy, TessellationStrategy::Triangulation);
        assert_relative_eq!(glyph.triangle_area(), 700.0, epsilon = 1e-3);
    }

    fn covers(glyph: &Glyph, p: &Point2) -> bool {
        glyph.triangles.chunks_exact(3).any(|t| {
            let [a, b, c] = [t[0], t[1], t[2]].map(|i| glyph.vertices[i as usize]);
            let sides = [
                predicates::determinant(&a, &b, p),
                predicates::determinant(&b, &c, p),
                predicates::determinant(&c, &a, p),
            ];
            sides.iter().all(|&d| d >= 0.0) || sides.iter().all(|&d| d <= 0.0)
        })
    }

    #[test]
    fn contour_order_does_not_change_the_fill() {
        for glyph_id in [7, 8] {
            let glyph = compose(TessellationStrategy::Triangulation, glyph_id);
            assert_eq!(glyph.strategy, TessellationStrategy::Triangulation);
            // 100² - 40² counter + 10x40 bar inside the counter + two 10x10 tabs.
            assert_relative_eq!(glyph.triangle_area(), 9000.0, epsilon = 1e-2);
            assert!(covers(&glyph, &Point2::new(50.0, 50.0)));
            assert!(covers(&glyph, &Point2::new(50.0, -5.0)));
            assert!(!covers(&glyph, &Point2::new(35.0, 50.0)));
        }
        let soup = compose(TessellationStrategy::WindingNumber, 7);
        assert_ne!(soup.winding_number_at(&Point2::new(50.0, 50.0)), 0);
    }

    #[test]
    fn rejected_single_outline_is_ear_clipped() {
        let glyph = compose(TessellationStrategy::Triangulation, 5);
        assert_eq!(glyph.strategy, TessellationStrategy::Triangulation);
        assert_eq!(glyph.vertices.len(), 3);
        assert_eq!(glyph.index_count(IndexBufferKind::Triangles), 3);
        assert_relative_eq!(glyph.triangle_area(), 800.0, epsilon = 1e-3);
    }

    #[test]
    fn failed_triangulation_falls_back_to_winding_number() {
        for strategy in [
            TessellationStrategy::Triangulation,
            TessellationStrategy::TessellationShaders,
        ] {
            let glyph = compose(strategy, 6);
            assert_eq!(glyph.strategy, TessellationStrategy::WindingNumber);
            assert_eq!(glyph.index_count(IndexBufferKind::Triangles), 6);
            assert_eq!(glyph.index_count(IndexBufferKind::Lines), 14);
            assert!(glyph.curves.is_empty());
            assert_ne!(glyph.winding_number_at(&Point2::new(10.0, 10.0)), 0);
            assert_ne!(glyph.winding_number_at(&Point2::new(70.0, 10.0)), 0);
            assert_eq!(glyph.winding_number_at(&Point2::new(50.0, 10.0)), 0);
        }
    }

    #[test]
    fn curves_are_flattened_for_triangulation() {
        let glyph = compose(TessellationStrategy::Triangulation, 3);
        assert!(glyph.vertices.len() > 3);
        assert!(glyph.curves.is_empty());
        // The parabola through (0,0), (20,40), (40,0) bounds 2/3 of its hull.
        assert_relative_eq!(glyph.triangle_area(), 533.33, epsilon = 5.0);
    }

    #[test]
    fn tessellation_shaders_keep_curves() {
        let glyph = compose(TessellationStrategy::TessellationShaders, 3);
        assert_eq!(glyph.index_count(IndexBufferKind::Curves), 3);
        // Only two on-curve points: the chord polygon is empty.
        assert_eq!(glyph.index_count(IndexBufferKind::Triangles), 0);
        let curve: Vec<Point2> = glyph.curves.iter().map(|&i| glyph.vertices[i as usize]).collect();
        assert_eq!(curve[1], Point2::new(20.0, 40.0));
    }

    #[test]
    fn sdf_emits_padded_quad() {
        let glyph = compose(TessellationStrategy::Sdf, 1);
        assert_eq!(glyph.index_count(IndexBufferKind::Triangles), 6);
        assert_eq!(glyph.vertices.len(), 4);
        let bounds = glyph.bounding_box().unwrap();
        assert_eq!(bounds.min, Point2::new(-1.0, -1.0));
        assert_eq!(bounds.max, Point2::new(33.0, 17.0));
        assert!(glyph.sdf.is_none());
    }

    #[test]
    fn sdf_tile_is_generated_on_request() {
        let params = TessellationParams {
            sdf_resolution: Some(16),
            ..TessellationParams::default()
        };
        let mut tessellator = Tessellator::new(TessellationStrategy::Sdf, params).unwrap();
        let glyph = tessellator.compose_glyph(&TestFont, 2, 64.0).unwrap();
        let tile = glyph.sdf.unwrap();
        assert_eq!(tile.values.len(), 256);
        // The tile centre lies in the hole.
        assert!(tile.value(8, 8).unwrap() < 0.0);
    }

    #[test]
    fn winding_number_soup_matches_fill() {
        let glyph = compose(TessellationStrategy::WindingNumber, 2);
        assert_eq!(glyph.index_count(IndexBufferKind::Triangles), 6);
        assert_eq!(glyph.index_count(IndexBufferKind::Lines), 16);
        assert_ne!(glyph.winding_number_at(&Point2::new(5.0, 5.0)), 0);
        assert_eq!(glyph.winding_number_at(&Point2::new(20.0, 20.0)), 0);
        assert_eq!(glyph.winding_number_at(&Point2::new(50.0, 20.0)), 0);

        let curved = compose(TessellationStrategy::WindingNumber, 3);
        assert_eq!(curved.index_count(IndexBufferKind::Curves), 3);
        assert_eq!(curved.index_count(IndexBufferKind::Lines), 2);
        assert_ne!(curved.winding_number_at(&Point2::new(20.0, 10.0)), 0);
    }
}
