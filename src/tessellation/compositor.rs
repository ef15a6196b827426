use crate::error::GeometryError;
use crate::geometry::{Orientation, Outline, VertexIndex};
use crate::math::predicates::determinant;
use crate::math::Point2;

use super::glyph::BoundingBox;

/// Small triangulation helpers shared by the tessellation strategies.
#[derive(Debug, Clone, Copy, Default)]
pub struct GlyphCompositor;

impl GlyphCompositor {
    /// Appends the corners of `bounds` and the two triangles covering it.
    #[allow(clippy::cast_possible_truncation)]
    pub fn bounding_box_quad(bounds: &BoundingBox, vertices: &mut Vec<Point2>, indices: &mut Vec<u32>) {
        let base = vertices.len() as u32;
        vertices.extend(bounds.corners());
        indices.extend([base, base + 1, base + 2, base, base + 2, base + 3]);
    }

    /// Triangulates a simple outline by ear clipping.
    ///
    /// Triangles reference `vertices` directly and come out counter-clockwise.
    ///
    /// # Errors
    ///
    /// Returns [`GeometryError::VertexOutOfRange`] if the outline references a
    /// vertex missing from `vertices`, and [`GeometryError::Degenerate`] if
    /// no ear can be found, which happens for self-intersecting or zero-area
    /// outlines.
    pub fn triangulate(vertices: &[Point2], outline: &Outline) -> Result<Vec<u32>, GeometryError> {
        let mut ring: Vec<(VertexIndex, Point2)> = outline
            .vertex_loop()
            .into_iter()
            .map(|v| {
                vertices
                    .get(v as usize)
                    .map(|&p| (v, p))
                    .ok_or(GeometryError::VertexOutOfRange(v))
            })
            .collect::<Result<_, _>>()?;
        if outline.orientation() == Orientation::Clockwise {
            ring.reverse();
        }
        let mut triangles = Vec::with_capacity(ring.len().saturating_sub(2) * 3);

        while ring.len() > 3 {
            let n = ring.len();
            let ear = (0..n).find(|&i| {
                let (a, b, c) = (ring[(i + n - 1) % n], ring[i], ring[(i + 1) % n]);
                determinant(&a.1, &b.1, &c.1) > 0.0
                    && !ring
                        .iter()
                        .filter(|&&(v, _)| v != a.0 && v != b.0 && v != c.0)
                        .any(|(_, p)| in_triangle(p, &a.1, &b.1, &c.1))
            });
            let Some(i) = ear else {
                return Err(GeometryError::Degenerate(format!(
                    "no ear among {n} remaining vertices"
                )));
            };
            triangles.extend([ring[(i + n - 1) % n].0, ring[i].0, ring[(i + 1) % n].0]);
            ring.remove(i);
        }
        if let [a, b, c] = ring[..] {
            if determinant(&a.1, &b.1, &c.1) > 0.0 {
                triangles.extend([a.0, b.0, c.0]);
            }
        }
        Ok(triangles)
    }
}

/// Closed containment test for a counter-clockwise triangle.
fn in_triangle(p: &Point2, a: &Point2, b: &Point2, c: &Point2) -> bool {
    determinant(a, b, p) >= 0.0 && determinant(b, c, p) >= 0.0 && determinant(c, a, p) >= 0.0
}
