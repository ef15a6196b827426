use crate::font::{GlyphId, GlyphMetrics};
use crate::math::bezier::subdivide_quadratic;
use crate::math::predicates::winding_number;
use crate::math::Point2;

use super::distance_field::SdfTile;
use super::TessellationStrategy;

/// Index buffers a composed glyph can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IndexBufferKind {
    /// Triangle list, three indices per triangle.
    Triangles,
    /// Quadratic curves, `start, control, end` per curve.
    Curves,
    /// Line segments, two indices per segment.
    Lines,
}

/// Axis-aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub min: Point2,
    pub max: Point2,
}

impl BoundingBox {
    /// Smallest box containing every point, or `None` for no points.
    #[must_use]
    pub fn from_points<'a>(points: impl IntoIterator<Item = &'a Point2>) -> Option<Self> {
        let mut points = points.into_iter();
        let first = *points.next()?;
        Some(points.fold(Self { min: first, max: first }, |b, p| Self {
            min: Point2::new(b.min.x.min(p.x), b.min.y.min(p.y)),
            max: Point2::new(b.max.x.max(p.x), b.max.y.max(p.y)),
        }))
    }

    #[must_use]
    pub fn width(&self) -> f32 {
        self.max.x - self.min.x
    }

    #[must_use]
    pub fn height(&self) -> f32 {
        self.max.y - self.min.y
    }

    /// Grows the box by `amount` on every side.
    #[must_use]
    pub fn padded(&self, amount: f32) -> Self {
        Self {
            min: Point2::new(self.min.x - amount, self.min.y - amount),
            max: Point2::new(self.max.x + amount, self.max.y + amount),
        }
    }

    /// Corners in counter-clockwise order, starting at `min`.
    #[must_use]
    pub fn corners(&self) -> [Point2; 4] {
        [
            self.min,
            Point2::new(self.max.x, self.min.y),
            self.max,
            Point2::new(self.min.x, self.max.y),
        ]
    }
}

/// Device-ready geometry of one glyph.
#[derive(Debug, Clone)]
pub struct Glyph {
    pub glyph_id: GlyphId,
    /// The strategy that produced the buffers. Differs from the requested
    /// strategy when tessellation fell back to winding-number rendering.
    pub strategy: TessellationStrategy,
    /// Metrics scaled to the requested font size.
    pub metrics: GlyphMetrics,
    pub vertices: Vec<Point2>,
    pub triangles: Vec<u32>,
    pub curves: Vec<u32>,
    pub lines: Vec<u32>,
    pub sdf: Option<SdfTile>,
}

impl Glyph {
    pub(crate) fn empty(
        glyph_id: GlyphId,
        strategy: TessellationStrategy,
        metrics: GlyphMetrics,
    ) -> Self {
        Self {
            glyph_id,
            strategy,
            metrics,
            vertices: Vec::new(),
            triangles: Vec::new(),
            curves: Vec::new(),
            lines: Vec::new(),
            sdf: None,
        }
    }

    pub(crate) fn clear_geometry(&mut self) {
        self.vertices.clear();
        self.triangles.clear();
        self.curves.clear();
        self.lines.clear();
        self.sdf = None;
    }

    #[must_use]
    pub fn indices(&self, kind: IndexBufferKind) -> &[u32] {
        match kind {
            IndexBufferKind::Triangles => &self.triangles,
            IndexBufferKind::Curves => &self.curves,
            IndexBufferKind::Lines => &self.lines,
        }
    }

    #[must_use]
    pub fn index_count(&self, kind: IndexBufferKind) -> usize {
        self.indices(kind).len()
    }

    /// Returns `true` if the glyph has nothing to draw.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.triangles.is_empty() && self.curves.is_empty() && self.lines.is_empty()
    }

    /// Bounds of the glyph's vertices, `None` for an empty glyph.
    #[must_use]
    pub fn bounding_box(&self) -> Option<BoundingBox> {
        BoundingBox::from_points(&self.vertices)
    }

    /// Total area covered by the triangle buffer.
    #[must_use]
    pub fn triangle_area(&self) -> f64 {
        self.triangles
            .chunks_exact(3)
            .map(|t| {
                let [a, b, c] = [t[0], t[1], t[2]].map(|i| self.vertices[i as usize]);
                crate::math::predicates::determinant(&a, &b, &c).abs() * 0.5
            })
            .sum()
    }

    /// Winding number of `p` against the line and curve buffers.
    ///
    /// Curves are flattened with a tight tolerance before counting.
    #[must_use]
    pub fn winding_number_at(&self, p: &Point2) -> i32 {
        let mut segments: Vec<(Point2, Point2)> = self
            .lines
            .chunks_exact(2)
            .map(|l| (self.vertices[l[0] as usize], self.vertices[l[1] as usize]))
            .collect();
        for c in self.curves.chunks_exact(3) {
            let [start, control, end] = [c[0], c[1], c[2]].map(|i| self.vertices[i as usize]);
            let mut previous = start;
            for point in subdivide_quadratic(&start, &control, &end, 0.01, 10) {
                segments.push((previous, point));
                previous = point;
            }
        }
        winding_number(p, segments.iter().map(|(a, b)| (a, b)))
    }
}
