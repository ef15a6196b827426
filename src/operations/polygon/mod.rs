//! Boolean union of glyph polygons.
//!
//! A polygon is a set of [`Outline`]s over a shared vertex buffer. Holes are
//! expressed by opposite orientation, as in font outlines, and a point is
//! inside when the nonzero winding rule says so. [`PolygonOperator::join`]
//! unions two such polygons in four phases: wrap the inputs, split each
//! outline at its self-crossings, split edges where the two inputs overlap or
//! cross, then walk the boundary of the combined region.

mod self_intersect;
mod split;
mod walk;

use tracing::debug;

use crate::error::GeometryError;
use crate::geometry::{Contour, Edge, Orientation, Outline, VertexIndex};
use crate::math::{Point2, EPSILON};

pub use self_intersect::resolve_self_intersections;

/// An edge tagged with the contour it came from.
#[derive(Debug, Clone, Copy)]
struct TaggedEdge {
    edge: Edge,
    contour: usize,
}

/// Computes the union of two polygons.
///
/// The operator keeps its scratch state between calls so that repeated joins
/// reuse allocations.
#[derive(Debug)]
pub struct PolygonOperator {
    epsilon: f32,
    first: Vec<Contour>,
    second: Vec<Contour>,
    edges: Vec<TaggedEdge>,
    splits: Vec<Vec<(f64, VertexIndex)>>,
    intersections: Vec<VertexIndex>,
    output: Vec<Outline>,
}

impl Default for PolygonOperator {
    fn default() -> Self {
        Self::with_epsilon(EPSILON)
    }
}

impl PolygonOperator {
    /// Creates an operator with the default tolerance.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an operator with a custom absolute tolerance.
    #[must_use]
    pub fn with_epsilon(epsilon: f32) -> Self {
        Self {
            epsilon,
            first: Vec::new(),
            second: Vec::new(),
            edges: Vec::new(),
            splits: Vec::new(),
            intersections: Vec::new(),
            output: Vec::new(),
        }
    }

    #[must_use]
    pub fn epsilon(&self) -> f32 {
        self.epsilon
    }

    /// Vertices created or reused at crossings during the last join.
    #[must_use]
    pub fn intersections(&self) -> &[VertexIndex] {
        &self.intersections
    }

    /// Contours of the last join, first polygon before second.
    pub fn contours(&self) -> impl Iterator<Item = &Contour> + '_ {
        self.first.iter().chain(&self.second)
    }

    /// Result of the last join.
    #[must_use]
    pub fn output(&self) -> &[Outline] {
        &self.output
    }

    /// Unions `first` and `second`, appending any new vertices to `vertices`.
    ///
    /// Output outlines are free of self-intersections, holes run opposite
    /// to outer contours, and outer contours take the orientation of the
    /// largest input outline.
    ///
    /// # Errors
    ///
    /// Returns a [`GeometryError`] if an input outline is open, references a
    /// missing vertex or has a zero-length edge, or if the boundary walk
    /// cannot be closed.
    pub fn join(
        &mut self,
        vertices: &mut Vec<Point2>,
        first: &[Outline],
        second: &[Outline],
    ) -> Result<&[Outline], GeometryError> {
        self.reset();
        for outline in first.iter().chain(second) {
            outline.validate(vertices)?;
        }
        let Some(dominant) = dominant_orientation(vertices, first.iter().chain(second)) else {
            return Ok(&self.output);
        };

        self.initialize(first, second);
        self.resolve_self_intersections(vertices)?;
        self.collect_edges(vertices);
        self.resolve_overlapping_edges(vertices);
        self.resolve_intersecting_edges(vertices);
        self.apply_splits();
        let boundary = self.classify_boundary_edges(vertices);
        self.remove_unwanted_intersections(&boundary);
        self.walk_contours(vertices, &boundary, dominant)?;

        debug!(
            first = first.len(),
            second = second.len(),
            intersections = self.intersections.len(),
            output = self.output.len(),
            "joined polygons"
        );
        Ok(&self.output)
    }

    fn reset(&mut self) {
        self.first.clear();
        self.second.clear();
        self.edges.clear();
        self.splits.clear();
        self.intersections.clear();
        self.output.clear();
    }

    fn initialize(&mut self, first: &[Outline], second: &[Outline]) {
        self.first = first.iter().cloned().map(Contour::new).collect();
        self.second = second.iter().cloned().map(Contour::new).collect();
    }

    /// Replaces every contour by the simple loops it decomposes into.
    fn resolve_self_intersections(&mut self, vertices: &mut Vec<Point2>) -> Result<(), GeometryError> {
        let epsilon = self.epsilon;
        for contours in [&mut self.first, &mut self.second] {
            let mut resolved = Vec::with_capacity(contours.len());
            for contour in contours.iter() {
                resolved.extend(
                    resolve_self_intersections(vertices, &contour.outline, epsilon)?
                        .into_iter()
                        .map(Contour::new),
                );
            }
            *contours = resolved;
        }
        Ok(())
    }

    fn mark_contour_as_visited(&mut self, index: usize) {
        let contour = if index < self.first.len() {
            self.first.get_mut(index)
        } else {
            self.second.get_mut(index - self.first.len())
        };
        if let Some(contour) = contour {
            if !contour.visited {
                contour.visited = true;
            }
        }
    }
}

/// Orientation of the input outline with the largest area.
fn dominant_orientation<'a>(
    vertices: &[Point2],
    outlines: impl Iterator<Item = &'a Outline>,
) -> Option<Orientation> {
    let mut best: Option<(f64, Orientation)> = None;
    for outline in outlines {
        let area = outline.signed_area(vertices);
        if best.is_none_or(|(best_area, _)| area.abs() > best_area) {
            best = Some((area.abs(), outline.orientation()));
        }
    }
    best.map(|(_, orientation)| orientation)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn rect(vertices: &mut Vec<Point2>, x0: f32, y0: f32, x1: f32, y1: f32, ccw: bool) -> Outline {
        let base = u32::try_from(vertices.len()).unwrap();
        vertices.extend([
            Point2::new(x0, y0),
            Point2::new(x1, y0),
            Point2::new(x1, y1),
            Point2::new(x0, y1),
        ]);
        let order = if ccw { [0, 1, 2, 3] } else { [0, 3, 2, 1] };
        let indices: Vec<u32> = order.iter().map(|i| base + i).collect();
        Outline::from_vertex_loop(&indices, vertices)
    }

    fn total_area(vertices: &[Point2], outlines: &[Outline]) -> f64 {
        outlines.iter().map(|o| o.signed_area(vertices)).sum()
    }

    #[test]
    fn union_with_itself_is_identity() {
        let mut v = Vec::new();
        let square = rect(&mut v, 0.0, 0.0, 2.0, 2.0, true);
        let mut op = PolygonOperator::new();
        let out = op
            .join(&mut v, &[square.clone()], &[square.clone()])
            .unwrap()
            .to_vec();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].len(), 4);
        assert_relative_eq!(out[0].signed_area(&v), square.signed_area(&v));
    }

    #[test]
    fn clockwise_input_keeps_clockwise_output() {
        let mut v = Vec::new();
        let square = rect(&mut v, 0.0, 0.0, 2.0, 2.0, false);
        let mut op = PolygonOperator::new();
        let out = op.join(&mut v, &[square.clone()], &[square]).unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].orientation(), Orientation::Clockwise);
        assert_relative_eq!(out[0].signed_area(&v), -4.0);
    }

    #[test]
    fn overlapping_squares_merge_into_one_outline() {
        let mut v = Vec::new();
        let a = rect(&mut v, 0.0, 0.0, 2.0, 2.0, true);
        let b = rect(&mut v, 1.0, 1.0, 3.0, 3.0, true);
        let mut op = PolygonOperator::new();
        let out = op.join(&mut v, &[a], &[b]).unwrap().to_vec();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].len(), 8);
        assert_relative_eq!(total_area(&v, &out), 7.0);
        assert_eq!(op.intersections().len(), 2);
        assert!(out[0].validate(&v).is_ok());
    }

    #[test]
    fn disjoint_squares_stay_separate() {
        let mut v = Vec::new();
        let a = rect(&mut v, 0.0, 0.0, 1.0, 1.0, true);
        let b = rect(&mut v, 3.0, 0.0, 4.0, 1.0, true);
        let mut op = PolygonOperator::new();
        let out = op.join(&mut v, &[a], &[b]).unwrap().to_vec();
        assert_eq!(out.len(), 2);
        assert_relative_eq!(total_area(&v, &out), 2.0);
    }

    #[test]
    fn contained_polygon_disappears() {
        let mut v = Vec::new();
        let outer = rect(&mut v, 0.0, 0.0, 4.0, 4.0, true);
        let inner = rect(&mut v, 1.0, 1.0, 2.0, 2.0, true);
        let mut op = PolygonOperator::new();
        let out = op.join(&mut v, &[outer], &[inner]).unwrap().to_vec();
        assert_eq!(out.len(), 1);
        assert_relative_eq!(out[0].signed_area(&v), 16.0);
        let visited: Vec<bool> = op.contours().map(|c| c.visited).collect();
        assert_eq!(visited, vec![true, false]);
    }

    #[test]
    fn shared_edge_cancels() {
        let mut v = Vec::new();
        let a = rect(&mut v, 0.0, 0.0, 1.0, 1.0, true);
        let b = rect(&mut v, 1.0, 0.0, 2.0, 1.0, true);
        let mut op = PolygonOperator::new();
        let out = op.join(&mut v, &[a], &[b]).unwrap().to_vec();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].len(), 4);
        assert_relative_eq!(out[0].signed_area(&v), 2.0);
    }

    #[test]
    fn partially_overlapping_collinear_edges() {
        let mut v = Vec::new();
        let a = rect(&mut v, 0.0, 0.0, 2.0, 1.0, true);
        let b = rect(&mut v, 1.0, 0.0, 3.0, 1.0, true);
        let mut op = PolygonOperator::new();
        let out = op.join(&mut v, &[a], &[b]).unwrap().to_vec();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].len(), 4);
        assert_relative_eq!(out[0].signed_area(&v), 3.0);
    }

    #[test]
    fn opposite_orientation_contour_becomes_hole() {
        let mut v = Vec::new();
        let outer = rect(&mut v, 0.0, 0.0, 4.0, 4.0, true);
        let hole = rect(&mut v, 1.0, 1.0, 3.0, 3.0, false);
        let mut op = PolygonOperator::new();
        let out = op.join(&mut v, &[outer], &[hole]).unwrap().to_vec();
        assert_eq!(out.len(), 2);
        assert_relative_eq!(total_area(&v, &out), 12.0);
        assert_eq!(
            out.iter().filter(|o| o.orientation() == Orientation::Clockwise).count(),
            1
        );
    }

    #[test]
    fn self_intersecting_input_is_resolved() {
        let mut v = vec![
            Point2::new(0.0, 0.0),
            Point2::new(2.0, 2.0),
            Point2::new(2.0, 0.0),
            Point2::new(0.0, 2.0),
        ];
        let bowtie = Outline::from_vertex_loop(&[0, 1, 2, 3], &v);
        let mut op = PolygonOperator::new();
        let out = op.join(&mut v, &[bowtie], &[]).unwrap().to_vec();
        assert_eq!(out.len(), 2);
        for outline in &out {
            assert_eq!(outline.len(), 3);
            assert_relative_eq!(outline.signed_area(&v).abs(), 1.0);
        }
    }

    fn ring(vertices: &mut Vec<Point2>, points: &[(f32, f32)]) -> Outline {
        let base = u32::try_from(vertices.len()).unwrap();
        vertices.extend(points.iter().map(|&(x, y)| Point2::new(x, y)));
        let indices: Vec<u32> = (base..).take(points.len()).collect();
        Outline::from_vertex_loop(&indices, vertices)
    }

    #[test]
    fn self_intersecting_polygons_with_thin_spikes_join() {
        // Both inputs cross themselves; the first has a spike at (-1.179, 1.615)
        // that is narrower than the default side offset near its tip.
        let a = [
            (-1.173, -2.099),
            (3.564, -0.910),
            (-2.201, -0.251),
            (-4.624, 2.592),
            (-1.179, 1.615),
            (-4.525, 2.522),
        ];
        let b = [
            (1.79, -1.266),
            (-0.458, 2.661),
            (-4.443, -3.107),
            (-2.474, 4.416),
            (0.269, -2.012),
        ];
        for (first, second) in [(&a[..], &b[..]), (&b[..], &a[..])] {
            let mut v = Vec::new();
            let first = ring(&mut v, first);
            let second = ring(&mut v, second);
            let mut op = PolygonOperator::new();
            let out = op.join(&mut v, &[first], &[second]).unwrap().to_vec();
            assert_eq!(out.len(), 4);
            for outline in &out {
                assert!(outline.validate(&v).is_ok());
            }
            let area: f64 = out.iter().map(|o| o.signed_area(&v).abs()).sum();
            assert_relative_eq!(area, 16.9512, epsilon = 1e-3);
        }
    }

    #[test]
    fn winding_depth_is_shared_by_all_contours() {
        // A clockwise square, a clockwise bar through it and a counter-clockwise
        // counter. Where bar and counter overlap the winding is still -1.
        let mut v = Vec::new();
        let outer = ring(&mut v, &[(0.0, 0.0), (0.0, 100.0), (100.0, 100.0), (100.0, 0.0)]);
        let bar = ring(&mut v, &[(45.0, -10.0), (45.0, 110.0), (55.0, 110.0), (55.0, -10.0)]);
        let counter = ring(&mut v, &[(30.0, 30.0), (70.0, 30.0), (70.0, 70.0), (30.0, 70.0)]);
        let mut op = PolygonOperator::new();
        let out = op.join(&mut v, &[outer, bar, counter], &[]).unwrap().to_vec();
        assert_eq!(out.len(), 3);
        assert_relative_eq!(total_area(&v, &out), -9000.0);
        assert_eq!(
            out.iter().filter(|o| o.orientation() == Orientation::CounterClockwise).count(),
            2
        );
    }

    #[test]
    fn empty_inputs_produce_empty_output() {
        let mut v = Vec::new();
        let mut op = PolygonOperator::new();
        assert!(op.join(&mut v, &[], &[]).unwrap().is_empty());
    }

    #[test]
    fn open_outline_is_rejected() {
        let mut v = vec![
            Point2::new(0.0, 0.0),
            Point2::new(1.0, 0.0),
            Point2::new(1.0, 1.0),
        ];
        let edges = [Edge::new(0, 1), Edge::new(1, 2), Edge::new(1, 0)]
            .into_iter()
            .collect();
        let open = Outline::from_edges(edges, &v);
        let mut op = PolygonOperator::new();
        assert!(matches!(
            op.join(&mut v, &[open], &[]),
            Err(GeometryError::OpenOutline)
        ));
    }
}
