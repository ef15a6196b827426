use std::collections::{HashMap, HashSet};

use crate::geometry::{Edge, VertexIndex};
use crate::math::predicates::{distance, is_edge_on_edge, is_point_on_edge, lerp, segment_intersection};
use crate::math::Point2;

use super::{PolygonOperator, TaggedEdge};

/// Returns `true` if parameter `t` lies more than `epsilon` away from both
/// ends of an edge of length `len`.
pub(super) fn is_interior(t: f64, len: f64, epsilon: f32) -> bool {
    let eps = f64::from(epsilon);
    t * len > eps && (1.0 - t) * len > eps
}

/// Distance under which two points are merged into one vertex.
///
/// Never finer than the `f32` resolution at the point's magnitude.
pub(super) fn merge_tolerance(point: &Point2, epsilon: f32) -> f64 {
    let magnitude = f64::from(point.x.abs().max(point.y.abs()));
    f64::from(epsilon).max(magnitude * 4.0 * f64::from(f32::EPSILON))
}

impl PolygonOperator {
    /// Gathers the edges of every contour, merging coincident vertices.
    pub(super) fn collect_edges(&mut self, vertices: &[Point2]) {
        let mut edges = Vec::new();
        for (contour_index, contour) in self.contours().enumerate() {
            edges.extend(contour.outline.edges().iter().map(|&edge| TaggedEdge {
                edge,
                contour: contour_index,
            }));
        }

        let canonical = self.merge_coincident_vertices(vertices, &edges);
        self.edges = edges
            .into_iter()
            .map(|tagged| TaggedEdge {
                edge: Edge::new(canonical[&tagged.edge.first], canonical[&tagged.edge.second]),
                contour: tagged.contour,
            })
            .filter(|tagged| !tagged.edge.is_degenerate())
            .collect();
        self.splits = vec![Vec::new(); self.edges.len()];
    }

    fn merge_coincident_vertices(
        &self,
        vertices: &[Point2],
        edges: &[TaggedEdge],
    ) -> HashMap<VertexIndex, VertexIndex> {
        let mut referenced: Vec<VertexIndex> = edges
            .iter()
            .flat_map(|t| [t.edge.first, t.edge.second])
            .collect();
        referenced.sort_unstable();
        referenced.dedup();

        let mut representatives: Vec<VertexIndex> = Vec::new();
        let mut canonical = HashMap::with_capacity(referenced.len());
        for v in referenced {
            let point = vertices[v as usize];
            let tolerance = merge_tolerance(&point, self.epsilon);
            let found = representatives
                .iter()
                .copied()
                .find(|&r| distance(&vertices[r as usize], &point) <= tolerance);
            if let Some(r) = found {
                canonical.insert(v, r);
            } else {
                representatives.push(v);
                canonical.insert(v, v);
            }
        }
        canonical
    }

    fn edge_points(&self, vertices: &[Point2], index: usize) -> (Edge, Point2, Point2) {
        let edge = self.edges[index].edge;
        (edge, vertices[edge.first as usize], vertices[edge.second as usize])
    }

    /// Splits collinear edges that share a stretch so that the shared part
    /// becomes identical edges on both sides.
    pub(super) fn resolve_overlapping_edges(&mut self, vertices: &[Point2]) {
        let eps = self.epsilon;
        for i in 0..self.edges.len() {
            for j in (i + 1)..self.edges.len() {
                let (a, a0, a1) = self.edge_points(vertices, i);
                let (b, b0, b1) = self.edge_points(vertices, j);
                if a.is_same_segment(&b) || !is_edge_on_edge(&a0, &a1, &b0, &b1, eps) {
                    continue;
                }
                let len_a = distance(&a0, &a1);
                let len_b = distance(&b0, &b1);
                for (v, p) in [(b.first, b0), (b.second, b1)] {
                    if let Some(t) = is_point_on_edge(&p, &a0, &a1, eps) {
                        if is_interior(t, len_a, eps) {
                            self.splits[i].push((t, v));
                        }
                    }
                }
                for (v, p) in [(a.first, a0), (a.second, a1)] {
                    if let Some(u) = is_point_on_edge(&p, &b0, &b1, eps) {
                        if is_interior(u, len_b, eps) {
                            self.splits[j].push((u, v));
                        }
                    }
                }
            }
        }
    }

    /// Splits edges of either polygon where they cross or where an end point
    /// of one edge touches the interior of another.
    #[allow(clippy::similar_names)]
    pub(super) fn resolve_intersecting_edges(&mut self, vertices: &mut Vec<Point2>) {
        let eps = self.epsilon;
        for i in 0..self.edges.len() {
            for j in (i + 1)..self.edges.len() {
                let (a, a0, a1) = self.edge_points(vertices, i);
                let (b, b0, b1) = self.edge_points(vertices, j);
                let shares_vertex = a.first == b.first
                    || a.first == b.second
                    || a.second == b.first
                    || a.second == b.second;
                if shares_vertex || is_edge_on_edge(&a0, &a1, &b0, &b1, eps) {
                    continue;
                }
                let Some((t, u)) = segment_intersection(&a0, &a1, &b0, &b1, eps) else {
                    continue;
                };
                let t_inside = is_interior(t, distance(&a0, &a1), eps);
                let u_inside = is_interior(u, distance(&b0, &b1), eps);
                let vertex = match (t_inside, u_inside) {
                    (false, false) => continue,
                    (false, true) => {
                        if t < 0.5 {
                            a.first
                        } else {
                            a.second
                        }
                    }
                    (true, false) => {
                        if u < 0.5 {
                            b.first
                        } else {
                            b.second
                        }
                    }
                    (true, true) => self.add_intersection_if_needed(vertices, lerp(&a0, &a1, t)),
                };
                if t_inside {
                    self.splits[i].push((t, vertex));
                }
                if u_inside {
                    self.splits[j].push((u, vertex));
                }
                if !(t_inside && u_inside) && !self.intersections.contains(&vertex) {
                    self.intersections.push(vertex);
                }
            }
        }
    }

    /// Returns the vertex for a crossing at `point`, reusing a previously
    /// recorded crossing within tolerance.
    #[allow(clippy::cast_possible_truncation)]
    pub(super) fn add_intersection_if_needed(
        &mut self,
        vertices: &mut Vec<Point2>,
        point: Point2,
    ) -> VertexIndex {
        let tolerance = merge_tolerance(&point, self.epsilon);
        let existing = self
            .intersections
            .iter()
            .copied()
            .find(|&v| distance(&vertices[v as usize], &point) <= tolerance);
        if let Some(v) = existing {
            return v;
        }
        let index = vertices.len() as VertexIndex;
        vertices.push(point);
        self.intersections.push(index);
        index
    }

    /// Replaces every edge by its pieces between recorded split vertices.
    pub(super) fn apply_splits(&mut self) {
        let edges = std::mem::take(&mut self.edges);
        let splits = std::mem::take(&mut self.splits);
        for (tagged, mut edge_splits) in edges.into_iter().zip(splits) {
            edge_splits.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));
            let mut previous = tagged.edge.first;
            for (_, v) in edge_splits {
                if v != previous && v != tagged.edge.second {
                    self.edges.push(TaggedEdge {
                        edge: Edge::new(previous, v),
                        contour: tagged.contour,
                    });
                    previous = v;
                }
            }
            if previous != tagged.edge.second {
                self.edges.push(TaggedEdge {
                    edge: Edge::new(previous, tagged.edge.second),
                    contour: tagged.contour,
                });
            }
        }
    }

    /// Drops recorded intersections that no boundary edge passes through.
    pub(super) fn remove_unwanted_intersections(&mut self, boundary: &[TaggedEdge]) {
        let used: HashSet<VertexIndex> = boundary.iter().map(|t| t.edge.first).collect();
        self.intersections.retain(|v| used.contains(v));
    }
}
