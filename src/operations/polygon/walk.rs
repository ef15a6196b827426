use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

use tracing::trace;

use crate::error::GeometryError;
use crate::geometry::{Edge, Orientation, Outline, VertexIndex};
use crate::math::predicates::{
    determinant, distance, is_on_left_side, segment_distance_xy, winding_number_xy,
};
use crate::math::Point2;

use super::{PolygonOperator, TaggedEdge};

/// Outgoing boundary edges, keyed by start vertex.
type EdgeMap = HashMap<VertexIndex, Vec<usize>>;

impl PolygonOperator {
    /// Keeps the edges that separate the inside of the union from the
    /// outside, directed so that the inside lies on their left.
    ///
    /// The nonzero winding number of all split edges is sampled just left and
    /// right of each edge's midpoint. The samples stay closer to the edge than
    /// half the distance to any other edge, so thin spikes and slivers are
    /// sampled from the face they border. Edges with the inside
    /// on both or neither side are dropped, which cancels shared and interior
    /// edges; identical boundary edges are kept once.
    pub(super) fn classify_boundary_edges(&self, vertices: &[Point2]) -> Vec<TaggedEdge> {
        let segments: Vec<[(f64, f64); 2]> = self
            .edges
            .iter()
            .map(|t| [xy(&vertices[t.edge.first as usize]), xy(&vertices[t.edge.second as usize])])
            .collect();

        let mut seen = HashSet::new();
        let mut boundary = Vec::new();
        for (tagged, &[(ax, ay), (bx, by)]) in self.edges.iter().zip(&segments) {
            let len = ((bx - ax).powi(2) + (by - ay).powi(2)).sqrt();
            if len <= f64::EPSILON {
                continue;
            }
            let mid = ((ax + bx) * 0.5, (ay + by) * 0.5);
            let offset = self
                .edges
                .iter()
                .zip(&segments)
                .filter(|(other, _)| !other.edge.is_same_segment(&tagged.edge))
                .map(|(_, &[a, b])| segment_distance_xy(mid, a, b))
                .filter(|&d| d > 0.0)
                .fold((len * 0.01).min(1e-3), |offset, d| offset.min(d * 0.5));
            let (nx, ny) = (-(by - ay) / len * offset, (bx - ax) / len * offset);
            let left = (mid.0 + nx, mid.1 + ny);
            let right = (mid.0 - nx, mid.1 - ny);
            let left_inside = winding_number_xy(left, segments.iter().copied()) != 0;
            let right_inside = winding_number_xy(right, segments.iter().copied()) != 0;
            let edge = match (left_inside, right_inside) {
                (true, false) => tagged.edge,
                (false, true) => tagged.edge.reversed(),
                _ => continue,
            };
            if seen.insert(edge) {
                boundary.push(TaggedEdge {
                    edge,
                    contour: tagged.contour,
                });
            }
        }
        boundary
    }

    /// Walks the boundary edges into closed outlines.
    pub(super) fn walk_contours(
        &mut self,
        vertices: &[Point2],
        boundary: &[TaggedEdge],
        dominant: Orientation,
    ) -> Result<(), GeometryError> {
        let mut outgoing: EdgeMap = HashMap::new();
        for (i, tagged) in boundary.iter().enumerate() {
            outgoing.entry(tagged.edge.first).or_default().push(i);
        }
        let mut used = vec![false; boundary.len()];

        for start_edge in 0..boundary.len() {
            if used[start_edge] {
                continue;
            }
            let start = boundary[start_edge].edge.first;
            let mut vertex_loop = Vec::new();
            let mut current = start_edge;
            loop {
                let (segment, end, last_edge) = self.walk_until_intersection_or_start(
                    boundary, &outgoing, &mut used, current, start,
                );
                vertex_loop.extend(segment);
                if end == start {
                    break;
                }
                let candidates = get_edges_starting_at(&outgoing, &used, end);
                current = choose_outgoing_edge(vertices, boundary, boundary[last_edge].edge, &candidates)
                    .ok_or_else(|| {
                        GeometryError::WalkFailed(format!("no unvisited edge leaves vertex {end}"))
                    })?;
            }

            let vertex_loop = merge_collinear(vertices, vertex_loop, self.epsilon);
            if vertex_loop.len() < 3 {
                trace!(start, "dropped collapsed loop");
                continue;
            }
            let mut outline = Outline::from_vertex_loop(&vertex_loop, vertices);
            let eps = f64::from(self.epsilon);
            if outline.signed_area(vertices).abs() <= eps * eps {
                continue;
            }
            if dominant == Orientation::Clockwise {
                outline.reverse(vertices);
            }
            self.output.push(outline);
        }
        Ok(())
    }

    /// Follows forced moves from `first_edge` until the walk returns to
    /// `start` or reaches a vertex with a choice of outgoing edges.
    ///
    /// Returns the visited start vertices, the vertex where the walk stopped
    /// and the last edge taken.
    fn walk_until_intersection_or_start(
        &mut self,
        boundary: &[TaggedEdge],
        outgoing: &EdgeMap,
        used: &mut [bool],
        first_edge: usize,
        start: VertexIndex,
    ) -> (Vec<VertexIndex>, VertexIndex, usize) {
        let mut segment = Vec::new();
        let mut edge = first_edge;
        loop {
            used[edge] = true;
            self.mark_contour_as_visited(boundary[edge].contour);
            segment.push(boundary[edge].edge.first);
            let end = boundary[edge].edge.second;
            if end == start {
                return (segment, end, edge);
            }
            let candidates = get_edges_starting_at(outgoing, used, end);
            if candidates.len() != 1 || self.intersections.contains(&end) {
                return (segment, end, edge);
            }
            edge = candidates[0];
        }
    }
}

/// Unvisited boundary edges starting at `vertex`.
fn get_edges_starting_at(outgoing: &EdgeMap, used: &[bool], vertex: VertexIndex) -> Vec<usize> {
    outgoing
        .get(&vertex)
        .map(|edges| edges.iter().copied().filter(|&e| !used[e]).collect())
        .unwrap_or_default()
}

/// Picks the candidate reached first when turning clockwise from the
/// reversed incoming edge. With the inside on the left this hugs the face
/// being traced, so loops touching at a vertex come out separately.
fn choose_outgoing_edge(
    vertices: &[Point2],
    boundary: &[TaggedEdge],
    incoming: Edge,
    candidates: &[usize],
) -> Option<usize> {
    let pivot = vertices[incoming.second as usize];
    let back = vertices[incoming.first as usize];
    // 0 up to half a turn clockwise from `back`, 1 past it. Going straight
    // back is a full turn.
    let half_turn = |target: &Point2| -> u8 {
        if is_on_left_side(&pivot, &back, target, 0.0) {
            1
        } else if determinant(&pivot, &back, target) < 0.0 {
            0
        } else {
            let (px, py) = xy(&pivot);
            let (bx, by) = xy(&back);
            let (tx, ty) = xy(target);
            u8::from((bx - px) * (tx - px) + (by - py) * (ty - py) > 0.0)
        }
    };
    let target = |c: usize| vertices[boundary[c].edge.second as usize];

    candidates.iter().copied().min_by(|&a, &b| {
        let (ta, tb) = (target(a), target(b));
        half_turn(&ta).cmp(&half_turn(&tb)).then_with(|| {
            // Within a half turn, `b` right of `a` means `a` comes first.
            determinant(&pivot, &ta, &tb)
                .partial_cmp(&0.0)
                .unwrap_or(Ordering::Equal)
        })
    })
}

/// Removes vertices lying on the straight line between their neighbours.
fn merge_collinear(vertices: &[Point2], mut ring: Vec<VertexIndex>, epsilon: f32) -> Vec<VertexIndex> {
    let eps = f64::from(epsilon);
    let mut changed = true;
    while changed && ring.len() >= 3 {
        changed = false;
        let n = ring.len();
        for i in 0..n {
            let a = vertices[ring[(i + n - 1) % n] as usize];
            let b = vertices[ring[i] as usize];
            let c = vertices[ring[(i + 1) % n] as usize];
            let span = distance(&a, &c);
            if span <= eps {
                continue;
            }
            let forward = f64::from(b.x - a.x) * f64::from(c.x - b.x)
                + f64::from(b.y - a.y) * f64::from(c.y - b.y);
            if (determinant(&a, &b, &c) / span).abs() <= eps && forward > 0.0 {
                ring.remove(i);
                changed = true;
                break;
            }
        }
    }
    ring
}

fn xy(p: &Point2) -> (f64, f64) {
    (f64::from(p.x), f64::from(p.y))
}
