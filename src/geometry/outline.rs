use crate::error::GeometryError;
use crate::math::predicates::signed_area;
use crate::math::Point2;

use super::circular_list::{CircularList, NodeId};
use super::edge::{Edge, VertexIndex};

/// Winding direction of a closed outline, in a Y-up coordinate system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Orientation {
    Clockwise,
    CounterClockwise,
}

impl Orientation {
    /// Orientation implied by the sign of a signed area.
    ///
    /// Zero area counts as counter-clockwise.
    #[must_use]
    pub fn from_signed_area(area: f64) -> Self {
        if area < 0.0 {
            Self::Clockwise
        } else {
            Self::CounterClockwise
        }
    }

    #[must_use]
    pub fn opposite(self) -> Self {
        match self {
            Self::Clockwise => Self::CounterClockwise,
            Self::CounterClockwise => Self::Clockwise,
        }
    }
}

/// A closed contour: a ring of edges and its orientation.
///
/// The orientation is derived from the edges and recomputed by every
/// method that edits them.
#[derive(Debug, Clone)]
pub struct Outline {
    edges: CircularList<Edge>,
    orientation: Orientation,
}

impl Outline {
    /// Builds the closed walk `loop[0] → loop[1] → … → loop[0]`.
    #[must_use]
    pub fn from_vertex_loop(indices: &[VertexIndex], vertices: &[Point2]) -> Self {
        let n = indices.len();
        let edges = (0..n)
            .map(|i| Edge::new(indices[i], indices[(i + 1) % n]))
            .collect();
        Self::from_edges(edges, vertices)
    }

    /// Wraps an existing edge ring.
    #[must_use]
    pub fn from_edges(edges: CircularList<Edge>, vertices: &[Point2]) -> Self {
        let mut outline = Self {
            edges,
            orientation: Orientation::CounterClockwise,
        };
        outline.recompute_orientation(vertices);
        outline
    }

    #[must_use]
    pub fn edges(&self) -> &CircularList<Edge> {
        &self.edges
    }

    #[must_use]
    pub fn orientation(&self) -> Orientation {
        self.orientation
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.edges.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    /// The start vertex of every edge, in walk order.
    #[must_use]
    pub fn vertex_loop(&self) -> Vec<VertexIndex> {
        self.edges.iter().map(|e| e.first).collect()
    }

    /// The positions of [`Self::vertex_loop`].
    #[must_use]
    pub fn points(&self, vertices: &[Point2]) -> Vec<Point2> {
        self.edges
            .iter()
            .filter_map(|e| vertices.get(e.first as usize).copied())
            .collect()
    }

    #[must_use]
    pub fn signed_area(&self, vertices: &[Point2]) -> f64 {
        signed_area(&self.points(vertices))
    }

    /// Recomputes the orientation from the current edges.
    pub fn recompute_orientation(&mut self, vertices: &[Point2]) {
        self.orientation = Orientation::from_signed_area(self.signed_area(vertices));
    }

    /// Reverses the walk direction.
    pub fn reverse(&mut self, vertices: &[Point2]) {
        let reversed: Vec<Edge> = self.edges.iter().map(Edge::reversed).collect();
        self.edges = reversed.into_iter().rev().collect();
        self.recompute_orientation(vertices);
    }

    /// Appends an edge after the last one.
    pub fn push_edge(&mut self, edge: Edge, vertices: &[Point2]) -> NodeId {
        let node = self.edges.insert_last(edge);
        self.recompute_orientation(vertices);
        node
    }

    /// Splits the edge at `node` into `first → vertex → second`.
    ///
    /// Returns the node of the new second half.
    pub fn split_edge(
        &mut self,
        node: NodeId,
        vertex: VertexIndex,
        vertices: &[Point2],
    ) -> Option<NodeId> {
        let edge = *self.edges.get(node)?;
        if let Some(slot) = self.edges.get_mut(node) {
            slot.second = vertex;
        }
        let inserted = self.edges.insert_after(node, Edge::new(vertex, edge.second));
        self.recompute_orientation(vertices);
        inserted
    }

    /// Checks that the edges form one closed walk over valid, distinct vertices.
    ///
    /// # Errors
    ///
    /// Returns a [`GeometryError`] describing the first defect found.
    pub fn validate(&self, vertices: &[Point2]) -> Result<(), GeometryError> {
        if self.edges.len() < 3 {
            return Err(GeometryError::Degenerate(format!(
                "outline has {} edges",
                self.edges.len()
            )));
        }
        for id in self.edges.node_ids() {
            let (Some(edge), Some(next)) = (
                self.edges.get(id),
                self.edges.next(id).and_then(|n| self.edges.get(n)),
            ) else {
                return Err(GeometryError::OpenOutline);
            };
            for v in [edge.first, edge.second] {
                if v as usize >= vertices.len() {
                    return Err(GeometryError::VertexOutOfRange(v));
                }
            }
            if edge.is_degenerate()
                || vertices[edge.first as usize] == vertices[edge.second as usize]
            {
                return Err(GeometryError::ZeroLengthEdge {
                    first: edge.first,
                    second: edge.second,
                });
            }
            if edge.second != next.first {
                return Err(GeometryError::OpenOutline);
            }
        }
        Ok(())
    }
}

/// An outline taking part in a polygon join, with its walk bookkeeping.
#[derive(Debug, Clone)]
pub struct Contour {
    pub visited: bool,
    pub outline: Outline,
}

impl Contour {
    #[must_use]
    pub fn new(outline: Outline) -> Self {
        Self {
            visited: false,
            outline,
        }
    }
}
