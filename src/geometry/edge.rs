/// Index of a vertex in a shared vertex buffer.
pub type VertexIndex = u32;

/// A directed line segment between two vertices of a shared vertex buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Edge {
    pub first: VertexIndex,
    pub second: VertexIndex,
}

impl Edge {
    /// Creates a new edge `first → second`.
    #[must_use]
    pub fn new(first: VertexIndex, second: VertexIndex) -> Self {
        Self { first, second }
    }

    /// Returns `true` if `other` has the same endpoints in reversed order.
    #[must_use]
    pub fn is_inverse(&self, other: &Edge) -> bool {
        self.first == other.second && self.second == other.first
    }

    /// Returns `true` if both edges join the same two vertices, in either direction.
    #[must_use]
    pub fn is_same_segment(&self, other: &Edge) -> bool {
        self == other || self.is_inverse(other)
    }

    /// The same segment traversed in the opposite direction.
    #[must_use]
    pub fn reversed(&self) -> Edge {
        Edge::new(self.second, self.first)
    }

    /// Returns `true` if both endpoints are the same vertex.
    #[must_use]
    pub fn is_degenerate(&self) -> bool {
        self.first == self.second
    }
}

/// A quadratic Bezier segment `start → end`, bent towards `control`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Curve {
    pub start: VertexIndex,
    pub control: VertexIndex,
    pub end: VertexIndex,
}

impl Curve {
    #[must_use]
    pub fn new(start: VertexIndex, control: VertexIndex, end: VertexIndex) -> Self {
        Self {
            start,
            control,
            end,
        }
    }
}
