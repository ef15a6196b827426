use std::collections::HashMap;

use tracing::trace;

use crate::font::OutlineSink;
use crate::geometry::{Curve, Edge, VertexIndex};
use crate::math::bezier::{cubic_to_quadratics, subdivide_quadratic};
use crate::math::Point2;

use super::TessellationParams;

/// One piece of a glyph contour.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Segment {
    Line(Edge),
    Quad(Curve),
}

impl Segment {
    pub(crate) fn start(&self) -> VertexIndex {
        match self {
            Segment::Line(e) => e.first,
            Segment::Quad(c) => c.start,
        }
    }
}

/// A closed contour as emitted by the font.
#[derive(Debug, Clone, Default)]
pub(crate) struct RawContour {
    pub(crate) segments: Vec<Segment>,
}

impl RawContour {
    /// Start vertices of every segment; curves contribute only their chord.
    pub(crate) fn chord_ring(&self) -> Vec<VertexIndex> {
        self.segments.iter().map(Segment::start).collect()
    }

    /// Flattens the contour into a vertex loop, subdividing curves.
    ///
    /// Subdivision points are appended to `vertices`.
    #[allow(clippy::cast_possible_truncation)]
    pub(crate) fn flatten(
        &self,
        vertices: &mut Vec<Point2>,
        params: &TessellationParams,
    ) -> Vec<VertexIndex> {
        let mut ring: Vec<VertexIndex> = Vec::new();
        for segment in &self.segments {
            match *segment {
                Segment::Line(edge) => ring.push(edge.first),
                Segment::Quad(curve) => {
                    ring.push(curve.start);
                    let points = subdivide_quadratic(
                        &vertices[curve.start as usize],
                        &vertices[curve.control as usize],
                        &vertices[curve.end as usize],
                        params.flatness,
                        params.max_subdivision_depth,
                    );
                    // The last point is the curve end, which starts the next segment.
                    for point in &points[..points.len().saturating_sub(1)] {
                        if vertices.get(*ring.last().unwrap_or(&curve.start) as usize) == Some(point) {
                            continue;
                        }
                        ring.push(vertices.len() as VertexIndex);
                        vertices.push(*point);
                    }
                }
            }
        }
        ring.dedup();
        while ring.len() > 1 && ring.first() == ring.last() {
            ring.pop();
        }
        ring
    }

    /// Flattened directed segments of the contour.
    pub(crate) fn flattened_segments(
        &self,
        vertices: &[Point2],
        params: &TessellationParams,
    ) -> Vec<(Point2, Point2)> {
        let mut out = Vec::new();
        for segment in &self.segments {
            match *segment {
                Segment::Line(edge) => {
                    out.push((vertices[edge.first as usize], vertices[edge.second as usize]));
                }
                Segment::Quad(curve) => {
                    let mut previous = vertices[curve.start as usize];
                    for point in subdivide_quadratic(
                        &previous,
                        &vertices[curve.control as usize],
                        &vertices[curve.end as usize],
                        params.flatness,
                        params.max_subdivision_depth,
                    ) {
                        out.push((previous, point));
                        previous = point;
                    }
                }
            }
        }
        out
    }
}

/// The decomposed outline of one glyph.
#[derive(Debug, Clone, Default)]
pub(crate) struct DecomposedOutline {
    pub(crate) vertices: Vec<Point2>,
    pub(crate) contours: Vec<RawContour>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ContourState {
    Idle,
    Open {
        start: VertexIndex,
        current: VertexIndex,
    },
}

/// Collects outline commands into contours over a deduplicated vertex buffer.
///
/// Vertices are shared by exact coordinate match, so adjoining segments must
/// be emitted with bit-identical end points.
#[derive(Debug)]
pub(crate) struct OutlineDecomposer {
    scale: f32,
    vertices: Vec<Point2>,
    lookup: HashMap<(u32, u32), VertexIndex>,
    contours: Vec<RawContour>,
    segments: Vec<Segment>,
    state: ContourState,
}

impl Default for OutlineDecomposer {
    fn default() -> Self {
        Self {
            scale: 1.0,
            vertices: Vec::new(),
            lookup: HashMap::new(),
            contours: Vec::new(),
            segments: Vec::new(),
            state: ContourState::Idle,
        }
    }
}

impl OutlineDecomposer {
    /// Prepares for a new glyph whose coordinates are multiplied by `scale`.
    pub(crate) fn begin(&mut self, scale: f32) {
        self.scale = scale;
        self.vertices.clear();
        self.lookup.clear();
        self.contours.clear();
        self.segments.clear();
        self.state = ContourState::Idle;
    }

    /// Closes any open contour and hands out the collected outline.
    pub(crate) fn finish(&mut self) -> DecomposedOutline {
        self.close_contour();
        self.lookup.clear();
        DecomposedOutline {
            vertices: std::mem::take(&mut self.vertices),
            contours: std::mem::take(&mut self.contours),
        }
    }

    fn scaled(&self, x: f32, y: f32) -> Point2 {
        // Adding zero folds -0.0 into 0.0 so both hash alike.
        Point2::new(x * self.scale + 0.0, y * self.scale + 0.0)
    }

    #[allow(clippy::cast_possible_truncation)]
    fn get_vertex_index(&mut self, point: Point2) -> VertexIndex {
        let key = (point.x.to_bits(), point.y.to_bits());
        if let Some(&index) = self.lookup.get(&key) {
            return index;
        }
        let index = self.vertices.len() as VertexIndex;
        self.vertices.push(point);
        self.lookup.insert(key, index);
        index
    }

    /// Current pen vertex, opening an implicit contour if none is open.
    fn current_or_open(&mut self, point: Point2) -> VertexIndex {
        match self.state {
            ContourState::Open { current, .. } => current,
            ContourState::Idle => {
                trace!("drawing command without move_to, opening contour");
                let start = self.get_vertex_index(point);
                self.state = ContourState::Open {
                    start,
                    current: start,
                };
                start
            }
        }
    }

    fn advance(&mut self, to: VertexIndex) {
        if let ContourState::Open { start, .. } = self.state {
            self.state = ContourState::Open { start, current: to };
        }
    }

    fn push_line(&mut self, to: Point2) {
        let current = self.current_or_open(to);
        let to = self.get_vertex_index(to);
        if to != current {
            self.segments.push(Segment::Line(Edge::new(current, to)));
            self.advance(to);
        }
    }

    fn push_quad(&mut self, control: Point2, to: Point2) {
        let current = self.current_or_open(to);
        let control = self.get_vertex_index(control);
        let to = self.get_vertex_index(to);
        if to == current {
            return;
        }
        if control == current || control == to {
            self.segments.push(Segment::Line(Edge::new(current, to)));
        } else {
            self.segments.push(Segment::Quad(Curve::new(current, control, to)));
        }
        self.advance(to);
    }

    fn close_contour(&mut self) {
        let ContourState::Open { start, current } = self.state else {
            return;
        };
        if current != start {
            self.segments.push(Segment::Line(Edge::new(current, start)));
        }
        self.state = ContourState::Idle;

        let segments = std::mem::take(&mut self.segments);
        let mut distinct: Vec<VertexIndex> = segments
            .iter()
            .flat_map(|s| match *s {
                Segment::Line(e) => vec![e.first, e.second],
                Segment::Quad(c) => vec![c.start, c.control, c.end],
            })
            .collect();
        distinct.sort_unstable();
        distinct.dedup();
        if distinct.len() <= 1 {
            trace!("skipped degenerate contour");
            return;
        }
        self.contours.push(RawContour { segments });
    }
}

impl OutlineSink for OutlineDecomposer {
    fn move_to(&mut self, x: f32, y: f32) {
        self.close_contour();
        let point = self.scaled(x, y);
        let start = self.get_vertex_index(point);
        self.state = ContourState::Open {
            start,
            current: start,
        };
    }

    fn line_to(&mut self, x: f32, y: f32) {
        let to = self.scaled(x, y);
        self.push_line(to);
    }

    fn quad_to(&mut self, cx: f32, cy: f32, x: f32, y: f32) {
        let control = self.scaled(cx, cy);
        let to = self.scaled(x, y);
        self.push_quad(control, to);
    }

    fn cubic_to(&mut self, c1x: f32, c1y: f32, c2x: f32, c2y: f32, x: f32, y: f32) {
        let to = self.scaled(x, y);
        let current = self.current_or_open(to);
        let from = self.vertices[current as usize];
        let [first, second] =
            cubic_to_quadratics(&from, &self.scaled(c1x, c1y), &self.scaled(c2x, c2y), &to);
        self.push_quad(first.1, first.2);
        self.push_quad(second.1, to);
    }

    fn close(&mut self) {
        self.close_contour();
    }
}
