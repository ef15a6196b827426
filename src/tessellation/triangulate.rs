use std::collections::{HashMap, HashSet, VecDeque};

use spade::handles::{FixedFaceHandle, FixedVertexHandle, InnerTag};
use spade::{ConstrainedDelaunayTriangulation, InsertionError, Point2 as SpadePoint2, Triangulation};

use crate::error::TessellationError;
use crate::geometry::{Outline, VertexIndex};
use crate::math::Point2;

type Cdt = ConstrainedDelaunayTriangulation<SpadePoint2<f64>>;

/// Triangulates the region bounded by `outlines` with a constrained Delaunay
/// triangulation.
///
/// The outlines must be simple and mutually non-crossing, as produced by a
/// polygon union. A point is inside when it is enclosed by an odd number of
/// outlines, so holes are outlines nested in an outer one. Triangle corners
/// are appended to `vertices` once each; the returned indices refer to them
/// and wind counter-clockwise.
///
/// # Errors
///
/// Returns [`TessellationError::Failed`] if a vertex cannot be inserted or an
/// outline edge would cross an edge already constrained.
#[allow(clippy::cast_possible_truncation)]
pub(crate) fn triangulate_outlines(
    source: &[Point2],
    outlines: &[Outline],
    vertices: &mut Vec<Point2>,
) -> Result<Vec<u32>, TessellationError> {
    let mut cdt = Cdt::new();
    let mut handles: HashMap<VertexIndex, FixedVertexHandle> = HashMap::new();
    let mut loops = Vec::with_capacity(outlines.len());

    for outline in outlines {
        let ring = outline.vertex_loop();
        if ring.len() < 3 {
            continue;
        }
        let mut loop_handles = Vec::with_capacity(ring.len());
        for v in ring {
            let handle = match handles.get(&v) {
                Some(&h) => h,
                None => {
                    let p = source.get(v as usize).ok_or_else(|| {
                        TessellationError::Failed(format!("vertex {v} out of range"))
                    })?;
                    let h = cdt
                        .insert(SpadePoint2::new(f64::from(p.x), f64::from(p.y)))
                        .map_err(|e: InsertionError| {
                            TessellationError::Failed(format!("CDT insert: {e}"))
                        })?;
                    handles.insert(v, h);
                    h
                }
            };
            loop_handles.push(handle);
        }
        loops.push(loop_handles);
    }

    for loop_handles in &loops {
        insert_constraint_loop(&mut cdt, loop_handles)?;
    }

    let interior = classify_interior_faces(&cdt);
    let mut remap: HashMap<usize, u32> = HashMap::new();
    let mut triangles = Vec::with_capacity(interior.len() * 3);
    for face in cdt.inner_faces() {
        if !interior.contains(&face.fix().index()) {
            continue;
        }
        for vh in face.vertices() {
            let index = *remap.entry(vh.fix().index()).or_insert_with(|| {
                let position = vh.position();
                vertices.push(Point2::new(position.x as f32, position.y as f32));
                (vertices.len() - 1) as u32
            });
            triangles.push(index);
        }
    }
    Ok(triangles)
}

/// Constrains the closed loop `handles[0] → … → handles[0]`.
fn insert_constraint_loop(cdt: &mut Cdt, handles: &[FixedVertexHandle]) -> Result<(), TessellationError> {
    for (i, &from) in handles.iter().enumerate() {
        let to = handles[(i + 1) % handles.len()];
        if from == to {
            continue;
        }
        if !cdt.can_add_constraint(from, to) {
            return Err(TessellationError::Failed(format!(
                "constraint {} -> {} crosses an existing constraint",
                from.index(),
                to.index()
            )));
        }
        cdt.add_constraint(from, to);
    }
    Ok(())
}

/// Flood-fills the inner faces from the convex hull inwards, counting
/// constraint crossings. Faces reached after an odd number of crossings
/// are interior.
fn classify_interior_faces(cdt: &Cdt) -> HashSet<usize> {
    let mut interior = HashSet::new();
    let mut depths: HashMap<usize, u32> = HashMap::new();
    let mut queue: VecDeque<(FixedFaceHandle<InnerTag>, u32)> = VecDeque::new();

    let outer = cdt.outer_face().fix();
    for edge in cdt.directed_edges() {
        if edge.face().fix() != outer {
            continue;
        }
        if let Some(inner) = edge.rev().face().as_inner() {
            let index = inner.fix().index();
            if depths.contains_key(&index) {
                continue;
            }
            let depth = u32::from(cdt.is_constraint_edge(edge.as_undirected().fix()));
            depths.insert(index, depth);
            if depth % 2 == 1 {
                interior.insert(index);
            }
            queue.push_back((inner.fix(), depth));
        }
    }

    while let Some((face, depth)) = queue.pop_front() {
        for edge in cdt.face(face).adjacent_edges() {
            let Some(neighbor) = edge.rev().face().as_inner() else {
                continue;
            };
            let index = neighbor.fix().index();
            if depths.contains_key(&index) {
                continue;
            }
            let depth = depth + u32::from(cdt.is_constraint_edge(edge.as_undirected().fix()));
            depths.insert(index, depth);
            if depth % 2 == 1 {
                interior.insert(index);
            }
            queue.push_back((neighbor.fix(), depth));
        }
    }

    interior
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::math::predicates::determinant;
    use approx::assert_relative_eq;

    fn area(vertices: &[Point2], triangles: &[u32]) -> f64 {
        triangles
            .chunks_exact(3)
            .map(|t| {
                determinant(
                    &vertices[t[0] as usize],
                    &vertices[t[1] as usize],
                    &vertices[t[2] as usize],
                ) * 0.5
            })
            .sum()
    }

    #[test]
    fn rectangle_gives_two_triangles() {
        let source = vec![
            Point2::new(0.0, 0.0),
            Point2::new(4.0, 0.0),
            Point2::new(4.0, 2.0),
            Point2::new(0.0, 2.0),
        ];
        let outline = Outline::from_vertex_loop(&[0, 1, 2, 3], &source);
        let mut vertices = Vec::new();
        let triangles = triangulate_outlines(&source, &[outline], &mut vertices).unwrap();
        assert_eq!(triangles.len(), 6);
        assert_eq!(vertices.len(), 4);
        assert_relative_eq!(area(&vertices, &triangles), 8.0);
    }

    #[test]
    fn nested_outline_is_a_hole() {
        let source = vec![
            Point2::new(0.0, 0.0),
            Point2::new(4.0, 0.0),
            Point2::new(4.0, 4.0),
            Point2::new(0.0, 4.0),
            Point2::new(1.0, 1.0),
            Point2::new(1.0, 3.0),
            Point2::new(3.0, 3.0),
            Point2::new(3.0, 1.0),
        ];
        let outer = Outline::from_vertex_loop(&[0, 1, 2, 3], &source);
        let hole = Outline::from_vertex_loop(&[4, 5, 6, 7], &source);
        let mut vertices = Vec::new();
        let triangles = triangulate_outlines(&source, &[outer, hole], &mut vertices).unwrap();
        assert_eq!(vertices.len(), 8);
        assert_relative_eq!(area(&vertices, &triangles), 12.0);
    }

    #[test]
    fn crossing_outlines_are_rejected() {
        let source = vec![
            Point2::new(0.0, 0.0),
            Point2::new(2.0, 0.0),
            Point2::new(2.0, 2.0),
            Point2::new(0.0, 2.0),
            Point2::new(1.0, -1.0),
            Point2::new(3.0, 0.5),
            Point2::new(1.0, 3.0),
        ];
        let square = Outline::from_vertex_loop(&[0, 1, 2, 3], &source);
        let triangle = Outline::from_vertex_loop(&[4, 5, 6], &source);
        let mut vertices = Vec::new();
        let result = triangulate_outlines(&source, &[square, triangle], &mut vertices);
        assert!(matches!(result, Err(TessellationError::Failed(_))));
    }
}
