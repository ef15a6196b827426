use std::collections::HashMap;

use crate::error::GeometryError;
use crate::geometry::{Outline, VertexIndex};
use crate::math::predicates::{distance, is_edge_on_edge, is_point_on_edge, lerp, segment_intersection};
use crate::math::Point2;

use super::split::{is_interior, merge_tolerance};

/// Splits an outline at its self-crossings into simple loops.
///
/// Crossing points are appended to `vertices` once and shared by both edges
/// that cross there. The vertex sequence is then cut into loops every time a
/// vertex repeats, so each returned outline visits each vertex at most once.
/// Loops with fewer than three vertices or no area are dropped. A simple
/// outline comes back unchanged.
///
/// # Errors
///
/// Returns a [`GeometryError`] if the outline fails validation.
#[allow(clippy::cast_possible_truncation)]
pub fn resolve_self_intersections(
    vertices: &mut Vec<Point2>,
    outline: &Outline,
    epsilon: f32,
) -> Result<Vec<Outline>, GeometryError> {
    outline.validate(vertices)?;
    let ring = outline.vertex_loop();
    let n = ring.len();
    let edge_points = |vertices: &[Point2], i: usize| {
        (vertices[ring[i] as usize], vertices[ring[(i + 1) % n] as usize])
    };

    let mut splits: Vec<Vec<(f64, VertexIndex)>> = vec![Vec::new(); n];
    let mut crossings: Vec<VertexIndex> = Vec::new();

    for i in 0..n {
        for j in (i + 2)..n {
            if i == 0 && j == n - 1 {
                continue;
            }
            let (a0, a1) = edge_points(vertices, i);
            let (b0, b1) = edge_points(vertices, j);
            let len_a = distance(&a0, &a1);
            let len_b = distance(&b0, &b1);

            if is_edge_on_edge(&a0, &a1, &b0, &b1, epsilon) {
                // Folded-back edges: split each at the other's end points.
                for (k, p) in [(j, b0), (j + 1, b1)] {
                    if let Some(t) = is_point_on_edge(&p, &a0, &a1, epsilon) {
                        if is_interior(t, len_a, epsilon) {
                            splits[i].push((t, ring[k % n]));
                        }
                    }
                }
                for (k, p) in [(i, a0), (i + 1, a1)] {
                    if let Some(u) = is_point_on_edge(&p, &b0, &b1, epsilon) {
                        if is_interior(u, len_b, epsilon) {
                            splits[j].push((u, ring[k % n]));
                        }
                    }
                }
                continue;
            }

            let Some((t, u)) = segment_intersection(&a0, &a1, &b0, &b1, epsilon) else {
                continue;
            };
            let t_inside = is_interior(t, len_a, epsilon);
            let u_inside = is_interior(u, len_b, epsilon);
            let vertex = match (t_inside, u_inside) {
                (false, false) => continue,
                (false, true) => ring[if t < 0.5 { i } else { (i + 1) % n }],
                (true, false) => ring[if u < 0.5 { j } else { (j + 1) % n }],
                (true, true) => {
                    let point = lerp(&a0, &a1, t);
                    let tolerance = merge_tolerance(&point, epsilon);
                    let existing = crossings
                        .iter()
                        .copied()
                        .find(|&c| distance(&vertices[c as usize], &point) <= tolerance);
                    match existing {
                        Some(index) => index,
                        None => {
                            let index = vertices.len() as VertexIndex;
                            vertices.push(point);
                            crossings.push(index);
                            index
                        }
                    }
                }
            };
            if t_inside {
                splits[i].push((t, vertex));
            }
            if u_inside {
                splits[j].push((u, vertex));
            }
        }
    }

    if splits.iter().all(Vec::is_empty) {
        return Ok(vec![outline.clone()]);
    }

    let mut sequence = Vec::with_capacity(n + crossings.len() * 2);
    for (i, edge_splits) in splits.iter_mut().enumerate() {
        edge_splits.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));
        sequence.push(ring[i]);
        for &(_, v) in edge_splits.iter() {
            if sequence.last() != Some(&v) && v != ring[(i + 1) % n] {
                sequence.push(v);
            }
        }
    }

    Ok(extract_loops(&sequence)
        .into_iter()
        .filter(|l| l.len() >= 3)
        .map(|l| Outline::from_vertex_loop(&l, vertices))
        .filter(|o| o.signed_area(vertices).abs() > f64::from(epsilon) * f64::from(epsilon))
        .collect())
}

/// Cuts a closed vertex sequence into loops at repeated vertices.
fn extract_loops(sequence: &[VertexIndex]) -> Vec<Vec<VertexIndex>> {
    let mut loops = Vec::new();
    let mut path: Vec<VertexIndex> = Vec::with_capacity(sequence.len());
    let mut position: HashMap<VertexIndex, usize> = HashMap::new();

    for &v in sequence {
        if let Some(&k) = position.get(&v) {
            for removed in &path[k + 1..] {
                position.remove(removed);
            }
            loops.push(path[k..].to_vec());
            path.truncate(k + 1);
        } else {
            position.insert(v, path.len());
            path.push(v);
        }
    }
    if !path.is_empty() {
        loops.push(path);
    }
    loops
}
