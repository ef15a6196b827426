use std::collections::HashMap;

use crate::error::Result;
use crate::geometry::{Outline, VertexIndex};
use crate::operations::polygon::PolygonOperator;

use super::decompose::{DecomposedOutline, Segment};
use super::glyph::Glyph;
use super::triangulate::triangulate_outlines;
use super::union_all;

/// Triangulates the polygon of curve chords and records every curve as a
/// `start, control, end` triple.
#[allow(clippy::cast_possible_truncation)]
pub(super) fn build(
    glyph: &mut Glyph,
    outline: &DecomposedOutline,
    operator: &mut PolygonOperator,
) -> Result<()> {
    let mut vertices = outline.vertices.clone();
    let chords: Vec<Outline> = outline
        .contours
        .iter()
        .map(super::decompose::RawContour::chord_ring)
        .filter(|ring| ring.len() >= 3)
        .map(|ring| Outline::from_vertex_loop(&ring, &vertices))
        .collect();

    let joined = union_all(operator, &mut vertices, &chords)?;
    glyph.triangles = triangulate_outlines(&vertices, &joined, &mut glyph.vertices)?;

    let mut remap: HashMap<VertexIndex, u32> = HashMap::new();
    for contour in &outline.contours {
        for segment in &contour.segments {
            let Segment::Quad(curve) = *segment else {
                continue;
            };
            for v in [curve.start, curve.control, curve.end] {
                let index = *remap.entry(v).or_insert_with(|| {
                    glyph.vertices.push(outline.vertices[v as usize]);
                    (glyph.vertices.len() - 1) as u32
                });
                glyph.curves.push(index);
            }
        }
    }
    Ok(())
}
