use std::collections::HashMap;

use tracing::debug;

use crate::error::Result;
use crate::geometry::Outline;
use crate::math::Point2;
use crate::operations::polygon::PolygonOperator;

use super::compositor::GlyphCompositor;
use super::decompose::DecomposedOutline;
use super::glyph::Glyph;
use super::triangulate::triangulate_outlines;
use super::{union_all, TessellationParams};

/// Flattens every contour, unions them and triangulates the result.
pub(super) fn build(
    glyph: &mut Glyph,
    outline: &DecomposedOutline,
    params: &TessellationParams,
    operator: &mut PolygonOperator,
) -> Result<()> {
    let mut vertices = outline.vertices.clone();
    let mut outlines = Vec::with_capacity(outline.contours.len());
    for contour in &outline.contours {
        let ring = contour.flatten(&mut vertices, params);
        if ring.len() >= 3 {
            outlines.push(Outline::from_vertex_loop(&ring, &vertices));
        }
    }

    let joined = union_all(operator, &mut vertices, &outlines)?;
    match triangulate_outlines(&vertices, &joined, &mut glyph.vertices) {
        Ok(triangles) => glyph.triangles = triangles,
        Err(err) if joined.len() == 1 => {
            debug!(glyph_id = glyph.glyph_id, error = %err, "CDT failed, clipping ears");
            glyph.vertices.clear();
            let triangles = GlyphCompositor::triangulate(&vertices, &joined[0])?;
            (glyph.vertices, glyph.triangles) = compact(&vertices, &triangles);
        }
        Err(err) => return Err(err.into()),
    }
    Ok(())
}

/// Copies the vertices `indices` refer to and renumbers the indices.
#[allow(clippy::cast_possible_truncation)]
fn compact(vertices: &[Point2], indices: &[u32]) -> (Vec<Point2>, Vec<u32>) {
    let mut remap: HashMap<u32, u32> = HashMap::new();
    let mut out = Vec::new();
    let indices = indices
        .iter()
        .map(|&i| {
            *remap.entry(i).or_insert_with(|| {
                out.push(vertices[i as usize]);
                (out.len() - 1) as u32
            })
        })
        .collect();
    (out, indices)
}
