use super::compositor::GlyphCompositor;
use super::decompose::{DecomposedOutline, Segment};
use super::glyph::{BoundingBox, Glyph};

/// Emits the bounding box quad followed by the raw line and curve soup.
///
/// Never fails, which makes it the fallback of the other strategies.
#[allow(clippy::cast_possible_truncation)]
pub(super) fn build(glyph: &mut Glyph, outline: &DecomposedOutline) {
    let Some(bounds) = BoundingBox::from_points(&outline.vertices) else {
        return;
    };
    GlyphCompositor::bounding_box_quad(&bounds, &mut glyph.vertices, &mut glyph.triangles);

    let base = glyph.vertices.len() as u32;
    glyph.vertices.extend_from_slice(&outline.vertices);
    for contour in &outline.contours {
        for segment in &contour.segments {
            match *segment {
                Segment::Line(edge) => glyph.lines.extend([base + edge.first, base + edge.second]),
                Segment::Quad(curve) => {
                    glyph
                        .curves
                        .extend([base + curve.start, base + curve.control, base + curve.end]);
                }
            }
        }
    }
}
