use super::compositor::GlyphCompositor;
use super::decompose::DecomposedOutline;
use super::distance_field;
use super::glyph::{BoundingBox, Glyph};
use super::TessellationParams;

/// Emits the padded bounding box quad and, if requested, a distance tile.
///
/// Curve control points count towards the bounds so the quad covers the
/// whole hull of the outline.
pub(super) fn build(glyph: &mut Glyph, outline: &DecomposedOutline, params: &TessellationParams) {
    let Some(bounds) = BoundingBox::from_points(&outline.vertices) else {
        return;
    };
    let bounds = bounds.padded(params.sdf_padding);
    GlyphCompositor::bounding_box_quad(&bounds, &mut glyph.vertices, &mut glyph.triangles);

    if let Some(resolution) = params.sdf_resolution {
        let segments: Vec<_> = outline
            .contours
            .iter()
            .flat_map(|c| c.flattened_segments(&outline.vertices, params))
            .collect();
        glyph.sdf = Some(distance_field::generate(&segments, bounds, resolution));
    }
}
