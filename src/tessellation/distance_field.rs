use crate::math::predicates::{point_to_segment_distance, winding_number};
use crate::math::Point2;

use super::glyph::BoundingBox;

/// A square grid of signed distances sampled over a glyph's bounds.
///
/// Values are positive inside the glyph and negative outside, in the same
/// units as the glyph's vertices.
#[derive(Debug, Clone, PartialEq)]
pub struct SdfTile {
    pub width: u32,
    pub height: u32,
    pub bounds: BoundingBox,
    pub values: Vec<f32>,
}

impl SdfTile {
    /// Distance stored for texel `(x, y)`, row-major from `bounds.min`.
    #[must_use]
    pub fn value(&self, x: u32, y: u32) -> Option<f32> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.values
            .get(y as usize * self.width as usize + x as usize)
            .copied()
    }

    /// Centre of texel `(x, y)` in glyph space.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn texel_center(&self, x: u32, y: u32) -> Point2 {
        let sx = self.bounds.width() / self.width as f32;
        let sy = self.bounds.height() / self.height as f32;
        Point2::new(
            self.bounds.min.x + (x as f32 + 0.5) * sx,
            self.bounds.min.y + (y as f32 + 0.5) * sy,
        )
    }
}

/// Samples the signed distance to `segments` on a `resolution²` grid.
///
/// The sign comes from the nonzero winding rule over the same segments.
#[allow(clippy::cast_possible_truncation)]
pub(crate) fn generate(segments: &[(Point2, Point2)], bounds: BoundingBox, resolution: u32) -> SdfTile {
    let mut tile = SdfTile {
        width: resolution,
        height: resolution,
        bounds,
        values: Vec::with_capacity(resolution as usize * resolution as usize),
    };
    for y in 0..resolution {
        for x in 0..resolution {
            let p = tile.texel_center(x, y);
            let distance = segments
                .iter()
                .map(|(a, b)| point_to_segment_distance(&p, a, b))
                .fold(f64::INFINITY, f64::min);
            let inside = winding_number(&p, segments.iter().map(|(a, b)| (a, b))) != 0;
            let distance = distance as f32;
            tile.values.push(if inside { distance } else { -distance });
        }
    }
    tile
}
