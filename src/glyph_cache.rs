//! Least recently used cache of composed glyphs.

use std::num::NonZeroUsize;
use std::sync::Arc;

use lru::LruCache;
use tracing::{debug, trace};

use crate::error::Result;
use crate::font::{FontProvider, GlyphId, ShapingOptions, ShapingProvider};
use crate::math::Point2;
use crate::tessellation::{Glyph, Tessellator};

/// Identifies one composed glyph.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GlyphKey {
    pub font_name: String,
    pub glyph_id: GlyphId,
    /// Bit pattern of the font size, so the key stays `Eq + Hash`.
    size_bits: u32,
}

impl GlyphKey {
    #[must_use]
    pub fn new(font_name: &str, glyph_id: GlyphId, font_size: f32) -> Self {
        Self {
            font_name: font_name.to_owned(),
            glyph_id,
            size_bits: font_size.to_bits(),
        }
    }

    #[must_use]
    pub fn font_size(&self) -> f32 {
        f32::from_bits(self.size_bits)
    }
}

/// A glyph placed on the pen line of a run.
#[derive(Debug, Clone)]
pub struct PlacedGlyph {
    pub glyph: Arc<Glyph>,
    /// Index of the first character of the cluster this glyph belongs to.
    pub cluster: u32,
    /// Origin of the glyph relative to the start of the run.
    pub position: Point2,
}

/// Composes glyphs through its [`Tessellator`] and keeps the results.
///
/// Glyphs are only composed on a miss. With a size limit the least recently
/// used glyph is dropped once the limit is reached.
#[derive(Debug)]
pub struct GlyphCache {
    tessellator: Tessellator,
    glyphs: LruCache<GlyphKey, Arc<Glyph>>,
}

impl GlyphCache {
    /// Creates a cache holding at most `max_size` glyphs, or any number of
    /// glyphs for `None`.
    #[must_use]
    pub fn new(tessellator: Tessellator, max_size: Option<NonZeroUsize>) -> Self {
        let glyphs = match max_size {
            Some(cap) => LruCache::new(cap),
            None => LruCache::unbounded(),
        };
        Self {
            tessellator,
            glyphs,
        }
    }

    #[must_use]
    pub fn tessellator(&self) -> &Tessellator {
        &self.tessellator
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.glyphs.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.glyphs.is_empty()
    }

    #[must_use]
    pub fn contains(&self, key: &GlyphKey) -> bool {
        self.glyphs.contains(key)
    }

    pub fn clear(&mut self) {
        self.glyphs.clear();
    }

    /// Returns the glyph for `glyph_id` at `font_size`, composing it on a miss.
    ///
    /// # Errors
    ///
    /// Returns an error if the glyph has to be composed and composition fails.
    /// Failed glyphs are not cached.
    pub fn get_glyph(
        &mut self,
        font: &dyn FontProvider,
        glyph_id: GlyphId,
        font_size: f32,
    ) -> Result<Arc<Glyph>> {
        let key = GlyphKey::new(font.name(), glyph_id, font_size);
        if let Some(glyph) = self.glyphs.get(&key) {
            trace!(font = font.name(), glyph_id, "glyph cache hit");
            return Ok(Arc::clone(glyph));
        }

        let glyph = Arc::new(self.tessellator.compose_glyph(font, glyph_id, font_size)?);
        if let Some((evicted, _)) = self.glyphs.push(key, Arc::clone(&glyph)) {
            debug!(
                font = %evicted.font_name,
                glyph_id = evicted.glyph_id,
                font_size = evicted.font_size(),
                "evicted glyph"
            );
        }
        Ok(glyph)
    }

    /// Shapes `text` and places its glyphs along the pen line.
    ///
    /// # Errors
    ///
    /// Returns an error if shaping fails or any glyph cannot be composed.
    pub fn glyph_run(
        &mut self,
        shaper: &dyn ShapingProvider,
        font: &dyn FontProvider,
        text: &str,
        options: &ShapingOptions,
        font_size: f32,
    ) -> Result<Vec<PlacedGlyph>> {
        let chars: Vec<char> = text.chars().collect();
        let shaped = shaper.shape(
            font,
            &chars,
            options.direction,
            &options.script,
            &options.language,
            font_size,
        )?;

        let mut pen = Point2::origin();
        let mut run = Vec::with_capacity(shaped.len());
        for s in shaped {
            let glyph = self.get_glyph(font, s.glyph_id, font_size)?;
            run.push(PlacedGlyph {
                glyph,
                cluster: s.cluster,
                position: Point2::new(pen.x + s.x_offset, pen.y + s.y_offset),
            });
            pen.x += s.x_advance;
            pen.y += s.y_advance;
        }
        Ok(run)
    }
}
