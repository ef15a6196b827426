//! Interfaces to the font backend.
//!
//! Outline extraction and text shaping are provided by the caller; glyphforge
//! only consumes their results.

use crate::error::Result;

/// Glyph identifier within a font.
pub type GlyphId = u32;

/// Receiver for glyph outline commands.
///
/// Each `move_to` starts a new contour. Coordinates are in font design
/// units, Y-up.
pub trait OutlineSink {
    /// Starts a new contour at `(x, y)`.
    fn move_to(&mut self, x: f32, y: f32);
    /// Draws a straight line to `(x, y)`.
    fn line_to(&mut self, x: f32, y: f32);
    /// Draws a quadratic Bezier through control `(cx, cy)` to `(x, y)`.
    fn quad_to(&mut self, cx: f32, cy: f32, x: f32, y: f32);
    /// Draws a cubic Bezier to `(x, y)`.
    fn cubic_to(&mut self, c1x: f32, c1y: f32, c2x: f32, c2y: f32, x: f32, y: f32);
    /// Closes the current contour.
    fn close(&mut self);
}

/// Glyph metrics, in the units of whoever produced them.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct GlyphMetrics {
    pub width: f32,
    pub height: f32,
    pub bearing_x: f32,
    pub bearing_y: f32,
    pub advance_x: f32,
    pub advance_y: f32,
}

impl GlyphMetrics {
    /// Multiplies every metric by `scale`.
    #[must_use]
    pub fn scaled(&self, scale: f32) -> Self {
        Self {
            width: self.width * scale,
            height: self.height * scale,
            bearing_x: self.bearing_x * scale,
            bearing_y: self.bearing_y * scale,
            advance_x: self.advance_x * scale,
            advance_y: self.advance_y * scale,
        }
    }
}

/// A font that can describe its glyphs.
pub trait FontProvider {
    /// Name used to key cached glyphs.
    fn name(&self) -> &str;

    /// Design units per em; outline coordinates are scaled by
    /// `font_size / units_per_em`.
    fn units_per_em(&self) -> f32;

    /// Metrics of `glyph_id` in design units.
    ///
    /// # Errors
    ///
    /// Returns an error if the glyph does not exist.
    fn glyph_metrics(&self, glyph_id: GlyphId) -> Result<GlyphMetrics>;

    /// Emits the outline of `glyph_id` into `sink`, in design units.
    ///
    /// # Errors
    ///
    /// Returns an error if the glyph does not exist or cannot be decoded.
    fn outline(&self, glyph_id: GlyphId, sink: &mut dyn OutlineSink) -> Result<()>;
}

/// Writing direction of a run of text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TextDirection {
    #[default]
    LeftToRight,
    RightToLeft,
    TopToBottom,
    BottomToTop,
}

/// One positioned glyph produced by shaping, in font size units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShapedGlyph {
    pub glyph_id: GlyphId,
    pub cluster: u32,
    pub x_advance: f32,
    pub y_advance: f32,
    pub x_offset: f32,
    pub y_offset: f32,
}

/// Turns text into glyphs.
pub trait ShapingProvider {
    /// Shapes `text` with `font` at `font_size`.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend fails.
    fn shape(
        &self,
        font: &dyn FontProvider,
        text: &[char],
        direction: TextDirection,
        script: &str,
        language: &str,
        font_size: f32,
    ) -> Result<Vec<ShapedGlyph>>;
}

/// Script, language and direction handed to the shaper.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShapingOptions {
    pub direction: TextDirection,
    /// ISO 15924 script tag.
    pub script: String,
    /// BCP 47 language tag.
    pub language: String,
}

impl Default for ShapingOptions {
    fn default() -> Self {
        Self {
            direction: TextDirection::LeftToRight,
            script: "Latn".into(),
            language: "en".into(),
        }
    }
}
