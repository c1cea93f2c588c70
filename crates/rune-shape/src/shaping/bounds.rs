use crate::font::ScaledFontMetrics;
use crate::geometry::Rect;

use super::GlyphData;

/// Unites glyph ink bounds along a run while the pen moves.
///
/// Bounds are collected in physical coordinates; vertical runs are
/// converted to logical coordinates once the whole run is united.
#[derive(Debug, Clone, Copy, Default)]
pub struct GlyphBoundsAccumulator {
    pub bounds: Rect,
    /// Pen position along the primary axis.
    pub origin: f32,
}

impl GlyphBoundsAccumulator {
    pub fn new(origin: f32) -> Self {
        Self {
            bounds: Rect::default(),
            origin,
        }
    }

    /// Add the ink of `glyph` placed at the current pen position.
    pub fn unite(&mut self, is_horizontal: bool, glyph: &GlyphData, glyph_bounds: Rect) {
        if glyph_bounds.is_empty() {
            return;
        }
        let mut placed = glyph_bounds;
        placed.translate(glyph.offset.x, glyph.offset.y);
        if is_horizontal {
            placed.x += self.origin;
        } else {
            placed.y += self.origin;
        }
        self.bounds.unite(&placed);
    }

    /// Transpose vertical-run bounds into logical coordinates and move
    /// them from the ideographic to the alphabetic baseline.
    pub fn convert_vertical_run_to_logical(&mut self, metrics: &ScaledFontMetrics) {
        let b = self.bounds;
        self.bounds = Rect::new(b.y, b.x, b.height, b.width);
        self.bounds.y += metrics.ideographic_ascent() - metrics.ascent;
    }
}
