pub mod face;
pub mod metrics;

pub use face::{FontFace, ScaledFont};
pub use metrics::{FontMetrics, ScaledFontMetrics};

use core::fmt;

use crate::geometry::Rect;
use crate::shaping::GlyphId;

/// Errors that can occur while working with fonts.
#[derive(Debug, thiserror::Error)]
pub enum FontError {
    #[error("font I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid font data")]
    InvalidFont,
    #[error("no font configured")]
    NotConfigured,
}

/// Convenient result alias for font-related operations.
pub type Result<T> = std::result::Result<T, FontError>;

/// Width of a tab stop, either as a number of space advances or as a
/// fixed pixel length.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TabSize {
    Spaces(f32),
    Pixels(f32),
}

impl Default for TabSize {
    fn default() -> Self {
        TabSize::Spaces(8.0)
    }
}

/// Capabilities a shaped result needs from the font each run was
/// shaped with.
///
/// Glyph bounds are ink extents relative to the glyph origin on the
/// alphabetic baseline, y pointing down.
pub trait FontData: fmt::Debug + Send + Sync {
    fn bounds_for_glyph(&self, glyph: GlyphId) -> Rect;

    /// Batch form of [`FontData::bounds_for_glyph`]. Backends where a
    /// single query is expensive should override this.
    fn bounds_for_glyphs(&self, glyphs: &[GlyphId], bounds: &mut Vec<Rect>) {
        bounds.clear();
        bounds.extend(glyphs.iter().map(|&glyph| self.bounds_for_glyph(glyph)));
    }

    fn space_glyph(&self) -> GlyphId;

    /// Advance of the space glyph in pixels.
    fn space_width(&self) -> f32;

    /// Ascent/descent used to convert vertical runs to logical bounds.
    fn vertical_metrics(&self) -> ScaledFontMetrics;

    /// True when the font is set up for upright vertical text.
    fn is_vertical_upright(&self) -> bool {
        false
    }

    /// Distance from `position` to the next tab stop, or the base tab
    /// width when no position is given.
    fn tab_width(&self, tab_size: TabSize, position: Option<f32>) -> f32 {
        let base = match tab_size {
            TabSize::Pixels(px) => px,
            TabSize::Spaces(count) => count * self.space_width(),
        };
        if base <= 0.0 {
            return 0.0;
        }
        let Some(position) = position else {
            return base;
        };
        let mut distance = base - position.rem_euclid(base);
        // Keep the tab at least half a space wide so it stays visible.
        if distance < self.space_width() / 2.0 {
            distance += base;
        }
        distance
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct Spaces;

    impl FontData for Spaces {
        fn bounds_for_glyph(&self, _glyph: GlyphId) -> Rect {
            Rect::default()
        }
        fn space_glyph(&self) -> GlyphId {
            3
        }
        fn space_width(&self) -> f32 {
            8.0
        }
        fn vertical_metrics(&self) -> ScaledFontMetrics {
            ScaledFontMetrics {
                ascent: 8.0,
                descent: 2.0,
                line_gap: 0.0,
                font_size: 10.0,
            }
        }
    }

    #[test]
    fn tab_width_snaps_to_stops() {
        let font = Spaces;
        let tab = TabSize::Spaces(4.0);
        assert_eq!(font.tab_width(tab, None), 32.0);
        assert_eq!(font.tab_width(tab, Some(0.0)), 32.0);
        assert_eq!(font.tab_width(tab, Some(13.0)), 19.0);
        // Less than half a space from the stop: skip to the following one.
        assert_eq!(font.tab_width(tab, Some(30.0)), 34.0);
        assert_eq!(font.tab_width(TabSize::Pixels(0.0), Some(5.0)), 0.0);
    }

    #[test]
    fn batch_bounds_defaults_to_single_queries() {
        let mut out = vec![Rect::new(1.0, 1.0, 1.0, 1.0)];
        Spaces.bounds_for_glyphs(&[1, 2, 3], &mut out);
        assert_eq!(out.len(), 3);
        assert!(out.iter().all(Rect::is_zero));
    }
}
