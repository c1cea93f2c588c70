use std::sync::Arc;

use swash::scale::outline::Outline;
use swash::scale::ScaleContext;
use swash::{FontRef, Metrics};

use crate::font::{FontData, FontError, FontMetrics, Result, ScaledFontMetrics};
use crate::geometry::Rect;
use crate::shaping::GlyphId;

/// Loaded font face backed by a font file (TTF/OTF).
///
/// This is a thin wrapper around `swash::FontRef` that owns the
/// underlying font data and exposes metrics and glyph outlines.
#[derive(Debug, Clone)]
pub struct FontFace {
    /// Full font data.
    data: Arc<[u8]>,
    /// Face index within the file.
    index: u32,
    /// Offset to the table directory for this font.
    offset: u32,
    /// Cache key used internally by swash.
    key: swash::CacheKey,
    /// Extracted font metrics in font units.
    metrics: FontMetrics,
}

impl FontFace {
    /// Create a font face from raw bytes and a font index within the file.
    pub fn from_bytes(data: Arc<[u8]>, index: usize) -> Result<Self> {
        let font = FontRef::from_index(&data, index).ok_or(FontError::InvalidFont)?;
        let metrics = Self::metrics_from_swash(&font);
        let (offset, key) = (font.offset, font.key);
        Ok(Self {
            data,
            index: index as u32,
            offset,
            key,
            metrics,
        })
    }

    /// Create a font face from raw bytes owned by a `Vec<u8>`.
    pub fn from_vec(data: Vec<u8>, index: usize) -> Result<Self> {
        Self::from_bytes(Arc::from(data), index)
    }

    /// Create a font face from a font file on disk.
    pub fn from_path(path: impl AsRef<std::path::Path>, index: usize) -> Result<Self> {
        let data = std::fs::read(path)?;
        Self::from_vec(data, index)
    }

    /// Raw font bytes, shared with the shaping engine.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Face index within a collection file.
    pub fn index(&self) -> u32 {
        self.index
    }

    /// Return a transient `FontRef` for interacting with swash APIs.
    fn as_swash_ref(&self) -> FontRef<'_> {
        FontRef {
            data: &self.data,
            offset: self.offset,
            key: self.key,
        }
    }

    fn metrics_from_swash(font: &FontRef<'_>) -> FontMetrics {
        // Use default (no variation) coordinates.
        let Metrics {
            units_per_em,
            ascent,
            descent,
            leading,
            ..
        } = font.metrics(&[]);

        FontMetrics {
            ascent,
            descent,
            line_gap: leading,
            units_per_em,
        }
    }

    /// Font metrics in font units.
    pub fn metrics(&self) -> FontMetrics {
        self.metrics
    }

    /// Font metrics scaled to the requested pixel size (px per em).
    pub fn scaled_metrics(&self, font_size: f32) -> ScaledFontMetrics {
        self.metrics.scale_to_pixels(font_size)
    }

    /// Nominal glyph for a character, 0 when the font has none.
    pub fn glyph_for_char(&self, ch: char) -> GlyphId {
        self.as_swash_ref().charmap().map(ch)
    }

    /// Horizontal advance of a glyph in pixels.
    pub fn advance_width(&self, glyph_id: GlyphId, font_size: f32) -> f32 {
        self.as_swash_ref()
            .glyph_metrics(&[])
            .scale(font_size)
            .advance_width(glyph_id)
    }

    /// Convert a glyph id to a scaled outline at the specified size.
    pub fn glyph_outline(&self, glyph_id: GlyphId, font_size: f32) -> Option<Outline> {
        let mut context = ScaleContext::new();
        let font = self.as_swash_ref();
        let mut scaler = context.builder(font).size(font_size).build();
        scaler.scale_outline(glyph_id)
    }
}

/// A [`FontFace`] at a fixed pixel size.
///
/// This is the font object runs hold on to: it answers glyph bounds
/// and the space/tab metrics needed by shaped results.
#[derive(Debug, Clone)]
pub struct ScaledFont {
    face: Arc<FontFace>,
    font_size: f32,
    space_glyph: GlyphId,
    space_width: f32,
    metrics: ScaledFontMetrics,
}

impl ScaledFont {
    pub fn new(face: Arc<FontFace>, font_size: f32) -> Self {
        let space_glyph = face.glyph_for_char(' ');
        let space_width = face.advance_width(space_glyph, font_size);
        let metrics = face.scaled_metrics(font_size);
        Self {
            face,
            font_size,
            space_glyph,
            space_width,
            metrics,
        }
    }

    pub fn face(&self) -> &Arc<FontFace> {
        &self.face
    }

    pub fn font_size(&self) -> f32 {
        self.font_size
    }

    /// Factor converting the face's design units to pixels.
    pub fn scale(&self) -> f32 {
        self.face.metrics().scale_factor(self.font_size)
    }
}

impl FontData for ScaledFont {
    fn bounds_for_glyph(&self, glyph: GlyphId) -> Rect {
        let Some(outline) = self.face.glyph_outline(glyph, self.font_size) else {
            return Rect::default();
        };
        let bounds = outline.bounds();
        // swash outlines are y-up; flip into y-down logical space.
        Rect::from_edges(bounds.min.x, -bounds.max.y, bounds.max.x, -bounds.min.y)
    }

    fn bounds_for_glyphs(&self, glyphs: &[GlyphId], bounds: &mut Vec<Rect>) {
        bounds.clear();
        let mut context = ScaleContext::new();
        let mut scaler = context
            .builder(self.face.as_swash_ref())
            .size(self.font_size)
            .build();
        bounds.extend(glyphs.iter().map(|&glyph| match scaler.scale_outline(glyph) {
            Some(outline) => {
                let b = outline.bounds();
                Rect::from_edges(b.min.x, -b.max.y, b.max.x, -b.min.y)
            }
            None => Rect::default(),
        }));
    }

    fn space_glyph(&self) -> GlyphId {
        self.space_glyph
    }

    fn space_width(&self) -> f32 {
        self.space_width
    }

    fn vertical_metrics(&self) -> ScaledFontMetrics {
        self.metrics
    }
}
