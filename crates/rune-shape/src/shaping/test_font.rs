//! Deterministic font and result builders for unit tests.

use std::sync::Arc;

use crate::font::{FontData, ScaledFontMetrics};
use crate::geometry::Rect;

use super::raw::RawGlyphBuffer;
use super::{CanvasRotation, Direction, GlyphId, RunInfo, Script, ShapeResult, TextDirection};

pub(crate) const ADVANCE: f32 = 10.0;
pub(crate) const SPACE_GLYPH: GlyphId = 3;

/// Every glyph is 10px wide with 1px side bearings; the space glyph has
/// no ink.
#[derive(Debug)]
pub(crate) struct TestFont;

impl FontData for TestFont {
    fn bounds_for_glyph(&self, glyph: GlyphId) -> Rect {
        if glyph == SPACE_GLYPH {
            Rect::default()
        } else {
            Rect::new(1.0, -8.0, ADVANCE - 2.0, 10.0)
        }
    }

    fn space_glyph(&self) -> GlyphId {
        SPACE_GLYPH
    }

    fn space_width(&self) -> f32 {
        ADVANCE
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

pub(crate) fn font() -> Arc<dyn FontData> {
    Arc::new(TestFont)
}

/// Shape `clusters` (absolute, in visual order) as one run covering
/// `[start, start + num_characters)`, one 10px glyph per cluster entry.
pub(crate) fn insert(
    result: &mut ShapeResult,
    direction: Direction,
    start: u32,
    num_characters: u32,
    clusters: &[u32],
) {
    let mut buffer = RawGlyphBuffer::new(direction);
    for &cluster in clusters {
        buffer.push_horizontal(1, cluster, ADVANCE, false);
    }
    let run = RunInfo::new(
        result.primary_font().clone(),
        direction,
        CanvasRotation::Regular,
        Script::COMMON,
        start,
        num_characters,
    );
    let consumed = result.insert_run(run, 0, buffer.len(), &buffer);
    assert_eq!(consumed, buffer.len());
}

/// One glyph per character, `len` characters starting at 0.
pub(crate) fn simple(direction: TextDirection, len: u32) -> ShapeResult {
    let mut result = ShapeResult::new(font(), len, direction);
    let mut clusters: Vec<u32> = (0..len).collect();
    if direction.is_rtl() {
        clusters.reverse();
    }
    insert(&mut result, direction.into(), 0, len, &clusters);
    result
}
