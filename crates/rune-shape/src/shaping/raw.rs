//! Shaper output as handed to [`ShapeResult::insert_run`].
//!
//! Mirrors the HarfBuzz buffer layout: parallel info/position arrays in
//! visual order, positions in 16.16 fixed point pixels.
//!
//! [`ShapeResult::insert_run`]: crate::shaping::ShapeResult::insert_run

use super::Direction;

/// Glyph flag: breaking before this glyph requires reshaping.
pub const UNSAFE_TO_BREAK: u32 = 0x0000_0001;

const FIXED_ONE: f32 = 65536.0;

/// Convert a 16.16 fixed point value to float.
#[inline]
pub fn fixed_to_float(value: i32) -> f32 {
    value as f32 / FIXED_ONE
}

/// Convert a float to 16.16 fixed point, rounding to nearest.
#[inline]
pub fn float_to_fixed(value: f32) -> i32 {
    (value * FIXED_ONE).round() as i32
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RawGlyphInfo {
    /// Glyph id after shaping.
    pub glyph_id: u32,
    /// Absolute source index of the cluster this glyph belongs to.
    pub cluster: u32,
    pub flags: u32,
}

impl RawGlyphInfo {
    pub fn unsafe_to_break(&self) -> bool {
        self.flags & UNSAFE_TO_BREAK != 0
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RawGlyphPosition {
    pub x_advance: i32,
    pub y_advance: i32,
    pub x_offset: i32,
    pub y_offset: i32,
}

/// Glyphs of one shaping call.
#[derive(Debug, Clone)]
pub struct RawGlyphBuffer {
    direction: Direction,
    infos: Vec<RawGlyphInfo>,
    positions: Vec<RawGlyphPosition>,
}

impl RawGlyphBuffer {
    pub fn new(direction: Direction) -> Self {
        Self::with_capacity(direction, 0)
    }

    pub fn with_capacity(direction: Direction, capacity: usize) -> Self {
        Self {
            direction,
            infos: Vec::with_capacity(capacity),
            positions: Vec::with_capacity(capacity),
        }
    }

    pub fn push(&mut self, info: RawGlyphInfo, position: RawGlyphPosition) {
        self.infos.push(info);
        self.positions.push(position);
    }

    /// Append a glyph with a horizontal advance given in pixels.
    pub fn push_horizontal(
        &mut self,
        glyph_id: u32,
        cluster: u32,
        advance: f32,
        unsafe_to_break: bool,
    ) {
        self.push(
            RawGlyphInfo {
                glyph_id,
                cluster,
                flags: if unsafe_to_break { UNSAFE_TO_BREAK } else { 0 },
            },
            RawGlyphPosition {
                x_advance: float_to_fixed(advance),
                ..Default::default()
            },
        );
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn infos(&self) -> &[RawGlyphInfo] {
        &self.infos
    }

    pub fn positions(&self) -> &[RawGlyphPosition] {
        &self.positions
    }

    pub fn len(&self) -> usize {
        self.infos.len()
    }

    pub fn is_empty(&self) -> bool {
        self.infos.is_empty()
    }
}
