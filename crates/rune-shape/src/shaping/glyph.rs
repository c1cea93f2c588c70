use crate::geometry::Offset;

/// Font-local glyph identifier.
pub type GlyphId = u16;

/// Largest character index a glyph can carry relative to its run.
pub const MAX_CHARACTER_INDEX: u32 = u16::MAX as u32;

/// Hard cap on glyphs per run; longer shaper output is split into
/// follow-on runs.
pub const MAX_GLYPHS_PER_RUN: usize = 1 << 15;

const FLAG_SAFE_TO_BREAK_BEFORE: u8 = 1 << 0;

/// Raw value marking cached ink bounds as unknown.
const UNSET_BOUNDS: i16 = i16::MAX;
/// Ink bounds are cached in 1/64 px units.
const BOUNDS_UNITS_PER_PX: f32 = 64.0;

/// One positioned glyph inside a run.
///
/// The record is kept small because results hold one per glyph and
/// paint/hit-test paths walk them constantly: cluster and bounds are
/// packed into 16-bit fields.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GlyphData {
    /// Pen movement along the run's primary axis.
    pub advance: f32,
    /// Paint-time displacement; does not move the pen.
    pub offset: Offset,
    pub glyph: GlyphId,
    character_index: u16,
    bounds_x: i16,
    bounds_width: i16,
    flags: u8,
}

impl GlyphData {
    pub fn new(
        glyph: GlyphId,
        character_index: u32,
        advance: f32,
        offset: Offset,
        safe_to_break_before: bool,
    ) -> Self {
        debug_assert!(character_index <= MAX_CHARACTER_INDEX);
        Self {
            advance,
            offset,
            glyph,
            character_index: character_index as u16,
            bounds_x: UNSET_BOUNDS,
            bounds_width: UNSET_BOUNDS,
            flags: if safe_to_break_before {
                FLAG_SAFE_TO_BREAK_BEFORE
            } else {
                0
            },
        }
    }

    /// Source character offset relative to the owning run's start.
    #[inline]
    pub fn character_index(&self) -> u32 {
        self.character_index as u32
    }

    pub fn set_character_index(&mut self, character_index: u32) {
        debug_assert!(character_index <= MAX_CHARACTER_INDEX);
        self.character_index = character_index as u16;
    }

    #[inline]
    pub fn safe_to_break_before(&self) -> bool {
        self.flags & FLAG_SAFE_TO_BREAK_BEFORE != 0
    }

    pub fn set_safe_to_break_before(&mut self, safe: bool) {
        if safe {
            self.flags |= FLAG_SAFE_TO_BREAK_BEFORE;
        } else {
            self.flags &= !FLAG_SAFE_TO_BREAK_BEFORE;
        }
    }

    /// Cache the ink extent along the primary axis. Values outside the
    /// packed range are stored as unknown.
    pub fn set_glyph_bounds(&mut self, x: f32, width: f32) {
        self.bounds_x = pack_bounds(x);
        self.bounds_width = pack_bounds(width);
    }

    pub fn has_valid_glyph_bounds(&self) -> bool {
        self.bounds_x != UNSET_BOUNDS && self.bounds_width != UNSET_BOUNDS
    }

    pub fn glyph_bounds_logical_x(&self) -> f32 {
        debug_assert!(self.has_valid_glyph_bounds());
        self.bounds_x as f32 / BOUNDS_UNITS_PER_PX
    }

    pub fn glyph_bounds_logical_width(&self) -> f32 {
        debug_assert!(self.has_valid_glyph_bounds());
        self.bounds_width as f32 / BOUNDS_UNITS_PER_PX
    }
}

fn pack_bounds(value: f32) -> i16 {
    let raw = (value * BOUNDS_UNITS_PER_PX).round();
    if raw.is_finite() && raw >= i16::MIN as f32 && raw < UNSET_BOUNDS as f32 {
        raw as i16
    } else {
        UNSET_BOUNDS
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_stays_small() {
        assert!(std::mem::size_of::<GlyphData>() <= 24);
    }

    #[test]
    fn flags_and_index() {
        let mut glyph = GlyphData::new(7, 65535, 10.0, Offset::zero(), true);
        assert_eq!(glyph.character_index(), MAX_CHARACTER_INDEX);
        assert!(glyph.safe_to_break_before());
        glyph.set_safe_to_break_before(false);
        assert!(!glyph.safe_to_break_before());
        glyph.set_character_index(3);
        assert_eq!(glyph.character_index(), 3);
    }

    #[test]
    fn bounds_round_trip_in_fixed_point() {
        let mut glyph = GlyphData::new(1, 0, 10.0, Offset::zero(), false);
        assert!(!glyph.has_valid_glyph_bounds());
        glyph.set_glyph_bounds(1.5, 7.25);
        assert!(glyph.has_valid_glyph_bounds());
        assert_eq!(glyph.glyph_bounds_logical_x(), 1.5);
        assert_eq!(glyph.glyph_bounds_logical_width(), 7.25);
    }

    #[test]
    fn out_of_range_bounds_are_unset() {
        let mut glyph = GlyphData::new(1, 0, 10.0, Offset::zero(), false);
        glyph.set_glyph_bounds(0.0, 4096.0);
        assert!(!glyph.has_valid_glyph_bounds());
    }
}
