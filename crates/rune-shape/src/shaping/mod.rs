//! Shaped text results.
//!
//! A [`ShapeResult`] is the immutable, queryable output of shaping a
//! range of text: runs of positioned glyphs in visual order plus the
//! bookkeeping needed to map between character offsets and x positions.

pub mod bounds;
pub mod glyph;
pub mod offsets;
pub mod position_data;
pub mod raw;
pub mod result;
pub mod run;
pub mod shaper;
pub mod spacing;
pub mod sub_range;

#[cfg(test)]
pub(crate) mod test_font;

pub use bounds::GlyphBoundsAccumulator;
pub use glyph::{GlyphData, GlyphId, MAX_CHARACTER_INDEX, MAX_GLYPHS_PER_RUN};
pub use offsets::{GlyphVisit, GraphemeClusterVisit};
pub use position_data::{CharacterPosition, CharacterPositionData};
pub use raw::{RawGlyphBuffer, RawGlyphInfo, RawGlyphPosition};
pub use result::{RunFontData, ShapeResult};
pub use run::RunInfo;
pub use shaper::TextShaper;
pub use spacing::{Spacing, TextSpacing};

use core::fmt;

/// Direction a run was shaped in.
///
/// Vertical directions only occur for runs in vertical writing modes;
/// their primary axis is y.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    LeftToRight,
    RightToLeft,
    TopToBottom,
    BottomToTop,
}

impl Direction {
    /// True when glyphs are stored in increasing cluster order.
    pub fn is_forward(self) -> bool {
        matches!(self, Direction::LeftToRight | Direction::TopToBottom)
    }

    pub fn is_horizontal(self) -> bool {
        matches!(self, Direction::LeftToRight | Direction::RightToLeft)
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Direction::LeftToRight => "ltr",
            Direction::RightToLeft => "rtl",
            Direction::TopToBottom => "ttb",
            Direction::BottomToTop => "btt",
        };
        f.write_str(name)
    }
}

/// Inline base direction of a whole result or line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TextDirection {
    #[default]
    Ltr,
    Rtl,
}

impl TextDirection {
    pub fn is_ltr(self) -> bool {
        self == TextDirection::Ltr
    }

    pub fn is_rtl(self) -> bool {
        self == TextDirection::Rtl
    }
}

impl From<TextDirection> for Direction {
    fn from(direction: TextDirection) -> Self {
        match direction {
            TextDirection::Ltr => Direction::LeftToRight,
            TextDirection::Rtl => Direction::RightToLeft,
        }
    }
}

impl fmt::Display for TextDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(if self.is_ltr() { "ltr" } else { "rtl" })
    }
}

/// Whether a run must be rotated when painted on a vertical line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CanvasRotation {
    #[default]
    Regular,
    Rotated,
}

/// ISO-15924 script tag of a run, e.g. `b"Latn"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Script(pub [u8; 4]);

impl Script {
    pub const COMMON: Script = Script(*b"Zyyy");
    pub const LATIN: Script = Script(*b"Latn");
    pub const HEBREW: Script = Script(*b"Hebr");
    pub const ARABIC: Script = Script(*b"Arab");
    pub const HAN: Script = Script(*b"Hani");

    /// Parse a four letter tag; anything else yields `None`.
    pub fn from_tag(tag: &str) -> Option<Self> {
        let bytes: [u8; 4] = tag.as_bytes().try_into().ok()?;
        bytes.iter().all(u8::is_ascii_alphabetic).then_some(Script(bytes))
    }

    pub fn tag(&self) -> &[u8; 4] {
        &self.0
    }
}

impl Default for Script {
    fn default() -> Self {
        Script::COMMON
    }
}

/// Where a position query lands when the offset falls inside a
/// grapheme slice rather than on its edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AdjustMidCluster {
    /// Snap to the logical start of the slice.
    #[default]
    ToStart,
    /// Snap to the logical end of the slice.
    ToEnd,
}

/// Whether hit testing may split a multi-grapheme glyph sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BreakGlyphsOption {
    #[default]
    DontBreakGlyphs,
    BreakGlyphs,
}

/// Outcome of mapping an x position to characters.
///
/// `[left_character_index, right_character_index)` is the hit
/// character interval (reversed for RTL), `origin_x`/`advance` its
/// horizontal extent.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct GlyphIndexResult {
    pub characters_on_left_runs: u32,
    pub left_character_index: u32,
    pub right_character_index: u32,
    pub origin_x: f32,
    pub advance: f32,
}

/// Horizontal extent of a character range plus the line metrics it sits in.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CharacterRange {
    pub start: f32,
    pub end: f32,
    pub ascent: f32,
    pub descent: f32,
}

impl CharacterRange {
    pub fn new(start: f32, end: f32, ascent: f32, descent: f32) -> Self {
        Self {
            start,
            end,
            ascent,
            descent,
        }
    }

    pub fn width(&self) -> f32 {
        self.end - self.start
    }
}

/// One `[start, end)` range for [`ShapeResult::copy_ranges`] and the
/// result it is copied into.
#[derive(Debug)]
pub struct ShapeRange<'a> {
    pub start: u32,
    pub end: u32,
    pub target: &'a mut ShapeResult,
}

impl<'a> ShapeRange<'a> {
    pub fn new(start: u32, end: u32, target: &'a mut ShapeResult) -> Self {
        Self { start, end, target }
    }
}
