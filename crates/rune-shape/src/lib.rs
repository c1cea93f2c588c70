//! rune-shape: shaped text results.
//!
//! - `shaping`: the [`ShapeResult`] model (runs of positioned glyphs in
//!   visual order), offset/position queries, sub-ranging, spacing and the
//!   harfrust-backed [`TextShaper`]
//! - `font`: the [`FontData`] capability runs need from a font, and a
//!   swash-backed implementation
//! - `unicode`: grapheme boundaries over UTF-16 text
//!
//! Character offsets are UTF-16 code unit indexes throughout.

pub mod font;
pub mod geometry;
pub mod shaping;
pub mod unicode;

pub use font::{
    face::{FontFace, ScaledFont},
    metrics::{FontMetrics, ScaledFontMetrics},
    FontData, FontError, TabSize,
};

pub use geometry::{Offset, Rect};

pub use shaping::{
    AdjustMidCluster, BreakGlyphsOption, CanvasRotation, CharacterRange, Direction, GlyphData,
    GlyphIndexResult, RawGlyphBuffer, RunInfo, Script, ShapeRange, ShapeResult, Spacing,
    TextDirection, TextShaper, TextSpacing,
};
