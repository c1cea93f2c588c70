//! Unicode utilities for rune-shape.
//!
//! Shaped results index text in UTF-16 code units, so the grapheme
//! helpers here take `&[u16]` and report offsets in code units.

pub mod graphemes;

pub use graphemes::{count_graphemes, grapheme_boundaries, grapheme_ordinals};
