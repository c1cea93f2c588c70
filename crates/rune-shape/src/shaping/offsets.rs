//! Offset and position queries on a [`ShapeResult`].
//!
//! All offsets passed in and returned are relative to the result's
//! `start_index` unless noted; positions are measured from the left
//! edge of the result in visual order.

use std::sync::Arc;

use crate::font::FontData;
use crate::geometry::Offset;
use crate::unicode::count_graphemes;

use super::{
    AdjustMidCluster, BreakGlyphsOption, CanvasRotation, CharacterRange, GlyphId,
    GlyphIndexResult, RunInfo, ShapeResult, TextDirection,
};

/// One glyph reported by [`ShapeResult::for_each_glyph`].
#[derive(Debug, Clone, Copy)]
pub struct GlyphVisit<'a> {
    pub character_index: u32,
    pub glyph: GlyphId,
    pub offset: Offset,
    /// Pen position before this glyph's advance is applied.
    pub advance: f32,
    pub is_horizontal: bool,
    pub canvas_rotation: CanvasRotation,
    pub font: &'a Arc<dyn FontData>,
}

/// One shaping cluster reported by [`ShapeResult::for_each_grapheme_cluster`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GraphemeClusterVisit {
    pub character_index: u32,
    pub advance_so_far: f32,
    pub graphemes_in_cluster: u32,
    pub cluster_advance: f32,
    pub canvas_rotation: CanvasRotation,
}

impl ShapeResult {
    /// First offset at or after `index` where the text can be split
    /// without reshaping. `index` is absolute.
    pub fn next_safe_to_break_offset(&self, index: u32) -> u32 {
        for (i, run) in self.runs.iter().enumerate() {
            let run_start = run.start_index;
            if index >= run_start {
                let offset = index - run_start;
                if offset <= run.num_characters {
                    return run.next_safe_to_break_offset(offset) + run_start;
                }
                if self.is_rtl() {
                    // `index` is in the gap before this run visually.
                    return match i.checked_sub(1) {
                        None => run_start + run.num_characters,
                        Some(previous) => self.runs[previous].start_index,
                    };
                }
            } else if self.is_ltr() {
                return run_start;
            }
        }
        self.end_index()
    }

    /// Last offset at or before `index` where the text can be split
    /// without reshaping. `index` is absolute.
    pub fn previous_safe_to_break_offset(&self, index: u32) -> u32 {
        for (i, run) in self.runs.iter().enumerate().rev() {
            let run_start = run.start_index;
            if index >= run_start {
                let offset = index - run_start;
                if offset <= run.num_characters {
                    return run.previous_safe_to_break_offset(offset) + run_start;
                }
                if self.is_ltr() {
                    return run_start + run.num_characters;
                }
            } else if self.is_rtl() {
                return match self.runs.get(i + 1) {
                    None => run.start_index,
                    Some(next) => next.start_index + next.num_characters,
                };
            }
        }
        self.start_index
    }

    /// Characters under `target_x`. Positions before the start or past
    /// the end clamp to the first or last offset of the result.
    pub fn offset_for_position_detailed(
        &self,
        target_x: f32,
        break_glyphs: BreakGlyphsOption,
    ) -> GlyphIndexResult {
        let mut result = GlyphIndexResult::default();
        let rtl = self.is_rtl();
        if target_x <= 0.0 {
            if rtl {
                result.left_character_index = self.num_characters;
                result.right_character_index = self.num_characters;
            }
            return result;
        }

        let mut characters_so_far = if rtl { self.num_characters } else { 0 };
        let mut current_x = 0.0f32;
        for run in &self.runs {
            if rtl {
                characters_so_far -= run.num_characters;
            }
            let offset_for_run = target_x - current_x;
            if offset_for_run >= 0.0 && offset_for_run < run.width {
                let hit = run.character_index_for_x_position(offset_for_run, break_glyphs);
                return GlyphIndexResult {
                    characters_on_left_runs: characters_so_far,
                    left_character_index: hit.left_character_index + characters_so_far,
                    right_character_index: hit.right_character_index + characters_so_far,
                    origin_x: hit.origin_x + current_x,
                    advance: hit.advance,
                };
            }
            if !rtl {
                characters_so_far += run.num_characters;
            }
            current_x += run.width;
        }

        if !rtl {
            result.left_character_index = characters_so_far;
            result.right_character_index = characters_so_far;
        }
        result.characters_on_left_runs = characters_so_far;
        result
    }

    /// Offset of the character under `x`.
    ///
    /// RTL hits are half-open on the other side, so a hit exactly on a
    /// boundary picks the logically earlier character.
    pub fn offset_for_position(&self, x: f32, break_glyphs: BreakGlyphsOption) -> u32 {
        let result = self.offset_for_position_detailed(x, break_glyphs);
        if self.is_ltr() || x == result.origin_x {
            return result.left_character_index;
        }
        result.right_character_index
    }

    /// Caret offset closest to `x`: the hit character's leading or
    /// trailing edge, whichever half `x` falls in.
    pub fn caret_offset_for_hit_test(
        &self,
        x: f32,
        text: &[u16],
        break_glyphs: BreakGlyphsOption,
    ) -> u32 {
        if break_glyphs == BreakGlyphsOption::BreakGlyphs {
            self.ensure_graphemes(text);
        }
        let result = self.offset_for_position_detailed(x, break_glyphs);
        if x - result.origin_x <= result.advance / 2.0 {
            result.left_character_index
        } else {
            result.right_character_index
        }
    }

    /// Number of characters that fit before `x` on a line with the given
    /// direction.
    pub fn offset_to_fit(&self, x: f32, line_direction: TextDirection) -> u32 {
        let result = self.offset_for_position_detailed(x, BreakGlyphsOption::DontBreakGlyphs);
        if line_direction.is_ltr() {
            return result.left_character_index;
        }
        if x == result.origin_x && self.is_rtl() {
            return result.left_character_index;
        }
        result.right_character_index
    }

    /// x position of the leading edge of the character at `offset`.
    /// Offsets at or past `num_characters` map to the trailing edge of
    /// the result.
    ///
    /// Inside a run against the result direction the caret follows the
    /// run, except at its logical start, which stays at the trailing
    /// edge of the text before it.
    pub fn position_for_offset(&self, offset: u32, adjust: AdjustMidCluster) -> f32 {
        let offset = offset.min(self.num_characters);
        if offset == self.num_characters {
            return if self.is_rtl() { 0.0 } else { self.width };
        }

        let absolute_offset = self.start_index + offset;
        let mut x = 0.0f32;
        for run in &self.runs {
            let Some(offset_in_run) = absolute_offset
                .checked_sub(run.start_index)
                .filter(|&index| index < run.num_characters)
            else {
                x += run.width;
                continue;
            };
            if run.is_rtl() != self.is_rtl() && offset_in_run == 0 && offset > 0 {
                return if self.is_rtl() { x + run.width } else { x };
            }
            return run.x_position_for_offset(offset_in_run, adjust) + x;
        }
        0.0
    }

    /// [`ShapeResult::position_for_offset`] with graphemes materialized
    /// from `text` first, so positions inside ligatures interpolate.
    pub fn caret_position_for_offset(
        &self,
        offset: u32,
        text: &[u16],
        adjust: AdjustMidCluster,
    ) -> f32 {
        self.ensure_graphemes(text);
        self.position_for_offset(offset, adjust)
    }

    /// Visit every glyph in visual order. Returns the final pen position.
    pub fn for_each_glyph(
        &self,
        initial_advance: f32,
        mut callback: impl FnMut(GlyphVisit<'_>),
    ) -> f32 {
        let mut total_advance = initial_advance;
        for run in &self.runs {
            let is_horizontal = run.is_horizontal();
            for glyph in &run.glyphs {
                callback(GlyphVisit {
                    character_index: run.start_index + glyph.character_index(),
                    glyph: glyph.glyph,
                    offset: glyph.offset,
                    advance: total_advance,
                    is_horizontal,
                    canvas_rotation: run.canvas_rotation,
                    font: &run.font,
                });
                total_advance += glyph.advance;
            }
        }
        total_advance
    }

    /// Visit glyphs whose character index, shifted by `index_offset`,
    /// lies in `[from, to)`. Glyphs outside the range still advance the
    /// pen.
    pub fn for_each_glyph_in_range(
        &self,
        initial_advance: f32,
        from: u32,
        to: u32,
        index_offset: u32,
        mut callback: impl FnMut(GlyphVisit<'_>),
    ) -> f32 {
        let mut total_advance = initial_advance;
        for run in &self.runs {
            let run_start = run.start_index + index_offset;
            let is_horizontal = run.is_horizontal();
            for glyph in &run.glyphs {
                let character_index = run_start + glyph.character_index();
                let in_range = if run.is_rtl() {
                    if character_index < from {
                        break;
                    }
                    character_index < to
                } else {
                    if character_index >= to {
                        break;
                    }
                    character_index >= from
                };
                if in_range {
                    callback(GlyphVisit {
                        character_index,
                        glyph: glyph.glyph,
                        offset: glyph.offset,
                        advance: total_advance,
                        is_horizontal,
                        canvas_rotation: run.canvas_rotation,
                        font: &run.font,
                    });
                }
                total_advance += glyph.advance;
            }
        }
        total_advance
    }

    /// Grapheme clusters in `text[start..end]`; the bounds may be given
    /// in either order.
    pub fn count_graphemes_in_cluster(text: &[u16], start: u32, end: u32) -> u32 {
        let (start, end) = if start > end { (end, start) } else { (start, end) };
        let end = (end as usize).min(text.len());
        let start = (start as usize).min(end);
        count_graphemes(&text[start..end]) as u32
    }

    /// Visit every shaping cluster overlapping `[from, to)`, reporting
    /// how many graphemes it holds. Latin-1 text is reported per glyph.
    pub fn for_each_grapheme_cluster(
        &self,
        text: &[u16],
        initial_advance: f32,
        from: u32,
        to: u32,
        index_offset: u32,
        mut callback: impl FnMut(GraphemeClusterVisit),
    ) -> f32 {
        let is_8bit = text.iter().all(|&unit| unit <= 0xff);
        let rtl = self.is_rtl();
        let mut advance_so_far = initial_advance;

        for run in &self.runs {
            if run.glyphs.is_empty() {
                continue;
            }
            let mut cluster_advance = 0.0f32;
            let mut cluster_start = if rtl {
                run.start_index + run.num_characters + index_offset
            } else {
                run.glyph_to_character_index(0) + index_offset
            };

            let num_glyphs = run.glyphs.len();
            for (i, glyph) in run.glyphs.iter().enumerate() {
                let current = run.start_index + glyph.character_index() + index_offset;
                let is_run_end = i + 1 == num_glyphs;
                let is_cluster_end = is_run_end
                    || run.glyph_to_character_index(i + 1) + index_offset != current;

                if (rtl && current >= to) || (!rtl && current < from) {
                    advance_so_far += glyph.advance;
                    if rtl {
                        cluster_start = cluster_start.saturating_sub(1);
                    } else {
                        cluster_start += 1;
                    }
                    continue;
                }

                cluster_advance += glyph.advance;

                if is_8bit {
                    callback(GraphemeClusterVisit {
                        character_index: current,
                        advance_so_far,
                        graphemes_in_cluster: 1,
                        cluster_advance: glyph.advance,
                        canvas_rotation: run.canvas_rotation,
                    });
                    advance_so_far += glyph.advance;
                } else if is_cluster_end {
                    let cluster_end = if rtl {
                        current
                    } else if is_run_end {
                        run.start_index + run.num_characters + index_offset
                    } else {
                        run.glyph_to_character_index(i + 1) + index_offset
                    };
                    let graphemes =
                        Self::count_graphemes_in_cluster(text, cluster_start, cluster_end);
                    if graphemes == 0 || cluster_advance == 0.0 {
                        continue;
                    }
                    callback(GraphemeClusterVisit {
                        character_index: current,
                        advance_so_far,
                        graphemes_in_cluster: graphemes,
                        cluster_advance,
                        canvas_rotation: run.canvas_rotation,
                    });
                    advance_so_far += cluster_advance;
                    cluster_start = cluster_end;
                    cluster_advance = 0.0;
                }
            }
        }
        advance_so_far
    }

    /// Horizontal span of every character, in logical order within each
    /// run. Returns the ranges and the x position after the last run.
    pub fn individual_character_ranges(&self, start_x: f32) -> (Vec<CharacterRange>, f32) {
        let mut ranges = Vec::with_capacity(self.num_characters as usize);
        let mut current_x = start_x;
        if self.is_rtl() {
            for run in self.runs.iter().rev() {
                current_x -= run.width;
                add_run_ranges(run, current_x, &mut ranges);
            }
        } else {
            for run in &self.runs {
                add_run_ranges(run, current_x, &mut ranges);
                current_x += run.width;
            }
        }
        (ranges, current_x)
    }

    /// Span between the carets at `from` and `to`, with the primary
    /// font's ascent and descent.
    pub fn character_range(&self, text: &[u16], from: u32, to: u32) -> CharacterRange {
        self.ensure_graphemes(text);
        let from_x = self.position_for_offset(from, AdjustMidCluster::ToStart);
        let to_x = self.position_for_offset(to, AdjustMidCluster::ToEnd);
        let metrics = self.primary_font.vertical_metrics();
        CharacterRange::new(
            from_x.min(to_x),
            from_x.max(to_x),
            metrics.ascent,
            metrics.descent,
        )
    }
}

fn add_run_ranges(run: &RunInfo, offset: f32, ranges: &mut Vec<CharacterRange>) {
    let mut widths = vec![0.0f32; run.num_characters as usize];
    for glyph in &run.glyphs {
        if let Some(width) = widths.get_mut(glyph.character_index() as usize) {
            *width += glyph.advance;
        }
    }

    let mut offset = offset;
    let sign = if run.is_rtl() {
        offset += run.width;
        -1.0
    } else {
        1.0
    };
    for width in widths {
        let start = offset;
        offset += width * sign;
        ranges.push(CharacterRange::new(start.min(offset), start.max(offset), 0.0, 0.0));
    }
}
