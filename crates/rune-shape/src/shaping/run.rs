use std::sync::Arc;

use once_cell::sync::OnceCell;
use tracing::debug;

use crate::font::FontData;
use crate::unicode::grapheme_ordinals;

use super::raw::RawGlyphInfo;
use super::{
    AdjustMidCluster, BreakGlyphsOption, CanvasRotation, Direction, GlyphData, GlyphIndexResult,
    Script, MAX_CHARACTER_INDEX, MAX_GLYPHS_PER_RUN,
};

/// A shaped segment with one font, script, direction and rotation.
///
/// Glyphs are stored in visual order, so for backward runs the
/// character indices decrease along `glyphs`.
#[derive(Debug, Clone)]
pub struct RunInfo {
    pub(crate) font: Arc<dyn FontData>,
    pub(crate) direction: Direction,
    pub(crate) canvas_rotation: CanvasRotation,
    pub(crate) script: Script,
    pub(crate) start_index: u32,
    pub(crate) num_characters: u32,
    pub(crate) width: f32,
    pub(crate) glyphs: Vec<GlyphData>,
    /// Grapheme ordinal of every character in the run, computed on demand.
    graphemes: OnceCell<Vec<u32>>,
}

impl RunInfo {
    pub fn new(
        font: Arc<dyn FontData>,
        direction: Direction,
        canvas_rotation: CanvasRotation,
        script: Script,
        start_index: u32,
        num_characters: u32,
    ) -> Self {
        Self {
            font,
            direction,
            canvas_rotation,
            script,
            start_index,
            num_characters,
            width: 0.0,
            glyphs: Vec::new(),
            graphemes: OnceCell::new(),
        }
    }

    pub fn font(&self) -> &Arc<dyn FontData> {
        &self.font
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn canvas_rotation(&self) -> CanvasRotation {
        self.canvas_rotation
    }

    pub fn script(&self) -> Script {
        self.script
    }

    pub fn start_index(&self) -> u32 {
        self.start_index
    }

    pub fn num_characters(&self) -> u32 {
        self.num_characters
    }

    pub fn num_glyphs(&self) -> usize {
        self.glyphs.len()
    }

    pub fn width(&self) -> f32 {
        self.width
    }

    pub fn glyphs(&self) -> &[GlyphData] {
        &self.glyphs
    }

    #[inline]
    pub fn is_rtl(&self) -> bool {
        !self.direction.is_forward()
    }

    #[inline]
    pub fn is_horizontal(&self) -> bool {
        self.direction.is_horizontal()
    }

    /// Absolute character index of the glyph at `glyph_index`.
    pub fn glyph_to_character_index(&self, glyph_index: usize) -> u32 {
        self.start_index + self.glyphs[glyph_index].character_index()
    }

    pub fn has_graphemes(&self) -> bool {
        self.graphemes.get().is_some()
    }

    /// Compute the grapheme map from the run's UTF-16 text.
    pub fn ensure_graphemes(&self, text: &[u16]) {
        debug_assert_eq!(text.len(), self.num_characters as usize);
        self.graphemes.get_or_init(|| {
            tracing::trace!(
                start = self.start_index,
                len = text.len(),
                "computing run graphemes"
            );
            grapheme_ordinals(text)
        });
    }

    /// Approximate memory footprint in bytes.
    pub fn byte_size(&self) -> usize {
        std::mem::size_of::<Self>()
            + self.glyphs.capacity() * std::mem::size_of::<GlyphData>()
            + self
                .graphemes
                .get()
                .map_or(0, |g| g.capacity() * std::mem::size_of::<u32>())
    }

    /// Smallest safe break offset at or after `offset`, relative to the
    /// run. The run end is always a break opportunity.
    pub fn next_safe_to_break_offset(&self, offset: u32) -> u32 {
        debug_assert!(offset <= self.num_characters);
        let is_candidate =
            |g: &&GlyphData| g.safe_to_break_before() && g.character_index() >= offset;
        let found = if self.is_rtl() {
            self.glyphs.iter().rev().find(is_candidate)
        } else {
            self.glyphs.iter().find(is_candidate)
        };
        found.map_or(self.num_characters, GlyphData::character_index)
    }

    /// Largest safe break offset at or before `offset`, relative to the run.
    pub fn previous_safe_to_break_offset(&self, offset: u32) -> u32 {
        if offset >= self.num_characters {
            return self.num_characters;
        }
        let is_candidate =
            |g: &&GlyphData| g.safe_to_break_before() && g.character_index() <= offset;
        let found = if self.is_rtl() {
            self.glyphs.iter().find(is_candidate)
        } else {
            self.glyphs.iter().rev().find(is_candidate)
        };
        found.map_or(0, GlyphData::character_index)
    }

    /// Number of grapheme clusters in `[start, end)`; 0 when graphemes
    /// were never computed.
    pub fn num_graphemes(&self, start: u32, end: u32) -> u32 {
        let Some(graphemes) = self.graphemes.get() else {
            return 0;
        };
        if start >= self.num_characters || graphemes.len() != self.num_characters as usize {
            return 0;
        }
        debug_assert!(start < end && end <= self.num_characters);
        let end = end.min(self.num_characters);
        graphemes[end as usize - 1] - graphemes[start as usize] + 1
    }

    /// Like [`RunInfo::x_position_for_offset`] but `offset` counts
    /// characters in visual order.
    pub fn x_position_for_visual_offset(&self, offset: u32, adjust: AdjustMidCluster) -> f32 {
        debug_assert!(offset < self.num_characters);
        let offset = if self.is_rtl() {
            self.num_characters - offset - 1
        } else {
            offset
        };
        self.x_position_for_offset(offset, adjust)
    }

    /// Distance from the run's left edge to the leading edge of the
    /// character at `offset`.
    ///
    /// When several graphemes share one glyph sequence, the sequence
    /// advance is split evenly between them.
    pub fn x_position_for_offset(&self, offset: u32, adjust: AdjustMidCluster) -> f32 {
        debug_assert!(offset <= self.num_characters);
        let rtl = self.is_rtl();

        // A glyph sequence is a maximal group of glyphs sharing one
        // character index; it covers [sequence_start, sequence_end).
        let mut sequence_start = 0;
        let mut sequence_end = self.num_characters;
        let mut sequence_advance = 0.0f32;
        let mut accumulated = 0.0f32;

        if !rtl {
            for glyph in &self.glyphs {
                let index = glyph.character_index();
                if sequence_start == index {
                    sequence_advance += glyph.advance;
                    continue;
                }
                if sequence_start <= offset && offset < index {
                    sequence_end = index;
                    break;
                }
                sequence_start = index;
                sequence_end = self.num_characters;
                accumulated += sequence_advance;
                sequence_advance = glyph.advance;
            }
        } else {
            sequence_start = self.num_characters;
            for glyph in &self.glyphs {
                let index = glyph.character_index();
                if sequence_start == index {
                    sequence_advance += glyph.advance;
                    continue;
                }
                if sequence_start <= offset && offset < sequence_end {
                    break;
                }
                sequence_end = sequence_start;
                sequence_start = index;
                accumulated += sequence_advance;
                sequence_advance = glyph.advance;
            }
        }

        let mut pos = offset.saturating_sub(sequence_start);

        let graphemes = if sequence_end > sequence_start {
            self.num_graphemes(sequence_start, sequence_end)
        } else {
            0
        };
        if graphemes > 1 {
            let size = sequence_end - sequence_start;
            let place = graphemes * pos / size;
            pos -= place;
            sequence_advance /= graphemes as f32;
            if rtl {
                accumulated += sequence_advance * (graphemes - place - 1) as f32;
            } else {
                accumulated += sequence_advance * place as f32;
            }
        }

        if adjust == AdjustMidCluster::ToEnd && pos != 0 {
            if rtl {
                accumulated -= sequence_advance;
            } else {
                accumulated += sequence_advance;
            }
        }

        if rtl {
            // Leading edge of an RTL character is its right side.
            accumulated += sequence_advance;
        }
        accumulated
    }

    /// Characters under `target_x`, which must lie in `[0, width]`.
    ///
    /// With [`BreakGlyphsOption::BreakGlyphs`] a sequence spanning several
    /// graphemes is cut into equal strips and only the strip under
    /// `target_x` is reported.
    pub fn character_index_for_x_position(
        &self,
        target_x: f32,
        break_glyphs: BreakGlyphsOption,
    ) -> GlyphIndexResult {
        debug_assert!(target_x >= 0.0 && target_x <= self.width);
        let rtl = self.is_rtl();
        let mut result = GlyphIndexResult::default();
        let mut sequence_start = 0;
        let mut sequence_end = self.num_characters;
        if rtl {
            sequence_start = self.num_characters;
        }

        for glyph in &self.glyphs {
            let index = glyph.character_index();
            if sequence_start == index {
                result.advance += glyph.advance;
                continue;
            }
            if result.origin_x + result.advance > target_x {
                if !rtl {
                    sequence_end = index;
                }
                break;
            }
            if rtl {
                sequence_end = sequence_start;
            }
            sequence_start = index;
            result.origin_x += result.advance;
            result.advance = glyph.advance;
        }

        if break_glyphs == BreakGlyphsOption::BreakGlyphs && sequence_end > sequence_start {
            let graphemes = self.num_graphemes(sequence_start, sequence_end);
            if graphemes > 1 {
                let unit = result.advance / graphemes as f32;
                let step = (((target_x - result.origin_x) / unit).floor().max(0.0) as u32)
                    .min(graphemes - 1);
                let final_size = (sequence_end - sequence_start) / graphemes;
                result.origin_x += unit * step as f32;
                if rtl {
                    sequence_end -= step;
                    sequence_start = sequence_end.saturating_sub(final_size);
                } else {
                    sequence_start += step;
                    sequence_end = sequence_start + final_size;
                }
                result.advance = unit;
            }
        }

        if rtl {
            result.left_character_index = sequence_end;
            result.right_character_index = sequence_start;
        } else {
            result.left_character_index = sequence_start;
            result.right_character_index = sequence_end;
        }
        result
    }

    /// Shrink `num_glyphs` so the glyphs from `start_glyph` fit in one run:
    /// character indices must fit in 16 bits and the glyph count must not
    /// exceed [`MAX_GLYPHS_PER_RUN`]. Cuts are made at cluster boundaries
    /// where possible.
    ///
    /// Updates the run's character range to the glyphs kept and returns
    /// the absolute cluster that character index 0 maps to.
    pub(crate) fn limit_num_glyphs(
        &mut self,
        start_glyph: usize,
        num_glyphs: &mut usize,
        is_ltr: bool,
        infos: &[RawGlyphInfo],
    ) -> u32 {
        let mut count = *num_glyphs;
        debug_assert!(count > 0);
        let chunk = &infos[start_glyph..start_glyph + count];
        let run_end = self.start_index + self.num_characters;
        let mut start_cluster = self.start_index;

        if is_ltr {
            let max_cluster = start_cluster + MAX_CHARACTER_INDEX;
            if chunk[count - 1].cluster > max_cluster {
                count = chunk
                    .partition_point(|info| info.cluster <= max_cluster)
                    .max(1);
                self.num_characters = chunk[count].cluster - start_cluster;
                debug!(
                    start_cluster,
                    kept = count,
                    "splitting run: character index exceeds 16 bits"
                );
            }
        } else {
            let last_cluster = chunk[0].cluster;
            if last_cluster > start_cluster + MAX_CHARACTER_INDEX {
                let min_cluster = last_cluster - MAX_CHARACTER_INDEX;
                count = chunk
                    .partition_point(|info| info.cluster >= min_cluster)
                    .max(1);
                start_cluster = chunk[count - 1].cluster;
                debug!(
                    start_cluster,
                    kept = count,
                    "splitting rtl run: character index exceeds 16 bits"
                );
            }
        }

        if count > MAX_GLYPHS_PER_RUN {
            count = MAX_GLYPHS_PER_RUN;
            let end_cluster = chunk[count].cluster;
            while count > 0 && chunk[count - 1].cluster == end_cluster {
                count -= 1;
            }
            if count == 0 {
                // One cluster larger than the cap; cut inside it.
                count = MAX_GLYPHS_PER_RUN;
            }
            if is_ltr {
                self.num_characters = end_cluster - start_cluster;
            } else {
                start_cluster = chunk[count - 1].cluster;
            }
            debug!(
                start_cluster,
                kept = count,
                "splitting run: too many glyphs"
            );
        }

        if !is_ltr {
            self.start_index = start_cluster;
            self.num_characters = run_end - start_cluster;
        }
        *num_glyphs = count;
        start_cluster
    }

    /// Copy of the characters `[start, end)` of this run (run-relative),
    /// keeping the glyphs whose cluster falls in the range.
    pub fn create_sub_run(&self, start: u32, end: u32) -> RunInfo {
        debug_assert!(end > start);
        let num_characters = (end - start).min(self.num_characters);
        let mut run = RunInfo::new(
            self.font.clone(),
            self.direction,
            self.canvas_rotation,
            self.script,
            self.start_index + start,
            num_characters,
        );

        let mut width = 0.0;
        run.glyphs.extend(
            self.glyphs
                .iter()
                .filter(|g| (start..end).contains(&g.character_index()))
                .map(|g| {
                    let mut copy = *g;
                    copy.set_character_index(g.character_index() - start);
                    width += copy.advance;
                    copy
                }),
        );
        run.width = width;

        if let Some(graphemes) = self.graphemes.get() {
            let range = start as usize..(start + num_characters) as usize;
            if let Some(slice) = graphemes.get(range) {
                let base = slice.first().copied().unwrap_or(0);
                let _ = run.graphemes.set(slice.iter().map(|g| g - base).collect());
            }
        }
        run
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Offset;
    use crate::shaping::test_font;

    fn run(direction: Direction, num_characters: u32, clusters: &[u32]) -> RunInfo {
        let mut run = RunInfo::new(
            test_font::font(),
            direction,
            CanvasRotation::Regular,
            Script::COMMON,
            0,
            num_characters,
        );
        let mut previous = None;
        for &cluster in clusters {
            let safe = previous != Some(cluster);
            run.glyphs
                .push(GlyphData::new(1, cluster, 10.0, Offset::zero(), safe));
            run.width += 10.0;
            previous = Some(cluster);
        }
        run
    }

    fn utf16(text: &str) -> Vec<u16> {
        text.encode_utf16().collect()
    }

    #[test]
    fn ltr_positions() {
        let run = run(Direction::LeftToRight, 3, &[0, 1, 2]);
        assert_eq!(run.x_position_for_offset(0, AdjustMidCluster::ToStart), 0.0);
        assert_eq!(run.x_position_for_offset(2, AdjustMidCluster::ToStart), 20.0);
        assert_eq!(run.x_position_for_visual_offset(1, AdjustMidCluster::ToStart), 10.0);
    }

    #[test]
    fn rtl_positions_are_right_edges() {
        let run = run(Direction::RightToLeft, 3, &[2, 1, 0]);
        assert_eq!(run.x_position_for_offset(0, AdjustMidCluster::ToStart), 30.0);
        assert_eq!(run.x_position_for_offset(2, AdjustMidCluster::ToStart), 10.0);
        // Visual offset 0 is the leftmost character, logical 2.
        assert_eq!(run.x_position_for_visual_offset(0, AdjustMidCluster::ToStart), 10.0);
    }

    #[test]
    fn ligature_is_split_by_graphemes() {
        // "abcd" shaped into a single glyph.
        let mut run = run(Direction::LeftToRight, 4, &[0]);
        run.glyphs[0].advance = 40.0;
        run.width = 40.0;

        // Without graphemes the glyph is one unit.
        assert_eq!(run.x_position_for_offset(2, AdjustMidCluster::ToStart), 0.0);
        assert_eq!(run.x_position_for_offset(2, AdjustMidCluster::ToEnd), 40.0);

        run.ensure_graphemes(&utf16("abcd"));
        assert_eq!(run.num_graphemes(0, 4), 4);
        assert_eq!(run.x_position_for_offset(2, AdjustMidCluster::ToStart), 20.0);

        let hit = run.character_index_for_x_position(25.0, BreakGlyphsOption::BreakGlyphs);
        assert_eq!((hit.left_character_index, hit.right_character_index), (2, 3));
        assert_eq!(hit.origin_x, 20.0);
        assert_eq!(hit.advance, 10.0);

        let whole = run.character_index_for_x_position(25.0, BreakGlyphsOption::DontBreakGlyphs);
        assert_eq!((whole.left_character_index, whole.right_character_index), (0, 4));
    }

    #[test]
    fn rtl_hit_test_reports_reversed_interval() {
        let run = run(Direction::RightToLeft, 5, &[4, 3, 2, 1, 0]);
        let hit = run.character_index_for_x_position(15.0, BreakGlyphsOption::DontBreakGlyphs);
        assert_eq!((hit.left_character_index, hit.right_character_index), (4, 3));
        assert_eq!(hit.origin_x, 10.0);
    }

    #[test]
    fn safe_to_break_scans() {
        let mut run = run(Direction::LeftToRight, 4, &[0, 1, 1, 3]);
        run.glyphs[3].set_safe_to_break_before(false);
        assert_eq!(run.next_safe_to_break_offset(0), 0);
        assert_eq!(run.next_safe_to_break_offset(2), 4);
        assert_eq!(run.previous_safe_to_break_offset(3), 1);
        assert_eq!(run.previous_safe_to_break_offset(4), 4);

        let rtl = self::run(Direction::RightToLeft, 3, &[2, 1, 0]);
        assert_eq!(rtl.next_safe_to_break_offset(1), 1);
        assert_eq!(rtl.previous_safe_to_break_offset(1), 1);
    }

    #[test]
    fn sub_run_rebases_indices() {
        let run = run(Direction::LeftToRight, 4, &[0, 1, 2, 3]);
        let sub = run.create_sub_run(1, 3);
        assert_eq!(sub.start_index(), 1);
        assert_eq!(sub.num_characters(), 2);
        assert_eq!(sub.width(), 20.0);
        let indices: Vec<u32> = sub.glyphs().iter().map(GlyphData::character_index).collect();
        assert_eq!(indices, vec![0, 1]);
    }

    fn infos(clusters: &[u32]) -> Vec<RawGlyphInfo> {
        clusters
            .iter()
            .map(|&cluster| RawGlyphInfo {
                glyph_id: 1,
                cluster,
                flags: 0,
            })
            .collect()
    }

    #[test]
    fn limit_splits_on_character_index_overflow() {
        let clusters = infos(&[0, 40_000, 70_000, 70_001]);
        let mut ltr = run(Direction::LeftToRight, 70_002, &[]);
        let mut count = 4;
        let start = ltr.limit_num_glyphs(0, &mut count, true, &clusters);
        assert_eq!((start, count), (0, 2));
        assert_eq!(ltr.num_characters(), 70_000);

        let reversed = infos(&[70_001, 70_000, 40_000, 0]);
        let mut rtl = run(Direction::RightToLeft, 70_002, &[]);
        let mut count = 4;
        let start = rtl.limit_num_glyphs(0, &mut count, false, &reversed);
        assert_eq!((start, count), (40_000, 3));
        assert_eq!(rtl.start_index(), 40_000);
        assert_eq!(rtl.num_characters(), 30_002);
    }
}
