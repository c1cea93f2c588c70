use super::{AdjustMidCluster, BreakGlyphsOption, ShapeResult};

/// Cached x position of one character, in visual order.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CharacterPosition {
    pub x_position: f32,
    /// First visual character of its cluster.
    pub is_cluster_base: bool,
    pub safe_to_break_before: bool,
}

/// Per-character positions of a result, for O(log n) offset lookups.
///
/// Entries are indexed by visual offset, so `x_position` never
/// decreases along the table regardless of direction.
#[derive(Debug, Clone, Default)]
pub struct CharacterPositionData {
    data: Vec<CharacterPosition>,
    start_offset: u32,
    width: f32,
}

impl CharacterPositionData {
    pub(crate) fn compute(result: &ShapeResult) -> Self {
        let rtl = result.is_rtl();
        let num_characters = result.num_characters;
        let start_offset = result.start_index;
        let mut data = vec![CharacterPosition::default(); num_characters as usize];
        let mut next_character_index = 0u32;
        let mut run_advance = 0.0f32;
        let mut last_x_position = 0.0f32;
        let mut last_run_rtl = rtl;

        for run in &result.runs {
            let run_rtl = run.is_rtl();
            let Some(run_start) = run.start_index.checked_sub(start_offset) else {
                run_advance += run.width;
                continue;
            };
            let run_end = (run_start + run.num_characters).min(num_characters);
            // Visual slot of the run's leftmost character.
            let visual_start = if rtl {
                num_characters.saturating_sub(run_end)
            } else {
                run_start
            };
            last_run_rtl = run_rtl;

            let mut total_advance = run_advance;
            for glyph in &run.glyphs {
                let logical = run_start + glyph.character_index();
                if logical >= run_end {
                    total_advance += glyph.advance;
                    continue;
                }
                let character_index = if run_rtl {
                    visual_start + (run_end - logical - 1)
                } else {
                    visual_start + (logical - run_start)
                };

                // Only the first glyph of a cluster sets the entry.
                if next_character_index <= character_index {
                    // Characters without glyphs take the position of the
                    // nearest logically preceding glyph.
                    let fill = if run_rtl { total_advance } else { last_x_position };
                    for entry in &mut data[next_character_index as usize..character_index as usize] {
                        *entry = CharacterPosition {
                            x_position: fill,
                            ..Default::default()
                        };
                    }
                    data[character_index as usize] = CharacterPosition {
                        x_position: total_advance,
                        is_cluster_base: true,
                        safe_to_break_before: glyph.safe_to_break_before(),
                    };
                    last_x_position = total_advance;
                }

                total_advance += glyph.advance;
                next_character_index = character_index + 1;
            }
            run_advance += run.width;
        }

        if next_character_index < num_characters {
            let fill = if last_run_rtl { run_advance } else { last_x_position };
            for entry in &mut data[next_character_index as usize..] {
                *entry = CharacterPosition {
                    x_position: fill,
                    ..Default::default()
                };
            }
        }

        Self {
            data,
            start_offset,
            width: result.width,
        }
    }

    pub fn entries(&self) -> &[CharacterPosition] {
        &self.data
    }

    pub fn start_offset(&self) -> u32 {
        self.start_offset
    }

    pub fn width(&self) -> f32 {
        self.width
    }

    pub fn byte_size(&self) -> usize {
        std::mem::size_of::<Self>()
            + self.data.capacity() * std::mem::size_of::<CharacterPosition>()
    }

    /// Offset of the character under `x`. At or before the start this is
    /// the first character, at or past the end the offset after the last.
    pub fn offset_for_position(&self, x: f32, rtl: bool) -> u32 {
        let len = self.data.len() as u32;
        if x <= 0.0 {
            return if rtl { len } else { 0 };
        }
        if x >= self.width {
            return if rtl { 0 } else { len };
        }

        // Largest entry whose position is at or before `x`.
        let after = self.data.partition_point(|entry| entry.x_position <= x);
        let Some(visual) = after.checked_sub(1) else {
            return 0;
        };
        let visual = visual as u32;
        if !rtl {
            return visual;
        }
        // The border belongs to the logically next character.
        if self.data[visual as usize].x_position == x {
            len - visual
        } else {
            len - visual - 1
        }
    }

    pub fn position_for_offset(&self, offset: u32, rtl: bool) -> f32 {
        let len = self.data.len();
        let offset = offset as usize;
        if !rtl {
            return self.data.get(offset).map_or(self.width, |e| e.x_position);
        }
        if offset >= len {
            return 0.0;
        }
        // In RTL the position is the right edge of the character, which is
        // the left edge of the next visual cluster.
        let base = (len - offset - 1..len).find(|&visual| self.data[visual].is_cluster_base);
        match base {
            Some(visual) if visual + 1 < len => self.data[visual + 1].x_position,
            _ => self.width,
        }
    }

    /// `offset` is absolute.
    pub fn next_safe_to_break_offset(&self, offset: u32) -> u32 {
        debug_assert!(offset >= self.start_offset);
        let adjusted = offset.saturating_sub(self.start_offset) as usize;
        let len = self.data.len();
        // The start is always a break: the text was already split there.
        if adjusted == 0 {
            return self.start_offset;
        }
        let next = (adjusted..len)
            .find(|&i| self.data[i].safe_to_break_before)
            .unwrap_or(len);
        self.start_offset + next as u32
    }

    /// `offset` is absolute.
    pub fn previous_safe_to_break_offset(&self, offset: u32) -> u32 {
        debug_assert!(offset >= self.start_offset);
        let adjusted = offset.saturating_sub(self.start_offset) as usize;
        let len = self.data.len();
        if adjusted >= len {
            return self.start_offset + len as u32;
        }
        let previous = (0..=adjusted)
            .rev()
            .find(|&i| self.data[i].safe_to_break_before)
            .unwrap_or(0);
        self.start_offset + previous as u32
    }
}

impl ShapeResult {
    /// Build the position cache if needed.
    pub fn ensure_position_data(&self) -> &CharacterPositionData {
        self.position_data
            .get_or_init(|| CharacterPositionData::compute(self))
    }

    pub fn position_data(&self) -> Option<&CharacterPositionData> {
        self.position_data.get()
    }

    /// Whether some run goes against the result direction. The cache
    /// is then still monotonic, but its entries are visual, so logical
    /// queries go through the runs instead.
    fn has_mixed_directions(&self) -> bool {
        self.runs.iter().any(|run| run.is_rtl() != self.is_rtl())
    }

    /// [`ShapeResult::offset_for_position`] answered from the cache.
    pub fn cached_offset_for_position(&self, x: f32) -> u32 {
        if self.has_mixed_directions() {
            return self.offset_for_position(x, BreakGlyphsOption::DontBreakGlyphs);
        }
        self.ensure_position_data()
            .offset_for_position(x, self.is_rtl())
    }

    /// Offsets past the end clamp to the trailing edge.
    pub fn cached_position_for_offset(&self, offset: u32) -> f32 {
        let offset = offset.min(self.num_characters);
        if self.has_mixed_directions() {
            return self.position_for_offset(offset, AdjustMidCluster::ToStart);
        }
        self.ensure_position_data()
            .position_for_offset(offset, self.is_rtl())
    }

    pub fn cached_next_safe_to_break_offset(&self, offset: u32) -> u32 {
        if self.is_rtl() || self.has_mixed_directions() {
            return self.next_safe_to_break_offset(offset);
        }
        self.ensure_position_data().next_safe_to_break_offset(offset)
    }

    pub fn cached_previous_safe_to_break_offset(&self, offset: u32) -> u32 {
        if self.is_rtl() || self.has_mixed_directions() {
            return self.previous_safe_to_break_offset(offset);
        }
        self.ensure_position_data()
            .previous_safe_to_break_offset(offset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shaping::test_font::{self, insert, simple};
    use crate::shaping::{Direction, TextDirection};

    #[test]
    fn ltr_cache_matches_queries() {
        let result = simple(TextDirection::Ltr, 5);
        let data = result.ensure_position_data();
        let xs: Vec<f32> = data.entries().iter().map(|e| e.x_position).collect();
        assert_eq!(xs, vec![0.0, 10.0, 20.0, 30.0, 40.0]);
        assert_eq!(result.cached_offset_for_position(25.0), 2);
        assert_eq!(result.cached_offset_for_position(-3.0), 0);
        assert_eq!(result.cached_offset_for_position(60.0), 5);
        assert_eq!(result.cached_position_for_offset(3), 30.0);
        assert_eq!(result.cached_position_for_offset(5), 50.0);
    }

    #[test]
    fn rtl_cache_uses_right_edges() {
        let result = simple(TextDirection::Rtl, 4);
        assert_eq!(result.cached_position_for_offset(0), 40.0);
        assert_eq!(result.cached_position_for_offset(1), 30.0);
        assert_eq!(result.cached_position_for_offset(4), 0.0);
        assert_eq!(result.cached_offset_for_position(15.0), 2);
        // On a border the logically next character wins.
        assert_eq!(result.cached_offset_for_position(10.0), 3);
    }

    #[test]
    fn characters_without_glyphs_share_positions() {
        // Characters 1 and 2 are part of the glyph at 0.
        let mut result = ShapeResult::new(test_font::font(), 4, TextDirection::Ltr);
        insert(&mut result, Direction::LeftToRight, 0, 4, &[0, 3]);
        let data = result.ensure_position_data();
        let entries = data.entries();
        assert_eq!(entries[1].x_position, 0.0);
        assert!(!entries[1].is_cluster_base);
        assert!(entries[3].is_cluster_base);
        assert_eq!(entries[3].x_position, 10.0);
        for pair in entries.windows(2) {
            assert!(pair[0].x_position <= pair[1].x_position);
        }
    }

    #[test]
    fn mixed_direction_cache_is_visual() {
        let mut result = ShapeResult::new(test_font::font(), 5, TextDirection::Ltr);
        insert(&mut result, Direction::LeftToRight, 0, 2, &[0, 1]);
        insert(&mut result, Direction::RightToLeft, 2, 3, &[4, 3, 2]);
        let xs: Vec<f32> = result
            .ensure_position_data()
            .entries()
            .iter()
            .map(|e| e.x_position)
            .collect();
        assert_eq!(xs, vec![0.0, 10.0, 20.0, 30.0, 40.0]);

        // Logical queries answer like the uncached ones.
        for offset in 0..=5 {
            assert_eq!(
                result.cached_position_for_offset(offset),
                result.position_for_offset(offset, AdjustMidCluster::ToStart)
            );
        }
        assert_eq!(result.cached_position_for_offset(3), 40.0);
        assert_eq!(
            result.cached_offset_for_position(25.0),
            result.offset_for_position(25.0, BreakGlyphsOption::DontBreakGlyphs)
        );
    }

    #[test]
    fn cached_position_clamps_offsets() {
        assert_eq!(simple(TextDirection::Ltr, 3).cached_position_for_offset(9), 30.0);
        assert_eq!(simple(TextDirection::Rtl, 3).cached_position_for_offset(9), 0.0);
    }

    #[test]
    fn cached_safe_breaks() {
        let mut result = ShapeResult::new(test_font::font(), 4, TextDirection::Ltr);
        result.insert_run_for_testing(0, 4, TextDirection::Ltr, &[0, 2]);
        assert_eq!(result.cached_next_safe_to_break_offset(0), 0);
        assert_eq!(result.cached_next_safe_to_break_offset(1), 2);
        assert_eq!(result.cached_next_safe_to_break_offset(3), 4);
        assert_eq!(result.cached_previous_safe_to_break_offset(3), 2);
        assert_eq!(result.cached_previous_safe_to_break_offset(4), 4);
    }

    #[test]
    fn cache_is_dropped_on_insert() {
        let mut result = ShapeResult::new(test_font::font(), 2, TextDirection::Ltr);
        insert(&mut result, Direction::LeftToRight, 0, 1, &[0]);
        result.ensure_position_data();
        assert!(result.position_data().is_some());
        insert(&mut result, Direction::LeftToRight, 1, 1, &[1]);
        assert!(result.position_data().is_none());
    }
}
