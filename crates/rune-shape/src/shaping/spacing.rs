//! Letter spacing, word spacing and justification applied to shaped
//! results after shaping.

use super::{ShapeResult, TextDirection};

const SPACE: u32 = 0x0020;
const NO_BREAK_SPACE: u32 = 0x00A0;

/// Source of extra advance for each cluster of a result.
pub trait Spacing {
    /// Extra advance after the character at `index`.
    ///
    /// `offset` may be set to shift the glyph itself forward. It is only
    /// used when justification opens space before a character.
    fn compute_spacing(&mut self, index: u32, offset: &mut f32) -> f32;
}

fn treat_as_space(c: u32) -> bool {
    matches!(c, 0x0020 | 0x0009 | 0x000A | NO_BREAK_SPACE)
}

fn treat_as_zero_width_space(c: u32) -> bool {
    c < 0x0020
        || (0x007F..0x00A0).contains(&c)
        || c == 0x00AD
        || (0x200B..=0x200F).contains(&c)
        || (0x202A..=0x202E).contains(&c)
        || c == 0xFEFF
        || c == 0xFFFC
}

/// Ideographs, kana and fullwidth forms: justification opportunities on
/// both sides.
fn is_cjk_ideograph_or_symbol(c: u32) -> bool {
    matches!(c,
        0x2E80..=0x2FDF
        | 0x3001..=0x303F
        | 0x3040..=0x30FF
        | 0x31F0..=0x31FF
        | 0x3400..=0x4DBF
        | 0x4E00..=0x9FFF
        | 0xF900..=0xFAFF
        | 0xFF01..=0xFF60
        | 0x20000..=0x2FFFF
        | 0x30000..=0x3134F)
}

/// Decode the code point starting at `index`, or `None` past the end.
fn code_point_at(text: &[u16], index: usize) -> Option<u32> {
    let tail = text.get(index..)?;
    char::decode_utf16(tail.iter().copied())
        .next()
        .map(|decoded| decoded.map_or_else(|err| err.unpaired_surrogate() as u32, u32::from))
}

/// [`Spacing`] computed from the UTF-16 text a result was shaped from.
///
/// Indexes passed to [`Spacing::compute_spacing`] are offsets into
/// `text`. Justification is consumed as it is handed out, so a value is
/// meant for one [`ShapeResult::apply_spacing`] pass.
#[derive(Debug, Clone)]
pub struct TextSpacing<'a> {
    text: &'a [u16],
    letter_spacing: f32,
    word_spacing: f32,
    expansion: f32,
    expansion_per_opportunity: f32,
    expansion_opportunity_count: u32,
    is_after_expansion: bool,
}

impl<'a> TextSpacing<'a> {
    pub fn new(text: &'a [u16]) -> Self {
        Self {
            text,
            letter_spacing: 0.0,
            word_spacing: 0.0,
            expansion: 0.0,
            expansion_per_opportunity: 0.0,
            expansion_opportunity_count: 0,
            is_after_expansion: false,
        }
    }

    pub fn with_letter_spacing(mut self, letter_spacing: f32) -> Self {
        self.letter_spacing = letter_spacing;
        self
    }

    pub fn with_word_spacing(mut self, word_spacing: f32) -> Self {
        self.word_spacing = word_spacing;
        self
    }

    /// Distribute `expansion` pixels over the justification
    /// opportunities of the text.
    ///
    /// `allows_leading` and `allows_trailing` control whether an
    /// opportunity may open before the first or after the last
    /// character.
    pub fn set_expansion(
        &mut self,
        expansion: f32,
        direction: TextDirection,
        allows_leading: bool,
        allows_trailing: bool,
    ) {
        self.expansion = expansion;
        self.is_after_expansion = !allows_leading;
        let (mut count, is_after_expansion) =
            self.count_expansion_opportunities(direction, self.is_after_expansion);
        if is_after_expansion && !allows_trailing {
            count = count.saturating_sub(1);
        } else if !is_after_expansion && allows_trailing {
            count += 1;
        }
        self.expansion_opportunity_count = count;
        self.expansion_per_opportunity = if count > 0 {
            expansion / count as f32
        } else {
            0.0
        };
    }

    pub fn has_spacing(&self) -> bool {
        self.letter_spacing != 0.0 || self.word_spacing != 0.0 || self.has_expansion()
    }

    pub fn has_expansion(&self) -> bool {
        self.expansion_opportunity_count > 0
    }

    pub fn expansion_opportunity_count(&self) -> u32 {
        self.expansion_opportunity_count
    }

    fn count_expansion_opportunities(
        &self,
        direction: TextDirection,
        mut is_after_expansion: bool,
    ) -> (u32, bool) {
        let mut count = 0;
        let mut visit = |c: u32| {
            if treat_as_space(c) {
                count += 1;
                is_after_expansion = true;
            } else if is_cjk_ideograph_or_symbol(c) {
                if !is_after_expansion {
                    count += 1;
                }
                count += 1;
                is_after_expansion = true;
            } else {
                is_after_expansion = false;
            }
        };
        let chars = char::decode_utf16(self.text.iter().copied())
            .map(|decoded| decoded.map_or_else(|err| err.unpaired_surrogate() as u32, u32::from));
        if direction.is_ltr() {
            chars.for_each(&mut visit);
        } else {
            chars.collect::<Vec<_>>().into_iter().rev().for_each(&mut visit);
        }
        (count, is_after_expansion)
    }

    fn next_expansion(&mut self) -> f32 {
        if self.expansion_opportunity_count == 0 {
            return 0.0;
        }
        self.is_after_expansion = true;
        self.expansion_opportunity_count -= 1;
        // The last opportunity takes whatever is left over from rounding.
        if self.expansion_opportunity_count == 0 {
            return std::mem::take(&mut self.expansion);
        }
        self.expansion -= self.expansion_per_opportunity;
        self.expansion_per_opportunity
    }
}

impl Spacing for TextSpacing<'_> {
    fn compute_spacing(&mut self, index: u32, offset: &mut f32) -> f32 {
        let Some(mut character) = code_point_at(self.text, index as usize) else {
            return 0.0;
        };
        let is_space = treat_as_space(character);
        if is_space && character != NO_BREAK_SPACE {
            character = SPACE;
        }

        let mut spacing = 0.0;
        if self.letter_spacing != 0.0 && !treat_as_zero_width_space(character) {
            spacing += self.letter_spacing;
        }
        if is_space && (index != 0 || character == NO_BREAK_SPACE) {
            spacing += self.word_spacing;
        }

        if !self.has_expansion() {
            return spacing;
        }
        if is_space {
            return spacing + self.next_expansion();
        }
        if !is_cjk_ideograph_or_symbol(character) {
            self.is_after_expansion = false;
            return spacing;
        }

        // Ideographs open space on both sides; the space before one is
        // carried as an offset of its glyph.
        if !self.is_after_expansion {
            let expand_before = self.next_expansion();
            if expand_before != 0.0 {
                *offset = expand_before;
                spacing += expand_before;
            }
            if !self.has_expansion() {
                return spacing;
            }
        }
        spacing + self.next_expansion()
    }
}

impl ShapeResult {
    /// Add `spacing` after the last glyph of every cluster.
    ///
    /// Indexes handed to `spacing` are the absolute character indexes of
    /// the clusters. For a shared result clone first, e.g. through
    /// [`ShapeResult::mutable_unique`] or [`ShapeResult::apply_spacing_to_copy`].
    pub fn apply_spacing(&mut self, spacing: &mut impl Spacing) {
        let mut offset = 0.0f32;
        let mut total_space = 0.0f32;
        let mut space = 0.0f32;
        let mut has_vertical_offsets = false;

        for run in &mut self.runs {
            let run_start = run.start_index;
            let is_horizontal = run.is_horizontal();
            let mut total_space_for_run = 0.0f32;
            let num_glyphs = run.glyphs.len();
            for i in 0..num_glyphs {
                // Only the last glyph of a cluster gets spacing.
                let character_index = run.glyphs[i].character_index();
                if i + 1 < num_glyphs && character_index == run.glyphs[i + 1].character_index() {
                    continue;
                }

                space = spacing.compute_spacing(run_start + character_index, &mut offset);
                let glyph = &mut run.glyphs[i];
                glyph.advance += space;
                total_space_for_run += space;

                if offset != 0.0 {
                    if is_horizontal {
                        glyph.offset.x += offset;
                    } else {
                        glyph.offset.y += offset;
                        has_vertical_offsets = true;
                    }
                    offset = 0.0;
                }
            }
            run.width += total_space_for_run;
            total_space += total_space_for_run;
        }
        self.width += total_space;
        self.has_vertical_offsets |= has_vertical_offsets;
        self.invalidate_position_data();

        // Space after the last glyph is not ink.
        if space != 0.0 {
            total_space -= space;
            if space < 0.0 {
                total_space += 1.0;
            }
        }

        let bounding_box_width = self.glyph_bounding_box.width + total_space;
        if self.width >= 0.0 && bounding_box_width >= 0.0 {
            self.glyph_bounding_box.width = bounding_box_width;
        } else {
            // Negative spacing can pull glyphs past the left edge. The
            // right edge is left alone, which over-covers but never clips.
            let left = self.width.min(bounding_box_width);
            if left < self.glyph_bounding_box.x {
                self.glyph_bounding_box.shift_x_edge_to(left);
            } else {
                self.glyph_bounding_box.width = bounding_box_width;
            }
        }
        self.check_consistency();
    }

    pub fn apply_spacing_to_copy(&self, spacing: &mut impl Spacing) -> ShapeResult {
        let mut copy = self.clone();
        copy.apply_spacing(spacing);
        copy
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::shaping::test_font::simple;

    fn utf16(text: &str) -> Vec<u16> {
        text.encode_utf16().collect()
    }

    #[test]
    fn letter_spacing_widens_every_cluster() {
        let text = utf16("abcd");
        let mut result = simple(TextDirection::Ltr, 4);
        result.apply_spacing(&mut TextSpacing::new(&text).with_letter_spacing(2.0));
        assert_eq!(result.width(), 48.0);
        assert_eq!(result.runs()[0].width(), 48.0);
        assert!(result.runs()[0].glyphs().iter().all(|g| g.advance == 12.0));
        // Trailing spacing is not ink.
        assert_eq!(result.glyph_bounding_box().max_x(), 45.0);
        assert_eq!(result.position_for_offset(2, Default::default()), 24.0);
    }

    #[test]
    fn letter_spacing_skips_zero_width_space() {
        let text = utf16("a\u{200B}b");
        let mut result = simple(TextDirection::Ltr, 3);
        result.apply_spacing(&mut TextSpacing::new(&text).with_letter_spacing(1.0));
        assert_eq!(result.width(), 32.0);
    }

    #[test]
    fn word_spacing_on_spaces() {
        let text = utf16(" a b");
        let mut result = simple(TextDirection::Ltr, 4);
        result.apply_spacing(&mut TextSpacing::new(&text).with_word_spacing(5.0));
        // The leading space gets none.
        assert_eq!(result.width(), 45.0);

        let text = utf16("\u{00A0}a");
        let mut result = simple(TextDirection::Ltr, 2);
        result.apply_spacing(&mut TextSpacing::new(&text).with_word_spacing(5.0));
        assert_eq!(result.width(), 25.0);
    }

    #[test]
    fn expansion_goes_to_spaces() {
        let text = utf16("a b c");
        let mut spacing = TextSpacing::new(&text);
        spacing.set_expansion(10.0, TextDirection::Ltr, false, false);
        assert_eq!(spacing.expansion_opportunity_count(), 2);
        let mut result = simple(TextDirection::Ltr, 5);
        result.apply_spacing(&mut spacing);
        assert_eq!(result.width(), 60.0);
        let advances: Vec<f32> = result.runs()[0].glyphs().iter().map(|g| g.advance).collect();
        assert_eq!(advances, vec![10.0, 15.0, 10.0, 15.0, 10.0]);
        assert!(!spacing.has_expansion());
    }

    #[test]
    fn ideograph_expansion_is_carried_as_offset() {
        let text = utf16("a\u{4E2D}");
        let mut spacing = TextSpacing::new(&text);
        spacing.set_expansion(10.0, TextDirection::Ltr, false, false);
        assert_eq!(spacing.expansion_opportunity_count(), 1);
        let mut result = simple(TextDirection::Ltr, 2);
        result.apply_spacing(&mut spacing);
        let glyph = result.runs()[0].glyphs()[1];
        assert_eq!(glyph.advance, 20.0);
        assert_eq!(glyph.offset.x, 10.0);
        assert_eq!(result.width(), 30.0);
    }

    #[test]
    fn negative_spacing_moves_left_edge() {
        let text = utf16("ab");
        let mut result = simple(TextDirection::Ltr, 2);
        let right = result.glyph_bounding_box().max_x();
        result.apply_spacing(&mut TextSpacing::new(&text).with_letter_spacing(-15.0));
        assert_eq!(result.width(), -10.0);
        assert_eq!(result.glyph_bounding_box().x, -10.0);
        assert_eq!(result.glyph_bounding_box().max_x(), right);
    }

    #[test]
    fn copy_leaves_source_untouched() {
        let text = utf16("abc");
        let result = simple(TextDirection::Ltr, 3);
        let spaced = result.apply_spacing_to_copy(&mut TextSpacing::new(&text).with_letter_spacing(1.0));
        assert_eq!(result.width(), 30.0);
        assert_eq!(spaced.width(), 33.0);
    }

    #[test]
    fn shared_results_are_copied_before_spacing() {
        let text = utf16("abc");
        let shared = Arc::new(simple(TextDirection::Ltr, 3));
        let other = Arc::clone(&shared);
        let mut unique = ShapeResult::mutable_unique(shared);
        Arc::make_mut(&mut unique).apply_spacing(&mut TextSpacing::new(&text).with_letter_spacing(1.0));
        assert_eq!(unique.width(), 33.0);
        assert_eq!(other.width(), 30.0);
    }
}
