use tracing::trace;

use crate::font::FontData;
use crate::geometry::Rect;

use super::bounds::GlyphBoundsAccumulator;
use super::{GlyphData, ShapeRange, ShapeResult};

/// Ink bounds of a glyph, from the per-glyph cache when present. Only
/// the primary axis is accurate; the cross axis gets a token height so
/// the rectangle is not empty.
fn glyph_bounds(font: &dyn FontData, glyph: &GlyphData) -> Rect {
    if glyph.has_valid_glyph_bounds() {
        Rect::new(
            glyph.glyph_bounds_logical_x(),
            0.0,
            glyph.glyph_bounds_logical_width(),
            0.1,
        )
    } else {
        font.bounds_for_glyph(glyph.glyph)
    }
}

impl ShapeResult {
    /// New result for the absolute character range `[start, end)`.
    pub fn sub_range(&self, start: u32, end: u32) -> ShapeResult {
        let mut sub_range = ShapeResult::new(self.primary_font.clone(), 0, self.direction);
        self.copy_range(start, end, &mut sub_range);
        sub_range
    }

    /// Append the runs overlapping `[start, end)` to `target`.
    ///
    /// A non-empty target gets the copied characters renumbered to
    /// continue from its end.
    pub fn copy_range(&self, start: u32, end: u32, target: &mut ShapeResult) {
        self.copy_range_internal(0, start, end, target);
    }

    /// Copy several disjoint ranges, given in logical order, each into
    /// its own target.
    pub fn copy_ranges(&self, ranges: &mut [ShapeRange<'_>]) {
        debug_assert!(!ranges.is_empty());
        if self.runs.is_empty() {
            return;
        }
        trace!(ranges = ranges.len(), rtl = self.is_rtl(), "copying ranges");
        debug_assert!(ranges.windows(2).all(|pair| pair[0].end <= pair[1].start));

        // RTL runs are visual, so walk the ranges backwards to keep a
        // single forward pass over the runs.
        let mut run_index = 0;
        if self.is_rtl() {
            for range in ranges.iter_mut().rev() {
                debug_assert!(range.end >= range.start);
                run_index =
                    self.copy_range_internal(run_index, range.start, range.end, range.target);
            }
        } else {
            for range in ranges.iter_mut() {
                debug_assert!(range.end >= range.start);
                run_index =
                    self.copy_range_internal(run_index, range.start, range.end, range.target);
            }
        }
    }

    fn copy_range_internal(
        &self,
        run_index: usize,
        start_offset: u32,
        end_offset: u32,
        target: &mut ShapeResult,
    ) -> usize {
        let target_num_characters_before = target.num_characters;
        let index_diff: i64 = if target.num_characters == 0 {
            0
        } else {
            target.end_index() as i64 - start_offset.max(self.start_index) as i64
        };
        let target_run_size_before = target.runs.len();
        let mut total_width = 0.0f32;

        let mut run_index = run_index;
        while let Some(run) = self.runs.get(run_index) {
            let run_start = run.start_index;
            let run_end = run_start + run.num_characters;

            if start_offset < run_end && end_offset > run_start {
                let start = start_offset.saturating_sub(run_start);
                let end = end_offset.min(run_end) - run_start;
                debug_assert!(end > start);

                let mut sub_run = run.create_sub_run(start, end);
                sub_run.start_index = (sub_run.start_index as i64 + index_diff) as u32;
                total_width += sub_run.width;
                target.num_characters += sub_run.num_characters;
                target.num_glyphs += sub_run.glyphs.len() as u32;
                target.runs.push(sub_run);

                // Later runs are past the range.
                if (self.is_ltr() && end_offset <= run_end)
                    || (self.is_rtl() && start_offset >= run_start)
                {
                    break;
                }
            }
            run_index += 1;
        }
        target.invalidate_position_data();

        if target.num_glyphs == 0 {
            target.update_start_index();
            return run_index;
        }

        debug_assert_eq!(self.is_rtl(), target.is_rtl());
        if self.is_rtl() && target.runs.len() != target_run_size_before {
            target.reorder_rtl_runs(target_run_size_before);
        }

        // Only the logical left and right edges are recomputed; top and
        // bottom come from the source box, which contains any sub-range.
        let mut know_left_edge = start_offset <= self.start_index;
        let mut know_right_edge = end_offset >= self.end_index();
        if self.is_rtl() {
            std::mem::swap(&mut know_left_edge, &mut know_right_edge);
        }
        let left = if know_left_edge {
            target.width + self.glyph_bounding_box.x
        } else {
            target.line_left_bounds()
        };
        target.width += total_width;
        let right = if know_right_edge {
            self.glyph_bounding_box.max_x() - self.width + target.width
        } else {
            target.line_right_bounds()
        };
        let adjusted_box = Rect::new(
            left,
            self.glyph_bounding_box.y,
            (right - left).max(0.0),
            self.glyph_bounding_box.height,
        );
        target.glyph_bounding_box.unite_if_non_zero(&adjusted_box);

        target.has_vertical_offsets |= self.has_vertical_offsets;
        target.update_start_index();

        debug_assert_eq!(
            (target.num_characters - target_num_characters_before) as i64,
            (end_offset.min(self.end_index()) as i64 - start_offset.max(self.start_index) as i64)
                .max(0)
        );
        target.check_consistency();
        run_index
    }

    /// Left ink edge of the leftmost cluster.
    pub fn line_left_bounds(&self) -> f32 {
        let Some(run) = self.runs.first() else {
            return 0.0;
        };
        let Some(first) = run.glyphs.first() else {
            return 0.0;
        };
        let is_horizontal = run.is_horizontal();
        let character_index = first.character_index();
        let mut bounds = GlyphBoundsAccumulator::new(0.0);
        for glyph in run
            .glyphs
            .iter()
            .take_while(|g| g.character_index() == character_index)
        {
            bounds.unite(is_horizontal, glyph, glyph_bounds(run.font.as_ref(), glyph));
            bounds.origin += glyph.advance;
        }
        if !is_horizontal {
            bounds.convert_vertical_run_to_logical(&run.font.vertical_metrics());
        }
        bounds.bounds.x
    }

    /// Right ink edge of the rightmost cluster.
    ///
    /// When that cluster has no ink (a trailing space, say) the advance
    /// edge is returned instead. This assumes the preceding character
    /// does not overflow past it.
    pub fn line_right_bounds(&self) -> f32 {
        let Some(run) = self.runs.last() else {
            return 0.0;
        };
        let Some(last) = run.glyphs.last() else {
            return 0.0;
        };
        let is_horizontal = run.is_horizontal();
        let character_index = last.character_index();
        let mut bounds = GlyphBoundsAccumulator::new(self.width);
        for glyph in run
            .glyphs
            .iter()
            .rev()
            .take_while(|g| g.character_index() == character_index)
        {
            bounds.origin -= glyph.advance;
            bounds.unite(is_horizontal, glyph, glyph_bounds(run.font.as_ref(), glyph));
        }
        // TODO: measure the previous cluster instead of trusting the
        // advance when the trailing cluster has no ink.
        if bounds.bounds.is_empty() {
            return self.width;
        }
        if !is_horizontal {
            bounds.convert_vertical_run_to_logical(&run.font.vertical_metrics());
        }
        bounds.bounds.max_x()
    }
}
