use core::fmt;
use std::sync::Arc;

use once_cell::sync::OnceCell;
use tracing::debug;

use crate::font::{FontData, TabSize};
use crate::geometry::{Offset, Rect};

use super::bounds::GlyphBoundsAccumulator;
use super::position_data::CharacterPositionData;
use super::raw::{fixed_to_float, RawGlyphBuffer};
use super::{
    CanvasRotation, Direction, GlyphData, GlyphId, RunInfo, Script, TextDirection,
    MAX_GLYPHS_PER_RUN,
};

/// A font used by a result together with the number of glyphs shaped
/// with it in one run.
#[derive(Debug, Clone)]
pub struct RunFontData {
    pub font: Arc<dyn FontData>,
    pub glyph_count: usize,
}

/// Shaped glyphs for a range of text.
///
/// Runs are kept in visual order. For LTR results run start indices
/// increase along `runs`; for RTL results they decrease. Character
/// indices are UTF-16 code units of the source text.
///
/// A result is treated as immutable once shaping finishes; share it
/// behind an `Arc` and go through [`ShapeResult::mutable_unique`] or
/// `Arc::make_mut` before mutating a shared instance.
#[derive(Debug, Clone)]
pub struct ShapeResult {
    pub(crate) width: f32,
    pub(crate) glyph_bounding_box: Rect,
    pub(crate) primary_font: Arc<dyn FontData>,
    pub(crate) runs: Vec<RunInfo>,
    pub(crate) start_index: u32,
    pub(crate) num_characters: u32,
    pub(crate) num_glyphs: u32,
    pub(crate) direction: TextDirection,
    pub(crate) has_vertical_offsets: bool,
    pub(crate) position_data: OnceCell<CharacterPositionData>,
}

pub(crate) fn same_font(a: &Arc<dyn FontData>, b: &Arc<dyn FontData>) -> bool {
    std::ptr::eq(Arc::as_ptr(a) as *const (), Arc::as_ptr(b) as *const ())
}

impl ShapeResult {
    pub fn new(
        primary_font: Arc<dyn FontData>,
        num_characters: u32,
        direction: TextDirection,
    ) -> Self {
        Self {
            width: 0.0,
            glyph_bounding_box: Rect::default(),
            primary_font,
            runs: Vec::new(),
            start_index: 0,
            num_characters,
            num_glyphs: 0,
            direction,
            has_vertical_offsets: false,
            position_data: OnceCell::new(),
        }
    }

    /// Return `this` when it is the only reference, a deep copy otherwise.
    pub fn mutable_unique(mut this: Arc<Self>) -> Arc<Self> {
        if Arc::get_mut(&mut this).is_some() {
            return this;
        }
        Arc::new(ShapeResult::clone(&this))
    }

    pub fn width(&self) -> f32 {
        self.width
    }

    /// Logical ink bounds of all glyphs, relative to the line's left edge
    /// and the alphabetic baseline.
    pub fn glyph_bounding_box(&self) -> Rect {
        self.glyph_bounding_box
    }

    pub fn primary_font(&self) -> &Arc<dyn FontData> {
        &self.primary_font
    }

    pub fn runs(&self) -> &[RunInfo] {
        &self.runs
    }

    pub fn start_index(&self) -> u32 {
        self.start_index
    }

    pub fn end_index(&self) -> u32 {
        self.start_index + self.num_characters
    }

    pub fn num_characters(&self) -> u32 {
        self.num_characters
    }

    pub fn num_glyphs(&self) -> u32 {
        self.num_glyphs
    }

    pub fn direction(&self) -> TextDirection {
        self.direction
    }

    #[inline]
    pub fn is_ltr(&self) -> bool {
        self.direction.is_ltr()
    }

    #[inline]
    pub fn is_rtl(&self) -> bool {
        self.direction.is_rtl()
    }

    pub fn has_vertical_offsets(&self) -> bool {
        self.has_vertical_offsets
    }

    /// Take glyphs `[start_glyph, start_glyph + num_glyphs)` of `buffer`
    /// into `run` and insert it in visual order.
    ///
    /// Fewer glyphs than requested are consumed when they do not fit in
    /// one run; the caller shapes the remainder into a follow-on run.
    /// Returns the number of glyphs consumed.
    pub fn insert_run(
        &mut self,
        mut run: RunInfo,
        start_glyph: usize,
        num_glyphs: usize,
        buffer: &RawGlyphBuffer,
    ) -> usize {
        debug_assert!(num_glyphs > 0);
        debug_assert!(start_glyph + num_glyphs <= buffer.len());
        let mut consumed = num_glyphs;
        self.compute_glyph_positions(&mut run, start_glyph, &mut consumed, buffer);
        self.width += run.width;
        self.num_glyphs += run.glyphs.len() as u32;
        self.insert_run_into_order(run);
        self.invalidate_position_data();
        self.check_run_order();
        consumed
    }

    fn compute_glyph_positions(
        &mut self,
        run: &mut RunInfo,
        start_glyph: usize,
        num_glyphs: &mut usize,
        buffer: &RawGlyphBuffer,
    ) {
        let infos = buffer.infos();
        let positions = buffer.positions();
        let is_ltr = buffer.direction().is_forward();
        let start_cluster = run.limit_num_glyphs(start_glyph, num_glyphs, is_ltr, infos);
        let count = *num_glyphs;
        let infos = &infos[start_glyph..start_glyph + count];
        let positions = &positions[start_glyph..start_glyph + count];
        let is_horizontal = run.is_horizontal();

        // Ask for all bounds at once; some backends are much faster that way.
        // Ids that do not fit in 16 bits become .notdef.
        let glyph_ids: Vec<GlyphId> = infos
            .iter()
            .map(|info| GlyphId::try_from(info.glyph_id).unwrap_or(0))
            .collect();
        let mut glyph_bounds = Vec::with_capacity(count);
        run.font.bounds_for_glyphs(&glyph_ids, &mut glyph_bounds);

        // Shaper output is already in visual order; the run is placed at
        // the current end of the line.
        let mut bounds = GlyphBoundsAccumulator::new(self.width);
        let mut total_advance = 0.0f32;
        let mut has_vertical_offsets = !is_horizontal;
        run.glyphs.clear();
        run.glyphs.reserve_exact(count);

        for (i, (info, pos)) in infos.iter().zip(positions).enumerate() {
            let offset = Offset::new(fixed_to_float(pos.x_offset), -fixed_to_float(pos.y_offset));
            let advance = if is_horizontal {
                fixed_to_float(pos.x_advance)
            } else {
                -fixed_to_float(pos.y_advance)
            };
            // The unsafe flag covers every glyph of a cluster, so only
            // cluster starts need checking.
            let safe_to_break_before = i == 0
                || (info.cluster != infos[i - 1].cluster && !info.unsafe_to_break());
            let mut glyph = GlyphData::new(
                glyph_ids[i],
                info.cluster.saturating_sub(start_cluster),
                advance,
                offset,
                safe_to_break_before,
            );

            let ink = glyph_bounds.get(i).copied().unwrap_or_default();
            if is_horizontal {
                glyph.set_glyph_bounds(ink.x, ink.width);
            } else {
                glyph.set_glyph_bounds(ink.y, ink.height);
            }
            bounds.unite(is_horizontal, &glyph, ink);
            bounds.origin += advance;

            total_advance += advance;
            has_vertical_offsets |= offset.y != 0.0;
            run.glyphs.push(glyph);
        }

        run.width = total_advance.max(0.0);
        self.has_vertical_offsets |= has_vertical_offsets;
        if !is_horizontal {
            bounds.convert_vertical_run_to_logical(&run.font.vertical_metrics());
        }
        self.glyph_bounding_box.unite(&bounds.bounds);
    }

    /// Place `run` in visual order: LTR results put it before the first
    /// run starting after it, RTL results before the first run starting
    /// before it. Otherwise it is appended.
    pub(crate) fn insert_run_into_order(&mut self, run: RunInfo) {
        let position = if self.is_ltr() {
            self.runs.iter().position(|r| r.start_index > run.start_index)
        } else {
            self.runs.iter().position(|r| r.start_index < run.start_index)
        };
        match position {
            Some(index) => self.runs.insert(index, run),
            None => self.runs.push(run),
        }
        self.update_start_index();
    }

    /// Move runs appended after the first `run_size_before` runs to the
    /// front. RTL results append in logical order but store visual order.
    pub(crate) fn reorder_rtl_runs(&mut self, run_size_before: usize) {
        debug_assert!(self.is_rtl());
        debug_assert!(self.runs.len() > run_size_before);
        if run_size_before == 0 {
            return;
        }
        let appended = self.runs.len() - run_size_before;
        self.runs.rotate_right(appended);
    }

    pub(crate) fn compute_start_index(&self) -> u32 {
        let Some(first) = self.runs.first() else {
            return 0;
        };
        if self.is_ltr() {
            first.start_index
        } else {
            (first.start_index + first.num_characters).saturating_sub(self.num_characters)
        }
    }

    pub(crate) fn update_start_index(&mut self) {
        self.start_index = self.compute_start_index();
    }

    /// Invariants that hold while runs are still being inserted.
    fn check_run_order(&self) {
        if !cfg!(debug_assertions) {
            return;
        }
        debug_assert_eq!(self.start_index, self.compute_start_index());
        let glyphs: usize = self.runs.iter().map(RunInfo::num_glyphs).sum();
        debug_assert_eq!(glyphs, self.num_glyphs as usize);
        for pair in self.runs.windows(2) {
            if self.is_ltr() {
                debug_assert!(pair[0].start_index <= pair[1].start_index);
            } else {
                debug_assert!(pair[0].start_index >= pair[1].start_index);
            }
        }
    }

    /// Verify the result invariants. Compiled to nothing without
    /// `debug_assertions`.
    pub fn check_consistency(&self) {
        if !cfg!(debug_assertions) {
            return;
        }
        if self.runs.is_empty() {
            debug_assert_eq!(self.num_characters, 0);
            debug_assert_eq!(self.num_glyphs, 0);
            return;
        }
        self.check_run_order();

        let start_index = self.start_index;
        let mut index = start_index;
        let visual: Box<dyn Iterator<Item = &RunInfo>> = if self.is_ltr() {
            Box::new(self.runs.iter())
        } else {
            Box::new(self.runs.iter().rev())
        };
        for run in visual {
            // Characters may be missing, but runs never overlap.
            debug_assert!(run.start_index >= index);
            index = run.start_index + run.num_characters;
            if run.is_rtl() {
                debug_assert!(
                    run.glyphs.first().map(GlyphData::character_index)
                        >= run.glyphs.last().map(GlyphData::character_index)
                );
            }
        }
        debug_assert!(index <= self.end_index());

        let run_width: f32 = self.runs.iter().map(|r| r.width).sum();
        debug_assert!((run_width - self.width).abs() <= 0.01 * self.runs.len() as f32 + 0.01);
    }

    /// A result of `length` tab characters, each rendered as the space
    /// glyph. Only the first tab depends on `position`; the rest get the
    /// base tab width.
    pub fn create_for_tabulation_characters(
        font: Arc<dyn FontData>,
        direction: TextDirection,
        tab_size: TabSize,
        position: f32,
        start_index: u32,
        length: u32,
    ) -> ShapeResult {
        debug_assert!(length > 0);
        let mut result = ShapeResult::new(font.clone(), length, direction);
        result.num_glyphs = length;
        result.has_vertical_offsets = font.is_vertical_upright();

        // Tabs are laid out horizontally even on upright vertical lines.
        let run_direction = Direction::from(direction);
        let space_glyph = font.space_glyph();
        let mut advance = font.tab_width(tab_size, Some(position));
        let mut position = position;
        let mut remaining = length;
        let mut start = start_index;
        while remaining > 0 {
            let run_length = remaining.min(MAX_GLYPHS_PER_RUN as u32);
            let mut run = RunInfo::new(
                font.clone(),
                run_direction,
                CanvasRotation::Regular,
                Script::COMMON,
                start,
                run_length,
            );
            let start_position = position;
            run.glyphs.reserve_exact(run_length as usize);
            for i in 0..run_length {
                if i == 1 {
                    advance = font.tab_width(tab_size, None);
                }
                run.glyphs
                    .push(GlyphData::new(space_glyph, i, advance, Offset::zero(), true));
                position += advance;
            }
            if direction.is_rtl() {
                run.glyphs.reverse();
            }
            run.width = position - start_position;
            result.width += run.width;
            result.runs.push(run);
            remaining -= run_length;
            start += run_length;
        }
        if direction.is_rtl() {
            result.runs.reverse();
        }
        result.update_start_index();
        result
    }

    /// Insert a run of zero-advance glyphs, one per character, safe to
    /// break only before the listed run-relative offsets.
    pub fn insert_run_for_testing(
        &mut self,
        start_index: u32,
        num_characters: u32,
        direction: TextDirection,
        safe_break_offsets: &[u32],
    ) {
        let mut run = RunInfo::new(
            self.primary_font.clone(),
            direction.into(),
            CanvasRotation::Regular,
            Script::COMMON,
            start_index,
            num_characters,
        );
        run.glyphs = (0..num_characters)
            .map(|i| GlyphData::new(0, i, 0.0, Offset::zero(), false))
            .collect();
        for &offset in safe_break_offsets {
            if let Some(glyph) = run.glyphs.get_mut(offset as usize) {
                glyph.set_safe_to_break_before(true);
            }
        }
        if direction.is_rtl() {
            run.glyphs.reverse();
        }
        self.num_glyphs += run.glyphs.len() as u32;
        self.insert_run_into_order(run);
        self.invalidate_position_data();
    }

    /// Copy with every run shifted so the result starts at `start_index`.
    pub fn copy_adjusted_offset(&self, start_index: u32) -> ShapeResult {
        let mut result = self.clone();
        result.invalidate_position_data();
        let current = result.start_index;
        for run in &mut result.runs {
            if start_index >= current {
                run.start_index += start_index - current;
            } else {
                debug_assert!(run.start_index >= current - start_index);
                run.start_index -= current - start_index;
            }
        }
        result.update_start_index();
        result
    }

    /// Distinct fonts used by runs, other than the primary font.
    pub fn fallback_fonts(&self) -> Vec<Arc<dyn FontData>> {
        let mut fonts: Vec<Arc<dyn FontData>> = Vec::new();
        for run in &self.runs {
            if same_font(&run.font, &self.primary_font)
                || fonts.iter().any(|f| same_font(f, &run.font))
            {
                continue;
            }
            fonts.push(run.font.clone());
        }
        fonts
    }

    pub fn run_font_data(&self) -> Vec<RunFontData> {
        self.runs
            .iter()
            .map(|run| RunFontData {
                font: run.font.clone(),
                glyph_count: run.glyphs.len(),
            })
            .collect()
    }

    /// Approximate memory footprint in bytes.
    pub fn byte_size(&self) -> usize {
        std::mem::size_of::<Self>()
            + self.runs.iter().map(RunInfo::byte_size).sum::<usize>()
            + self
                .position_data
                .get()
                .map_or(0, CharacterPositionData::byte_size)
    }

    /// Compute the grapheme map of every run. `text` is the UTF-16 text
    /// of this result, `num_characters` code units long.
    pub fn ensure_graphemes(&self, text: &[u16]) {
        debug_assert_eq!(text.len(), self.num_characters as usize);
        let Some(first) = self.runs.first() else {
            return;
        };
        if first.has_graphemes() {
            debug_assert!(self.runs.iter().all(RunInfo::has_graphemes));
            return;
        }
        for run in &self.runs {
            let Some(start) = run.start_index.checked_sub(self.start_index) else {
                continue;
            };
            let start = start as usize;
            if let Some(slice) = text.get(start..start + run.num_characters as usize) {
                run.ensure_graphemes(slice);
            }
        }
    }

    pub(crate) fn invalidate_position_data(&mut self) {
        if self.position_data.take().is_some() {
            debug!("dropping character position cache");
        }
    }
}

impl fmt::Display for ShapeResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "#chars={}, #glyphs={}, dir={}, runs[{}]{{",
            self.num_characters,
            self.num_glyphs,
            self.direction,
            self.runs.len()
        )?;
        for (run_index, run) in self.runs.iter().enumerate() {
            write!(
                f,
                "{}:{{start={}, #chars={}, dir={}, glyphs[{}]{{",
                run_index,
                run.start_index,
                run.num_characters,
                run.direction,
                run.glyphs.len()
            )?;
            for (glyph_index, glyph) in run.glyphs.iter().enumerate() {
                write!(
                    f,
                    "{}:{{char={}, glyph={}}}",
                    glyph_index,
                    glyph.character_index(),
                    glyph.glyph
                )?;
            }
            f.write_str("}}")?;
        }
        f.write_str("}")
    }
}
