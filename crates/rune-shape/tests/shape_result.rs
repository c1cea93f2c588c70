use std::sync::Arc;

use rune_shape::shaping::{GlyphId, MAX_CHARACTER_INDEX, MAX_GLYPHS_PER_RUN};
use rune_shape::{
    AdjustMidCluster, BreakGlyphsOption, CanvasRotation, Direction, FontData, RawGlyphBuffer,
    Rect, RunInfo, Script, ScaledFontMetrics, ShapeResult, TabSize, TextDirection,
};

const SPACE: GlyphId = 3;

/// Every glyph occupies a fixed cell; ink is the cell inset by 1px.
#[derive(Debug)]
struct FixedFont {
    advance: f32,
}

impl FontData for FixedFont {
    fn bounds_for_glyph(&self, glyph: GlyphId) -> Rect {
        if glyph == SPACE {
            return Rect::default();
        }
        Rect::new(1.0, -8.0, self.advance - 2.0, 10.0)
    }

    fn space_glyph(&self) -> GlyphId {
        SPACE
    }

    fn space_width(&self) -> f32 {
        self.advance
    }

    fn vertical_metrics(&self) -> ScaledFontMetrics {
        ScaledFontMetrics {
            ascent: 8.0,
            descent: 2.0,
            line_gap: 0.0,
            font_size: self.advance,
        }
    }
}

fn fixed_font(advance: f32) -> Arc<dyn FontData> {
    Arc::new(FixedFont { advance })
}

fn utf16(text: &str) -> Vec<u16> {
    text.encode_utf16().collect()
}

/// Shape `[start, start + len)` as one glyph per character and insert it,
/// offering the remainder again whenever a run stops short.
fn push_run(result: &mut ShapeResult, direction: Direction, start: u32, len: u32, advance: f32) {
    let end = start + len;
    let mut buffer = RawGlyphBuffer::new(direction);
    let clusters: Vec<u32> = if direction.is_forward() {
        (start..end).collect()
    } else {
        (start..end).rev().collect()
    };
    for cluster in clusters {
        buffer.push_horizontal(1, cluster, advance, false);
    }
    let mut start_glyph = 0;
    while start_glyph < buffer.len() {
        let infos = buffer.infos();
        let (run_start, run_end) = if direction.is_forward() {
            (infos[start_glyph].cluster, end)
        } else if start_glyph == 0 {
            (start, end)
        } else {
            (start, infos[start_glyph - 1].cluster)
        };
        let run = RunInfo::new(
            result.primary_font().clone(),
            direction,
            CanvasRotation::Regular,
            Script::COMMON,
            run_start,
            run_end - run_start,
        );
        start_glyph += result.insert_run(run, start_glyph, buffer.len() - start_glyph, &buffer);
    }
}

fn single_run(direction: TextDirection, len: u32) -> ShapeResult {
    let mut result = ShapeResult::new(fixed_font(10.0), len, direction);
    push_run(&mut result, direction.into(), 0, len, 10.0);
    result
}

/// "hello " shaped LTR followed by a 4 character RTL run.
fn bidi_result() -> ShapeResult {
    let mut result = ShapeResult::new(fixed_font(10.0), 10, TextDirection::Ltr);
    push_run(&mut result, Direction::LeftToRight, 0, 6, 10.0);
    push_run(&mut result, Direction::RightToLeft, 6, 4, 10.0);
    result
}

#[test]
fn ltr_ascii_word() {
    let text = utf16("AB CDEF");
    let result = single_run(TextDirection::Ltr, text.len() as u32);
    assert_eq!(result.runs().len(), 1);
    assert_eq!(result.width(), 70.0);
    assert_eq!(result.position_for_offset(3, AdjustMidCluster::ToStart), 30.0);
    assert_eq!(result.offset_for_position(35.0, BreakGlyphsOption::DontBreakGlyphs), 3);
}

#[test]
fn rtl_hebrew_word() {
    let text = utf16("אבגדה");
    assert_eq!(text.len(), 5);
    let result = single_run(TextDirection::Rtl, 5);
    assert_eq!(result.position_for_offset(0, AdjustMidCluster::ToStart), 50.0);
    assert_eq!(result.position_for_offset(5, AdjustMidCluster::ToStart), 0.0);
    assert_eq!(
        result.caret_offset_for_hit_test(15.0, &text, BreakGlyphsOption::DontBreakGlyphs),
        4
    );
}

#[test]
fn bidi_split() {
    let result = bidi_result();
    assert_eq!(result.num_characters(), 10);
    assert_eq!(result.start_index(), 0);
    assert_eq!(result.width(), 100.0);
    assert_eq!(result.position_for_offset(6, AdjustMidCluster::ToStart), 60.0);
    assert_eq!(result.position_for_offset(10, AdjustMidCluster::ToStart), 100.0);
    // Carets inside the RTL run move leftwards as the offset grows.
    let rtl_carets: Vec<f32> = (7..10)
        .map(|offset| result.position_for_offset(offset, AdjustMidCluster::ToStart))
        .collect();
    assert_eq!(rtl_carets, vec![90.0, 80.0, 70.0]);
    let starts: Vec<u32> = result.runs().iter().map(RunInfo::start_index).collect();
    assert_eq!(starts, vec![0, 6]);
}

#[test]
fn sub_range_across_runs() {
    let result = bidi_result();
    let sub = result.sub_range(4, 8);
    assert_eq!(sub.num_characters(), 4);
    assert_eq!(sub.direction(), result.direction());
    assert_eq!(sub.width(), 40.0);
    let starts: Vec<u32> = sub.runs().iter().map(RunInfo::start_index).collect();
    assert_eq!(starts, vec![4, 6]);
    assert!(sub.runs()[1].is_rtl());
}

#[test]
fn grapheme_cluster_interpolation() {
    let text = utf16("👨\u{200D}👩\u{200D}👧");
    assert_eq!(text.len(), 8);
    let mut result = ShapeResult::new(fixed_font(20.0), 8, TextDirection::Ltr);
    let mut buffer = RawGlyphBuffer::new(Direction::LeftToRight);
    buffer.push_horizontal(1, 0, 20.0, false);
    let run = RunInfo::new(
        result.primary_font().clone(),
        Direction::LeftToRight,
        CanvasRotation::Regular,
        Script::COMMON,
        0,
        8,
    );
    result.insert_run(run, 0, 1, &buffer);

    assert_eq!(result.caret_position_for_offset(4, &text, AdjustMidCluster::ToStart), 0.0);
    assert_eq!(result.caret_position_for_offset(4, &text, AdjustMidCluster::ToEnd), 20.0);
    assert_eq!(result.caret_position_for_offset(8, &text, AdjustMidCluster::ToStart), 20.0);
}

#[test]
fn ligature_positions_split_by_grapheme() {
    // "ffi" as one glyph: each letter gets a third of the advance.
    let text = utf16("ffi");
    let mut result = ShapeResult::new(fixed_font(30.0), 3, TextDirection::Ltr);
    let mut buffer = RawGlyphBuffer::new(Direction::LeftToRight);
    buffer.push_horizontal(1, 0, 30.0, false);
    let run = RunInfo::new(
        result.primary_font().clone(),
        Direction::LeftToRight,
        CanvasRotation::Regular,
        Script::LATIN,
        0,
        3,
    );
    result.insert_run(run, 0, 1, &buffer);

    assert_eq!(result.caret_position_for_offset(1, &text, AdjustMidCluster::ToStart), 10.0);
    assert_eq!(result.caret_position_for_offset(2, &text, AdjustMidCluster::ToStart), 20.0);
    assert_eq!(result.offset_for_position(25.0, BreakGlyphsOption::BreakGlyphs), 2);
    assert_eq!(result.offset_for_position(25.0, BreakGlyphsOption::DontBreakGlyphs), 0);
}

#[test]
fn tab_factory() {
    let font = fixed_font(8.0);
    let first = font.tab_width(TabSize::Spaces(4.0), Some(13.0));
    let rest = font.tab_width(TabSize::Spaces(4.0), None);
    let result = ShapeResult::create_for_tabulation_characters(
        font,
        TextDirection::Ltr,
        TabSize::Spaces(4.0),
        13.0,
        0,
        3,
    );
    let glyphs: Vec<_> = result.runs().iter().flat_map(|run| run.glyphs()).collect();
    assert_eq!(glyphs.len(), 3);
    assert_eq!(glyphs[0].advance, first);
    assert!(glyphs[1..].iter().all(|glyph| glyph.advance == rest));
    assert!(glyphs.iter().all(|glyph| glyph.safe_to_break_before()));
    assert!(glyphs.iter().all(|glyph| glyph.glyph == SPACE));
    assert_eq!(result.width(), first + 2.0 * rest);
}

#[test]
fn boundary_positions() {
    for direction in [TextDirection::Ltr, TextDirection::Rtl] {
        let result = single_run(direction, 5);
        let n = result.num_characters();
        let (before, after) = if direction.is_ltr() { (0, n) } else { (n, 0) };
        assert_eq!(result.offset_for_position(-1.0, BreakGlyphsOption::DontBreakGlyphs), before);
        assert_eq!(
            result.offset_for_position(result.width() + 1.0, BreakGlyphsOption::DontBreakGlyphs),
            after
        );
        let end = if direction.is_ltr() { result.width() } else { 0.0 };
        assert_eq!(result.position_for_offset(n, AdjustMidCluster::ToStart), end);
        assert_eq!(result.position_for_offset(n + 3, AdjustMidCluster::ToStart), end);
        assert_eq!(result.cached_position_for_offset(n + 3), end);
    }
}

#[test]
fn empty_result() {
    let result = ShapeResult::new(fixed_font(10.0), 0, TextDirection::Ltr);
    assert_eq!(result.width(), 0.0);
    assert_eq!(result.offset_for_position(12.0, BreakGlyphsOption::DontBreakGlyphs), 0);
    assert_eq!(result.position_for_offset(0, AdjustMidCluster::ToStart), 0.0);
    result.check_consistency();
}

#[test]
fn offsets_round_trip() {
    for direction in [TextDirection::Ltr, TextDirection::Rtl] {
        let result = single_run(direction, 7);
        for offset in 0..=result.num_characters() {
            let x = result.position_for_offset(offset, AdjustMidCluster::ToStart);
            let back = result.offset_for_position(x, BreakGlyphsOption::DontBreakGlyphs);
            assert!(back.abs_diff(offset) <= 1, "{direction}: {offset} -> {x} -> {back}");
        }
    }
}

#[test]
fn cached_positions_are_monotonic() {
    for result in [
        single_run(TextDirection::Ltr, 6),
        single_run(TextDirection::Rtl, 6),
        bidi_result(),
    ] {
        let data = result.ensure_position_data();
        assert_eq!(data.entries().len() as u32, result.num_characters());
        for pair in data.entries().windows(2) {
            assert!(pair[0].x_position <= pair[1].x_position);
        }
    }
}

#[test]
fn width_and_character_accounting() {
    for result in [single_run(TextDirection::Ltr, 9), bidi_result()] {
        let run_width: f32 = result.runs().iter().map(RunInfo::width).sum();
        assert_eq!(result.width(), run_width);
        let characters: u32 = result.runs().iter().map(RunInfo::num_characters).sum();
        assert_eq!(result.num_characters(), characters);
        let glyphs: usize = result.runs().iter().map(RunInfo::num_glyphs).sum();
        assert_eq!(result.num_glyphs() as usize, glyphs);
    }
}

#[test]
fn sub_range_additivity() {
    let result = bidi_result();
    let whole = result.sub_range(1, 9).width();
    for split in 2..9 {
        let left = result.sub_range(1, split).width();
        let right = result.sub_range(split, 9).width();
        assert_eq!(left + right, whole, "split at {split}");
    }
}

#[test]
fn safe_break_endpoints() {
    for result in [single_run(TextDirection::Ltr, 4), single_run(TextDirection::Rtl, 4)] {
        assert_eq!(result.next_safe_to_break_offset(result.start_index()), result.start_index());
        assert_eq!(result.previous_safe_to_break_offset(result.end_index()), result.end_index());
    }
}

#[test]
fn mutable_unique_keeps_unshared_instance() {
    let result = Arc::new(single_run(TextDirection::Ltr, 3));
    let pointer = Arc::as_ptr(&result);
    let unique = ShapeResult::mutable_unique(result);
    assert_eq!(Arc::as_ptr(&unique), pointer);
}

#[test]
fn overflowing_cluster_span_splits_without_loss() {
    let len = MAX_CHARACTER_INDEX + 10;
    let result = single_run(TextDirection::Ltr, len);
    assert!(result.runs().len() > 1);
    assert!(result.runs().iter().all(|run| run.num_glyphs() <= MAX_GLYPHS_PER_RUN));
    assert_eq!(result.num_glyphs(), len);
    assert_eq!(result.width(), len as f32 * 10.0);
    let characters: u32 = result.runs().iter().map(RunInfo::num_characters).sum();
    assert_eq!(characters, len);
    result.check_consistency();
}
