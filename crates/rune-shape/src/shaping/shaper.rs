use core::ops::Range;
use std::sync::Arc;

use harfrust::{
    Direction as HbDirection,
    FontRef as HbFontRef,
    Script as HbScript,
    ShaperData,
    ShaperInstance,
    Tag as HbTag,
    UnicodeBuffer as HbUnicodeBuffer,
};
use rune_config::ShapingConfig;
use tracing::{debug, warn};

use crate::font::{FontData, FontError, FontFace, Result, ScaledFont, TabSize};

use super::raw::{float_to_fixed, RawGlyphBuffer, RawGlyphInfo, RawGlyphPosition, UNSAFE_TO_BREAK};
use super::{CanvasRotation, Direction, RunInfo, Script, ShapeResult, TextDirection};

/// Shapes UTF-16 text with harfrust into [`ShapeResult`]s.
///
/// Direction and script are taken as given; callers split text into
/// bidi and script runs beforehand.
#[derive(Debug, Clone)]
pub struct TextShaper {
    font: Arc<ScaledFont>,
    script: Script,
    tab_size: TabSize,
}

impl TextShaper {
    pub fn new(font: Arc<ScaledFont>) -> Self {
        Self {
            font,
            script: Script::default(),
            tab_size: TabSize::default(),
        }
    }

    /// Build a shaper for the configured font file and size.
    pub fn from_config(config: &ShapingConfig) -> Result<Self> {
        let path = config.font.as_ref().ok_or(FontError::NotConfigured)?;
        let face = FontFace::from_path(path, config.font_index as usize)?;
        let mut shaper = Self::new(Arc::new(ScaledFont::new(Arc::new(face), config.font_size)));
        shaper.tab_size = TabSize::Spaces(config.tab_size);
        if let Some(tag) = config.script.as_deref() {
            match Script::from_tag(tag) {
                Some(script) => shaper.script = script,
                None => warn!(tag, "ignoring invalid script tag"),
            }
        }
        Ok(shaper)
    }

    pub fn with_script(mut self, script: Script) -> Self {
        self.script = script;
        self
    }

    pub fn with_tab_size(mut self, tab_size: TabSize) -> Self {
        self.tab_size = tab_size;
        self
    }

    pub fn font(&self) -> &Arc<ScaledFont> {
        &self.font
    }

    pub fn script(&self) -> Script {
        self.script
    }

    pub fn tab_size(&self) -> TabSize {
        self.tab_size
    }

    fn font_data(&self) -> Arc<dyn FontData> {
        self.font.clone()
    }

    /// Shape all of `text` in one direction with the default script.
    pub fn shape(&self, text: &[u16], direction: TextDirection) -> Result<ShapeResult> {
        let mut result = ShapeResult::new(self.font_data(), text.len() as u32, direction);
        if !text.is_empty() {
            self.shape_range(
                &mut result,
                text,
                0..text.len() as u32,
                direction.into(),
                self.script,
            )?;
        }
        result.check_consistency();
        Ok(result)
    }

    /// Shape `text[range]` and insert the glyphs into `result` as one or
    /// more runs. Clusters are absolute indexes into `text`.
    pub fn shape_range(
        &self,
        result: &mut ShapeResult,
        text: &[u16],
        range: Range<u32>,
        direction: Direction,
        script: Script,
    ) -> Result<()> {
        debug_assert!(range.end as usize <= text.len());
        if range.is_empty() {
            return Ok(());
        }

        let face = self.font.face();
        let font_ref =
            HbFontRef::from_index(face.data(), face.index()).map_err(|_| FontError::InvalidFont)?;
        let data = ShaperData::new(&font_ref);
        let instance =
            ShaperInstance::from_variations(&font_ref, core::iter::empty::<harfrust::Variation>());
        let shaper = data
            .shaper(&font_ref)
            .instance(Some(&instance))
            .point_size(None)
            .build();

        let mut buffer = HbUnicodeBuffer::new();
        let mut cluster = range.start;
        let units = &text[range.start as usize..range.end as usize];
        for decoded in char::decode_utf16(units.iter().copied()) {
            let ch = decoded.unwrap_or(char::REPLACEMENT_CHARACTER);
            buffer.add(ch, cluster);
            // Lone surrogates are one unit, like the replacement character.
            cluster += ch.len_utf16() as u32;
        }
        buffer.set_direction(hb_direction(direction));
        if let Some(hb_script) = HbScript::from_iso15924_tag(HbTag::new(script.tag())) {
            buffer.set_script(hb_script);
        }
        buffer.guess_segment_properties();

        let glyph_buffer = shaper.shape(buffer, &[]);
        let infos = glyph_buffer.glyph_infos();
        let positions = glyph_buffer.glyph_positions();

        // harfrust works in design units; runs take 16.16 pixels.
        let scale = self.font.scale();
        let mut raw = RawGlyphBuffer::with_capacity(direction, infos.len());
        for (info, pos) in infos.iter().zip(positions) {
            raw.push(
                RawGlyphInfo {
                    glyph_id: info.glyph_id,
                    cluster: info.cluster,
                    flags: if info.unsafe_to_break() { UNSAFE_TO_BREAK } else { 0 },
                },
                RawGlyphPosition {
                    x_advance: float_to_fixed(pos.x_advance as f32 * scale),
                    y_advance: float_to_fixed(pos.y_advance as f32 * scale),
                    x_offset: float_to_fixed(pos.x_offset as f32 * scale),
                    y_offset: float_to_fixed(pos.y_offset as f32 * scale),
                },
            );
        }
        debug!(
            characters = range.len(),
            glyphs = raw.len(),
            %direction,
            "shaped range"
        );

        let rotation = if direction.is_horizontal() || self.font.is_vertical_upright() {
            CanvasRotation::Regular
        } else {
            CanvasRotation::Rotated
        };
        insert_shaped_glyphs(result, self.font_data(), &raw, range, script, rotation);
        Ok(())
    }

    /// `length` tab characters at `position`, using the configured tab size.
    pub fn shape_tabs(
        &self,
        direction: TextDirection,
        position: f32,
        start_index: u32,
        length: u32,
    ) -> ShapeResult {
        ShapeResult::create_for_tabulation_characters(
            self.font_data(),
            direction,
            self.tab_size,
            position,
            start_index,
            length,
        )
    }
}

fn hb_direction(direction: Direction) -> HbDirection {
    match direction {
        Direction::LeftToRight => HbDirection::LeftToRight,
        Direction::RightToLeft => HbDirection::RightToLeft,
        Direction::TopToBottom => HbDirection::TopToBottom,
        Direction::BottomToTop => HbDirection::BottomToTop,
    }
}

/// Insert every glyph of `buffer`, which covers `range`, into `result`.
///
/// A run may not take all the glyphs offered; the remainder is offered
/// again as a new run until the buffer is drained.
pub(crate) fn insert_shaped_glyphs(
    result: &mut ShapeResult,
    font: Arc<dyn FontData>,
    buffer: &RawGlyphBuffer,
    range: Range<u32>,
    script: Script,
    rotation: CanvasRotation,
) {
    let direction = buffer.direction();
    let infos = buffer.infos();
    let mut start_glyph = 0;
    while start_glyph < buffer.len() {
        // Forward runs end at the range end, backward runs start at the
        // range start; the other edge follows the glyphs consumed so far.
        let (run_start, run_end) = if direction.is_forward() {
            (infos[start_glyph].cluster, range.end)
        } else if start_glyph == 0 {
            (range.start, range.end)
        } else {
            (range.start, infos[start_glyph - 1].cluster)
        };
        let run = RunInfo::new(
            font.clone(),
            direction,
            rotation,
            script,
            run_start,
            run_end - run_start,
        );
        let consumed = result.insert_run(run, start_glyph, buffer.len() - start_glyph, buffer);
        debug_assert!(consumed > 0);
        start_glyph += consumed.max(1);
    }
}
