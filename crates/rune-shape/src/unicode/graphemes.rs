use unicode_segmentation::UnicodeSegmentation;

/// UTF-16 text decoded to UTF-8 for segmentation, remembering where
/// each decoded character starts in code units.
struct DecodedUtf16 {
    text: String,
    /// `(byte_offset, utf16_offset)` for every decoded character.
    char_starts: Vec<(usize, usize)>,
}

impl DecodedUtf16 {
    fn new(units: &[u16]) -> Self {
        let mut text = String::with_capacity(units.len());
        let mut char_starts = Vec::with_capacity(units.len());
        let mut unit_offset = 0usize;
        for decoded in char::decode_utf16(units.iter().copied()) {
            // Unpaired surrogates become one replacement character each,
            // so every code unit still belongs to exactly one character.
            let (ch, len) = match decoded {
                Ok(ch) => (ch, ch.len_utf16()),
                Err(_) => (char::REPLACEMENT_CHARACTER, 1),
            };
            char_starts.push((text.len(), unit_offset));
            text.push(ch);
            unit_offset += len;
        }
        Self { text, char_starts }
    }

    fn utf16_offset(&self, byte_offset: usize) -> usize {
        match self
            .char_starts
            .binary_search_by_key(&byte_offset, |&(byte, _)| byte)
        {
            Ok(i) => self.char_starts[i].1,
            Err(i) => self
                .char_starts
                .get(i)
                .map_or_else(|| self.char_starts.last().map_or(0, |c| c.1), |c| c.1),
        }
    }
}

/// Start offsets, in UTF-16 code units, of every extended grapheme
/// cluster in `units`. Empty for empty input.
pub fn grapheme_boundaries(units: &[u16]) -> Vec<usize> {
    let decoded = DecodedUtf16::new(units);
    decoded
        .text
        .grapheme_indices(true)
        .map(|(byte_idx, _)| decoded.utf16_offset(byte_idx))
        .collect()
}

/// For each UTF-16 code unit, the 0-based ordinal of the grapheme
/// cluster it belongs to. The result is non-decreasing and has the same
/// length as `units`.
pub fn grapheme_ordinals(units: &[u16]) -> Vec<u32> {
    let mut ordinals = Vec::with_capacity(units.len());
    let boundaries = grapheme_boundaries(units);
    for (ordinal, &start) in boundaries.iter().enumerate() {
        let end = boundaries.get(ordinal + 1).copied().unwrap_or(units.len());
        ordinals.extend(std::iter::repeat_n(ordinal as u32, end - start));
    }
    ordinals
}

/// Number of grapheme clusters in `units`.
pub fn count_graphemes(units: &[u16]) -> usize {
    let decoded = DecodedUtf16::new(units);
    decoded.text.graphemes(true).count()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn utf16(text: &str) -> Vec<u16> {
        text.encode_utf16().collect()
    }

    #[test]
    fn basic_ascii_graphemes() {
        let text = utf16("abc");
        assert_eq!(grapheme_boundaries(&text), vec![0, 1, 2]);
        assert_eq!(grapheme_ordinals(&text), vec![0, 1, 2]);
        assert_eq!(count_graphemes(&text), 3);
    }

    #[test]
    fn combining_mark_stays_with_base() {
        let text = utf16("a\u{0301}b"); // a + COMBINING ACUTE, b
        assert_eq!(grapheme_ordinals(&text), vec![0, 0, 1]);
        assert_eq!(count_graphemes(&text), 2);
    }

    #[test]
    fn emoji_zwj_sequence_is_single_cluster() {
        // Family: man, woman, girl (uses ZWJ sequences)
        let text = utf16("\u{1F468}\u{200D}\u{1F469}\u{200D}\u{1F467}");
        assert_eq!(text.len(), 8);
        assert_eq!(grapheme_ordinals(&text), vec![0; 8]);
        assert_eq!(count_graphemes(&text), 1);
    }

    #[test]
    fn surrogate_pairs_map_to_code_units() {
        let text = utf16("x\u{1F600}y");
        assert_eq!(grapheme_boundaries(&text), vec![0, 1, 3]);
        assert_eq!(grapheme_ordinals(&text), vec![0, 1, 1, 2]);
    }

    #[test]
    fn unpaired_surrogate_counts_as_one_unit() {
        let text = vec![0x61, 0xD800, 0x62];
        assert_eq!(grapheme_ordinals(&text).len(), 3);
    }

    #[test]
    fn empty_text() {
        assert!(grapheme_boundaries(&[]).is_empty());
        assert!(grapheme_ordinals(&[]).is_empty());
        assert_eq!(count_graphemes(&[]), 0);
    }
}
