use rune_config::RuneConfig;
use rune_shape::{AdjustMidCluster, BreakGlyphsOption, TextDirection, TextShaper};

fn main() {
    // Font comes from rune.toml or RUNE_SHAPE_FONT.
    let config = RuneConfig::load();
    let shaper = match TextShaper::from_config(&config.shaping) {
        Ok(shaper) => shaper,
        Err(err) => {
            eprintln!("cannot load font: {err}");
            eprintln!("set RUNE_SHAPE_FONT=/path/to/font.ttf or add [shaping] font = ... to rune.toml");
            std::process::exit(1);
        }
    };

    let text = "Hello, World! office";
    let utf16: Vec<u16> = text.encode_utf16().collect();
    let result = shaper
        .shape(&utf16, TextDirection::Ltr)
        .expect("shaping failed");

    println!("=== Hit Testing Demo ===\n");
    println!("Text: {:?}", text);
    println!("{}\n", result);
    println!(
        "Width: {:.2}  glyphs: {}  ink: {:?}",
        result.width(),
        result.num_glyphs(),
        result.glyph_bounding_box()
    );

    println!("\n--- Offset to Position ---");
    for offset in 0..=result.num_characters() {
        let x = result.caret_position_for_offset(offset, &utf16, AdjustMidCluster::ToStart);
        println!("  offset {:>2} -> x {:>7.2}", offset, x);
    }

    println!("\n--- Position to Offset ---");
    let step = (result.width() / 8.0).max(1.0);
    let mut x = -step;
    while x <= result.width() + step {
        let hit = result.offset_for_position_detailed(x, BreakGlyphsOption::BreakGlyphs);
        let caret = result.caret_offset_for_hit_test(x, &utf16, BreakGlyphsOption::BreakGlyphs);
        println!(
            "  x {:>7.2} -> chars [{}, {}) caret {}",
            x, hit.left_character_index, hit.right_character_index, caret
        );
        x += step;
    }

    println!("\n--- Sub-ranges ---");
    let words = [(0u32, 6u32), (7, 13), (14, result.num_characters())];
    for (start, end) in words {
        let sub = result.sub_range(start, end);
        println!(
            "  [{start}, {end}) width {:.2} safe break before end: {}",
            sub.width(),
            result.previous_safe_to_break_offset(end)
        );
    }
}
