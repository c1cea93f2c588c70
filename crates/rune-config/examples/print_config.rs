/// Example program to print the loaded configuration
///
/// Run with: cargo run -p rune-config --example print_config

fn main() {
    // Load configuration from rune.toml
    let config = rune_config::RuneConfig::load();

    println!("=== Rune Shaping Configuration ===\n");

    println!("Shaping Settings:");
    println!("  Font: {:?}", config.shaping.font);
    println!("  Font Index: {}", config.shaping.font_index);
    println!("  Font Size: {}", config.shaping.font_size);
    println!("  Tab Size: {}", config.shaping.tab_size);
    println!("  Script: {:?}", config.shaping.script);
    println!();

    match toml::to_string_pretty(&config) {
        Ok(toml_str) => {
            println!("=== Serialized Configuration ===");
            println!("{}", toml_str);
        }
        Err(e) => {
            eprintln!("Failed to serialize config: {}", e);
        }
    }
}
