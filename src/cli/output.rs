/// Terminal output helpers shared by the subcommands
///
/// Status lines go to stderr so that predictions written to stdout can be piped.
use colored::*;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

/// Print a success message
pub fn print_success(message: &str) {
    eprintln!("{} {}", "✓".green().bold(), message);
}

/// Print a section header
pub fn print_section(title: &str) {
    eprintln!("\n{} {}", "▶".cyan(), title.bold());
    eprintln!("{}", "─".repeat(60).dimmed());
}

pub fn print_item(label: &str, value: impl std::fmt::Display) {
    eprintln!("  {} {}: {}", "•".dimmed(), label, value.to_string().green());
}

/// Spinner for indeterminate work, hidden when stderr is not a terminal
pub fn spinner(message: impl Into<String>) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    let style = ProgressStyle::default_spinner()
        .template("{spinner:.cyan} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
        .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏");
    pb.set_style(style);
    pb.set_message(message.into());
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

/// Print a two-column table using comfy_table
pub fn print_key_value_table(title: &str, rows: Vec<(String, String)>) {
    use comfy_table::modifiers::UTF8_ROUND_CORNERS;
    use comfy_table::presets::UTF8_FULL;
    use comfy_table::{Attribute, Cell, Color as TableColor, ContentArrangement, Table};

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![
        Cell::new(title)
            .add_attribute(Attribute::Bold)
            .fg(TableColor::Cyan),
        Cell::new("").add_attribute(Attribute::Bold),
    ]);
    for (key, value) in rows {
        table.add_row(vec![Cell::new(key), Cell::new(value).fg(TableColor::Green)]);
    }
    println!("{}", table);
}

/// Format a count with thousands separators
pub fn format_number(n: usize) -> String {
    let s = n.to_string();
    let mut result = String::new();
    for (i, c) in s.chars().rev().enumerate() {
        if i > 0 && i % 3 == 0 {
            result.push(',');
        }
        result.push(c);
    }
    result.chars().rev().collect()
}

/// Check if colors should be disabled
pub fn colors_enabled() -> bool {
    std::env::var("NO_COLOR").is_err()
        && std::env::var("CLICOLOR").unwrap_or_else(|_| "1".to_string()) != "0"
}

/// Apply the color preference of the environment
pub fn init() {
    if !colors_enabled() {
        colored::control::set_override(false);
    }
}
