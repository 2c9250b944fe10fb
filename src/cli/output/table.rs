//! Table output formatting for CLI commands
//!
//! Renders conversation history with comfy-table.

use comfy_table::{presets, Attribute, Cell, Color, ContentArrangement, Table};
use std::env;

use crate::domain::models::ConversationRecord;

/// Table formatter for CLI output
pub struct TableFormatter {
    /// Whether to use colors in output
    use_colors: bool,
    /// Maximum width for tables (None = auto)
    max_width: Option<u16>,
}

impl TableFormatter {
    /// Create a new table formatter
    pub fn new() -> Self {
        Self {
            use_colors: supports_color(),
            max_width: None,
        }
    }

    /// Create a new table formatter with custom settings
    pub const fn with_config(use_colors: bool, max_width: Option<u16>) -> Self {
        Self {
            use_colors,
            max_width,
        }
    }

    /// Format conversation records as a table, in the order given
    pub fn format_conversations(&self, records: &[ConversationRecord]) -> String {
        let mut table = self.create_base_table();

        table.set_header(vec![
            Cell::new("Time (UTC)").add_attribute(Attribute::Bold),
            Cell::new("Model").add_attribute(Attribute::Bold),
            Cell::new("Input").add_attribute(Attribute::Bold),
            Cell::new("Response").add_attribute(Attribute::Bold),
        ]);

        for record in records {
            let time = record.timestamp.format("%Y-%m-%d %H:%M:%S").to_string();
            let model = if self.use_colors {
                Cell::new(&record.model).fg(Color::Cyan)
            } else {
                Cell::new(&record.model)
            };

            table.add_row(vec![
                Cell::new(time),
                model,
                Cell::new(truncate_text(&record.user_input, 40)),
                Cell::new(truncate_text(&record.ai_response, 60)),
            ]);
        }

        table.to_string()
    }

    fn create_base_table(&self) -> Table {
        let mut table = Table::new();

        table
            .load_preset(presets::UTF8_FULL)
            .set_content_arrangement(ContentArrangement::Dynamic);

        if let Some(width) = self.max_width {
            table.set_width(width);
        }

        table
    }
}

impl Default for TableFormatter {
    fn default() -> Self {
        Self::new()
    }
}

/// Check if color output is supported
fn supports_color() -> bool {
    // Respect NO_COLOR environment variable
    if env::var("NO_COLOR").is_ok() {
        return false;
    }

    if let Ok(term) = env::var("TERM") {
        if term == "dumb" {
            return false;
        }
    }

    true
}

/// Truncate to at most `max_chars` characters, marking the cut with `...`
fn truncate_text(text: &str, max_chars: usize) -> String {
    let flat = text.replace('\n', " ");
    if flat.chars().count() <= max_chars {
        flat
    } else {
        let kept: String = flat.chars().take(max_chars.saturating_sub(3)).collect();
        format!("{kept}...")
    }
}
