//! Text rendering of query results
//!
//! [`render_table`] draws an ASCII grid with a header row. [`render_vertical`]
//! prints one block per record with the column name on the left, like the
//! `\G` output of the mysql client.

use comfy_table::presets::ASCII_FULL;
use comfy_table::{ContentArrangement, Table};

/// Values longer than this are wrapped onto continuation lines
pub const VERTICAL_WRAP_WIDTH: usize = 80;
const LABEL_WIDTH: usize = 20;
const RULE_WIDTH: usize = 50;

pub fn render_table<S: AsRef<str>>(columns: &[&str], rows: &[Vec<S>]) -> String {
    let mut table = Table::new();
    table
        .load_preset(ASCII_FULL)
        .set_content_arrangement(ContentArrangement::Disabled)
        .set_header(columns.iter().copied());

    for row in rows {
        table.add_row(row.iter().map(|cell| cell.as_ref()));
    }

    table.to_string()
}

/// Render records given as column/value pairs, numbering blocks from 1
pub fn render_vertical(records: &[Vec<(&str, String)>]) -> String {
    let mut out = String::new();

    for (index, record) in records.iter().enumerate() {
        out.push_str(&format!("Node {}\n", index + 1));
        out.push_str(&"-".repeat(RULE_WIDTH));
        out.push('\n');

        for (column, value) in record {
            let label = format!("{}:", column);
            let mut lines = wrap(value, VERTICAL_WRAP_WIDTH).into_iter();
            let first = lines.next().unwrap_or_default();
            out.push_str(&format!("{:<width$} {}\n", label, first, width = LABEL_WIDTH));
            for line in lines {
                out.push_str(&format!("{:<width$} {}\n", "", line, width = LABEL_WIDTH));
            }
        }

        out.push_str(&"=".repeat(RULE_WIDTH));
        out.push('\n');
    }

    out
}

/// Split into chunks of at most `width` characters
fn wrap(value: &str, width: usize) -> Vec<String> {
    let chars: Vec<char> = value.chars().collect();
    if chars.len() <= width {
        return vec![value.to_string()];
    }
    chars.chunks(width).map(|chunk| chunk.iter().collect()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_table_has_header_and_cells() {
        let rendered = render_table(
            &["ID", "Status"],
            &[vec!["1", "RUNNING"], vec!["2", "FAILED"]],
        );
        let lines: Vec<&str> = rendered.lines().collect();
        assert!(lines[0].starts_with('+'));
        assert!(lines[1].contains("ID") && lines[1].contains("Status"));
        assert!(rendered.contains("RUNNING"));
        assert!(rendered.contains("FAILED"));
    }

    #[test]
    fn test_render_vertical_layout() {
        let records = vec![vec![("id", "n1".to_string()), ("type", "C".to_string())]];
        let rendered = render_vertical(&records);
        let lines: Vec<&str> = rendered.lines().collect();

        assert_eq!(lines[0], "Node 1");
        assert_eq!(lines[1], "-".repeat(50));
        assert_eq!(lines[2], format!("{:<20} n1", "id:"));
        assert_eq!(lines[3], format!("{:<20} C", "type:"));
        assert_eq!(lines[4], "=".repeat(50));
    }

    #[test]
    fn test_render_vertical_wraps_long_values() {
        let long = "x".repeat(170);
        let rendered = render_vertical(&[vec![("input", long)]]);
        let lines: Vec<&str> = rendered.lines().collect();

        assert_eq!(lines[2], format!("{:<20} {}", "input:", "x".repeat(80)));
        assert_eq!(lines[3], format!("{:<20} {}", "", "x".repeat(80)));
        assert_eq!(lines[4], format!("{:<20} {}", "", "x".repeat(10)));
    }

    #[test]
    fn test_wrap_counts_characters() {
        let value = "节".repeat(81);
        let chunks = wrap(&value, 80);
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[1], "节");
    }

    #[test]
    fn test_render_vertical_empty() {
        assert!(render_vertical(&[]).is_empty());
    }
}
