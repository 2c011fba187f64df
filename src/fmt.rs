use comfy_table::presets::NOTHING;
use comfy_table::{CellAlignment, Table};

/// Shortest plain rendering of a number: 100.0 → "100", 12.5 → "12.5".
pub fn number(val: f64) -> String {
    if val == 0.0 {
        return "0".to_string();
    }
    format!("{val}")
}

pub fn format_bytes(size: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];
    let mut value = size as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{size} B")
    } else {
        format!("{value:.1} {}", UNITS[unit])
    }
}

/// Borderless fixed-width table: a header line then one line per row,
/// columns right-aligned.
pub fn render_table<H, R>(headers: &[H], rows: &[R]) -> String
where
    H: AsRef<str>,
    R: AsRef<[String]>,
{
    let mut table = Table::new();
    table.load_preset(NOTHING);
    table.set_header(headers.iter().map(|h| h.as_ref().to_string()));
    for row in rows {
        table.add_row(row.as_ref().iter().cloned());
    }
    for column in table.column_iter_mut() {
        column.set_cell_alignment(CellAlignment::Right);
    }
    table
        .lines()
        .map(|line| line.trim_end().to_string())
        .collect::<Vec<_>>()
        .join("\n")
}
