//! Pipe-delimited tables.

/// A line that starts and ends with `|`.
pub fn is_table_row(line: &str) -> bool {
    let trimmed = line.trim();
    trimmed.len() >= 2 && trimmed.starts_with('|') && trimmed.ends_with('|')
}

/// A row made only of alignment dashes, e.g. `| --- | :-: |`.
pub fn is_alignment_row(line: &str) -> bool {
    let cells = split_cells(line);
    !cells.is_empty()
        && cells.iter().all(|cell| {
            let inner = cell.trim_start_matches(':').trim_end_matches(':');
            !inner.is_empty() && inner.chars().all(|c| c == '-')
        })
}

pub fn split_cells(line: &str) -> Vec<String> {
    let trimmed = line.trim();
    let inner = trimmed.strip_prefix('|').unwrap_or(trimmed);
    let inner = inner.strip_suffix('|').unwrap_or(inner);
    inner.split('|').map(|c| c.trim().to_string()).collect()
}

/// Render escaped rows. A second row of alignment dashes turns the first
/// row into the header.
pub fn render_table(rows: &[String], format_cell: impl Fn(&str) -> String) -> String {
    let has_header = rows.len() >= 2 && is_alignment_row(&rows[1]);
    let mut html = String::from("<table class=\"md-table\">");

    let body_rows = if has_header {
        html.push_str("<thead><tr>");
        for cell in split_cells(&rows[0]) {
            html.push_str("<th>");
            html.push_str(&format_cell(&cell));
            html.push_str("</th>");
        }
        html.push_str("</tr></thead>");
        &rows[2..]
    } else {
        rows
    };

    html.push_str("<tbody>");
    for row in body_rows {
        html.push_str("<tr>");
        for cell in split_cells(row) {
            html.push_str("<td>");
            html.push_str(&format_cell(&cell));
            html.push_str("</td>");
        }
        html.push_str("</tr>");
    }
    html.push_str("</tbody></table>");
    html
}
