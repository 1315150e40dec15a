//! Block-level pass of the content renderer.
//!
//! Each line is escaped exactly once on entry; everything after that only
//! adds tags around already-escaped text.

use std::sync::LazyLock;
use regex::Regex;

use super::inline::{escape_html, format_inline};
use super::swatch::{extract_swatches, render_swatch_table};
use super::table::{is_table_row, render_table};

static HEADING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(#{1,6})\s+(.*?)\s*$").expect("heading regex is invalid"));
static UNORDERED_ITEM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*[-*+]\s+(.*)$").expect("list regex is invalid"));
static ORDERED_ITEM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*(\d+)[.)]\s+(.*)$").expect("list regex is invalid"));
static FENCE_LANG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_+-]+$").expect("fence regex is invalid"));

const FENCE: &str = "```";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ListKind {
    Unordered,
    Ordered,
}

struct OpenList {
    kind: ListKind,
    start: u64,
    items: Vec<String>,
}

struct OpenFence {
    lang: Option<String>,
    lines: Vec<String>,
}

#[derive(Default)]
struct BlockWriter<'a> {
    blocks: Vec<String>,
    paragraph: Vec<String>,
    list: Option<OpenList>,
    /// Escaped table rows plus their raw source lines
    table: Vec<(String, &'a str)>,
    fence: Option<OpenFence>,
    tables_emitted: usize,
    /// Raw lines outside code and tables, scanned for colors
    prose_lines: Vec<&'a str>,
}

impl<'a> BlockWriter<'a> {
    fn line(&mut self, raw: &'a str) {
        if let Some(fence) = self.fence.as_mut() {
            if raw.trim_start().starts_with(FENCE) {
                self.close_fence();
            } else {
                fence.lines.push(escape_html(raw));
            }
            return;
        }

        if let Some(rest) = raw.trim_start().strip_prefix(FENCE) {
            self.flush();
            let lang = rest.trim();
            self.fence = Some(OpenFence {
                lang: FENCE_LANG.is_match(lang).then(|| lang.to_string()),
                lines: Vec::new(),
            });
            return;
        }

        let escaped = escape_html(raw);

        if is_table_row(&escaped) {
            self.flush_paragraph();
            self.flush_list();
            self.table.push((escaped, raw));
            return;
        }
        self.flush_table();
        self.prose(escaped, raw);
    }

    fn prose(&mut self, escaped: String, raw: &'a str) {
        if escaped.trim().is_empty() {
            self.flush_paragraph();
            self.flush_list();
            return;
        }
        self.prose_lines.push(raw);

        if let Some(caps) = HEADING.captures(&escaped) {
            self.flush_paragraph();
            self.flush_list();
            let level = caps[1].len();
            self.blocks.push(format!(
                "<h{level}>{}</h{level}>",
                format_inline(&caps[2])
            ));
            return;
        }

        if let Some(caps) = UNORDERED_ITEM.captures(&escaped) {
            self.list_item(ListKind::Unordered, 1, format_inline(&caps[1]));
            return;
        }

        if let Some(caps) = ORDERED_ITEM.captures(&escaped) {
            let start = caps[1].parse().unwrap_or(1);
            self.list_item(ListKind::Ordered, start, format_inline(&caps[2]));
            return;
        }

        self.flush_list();
        self.paragraph.push(format_inline(escaped.trim()));
    }

    fn list_item(&mut self, kind: ListKind, start: u64, item: String) {
        self.flush_paragraph();
        if self.list.as_ref().is_some_and(|l| l.kind != kind) {
            self.flush_list();
        }
        self.list
            .get_or_insert_with(|| OpenList {
                kind,
                start,
                items: Vec::new(),
            })
            .items
            .push(item);
    }

    /// Table first: a lone pipe row falls back into the paragraph.
    fn flush(&mut self) {
        self.flush_table();
        self.flush_paragraph();
        self.flush_list();
    }

    fn flush_paragraph(&mut self) {
        if self.paragraph.is_empty() {
            return;
        }
        let lines = std::mem::take(&mut self.paragraph);
        self.blocks.push(format!("<p>{}</p>", lines.join("<br>")));
    }

    fn flush_list(&mut self) {
        let Some(list) = self.list.take() else { return };
        let (open, close) = match list.kind {
            ListKind::Unordered => ("<ul>".to_string(), "</ul>"),
            ListKind::Ordered if list.start != 1 => (format!("<ol start=\"{}\">", list.start), "</ol>"),
            ListKind::Ordered => ("<ol>".to_string(), "</ol>"),
        };
        let items: String = list
            .items
            .iter()
            .map(|item| format!("<li>{}</li>", item))
            .collect();
        self.blocks.push(format!("{}{}{}", open, items, close));
    }

    /// A lone pipe line is not a table; it goes back through the prose path.
    fn flush_table(&mut self) {
        match self.table.len() {
            0 => {}
            1 => {
                let (escaped, raw) = self.table.remove(0);
                self.prose(escaped, raw);
            }
            _ => {
                let rows: Vec<String> = std::mem::take(&mut self.table)
                    .into_iter()
                    .map(|(escaped, _)| escaped)
                    .collect();
                self.blocks.push(render_table(&rows, format_inline));
                self.tables_emitted += 1;
            }
        }
    }

    fn close_fence(&mut self) {
        let Some(fence) = self.fence.take() else { return };
        let class = fence
            .lang
            .map(|lang| format!(" class=\"language-{}\"", lang))
            .unwrap_or_default();
        self.blocks.push(format!(
            "<pre><code{}>{}</code></pre>",
            class,
            fence.lines.join("\n")
        ));
    }

    fn finish(mut self) -> String {
        self.close_fence();
        self.flush();

        if self.tables_emitted == 0 {
            let swatches = extract_swatches(self.prose_lines.iter().copied());
            if swatches.len() >= 2 {
                self.blocks.push(render_swatch_table(&swatches));
            }
        }

        self.blocks.join("\n")
    }
}

/// Render raw assistant text to HTML-safe markup.
///
/// Input must be raw text. Feeding rendered output back in escapes it again.
pub fn render_markdown(raw: &str) -> String {
    let mut writer = BlockWriter::default();
    for line in raw.lines() {
        writer.line(line);
    }
    writer.finish()
}
