//! Color swatch enrichment.
//!
//! Scans prose lines for `label: #RRGGBB` pairs and bare `#RRGGBB` tokens.
//! Two or more distinct colors produce a name / hex / swatch table.

use std::collections::HashSet;
use std::sync::LazyLock;
use regex::Regex;

use super::inline::escape_html;

static LABELED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^\s*(?:[-*+]\s+|\d+[.)]\s+)?(?:\*\*|__)?([^:#*_\n|][^:#*\n|]*?)(?:\*\*|__)?\s*:\s*(?:\*\*|`)?\s*#([0-9A-Fa-f]{6})\b",
    )
    .expect("labeled color regex is invalid")
});
static BARE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"#([0-9A-Fa-f]{6})\b").expect("hex color regex is invalid"));

/// One color found in the text. `hex` is `#RRGGBB`, uppercase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Swatch {
    pub name: String,
    pub hex: String,
}

/// Distinct colors in order of first appearance; the first name for a hex wins.
pub fn extract_swatches<'a>(lines: impl IntoIterator<Item = &'a str>) -> Vec<Swatch> {
    let mut seen = HashSet::new();
    let mut swatches = Vec::new();

    for line in lines {
        let mut labeled_at = None;
        if let Some(caps) = LABELED.captures(line) {
            let name = caps[1].trim().to_string();
            let hex = format!("#{}", caps[2].to_ascii_uppercase());
            labeled_at = caps.get(2).map(|m| m.start() - 1);
            if seen.insert(hex.clone()) {
                swatches.push(Swatch { name, hex });
            }
        }

        for caps in BARE.captures_iter(line) {
            let Some(whole) = caps.get(0) else { continue };
            if Some(whole.start()) == labeled_at {
                continue;
            }
            let hex = format!("#{}", caps[1].to_ascii_uppercase());
            if seen.insert(hex.clone()) {
                swatches.push(Swatch { name: hex.clone(), hex });
            }
        }
    }

    swatches
}

pub fn render_swatch_table(swatches: &[Swatch]) -> String {
    let mut html = String::from(
        "<table class=\"md-table color-swatches\"><thead><tr><th>Name</th><th>Hex</th><th>Swatch</th></tr></thead><tbody>",
    );
    for swatch in swatches {
        html.push_str(&format!(
            "<tr><td>{}</td><td><code>{}</code></td><td><span class=\"color-swatch\" style=\"background-color:{}\"></span></td></tr>",
            escape_html(&swatch.name),
            swatch.hex,
            swatch.hex,
        ));
    }
    html.push_str("</tbody></table>");
    html
}
