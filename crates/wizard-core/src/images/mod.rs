//! Embedded image references.
//!
//! Three token shapes are recognised in raw text: external image URLs,
//! generated-asset paths and symbolic `LOGO_<id>` identifiers. Tokens are cut
//! out of the prose and returned separately so images render in their own
//! region.

mod resolve;

pub use resolve::{resolve, resolve_all, resolve_logo, ResolvedImage};

use std::collections::HashSet;
use std::ops::Range;
use std::sync::LazyLock;
use regex::Regex;
use wizard_types::config::AssetConfig;

static MARKDOWN_IMAGE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"!\[[^\]\n]*\]\(\s*([^)\s]+)\s*\)").expect("markdown image regex is invalid")
});
static EXTERNAL_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)https?://[^\s()<>"'\[\]]+\.(?:png|jpe?g|gif|webp|svg)\b(?:\?[^\s()<>"']*)?"#)
        .expect("external image regex is invalid")
});
static ASSET_PATH: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?i)[^\s()<>"'\[\]]*(?:outputs|generated_images)[/\\][^\s()<>"'\[\]]+\.(?:png|jpe?g|gif|webp|svg)\b"#,
    )
    .expect("asset path regex is invalid")
});
static LOGO_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\bLOGO_[A-Za-z0-9-]+").expect("logo token regex is invalid"));
static EXCESS_BLANK_LINES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n{3,}").expect("blank line regex is invalid"));

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ImageRef {
    /// Absolute `http(s)` image URL, used as-is
    External(String),
    /// Public asset path (already rewritten)
    Asset(String),
    /// `LOGO_<id>`, resolved through metadata lookups
    Logo(String),
}

impl ImageRef {
    /// Stable key used for de-duplication and result caching.
    pub fn key(&self) -> &str {
        match self {
            ImageRef::External(s) | ImageRef::Asset(s) | ImageRef::Logo(s) => s,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedImages {
    /// Text with every image token removed
    pub prose: String,
    /// Distinct images in order of first appearance
    pub images: Vec<ImageRef>,
}

pub fn extract_images(raw: &str, assets: &AssetConfig) -> ExtractedImages {
    let mut found: Vec<(Range<usize>, ImageRef)> = Vec::new();

    for caps in MARKDOWN_IMAGE.captures_iter(raw) {
        let (Some(whole), Some(target)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        found.push((whole.range(), classify_target(target.as_str(), assets)));
    }

    for m in EXTERNAL_URL.find_iter(raw) {
        claim(&mut found, m.range(), || ImageRef::External(m.as_str().to_string()));
    }
    for m in ASSET_PATH.find_iter(raw) {
        claim(&mut found, m.range(), || {
            ImageRef::Asset(to_public_path(m.as_str(), assets))
        });
    }
    for m in LOGO_TOKEN.find_iter(raw) {
        claim(&mut found, m.range(), || ImageRef::Logo(m.as_str().to_string()));
    }

    found.sort_by_key(|(range, _)| range.start);

    let mut prose = String::with_capacity(raw.len());
    let mut last = 0;
    for (range, _) in &found {
        prose.push_str(&raw[last..range.start]);
        last = range.end;
    }
    prose.push_str(&raw[last..]);

    let mut seen = HashSet::new();
    let images = found
        .into_iter()
        .map(|(_, image)| image)
        .filter(|image| seen.insert(image.key().to_string()))
        .collect();

    ExtractedImages {
        prose: tidy(&prose),
        images,
    }
}

/// Rewrite a local file path to the public path served for it.
/// URLs and paths without a known segment come back unchanged.
pub fn to_public_path(path: &str, assets: &AssetConfig) -> String {
    if path.starts_with("http://") || path.starts_with("https://") || path.starts_with("data:") {
        return path.to_string();
    }

    let normalized = path.replace('\\', "/");
    for segment in &assets.public_segments {
        if let Some(idx) = find_segment(&normalized, &segment.marker) {
            return format!(
                "{}{}",
                segment.public_prefix,
                &normalized[idx + segment.marker.len()..]
            );
        }
    }
    path.to_string()
}

/// First occurrence of `marker` that starts a path component.
fn find_segment(path: &str, marker: &str) -> Option<usize> {
    path.match_indices(marker)
        .map(|(idx, _)| idx)
        .find(|&idx| idx == 0 || path[..idx].ends_with('/'))
}

fn classify_target(target: &str, assets: &AssetConfig) -> ImageRef {
    if target.starts_with("http://") || target.starts_with("https://") {
        ImageRef::External(target.to_string())
    } else if LOGO_TOKEN.find(target).is_some_and(|m| m.as_str() == target) {
        ImageRef::Logo(target.to_string())
    } else {
        ImageRef::Asset(to_public_path(target, assets))
    }
}

fn claim(found: &mut Vec<(Range<usize>, ImageRef)>, range: Range<usize>, image: impl FnOnce() -> ImageRef) {
    let overlaps = found
        .iter()
        .any(|(taken, _)| range.start < taken.end && taken.start < range.end);
    if !overlaps {
        found.push((range, image()));
    }
}

fn tidy(prose: &str) -> String {
    let lines: Vec<&str> = prose.lines().map(str::trim_end).collect();
    let joined = lines.join("\n");
    EXCESS_BLANK_LINES.replace_all(joined.trim(), "\n\n").into_owned()
}
