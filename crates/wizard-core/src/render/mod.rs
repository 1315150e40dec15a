//! Content renderer: raw assistant text → HTML-safe markup.
//!
//! Supported subset: fenced code, inline code, lists, headings 1–6,
//! bold/italic, pipe tables, plus a color-swatch table synthesized from
//! `label: #RRGGBB` lines when the text has no table of its own.

pub mod inline;
pub mod table;
pub mod swatch;
mod markdown;

pub use markdown::render_markdown;

use wizard_types::config::AssetConfig;
use crate::images::{extract_images, ImageRef};

/// A reply split into rendered prose and the images pulled out of it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedReply {
    pub html: String,
    pub images: Vec<ImageRef>,
}

/// Strip image tokens first, then render what is left.
pub fn render_reply(raw: &str, assets: &AssetConfig) -> RenderedReply {
    let extracted = extract_images(raw, assets);
    RenderedReply {
        html: render_markdown(&extracted.prose),
        images: extracted.images,
    }
}
