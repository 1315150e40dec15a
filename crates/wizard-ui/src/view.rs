//! View models and the markup the app mounts for them.

use std::collections::HashMap;

use wizard_core::images::{ImageRef, ResolvedImage};
use wizard_core::render::{inline::escape_html, render_reply};
use wizard_types::{
    config::AssetConfig,
    conversation::ConversationSummary,
    message::{Message, Role},
};

/// One image region under a message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageSlot {
    /// Resolution not finished yet
    Loading { image: ImageRef },
    Ready { src: String },
    Placeholder { label: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageView {
    pub role: Role,
    /// Safe markup for the message body
    pub html: String,
    pub images: Vec<ImageSlot>,
    /// e.g. "Generated in 2.4s"
    pub meta: Option<String>,
    pub pending: bool,
}

impl MessageView {
    /// Project a stored message. Assistant text is rendered from its raw
    /// content every time; user text is shown verbatim.
    pub fn project(
        message: &Message,
        assets: &AssetConfig,
        resolved: &HashMap<String, ResolvedImage>,
    ) -> Self {
        match message.role {
            Role::User => Self {
                role: Role::User,
                html: format!("<p>{}</p>", escape_html(&message.content).replace('\n', "<br>")),
                images: Vec::new(),
                meta: None,
                pending: false,
            },
            Role::Assistant => {
                let reply = render_reply(&message.content, assets);
                let images = reply
                    .images
                    .into_iter()
                    .map(|image| match resolved.get(image.key()) {
                        Some(ResolvedImage::Ready { src }) => ImageSlot::Ready { src: src.clone() },
                        Some(ResolvedImage::Placeholder { label }) => ImageSlot::Placeholder {
                            label: label.clone(),
                        },
                        None => ImageSlot::Loading { image },
                    })
                    .collect();
                Self {
                    role: Role::Assistant,
                    html: reply.html,
                    images,
                    meta: message.elapsed_ms.map(format_elapsed),
                    pending: message.pending,
                }
            }
        }
    }

    pub fn to_html(&self) -> String {
        let mut class = format!("message message-{}", self.role.as_str());
        if self.pending {
            class.push_str(" pending");
        }

        let mut html = format!("<div class=\"{}\"><div class=\"message-body\">", class);
        if self.pending && self.html.is_empty() {
            html.push_str("<span class=\"thinking\">Thinking…</span>");
        } else {
            html.push_str(&self.html);
        }
        if self.pending {
            html.push_str("<span class=\"typing-cursor\"></span>");
        }
        html.push_str("</div>");

        if !self.images.is_empty() {
            html.push_str("<div class=\"message-images\">");
            for slot in &self.images {
                html.push_str(&slot_html(slot));
            }
            html.push_str("</div>");
        }

        if let Some(meta) = &self.meta {
            html.push_str(&format!("<div class=\"message-meta\">{}</div>", escape_html(meta)));
        }
        html.push_str("</div>");
        html
    }
}

fn slot_html(slot: &ImageSlot) -> String {
    match slot {
        ImageSlot::Loading { .. } => "<div class=\"image-loading\"></div>".to_string(),
        ImageSlot::Ready { src } => format!(
            "<img class=\"generated-image\" src=\"{}\" alt=\"Generated image\" loading=\"lazy\">",
            escape_html(src)
        ),
        ImageSlot::Placeholder { label } => format!(
            "<div class=\"image-placeholder\">Image unavailable: {}</div>",
            escape_html(label)
        ),
    }
}

/// Sidebar entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversationItem {
    pub id: String,
    pub title: String,
    pub avatar: String,
    pub message_count: usize,
    pub active: bool,
    /// A reply is streaming into this conversation
    pub generating: bool,
}

impl ConversationItem {
    pub fn project(summary: ConversationSummary, active_id: &str, generating_for: Option<&str>) -> Self {
        let active = summary.id == active_id;
        let generating = generating_for == Some(summary.id.as_str());
        Self {
            id: summary.id,
            title: summary.title,
            avatar: summary.avatar,
            message_count: summary.message_count,
            active,
            generating,
        }
    }

    pub fn to_html(&self) -> String {
        let mut class = String::from("conversation");
        if self.active {
            class.push_str(" active");
        }
        if self.generating {
            class.push_str(" generating");
        }
        let id = escape_html(&self.id);
        format!(
            "<li class=\"{class}\" data-id=\"{id}\">\
             <img class=\"avatar\" src=\"{avatar}\" alt=\"\">\
             <span class=\"title\">{title}</span>\
             <span class=\"count\">{count}</span>\
             <button class=\"rename-btn\" data-id=\"{id}\" title=\"Rename\">✎</button>\
             <button class=\"delete-btn\" data-id=\"{id}\" title=\"Delete\">×</button>\
             </li>",
            avatar = escape_html(&self.avatar),
            title = escape_html(&self.title),
            count = self.message_count,
        )
    }
}

pub fn format_elapsed(ms: u64) -> String {
    format!("Generated in {:.1}s", ms as f64 / 1000.0)
}
