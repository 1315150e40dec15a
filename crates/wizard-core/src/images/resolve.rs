//! Image resolution pipeline.
//!
//! Symbolic logos go through latest metadata → history metadata →
//! placeholder. Each step yields an explicit `Result`; a failure only moves
//! the pipeline to the next step and never escapes this module.

use futures::future::join_all;
use serde::Deserialize;
use wizard_types::{config::AssetConfig, ChatError, Result};

use super::{to_public_path, ImageRef};
use crate::ports::AssetPort;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolvedImage {
    /// Displayable location
    Ready { src: String },
    /// Inert stand-in shown when every lookup failed
    Placeholder { label: String },
}

#[derive(Deserialize)]
struct LogoRecord {
    #[serde(default)]
    image_path: Option<String>,
}

pub async fn resolve(image: &ImageRef, assets: &dyn AssetPort, config: &AssetConfig) -> ResolvedImage {
    match image {
        ImageRef::External(url) => ResolvedImage::Ready { src: url.clone() },
        ImageRef::Asset(path) => ResolvedImage::Ready { src: path.clone() },
        ImageRef::Logo(token) => resolve_logo(token, assets, config).await,
    }
}

/// Resolve every image concurrently. One slow or failing lookup does not
/// hold back the others.
pub async fn resolve_all(
    images: &[ImageRef],
    assets: &dyn AssetPort,
    config: &AssetConfig,
) -> Vec<ResolvedImage> {
    join_all(images.iter().map(|image| resolve(image, assets, config))).await
}

pub async fn resolve_logo(token: &str, assets: &dyn AssetPort, config: &AssetConfig) -> ResolvedImage {
    match latest_image_path(token, assets, config).await {
        Ok(path) => {
            return ResolvedImage::Ready {
                src: to_public_path(&path, config),
            }
        }
        Err(e) => log::debug!("Latest metadata for {} unavailable: {}", token, e),
    }

    match history_image_path(token, assets, config).await {
        Ok(path) => {
            return ResolvedImage::Ready {
                src: to_public_path(&path, config),
            }
        }
        Err(e) => log::debug!("History metadata for {} unavailable: {}", token, e),
    }

    log::warn!("No image found for {}, showing placeholder", token);
    ResolvedImage::Placeholder {
        label: token.to_string(),
    }
}

async fn latest_image_path(token: &str, assets: &dyn AssetPort, config: &AssetConfig) -> Result<String> {
    let url = format!("{}{}_latest.json", config.metadata_base, token);
    let body = assets.fetch_text(&url).await?;
    let record: LogoRecord = serde_json::from_str(&body)?;
    non_empty(record.image_path, &url)
}

async fn history_image_path(token: &str, assets: &dyn AssetPort, config: &AssetConfig) -> Result<String> {
    let url = format!("{}{}_history.json", config.metadata_base, token);
    let body = assets.fetch_text(&url).await?;
    let records: Vec<LogoRecord> = serde_json::from_str(&body)?;
    let last = records
        .into_iter()
        .last()
        .ok_or_else(|| ChatError::Other(format!("empty history at {}", url)))?;
    non_empty(last.image_path, &url)
}

fn non_empty(path: Option<String>, url: &str) -> Result<String> {
    path.filter(|p| !p.trim().is_empty())
        .ok_or_else(|| ChatError::Other(format!("no image_path in {}", url)))
}
