//! Image metadata fetcher.

use async_trait::async_trait;
use gloo_net::http::Request;

use wizard_core::ports::AssetPort;
use wizard_types::{ChatError, Result};

use crate::transport::http::ensure_ok;

#[derive(Default)]
pub struct HttpAssetFetcher;

impl HttpAssetFetcher {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait(?Send)]
impl AssetPort for HttpAssetFetcher {
    async fn fetch_text(&self, url: &str) -> Result<String> {
        let response = Request::get(url)
            .header("Cache-Control", "no-cache")
            .send()
            .await
            .map_err(|e| ChatError::Network(e.to_string()))?;

        ensure_ok(response)
            .await?
            .text()
            .await
            .map_err(|e| ChatError::Network(e.to_string()))
    }
}
