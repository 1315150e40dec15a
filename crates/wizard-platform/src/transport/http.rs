//! HTTP chat transport.
//!
//! Streams the event-stream response body of the chat endpoint and offers
//! the non-streaming `{prompt}` → `{response}` endpoint as a fallback.
//! Uses browser `fetch()` via gloo-net for WASM compatibility.

use async_trait::async_trait;
use gloo_net::http::{Request, Response};
use serde::Deserialize;
use serde_json::json;

use wizard_core::ports::*;
use wizard_types::{config::EndpointConfig, ChatError, Result};

use super::abort::FetchAbort;
use super::body::body_stream;

pub struct HttpChatTransport {
    endpoints: EndpointConfig,
}

impl HttpChatTransport {
    pub fn new(endpoints: EndpointConfig) -> Self {
        Self { endpoints }
    }
}

#[derive(Deserialize)]
struct AskResponse {
    response: String,
}

#[async_trait(?Send)]
impl ChatTransport for HttpChatTransport {
    async fn open_stream(&self, req: &ChatRequest) -> Result<ByteStream> {
        let abort = FetchAbort::new()?;
        let signal = abort.signal();
        let response = Request::post(&self.endpoints.stream_url)
            .header("Accept", "text/event-stream")
            .abort_signal(Some(&signal))
            .json(req)
            .map_err(|e| ChatError::Serialization(e.to_string()))?
            .send()
            .await
            .map_err(|e| ChatError::Network(e.to_string()))?;

        let response = ensure_ok(response).await?;
        let body = response
            .body()
            .ok_or_else(|| ChatError::Protocol("response has no body".to_string()))?;

        // From here the body reader owns cancellation.
        abort.disarm();
        log::debug!("Stream opened at {}", self.endpoints.stream_url);
        Ok(body_stream(body))
    }

    async fn ask(&self, prompt: &str) -> Result<String> {
        let abort = FetchAbort::new()?;
        let signal = abort.signal();
        let response = Request::post(&self.endpoints.ask_url)
            .abort_signal(Some(&signal))
            .json(&json!({ "prompt": prompt }))
            .map_err(|e| ChatError::Serialization(e.to_string()))?
            .send()
            .await
            .map_err(|e| ChatError::Network(e.to_string()))?;

        let data: AskResponse = ensure_ok(response)
            .await?
            .json()
            .await
            .map_err(|e| ChatError::Serialization(e.to_string()))?;
        abort.disarm();
        Ok(data.response)
    }
}

/// Turn a non-2xx response into [`ChatError::Http`].
pub(crate) async fn ensure_ok(response: Response) -> Result<Response> {
    if response.ok() {
        return Ok(response);
    }
    let status = response.status();
    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "unknown error".to_string());
    Err(ChatError::Http { status, body })
}
