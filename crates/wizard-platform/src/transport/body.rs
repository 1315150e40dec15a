//! `ReadableStream` response body as a byte stream.

use futures::stream;
use js_sys::{Reflect, Uint8Array};
use wasm_bindgen::{JsCast, JsValue};
use wasm_bindgen_futures::JsFuture;
use web_sys::{ReadableStream, ReadableStreamDefaultReader};

use wizard_core::ports::ByteStream;
use wizard_types::{ChatError, Result};

use crate::js_error_text;

/// Reader over a response body. Dropping it before the body ends cancels
/// the underlying fetch.
struct BodyReader {
    reader: ReadableStreamDefaultReader,
    finished: bool,
}

impl BodyReader {
    async fn next_chunk(&mut self) -> Option<Result<Vec<u8>>> {
        if self.finished {
            return None;
        }

        let result = match JsFuture::from(self.reader.read()).await {
            Ok(result) => result,
            Err(e) => {
                self.finished = true;
                return Some(Err(ChatError::Network(js_error_text(&e))));
            }
        };

        let done = Reflect::get(&result, &JsValue::from_str("done"))
            .ok()
            .and_then(|v| v.as_bool())
            .unwrap_or(true);
        if done {
            self.finished = true;
            return None;
        }

        match Reflect::get(&result, &JsValue::from_str("value")) {
            Ok(value) => Some(Ok(Uint8Array::new(&value).to_vec())),
            Err(e) => {
                self.finished = true;
                Some(Err(ChatError::JsInterop(js_error_text(&e))))
            }
        }
    }
}

impl Drop for BodyReader {
    fn drop(&mut self) {
        if !self.finished {
            log::debug!("Cancelling unread response body");
            let _ = self.reader.cancel();
        }
    }
}

pub(crate) fn body_stream(body: ReadableStream) -> ByteStream {
    let reader = BodyReader {
        reader: body.get_reader().unchecked_into(),
        finished: false,
    };
    Box::pin(stream::unfold(reader, |mut reader| async move {
        reader.next_chunk().await.map(|chunk| (chunk, reader))
    }))
}
