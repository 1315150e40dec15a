//! Frame decoder for the event-stream response body.
//!
//! Frames end at a blank line (`\n\n` or `\r\n\r\n`). Inside a frame every
//! `data:` line carries one JSON payload. The carry-over buffer is kept as
//! bytes so a read may end anywhere, including inside a UTF-8 sequence.

use std::collections::VecDeque;
use std::pin::Pin;
use std::task::{Context, Poll};

use futures::Stream;
use serde_json::Value;
use wizard_types::{
    event::{ProgressStage, StreamEvent},
    Result,
};

const FIELD_MARKER: &str = "data:";
const DONE_SENTINEL: &str = "[DONE]";

/// Push decoder: feed raw deltas, get back every event completed so far.
#[derive(Debug, Default)]
pub struct FrameDecoder {
    buffer: Vec<u8>,
    /// Prefix of `buffer` already known to hold no complete delimiter
    scanned: usize,
}

impl FrameDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a delta and decode all frames it completes.
    pub fn feed(&mut self, delta: &[u8]) -> Vec<StreamEvent> {
        self.buffer.extend_from_slice(delta);

        let mut events = Vec::new();
        loop {
            // A delimiter is at most 4 bytes, so only the last 3 scanned
            // bytes can start one that this delta completes.
            let from = self.scanned.saturating_sub(3);
            let Some((pos, delim_len)) = find_frame_boundary(&self.buffer[from..]) else {
                self.scanned = self.buffer.len();
                break;
            };
            let frame: Vec<u8> = self.buffer.drain(..from + pos).collect();
            self.buffer.drain(..delim_len);
            self.scanned = 0;
            decode_frame(&String::from_utf8_lossy(&frame), &mut events);
        }
        events
    }

    /// Decode whatever is left once the stream has ended.
    /// A whitespace-only residual yields nothing.
    pub fn finish(&mut self) -> Vec<StreamEvent> {
        let residual = std::mem::take(&mut self.buffer);
        self.scanned = 0;
        let mut events = Vec::new();
        if residual.iter().all(|b| b.is_ascii_whitespace()) {
            return events;
        }
        decode_frame(&String::from_utf8_lossy(&residual), &mut events);
        events
    }

    /// Bytes waiting for a frame boundary.
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }
}

/// Decode a complete body in one go.
pub fn decode_all(body: &[u8]) -> Vec<StreamEvent> {
    let mut decoder = FrameDecoder::new();
    let mut events = decoder.feed(body);
    events.extend(decoder.finish());
    events
}

/// Lazy event stream over a byte stream.
///
/// Yields `Err` only for read failures of the underlying stream; malformed
/// payloads are dropped and protocol errors arrive as [`StreamEvent::Error`].
pub struct FrameStream<S> {
    inner: S,
    decoder: FrameDecoder,
    pending: VecDeque<StreamEvent>,
    finished: bool,
}

impl<S> FrameStream<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            decoder: FrameDecoder::new(),
            pending: VecDeque::new(),
            finished: false,
        }
    }
}

impl<S, B> Stream for FrameStream<S>
where
    S: Stream<Item = Result<B>> + Unpin,
    B: AsRef<[u8]>,
{
    type Item = Result<StreamEvent>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        loop {
            if let Some(event) = self.pending.pop_front() {
                return Poll::Ready(Some(Ok(event)));
            }
            if self.finished {
                return Poll::Ready(None);
            }

            match Pin::new(&mut self.inner).poll_next(cx) {
                Poll::Ready(Some(Ok(bytes))) => {
                    let events = self.decoder.feed(bytes.as_ref());
                    self.pending.extend(events);
                }
                Poll::Ready(Some(Err(e))) => return Poll::Ready(Some(Err(e))),
                Poll::Ready(None) => {
                    self.finished = true;
                    let events = self.decoder.finish();
                    self.pending.extend(events);
                }
                Poll::Pending => return Poll::Pending,
            }
        }
    }
}

/// Position and length of the first blank-line delimiter.
fn find_frame_boundary(buffer: &[u8]) -> Option<(usize, usize)> {
    let crlf_pos = buffer.windows(4).position(|w| w == b"\r\n\r\n");
    let lf_pos = buffer.windows(2).position(|w| w == b"\n\n");

    match (crlf_pos, lf_pos) {
        (Some(c), Some(l)) => {
            if l <= c {
                Some((l, 2))
            } else {
                Some((c, 4))
            }
        }
        (Some(c), None) => Some((c, 4)),
        (None, Some(l)) => Some((l, 2)),
        (None, None) => None,
    }
}

fn decode_frame(frame: &str, events: &mut Vec<StreamEvent>) {
    for line in frame.lines() {
        let Some(rest) = line.strip_prefix(FIELD_MARKER) else {
            continue;
        };
        let payload = rest.strip_prefix(' ').unwrap_or(rest).trim();
        if payload.is_empty() || payload == DONE_SENTINEL {
            continue;
        }

        match serde_json::from_str::<Value>(payload) {
            Ok(value) => {
                if let Some(event) = classify(value) {
                    events.push(event);
                }
            }
            Err(e) => log::debug!("Dropping malformed frame payload: {}", e),
        }
    }
}

fn classify(value: Value) -> Option<StreamEvent> {
    let tag = value.get("type").and_then(Value::as_str).map(str::to_owned);

    if let Some(tag) = tag.as_deref() {
        if tag == "error" {
            let message = value
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("Unknown error")
                .to_string();
            return Some(StreamEvent::Error { message });
        }
        if let Some(stage) = ProgressStage::from_type(tag) {
            return Some(StreamEvent::Progress { stage, payload: value });
        }
    }

    let text = value.get("chunk")?.as_str()?.to_string();
    let done = value.get("done").and_then(Value::as_bool).unwrap_or(false);
    Some(StreamEvent::Chunk { text, done })
}
