use std::io::Read;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::app::error::{AppError, Result};

use super::protocol::{ChatMessage, ChatRequest, Completion, StreamChunk};
use super::sse::{SseDecoder, SseEvent};
use super::transport::Transport;

/// Cooperative cancellation flag shared between the issuing side and the
/// worker reading the response.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// One request per call against the chat-completions endpoint, exposed
/// either as a single parsed answer or as an ordered stream of deltas.
#[derive(Clone)]
pub struct StreamingClient {
    transport: Arc<dyn Transport>,
    endpoint: String,
    model: String,
}

impl StreamingClient {
    pub fn new(transport: Arc<dyn Transport>, endpoint: String, model: String) -> Self {
        Self { transport, endpoint, model }
    }

    /// Single-shot completion: returns the answer content of the first
    /// choice, or a structural error for non-success statuses.
    pub fn complete(&self, messages: &[ChatMessage]) -> Result<String> {
        let request = ChatRequest { model: &self.model, messages, stream: false };
        let body = serde_json::to_string(&request)?;
        let mut response = self.transport.post(&self.endpoint, &body)?;
        if !(200..300).contains(&response.status) {
            return Err(AppError::Status(response.status));
        }

        let mut text = String::new();
        response.body.read_to_string(&mut text)?;
        let completion: Completion = serde_json::from_str(&text)?;
        completion
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or_else(|| AppError::Response("no choices in completion".to_string()))
    }

    /// Streamed completion: decodes delimited frames as they arrive,
    /// forwarding each delta to `on_delta`, and returns the accumulated
    /// text. Once `cancel` fires no further read happens and `on_delta`
    /// is never invoked again; the connection drops with the body.
    pub fn stream(
        &self,
        messages: &[ChatMessage],
        cancel: &CancelToken,
        on_delta: &mut dyn FnMut(&str),
    ) -> Result<String> {
        let request = ChatRequest { model: &self.model, messages, stream: true };
        let body = serde_json::to_string(&request)?;
        let mut response = self.transport.post(&self.endpoint, &body)?;
        if !(200..300).contains(&response.status) {
            return Err(AppError::Status(response.status));
        }

        let mut decoder = SseDecoder::new();
        let mut accumulated = String::new();
        let mut chunk = [0u8; 4096];
        let mut done = false;

        while !done {
            if cancel.is_cancelled() {
                return Ok(accumulated);
            }
            let n = response.body.read(&mut chunk)?;
            if n == 0 {
                break;
            }
            for event in decoder.feed(&chunk[..n]) {
                if apply_event(event, &mut accumulated, on_delta) {
                    done = true;
                }
            }
        }

        if !done {
            // One more extraction pass for a final record the transport
            // never terminated with a delimiter.
            for event in decoder.finish() {
                if apply_event(event, &mut accumulated, on_delta) {
                    break;
                }
            }
        }

        Ok(accumulated)
    }
}

/// Returns true when the sentinel ended the stream. A payload that fails
/// to parse as JSON is a heartbeat, not an error.
fn apply_event(
    event: SseEvent,
    accumulated: &mut String,
    on_delta: &mut dyn FnMut(&str),
) -> bool {
    match event {
        SseEvent::Done => true,
        SseEvent::Data(payload) => {
            if let Ok(frame) = serde_json::from_str::<StreamChunk>(&payload) {
                let piece = frame
                    .choices
                    .into_iter()
                    .next()
                    .and_then(|choice| choice.delta.content);
                if let Some(piece) = piece {
                    if !piece.is_empty() {
                        accumulated.push_str(&piece);
                        on_delta(&piece);
                    }
                }
            }
            false
        }
    }
}
