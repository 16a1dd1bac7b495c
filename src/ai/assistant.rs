use std::sync::mpsc::Sender;
use std::thread;

use crate::app::messages::Message;
use crate::net::client::{CancelToken, StreamingClient};
use crate::net::protocol::ChatMessage;

use super::RequestId;

const SYSTEM_PROMPT: &str = "You are a Markdown writing assistant. Always \
answer with well-structured Markdown.";

struct InFlight {
    id: RequestId,
    cancel: CancelToken,
}

/// Streaming generation chat: at most one generation in flight, deltas
/// accumulated into a pending assistant turn, final text handed back for
/// appending to the active document.
///
/// Shares the proofread coordinator's staleness discipline: the request
/// id check on every delta and result is what actually protects the
/// transcript from a superseded stream.
pub struct AssistantCoordinator {
    client: StreamingClient,
    sender: Sender<Message>,
    current: Option<InFlight>,
    next_request: u64,
    transcript: Vec<ChatMessage>,
    streaming: Option<String>,
}

impl AssistantCoordinator {
    pub fn new(client: StreamingClient, sender: Sender<Message>) -> Self {
        Self {
            client,
            sender,
            current: None,
            next_request: 0,
            transcript: Vec::new(),
            streaming: None,
        }
    }

    /// Start generating markdown for `topic`, superseding any in-flight
    /// generation. The raw topic joins the transcript; the request wraps
    /// it in a structured prompt.
    pub fn request_generate(&mut self, topic: &str) -> RequestId {
        if let Some(prior) = self.current.take() {
            prior.cancel.cancel();
        }

        self.next_request += 1;
        let id = RequestId(self.next_request);
        let cancel = CancelToken::new();
        self.current = Some(InFlight { id, cancel: cancel.clone() });

        let mut messages = vec![ChatMessage::system(SYSTEM_PROMPT)];
        messages.extend(self.transcript.iter().cloned());
        messages.push(ChatMessage::user(format!(
            "Write structured Markdown on the topic \"{}\": include first and \
second level headings, bullet points, a code example where it fits, and a \
closing summary.",
            topic.trim()
        )));

        self.transcript.push(ChatMessage::user(topic.trim()));
        self.streaming = Some(String::new());

        let client = self.client.clone();
        let sender = self.sender.clone();
        let delta_sender = self.sender.clone();
        let delta_cancel = cancel.clone();
        thread::spawn(move || {
            let outcome = client
                .stream(&messages, &cancel, &mut |delta| {
                    let _ = delta_sender.send(Message::AssistantDelta {
                        request: id,
                        text: delta.to_string(),
                    });
                })
                .map_err(|e| e.to_string());
            if delta_cancel.is_cancelled() {
                return;
            }
            let _ = sender.send(Message::AssistantFinished { request: id, outcome });
        });
        id
    }

    /// Append one streamed delta to the pending turn, if still current.
    pub fn apply_delta(&mut self, request: RequestId, text: &str) {
        if self.current.as_ref().map(|c| c.id) != Some(request) {
            return;
        }
        if let Some(pending) = self.streaming.as_mut() {
            pending.push_str(text);
        }
    }

    /// Finish the generation. Returns the full text for the caller to
    /// append to the active document, or None when the result was stale,
    /// failed, or empty.
    pub fn handle_finished(
        &mut self,
        request: RequestId,
        outcome: Result<String, String>,
    ) -> Option<String> {
        if self.current.as_ref().map(|c| c.id) != Some(request) {
            return None;
        }
        self.current = None;
        self.streaming = None;

        match outcome {
            Ok(full) if !full.is_empty() => {
                self.transcript.push(ChatMessage::assistant(full.clone()));
                Some(full)
            }
            Ok(_) => None,
            Err(e) => {
                log::warn!("Assistant generation failed: {}", e);
                None
            }
        }
    }

    pub fn transcript(&self) -> &[ChatMessage] {
        &self.transcript
    }

    /// Partially streamed text of the in-flight generation, for live
    /// rendering.
    pub fn streaming_text(&self) -> Option<&str> {
        self.streaming.as_deref()
    }

    pub fn has_in_flight(&self) -> bool {
        self.current.is_some()
    }
}
