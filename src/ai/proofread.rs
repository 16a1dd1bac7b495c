use std::sync::mpsc::Sender;
use std::thread;

use regex_lite::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::app::messages::Message;
use crate::net::client::{CancelToken, StreamingClient};
use crate::net::protocol::ChatMessage;

use super::RequestId;

const SYSTEM_PROMPT: &str = "You are a Markdown grammar and spelling checker. \
Return a strict JSON array where each object is {\"from\", \"to\", \"message\"}; \
from/to are character offsets covering only the misspelled word, never the \
whole sentence. Example: [{\"from\": 5, \"to\": 7, \"message\": \"Typo: should be 'weather'\"}]. \
Return only JSON, with no commentary and no backticks.";

/// One candidate error range, with offsets into the text as it existed
/// when the request was issued.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProofreadError {
    #[serde(default)]
    pub from: usize,
    #[serde(default)]
    pub to: usize,
    pub message: String,
}

struct InFlight {
    id: RequestId,
    cancel: CancelToken,
}

/// Owns at most one in-flight proofreading request and the published
/// error list.
///
/// Starting a new request cancels the prior token, but transport-level
/// cancellation can lose the race with a result that is already queued,
/// so every result handler re-checks the request id before touching
/// published state. That check is the authoritative guard.
pub struct ProofreadCoordinator {
    client: StreamingClient,
    sender: Sender<Message>,
    current: Option<InFlight>,
    next_request: u64,
    errors: Vec<ProofreadError>,
}

impl ProofreadCoordinator {
    pub fn new(client: StreamingClient, sender: Sender<Message>) -> Self {
        Self {
            client,
            sender,
            current: None,
            next_request: 0,
            errors: Vec::new(),
        }
    }

    /// Issue a proofread of `text`, superseding any in-flight request.
    pub fn request(&mut self, text: String) -> RequestId {
        if let Some(prior) = self.current.take() {
            prior.cancel.cancel();
        }

        self.next_request += 1;
        let id = RequestId(self.next_request);
        let cancel = CancelToken::new();
        self.current = Some(InFlight { id, cancel: cancel.clone() });

        let client = self.client.clone();
        let sender = self.sender.clone();
        thread::spawn(move || {
            let messages = proofread_messages(&text);
            let outcome = client.complete(&messages).map_err(|e| e.to_string());
            if cancel.is_cancelled() {
                // Cancellation is silent, not an error.
                return;
            }
            let _ = sender.send(Message::ProofreadFinished { request: id, outcome });
        });
        id
    }

    /// Drop any in-flight request without issuing a new one.
    pub fn cancel(&mut self) {
        if let Some(prior) = self.current.take() {
            prior.cancel.cancel();
        }
    }

    /// Apply a finished request. `buffer_len` is the live buffer length at
    /// publication time, which may differ from the length at request time.
    /// Returns true when the published list changed.
    pub fn handle_finished(
        &mut self,
        request: RequestId,
        outcome: Result<String, String>,
        buffer_len: usize,
    ) -> bool {
        if self.current.as_ref().map(|c| c.id) != Some(request) {
            // Superseded or cancelled: discard without comment.
            return false;
        }
        self.current = None;

        match outcome {
            Ok(content) => {
                let mut errors = parse_error_list(&content);
                clamp_errors(&mut errors, buffer_len);
                self.errors = errors;
                true
            }
            Err(e) => {
                log::warn!("Proofread cycle failed: {}", e);
                false
            }
        }
    }

    pub fn errors(&self) -> &[ProofreadError] {
        &self.errors
    }

    pub fn has_in_flight(&self) -> bool {
        self.current.is_some()
    }
}

fn proofread_messages(text: &str) -> Vec<ChatMessage> {
    vec![
        ChatMessage::system(SYSTEM_PROMPT),
        ChatMessage::user(format!(
            "Check the following Markdown text for spelling and grammar errors. \
Report exact character ranges for each specific word, not whole sentences.\n\n{}",
            text
        )),
    ]
}

/// Parse the model's answer into error ranges, degrading to a single
/// unranged note when nothing parses. Never fails.
pub fn parse_error_list(content: &str) -> Vec<ProofreadError> {
    parse_shapes(content).unwrap_or_else(|| {
        vec![ProofreadError {
            from: 0,
            to: 0,
            message: content.to_string(),
        }]
    })
}

fn parse_shapes(content: &str) -> Option<Vec<ProofreadError>> {
    let stripped = strip_code_fences(content);
    let value: Value = serde_json::from_str(stripped.trim()).ok()?;
    extract_errors(&value, 0)
}

/// The tolerated payload shapes, tried recursively:
/// - a direct array of {from, to, message} objects;
/// - a JSON string (possibly code-fenced) containing either shape;
/// - a one-element array whose single object's `message` holds either
///   shape.
fn extract_errors(value: &Value, depth: usize) -> Option<Vec<ProofreadError>> {
    if depth > 4 {
        return None;
    }
    match value {
        Value::String(s) => {
            let stripped = strip_code_fences(s);
            let inner: Value = serde_json::from_str(stripped.trim()).ok()?;
            extract_errors(&inner, depth + 1)
        }
        Value::Array(items) => {
            if items.len() == 1 {
                let only = &items[0];
                let has_range = only.get("from").is_some() || only.get("to").is_some();
                if !has_range {
                    if let Some(message) = only.get("message").and_then(Value::as_str) {
                        let nested = Value::String(message.to_string());
                        if let Some(errors) = extract_errors(&nested, depth + 1) {
                            return Some(errors);
                        }
                    }
                }
            }
            let mut out = Vec::with_capacity(items.len());
            for item in items {
                let err: ProofreadError = serde_json::from_value(item.clone()).ok()?;
                out.push(err);
            }
            Some(out)
        }
        _ => None,
    }
}

fn strip_code_fences(text: &str) -> String {
    let re = Regex::new(r"```(json)?").unwrap();
    re.replace_all(text, "").trim().to_string()
}

/// Constrain every range to `[0, buffer_len]`; a range inverted by
/// clamping collapses to an empty range at `from` instead of being
/// rejected.
fn clamp_errors(errors: &mut [ProofreadError], buffer_len: usize) {
    for err in errors {
        err.from = err.from.min(buffer_len);
        err.to = err.to.min(buffer_len);
        if err.from > err.to {
            err.to = err.from;
        }
    }
}
