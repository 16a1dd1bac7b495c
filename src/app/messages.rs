use crate::ai::RequestId;

/// All messages background workers send back through the app channel.
/// Network I/O happens off the main thread; the dispatch loop applies
/// these in arrival order, so core state is only ever touched from one
/// thread.
///
/// Failures travel as display strings so the message stays Clone and the
/// channel stays cheap; the coordinators only log them.
#[derive(Debug, Clone)]
pub enum Message {
    /// Proofread round-trip ended with the model's raw answer content.
    ProofreadFinished {
        request: RequestId,
        outcome: Result<String, String>,
    },

    /// One streamed delta of an assistant generation.
    AssistantDelta { request: RequestId, text: String },

    /// Assistant generation ended with the full accumulated text.
    AssistantFinished {
        request: RequestId,
        outcome: Result<String, String>,
    },
}
