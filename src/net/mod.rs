//! Network layer: the transport seam, the stream framing, and the
//! chat-completions client built on top of them.

pub mod client;
pub mod protocol;
pub mod sse;
pub mod transport;

pub use client::{CancelToken, StreamingClient};
pub use protocol::{ChatMessage, DONE_SENTINEL};
pub use sse::{SseDecoder, SseEvent};
pub use transport::{HttpTransport, Transport, TransportResponse};
