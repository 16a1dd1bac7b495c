use super::protocol::DONE_SENTINEL;

/// One decoded unit of a streamed response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SseEvent {
    /// Raw payload of a `data: ` line. Not yet parsed as JSON; the caller
    /// decides what an unparseable payload means.
    Data(String),
    /// The `[DONE]` sentinel: the stream ended on purpose.
    Done,
}

/// Incremental decoder for blank-line-delimited event streams.
///
/// Records are separated by a blank line in either newline convention,
/// and a delimiter (or a multi-byte character) may straddle two reads, so
/// the decoder buffers raw bytes and only cuts a record once its trailing
/// delimiter has fully arrived. The trailing partial fragment waits for
/// the next `feed`.
#[derive(Debug, Default)]
pub struct SseDecoder {
    buf: Vec<u8>,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a chunk of raw bytes and decode every complete record.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<SseEvent> {
        self.buf.extend_from_slice(chunk);
        let mut events = Vec::new();
        while let Some(record) = self.take_record() {
            decode_record(&record, &mut events);
        }
        events
    }

    /// Flush after the underlying read loop has finished: whatever is
    /// left in the buffer is a complete record that simply never got its
    /// trailing delimiter.
    pub fn finish(&mut self) -> Vec<SseEvent> {
        let mut events = Vec::new();
        while let Some(record) = self.take_record() {
            decode_record(&record, &mut events);
        }
        if !self.buf.is_empty() {
            let rest = std::mem::take(&mut self.buf);
            decode_record(&rest, &mut events);
        }
        events
    }

    /// Cut the next delimiter-terminated record off the front of the
    /// buffer. Accepts `\n\n`, `\r\n\r\n`, and the mixed variants.
    fn take_record(&mut self) -> Option<Vec<u8>> {
        let (start, len) = find_delimiter(&self.buf)?;
        let record = self.buf[..start].to_vec();
        self.buf.drain(..start + len);
        Some(record)
    }
}

/// Position and length of the earliest blank-line delimiter, if complete.
fn find_delimiter(buf: &[u8]) -> Option<(usize, usize)> {
    // Longest pattern first so "\r\n\r\n" is not consumed as "\r\n\n".
    const PATTERNS: [&[u8]; 4] = [b"\r\n\r\n", b"\r\n\n", b"\n\r\n", b"\n\n"];
    for i in 0..buf.len() {
        for pattern in PATTERNS {
            if buf[i..].starts_with(pattern) {
                return Some((i, pattern.len()));
            }
        }
    }
    None
}

/// Extract payloads from one record: only `data: ` lines carry data,
/// empty payloads are skipped, and the sentinel terminates the stream.
fn decode_record(record: &[u8], events: &mut Vec<SseEvent>) {
    let text = String::from_utf8_lossy(record);
    for line in text.lines() {
        let Some(payload) = line.strip_prefix("data: ") else {
            continue;
        };
        let payload = payload.trim();
        if payload.is_empty() {
            continue;
        }
        if payload == DONE_SENTINEL {
            events.push(SseEvent::Done);
        } else {
            events.push(SseEvent::Data(payload.to_string()));
        }
    }
}
