/// The editable text surface the core coordinates with.
///
/// The real editor widget lives outside this crate; the core only needs to
/// read the current text, measure it, and apply positional edits. Offsets
/// are character indices, matching the offsets the annotator returns.
pub trait TextBuffer {
    /// Full buffer contents as an owned String.
    fn text(&self) -> String;

    /// Buffer length in characters.
    fn len_chars(&self) -> usize;

    /// Replace the character range `[from, to)` with `text`. Out-of-range
    /// offsets are clamped to the buffer end.
    fn replace(&mut self, from: usize, to: usize, text: &str);
}

/// Plain in-memory buffer, used by tests and headless hosts.
#[derive(Debug, Default, Clone)]
pub struct MemoryBuffer {
    text: String,
}

impl MemoryBuffer {
    pub fn new(text: &str) -> Self {
        Self { text: text.to_string() }
    }

    pub fn set_text(&mut self, text: &str) {
        self.text = text.to_string();
    }

    fn byte_at_char(&self, char_idx: usize) -> usize {
        self.text
            .char_indices()
            .nth(char_idx)
            .map(|(b, _)| b)
            .unwrap_or(self.text.len())
    }
}

impl TextBuffer for MemoryBuffer {
    fn text(&self) -> String {
        self.text.clone()
    }

    fn len_chars(&self) -> usize {
        self.text.chars().count()
    }

    fn replace(&mut self, from: usize, to: usize, text: &str) {
        let len = self.len_chars();
        let from = from.min(len);
        let to = to.max(from).min(len);
        let start = self.byte_at_char(from);
        let end = self.byte_at_char(to);
        self.text.replace_range(start..end, text);
    }
}
