/// Which logical page the UI is showing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewMode {
    FileList,
    Editor,
    Assistant,
}

/// Session-scoped view history with browser-style back/forward semantics.
/// Never persisted; every session starts on the file list.
pub struct NavStack {
    stack: Vec<ViewMode>,
    index: usize,
}

impl NavStack {
    pub fn new() -> Self {
        Self {
            stack: vec![ViewMode::FileList],
            index: 0,
        }
    }

    pub fn current(&self) -> ViewMode {
        self.stack[self.index]
    }

    pub fn len(&self) -> usize {
        self.stack.len()
    }

    pub fn is_empty(&self) -> bool {
        false // the stack always holds at least the initial entry
    }

    /// Navigate to `mode`. Jumping from the middle of the history discards
    /// the abandoned forward entries; navigating to the mode already on top
    /// moves nothing.
    pub fn navigate_to(&mut self, mode: ViewMode) {
        self.stack.truncate(self.index + 1);
        if *self.stack.last().unwrap_or(&ViewMode::FileList) != mode {
            self.stack.push(mode);
        }
        self.index = self.stack.len() - 1;
    }

    /// Step back one entry; no-op at the oldest entry.
    pub fn back(&mut self) {
        if self.index > 0 {
            self.index -= 1;
        }
    }

    /// Step forward one entry; no-op at the newest entry.
    pub fn forward(&mut self) {
        if self.index + 1 < self.stack.len() {
            self.index += 1;
        }
    }
}

impl Default for NavStack {
    fn default() -> Self {
        Self::new()
    }
}
