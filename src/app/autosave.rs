use std::time::{Duration, Instant};

/// User-facing save indicator: flips to Editing on every edit, back to
/// Saved only after a successful persist.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveStatus {
    Saved,
    Editing,
}

/// What the pipeline wants done at a given tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AutosaveDue {
    /// Coalesce window elapsed: commit the buffer text to the store.
    pub commit: bool,
    /// Idle window elapsed: persist and start a proofread cycle.
    pub idle: bool,
}

/// Debounces buffer mutations into store commits and idle autosaves.
///
/// Two independent deadlines, both re-armed on every edit:
/// - the coalesce window suppresses redundant store commits while
///   keystrokes arrive in bursts;
/// - the idle window waits for the user to pause before persisting and
///   proofreading.
///
/// The pipeline never sleeps. The host pumps `poll(now)` from its event
/// loop and acts on whatever came due, which keeps the timing logic fully
/// deterministic under test.
pub struct AutosavePipeline {
    coalesce_window: Duration,
    idle_window: Duration,
    coalesce_deadline: Option<Instant>,
    idle_deadline: Option<Instant>,
    status: SaveStatus,
}

impl AutosavePipeline {
    pub fn new(coalesce_ms: u64, idle_ms: u64) -> Self {
        Self {
            coalesce_window: Duration::from_millis(coalesce_ms),
            idle_window: Duration::from_millis(idle_ms),
            coalesce_deadline: None,
            idle_deadline: None,
            status: SaveStatus::Saved,
        }
    }

    /// Record a buffer mutation: re-arm both deadlines, mark Editing.
    pub fn note_edit(&mut self, now: Instant) {
        self.status = SaveStatus::Editing;
        self.coalesce_deadline = Some(now + self.coalesce_window);
        self.idle_deadline = Some(now + self.idle_window);
    }

    /// Fire any elapsed deadline. Each deadline fires at most once per
    /// arming.
    pub fn poll(&mut self, now: Instant) -> AutosaveDue {
        let mut due = AutosaveDue::default();
        if self.coalesce_deadline.is_some_and(|d| d <= now) {
            self.coalesce_deadline = None;
            due.commit = true;
        }
        if self.idle_deadline.is_some_and(|d| d <= now) {
            self.idle_deadline = None;
            due.idle = true;
        }
        due
    }

    /// Called after a successful persist (idle or manual). Leaves the idle
    /// deadline alone: a manual save must not disturb the idle schedule.
    pub fn mark_saved(&mut self) {
        self.status = SaveStatus::Saved;
    }

    /// Flip to Editing without touching the deadlines. Used when content
    /// changes outside the keystroke path, e.g. appended generated text
    /// that the caller persists on its own schedule.
    pub fn mark_editing(&mut self) {
        self.status = SaveStatus::Editing;
    }

    /// A pending coalesced commit that has not fired yet.
    pub fn commit_pending(&self) -> bool {
        self.coalesce_deadline.is_some()
    }

    pub fn status(&self) -> SaveStatus {
        self.status
    }
}
