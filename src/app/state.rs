use std::cell::RefCell;
use std::ops::Range;
use std::rc::Rc;
use std::sync::Arc;
use std::sync::mpsc::Sender;
use std::time::Instant;

use crate::ai::{AssistantCoordinator, DecorationProjector, Mark, ProofreadCoordinator};
use crate::net::client::StreamingClient;
use crate::net::transport::Transport;

use super::autosave::{AutosavePipeline, SaveStatus};
use super::buffer::TextBuffer;
use super::config::AppConfig;
use super::document::FileId;
use super::file_store::FileStore;
use super::messages::Message;
use super::navigation::{NavStack, ViewMode};
use super::storage::Storage;

/// The application core: owns every subsystem and wires them together.
///
/// Single-threaded by construction. The host drives it with three calls:
/// user actions as direct methods, `tick(now)` from its event loop, and
/// `handle(msg)` for whatever the background workers sent back. Nothing
/// here blocks.
pub struct App {
    config: AppConfig,
    store: FileStore,
    nav: NavStack,
    autosave: AutosavePipeline,
    proofread: ProofreadCoordinator,
    assistant: AssistantCoordinator,
    decorations: DecorationProjector,
    buffer: Option<Rc<RefCell<dyn TextBuffer>>>,
}

impl App {
    pub fn new(
        config: AppConfig,
        storage: Box<dyn Storage>,
        transport: Arc<dyn Transport>,
        sender: Sender<Message>,
    ) -> Self {
        let client = StreamingClient::new(
            transport,
            config.endpoint.clone(),
            config.model.clone(),
        );
        let mut store = FileStore::new(storage);
        if let Err(e) = store.load() {
            log::warn!("Failed to load documents, starting empty: {}", e);
        }
        let autosave = AutosavePipeline::new(config.edit_coalesce_ms, config.idle_autosave_ms);
        Self {
            config,
            store,
            nav: NavStack::new(),
            autosave,
            proofread: ProofreadCoordinator::new(client.clone(), sender.clone()),
            assistant: AssistantCoordinator::new(client, sender),
            decorations: DecorationProjector::new(),
            buffer: None,
        }
    }

    /// Attach the host's editor buffer. Until a buffer is bound, commits
    /// and length queries fall back to the stored document content.
    pub fn bind_buffer(&mut self, buffer: Rc<RefCell<dyn TextBuffer>>) {
        self.buffer = Some(buffer);
    }

    // -- user actions ------------------------------------------------------

    /// Create an untitled document and open it in the editor.
    pub fn create_document(&mut self) -> FileId {
        let id = self.store.create_document();
        self.nav.navigate_to(ViewMode::Editor);
        id
    }

    /// Open an existing document in the editor. Unknown ids do nothing.
    pub fn enter_file(&mut self, id: FileId) {
        if self.store.file_by_id(id).is_none() {
            return;
        }
        self.store.set_active(id);
        self.nav.navigate_to(ViewMode::Editor);
    }

    pub fn delete_document(&mut self, id: FileId) {
        self.store.delete_document(id);
    }

    pub fn rename_document(&mut self, id: FileId, new_name: &str) {
        self.store.rename(id, new_name);
    }

    pub fn open_file_list(&mut self) {
        self.nav.navigate_to(ViewMode::FileList);
    }

    pub fn open_assistant(&mut self) {
        self.nav.navigate_to(ViewMode::Assistant);
    }

    pub fn navigate_back(&mut self) {
        self.nav.back();
    }

    pub fn navigate_forward(&mut self) {
        self.nav.forward();
    }

    /// The host calls this on every buffer mutation. Edits without an
    /// active document have nowhere to go and are ignored.
    pub fn on_buffer_modified(&mut self, now: Instant) {
        if self.store.current_file_id().is_some() {
            self.autosave.note_edit(now);
        }
    }

    /// Explicit save: commit the buffer, persist, clear the indicator.
    pub fn manual_save(&mut self) {
        self.commit_buffer();
        match self.store.persist() {
            Ok(()) => self.autosave.mark_saved(),
            Err(e) => log::warn!("Manual save failed: {}", e),
        }
    }

    /// Ask the assistant to generate markdown on `topic`; the result is
    /// appended to the active document when it arrives.
    pub fn ask_assistant(&mut self, topic: &str) {
        self.assistant.request_generate(topic);
    }

    // -- event loop --------------------------------------------------------

    /// Pump the autosave pipeline. The host calls this from its event loop
    /// with the current time.
    pub fn tick(&mut self, now: Instant) {
        let due = self.autosave.poll(now);
        if due.commit {
            self.commit_buffer();
        }
        if due.idle {
            self.idle_save();
        }
    }

    /// Apply one background-worker message.
    pub fn handle(&mut self, msg: Message) {
        match msg {
            Message::ProofreadFinished { request, outcome } => {
                let len = self.buffer_len();
                self.proofread.handle_finished(request, outcome, len);
            }
            Message::AssistantDelta { request, text } => {
                self.assistant.apply_delta(request, &text);
            }
            Message::AssistantFinished { request, outcome } => {
                if let Some(full) = self.assistant.handle_finished(request, outcome) {
                    self.append_generated(&full);
                }
            }
        }
    }

    fn commit_buffer(&mut self) {
        let Some(id) = self.store.current_file_id() else {
            return;
        };
        let Some(buf) = self.buffer.as_ref() else {
            return;
        };
        let text = buf.borrow().text();
        self.store.mutate_content(id, &text);
    }

    /// Idle autosave: persist, then start a proofread cycle over the
    /// saved content. A failed persist leaves the indicator on Editing so
    /// unsaved work stays visible.
    fn idle_save(&mut self) {
        self.commit_buffer();
        match self.store.persist() {
            Ok(()) => self.autosave.mark_saved(),
            Err(e) => {
                log::warn!("Autosave failed: {}", e);
                return;
            }
        }
        if !self.config.proofread_enabled {
            return;
        }
        if let Some(doc) = self.store.current_file() {
            let content = doc.content.clone();
            if !content.is_empty() {
                self.proofread.request(content);
            }
        }
    }

    /// Append generated text to the active document and its bound buffer,
    /// then persist. The indicator lands on Editing either way: appended
    /// generation counts as an edit the user has not reviewed yet.
    fn append_generated(&mut self, full: &str) {
        let Some(doc) = self.store.current_file() else {
            return;
        };
        let id = doc.id;
        let suffix = format!("\n\n{}", full);
        let new_content = format!("{}{}", doc.content, suffix);
        self.store.mutate_content(id, &new_content);
        if let Some(buf) = self.buffer.as_ref() {
            let mut buf = buf.borrow_mut();
            let end = buf.len_chars();
            buf.replace(end, end, &suffix);
        }
        if let Err(e) = self.store.persist() {
            log::warn!("Failed to persist generated text: {}", e);
        }
        self.autosave.mark_editing();
    }

    // -- queries -----------------------------------------------------------

    /// Marks for the visible range, projected from the published errors.
    pub fn marks(&mut self, viewport: Range<usize>) -> &[Mark] {
        let errors = self.proofread.errors();
        self.decorations.project(errors, viewport)
    }

    /// Live length in characters: the bound buffer when present, else the
    /// active document's stored content.
    pub fn buffer_len(&self) -> usize {
        if let Some(buf) = self.buffer.as_ref() {
            return buf.borrow().len_chars();
        }
        self.store
            .current_file()
            .map(|d| d.content.chars().count())
            .unwrap_or(0)
    }

    pub fn current_view(&self) -> ViewMode {
        self.nav.current()
    }

    pub fn save_status(&self) -> SaveStatus {
        self.autosave.status()
    }

    pub fn store(&self) -> &FileStore {
        &self.store
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn assistant(&self) -> &AssistantCoordinator {
        &self.assistant
    }

    pub fn proofread_errors(&self) -> &[crate::ai::ProofreadError] {
        self.proofread.errors()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::buffer::MemoryBuffer;
    use crate::app::error::Result;
    use crate::net::transport::TransportResponse;
    use std::collections::VecDeque;
    use std::io::Cursor;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Mutex, mpsc};
    use std::time::Duration;

    /// Storage fake counting writes, shared with the test body.
    #[derive(Default)]
    struct CountingStorage {
        writes: Arc<AtomicUsize>,
        blob: Arc<Mutex<Option<String>>>,
    }

    impl Storage for CountingStorage {
        fn load(&self) -> Result<Option<String>> {
            Ok(self.blob.lock().unwrap().clone())
        }

        fn store(&self, payload: &str) -> Result<()> {
            self.writes.fetch_add(1, Ordering::SeqCst);
            *self.blob.lock().unwrap() = Some(payload.to_string());
            Ok(())
        }
    }

    /// Storage fake that starts failing after a fixed number of writes.
    struct FlakyStorage {
        fail_after: usize,
        writes: Arc<AtomicUsize>,
    }

    impl Storage for FlakyStorage {
        fn load(&self) -> Result<Option<String>> {
            Ok(None)
        }

        fn store(&self, _payload: &str) -> Result<()> {
            let n = self.writes.fetch_add(1, Ordering::SeqCst);
            if n >= self.fail_after {
                return Err(std::io::Error::other("disk full").into());
            }
            Ok(())
        }
    }

    /// Transport fake answering each post with the next scripted body,
    /// recording request bodies as they arrive. Keyed responses match on a
    /// request substring so concurrent workers cannot swap answers.
    struct ScriptedTransport {
        responses: Mutex<VecDeque<String>>,
        keyed: Vec<(String, String)>,
        requests: Mutex<Vec<String>>,
        gate: Option<Mutex<mpsc::Receiver<()>>>,
    }

    impl ScriptedTransport {
        fn new(responses: &[&str]) -> Self {
            Self {
                responses: Mutex::new(responses.iter().map(|s| s.to_string()).collect()),
                keyed: Vec::new(),
                requests: Mutex::new(Vec::new()),
                gate: None,
            }
        }

        /// Gated variant: every post parks until the test sends one unit
        /// through the returned channel.
        fn gated(keyed: &[(&str, &str)]) -> (Self, mpsc::Sender<()>) {
            let (tx, rx) = mpsc::channel();
            let mut transport = Self::new(&[]);
            transport.keyed = keyed
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect();
            transport.gate = Some(Mutex::new(rx));
            (transport, tx)
        }
    }

    impl Transport for ScriptedTransport {
        fn post(&self, _url: &str, body: &str) -> Result<TransportResponse> {
            self.requests.lock().unwrap().push(body.to_string());
            if let Some(gate) = &self.gate {
                let _ = gate
                    .lock()
                    .unwrap()
                    .recv_timeout(Duration::from_secs(5));
            }
            let response = self
                .keyed
                .iter()
                .find(|(key, _)| body.contains(key))
                .map(|(_, v)| v.clone())
                .or_else(|| self.responses.lock().unwrap().pop_front())
                .unwrap_or_default();
            Ok(TransportResponse {
                status: 200,
                body: Box::new(Cursor::new(response.into_bytes())),
            })
        }
    }

    fn completion_body(content: &str) -> String {
        serde_json::to_string(&serde_json::json!({
            "choices": [{"message": {"role": "assistant", "content": content}}]
        }))
        .unwrap()
    }

    struct Harness {
        app: App,
        rx: mpsc::Receiver<Message>,
        writes: Arc<AtomicUsize>,
        transport: Arc<ScriptedTransport>,
        buffer: Rc<RefCell<MemoryBuffer>>,
    }

    fn harness(transport: ScriptedTransport) -> Harness {
        let (tx, rx) = mpsc::channel();
        let writes = Arc::new(AtomicUsize::new(0));
        let storage = CountingStorage {
            writes: writes.clone(),
            blob: Arc::default(),
        };
        let transport = Arc::new(transport);
        let mut app = App::new(
            AppConfig::default(),
            Box::new(storage),
            transport.clone(),
            tx,
        );
        let buffer = Rc::new(RefCell::new(MemoryBuffer::default()));
        app.bind_buffer(buffer.clone());
        Harness { app, rx, writes, transport, buffer }
    }

    fn type_text(h: &mut Harness, text: &str, now: Instant) {
        let end = h.buffer.borrow().len_chars();
        h.buffer.borrow_mut().replace(end, end, text);
        h.app.on_buffer_modified(now);
    }

    fn pump_one(h: &mut Harness) -> Message {
        let msg = h.rx.recv_timeout(Duration::from_secs(5)).unwrap();
        h.app.handle(msg.clone());
        msg
    }

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[test]
    fn test_typo_flows_from_keystroke_to_mark() {
        let errors_json = r#"[{"from":6,"to":11,"message":"Spelling: Wrold should be World"}]"#;
        let mut h = harness(ScriptedTransport::new(&[&completion_body(errors_json)]));
        let t0 = Instant::now();

        h.app.create_document();
        assert_eq!(h.app.current_view(), ViewMode::Editor);
        assert_eq!(h.writes.load(Ordering::SeqCst), 1);

        type_text(&mut h, "Hello Wrold", t0);
        assert_eq!(h.app.save_status(), SaveStatus::Editing);

        // Coalesce window: content committed to the store, nothing persisted.
        h.app.tick(t0 + ms(300));
        assert_eq!(h.app.store().current_file().unwrap().content, "Hello Wrold");
        assert_eq!(h.writes.load(Ordering::SeqCst), 1);

        // Idle window: exactly one more persist, then a proofread request.
        h.app.tick(t0 + ms(2000));
        assert_eq!(h.writes.load(Ordering::SeqCst), 2);
        assert_eq!(h.app.save_status(), SaveStatus::Saved);

        let msg = pump_one(&mut h);
        assert!(matches!(msg, Message::ProofreadFinished { .. }));

        let requests = h.transport.requests.lock().unwrap();
        assert_eq!(requests.len(), 1);
        assert!(requests[0].contains("Hello Wrold"));
        drop(requests);

        let marks = h.app.marks(0..11);
        assert_eq!(marks.len(), 1);
        assert_eq!((marks[0].from, marks[0].to), (6, 11));
        assert!(marks[0].tooltip.contains("Wrold"));
    }

    #[test]
    fn test_no_idle_save_without_edits() {
        let mut h = harness(ScriptedTransport::new(&[]));
        let t0 = Instant::now();
        h.app.create_document();
        h.app.tick(t0 + ms(10_000));
        // Only the creation persisted; no proofread left the building.
        assert_eq!(h.writes.load(Ordering::SeqCst), 1);
        assert!(h.transport.requests.lock().unwrap().is_empty());
    }

    #[test]
    fn test_superseded_proofread_never_publishes() {
        let stale = completion_body(r#"[{"from":0,"to":5,"message":"stale"}]"#);
        let fresh = completion_body(r#"[{"from":6,"to":11,"message":"fresh"}]"#);
        // "Wrold!" only matches the second request's content.
        let (transport, gate) = ScriptedTransport::gated(&[("Wrold!", fresh.as_str()), ("Wrold", stale.as_str())]);
        let mut h = harness(transport);
        let t0 = Instant::now();

        h.app.create_document();
        type_text(&mut h, "Hello Wrold", t0);
        h.app.tick(t0 + ms(2000)); // first proofread, parked at the gate

        type_text(&mut h, "!", t0 + ms(3000));
        h.app.tick(t0 + ms(5000)); // second proofread supersedes the first

        gate.send(()).unwrap();
        gate.send(()).unwrap();

        // The first worker was cancelled and stays silent; only the second
        // result arrives.
        let msg = h.rx.recv_timeout(Duration::from_secs(5)).unwrap();
        h.app.handle(msg);
        assert!(h.rx.recv_timeout(ms(200)).is_err());

        let errors = h.app.proofread_errors();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].message, "fresh");
    }

    #[test]
    fn test_generated_text_appended_and_persisted() {
        let sse = "data: {\"choices\":[{\"delta\":{\"content\":\"# Notes\\n\\ngenerated\"}}]}\n\ndata: [DONE]\n\n";
        let mut h = harness(ScriptedTransport::new(&[sse]));
        let t0 = Instant::now();

        h.app.create_document();
        type_text(&mut h, "Intro", t0);
        h.app.tick(t0 + ms(300)); // commit "Intro" to the store

        h.app.open_assistant();
        assert_eq!(h.app.current_view(), ViewMode::Assistant);
        h.app.ask_assistant("notes");

        loop {
            let msg = pump_one(&mut h);
            if matches!(msg, Message::AssistantFinished { .. }) {
                break;
            }
        }

        let content = h.app.store().current_file().unwrap().content.clone();
        assert_eq!(content, "Intro\n\n# Notes\n\ngenerated");
        assert_eq!(h.buffer.borrow().text(), "Intro\n\n# Notes\n\ngenerated");
        // Appended generation is unreviewed content, so the indicator
        // lands on Editing even though the snapshot just persisted.
        assert_eq!(h.app.save_status(), SaveStatus::Editing);
        assert_eq!(h.app.assistant().transcript().len(), 2);
    }

    #[test]
    fn test_generated_text_separator_is_unconditional() {
        let sse = "data: {\"choices\":[{\"delta\":{\"content\":\"body\"}}]}\n\ndata: [DONE]\n\n";
        let mut h = harness(ScriptedTransport::new(&[sse]));

        h.app.create_document(); // empty content
        h.app.ask_assistant("topic");
        loop {
            let msg = pump_one(&mut h);
            if matches!(msg, Message::AssistantFinished { .. }) {
                break;
            }
        }
        assert_eq!(h.app.store().current_file().unwrap().content, "\n\nbody");
        assert_eq!(h.buffer.borrow().text(), "\n\nbody");
    }

    #[test]
    fn test_navigation_follows_user_flow() {
        let mut h = harness(ScriptedTransport::new(&[]));
        let id = h.app.create_document();
        h.app.open_assistant();
        h.app.navigate_back();
        assert_eq!(h.app.current_view(), ViewMode::Editor);
        h.app.navigate_back();
        assert_eq!(h.app.current_view(), ViewMode::FileList);
        h.app.enter_file(id);
        assert_eq!(h.app.current_view(), ViewMode::Editor);
    }

    #[test]
    fn test_enter_unknown_file_does_not_navigate() {
        let mut h = harness(ScriptedTransport::new(&[]));
        h.app.enter_file(FileId(42));
        assert_eq!(h.app.current_view(), ViewMode::FileList);
        assert_eq!(h.app.store().current_file_id(), None);
    }

    #[test]
    fn test_manual_save_persists_and_clears_indicator() {
        let mut h = harness(ScriptedTransport::new(&[]));
        let t0 = Instant::now();
        h.app.create_document();
        type_text(&mut h, "draft", t0);
        assert_eq!(h.app.save_status(), SaveStatus::Editing);

        h.app.manual_save();
        assert_eq!(h.app.save_status(), SaveStatus::Saved);
        assert_eq!(h.app.store().current_file().unwrap().content, "draft");
        assert_eq!(h.writes.load(Ordering::SeqCst), 2);
    }

    fn flaky_harness(fail_after: usize) -> (App, Rc<RefCell<MemoryBuffer>>, Arc<ScriptedTransport>) {
        let (tx, _rx) = mpsc::channel();
        let transport = Arc::new(ScriptedTransport::new(&[]));
        let storage = FlakyStorage {
            fail_after,
            writes: Arc::new(AtomicUsize::new(0)),
        };
        let mut app = App::new(
            AppConfig::default(),
            Box::new(storage),
            transport.clone(),
            tx,
        );
        let buffer = Rc::new(RefCell::new(MemoryBuffer::default()));
        app.bind_buffer(buffer.clone());
        (app, buffer, transport)
    }

    #[test]
    fn test_failed_idle_persist_keeps_editing_and_skips_proofread() {
        // The creation write succeeds, the idle autosave write fails.
        let (mut app, buffer, transport) = flaky_harness(1);
        let t0 = Instant::now();

        app.create_document();
        buffer.borrow_mut().replace(0, 0, "draft");
        app.on_buffer_modified(t0);
        app.tick(t0 + ms(2000));

        // Unsaved work stays visible and no proofread cycle starts.
        assert_eq!(app.save_status(), SaveStatus::Editing);
        assert!(transport.requests.lock().unwrap().is_empty());
        // The commit itself still landed in memory.
        assert_eq!(app.store().current_file().unwrap().content, "draft");
    }

    #[test]
    fn test_failed_manual_save_keeps_editing() {
        let (mut app, buffer, _transport) = flaky_harness(1);
        let t0 = Instant::now();

        app.create_document();
        buffer.borrow_mut().replace(0, 0, "draft");
        app.on_buffer_modified(t0);

        app.manual_save();
        assert_eq!(app.save_status(), SaveStatus::Editing);
        assert_eq!(app.store().current_file().unwrap().content, "draft");
    }

    #[test]
    fn test_edits_without_active_document_ignored() {
        let mut h = harness(ScriptedTransport::new(&[]));
        let t0 = Instant::now();
        type_text(&mut h, "orphan", t0);
        assert_eq!(h.app.save_status(), SaveStatus::Saved);
        h.app.tick(t0 + ms(5000));
        assert_eq!(h.writes.load(Ordering::SeqCst), 0);
    }
}
