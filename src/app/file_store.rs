use serde::{Deserialize, Serialize};

use super::document::{Document, FileId};
use super::error::Result;
use super::storage::Storage;

/// Change notification emitted to store subscribers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreEvent {
    Created(FileId),
    Deleted(FileId),
    Renamed(FileId),
    ContentChanged(FileId),
    ActiveChanged(Option<FileId>),
    Loaded,
}

/// Serialized form of the store written to durable storage.
#[derive(Serialize, Deserialize)]
pub struct PersistedSnapshot {
    pub files: Vec<Document>,
    #[serde(default)]
    pub current_file_id: Option<FileId>,
}

/// Owns the document set, the active-document pointer, and persistence.
///
/// Content mutation is deliberately decoupled from persistence: the hot
/// path (`mutate_content`) touches memory only, and the autosave pipeline
/// decides when `persist` runs.
pub struct FileStore {
    files: Vec<Document>,
    current_file_id: Option<FileId>,
    next_id: u64,
    storage: Box<dyn Storage>,
    subscribers: Vec<Box<dyn FnMut(StoreEvent)>>,
}

impl FileStore {
    pub fn new(storage: Box<dyn Storage>) -> Self {
        Self {
            files: Vec::new(),
            current_file_id: None,
            next_id: 1,
            storage,
            subscribers: Vec::new(),
        }
    }

    /// Register a change listener. Listeners run synchronously on the
    /// mutating call, in registration order.
    pub fn subscribe(&mut self, listener: Box<dyn FnMut(StoreEvent)>) {
        self.subscribers.push(listener);
    }

    fn notify(&mut self, event: StoreEvent) {
        for listener in &mut self.subscribers {
            listener(event);
        }
    }

    fn next_file_id(&mut self) -> FileId {
        let id = FileId(self.next_id);
        self.next_id += 1;
        id
    }

    /// Create an empty untitled document, make it active, and persist.
    pub fn create_document(&mut self) -> FileId {
        let id = self.next_file_id();
        self.files.push(Document::new_untitled(id));
        self.current_file_id = Some(id);
        self.notify(StoreEvent::Created(id));
        self.notify(StoreEvent::ActiveChanged(Some(id)));
        self.persist_logged();
        id
    }

    /// Remove a document. Deleting the active document clears the active
    /// pointer without selecting a replacement. Unknown ids are ignored.
    pub fn delete_document(&mut self, id: FileId) {
        let Some(idx) = self.files.iter().position(|f| f.id == id) else {
            return;
        };
        self.files.remove(idx);
        if self.current_file_id == Some(id) {
            self.current_file_id = None;
            self.notify(StoreEvent::ActiveChanged(None));
        }
        self.notify(StoreEvent::Deleted(id));
        self.persist_logged();
    }

    /// Rename a document. Names that trim to empty are rejected silently.
    pub fn rename(&mut self, id: FileId, new_name: &str) {
        let trimmed = new_name.trim();
        if trimmed.is_empty() {
            return;
        }
        let Some(doc) = self.files.iter_mut().find(|f| f.id == id) else {
            return;
        };
        doc.name = trimmed.to_string();
        self.notify(StoreEvent::Renamed(id));
        self.persist_logged();
    }

    /// Set the active document. Ids not present in the store are ignored,
    /// so the active pointer can never dangle.
    pub fn set_active(&mut self, id: FileId) {
        if self.files.iter().any(|f| f.id == id) && self.current_file_id != Some(id) {
            self.current_file_id = Some(id);
            self.notify(StoreEvent::ActiveChanged(Some(id)));
        }
    }

    /// Replace a document's content in memory. Hot path: no persistence,
    /// no-op on unknown ids.
    pub fn mutate_content(&mut self, id: FileId, new_content: &str) {
        let Some(doc) = self.files.iter_mut().find(|f| f.id == id) else {
            return;
        };
        doc.content = new_content.to_string();
        self.notify(StoreEvent::ContentChanged(id));
    }

    /// Write the full snapshot to durable storage.
    pub fn persist(&self) -> Result<()> {
        let snapshot = PersistedSnapshot {
            files: self.files.clone(),
            current_file_id: self.current_file_id,
        };
        let json = serde_json::to_string(&snapshot)?;
        self.storage.store(&json)
    }

    fn persist_logged(&self) {
        if let Err(e) = self.persist() {
            log::warn!("Failed to persist documents: {}", e);
        }
    }

    /// Restore the snapshot from durable storage. No-op when nothing has
    /// been stored yet. The id generator resumes past the highest loaded id.
    pub fn load(&mut self) -> Result<()> {
        let Some(json) = self.storage.load()? else {
            return Ok(());
        };
        let snapshot: PersistedSnapshot = serde_json::from_str(&json)?;
        self.next_id = snapshot.files.iter().map(|f| f.id.0).max().unwrap_or(0) + 1;
        self.files = snapshot.files;
        // Drop a stale pointer rather than letting it dangle.
        self.current_file_id = snapshot
            .current_file_id
            .filter(|id| self.files.iter().any(|f| f.id == *id));
        self.notify(StoreEvent::Loaded);
        Ok(())
    }

    pub fn files(&self) -> &[Document] {
        &self.files
    }

    pub fn current_file_id(&self) -> Option<FileId> {
        self.current_file_id
    }

    pub fn current_file(&self) -> Option<&Document> {
        let id = self.current_file_id?;
        self.files.iter().find(|f| f.id == id)
    }

    pub fn file_by_id(&self, id: FileId) -> Option<&Document> {
        self.files.iter().find(|f| f.id == id)
    }

    pub fn count(&self) -> usize {
        self.files.len()
    }
}
