//! Application core: documents, persistence, navigation, the autosave
//! pipeline, and the coordinator tying them to the background workers.

pub mod autosave;
pub mod buffer;
pub mod config;
pub mod document;
pub mod error;
pub mod file_store;
pub mod messages;
pub mod navigation;
pub mod state;
pub mod storage;
pub mod text_ops;

pub use autosave::{AutosaveDue, AutosavePipeline, SaveStatus};
pub use buffer::{MemoryBuffer, TextBuffer};
pub use config::AppConfig;
pub use document::{Document, FileId};
pub use error::{AppError, Result};
pub use file_store::{FileStore, StoreEvent};
pub use messages::Message;
pub use navigation::{NavStack, ViewMode};
pub use state::App;
pub use storage::{DiskStorage, Storage};
pub use text_ops::Selection;
