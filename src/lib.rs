//! Markpad core: the headless engine of a markdown notepad.
//!
//! The crate owns documents and their persistence, browser-style view
//! navigation, a debounced autosave pipeline, and the AI plumbing for
//! proofreading and assisted writing. The rendering host stays thin: it
//! binds a [`app::TextBuffer`], drives [`app::App::tick`] from its event
//! loop, and forwards worker [`app::Message`]s to [`app::App::handle`].

pub mod ai;
pub mod app;
pub mod net;
