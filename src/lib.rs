//! Unicoder content script.
//!
//! Replaces `\uXXXX` and `\xXX` escapes shown in GitHub code views with the
//! characters they stand for, and keeps doing so as the page renders more
//! lines.
//!
//! ## Modules
//! - `decoder`: escape grammar and replacement
//! - `engine`: one scan over the candidate lines of a page
//! - `watcher`: mutation filtering and debounce state
//! - `session`: activation, debounced rescans, reload on preference change
//! - `web`: browser bindings (`wasm32` only; page bindings need the `dom` feature)

pub mod config;
pub mod decoder;
pub mod engine;
pub mod error;
pub mod logging;
pub mod session;
pub mod watcher;

#[cfg(target_arch = "wasm32")]
pub mod web;

#[cfg(test)]
mod testing;

pub use config::Config;
pub use engine::{CodeLine, ConversionEngine, Page, ProcessedSet, ScanReport};
pub use error::{PlatformError, PlatformResult};
pub use session::{PreferenceChange, PreferenceStore, Reloader, Session};
pub use watcher::{AddedNode, MutationRecord, MutationWatcher, Scheduler, WatchState};
