//! # memory-ingest
//!
//! Adapters that turn file activity into memory store inserts.
//!
//! - [`snippet`]: summarize a file from the head of its content
//! - [`bootstrap`]: index a configured list of files and directories
//! - [`events`]: apply created / modified / deleted file events
//! - [`capture`]: find the file a shell command redirected output into
//!
//! Adapters only call the store; they never watch the filesystem or run
//! commands themselves.

pub mod bootstrap;
pub mod capture;
pub mod error;
pub mod events;
pub mod options;
pub mod snippet;

pub use bootstrap::{index_file, pre_index, IngestStats};
pub use capture::{capture_redirect_target, index_redirect_target};
pub use error::IngestError;
pub use events::{EventAction, EventAdapter, FileEvent, FileEventKind};
pub use options::IngestOptions;
pub use snippet::{read_snippet, snippet_summary, summarize_file};
