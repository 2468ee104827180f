//! # memory-types
//!
//! Shared types for the semantic memory store.
//!
//! This crate defines what every other crate in the workspace agrees on:
//! - Settings: layered configuration (defaults, config file, env, CLI)
//! - MemoryError: configuration load and validation errors
//!
//! ## Usage
//!
//! ```rust,no_run
//! use memory_types::Settings;
//!
//! let settings = Settings::load(None).unwrap();
//! println!("store at {:?}", settings.expanded_store_path());
//! ```

pub mod config;
pub mod error;

pub use config::{EmbedderKind, EmbedderSettings, IngestSettings, Settings, APP_NAME};
pub use error::MemoryError;
