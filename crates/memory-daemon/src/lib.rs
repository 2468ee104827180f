//! Memory daemon library exports.
//!
//! This crate provides the CLI binary for the semantic memory store.
//!
//! # Modules
//!
//! - `cli`: Command-line argument parsing with clap
//! - `capability`: Named capabilities dispatched by the request loop
//! - `commands`: Command implementations (index, search, serve, ...)

pub mod capability;
pub mod cli;
pub mod commands;

pub use capability::{Capability, CapabilityRegistry, CapabilityRequest, CapabilityResponse};
pub use cli::{Cli, Commands};
pub use commands::{init_logging, load_settings, run, serve_lines, store_config, Runtime};
