//! Semantic Memory Daemon
//!
//! Indexes files into a persistent vector store and answers
//! natural-language queries against it.
//!
//! # Usage
//!
//! ```bash
//! memory-daemon index notes.txt [--summary TEXT]
//! memory-daemon search "budget meeting" [-k 5]
//! memory-daemon serve < requests.jsonl
//! ```
//!
//! # Configuration
//!
//! Configuration is loaded in order (later sources override earlier):
//! 1. Built-in defaults
//! 2. Config file (~/.config/semantic-memory/config.toml)
//! 3. Environment variables (MEMORY_*)
//! 4. CLI flags

use anyhow::Result;
use clap::Parser;

use memory_daemon::{run, Cli};

#[tokio::main]
async fn main() -> Result<()> {
    run(Cli::parse()).await
}
