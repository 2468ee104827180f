//! CLI argument parsing for the memory daemon.
//!
//! CLI flags override every other configuration source.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Semantic Memory Daemon
///
/// Indexes files into a persistent vector store and answers
/// natural-language queries against it.
#[derive(Parser, Debug)]
#[command(name = "memory-daemon")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to config file (overrides default ~/.config/semantic-memory/config.toml)
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    /// Set log level (trace, debug, info, warn, error)
    #[arg(short, long, global = true)]
    pub log_level: Option<String>,

    /// Override the store directory
    #[arg(long, global = true)]
    pub store_path: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Daemon commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Index files (summarized from their first characters unless --summary is given)
    Index {
        /// Files to index
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        /// Summary to store instead of a content snippet
        #[arg(short, long)]
        summary: Option<String>,
    },

    /// Search the store
    Search {
        /// Natural-language query
        query: String,

        /// Number of results (default from config)
        #[arg(short)]
        k: Option<usize>,
    },

    /// Index the configured bootstrap files
    Bootstrap,

    /// Apply file events read as JSON lines from stdin
    Ingest,

    /// Index the file an already-executed shell command redirected into
    Capture {
        /// The command line, e.g. "ls -la > listing.txt"
        command: String,

        /// Directory the command ran in (default: current directory)
        #[arg(long)]
        cwd: Option<PathBuf>,
    },

    /// Serve capability requests as JSON lines on stdin/stdout
    Serve,

    /// Show store statistics
    Stats,

    /// Compact the journal into snapshots
    Checkpoint,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_index() {
        let cli = Cli::parse_from(["memory-daemon", "index", "a.txt", "b.txt"]);
        match cli.command {
            Commands::Index { paths, summary } => {
                assert_eq!(paths, vec![PathBuf::from("a.txt"), PathBuf::from("b.txt")]);
                assert!(summary.is_none());
            }
            _ => panic!("Expected Index command"),
        }
    }

    #[test]
    fn test_cli_index_requires_path() {
        assert!(Cli::try_parse_from(["memory-daemon", "index"]).is_err());
    }

    #[test]
    fn test_cli_index_with_summary() {
        let cli = Cli::parse_from(["memory-daemon", "index", "a.txt", "-s", "Q3 budget"]);
        match cli.command {
            Commands::Index { summary, .. } => assert_eq!(summary.as_deref(), Some("Q3 budget")),
            _ => panic!("Expected Index command"),
        }
    }

    #[test]
    fn test_cli_search_with_k() {
        let cli = Cli::parse_from(["memory-daemon", "search", "budget meeting", "-k", "5"]);
        match cli.command {
            Commands::Search { query, k } => {
                assert_eq!(query, "budget meeting");
                assert_eq!(k, Some(5));
            }
            _ => panic!("Expected Search command"),
        }
    }

    #[test]
    fn test_cli_capture() {
        let cli = Cli::parse_from(["memory-daemon", "capture", "ls > out.txt", "--cwd", "/tmp"]);
        match cli.command {
            Commands::Capture { command, cwd } => {
                assert_eq!(command, "ls > out.txt");
                assert_eq!(cwd, Some(PathBuf::from("/tmp")));
            }
            _ => panic!("Expected Capture command"),
        }
    }

    #[test]
    fn test_cli_global_flags() {
        let cli = Cli::parse_from([
            "memory-daemon",
            "stats",
            "--store-path",
            "/custom/store",
            "--log-level",
            "debug",
            "--config",
            "/path/to/config.toml",
        ]);
        assert!(matches!(cli.command, Commands::Stats));
        assert_eq!(cli.store_path.as_deref(), Some("/custom/store"));
        assert_eq!(cli.log_level.as_deref(), Some("debug"));
        assert_eq!(cli.config.as_deref(), Some("/path/to/config.toml"));
    }

    #[test]
    fn test_cli_simple_commands() {
        for (name, check) in [
            ("serve", matches!(Cli::parse_from(["memory-daemon", "serve"]).command, Commands::Serve)),
            ("ingest", matches!(Cli::parse_from(["memory-daemon", "ingest"]).command, Commands::Ingest)),
            (
                "bootstrap",
                matches!(Cli::parse_from(["memory-daemon", "bootstrap"]).command, Commands::Bootstrap),
            ),
            (
                "checkpoint",
                matches!(Cli::parse_from(["memory-daemon", "checkpoint"]).command, Commands::Checkpoint),
            ),
        ] {
            assert!(check, "{} did not parse", name);
        }
    }
}
