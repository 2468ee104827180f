//! Command implementations for the memory daemon.
//!
//! Every command loads settings, opens the store under its lock, runs, and
//! prints JSON on stdout. Logs go to stderr.

use std::future::Future;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use serde::Serialize;
use serde_json::json;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::signal;
use tracing::{info, warn};

use memory_embeddings::{embedder_from_settings, EmbeddingModel};
use memory_ingest::{
    index_file, index_redirect_target, pre_index, EventAdapter, IngestOptions,
};
use memory_types::Settings;
use memory_vector::{StoreConfig, StoreHandle};

use crate::capability::CapabilityRegistry;
use crate::cli::{Cli, Commands};

/// Load settings and apply CLI overrides (highest precedence).
pub fn load_settings(
    config_path: Option<&str>,
    log_level_override: Option<&str>,
    store_path_override: Option<&str>,
) -> Result<Settings> {
    let mut settings = Settings::load(config_path).context("Failed to load configuration")?;
    if let Some(log_level) = log_level_override {
        settings.log_level = log_level.to_string();
    }
    if let Some(store_path) = store_path_override {
        settings.store_path = store_path.to_string();
    }
    Ok(settings)
}

/// Install the stderr tracing subscriber.
///
/// `RUST_LOG` wins over the configured level.
pub fn init_logging(log_level: &str) -> Result<()> {
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .with_writer(io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set tracing subscriber")
}

/// Store configuration derived from settings.
pub fn store_config(settings: &Settings) -> StoreConfig {
    StoreConfig::new(settings.expanded_store_path())
        .with_snapshot_interval(settings.snapshot_interval)
        .with_max_summary_len(settings.max_summary_len)
}

/// Open store and embedder together; the store dimension follows the embedder.
pub struct Runtime {
    pub settings: Settings,
    pub handle: StoreHandle,
    pub embedder: Arc<dyn EmbeddingModel>,
}

impl Runtime {
    pub fn open(settings: Settings) -> Result<Self> {
        let embedder = embedder_from_settings(&settings.embedder, settings.expanded_cache_dir())
            .context("Failed to initialize embedder")?;

        let config = store_config(&settings);
        info!("Opening memory store at {:?}", config.dir);
        let handle = StoreHandle::open(config, embedder.dimension())
            .context("Failed to open memory store")?;

        Ok(Self {
            settings,
            handle,
            embedder,
        })
    }

    pub fn ingest_options(&self) -> IngestOptions {
        IngestOptions::from_settings(&self.settings.ingest)
    }

    pub fn registry(&self) -> CapabilityRegistry {
        CapabilityRegistry::with_store(
            self.handle.clone(),
            Arc::clone(&self.embedder),
            self.settings.default_k,
            self.ingest_options(),
        )
    }
}

/// Run a parsed command line.
pub async fn run(cli: Cli) -> Result<()> {
    let settings = load_settings(
        cli.config.as_deref(),
        cli.log_level.as_deref(),
        cli.store_path.as_deref(),
    )?;
    init_logging(&settings.log_level)?;

    let runtime = Runtime::open(settings)?;
    let mut out = io::stdout().lock();

    match cli.command {
        Commands::Index { paths, summary } => {
            index_paths(&runtime, &paths, summary.as_deref(), &mut out)
        }
        Commands::Search { query, k } => search(&runtime, &query, k, &mut out),
        Commands::Bootstrap => bootstrap(&runtime, &mut out),
        Commands::Ingest => {
            let stdin = io::stdin();
            ingest_events(&runtime, stdin.lock(), &mut out)
        }
        Commands::Capture { command, cwd } => capture(&runtime, &command, cwd, &mut out),
        Commands::Serve => {
            drop(out);
            serve(&runtime).await
        }
        Commands::Stats => print_json(&mut out, &runtime.handle.stats()?),
        Commands::Checkpoint => {
            runtime.handle.checkpoint().context("Checkpoint failed")?;
            print_json(&mut out, &runtime.handle.stats()?)
        }
    }
}

fn print_json<W: Write, T: Serialize>(out: &mut W, value: &T) -> Result<()> {
    serde_json::to_writer(&mut *out, value)?;
    writeln!(out)?;
    out.flush()?;
    Ok(())
}

/// Index each path; failures are reported per path and do not stop the rest.
pub fn index_paths<W: Write>(
    runtime: &Runtime,
    paths: &[PathBuf],
    summary: Option<&str>,
    out: &mut W,
) -> Result<()> {
    let snippet_chars = runtime.settings.ingest.snippet_chars;
    let mut failures = 0usize;

    for path in paths {
        let result = match summary {
            Some(summary) => runtime
                .handle
                .insert(path, summary, runtime.embedder.as_ref())
                .map_err(anyhow::Error::from),
            None => index_file(&runtime.handle, runtime.embedder.as_ref(), path, snippet_chars)
                .map_err(anyhow::Error::from),
        };
        match result {
            Ok(outcome) => print_json(out, &json!({ "path": path, "outcome": outcome }))?,
            Err(e) => {
                failures += 1;
                warn!(path = ?path, error = %e, "Failed to index");
                print_json(out, &json!({ "path": path, "error": e.to_string() }))?;
            }
        }
    }

    if failures > 0 {
        anyhow::bail!("{} of {} paths failed to index", failures, paths.len());
    }
    Ok(())
}

pub fn search<W: Write>(runtime: &Runtime, query: &str, k: Option<usize>, out: &mut W) -> Result<()> {
    let k = k.unwrap_or(runtime.settings.default_k);
    let response = runtime
        .handle
        .search(query, k, runtime.embedder.as_ref())
        .context("Search failed")?;
    print_json(out, &response)
}

pub fn bootstrap<W: Write>(runtime: &Runtime, out: &mut W) -> Result<()> {
    let files = runtime.settings.expanded_bootstrap_files();
    if files.is_empty() {
        warn!("No bootstrap files configured (ingest.bootstrap_files)");
    }
    let stats = pre_index(
        &runtime.handle,
        runtime.embedder.as_ref(),
        &files,
        &runtime.ingest_options(),
    );
    print_json(out, &stats)
}

/// Apply one file event per input line, echoing one result line each.
pub fn ingest_events<R: BufRead, W: Write>(runtime: &Runtime, input: R, out: &mut W) -> Result<()> {
    let adapter = EventAdapter::new(
        runtime.handle.clone(),
        Arc::clone(&runtime.embedder),
        runtime.ingest_options(),
    );

    for line in input.lines() {
        let line = line.context("Failed to read event line")?;
        if line.trim().is_empty() {
            continue;
        }
        match adapter.handle_line(&line) {
            Ok(action) => print_json(out, &action)?,
            Err(e) => print_json(out, &json!({ "error": e.to_string() }))?,
        }
    }
    Ok(())
}

pub fn capture<W: Write>(
    runtime: &Runtime,
    command: &str,
    cwd: Option<PathBuf>,
    out: &mut W,
) -> Result<()> {
    let cwd = match cwd {
        Some(cwd) => cwd,
        None => std::env::current_dir().context("Failed to read current directory")?,
    };
    let outcome = index_redirect_target(
        &runtime.handle,
        runtime.embedder.as_ref(),
        command,
        &cwd,
        runtime.settings.ingest.snippet_chars,
    )?;
    print_json(out, &json!({ "command": command, "outcome": outcome }))
}

/// JSON-lines request loop on stdin/stdout.
///
/// Stops on EOF or Ctrl+C and checkpoints the store before returning.
pub async fn serve(runtime: &Runtime) -> Result<()> {
    let registry = Arc::new(runtime.registry());
    info!(capabilities = ?registry.names(), "Serving capability requests on stdin");

    let shutdown = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
        info!("Received Ctrl+C, shutting down...");
    };
    let served = serve_lines(
        registry,
        BufReader::new(tokio::io::stdin()),
        tokio::io::stdout(),
        shutdown,
    )
    .await?;

    let handle = runtime.handle.clone();
    tokio::task::spawn_blocking(move || handle.checkpoint())
        .await
        .context("Checkpoint task panicked")?
        .context("Final checkpoint failed")?;
    info!(served, "Memory daemon stopped");
    Ok(())
}

/// Answer one response line per request line until EOF or `shutdown`.
///
/// Capabilities run on the blocking pool. Returns the number of requests
/// answered.
pub async fn serve_lines<R, W, S>(
    registry: Arc<CapabilityRegistry>,
    input: R,
    mut output: W,
    shutdown: S,
) -> Result<usize>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
    S: Future<Output = ()>,
{
    let mut lines = input.lines();
    tokio::pin!(shutdown);
    let mut served = 0usize;

    loop {
        let line = tokio::select! {
            line = lines.next_line() => line.context("Failed to read request")?,
            _ = &mut shutdown => break,
        };
        let Some(line) = line else {
            info!("Input closed, shutting down...");
            break;
        };
        if line.trim().is_empty() {
            continue;
        }

        let registry = Arc::clone(&registry);
        let response = tokio::task::spawn_blocking(move || registry.dispatch_line(&line))
            .await
            .context("Capability task panicked")?;

        let mut encoded = serde_json::to_vec(&response)?;
        encoded.push(b'\n');
        output.write_all(&encoded).await?;
        output.flush().await?;
        served += 1;
    }
    Ok(served)
}
