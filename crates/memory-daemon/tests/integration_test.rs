//! Integration tests for the memory daemon.
//!
//! These drive the daemon's runtime and capability table the way the
//! `serve` loop does, including reopening the store between sessions.

use pretty_assertions::assert_eq;
use serde_json::json;
use tempfile::TempDir;

use memory_daemon::{load_settings, Runtime};
use memory_types::{EmbedderKind, Settings};

fn settings(temp: &TempDir) -> Settings {
    let mut settings = Settings::default();
    settings.store_path = temp.path().join("store").to_string_lossy().to_string();
    settings.embedder.kind = EmbedderKind::Hashing;
    settings.embedder.dimension = 48;
    settings.snapshot_interval = 2;
    settings
}

#[test]
fn test_requests_survive_restart() {
    let temp = TempDir::new().unwrap();
    let docs: Vec<_> = ["roadmap.txt", "standup.txt", "invoice.txt"]
        .iter()
        .map(|name| {
            let path = temp.path().join(name);
            std::fs::write(&path, format!("{} contents", name)).unwrap();
            path
        })
        .collect();

    {
        let runtime = Runtime::open(settings(&temp)).unwrap();
        let registry = runtime.registry();
        for doc in &docs {
            let request = json!({"action": "index_file", "args": {"path": doc}});
            let response = registry.dispatch_line(&request.to_string());
            assert!(response.success, "{:?}", response.error);
        }
    }

    let runtime = Runtime::open(settings(&temp)).unwrap();
    let registry = runtime.registry();
    let stats = registry
        .dispatch_line(r#"{"action":"store_stats"}"#)
        .result
        .unwrap();
    assert_eq!(stats["vectors"], 3);
    assert_eq!(stats["records"], 3);
    // Two entries compacted, one left in the journal
    assert_eq!(stats["pending_journal_entries"], 1);

    let response = registry
        .dispatch_line(r#"{"action":"semantic_search","args":{"query":"invoice","k":3}}"#)
        .result
        .unwrap();
    let hits = response.as_array().unwrap();
    assert_eq!(hits.len(), 3);
    let ranks: Vec<_> = hits.iter().map(|h| h["rank"].as_u64().unwrap()).collect();
    assert_eq!(ranks, vec![1, 2, 3]);
}

#[test]
fn test_second_runtime_is_locked_out() {
    let temp = TempDir::new().unwrap();
    let _first = Runtime::open(settings(&temp)).unwrap();
    let second = Runtime::open(settings(&temp));
    let message = format!("{:#}", second.err().unwrap());
    assert!(message.contains("locked"), "{}", message);
}

#[test]
fn test_cli_overrides_apply() {
    let temp = TempDir::new().unwrap();
    let config = temp.path().join("config.toml");
    std::fs::write(&config, "log_level = \"warn\"\ndefault_k = 7\n").unwrap();

    let settings = load_settings(
        Some(config.to_str().unwrap()),
        Some("debug"),
        Some("/override/store"),
    )
    .unwrap();
    assert_eq!(settings.log_level, "debug");
    assert_eq!(settings.store_path, "/override/store");
    assert_eq!(settings.default_k, 7);
}
