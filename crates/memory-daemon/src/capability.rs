//! Capability table for the request loop.
//!
//! Each request names an action and carries JSON arguments; the registry
//! maps action names to handlers. Only store operations are registered:
//! there is no shell or code execution capability.
//!
//! ```json
//! {"action": "semantic_search", "args": {"query": "budget meeting", "k": 3}}
//! {"success": true, "result": [{"rank": 1, "path": "...", "summary": "...", "score": 0.61}]}
//! ```

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, warn};

use memory_embeddings::EmbeddingModel;
use memory_ingest::{index_file, IngestOptions};
use memory_vector::StoreHandle;

/// One request line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapabilityRequest {
    /// Capability name
    pub action: String,
    /// Arguments passed to the capability
    #[serde(default)]
    pub args: Value,
}

/// One response line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapabilityResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl CapabilityResponse {
    pub fn success(result: Value) -> Self {
        Self {
            success: true,
            result: Some(result),
            error: None,
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            result: None,
            error: Some(error.into()),
        }
    }
}

/// A named operation callable through the request loop.
pub trait Capability: Send + Sync {
    /// Unique action name
    fn name(&self) -> &'static str;

    /// What the capability does
    fn description(&self) -> &'static str;

    /// JSON schema of the arguments
    fn parameters(&self) -> Value {
        json!({ "type": "object", "properties": {} })
    }

    /// Run with the request arguments.
    fn invoke(&self, args: Value) -> Result<Value>;
}

/// Name -> capability table.
#[derive(Default)]
pub struct CapabilityRegistry {
    capabilities: BTreeMap<&'static str, Arc<dyn Capability>>,
}

impl CapabilityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the store capabilities.
    pub fn with_store(
        handle: StoreHandle,
        embedder: Arc<dyn EmbeddingModel>,
        default_k: usize,
        options: IngestOptions,
    ) -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(SemanticSearch {
            handle: handle.clone(),
            embedder: Arc::clone(&embedder),
            default_k,
        }));
        registry.register(Arc::new(IndexFile {
            handle: handle.clone(),
            embedder,
            options,
        }));
        registry.register(Arc::new(StoreStats { handle }));
        registry
    }

    /// Add a capability, replacing any with the same name.
    pub fn register(&mut self, capability: Arc<dyn Capability>) {
        self.capabilities.insert(capability.name(), capability);
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn Capability>> {
        self.capabilities.get(name)
    }

    /// Names in sorted order.
    pub fn names(&self) -> Vec<&'static str> {
        self.capabilities.keys().copied().collect()
    }

    /// Name, description and parameter schema of every capability.
    pub fn describe(&self) -> Value {
        Value::Array(
            self.capabilities
                .values()
                .map(|c| {
                    json!({
                        "name": c.name(),
                        "description": c.description(),
                        "parameters": c.parameters(),
                    })
                })
                .collect(),
        )
    }

    pub fn dispatch(&self, request: CapabilityRequest) -> CapabilityResponse {
        let Some(capability) = self.get(&request.action) else {
            warn!(action = %request.action, "Unknown capability");
            return CapabilityResponse::failure(format!(
                "Unknown capability: {}",
                request.action
            ));
        };

        debug!(action = %request.action, "Invoking capability");
        match capability.invoke(request.args) {
            Ok(result) => CapabilityResponse::success(result),
            Err(e) => {
                warn!(action = %request.action, error = %e, "Capability failed");
                CapabilityResponse::failure(format!("{:#}", e))
            }
        }
    }

    /// Parse and dispatch one request line.
    pub fn dispatch_line(&self, line: &str) -> CapabilityResponse {
        match serde_json::from_str::<CapabilityRequest>(line) {
            Ok(request) => self.dispatch(request),
            Err(e) => CapabilityResponse::failure(format!("Invalid request: {}", e)),
        }
    }
}

fn parse_args<T: for<'de> Deserialize<'de>>(name: &str, args: Value) -> Result<T> {
    serde_json::from_value(args).with_context(|| format!("Invalid arguments for {}", name))
}

struct SemanticSearch {
    handle: StoreHandle,
    embedder: Arc<dyn EmbeddingModel>,
    default_k: usize,
}

#[derive(Deserialize)]
struct SearchArgs {
    query: String,
    #[serde(default)]
    k: Option<usize>,
}

impl Capability for SemanticSearch {
    fn name(&self) -> &'static str {
        "semantic_search"
    }

    fn description(&self) -> &'static str {
        "Search indexed files for content semantically related to a query"
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "query": { "type": "string" },
                "k": { "type": "integer", "minimum": 0 }
            },
            "required": ["query"]
        })
    }

    fn invoke(&self, args: Value) -> Result<Value> {
        let args: SearchArgs = parse_args(self.name(), args)?;
        let k = args.k.unwrap_or(self.default_k);
        let response = self
            .handle
            .search(&args.query, k, self.embedder.as_ref())
            .context("Search failed")?;
        Ok(serde_json::to_value(response)?)
    }
}

struct IndexFile {
    handle: StoreHandle,
    embedder: Arc<dyn EmbeddingModel>,
    options: IngestOptions,
}

#[derive(Deserialize)]
struct IndexArgs {
    path: PathBuf,
    #[serde(default)]
    summary: Option<String>,
}

impl Capability for IndexFile {
    fn name(&self) -> &'static str {
        "index_file"
    }

    fn description(&self) -> &'static str {
        "Add a file to memory, summarized from its content unless a summary is given"
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "path": { "type": "string" },
                "summary": { "type": "string" }
            },
            "required": ["path"]
        })
    }

    fn invoke(&self, args: Value) -> Result<Value> {
        let args: IndexArgs = parse_args(self.name(), args)?;
        let outcome = match &args.summary {
            Some(summary) => self
                .handle
                .insert(&args.path, summary, self.embedder.as_ref())?,
            None => index_file(
                &self.handle,
                self.embedder.as_ref(),
                &args.path,
                self.options.snippet_chars,
            )?,
        };
        Ok(serde_json::to_value(outcome)?)
    }
}

struct StoreStats {
    handle: StoreHandle,
}

impl Capability for StoreStats {
    fn name(&self) -> &'static str {
        "store_stats"
    }

    fn description(&self) -> &'static str {
        "Report vector count, pending journal entries and snapshot sizes"
    }

    fn invoke(&self, _args: Value) -> Result<Value> {
        Ok(serde_json::to_value(self.handle.stats()?)?)
    }
}
