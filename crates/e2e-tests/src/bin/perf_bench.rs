//! Store performance harness: bulk insert, checkpoint, reopen and
//! exact top-k search latency over seeded random vectors.
//!
//!   cargo run -p e2e-tests --bin perf_bench --release -- --vectors 100000

use std::path::PathBuf;
use std::time::{Duration, Instant};

use clap::Parser;
use serde::Serialize;

use e2e_tests::random_vectors;
use memory_embeddings::Embedding;
use memory_vector::{MemoryStore, StoreConfig};

#[derive(Parser, Debug)]
#[command(name = "perf_bench", about = "Semantic memory store performance benchmark")]
struct Args {
    /// Vectors to insert
    #[arg(long, default_value_t = 10_000)]
    vectors: usize,
    /// Embedding dimension
    #[arg(long, default_value_t = 384)]
    dimension: usize,
    /// Search queries to time
    #[arg(long, default_value_t = 200)]
    queries: usize,
    /// Results per query
    #[arg(short, default_value_t = 3)]
    k: usize,
    /// Journal entries between automatic checkpoints
    #[arg(long, default_value_t = 1024)]
    snapshot_interval: usize,
    /// RNG seed
    #[arg(long, default_value_t = 42)]
    seed: u64,
    /// Store directory (default: a temporary directory)
    #[arg(long)]
    store_dir: Option<PathBuf>,
}

#[derive(Serialize)]
struct Latency {
    p50_us: u128,
    p95_us: u128,
    max_us: u128,
}

impl Latency {
    fn from_samples(mut samples: Vec<Duration>) -> Self {
        samples.sort_unstable();
        let at = |q: f64| {
            samples
                .get(((samples.len() as f64 - 1.0) * q).round() as usize)
                .map_or(0, Duration::as_micros)
        };
        Self {
            p50_us: at(0.50),
            p95_us: at(0.95),
            max_us: samples.last().map_or(0, Duration::as_micros),
        }
    }
}

#[derive(Serialize)]
struct Report {
    vectors: usize,
    dimension: usize,
    insert_total_ms: u128,
    insert_per_vector_us: u128,
    checkpoint_ms: u128,
    reopen_ms: u128,
    search: Latency,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let temp = tempfile::TempDir::new()?;
    let dir = args
        .store_dir
        .clone()
        .unwrap_or_else(|| temp.path().join("store"));
    let config = StoreConfig::new(&dir).with_snapshot_interval(args.snapshot_interval);

    let vectors = random_vectors(args.vectors, args.dimension, args.seed);
    let queries = random_vectors(args.queries, args.dimension, args.seed.wrapping_add(1));

    let mut store = MemoryStore::open(config.clone(), args.dimension)?;
    let start = Instant::now();
    for (i, vector) in vectors.into_iter().enumerate() {
        store.insert_with(format!("/bench/{}.txt", i), "benchmark document", move |_, _| {
            Ok(Embedding::from_values(vector))
        })?;
    }
    let insert_total = start.elapsed();

    let start = Instant::now();
    store.checkpoint()?;
    let checkpoint = start.elapsed();
    drop(store);

    let start = Instant::now();
    let store = MemoryStore::open(config, args.dimension)?;
    let reopen = start.elapsed();

    let mut samples = Vec::with_capacity(queries.len());
    for query in &queries {
        let start = Instant::now();
        let hits = store.search_vector(query, args.k)?;
        samples.push(start.elapsed());
        std::hint::black_box(hits);
    }

    let report = Report {
        vectors: store.len(),
        dimension: args.dimension,
        insert_total_ms: insert_total.as_millis(),
        insert_per_vector_us: insert_total.as_micros() / args.vectors.max(1) as u128,
        checkpoint_ms: checkpoint.as_millis(),
        reopen_ms: reopen.as_millis(),
        search: Latency::from_samples(samples),
    };
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
