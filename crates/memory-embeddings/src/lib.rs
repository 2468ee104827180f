//! # memory-embeddings
//!
//! The embedding capability consumed by the semantic memory store:
//! given text, produce a fixed-length vector.
//!
//! ## Backends
//! - [`CandleEmbedder`]: local all-MiniLM-L6-v2 inference via Candle
//!   (384 dimensions, model files cached from Hugging Face Hub)
//! - [`HashingEmbedder`]: deterministic FNV-1a token hashing, no model
//!   download, suitable for tests and offline bootstrapping
//!
//! Both produce unit-length vectors, so inner-product search over them
//! ranks by cosine similarity.

pub mod cache;
pub mod candle;
pub mod error;
pub mod factory;
pub mod hashing;
pub mod model;

pub use crate::candle::CandleEmbedder;
pub use cache::{ensure_model_files, ModelCache, ModelPaths, DEFAULT_MODEL_REPO, MODEL_FILES};
pub use error::EmbeddingError;
pub use factory::embedder_from_settings;
pub use hashing::HashingEmbedder;
pub use model::{Embedding, EmbeddingModel, ModelInfo};
