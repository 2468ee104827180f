//! Build the configured embedder.

use std::sync::Arc;

use memory_types::{EmbedderKind, EmbedderSettings};
use tracing::info;

use crate::cache::ModelCache;
use crate::candle::CandleEmbedder;
use crate::error::EmbeddingError;
use crate::hashing::HashingEmbedder;
use crate::model::EmbeddingModel;

/// Construct the embedder selected in settings.
///
/// The Candle backend downloads model files on first use.
pub fn embedder_from_settings(
    settings: &EmbedderSettings,
    cache_dir: Option<std::path::PathBuf>,
) -> Result<Arc<dyn EmbeddingModel>, EmbeddingError> {
    let embedder: Arc<dyn EmbeddingModel> = match settings.kind {
        EmbedderKind::Candle => {
            let cache = ModelCache::from_settings(settings.model_repo.clone(), cache_dir);
            Arc::new(CandleEmbedder::load(&cache)?)
        }
        EmbedderKind::Hashing => Arc::new(HashingEmbedder::new(settings.dimension)?),
    };
    info!(
        model = %embedder.info().name,
        dim = embedder.dimension(),
        "Embedder ready"
    );
    Ok(embedder)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hashing_from_settings() {
        let settings = EmbedderSettings {
            kind: EmbedderKind::Hashing,
            dimension: 32,
            ..Default::default()
        };
        let embedder = embedder_from_settings(&settings, None).unwrap();
        assert_eq!(embedder.dimension(), 32);
        assert_eq!(embedder.info().name, "fnv1a-32");
    }

    #[test]
    fn test_hashing_zero_dimension_fails() {
        let settings = EmbedderSettings {
            kind: EmbedderKind::Hashing,
            dimension: 0,
            ..Default::default()
        };
        assert!(embedder_from_settings(&settings, None).is_err());
    }
}
