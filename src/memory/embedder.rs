//! Text embeddings for the local similarity index
//!
//! `HashingEmbedder` maps word tokens and character trigrams into a fixed
//! number of signed buckets (feature hashing) and normalises the result. It is
//! deterministic across processes, so persisted keys can be re-embedded on load.
//! It only sees shared surface forms: "car repair" and "automobile maintenance"
//! land about 2.0 apart.
//!
//! `MiniLmEmbedder` runs all-MiniLM-L6-v2 locally through `fastembed` and
//! captures meaning rather than spelling. Requires the `local-embeddings`
//! feature; the model is downloaded and cached on first use.

use crate::config::{EmbedderKind, IndexConfig};
use crate::error::{Error, Result};
use sha2::{Digest, Sha256};
use std::sync::Arc;

/// Default embedding dimensions for the hashing embedder
pub const DEFAULT_DIMENSIONS: usize = 512;

/// Output dimensions of all-MiniLM-L6-v2
pub const MINILM_DIMENSIONS: usize = 384;

/// Turns text into a fixed-length vector
pub trait Embedder: Send + Sync {
    /// Length of every vector produced
    fn dimensions(&self) -> usize;

    /// Human-readable model name
    fn model_name(&self) -> &str;

    /// Embed text into a unit vector (all zeros when the text has no features)
    fn embed(&self, text: &str) -> Result<Vec<f32>>;
}

/// Build the embedder selected by `config`
pub fn from_config(config: &IndexConfig) -> Result<Arc<dyn Embedder>> {
    match config.embedder {
        EmbedderKind::Hashing => Ok(Arc::new(HashingEmbedder::new(config.dimensions))),
        EmbedderKind::MiniLm => minilm(),
    }
}

#[cfg(feature = "local-embeddings")]
fn minilm() -> Result<Arc<dyn Embedder>> {
    Ok(Arc::new(MiniLmEmbedder::new()?))
}

#[cfg(not(feature = "local-embeddings"))]
fn minilm() -> Result<Arc<dyn Embedder>> {
    Err(Error::Config(
        "embedder \"minilm\" requires the `local-embeddings` feature".to_string(),
    ))
}

/// Feature-hashing embedder over words and character trigrams
#[derive(Debug, Clone)]
pub struct HashingEmbedder {
    dimensions: usize,
}

impl HashingEmbedder {
    pub fn new(dimensions: usize) -> Self {
        Self {
            dimensions: dimensions.max(1),
        }
    }

    fn add_feature(&self, vector: &mut [f32], feature: &str, weight: f32) {
        let digest = Sha256::digest(feature.as_bytes());
        let mut bucket = [0u8; 8];
        bucket.copy_from_slice(&digest[..8]);
        let index = (u64::from_le_bytes(bucket) % self.dimensions as u64) as usize;
        let sign = if digest[8] & 1 == 0 { 1.0 } else { -1.0 };
        vector[index] += sign * weight;
    }
}

impl Default for HashingEmbedder {
    fn default() -> Self {
        Self::new(DEFAULT_DIMENSIONS)
    }
}

impl Embedder for HashingEmbedder {
    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn model_name(&self) -> &str {
        "feature-hashing"
    }

    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut vector = vec![0.0f32; self.dimensions];
        let lowered = text.to_lowercase();

        for word in lowered
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
        {
            self.add_feature(&mut vector, &format!("w:{}", word), 1.0);

            let padded: Vec<char> = format!("#{}#", word).chars().collect();
            for gram in padded.windows(3) {
                let gram: String = gram.iter().collect();
                self.add_feature(&mut vector, &format!("g:{}", gram), 0.5);
            }
        }

        normalize(&mut vector);
        Ok(vector)
    }
}

/// Local all-MiniLM-L6-v2 sentence embeddings via fastembed
#[cfg(feature = "local-embeddings")]
pub struct MiniLmEmbedder {
    model: std::sync::Mutex<fastembed::TextEmbedding>,
}

#[cfg(feature = "local-embeddings")]
impl MiniLmEmbedder {
    /// Load the model, downloading it into the fastembed cache if needed
    pub fn new() -> Result<Self> {
        use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};

        let model = TextEmbedding::try_new(InitOptions::new(EmbeddingModel::AllMiniLML6V2))
            .map_err(|e| Error::Index(format!("failed to initialize MiniLM model: {}", e)))?;
        tracing::info!("Initialized local embedder all-MiniLM-L6-v2");

        Ok(Self {
            model: std::sync::Mutex::new(model),
        })
    }
}

#[cfg(feature = "local-embeddings")]
impl std::fmt::Debug for MiniLmEmbedder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MiniLmEmbedder")
            .field("dimensions", &MINILM_DIMENSIONS)
            .finish()
    }
}

#[cfg(feature = "local-embeddings")]
impl Embedder for MiniLmEmbedder {
    fn dimensions(&self) -> usize {
        MINILM_DIMENSIONS
    }

    fn model_name(&self) -> &str {
        "all-MiniLM-L6-v2"
    }

    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut model = self
            .model
            .lock()
            .map_err(|e| Error::Index(format!("failed to acquire model lock: {}", e)))?;

        let mut vector = model
            .embed(vec![text], None)
            .map_err(|e| Error::Index(format!("failed to generate embedding: {}", e)))?
            .into_iter()
            .next()
            .ok_or_else(|| Error::Index("no embedding returned".to_string()))?;

        normalize(&mut vector);
        Ok(vector)
    }
}

/// Scale a vector to unit length in place; zero vectors are left untouched.
pub fn normalize(vector: &mut [f32]) {
    let norm: f32 = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for x in vector.iter_mut() {
            *x /= norm;
        }
    }
}

/// Squared Euclidean distance. For unit vectors this lies in `[0, 4]`.
pub fn squared_l2(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b.iter()).map(|(x, y)| (x - y) * (x - y)).sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_embedding_is_unit_length() {
        let embedder = HashingEmbedder::new(128);
        let v = embedder
            .embed("adding fractions with unlike denominators")
            .unwrap();
        assert_eq!(v.len(), 128);
        let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_embedding_is_deterministic() {
        let a = HashingEmbedder::new(64).embed("Graph Coloring").unwrap();
        let b = HashingEmbedder::new(64).embed("graph coloring").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_empty_text_is_zero_vector() {
        let v = HashingEmbedder::new(32).embed("  ,, ").unwrap();
        assert!(v.iter().all(|x| *x == 0.0));
    }

    #[test]
    fn test_related_text_is_closer() {
        let embedder = HashingEmbedder::default();
        let query = embedder.embed("chess openings").unwrap();
        let near = embedder.embed("chess opening theory").unwrap();
        let far = embedder.embed("tax deductions").unwrap();

        assert!(squared_l2(&query, &near) < squared_l2(&query, &far));
    }

    #[test]
    fn test_identical_text_has_zero_distance() {
        let embedder = HashingEmbedder::default();
        let v = embedder.embed("spreadsheet formulas").unwrap();
        assert!(squared_l2(&v, &v).abs() < f32::EPSILON);
    }

    #[test]
    fn test_zero_dimensions_clamped() {
        assert_eq!(HashingEmbedder::new(0).dimensions(), 1);
    }

    #[test]
    fn test_from_config_defaults_to_hashing() {
        let config = IndexConfig {
            dimensions: 64,
            ..IndexConfig::default()
        };
        let embedder = from_config(&config).unwrap();
        assert_eq!(embedder.model_name(), "feature-hashing");
        assert_eq!(embedder.dimensions(), 64);
    }

    #[cfg(not(feature = "local-embeddings"))]
    #[test]
    fn test_minilm_without_feature_is_config_error() {
        let config = IndexConfig {
            embedder: EmbedderKind::MiniLm,
            ..IndexConfig::default()
        };
        assert!(matches!(from_config(&config), Err(Error::Config(_))));
    }

    #[cfg(feature = "local-embeddings")]
    #[test]
    #[ignore = "downloads the MiniLM model on first run"]
    fn test_minilm_relates_synonymous_topics() {
        let embedder = MiniLmEmbedder::new().unwrap();
        let query = embedder.embed("car repair").unwrap();
        let synonym = embedder.embed("automobile maintenance").unwrap();
        let unrelated = embedder.embed("baroque music history").unwrap();

        assert_eq!(query.len(), MINILM_DIMENSIONS);
        let near = squared_l2(&query, &synonym);
        assert!(near < 1.7, "synonymous topics should be within 1.7, got {near}");
        assert!(near < squared_l2(&query, &unrelated));
    }
}
