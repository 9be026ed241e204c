//! Text embeddings for the Memory Engine's semantic slice.

use anyhow::Result;
use fastembed::{EmbeddingModel as FastEmbedModel, InitOptions, TextEmbedding};
use std::sync::Arc;

pub type Embedding = Vec<f32>;

#[derive(Clone)]
pub struct Embedder {
    model: Arc<TextEmbedding>,
}

impl Embedder {
    pub fn new() -> Result<Self> {
        let mut options = InitOptions::default();
        options.model_name = FastEmbedModel::MultilingualE5Small;
        options.show_download_progress = false;

        let model = TextEmbedding::try_new(options)?;
        Ok(Self { model: Arc::new(model) })
    }

    pub fn embed(&self, text: &str) -> Result<Embedding> {
        self.model
            .embed(vec![text], None)?
            .into_iter()
            .next()
            .ok_or_else(|| anyhow::anyhow!("embedding backend returned no vectors"))
    }
}

/// Cosine similarity in [-1.0, 1.0]; 0.0 for empty or mismatched-length inputs.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}
