// Scoring Module
// Per-chunk signals computed on top of pluggable models:
// - perplexity: strided perplexity under a causal language model
// - entropy: mean next-token entropy mapped to a watermark score
// - plagiarism: binary decision from a sequence classifier
// - ngram / shingle: offline heuristic backends
// - remote: HTTP inference-server backend

pub mod entropy;
pub mod ngram;
pub mod perplexity;
pub mod plagiarism;
pub mod remote;
pub mod shingle;

use crate::services::config_store::{ModelBackend, ModelConfig};
use thiserror::Error;
use tracing::info;

pub use entropy::WatermarkScorer;
pub use ngram::NgramModel;
pub use perplexity::PerplexityScorer;
pub use plagiarism::PlagiarismScorer;
pub use remote::RemoteModel;
pub use shingle::ShingleClassifier;

#[derive(Error, Debug)]
pub enum ScoringError {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),
    #[error("Inference server error: {status} - {message}")]
    ServerError { status: u16, message: String },
    #[error("Classifier returned no logits")]
    EmptyLogits,
    #[error("Model backend not configured: {0}")]
    NotConfigured(String),
    #[error("Failed to load reference corpus: {0}")]
    Corpus(String),
}

/// A causal language model with its tokenizer.
pub trait LanguageModel: Send + Sync {
    /// Longest token window the model accepts.
    fn max_positions(&self) -> usize;

    fn tokenize(&self, text: &str) -> Result<Vec<u32>, ScoringError>;

    /// Mean negative log-likelihood (nats) of the last `target_len` tokens of `window`,
    /// each conditioned on the tokens before it. The first token of the window has no
    /// context and is never a target. Returns 0.0 when nothing is scored.
    fn mean_nll(&self, window: &[u32], target_len: usize) -> Result<f64, ScoringError>;

    /// Entropy (nats) of the next-token distribution after each position of `ids`.
    fn token_entropies(&self, ids: &[u32]) -> Result<Vec<f64>, ScoringError>;
}

/// A sequence classifier; class 0 is "original", class 1 is "plagiarized".
pub trait SequenceClassifier: Send + Sync {
    fn logits(&self, text: &str) -> Result<Vec<f64>, ScoringError>;
}

/// One per-chunk signal.
pub trait ChunkScorer {
    type Output;

    fn score(&self, chunk: &str) -> Result<Self::Output, ScoringError>;
}

/// Models loaded once per process and shared read-only by every scorer.
pub struct ModelHandle {
    language_model: Box<dyn LanguageModel>,
    classifier: Box<dyn SequenceClassifier>,
}

impl ModelHandle {
    pub fn new(
        language_model: Box<dyn LanguageModel>,
        classifier: Box<dyn SequenceClassifier>,
    ) -> Self {
        Self {
            language_model,
            classifier,
        }
    }

    /// Build the backend selected by `config`. The remote backend is contacted once
    /// here, so an unreachable server fails before any text is scored.
    pub fn load(config: &ModelConfig) -> Result<Self, ScoringError> {
        match config.backend {
            ModelBackend::Heuristic => {
                let classifier = match config.reference_corpus_dir.as_deref() {
                    Some(dir) => ShingleClassifier::from_dir(dir)?,
                    None => ShingleClassifier::default(),
                };
                info!(
                    references = classifier.reference_count(),
                    "[MODELS] heuristic backend loaded"
                );
                Ok(Self::new(Box::new(NgramModel::default()), Box::new(classifier)))
            }
            ModelBackend::Remote => {
                let base_url = config.base_url.as_deref().ok_or_else(|| {
                    ScoringError::NotConfigured("remote backend needs model.baseUrl".to_string())
                })?;
                let model = RemoteModel::connect(
                    base_url,
                    config.api_key.as_deref(),
                    config.timeout_secs,
                )?;
                info!(
                    url = base_url,
                    max_positions = model.max_positions(),
                    "[MODELS] remote backend connected"
                );
                let classifier = model.clone();
                Ok(Self::new(Box::new(model), Box::new(classifier)))
            }
        }
    }

    pub fn language_model(&self) -> &dyn LanguageModel {
        self.language_model.as_ref()
    }

    pub fn classifier(&self) -> &dyn SequenceClassifier {
        self.classifier.as_ref()
    }

    pub fn perplexity(&self) -> PerplexityScorer<'_> {
        PerplexityScorer::new(self.language_model())
    }

    pub fn watermark(&self) -> WatermarkScorer<'_> {
        WatermarkScorer::new(self.language_model())
    }

    pub fn plagiarism(&self) -> PlagiarismScorer<'_> {
        PlagiarismScorer::new(self.classifier())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_heuristic_backend_loads_without_corpus() {
        let handle = ModelHandle::load(&ModelConfig::default()).unwrap();
        assert_eq!(handle.language_model().max_positions(), ngram::MAX_POSITIONS);
        let logits = handle.classifier().logits("some text").unwrap();
        assert_eq!(logits.len(), 2);
    }

    #[test]
    fn test_remote_backend_requires_url() {
        let config = ModelConfig {
            backend: ModelBackend::Remote,
            ..ModelConfig::default()
        };
        assert!(matches!(
            ModelHandle::load(&config),
            Err(ScoringError::NotConfigured(_))
        ));
    }
}
