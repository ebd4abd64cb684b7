// Analysis Pipeline
// Extracted text in, report out: chunking, per-chunk scoring, aggregation,
// whole-text features. Runs synchronously; callers put it on a blocking thread.

use super::aggregation::aggregate;
use super::report_builder::build_report;
use crate::models::{ChunkScoreSet, Report};
use crate::services::language::{detect_language, LanguageError};
use crate::services::scoring::perplexity::is_ai_like;
use crate::services::scoring::{ChunkScorer, ModelHandle, ScoringError};
use crate::services::text_extractor::ExtractError;
use crate::services::text_processor::{
    chunk_text, retained_chunks, stylometric_fingerprint, CHUNK_SIZE, DEFAULT_KEYWORDS,
};
use std::time::Instant;
use thiserror::Error;
use tracing::{debug, info};

/// Every way a submission can fail. The display text is the message written
/// to the error report.
#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("Failed to load configuration: {0}")]
    Config(String),
    #[error("Failed to fetch or parse file: {0}")]
    Extraction(ExtractError),
    #[error("Failed to load models: {0}")]
    ModelLoad(ScoringError),
    #[error("Model inference failed: {0}")]
    Scoring(ScoringError),
    #[error("Language detection failed: {0}")]
    Language(LanguageError),
    #[error("Analysis worker failed: {0}")]
    Worker(String),
}

/// Score `text` and build its report.
pub fn analyze_text(
    text: &str,
    submission_id: &str,
    models: &ModelHandle,
) -> Result<Report, AnalysisError> {
    let start = Instant::now();
    let chunks = chunk_text(text, CHUNK_SIZE);
    let retained = retained_chunks(&chunks);
    info!(
        submission_id,
        chunks = chunks.len(),
        retained = retained.len(),
        "[PIPELINE] text chunked"
    );

    let perplexity = models.perplexity();
    let perplexities = chunks
        .iter()
        .map(|chunk| perplexity.score(chunk))
        .collect::<Result<Vec<f64>, _>>()
        .map_err(AnalysisError::Scoring)?;

    let watermark = models.watermark();
    let plagiarism = models.plagiarism();
    let mut scores = Vec::with_capacity(retained.len());
    for &(chunk_idx, chunk) in &retained {
        let ppl = perplexities[chunk_idx];
        let watermark_score = watermark.score(chunk).map_err(AnalysisError::Scoring)?;
        let label = plagiarism.score(chunk).map_err(AnalysisError::Scoring)?;

        debug!(
            chunk = chunk_idx,
            perplexity = ppl,
            watermark = watermark_score,
            plagiarism = label.as_flag(),
            "[PIPELINE] chunk scored"
        );
        scores.push(ChunkScoreSet {
            ai_flag: u8::from(is_ai_like(ppl)),
            watermark_score,
            plagiarism_flag: label.as_flag(),
        });
    }

    let aggregate = aggregate(&scores, &perplexities);
    let stylometry = stylometric_fingerprint(text, &DEFAULT_KEYWORDS);
    let language = detect_language(text).map_err(AnalysisError::Language)?;

    info!(
        submission_id,
        ai = aggregate.ai_percentage,
        watermark = aggregate.watermark_percentage,
        plagiarism = aggregate.plag_percentage,
        language = %language,
        elapsed_ms = start.elapsed().as_millis() as u64,
        "[PIPELINE] analysis complete"
    );

    Ok(build_report(submission_id, &aggregate, &scores, stylometry, language))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Verdict;
    use crate::services::scoring::{LanguageModel, SequenceClassifier};

    /// One token per character; fixed NLL and entropy.
    struct FixedModel {
        nll: f64,
        entropy: f64,
    }

    impl LanguageModel for FixedModel {
        fn max_positions(&self) -> usize {
            1024
        }

        fn tokenize(&self, text: &str) -> Result<Vec<u32>, ScoringError> {
            Ok(text.chars().map(|c| c as u32).collect())
        }

        fn mean_nll(&self, _window: &[u32], _target_len: usize) -> Result<f64, ScoringError> {
            Ok(self.nll)
        }

        fn token_entropies(&self, ids: &[u32]) -> Result<Vec<f64>, ScoringError> {
            Ok(vec![self.entropy; ids.len()])
        }
    }

    /// Flags chunks containing "copied".
    struct KeywordClassifier;

    impl SequenceClassifier for KeywordClassifier {
        fn logits(&self, text: &str) -> Result<Vec<f64>, ScoringError> {
            if text.contains("copied") {
                Ok(vec![0.0, 1.0])
            } else {
                Ok(vec![1.0, 0.0])
            }
        }
    }

    struct BrokenClassifier;

    impl SequenceClassifier for BrokenClassifier {
        fn logits(&self, _text: &str) -> Result<Vec<f64>, ScoringError> {
            Ok(Vec::new())
        }
    }

    fn handle(nll: f64, entropy: f64) -> ModelHandle {
        ModelHandle::new(Box::new(FixedModel { nll, entropy }), Box::new(KeywordClassifier))
    }

    #[test]
    fn test_empty_text() {
        let report = analyze_text("", "empty", &handle(1.0, 1.0)).unwrap();
        assert!(report.heatmap.is_empty());
        assert!(report.stylometry.is_empty());
        assert_eq!(report.language, "unknown");
        assert_eq!(report.perplexity, None);
        assert_eq!(report.verdict, Verdict::Safe);
    }

    #[test]
    fn test_blank_chunks_skip_scoring_but_count_for_perplexity() {
        // Second chunk is whitespace only; perplexity of a chunk is exp(nll)
        let text = format!("{}{}", "word ".repeat(200), " ".repeat(CHUNK_SIZE));
        let report = analyze_text(&text, "s", &handle(2.0, 1.0)).unwrap();

        assert_eq!(report.heatmap.len(), 1);
        assert!((report.perplexity.unwrap() - 2.0f64.exp()).abs() < 1e-9);
        assert_eq!(report.ai_likelihood, 1.0);
        assert!((report.entropy - 96.0).abs() < 1e-9);
        assert!(report.watermark_detected);
    }

    #[test]
    fn test_plagiarised_chunks_raise_verdict() {
        let text = format!(
            "{}{}",
            "my own words ".repeat(77).chars().take(CHUNK_SIZE).collect::<String>(),
            "copied passage"
        );
        let report = analyze_text(&text, "s", &handle(5.0, 30.0)).unwrap();

        assert_eq!(report.heatmap.len(), 2);
        assert_eq!(report.heatmap[0].score, 0.0);
        assert_eq!(report.heatmap[1].idx, 1);
        assert_eq!(report.heatmap[1].score, 1.0);
        assert!((report.plagiarism_score - 0.5).abs() < 1e-12);
        assert_eq!(report.verdict, Verdict::HighRisk);
        assert_eq!(report.ai_likelihood, 0.0);
        assert_eq!(report.entropy, 0.0);
        assert!(!report.watermark_detected);
    }

    #[test]
    fn test_classifier_failure_is_an_inference_error() {
        let models = ModelHandle::new(
            Box::new(FixedModel { nll: 1.0, entropy: 1.0 }),
            Box::new(BrokenClassifier),
        );
        let err = analyze_text("Some text to classify.", "s", &models).unwrap_err();
        assert!(matches!(err, AnalysisError::Scoring(ScoringError::EmptyLogits)));
        assert!(err.to_string().starts_with("Model inference failed: "));
    }

    #[test]
    fn test_undetectable_language_is_an_error() {
        let err = analyze_text("1234 5678 90", "s", &handle(1.0, 1.0)).unwrap_err();
        assert!(matches!(err, AnalysisError::Language(_)));
        assert!(err.to_string().starts_with("Language detection failed: "));
    }
}
