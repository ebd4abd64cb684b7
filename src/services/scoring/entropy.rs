// Watermark Scorer
// Low predictive entropy reads as templated or watermarked text

use super::{ChunkScorer, LanguageModel, ScoringError};

const ENTROPY_WEIGHT: f64 = 4.0;
const MAX_SCORE: f64 = 100.0;

/// Watermark aggregates strictly above this are reported as detected.
pub const WATERMARK_DETECTION_THRESHOLD: f64 = 50.0;

pub struct WatermarkScorer<'a> {
    model: &'a dyn LanguageModel,
}

impl<'a> WatermarkScorer<'a> {
    pub fn new(model: &'a dyn LanguageModel) -> Self {
        Self { model }
    }
}

impl ChunkScorer for WatermarkScorer<'_> {
    type Output = f64;

    /// Score in `[0, 100]`; a chunk with no tokens scores 0.
    fn score(&self, chunk: &str) -> Result<f64, ScoringError> {
        let mut ids = self.model.tokenize(chunk)?;
        ids.truncate(self.model.max_positions());
        if ids.is_empty() {
            return Ok(0.0);
        }

        let entropies = self.model.token_entropies(&ids)?;
        if entropies.is_empty() {
            return Ok(0.0);
        }
        let avg_entropy = entropies.iter().sum::<f64>() / entropies.len() as f64;
        Ok(watermark_score(avg_entropy))
    }
}

pub fn watermark_score(avg_entropy: f64) -> f64 {
    (MAX_SCORE - ENTROPY_WEIGHT * avg_entropy).clamp(0.0, MAX_SCORE)
}

pub fn is_watermarked(aggregate: f64) -> bool {
    aggregate > WATERMARK_DETECTION_THRESHOLD
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedEntropy(f64);

    impl LanguageModel for FixedEntropy {
        fn max_positions(&self) -> usize {
            4
        }

        fn tokenize(&self, text: &str) -> Result<Vec<u32>, ScoringError> {
            Ok(text.bytes().map(u32::from).collect())
        }

        fn mean_nll(&self, _window: &[u32], _target_len: usize) -> Result<f64, ScoringError> {
            Ok(0.0)
        }

        fn token_entropies(&self, ids: &[u32]) -> Result<Vec<f64>, ScoringError> {
            assert!(ids.len() <= 4, "input must be truncated to max_positions");
            Ok(vec![self.0; ids.len()])
        }
    }

    #[test]
    fn test_score_mapping_and_clamp() {
        assert_eq!(watermark_score(0.0), 100.0);
        assert_eq!(watermark_score(5.0), 80.0);
        assert_eq!(watermark_score(25.0), 0.0);
        assert_eq!(watermark_score(40.0), 0.0);
        assert_eq!(watermark_score(-3.0), 100.0);
    }

    #[test]
    fn test_scorer_truncates_long_input() {
        let model = FixedEntropy(10.0);
        let score = WatermarkScorer::new(&model).score("abcdefgh").unwrap();
        assert!((score - 60.0).abs() < 1e-9);
    }

    #[test]
    fn test_empty_chunk_scores_zero() {
        let model = FixedEntropy(0.0);
        assert_eq!(WatermarkScorer::new(&model).score("").unwrap(), 0.0);
    }

    #[test]
    fn test_detection_is_strictly_above_fifty() {
        assert!(!is_watermarked(50.0));
        assert!(is_watermarked(50.0001));
    }
}
