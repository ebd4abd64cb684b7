// Perplexity Scorer
// Sliding-window perplexity: windows advance by STRIDE tokens and reach back
// as far as the model's context allows, so every token is scored once with
// up to max_positions - STRIDE tokens of left context.

use super::{ChunkScorer, LanguageModel, ScoringError};

pub const STRIDE: usize = 512;

/// Chunks whose perplexity falls below this are flagged as AI-like.
pub const AI_PERPLEXITY_THRESHOLD: f64 = 25.0;

pub struct PerplexityScorer<'a> {
    model: &'a dyn LanguageModel,
}

impl<'a> PerplexityScorer<'a> {
    pub fn new(model: &'a dyn LanguageModel) -> Self {
        Self { model }
    }
}

impl ChunkScorer for PerplexityScorer<'_> {
    type Output = f64;

    fn score(&self, chunk: &str) -> Result<f64, ScoringError> {
        let ids = self.model.tokenize(chunk)?;
        strided_perplexity(self.model, &ids)
    }
}

/// `exp(total NLL / tokens covered)`; an empty token list scores 0.0.
/// Models whose context is shorter than one stride cannot be windowed.
pub fn strided_perplexity(model: &dyn LanguageModel, ids: &[u32]) -> Result<f64, ScoringError> {
    let n = ids.len();
    if n == 0 {
        return Ok(0.0);
    }

    let max_len = model.max_positions();
    check_context(max_len)?;
    let mut nll_sum = 0.0;
    let mut end_loc = 0;

    for begin in (0..n).step_by(STRIDE) {
        let begin_loc = (begin + STRIDE).saturating_sub(max_len);
        end_loc = (begin + STRIDE).min(n);
        let target_len = end_loc - begin;

        let mean = model.mean_nll(&ids[begin_loc..end_loc], target_len)?;
        nll_sum += mean * target_len as f64;
    }

    Ok((nll_sum / end_loc as f64).exp())
}

/// Reject context sizes the sliding window cannot work with.
pub fn check_context(max_positions: usize) -> Result<(), ScoringError> {
    if max_positions < STRIDE {
        return Err(ScoringError::NotConfigured(format!(
            "model context of {} tokens is shorter than the {}-token stride",
            max_positions, STRIDE
        )));
    }
    Ok(())
}

pub fn is_ai_like(perplexity: f64) -> bool {
    perplexity < AI_PERPLEXITY_THRESHOLD
}
