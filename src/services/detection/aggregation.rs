// Aggregation Logic
// Reduces per-chunk scores into submission-level percentages and means

use crate::models::{ChunkScoreSet, SubmissionAggregate, Verdict};

/// Plagiarism percentage at which a submission stops being "Safe".
pub const VERDICT_THRESHOLD: f64 = 30.0;

/// Aggregate retained-chunk scores. `perplexities` covers every chunk, blank
/// ones included, so its mean is taken over a different population than the
/// percentages.
pub fn aggregate(scores: &[ChunkScoreSet], perplexities: &[f64]) -> SubmissionAggregate {
    SubmissionAggregate {
        ai_percentage: mean(scores.iter().map(|s| f64::from(s.ai_flag))) * 100.0,
        watermark_percentage: mean(scores.iter().map(|s| s.watermark_score)),
        plag_percentage: mean(scores.iter().map(|s| f64::from(s.plagiarism_flag))) * 100.0,
        mean_perplexity: if perplexities.is_empty() {
            None
        } else {
            Some(mean(perplexities.iter().copied()))
        },
    }
}

pub fn verdict(plag_percentage: f64) -> Verdict {
    if plag_percentage < VERDICT_THRESHOLD {
        Verdict::Safe
    } else {
        Verdict::HighRisk
    }
}

/// Arithmetic mean, 0 for an empty sequence.
fn mean(values: impl Iterator<Item = f64>) -> f64 {
    let (sum, count) = values.fold((0.0, 0usize), |(sum, n), v| (sum + v, n + 1));
    if count == 0 {
        0.0
    } else {
        sum / count as f64
    }
}
