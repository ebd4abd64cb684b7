// Report Builder
// Shapes aggregates, per-chunk flags and whole-text features into the output record

use super::aggregation::verdict;
use crate::models::{ChunkScoreSet, HeatmapEntry, Report, Stylometry, SubmissionAggregate};
use crate::services::scoring::entropy::is_watermarked;

/// Build the final report. Heatmap indices follow the order of `scores`
/// (retained chunks only) and start at 0.
pub fn build_report(
    submission_id: &str,
    aggregate: &SubmissionAggregate,
    scores: &[ChunkScoreSet],
    stylometry: Stylometry,
    language: String,
) -> Report {
    let heatmap = scores
        .iter()
        .enumerate()
        .map(|(idx, s)| HeatmapEntry {
            idx,
            score: f64::from(s.plagiarism_flag),
        })
        .collect();

    Report {
        submission_id: submission_id.to_string(),
        plagiarism_score: aggregate.plag_percentage / 100.0,
        sources: Vec::new(),
        rephrased_detected: false,
        ai_likelihood: aggregate.ai_percentage / 100.0,
        entropy: aggregate.watermark_percentage,
        perplexity: aggregate.mean_perplexity,
        watermark_detected: is_watermarked(aggregate.watermark_percentage),
        stylometry,
        heatmap,
        language,
        verdict: verdict(aggregate.plag_percentage),
    }
}
