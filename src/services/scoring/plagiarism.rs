// Plagiarism Scorer
// Softmax over classifier logits, highest-probability class wins

use super::{ChunkScorer, ScoringError, SequenceClassifier};
use crate::models::PlagiarismLabel;

pub struct PlagiarismScorer<'a> {
    classifier: &'a dyn SequenceClassifier,
}

impl<'a> PlagiarismScorer<'a> {
    pub fn new(classifier: &'a dyn SequenceClassifier) -> Self {
        Self { classifier }
    }
}

impl ChunkScorer for PlagiarismScorer<'_> {
    type Output = PlagiarismLabel;

    fn score(&self, chunk: &str) -> Result<PlagiarismLabel, ScoringError> {
        let logits = self.classifier.logits(chunk)?;
        let probs = softmax(&logits);
        let class = argmax(&probs).ok_or(ScoringError::EmptyLogits)?;
        Ok(PlagiarismLabel::from_class_index(class))
    }
}

/// Numerically stable softmax.
pub fn softmax(logits: &[f64]) -> Vec<f64> {
    let max = logits.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let exps: Vec<f64> = logits.iter().map(|l| (l - max).exp()).collect();
    let total: f64 = exps.iter().sum();
    exps.iter().map(|e| e / total).collect()
}

/// Index of the largest value; ties resolve to the lowest index.
fn argmax(values: &[f64]) -> Option<usize> {
    values
        .iter()
        .enumerate()
        .fold(None, |best: Option<(usize, f64)>, (idx, &v)| match best {
            Some((_, bv)) if bv >= v => best,
            _ => Some((idx, v)),
        })
        .map(|(idx, _)| idx)
}
