// N-gram Language Model
// Offline causal model used when no inference server is configured.
// Each prediction is estimated from the tokens seen earlier in the same
// window: a bigram model backed off to a unigram model, both with
// Witten-Bell smoothing over a hashed vocabulary. The share of mass left
// for unseen tokens follows how often the window has produced new ones, so
// repetitive, formulaic text gets low perplexity and low entropy while
// varied prose stays close to uniform.

use super::{LanguageModel, ScoringError};
use regex::Regex;
use std::collections::HashMap;
use std::sync::OnceLock;
use xxhash_rust::xxh3::xxh3_64;

pub const VOCAB_SIZE: usize = 50_257;
pub const MAX_POSITIONS: usize = 1024;

/// Entropy reported for a uniform next-token distribution. Reported
/// entropies are scaled onto `[0, ENTROPY_CEILING]`, the range over which the
/// watermark score moves from 100 down to 0.
pub const ENTROPY_CEILING: f64 = 25.0;

fn token_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\w+|[^\w\s]").expect("token regex"))
}

fn token_id(token: &str) -> u32 {
    (xxh3_64(token.as_bytes()) % VOCAB_SIZE as u64) as u32
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NgramModel;

impl LanguageModel for NgramModel {
    fn max_positions(&self) -> usize {
        MAX_POSITIONS
    }

    fn tokenize(&self, text: &str) -> Result<Vec<u32>, ScoringError> {
        let lowered = text.to_lowercase();
        Ok(token_re()
            .find_iter(&lowered)
            .map(|m| token_id(m.as_str()))
            .collect())
    }

    fn mean_nll(&self, window: &[u32], target_len: usize) -> Result<f64, ScoringError> {
        let start = window.len().saturating_sub(target_len).max(1);
        let mut counts = WindowCounts::default();
        let mut nll = 0.0;
        let mut scored = 0usize;

        for (i, &id) in window.iter().enumerate() {
            if i >= start {
                nll -= counts.prob(id).ln();
                scored += 1;
            }
            counts.observe(id);
        }

        if scored == 0 {
            return Ok(0.0);
        }
        Ok(nll / scored as f64)
    }

    fn token_entropies(&self, ids: &[u32]) -> Result<Vec<f64>, ScoringError> {
        let scale = ENTROPY_CEILING / (VOCAB_SIZE as f64).ln();
        let mut counts = WindowCounts::default();
        Ok(ids
            .iter()
            .map(|&id| {
                counts.observe(id);
                counts.entropy() * scale
            })
            .collect())
    }
}

/// Running counts over the prefix of a window.
#[derive(Debug, Default)]
struct WindowCounts {
    unigrams: HashMap<u32, usize>,
    bigrams: HashMap<(u32, u32), usize>,
    successors: HashMap<u32, Successors>,
    total: usize,
    prev: Option<u32>,
}

/// Tokens seen after one context token: how many, and how many distinct.
#[derive(Debug, Default, Clone, Copy)]
struct Successors {
    count: usize,
    types: usize,
}

impl WindowCounts {
    fn observe(&mut self, id: u32) {
        *self.unigrams.entry(id).or_insert(0) += 1;
        self.total += 1;
        if let Some(prev) = self.prev {
            let pair = self.bigrams.entry((prev, id)).or_insert(0);
            let successors = self.successors.entry(prev).or_default();
            if *pair == 0 {
                successors.types += 1;
            }
            *pair += 1;
            successors.count += 1;
        }
        self.prev = Some(id);
    }

    /// Unigram estimate; unseen tokens share `types / (total + types)`.
    fn unigram(&self, count: usize) -> f64 {
        if self.total == 0 {
            return 1.0 / VOCAB_SIZE as f64;
        }
        let types = self.unigrams.len() as f64;
        (count as f64 + types / VOCAB_SIZE as f64) / (self.total as f64 + types)
    }

    /// Bigram estimate for the current context, backed off to `unigram`.
    fn backoff(&self, id: u32, unigram: f64) -> f64 {
        let Some(prev) = self.prev else {
            return unigram;
        };
        let Some(successors) = self.successors.get(&prev).copied() else {
            return unigram;
        };
        let pair = self.bigrams.get(&(prev, id)).copied().unwrap_or(0);
        let types = successors.types as f64;
        (pair as f64 + types * unigram) / (successors.count as f64 + types)
    }

    /// Probability that `id` comes next.
    fn prob(&self, id: u32) -> f64 {
        let unigram = self.unigram(self.unigrams.get(&id).copied().unwrap_or(0));
        self.backoff(id, unigram)
    }

    /// Probability of any single token not yet seen in the window.
    fn unseen_prob(&self) -> f64 {
        let unigram = self.unigram(0);
        match self.prev.and_then(|prev| self.successors.get(&prev)) {
            Some(s) => s.types as f64 * unigram / (s.count as f64 + s.types as f64),
            None => unigram,
        }
    }

    /// Entropy in nats of the full next-token distribution. Unseen tokens
    /// share one probability, so they are summed in closed form.
    fn entropy(&self) -> f64 {
        let mut h: f64 = self
            .unigrams
            .keys()
            .map(|&id| {
                let p = self.prob(id);
                -p * p.ln()
            })
            .sum();

        let unseen = VOCAB_SIZE.saturating_sub(self.unigrams.len()) as f64;
        let p0 = self.unseen_prob();
        if unseen > 0.0 && p0 > 0.0 {
            h -= unseen * p0 * p0.ln();
        }
        h
    }
}
