// Shingle Classifier
// Offline plagiarism classifier: word 5-gram shingles of a chunk are looked
// up in a reference corpus, and the containment ratio is turned into
// two-class logits (original, plagiarized).

use super::{ScoringError, SequenceClassifier};
use regex::Regex;
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use std::sync::OnceLock;
use tracing::debug;
use xxhash_rust::xxh3::xxh3_64;

pub const SHINGLE_SIZE: usize = 5;

/// Containment at which both classes are equally likely.
const CONTAINMENT_CENTER: f64 = 0.5;
const LOGIT_SCALE: f64 = 10.0;

/// Polynomial base for combining word hashes into a shingle hash.
const BASE: u64 = 1_000_003;

fn word_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\w+").expect("word regex"))
}

fn shingles(text: &str) -> HashSet<u64> {
    let lowered = text.to_lowercase();
    let words: Vec<u64> = word_re()
        .find_iter(&lowered)
        .map(|m| xxh3_64(m.as_str().as_bytes()))
        .collect();

    words
        .windows(SHINGLE_SIZE)
        .map(|w| {
            w.iter()
                .fold(0u64, |h, &word| h.wrapping_mul(BASE).wrapping_add(word))
        })
        .collect()
}

#[derive(Debug, Clone, Default)]
pub struct ShingleClassifier {
    reference: HashSet<u64>,
    documents: usize,
}

impl ShingleClassifier {
    pub fn from_texts<I, S>(texts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut classifier = Self::default();
        for text in texts {
            classifier.reference.extend(shingles(text.as_ref()));
            classifier.documents += 1;
        }
        classifier
    }

    /// Load every `.txt` file directly inside `dir` as a reference document.
    pub fn from_dir(dir: &Path) -> Result<Self, ScoringError> {
        let entries = fs::read_dir(dir)
            .map_err(|e| ScoringError::Corpus(format!("{}: {}", dir.display(), e)))?;

        let mut texts = Vec::new();
        for entry in entries.filter_map(|e| e.ok()) {
            let path = entry.path();
            let is_txt = path
                .extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| ext.eq_ignore_ascii_case("txt"));
            if !is_txt {
                continue;
            }
            let text = fs::read_to_string(&path)
                .map_err(|e| ScoringError::Corpus(format!("{}: {}", path.display(), e)))?;
            debug!(path = %path.display(), "[MODELS] reference document loaded");
            texts.push(text);
        }

        Ok(Self::from_texts(texts))
    }

    pub fn reference_count(&self) -> usize {
        self.documents
    }

    /// Fraction of the text's shingles that occur in the reference corpus.
    pub fn containment(&self, text: &str) -> f64 {
        let chunk = shingles(text);
        if chunk.is_empty() || self.reference.is_empty() {
            return 0.0;
        }
        let hits = chunk.iter().filter(|s| self.reference.contains(s)).count();
        hits as f64 / chunk.len() as f64
    }
}

impl SequenceClassifier for ShingleClassifier {
    fn logits(&self, text: &str) -> Result<Vec<f64>, ScoringError> {
        let c = self.containment(text);
        Ok(vec![
            LOGIT_SCALE * (CONTAINMENT_CENTER - c),
            LOGIT_SCALE * (c - CONTAINMENT_CENTER),
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PlagiarismLabel;
    use crate::services::scoring::{ChunkScorer, PlagiarismScorer};

    const SOURCE: &str = "The mitochondria is the powerhouse of the cell and produces \
        most of the chemical energy needed to power biochemical reactions.";

    #[test]
    fn test_copied_text_is_plagiarized() {
        let classifier = ShingleClassifier::from_texts([SOURCE]);
        let scorer = PlagiarismScorer::new(&classifier);
        assert_eq!(scorer.score(SOURCE).unwrap(), PlagiarismLabel::Plagiarized);
        assert!((classifier.containment(SOURCE) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_original_text_is_original() {
        let classifier = ShingleClassifier::from_texts([SOURCE]);
        let scorer = PlagiarismScorer::new(&classifier);
        let own = "My essay argues that urban gardens improve neighbourhood wellbeing \
            by giving residents shared projects and fresh food.";
        assert_eq!(scorer.score(own).unwrap(), PlagiarismLabel::Original);
        assert_eq!(classifier.containment(own), 0.0);
    }

    #[test]
    fn test_empty_corpus_never_flags() {
        let classifier = ShingleClassifier::default();
        assert_eq!(classifier.reference_count(), 0);
        let logits = classifier.logits(SOURCE).unwrap();
        assert!(logits[0] > logits[1]);
    }

    #[test]
    fn test_from_dir_reads_txt_files_only() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.txt"), SOURCE).unwrap();
        fs::write(dir.path().join("B.TXT"), "another reference document with enough words").unwrap();
        fs::write(dir.path().join("notes.md"), SOURCE).unwrap();

        let classifier = ShingleClassifier::from_dir(dir.path()).unwrap();
        assert_eq!(classifier.reference_count(), 2);
        assert!(classifier.containment(SOURCE) > 0.99);
    }

    #[test]
    fn test_shingle_hashes_are_order_sensitive_and_fixed() {
        let forward = shingles("one two three four five");
        let backward = shingles("five four three two one");
        assert_eq!(forward.len(), 1);
        assert_ne!(forward, backward);

        let word = xxh3_64(b"one");
        let expected = (0..SHINGLE_SIZE).fold(0u64, |h, _| h.wrapping_mul(BASE).wrapping_add(word));
        assert_eq!(shingles("One one ONE one one"), HashSet::from([expected]));
    }

    #[test]
    fn test_missing_dir_is_an_error() {
        let err = ShingleClassifier::from_dir(Path::new("/definitely/not/here")).unwrap_err();
        assert!(matches!(err, ScoringError::Corpus(_)));
    }
}
