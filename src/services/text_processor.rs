// Text Processing Service
// Fixed-size chunking and whole-text stylometric fingerprinting

use crate::models::{StylometricFingerprint, Stylometry};
use regex::Regex;
use std::collections::HashSet;
use std::sync::OnceLock;

/// Characters per scoring chunk.
pub const CHUNK_SIZE: usize = 1000;

/// Keywords counted by the stylometric fingerprint.
pub const DEFAULT_KEYWORDS: [&str; 5] = ["AI", "machine", "learning", "data", "algorithm"];

fn word_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\b\w+\b").expect("word regex"))
}

fn sentence_break_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[.!?]+").expect("sentence regex"))
}

/// Split text into contiguous windows of `size` characters (Unicode scalar values).
///
/// The windows do not overlap and ignore word or sentence boundaries; the last one
/// may be shorter. Concatenating the result gives back `text` exactly.
pub fn chunk_text(text: &str, size: usize) -> Vec<&str> {
    let size = size.max(1);
    let mut chunks = Vec::new();
    let mut start = 0;
    let mut count = 0;

    for (idx, _) in text.char_indices() {
        if count == size {
            chunks.push(&text[start..idx]);
            start = idx;
            count = 0;
        }
        count += 1;
    }

    if start < text.len() {
        chunks.push(&text[start..]);
    }

    chunks
}

/// Chunks that carry content, each paired with its index in `chunks`. Order is
/// preserved; the position in the returned list is the heatmap index.
pub fn retained_chunks<'a>(chunks: &[&'a str]) -> Vec<(usize, &'a str)> {
    chunks
        .iter()
        .copied()
        .enumerate()
        .filter(|(_, c)| !c.trim().is_empty())
        .collect()
}

/// Compute the whole-text stylometric fingerprint.
///
/// Blank text has no fingerprint at all and yields [`Stylometry::Empty`].
pub fn stylometric_fingerprint(text: &str, keywords: &[&str]) -> Stylometry {
    if text.trim().is_empty() {
        return Stylometry::Empty {};
    }

    let lines = text.split('\n').filter(|ln| !ln.trim().is_empty()).count();

    let sentences = sentence_break_re()
        .split(text)
        .filter(|s| !s.trim().is_empty())
        .count();

    let lowered = text.to_lowercase();
    let words: Vec<&str> = word_re().find_iter(&lowered).map(|m| m.as_str()).collect();
    let total_words = words.len();
    let unique_words = words.iter().copied().collect::<HashSet<&str>>().len();

    let avg_sentence_length = if sentences > 0 {
        total_words as f64 / sentences as f64
    } else {
        0.0
    };

    let (avg_word_length, vocabulary_richness) = if total_words > 0 {
        let chars: usize = words.iter().map(|w| w.chars().count()).sum();
        (
            chars as f64 / total_words as f64,
            unique_words as f64 / total_words as f64,
        )
    } else {
        (0.0, 0.0)
    };

    let keyword_count = keywords
        .iter()
        .map(|k| count_overlapping(&lowered, &k.to_lowercase()))
        .sum();

    Stylometry::Fingerprint(StylometricFingerprint {
        lines,
        sentences,
        words: total_words,
        unique_words,
        avg_sentence_length,
        avg_word_length,
        vocabulary_richness,
        keyword_count,
    })
}

/// Occurrences of `needle` in `haystack`, overlapping matches included.
fn count_overlapping(haystack: &str, needle: &str) -> usize {
    let Some(first) = needle.chars().next() else {
        return 0;
    };

    let mut count = 0;
    let mut start = 0;
    while let Some(pos) = haystack[start..].find(needle) {
        count += 1;
        start += pos + first.len_utf8();
    }
    count
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fingerprint(text: &str) -> StylometricFingerprint {
        match stylometric_fingerprint(text, &DEFAULT_KEYWORDS) {
            Stylometry::Fingerprint(fp) => fp,
            Stylometry::Empty {} => panic!("expected a fingerprint for {text:?}"),
        }
    }

    #[test]
    fn test_chunking_is_lossless() {
        let text = "Lorem ipsum dolor sit amet, ünïcödé text — with dashes.\n\nAnd more.";
        for size in 1..=text.chars().count() + 2 {
            let chunks = chunk_text(text, size);
            assert_eq!(chunks.concat(), text, "size {size}");
            assert!(chunks.iter().all(|c| c.chars().count() <= size));
            if let Some((last, rest)) = chunks.split_last() {
                assert!(rest.iter().all(|c| c.chars().count() == size));
                assert!(!last.is_empty());
            }
        }
    }

    #[test]
    fn test_chunking_counts_characters_not_bytes() {
        let text = "é".repeat(1500);
        let chunks = chunk_text(&text, CHUNK_SIZE);
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].chars().count(), 1000);
        assert_eq!(chunks[1].chars().count(), 500);
    }

    #[test]
    fn test_chunking_empty_text() {
        assert!(chunk_text("", CHUNK_SIZE).is_empty());
        assert_eq!(chunk_text("abc", 0), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_retained_chunks_drop_blank_windows() {
        let text = format!("{}{}{}", "a".repeat(4), " ".repeat(4), "b\n\t ");
        let chunks = chunk_text(&text, 4);
        assert_eq!(chunks.len(), 3);
        assert_eq!(retained_chunks(&chunks), vec![(0, "aaaa"), (2, "b\n\t ")]);
    }

    #[test]
    fn test_fingerprint_basic_counts() {
        let fp = fingerprint("Hello world. This is a test.");
        assert_eq!(fp.lines, 1);
        assert_eq!(fp.sentences, 2);
        assert_eq!(fp.words, 6);
        assert_eq!(fp.unique_words, 6);
        assert!((fp.avg_sentence_length - 3.0).abs() < 1e-9);
        assert!((fp.avg_word_length - 21.0 / 6.0).abs() < 1e-9);
        assert!((fp.vocabulary_richness - 1.0).abs() < 1e-9);
        assert_eq!(fp.keyword_count, 0);
    }

    #[test]
    fn test_fingerprint_case_folds_words() {
        let fp = fingerprint("Data data DATA!\n\n\nMore data?");
        assert_eq!(fp.lines, 2);
        assert_eq!(fp.sentences, 2);
        assert_eq!(fp.words, 5);
        assert_eq!(fp.unique_words, 2);
        assert_eq!(fp.keyword_count, 4);
    }

    #[test]
    fn test_keyword_substrings_are_counted() {
        // "ai" also matches inside "said" and twice inside "maintain"
        let fp = fingerprint("She said AI will maintain machine learning.");
        assert_eq!(fp.keyword_count, 4 + 1 + 1);
    }

    #[test]
    fn test_overlapping_occurrences() {
        assert_eq!(count_overlapping("aaaa", "aa"), 3);
        assert_eq!(count_overlapping("abc", ""), 0);
    }

    #[test]
    fn test_no_sentences_or_words() {
        let fp = fingerprint("... !!! ???");
        assert_eq!(fp.sentences, 0);
        assert_eq!(fp.words, 0);
        assert_eq!(fp.avg_sentence_length, 0.0);
        assert_eq!(fp.avg_word_length, 0.0);
        assert_eq!(fp.vocabulary_richness, 0.0);
    }

    #[test]
    fn test_blank_text_has_empty_fingerprint() {
        assert!(stylometric_fingerprint("", &DEFAULT_KEYWORDS).is_empty());
        assert!(stylometric_fingerprint(" \n\t", &DEFAULT_KEYWORDS).is_empty());
    }
}
