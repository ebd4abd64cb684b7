// IntegrityScan Data Models
// Submission sources, per-chunk scores and the JSON report

use serde::Serialize;
use std::path::{Path, PathBuf};

// ============ Submission ============

/// Where a submission's bytes come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmissionSource {
    LocalPath(PathBuf),
    RemoteUrl(String),
}

impl SubmissionSource {
    /// Anything starting with `http://` or `https://` is fetched; everything else is a path.
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        let lower = trimmed.to_ascii_lowercase();
        if lower.starts_with("http://") || lower.starts_with("https://") {
            Self::RemoteUrl(trimmed.to_string())
        } else {
            Self::LocalPath(PathBuf::from(trimmed))
        }
    }

    pub fn format(&self) -> DocumentFormat {
        match self {
            Self::LocalPath(path) => DocumentFormat::from_path(path),
            Self::RemoteUrl(url) => DocumentFormat::from_url(url),
        }
    }

    pub fn is_remote(&self) -> bool {
        matches!(self, Self::RemoteUrl(_))
    }
}

impl std::fmt::Display for SubmissionSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::LocalPath(path) => write!(f, "{}", path.display()),
            Self::RemoteUrl(url) => f.write_str(url),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    Txt,
    Docx,
    Pdf,
    Unknown,
}

impl DocumentFormat {
    /// Substring scan of a URL, first match wins: `.docx`, `.txt`, `.pdf`.
    pub fn from_url(url: &str) -> Self {
        let lower = url.to_lowercase();
        if lower.contains(".docx") {
            Self::Docx
        } else if lower.contains(".txt") {
            Self::Txt
        } else if lower.contains(".pdf") {
            Self::Pdf
        } else {
            Self::Unknown
        }
    }

    pub fn from_path(path: &Path) -> Self {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_lowercase();

        match ext.as_str() {
            "txt" => Self::Txt,
            "docx" => Self::Docx,
            "pdf" => Self::Pdf,
            _ => Self::Unknown,
        }
    }

    /// Suffix given to downloaded temp files.
    pub fn temp_suffix(&self) -> &'static str {
        match self {
            Self::Txt => ".txt",
            Self::Docx => ".docx",
            Self::Pdf => ".pdf",
            Self::Unknown => ".bin",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Submission {
    pub id: String,
    pub source: SubmissionSource,
}

impl Submission {
    pub fn new(source: &str, id: &str) -> Self {
        Self {
            id: id.to_string(),
            source: SubmissionSource::parse(source),
        }
    }
}

// ============ Chunk Scores ============

/// Plagiarism classifier decision for one chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlagiarismLabel {
    Original,
    Plagiarized,
}

impl PlagiarismLabel {
    pub fn from_class_index(index: usize) -> Self {
        if index == 0 {
            Self::Original
        } else {
            Self::Plagiarized
        }
    }

    pub fn as_flag(self) -> u8 {
        match self {
            Self::Original => 0,
            Self::Plagiarized => 1,
        }
    }
}

/// Scores for one retained (non-blank) chunk.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChunkScoreSet {
    pub ai_flag: u8,
    pub watermark_score: f64,
    pub plagiarism_flag: u8,
}

/// Submission-level reduction of the chunk scores.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SubmissionAggregate {
    pub ai_percentage: f64,
    pub watermark_percentage: f64,
    pub plag_percentage: f64,
    /// Mean over every chunk, blank ones included. `None` when the text produced no chunks.
    pub mean_perplexity: Option<f64>,
}

// ============ Stylometry ============

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StylometricFingerprint {
    pub lines: usize,
    pub sentences: usize,
    pub words: usize,
    pub unique_words: usize,
    pub avg_sentence_length: f64,
    pub avg_word_length: f64,
    pub vocabulary_richness: f64,
    pub keyword_count: usize,
}

/// Serializes to the fingerprint object, or `{}` for blank text.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Stylometry {
    Fingerprint(StylometricFingerprint),
    Empty {},
}

impl Stylometry {
    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Empty {})
    }
}

// ============ Report ============

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Verdict {
    Safe,
    #[serde(rename = "High Risk")]
    HighRisk,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct HeatmapEntry {
    pub idx: usize,
    pub score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    pub submission_id: String,
    pub plagiarism_score: f64,
    /// Always empty: matches are not attributed to sources.
    pub sources: Vec<serde_json::Value>,
    pub rephrased_detected: bool,
    pub ai_likelihood: f64,
    pub entropy: f64,
    pub perplexity: Option<f64>,
    pub watermark_detected: bool,
    pub stylometry: Stylometry,
    pub heatmap: Vec<HeatmapEntry>,
    pub language: String,
    pub verdict: Verdict,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorReport {
    pub error: String,
}

impl ErrorReport {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            error: message.into(),
        }
    }
}
