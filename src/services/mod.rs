// IntegrityScan Core Services

pub mod config_store;
pub mod detection;
pub mod language;
pub mod scoring;
pub mod text_extractor;
pub mod text_processor;

pub use config_store::*;
pub use text_processor::*;

pub use detection::{aggregate, analyze_text, build_report, verdict, AnalysisError};
pub use language::{detect_language, LanguageError};
pub use scoring::{ChunkScorer, LanguageModel, ModelHandle, ScoringError, SequenceClassifier};
pub use text_extractor::{ExtractError, Extractor};
