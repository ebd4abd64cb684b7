// Detection Module
// Submission analysis organized into specialized submodules:
// - aggregation: reduces chunk scores into submission-level figures
// - report_builder: shapes aggregates into the output record
// - pipeline: text to report, end to end

pub mod aggregation;
pub mod pipeline;
pub mod report_builder;

pub use aggregation::{aggregate, verdict, VERDICT_THRESHOLD};
pub use pipeline::{analyze_text, AnalysisError};
pub use report_builder::build_report;
