// IntegrityScan command line
// Prints exactly one JSON document on stdout: the report, or {"error": ...}
// with exit status 1.

use anyhow::Result;
use clap::error::ErrorKind;
use clap::Parser;
use integrity_scan_lib::{init_logging, run, AnalysisError, ConfigStore, ErrorReport, Submission};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::error;

const USAGE: &str = "Usage: integrity-scan <source> <submissionId>";

#[derive(Parser, Debug)]
#[command(name = "integrity-scan", version, about = "Academic integrity report for one submission")]
struct Cli {
    /// Config file (default: <config dir>/integrity-scan/config.json)
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Pretty-print the JSON output
    #[arg(long)]
    pretty: bool,

    /// Local file path or http(s) URL of the submission
    source: Option<String>,

    /// Identifier echoed back in the report
    submission_id: Option<String>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => e.exit(),
        Err(_) => return emit_error(USAGE),
    };
    let (Some(source), Some(submission_id)) = (cli.source.as_deref(), cli.submission_id.as_deref()) else {
        return emit_error(USAGE);
    };

    init_logging();

    match execute(source, submission_id, cli.config, cli.pretty).await {
        Ok(json) => {
            println!("{}", json);
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("[PIPELINE] submission failed: {:#}", e);
            emit_error(&format!("{:#}", e))
        }
    }
}

async fn execute(
    source: &str,
    submission_id: &str,
    config_path: Option<PathBuf>,
    pretty: bool,
) -> Result<String> {
    let store = match config_path {
        Some(path) => ConfigStore::from_file(path),
        None => ConfigStore::new(ConfigStore::default_config_dir().unwrap_or_else(|| PathBuf::from("."))),
    };
    let config = store.load_with_env().map_err(AnalysisError::Config)?;

    let submission = Submission::new(source, submission_id);
    let report = run(&submission, &config).await?;

    let json = if pretty {
        serde_json::to_string_pretty(&report)?
    } else {
        serde_json::to_string(&report)?
    };
    Ok(json)
}

fn emit_error(message: &str) -> ExitCode {
    match serde_json::to_string(&ErrorReport::new(message)) {
        Ok(json) => println!("{}", json),
        Err(_) => println!("{}", serde_json::json!({ "error": message })),
    }
    ExitCode::FAILURE
}
