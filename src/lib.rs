pub mod models;
pub mod services;

pub use models::{ErrorReport, Report, Submission, SubmissionSource};
pub use services::{AnalysisError, AppConfig, ConfigStore};

use services::scoring::ModelHandle;
use services::text_extractor::Extractor;
use services::{analyze_text, ModelConfig};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};
use std::time::Instant;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const LOG_PREFIX: &str = "integrity-scan_";
const LOGS_TO_KEEP: usize = 30;

static LOG_GUARD: OnceLock<WorkerGuard> = OnceLock::new();

fn env_flag(name: &str) -> bool {
    matches!(
        std::env::var(name).as_deref(),
        Ok("1") | Ok("true") | Ok("TRUE")
    )
}

/// Initialize logging with a timestamped file per run. Stdout carries the
/// report, so console output always goes to stderr.
pub fn init_logging() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    if env_flag("INTEGRITY_SCAN_DISABLE_FILE_LOG") {
        init_console_only_logging(env_filter);
        info!("File logging disabled via INTEGRITY_SCAN_DISABLE_FILE_LOG");
        return;
    }

    let logs_dir = match std::env::var("INTEGRITY_SCAN_LOG_DIR") {
        Ok(p) if !p.trim().is_empty() => PathBuf::from(p),
        _ => get_logs_dir(),
    };

    if let Err(e) = fs::create_dir_all(&logs_dir) {
        eprintln!("Failed to create logs directory: {}", e);
        init_console_only_logging(env_filter);
        info!("Falling back to console-only logging (log dir not writable)");
        return;
    }

    let timestamp = chrono::Local::now().format("%Y%m%d_%H%M%S");
    let log_filename = format!("{}{}.log", LOG_PREFIX, timestamp);

    let file_appender = rolling::never(&logs_dir, &log_filename);
    let (file_writer, file_guard) = tracing_appender::non_blocking(file_appender);
    let _ = LOG_GUARD.set(file_guard);

    let file_layer = fmt::layer()
        .with_writer(file_writer)
        .with_ansi(false)
        .with_target(true)
        .with_file(true)
        .with_line_number(true);

    #[cfg(debug_assertions)]
    {
        let console_layer = fmt::layer()
            .with_writer(std::io::stderr)
            .with_ansi(true)
            .with_target(true);

        tracing_subscriber::registry()
            .with(env_filter)
            .with(file_layer)
            .with(console_layer)
            .init();
    }

    #[cfg(not(debug_assertions))]
    {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(file_layer)
            .init();
    }

    info!("=== IntegrityScan Started ===");
    info!("Log file: {}/{}", logs_dir.display(), log_filename);
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    if !env_flag("INTEGRITY_SCAN_DISABLE_LOG_CLEANUP") {
        std::thread::spawn(move || {
            cleanup_old_logs(&logs_dir, LOGS_TO_KEEP);
        });
    }
}

fn get_logs_dir() -> PathBuf {
    match dirs::data_local_dir() {
        Some(data_dir) => data_dir.join("integrity-scan").join("logs"),
        None => PathBuf::from("logs"),
    }
}

/// Delete all but the `keep` most recently modified run logs in `logs_dir`.
fn cleanup_old_logs(logs_dir: &Path, keep: usize) {
    let mut entries: Vec<_> = match fs::read_dir(logs_dir) {
        Ok(rd) => rd.filter_map(|e| e.ok()).collect(),
        Err(_) => return,
    };

    entries.retain(|e| {
        let name = e.file_name().to_string_lossy().to_string();
        name.starts_with(LOG_PREFIX) && name.ends_with(".log")
    });

    if entries.len() <= keep {
        return;
    }

    entries.sort_by_key(|e| {
        e.metadata()
            .and_then(|m| m.modified())
            .unwrap_or(std::time::SystemTime::UNIX_EPOCH)
    });

    let remove_count = entries.len() - keep;
    for entry in entries.into_iter().take(remove_count) {
        let _ = fs::remove_file(entry.path());
    }
}

fn init_console_only_logging(env_filter: EnvFilter) {
    let console_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_ansi(cfg!(debug_assertions))
        .with_target(true);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .init();
}

/// Analyze one submission with the configured backends.
pub async fn run(submission: &Submission, config: &AppConfig) -> Result<Report, AnalysisError> {
    let extractor = Extractor::new(&config.fetch).map_err(AnalysisError::Extraction)?;
    run_with_extractor(submission, &config.model, &extractor).await
}

/// Models are loaded first, so a broken backend is reported before any download.
/// Model loading and scoring block, and run off the async executor.
pub async fn run_with_extractor(
    submission: &Submission,
    model_config: &ModelConfig,
    extractor: &Extractor,
) -> Result<Report, AnalysisError> {
    let start = Instant::now();

    let model_config = model_config.clone();
    let models = tokio::task::spawn_blocking(move || ModelHandle::load(&model_config))
        .await
        .map_err(|e| AnalysisError::Worker(e.to_string()))?
        .map_err(AnalysisError::ModelLoad)?;
    let models = Arc::new(models);

    let text = extractor
        .extract(&submission.source)
        .await
        .map_err(AnalysisError::Extraction)?;

    let submission_id = submission.id.clone();
    let worker_models = Arc::clone(&models);
    let report = tokio::task::spawn_blocking(move || {
        analyze_text(&text, &submission_id, &worker_models)
    })
    .await
    .map_err(|e| AnalysisError::Worker(e.to_string()))??;

    info!(
        submission_id = %submission.id,
        verdict = ?report.verdict,
        total_ms = start.elapsed().as_millis() as u64,
        "[PIPELINE] submission finished"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, SystemTime};

    #[test]
    fn test_cleanup_keeps_newest_logs() {
        let dir = tempfile::tempdir().unwrap();
        let base = SystemTime::now() - Duration::from_secs(3600);
        for i in 0..5u64 {
            let path = dir.path().join(format!("{}2024010{}_000000.log", LOG_PREFIX, i));
            let file = fs::File::create(&path).unwrap();
            file.set_modified(base + Duration::from_secs(i * 60)).unwrap();
        }
        fs::write(dir.path().join("other.log"), "").unwrap();

        cleanup_old_logs(dir.path(), 2);

        let mut left: Vec<String> = fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
            .collect();
        left.sort();
        assert_eq!(
            left,
            vec![
                "integrity-scan_20240103_000000.log".to_string(),
                "integrity-scan_20240104_000000.log".to_string(),
                "other.log".to_string(),
            ]
        );
    }
}
