use crate::config::{ensure_logs_dir, get_logs_dir};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::{LazyLock, Mutex};
use tracing::{debug, error, info, warn};
use tracing_subscriber::{
    fmt::{self},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter, Layer,
};

/// Activity channel for completed and failed deployments
pub const DEPLOY_CHANNEL: &str = "deploy";

const MAX_LOG_SIZE: u64 = 10 * 1024 * 1024; // 10MB
const MAX_LOG_BACKUPS: u32 = 5;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    pub timestamp: String,
    pub level: String,
    pub channel: String,
    pub message: String,
    pub details: Option<serde_json::Value>,
}

static LOGGER_INITIALIZED: std::sync::Once = std::sync::Once::new();

// Keep the guard alive for the lifetime of the program
static FILE_APPENDER_GUARD: LazyLock<Mutex<Option<tracing_appender::non_blocking::WorkerGuard>>> =
    LazyLock::new(|| Mutex::new(None));

pub fn init_logging() -> Result<(), Box<dyn std::error::Error>> {
    ensure_logs_dir()?;
    let logs_dir = get_logs_dir()?;

    LOGGER_INITIALIZED.call_once(|| {
        let env_filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

        // Console output goes to stderr so stdout stays machine-readable
        let console_layer = fmt::layer()
            .compact()
            .with_writer(std::io::stderr)
            .with_target(false)
            .with_thread_ids(false)
            .with_thread_names(false)
            .with_filter(env_filter.clone());

        let file_appender = tracing_appender::rolling::never(&logs_dir, "app.log");
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

        if let Ok(mut guard_mutex) = FILE_APPENDER_GUARD.lock() {
            *guard_mutex = Some(guard);
        }

        let file_layer = fmt::layer()
            .with_writer(non_blocking)
            .with_ansi(false)
            .with_target(true)
            .with_filter(env_filter);

        tracing_subscriber::registry()
            .with(console_layer)
            .with(file_layer)
            .init();
    });

    Ok(())
}

/// Record an activity entry in `<logs>/<channel>.log` and mirror it to tracing
pub fn log_activity(
    channel: &str,
    level: &str,
    message: &str,
    details: Option<serde_json::Value>,
) -> Result<(), Box<dyn std::error::Error>> {
    ensure_logs_dir()?;

    let entry = LogEntry {
        timestamp: Utc::now().to_rfc3339(),
        level: level.to_string(),
        channel: channel.to_string(),
        message: message.to_string(),
        details,
    };

    match level {
        "ERROR" => error!(channel = channel, "{}", message),
        "WARN" => warn!(channel = channel, "{}", message),
        "DEBUG" => debug!(channel = channel, "{}", message),
        _ => info!(channel = channel, "{}", message),
    }

    let log_file_path = get_logs_dir()?.join(format!("{}.log", channel));
    append_log_entry(&log_file_path, &entry)
}

fn append_log_entry(
    log_file_path: &Path,
    entry: &LogEntry,
) -> Result<(), Box<dyn std::error::Error>> {
    if should_rotate_log(log_file_path)? {
        rotate_log_file(log_file_path)?;
    }

    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_file_path)?;

    let json_line = serde_json::to_string(entry)?;
    writeln!(file, "{}", json_line)?;
    file.flush()?;

    Ok(())
}

fn should_rotate_log(log_file_path: &Path) -> Result<bool, Box<dyn std::error::Error>> {
    if !log_file_path.exists() {
        return Ok(false);
    }

    let metadata = std::fs::metadata(log_file_path)?;
    Ok(metadata.len() > MAX_LOG_SIZE)
}

fn rotate_log_file(log_file_path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    // Shift backups up by one (4 -> 5, 3 -> 4, ...)
    for i in (1..MAX_LOG_BACKUPS).rev() {
        let current_backup = log_file_path.with_extension(format!("log.{}", i));
        let next_backup = log_file_path.with_extension(format!("log.{}", i + 1));

        if current_backup.exists() {
            std::fs::rename(&current_backup, &next_backup)?;
        }
    }

    if log_file_path.exists() {
        std::fs::rename(log_file_path, log_file_path.with_extension("log.1"))?;
    }

    Ok(())
}

/// Read a channel's activity log, newest first
pub fn read_activity_logs(
    channel: &str,
    max_lines: Option<usize>,
) -> Result<Vec<LogEntry>, Box<dyn std::error::Error>> {
    let log_file_path = get_logs_dir()?.join(format!("{}.log", channel));
    read_log_file(&log_file_path, max_lines)
}

fn read_log_file(
    log_file_path: &PathBuf,
    max_lines: Option<usize>,
) -> Result<Vec<LogEntry>, Box<dyn std::error::Error>> {
    if !log_file_path.exists() {
        return Ok(Vec::new());
    }

    let reader = BufReader::new(File::open(log_file_path)?);
    let mut entries = Vec::new();

    for line in reader.lines() {
        match line {
            Ok(line_content) => match serde_json::from_str::<LogEntry>(&line_content) {
                Ok(entry) => entries.push(entry),
                Err(e) => debug!(error = %e, "Skipping malformed activity log line"),
            },
            Err(e) => warn!(error = %e, "Error reading activity log line"),
        }
    }

    entries.reverse();

    if let Some(max) = max_lines {
        entries.truncate(max);
    }

    Ok(entries)
}

pub fn log_error(channel: &str, message: &str) -> Result<(), Box<dyn std::error::Error>> {
    log_activity(channel, "ERROR", message, None)
}

pub fn log_with_details(
    channel: &str,
    level: &str,
    message: &str,
    details: serde_json::Value,
) -> Result<(), Box<dyn std::error::Error>> {
    log_activity(channel, level, message, Some(details))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn entry(message: &str) -> LogEntry {
        LogEntry {
            timestamp: Utc::now().to_rfc3339(),
            level: "INFO".to_string(),
            channel: DEPLOY_CHANNEL.to_string(),
            message: message.to_string(),
            details: None,
        }
    }

    #[test]
    fn test_log_rotation() {
        let temp_dir = tempdir().unwrap();
        let log_file = temp_dir.path().join("test.log");

        {
            let mut file = File::create(&log_file).unwrap();
            let large_content = "x".repeat(11 * 1024 * 1024); // 11MB
            file.write_all(large_content.as_bytes()).unwrap();
        }

        assert!(should_rotate_log(&log_file).unwrap());

        rotate_log_file(&log_file).unwrap();

        assert!(log_file.with_extension("log.1").exists());
        assert!(!log_file.exists());
    }

    #[test]
    fn test_read_newest_first_with_limit() {
        let temp_dir = tempdir().unwrap();
        let log_file = temp_dir.path().join("deploy.log");

        append_log_entry(&log_file, &entry("first")).unwrap();
        append_log_entry(&log_file, &entry("second")).unwrap();
        append_log_entry(&log_file, &entry("third")).unwrap();

        let entries = read_log_file(&log_file, Some(2)).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].message, "third");
        assert_eq!(entries[1].message, "second");
    }

    #[test]
    fn test_malformed_lines_skipped() {
        let temp_dir = tempdir().unwrap();
        let log_file = temp_dir.path().join("deploy.log");

        append_log_entry(&log_file, &entry("ok")).unwrap();
        let mut file = OpenOptions::new().append(true).open(&log_file).unwrap();
        writeln!(file, "not json").unwrap();

        let entries = read_log_file(&log_file, None).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].message, "ok");
    }

    #[test]
    fn test_missing_log_is_empty() {
        let temp_dir = tempdir().unwrap();
        let entries = read_log_file(&temp_dir.path().join("nope.log"), None).unwrap();
        assert!(entries.is_empty());
    }
}
