// Logger initialization.
//
// Log records go through the `log` facade to an `env_logger` backend that
// appends to a log file next to the crashed application. Logging is never
// allowed to stop a report from being sent: when the file cannot be opened
// the logger falls back to the user cache directory, then to stderr.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use env_logger::Target;
use log::{Level, LevelFilter};

use crate::config::{LogFormat, SenderConfig, DEFAULT_LOG_FILE};
use crate::error::LoggerError;

/// Short level tag used in plain log lines.
fn level_tag(level: Level) -> &'static str {
    match level {
        Level::Error => "ERR",
        Level::Warn => "WRN",
        Level::Info => "INF",
        Level::Debug => "DBG",
        Level::Trace => "TRC",
    }
}

fn open_append(path: &Path) -> Result<File, LoggerError> {
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|source| LoggerError::LogFile {
            path: path.to_path_buf(),
            source,
        })
}

/// Open the configured log file, or the fallback in the cache directory.
///
/// Returns the opened file and its path, or the error for the configured
/// path when neither can be opened.
pub fn open_log_file(configured: &Path) -> Result<(File, PathBuf), LoggerError> {
    match open_append(configured) {
        Ok(file) => Ok((file, configured.to_path_buf())),
        Err(err) => {
            let fallback = dirs::cache_dir().map(|dir| dir.join(DEFAULT_LOG_FILE));
            match fallback {
                Some(path) if path != configured => match open_append(&path) {
                    Ok(file) => Ok((file, path)),
                    Err(_) => Err(err),
                },
                _ => Err(err),
            }
        }
    }
}

/// Initialize the process-wide logger.
///
/// `RUST_LOG` is read first and then overridden by the configured level.
/// Safe to call more than once: later calls return
/// [`LoggerError::AlreadySet`] and leave the first logger in place.
///
/// When no log file can be opened the logger still writes to stderr and the
/// file error is returned after initialization so the caller can report it.
pub fn init_logger(config: &SenderConfig) -> Result<PathBuf, LoggerError> {
    let mut builder = env_logger::Builder::from_default_env();
    builder.filter_level(config.log_level);
    builder.filter_module("reqwest", LevelFilter::Info.min(config.log_level));
    builder.filter_module("hyper", LevelFilter::Info.min(config.log_level));

    let log_path = match open_log_file(&config.log_file) {
        Ok((file, path)) => {
            builder.target(Target::Pipe(Box::new(file)));
            Ok(path)
        }
        Err(err) => {
            builder.target(Target::Stderr);
            Err(err)
        }
    };

    match config.log_format {
        LogFormat::Json => {
            builder.format(|buf, record| {
                writeln!(
                    buf,
                    "{{\"ts\":\"{}\",\"level\":\"{}\",\"target\":\"{}\",\"msg\":{}}}",
                    chrono::Local::now().format("%Y-%m-%dT%H:%M:%S%.3f%:z"),
                    record.level(),
                    record.target(),
                    serde_json::to_string(&record.args().to_string())
                        .unwrap_or_else(|_| "\"\"".into())
                )
            });
        }
        LogFormat::Plain => {
            builder.format(|buf, record| {
                writeln!(
                    buf,
                    "{} [{}] {}",
                    chrono::Local::now().format("%Y-%m-%d %H:%M:%S%.3f"),
                    level_tag(record.level()),
                    record.args()
                )
            });
        }
    }

    builder.try_init()?;
    log_path
}
