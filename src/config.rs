// Configuration: `-name=value` command line parameters for the report
// itself and environment variables for how the sender behaves (log file,
// verbosity, user agent).

use std::path::PathBuf;
use std::str::FromStr;

use log::LevelFilter;

use crate::error::ConfigurationError;

/// Minimum number of arguments (excluding the program name).
pub const MIN_ARGUMENTS: usize = 4;

pub const DEFAULT_LOG_FILE: &str = "crash-sender.log";

/// Return the value of the first `-name=value` argument, if any.
///
/// Unrecognised arguments are ignored. A parameter given without a value
/// (`-dump=`) yields `Some("")`.
pub fn find_parameter<'a>(args: &'a [String], name: &str) -> Option<&'a str> {
    args.iter().find_map(|arg| {
        arg.strip_prefix('-')
            .and_then(|rest| rest.strip_prefix(name))
            .and_then(|rest| rest.strip_prefix('='))
    })
}

/// Like [`find_parameter`] but missing or empty values are an error.
pub fn required_parameter<'a>(
    args: &'a [String],
    name: &'static str,
) -> Result<&'a str, ConfigurationError> {
    match find_parameter(args, name) {
        Some(value) if !value.is_empty() => Ok(value),
        _ => Err(ConfigurationError::MissingParameter(name)),
    }
}

/// Log line layout.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogFormat {
    /// `2026-01-01 12:00:00.000 [INF] message`
    Plain,
    /// One JSON object per line
    Json,
}

impl FromStr for LogFormat {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "plain" | "text" => Ok(LogFormat::Plain),
            "json" => Ok(LogFormat::Json),
            _ => Err(()),
        }
    }
}

/// How the sender runs, independent of the report being sent.
#[derive(Clone, Debug)]
pub struct SenderConfig {
    pub log_file: PathBuf,
    pub log_level: LevelFilter,
    pub log_format: LogFormat,
    pub user_agent: String,
}

impl Default for SenderConfig {
    fn default() -> Self {
        SenderConfig {
            log_file: PathBuf::from(DEFAULT_LOG_FILE),
            log_level: LevelFilter::Debug,
            log_format: LogFormat::Plain,
            user_agent: default_user_agent(),
        }
    }
}

fn default_user_agent() -> String {
    format!("CrashSender/{}", env!("CARGO_PKG_VERSION"))
}

impl SenderConfig {
    /// Build the configuration from `CRASH_SENDER_*` environment variables,
    /// falling back to defaults for unset ones.
    ///
    /// An invalid value keeps the default for that setting and is returned
    /// alongside the configuration; a bad logging setting must not stop a
    /// crash report from being sent.
    pub fn from_env() -> (Self, Vec<ConfigurationError>) {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup<F>(lookup: F) -> (Self, Vec<ConfigurationError>)
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = SenderConfig::default();
        let mut rejected = Vec::new();

        if let Some(file) = lookup("CRASH_SENDER_LOG_FILE").filter(|v| !v.trim().is_empty()) {
            config.log_file = PathBuf::from(file);
        }
        if let Some(level) = lookup("CRASH_SENDER_LOG_LEVEL") {
            match LevelFilter::from_str(level.trim()) {
                Ok(parsed) => config.log_level = parsed,
                Err(_) => rejected.push(ConfigurationError::InvalidSetting {
                    name: "CRASH_SENDER_LOG_LEVEL",
                    value: level,
                }),
            }
        }
        if let Some(format) = lookup("CRASH_SENDER_LOG_FORMAT") {
            match LogFormat::from_str(&format) {
                Ok(parsed) => config.log_format = parsed,
                Err(()) => rejected.push(ConfigurationError::InvalidSetting {
                    name: "CRASH_SENDER_LOG_FORMAT",
                    value: format,
                }),
            }
        }
        if let Some(agent) = lookup("CRASH_SENDER_USER_AGENT").filter(|v| !v.trim().is_empty()) {
            config.user_agent = agent;
        }

        (config, rejected)
    }
}
