// Error types for every stage of the crash report pipeline. Each stage has
// its own enum so callers can tell a bad command line from an unreadable dump
// or a rejected upload; `ReportError` is the union the orchestrator returns.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// Problems with the command line or the environment configuration.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigurationError {
    #[error("Insufficient command line arguments ({found} given, minimum {required} required)")]
    InsufficientArguments { found: usize, required: usize },

    #[error("Missing or empty -{0} parameter")]
    MissingParameter(&'static str),

    #[error("Invalid value {value:?} for {name}")]
    InvalidSetting { name: &'static str, value: String },
}

/// A report record that is not fit for sending.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Crash report field `{0}` is empty")]
    EmptyField(&'static str),
}

/// The concrete reason a single artifact could not be loaded.
#[derive(Error, Debug)]
pub enum ReadError {
    #[error("File not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("File {} is busy with another process", .0.display())]
    Busy(PathBuf),

    #[error("Failed to open file {}: {source}", .path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("File {} is too large to read into memory ({size} bytes)", .path.display())]
    SizeLimitExceeded { path: PathBuf, size: u64 },

    #[error("Short read on {}: expected {expected} bytes, got {actual}", .path.display())]
    ShortRead {
        path: PathBuf,
        expected: usize,
        actual: usize,
    },

    #[error("Failed to read file {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("File {} has an odd length ({len} bytes) for UTF-16 text", .path.display())]
    InvalidEncoding { path: PathBuf, len: usize },
}

/// An artifact read failure together with its effect on the pipeline.
#[derive(Error, Debug)]
pub enum ArtifactReadError {
    /// The report cannot be sent without this artifact.
    #[error("Critical artifact unreadable: {0}")]
    Critical(#[source] ReadError),

    /// The report degrades gracefully without this artifact.
    #[error("Optional artifact unreadable: {0}")]
    NonCritical(#[source] ReadError),
}

impl ArtifactReadError {
    pub fn is_critical(&self) -> bool {
        matches!(self, ArtifactReadError::Critical(_))
    }
}

#[derive(Error, Debug)]
pub enum EncodingError {
    #[error("Failed to read dump file: {0}")]
    DumpUnreadable(#[source] ArtifactReadError),
}

/// Steps of a single submission. Transitions only move forward; a failure
/// reports the state that could not be reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum SubmitState {
    Idle,
    SessionOpened,
    Connected,
    RequestCreated,
    HeadersSet,
    BodySent,
    ResponseReceived,
    Succeeded,
    Failed,
}

impl fmt::Display for SubmitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SubmitState::Idle => "idle",
            SubmitState::SessionOpened => "open session",
            SubmitState::Connected => "connect",
            SubmitState::RequestCreated => "create request",
            SubmitState::HeadersSet => "set headers",
            SubmitState::BodySent => "send body",
            SubmitState::ResponseReceived => "receive response",
            SubmitState::Succeeded => "succeeded",
            SubmitState::Failed => "failed",
        };
        f.write_str(name)
    }
}

#[derive(Error, Debug)]
pub enum TransportError {
    #[error("Failed to {stage}: {reason}")]
    Step { stage: SubmitState, reason: String },

    #[error("Server rejected crash report (HTTP {status}){}", response_suffix(.body))]
    Rejected { status: u16, body: String },
}

impl TransportError {
    pub fn step(stage: SubmitState, reason: impl Into<String>) -> Self {
        TransportError::Step {
            stage,
            reason: reason.into(),
        }
    }

    /// The state the submission was trying to reach when it failed.
    pub fn stage(&self) -> SubmitState {
        match self {
            TransportError::Step { stage, .. } => *stage,
            TransportError::Rejected { .. } => SubmitState::Succeeded,
        }
    }
}

fn response_suffix(body: &str) -> String {
    if body.is_empty() {
        String::new()
    } else {
        format!(": {}", body)
    }
}

/// Everything the orchestrator can fail with.
#[derive(Error, Debug)]
pub enum ReportError {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Encoding(#[from] EncodingError),

    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// Logger setup failures. Never fatal: the caller reports them on stderr.
#[derive(Error, Debug)]
pub enum LoggerError {
    #[error("Logger initialization error: {0}")]
    AlreadySet(#[from] log::SetLoggerError),

    #[error("Failed to open log file {}: {source}", .path.display())]
    LogFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
