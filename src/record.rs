// The crash report record: built from the command line, enriched with the
// split URL, resolved log paths and the loaded error text, then handed by
// reference to the encoder and the transport.

use std::path::PathBuf;

use log::debug;

use crate::artifact::read_error_text;
use crate::config::{find_parameter, required_parameter, MIN_ARGUMENTS};
use crate::error::{ArtifactReadError, ConfigurationError, ReadError, ValidationError};
use crate::url::split_url;

/// Error text used when the error file cannot be read.
pub const ERROR_TEXT_UNREADABLE: &str = "failed to read error content";
/// Error text used when the error file is not valid UTF-16.
pub const ERROR_TEXT_INVALID: &str = "invalid error file format";

/// One crash report.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReportRecord {
    /// Collection URL as supplied on the command line.
    pub url: String,
    pub version: String,
    /// File holding the error description; deleted after a successful upload.
    pub error_file_path: PathBuf,
    pub error_text: String,
    pub dump_path: PathBuf,
    /// Authority part of `url`, possibly with a port.
    pub host: String,
    /// Path part of `url`, always starting with `/`.
    pub request_path: String,
    pub game_log_path: Option<PathBuf>,
    pub network_log_path: Option<PathBuf>,
}

impl ReportRecord {
    /// Build a record from the four required `-name=value` parameters.
    ///
    /// The optional `-gamelog=`/`-networklog=` parameters are picked up by
    /// [`ReportRecord::resolve_log_paths`].
    pub fn from_args(args: &[String]) -> Result<Self, ConfigurationError> {
        if args.len() < MIN_ARGUMENTS {
            return Err(ConfigurationError::InsufficientArguments {
                found: args.len(),
                required: MIN_ARGUMENTS,
            });
        }

        Ok(ReportRecord {
            url: required_parameter(args, "url")?.to_string(),
            version: required_parameter(args, "version")?.to_string(),
            error_file_path: PathBuf::from(required_parameter(args, "error")?),
            dump_path: PathBuf::from(required_parameter(args, "dump")?),
            ..Default::default()
        })
    }

    /// Required fields are all present.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.url.is_empty() {
            return Err(ValidationError::EmptyField("url"));
        }
        if self.version.is_empty() {
            return Err(ValidationError::EmptyField("version"));
        }
        if self.dump_path.as_os_str().is_empty() {
            return Err(ValidationError::EmptyField("dump"));
        }
        if self.error_file_path.as_os_str().is_empty() {
            return Err(ValidationError::EmptyField("error"));
        }
        Ok(())
    }

    pub fn is_valid(&self) -> bool {
        self.validate().is_ok()
    }

    /// Derive `host` and `request_path` from `url`.
    pub fn split_url(&mut self) {
        let parts = split_url(&self.url);
        self.host = parts.host;
        self.request_path = parts.path;
    }

    /// Pick up the optional log attachments. Blank values count as absent.
    pub fn resolve_log_paths(&mut self, args: &[String]) {
        self.game_log_path = optional_path(args, "gamelog");
        self.network_log_path = optional_path(args, "networklog");
    }

    /// Load `error_text` from the error file.
    ///
    /// An unreadable file leaves a placeholder text; the returned error is
    /// always `NonCritical` and is for the caller to report.
    pub fn load_error_text(&mut self) -> Result<(), ArtifactReadError> {
        match read_error_text(&self.error_file_path) {
            Ok(text) => {
                self.error_text = text;
                Ok(())
            }
            Err(err) => {
                self.error_text = match err {
                    ReadError::InvalidEncoding { .. } => ERROR_TEXT_INVALID,
                    _ => ERROR_TEXT_UNREADABLE,
                }
                .to_string();
                Err(ArtifactReadError::NonCritical(err))
            }
        }
    }
}

fn optional_path(args: &[String], name: &str) -> Option<PathBuf> {
    let value = find_parameter(args, name)?.trim();
    if value.is_empty() {
        return None;
    }
    let path = PathBuf::from(value);
    if !path.exists() {
        debug!("Optional -{} file does not exist: {}", name, path.display());
    }
    Some(path)
}
