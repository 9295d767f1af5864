// Orchestration: command line -> record -> body -> upload -> cleanup.

use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use log::{debug, error, info};

use crate::api::Transport;
use crate::cleanup::remove_artifacts;
use crate::error::ReportError;
use crate::multipart::encode_report;
use crate::record::ReportRecord;

/// Run the whole pipeline for one crash report.
///
/// The temporary files are only removed after the server accepted the
/// report; on any failure they stay for a later attempt.
pub fn send_crash_report<T: Transport + ?Sized>(
    args: &[String],
    transport: &T,
) -> Result<ReportRecord, ReportError> {
    let mut record = ReportRecord::from_args(args)?;
    record.split_url();
    record.resolve_log_paths(args);
    if let Err(err) = record.load_error_text() {
        // Placeholder text is sent instead.
        error!("Failed to read error file: {}", err);
    }
    record.validate()?;

    debug!("Version: {}", record.version);
    debug!("Error file: {}", record.error_file_path.display());
    debug!("Dump path: {}", record.dump_path.display());
    debug!("URL: {}", record.url);
    debug!("Server: {}", record.host);
    debug!("Path: {}", record.request_path);

    let body = encode_report(&record)?;

    info!("Sending crash report to {}", record.host);
    let spinner = upload_spinner(&record.host);
    let result = transport.submit(&record.host, &record.request_path, body);
    spinner.finish_and_clear();
    result?;

    info!("Crash report sent successfully. Cleaning up temporary files");
    remove_artifacts(&record);
    Ok(record)
}

/// Like [`send_crash_report`] but reduced to success or failure, with the
/// failure reason logged.
pub fn run<T: Transport + ?Sized>(args: &[String], transport: &T) -> bool {
    match send_crash_report(args, transport) {
        Ok(_) => true,
        Err(err) => {
            error!("Failed to send crash report: {}", err);
            false
        }
    }
}

/// Spinner on stderr while the upload is in flight. Hidden when stderr is
/// not a terminal.
fn upload_spinner(host: &str) -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::with_template("{spinner} {msg}") {
        spinner.set_style(style);
    }
    spinner.set_message(format!("Sending crash report to {}", host));
    spinner.enable_steady_tick(Duration::from_millis(100));
    spinner
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ArtifactReadError, ConfigurationError, EncodingError, TransportError};
    use crate::record::{ERROR_TEXT_INVALID, ERROR_TEXT_UNREADABLE};
    use std::cell::RefCell;
    use std::fs;
    use std::path::{Path, PathBuf};
    use tempfile::TempDir;

    struct Call {
        host: String,
        path: String,
        body: Vec<u8>,
    }

    /// Records every submission and answers with a fixed outcome.
    struct RecordingTransport {
        calls: RefCell<Vec<Call>>,
        reject_with: Option<u16>,
    }

    impl RecordingTransport {
        fn accepting() -> Self {
            RecordingTransport {
                calls: RefCell::new(Vec::new()),
                reject_with: None,
            }
        }

        fn rejecting(status: u16) -> Self {
            RecordingTransport {
                calls: RefCell::new(Vec::new()),
                reject_with: Some(status),
            }
        }

        fn call_count(&self) -> usize {
            self.calls.borrow().len()
        }
    }

    impl Transport for RecordingTransport {
        fn submit(&self, host: &str, path: &str, body: Vec<u8>) -> Result<(), TransportError> {
            self.calls.borrow_mut().push(Call {
                host: host.to_string(),
                path: path.to_string(),
                body,
            });
            match self.reject_with {
                None => Ok(()),
                Some(status) => Err(TransportError::Rejected {
                    status,
                    body: String::new(),
                }),
            }
        }
    }

    struct Fixture {
        _dir: TempDir,
        error_file: PathBuf,
        dump: PathBuf,
    }

    fn fixture(error_bytes: Option<&[u8]>, dump_bytes: Option<&[u8]>) -> Fixture {
        let dir = TempDir::new().expect("temp dir");
        let error_file = dir.path().join("error.txt");
        let dump = dir.path().join("crash.dmp");
        if let Some(bytes) = error_bytes {
            fs::write(&error_file, bytes).expect("write error file");
        }
        if let Some(bytes) = dump_bytes {
            fs::write(&dump, bytes).expect("write dump");
        }
        Fixture {
            _dir: dir,
            error_file,
            dump,
        }
    }

    fn utf16le(text: &str) -> Vec<u8> {
        text.encode_utf16().flat_map(|u| u.to_le_bytes()).collect()
    }

    fn args_for(url: &str, version: &str, error_file: &Path, dump: &Path) -> Vec<String> {
        vec![
            format!("-url={}", url),
            format!("-version={}", version),
            format!("-error={}", error_file.display()),
            format!("-dump={}", dump.display()),
        ]
    }

    fn contains(haystack: &[u8], needle: &[u8]) -> bool {
        haystack.windows(needle.len()).any(|w| w == needle)
    }

    #[test]
    fn test_successful_submission_cleans_up() {
        let f = fixture(Some(&utf16le("boom")), Some(&[0x44, 0x55]));
        let transport = RecordingTransport::accepting();
        let args = args_for("http://example.com/submit", "1.2.3", &f.error_file, &f.dump);

        let record = send_crash_report(&args, &transport).expect("sent");
        assert_eq!(record.error_text, "boom");

        let calls = transport.calls.borrow();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].host, "example.com");
        assert_eq!(calls[0].path, "/submit");
        assert!(contains(&calls[0].body, b"1.2.3"));
        assert!(contains(&calls[0].body, &[0x44, 0x55]));
        assert!(!f.error_file.exists());
        assert!(!f.dump.exists());
    }

    #[test]
    fn test_rejected_submission_keeps_files() {
        let f = fixture(Some(&utf16le("boom")), Some(&[1]));
        let transport = RecordingTransport::rejecting(500);
        let args = args_for("http://example.com/submit", "1.2.3", &f.error_file, &f.dump);

        let err = send_crash_report(&args, &transport).unwrap_err();
        assert!(matches!(err, ReportError::Transport(TransportError::Rejected { status: 500, .. })));
        assert!(!run(&args, &transport));
        assert!(f.error_file.exists());
        assert!(f.dump.exists());
    }

    #[test]
    fn test_missing_required_parameter_never_reaches_transport() {
        let f = fixture(Some(&utf16le("boom")), Some(&[1]));
        let transport = RecordingTransport::accepting();
        for (url, version) in [("", "1.0"), ("http://example.com/", "")] {
            let args = args_for(url, version, &f.error_file, &f.dump);
            assert!(matches!(
                send_crash_report(&args, &transport),
                Err(ReportError::Configuration(ConfigurationError::MissingParameter(_)))
            ));
        }
        let args = args_for("http://example.com/", "1.0", Path::new(""), &f.dump);
        assert!(send_crash_report(&args, &transport).is_err());
        let args = args_for("http://example.com/", "1.0", &f.error_file, Path::new(""));
        assert!(send_crash_report(&args, &transport).is_err());

        assert_eq!(transport.call_count(), 0);
        assert!(f.dump.exists());
    }

    #[test]
    fn test_too_few_arguments_never_reaches_transport() {
        let transport = RecordingTransport::accepting();
        let args = vec!["-url=http://example.com/".to_string()];
        assert!(matches!(
            send_crash_report(&args, &transport),
            Err(ReportError::Configuration(ConfigurationError::InsufficientArguments { .. }))
        ));
        assert_eq!(transport.call_count(), 0);
    }

    #[test]
    fn test_missing_error_file_still_submits_placeholder() {
        let f = fixture(None, Some(&[7, 7]));
        let transport = RecordingTransport::accepting();
        let args = args_for("http://example.com/submit", "2.0", &f.error_file, &f.dump);

        let record = send_crash_report(&args, &transport).expect("sent");
        assert_eq!(record.error_text, ERROR_TEXT_UNREADABLE);
        assert_eq!(transport.call_count(), 1);
        assert!(contains(&transport.calls.borrow()[0].body, ERROR_TEXT_UNREADABLE.as_bytes()));
    }

    #[test]
    fn test_odd_length_error_file_still_submits_placeholder() {
        let f = fixture(Some(b"boo"), Some(&[7, 7]));
        let transport = RecordingTransport::accepting();
        let args = args_for("http://example.com/submit", "2.0", &f.error_file, &f.dump);

        let record = send_crash_report(&args, &transport).expect("sent");
        assert_eq!(record.error_text, ERROR_TEXT_INVALID);
        assert_eq!(transport.call_count(), 1);
    }

    #[test]
    fn test_missing_dump_is_critical_and_skips_transport() {
        let f = fixture(Some(&utf16le("boom")), None);
        let transport = RecordingTransport::accepting();
        let args = args_for("http://example.com/submit", "2.0", &f.error_file, &f.dump);

        match send_crash_report(&args, &transport) {
            Err(ReportError::Encoding(EncodingError::DumpUnreadable(ArtifactReadError::Critical(_)))) => {}
            other => panic!("expected a critical dump error, got {:?}", other),
        }
        assert_eq!(transport.call_count(), 0);
        assert!(f.error_file.exists());
    }

    #[test]
    fn test_optional_logs_are_attached() {
        let f = fixture(Some(&utf16le("boom")), Some(&[1]));
        let game_log = f.dump.with_file_name("game.log");
        fs::write(&game_log, "render thread hung").expect("write");
        let transport = RecordingTransport::accepting();
        let mut args = args_for("http://example.com/submit", "2.0", &f.error_file, &f.dump);
        args.push(format!("-gamelog={}", game_log.display()));
        args.push(format!("-networklog={}", f.dump.with_file_name("absent.log").display()));

        send_crash_report(&args, &transport).expect("sent");
        let calls = transport.calls.borrow();
        assert!(contains(&calls[0].body, b"name=\"gamelog\"; filename=\"game.log\""));
        assert!(contains(&calls[0].body, b"render thread hung"));
        assert!(!contains(&calls[0].body, b"name=\"networklog\""));
        assert!(game_log.exists());
    }
}
