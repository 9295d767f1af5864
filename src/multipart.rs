// multipart/form-data body for a crash report.
//
// The boundary is fixed: the collection server and the `Content-Type` header
// set by the transport both expect `MULTIPART-DATA-BOUNDARY`. Part order and
// field names are part of the server contract:
//   CRVersion, error, dumpfile, [gamelog], [networklog]

use std::path::Path;

use log::{debug, error};

use crate::artifact::read_artifact;
use crate::error::{ArtifactReadError, EncodingError};
use crate::record::ReportRecord;

pub const BOUNDARY: &str = "MULTIPART-DATA-BOUNDARY";

pub const CONTENT_TYPE: &str = "multipart/form-data; boundary=MULTIPART-DATA-BOUNDARY";

const CRLF: &[u8] = b"\r\n";
const OCTET_STREAM: &str = "application/octet-stream";

/// Builds the body part by part.
struct FormWriter {
    out: Vec<u8>,
}

impl FormWriter {
    fn with_capacity(capacity: usize) -> Self {
        FormWriter {
            out: Vec::with_capacity(capacity),
        }
    }

    fn delimiter(&mut self) {
        self.out.extend_from_slice(b"--");
        self.out.extend_from_slice(BOUNDARY.as_bytes());
        self.out.extend_from_slice(CRLF);
    }

    fn header(&mut self, line: &str) {
        self.out.extend_from_slice(line.as_bytes());
        self.out.extend_from_slice(CRLF);
    }

    fn body(&mut self, data: &[u8]) {
        self.out.extend_from_slice(CRLF);
        self.out.extend_from_slice(data);
        self.out.extend_from_slice(CRLF);
    }

    fn text(&mut self, name: &str, value: &str) {
        self.delimiter();
        self.header(&format!("Content-Disposition: form-data; name=\"{}\"", name));
        self.body(value.as_bytes());
    }

    fn file(&mut self, name: &str, filename: &str, data: &[u8]) {
        self.delimiter();
        self.header(&format!(
            "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"",
            name, filename
        ));
        self.header(&format!("Content-Type: {}", OCTET_STREAM));
        self.body(data);
    }

    fn finish(mut self) -> Vec<u8> {
        self.out.extend_from_slice(b"--");
        self.out.extend_from_slice(BOUNDARY.as_bytes());
        self.out.extend_from_slice(b"--");
        self.out
    }
}

/// File name sent for an attachment: the last path component, or the whole
/// path when there is none (`..`, `/`).
pub fn attachment_filename(path: &Path) -> String {
    let name = match path.file_name() {
        Some(name) => name.to_string_lossy().into_owned(),
        None => path.to_string_lossy().into_owned(),
    };
    name.replace('"', "%22")
}

/// Encode `record` and its attachments into a single request body.
///
/// Fails only when the dump cannot be read. Unreadable log files are logged
/// and left out.
pub fn encode_report(record: &ReportRecord) -> Result<Vec<u8>, EncodingError> {
    let dump = read_artifact(&record.dump_path)
        .map_err(|err| EncodingError::DumpUnreadable(ArtifactReadError::Critical(err)))?;

    let mut form = FormWriter::with_capacity(dump.len() + 1024);
    form.text("CRVersion", &record.version);
    form.text("error", &record.error_text);
    form.file("dumpfile", &attachment_filename(&record.dump_path), &dump);
    drop(dump);

    let optional = [
        ("gamelog", record.game_log_path.as_deref()),
        ("networklog", record.network_log_path.as_deref()),
    ];
    for (name, path) in optional {
        let Some(path) = path else { continue };
        debug!("Try to add multipart data file: {}", path.display());
        match read_artifact(path) {
            Ok(data) => form.file(name, &attachment_filename(path), &data),
            Err(err) => error!("Skipping {} attachment: {}", name, ArtifactReadError::NonCritical(err)),
        }
    }

    let body = form.finish();
    debug!("Multipart body size: {} bytes", body.len());
    Ok(body)
}
