// Library root
// -----------
// This crate sends one crash report (version, error text, memory dump and
// optional log files) to a collection server. The binary (`main.rs`) only
// loads configuration, sets up logging and maps the outcome to an exit code.
//
// Module responsibilities:
// - `record`: the report record, built from `-name=value` arguments and
//   validated before anything touches the network.
// - `url`: splits the collection URL into host and request path.
// - `artifact`: reads dump, error and log files from disk.
// - `multipart`: encodes the record into a multipart/form-data body.
// - `api`: the HTTP transport that posts the body and classifies the reply.
// - `report`: runs the pipeline and cleans up after a successful upload.
// - `cleanup`, `config`, `logging`, `error`: supporting pieces.
pub mod api;
pub mod artifact;
pub mod cleanup;
pub mod config;
pub mod error;
pub mod logging;
pub mod multipart;
pub mod record;
pub mod report;
pub mod url;

pub use api::{CrashReportClient, Transport};
pub use error::ReportError;
pub use record::ReportRecord;
pub use report::{run, send_crash_report};
