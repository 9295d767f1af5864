// Removal of the report's temporary files once the server has accepted it.

use std::fs;
use std::io;
use std::path::Path;

use log::{debug, error};

use crate::record::ReportRecord;

/// Delete `path`. A file that is already gone counts as removed.
pub fn remove_file(path: &Path) -> bool {
    if path.as_os_str().is_empty() {
        return true;
    }
    match fs::remove_file(path) {
        Ok(()) => {
            debug!("Successfully deleted file: {}", path.display());
            true
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => true,
        Err(e) => {
            error!("Failed to delete file {}: {}", path.display(), e);
            false
        }
    }
}

/// Best-effort removal of the error file and the dump. Log attachments
/// belong to the application and are left alone.
///
/// Returns `true` when both are gone.
pub fn remove_artifacts(record: &ReportRecord) -> bool {
    let error_removed = remove_file(&record.error_file_path);
    let dump_removed = remove_file(&record.dump_path);
    if error_removed && dump_removed {
        debug!("Temporary files cleaned up successfully");
    }
    error_removed && dump_removed
}
