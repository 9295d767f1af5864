// Reading report artifacts (dump, error description, logs) from disk.
//
// The crashed process may still hold its files open, so every read opens the
// file in shared-read mode and reports a sharing violation as `Busy` instead
// of a generic open failure.

use std::fs::{File, OpenOptions};
use std::io::{self, Read};
use std::path::Path;

use encoding_rs::{UTF_16BE, UTF_16LE};
use log::debug;

use crate::error::ReadError;

#[cfg(windows)]
const FILE_SHARE_READ: u32 = 0x0000_0001;
#[cfg(windows)]
const ERROR_SHARING_VIOLATION: i32 = 32;

fn open_shared(path: &Path) -> io::Result<File> {
    let mut options = OpenOptions::new();
    options.read(true);
    #[cfg(windows)]
    {
        use std::os::windows::fs::OpenOptionsExt;
        options.share_mode(FILE_SHARE_READ);
    }
    options.open(path)
}

fn is_sharing_violation(err: &io::Error) -> bool {
    #[cfg(windows)]
    {
        err.raw_os_error() == Some(ERROR_SHARING_VIOLATION)
    }
    #[cfg(not(windows))]
    {
        let _ = err;
        false
    }
}

/// Read the whole file at `path` into memory.
pub fn read_artifact(path: &Path) -> Result<Vec<u8>, ReadError> {
    debug!("Reading file: {}", path.display());

    let file = open_shared(path).map_err(|source| match source.kind() {
        io::ErrorKind::NotFound => ReadError::NotFound(path.to_path_buf()),
        _ if is_sharing_violation(&source) => ReadError::Busy(path.to_path_buf()),
        _ => ReadError::Open {
            path: path.to_path_buf(),
            source,
        },
    })?;

    let size = file
        .metadata()
        .map_err(|source| ReadError::Io {
            path: path.to_path_buf(),
            source,
        })?
        .len();
    debug!("File size: {} bytes", size);

    let buffer = read_exact_len(file, path, size)?;
    debug!("File read successfully");
    Ok(buffer)
}

/// Read exactly `size` bytes from `reader`. Fewer bytes than announced is a
/// `ShortRead`; anything past `size` is left unread.
fn read_exact_len<R: Read>(reader: R, path: &Path, size: u64) -> Result<Vec<u8>, ReadError> {
    let expected = usize::try_from(size).map_err(|_| ReadError::SizeLimitExceeded {
        path: path.to_path_buf(),
        size,
    })?;

    let mut buffer = Vec::new();
    buffer
        .try_reserve_exact(expected)
        .map_err(|_| ReadError::SizeLimitExceeded {
            path: path.to_path_buf(),
            size,
        })?;
    reader
        .take(size)
        .read_to_end(&mut buffer)
        .map_err(|source| ReadError::Io {
            path: path.to_path_buf(),
            source,
        })?;

    if buffer.len() != expected {
        return Err(ReadError::ShortRead {
            path: path.to_path_buf(),
            expected,
            actual: buffer.len(),
        });
    }
    Ok(buffer)
}

/// Read the error description written by the crashed process.
///
/// The file holds UTF-16 code units, little endian unless a byte order mark
/// says otherwise. Unpaired surrogates are replaced rather than rejected.
pub fn read_error_text(path: &Path) -> Result<String, ReadError> {
    let bytes = read_artifact(path)?;
    decode_utf16(path, &bytes)
}

fn decode_utf16(path: &Path, bytes: &[u8]) -> Result<String, ReadError> {
    if bytes.len() % 2 != 0 {
        return Err(ReadError::InvalidEncoding {
            path: path.to_path_buf(),
            len: bytes.len(),
        });
    }
    // Only UTF-16 byte order marks are honoured.
    let (encoding, body) = match bytes {
        [0xFF, 0xFE, rest @ ..] => (UTF_16LE, rest),
        [0xFE, 0xFF, rest @ ..] => (UTF_16BE, rest),
        _ => (UTF_16LE, bytes),
    };
    let (text, _) = encoding.decode_without_bom_handling(body);
    Ok(text.into_owned())
}
