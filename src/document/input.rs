//! Input checks run before pdfium sees a path.
//!
//! pdfium reports a missing file, an unreadable file and a non-PDF file with
//! the same opaque error. The reader checks each up front so the session can
//! refuse to start with a message naming the actual problem.

use crate::error::ReaderError;
use std::io::{ErrorKind, Read};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Leading bytes of every PDF file.
const PDF_MAGIC: &[u8; 4] = b"%PDF";

/// Check that `path` names a readable file starting with the PDF magic.
///
/// A file shorter than the magic, or a path that cannot be read as a file
/// (a directory, say), is reported as [`ReaderError::NotAPdf`] with the bytes
/// that could be read, zero padded.
pub fn resolve_local(path: impl AsRef<Path>) -> Result<PathBuf, ReaderError> {
    let path = path.as_ref().to_path_buf();

    let mut file = match std::fs::File::open(&path) {
        Ok(file) => file,
        Err(e) if e.kind() == ErrorKind::PermissionDenied => {
            return Err(ReaderError::PermissionDenied { path });
        }
        Err(_) => return Err(ReaderError::FileNotFound { path }),
    };

    let mut magic = [0u8; 4];
    let mut filled = 0;
    while filled < magic.len() {
        match file.read(&mut magic[filled..]) {
            Ok(0) | Err(_) => break,
            Ok(n) => filled += n,
        }
    }
    if &magic != PDF_MAGIC {
        debug!("{} starts with {:?} ({} bytes read)", path.display(), magic, filled);
        return Err(ReaderError::NotAPdf { path, magic });
    }

    debug!("Opening local PDF: {}", path.display());
    Ok(path)
}
