//! pdfium binding and document opening shared by the extractor and rasterizer.
//!
//! pdfium is not async-safe and its documents borrow the `Pdfium` instance, so
//! every blocking operation binds, opens, works and drops in one call. With
//! the `thread_safe` feature pdfium-render serialises calls internally, which
//! lets the foreground path and the prefetch worker each open the document.

use crate::error::ReaderError;
use pdfium_render::prelude::*;
use std::path::Path;
use tracing::debug;

/// Environment variable naming an explicit pdfium library.
pub const PDFIUM_LIB_PATH_ENV: &str = "PDFIUM_LIB_PATH";

/// Bind to pdfium: `PDFIUM_LIB_PATH`, then the working directory, then the
/// system library search path.
pub fn bind_pdfium() -> Result<Pdfium, ReaderError> {
    if let Ok(lib) = std::env::var(PDFIUM_LIB_PATH_ENV) {
        if !lib.is_empty() {
            debug!("Binding pdfium from {}={}", PDFIUM_LIB_PATH_ENV, lib);
            return Pdfium::bind_to_library(lib)
                .map(Pdfium::new)
                .map_err(|e| ReaderError::PdfiumBindingFailed(format!("{:?}", e)));
        }
    }

    let bindings = Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path("./"))
        .or_else(|_| Pdfium::bind_to_system_library())
        .map_err(|e| ReaderError::PdfiumBindingFailed(format!("{:?}", e)))?;
    Ok(Pdfium::new(bindings))
}

/// Open `path` with the session password, if any.
///
/// pdfium's password failure is split by whether a password was supplied, so
/// the reader can tell "needs `--password`" from "that password is wrong".
/// Every other load failure is treated as a damaged file.
pub fn open_document<'a>(
    pdfium: &'a Pdfium,
    path: &Path,
    password: Option<&'a str>,
) -> Result<PdfDocument<'a>, ReaderError> {
    let path_buf = || path.to_path_buf();
    pdfium
        .load_pdf_from_file(path, password)
        .map_err(|e| match e {
            PdfiumError::PdfiumLibraryInternalError(PdfiumInternalError::PasswordError) => {
                match password {
                    Some(_) => ReaderError::WrongPassword { path: path_buf() },
                    None => ReaderError::PasswordRequired { path: path_buf() },
                }
            }
            other => ReaderError::CorruptPdf {
                path: path_buf(),
                detail: format!("{:?}", other),
            },
        })
}
