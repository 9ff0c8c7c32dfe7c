//! Error types for the edgequake-rsvp library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`ReaderError`] is **fatal**: the session cannot start at all (bad input
//!   file, wrong password, empty document, invalid page range). Returned as
//!   `Err(ReaderError)` from document loading and config validation.
//!
//! * [`RenderError`] is **non-fatal**: a single page failed to rasterise. The
//!   page cache substitutes a blank placeholder and logs the error; the
//!   presentation loop never sees it.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the edgequake-rsvp library.
///
/// Steady-state page failures use [`RenderError`] and are absorbed by
/// [`crate::page::PageCache`] rather than propagated here.
#[derive(Debug, Error)]
pub enum ReaderError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("PDF file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The file exists and was read, but is not a PDF.
    #[error("'{path}' does not look like a PDF (first bytes {magic:?}, expected \"%PDF\").\nThe reader only opens PDF documents.")]
    NotAPdf { path: PathBuf, magic: [u8; 4] },

    // ── PDF errors ────────────────────────────────────────────────────────
    /// PDF header/trailer/xref is corrupt and cannot be parsed.
    #[error("PDF '{path}' is corrupt: {detail}")]
    CorruptPdf { path: PathBuf, detail: String },

    /// PDF requires a password but none was provided.
    #[error("PDF '{path}' is encrypted and requires a password.\nPass it with --password <PASSWORD> or set RSVP_PASSWORD.")]
    PasswordRequired { path: PathBuf },

    /// A password was provided but it is wrong.
    #[error("Wrong password for PDF '{path}'.\nCheck the value passed with --password or RSVP_PASSWORD.")]
    WrongPassword { path: PathBuf },

    /// The text layer of a page could not be read.
    #[error("Text extraction failed on page {page}: {detail}")]
    Extraction { page: usize, detail: String },

    /// Every page yielded only whitespace (scanned image PDF, blank range).
    #[error("No readable words found in '{path}' (pages {start}–{end})\nScanned PDFs need an OCR pass first.")]
    EmptyDocument {
        path: PathBuf,
        start: usize,
        end: usize,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Pdfium binding errors ─────────────────────────────────────────────
    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\n\
Set PDFIUM_LIB_PATH=/path/to/libpdfium, or place libpdfium next to the\n\
binary or in a system library directory.\n"
    )]
    PdfiumBindingFailed(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A non-fatal error for a single page render.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RenderError {
    /// The requested page does not exist in the document.
    #[error("Page {page} is out of range (document has {total} pages)")]
    PageOutOfRange { page: usize, total: usize },

    /// pdfium returned an error while rasterising.
    #[error("Page {page}: rasterisation failed: {detail}")]
    Rasterisation { page: usize, detail: String },

    /// The rasterizer could not reach pdfium or open the document.
    #[error("Page {page}: renderer unavailable: {detail}")]
    Unavailable { page: usize, detail: String },
}
