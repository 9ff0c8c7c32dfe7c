//! Token store: the immutable, ordered sequence of words read in a session.
//!
//! A [`TokenStream`] is built exactly once, from whatever a
//! [`TokenExtractor`] pulls out of the document, and is then shared read-only
//! (behind an `Arc`) by the scheduler and the session. Nothing mutates it
//! after [`TokenStream::new`] returns.
//!
//! ## Coordinates
//!
//! Token boxes are in *document space*: PDF points with the origin at the
//! **top-left** of the page. Extractors are responsible for flipping the PDF
//! bottom-left origin before building tokens.

pub mod extract;
pub mod input;

use crate::config::PageRange;
use crate::error::ReaderError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info, warn};

pub use extract::PdfiumExtractor;

/// One displayable word with its source page and bounding box.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Token {
    pub text: String,
    /// 0-based page index in the document.
    pub page_index: usize,
    pub left: f32,
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
}

impl Token {
    /// Build a token, normalising swapped edges so `left ≤ right` and `top ≤ bottom`.
    pub fn new(
        text: impl Into<String>,
        page_index: usize,
        left: f32,
        top: f32,
        right: f32,
        bottom: f32,
    ) -> Self {
        Self {
            text: text.into(),
            page_index,
            left: left.min(right),
            top: top.min(bottom),
            right: left.max(right),
            bottom: top.max(bottom),
        }
    }
}

/// Nominal page dimensions in document points.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PageSize {
    pub width: f32,
    pub height: f32,
}

/// Raw output of a [`TokenExtractor`].
#[derive(Debug, Clone)]
pub struct ExtractedDocument {
    pub tokens: Vec<Token>,
    pub page_count: usize,
    /// One entry per document page, including pages outside the read range.
    pub page_sizes: Vec<PageSize>,
}

/// The external document parser: yields words with page index and box.
///
/// Implementations are blocking; the session calls them from
/// `spawn_blocking`.
pub trait TokenExtractor: Send + Sync {
    /// Extract the words of the pages selected by `pages`.
    ///
    /// `page_sizes` must cover every document page so page jumps and
    /// placeholders work for pages outside the range too.
    fn extract(
        &self,
        path: &Path,
        pages: &PageRange,
    ) -> Result<ExtractedDocument, ReaderError>;
}

/// Ordered, immutable sequence of tokens in reading order.
#[derive(Debug, Clone)]
pub struct TokenStream {
    tokens: Vec<Token>,
    page_sizes: Vec<PageSize>,
    /// `first_on_page[p]` = index of the first token on page `p`.
    first_on_page: Vec<Option<usize>>,
}

impl TokenStream {
    /// Build the stream, dropping whitespace-only tokens and tokens whose page
    /// is outside `[0, page_sizes.len())`.
    ///
    /// Returns `None` when nothing readable remains.
    pub fn new(tokens: Vec<Token>, page_sizes: Vec<PageSize>) -> Option<Self> {
        let page_count = page_sizes.len();
        let mut kept = Vec::with_capacity(tokens.len());
        for mut token in tokens {
            let trimmed = token.text.trim();
            if trimmed.is_empty() {
                continue;
            }
            if token.page_index >= page_count {
                warn!(
                    "Dropping token {:?}: page {} is beyond page count {}",
                    trimmed, token.page_index, page_count
                );
                continue;
            }
            if trimmed.len() != token.text.len() {
                token.text = trimmed.to_string();
            }
            kept.push(token);
        }

        if kept.is_empty() {
            return None;
        }

        let mut first_on_page = vec![None; page_count];
        for (idx, token) in kept.iter().enumerate() {
            first_on_page[token.page_index].get_or_insert(idx);
        }

        debug!("Token stream: {} tokens over {} pages", kept.len(), page_count);
        Some(Self {
            tokens: kept,
            page_sizes,
            first_on_page,
        })
    }

    /// Extract and build the stream for `path`, restricted to `range`.
    pub fn build(
        path: &Path,
        extractor: &dyn TokenExtractor,
        range: &PageRange,
    ) -> Result<Self, ReaderError> {
        let extracted = extractor.extract(path, range)?;
        let pages = range.to_indices(extracted.page_count);
        let found = extracted.tokens.len();

        let stream = Self::new(extracted.tokens, extracted.page_sizes).ok_or_else(|| {
            ReaderError::EmptyDocument {
                path: path.to_path_buf(),
                start: pages.start + 1,
                end: pages.end,
            }
        })?;
        info!(
            "Loaded {} words ({} raw) from pages {}–{}",
            stream.len(),
            found,
            pages.start + 1,
            pages.end
        );
        Ok(stream)
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Token> {
        self.tokens.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Token> {
        self.tokens.iter()
    }

    /// Total pages in the document, not only those with tokens.
    pub fn page_count(&self) -> usize {
        self.page_sizes.len()
    }

    pub fn page_size(&self, page: usize) -> Option<PageSize> {
        self.page_sizes.get(page).copied()
    }

    pub fn page_sizes(&self) -> &[PageSize] {
        &self.page_sizes
    }

    /// Page of the token at `index`.
    pub fn page_of(&self, index: usize) -> Option<usize> {
        self.tokens.get(index).map(|t| t.page_index)
    }

    /// Index of the first token on `page`, or `None` if the page has no words
    /// or is outside the document.
    pub fn first_index_on_page(&self, page: usize) -> Option<usize> {
        self.first_on_page.get(page).copied().flatten()
    }

    /// The lowest and highest page that carry at least one token.
    pub fn loaded_pages(&self) -> (usize, usize) {
        let first = self.tokens.first().map_or(0, |t| t.page_index);
        let last = self.tokens.last().map_or(0, |t| t.page_index);
        (first, last)
    }
}
