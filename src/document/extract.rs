//! pdfium-backed [`TokenExtractor`]: words with their on-page boxes.
//!
//! pdfium exposes a page's text layer as a flat run of characters, each with
//! its own bounds, interleaved with *generated* whitespace (spaces and line
//! breaks pdfium infers from glyph spacing). A word is a maximal run of
//! non-whitespace characters; its box is the union of the characters' loose
//! bounds.

use super::{ExtractedDocument, PageSize, Token, TokenExtractor};
use crate::config::PageRange;
use crate::error::ReaderError;
use crate::pdfium::{bind_pdfium, open_document};
use pdfium_render::prelude::*;
use std::path::Path;
use tracing::{debug, info};

/// Extract words through pdfium's text layer.
#[derive(Debug, Clone, Default)]
pub struct PdfiumExtractor {
    password: Option<String>,
}

impl PdfiumExtractor {
    pub fn new(password: Option<String>) -> Self {
        Self { password }
    }
}

impl TokenExtractor for PdfiumExtractor {
    fn extract(
        &self,
        path: &Path,
        pages: &PageRange,
    ) -> Result<ExtractedDocument, ReaderError> {
        let pdfium = bind_pdfium()?;
        let document = open_document(&pdfium, path, self.password.as_deref())?;

        let doc_pages = document.pages();
        let page_count = doc_pages.len() as usize;
        info!("PDF loaded: {} pages", page_count);

        let page_sizes: Vec<PageSize> = doc_pages
            .iter()
            .map(|page| PageSize {
                width: page.width().value,
                height: page.height().value,
            })
            .collect();

        let mut tokens = Vec::new();
        for idx in pages.to_indices(page_count) {
            let page = doc_pages
                .get(idx as u16)
                .map_err(|e| ReaderError::Extraction {
                    page: idx + 1,
                    detail: format!("{:?}", e),
                })?;
            let text = page.text().map_err(|e| ReaderError::Extraction {
                page: idx + 1,
                detail: format!("{:?}", e),
            })?;

            let mut words = WordBuilder::new(idx, page.height().value);
            for ch in text.chars().iter() {
                let bounds = ch.loose_bounds().ok().map(|r| {
                    (r.left().value, r.top().value, r.right().value, r.bottom().value)
                });
                words.push(ch.unicode_char(), bounds);
            }
            let page_tokens = words.finish();
            debug!("Page {}: {} words", idx + 1, page_tokens.len());
            tokens.extend(page_tokens);
        }

        Ok(ExtractedDocument {
            tokens,
            page_count,
            page_sizes,
        })
    }
}

/// Accumulates characters into words for one page.
///
/// Bounds arrive in PDF space (`left, top, right, bottom`, origin bottom-left)
/// and leave as top-left-origin document space.
struct WordBuilder {
    page_index: usize,
    page_height: f32,
    text: String,
    bounds: Option<(f32, f32, f32, f32)>,
    words: Vec<Token>,
}

impl WordBuilder {
    fn new(page_index: usize, page_height: f32) -> Self {
        Self {
            page_index,
            page_height,
            text: String::new(),
            bounds: None,
            words: Vec::new(),
        }
    }

    fn push(&mut self, ch: Option<char>, pdf_bounds: Option<(f32, f32, f32, f32)>) {
        let Some(ch) = ch else {
            return;
        };
        if ch.is_whitespace() {
            self.flush();
            return;
        }
        self.text.push(ch);
        if let Some((l, t, r, b)) = pdf_bounds {
            // PDF y grows upwards: top-left-origin top is `height - pdf_top`.
            let (l, t, r, b) = (l, self.page_height - t, r, self.page_height - b);
            self.bounds = Some(match self.bounds {
                None => (l, t, r, b),
                Some((l0, t0, r0, b0)) => (l0.min(l), t0.min(t), r0.max(r), b0.max(b)),
            });
        }
    }

    fn flush(&mut self) {
        if self.text.is_empty() {
            return;
        }
        let (l, t, r, b) = self.bounds.take().unwrap_or_default();
        self.words.push(Token::new(
            std::mem::take(&mut self.text),
            self.page_index,
            l,
            t,
            r,
            b,
        ));
    }

    fn finish(mut self) -> Vec<Token> {
        self.flush();
        self.words
    }
}
