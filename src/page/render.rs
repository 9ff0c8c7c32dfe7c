//! Page rasterisation: render one page to a `DynamicImage` via pdfium.
//!
//! The adapter holds no cache of its own; [`super::PageCache`] decides when
//! to call it. It is called from the foreground path on a cache miss and from
//! the prefetch worker thread, so implementations must be `Send + Sync`.

use crate::error::RenderError;
use crate::pdfium::{bind_pdfium, open_document};
use image::DynamicImage;
use pdfium_render::prelude::*;
use std::path::PathBuf;
use tracing::debug;

/// The external page rasterizer.
pub trait PageRasterizer: Send + Sync {
    /// Render `page_index` (0-based) at `dpi`.
    fn render(&self, page_index: usize, dpi: f32) -> Result<DynamicImage, RenderError>;
}

/// pdfium-backed rasterizer for one document.
#[derive(Debug, Clone)]
pub struct PdfiumRasterizer {
    path: PathBuf,
    password: Option<String>,
}

impl PdfiumRasterizer {
    pub fn new(path: impl Into<PathBuf>, password: Option<String>) -> Self {
        Self {
            path: path.into(),
            password,
        }
    }
}

impl PageRasterizer for PdfiumRasterizer {
    fn render(&self, page_index: usize, dpi: f32) -> Result<DynamicImage, RenderError> {
        let unavailable = |detail: String| RenderError::Unavailable {
            page: page_index + 1,
            detail,
        };
        let pdfium = bind_pdfium().map_err(|e| unavailable(e.to_string()))?;
        let document = open_document(&pdfium, &self.path, self.password.as_deref())
            .map_err(|e| unavailable(e.to_string()))?;

        let pages = document.pages();
        let total = pages.len() as usize;
        if page_index >= total {
            return Err(RenderError::PageOutOfRange {
                page: page_index + 1,
                total,
            });
        }

        let page = pages
            .get(page_index as u16)
            .map_err(|e| RenderError::Rasterisation {
                page: page_index + 1,
                detail: format!("{:?}", e),
            })?;

        let target_width = (page.width().value * dpi / 72.0).round().max(1.0);
        let render_config = PdfRenderConfig::new().set_target_width(target_width as i32);

        let bitmap =
            page.render_with_config(&render_config)
                .map_err(|e| RenderError::Rasterisation {
                    page: page_index + 1,
                    detail: format!("{:?}", e),
                })?;

        let image = bitmap.as_image();
        debug!(
            "Rendered page {} → {}x{} px @ {:.0} dpi",
            page_index + 1,
            image.width(),
            image.height(),
            dpi
        );
        Ok(image)
    }
}
