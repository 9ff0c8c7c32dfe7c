//! Rendered page images and the cache that holds them.
//!
//! ```text
//! scheduler ──get(p)──▶ PageCache ──miss──▶ PageRasterizer (pdfium)
//!                          ▲
//!            prefetch ─────┘ background worker renders p+1..p+n
//! ```

pub mod cache;
pub mod render;

use crate::document::PageSize;
use image::{DynamicImage, GenericImageView, Rgb, RgbImage};

pub use cache::PageCache;
pub use render::{PageRasterizer, PdfiumRasterizer};

/// One page rasterised at the session resolution.
///
/// Immutable once built; shared between the cache, the scheduler and the
/// surface as `Arc<PageImage>`.
#[derive(Debug, Clone)]
pub struct PageImage {
    pub page_index: usize,
    pub image: DynamicImage,
    /// Nominal page size in document points.
    pub page_size: PageSize,
    /// True if this is a blank stand-in for a page that failed to render.
    pub is_placeholder: bool,
}

impl PageImage {
    pub fn new(page_index: usize, image: DynamicImage, page_size: PageSize) -> Self {
        Self {
            page_index,
            image,
            page_size,
            is_placeholder: false,
        }
    }

    /// White page sized from the nominal dimensions at `dpi`.
    pub fn placeholder(page_index: usize, page_size: PageSize, dpi: f32) -> Self {
        let (w, h) = pixel_size(page_size, dpi);
        Self {
            page_index,
            image: DynamicImage::ImageRgb8(RgbImage::from_pixel(w, h, Rgb([255, 255, 255]))),
            page_size,
            is_placeholder: true,
        }
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }

    /// Image pixels per document point.
    pub fn base_scale(&self) -> f32 {
        if self.page_size.width <= 0.0 {
            1.0
        } else {
            self.width() as f32 / self.page_size.width
        }
    }
}

/// Pixel dimensions of a page of `size` points rendered at `dpi`.
pub fn pixel_size(size: PageSize, dpi: f32) -> (u32, u32) {
    let scale = dpi / 72.0;
    (
        ((size.width * scale).round() as u32).max(1),
        ((size.height * scale).round() as u32).max(1),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    const LETTER: PageSize = PageSize {
        width: 612.0,
        height: 792.0,
    };

    #[test]
    fn placeholder_is_sized_from_dpi() {
        let page = PageImage::placeholder(4, LETTER, 144.0);
        assert!(page.is_placeholder);
        assert_eq!(page.dimensions(), (1224, 1584));
        assert_eq!(page.base_scale(), 2.0);
    }

    #[test]
    fn placeholder_is_deterministic() {
        let a = PageImage::placeholder(0, LETTER, 96.0);
        let b = PageImage::placeholder(0, LETTER, 96.0);
        assert_eq!(a.image.as_bytes(), b.image.as_bytes());
    }

    #[test]
    fn degenerate_page_size() {
        let size = PageSize {
            width: 0.0,
            height: 0.0,
        };
        assert_eq!(pixel_size(size, 300.0), (1, 1));
        assert_eq!(PageImage::placeholder(0, size, 300.0).base_scale(), 1.0);
    }
}
