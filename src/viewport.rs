//! Coordinate mapping from document space to viewport pixels.
//!
//! Everything here is a pure function of its arguments. A [`ViewportState`]
//! captures how one page image sits in the viewport; [`map_token`] applies it:
//!
//! ```text
//! px = (left·s + ox, top·s + oy, right·s + ox, bottom·s + oy)
//! s  = display_scale = base_scale            (native)
//!                    = base_scale · fit      (fit)
//! ```
//!
//! `base_scale` is image pixels per document point, fixed by the render DPI.

use crate::config::{DisplayMode, ViewportSize};
use crate::document::Token;
use crate::page::PageImage;
use serde::{Deserialize, Serialize};

/// Axis-aligned rectangle in viewport pixels.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PixelRect {
    pub left: f32,
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
}

impl PixelRect {
    pub fn width(&self) -> f32 {
        self.right - self.left
    }

    pub fn height(&self) -> f32 {
        self.bottom - self.top
    }

    pub fn center(&self) -> (f32, f32) {
        (
            (self.left + self.right) / 2.0,
            (self.top + self.bottom) / 2.0,
        )
    }

    pub fn contains_point(&self, x: f32, y: f32) -> bool {
        x >= self.left && x <= self.right && y >= self.top && y <= self.bottom
    }

    /// Overlap test; rectangles that only touch along an edge count.
    pub fn intersects(&self, other: &PixelRect) -> bool {
        self.left <= other.right
            && other.left <= self.right
            && self.top <= other.bottom
            && other.top <= self.bottom
    }
}

/// How the active page image is placed in the viewport.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ViewportState {
    pub active_page_index: usize,
    /// Pixels per document point, fit scale already folded in.
    pub display_scale: f32,
    pub offset_x: f32,
    pub offset_y: f32,
    pub fit_mode: bool,
}

impl ViewportState {
    /// Lay out `page` for `mode` in a viewport of `viewport` pixels.
    pub fn for_page(page: &PageImage, mode: DisplayMode, viewport: ViewportSize) -> Self {
        match mode {
            DisplayMode::Fit => Self::fit(page, viewport),
            DisplayMode::Native => Self::native(page),
        }
    }

    /// Scale the image to fit, preserving aspect ratio, and centre it.
    pub fn fit(page: &PageImage, viewport: ViewportSize) -> Self {
        let (iw, ih) = (page.width().max(1) as f32, page.height().max(1) as f32);
        let (vw, vh) = (viewport.width as f32, viewport.height as f32);
        let fit = (vw / iw).min(vh / ih);

        Self {
            active_page_index: page.page_index,
            display_scale: page.base_scale() * fit,
            offset_x: (vw - iw * fit) / 2.0,
            offset_y: (vh - ih * fit) / 2.0,
            fit_mode: true,
        }
    }

    /// Native resolution at the origin; the surface scrolls to reveal tokens.
    pub fn native(page: &PageImage) -> Self {
        Self {
            active_page_index: page.page_index,
            display_scale: page.base_scale(),
            offset_x: 0.0,
            offset_y: 0.0,
            fit_mode: false,
        }
    }
}

/// Map a token's document-space box into viewport pixels.
pub fn map_token(token: &Token, state: &ViewportState) -> PixelRect {
    let s = state.display_scale;
    PixelRect {
        left: token.left * s + state.offset_x,
        top: token.top * s + state.offset_y,
        right: token.right * s + state.offset_x,
        bottom: token.bottom * s + state.offset_y,
    }
}

/// Scroll offset that centres `rect` in a native-mode viewport.
///
/// `image` is the page image size in pixels; the result is clamped so the
/// view never scrolls past the image edges.
pub fn scroll_to_reveal(rect: &PixelRect, image: (u32, u32), viewport: ViewportSize) -> (f32, f32) {
    let (cx, cy) = rect.center();
    let max_x = (image.0 as f32 - viewport.width as f32).max(0.0);
    let max_y = (image.1 as f32 - viewport.height as f32).max(0.0);
    (
        (cx - viewport.width as f32 / 2.0).clamp(0.0, max_x),
        (cy - viewport.height as f32 / 2.0).clamp(0.0, max_y),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::PageSize;

    const LETTER: PageSize = PageSize {
        width: 612.0,
        height: 792.0,
    };

    fn page_at(dpi: f32) -> PageImage {
        PageImage::placeholder(0, LETTER, dpi)
    }

    fn viewport(width: u32, height: u32) -> ViewportSize {
        ViewportSize { width, height }
    }

    #[test]
    fn native_mode_uses_render_scale_only() {
        let page = page_at(144.0);
        let state = ViewportState::native(&page);
        assert_eq!(state.display_scale, 2.0);
        let rect = map_token(&Token::new("w", 0, 10.0, 20.0, 30.0, 32.0), &state);
        assert_eq!(
            rect,
            PixelRect {
                left: 20.0,
                top: 40.0,
                right: 60.0,
                bottom: 64.0
            }
        );
    }

    #[test]
    fn fit_mode_centres_horizontally_on_wide_viewport() {
        // 1224x1584 image into 1920x1080: height-bound, fit = 1080/1584
        let page = page_at(144.0);
        let state = ViewportState::fit(&page, viewport(1920, 1080));
        let fit = 1080.0 / 1584.0;
        assert!((state.display_scale - 2.0 * fit).abs() < 1e-5);
        assert!(state.offset_y.abs() < 1e-3);
        assert!((state.offset_x - (1920.0 - 1224.0 * fit) / 2.0).abs() < 1e-3);
    }

    #[test]
    fn fit_mode_centres_vertically_on_tall_viewport() {
        let page = page_at(72.0);
        let state = ViewportState::fit(&page, viewport(612, 2000));
        assert!((state.display_scale - 1.0).abs() < 1e-6);
        assert_eq!(state.offset_x, 0.0);
        assert_eq!(state.offset_y, (2000.0 - 792.0) / 2.0);
    }

    #[test]
    fn fit_mode_token_centre_is_visible() {
        let page = page_at(200.0);
        let vp = viewport(800, 600);
        let state = ViewportState::fit(&page, vp);
        for token in [
            Token::new("tl", 0, 0.0, 0.0, 20.0, 10.0),
            Token::new("mid", 0, 300.0, 390.0, 340.0, 402.0),
            Token::new("br", 0, 590.0, 780.0, 612.0, 792.0),
        ] {
            let (cx, cy) = map_token(&token, &state).center();
            assert!((0.0..=800.0).contains(&cx), "{}: x={cx}", token.text);
            assert!((0.0..=600.0).contains(&cy), "{}: y={cy}", token.text);
        }
    }

    #[test]
    fn for_page_dispatches_on_mode() {
        let page = page_at(72.0);
        assert!(ViewportState::for_page(&page, DisplayMode::Fit, viewport(100, 100)).fit_mode);
        assert!(!ViewportState::for_page(&page, DisplayMode::Native, viewport(100, 100)).fit_mode);
    }

    #[test]
    fn native_highlight_is_visible_after_scrolling() {
        let page = page_at(300.0);
        let vp = viewport(640, 480);
        let state = ViewportState::native(&page);
        let rect = map_token(&Token::new("deep", 0, 400.0, 600.0, 450.0, 612.0), &state);
        let (sx, sy) = scroll_to_reveal(&rect, page.dimensions(), vp);
        let visible = PixelRect {
            left: sx,
            top: sy,
            right: sx + 640.0,
            bottom: sy + 480.0,
        };
        assert!(visible.intersects(&rect));
        let (cx, cy) = rect.center();
        assert!(visible.contains_point(cx, cy));
    }

    #[test]
    fn scroll_centres_and_clamps() {
        let vp = viewport(400, 300);
        let rect = PixelRect {
            left: 900.0,
            top: 900.0,
            right: 940.0,
            bottom: 920.0,
        };
        assert_eq!(scroll_to_reveal(&rect, (1224, 1584), vp), (720.0, 760.0));

        let corner = PixelRect {
            left: 0.0,
            top: 0.0,
            right: 10.0,
            bottom: 10.0,
        };
        assert_eq!(scroll_to_reveal(&corner, (1224, 1584), vp), (0.0, 0.0));
        assert_eq!(scroll_to_reveal(&rect, (100, 100), vp), (0.0, 0.0));
    }
}
