//! Configuration types for an RSVP reading session.
//!
//! All session behaviour is controlled through [`ReaderConfig`], built via its
//! [`ReaderConfigBuilder`]. Setters clamp out-of-range values to the nearest
//! legal one; [`ReaderConfigBuilder::build`] rejects what cannot be clamped
//! (an inverted page range) before any document is opened.

use crate::error::ReaderError;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::warn;

/// Reading rate used when the caller supplies a non-positive one.
pub const DEFAULT_WPM: u32 = 300;

/// Smallest page cache the reader will run with.
pub const MIN_CACHE_CAPACITY: usize = 1;

/// Configuration for a reading session.
///
/// # Example
/// ```rust
/// use edgequake_rsvp::{DisplayMode, ReaderConfig};
///
/// let config = ReaderConfig::builder()
///     .wpm(450)
///     .display_mode(DisplayMode::Native)
///     .page_range(Some(2), Some(10))
///     .build()
///     .unwrap();
/// assert_eq!(config.word_delay().as_millis(), 133);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReaderConfig {
    /// Words per minute. Default: 300.
    pub wpm: u32,

    /// Font size of the displayed word, in points. Range: 8–400. Default: 60.
    pub font_size: u16,

    /// Take over the whole screen. Default: true.
    pub fullscreen: bool,

    /// Open the session paused on the first word. Default: false.
    pub start_paused: bool,

    /// Page rasterisation resolution. Default: [`Resolution::Auto`].
    pub resolution: Resolution,

    /// How the page image is placed in the viewport. Default: [`DisplayMode::Fit`].
    pub display_mode: DisplayMode,

    /// Maximum number of rendered pages kept in memory. Default: 8.
    pub cache_capacity: usize,

    /// Number of upcoming pages rendered ahead in the background. Default: 2.
    pub prefetch_pages: usize,

    /// Size of the page viewport in pixels. Default: 1920×1080.
    pub viewport: ViewportSize,

    /// Pages to read. Default: all pages.
    pub page_range: PageRange,

    /// PDF user password for encrypted documents.
    pub password: Option<String>,

    /// End the session once the last word has been shown. Default: false.
    pub exit_at_end: bool,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            wpm: DEFAULT_WPM,
            font_size: 60,
            fullscreen: true,
            start_paused: false,
            resolution: Resolution::default(),
            display_mode: DisplayMode::default(),
            cache_capacity: 8,
            prefetch_pages: 2,
            viewport: ViewportSize::default(),
            page_range: PageRange::default(),
            password: None,
            exit_at_end: false,
        }
    }
}

impl ReaderConfig {
    /// Create a new builder for `ReaderConfig`.
    pub fn builder() -> ReaderConfigBuilder {
        ReaderConfigBuilder {
            config: Self::default(),
        }
    }

    /// Time each word stays on screen: `60000 / wpm` milliseconds.
    pub fn word_delay(&self) -> Duration {
        word_delay(self.wpm)
    }
}

/// Delay between words at the given rate. Non-positive rates use [`DEFAULT_WPM`].
pub fn word_delay(wpm: u32) -> Duration {
    Duration::from_millis(60_000 / u64::from(normalize_wpm(wpm)))
}

/// Map a non-positive rate to [`DEFAULT_WPM`], logging the fallback.
pub fn normalize_wpm(wpm: u32) -> u32 {
    if wpm == 0 {
        warn!("Reading rate must be positive; using {} wpm", DEFAULT_WPM);
        DEFAULT_WPM
    } else {
        wpm
    }
}

/// Builder for [`ReaderConfig`].
#[derive(Debug)]
pub struct ReaderConfigBuilder {
    config: ReaderConfig,
}

impl ReaderConfigBuilder {
    pub fn wpm(mut self, wpm: u32) -> Self {
        self.config.wpm = normalize_wpm(wpm);
        self
    }

    pub fn font_size(mut self, size: u16) -> Self {
        self.config.font_size = size.clamp(8, 400);
        self
    }

    pub fn fullscreen(mut self, v: bool) -> Self {
        self.config.fullscreen = v;
        self
    }

    pub fn start_paused(mut self, v: bool) -> Self {
        self.config.start_paused = v;
        self
    }

    pub fn resolution(mut self, resolution: Resolution) -> Self {
        self.config.resolution = match resolution {
            Resolution::Dpi(dpi) => Resolution::Dpi(dpi.clamp(36, 600)),
            Resolution::Auto => Resolution::Auto,
        };
        self
    }

    pub fn display_mode(mut self, mode: DisplayMode) -> Self {
        self.config.display_mode = mode;
        self
    }

    pub fn cache_capacity(mut self, n: usize) -> Self {
        if n < MIN_CACHE_CAPACITY {
            warn!(
                "Cache capacity {} is below the minimum; using {}",
                n, MIN_CACHE_CAPACITY
            );
        }
        self.config.cache_capacity = n.max(MIN_CACHE_CAPACITY);
        self
    }

    pub fn prefetch_pages(mut self, n: usize) -> Self {
        self.config.prefetch_pages = n;
        self
    }

    pub fn viewport(mut self, width: u32, height: u32) -> Self {
        self.config.viewport = ViewportSize {
            width: width.max(1),
            height: height.max(1),
        };
        self
    }

    /// Pages to read, 1-indexed and inclusive. `None` leaves that end open.
    pub fn page_range(mut self, start: Option<usize>, end: Option<usize>) -> Self {
        self.config.page_range = PageRange { start, end };
        self
    }

    pub fn password(mut self, pwd: impl Into<String>) -> Self {
        self.config.password = Some(pwd.into());
        self
    }

    pub fn exit_at_end(mut self, v: bool) -> Self {
        self.config.exit_at_end = v;
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ReaderConfig, ReaderError> {
        self.config.page_range.validate()?;
        Ok(self.config)
    }
}

// ── Enums & small types ──────────────────────────────────────────────────

/// Resolution pages are rasterised at.
///
/// A single resolution is used for the whole session. `Auto` derives it from
/// the viewport width and the width of the first page read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Resolution {
    /// `72 * viewport_width / first_page_width` (default).
    #[default]
    Auto,
    /// Explicit dots per inch.
    Dpi(u32),
}

impl Resolution {
    /// Resolve to a concrete DPI given the first page width in points.
    pub fn resolve(&self, viewport_width: u32, first_page_width: f32) -> f32 {
        match *self {
            Resolution::Dpi(dpi) => dpi as f32,
            Resolution::Auto => {
                if first_page_width <= 0.0 {
                    72.0
                } else {
                    (72.0 * viewport_width as f32 / first_page_width).clamp(36.0, 600.0)
                }
            }
        }
    }
}

/// How the page image is placed inside the viewport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DisplayMode {
    /// Scale the page to fit the viewport, centred (default).
    #[default]
    Fit,
    /// Show the page at its rendered resolution; the surface scrolls.
    Native,
}

/// Viewport dimensions in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewportSize {
    pub width: u32,
    pub height: u32,
}

impl Default for ViewportSize {
    fn default() -> Self {
        Self {
            width: 1920,
            height: 1080,
        }
    }
}

/// Inclusive page range, 1-indexed as the user types it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PageRange {
    pub start: Option<usize>,
    pub end: Option<usize>,
}

impl PageRange {
    /// Reject ranges that cannot be clamped into something meaningful.
    pub fn validate(&self) -> Result<(), ReaderError> {
        if self.start == Some(0) {
            return Err(ReaderError::InvalidConfig(
                "Pages are 1-indexed, start page must be ≥ 1".into(),
            ));
        }
        if let (Some(start), Some(end)) = (self.start, self.end) {
            if end < start {
                return Err(ReaderError::InvalidConfig(format!(
                    "End page {} is before start page {}",
                    end, start
                )));
            }
        }
        Ok(())
    }

    /// Normalise to a 0-indexed half-open range clamped to `total_pages`.
    pub fn to_indices(&self, total_pages: usize) -> std::ops::Range<usize> {
        let end = self.end.unwrap_or(total_pages).min(total_pages);
        let start = self.start.unwrap_or(1).max(1) - 1;
        start.min(end)..end
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn word_delay_from_wpm() {
        assert_eq!(word_delay(600), Duration::from_millis(100));
        assert_eq!(word_delay(300), Duration::from_millis(200));
        assert_eq!(word_delay(60), Duration::from_millis(1000));
    }

    #[test]
    fn zero_wpm_falls_back_to_default() {
        let config = ReaderConfig::builder().wpm(0).build().unwrap();
        assert_eq!(config.wpm, DEFAULT_WPM);
        assert_eq!(word_delay(0), word_delay(DEFAULT_WPM));
    }

    #[test]
    fn cache_capacity_is_clamped() {
        let config = ReaderConfig::builder().cache_capacity(0).build().unwrap();
        assert_eq!(config.cache_capacity, MIN_CACHE_CAPACITY);
    }

    #[test]
    fn inverted_page_range_rejected() {
        let err = ReaderConfig::builder()
            .page_range(Some(2), Some(1))
            .build()
            .unwrap_err();
        assert!(matches!(err, ReaderError::InvalidConfig(_)), "got: {err}");
    }

    #[test]
    fn zero_start_page_rejected() {
        assert!(ReaderConfig::builder()
            .page_range(Some(0), None)
            .build()
            .is_err());
    }

    #[test]
    fn page_range_to_indices() {
        let all = PageRange::default();
        assert_eq!(all.to_indices(5), 0..5);

        let middle = PageRange {
            start: Some(2),
            end: Some(4),
        };
        assert_eq!(middle.to_indices(5), 1..4);

        let past_end = PageRange {
            start: Some(3),
            end: Some(99),
        };
        assert_eq!(past_end.to_indices(5), 2..5);

        let beyond = PageRange {
            start: Some(9),
            end: None,
        };
        assert!(beyond.to_indices(5).is_empty());
    }

    #[test]
    fn auto_resolution_uses_viewport_width() {
        // 612pt letter page into a 1224px-wide viewport → 144 DPI
        assert_eq!(Resolution::Auto.resolve(1224, 612.0), 144.0);
        assert_eq!(Resolution::Auto.resolve(1224, 0.0), 72.0);
        assert_eq!(Resolution::Dpi(150).resolve(1224, 612.0), 150.0);
    }

    #[test]
    fn explicit_dpi_is_clamped() {
        let config = ReaderConfig::builder()
            .resolution(Resolution::Dpi(5000))
            .build()
            .unwrap();
        assert_eq!(config.resolution, Resolution::Dpi(600));
    }
}
