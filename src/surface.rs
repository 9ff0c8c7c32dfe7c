//! Presentation-surface trait: where display instructions go.
//!
//! The scheduler never draws. It hands each shown word to a
//! [`PresentationSurface`] as a [`DisplayInstruction`], hands over the page
//! image whenever the displayed page changes, and reports pause transitions.
//! All methods have default no-op implementations so a surface overrides only
//! what it draws.
//!
//! Surfaces are driven from the foreground event loop only; the prefetch
//! worker never calls them.

use crate::page::PageImage;
use crate::viewport::{PixelRect, ViewportState};
use serde::{Deserialize, Serialize};
use std::io::Write;
use tracing::warn;

/// Heads-up display values shown alongside the word.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HudInfo {
    /// 1-indexed page of the displayed word.
    pub current_page: usize,
    pub total_pages: usize,
    pub wpm: u32,
    pub paused: bool,
}

/// "Show token T at rectangle R on page P."
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DisplayInstruction {
    pub token_text: String,
    pub token_index: usize,
    /// 0-based page index.
    pub page_index: usize,
    pub pixel_rect: PixelRect,
    pub hud: HudInfo,
}

/// Receives everything the reader wants on screen.
pub trait PresentationSurface {
    /// A new page image is now the background. Called before the first
    /// [`show_token`](Self::show_token) on that page and after a resize.
    fn show_page(&mut self, page: &PageImage, viewport: &ViewportState) {
        let _ = (page, viewport);
    }

    /// Display one word and highlight its rectangle.
    fn show_token(&mut self, instruction: &DisplayInstruction) {
        let _ = instruction;
    }

    /// Playback was paused (`true`) or resumed (`false`).
    fn paused_changed(&mut self, paused: bool) {
        let _ = paused;
    }

    /// The last word has been shown.
    fn finished(&mut self) {}
}

impl<S: PresentationSurface + ?Sized> PresentationSurface for &mut S {
    fn show_page(&mut self, page: &PageImage, viewport: &ViewportState) {
        (**self).show_page(page, viewport);
    }

    fn show_token(&mut self, instruction: &DisplayInstruction) {
        (**self).show_token(instruction);
    }

    fn paused_changed(&mut self, paused: bool) {
        (**self).paused_changed(paused);
    }

    fn finished(&mut self) {
        (**self).finished();
    }
}

/// Writes each instruction as one JSON object per line.
///
/// Pause transitions and the end of the stream are written as
/// `{"event":"paused"}`, `{"event":"resumed"}` and `{"event":"finished"}`.
pub struct JsonLinesSurface<W: Write> {
    out: W,
}

impl<W: Write> JsonLinesSurface<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn write_line(&mut self, value: &impl Serialize) {
        if let Err(e) = self.try_write_line(value) {
            warn!("Failed to write display instruction: {}", e);
        }
    }

    fn try_write_line(&mut self, value: &impl Serialize) -> std::io::Result<()> {
        serde_json::to_writer(&mut self.out, value)?;
        self.out.write_all(b"\n")?;
        self.out.flush()
    }
}

impl<W: Write> PresentationSurface for JsonLinesSurface<W> {
    fn show_token(&mut self, instruction: &DisplayInstruction) {
        self.write_line(instruction);
    }

    fn paused_changed(&mut self, paused: bool) {
        let event = if paused { "paused" } else { "resumed" };
        self.write_line(&serde_json::json!({ "event": event }));
    }

    fn finished(&mut self) {
        self.write_line(&serde_json::json!({ "event": "finished" }));
    }
}
