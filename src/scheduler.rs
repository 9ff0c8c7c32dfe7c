//! Presentation scheduler: the play/pause/seek state machine.
//!
//! ## States
//!
//! ```text
//!            toggle_pause                    advance (tokens left)
//!   Playing ─────────────▶ Paused        Playing ───────────────▶ Playing
//!      ▲                     │              │
//!      └──── toggle_pause ───┘              └── advance (last token) ─▶ Finished
//! ```
//!
//! `PlaybackState::current_token_index` is the *next* token to show; the
//! token on screen is the one just before it. A timer is pending exactly when
//! the scheduler is playing and tokens remain.
//!
//! ## Stale firings
//!
//! Cancelling a timer cannot recall a firing that is already queued on the
//! event loop. [`Scheduler::advance`] therefore ignores any id that is not the
//! one currently pending, and ignores everything while paused.

use crate::config::{self, DisplayMode, ReaderConfig, ViewportSize};
use crate::document::TokenStream;
use crate::page::{PageCache, PageImage};
use crate::surface::{DisplayInstruction, HudInfo, PresentationSurface};
use crate::timer::{Timer, TimerId};
use crate::viewport::{map_token, ViewportState};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, trace};

/// Direction of a manual step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Backward,
    Forward,
}

impl Direction {
    fn delta(self) -> isize {
        match self {
            Direction::Backward => -1,
            Direction::Forward => 1,
        }
    }
}

/// Mutable playback state, owned by the scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlaybackState {
    /// Next token to show, in `[0, len]`.
    pub current_token_index: usize,
    pub paused: bool,
    pub pending_timer: Option<TimerId>,
}

/// Drives word-by-word presentation over a [`TokenStream`].
pub struct Scheduler<T: Timer, S: PresentationSurface> {
    tokens: Arc<TokenStream>,
    cache: PageCache,
    timer: T,
    surface: S,
    playback: PlaybackState,
    /// Page image on screen and how it is laid out.
    active_page: Option<(Arc<PageImage>, ViewportState)>,
    viewport: ViewportSize,
    display_mode: DisplayMode,
    wpm: u32,
    prefetch_pages: usize,
}

impl<T: Timer, S: PresentationSurface> Scheduler<T, S> {
    pub fn new(
        tokens: Arc<TokenStream>,
        cache: PageCache,
        timer: T,
        surface: S,
        config: &ReaderConfig,
    ) -> Self {
        Self {
            tokens,
            cache,
            timer,
            surface,
            playback: PlaybackState {
                current_token_index: 0,
                paused: config.start_paused,
                pending_timer: None,
            },
            active_page: None,
            viewport: config.viewport,
            display_mode: config.display_mode,
            wpm: config::normalize_wpm(config.wpm),
            prefetch_pages: config.prefetch_pages,
        }
    }

    // ── Operations ───────────────────────────────────────────────────────

    /// Begin presentation.
    ///
    /// Playing: schedules the first advancement. Paused: shows the first
    /// word and waits. No-op once finished, while a timer is pending, or when
    /// paused with a word already on screen.
    pub fn start(&mut self) {
        if self.is_finished() || self.playback.pending_timer.is_some() {
            return;
        }
        if self.playback.paused {
            if self.displayed_index().is_some() {
                return;
            }
            self.display(self.playback.current_token_index);
            self.surface.paused_changed(true);
        } else {
            self.schedule(Duration::ZERO);
        }
    }

    /// Playing → Paused cancels the pending timer; Paused → Playing schedules
    /// the next word immediately.
    pub fn toggle_pause(&mut self) {
        if self.playback.paused {
            self.playback.paused = false;
            debug!("Resumed at token {}", self.playback.current_token_index);
            self.surface.paused_changed(false);
            if !self.is_finished() {
                self.schedule(Duration::ZERO);
            }
        } else {
            self.playback.paused = true;
            self.cancel_pending();
            debug!("Paused at token {}", self.playback.current_token_index);
            self.surface.paused_changed(true);
        }
    }

    /// Move the displayed word one step. Only honoured while paused.
    pub fn step(&mut self, direction: Direction) {
        if !self.playback.paused {
            debug!("Ignoring step while playing");
            return;
        }
        let last = self.tokens.len() - 1;
        let target = match self.displayed_index() {
            Some(shown) => shown.saturating_add_signed(direction.delta()).min(last),
            None => 0,
        };
        self.display(target);
    }

    /// Jump to the first word on `page` (0-based).
    ///
    /// Returns `false` without touching any state if the page has no words or
    /// is already the current page.
    pub fn jump_to_page(&mut self, page: usize) -> bool {
        let Some(first) = self.tokens.first_index_on_page(page) else {
            debug!("No words on page {}; jump ignored", page + 1);
            return false;
        };
        if self.current_page() == Some(page) {
            return false;
        }

        self.cancel_pending();
        info!("Jumping to page {}", page + 1);
        self.display(first);
        if self.is_finished() {
            self.surface.finished();
        } else if !self.playback.paused {
            self.schedule(self.word_delay());
        }
        true
    }

    /// Timer callback: show the next word and reschedule.
    pub fn advance(&mut self, id: TimerId) {
        if self.playback.paused || self.playback.pending_timer != Some(id) {
            trace!("Ignoring stale timer {:?}", id);
            return;
        }
        self.playback.pending_timer = None;

        if self.is_finished() {
            return;
        }
        self.display(self.playback.current_token_index);

        if self.is_finished() {
            info!("Reached the last of {} words", self.tokens.len());
            self.surface.finished();
        } else {
            self.schedule(self.word_delay());
        }
    }

    /// Change the reading rate. Applies from the next scheduled word.
    pub fn set_wpm(&mut self, wpm: u32) {
        self.wpm = config::normalize_wpm(wpm);
        debug!("Reading rate set to {} wpm", self.wpm);
    }

    /// Recompute the layout for a new viewport size and redraw.
    pub fn resize(&mut self, width: u32, height: u32) {
        self.viewport = ViewportSize {
            width: width.max(1),
            height: height.max(1),
        };
        let Some((image, _)) = self.active_page.take() else {
            return;
        };
        let state = ViewportState::for_page(&image, self.display_mode, self.viewport);
        self.surface.show_page(&image, &state);
        self.active_page = Some((image, state));
        if let Some(shown) = self.displayed_index() {
            self.display(shown);
        }
    }

    // ── Queries ──────────────────────────────────────────────────────────

    pub fn playback(&self) -> &PlaybackState {
        &self.playback
    }

    /// All words have been shown.
    pub fn is_finished(&self) -> bool {
        self.playback.current_token_index >= self.tokens.len()
    }

    /// Index of the word on screen, if any.
    pub fn displayed_index(&self) -> Option<usize> {
        self.playback.current_token_index.checked_sub(1)
    }

    /// Page of the word on screen, or of the first word before anything shows.
    pub fn current_page(&self) -> Option<usize> {
        self.tokens.page_of(self.displayed_index().unwrap_or(0))
    }

    pub fn viewport_state(&self) -> Option<&ViewportState> {
        self.active_page.as_ref().map(|(_, state)| state)
    }

    pub fn word_delay(&self) -> Duration {
        config::word_delay(self.wpm)
    }

    pub fn wpm(&self) -> u32 {
        self.wpm
    }

    pub fn tokens(&self) -> &TokenStream {
        &self.tokens
    }

    pub fn cache(&self) -> &PageCache {
        &self.cache
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }

    pub fn timer_mut(&mut self) -> &mut T {
        &mut self.timer
    }

    pub fn into_surface(self) -> S {
        self.surface
    }

    // ── Internals ────────────────────────────────────────────────────────

    fn schedule(&mut self, delay: Duration) {
        self.cancel_pending();
        self.playback.pending_timer = Some(self.timer.schedule(delay));
    }

    fn cancel_pending(&mut self) {
        if let Some(id) = self.playback.pending_timer.take() {
            self.timer.cancel(id);
        }
    }

    /// Show token `index`, switching page first if needed. Leaves the cursor
    /// just past it.
    fn display(&mut self, index: usize) {
        let Some(token) = self.tokens.get(index).cloned() else {
            return;
        };
        let page = token.page_index;

        let on_screen = self
            .active_page
            .as_ref()
            .filter(|(image, _)| image.page_index == page)
            .map(|(_, state)| *state);
        let state = match on_screen {
            Some(state) => state,
            None => {
                let image = self.cache.get(page);
                let state = ViewportState::for_page(&image, self.display_mode, self.viewport);
                self.surface.show_page(&image, &state);
                self.active_page = Some((image, state));
                self.cache.prefetch(page, self.prefetch_pages);
                state
            }
        };

        let instruction = DisplayInstruction {
            pixel_rect: map_token(&token, &state),
            token_text: token.text,
            token_index: index,
            page_index: page,
            hud: HudInfo {
                current_page: page + 1,
                total_pages: self.tokens.page_count(),
                wpm: self.wpm,
                paused: self.playback.paused,
            },
        };
        trace!("Word {}: {:?}", index, instruction.token_text);
        self.surface.show_token(&instruction);
        self.playback.current_token_index = index + 1;
    }
}
