//! # edgequake-rsvp
//!
//! Read PDF documents one word at a time (rapid serial visual presentation)
//! while the word's position is highlighted on the rendered page.
//!
//! ## Why this crate?
//!
//! Plain RSVP readers strip a document down to a word stream and lose the
//! page: figures, layout, and the sense of where you are. This crate keeps the
//! rendered page on screen next to the flashing word and highlights each word
//! where it sits, so the reader can glance back at context at any time.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDF
//!  │
//!  ├─ 1. Input     validate the local file (exists, readable, %PDF magic)
//!  ├─ 2. Extract   words + bounding boxes via pdfium (spawn_blocking)
//!  ├─ 3. Schedule  one word per 60000/wpm ms; pause, step, page jumps
//!  ├─ 4. Render    page images through an LRU cache with background prefetch
//!  ├─ 5. Map       document-space boxes → viewport pixels (fit / native)
//!  └─ 6. Present   display instructions to a PresentationSurface
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use edgequake_rsvp::{read, JsonLinesSurface, ReaderConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ReaderConfig::builder().wpm(400).exit_at_end(true).build()?;
//!     let surface = JsonLinesSurface::new(std::io::stdout());
//!     let summary = read("document.pdf", &config, surface, futures::stream::pending()).await?;
//!     eprintln!("{} words", summary.words_shown);
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `rsvp` binary (clap + anyhow + tracing-subscriber + crossterm) |
//!
//! Disable `cli` when embedding the reader in another front end:
//! ```toml
//! edgequake-rsvp = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod document;
pub mod error;
pub mod page;
pub mod pdfium;
pub mod scheduler;
pub mod session;
pub mod surface;
pub mod timer;
pub mod viewport;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{DisplayMode, PageRange, ReaderConfig, ReaderConfigBuilder, Resolution, ViewportSize};
pub use document::{ExtractedDocument, PageSize, PdfiumExtractor, Token, TokenExtractor, TokenStream};
pub use error::{ReaderError, RenderError};
pub use page::{PageCache, PageImage, PageRasterizer, PdfiumRasterizer};
pub use scheduler::{Direction, PlaybackState, Scheduler};
pub use session::{load_document, read, read_with, run_session, InputEvent, SessionSummary};
pub use surface::{DisplayInstruction, HudInfo, JsonLinesSurface, PresentationSurface};
pub use timer::{Timer, TimerId, TokioTimer};
pub use viewport::{map_token, scroll_to_reveal, PixelRect, ViewportState};
