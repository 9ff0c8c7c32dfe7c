//! CLI binary for edgequake-rsvp.
//!
//! A thin shim over the library crate that maps CLI flags to `ReaderConfig`,
//! draws words in the terminal and turns key presses into input events.

use anyhow::{Context, Result};
use clap::Parser;
use crossterm::event::{Event, EventStream, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::style::{Attribute, Print, SetAttribute};
use crossterm::terminal::{
    self, disable_raw_mode, enable_raw_mode, Clear, ClearType, EnterAlternateScreen,
    LeaveAlternateScreen,
};
use crossterm::{cursor, execute, queue};
use edgequake_rsvp::session::WPM_STEP;
use edgequake_rsvp::{
    read, scroll_to_reveal, Direction, DisplayInstruction, DisplayMode, InputEvent,
    JsonLinesSurface, PageImage, PresentationSurface, ReaderConfig, Resolution, SessionSummary,
    ViewportSize, ViewportState,
};
use futures::stream::{self, Stream, StreamExt};
use std::io::{self, Stdout, Write};
use std::path::PathBuf;
use std::pin::Pin;
use tracing::warn;
use tracing_subscriber::EnvFilter;

const AFTER_HELP: &str = r#"EXAMPLES:
  # Read a paper at 400 words per minute
  rsvp --wpm 400 paper.pdf

  # Chapters 3 to 5 only, opening paused
  rsvp --start-page 41 --end-page 97 --paused book.pdf

  # Stream display instructions as JSON lines (no terminal UI)
  rsvp --json --wpm 1200 paper.pdf > words.jsonl

KEYS:
  space          pause / resume
  ← / →          previous / next word (while paused)
  PageUp / p     previous page
  PageDown / n   next page
  + / -          faster / slower (25 wpm steps)
  Esc / q        quit

ENVIRONMENT VARIABLES:
  PDFIUM_LIB_PATH   Directory containing libpdfium (otherwise ./ then the system library)
  RUST_LOG          Overrides the log filter (logs go to stderr)
"#;

/// Read PDF files one word at a time.
#[derive(Parser, Debug)]
#[command(
    name = "rsvp",
    version,
    about = "Read PDF files one word at a time with on-page highlighting",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Local PDF file path.
    input: PathBuf,

    /// Reading rate in words per minute.
    #[arg(short, long, env = "RSVP_WPM", default_value_t = 300)]
    wpm: u32,

    /// Font size of the displayed word, in points (8–400). The terminal
    /// shows sizes from 80 up as wider letter spacing.
    #[arg(long, env = "RSVP_FONT_SIZE", default_value_t = 60)]
    font_size: u16,

    /// Draw on the current terminal screen instead of the alternate screen.
    #[arg(long, env = "RSVP_WINDOWED")]
    windowed: bool,

    /// Open paused on the first word.
    #[arg(long, env = "RSVP_PAUSED")]
    paused: bool,

    /// Page rendering DPI (36–600). Derived from the viewport width if unset.
    #[arg(long, env = "RSVP_DPI",
          value_parser = clap::value_parser!(u32).range(36..=600))]
    dpi: Option<u32>,

    /// Show pages at native resolution instead of fitting them to the viewport.
    #[arg(long, env = "RSVP_NATIVE")]
    native: bool,

    /// Maximum number of rendered pages kept in memory.
    #[arg(long, env = "RSVP_CACHE_SIZE", default_value_t = 8)]
    cache_size: usize,

    /// Pages rendered ahead in the background.
    #[arg(long, env = "RSVP_PREFETCH", default_value_t = 2)]
    prefetch: usize,

    /// Page viewport size in pixels, e.g. 1920x1080.
    #[arg(long, env = "RSVP_VIEWPORT", default_value = "1920x1080", value_parser = parse_viewport)]
    viewport: (u32, u32),

    /// First page to read (1-indexed).
    #[arg(long, env = "RSVP_START_PAGE")]
    start_page: Option<usize>,

    /// Last page to read (1-indexed, inclusive).
    #[arg(long, env = "RSVP_END_PAGE")]
    end_page: Option<usize>,

    /// PDF user password for encrypted documents.
    #[arg(long, env = "RSVP_PASSWORD")]
    password: Option<String>,

    /// Exit once the last word has been shown.
    #[arg(long, env = "RSVP_EXIT_AT_END")]
    exit_at_end: bool,

    /// Write display instructions to stdout as JSON lines instead of drawing.
    #[arg(long, env = "RSVP_JSON")]
    json: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "RSVP_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "RSVP_QUIET")]
    quiet: bool,
}

type InputStream = Pin<Box<dyn Stream<Item = InputEvent> + Send>>;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The terminal surface owns the screen; keep library logs out of its way
    // unless asked for.
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || !cli.json {
        "error"
    } else {
        "info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    let config = build_config(&cli)?;

    let summary = if cli.json {
        let surface = JsonLinesSurface::new(io::stdout());
        read(&cli.input, &config, surface, stream::pending())
            .await
            .with_context(|| format!("Failed to read {}", cli.input.display()))?
    } else {
        let guard =
            TerminalGuard::enter(config.fullscreen).context("Failed to set up the terminal")?;
        let surface = TerminalSurface::new(io::stdout(), &config);
        let result = read(&cli.input, &config, surface, key_events()).await;
        drop(guard);
        result.with_context(|| format!("Failed to read {}", cli.input.display()))?
    };

    if !cli.quiet && !cli.json {
        print_summary(&summary);
    }
    Ok(())
}

/// Map CLI args to `ReaderConfig`.
fn build_config(cli: &Cli) -> Result<ReaderConfig> {
    let resolution = cli.dpi.map_or(Resolution::Auto, Resolution::Dpi);
    let display_mode = if cli.native {
        DisplayMode::Native
    } else {
        DisplayMode::Fit
    };

    // Nothing reads stdin in JSON mode, so it could neither pause nor resume.
    if cli.json && cli.paused {
        warn!("--paused has no effect with --json");
    }

    let mut builder = ReaderConfig::builder()
        .wpm(cli.wpm)
        .font_size(cli.font_size)
        .fullscreen(!cli.windowed)
        .start_paused(cli.paused && !cli.json)
        .resolution(resolution)
        .display_mode(display_mode)
        .cache_capacity(cli.cache_size)
        .prefetch_pages(cli.prefetch)
        .viewport(cli.viewport.0, cli.viewport.1)
        .page_range(cli.start_page, cli.end_page)
        .exit_at_end(cli.exit_at_end || cli.json);

    if let Some(ref password) = cli.password {
        builder = builder.password(password.clone());
    }

    builder.build().context("Invalid configuration")
}

/// Parse `--viewport WIDTHxHEIGHT`.
fn parse_viewport(s: &str) -> Result<(u32, u32)> {
    let (w, h) = s
        .trim()
        .to_lowercase()
        .split_once('x')
        .map(|(w, h)| (w.trim().to_string(), h.trim().to_string()))
        .with_context(|| format!("Expected WIDTHxHEIGHT, got '{}'", s))?;
    let width: u32 = w.parse().context("Invalid viewport width")?;
    let height: u32 = h.parse().context("Invalid viewport height")?;
    if width == 0 || height == 0 {
        anyhow::bail!("Viewport must be at least 1x1 (got {}x{})", width, height);
    }
    Ok((width, height))
}

fn print_summary(summary: &SessionSummary) {
    eprintln!(
        "Read {}/{} words ({} pages rendered at {:.0} dpi)",
        summary.words_shown, summary.words_total, summary.pages_rendered, summary.dpi
    );
}

// ── Keyboard input ───────────────────────────────────────────────────────

fn key_events() -> InputStream {
    Box::pin(EventStream::new().filter_map(|event| async move {
        match event {
            Ok(Event::Key(key)) => map_key(key),
            Ok(_) => None,
            Err(e) => {
                warn!("Terminal input error: {}", e);
                Some(InputEvent::Quit)
            }
        }
    }))
}

fn map_key(key: KeyEvent) -> Option<InputEvent> {
    if key.kind != KeyEventKind::Press {
        return None;
    }
    if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
        return Some(InputEvent::Quit);
    }
    let step = WPM_STEP as i32;
    Some(match key.code {
        KeyCode::Char(' ') => InputEvent::TogglePause,
        KeyCode::Left => InputEvent::Step(Direction::Backward),
        KeyCode::Right => InputEvent::Step(Direction::Forward),
        KeyCode::PageDown | KeyCode::Char('n') => InputEvent::NextPage,
        KeyCode::PageUp | KeyCode::Char('p') => InputEvent::PrevPage,
        KeyCode::Char('+') | KeyCode::Char('=') => InputEvent::AdjustWpm(step),
        KeyCode::Char('-') => InputEvent::AdjustWpm(-step),
        KeyCode::Esc | KeyCode::Char('q') => InputEvent::Quit,
        _ => return None,
    })
}

// ── Terminal surface ─────────────────────────────────────────────────────

/// Raw mode for the lifetime of the guard, plus the alternate screen when
/// running full screen.
struct TerminalGuard {
    alternate: bool,
}

impl TerminalGuard {
    fn enter(fullscreen: bool) -> io::Result<Self> {
        enable_raw_mode()?;
        if fullscreen {
            execute!(io::stdout(), EnterAlternateScreen)?;
        }
        execute!(io::stdout(), cursor::Hide)?;
        Ok(Self {
            alternate: fullscreen,
        })
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let _ = execute!(io::stdout(), cursor::Show);
        if self.alternate {
            let _ = execute!(io::stdout(), LeaveAlternateScreen);
        } else {
            // Leave the last frame in the scrollback and start on a fresh line.
            let _ = execute!(io::stdout(), cursor::MoveToNextLine(1));
        }
        let _ = disable_raw_mode();
    }
}

/// Draws the current word in the middle of the terminal with a status line
/// at the bottom.
struct TerminalSurface {
    out: Stdout,
    last: Option<DisplayInstruction>,
    page_pixels: (u32, u32),
    native: bool,
    viewport: ViewportSize,
    font_size: u16,
    paused: bool,
    finished: bool,
    exit_at_end: bool,
}

impl TerminalSurface {
    fn new(out: Stdout, config: &ReaderConfig) -> Self {
        Self {
            out,
            last: None,
            page_pixels: (0, 0),
            native: config.display_mode == DisplayMode::Native,
            viewport: config.viewport,
            font_size: config.font_size,
            paused: false,
            finished: false,
            exit_at_end: config.exit_at_end,
        }
    }

    fn redraw(&mut self) {
        if let Err(e) = self.try_redraw() {
            warn!("Failed to draw: {}", e);
        }
    }

    fn try_redraw(&mut self) -> io::Result<()> {
        let (cols, rows) = terminal::size()?;
        queue!(self.out, Clear(ClearType::All))?;

        if let Some(ref word) = self.last {
            let text = spaced_word(&word.token_text, self.font_size, cols as usize);
            let width = text.chars().count() as u16;
            let x = cols.saturating_sub(width) / 2;
            queue!(
                self.out,
                cursor::MoveTo(x, rows / 2),
                SetAttribute(Attribute::Bold),
                Print(text),
                SetAttribute(Attribute::Reset),
            )?;

            let mut status = status_line(
                word,
                self.page_pixels,
                self.paused,
                self.finished && !self.exit_at_end,
            );
            if self.native {
                let (sx, sy) = scroll_to_reveal(&word.pixel_rect, self.page_pixels, self.viewport);
                status.push_str(&format!("  ·  view at ({:.0},{:.0})", sx, sy));
            }
            let shown: String = status.chars().take(cols as usize).collect();
            queue!(
                self.out,
                cursor::MoveTo(0, rows.saturating_sub(1)),
                SetAttribute(Attribute::Dim),
                Print(shown),
                SetAttribute(Attribute::Reset),
            )?;
        }
        self.out.flush()
    }
}

/// Letter-space `text` to suggest the configured font size in a terminal
/// that has only one. Below 80pt the word is drawn unspaced; each further
/// 40pt adds a column between letters, as far as `cols` allows.
fn spaced_word(text: &str, font_size: u16, cols: usize) -> String {
    let letters = text.chars().count();
    let mut gap = usize::from(font_size / 40).saturating_sub(1);
    while gap > 0 && letters + gap * letters.saturating_sub(1) > cols {
        gap -= 1;
    }
    if gap == 0 {
        return text.to_string();
    }
    let spacer = " ".repeat(gap);
    let mut out = String::with_capacity(text.len() + gap * letters);
    for (i, c) in text.chars().enumerate() {
        if i > 0 {
            out.push_str(&spacer);
        }
        out.push(c);
    }
    out
}

fn status_line(word: &DisplayInstruction, page: (u32, u32), paused: bool, finished: bool) -> String {
    let state = if finished {
        "end (q to quit)"
    } else if paused {
        "paused"
    } else {
        "reading"
    };
    let rect = &word.pixel_rect;
    format!(
        " page {}/{}  ·  {} wpm  ·  {}  ·  word {} at ({:.0},{:.0}) on {}x{} px",
        word.hud.current_page,
        word.hud.total_pages,
        word.hud.wpm,
        state,
        word.token_index + 1,
        rect.left,
        rect.top,
        page.0,
        page.1,
    )
}

impl PresentationSurface for TerminalSurface {
    fn show_page(&mut self, page: &PageImage, _viewport: &ViewportState) {
        self.page_pixels = page.dimensions();
    }

    fn show_token(&mut self, instruction: &DisplayInstruction) {
        self.last = Some(instruction.clone());
        self.paused = instruction.hud.paused;
        self.finished = false;
        self.redraw();
    }

    fn paused_changed(&mut self, paused: bool) {
        self.paused = paused;
        self.redraw();
    }

    fn finished(&mut self) {
        self.finished = true;
        self.redraw();
    }
}
