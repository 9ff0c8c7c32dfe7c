//! Reading session: load a document, then run the foreground event loop.
//!
//! ```text
//! path ─▶ resolve_local ─▶ extract (spawn_blocking) ─▶ TokenStream
//!                                                          │
//!                    session DPI ─▶ PageCache ─▶ Scheduler ◀┘
//!                                                   ▲
//!               select! { timer firings, input events }
//! ```
//!
//! Playback state is only touched from the loop in [`run_session`]. Timer
//! firings and input events arrive on separate streams and are handled one at
//! a time, in arrival order.
//!
//! ## Rendering on the loop
//!
//! A cache miss renders synchronously inside the handler that needed the
//! page. On a multi-thread runtime each handler runs under
//! [`tokio::task::block_in_place`], so the worker hands its other tasks to a
//! fresh thread while pdfium works. The current-thread runtime cannot do
//! that; there the handler simply blocks the loop until the page is ready.

use crate::config::ReaderConfig;
use crate::document::{input::resolve_local, PdfiumExtractor, TokenExtractor, TokenStream};
use crate::error::ReaderError;
use crate::page::{PageCache, PageRasterizer, PdfiumRasterizer};
use crate::scheduler::{Direction, Scheduler};
use crate::surface::PresentationSurface;
use crate::timer::{Timer, TokioTimer};
use futures::{Stream, StreamExt};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::runtime::{Handle, RuntimeFlavor};
use tokio::sync::mpsc;
use tracing::{debug, info};

/// Change applied by one `+` / `-` key press.
pub const WPM_STEP: u32 = 25;

/// Lowest rate reachable with [`InputEvent::AdjustWpm`].
pub const MIN_WPM: u32 = 25;

/// User input understood by the session loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputEvent {
    TogglePause,
    Step(Direction),
    NextPage,
    PrevPage,
    /// 1-indexed page number.
    JumpToPage(usize),
    /// Add (or subtract) from the reading rate.
    AdjustWpm(i32),
    Resize { width: u32, height: u32 },
    Quit,
}

/// What happened during a session.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub words_total: usize,
    /// Words up to and including the last one shown.
    pub words_shown: usize,
    /// The last word was reached.
    pub finished: bool,
    /// The user asked to quit.
    pub quit: bool,
    pub pages_rendered: usize,
    pub dpi: f32,
}

/// Extract the token stream for `path` on the blocking thread pool.
pub async fn load_document(
    path: &Path,
    config: &ReaderConfig,
    extractor: Arc<dyn TokenExtractor>,
) -> Result<Arc<TokenStream>, ReaderError> {
    let path = path.to_path_buf();
    let range = config.page_range;

    let stream = tokio::task::spawn_blocking(move || {
        TokenStream::build(&path, extractor.as_ref(), &range)
    })
    .await
    .map_err(|e| ReaderError::Internal(format!("Extraction task panicked: {}", e)))??;

    Ok(Arc::new(stream))
}

/// The single render DPI used for the whole session.
pub fn session_dpi(config: &ReaderConfig, tokens: &TokenStream) -> f32 {
    let (first_page, _) = tokens.loaded_pages();
    let width = tokens.page_size(first_page).map_or(0.0, |s| s.width);
    config.resolution.resolve(config.viewport.width, width)
}

/// Open `path` with pdfium and read it to `surface`.
pub async fn read<S, I>(
    path: impl AsRef<Path>,
    config: &ReaderConfig,
    surface: S,
    input: I,
) -> Result<SessionSummary, ReaderError>
where
    S: PresentationSurface,
    I: Stream<Item = InputEvent> + Unpin,
{
    let path = path.as_ref();
    let extractor = Arc::new(PdfiumExtractor::new(config.password.clone()));
    let rasterizer = Arc::new(PdfiumRasterizer::new(path, config.password.clone()));
    read_with(path, config, extractor, rasterizer, surface, input).await
}

/// [`read`] with caller-supplied extraction and rasterisation backends.
pub async fn read_with<S, I>(
    path: impl AsRef<Path>,
    config: &ReaderConfig,
    extractor: Arc<dyn TokenExtractor>,
    rasterizer: Arc<dyn PageRasterizer>,
    surface: S,
    input: I,
) -> Result<SessionSummary, ReaderError>
where
    S: PresentationSurface,
    I: Stream<Item = InputEvent> + Unpin,
{
    let path: PathBuf = resolve_local(path)?;
    info!("Opening {}", path.display());

    let tokens = load_document(&path, config, extractor).await?;
    let dpi = session_dpi(config, &tokens);
    info!(
        "Session resolution {:.0} dpi, cache {} pages",
        dpi, config.cache_capacity
    );

    let cache = PageCache::new(
        rasterizer,
        tokens.page_sizes().to_vec(),
        dpi,
        config.cache_capacity,
    );
    Ok(run_session(tokens, cache, surface, config, input).await)
}

/// Run the event loop until the user quits, the input stream ends, or (with
/// `exit_at_end`) the last word has been shown.
pub async fn run_session<S, I>(
    tokens: Arc<TokenStream>,
    cache: PageCache,
    surface: S,
    config: &ReaderConfig,
    mut input: I,
) -> SessionSummary
where
    S: PresentationSurface,
    I: Stream<Item = InputEvent> + Unpin,
{
    let (tx, mut fired) = mpsc::unbounded_channel();
    let mut scheduler = Scheduler::new(tokens, cache, TokioTimer::new(tx), surface, config);
    let mut quit = false;

    off_worker(|| scheduler.start());
    loop {
        if config.exit_at_end && scheduler.is_finished() {
            break;
        }
        tokio::select! {
            Some(id) = fired.recv() => off_worker(|| scheduler.advance(id)),
            event = input.next() => match event {
                Some(InputEvent::Quit) => {
                    quit = true;
                    break;
                }
                Some(event) => off_worker(|| handle_input(&mut scheduler, event)),
                None => {
                    debug!("Input closed");
                    break;
                }
            },
        }
    }

    let summary = SessionSummary {
        words_total: scheduler.tokens().len(),
        words_shown: scheduler.playback().current_token_index,
        finished: scheduler.is_finished(),
        quit,
        pages_rendered: scheduler.cache().render_count(),
        dpi: scheduler.cache().dpi(),
    };
    info!(
        "Session ended after {}/{} words",
        summary.words_shown, summary.words_total
    );
    summary
}

/// Run scheduler work that may render a page without stalling the runtime's
/// other tasks, where the runtime allows it.
fn off_worker<R>(f: impl FnOnce() -> R) -> R {
    match Handle::try_current().map(|handle| handle.runtime_flavor()) {
        Ok(RuntimeFlavor::MultiThread) => tokio::task::block_in_place(f),
        _ => f(),
    }
}

fn handle_input<T, S>(scheduler: &mut Scheduler<T, S>, event: InputEvent)
where
    T: Timer,
    S: PresentationSurface,
{
    debug!("Input: {:?}", event);
    match event {
        InputEvent::TogglePause => scheduler.toggle_pause(),
        InputEvent::Step(direction) => scheduler.step(direction),
        InputEvent::NextPage => {
            if let Some(page) = neighbour_page(scheduler, Direction::Forward) {
                scheduler.jump_to_page(page);
            }
        }
        InputEvent::PrevPage => {
            if let Some(page) = neighbour_page(scheduler, Direction::Backward) {
                scheduler.jump_to_page(page);
            }
        }
        InputEvent::JumpToPage(number) => {
            let (first, last) = scheduler.tokens().loaded_pages();
            let page = number.saturating_sub(1).clamp(first, last);
            scheduler.jump_to_page(page);
        }
        InputEvent::AdjustWpm(delta) => {
            let wpm = i64::from(scheduler.wpm()) + i64::from(delta);
            let wpm = u32::try_from(wpm.max(i64::from(MIN_WPM))).unwrap_or(u32::MAX);
            scheduler.set_wpm(wpm);
        }
        InputEvent::Resize { width, height } => scheduler.resize(width, height),
        InputEvent::Quit => {}
    }
}

/// Nearest page with words before or after the current one, within the
/// loaded range.
fn neighbour_page<T, S>(scheduler: &Scheduler<T, S>, direction: Direction) -> Option<usize>
where
    T: Timer,
    S: PresentationSurface,
{
    let tokens = scheduler.tokens();
    let current = scheduler.current_page()?;
    let (first, last) = tokens.loaded_pages();
    match direction {
        Direction::Forward => (current + 1..=last).find(|&p| tokens.first_index_on_page(p).is_some()),
        Direction::Backward => (first..current)
            .rev()
            .find(|&p| tokens.first_index_on_page(p).is_some()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PageRange;
    use crate::document::tests::{letter_pages, word};
    use crate::document::{ExtractedDocument, Token};
    use crate::page::cache::tests::StubRasterizer;
    use crate::surface::DisplayInstruction;
    use futures::channel::mpsc::{unbounded, UnboundedSender};
    use std::time::Duration;
    use tokio::time::{sleep, Instant};
    use tokio_test::assert_pending;

    #[derive(Default)]
    struct Recorder {
        words: Vec<DisplayInstruction>,
        paused: Vec<bool>,
    }

    impl PresentationSurface for Recorder {
        fn show_token(&mut self, instruction: &DisplayInstruction) {
            self.words.push(instruction.clone());
        }

        fn paused_changed(&mut self, paused: bool) {
            self.paused.push(paused);
        }
    }

    impl Recorder {
        fn texts(&self) -> Vec<&str> {
            self.words.iter().map(|w| w.token_text.as_str()).collect()
        }
    }

    struct FixedExtractor(Vec<Token>);

    impl TokenExtractor for FixedExtractor {
        fn extract(&self, _path: &Path, _pages: &PageRange) -> Result<ExtractedDocument, ReaderError> {
            Ok(ExtractedDocument {
                tokens: self.0.clone(),
                page_count: 4,
                page_sizes: letter_pages(4),
            })
        }
    }

    fn five_words() -> Arc<TokenStream> {
        let tokens = vec![
            word("w0", 0, 0.0),
            word("w1", 0, 50.0),
            word("w2", 1, 0.0),
            word("w3", 1, 50.0),
            word("w4", 2, 0.0),
        ];
        Arc::new(TokenStream::new(tokens, letter_pages(4)).unwrap())
    }

    fn cache() -> PageCache {
        PageCache::new(Arc::new(StubRasterizer::default()), letter_pages(4), 72.0, 2)
    }

    fn config(paused: bool, exit_at_end: bool) -> ReaderConfig {
        ReaderConfig::builder()
            .wpm(600)
            .cache_capacity(2)
            .prefetch_pages(0)
            .start_paused(paused)
            .exit_at_end(exit_at_end)
            .build()
            .unwrap()
    }

    async fn send_after(tx: &UnboundedSender<InputEvent>, delay: Duration, event: InputEvent) {
        sleep(delay).await;
        tx.unbounded_send(event).unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn plays_through_at_word_delay() {
        let (_tx, rx) = unbounded();
        let mut surface = Recorder::default();
        let start = Instant::now();

        let summary = run_session(five_words(), cache(), &mut surface, &config(false, true), rx).await;

        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_millis(400), "{elapsed:?}");
        assert!(elapsed < Duration::from_millis(450), "{elapsed:?}");
        assert!(summary.finished);
        assert!(!summary.quit);
        assert_eq!(summary.words_shown, 5);
        assert_eq!(summary.pages_rendered, 3);
        assert_eq!(surface.texts(), ["w0", "w1", "w2", "w3", "w4"]);
    }

    #[tokio::test(start_paused = true)]
    async fn pause_holds_position_until_resumed() {
        let (tx, rx) = unbounded();
        let mut surface = Recorder::default();
        let start = Instant::now();

        let driver = async {
            send_after(&tx, Duration::from_millis(150), InputEvent::TogglePause).await;
            send_after(&tx, Duration::from_secs(1), InputEvent::TogglePause).await;
        };
        let cfg = config(false, true);
        let (summary, ()) = tokio::join!(
            run_session(five_words(), cache(), &mut surface, &cfg, rx),
            driver
        );

        // 150ms playing, 1s paused, then w2 immediately and two more words.
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_millis(1350), "{elapsed:?}");
        assert!(elapsed < Duration::from_millis(1400), "{elapsed:?}");
        assert!(summary.finished);
        assert_eq!(surface.paused, vec![true, false]);
        assert_eq!(surface.texts(), ["w0", "w1", "w2", "w3", "w4"]);
    }

    #[tokio::test(start_paused = true)]
    async fn quit_stops_early() {
        let (tx, rx) = unbounded();
        let mut surface = Recorder::default();
        let driver = send_after(&tx, Duration::from_millis(150), InputEvent::Quit);

        let cfg = config(false, false);
        let (summary, ()) = tokio::join!(
            run_session(five_words(), cache(), &mut surface, &cfg, rx),
            driver
        );

        assert!(summary.quit);
        assert!(!summary.finished);
        assert_eq!(summary.words_shown, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn page_navigation_skips_empty_pages_and_clamps() {
        let (tx, rx) = unbounded();
        let mut surface = Recorder::default();
        for event in [
            InputEvent::NextPage,
            InputEvent::NextPage,
            InputEvent::NextPage,
            InputEvent::PrevPage,
            InputEvent::JumpToPage(1),
            InputEvent::JumpToPage(99),
            InputEvent::Quit,
        ] {
            tx.unbounded_send(event).unwrap();
        }

        run_session(five_words(), cache(), &mut surface, &config(true, false), rx).await;

        assert_eq!(surface.texts(), ["w0", "w2", "w4", "w2", "w0", "w4"]);
    }

    #[tokio::test(start_paused = true)]
    async fn wpm_adjustments_have_a_floor() {
        let (tx, rx) = unbounded();
        let mut surface = Recorder::default();
        tx.unbounded_send(InputEvent::AdjustWpm(-10_000)).unwrap();
        tx.unbounded_send(InputEvent::Step(Direction::Forward)).unwrap();
        tx.unbounded_send(InputEvent::AdjustWpm(WPM_STEP as i32)).unwrap();
        tx.unbounded_send(InputEvent::Step(Direction::Forward)).unwrap();
        drop(tx);

        let summary = run_session(five_words(), cache(), &mut surface, &config(true, false), rx).await;

        assert!(!summary.quit);
        assert_eq!(surface.words[1].hud.wpm, MIN_WPM);
        assert_eq!(surface.words[2].hud.wpm, MIN_WPM + WPM_STEP);
    }

    #[test]
    fn paused_session_waits_without_a_timer() {
        let (_tx, rx) = unbounded();
        let mut surface = Recorder::default();
        let cfg = config(true, true);

        let mut session = tokio_test::task::spawn(run_session(
            five_words(),
            cache(),
            &mut surface,
            &cfg,
            rx,
        ));
        assert_pending!(session.poll());
        assert_pending!(session.poll());
        assert!(!session.is_woken());
        drop(session);

        assert_eq!(surface.texts(), ["w0"]);
        assert_eq!(surface.paused, vec![true]);
    }

    #[tokio::test]
    async fn empty_document_is_an_error() {
        let extractor = Arc::new(FixedExtractor(vec![word("   ", 0, 0.0)]));
        let err = load_document(Path::new("blank.pdf"), &config(false, false), extractor)
            .await
            .unwrap_err();
        assert!(matches!(err, ReaderError::EmptyDocument { start: 1, end: 4, .. }));
    }

    #[test]
    fn auto_dpi_follows_first_loaded_page() {
        let config = ReaderConfig::builder().viewport(1224, 800).build().unwrap();
        let tokens = TokenStream::new(vec![word("w", 1, 0.0)], letter_pages(2)).unwrap();
        assert_eq!(session_dpi(&config, &tokens), 144.0);

        let config = ReaderConfig::builder()
            .resolution(crate::config::Resolution::Dpi(96))
            .build()
            .unwrap();
        assert_eq!(session_dpi(&config, &tokens), 96.0);
    }
}
