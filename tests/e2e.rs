//! End-to-end integration tests for edgequake-rsvp.
//!
//! These tests use real PDF files in `./test_cases/` and need a pdfium
//! library. They are gated behind the `E2E_ENABLED` environment variable so
//! they do not run in CI unless explicitly requested.
//!
//! Run with:
//!   E2E_ENABLED=1 PDFIUM_LIB_PATH=. cargo test --test e2e -- --nocapture

use edgequake_rsvp::{
    read, DisplayInstruction, PageCache, PageRange, PageRasterizer, PdfiumExtractor,
    PdfiumRasterizer, PresentationSurface, ReaderConfig, ReaderError, TokenExtractor,
};
use std::path::PathBuf;
use std::sync::Arc;

// ── Test helpers ─────────────────────────────────────────────────────────────

fn test_cases_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("test_cases")
}

/// Skip this test if E2E_ENABLED is not set *or* no PDF file at `path`.
macro_rules! e2e_skip_unless_ready {
    ($path:expr) => {{
        if std::env::var("E2E_ENABLED").is_err() {
            println!("SKIP: set E2E_ENABLED=1 to run e2e tests");
            return;
        }
        let p: PathBuf = $path;
        if !p.exists() {
            println!("SKIP: test file not found: {}", p.display());
            return;
        }
        p
    }};
}

/// First PDF found in `test_cases/`.
fn any_pdf() -> PathBuf {
    std::fs::read_dir(test_cases_dir())
        .ok()
        .and_then(|entries| {
            entries
                .filter_map(Result::ok)
                .map(|e| e.path())
                .filter(|p| p.extension().is_some_and(|x| x.eq_ignore_ascii_case("pdf")))
                .min()
        })
        .unwrap_or_else(|| test_cases_dir().join("missing.pdf"))
}

#[derive(Default)]
struct Collect(Vec<DisplayInstruction>);

impl PresentationSurface for Collect {
    fn show_token(&mut self, instruction: &DisplayInstruction) {
        self.0.push(instruction.clone());
    }
}

// ── Tests ────────────────────────────────────────────────────────────────────

#[test]
fn extracts_words_with_boxes_inside_their_page() {
    let path = e2e_skip_unless_ready!(any_pdf());
    let doc = PdfiumExtractor::new(None)
        .extract(&path, &PageRange::default())
        .expect("extraction");

    assert!(!doc.tokens.is_empty(), "no words in {}", path.display());
    assert_eq!(doc.page_sizes.len(), doc.page_count);
    for token in &doc.tokens {
        let size = doc.page_sizes[token.page_index];
        assert!(token.left <= token.right && token.top <= token.bottom);
        assert!(token.left >= -1.0 && token.right <= size.width + 1.0, "{token:?}");
        assert!(token.top >= -1.0 && token.bottom <= size.height + 1.0, "{token:?}");
    }
    println!("{}: {} words over {} pages", path.display(), doc.tokens.len(), doc.page_count);
}

#[test]
fn renders_first_page_at_requested_dpi() {
    let path = e2e_skip_unless_ready!(any_pdf());
    let doc = PdfiumExtractor::new(None)
        .extract(&path, &PageRange { start: Some(1), end: Some(1) })
        .expect("extraction");
    let rasterizer: Arc<dyn PageRasterizer> = Arc::new(PdfiumRasterizer::new(&path, None));
    let cache = PageCache::new(rasterizer, doc.page_sizes.clone(), 144.0, 2);

    let page = cache.get(0);
    assert!(!page.is_placeholder);
    let expected = (doc.page_sizes[0].width * 2.0).round() as u32;
    assert!(page.width().abs_diff(expected) <= 1, "{} vs {}", page.width(), expected);
    assert_eq!(cache.render_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn reads_first_page_to_the_end() {
    let path = e2e_skip_unless_ready!(any_pdf());
    let config = ReaderConfig::builder()
        .wpm(6000)
        .page_range(Some(1), Some(1))
        .exit_at_end(true)
        .build()
        .unwrap();

    let mut surface = Collect::default();
    let summary = read(&path, &config, &mut surface, futures::stream::pending())
        .await
        .expect("session");

    assert!(summary.finished);
    assert_eq!(summary.words_shown, summary.words_total);
    assert_eq!(surface.0.len(), summary.words_total);
    assert!(surface.0.iter().all(|w| w.page_index == 0));
}

#[tokio::test]
async fn rejects_a_file_that_is_not_a_pdf() {
    if std::env::var("E2E_ENABLED").is_err() {
        println!("SKIP: set E2E_ENABLED=1 to run e2e tests");
        return;
    }
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("Cargo.toml");
    let err = read(&path, &ReaderConfig::default(), Collect::default(), futures::stream::pending())
        .await
        .unwrap_err();
    assert!(matches!(err, ReaderError::NotAPdf { .. }), "{err:?}");
}
