//! Bounded LRU cache of rendered pages with a background prefetcher.
//!
//! ## Locking
//!
//! One mutex guards the whole entry table: the LRU itself, the pages handed
//! to the prefetch worker but not yet started ("queued"), and the pages being
//! rendered right now. Every membership check, insert and eviction happens
//! under it. Rendering never does: the lock is released while pdfium works
//! and re-taken to insert.
//!
//! A page being rendered is never rendered a second time. A `get` for it
//! waits on a condition variable until the renderer that claimed it inserts
//! the result. A `get` for a page that is only queued claims it and renders
//! it at once; the worker skips it when its turn comes. Should a duplicate
//! render slip through anyway, the second insert is a no-op that returns the
//! image already stored.
//!
//! A renderer that panics is treated like one that returned an error: the
//! claim is released and the page comes back as a placeholder.
//!
//! ## Resolution
//!
//! The DPI is fixed at construction. Changing resolution means building a new
//! `PageCache`; nothing rendered at the old DPI survives.

use super::{PageImage, PageRasterizer};
use crate::config::MIN_CACHE_CAPACITY;
use crate::document::PageSize;
use lru::LruCache;
use std::collections::HashSet;
use std::num::NonZeroUsize;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use tracing::{debug, warn};

/// Size used for placeholders of pages the document does not describe.
const FALLBACK_PAGE_SIZE: PageSize = PageSize {
    width: 612.0,
    height: 792.0,
};

/// Thread-safe LRU of [`PageImage`]s keyed by page index.
pub struct PageCache {
    shared: Arc<Shared>,
    prefetch_tx: Option<mpsc::Sender<usize>>,
}

struct Shared {
    table: Mutex<Table>,
    /// Signalled whenever a page finishes rendering.
    settled: Condvar,
    rasterizer: Arc<dyn PageRasterizer>,
    page_sizes: Vec<PageSize>,
    dpi: f32,
    renders: AtomicUsize,
}

struct Table {
    entries: LruCache<usize, Arc<PageImage>>,
    queued: HashSet<usize>,
    rendering: HashSet<usize>,
}

impl Table {
    /// Insert unless present; returns whichever image ends up stored.
    fn insert(&mut self, image: Arc<PageImage>) -> Arc<PageImage> {
        let page = image.page_index;
        if let Some(existing) = self.entries.get(&page) {
            debug!("Page {} already cached; dropping duplicate render", page + 1);
            return Arc::clone(existing);
        }
        if let Some((evicted, _)) = self.entries.push(page, Arc::clone(&image)) {
            debug!("Evicted page {} (least recently used)", evicted + 1);
        }
        image
    }
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, Table> {
        self.table.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn page_size(&self, page: usize) -> PageSize {
        self.page_sizes
            .get(page)
            .copied()
            .unwrap_or(FALLBACK_PAGE_SIZE)
    }

    /// Render outside the lock. `None` means the render failed or panicked
    /// and was logged.
    fn render(&self, page: usize) -> Option<Arc<PageImage>> {
        self.renders.fetch_add(1, Ordering::SeqCst);
        let outcome =
            panic::catch_unwind(AssertUnwindSafe(|| self.rasterizer.render(page, self.dpi)));
        match outcome {
            Ok(Ok(image)) => Some(Arc::new(PageImage::new(page, image, self.page_size(page)))),
            Ok(Err(e)) => {
                warn!("{}; showing a blank page", e);
                None
            }
            Err(_) => {
                warn!("Renderer panicked on page {}; showing a blank page", page + 1);
                None
            }
        }
    }

    /// Finish a render claimed in `rendering` and wake any waiters.
    fn settle(&self, page: usize, rendered: Option<Arc<PageImage>>) -> Option<Arc<PageImage>> {
        let stored = {
            let mut table = self.lock();
            table.rendering.remove(&page);
            rendered.map(|image| table.insert(image))
        };
        self.settled.notify_all();
        stored
    }
}

impl PageCache {
    /// Create a cache rendering at `dpi` and start its prefetch worker.
    ///
    /// `capacity` below [`MIN_CACHE_CAPACITY`] is raised to it.
    pub fn new(
        rasterizer: Arc<dyn PageRasterizer>,
        page_sizes: Vec<PageSize>,
        dpi: f32,
        capacity: usize,
    ) -> Self {
        let capacity = NonZeroUsize::new(capacity.max(MIN_CACHE_CAPACITY))
            .unwrap_or(NonZeroUsize::MIN);
        let shared = Arc::new(Shared {
            table: Mutex::new(Table {
                entries: LruCache::new(capacity),
                queued: HashSet::new(),
                rendering: HashSet::new(),
            }),
            settled: Condvar::new(),
            rasterizer,
            page_sizes,
            dpi,
            renders: AtomicUsize::new(0),
        });

        let (tx, rx) = mpsc::channel::<usize>();
        let worker_shared = Arc::clone(&shared);
        let spawned = std::thread::Builder::new()
            .name("page-prefetch".into())
            .spawn(move || prefetch_worker(worker_shared, rx));
        let prefetch_tx = match spawned {
            Ok(_) => Some(tx),
            Err(e) => {
                warn!("Could not start prefetch worker ({}); pages render on demand", e);
                None
            }
        };

        Self {
            shared,
            prefetch_tx,
        }
    }

    /// Return the image for `page`, rendering it on a miss.
    ///
    /// A hit marks the page most recently used. A page still waiting in the
    /// prefetch queue is taken over and rendered here; one already being
    /// rendered is waited for. A failed render yields an uncached blank
    /// placeholder, so the next `get` retries.
    pub fn get(&self, page: usize) -> Arc<PageImage> {
        let mut table = self.shared.lock();
        loop {
            if let Some(image) = table.entries.get(&page) {
                debug!("Cache hit: page {}", page + 1);
                return Arc::clone(image);
            }
            if table.queued.remove(&page) {
                debug!("Page {} still queued for prefetch; rendering it now", page + 1);
                break;
            }
            if !table.rendering.contains(&page) {
                break;
            }
            debug!("Page {} being prefetched; waiting for it", page + 1);
            table = self
                .shared
                .settled
                .wait(table)
                .unwrap_or_else(PoisonError::into_inner);
        }
        table.rendering.insert(page);
        drop(table);

        debug!("Cache miss: page {}", page + 1);
        let rendered = self.shared.render(page);
        self.shared.settle(page, rendered).unwrap_or_else(|| {
            Arc::new(PageImage::placeholder(
                page,
                self.shared.page_size(page),
                self.shared.dpi,
            ))
        })
    }

    /// Queue pages `from + 1 ..= from + count` for background rendering.
    ///
    /// Pages already cached, queued or rendering are skipped, so repeated hints cost
    /// nothing. `count` is capped at `capacity - 1` so a prefetch burst cannot
    /// evict the page being read. Never blocks on rendering.
    pub fn prefetch(&self, from: usize, count: usize) {
        let Some(tx) = &self.prefetch_tx else {
            return;
        };
        let mut table = self.shared.lock();
        let count = count.min(table.entries.cap().get().saturating_sub(1));
        let page_count = self.shared.page_sizes.len();

        for page in (from + 1..).take(count) {
            if page >= page_count {
                break;
            }
            if table.entries.contains(&page)
                || table.queued.contains(&page)
                || table.rendering.contains(&page)
            {
                continue;
            }
            if tx.send(page).is_err() {
                warn!("Prefetch worker has stopped");
                break;
            }
            table.queued.insert(page);
            debug!("Prefetch queued: page {}", page + 1);
        }
    }

    /// Block until the prefetch queue is drained and no page is rendering.
    pub fn wait_idle(&self) {
        let mut table = self.shared.lock();
        while !table.queued.is_empty() || !table.rendering.is_empty() {
            table = self
                .shared
                .settled
                .wait(table)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    /// Whether `page` is cached, without touching its recency.
    pub fn contains(&self, page: usize) -> bool {
        self.shared.lock().entries.contains(&page)
    }

    /// Cached pages, most recently used first.
    pub fn cached_pages(&self) -> Vec<usize> {
        self.shared.lock().entries.iter().map(|(page, _)| *page).collect()
    }

    pub fn len(&self) -> usize {
        self.shared.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.shared.lock().entries.cap().get()
    }

    pub fn dpi(&self) -> f32 {
        self.shared.dpi
    }

    pub fn page_count(&self) -> usize {
        self.shared.page_sizes.len()
    }

    /// Renders attempted so far, successful or not.
    pub fn render_count(&self) -> usize {
        self.shared.renders.load(Ordering::SeqCst)
    }
}

/// Render queued pages until the owning cache drops its sender.
///
/// A page no longer marked queued was claimed by a foreground `get` and is
/// skipped.
fn prefetch_worker(shared: Arc<Shared>, rx: mpsc::Receiver<usize>) {
    while let Ok(page) = rx.recv() {
        {
            let mut table = shared.lock();
            if !table.queued.remove(&page) {
                debug!("Prefetch of page {} already taken over", page + 1);
                continue;
            }
            table.rendering.insert(page);
        }
        let rendered = shared.render(page);
        shared.settle(page, rendered);
    }
    debug!("Prefetch worker exiting");
}
