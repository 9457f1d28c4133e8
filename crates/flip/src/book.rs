use std::collections::HashMap;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::time::Duration;

/// Single-page display bounds for the widget.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BookBounds {
    pub width: f32,
    pub height: f32,
}

impl BookBounds {
    pub const MIN_WIDTH: f32 = 320.0;
    pub const MAX_WIDTH: f32 = 2000.0;
    pub const MIN_HEIGHT: f32 = 420.0;
    pub const MAX_HEIGHT: f32 = 2500.0;

    /// Fit a single page into a container: at most 800 px wide and 48% of
    /// the container width, at most 1100 px tall and 90% of the container
    /// height, clamped to the widget's hard bounds.
    pub fn fit(container_width: f32, container_height: f32) -> Self {
        let width =
            (container_width * 0.48).min(800.0).clamp(Self::MIN_WIDTH, Self::MAX_WIDTH);
        let height =
            (container_height * 0.9).min(1100.0).clamp(Self::MIN_HEIGHT, Self::MAX_HEIGHT);
        Self { width, height }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Orientation {
    /// One page per view.
    Portrait,
    /// Two-page spread.
    Landscape,
}

impl Orientation {
    /// Portrait when the container is taller than wide.
    pub fn for_container(container_width: f32, container_height: f32) -> Self {
        if container_width < container_height {
            Self::Portrait
        } else {
            Self::Landscape
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FlipBookConfig {
    pub bounds: BookBounds,
    pub orientation: Orientation,
    /// Fixed flip animation duration.
    pub flip_duration: Duration,
    /// Show the first page alone, like a book cover.
    pub show_cover: bool,
    pub draw_shadow: bool,
    pub touch_scroll: bool,
}

impl FlipBookConfig {
    /// The standard configuration, sized for a container.
    pub fn fitted(container_width: f32, container_height: f32) -> Self {
        Self {
            bounds: BookBounds::fit(container_width, container_height),
            orientation: Orientation::for_container(container_width, container_height),
            flip_duration: Duration::from_millis(600),
            show_cover: true,
            draw_shadow: true,
            touch_scroll: true,
        }
    }
}

/// Pages visible at once. In landscape the cover stands alone and the
/// rest pair up; a trailing odd page also stands alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Spread {
    Single(usize),
    Pair(usize, usize),
}

impl Spread {
    /// First (lowest) page index in this spread.
    pub fn first_page(&self) -> usize {
        match *self {
            Spread::Single(page) => page,
            Spread::Pair(left, _) => left,
        }
    }

    pub fn contains(&self, page: usize) -> bool {
        match *self {
            Spread::Single(single) => single == page,
            Spread::Pair(left, right) => left == page || right == page,
        }
    }
}

fn build_spreads(page_count: usize, orientation: Orientation, show_cover: bool) -> Vec<Spread> {
    if page_count == 0 {
        return Vec::new();
    }

    if orientation == Orientation::Portrait {
        return (0..page_count).map(Spread::Single).collect();
    }

    let mut spreads = Vec::new();
    let mut next = 0;

    if show_cover {
        spreads.push(Spread::Single(0));
        next = 1;
    }

    while next < page_count {
        if next + 1 < page_count {
            spreads.push(Spread::Pair(next, next + 1));
            next += 2;
        } else {
            spreads.push(Spread::Single(next));
            next += 1;
        }
    }

    spreads
}

/// Snapshot of the widget's reported state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlipState {
    /// First page of the current spread, 0-based.
    pub page: usize,
    /// Total page count.
    pub pages: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FlipEvent {
    /// A flip command moved the book forward or backward.
    Flip,
    /// The book's position changed for any other reason (jump, load).
    StateChange,
}

pub type FlipListener = Box<dyn FnMut(FlipState)>;

/// The page-flip widget: an ordered sequence of pages grouped into
/// spreads, a current position, and event subscriptions.
pub struct FlipBook {
    config: FlipBookConfig,
    spreads: Vec<Spread>,
    page_count: usize,
    current_spread: usize,
    listeners: HashMap<FlipEvent, Vec<FlipListener>>,
    alive: Arc<AtomicBool>,
}

impl FlipBook {
    pub fn new(config: FlipBookConfig, page_count: usize) -> Self {
        let spreads = build_spreads(page_count, config.orientation, config.show_cover);
        Self {
            config,
            spreads,
            page_count,
            current_spread: 0,
            listeners: HashMap::new(),
            alive: Arc::new(AtomicBool::new(true)),
        }
    }

    pub fn config(&self) -> &FlipBookConfig {
        &self.config
    }

    pub fn state(&self) -> FlipState {
        let page = self
            .spreads
            .get(self.current_spread)
            .map(Spread::first_page)
            .unwrap_or(0);
        FlipState { page, pages: self.page_count }
    }

    pub fn current_spread(&self) -> Option<Spread> {
        self.spreads.get(self.current_spread).copied()
    }

    pub fn current_spread_index(&self) -> usize {
        self.current_spread
    }

    pub fn spread_count(&self) -> usize {
        self.spreads.len()
    }

    pub fn spread_at(&self, index: usize) -> Option<Spread> {
        self.spreads.get(index).copied()
    }

    /// Subscribe to a widget event. Listeners live until [`destroy`].
    ///
    /// [`destroy`]: FlipBook::destroy
    pub fn on(&mut self, event: FlipEvent, listener: FlipListener) {
        self.listeners.entry(event).or_default().push(listener);
    }

    /// Flip forward one spread. Returns whether the position moved; a
    /// flip at the last spread is a no-op.
    pub fn flip_next(&mut self) -> bool {
        if self.current_spread + 1 >= self.spreads.len() {
            return false;
        }
        self.current_spread += 1;
        self.emit(FlipEvent::Flip);
        true
    }

    /// Flip backward one spread. A flip at the cover is a no-op.
    pub fn flip_prev(&mut self) -> bool {
        if self.current_spread == 0 {
            return false;
        }
        self.current_spread -= 1;
        self.emit(FlipEvent::Flip);
        true
    }

    /// Jump to the spread containing `page` (clamped to the last page).
    /// Returns whether the position moved.
    pub fn turn_to_page(&mut self, page: usize) -> bool {
        if self.spreads.is_empty() {
            return false;
        }

        let page = page.min(self.page_count.saturating_sub(1));
        let target = self
            .spreads
            .iter()
            .position(|spread| spread.contains(page))
            .unwrap_or(self.spreads.len() - 1);

        if target == self.current_spread {
            return false;
        }

        self.current_spread = target;
        self.emit(FlipEvent::StateChange);
        true
    }

    /// Tear the widget down: drop all listeners and mark the instance
    /// dead. Idempotent.
    pub fn destroy(&mut self) {
        self.listeners.clear();
        self.alive.store(false, Ordering::Release);
    }

    pub fn is_alive(&self) -> bool {
        self.alive.load(Ordering::Acquire)
    }

    /// Shared liveness flag, observable after the book itself is gone.
    pub fn alive_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.alive)
    }

    fn emit(&mut self, event: FlipEvent) {
        let state = self.state();
        if let Some(listeners) = self.listeners.get_mut(&event) {
            for listener in listeners {
                listener(state);
            }
        }
    }
}

impl Drop for FlipBook {
    fn drop(&mut self) {
        self.destroy();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    fn landscape_config() -> FlipBookConfig {
        FlipBookConfig::fitted(1600.0, 900.0)
    }

    fn portrait_config() -> FlipBookConfig {
        FlipBookConfig::fitted(600.0, 900.0)
    }

    #[test]
    fn bounds_fit_respects_caps_and_clamps() {
        let bounds = BookBounds::fit(1000.0, 1000.0);
        assert_eq!(bounds.width, 480.0);
        assert_eq!(bounds.height, 900.0);

        // Caps kick in for huge containers.
        let huge = BookBounds::fit(10_000.0, 10_000.0);
        assert_eq!(huge.width, 800.0);
        assert_eq!(huge.height, 1100.0);

        // Hard minimums for tiny containers.
        let tiny = BookBounds::fit(100.0, 100.0);
        assert_eq!(tiny.width, BookBounds::MIN_WIDTH);
        assert_eq!(tiny.height, BookBounds::MIN_HEIGHT);
    }

    #[test]
    fn landscape_spreads_keep_cover_alone() {
        let book = FlipBook::new(landscape_config(), 6);
        assert_eq!(book.spread_at(0), Some(Spread::Single(0)));
        assert_eq!(book.spread_at(1), Some(Spread::Pair(1, 2)));
        assert_eq!(book.spread_at(2), Some(Spread::Pair(3, 4)));
        assert_eq!(book.spread_at(3), Some(Spread::Single(5)));
        assert_eq!(book.spread_count(), 4);
    }

    #[test]
    fn portrait_uses_single_pages() {
        let book = FlipBook::new(portrait_config(), 4);
        assert_eq!(book.spread_count(), 4);
        assert_eq!(book.spread_at(2), Some(Spread::Single(2)));
    }

    #[test]
    fn flips_move_and_clamp_at_edges() {
        let mut book = FlipBook::new(landscape_config(), 5);

        assert!(!book.flip_prev());
        assert!(book.flip_next());
        assert_eq!(book.state().page, 1);

        assert!(book.flip_next());
        assert_eq!(book.state().page, 3);

        assert!(!book.flip_next());
        assert!(book.flip_prev());
        assert_eq!(book.state().page, 1);
    }

    #[test]
    fn turn_to_page_finds_the_containing_spread() {
        let mut book = FlipBook::new(landscape_config(), 10);

        assert!(book.turn_to_page(4));
        assert_eq!(book.state().page, 3); // spread (3,4)

        // Already on the right spread: no movement.
        assert!(!book.turn_to_page(3));

        // Out-of-range pages clamp to the last spread.
        assert!(book.turn_to_page(99));
        assert_eq!(book.state().page, 9);
    }

    #[test]
    fn listeners_observe_flips_and_jumps() {
        let mut book = FlipBook::new(landscape_config(), 6);
        let flips = Arc::new(Mutex::new(Vec::new()));
        let jumps = Arc::new(Mutex::new(Vec::new()));

        let sink = Arc::clone(&flips);
        book.on(FlipEvent::Flip, Box::new(move |state| sink.lock().unwrap().push(state.page)));
        let sink = Arc::clone(&jumps);
        book.on(
            FlipEvent::StateChange,
            Box::new(move |state| sink.lock().unwrap().push(state.page)),
        );

        book.flip_next();
        book.flip_next();
        book.turn_to_page(5);

        assert_eq!(*flips.lock().unwrap(), vec![1, 3]);
        assert_eq!(*jumps.lock().unwrap(), vec![5]);
    }

    #[test]
    fn edge_flips_emit_nothing() {
        let mut book = FlipBook::new(landscape_config(), 2);
        let count = Arc::new(Mutex::new(0usize));

        let sink = Arc::clone(&count);
        book.on(FlipEvent::Flip, Box::new(move |_| *sink.lock().unwrap() += 1));

        book.flip_prev();
        book.flip_next();
        book.flip_next(); // already at the last spread

        assert_eq!(*count.lock().unwrap(), 1);
    }

    #[test]
    fn destroy_is_idempotent_and_drops_listeners() {
        let mut book = FlipBook::new(landscape_config(), 3);
        let count = Arc::new(Mutex::new(0usize));

        let sink = Arc::clone(&count);
        book.on(FlipEvent::Flip, Box::new(move |_| *sink.lock().unwrap() += 1));

        let alive = book.alive_handle();
        book.destroy();
        book.destroy();

        assert!(!book.is_alive());
        assert!(!alive.load(Ordering::Acquire));

        // Flips still move state but no listener fires after teardown.
        book.flip_next();
        assert_eq!(*count.lock().unwrap(), 0);
    }

    #[test]
    fn drop_marks_the_instance_dead() {
        let book = FlipBook::new(landscape_config(), 3);
        let alive = book.alive_handle();
        drop(book);
        assert!(!alive.load(Ordering::Acquire));
    }
}
