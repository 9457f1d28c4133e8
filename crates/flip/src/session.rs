use crate::book::{FlipBook, FlipBookConfig, FlipEvent, FlipState};
use std::sync::{Arc, Mutex};

/// `"{current + 1} / {total}"`, matching the widget's reported state.
pub fn format_page_label(state: &FlipState) -> String {
    format!("{} / {}", state.page + 1, state.pages)
}

/// The viewer session: the active page sequence and at most one live
/// widget instance.
///
/// `P` is whatever the application uses as a page image; the session only
/// cares about ordering and count. Replacing the sequence always tears
/// the previous widget down first, and a label observer registered on
/// every present keeps `page_label` consistent with the widget's last
/// reported state.
pub struct ViewerSession<P> {
    book: Option<FlipBook>,
    images: Option<Arc<Vec<P>>>,
    label: Arc<Mutex<String>>,
}

impl<P> Default for ViewerSession<P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P> ViewerSession<P> {
    pub fn new() -> Self {
        Self { book: None, images: None, label: Arc::new(Mutex::new(String::new())) }
    }

    pub fn is_active(&self) -> bool {
        self.book.is_some()
    }

    pub fn book(&self) -> Option<&FlipBook> {
        self.book.as_ref()
    }

    pub fn images(&self) -> Option<&Arc<Vec<P>>> {
        self.images.as_ref()
    }

    pub fn total_pages(&self) -> usize {
        self.images.as_ref().map(|images| images.len()).unwrap_or(0)
    }

    pub fn page_label(&self) -> String {
        self.label.lock().unwrap_or_else(|poison| poison.into_inner()).clone()
    }

    /// Replace the session contents with a freshly built widget.
    ///
    /// Destroys any existing instance first, builds a new book fitted to
    /// the container, registers the label observers, and computes the
    /// label once immediately so it is correct before any event fires.
    /// An empty sequence violates the caller-side precondition and leaves
    /// the session untouched.
    pub fn present(&mut self, images: Arc<Vec<P>>, container_width: f32, container_height: f32) {
        if images.is_empty() {
            log::warn!("present called with an empty page sequence; keeping current state");
            return;
        }

        if let Some(mut old) = self.book.take() {
            old.destroy();
        }

        let config = FlipBookConfig::fitted(container_width, container_height);
        let mut book = FlipBook::new(config, images.len());

        let label = Arc::clone(&self.label);
        let write_label = move |state: FlipState| {
            *label.lock().unwrap_or_else(|poison| poison.into_inner()) =
                format_page_label(&state);
        };
        book.on(FlipEvent::Flip, Box::new(write_label.clone()));
        book.on(FlipEvent::StateChange, Box::new(write_label));

        *self.label.lock().unwrap_or_else(|poison| poison.into_inner()) =
            format_page_label(&book.state());

        self.images = Some(images);
        self.book = Some(book);
    }

    /// Flip to the next spread; no-op without a live widget.
    pub fn next(&mut self) {
        if let Some(book) = &mut self.book {
            book.flip_next();
        }
    }

    /// Flip to the previous spread; no-op without a live widget.
    pub fn prev(&mut self) {
        if let Some(book) = &mut self.book {
            book.flip_prev();
        }
    }

    /// Jump to the spread containing `page`; no-op without a live widget.
    pub fn jump_to(&mut self, page: usize) {
        if let Some(book) = &mut self.book {
            book.turn_to_page(page);
        }
    }

    /// Rebuild the widget for a new container size from the already
    /// rasterized images, then return to the captured page. Best-effort:
    /// the page lands on whichever spread contains it after the rebuild.
    /// No-op without a live widget.
    pub fn refit(&mut self, container_width: f32, container_height: f32) {
        let Some(book) = &self.book else { return };
        let current_page = book.state().page;

        let Some(images) = self.images.clone() else { return };
        self.present(images, container_width, container_height);

        if let Some(book) = &mut self.book {
            book.turn_to_page(current_page);
        }
    }
}
