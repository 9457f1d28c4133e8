//! Page-flip widget model and viewer session.
//!
//! Pure state logic, no UI dependency: the [`FlipBook`] models the
//! page-flip widget (spread pairing, navigation, event subscription,
//! teardown) and the [`ViewerSession`] owns its lifecycle, enforcing the
//! at-most-one-instance invariant and keeping the page label in sync
//! through registered observers.

mod book;
mod session;

pub use book::{
    BookBounds, FlipBook, FlipBookConfig, FlipEvent, FlipListener, FlipState, Orientation,
    Spread,
};
pub use session::{format_page_label, ViewerSession};
