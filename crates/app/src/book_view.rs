//! egui rendering of the flip book.
//!
//! The [`FlipBook`] owns the position and spread model; this view only
//! turns JPEG pages into textures, lays the current spread out around the
//! spine, and animates spread changes. Input on the book area is reported
//! back as a [`NavRequest`] so the caller drives the book through the
//! session.

use leafthrough_flip::{FlipBook, Orientation, Spread};
use leafthrough_raster::PageImage;
use std::collections::HashMap;
use std::time::Instant;

/// Navigation the user asked for by interacting with the book area.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavRequest {
    Prev,
    Next,
}

/// Where a page sits relative to the spine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Slot {
    Left,
    Right,
    Full,
}

/// Pages of a spread with their slots. In landscape the cover and a
/// trailing odd page sit alone on the right and left respectively.
fn page_slots(spread: Spread, orientation: Orientation, page_count: usize) -> Vec<(usize, Slot)> {
    match (spread, orientation) {
        (Spread::Single(page), Orientation::Portrait) => vec![(page, Slot::Full)],
        (Spread::Single(page), Orientation::Landscape) => {
            if page == 0 {
                vec![(page, Slot::Right)]
            } else if page + 1 == page_count {
                vec![(page, Slot::Left)]
            } else {
                vec![(page, Slot::Full)]
            }
        }
        (Spread::Pair(left, right), _) => vec![(left, Slot::Left), (right, Slot::Right)],
    }
}

struct FlipAnimation {
    from: Spread,
    started: Instant,
}

pub struct BookView {
    textures: HashMap<usize, egui::TextureHandle>,
    last_spread: Option<usize>,
    animation: Option<FlipAnimation>,
}

impl Default for BookView {
    fn default() -> Self {
        Self::new()
    }
}

impl BookView {
    pub fn new() -> Self {
        Self { textures: HashMap::new(), last_spread: None, animation: None }
    }

    /// Drop all cached textures and animation state. Call when a new
    /// document replaces the page sequence; a refit keeps the cache since
    /// the underlying images are unchanged.
    pub fn reset(&mut self) {
        self.textures.clear();
        self.last_spread = None;
        self.animation = None;
    }

    /// Draw the current spread centered in `ui`'s available space and
    /// report any navigation the user requested.
    pub fn show(
        &mut self,
        ui: &mut egui::Ui,
        book: &FlipBook,
        images: &[PageImage],
    ) -> Option<NavRequest> {
        let Some(spread) = book.current_spread() else { return None };
        let config = book.config();

        let spread_index = book.current_spread_index();
        if let Some(previous) = self.last_spread {
            if previous != spread_index && !config.flip_duration.is_zero() {
                if let Some(from) = book.spread_at(previous) {
                    self.animation = Some(FlipAnimation { from, started: Instant::now() });
                }
            }
        }
        self.last_spread = Some(spread_index);

        let bounds = config.bounds;
        let book_size = match config.orientation {
            Orientation::Portrait => egui::vec2(bounds.width, bounds.height),
            Orientation::Landscape => egui::vec2(bounds.width * 2.0, bounds.height),
        };

        let (outer, response) =
            ui.allocate_exact_size(ui.available_size(), egui::Sense::click());
        let book_rect = egui::Rect::from_center_size(outer.center(), book_size);
        let painter = ui.painter_at(outer);

        let page_count = book.state().pages;
        self.paint_spread(ui.ctx(), &painter, book_rect, spread, config.orientation,
            page_count, images, egui::Color32::WHITE);
        self.paint_animation(ui, &painter, book_rect, config, page_count, images);

        self.nav_from_input(&response, book_rect, config.touch_scroll)
    }

    fn paint_spread(
        &mut self,
        ctx: &egui::Context,
        painter: &egui::Painter,
        book_rect: egui::Rect,
        spread: Spread,
        orientation: Orientation,
        page_count: usize,
        images: &[PageImage],
        tint: egui::Color32,
    ) {
        for (page, slot) in page_slots(spread, orientation, page_count) {
            let slot_rect = slot_rect(book_rect, slot);
            if let Some(texture) = self.texture_for(ctx, page, images) {
                paint_page(painter, slot_rect, &texture, slot, tint);
            }
        }
    }

    /// Crossfade the outgoing spread over the incoming one, with a shadow
    /// along the spine while the fade runs.
    fn paint_animation(
        &mut self,
        ui: &egui::Ui,
        painter: &egui::Painter,
        book_rect: egui::Rect,
        config: &leafthrough_flip::FlipBookConfig,
        page_count: usize,
        images: &[PageImage],
    ) {
        let Some(animation) = &self.animation else { return };
        let from = animation.from;
        let elapsed = animation.started.elapsed();

        let t = elapsed.as_secs_f32() / config.flip_duration.as_secs_f32().max(f32::EPSILON);
        if t >= 1.0 {
            self.animation = None;
            return;
        }

        let fade = 1.0 - t;
        let tint = egui::Color32::WHITE.gamma_multiply(fade);
        self.paint_spread(ui.ctx(), painter, book_rect, from, config.orientation,
            page_count, images, tint);

        if config.draw_shadow {
            let shadow = egui::Color32::from_black_alpha((fade * 70.0) as u8);
            let spine = egui::Rect::from_center_size(
                book_rect.center(),
                egui::vec2(book_rect.width() * 0.08, book_rect.height()),
            );
            painter.rect_filled(spine, 0.0, shadow);
        }

        ui.ctx().request_repaint();
    }

    fn nav_from_input(
        &self,
        response: &egui::Response,
        book_rect: egui::Rect,
        touch_scroll: bool,
    ) -> Option<NavRequest> {
        if response.clicked() {
            if let Some(pos) = response.interact_pointer_pos() {
                return if pos.x < book_rect.center().x {
                    Some(NavRequest::Prev)
                } else {
                    Some(NavRequest::Next)
                };
            }
        }

        if touch_scroll && response.hovered() {
            let scroll = response.ctx.input(|input| input.raw_scroll_delta.y);
            if scroll > 1.0 {
                return Some(NavRequest::Prev);
            }
            if scroll < -1.0 {
                return Some(NavRequest::Next);
            }
        }

        None
    }

    fn texture_for(
        &mut self,
        ctx: &egui::Context,
        page: usize,
        images: &[PageImage],
    ) -> Option<egui::TextureHandle> {
        if let Some(texture) = self.textures.get(&page) {
            return Some(texture.clone());
        }

        let image = images.get(page)?;
        let decoded = match image::load_from_memory(image.jpeg_bytes()) {
            Ok(decoded) => decoded.to_rgba8(),
            Err(err) => {
                log::warn!("failed to decode page {page} for display: {err}");
                return None;
            }
        };

        let size = [decoded.width() as usize, decoded.height() as usize];
        let color_image = egui::ColorImage::from_rgba_unmultiplied(size, decoded.as_raw());
        let texture = ctx.load_texture(
            format!("page_{page}"),
            color_image,
            egui::TextureOptions::LINEAR,
        );
        self.textures.insert(page, texture.clone());
        Some(texture)
    }
}

fn slot_rect(book_rect: egui::Rect, slot: Slot) -> egui::Rect {
    match slot {
        Slot::Full => book_rect,
        Slot::Left => {
            egui::Rect::from_min_max(book_rect.min, egui::pos2(book_rect.center().x, book_rect.max.y))
        }
        Slot::Right => {
            egui::Rect::from_min_max(egui::pos2(book_rect.center().x, book_rect.min.y), book_rect.max)
        }
    }
}

/// Fit the page into its slot preserving aspect ratio. Left pages hug the
/// spine from the left, right pages from the right, so a pair reads as
/// one open book.
fn paint_page(
    painter: &egui::Painter,
    slot_rect: egui::Rect,
    texture: &egui::TextureHandle,
    slot: Slot,
    tint: egui::Color32,
) {
    let texture_size = texture.size_vec2();
    if texture_size.x <= 0.0 || texture_size.y <= 0.0 {
        return;
    }

    let scale =
        (slot_rect.width() / texture_size.x).min(slot_rect.height() / texture_size.y).min(1.0);
    let size = texture_size * scale;

    let center_y = slot_rect.center().y;
    let page_rect = match slot {
        Slot::Full => egui::Rect::from_center_size(slot_rect.center(), size),
        Slot::Left => egui::Rect::from_center_size(
            egui::pos2(slot_rect.max.x - size.x / 2.0, center_y),
            size,
        ),
        Slot::Right => egui::Rect::from_center_size(
            egui::pos2(slot_rect.min.x + size.x / 2.0, center_y),
            size,
        ),
    };

    let uv = egui::Rect::from_min_max(egui::pos2(0.0, 0.0), egui::pos2(1.0, 1.0));
    painter.image(texture.id(), page_rect, uv, tint);
}
