//! Leafthrough - flipbook PDF viewer
//!
//! eframe shell: a toolbar for opening documents and navigating, a status
//! bar with load progress, and a central stage where the flip book lives.

use eframe::egui;
use leafthrough_engine::DocumentSource;
use leafthrough_flip::ViewerSession;
use leafthrough_raster::{target_page_width, PageImage};
use std::sync::Arc;
use std::time::{Duration, Instant};

mod book_view;
mod load;

use book_view::{BookView, NavRequest};
use load::{LoadEvent, LoadTask};

/// How long "Loaded N page(s)." lingers before the status clears.
const STATUS_CLEAR_DELAY: Duration = Duration::from_millis(600);

fn main() -> eframe::Result {
    let _ = simplelog::TermLogger::init(
        simplelog::LevelFilter::Info,
        simplelog::Config::default(),
        simplelog::TerminalMode::Mixed,
        simplelog::ColorChoice::Auto,
    );

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1200.0, 800.0])
            .with_min_inner_size([800.0, 600.0])
            .with_title("Leafthrough"),
        ..Default::default()
    };

    eframe::run_native(
        "Leafthrough",
        options,
        Box::new(|_cc| Ok(Box::new(LeafthroughApp::new()))),
    )
}

struct ErrorDialogState {
    title: String,
    message: String,
}

struct LeafthroughApp {
    session: ViewerSession<PageImage>,
    book_view: BookView,

    // In-flight load, if any. Starting a new one cancels it.
    load: Option<LoadTask>,

    // Toolbar state
    pdf_url: String,

    // Status bar
    progress: f32,
    status: String,
    status_clear_at: Option<Instant>,

    error_dialog: Option<ErrorDialogState>,

    // Central stage, measured each frame; the size the current book was
    // fitted to is kept separately so resizes trigger a refit.
    stage_size: egui::Vec2,
    presented_size: egui::Vec2,
}

impl LeafthroughApp {
    fn new() -> Self {
        Self {
            session: ViewerSession::new(),
            book_view: BookView::new(),
            load: None,
            pdf_url: String::new(),
            progress: 0.0,
            status: String::new(),
            status_clear_at: None,
            error_dialog: None,
            stage_size: egui::vec2(1200.0, 700.0),
            presented_size: egui::Vec2::ZERO,
        }
    }

    fn set_loading(&mut self, progress: f32, status: String) {
        self.progress = progress;
        self.status = status;
        self.status_clear_at = None;
    }

    fn start_load(&mut self, source: DocumentSource, ctx: &egui::Context) {
        // A newer load supersedes any in-flight one.
        if let Some(previous) = self.load.take() {
            previous.cancel();
        }

        let target = target_page_width(self.stage_size.x.max(1.0));
        self.load = Some(LoadTask::spawn(source, target, Some(ctx.clone())));
    }

    fn poll_load(&mut self) {
        let Some(task) = &self.load else { return };

        let events: Vec<LoadEvent> = std::iter::from_fn(|| task.try_next()).collect();
        let mut done = false;

        for event in events {
            match event {
                LoadEvent::Progress(update) => {
                    self.progress = update.fraction;
                    self.status = update.message;
                }
                LoadEvent::Finished(images) => {
                    let count = images.len();
                    self.book_view.reset();
                    self.session.present(
                        Arc::new(images),
                        self.stage_size.x,
                        self.stage_size.y,
                    );
                    self.presented_size = self.stage_size;
                    self.set_loading(1.0, format!("Loaded {count} page(s)."));
                    self.status_clear_at = Some(Instant::now() + STATUS_CLEAR_DELAY);
                    done = true;
                }
                LoadEvent::Failed(message) => {
                    self.error_dialog = Some(ErrorDialogState {
                        title: "Failed to load PDF".to_string(),
                        message,
                    });
                    self.set_loading(0.0, String::new());
                    done = true;
                }
            }
        }

        if done {
            self.load = None;
        }
    }

    fn tick_status(&mut self, ctx: &egui::Context) {
        let Some(clear_at) = self.status_clear_at else { return };

        let now = Instant::now();
        if now >= clear_at {
            self.status_clear_at = None;
            self.progress = 0.0;
            self.status.clear();
        } else {
            ctx.request_repaint_after(clear_at - now);
        }
    }

    fn handle_keyboard(&mut self, ctx: &egui::Context) {
        // Arrow keys belong to the text field while it has focus.
        if ctx.wants_keyboard_input() {
            return;
        }

        let (prev, next) = ctx.input(|i| {
            (i.key_pressed(egui::Key::ArrowLeft), i.key_pressed(egui::Key::ArrowRight))
        });

        if prev {
            self.session.prev();
        }
        if next {
            self.session.next();
        }
    }

    fn open_file(&mut self, ctx: &egui::Context) {
        let Some(path) = rfd::FileDialog::new().add_filter("PDF", &["pdf"]).pick_file() else {
            return;
        };

        let name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "document.pdf".to_string());

        match std::fs::read(&path) {
            Ok(bytes) => {
                self.set_loading(0.05, format!("Reading {name}…"));
                self.start_load(DocumentSource::Bytes(bytes), ctx);
            }
            Err(err) => {
                self.error_dialog = Some(ErrorDialogState {
                    title: "Failed to open file".to_string(),
                    message: format!("Could not read {}: {err}", path.display()),
                });
            }
        }
    }

    fn load_url(&mut self, ctx: &egui::Context) {
        let url = self.pdf_url.trim().to_string();
        if url.is_empty() {
            self.error_dialog = Some(ErrorDialogState {
                title: "No URL".to_string(),
                message: "Paste a direct link to a PDF first.".to_string(),
            });
            return;
        }

        self.set_loading(0.05, "Fetching PDF…".to_string());
        self.start_load(DocumentSource::url(url), ctx);
    }

    fn toggle_fullscreen(&mut self, ctx: &egui::Context) {
        let fullscreen = ctx.input(|i| i.viewport().fullscreen);
        match fullscreen {
            Some(active) => {
                ctx.send_viewport_cmd(egui::ViewportCommand::Fullscreen(!active));
            }
            None => log::warn!("fullscreen state unavailable on this platform"),
        }
    }

    fn draw_toolbar(&mut self, ctx: &egui::Context) {
        egui::TopBottomPanel::top("toolbar").show(ctx, |ui| {
            ui.horizontal(|ui| {
                ui.add_space(8.0);

                if ui.button("📂 Open PDF…").clicked() {
                    self.open_file(ctx);
                }

                ui.separator();

                let url_edit = egui::TextEdit::singleline(&mut self.pdf_url)
                    .hint_text("https://example.com/book.pdf")
                    .desired_width(260.0);
                let response = ui.add(url_edit);
                let submitted =
                    response.lost_focus() && ui.input(|i| i.key_pressed(egui::Key::Enter));

                if ui.button("Load").clicked() || submitted {
                    self.load_url(ctx);
                }

                ui.separator();

                ui.add_enabled_ui(self.session.is_active(), |ui| {
                    if ui.button("◀").clicked() {
                        self.session.prev();
                    }

                    let label = self.session.page_label();
                    ui.label(if label.is_empty() { "— / —".to_string() } else { label });

                    if ui.button("▶").clicked() {
                        self.session.next();
                    }
                });

                ui.separator();

                if ui.button("⛶ Fullscreen").clicked() {
                    self.toggle_fullscreen(ctx);
                }
            });
        });
    }

    fn draw_status_bar(&mut self, ctx: &egui::Context) {
        egui::TopBottomPanel::bottom("status").show(ctx, |ui| {
            ui.horizontal(|ui| {
                if self.progress > 0.0 {
                    ui.add(
                        egui::ProgressBar::new(self.progress)
                            .desired_width(180.0)
                            .show_percentage(),
                    );
                }
                if !self.status.is_empty() {
                    ui.label(&self.status);
                }
            });
        });
    }

    fn draw_stage(&mut self, ctx: &egui::Context) {
        let mut nav: Option<NavRequest> = None;

        egui::CentralPanel::default().show(ctx, |ui| {
            self.stage_size = ui.available_size();

            if !self.session.is_active() {
                ui.centered_and_justified(|ui| {
                    ui.heading("Open a PDF to start reading");
                });
                return;
            }

            // Rebuild from the already rendered pages when the stage
            // size changes; the reading position is restored.
            if (self.stage_size - self.presented_size).length() > 1.0 {
                self.session.refit(self.stage_size.x, self.stage_size.y);
                self.presented_size = self.stage_size;
            }

            if let (Some(book), Some(images)) = (self.session.book(), self.session.images()) {
                let images = Arc::clone(images);
                nav = self.book_view.show(ui, book, &images);
            }
        });

        match nav {
            Some(NavRequest::Prev) => self.session.prev(),
            Some(NavRequest::Next) => self.session.next(),
            None => {}
        }
    }

    fn draw_error_dialog(&mut self, ctx: &egui::Context) {
        let Some(dialog) = &self.error_dialog else { return };

        let title = format!("❌ {}", dialog.title);
        let message = dialog.message.clone();

        let mut should_close = false;
        egui::Window::new(title)
            .collapsible(false)
            .resizable(false)
            .anchor(egui::Align2::CENTER_CENTER, [0.0, 0.0])
            .show(ctx, |ui| {
                ui.label(message);
                ui.add_space(8.0);
                if ui.button("OK").clicked() {
                    should_close = true;
                }
            });

        if should_close || ctx.input(|i| i.key_pressed(egui::Key::Escape)) {
            self.error_dialog = None;
        }
    }
}

impl eframe::App for LeafthroughApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.poll_load();
        self.tick_status(ctx);
        self.handle_keyboard(ctx);
        self.draw_toolbar(ctx);
        self.draw_status_bar(ctx);
        self.draw_error_dialog(ctx);
        self.draw_stage(ctx);
    }
}
