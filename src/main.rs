#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")]

use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver};
use std::time::{Duration, Instant};

use clap::Parser;
use eframe::egui;
use egui_commonmark::{CommonMarkCache, CommonMarkViewer};
use notify::RecommendedWatcher;
use notify_debouncer_mini::{new_debouncer, DebouncedEventKind, Debouncer};
use serde::{Deserialize, Serialize};

use mdnav::container::{ScrollAnimation, ScrollBehavior, ScrollContainer, ScrollState};
use mdnav::config::{NavigationOverrides, SessionConfig};
use mdnav::document::{classify_link, load_document, resolve_local_link, LinkTarget};
use mdnav::render::{ElementId, SectionKind};
use mdnav::{DocumentView, NavigationConfig};

const APP_KEY: &str = "mdnav-state";
const MAX_WATCHER_RETRIES: u32 = 3;

/// Persisted state saved between sessions
#[derive(Serialize, Deserialize, Default)]
struct PersistedState {
    last_file: Option<PathBuf>,
    show_outline: Option<bool>,
    navigation: Option<NavigationConfig>,
}

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[derive(Parser, Debug)]
#[command(name = "mdnav")]
#[command(about = "A markdown viewer with heading navigation", long_about = None)]
struct Args {
    /// Markdown file to open
    file: Option<PathBuf>,

    /// Enable live reload (watch for file changes)
    #[arg(short, long)]
    watch: bool,

    /// Gap kept above a heading after jumping to it
    #[arg(long)]
    scroll_margin: Option<f32>,

    /// How far below the top a heading still counts as the current one
    #[arg(long)]
    active_offset: Option<f32>,
}

fn main() -> eframe::Result<()> {
    env_logger::init();

    let args = Args::parse();

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([900.0, 700.0])
            .with_min_inner_size([400.0, 300.0])
            .with_title("mdnav"),
        ..Default::default()
    };

    eframe::run_native(
        "mdnav",
        options,
        Box::new(move |cc| Ok(Box::new(NavigatorApp::new(cc, args)))),
    )
}

fn viewer() -> CommonMarkViewer<'static> {
    CommonMarkViewer::new()
        .max_image_width(Some(800))
        .indentation_spaces(2)
        .show_alt_text_on_hover(true)
        .syntax_theme_dark("base16-ocean.dark")
        .syntax_theme_light("base16-ocean.light")
        .line_height(1.5)
        .paragraph_spacing(1.5)
        .heading_spacing_above(2.0)
        .heading_spacing_below(0.5)
}

/// A document shown in its own scroll area with its own navigation state.
struct DocumentPane {
    id_salt: &'static str,
    view: DocumentView,
    scroll: ScrollState,
    cache: CommonMarkCache,
    animation: Option<ScrollAnimation>,
    // Destinations registered as link hooks: fragments and local markdown files.
    hooked: Vec<String>,
}

impl DocumentPane {
    fn new(id_salt: &'static str, config: NavigationConfig) -> Self {
        Self {
            id_salt,
            view: DocumentView::new(config),
            scroll: ScrollState::new(),
            cache: CommonMarkCache::default(),
            animation: None,
            hooked: Vec::new(),
        }
    }

    fn load(&mut self, source: &str, now: Instant) {
        self.view.load(source, now);
        self.scroll.clear_layout();
        self.animation = None;

        self.cache = CommonMarkCache::default();
        self.hooked.clear();
        for link in &self.view.rendered().links {
            let handled = matches!(
                classify_link(&link.href),
                LinkTarget::Fragment(_) | LinkTarget::LocalFile { .. }
            );
            if handled && !self.hooked.contains(&link.href) {
                self.hooked.push(link.href.clone());
            }
        }
        for href in &self.hooked {
            self.cache.add_link_hook(href);
        }
    }

    fn unmount(&mut self) {
        self.view.unmount();
        self.scroll.clear_layout();
        self.animation = None;
    }

    /// Offset to force on the scroll area this frame, if any.
    fn forced_offset(&mut self, now: Instant) -> Option<f32> {
        if let Some(request) = self.scroll.take_request() {
            match request.behavior {
                ScrollBehavior::Instant => {
                    self.animation = None;
                    return Some(request.offset);
                }
                ScrollBehavior::Smooth => {
                    self.animation = Some(ScrollAnimation::new(
                        self.scroll.scroll_offset(),
                        request.offset,
                        now,
                        self.view.config().smooth_scroll(),
                    ));
                }
            }
        }

        let animation = self.animation?;
        if animation.is_finished(now) {
            self.animation = None;
            Some(animation.target())
        } else {
            Some(animation.sample(now))
        }
    }

    /// Draw the document. Returns the destination of a clicked link to another
    /// markdown file, which the app opens.
    fn show(&mut self, ui: &mut egui::Ui, source: &str, now: Instant) -> Option<String> {
        let mut area = egui::ScrollArea::vertical()
            .id_salt(self.id_salt)
            .auto_shrink([false, false])
            .scroll_source(egui::scroll_area::ScrollSource::SCROLL_BAR | egui::scroll_area::ScrollSource::MOUSE_WHEEL);
        if let Some(offset) = self.forced_offset(now) {
            area = area.vertical_scroll_offset(offset);
        }

        let Self {
            view,
            scroll,
            cache,
            hooked,
            ..
        } = self;
        let rendered = view.rendered();
        let mut clicked_links: Vec<(String, ElementId)> = Vec::new();
        let mut clicked_heading: Option<ElementId> = None;

        let output = area.show_viewport(ui, |ui, _viewport| {
            let origin = ui.max_rect().top();

            for (index, section) in rendered.sections.iter().enumerate() {
                let Some(text) = rendered.section_source(source, index) else {
                    continue;
                };

                // Everything in a section is measured at the section's top.
                let top = ui.cursor().top() - origin;
                for element in rendered.elements_in(index) {
                    scroll.set_element_top(element, top);
                }

                let response = ui.push_id(index, |ui| viewer().show(ui, cache, &text)).response;

                // Hooks are reset by every show, so read them section by section.
                for link in rendered.links_in(index) {
                    let already = clicked_links.iter().any(|(href, _)| *href == link.href);
                    if !already && hooked.contains(&link.href) && cache.get_link_hook(&link.href) == Some(true) {
                        clicked_links.push((link.href.clone(), link.element));
                    }
                }

                if let SectionKind::Heading(heading) = section.kind {
                    let heading_click = ui
                        .interact(response.rect, ui.id().with(("heading", index)), egui::Sense::click())
                        .on_hover_cursor(egui::CursorIcon::PointingHand);
                    if heading_click.clicked() {
                        clicked_heading = rendered.headings.get(heading).map(|h| h.element);
                    }
                }
            }
        });
        scroll.set_scroll_offset(output.state.offset.y);

        let mut open_file = None;
        for (href, link) in clicked_links {
            if !view.click_anchor(&href, link, now) {
                open_file = Some(href);
            }
        }
        if let Some(element) = clicked_heading {
            view.click_heading(element, scroll);
        }

        view.tick(now, scroll);
        view.on_scroll(scroll);

        let ctx = ui.ctx();
        if self.animation.is_some() || self.scroll.pending_request().is_some() {
            ctx.request_repaint();
        } else if let Some(deadline) = self.view.next_deadline() {
            ctx.request_repaint_after(deadline.saturating_duration_since(now));
        }
        open_file
    }

    fn click_toc(&mut self, id: &str) {
        self.view.click_toc(id, &mut self.scroll);
    }
}

struct NavigatorApp {
    content: String,
    current_file: Option<PathBuf>,
    config: SessionConfig,
    inline: DocumentPane,
    fullscreen: DocumentPane,
    is_fullscreen: bool,
    show_outline: bool,
    watch_enabled: bool,
    error_message: Option<String>,
    // File watcher state
    watcher: Option<Debouncer<RecommendedWatcher>>,
    watcher_rx: Option<Receiver<Result<Vec<notify_debouncer_mini::DebouncedEvent>, notify::Error>>>,
    watcher_retry_count: u32,
}

impl NavigatorApp {
    fn new(cc: &eframe::CreationContext<'_>, args: Args) -> Self {
        let persisted: PersistedState = cc
            .storage
            .and_then(|s| eframe::get_value(s, APP_KEY))
            .unwrap_or_default();

        // Command-line values apply to this run only and are never saved.
        let config = SessionConfig::new(
            persisted.navigation.unwrap_or_default(),
            NavigationOverrides {
                scroll_margin: args.scroll_margin,
                active_offset: args.active_offset,
            },
        );

        let mut app = Self {
            content: SAMPLE_MARKDOWN.to_string(),
            current_file: None,
            inline: DocumentPane::new("inline_document", config.effective()),
            fullscreen: DocumentPane::new("fullscreen_document", config.effective()),
            config,
            is_fullscreen: false,
            show_outline: persisted.show_outline.unwrap_or(true),
            watch_enabled: args.watch,
            error_message: None,
            watcher: None,
            watcher_rx: None,
            watcher_retry_count: 0,
        };
        app.inline.load(SAMPLE_MARKDOWN, Instant::now());

        // CLI argument takes priority, then the last opened file
        if let Some(path) = args.file.or(persisted.last_file) {
            app.load_file(&path);
        }

        app
    }

    fn load_file(&mut self, path: &Path) {
        let was_watching = self.watcher.is_some();
        self.stop_watching();

        match load_document(path) {
            Ok(document) => {
                self.content = document.content;
                self.current_file = Some(document.path);
                self.error_message = document
                    .had_invalid_utf8
                    .then(|| "Warning: File contains invalid UTF-8 characters (replaced with \u{FFFD})".to_string());
                self.reload_views();

                if was_watching || self.watch_enabled {
                    self.start_watching();
                }
            }
            Err(e) => {
                log::error!("{e}");
                self.error_message = Some(e.to_string());
            }
        }
    }

    /// Full re-extract and re-bind in every mounted view.
    fn reload_views(&mut self) {
        let now = Instant::now();
        self.inline.load(&self.content, now);
        if self.is_fullscreen {
            self.fullscreen.load(&self.content, now);
        }
    }

    fn open_file_dialog(&mut self) {
        if let Some(path) = rfd::FileDialog::new()
            .add_filter("Markdown", &["md", "markdown"])
            .add_filter("Text", &["txt"])
            .add_filter("All Files", &["*"])
            .pick_file()
        {
            self.load_file(&path);
        }
    }

    fn window_title(&self) -> String {
        match &self.current_file {
            Some(path) => {
                let filename = path
                    .file_name()
                    .map(|n| n.to_string_lossy().to_string())
                    .unwrap_or_else(|| "Unknown".to_string());
                format!("{filename} - mdnav")
            }
            None => "mdnav".to_string(),
        }
    }

    fn set_fullscreen(&mut self, ctx: &egui::Context, fullscreen: bool) {
        if self.is_fullscreen == fullscreen {
            return;
        }
        self.is_fullscreen = fullscreen;
        if fullscreen {
            self.fullscreen.load(&self.content, Instant::now());
        } else {
            self.fullscreen.unmount();
        }
        ctx.send_viewport_cmd(egui::ViewportCommand::Fullscreen(fullscreen));
    }

    fn set_config(&mut self, config: NavigationConfig) {
        self.config.set(config);
        let effective = self.config.effective();
        self.inline.view.set_config(effective.clone());
        self.fullscreen.view.set_config(effective);
    }

    /// Open a clicked link to another markdown file, then go to its fragment.
    fn open_local_link(&mut self, href: &str) {
        let LinkTarget::LocalFile { path, fragment } = classify_link(href) else {
            return;
        };
        let Some(current) = self.current_file.clone() else {
            log::warn!("Cannot follow {href}: no file loaded");
            return;
        };

        match resolve_local_link(&current, path) {
            Ok(target) => {
                log::info!("Following link to {:?}", target);
                self.load_file(&target);
                if let Some(fragment) = fragment {
                    self.visible_pane().view.jump_to(fragment, Instant::now());
                }
            }
            Err(e) => {
                log::error!("{e}");
                self.error_message = Some(format!("Cannot follow '{href}': {e}"));
            }
        }
    }

    fn visible_pane(&mut self) -> &mut DocumentPane {
        if self.is_fullscreen {
            &mut self.fullscreen
        } else {
            &mut self.inline
        }
    }

    fn start_watching(&mut self) {
        self.stop_watching();

        let Some(file_path) = &self.current_file else {
            log::warn!("Cannot start watching: no file loaded");
            return;
        };

        let (tx, rx) = mpsc::channel();

        match new_debouncer(Duration::from_millis(200), tx) {
            Ok(mut debouncer) => {
                if let Err(e) = debouncer
                    .watcher()
                    .watch(file_path, notify::RecursiveMode::NonRecursive)
                {
                    log::error!("Failed to watch file {:?}: {}", file_path, e);
                    self.error_message = Some(format!("Failed to watch file: {e}"));
                    return;
                }

                log::info!("Started watching file: {:?}", file_path);
                self.watcher = Some(debouncer);
                self.watcher_rx = Some(rx);
                self.watch_enabled = true;
                self.watcher_retry_count = 0;
            }
            Err(e) => {
                log::error!("Failed to create file watcher: {}", e);
                self.error_message = Some(format!("Failed to create file watcher: {e}"));
            }
        }
    }

    fn stop_watching(&mut self) {
        if self.watcher.is_some() {
            log::info!("Stopped watching file");
        }
        self.watcher = None;
        self.watcher_rx = None;
    }

    fn toggle_watch(&mut self) {
        if self.current_file.is_none() {
            return;
        }
        if self.watcher.is_some() {
            self.stop_watching();
            self.watch_enabled = false;
        } else {
            self.start_watching();
        }
    }

    fn check_file_changes(&mut self) -> bool {
        let Some(rx) = &self.watcher_rx else {
            if self.watch_enabled
                && self.current_file.is_some()
                && self.watcher_retry_count < MAX_WATCHER_RETRIES
            {
                log::info!(
                    "Attempting to recover file watcher (attempt {})",
                    self.watcher_retry_count + 1
                );
                self.watcher_retry_count += 1;
                self.start_watching();
            }
            return false;
        };

        let mut needs_reload = false;

        while let Ok(result) = rx.try_recv() {
            match result {
                Ok(events) => {
                    self.watcher_retry_count = 0;
                    for event in events {
                        if event.kind == DebouncedEventKind::Any {
                            log::debug!("File change detected: {:?}", event.path);
                            needs_reload = true;
                        }
                    }
                }
                Err(e) => {
                    log::error!("File watcher error: {}", e);
                    self.watcher = None;
                    self.watcher_rx = None;

                    if self.watcher_retry_count < MAX_WATCHER_RETRIES {
                        self.watcher_retry_count += 1;
                        log::info!("Attempting watcher recovery (attempt {})", self.watcher_retry_count);
                        self.start_watching();
                        self.error_message = Some(if self.watcher.is_some() {
                            "File watcher recovered after error".to_string()
                        } else {
                            format!("File watcher error (retry {}): {}", self.watcher_retry_count, e)
                        });
                    } else {
                        self.error_message = Some(format!(
                            "File watcher failed after {MAX_WATCHER_RETRIES} retries: {e}"
                        ));
                        self.watch_enabled = false;
                    }
                    return false;
                }
            }
        }

        needs_reload
    }

    fn reload_current_file(&mut self) {
        if let Some(path) = self.current_file.clone() {
            log::info!("Reloading file: {:?}", path);
            self.load_file(&path);
        }
    }

    fn outline_ui(&mut self, ctx: &egui::Context) {
        let pane = if self.is_fullscreen { &self.fullscreen } else { &self.inline };
        let toc = pane.view.toc();
        if toc.entries().is_empty() {
            return;
        }

        // Avoid accidental clicks while the panel is being resized
        let is_dragging = ctx.input(|i| i.pointer.any_down());
        let sidebar_title = pane.view.title().unwrap_or("Outline").to_string();
        let mut clicked: Option<String> = None;

        egui::SidePanel::left("outline")
            .resizable(true)
            .default_width(200.0)
            .min_width(120.0)
            .max_width(400.0)
            .show(ctx, |ui| {
                ui.add_space(4.0);
                ui.horizontal(|ui| {
                    ui.set_max_width(ui.available_width());
                    ui.add_space(6.0);
                    ui.add(egui::Label::new(egui::RichText::new(&sidebar_title).heading()).truncate());
                });
                ui.separator();
                egui::ScrollArea::vertical()
                    .id_salt("outline_entries")
                    .scroll_bar_visibility(egui::scroll_area::ScrollBarVisibility::AlwaysHidden)
                    .show(ui, |ui| {
                        for entry in toc.entries() {
                            let indent = entry.level.saturating_sub(1) as usize * 2;
                            let label = format!("{}{}", " ".repeat(indent), entry.text);
                            let response = ui.selectable_label(toc.is_active(&entry.id), label);
                            if !is_dragging && response.clicked() {
                                clicked = Some(entry.id.clone());
                            }
                        }
                    });
            });

        if let Some(id) = clicked {
            self.visible_pane().click_toc(&id);
            ctx.request_repaint();
        }
    }

    fn navigation_menu(&mut self, ui: &mut egui::Ui) {
        let current = self.config.effective();
        let mut config = current.clone();
        ui.horizontal(|ui| {
            ui.label("Scroll margin");
            ui.add(egui::DragValue::new(&mut config.scroll_margin).range(0.0..=400.0).suffix(" px"));
        });
        ui.horizontal(|ui| {
            ui.label("Active offset");
            ui.add(egui::DragValue::new(&mut config.active_offset).range(0.0..=1000.0).suffix(" px"));
        });
        if config != current {
            self.set_config(config);
        }
    }
}

impl eframe::App for NavigatorApp {
    fn save(&mut self, storage: &mut dyn eframe::Storage) {
        let state = PersistedState {
            last_file: self.current_file.clone(),
            show_outline: Some(self.show_outline),
            navigation: Some(self.config.stored().clone()),
        };
        eframe::set_value(storage, APP_KEY, &state);
    }

    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        if self.check_file_changes() {
            self.reload_current_file();
        }

        if self.watcher.is_some() {
            ctx.request_repaint_after(Duration::from_millis(100));
        }

        ctx.send_viewport_cmd(egui::ViewportCommand::Title(self.window_title()));

        let mut open_dialog = false;
        let mut toggle_watch = false;
        let mut toggle_outline = false;
        let mut toggle_fullscreen = false;
        let mut leave_fullscreen = false;
        let mut quit_app = false;

        ctx.input(|i| {
            if i.modifiers.ctrl && !i.modifiers.shift && i.key_pressed(egui::Key::O) {
                open_dialog = true;
            }
            if i.modifiers.ctrl && i.modifiers.shift && i.key_pressed(egui::Key::O) {
                toggle_outline = true;
            }
            if i.modifiers.ctrl && i.key_pressed(egui::Key::W) {
                toggle_watch = true;
            }
            if i.key_pressed(egui::Key::F11) {
                toggle_fullscreen = true;
            }
            if i.key_pressed(egui::Key::Escape) {
                leave_fullscreen = true;
            }
            if i.modifiers.ctrl && i.key_pressed(egui::Key::Q) {
                quit_app = true;
            }
        });

        if open_dialog {
            self.open_file_dialog();
        }
        if toggle_watch {
            self.toggle_watch();
        }
        if toggle_outline {
            self.show_outline = !self.show_outline;
        }
        if toggle_fullscreen {
            self.set_fullscreen(ctx, !self.is_fullscreen);
        } else if leave_fullscreen {
            self.set_fullscreen(ctx, false);
        }
        if quit_app {
            ctx.send_viewport_cmd(egui::ViewportCommand::Close);
        }

        if !self.is_fullscreen {
            egui::TopBottomPanel::top("menu_bar").show(ctx, |ui| {
                egui::MenuBar::new().ui(ui, |ui| {
                    ui.menu_button("File", |ui| {
                        if ui.add(egui::Button::new("Open...").shortcut_text("Ctrl+O")).clicked() {
                            self.open_file_dialog();
                            ui.close();
                        }

                        ui.separator();

                        let is_watching = self.watcher.is_some();
                        let watch_text = if is_watching { "✓ Watch File" } else { "Watch File" };
                        if ui
                            .add_enabled(
                                self.current_file.is_some(),
                                egui::Button::new(watch_text).shortcut_text("Ctrl+W"),
                            )
                            .clicked()
                        {
                            self.toggle_watch();
                            ui.close();
                        }

                        ui.separator();

                        if ui.add(egui::Button::new("Quit").shortcut_text("Ctrl+Q")).clicked() {
                            ctx.send_viewport_cmd(egui::ViewportCommand::Close);
                            ui.close();
                        }
                    });

                    ui.menu_button("View", |ui| {
                        let outline_text = if self.show_outline { "✓ Show Outline" } else { "Show Outline" };
                        if ui
                            .add(egui::Button::new(outline_text).shortcut_text("Ctrl+Shift+O"))
                            .clicked()
                        {
                            self.show_outline = !self.show_outline;
                            ui.close();
                        }

                        if ui.add(egui::Button::new("Fullscreen").shortcut_text("F11")).clicked() {
                            self.set_fullscreen(ctx, true);
                            ui.close();
                        }

                        ui.separator();
                        ui.menu_button("Navigation", |ui| self.navigation_menu(ui));
                    });

                    ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                        if self.watcher.is_some() {
                            ui.label(egui::RichText::new("● LIVE").color(egui::Color32::from_rgb(100, 200, 100)));
                            ui.separator();
                        }

                        if let Some(path) = &self.current_file {
                            ui.label(
                                egui::RichText::new(path.display().to_string())
                                    .small()
                                    .color(ui.visuals().weak_text_color()),
                            );
                        }
                    });
                });
            });
        }

        if self.show_outline {
            self.outline_ui(ctx);
        }

        let now = Instant::now();
        let mut clear_error = false;
        let followed_link = egui::CentralPanel::default().show(ctx, |ui| {
            if let Some(error) = &self.error_message {
                ui.horizontal(|ui| {
                    ui.label(egui::RichText::new("⚠").color(egui::Color32::from_rgb(255, 200, 100)));
                    ui.label(egui::RichText::new(error).color(egui::Color32::from_rgb(255, 200, 100)));
                    if ui.small_button("✕").clicked() {
                        clear_error = true;
                    }
                });
                ui.separator();
            }

            let pane = if self.is_fullscreen {
                &mut self.fullscreen
            } else {
                &mut self.inline
            };
            pane.show(ui, &self.content, now)
        })
        .inner;
        if clear_error {
            self.error_message = None;
        }
        if let Some(href) = followed_link {
            self.open_local_link(&href);
        }
    }
}

const SAMPLE_MARKDOWN: &str = r#"# mdnav

Open a markdown file with **Ctrl+O**. Every heading gets a stable id, so
links like [Usage](#usage) jump to the right place even when titles repeat.

## Chapter One

### Overview

The first overview. This [overview link](#overview) goes to the overview of
this chapter, the one right above is skipped because it is not below the link.

### Overview

Second overview, id `overview-1`.

## Chapter Two

See the [second chapter's details](#details).

### Details

Clicking a heading scrolls it to the top.

## Usage

- **F11** toggles the fullscreen view, **Escape** leaves it
- **Ctrl+W** watches the file for changes
- **Ctrl+Shift+O** toggles the outline
"#;
