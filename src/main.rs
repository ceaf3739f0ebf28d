mod art;
mod config;
mod player;
mod poller;
mod theme;

use std::{
    fs,
    path::Path,
    sync::mpsc::{self, Receiver, Sender, TryRecvError},
    thread,
    time::{Duration, Instant},
};

use eframe::egui::{self, CornerRadius, RichText, TextureHandle, TextureOptions, ViewportBuilder};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::{
    art::{ArtCache, ArtUpdate, HttpArtFetcher},
    config::Config,
    player::{PlayerClient, PollError, TransportCommand},
    poller::{poll_once, TrackUpdate, IDLE_SONG_TEXT, IDLE_TIME_TEXT},
    theme::WidgetTheme,
};

const ART_BOX_SIZE: f32 = 200.0;
const ASCII_FALLBACK: &str = "TARDIS ASCII not found";
const ASCII_FONT_SIZE: f32 = 8.0;
const SONG_FONT_SIZE: f32 = 10.0;
const TRANSPORT_BUTTON_WIDTH: f32 = 96.0;
const TRANSPORT_BUTTON_HEIGHT: f32 = 36.0;
const TRANSPORT_SPACING_X: f32 = 12.0;
const REFRESH_TIMEOUT: Duration = Duration::from_secs(5);
const REPAINT_INTERVAL: Duration = Duration::from_millis(200);

type TickResult = Result<TrackUpdate, PollError>;

enum WorkerCommand {
    Refresh,
    Transport(TransportCommand),
    Shutdown,
}

/// Spawns the thread that owns everything blocking: the `playerctl` client
/// and the art cache. The UI thread only ever touches the channels.
fn spawn_poll_worker(config: &Config) -> (Sender<WorkerCommand>, Receiver<TickResult>) {
    let (result_tx, result_rx) = mpsc::channel();
    let (command_tx, command_rx) = mpsc::channel();

    let client = PlayerClient::new(config.player.target.clone());
    let cache_path = config.art.cache_path.clone();
    let http_timeout = config.art.http_timeout;

    thread::spawn(move || {
        let mut cache = ArtCache::new(cache_path);
        let fetcher = match HttpArtFetcher::new(http_timeout) {
            Ok(fetcher) => fetcher,
            Err(err) => {
                error!(error = %err, "failed to build art fetcher; poll worker exiting");
                return;
            }
        };

        while let Ok(command) = command_rx.recv() {
            match command {
                WorkerCommand::Refresh => {
                    let res = poll_once(&client, &mut cache, &fetcher);
                    if result_tx.send(res).is_err() {
                        break;
                    }
                }
                WorkerCommand::Transport(cmd) => client.transport(cmd),
                WorkerCommand::Shutdown => break,
            }
        }
    });

    (command_tx, result_rx)
}

fn load_ascii_panel(path: &Path) -> String {
    match fs::read_to_string(path) {
        Ok(text) => text,
        Err(err) => {
            warn!(path = %path.display(), error = %err, "decorative panel asset unavailable");
            ASCII_FALLBACK.to_string()
        }
    }
}

struct App {
    config: Config,
    theme: Option<WidgetTheme>,
    ascii_panel: String,
    song_text: String,
    progress_percent: f64,
    time_text: String,
    art_texture: Option<TextureHandle>,
    command_tx: Option<Sender<WorkerCommand>>,
    result_rx: Option<Receiver<TickResult>>,
    refresh_inflight: bool,
    last_refresh_request: Option<Instant>,
    last_tick: Instant,
}

impl App {
    fn new(config: Config) -> Self {
        let ascii_panel = load_ascii_panel(&config.panel.ascii_path);
        let (command_tx, result_rx) = spawn_poll_worker(&config);

        let mut app = Self {
            config,
            theme: None,
            ascii_panel,
            song_text: "Loading song...".to_string(),
            progress_percent: 0.0,
            time_text: IDLE_TIME_TEXT.to_string(),
            art_texture: None,
            command_tx: Some(command_tx),
            result_rx: Some(result_rx),
            refresh_inflight: false,
            last_refresh_request: None,
            last_tick: Instant::now(),
        };
        app.request_refresh();
        app
    }

    fn request_refresh(&mut self) {
        let Some(tx) = self.command_tx.as_ref() else {
            return;
        };
        match tx.send(WorkerCommand::Refresh) {
            Ok(()) => {
                self.refresh_inflight = true;
                self.last_refresh_request = Some(Instant::now());
            }
            Err(_) => {
                self.command_tx = None;
            }
        }
    }

    fn maybe_request_refresh(&mut self) {
        let now = Instant::now();

        if self.refresh_inflight {
            match self.last_refresh_request {
                Some(sent_at) if now.duration_since(sent_at) > REFRESH_TIMEOUT => {
                    self.refresh_inflight = false;
                    self.last_refresh_request = None;
                }
                Some(_) => return,
                None => self.refresh_inflight = false,
            }
        }

        if now.duration_since(self.last_tick) < self.config.player.poll_interval {
            return;
        }

        self.request_refresh();
    }

    fn drain_tick_results(&mut self, ctx: &egui::Context) {
        let mut results = Vec::new();
        if let Some(rx) = self.result_rx.as_mut() {
            loop {
                match rx.try_recv() {
                    Ok(res) => results.push(res),
                    Err(TryRecvError::Empty) => break,
                    Err(TryRecvError::Disconnected) => {
                        self.result_rx = None;
                        self.command_tx = None;
                        self.refresh_inflight = false;
                        self.last_refresh_request = None;
                        break;
                    }
                }
            }
        }

        for res in results {
            self.refresh_inflight = false;
            self.last_refresh_request = None;
            self.last_tick = Instant::now();
            match res {
                Ok(update) => self.apply_update(ctx, update),
                Err(PollError::Unavailable) => self.apply_idle(),
                Err(err @ PollError::Malformed { .. }) => {
                    warn!(error = %err, "skipping tick with malformed player output");
                }
            }
        }
    }

    fn apply_update(&mut self, ctx: &egui::Context, update: TrackUpdate) {
        self.song_text = update.song_text;
        if let Some(percent) = update.progress_percent {
            self.progress_percent = percent;
        }
        self.time_text = update.time_text;
        if let ArtUpdate::Image(image) = update.art {
            self.art_texture = Some(ctx.load_texture("album_art", image, TextureOptions::LINEAR));
        }
    }

    fn apply_idle(&mut self) {
        self.song_text = IDLE_SONG_TEXT.to_string();
        self.progress_percent = 0.0;
        self.time_text = IDLE_TIME_TEXT.to_string();
        self.art_texture = None;
    }

    fn send_transport(&mut self, command: TransportCommand) {
        let Some(tx) = self.command_tx.as_ref() else {
            return;
        };
        if tx.send(WorkerCommand::Transport(command)).is_err() {
            self.command_tx = None;
        }
    }

    fn render_art_box(&self, ui: &mut egui::Ui) {
        let (rect, _) = ui.allocate_exact_size(
            egui::vec2(ART_BOX_SIZE, ART_BOX_SIZE),
            egui::Sense::hover(),
        );
        ui.painter()
            .rect_filled(rect, CornerRadius::same(0), egui::Color32::BLACK);

        if let Some(texture) = &self.art_texture {
            let tex_size = texture.size_vec2();
            if tex_size.x > 0.0 && tex_size.y > 0.0 {
                let scale = (ART_BOX_SIZE / tex_size.x).min(ART_BOX_SIZE / tex_size.y);
                let size = tex_size * scale;
                let image_rect = egui::Rect::from_center_size(rect.center(), size);
                let image_widget =
                    egui::Image::new((texture.id(), size)).fit_to_exact_size(size);
                ui.put(image_rect, image_widget);
            }
        }
    }

    fn render_transport_row(&mut self, ui: &mut egui::Ui) {
        let button_size = egui::vec2(TRANSPORT_BUTTON_WIDTH, TRANSPORT_BUTTON_HEIGHT);
        let row_width = 3.0 * button_size.x + 2.0 * TRANSPORT_SPACING_X;
        ui.allocate_ui_with_layout(
            egui::vec2(row_width, button_size.y),
            egui::Layout::left_to_right(egui::Align::Center),
            |row| {
                row.spacing_mut().item_spacing.x = TRANSPORT_SPACING_X;
                for (glyph, hint, command) in [
                    ("⏮", "Previous track", TransportCommand::Previous),
                    ("⏯", "Play/Pause", TransportCommand::PlayPause),
                    ("⏭", "Next track", TransportCommand::Next),
                ] {
                    let clicked = row
                        .add_sized(
                            button_size,
                            egui::Button::new(RichText::new(glyph).size(16.0)),
                        )
                        .on_hover_text(hint)
                        .clicked();
                    if clicked {
                        self.send_transport(command);
                    }
                }
            },
        );
    }

    fn render_track_panel(&mut self, ui: &mut egui::Ui) {
        ui.vertical_centered(|ui| {
            ui.spacing_mut().item_spacing.y = 12.0;

            self.render_art_box(ui);
            ui.add(
                egui::Label::new(
                    RichText::new(&self.song_text)
                        .monospace()
                        .size(SONG_FONT_SIZE),
                )
                .wrap(),
            );

            let fraction = (self.progress_percent / 100.0).clamp(0.0, 1.0) as f32;
            ui.add(egui::ProgressBar::new(fraction).show_percentage());
            ui.label(&self.time_text);

            self.render_transport_row(ui);
        });
    }

    fn render_ascii_panel(&self, ui: &mut egui::Ui) {
        ui.label(
            RichText::new(&self.ascii_panel)
                .monospace()
                .size(ASCII_FONT_SIZE),
        );
    }
}

impl eframe::App for App {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        // The palette is resolved once, on the first frame; the derived
        // style is re-applied every frame after that.
        let theme = match self.theme {
            Some(theme) => theme,
            None => {
                let theme = WidgetTheme::resolve(&self.config.theme, ctx.theme());
                self.theme = Some(theme);
                theme
            }
        };
        ctx.style_mut(|style| theme.apply(style));

        self.drain_tick_results(ctx);

        egui::CentralPanel::default().show(ctx, |ui| {
            ui.horizontal(|ui| {
                self.render_ascii_panel(ui);
                self.render_track_panel(ui);
            });
        });

        self.maybe_request_refresh();
        ctx.request_repaint_after(REPAINT_INTERVAL);
    }
}

impl Drop for App {
    fn drop(&mut self) {
        if let Some(tx) = self.command_tx.take() {
            let _ = tx.send(WorkerCommand::Shutdown);
        }
    }
}

fn init_logging() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(env_filter).init();
}

fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    init_logging();

    let config = Config::load()?;
    info!(target = %config.player.target, "TARDIS Music Dashboard starting");

    let native_options = eframe::NativeOptions {
        viewport: ViewportBuilder::default()
            .with_inner_size([900.0, 500.0])
            .with_title("TARDIS Music Dashboard"),
        ..Default::default()
    };
    let run_res = eframe::run_native(
        "TARDIS Music Dashboard",
        native_options,
        Box::new(
            move |_cc| -> std::result::Result<
                Box<dyn eframe::App>,
                Box<dyn std::error::Error + Send + Sync>,
            > { Ok(Box::new(App::new(config))) },
        ),
    );
    if let Err(e) = run_res {
        return Err(Box::new(e));
    }

    Ok(())
}
