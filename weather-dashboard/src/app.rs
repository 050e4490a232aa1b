//! Presentation shell. Draws the current `ViewState` and forwards queries to the pipeline;
//! it never writes view state itself.

use eframe::egui::{
    self, Align2, Color32, ColorImage, RichText, TextEdit, TextureHandle, TextureOptions,
};
use std::{
    collections::HashMap,
    sync::{
        Arc,
        mpsc::{Receiver, Sender, channel},
    },
    time::Duration,
};
use tokio::{runtime::Handle, sync::watch};
use weather_core::{Bitmap, IconSet, Phase, QueryError, UiIcon, UpdatePipeline, ViewState};

const ICON_PX: f32 = 24.0;
const SECONDARY: Color32 = Color32::from_gray(153);

pub struct Startup {
    pub pipeline: Arc<UpdatePipeline>,
    pub view: watch::Receiver<ViewState>,
    pub icons: IconSet,
    pub default_city: String,
    pub runtime: Handle,
}

pub fn run(startup: Startup) -> anyhow::Result<()> {
    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_title("Weather Dashboard")
            .with_inner_size([650.0, 1050.0]),
        ..Default::default()
    };

    eframe::run_native(
        "Weather Dashboard",
        options,
        Box::new(move |cc| Ok(Box::new(DashboardApp::new(cc, startup)))),
    )
    .map_err(|e| anyhow::anyhow!("Failed to open dashboard window: {e}"))
}

struct Dialog {
    title: &'static str,
    message: String,
}

fn dialog_for(err: &QueryError) -> Option<Dialog> {
    err.is_dialog().then(|| Dialog { title: "Error", message: err.to_string() })
}

pub(crate) fn color_image(bitmap: &Bitmap) -> ColorImage {
    ColorImage::from_rgba_unmultiplied(
        [bitmap.width as usize, bitmap.height as usize],
        &bitmap.rgba,
    )
}

struct DashboardApp {
    pipeline: Arc<UpdatePipeline>,
    view: watch::Receiver<ViewState>,
    runtime: Handle,
    textures: HashMap<UiIcon, TextureHandle>,
    condition: Option<TextureHandle>,
    condition_revision: u64,
    input: String,
    prompt: Option<String>,
    dialog: Option<Dialog>,
    in_flight: bool,
    results_tx: Sender<Result<Phase, QueryError>>,
    results_rx: Receiver<Result<Phase, QueryError>>,
}

impl DashboardApp {
    fn new(cc: &eframe::CreationContext<'_>, startup: Startup) -> Self {
        cc.egui_ctx.set_visuals(egui::Visuals::dark());

        let textures = startup
            .icons
            .iter()
            .map(|(icon, bitmap)| {
                let name = icon.file_name();
                (icon, cc.egui_ctx.load_texture(name, color_image(bitmap), TextureOptions::LINEAR))
            })
            .collect();

        let (results_tx, results_rx) = channel();
        let mut app = Self {
            pipeline: startup.pipeline,
            view: startup.view,
            runtime: startup.runtime,
            textures,
            condition: None,
            condition_revision: 0,
            input: String::new(),
            prompt: None,
            dialog: None,
            in_flight: false,
            results_tx,
            results_rx,
        };
        app.submit(&cc.egui_ctx, startup.default_city);
        app
    }

    fn submit(&mut self, ctx: &egui::Context, city: String) {
        if self.in_flight {
            return;
        }
        self.in_flight = true;
        self.prompt = None;

        let pipeline = Arc::clone(&self.pipeline);
        let tx = self.results_tx.clone();
        let ctx = ctx.clone();
        self.runtime.spawn(async move {
            let result = pipeline.submit(&city).await;
            let _ = tx.send(result);
            ctx.request_repaint();
        });
    }

    fn drain_results(&mut self) {
        while let Ok(result) = self.results_rx.try_recv() {
            self.in_flight = false;
            let Err(err) = result else { continue };

            if err.clears_input() {
                self.input.clear();
            }
            match dialog_for(&err) {
                Some(dialog) => self.dialog = Some(dialog),
                None if matches!(err, QueryError::Validation) => self.prompt = Some(err.to_string()),
                None => {}
            }
        }
    }

    fn sync_condition_icon(&mut self, ctx: &egui::Context, view: &ViewState) {
        if view.revision == self.condition_revision {
            return;
        }
        self.condition_revision = view.revision;
        self.condition = view.condition_icon.as_ref().map(|bitmap| {
            ctx.load_texture("condition", color_image(bitmap), TextureOptions::LINEAR)
        });
    }

    fn icon(&self, ui: &mut egui::Ui, icon: UiIcon) {
        if let Some(texture) = self.textures.get(&icon) {
            ui.image((texture.id(), egui::vec2(ICON_PX, ICON_PX)));
        }
    }

    fn search_row(&mut self, ui: &mut egui::Ui) {
        let busy = self.in_flight || self.view.borrow().phase.is_busy();

        card(ui, |ui| {
            ui.horizontal(|ui| {
                let button_width = 52.0;
                let field = ui.add_enabled(
                    !busy,
                    TextEdit::singleline(&mut self.input)
                        .hint_text("Enter city name...")
                        .font(egui::FontId::proportional(16.0))
                        .desired_width(ui.available_width() - button_width),
                );
                let entered = field.lost_focus() && ui.input(|i| i.key_pressed(egui::Key::Enter));

                let button = match self.textures.get(&UiIcon::Search) {
                    Some(texture) => {
                        egui::Button::image((texture.id(), egui::vec2(ICON_PX, ICON_PX)))
                    }
                    None => egui::Button::new("Search"),
                };
                let clicked = ui.add_enabled(!busy, button.min_size(egui::vec2(45.0, 45.0))).clicked();

                if entered || clicked {
                    let city = self.input.clone();
                    self.submit(ui.ctx(), city);
                }
            });

            if let Some(prompt) = &self.prompt {
                ui.label(RichText::new(prompt).color(Color32::YELLOW));
            }
        });
    }

    fn weather_panels(&self, ui: &mut egui::Ui, view: &ViewState) {
        card(ui, |ui| {
            ui.horizontal(|ui| {
                self.icon(ui, UiIcon::MapPin);
                ui.label(RichText::new(&view.city).size(28.0).strong());
            });
            ui.horizontal(|ui| {
                self.icon(ui, UiIcon::Clock);
                ui.label(RichText::new(&view.local_time).size(16.0).color(SECONDARY));
            });
        });

        card(ui, |ui| {
            ui.vertical_centered(|ui| {
                ui.label(RichText::new(&view.temperature).size(64.0).strong());
                ui.horizontal(|ui| {
                    self.icon(ui, UiIcon::Thermometer);
                    ui.label(RichText::new(&view.feels_like).size(16.0).color(SECONDARY));
                });
                if let Some(texture) = &self.condition {
                    ui.image((texture.id(), texture.size_vec2()));
                }
                ui.label(RichText::new(&view.description).size(18.0));
            });
        });

        egui::Grid::new("details")
            .num_columns(2)
            .spacing([10.0, 10.0])
            .min_col_width((ui.available_width() - 10.0) / 2.0)
            .show(ui, |ui| {
                self.detail(ui, UiIcon::Humidity, "Humidity", &view.humidity);
                self.detail(ui, UiIcon::Wind, "Wind Speed", &view.wind_speed);
                ui.end_row();
                self.detail(ui, UiIcon::Leaf, "Air Quality", &view.air_quality);
                self.detail(ui, UiIcon::Pressure, "Pressure", &view.pressure);
                ui.end_row();
            });

        card(ui, |ui| {
            ui.columns(2, |cols| {
                self.sun(&mut cols[0], UiIcon::Sunrise, "Sunrise", &view.sunrise);
                self.sun(&mut cols[1], UiIcon::Sunset, "Sunset", &view.sunset);
            });
        });

        card(ui, |ui| {
            ui.vertical_centered(|ui| {
                let text = if view.phase == Phase::Recommending {
                    "Thinking about your day..."
                } else {
                    view.recommendation.as_str()
                };
                ui.add(egui::Label::new(RichText::new(text).size(14.0)).wrap());
            });
        });
    }

    fn detail(&self, ui: &mut egui::Ui, icon: UiIcon, title: &str, value: &str) {
        card(ui, |ui| {
            ui.vertical_centered(|ui| {
                ui.horizontal(|ui| {
                    self.icon(ui, icon);
                    ui.label(RichText::new(title).size(14.0));
                });
                ui.label(RichText::new(value).size(20.0).strong());
            });
        });
    }

    fn sun(&self, ui: &mut egui::Ui, icon: UiIcon, title: &str, value: &str) {
        ui.vertical_centered(|ui| {
            ui.horizontal(|ui| {
                self.icon(ui, icon);
                ui.label(RichText::new(title).size(14.0));
            });
            ui.label(RichText::new(value).size(16.0).strong());
        });
    }

    fn show_dialog(&mut self, ctx: &egui::Context) {
        let Some(dialog) = &self.dialog else { return };

        let mut close = false;
        egui::Window::new(dialog.title)
            .collapsible(false)
            .resizable(false)
            .anchor(Align2::CENTER_CENTER, [0.0, 0.0])
            .show(ctx, |ui| {
                ui.label(&dialog.message);
                ui.add_space(8.0);
                if ui.button("OK").clicked() {
                    close = true;
                }
            });

        if close {
            self.dialog = None;
        }
    }
}

fn card(ui: &mut egui::Ui, add: impl FnOnce(&mut egui::Ui)) {
    egui::Frame::group(ui.style())
        .rounding(15.0)
        .inner_margin(12.0)
        .show(ui, |ui| {
            ui.set_width(ui.available_width());
            add(ui);
        });
    ui.add_space(10.0);
}

impl eframe::App for DashboardApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.drain_results();

        let view = self.view.borrow_and_update().clone();
        self.sync_condition_icon(ctx, &view);

        egui::CentralPanel::default().show(ctx, |ui| {
            egui::ScrollArea::vertical().show(ui, |ui| {
                self.search_row(ui);
                if view.has_data() {
                    self.weather_panels(ui, &view);
                } else if view.phase.is_busy() {
                    ui.vertical_centered(|ui| ui.spinner());
                }
            });
        });

        self.show_dialog(ctx);

        // Intermediate phases are published without a repaint request.
        if self.in_flight {
            ctx.request_repaint_after(Duration::from_millis(100));
        }
    }
}
