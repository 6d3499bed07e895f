#![windows_subsystem = "windows"]
//! Elongation Predictor - Main entry point

use mimalloc::MiMalloc;

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

mod app;
mod constants;
mod session;
mod settings;
mod theme;
mod types;
mod ui;
mod utils;

use app::{texture_from_bytes, App};
use constants::*;
use eframe::egui;
use session::{Lifecycle, PickedImage};
use tracing::{info, warn};
use types::FlowTab;
use ui::components::{kind_selector, selected_kind_header, validation_hint};
use utils::format_percentage;

/// Initialize file logging. Returns a guard that must be held for the app lifetime.
fn init_logging(data_dir: &std::path::Path) -> tracing_appender::non_blocking::WorkerGuard {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let logs_dir = data_dir.join("logs");
    std::fs::create_dir_all(&logs_dir).ok();

    let file_appender = tracing_appender::rolling::daily(&logs_dir, "elongation-predictor.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,elongation_predictor=debug"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false)
                .with_target(true)
                .with_thread_ids(false)
                .with_file(true)
                .with_line_number(true),
        )
        .init();

    guard
}

fn main() -> eframe::Result<()> {
    let data_dir = utils::data_dir();
    std::fs::create_dir_all(&data_dir).ok();

    // Initialize logging - guard must live for entire app lifetime
    let _log_guard = init_logging(&data_dir);

    info!(version = APP_VERSION, "Elongation Predictor starting");

    // Load saved window position/size
    let settings = settings::Settings::load(&data_dir);
    let win_pos = match (settings.window_x, settings.window_y) {
        (Some(x), Some(y)) => Some(egui::pos2(x, y)),
        _ => None,
    };
    let win_size = match (settings.window_w, settings.window_h) {
        (Some(w), Some(h)) => Some(egui::vec2(w, h)),
        _ => None,
    };

    let mut viewport = egui::ViewportBuilder::default()
        .with_inner_size(win_size.unwrap_or(egui::vec2(860.0, 720.0)))
        .with_min_inner_size([640.0, 540.0])
        .with_title(APP_NAME);

    let needs_center = win_pos.is_none();

    if let Some(pos) = win_pos {
        viewport = viewport.with_position(pos);
    }

    let options = eframe::NativeOptions {
        viewport,
        ..Default::default()
    };

    eframe::run_native(
        APP_NAME,
        options,
        Box::new(move |cc| {
            let mut app = App::new(cc, settings, data_dir);
            app.needs_center = needs_center;
            Ok(Box::new(app))
        }),
    )
}

// ============================================================================
// MAIN UPDATE LOOP & UI RENDERING
// ============================================================================

impl eframe::App for App {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        // Track window position/size for saving on exit
        ctx.input(|i| {
            if let Some(rect) = i.viewport().outer_rect {
                self.window_pos = Some(rect.min);
            }
            if let Some(rect) = i.viewport().inner_rect {
                self.window_size = Some(rect.size());
            }
        });

        // Center window on first launch
        if self.needs_center {
            self.needs_center = false;
            if let Some(cmd) = egui::ViewportCommand::center_on_screen(ctx) {
                ctx.send_viewport_cmd(cmd);
            }
        }

        // Apply finished requests from background tasks
        self.poll_completions(ctx);

        self.render_settings_modal(ctx);

        // Top bar - title, flow tabs, settings
        egui::TopBottomPanel::top("top_bar")
            .frame(
                egui::Frame::new()
                    .fill(theme::BG_BASE)
                    .inner_margin(egui::Margin::symmetric(16, 10)),
            )
            .show(ctx, |ui| {
                ui.horizontal(|ui| {
                    ui.label(
                        egui::RichText::new(APP_NAME)
                            .size(theme::FONT_TITLE)
                            .strong(),
                    );
                    ui.add_space(theme::SPACING_XL);
                    ui.selectable_value(&mut self.flow_tab, FlowTab::Predict, "  Predict  ");
                    ui.selectable_value(&mut self.flow_tab, FlowTab::Generate, "  Generate  ");

                    ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                        if ui
                            .button(egui_phosphor::regular::GEAR.to_string())
                            .clicked()
                        {
                            self.show_settings = true;
                        }
                        ui.label(
                            egui::RichText::new(format!("v{}", APP_VERSION))
                                .size(theme::FONT_SMALL)
                                .color(theme::TEXT_DIM),
                        );
                    });
                });
            });

        egui::CentralPanel::default()
            .frame(
                egui::Frame::new()
                    .fill(theme::BG_BASE)
                    .inner_margin(egui::Margin::same(24)),
            )
            .show(ctx, |ui| match self.flow_tab {
                FlowTab::Predict => self.render_predict_flow(ui, ctx),
                FlowTab::Generate => self.render_generate_flow(ui, ctx),
            });

        self.render_toast(ctx);
    }

    fn on_exit(&mut self, _gl: Option<&eframe::glow::Context>) {
        self.save_settings();
    }
}

// ============================================================================
// FLOW A - PREDICT
// ============================================================================

impl App {
    fn render_predict_flow(&mut self, ui: &mut egui::Ui, ctx: &egui::Context) {
        ui.vertical_centered(|ui| {
            ui.add_space(theme::SPACING_MD);
            ui.label(
                egui::RichText::new("Tensile Elongation Predictor")
                    .size(theme::FONT_TITLE)
                    .strong(),
            );
            ui.add_space(theme::SPACING_SM);
            ui.label(
                egui::RichText::new("Upload a KAM or phase map and get the predicted elongation")
                    .size(theme::FONT_BODY)
                    .color(theme::TEXT_MUTED),
            );
            ui.add_space(theme::SPACING_XL);

            let Some(kind) = self.predict.kind() else {
                if let Some(picked) =
                    kind_selector(ui, "Upload KAM Image", "Upload Phase Map")
                {
                    self.predict.select_kind(Some(picked));
                    self.preview_texture = None;
                }
                return;
            };

            if selected_kind_header(ui, kind) {
                self.predict.select_kind(None);
                self.preview_texture = None;
                return;
            }
            ui.add_space(theme::SPACING_LG);

            if ui
                .add(theme::button(format!(
                    "{}  Choose image...",
                    egui_phosphor::regular::FILE_IMAGE
                )))
                .clicked()
            {
                self.pick_predict_image(ctx);
            }

            if let Some(image) = self.predict.image() {
                ui.add_space(theme::SPACING_SM);
                ui.label(
                    egui::RichText::new(&image.file_name)
                        .size(theme::FONT_SECTION)
                        .color(theme::TEXT_MUTED),
                )
                .on_hover_text(image.path.display().to_string());
            }

            if let Some(texture) = &self.preview_texture {
                ui.add_space(theme::SPACING_MD);
                theme::card_frame().show(ui, |ui| {
                    ui.add(
                        egui::Image::new(texture).max_size(egui::vec2(320.0, 320.0)),
                    );
                });
            }

            ui.add_space(theme::SPACING_XL);
            if self.predict.lifecycle().is_loading() {
                ui.horizontal(|ui| {
                    ui.spinner();
                    ui.label("Predicting...");
                });
            } else {
                let submit = egui::Button::new(
                    egui::RichText::new(format!(
                        "{}  Upload & Predict",
                        egui_phosphor::regular::UPLOAD_SIMPLE
                    ))
                    .color(if self.predict.can_submit() {
                        egui::Color32::from_rgb(0x2e, 0x22, 0x04)
                    } else {
                        theme::BTN_DISABLED_TEXT
                    }),
                )
                .fill(if self.predict.can_submit() {
                    theme::BTN_ACCENT
                } else {
                    theme::BTN_DISABLED
                })
                .corner_radius(theme::RADIUS_DEFAULT);
                if ui
                    .add_enabled(self.predict.can_submit(), submit)
                    .clicked()
                {
                    self.submit_predict(ctx);
                }
            }

            ui.add_space(theme::SPACING_LG);
            match self.predict.lifecycle() {
                Lifecycle::Succeeded(prediction) => {
                    ui.label(
                        egui::RichText::new(format!("Predicted Elongation: {}%", prediction))
                            .size(theme::FONT_TITLE)
                            .strong()
                            .color(theme::STATUS_SUCCESS),
                    );
                }
                Lifecycle::Failed(message) => {
                    render_error_banner(ui, message);
                }
                Lifecycle::Idle | Lifecycle::Loading => {}
            }
        });
    }

    fn pick_predict_image(&mut self, ctx: &egui::Context) {
        let Some(path) = rfd::FileDialog::new()
            .add_filter("Images", &["png", "jpg", "jpeg", "bmp", "tiff"])
            .pick_file()
        else {
            return;
        };

        let bytes = match std::fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(error = %e, path = %path.display(), "Failed to read picked image");
                self.show_toast("Could not read that file".to_string());
                return;
            }
        };
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "image".to_string());

        // Preview is best effort; the server does its own validation of
        // whatever we send
        self.preview_texture = texture_from_bytes(ctx, "picked_preview", &bytes).ok();
        self.predict.set_image(PickedImage {
            path,
            file_name,
            bytes,
        });
    }
}

// ============================================================================
// FLOW B - GENERATE
// ============================================================================

impl App {
    fn render_generate_flow(&mut self, ui: &mut egui::Ui, ctx: &egui::Context) {
        ui.vertical_centered(|ui| {
            ui.add_space(theme::SPACING_MD);
            ui.label(
                egui::RichText::new("Map Generator")
                    .size(theme::FONT_TITLE)
                    .strong(),
            );
            ui.add_space(theme::SPACING_SM);
            ui.label(
                egui::RichText::new(
                    "Enter a target elongation and get the matching microscopy map",
                )
                .size(theme::FONT_BODY)
                .color(theme::TEXT_MUTED),
            );
            ui.add_space(theme::SPACING_XL);

            let Some(kind) = self.generate.kind() else {
                if let Some(picked) = kind_selector(ui, "KAM Map", "Phase Map") {
                    self.generate.select_kind(Some(picked));
                    self.generated_texture = None;
                }
                return;
            };

            if selected_kind_header(ui, kind) {
                self.generate.select_kind(None);
                self.generated_texture = None;
                return;
            }
            ui.add_space(theme::SPACING_LG);

            ui.horizontal(|ui| {
                ui.label("Elongation %:");
                ui.add(
                    egui::TextEdit::singleline(self.generate.percent_text_mut())
                        .hint_text("5 - 60")
                        .desired_width(120.0)
                        .background_color(theme::BG_INPUT),
                );
            });
            validation_hint(
                ui,
                self.generate.percent_text(),
                self.generate.validity(),
            );

            ui.add_space(theme::SPACING_XL);
            if self.generate.lifecycle().is_loading() {
                ui.horizontal(|ui| {
                    ui.spinner();
                    ui.label("Generating...");
                });
            } else {
                let can_submit = self.generate.can_submit();
                let submit = egui::Button::new(
                    egui::RichText::new(format!(
                        "{}  Generate Image",
                        egui_phosphor::regular::MAGIC_WAND
                    ))
                    .color(if can_submit {
                        egui::Color32::from_rgb(0x2e, 0x22, 0x04)
                    } else {
                        theme::BTN_DISABLED_TEXT
                    }),
                )
                .fill(if can_submit {
                    theme::BTN_ACCENT
                } else {
                    theme::BTN_DISABLED
                })
                .corner_radius(theme::RADIUS_DEFAULT);
                if ui.add_enabled(can_submit, submit).clicked() {
                    self.submit_generate(ctx);
                }
            }

            ui.add_space(theme::SPACING_LG);
            let outcome = match self.generate.lifecycle() {
                Lifecycle::Succeeded(image) => Some(Ok(image.percentage)),
                Lifecycle::Failed(message) => Some(Err(message.clone())),
                Lifecycle::Idle | Lifecycle::Loading => None,
            };
            match outcome {
                Some(Ok(percentage)) => {
                    ui.label(
                        egui::RichText::new(format!(
                            "Generated {} map for {}% elongation",
                            kind.label(),
                            format_percentage(percentage)
                        ))
                        .strong()
                        .color(theme::STATUS_SUCCESS),
                    );
                    if let Some(texture) = &self.generated_texture {
                        ui.add_space(theme::SPACING_MD);
                        theme::card_frame().show(ui, |ui| {
                            ui.add(
                                egui::Image::new(texture).max_size(egui::vec2(360.0, 360.0)),
                            );
                        });
                    }
                    ui.add_space(theme::SPACING_MD);
                    if ui
                        .add(theme::button_accent(format!(
                            "{}  Save Image",
                            egui_phosphor::regular::DOWNLOAD_SIMPLE
                        )))
                        .clicked()
                    {
                        self.save_generated_image();
                    }
                }
                Some(Err(message)) => {
                    render_error_banner(ui, &message);
                }
                None => {}
            }
        });
    }
}

// ============================================================================
// SETTINGS MODAL & TOAST
// ============================================================================

impl App {
    fn render_settings_modal(&mut self, ctx: &egui::Context) {
        if !self.show_settings {
            return;
        }

        let modal = egui::Modal::new(egui::Id::new("settings_modal"))
            .backdrop_color(egui::Color32::from_black_alpha(180))
            .frame(theme::modal_frame());
        let modal_response = modal.show(ctx, |ui| {
            ui.set_min_width(360.0);
            ui.set_max_width(360.0);

            ui.label(
                egui::RichText::new("Settings")
                    .size(theme::FONT_TITLE)
                    .strong(),
            );
            ui.add_space(theme::SPACING_LG);

            ui.label(
                egui::RichText::new("Server URL")
                    .size(theme::FONT_SECTION)
                    .color(theme::TEXT_MUTED),
            );
            ui.add(
                egui::TextEdit::singleline(&mut self.server_url_str)
                    .desired_width(f32::INFINITY)
                    .background_color(theme::BG_INPUT),
            );

            ui.add_space(theme::SPACING_XL);
            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                if ui
                    .add(theme::button_accent(format!(
                        "{}  Done",
                        egui_phosphor::regular::CHECK
                    )))
                    .clicked()
                {
                    self.show_settings = false;
                    self.save_settings();
                }
            });
        });
        if modal_response.should_close() {
            self.show_settings = false;
            self.save_settings();
        }
    }

    // Bottom-right toast, 3s visible then fade
    fn render_toast(&mut self, ctx: &egui::Context) {
        let Some(msg) = self.toast_message.clone() else {
            return;
        };
        let visible_duration = 3.0;
        let fade_duration = 0.5;
        let total_duration = visible_duration + fade_duration;
        let margin = 12.0;

        let screen = ctx.screen_rect();
        let toast_pos = egui::pos2(screen.right() - margin, screen.bottom() - margin);

        egui::Area::new(egui::Id::new("toast"))
            .fixed_pos(toast_pos)
            .pivot(egui::Align2::RIGHT_BOTTOM)
            .show(ctx, |ui| {
                let elapsed = self
                    .toast_start
                    .map(|t| t.elapsed().as_secs_f32())
                    .unwrap_or(0.0);
                let alpha = if elapsed > visible_duration {
                    (total_duration - elapsed) / fade_duration
                } else {
                    1.0
                };

                egui::Frame::new()
                    .fill(egui::Color32::from_rgba_unmultiplied(
                        0x1a,
                        0x17,
                        0x23,
                        (230.0 * alpha) as u8,
                    ))
                    .stroke(egui::Stroke::new(
                        1.0,
                        egui::Color32::from_rgba_unmultiplied(
                            theme::ACCENT.r(),
                            theme::ACCENT.g(),
                            theme::ACCENT.b(),
                            (100.0 * alpha) as u8,
                        ),
                    ))
                    .corner_radius(6.0)
                    .inner_margin(egui::Margin::symmetric(16, 10))
                    .show(ui, |ui| {
                        ui.label(egui::RichText::new(&msg).color(
                            egui::Color32::from_rgba_unmultiplied(
                                255,
                                255,
                                255,
                                (255.0 * alpha) as u8,
                            ),
                        ));
                    });
            });

        let elapsed = self
            .toast_start
            .map(|t| t.elapsed().as_secs_f32())
            .unwrap_or(0.0);
        if elapsed >= total_duration {
            self.toast_message = None;
            self.toast_start = None;
        } else {
            ctx.request_repaint();
        }
    }
}

fn render_error_banner(ui: &mut egui::Ui, message: &str) {
    theme::error_frame().show(ui, |ui| {
        let text = format!("{}  {}", egui_phosphor::regular::WARNING, message);
        ui.add(
            egui::Label::new(
                egui::RichText::new(text).color(egui::Color32::from_rgb(0xfc, 0xa5, 0xa5)),
            )
            .wrap(),
        );
    });
}
