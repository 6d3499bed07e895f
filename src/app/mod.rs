//! App module - contains the main application state and logic

mod requests;
mod textures;

use crate::session::{
    GenerateCompletion, GenerateSession, Lifecycle, PredictCompletion, PredictSession,
};
use crate::settings::Settings;
use crate::theme;
use crate::types::FlowTab;
use eframe::egui;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tracing::{info, warn};

pub(crate) use textures::texture_from_bytes;

// ============================================================================
// APP STATE
// ============================================================================

pub struct App {
    // Flow state machines
    pub(crate) flow_tab: FlowTab,
    pub(crate) predict: PredictSession,
    pub(crate) generate: GenerateSession,
    // Completions pushed by background request tasks, drained each frame
    pub(crate) predict_inbox: Arc<Mutex<Vec<PredictCompletion>>>,
    pub(crate) generate_inbox: Arc<Mutex<Vec<GenerateCompletion>>>,
    // HTTP
    pub(crate) runtime: tokio::runtime::Runtime,
    pub(crate) client: reqwest::Client,
    // Textures derived from session state, cleared on reset
    pub(crate) preview_texture: Option<egui::TextureHandle>,
    pub(crate) generated_texture: Option<egui::TextureHandle>,
    // Settings
    pub(crate) show_settings: bool,
    pub(crate) server_url_str: String,
    pub(crate) save_dir: Option<PathBuf>,
    pub(crate) window_pos: Option<egui::Pos2>,
    pub(crate) window_size: Option<egui::Vec2>,
    pub(crate) needs_center: bool,
    pub(crate) data_dir: PathBuf,
    // Toast notification
    pub(crate) toast_message: Option<String>,
    pub(crate) toast_start: Option<std::time::Instant>,
}

// ============================================================================
// APP INITIALIZATION & HELPERS
// ============================================================================

impl App {
    pub fn new(cc: &eframe::CreationContext<'_>, settings: Settings, data_dir: PathBuf) -> Self {
        // Force dark theme
        cc.egui_ctx.set_theme(egui::Theme::Dark);

        // Add Phosphor icons font
        let mut fonts = egui::FontDefinitions::default();
        egui_phosphor::add_to_fonts(&mut fonts, egui_phosphor::Variant::Regular);
        cc.egui_ctx.set_fonts(fonts);

        // Apply theme from theme.rs
        theme::apply_visuals(&cc.egui_ctx);

        Self {
            flow_tab: FlowTab::Predict,
            predict: PredictSession::default(),
            generate: GenerateSession::default(),
            predict_inbox: Arc::new(Mutex::new(Vec::new())),
            generate_inbox: Arc::new(Mutex::new(Vec::new())),
            runtime: tokio::runtime::Runtime::new().expect("tokio runtime"),
            client: reqwest::Client::new(),
            preview_texture: None,
            generated_texture: None,
            show_settings: false,
            server_url_str: settings.server_url.clone(),
            save_dir: settings.save_dir.as_ref().map(PathBuf::from),
            window_pos: None,
            window_size: None,
            needs_center: false,
            data_dir,
            toast_message: None,
            toast_start: None,
        }
    }

    pub fn save_settings(&self) {
        let settings = Settings {
            window_x: self.window_pos.map(|p| p.x),
            window_y: self.window_pos.map(|p| p.y),
            window_w: self.window_size.map(|s| s.x),
            window_h: self.window_size.map(|s| s.y),
            server_url: self.server_url_str.clone(),
            save_dir: self
                .save_dir
                .as_ref()
                .map(|p| p.to_string_lossy().to_string()),
        };
        settings.save(&self.data_dir);
    }

    /// Drain request completions into the sessions. Stale ones are dropped
    /// by the sessions themselves, so the texture is derived from session
    /// state afterwards rather than from whichever completion arrived.
    pub fn poll_completions(&mut self, ctx: &egui::Context) {
        let predict_done: Vec<PredictCompletion> =
            self.predict_inbox.lock().unwrap().drain(..).collect();
        for completion in predict_done {
            self.predict.finish(completion);
        }

        let generate_done: Vec<GenerateCompletion> =
            self.generate_inbox.lock().unwrap().drain(..).collect();
        let had_completions = !generate_done.is_empty();
        for completion in generate_done {
            self.generate.finish(completion);
        }

        if had_completions {
            match self.generate.lifecycle() {
                Lifecycle::Succeeded(image) => {
                    match texture_from_bytes(ctx, "generated_map", &image.png) {
                        Ok(texture) => self.generated_texture = Some(texture),
                        Err(e) => warn!(error = %e, "Generated image did not decode"),
                    }
                }
                _ => self.generated_texture = None,
            }
        }
    }

    /// Ask where to store the generated image and write it out
    pub fn save_generated_image(&mut self) {
        let Lifecycle::Succeeded(image) = self.generate.lifecycle() else {
            return;
        };
        let default_name = crate::utils::generated_image_name(image.percentage);

        let mut dialog = rfd::FileDialog::new()
            .set_file_name(&default_name)
            .add_filter("PNG image", &["png"]);
        if let Some(dir) = &self.save_dir {
            dialog = dialog.set_directory(dir);
        }
        let Some(path) = dialog.save_file() else {
            return;
        };

        match std::fs::write(&path, &image.png) {
            Ok(()) => {
                info!(path = %path.display(), "Generated image saved");
                self.save_dir = path.parent().map(PathBuf::from);
                self.show_toast(format!("Saved {}", path.display()));
            }
            Err(e) => {
                warn!(error = %e, path = %path.display(), "Failed to save generated image");
                self.show_toast("Could not save the image".to_string());
            }
        }
    }

    pub fn show_toast(&mut self, message: String) {
        self.toast_message = Some(message);
        self.toast_start = Some(std::time::Instant::now());
    }
}
