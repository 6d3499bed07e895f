//! Reusable UI components

use crate::session::Validity;
use crate::theme;
use crate::types::MapKind;
use eframe::egui;

/// Render the two kind-selection buttons. Returns the kind that was clicked,
/// if any.
pub fn kind_selector(ui: &mut egui::Ui, kam_label: &str, phase_label: &str) -> Option<MapKind> {
    let mut picked = None;
    ui.horizontal(|ui| {
        if ui
            .add(theme::button_kind(kam_label, theme::KIND_KAM))
            .clicked()
        {
            picked = Some(MapKind::Kam);
        }
        ui.add_space(theme::SPACING_XL);
        if ui
            .add(theme::button_kind(phase_label, theme::KIND_PHASE))
            .clicked()
        {
            picked = Some(MapKind::PhaseMap);
        }
    });
    picked
}

/// Back button plus the "Selected Model" line. Returns true when the user
/// clicked back.
pub fn selected_kind_header(ui: &mut egui::Ui, kind: MapKind) -> bool {
    let mut back = false;
    if ui
        .add(theme::button(format!(
            "{}  Back",
            egui_phosphor::regular::ARROW_LEFT
        )))
        .clicked()
    {
        back = true;
    }
    ui.add_space(theme::SPACING_MD);
    ui.horizontal(|ui| {
        ui.label("Selected Model:");
        ui.label(
            egui::RichText::new(kind.label())
                .strong()
                .color(theme::ACCENT),
        );
    });
    back
}

/// Inline validation message under the percentage field. Silent while the
/// field is untouched.
pub fn validation_hint(ui: &mut egui::Ui, text: &str, validity: Validity) {
    if text.is_empty() {
        return;
    }
    if let Validity::Invalid(message) = validity {
        ui.label(
            egui::RichText::new(message)
                .size(theme::FONT_SECTION)
                .color(theme::STATUS_ERROR),
        );
    }
}
