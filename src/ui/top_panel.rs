//! # Top Panel - Scene Controls
//!
//! Default frequency for new towers, export and clear buttons, scene counts
//! and status hints (pending elevation lookup, active connect gesture).

use crate::ui::{AppState, UiAction};
use eframe::egui;
use egui::Color32;

pub fn render(ctx: &egui::Context, state: &mut AppState, actions: &mut Vec<UiAction>) {
    egui::TopBottomPanel::top("top_controls").show(ctx, |ui| {
        ui.add_space(4.0);
        ui.horizontal(|ui| {
            ui.heading("Fresnel Link Planner");
            ui.separator();

            ui.label("Default frequency:");
            ui.add(
                egui::DragValue::new(&mut state.default_frequency_ghz)
                    .range(0.001..=300.0)
                    .speed(0.01)
                    .suffix(" GHz"),
            );
            ui.separator();

            if ui.button("Export GeoJSON").clicked() {
                actions.push(UiAction::ExportScene);
            }
            if ui.button("Clear All").clicked() {
                actions.push(UiAction::ClearScene);
            }
            ui.separator();

            ui.label("Towers:");
            ui.label(egui::RichText::new(state.scene.towers().len().to_string()).strong());
            ui.label("Links:");
            ui.label(egui::RichText::new(state.scene.links().len().to_string()).strong());

            if state.scene.is_zone_pending() {
                ui.separator();
                ui.spinner();
                ui.label("Loading elevation…");
            }

            if let Some(from) = state.connecting_from.and_then(|id| state.scene.tower(id)) {
                ui.separator();
                ui.colored_label(
                    Color32::from_rgb(255, 165, 0),
                    format!("Connecting from {}: click another tower (Esc to cancel)", from.name),
                );
            }
        });
        ui.add_space(4.0);
    });
}
