//! # Side Panel - Scene Lists, Zone Details and Diagnostics
//!
//! The resizable right panel has three tabs:
//! - Scene: the tower editor, the tower list and the link list
//! - Fresnel: statistics and the per-sample table of the shown zone
//! - Diagnostics: warnings and errors captured from the log
//!
//! ## Sample Table
//!
//! The sample table uses `egui_extras::TableBuilder` like the other tables in
//! the app; with the default resolution it has 41 rows, one per sample from
//! the first tower to the second.

use crate::fresnel::{ElevationSource, FresnelZone};
use crate::geodesy;
use crate::scene::{LinkId, ZoneCache};
use crate::ui::app_state::SideTab;
use crate::ui::{AppState, UiAction};
use eframe::egui;
use egui::Color32;
use log::Level;

/// Render the side panel and remember its width for the next session.
pub fn render(ctx: &egui::Context, state: &mut AppState, actions: &mut Vec<UiAction>) {
    let response = egui::SidePanel::right("side_panel")
        .resizable(true)
        .default_width(state.side_panel_width)
        .width_range(260.0..=800.0)
        .show(ctx, |ui| {
            ui.horizontal(|ui| {
                let diagnostics_title = if state.diagnostics.is_empty() {
                    "Diagnostics".to_string()
                } else {
                    format!("Diagnostics ({})", state.diagnostics.len())
                };
                ui.selectable_value(&mut state.side_tab, SideTab::Scene, "Scene");
                ui.selectable_value(&mut state.side_tab, SideTab::Fresnel, "Fresnel");
                ui.selectable_value(&mut state.side_tab, SideTab::Diagnostics, diagnostics_title);
            });
            ui.separator();

            match state.side_tab {
                SideTab::Scene => {
                    render_editor(ui, state, actions);
                    render_tower_list(ui, state, actions);
                    render_link_list(ui, state, actions);
                }
                SideTab::Fresnel => render_zone_details(ui, state, actions),
                SideTab::Diagnostics => render_diagnostics(ui, state),
            }
        });
    state.side_panel_width = response.response.rect.width();
}

fn render_editor(ui: &mut egui::Ui, state: &mut AppState, actions: &mut Vec<UiAction>) {
    let connecting_from = state.connecting_from;
    let Some(editor) = state.editor.as_mut() else {
        return;
    };

    ui.heading("Edit Tower");
    egui::Grid::new("tower_editor").num_columns(2).spacing([8.0, 6.0]).show(ui, |ui| {
        ui.label("Name");
        ui.text_edit_singleline(&mut editor.name);
        ui.end_row();
        ui.label("Frequency (GHz)");
        ui.text_edit_singleline(&mut editor.frequency_text);
        ui.end_row();
    });

    ui.horizontal(|ui| {
        if ui.button("Save").clicked() {
            actions.push(UiAction::SaveTower {
                id: editor.id,
                name: editor.name.clone(),
                frequency_text: editor.frequency_text.clone(),
            });
        }
        if ui.button("Delete").clicked() {
            actions.push(UiAction::DeleteTower(editor.id));
        }
        if connecting_from == Some(editor.id) {
            if ui.button("Cancel Connect").clicked() {
                actions.push(UiAction::CancelConnect);
            }
        } else if ui.button("Connect").clicked() {
            actions.push(UiAction::BeginConnect(editor.id));
        }
        if ui.button("Close").clicked() {
            actions.push(UiAction::CloseEditor);
        }
    });
    ui.label(egui::RichText::new("Click Connect then another tower to link (frequencies must match)").small().weak());
    ui.separator();
}

fn render_tower_list(ui: &mut egui::Ui, state: &AppState, actions: &mut Vec<UiAction>) {
    ui.heading(format!("Towers ({})", state.scene.towers().len()));
    if state.scene.towers().is_empty() {
        ui.label(egui::RichText::new("Click on the map to place a tower.").weak());
    }
    let max_height = (ui.available_height() * 0.5).max(80.0);
    egui::ScrollArea::vertical().id_salt("tower_list").max_height(max_height).show(ui, |ui| {
        for tower in state.scene.towers() {
            ui.horizontal(|ui| {
                ui.vertical(|ui| {
                    ui.label(egui::RichText::new(&tower.name).strong());
                    ui.label(
                        egui::RichText::new(format!("{} GHz • {:.4}, {:.4}", tower.frequency_ghz, tower.position.lat, tower.position.lng))
                            .small(),
                    );
                });
                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    if ui.button("Delete").clicked() {
                        actions.push(UiAction::DeleteTower(tower.id));
                    }
                    if ui.button("Edit").clicked() {
                        actions.push(UiAction::EditTower(tower.id));
                    }
                });
            });
            ui.separator();
        }
    });
    ui.add_space(8.0);
}

/// `"A ↔ B"`, with `?` for an endpoint that no longer resolves.
fn link_title(state: &AppState, id: LinkId) -> String {
    match state.scene.link_endpoints(id) {
        Some((a, b)) => format!("{} ↔ {}", a.name, b.name),
        None => "? ↔ ?".to_string(),
    }
}

fn render_link_list(ui: &mut egui::Ui, state: &AppState, actions: &mut Vec<UiAction>) {
    ui.heading(format!("Links ({})", state.scene.links().len()));
    if state.scene.links().is_empty() {
        ui.label(egui::RichText::new("Use Connect on a tower, then click another tower with the same frequency.").weak());
    }
    egui::ScrollArea::vertical().id_salt("link_list").show(ui, |ui| {
        for link in state.scene.links() {
            let distance = state.scene.link_length(link.id).unwrap_or(0.0);
            ui.horizontal(|ui| {
                ui.vertical(|ui| {
                    ui.label(egui::RichText::new(link_title(state, link.id)).strong());
                    ui.label(egui::RichText::new(format!("{} GHz • {}", link.frequency_ghz, geodesy::format_distance(distance))).small());
                });
                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    if ui.button("Delete").clicked() {
                        actions.push(UiAction::DeleteLink(link.id));
                    }
                    if ui.button("Show Fresnel").clicked() {
                        actions.push(UiAction::ShowZone(link.id));
                    }
                    if matches!(link.zone(), ZoneCache::Pending { .. }) {
                        ui.spinner();
                    }
                });
            });
            ui.separator();
        }
    });
}

fn render_zone_details(ui: &mut egui::Ui, state: &AppState, actions: &mut Vec<UiAction>) {
    let Some(link) = state.active_zone.and_then(|id| state.scene.link(id)) else {
        ui.centered_and_justified(|ui| {
            ui.label("No zone shown. Click a link on the map or use Show Fresnel in the link list.");
        });
        return;
    };

    ui.horizontal(|ui| {
        ui.heading(link_title(state, link.id));
        ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
            if ui.button("Hide").clicked() {
                actions.push(UiAction::HideZone);
            }
        });
    });
    ui.separator();

    match link.zone() {
        ZoneCache::Pending { .. } => {
            ui.horizontal(|ui| {
                ui.spinner();
                ui.label("Fetching elevation profile…");
            });
        }
        ZoneCache::Ready(zone) => {
            render_zone_summary(ui, zone);
            ui.separator();
            render_sample_table(ui, zone);
        }
        ZoneCache::Empty => {
            ui.label("The zone was discarded. Show it again to recompute.");
        }
    }
}

fn render_zone_summary(ui: &mut egui::Ui, zone: &FresnelZone) {
    egui::Grid::new("zone_summary").num_columns(2).spacing([12.0, 4.0]).show(ui, |ui| {
        ui.label("Frequency:");
        ui.label(egui::RichText::new(format!("{} GHz", zone.frequency_ghz)).strong());
        ui.end_row();
        ui.label("Wavelength:");
        ui.label(egui::RichText::new(format!("{:.4} m", zone.wavelength())).strong());
        ui.end_row();
        ui.label("Path length:");
        ui.label(egui::RichText::new(geodesy::format_distance(zone.path_length())).strong());
        ui.end_row();
        ui.label("Max radius:");
        ui.label(egui::RichText::new(format!("{:.2} m", zone.max_radius())).strong());
        ui.end_row();
        ui.label("Samples:");
        ui.label(egui::RichText::new(zone.samples.len().to_string()).strong());
        ui.end_row();
        ui.label("Elevation:");
        match (zone.elevation_source, zone.elevation_range()) {
            (ElevationSource::ZeroFallback, _) => {
                ui.colored_label(Color32::from_rgb(255, 165, 0), "Service unavailable, zero elevation assumed");
            }
            (ElevationSource::Provider, Some((low, high))) => {
                ui.label(egui::RichText::new(format!("{:.0} m – {:.0} m", low, high)).strong());
            }
            (ElevationSource::Provider, None) => {
                ui.label("-");
            }
        }
        ui.end_row();
    });
}

fn render_sample_table(ui: &mut egui::Ui, zone: &FresnelZone) {
    use egui_extras::{Column, TableBuilder};

    let row_height = ui.text_style_height(&egui::TextStyle::Body) * 1.3;
    TableBuilder::new(ui)
        .striped(true)
        .resizable(true)
        .vscroll(true)
        .cell_layout(egui::Layout::left_to_right(egui::Align::Center))
        .column(Column::initial(40.0).at_least(30.0)) // Fraction
        .column(Column::initial(80.0).at_least(60.0)) // Latitude
        .column(Column::initial(80.0).at_least(60.0)) // Longitude
        .column(Column::initial(70.0).at_least(50.0)) // d1
        .column(Column::initial(70.0).at_least(50.0)) // d2
        .column(Column::initial(60.0).at_least(40.0)) // Elevation
        .column(Column::remainder()) // Radius
        .header(row_height, |mut header| {
            for title in ["f", "Lat", "Lng", "d1", "d2", "Elev", "Radius"] {
                header.col(|ui| {
                    ui.strong(title);
                });
            }
        })
        .body(|body| {
            body.rows(row_height, zone.samples.len(), |mut row| {
                let sample = &zone.samples[row.index()];
                row.col(|ui| {
                    ui.label(format!("{:.3}", sample.fraction));
                });
                row.col(|ui| {
                    ui.label(format!("{:.5}", sample.position.lat));
                });
                row.col(|ui| {
                    ui.label(format!("{:.5}", sample.position.lng));
                });
                row.col(|ui| {
                    ui.label(geodesy::format_distance(sample.d1));
                });
                row.col(|ui| {
                    ui.label(geodesy::format_distance(sample.d2));
                });
                row.col(|ui| {
                    ui.label(format!("{:.0} m", sample.elevation));
                });
                row.col(|ui| {
                    ui.label(format!("{:.2} m", sample.radius));
                });
            });
        });
}

fn level_color(level: Level) -> Color32 {
    match level {
        Level::Error => Color32::from_rgb(255, 80, 80),
        Level::Warn => Color32::from_rgb(255, 200, 0),
        _ => Color32::GRAY,
    }
}

fn render_diagnostics(ui: &mut egui::Ui, state: &mut AppState) {
    ui.horizontal(|ui| {
        ui.label(format!("{} entries", state.diagnostics.len()));
        if ui.button("Clear").clicked() {
            state.diagnostics.clear();
        }
    });
    ui.separator();

    if state.diagnostics.is_empty() {
        ui.centered_and_justified(|ui| {
            ui.label("No warnings or errors.");
        });
        return;
    }

    egui::ScrollArea::vertical().id_salt("diagnostics").stick_to_bottom(true).show(ui, |ui| {
        for entry in &state.diagnostics {
            ui.horizontal_wrapped(|ui| {
                ui.label(egui::RichText::new(entry.timestamp.format("%H:%M:%S").to_string()).monospace());
                ui.label(egui::RichText::new(entry.level.as_str()).monospace().color(level_color(entry.level)));
                ui.label(entry.message.as_str()).on_hover_text(entry.target.as_str());
            });
        }
    });
}
