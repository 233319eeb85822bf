//! # Central Map Visualization
//!
//! This module renders the slippy map filling the central panel:
//! - Raster tiles for the current view, requested from the tile worker on demand
//! - The active Fresnel zone as a filled polygon
//! - Links as line segments, with a distance/frequency label on hover
//! - Towers as markers with their names
//!
//! ## Interaction
//!
//! - Click on empty map: place a tower
//! - Click on a tower: finish a connect gesture or open the editor
//! - Click on a link: show its Fresnel zone
//! - Drag a tower: move it (applied when the drag ends)
//! - Drag empty map: pan
//! - Scroll: zoom around the pointer
//!
//! Nothing here mutates the scene; gestures become [`UiAction`]s.

use crate::geodesy;
use crate::scene::{LinkId, TowerId};
use crate::tiles::MapView;
use crate::tiles::projection::{MAX_ZOOM, MIN_ZOOM};
use crate::ui::{AppState, UiAction};
use eframe::egui;
use egui::Color32;

const TOWER_RADIUS: f32 = 7.0;
/// Pointer distance (px) at which a tower counts as hit.
const TOWER_HIT_RADIUS: f32 = 10.0;
/// Pointer distance (px) from a link segment that counts as hit.
const LINK_HIT_DISTANCE: f32 = 6.0;
/// Scroll distance (points) per zoom level.
const SCROLL_PER_ZOOM_STEP: f32 = 50.0;
const FIT_PADDING: f32 = 40.0;

const LINK_COLOR: Color32 = Color32::from_rgb(11, 116, 255);
const ZONE_STROKE: Color32 = Color32::from_rgb(22, 163, 74);
const ZONE_FILL: Color32 = Color32::from_rgba_premultiplied(75, 109, 94, 115);

/// Render the central map panel.
///
/// # Parameters
///
/// * `ctx` - egui context for rendering
/// * `state` - Application state; only view and drag state are changed here
/// * `actions` - Collected user actions, applied after the frame
pub fn render(ctx: &egui::Context, state: &mut AppState, actions: &mut Vec<UiAction>) {
    egui::CentralPanel::default().frame(egui::Frame::NONE).show(ctx, |ui| {
        let rect = ui.available_rect_before_wrap();
        let response = ui.interact(rect, egui::Id::new("map_canvas"), egui::Sense::click_and_drag());
        let painter = ui.painter_at(rect);

        fit_view_to_zone(state, rect);

        painter.rect_filled(rect, 0.0, ui.visuals().extreme_bg_color);
        draw_tiles(&painter, rect, state);

        let towers: Vec<(TowerId, egui::Pos2)> = state
            .scene
            .towers()
            .iter()
            .filter_map(|t| Some((t.id, state.view.to_screen(state.tower_position(t.id)?, rect))))
            .collect();
        let links: Vec<(LinkId, egui::Pos2, egui::Pos2)> = state
            .scene
            .links()
            .iter()
            .filter_map(|l| {
                let a = state.view.to_screen(state.tower_position(l.a)?, rect);
                let b = state.view.to_screen(state.tower_position(l.b)?, rect);
                Some((l.id, a, b))
            })
            .collect();

        let hover = response.hover_pos();
        let hovered_link = match hover {
            Some(pos) if tower_at(&towers, pos).is_none() && state.dragging.is_none() => link_at(&links, pos),
            _ => None,
        };

        draw_zone(&painter, rect, state);
        draw_links(&painter, &links, state.active_zone, hovered_link);
        draw_towers(&painter, &towers, state);
        if let (Some(link), Some(pos)) = (hovered_link, hover) {
            draw_link_label(&painter, state, link, pos);
        }
        if state.tile_tx.is_some() {
            painter.text(
                rect.right_bottom() - egui::vec2(4.0, 4.0),
                egui::Align2::RIGHT_BOTTOM,
                "© OpenStreetMap contributors",
                egui::FontId::proportional(11.0),
                Color32::from_gray(60),
            );
        }

        handle_drag(&response, rect, &towers, state, actions);
        handle_click(&response, rect, &towers, &links, state, actions);
        handle_zoom(ui, &response, rect, state);
    });
}

fn fit_view_to_zone(state: &mut AppState, rect: egui::Rect) {
    if !state.fit_to_zone {
        return;
    }
    if state.active_zone.is_none() {
        state.fit_to_zone = false;
        return;
    }
    if let Some(view) = state.active_zone().and_then(|zone| MapView::fit_bounds(&zone.polygon, rect.size(), FIT_PADDING)) {
        state.view = view;
        state.fit_to_zone = false;
    }
}

/// Draw cached tiles and request the missing ones.
fn draw_tiles(painter: &egui::Painter, rect: egui::Rect, state: &mut AppState) {
    if state.tile_tx.is_none() {
        return;
    }
    let uv = egui::Rect::from_min_max(egui::pos2(0.0, 0.0), egui::pos2(1.0, 1.0));
    for (key, tile_rect) in state.view.visible_tiles(rect) {
        if let Some(texture) = state.tiles.texture(&key) {
            painter.image(texture.id(), tile_rect, uv, Color32::WHITE);
        } else if state.tiles.needs_request(&key) {
            // A full queue leaves the tile unrequested so a later frame retries it
            let sent = state.tile_tx.as_ref().is_some_and(|tx| tx.try_send(key).is_ok());
            if sent {
                state.tiles.mark_requested(key);
            }
        }
    }
}

fn draw_zone(painter: &egui::Painter, rect: egui::Rect, state: &AppState) {
    let Some(zone) = state.active_zone() else {
        return;
    };
    let points: Vec<egui::Pos2> = zone.polygon.iter().map(|p| state.view.to_screen(*p, rect)).collect();
    if points.len() < 3 {
        return;
    }
    painter.add(egui::Shape::mesh(zone_fill(&points)));
    painter.add(egui::Shape::closed_line(points, egui::Stroke::new(2.0, ZONE_STROKE)));
}

/// Triangle strip between the two sides of a zone outline.
///
/// The outline holds the left side followed by the reversed right side, so
/// vertex `i` faces vertex `len - 1 - i`. Each quad between neighbouring
/// samples becomes two triangles, which fills the lens even where the projected
/// outline is not convex.
fn zone_fill(outline: &[egui::Pos2]) -> egui::Mesh {
    let mut mesh = egui::Mesh::default();
    for p in outline {
        mesh.colored_vertex(*p, ZONE_FILL);
    }
    let n = outline.len() as u32;
    for i in 0..(n / 2).saturating_sub(1) {
        let (left, left_next) = (i, i + 1);
        let (right, right_next) = (n - 1 - i, n - 2 - i);
        mesh.add_triangle(left, left_next, right_next);
        mesh.add_triangle(left, right_next, right);
    }
    mesh
}

fn draw_links(painter: &egui::Painter, links: &[(LinkId, egui::Pos2, egui::Pos2)], active: Option<LinkId>, hovered: Option<LinkId>) {
    for (id, a, b) in links {
        let width = if Some(*id) == hovered || Some(*id) == active { 5.0 } else { 3.0 };
        painter.line_segment([*a, *b], egui::Stroke::new(width, LINK_COLOR));
    }
}

fn draw_towers(painter: &egui::Painter, towers: &[(TowerId, egui::Pos2)], state: &AppState) {
    let editing = state.editor.as_ref().map(|e| e.id);
    for (id, pos) in towers {
        let color = if state.connecting_from == Some(*id) {
            Color32::from_rgb(255, 165, 0)
        } else if editing == Some(*id) {
            Color32::from_rgb(255, 220, 0)
        } else {
            Color32::from_rgb(220, 38, 38)
        };
        painter.circle_filled(*pos, TOWER_RADIUS, color);
        painter.circle_stroke(*pos, TOWER_RADIUS, egui::Stroke::new(2.0, Color32::WHITE));

        if let Some(tower) = state.scene.tower(*id) {
            painter.text(
                egui::pos2(pos.x + 10.0, pos.y - 8.0),
                egui::Align2::LEFT_BOTTOM,
                &tower.name,
                egui::FontId::proportional(13.0),
                Color32::from_rgb(20, 20, 20),
            );
        }
    }
}

/// Hover text for a link: `"<distance> • <freq> GHz"`.
pub fn link_label(meters: f64, frequency_ghz: f64) -> String {
    format!("{} • {} GHz", geodesy::format_distance(meters), frequency_ghz)
}

fn draw_link_label(painter: &egui::Painter, state: &AppState, link: LinkId, pointer: egui::Pos2) {
    let (Some(length), Some(link)) = (state.scene.link_length(link), state.scene.link(link)) else {
        return;
    };
    let galley = painter.layout_no_wrap(link_label(length, link.frequency_ghz), egui::FontId::proportional(13.0), Color32::WHITE);
    let pos = pointer + egui::vec2(12.0, -24.0);
    let background = egui::Rect::from_min_size(pos, galley.size()).expand(4.0);
    painter.rect_filled(background, 4.0, Color32::from_black_alpha(200));
    painter.galley(pos, galley, Color32::WHITE);
}

/// Start, follow and finish tower drags; drags on empty map pan the view.
fn handle_drag(response: &egui::Response, rect: egui::Rect, towers: &[(TowerId, egui::Pos2)], state: &mut AppState, actions: &mut Vec<UiAction>) {
    if response.drag_started() {
        let origin = response.ctx.input(|i| i.pointer.press_origin());
        if let Some(id) = origin.and_then(|p| tower_at(towers, p)) {
            state.dragging = state.scene.tower(id).map(|t| (id, t.position));
        }
    }

    if response.dragged() {
        match state.dragging {
            Some((id, _)) => {
                if let Some(pos) = response.interact_pointer_pos() {
                    state.dragging = Some((id, state.view.from_screen(pos, rect)));
                }
            }
            None => state.view.pan_by(response.drag_delta()),
        }
    }

    if response.drag_stopped() {
        if let Some((id, position)) = state.dragging.take() {
            actions.push(UiAction::MoveTower(id, position));
        }
    }
}

fn handle_click(
    response: &egui::Response,
    rect: egui::Rect,
    towers: &[(TowerId, egui::Pos2)],
    links: &[(LinkId, egui::Pos2, egui::Pos2)],
    state: &AppState,
    actions: &mut Vec<UiAction>,
) {
    if !response.clicked() {
        return;
    }
    let Some(pos) = response.interact_pointer_pos() else {
        return;
    };
    if let Some(id) = tower_at(towers, pos) {
        actions.push(UiAction::TowerClicked(id));
    } else if let Some(link) = link_at(links, pos) {
        actions.push(UiAction::ShowZone(link));
    } else {
        actions.push(UiAction::PlaceTower(state.view.from_screen(pos, rect)));
    }
}

fn handle_zoom(ui: &egui::Ui, response: &egui::Response, rect: egui::Rect, state: &mut AppState) {
    if !response.hovered() {
        return;
    }
    let scroll = ui.input(|i| i.raw_scroll_delta.y);
    if scroll == 0.0 {
        return;
    }
    state.scroll_accumulator += scroll;
    let steps = (state.scroll_accumulator / SCROLL_PER_ZOOM_STEP).trunc();
    if steps != 0.0 {
        state.scroll_accumulator -= steps * SCROLL_PER_ZOOM_STEP;
        let anchor = response.hover_pos().unwrap_or(rect.center());
        let zoom = (i32::from(state.view.zoom) + steps as i32).clamp(i32::from(MIN_ZOOM), i32::from(MAX_ZOOM)) as u8;
        state.view.zoom_at(zoom, anchor, rect);
    }
}

/// Nearest tower within the hit radius.
fn tower_at(towers: &[(TowerId, egui::Pos2)], pos: egui::Pos2) -> Option<TowerId> {
    towers
        .iter()
        .map(|(id, p)| (*id, p.distance_sq(pos)))
        .filter(|(_, d2)| *d2 <= TOWER_HIT_RADIUS * TOWER_HIT_RADIUS)
        .min_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(id, _)| id)
}

/// Nearest link within the hit distance.
fn link_at(links: &[(LinkId, egui::Pos2, egui::Pos2)], pos: egui::Pos2) -> Option<LinkId> {
    links
        .iter()
        .map(|(id, a, b)| (*id, distance_to_segment(pos, *a, *b)))
        .filter(|(_, d)| *d <= LINK_HIT_DISTANCE)
        .min_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(id, _)| id)
}

fn distance_to_segment(p: egui::Pos2, a: egui::Pos2, b: egui::Pos2) -> f32 {
    let ab = b - a;
    let len_sq = ab.length_sq();
    if len_sq == 0.0 {
        return p.distance(a);
    }
    let t = ((p - a).dot(ab) / len_sq).clamp(0.0, 1.0);
    p.distance(a + ab * t)
}
