//! # Application State Management
//!
//! This module implements the central `AppState` struct which owns the scene
//! and all UI state, and coordinates the rendering of all UI components. It
//! implements the `eframe::App` trait to integrate with the egui application
//! framework.
//!
//! ## Responsibilities
//!
//! - Owns the `Scene` and is the only place it is mutated
//! - Processes worker results from `ui_refresh_rx` (zones, tiles)
//! - Sends zone jobs to the elevation worker and tile requests to the tile worker
//! - Applies the `UiAction`s the panels and the map produce each frame
//! - Persists user settings (map view, default frequency, export directory)
//!
//! ## Frame Cycle
//!
//! Each frame drains the worker channel, renders the panels, which push
//! actions into a list instead of mutating the scene, and then applies those
//! actions in order.

use eframe::egui;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

use super::{UIRefreshState, UiAction};
use crate::config::AppConfig;
use crate::diagnostics::{self, DiagnosticEntry};
use crate::elevation::{ElevationRequestQueueSender, ZoneJob};
use crate::fresnel::FresnelZone;
use crate::geodesy::LatLng;
use crate::scene::{self, LinkId, Scene, TowerId, ZoneCache};
use crate::tiles::{DEFAULT_TILE_CAPACITY, MapView, TileCache, TileRequestQueueSender};

/// Diagnostics entries kept for the Diagnostics tab.
const DIAGNOSTICS_HISTORY: usize = 500;

const SETTINGS_KEY: &str = "app_settings";

/// Currently selected tab in the side panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SideTab {
    #[default]
    Scene,
    Fresnel,
    Diagnostics,
}

/// Text buffers of the tower editor. The frequency stays text until saved so
/// unparsable input can fall back to the previous value.
#[derive(Debug, Clone, PartialEq)]
pub struct TowerEditor {
    pub id: TowerId,
    pub name: String,
    pub frequency_text: String,
}

/// Central application state.
pub struct AppState {
    /// Optional alert message to display in a modal dialog.
    pub alert: Option<String>,
    /// Receiver for worker results.
    pub ui_refresh_rx: crate::UIRefreshQueueReceiver,
    /// Sender for zone jobs to the elevation worker.
    pub elevation_tx: ElevationRequestQueueSender,
    /// Sender for tile downloads; `None` when tiles are disabled.
    pub tile_tx: Option<TileRequestQueueSender>,
    pub config: AppConfig,

    pub scene: Scene,
    /// The link whose zone is shown (or being computed).
    pub active_zone: Option<LinkId>,
    /// Set when a zone is requested; the map fits the view once it is ready.
    pub fit_to_zone: bool,

    // Interaction state
    pub editor: Option<TowerEditor>,
    /// First tower of a connect gesture.
    pub connecting_from: Option<TowerId>,
    /// Tower being dragged and its preview position.
    pub dragging: Option<(TowerId, LatLng)>,
    /// Scroll distance not yet turned into a zoom step.
    pub scroll_accumulator: f32,
    /// Frequency given to newly placed towers.
    pub default_frequency_ghz: f64,
    pub side_tab: SideTab,

    // Map
    pub view: MapView,
    pub tiles: TileCache,

    pub diagnostics: VecDeque<DiagnosticEntry>,

    // Persistence
    pub last_export_dir: Option<String>,
    pub side_panel_width: f32,
}

/// Settings persisted across application sessions. The scene is not.
#[derive(Default, Serialize, Deserialize)]
struct PersistedSettings {
    view: Option<MapView>,
    default_frequency_ghz: Option<f64>,
    last_export_dir: Option<String>,
    side_panel_width: Option<f32>,
}

/// Parse the editor's frequency field. Anything that is not a number becomes
/// NaN, which the scene rejects in favour of the previous frequency.
pub fn parse_frequency(text: &str) -> f64 {
    text.trim().parse::<f64>().unwrap_or(f64::NAN)
}

impl AppState {
    /// Create a new AppState, loading persisted settings if available.
    ///
    /// # Parameters
    ///
    /// * `config` - Loaded configuration
    /// * `startup_alert` - Message to show immediately (e.g. a config error)
    /// * `rx` - Receiver for worker results
    /// * `elevation_tx` - Sender for zone jobs
    /// * `tile_tx` - Sender for tile requests, if tiles are enabled
    /// * `storage` - Optional persistent storage for loading saved settings
    pub fn new(
        config: AppConfig,
        startup_alert: Option<String>,
        rx: crate::UIRefreshQueueReceiver,
        elevation_tx: ElevationRequestQueueSender,
        tile_tx: Option<TileRequestQueueSender>,
        storage: Option<&dyn eframe::Storage>,
    ) -> Self {
        let persisted: PersistedSettings = storage.and_then(|s| eframe::get_value(s, SETTINGS_KEY)).unwrap_or_default();

        let view = persisted
            .view
            .map(|v| MapView::new(v.center, v.zoom))
            .unwrap_or_else(|| MapView::new(config.initial_center(), config.initial_zoom));
        let default_frequency_ghz = persisted
            .default_frequency_ghz
            .filter(|f| f.is_finite() && *f > 0.0)
            .unwrap_or(config.default_frequency_ghz);

        Self {
            alert: startup_alert,
            ui_refresh_rx: rx,
            elevation_tx,
            tile_tx,
            config,
            scene: Scene::new(),
            active_zone: None,
            fit_to_zone: false,
            editor: None,
            connecting_from: None,
            dragging: None,
            scroll_accumulator: 0.0,
            default_frequency_ghz,
            side_tab: SideTab::default(),
            view,
            tiles: TileCache::new(DEFAULT_TILE_CAPACITY),
            diagnostics: VecDeque::new(),
            last_export_dir: persisted.last_export_dir,
            side_panel_width: persisted.side_panel_width.unwrap_or(360.0),
        }
    }

    /// Position to draw a tower at, following an ongoing drag.
    pub fn tower_position(&self, id: TowerId) -> Option<LatLng> {
        match self.dragging {
            Some((dragged, position)) if dragged == id => Some(position),
            _ => self.scene.tower(id).map(|t| t.position),
        }
    }

    /// The shown zone, once it has been computed.
    pub fn active_zone(&self) -> Option<&FresnelZone> {
        let link = self.scene.link(self.active_zone?)?;
        match link.zone() {
            ZoneCache::Ready(zone) => Some(zone),
            _ => None,
        }
    }

    /// Apply one user action to the scene and the interaction state.
    pub fn apply(&mut self, action: UiAction) {
        match action {
            UiAction::PlaceTower(position) => {
                let id = self.scene.add_tower(position, self.default_frequency_ghz);
                log::debug!("Placed tower {} at {:.5}, {:.5}", id, position.lat, position.lng);
            }
            UiAction::MoveTower(id, position) => {
                if self.scene.update_tower_position(id, position) {
                    self.forget_discarded_zone();
                }
            }
            UiAction::TowerClicked(id) => match self.connecting_from {
                Some(from) if from != id => self.connect(from, id),
                _ => self.open_editor(id),
            },
            UiAction::EditTower(id) => self.open_editor(id),
            UiAction::SaveTower { id, name, frequency_text } => {
                self.scene.update_tower_attributes(id, &name, parse_frequency(&frequency_text));
                self.open_editor(id);
            }
            UiAction::CloseEditor => self.editor = None,
            UiAction::DeleteTower(id) => {
                if self.scene.remove_tower(id) {
                    if self.editor.as_ref().is_some_and(|e| e.id == id) {
                        self.editor = None;
                    }
                    if self.connecting_from == Some(id) {
                        self.connecting_from = None;
                    }
                    if self.active_zone.is_some_and(|l| self.scene.link(l).is_none()) {
                        self.active_zone = None;
                    }
                }
            }
            UiAction::BeginConnect(id) => {
                if self.scene.tower(id).is_some() {
                    self.connecting_from = Some(id);
                }
            }
            UiAction::CancelConnect => self.connecting_from = None,
            UiAction::DeleteLink(id) => {
                if self.scene.remove_link(id) && self.active_zone == Some(id) {
                    self.active_zone = None;
                }
            }
            UiAction::ShowZone(id) => self.request_zone(id),
            UiAction::HideZone => {
                if let Some(id) = self.active_zone.take() {
                    self.scene.reset_zone(id);
                }
            }
            UiAction::ClearScene => {
                self.scene.clear();
                self.editor = None;
                self.connecting_from = None;
                self.dragging = None;
                self.active_zone = None;
                log::info!("Scene cleared");
            }
            UiAction::ExportScene => self.export_scene(),
        }
    }

    fn open_editor(&mut self, id: TowerId) {
        self.editor = self.scene.tower(id).map(|t| TowerEditor {
            id,
            name: t.name.clone(),
            frequency_text: t.frequency_ghz.to_string(),
        });
    }

    /// Finish a connect gesture. Mismatched or duplicate pairs end the gesture
    /// without a link.
    fn connect(&mut self, from: TowerId, to: TowerId) {
        self.connecting_from = None;
        if let Some(link) = self.scene.add_link(from, to) {
            log::info!("Linked {} and {} as {}", from, to, link);
        }
    }

    /// Show the zone of `id`, hiding any other zone, and queue its computation.
    fn request_zone(&mut self, id: LinkId) {
        let others: Vec<LinkId> = self.scene.links().iter().map(|l| l.id).filter(|l| *l != id).collect();
        for other in others {
            self.scene.reset_zone(other);
        }

        let Some(request) = self.scene.begin_zone_request(id) else {
            return;
        };
        let job = ZoneJob {
            request,
            resolution: self.config.sample_resolution,
        };
        match self.elevation_tx.try_send(job) {
            Ok(()) => {
                self.active_zone = Some(id);
                self.fit_to_zone = true;
            }
            Err(_) => {
                log::warn!("Elevation queue is full, zone request for link {} dropped", id);
                self.scene.reset_zone(id);
                self.active_zone = None;
            }
        }
    }

    /// After an endpoint move the active zone may have been discarded.
    fn forget_discarded_zone(&mut self) {
        if let Some(id) = self.active_zone {
            if self.scene.link(id).is_none_or(|l| matches!(l.zone(), ZoneCache::Empty)) {
                self.active_zone = None;
            }
        }
    }

    /// Ask for a file name and write the scene as GeoJSON.
    fn export_scene(&mut self) {
        let mut dialog = rfd::FileDialog::new()
            .add_filter("GeoJSON", &["geojson", "json"])
            .set_file_name(scene::default_export_file_name(chrono::Local::now()));
        if let Some(dir) = &self.last_export_dir {
            dialog = dialog.set_directory(dir);
        }
        let Some(path) = dialog.save_file() else {
            return;
        };
        if let Some(parent) = path.parent() {
            self.last_export_dir = Some(parent.to_string_lossy().to_string());
        }
        if let Err(e) = scene::write_geojson(&self.scene, &path) {
            log::error!("{:#}", e);
            self.alert = Some(format!("Export failed: {:#}", e));
        }
    }

    /// Drain worker results.
    pub fn process_refresh(&mut self, ctx: &egui::Context) {
        while let Ok(msg) = self.ui_refresh_rx.try_receive() {
            match msg {
                UIRefreshState::ZoneComputed { link_id, generation, zone } => {
                    if self.scene.complete_zone(link_id, generation, zone) {
                        log::debug!("Zone for link {} stored", link_id);
                    } else {
                        log::debug!("Dropping superseded zone for link {} (generation {})", link_id, generation);
                    }
                }
                UIRefreshState::TileLoaded { key, bytes } => self.tiles.insert_loaded(ctx, key, &bytes),
                UIRefreshState::TileFailed(key) => self.tiles.mark_failed(key),
            }
        }
    }

    fn collect_diagnostics(&mut self) {
        self.diagnostics.extend(diagnostics::drain_captured());
        while self.diagnostics.len() > DIAGNOSTICS_HISTORY {
            self.diagnostics.pop_front();
        }
    }
}

impl eframe::App for AppState {
    fn save(&mut self, storage: &mut dyn eframe::Storage) {
        let settings = PersistedSettings {
            view: Some(self.view),
            default_frequency_ghz: Some(self.default_frequency_ghz),
            last_export_dir: self.last_export_dir.clone(),
            side_panel_width: Some(self.side_panel_width),
        };
        eframe::set_value(storage, SETTINGS_KEY, &settings);
    }

    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.process_refresh(ctx);
        self.collect_diagnostics();

        if let Some(message) = self.alert.clone() {
            egui::Window::new("Alert")
                .collapsible(false)
                .resizable(false)
                .anchor(egui::Align2::CENTER_CENTER, egui::vec2(0.0, 0.0))
                .show(ctx, |ui| {
                    ui.vertical_centered(|ui| {
                        ui.add_space(20.0);
                        ui.label(message);
                        ui.add_space(20.0);

                        if ui.button("OK").clicked() {
                            self.alert = None;
                        }
                        ui.add_space(10.0);
                    });
                });
        }

        let mut actions = Vec::new();
        if self.connecting_from.is_some() && ctx.input(|i| i.key_pressed(egui::Key::Escape)) {
            actions.push(UiAction::CancelConnect);
        }

        // Panels layout: top (fixed), side (resizable), map fills the remaining using CentralPanel
        super::top_panel::render(ctx, self, &mut actions);
        super::side_panel::render(ctx, self, &mut actions);
        super::map::render(ctx, self, &mut actions);

        for action in actions {
            self.apply(action);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::elevation::ElevationRequestQueue;
    use crate::fresnel::{self, ElevationProfile};

    struct Harness {
        state: AppState,
        jobs: &'static ElevationRequestQueue,
        refresh: &'static crate::UIRefreshQueue,
    }

    fn harness() -> Harness {
        let refresh: &'static crate::UIRefreshQueue = Box::leak(Box::new(crate::UIRefreshQueue::new()));
        let jobs: &'static ElevationRequestQueue = Box::leak(Box::new(ElevationRequestQueue::new()));
        let config = AppConfig {
            sample_resolution: 20,
            ..AppConfig::default()
        };
        let state = AppState::new(config, None, refresh.receiver(), jobs.sender(), None, None);
        Harness { state, jobs, refresh }
    }

    fn place(state: &mut AppState, lat: f64, lng: f64) -> TowerId {
        state.apply(UiAction::PlaceTower(LatLng::new(lat, lng)));
        state.scene.towers().last().unwrap().id
    }

    fn linked(state: &mut AppState) -> (TowerId, TowerId, LinkId) {
        let a = place(state, 0.0, 0.0);
        let b = place(state, 0.0, 0.1);
        state.apply(UiAction::BeginConnect(a));
        state.apply(UiAction::TowerClicked(b));
        (a, b, state.scene.links()[0].id)
    }

    #[test]
    fn placed_towers_use_the_default_frequency() {
        let mut h = harness();
        h.state.default_frequency_ghz = 2.4;
        place(&mut h.state, 10.0, 20.0);
        let tower = &h.state.scene.towers()[0];
        assert_eq!(tower.name, "Tower 1");
        assert_eq!(tower.frequency_ghz, 2.4);
    }

    #[test]
    fn connect_gesture_links_two_towers() {
        let mut h = harness();
        let (a, b, _) = linked(&mut h.state);
        assert_eq!(h.state.scene.links().len(), 1);
        assert!(h.state.scene.links()[0].joins(a, b));
        assert_eq!(h.state.connecting_from, None);
    }

    #[test]
    fn rejected_connect_ends_the_gesture_silently() {
        let mut h = harness();
        let a = place(&mut h.state, 0.0, 0.0);
        h.state.default_frequency_ghz = 2.4;
        let b = place(&mut h.state, 0.0, 0.1);
        h.state.apply(UiAction::BeginConnect(a));
        h.state.apply(UiAction::TowerClicked(b));
        assert!(h.state.scene.links().is_empty());
        assert_eq!(h.state.connecting_from, None);
        assert!(h.state.alert.is_none());
    }

    #[test]
    fn clicking_a_tower_opens_its_editor() {
        let mut h = harness();
        let a = place(&mut h.state, 0.0, 0.0);
        h.state.apply(UiAction::TowerClicked(a));
        let editor = h.state.editor.clone().unwrap();
        assert_eq!(editor.id, a);
        assert_eq!(editor.name, "Tower 1");
        assert_eq!(editor.frequency_text, "5");

        // Clicking the tower a connect gesture started from does not link it to itself
        h.state.apply(UiAction::BeginConnect(a));
        h.state.apply(UiAction::TowerClicked(a));
        assert!(h.state.scene.links().is_empty());
    }

    #[test]
    fn saving_invalid_editor_values_keeps_previous_attributes() {
        let mut h = harness();
        let a = place(&mut h.state, 0.0, 0.0);
        h.state.apply(UiAction::SaveTower {
            id: a,
            name: "Ridge".to_string(),
            frequency_text: "5.8".to_string(),
        });
        h.state.apply(UiAction::SaveTower {
            id: a,
            name: "   ".to_string(),
            frequency_text: "fast".to_string(),
        });
        let tower = h.state.scene.tower(a).unwrap();
        assert_eq!(tower.name, "Ridge");
        assert_eq!(tower.frequency_ghz, 5.8);
        assert_eq!(h.state.editor.as_ref().unwrap().frequency_text, "5.8");
    }

    #[test]
    fn show_zone_queues_one_job_with_configured_resolution() {
        let mut h = harness();
        let (_, _, link) = linked(&mut h.state);
        h.state.apply(UiAction::ShowZone(link));
        assert_eq!(h.state.active_zone, Some(link));
        assert!(h.state.fit_to_zone);
        assert!(h.state.scene.is_zone_pending());

        let job = h.jobs.try_receive().unwrap();
        assert_eq!(job.request.link_id, link);
        assert_eq!(job.resolution, 20);
        assert!(h.jobs.try_receive().is_err());
    }

    #[test]
    fn computed_zone_is_stored_and_shown() {
        let mut h = harness();
        let (_, _, link) = linked(&mut h.state);
        h.state.apply(UiAction::ShowZone(link));
        let job = h.jobs.try_receive().unwrap();

        let path = fresnel::sample_path(job.request.a, job.request.b, job.resolution);
        let zone = fresnel::compute_zone(job.request.a, job.request.b, job.request.frequency_ghz, &path, &ElevationProfile::zeros(path.len()));
        h.refresh
            .try_send(UIRefreshState::ZoneComputed {
                link_id: link,
                generation: job.request.generation,
                zone,
            })
            .unwrap();
        h.state.process_refresh(&egui::Context::default());

        let shown = h.state.active_zone().unwrap();
        assert_eq!(shown.samples.len(), 21);
    }

    #[test]
    fn moving_an_endpoint_discards_the_in_flight_zone() {
        let mut h = harness();
        let (a, _, link) = linked(&mut h.state);
        h.state.apply(UiAction::ShowZone(link));
        let job = h.jobs.try_receive().unwrap();

        h.state.apply(UiAction::MoveTower(a, LatLng::new(0.05, 0.0)));
        assert_eq!(h.state.active_zone, None);

        let path = fresnel::sample_path(job.request.a, job.request.b, job.resolution);
        let zone = fresnel::compute_zone(job.request.a, job.request.b, job.request.frequency_ghz, &path, &ElevationProfile::zeros(path.len()));
        h.refresh
            .try_send(UIRefreshState::ZoneComputed {
                link_id: link,
                generation: job.request.generation,
                zone,
            })
            .unwrap();
        h.state.process_refresh(&egui::Context::default());
        assert!(matches!(h.state.scene.link(link).unwrap().zone(), ZoneCache::Empty));
    }

    #[test]
    fn showing_a_zone_hides_the_others() {
        let mut h = harness();
        let (_, b, first) = linked(&mut h.state);
        let c = place(&mut h.state, 0.1, 0.1);
        h.state.apply(UiAction::BeginConnect(b));
        h.state.apply(UiAction::TowerClicked(c));
        let second = h.state.scene.links()[1].id;

        h.state.apply(UiAction::ShowZone(first));
        h.state.apply(UiAction::ShowZone(second));
        assert_eq!(h.state.active_zone, Some(second));
        assert!(matches!(h.state.scene.link(first).unwrap().zone(), ZoneCache::Empty));
        assert!(matches!(h.state.scene.link(second).unwrap().zone(), ZoneCache::Pending { .. }));
    }

    #[test]
    fn deleting_a_tower_resets_dependent_ui_state() {
        let mut h = harness();
        let (a, _, link) = linked(&mut h.state);
        h.state.apply(UiAction::ShowZone(link));
        h.state.apply(UiAction::EditTower(a));
        h.state.apply(UiAction::BeginConnect(a));

        h.state.apply(UiAction::DeleteTower(a));
        assert!(h.state.scene.links().is_empty());
        assert_eq!(h.state.editor, None);
        assert_eq!(h.state.connecting_from, None);
        assert_eq!(h.state.active_zone, None);
    }

    #[test]
    fn clear_scene_resets_everything() {
        let mut h = harness();
        let (a, _, link) = linked(&mut h.state);
        h.state.apply(UiAction::ShowZone(link));
        h.state.apply(UiAction::EditTower(a));
        h.state.apply(UiAction::ClearScene);
        assert!(h.state.scene.towers().is_empty());
        assert!(h.state.scene.links().is_empty());
        assert_eq!(h.state.editor, None);
        assert_eq!(h.state.active_zone, None);
    }

    #[test]
    fn frequency_text_parsing() {
        assert_eq!(parse_frequency(" 2.4 "), 2.4);
        assert!(parse_frequency("").is_nan());
        assert!(parse_frequency("5 GHz").is_nan());
    }
}
