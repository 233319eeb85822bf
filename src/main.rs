use eframe::egui;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use env_logger::Builder;
use log::{LevelFilter, error, info};
use std::thread;

use crate::config::AppConfig;
use crate::elevation::{ElevationProvider, ElevationRequestQueue, OpenElevationClient, UnavailableProvider};
use crate::tiles::{TileClient, TileRequestQueue};
use crate::ui::{AppState, UIRefreshState};

mod config;
mod diagnostics;
mod elevation;
mod fresnel;
mod geodesy;
mod scene;
mod tiles;
mod ui;

const UI_REFRESH_QUEUE_SIZE: usize = 100;
pub type UIRefreshQueue = embassy_sync::channel::Channel<CriticalSectionRawMutex, UIRefreshState, UI_REFRESH_QUEUE_SIZE>;
pub type UIRefreshQueueReceiver = embassy_sync::channel::Receiver<'static, CriticalSectionRawMutex, UIRefreshState, UI_REFRESH_QUEUE_SIZE>;
pub type UIRefreshQueueSender = embassy_sync::channel::Sender<'static, CriticalSectionRawMutex, UIRefreshState, UI_REFRESH_QUEUE_SIZE>;

/// Elevation provider for the worker; a client that cannot be built turns
/// every lookup into a zero-elevation fallback instead of stopping the app.
fn elevation_provider(config: &AppConfig) -> Box<dyn ElevationProvider + Send> {
    match OpenElevationClient::new(config) {
        Ok(client) => Box::new(client),
        Err(reason) => {
            error!("{}", reason);
            Box::new(UnavailableProvider { reason })
        }
    }
}

fn spawn_elevation_worker(config: &AppConfig, jobs: &'static ElevationRequestQueue, ui_refresh_tx: UIRefreshQueueSender, repaint: egui::Context) {
    let provider = elevation_provider(config);
    let spawned = thread::Builder::new()
        .name("elevation-worker".to_string())
        .spawn(move || futures::executor::block_on(elevation::elevation_task(provider, jobs.receiver(), ui_refresh_tx, repaint)));
    if let Err(e) = spawned {
        error!("Failed to start elevation worker: {}", e);
    }
}

/// Start the tile worker. Returns false when tiles stay unavailable.
fn spawn_tile_worker(config: &AppConfig, requests: &'static TileRequestQueue, ui_refresh_tx: UIRefreshQueueSender, repaint: egui::Context) -> bool {
    let client = match TileClient::new(config) {
        Ok(client) => client,
        Err(e) => {
            error!("{}, map tiles disabled", e);
            return false;
        }
    };
    let spacing = embassy_time::Duration::from_millis(config.tile_request_spacing_ms);
    let spawned = thread::Builder::new()
        .name("tile-worker".to_string())
        .spawn(move || futures::executor::block_on(tiles::tile_task(client, requests.receiver(), ui_refresh_tx, repaint, spacing)));
    match spawned {
        Ok(_) => true,
        Err(e) => {
            error!("Failed to start tile worker: {}, map tiles disabled", e);
            false
        }
    }
}

fn main() {
    // Logging setup
    let mut builder = Builder::new();
    builder
        .filter_level(LevelFilter::Info)
        .filter(Some("fresnel_link_planner"), LevelFilter::Debug)
        .parse_default_env();
    if let Err(e) = diagnostics::install(builder) {
        eprintln!("Failed to install logger: {}", e);
    }

    info!("Starting up");

    let (config, config_error) = AppConfig::load_or_default();

    let ui_refresh_channel: &'static UIRefreshQueue = Box::leak(Box::new(UIRefreshQueue::new()));
    let elevation_channel: &'static ElevationRequestQueue = Box::leak(Box::new(ElevationRequestQueue::new()));
    let tile_channel: &'static TileRequestQueue = Box::leak(Box::new(TileRequestQueue::new()));

    let native_options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default().with_inner_size([1400.0, 900.0]).with_title("Fresnel Link Planner"),
        ..Default::default()
    };
    let result = eframe::run_native(
        "Fresnel Link Planner",
        native_options,
        Box::new(move |cc| {
            spawn_elevation_worker(&config, elevation_channel, ui_refresh_channel.sender(), cc.egui_ctx.clone());
            let tiles_running = config.tiles_enabled && spawn_tile_worker(&config, tile_channel, ui_refresh_channel.sender(), cc.egui_ctx.clone());
            let tile_tx = tiles_running.then(|| tile_channel.sender());
            Ok(Box::new(AppState::new(
                config,
                config_error,
                ui_refresh_channel.receiver(),
                elevation_channel.sender(),
                tile_tx,
                cc.storage,
            )))
        }),
    );
    if let Err(e) = result {
        error!("Application error: {}", e);
    }
}
