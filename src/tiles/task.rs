//! Background tile downloader.

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_time::{Duration, Timer};

use super::client::TileClient;
use super::projection::TileKey;
use crate::ui::UIRefreshState;

pub const TILE_QUEUE_SIZE: usize = 64;
pub type TileRequestQueue = embassy_sync::channel::Channel<CriticalSectionRawMutex, TileKey, TILE_QUEUE_SIZE>;
pub type TileRequestQueueReceiver = embassy_sync::channel::Receiver<'static, CriticalSectionRawMutex, TileKey, TILE_QUEUE_SIZE>;
pub type TileRequestQueueSender = embassy_sync::channel::Sender<'static, CriticalSectionRawMutex, TileKey, TILE_QUEUE_SIZE>;

/// Download requested tiles one at a time, pausing `spacing` between
/// requests to stay within tile server usage policies.
pub async fn tile_task(
    client: TileClient,
    requests: TileRequestQueueReceiver,
    ui_refresh_tx: crate::UIRefreshQueueSender,
    repaint: eframe::egui::Context,
    spacing: Duration,
) {
    log::info!("Tile worker started");
    loop {
        let key = requests.receive().await;
        let message = match client.fetch(key) {
            Ok(bytes) => UIRefreshState::TileLoaded { key, bytes },
            Err(e) => {
                log::warn!("{}", e);
                UIRefreshState::TileFailed(key)
            }
        };
        ui_refresh_tx.send(message).await;
        repaint.request_repaint();
        Timer::after(spacing).await;
    }
}
