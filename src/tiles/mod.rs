//! OpenStreetMap-style basemap.
//!
//! - `projection`: Web Mercator math and the map camera
//! - `client`: blocking HTTP tile downloads
//! - `task`: background worker feeding tiles to the UI
//! - `cache`: decoded tile textures

pub mod cache;
pub mod client;
pub mod projection;
pub mod task;

pub use cache::{DEFAULT_TILE_CAPACITY, TileCache};
pub use client::TileClient;
pub use projection::{MapView, TileKey};
pub use task::{TileRequestQueue, TileRequestQueueSender, tile_task};
