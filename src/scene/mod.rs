//! Scene model and its GeoJSON export.
//!
//! - `model`: towers, links, zone cache and the invariants that bind them
//! - `export`: feature-collection serialization

pub mod export;
pub mod model;

pub use export::{default_export_file_name, write_geojson};
pub use model::{LinkId, Scene, TowerId, ZoneCache, ZoneRequest};
