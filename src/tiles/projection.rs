//! Web Mercator math for the slippy map.
//!
//! World pixel coordinates at zoom `z` span `0..256 * 2^z` on both axes, with
//! the origin at the north-west corner (lng -180, lat ~85.05).

use eframe::egui;
use serde::{Deserialize, Serialize};

use crate::geodesy::LatLng;

pub const TILE_SIZE: f64 = 256.0;
pub const MIN_ZOOM: u8 = 2;
pub const MAX_ZOOM: u8 = 19;
/// Latitude where the Mercator square ends.
pub const MAX_LATITUDE: f64 = 85.051_128_78;

/// Edge length of the world in pixels at `zoom`.
pub fn world_size(zoom: u8) -> f64 {
    TILE_SIZE * f64::from(1u32 << zoom)
}

/// Geographic position to world pixels.
pub fn project(p: LatLng, zoom: u8) -> (f64, f64) {
    let size = world_size(zoom);
    let lat = p.lat.clamp(-MAX_LATITUDE, MAX_LATITUDE).to_radians();
    let x = (p.lng + 180.0) / 360.0 * size;
    let siny = lat.sin();
    let y = (0.5 - ((1.0 + siny) / (1.0 - siny)).ln() / (4.0 * std::f64::consts::PI)) * size;
    (x, y)
}

/// World pixels to geographic position. `y` is clamped to the world and the
/// longitude wrapped into `[-180, 180)`.
pub fn unproject(x: f64, y: f64, zoom: u8) -> LatLng {
    let size = world_size(zoom);
    let y = y.clamp(0.0, size);
    let n = std::f64::consts::PI - 2.0 * std::f64::consts::PI * y / size;
    let lat = n.sinh().atan().to_degrees();
    let lng = (x / size * 360.0).rem_euclid(360.0) - 180.0;
    LatLng::new(lat, lng)
}

/// Address of one raster tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TileKey {
    pub zoom: u8,
    pub x: u32,
    pub y: u32,
}

impl TileKey {
    /// Fill `{z}`, `{x}` and `{y}` in a tile URL template.
    pub fn url(&self, template: &str) -> String {
        template
            .replace("{z}", &self.zoom.to_string())
            .replace("{x}", &self.x.to_string())
            .replace("{y}", &self.y.to_string())
    }
}

/// Map camera: the geographic point at the center of the map rect and the
/// integer zoom level.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MapView {
    pub center: LatLng,
    pub zoom: u8,
}

impl MapView {
    pub fn new(center: LatLng, zoom: u8) -> Self {
        Self {
            center,
            zoom: zoom.clamp(MIN_ZOOM, MAX_ZOOM),
        }
    }

    fn center_px(&self) -> (f64, f64) {
        project(self.center, self.zoom)
    }

    pub fn to_screen(&self, p: LatLng, rect: egui::Rect) -> egui::Pos2 {
        let (cx, cy) = self.center_px();
        let (x, y) = project(p, self.zoom);
        let c = rect.center();
        egui::pos2(c.x + (x - cx) as f32, c.y + (y - cy) as f32)
    }

    pub fn from_screen(&self, pos: egui::Pos2, rect: egui::Rect) -> LatLng {
        let (cx, cy) = self.center_px();
        let c = rect.center();
        unproject(cx + f64::from(pos.x - c.x), cy + f64::from(pos.y - c.y), self.zoom)
    }

    /// Move the camera so content follows a drag of `delta` screen pixels.
    pub fn pan_by(&mut self, delta: egui::Vec2) {
        let (cx, cy) = self.center_px();
        self.center = unproject(cx - f64::from(delta.x), cy - f64::from(delta.y), self.zoom);
    }

    /// Change zoom while keeping the geographic point under `anchor` in place.
    pub fn zoom_at(&mut self, zoom: u8, anchor: egui::Pos2, rect: egui::Rect) {
        let zoom = zoom.clamp(MIN_ZOOM, MAX_ZOOM);
        if zoom == self.zoom {
            return;
        }
        let fixed = self.from_screen(anchor, rect);
        let (fx, fy) = project(fixed, zoom);
        let c = rect.center();
        self.zoom = zoom;
        self.center = unproject(fx - f64::from(anchor.x - c.x), fy - f64::from(anchor.y - c.y), zoom);
    }

    /// Tiles overlapping `rect` with their screen rectangles. Columns wrap
    /// around the antimeridian, rows outside the world are skipped.
    pub fn visible_tiles(&self, rect: egui::Rect) -> Vec<(TileKey, egui::Rect)> {
        let (cx, cy) = self.center_px();
        let half_w = f64::from(rect.width()) / 2.0;
        let half_h = f64::from(rect.height()) / 2.0;
        let tiles_per_axis = 1i64 << self.zoom;

        let first_x = ((cx - half_w) / TILE_SIZE).floor() as i64;
        let last_x = ((cx + half_w) / TILE_SIZE).floor() as i64;
        let first_y = (((cy - half_h) / TILE_SIZE).floor() as i64).max(0);
        let last_y = (((cy + half_h) / TILE_SIZE).floor() as i64).min(tiles_per_axis - 1);

        let center = rect.center();
        let mut tiles = Vec::new();
        for ty in first_y..=last_y {
            for tx in first_x..=last_x {
                let key = TileKey {
                    zoom: self.zoom,
                    x: tx.rem_euclid(tiles_per_axis) as u32,
                    y: ty as u32,
                };
                let min = egui::pos2(
                    center.x + (tx as f64 * TILE_SIZE - cx) as f32,
                    center.y + (ty as f64 * TILE_SIZE - cy) as f32,
                );
                tiles.push((key, egui::Rect::from_min_size(min, egui::vec2(TILE_SIZE as f32, TILE_SIZE as f32))));
            }
        }
        tiles
    }

    /// The deepest view that shows every point inside `size` minus `padding`
    /// on each side, or `None` for an empty slice.
    pub fn fit_bounds(points: &[LatLng], size: egui::Vec2, padding: f32) -> Option<MapView> {
        if points.is_empty() {
            return None;
        }
        let avail_w = f64::from((size.x - 2.0 * padding).max(1.0));
        let avail_h = f64::from((size.y - 2.0 * padding).max(1.0));

        let mut chosen = MIN_ZOOM;
        for zoom in (MIN_ZOOM..=MAX_ZOOM).rev() {
            let (min_x, min_y, max_x, max_y) = bounds_px(points, zoom);
            if max_x - min_x <= avail_w && max_y - min_y <= avail_h {
                chosen = zoom;
                break;
            }
        }
        let (min_x, min_y, max_x, max_y) = bounds_px(points, chosen);
        Some(MapView::new(unproject((min_x + max_x) / 2.0, (min_y + max_y) / 2.0, chosen), chosen))
    }
}

fn bounds_px(points: &[LatLng], zoom: u8) -> (f64, f64, f64, f64) {
    points.iter().map(|p| project(*p, zoom)).fold(
        (f64::INFINITY, f64::INFINITY, f64::NEG_INFINITY, f64::NEG_INFINITY),
        |(min_x, min_y, max_x, max_y), (x, y)| (min_x.min(x), min_y.min(y), max_x.max(x), max_y.max(y)),
    )
}
