//! Texture cache for downloaded tiles.

use eframe::egui;
use std::collections::{HashMap, VecDeque};

use super::projection::TileKey;

/// Resolved tiles kept before the oldest are dropped.
pub const DEFAULT_TILE_CAPACITY: usize = 512;

pub enum TileSlot {
    Requested,
    Ready(egui::TextureHandle),
    Failed,
}

pub struct TileCache {
    slots: HashMap<TileKey, TileSlot>,
    /// Resolved keys, oldest first.
    resolved: VecDeque<TileKey>,
    capacity: usize,
}

/// Decode PNG/JPEG bytes into an egui image.
pub fn decode_tile(bytes: &[u8]) -> Result<egui::ColorImage, String> {
    let img = image::load_from_memory(bytes).map_err(|e| e.to_string())?;
    let rgba = img.to_rgba8();
    let size = [rgba.width() as usize, rgba.height() as usize];
    let pixels = rgba.as_flat_samples();
    Ok(egui::ColorImage::from_rgba_unmultiplied(size, pixels.as_slice()))
}

impl TileCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            slots: HashMap::new(),
            resolved: VecDeque::new(),
            capacity: capacity.max(1),
        }
    }

    pub fn texture(&self, key: &TileKey) -> Option<&egui::TextureHandle> {
        match self.slots.get(key) {
            Some(TileSlot::Ready(texture)) => Some(texture),
            _ => None,
        }
    }

    /// True when the tile has never been requested (or was evicted).
    pub fn needs_request(&self, key: &TileKey) -> bool {
        !self.slots.contains_key(key)
    }

    pub fn mark_requested(&mut self, key: TileKey) {
        self.slots.insert(key, TileSlot::Requested);
    }

    pub fn insert_loaded(&mut self, ctx: &egui::Context, key: TileKey, bytes: &[u8]) {
        match decode_tile(bytes) {
            Ok(image) => {
                let name = format!("tile-{}-{}-{}", key.zoom, key.x, key.y);
                let texture = ctx.load_texture(name, image, egui::TextureOptions::LINEAR);
                self.resolve(key, TileSlot::Ready(texture));
            }
            Err(e) => {
                log::warn!("Failed to decode tile {}/{}/{}: {}", key.zoom, key.x, key.y, e);
                self.resolve(key, TileSlot::Failed);
            }
        }
    }

    pub fn mark_failed(&mut self, key: TileKey) {
        self.resolve(key, TileSlot::Failed);
    }

    #[cfg(test)]
    pub fn is_failed(&self, key: &TileKey) -> bool {
        matches!(self.slots.get(key), Some(TileSlot::Failed))
    }

    #[cfg(test)]
    pub fn pending_count(&self) -> usize {
        self.slots.values().filter(|s| matches!(s, TileSlot::Requested)).count()
    }

    fn resolve(&mut self, key: TileKey, slot: TileSlot) {
        if self.slots.insert(key, slot).is_some_and(|old| !matches!(old, TileSlot::Requested)) {
            self.resolved.retain(|k| *k != key);
        }
        self.resolved.push_back(key);
        while self.resolved.len() > self.capacity {
            if let Some(oldest) = self.resolved.pop_front() {
                self.slots.remove(&oldest);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn key(x: u32) -> TileKey {
        TileKey { zoom: 4, x, y: 3 }
    }

    fn png_bytes() -> Vec<u8> {
        let img = image::DynamicImage::ImageRgba8(image::RgbaImage::from_pixel(2, 3, image::Rgba([10, 20, 30, 255])));
        let mut buf = Vec::new();
        img.write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png).unwrap();
        buf
    }

    #[test]
    fn decodes_png_tiles() {
        let image = decode_tile(&png_bytes()).unwrap();
        assert_eq!(image.size, [2, 3]);
        assert!(decode_tile(b"not an image").is_err());
    }

    #[test]
    fn decodes_jpeg_tiles() {
        let img = image::DynamicImage::ImageRgb8(image::RgbImage::from_pixel(8, 4, image::Rgb([200, 120, 40])));
        let mut buf = Vec::new();
        img.write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Jpeg).unwrap();
        let image = decode_tile(&buf).unwrap();
        assert_eq!(image.size, [8, 4]);
    }

    #[test]
    fn request_lifecycle() {
        let mut cache = TileCache::new(8);
        assert!(cache.needs_request(&key(1)));
        cache.mark_requested(key(1));
        assert!(!cache.needs_request(&key(1)));
        assert_eq!(cache.pending_count(), 1);

        cache.mark_failed(key(1));
        assert!(cache.is_failed(&key(1)));
        assert!(!cache.needs_request(&key(1)));
        assert_eq!(cache.pending_count(), 0);

        // Failed tiles are not retried
        cache.mark_failed(key(1));
        assert_eq!(cache.pending_count(), 0);
    }

    #[test]
    fn loaded_tiles_become_textures() {
        let ctx = egui::Context::default();
        let mut cache = TileCache::new(8);
        cache.mark_requested(key(1));
        cache.insert_loaded(&ctx, key(1), &png_bytes());
        assert!(cache.texture(&key(1)).is_some());

        cache.mark_requested(key(2));
        cache.insert_loaded(&ctx, key(2), b"garbage");
        assert!(cache.texture(&key(2)).is_none());
        assert!(cache.is_failed(&key(2)));
    }

    #[test]
    fn oldest_resolved_tiles_are_evicted() {
        let mut cache = TileCache::new(2);
        for x in 0..3 {
            cache.mark_requested(key(x));
            cache.mark_failed(key(x));
        }
        assert!(cache.needs_request(&key(0)));
        assert!(cache.is_failed(&key(1)));
        assert!(cache.is_failed(&key(2)));
    }
}
