//! In-memory towers and links.
//!
//! The [`Scene`] owns both collections and is the only place that mutates
//! them, so every public operation leaves these invariants intact:
//! - tower ids are unique and never reused within a session
//! - both endpoints of every link resolve to live towers
//! - at most one link per unordered tower pair, never a self-link
//! - a cached zone never outlives a move of either endpoint
//!
//! Requests against unknown ids are no-ops. Rejected link attempts leave the
//! scene untouched and are only reported at debug level.

use serde::{Serialize, Serializer};
use std::fmt;

use crate::fresnel::FresnelZone;
use crate::geodesy::{self, LatLng};

/// Maximum frequency difference (GHz) for two towers to be linked.
pub const FREQUENCY_TOLERANCE_GHZ: f64 = 1e-6;

/// Frequency used when a caller supplies something that is not a positive number.
pub const DEFAULT_FREQUENCY_GHZ: f64 = 5.0;

/// Tower identifier, shown and exported as `T<n>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TowerId(u32);

/// Link identifier, shown and exported as `L<n>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LinkId(u32);

impl fmt::Display for TowerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "T{}", self.0)
    }
}

impl fmt::Display for LinkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "L{}", self.0)
    }
}

// The prefixes keep tower and link ids distinct within one exported document
impl Serialize for TowerId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl Serialize for LinkId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Tower {
    pub id: TowerId,
    pub name: String,
    pub position: LatLng,
    pub frequency_ghz: f64,
}

/// Derived zone geometry for a link.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum ZoneCache {
    /// Never computed, or discarded after an endpoint moved.
    #[default]
    Empty,
    /// A computation for `generation` is in flight.
    Pending { generation: u64 },
    Ready(FresnelZone),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Link {
    pub id: LinkId,
    pub a: TowerId,
    pub b: TowerId,
    /// Frequency shared by both endpoints when the link was created.
    pub frequency_ghz: f64,
    zone: ZoneCache,
}

impl Link {
    pub fn zone(&self) -> &ZoneCache {
        &self.zone
    }

    pub fn connects(&self, tower: TowerId) -> bool {
        self.a == tower || self.b == tower
    }

    /// True if the link joins `x` and `y` in either order.
    pub fn joins(&self, x: TowerId, y: TowerId) -> bool {
        (self.a == x && self.b == y) || (self.a == y && self.b == x)
    }
}

/// Snapshot of everything a zone computation needs, taken when it starts.
#[derive(Debug, Clone, PartialEq)]
pub struct ZoneRequest {
    pub link_id: LinkId,
    pub generation: u64,
    pub a: LatLng,
    pub b: LatLng,
    pub frequency_ghz: f64,
}

#[derive(Debug, Default)]
pub struct Scene {
    towers: Vec<Tower>,
    links: Vec<Link>,
    next_tower_id: u32,
    next_link_id: u32,
    next_generation: u64,
}

fn valid_frequency(frequency_ghz: f64) -> bool {
    frequency_ghz.is_finite() && frequency_ghz > 0.0
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn towers(&self) -> &[Tower] {
        &self.towers
    }

    pub fn links(&self) -> &[Link] {
        &self.links
    }

    pub fn tower(&self, id: TowerId) -> Option<&Tower> {
        self.towers.iter().find(|t| t.id == id)
    }

    pub fn link(&self, id: LinkId) -> Option<&Link> {
        self.links.iter().find(|l| l.id == id)
    }

    /// Both endpoint towers of a link.
    pub fn link_endpoints(&self, id: LinkId) -> Option<(&Tower, &Tower)> {
        let link = self.link(id)?;
        Some((self.tower(link.a)?, self.tower(link.b)?))
    }

    /// Great-circle length of a link in meters.
    pub fn link_length(&self, id: LinkId) -> Option<f64> {
        let (a, b) = self.link_endpoints(id)?;
        Some(geodesy::distance(a.position, b.position))
    }

    /// Place a new tower named `Tower N`, N being the tower count after insertion.
    pub fn add_tower(&mut self, position: LatLng, frequency_ghz: f64) -> TowerId {
        self.next_tower_id += 1;
        let id = TowerId(self.next_tower_id);
        let frequency_ghz = if valid_frequency(frequency_ghz) { frequency_ghz } else { DEFAULT_FREQUENCY_GHZ };
        self.towers.push(Tower {
            id,
            name: format!("Tower {}", self.towers.len() + 1),
            position,
            frequency_ghz,
        });
        log::debug!("Added tower {} at ({:.5}, {:.5})", id, position.lat, position.lng);
        id
    }

    /// Remove a tower and every link that references it.
    pub fn remove_tower(&mut self, id: TowerId) -> bool {
        let before = self.towers.len();
        self.towers.retain(|t| t.id != id);
        if self.towers.len() == before {
            return false;
        }
        let links_before = self.links.len();
        self.links.retain(|l| !l.connects(id));
        log::debug!("Removed tower {} and {} incident link(s)", id, links_before - self.links.len());
        true
    }

    /// Link two towers. Returns `None` without touching the scene if either id
    /// is unknown, the ids are equal, the pair is already linked, or the
    /// frequencies differ by more than [`FREQUENCY_TOLERANCE_GHZ`].
    pub fn add_link(&mut self, a: TowerId, b: TowerId) -> Option<LinkId> {
        if a == b {
            log::debug!("Link rejected: {} cannot link to itself", a);
            return None;
        }
        let (Some(tower_a), Some(tower_b)) = (self.tower(a), self.tower(b)) else {
            log::debug!("Link rejected: {} or {} does not exist", a, b);
            return None;
        };
        if (tower_a.frequency_ghz - tower_b.frequency_ghz).abs() > FREQUENCY_TOLERANCE_GHZ {
            log::debug!(
                "Link rejected: frequency mismatch {} GHz vs {} GHz",
                tower_a.frequency_ghz,
                tower_b.frequency_ghz
            );
            return None;
        }
        if self.links.iter().any(|l| l.joins(a, b)) {
            log::debug!("Link rejected: {} and {} are already linked", a, b);
            return None;
        }

        let frequency_ghz = tower_a.frequency_ghz;
        self.next_link_id += 1;
        let id = LinkId(self.next_link_id);
        self.links.push(Link {
            id,
            a,
            b,
            frequency_ghz,
            zone: ZoneCache::Empty,
        });
        log::debug!("Added link {} between {} and {} at {} GHz", id, a, b, frequency_ghz);
        Some(id)
    }

    pub fn remove_link(&mut self, id: LinkId) -> bool {
        let before = self.links.len();
        self.links.retain(|l| l.id != id);
        self.links.len() != before
    }

    /// Move a tower. Cached or pending zones of its links are discarded.
    pub fn update_tower_position(&mut self, id: TowerId, position: LatLng) -> bool {
        let Some(tower) = self.towers.iter_mut().find(|t| t.id == id) else {
            return false;
        };
        tower.position = position;
        for link in self.links.iter_mut().filter(|l| l.connects(id)) {
            link.zone = ZoneCache::Empty;
        }
        true
    }

    /// Apply an edit from the tower editor.
    ///
    /// An empty (or whitespace-only) name keeps the current name, and a
    /// frequency that is not a finite positive number keeps the current
    /// frequency. Existing links keep the frequency they were created with.
    pub fn update_tower_attributes(&mut self, id: TowerId, name: &str, frequency_ghz: f64) -> bool {
        let Some(tower) = self.towers.iter_mut().find(|t| t.id == id) else {
            return false;
        };
        let name = name.trim();
        if !name.is_empty() {
            tower.name = name.to_string();
        }
        if valid_frequency(frequency_ghz) {
            tower.frequency_ghz = frequency_ghz;
        }
        true
    }

    /// Start a zone computation: snapshot the endpoints and frequency and mark
    /// the link pending under a fresh generation. Any earlier pending or cached
    /// result for the link is superseded.
    pub fn begin_zone_request(&mut self, id: LinkId) -> Option<ZoneRequest> {
        let (a, b) = {
            let (a, b) = self.link_endpoints(id)?;
            (a.position, b.position)
        };
        self.next_generation += 1;
        let generation = self.next_generation;
        let link = self.links.iter_mut().find(|l| l.id == id)?;
        link.zone = ZoneCache::Pending { generation };
        Some(ZoneRequest {
            link_id: id,
            generation,
            a,
            b,
            frequency_ghz: link.frequency_ghz,
        })
    }

    /// Store a finished zone if the link still waits for exactly this
    /// generation. Stale results (link removed, endpoint moved, or a newer
    /// request started) are dropped and `false` is returned.
    pub fn complete_zone(&mut self, id: LinkId, generation: u64, zone: FresnelZone) -> bool {
        let Some(link) = self.links.iter_mut().find(|l| l.id == id) else {
            return false;
        };
        if matches!(link.zone, ZoneCache::Pending { generation: waiting } if waiting == generation) {
            link.zone = ZoneCache::Ready(zone);
            true
        } else {
            log::debug!("Dropped stale zone for link {} (generation {})", id, generation);
            false
        }
    }

    /// Forget a pending or cached zone, e.g. when its request could not be queued.
    pub fn reset_zone(&mut self, id: LinkId) {
        if let Some(link) = self.links.iter_mut().find(|l| l.id == id) {
            link.zone = ZoneCache::Empty;
        }
    }

    pub fn is_zone_pending(&self) -> bool {
        self.links.iter().any(|l| matches!(l.zone, ZoneCache::Pending { .. }))
    }

    /// Remove every tower and link. Id counters keep running.
    pub fn clear(&mut self) {
        self.towers.clear();
        self.links.clear();
    }
}
