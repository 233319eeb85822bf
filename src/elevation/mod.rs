//! Elevation lookups for zone computations.
//!
//! - `client`: provider trait, HTTP client and graceful fallback
//! - `task`: background worker serving zone requests from the UI

pub mod client;
pub mod task;

pub use client::{ElevationProvider, OpenElevationClient, UnavailableProvider};
pub use task::{ElevationRequestQueue, ElevationRequestQueueSender, ZoneJob, elevation_task};
