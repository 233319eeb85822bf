//! Background worker that turns zone requests into finished zones.
//!
//! The UI thread queues a [`ZoneJob`] per "show zone" gesture. The worker
//! drains everything queued so far and keeps only the newest job, since showing
//! a zone discards every other link's zone. It then fetches one elevation batch
//! and computes the envelope from the snapshot the job carries. Results go back as `UIRefreshState::ZoneComputed`; the scene
//! decides whether the generation is still current.

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_time::Instant;

use super::client::{ElevationProvider, fetch_profile};
use crate::fresnel::{self, FresnelZone};
use crate::scene::ZoneRequest;
use crate::ui::UIRefreshState;

/// Depth of the UI → elevation worker channel.
pub const ELEVATION_QUEUE_SIZE: usize = 16;
pub type ElevationRequestQueue = embassy_sync::channel::Channel<CriticalSectionRawMutex, ZoneJob, ELEVATION_QUEUE_SIZE>;
pub type ElevationRequestQueueReceiver = embassy_sync::channel::Receiver<'static, CriticalSectionRawMutex, ZoneJob, ELEVATION_QUEUE_SIZE>;
pub type ElevationRequestQueueSender = embassy_sync::channel::Sender<'static, CriticalSectionRawMutex, ZoneJob, ELEVATION_QUEUE_SIZE>;

/// One zone computation to run in the background.
#[derive(Debug, Clone, PartialEq)]
pub struct ZoneJob {
    pub request: ZoneRequest,
    /// Number of path segments to sample.
    pub resolution: usize,
}

/// Keep only the newest of the queued jobs. Older ones are superseded
/// whichever link they belong to.
pub fn coalesce(jobs: Vec<ZoneJob>) -> Option<ZoneJob> {
    jobs.into_iter().last()
}

/// Sample the path, fetch its elevations and build the zone.
pub fn compute_job(provider: &dyn ElevationProvider, job: &ZoneJob) -> FresnelZone {
    let request = &job.request;
    let path = fresnel::sample_path(request.a, request.b, job.resolution);
    let profile = fetch_profile(provider, &path);
    fresnel::compute_zone(request.a, request.b, request.frequency_ghz, &path, &profile)
}

/// Worker loop. Runs until the process exits.
///
/// # Parameters
///
/// * `provider` - Elevation source, normally [`super::OpenElevationClient`]
/// * `jobs` - Receiver for zone jobs from the UI
/// * `ui_refresh_tx` - Channel for finished zones
/// * `repaint` - egui context, poked after each result so the UI wakes up
pub async fn elevation_task(
    provider: Box<dyn ElevationProvider + Send>,
    jobs: ElevationRequestQueueReceiver,
    ui_refresh_tx: crate::UIRefreshQueueSender,
    repaint: eframe::egui::Context,
) {
    log::info!("Elevation worker started");
    loop {
        let mut batch = vec![jobs.receive().await];
        while let Ok(job) = jobs.try_receive() {
            batch.push(job);
        }
        let received = batch.len();
        let Some(job) = coalesce(batch) else {
            continue;
        };
        if received > 1 {
            log::debug!("Skipped {} superseded zone request(s)", received - 1);
        }

        let started = Instant::now();
        let zone = compute_job(provider.as_ref(), &job);
        log::debug!(
            "Zone for link {} (generation {}) ready in {} ms",
            job.request.link_id,
            job.request.generation,
            started.elapsed().as_millis()
        );
        ui_refresh_tx
            .send(UIRefreshState::ZoneComputed {
                link_id: job.request.link_id,
                generation: job.request.generation,
                zone,
            })
            .await;
        repaint.request_repaint();
    }
}
