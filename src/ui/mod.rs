// UI module for the Fresnel Link Planner
//
// This module organizes the UI into separate components:
// - `top_panel`: default frequency, export/clear controls and status
// - `side_panel`: tower editor, tower and link lists, zone details, diagnostics
// - `map`: slippy map with towers, links and the active Fresnel zone
// - `app_state`: application state, action dispatch and the main update loop

pub mod app_state;
pub mod map;
pub mod side_panel;
pub mod top_panel;

use crate::fresnel::FresnelZone;
use crate::geodesy::LatLng;
use crate::scene::{LinkId, TowerId};
use crate::tiles::TileKey;

pub use app_state::AppState;

/// Messages from the background workers to the UI thread.
#[derive(Debug)]
pub enum UIRefreshState {
    ZoneComputed { link_id: LinkId, generation: u64, zone: FresnelZone },
    TileLoaded { key: TileKey, bytes: Vec<u8> },
    TileFailed(TileKey),
}

/// User intents collected while rendering a frame and applied afterwards by
/// [`AppState::apply`].
#[derive(Debug, Clone, PartialEq)]
pub enum UiAction {
    PlaceTower(LatLng),
    MoveTower(TowerId, LatLng),
    /// A tower marker was clicked: completes a pending connect gesture or
    /// opens the editor.
    TowerClicked(TowerId),
    EditTower(TowerId),
    SaveTower { id: TowerId, name: String, frequency_text: String },
    CloseEditor,
    DeleteTower(TowerId),
    BeginConnect(TowerId),
    CancelConnect,
    DeleteLink(LinkId),
    ShowZone(LinkId),
    HideZone,
    ClearScene,
    ExportScene,
}
