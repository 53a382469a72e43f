pub mod controller;
pub mod session;
pub mod timer;

pub use controller::{ControlCommand, ControllerHandle, ControllerOptions, PlaybackController};
pub use session::{Effect, PlaybackSession};
pub use timer::AdvanceTimer;

use serde::Serialize;

/// Playback state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PlaybackState {
    /// No eligible playlist
    #[default]
    Idle,
    /// A playlist is driving the surface
    Playing,
}

/// Token identifying one entry into an item.
///
/// Every time an item goes on screen it gets a fresh cue; timers and
/// surface events carry the cue they belong to, so anything raised for an
/// item that is no longer current can be recognised and dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize)]
pub struct Cue(u64);

impl Cue {
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    pub fn next(self) -> Self {
        Self(self.0.wrapping_add(1))
    }

    pub fn value(&self) -> u64 {
        self.0
    }
}

/// Snapshot of the session for status displays and logs
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaybackStatus {
    pub state: PlaybackState,
    pub playlist_id: Option<String>,
    pub playlist_name: Option<String>,
    pub item_index: usize,
    pub item_count: usize,
    pub item_name: Option<String>,
    pub fullscreen: bool,
    /// Ids of every currently eligible playlist, in snapshot order
    pub candidates: Vec<String>,
}

impl PlaybackStatus {
    pub fn is_playing(&self) -> bool {
        self.state == PlaybackState::Playing
    }
}
