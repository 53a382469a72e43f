use chrono::NaiveDateTime;
use std::time::Duration;
use tracing::{debug, info};
use crate::core::{PlaylistRecord, Snapshot};
use crate::playback::{Cue, PlaybackState, PlaybackStatus};
use crate::render::{Caption, RenderPlan};
use crate::schedule::select_active;

/// Side effect requested by the session. The controller carries them out
/// in order.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Start listening to surface events
    AttachListener,
    /// Stop listening to surface events
    DetachListener,
    Present {
        cue: Cue,
        plan: RenderPlan,
        caption: Caption,
    },
    /// Arm the single advance timer, replacing any pending one
    ArmTimer {
        cue: Cue,
        after: Duration,
    },
    CancelTimer,
    RequestFullscreen,
    ExitFullscreen,
    Clear,
}

/// Scheduling and playback state machine.
///
/// Pure: no clocks, timers or I/O. Every input returns the effects it
/// implies, which makes each transition checkable on its own.
#[derive(Debug, Default)]
pub struct PlaybackSession {
    snapshot: Snapshot,
    candidates: Vec<String>,
    current: Option<PlaylistRecord>,
    item_index: usize,
    state: PlaybackState,
    fullscreen: bool,
    cue: Cue,
}

impl PlaybackSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn is_playing(&self) -> bool {
        self.state == PlaybackState::Playing
    }

    pub fn is_fullscreen(&self) -> bool {
        self.fullscreen
    }

    /// Index of the item on screen
    pub fn item_index(&self) -> usize {
        self.item_index
    }

    /// Cue of the item on screen
    pub fn cue(&self) -> Cue {
        self.cue
    }

    pub fn current_playlist(&self) -> Option<&PlaylistRecord> {
        self.current.as_ref()
    }

    pub fn current_item(&self) -> Option<&crate::core::PlaylistItem> {
        self.current.as_ref()?.item(self.item_index)
    }

    /// Ids of the eligible playlists from the last evaluation
    pub fn candidates(&self) -> &[String] {
        &self.candidates
    }

    /// Take a new snapshot and re-run scheduling against it
    pub fn apply_snapshot(&mut self, snapshot: Snapshot, now: NaiveDateTime) -> Vec<Effect> {
        self.snapshot = snapshot;
        self.reevaluate(now)
    }

    /// Re-run scheduling against the last snapshot
    pub fn reevaluate(&mut self, now: NaiveDateTime) -> Vec<Effect> {
        let first = {
            let active = select_active(&self.snapshot, now);
            self.candidates = active.iter().map(|r| r.id.clone()).collect();
            active.first().map(|r| (*r).clone())
        };

        match first {
            None if self.is_playing() => {
                info!("no playlist scheduled, going idle");
                self.halt()
            }
            None => Vec::new(),
            Some(record) => {
                let same = self.is_playing()
                    && self.current.as_ref().map(|c| c.id == record.id).unwrap_or(false);
                if same {
                    self.refresh(record)
                } else {
                    self.start(record)
                }
            }
        }
    }

    /// Advance past the item identified by `cue`. Stale cues are ignored,
    /// so a timer and an end-of-media event for the same item advance once.
    pub fn advance(&mut self, cue: Cue) -> Vec<Effect> {
        if !self.is_playing() || cue != self.cue {
            debug!(cue = cue.value(), current = self.cue.value(), "ignoring stale advance");
            return Vec::new();
        }

        let len = self.current.as_ref().map(|p| p.items.len()).unwrap_or(0);
        if len == 0 {
            return self.halt();
        }

        // The whole playlist loops regardless of per-item flags
        self.item_index = if self.item_index + 1 < len { self.item_index + 1 } else { 0 };
        self.enter_item()
    }

    /// The surface finished playing a video
    pub fn media_ended(&mut self, cue: Cue) -> Vec<Effect> {
        match self.current_item() {
            Some(item) if item.is_video() => self.advance(cue),
            _ => Vec::new(),
        }
    }

    /// The surface could not load the media for `cue`: show the name instead.
    /// The running timer is left alone.
    pub fn load_failed(&mut self, cue: Cue) -> Vec<Effect> {
        if !self.is_playing() || cue != self.cue {
            return Vec::new();
        }
        match (self.current.as_ref(), self.current_item()) {
            (Some(playlist), Some(item)) => vec![Effect::Present {
                cue,
                plan: RenderPlan::placeholder_for(item),
                caption: Caption::new(playlist, self.item_index),
            }],
            _ => Vec::new(),
        }
    }

    /// Record the presentation mode. Leaving fullscreen never stops playback.
    pub fn set_fullscreen(&mut self, fullscreen: bool) {
        self.fullscreen = fullscreen;
    }

    /// Explicit stop by the operator
    pub fn stop(&mut self) -> Vec<Effect> {
        if !self.is_playing() {
            return Vec::new();
        }
        info!("playback stopped");
        self.halt()
    }

    pub fn status(&self) -> PlaybackStatus {
        PlaybackStatus {
            state: self.state,
            playlist_id: self.current.as_ref().map(|p| p.id.clone()),
            playlist_name: self.current.as_ref().map(|p| p.name.clone()),
            item_index: self.item_index,
            item_count: self.current.as_ref().map(|p| p.items.len()).unwrap_or(0),
            item_name: self.current_item().map(|i| i.name.clone()),
            fullscreen: self.fullscreen,
            candidates: self.candidates.clone(),
        }
    }

    fn start(&mut self, record: PlaylistRecord) -> Vec<Effect> {
        let was_idle = !self.is_playing();
        info!(playlist = %record.id, name = %record.name, items = record.items.len(), "starting playlist");

        self.current = Some(record);
        self.item_index = 0;
        self.state = PlaybackState::Playing;

        let mut effects = Vec::new();
        if was_idle {
            effects.push(Effect::AttachListener);
        }
        effects.extend(self.enter_item());
        // Once per playback start, not on playlist switches
        if was_idle {
            effects.push(Effect::RequestFullscreen);
        }
        effects
    }

    /// Same playlist re-delivered: keep position, pick up edits
    fn refresh(&mut self, record: PlaylistRecord) -> Vec<Effect> {
        let before = self.current_item().cloned();
        let len = record.items.len();
        self.current = Some(record);

        if self.item_index >= len {
            debug!(index = self.item_index, len, "playlist shrank, clamping position");
            self.item_index = len.saturating_sub(1);
            return self.enter_item();
        }

        let (Some(playlist), Some(item)) = (self.current.as_ref(), self.current_item()) else {
            return Vec::new();
        };
        if before.as_ref() == Some(item) {
            return Vec::new();
        }

        // Redraw under the same cue; the new duration applies to the next timer
        vec![Effect::Present {
            cue: self.cue,
            plan: RenderPlan::for_item(item),
            caption: Caption::new(playlist, self.item_index),
        }]
    }

    fn enter_item(&mut self) -> Vec<Effect> {
        self.cue = self.cue.next();
        let (Some(playlist), Some(item)) = (self.current.as_ref(), self.current_item()) else {
            return vec![Effect::CancelTimer];
        };

        debug!(
            cue = self.cue.value(),
            playlist = %playlist.id,
            index = self.item_index,
            item = %item.name,
            "entering item"
        );

        vec![
            Effect::CancelTimer,
            Effect::Present {
                cue: self.cue,
                plan: RenderPlan::for_item(item),
                caption: Caption::new(playlist, self.item_index),
            },
            Effect::ArmTimer {
                cue: self.cue,
                after: item.display_duration(),
            },
        ]
    }

    fn halt(&mut self) -> Vec<Effect> {
        self.current = None;
        self.item_index = 0;
        self.state = PlaybackState::Idle;

        let mut effects = vec![Effect::CancelTimer, Effect::DetachListener];
        if self.fullscreen {
            self.fullscreen = false;
            effects.push(Effect::ExitFullscreen);
        }
        effects.push(Effect::Clear);
        effects
    }
}
