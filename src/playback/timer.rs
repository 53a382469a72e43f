use std::pin::Pin;
use std::time::Duration;
use tokio::time::{sleep, Sleep};
use crate::playback::Cue;

/// The single pending advance of a playback session.
///
/// Arming replaces whatever was pending, so at most one timer is ever live.
#[derive(Debug, Default)]
pub struct AdvanceTimer {
    pending: Option<(Cue, Pin<Box<Sleep>>)>,
}

impl AdvanceTimer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn arm(&mut self, cue: Cue, after: Duration) {
        self.pending = Some((cue, Box::pin(sleep(after))));
    }

    /// Drop the pending timer. Returns whether one was armed.
    pub fn cancel(&mut self) -> bool {
        self.pending.take().is_some()
    }

    pub fn armed_cue(&self) -> Option<Cue> {
        self.pending.as_ref().map(|(cue, _)| *cue)
    }

    /// Wait for the pending timer and return its cue. Pends forever when
    /// nothing is armed. Cancel safe: dropping the future keeps the timer.
    pub async fn fired(&mut self) -> Cue {
        let Some((cue, sleep)) = self.pending.as_mut() else {
            return std::future::pending::<Cue>().await;
        };
        sleep.as_mut().await;
        let cue = *cue;
        self.pending = None;
        cue
    }
}
