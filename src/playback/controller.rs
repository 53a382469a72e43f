use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::time::{Instant, Interval, MissedTickBehavior};
use tracing::{debug, info, warn};
use crate::playback::{AdvanceTimer, Effect, PlaybackSession, PlaybackStatus};
use crate::schedule::Clock;
use crate::source::Subscription;
use crate::surface::{PresentationSurface, SurfaceEvent};

/// Operator commands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlCommand {
    /// Go idle until the next snapshot or re-evaluation
    Stop,
    /// Tear down and leave the run loop
    Shutdown,
}

#[derive(Debug, Clone)]
pub struct ControllerOptions {
    /// Re-run scheduling this often without new data. `None` disables it.
    pub reevaluate_every: Option<Duration>,
}

impl Default for ControllerOptions {
    fn default() -> Self {
        Self {
            reevaluate_every: Some(Duration::from_secs(60)),
        }
    }
}

/// Handle to a running controller
#[derive(Debug, Clone)]
pub struct ControllerHandle {
    commands: mpsc::Sender<ControlCommand>,
    status: watch::Receiver<PlaybackStatus>,
}

impl ControllerHandle {
    pub async fn stop(&self) -> bool {
        self.commands.send(ControlCommand::Stop).await.is_ok()
    }

    pub async fn shutdown(&self) -> bool {
        self.commands.send(ControlCommand::Shutdown).await.is_ok()
    }

    /// Non-blocking send, for callers outside the runtime (the window thread)
    pub fn try_send(&self, command: ControlCommand) -> bool {
        self.commands.try_send(command).is_ok()
    }

    /// Latest published status
    pub fn status(&self) -> PlaybackStatus {
        self.status.borrow().clone()
    }

    pub fn watch_status(&self) -> watch::Receiver<PlaybackStatus> {
        self.status.clone()
    }
}

/// Drives a [`PlaybackSession`] from snapshots, its timer, surface events
/// and operator commands, and applies the resulting effects to a surface.
pub struct PlaybackController<S, C> {
    session: PlaybackSession,
    surface: S,
    clock: C,
    options: ControllerOptions,
    commands: mpsc::Receiver<ControlCommand>,
    status: watch::Sender<PlaybackStatus>,
}

impl<S, C> PlaybackController<S, C>
where
    S: PresentationSurface,
    C: Clock,
{
    pub fn new(surface: S, clock: C, options: ControllerOptions) -> (Self, ControllerHandle) {
        let (command_tx, command_rx) = mpsc::channel(16);
        let (status_tx, status_rx) = watch::channel(PlaybackStatus::default());

        let controller = Self {
            session: PlaybackSession::new(),
            surface,
            clock,
            options,
            commands: command_rx,
            status: status_tx,
        };
        let handle = ControllerHandle {
            commands: command_tx,
            status: status_rx,
        };
        (controller, handle)
    }

    /// Run until shutdown. The surface is handed back cleared and detached.
    pub async fn run(mut self, mut subscription: Subscription) -> S {
        info!(surface = self.surface.name(), "playback controller started");

        let mut timer = AdvanceTimer::new();
        let mut listener: Option<mpsc::UnboundedReceiver<SurfaceEvent>> = None;
        let mut reevaluate = self.options.reevaluate_every.filter(|d| !d.is_zero()).map(|every| {
            let mut interval = tokio::time::interval_at(Instant::now() + every, every);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            interval
        });
        let mut source_open = true;

        loop {
            let effects = tokio::select! {
                snapshot = subscription.recv(), if source_open => match snapshot {
                    Some(snapshot) => {
                        debug!(records = snapshot.len(), "snapshot received");
                        self.session.apply_snapshot(snapshot, self.clock.now())
                    }
                    None => {
                        warn!("snapshot source closed, keeping current playback");
                        source_open = false;
                        Vec::new()
                    }
                },
                cue = timer.fired() => self.session.advance(cue),
                event = next_event(&mut listener) => self.handle_event(event),
                _ = tick(&mut reevaluate) => self.session.reevaluate(self.clock.now()),
                command = self.commands.recv() => match command {
                    Some(ControlCommand::Stop) => self.session.stop(),
                    Some(ControlCommand::Shutdown) | None => break,
                },
            };

            self.apply(effects, &mut timer, &mut listener).await;
            self.publish();
        }

        // Teardown: same cleanup as going idle
        let effects = self.session.stop();
        self.apply(effects, &mut timer, &mut listener).await;
        timer.cancel();
        subscription.unsubscribe();
        self.publish();

        info!(surface = self.surface.name(), "playback controller stopped");
        self.surface
    }

    fn handle_event(&mut self, event: SurfaceEvent) -> Vec<Effect> {
        match event {
            SurfaceEvent::MediaEnded { cue } => self.session.media_ended(cue),
            SurfaceEvent::LoadFailed { cue, reason } => {
                warn!(cue = cue.value(), %reason, "media failed to load");
                self.session.load_failed(cue)
            }
            SurfaceEvent::FullscreenChanged(fullscreen) => {
                debug!(fullscreen, "fullscreen changed");
                self.session.set_fullscreen(fullscreen);
                Vec::new()
            }
        }
    }

    async fn apply(
        &mut self,
        effects: Vec<Effect>,
        timer: &mut AdvanceTimer,
        listener: &mut Option<mpsc::UnboundedReceiver<SurfaceEvent>>,
    ) {
        for effect in effects {
            match effect {
                Effect::AttachListener => {
                    let (tx, rx) = mpsc::unbounded_channel();
                    self.surface.attach(tx);
                    *listener = Some(rx);
                }
                Effect::DetachListener => {
                    self.surface.detach();
                    *listener = None;
                }
                Effect::Present { cue, plan, caption } => {
                    if let Err(e) = self.surface.present(cue, &plan, &caption).await {
                        warn!(cue = cue.value(), item = plan.name(), error = %e, "present failed");
                    }
                }
                Effect::ArmTimer { cue, after } => timer.arm(cue, after),
                Effect::CancelTimer => {
                    if let Some(cue) = timer.armed_cue() {
                        debug!(cue = cue.value(), "advance timer cancelled");
                    }
                    timer.cancel();
                }
                Effect::RequestFullscreen => match self.surface.request_fullscreen().await {
                    Ok(()) => self.session.set_fullscreen(true),
                    Err(e) => {
                        info!(error = %e, "fullscreen unavailable, continuing windowed");
                        self.session.set_fullscreen(false);
                    }
                },
                Effect::ExitFullscreen => {
                    if let Err(e) = self.surface.exit_fullscreen().await {
                        debug!(error = %e, "exit fullscreen failed");
                    }
                }
                Effect::Clear => {
                    if let Err(e) = self.surface.clear().await {
                        warn!(error = %e, "clear failed");
                    }
                }
            }
        }
    }

    fn publish(&self) {
        let status = self.session.status();
        self.status.send_if_modified(|current| {
            if *current == status {
                return false;
            }
            *current = status;
            true
        });
    }
}

/// Next surface event; pends while nothing listens
async fn next_event(listener: &mut Option<mpsc::UnboundedReceiver<SurfaceEvent>>) -> SurfaceEvent {
    if let Some(rx) = listener.as_mut() {
        if let Some(event) = rx.recv().await {
            return event;
        }
    }
    std::future::pending().await
}

async fn tick(interval: &mut Option<Interval>) {
    match interval.as_mut() {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending().await,
    }
}
