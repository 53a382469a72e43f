pub mod headless;
pub mod mock;

pub use headless::LogSurface;
pub use mock::{MockSurface, SurfaceCall};

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::mpsc;
use crate::playback::Cue;
use crate::render::{Caption, RenderPlan};

/// Errors reported by a presentation surface. None of them are fatal to playback.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SurfaceError {
    /// The host declined the request (no monitor, no user gesture, ...)
    #[error("request refused: {0}")]
    Refused(String),
    /// The surface has gone away
    #[error("presentation surface closed")]
    Closed,
    #[error("{0}")]
    Failed(String),
}

/// Result type for surface operations
pub type SurfaceResult<T> = Result<T, SurfaceError>;

/// Notifications a surface raises while a session listens to it
#[derive(Debug, Clone, PartialEq)]
pub enum SurfaceEvent {
    /// A video reached its natural end
    MediaEnded { cue: Cue },
    /// The media for the item could not be loaded
    LoadFailed { cue: Cue, reason: String },
    /// Fullscreen was entered or left, by whatever means
    FullscreenChanged(bool),
}

/// Sender half handed to a surface while playback listens to it
pub type SurfaceListener = mpsc::UnboundedSender<SurfaceEvent>;

/// Something that can put playlist items on a screen
///
/// Implementations:
/// - the kiosk window (`crate::ui::WindowSurface`)
/// - [`LogSurface`] for headless players
/// - [`MockSurface`] for tests
#[async_trait]
pub trait PresentationSurface: Send {
    /// Name used in logs
    fn name(&self) -> &str;

    /// Start delivering events to `listener`, replacing any previous one
    fn attach(&mut self, listener: SurfaceListener);

    /// Stop delivering events
    fn detach(&mut self);

    /// Show an item. `cue` must be echoed back in events about it.
    async fn present(&mut self, cue: Cue, plan: &RenderPlan, caption: &Caption) -> SurfaceResult<()>;

    /// Show nothing
    async fn clear(&mut self) -> SurfaceResult<()>;

    /// Ask the host for fullscreen. May be refused.
    async fn request_fullscreen(&mut self) -> SurfaceResult<()>;

    /// Leave fullscreen if engaged
    async fn exit_fullscreen(&mut self) -> SurfaceResult<()>;

    fn is_fullscreen(&self) -> bool;
}
