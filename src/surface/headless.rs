use async_trait::async_trait;
use tracing::info;
use crate::playback::Cue;
use crate::render::{Caption, RenderPlan};
use crate::surface::{PresentationSurface, SurfaceError, SurfaceListener, SurfaceResult};

/// Surface for players without a display: every presentation is logged.
///
/// There is no fullscreen mode, so requests are refused and playback
/// carries on "windowed".
pub struct LogSurface {
    name: String,
    listener: Option<SurfaceListener>,
    presented: u64,
}

impl LogSurface {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            listener: None,
            presented: 0,
        }
    }

    /// Number of items presented so far
    pub fn presented(&self) -> u64 {
        self.presented
    }

    pub fn is_listening(&self) -> bool {
        self.listener.is_some()
    }
}

#[async_trait]
impl PresentationSurface for LogSurface {
    fn name(&self) -> &str {
        &self.name
    }

    fn attach(&mut self, listener: SurfaceListener) {
        self.listener = Some(listener);
    }

    fn detach(&mut self) {
        self.listener = None;
    }

    async fn present(&mut self, cue: Cue, plan: &RenderPlan, caption: &Caption) -> SurfaceResult<()> {
        self.presented += 1;
        info!(
            surface = %self.name,
            cue = cue.value(),
            playlist = %caption.playlist_name,
            position = caption.position,
            total = caption.total,
            item = %plan.name(),
            source = plan.source().unwrap_or("-"),
            duration_secs = caption.duration_secs,
            "presenting"
        );
        Ok(())
    }

    async fn clear(&mut self) -> SurfaceResult<()> {
        info!(surface = %self.name, "display cleared");
        Ok(())
    }

    async fn request_fullscreen(&mut self) -> SurfaceResult<()> {
        Err(SurfaceError::Refused("headless display has no fullscreen mode".to_string()))
    }

    async fn exit_fullscreen(&mut self) -> SurfaceResult<()> {
        Ok(())
    }

    fn is_fullscreen(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{ItemKind, PlaylistItem, PlaylistRecord};
    use tokio::sync::mpsc;

    #[tokio::test]
    async fn test_log_surface_refuses_fullscreen() {
        let mut surface = LogSurface::new("log");
        assert!(matches!(surface.request_fullscreen().await, Err(SurfaceError::Refused(_))));
        assert!(surface.exit_fullscreen().await.is_ok());
        assert!(!surface.is_fullscreen());
    }

    #[tokio::test]
    async fn test_log_surface_counts_presentations() {
        let mut surface = LogSurface::new("log");
        let item = PlaylistItem::new("a", "slide", ItemKind::Image);
        let playlist = PlaylistRecord::new("p", "P").with_items(vec![item.clone()]);

        surface
            .present(Cue::new(1), &RenderPlan::for_item(&item), &Caption::new(&playlist, 0))
            .await
            .unwrap();
        assert_eq!(surface.presented(), 1);

        let (tx, _rx) = mpsc::unbounded_channel();
        surface.attach(tx);
        assert!(surface.is_listening());
        surface.detach();
        assert!(!surface.is_listening());
    }
}
