use async_trait::async_trait;
use reqwest::Client;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::debug;
use winit::event_loop::EventLoopProxy;
use crate::playback::Cue;
use crate::render::{Caption, RenderPlan};
use crate::surface::{PresentationSurface, SurfaceError, SurfaceEvent, SurfaceListener, SurfaceResult};
use crate::ui::image_loader::{has_scheme, load_image, DecodedImage};

/// Reply channel for fullscreen requests
pub type FullscreenReply = oneshot::Sender<SurfaceResult<()>>;

/// Messages from the playback controller to the window thread
#[derive(Debug)]
pub enum KioskEvent {
    Present {
        cue: Cue,
        plan: RenderPlan,
        caption: Caption,
    },
    Clear,
    /// Pixels for the image item shown under `cue`
    ImageReady {
        cue: Cue,
        image: DecodedImage,
    },
    SetFullscreen {
        fullscreen: bool,
        reply: Option<FullscreenReply>,
    },
    /// Controller finished, close the window
    Exit,
}

/// Listener slot shared between the surface and the window thread, which
/// raises fullscreen changes on its own
#[derive(Clone, Default)]
pub struct SharedListener {
    inner: Arc<Mutex<Option<SurfaceListener>>>,
}

impl SharedListener {
    pub fn set(&self, listener: Option<SurfaceListener>) {
        match self.inner.lock() {
            Ok(mut slot) => *slot = listener,
            Err(poisoned) => *poisoned.into_inner() = listener,
        }
    }

    /// Deliver an event if playback is listening
    pub fn emit(&self, event: SurfaceEvent) -> bool {
        let slot = match self.inner.lock() {
            Ok(slot) => slot,
            Err(poisoned) => poisoned.into_inner(),
        };
        match slot.as_ref() {
            Some(listener) => listener.send(event).is_ok(),
            None => false,
        }
    }

    pub fn is_attached(&self) -> bool {
        match self.inner.lock() {
            Ok(slot) => slot.is_some(),
            Err(poisoned) => poisoned.into_inner().is_some(),
        }
    }
}

/// [`PresentationSurface`] backed by the kiosk window. Calls are forwarded
/// to the winit event loop through its proxy; image items are loaded in the
/// background and handed over as [`KioskEvent::ImageReady`].
pub struct WindowSurface {
    proxy: EventLoopProxy<KioskEvent>,
    listener: SharedListener,
    fullscreen: Arc<AtomicBool>,
    client: Client,
    loading: Option<JoinHandle<()>>,
}

impl WindowSurface {
    pub fn new(
        proxy: EventLoopProxy<KioskEvent>,
        listener: SharedListener,
        fullscreen: Arc<AtomicBool>,
        client: Client,
    ) -> Self {
        Self {
            proxy,
            listener,
            fullscreen,
            client,
            loading: None,
        }
    }

    fn cancel_load(&mut self) {
        if let Some(task) = self.loading.take() {
            task.abort();
        }
    }

    fn start_load(&mut self, cue: Cue, source: String) {
        let client = self.client.clone();
        let proxy = self.proxy.clone();
        let listener = self.listener.clone();

        self.loading = Some(tokio::spawn(async move {
            match load_image(&client, &source).await {
                Ok(image) => {
                    debug!(cue = cue.value(), width = image.width, height = image.height, "image decoded");
                    // Window may already be gone
                    let _ = proxy.send_event(KioskEvent::ImageReady { cue, image });
                }
                Err(e) => {
                    listener.emit(SurfaceEvent::LoadFailed {
                        cue,
                        reason: e.to_string(),
                    });
                }
            }
        }));
    }

    fn send(&self, event: KioskEvent) -> SurfaceResult<()> {
        self.proxy.send_event(event).map_err(|_| SurfaceError::Closed)
    }

    async fn set_fullscreen(&mut self, fullscreen: bool) -> SurfaceResult<()> {
        let (tx, rx) = oneshot::channel();
        self.send(KioskEvent::SetFullscreen {
            fullscreen,
            reply: Some(tx),
        })?;
        rx.await.map_err(|_| SurfaceError::Closed)?
    }
}

#[async_trait]
impl PresentationSurface for WindowSurface {
    fn name(&self) -> &str {
        "kiosk-window"
    }

    fn attach(&mut self, listener: SurfaceListener) {
        self.listener.set(Some(listener));
    }

    fn detach(&mut self) {
        self.listener.set(None);
    }

    async fn present(&mut self, cue: Cue, plan: &RenderPlan, caption: &Caption) -> SurfaceResult<()> {
        self.cancel_load();
        self.send(KioskEvent::Present {
            cue,
            plan: plan.clone(),
            caption: caption.clone(),
        })?;

        match plan {
            RenderPlan::Image { source, .. } => self.start_load(cue, source.clone()),
            _ => {
                if let Some(reason) = plan.source().and_then(local_source_problem) {
                    debug!(cue = cue.value(), %reason, "local media unavailable");
                    self.listener.emit(SurfaceEvent::LoadFailed { cue, reason });
                }
            }
        }
        Ok(())
    }

    async fn clear(&mut self) -> SurfaceResult<()> {
        self.cancel_load();
        self.send(KioskEvent::Clear)
    }

    async fn request_fullscreen(&mut self) -> SurfaceResult<()> {
        self.set_fullscreen(true).await
    }

    async fn exit_fullscreen(&mut self) -> SurfaceResult<()> {
        self.set_fullscreen(false).await
    }

    fn is_fullscreen(&self) -> bool {
        self.fullscreen.load(Ordering::SeqCst)
    }
}

impl Drop for WindowSurface {
    fn drop(&mut self) {
        self.cancel_load();
    }
}

/// Why a local media source cannot be shown, if it is local and missing.
/// Remote sources are left to the renderer.
pub fn local_source_problem(source: &str) -> Option<String> {
    let path = match source.strip_prefix("file://") {
        Some(rest) => rest,
        None if has_scheme(source) => return None,
        None => source,
    };

    if Path::new(path).exists() {
        None
    } else {
        Some(format!("{path} not found"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    #[test]
    fn test_remote_sources_are_not_checked() {
        assert_eq!(local_source_problem("https://cdn.example.com/a.png"), None);
        assert_eq!(local_source_problem("data:image/png;base64,AAAA"), None);
    }

    #[test]
    fn test_local_sources() {
        let dir = tempfile::tempdir().unwrap();
        let present = dir.path().join("slide.png");
        std::fs::write(&present, b"png").unwrap();
        let missing = dir.path().join("gone.png");

        assert_eq!(local_source_problem(present.to_str().unwrap()), None);
        assert_eq!(local_source_problem(&format!("file://{}", present.display())), None);
        assert!(local_source_problem(missing.to_str().unwrap()).unwrap().contains("gone.png"));
    }

    #[test]
    fn test_shared_listener() {
        let shared = SharedListener::default();
        assert!(!shared.emit(SurfaceEvent::FullscreenChanged(true)));

        let (tx, mut rx) = mpsc::unbounded_channel();
        shared.set(Some(tx));
        assert!(shared.is_attached());
        assert!(shared.emit(SurfaceEvent::FullscreenChanged(false)));
        assert_eq!(rx.try_recv().ok(), Some(SurfaceEvent::FullscreenChanged(false)));

        shared.set(None);
        assert!(!shared.is_attached());
    }
}
