use async_trait::async_trait;
use std::sync::{Arc, Mutex, MutexGuard};
use crate::playback::Cue;
use crate::render::{Caption, RenderPlan};
use crate::surface::{PresentationSurface, SurfaceError, SurfaceEvent, SurfaceListener, SurfaceResult};

/// A call made against a [`MockSurface`]
#[derive(Debug, Clone, PartialEq)]
pub enum SurfaceCall {
    Attach,
    Detach,
    Present { cue: Cue, plan: RenderPlan, caption: Caption },
    Clear,
    RequestFullscreen,
    ExitFullscreen,
}

#[derive(Default)]
struct MockState {
    calls: Vec<SurfaceCall>,
    listener: Option<SurfaceListener>,
    fullscreen: bool,
    refuse_fullscreen: bool,
}

/// Surface that records every call, for driving a controller without a display.
///
/// Clones share state, so a test can keep one handle while the controller
/// owns another.
#[derive(Clone, Default)]
pub struct MockSurface {
    state: Arc<Mutex<MockState>>,
}

impl MockSurface {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make fullscreen requests fail, as a browser does without a user gesture
    pub fn set_refuse_fullscreen(&self, refuse: bool) {
        self.lock().refuse_fullscreen = refuse;
    }

    /// Raise an event to the attached listener. Returns false if nobody listens.
    pub fn emit(&self, event: SurfaceEvent) -> bool {
        let mut state = self.lock();
        if let SurfaceEvent::FullscreenChanged(on) = event {
            state.fullscreen = on;
        }
        match &state.listener {
            Some(listener) => listener.send(event).is_ok(),
            None => false,
        }
    }

    /// All calls made so far
    pub fn calls(&self) -> Vec<SurfaceCall> {
        self.lock().calls.clone()
    }

    /// Drain recorded calls
    pub fn take_calls(&self) -> Vec<SurfaceCall> {
        std::mem::take(&mut self.lock().calls)
    }

    /// The most recent presentation, if any
    pub fn last_presented(&self) -> Option<(Cue, RenderPlan)> {
        self.lock().calls.iter().rev().find_map(|call| match call {
            SurfaceCall::Present { cue, plan, .. } => Some((*cue, plan.clone())),
            _ => None,
        })
    }

    /// Names of presented items, in order
    pub fn presented_names(&self) -> Vec<String> {
        self.lock()
            .calls
            .iter()
            .filter_map(|call| match call {
                SurfaceCall::Present { plan, .. } => Some(plan.name().to_string()),
                _ => None,
            })
            .collect()
    }

    pub fn is_listening(&self) -> bool {
        self.lock().listener.is_some()
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

#[async_trait]
impl PresentationSurface for MockSurface {
    fn name(&self) -> &str {
        "mock"
    }

    fn attach(&mut self, listener: SurfaceListener) {
        let mut state = self.lock();
        state.calls.push(SurfaceCall::Attach);
        state.listener = Some(listener);
    }

    fn detach(&mut self) {
        let mut state = self.lock();
        state.calls.push(SurfaceCall::Detach);
        state.listener = None;
    }

    async fn present(&mut self, cue: Cue, plan: &RenderPlan, caption: &Caption) -> SurfaceResult<()> {
        self.lock().calls.push(SurfaceCall::Present {
            cue,
            plan: plan.clone(),
            caption: caption.clone(),
        });
        Ok(())
    }

    async fn clear(&mut self) -> SurfaceResult<()> {
        self.lock().calls.push(SurfaceCall::Clear);
        Ok(())
    }

    async fn request_fullscreen(&mut self) -> SurfaceResult<()> {
        let mut state = self.lock();
        state.calls.push(SurfaceCall::RequestFullscreen);
        if state.refuse_fullscreen {
            return Err(SurfaceError::Refused("mock refuses fullscreen".to_string()));
        }
        state.fullscreen = true;
        Ok(())
    }

    async fn exit_fullscreen(&mut self) -> SurfaceResult<()> {
        let mut state = self.lock();
        state.calls.push(SurfaceCall::ExitFullscreen);
        state.fullscreen = false;
        Ok(())
    }

    fn is_fullscreen(&self) -> bool {
        self.lock().fullscreen
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    #[tokio::test]
    async fn test_mock_records_calls() {
        let mut surface = MockSurface::new();
        let observer = surface.clone();

        surface.request_fullscreen().await.unwrap();
        assert!(observer.is_fullscreen());
        surface.clear().await.unwrap();

        assert_eq!(observer.take_calls(), vec![SurfaceCall::RequestFullscreen, SurfaceCall::Clear]);
        assert!(observer.calls().is_empty());
    }

    #[tokio::test]
    async fn test_mock_refusal() {
        let mut surface = MockSurface::new();
        surface.set_refuse_fullscreen(true);
        assert!(surface.request_fullscreen().await.is_err());
        assert!(!surface.is_fullscreen());
    }

    #[tokio::test]
    async fn test_mock_emit_needs_listener() {
        let mut surface = MockSurface::new();
        assert!(!surface.emit(SurfaceEvent::FullscreenChanged(false)));

        let (tx, mut rx) = mpsc::unbounded_channel();
        surface.attach(tx);
        assert!(surface.emit(SurfaceEvent::MediaEnded { cue: Cue::new(3) }));
        assert_eq!(rx.recv().await, Some(SurfaceEvent::MediaEnded { cue: Cue::new(3) }));

        surface.detach();
        assert!(!surface.emit(SurfaceEvent::FullscreenChanged(true)));
    }
}
