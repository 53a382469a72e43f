use anyhow::{anyhow, Context as _, Result};
use imgui::{Context, FontConfig, FontSource, TextureId};
use imgui_glow_renderer::TextureMap;
use imgui_winit_support::{HiDpiMode, WinitPlatform};
use std::num::NonZeroU32;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::runtime::Runtime;
use tracing::{error, info, warn};
use winit::event::{Event, WindowEvent};
use winit::event_loop::EventLoopBuilder;
use winit::keyboard::ModifiersState;
use winit::window::{Fullscreen, Window, WindowBuilder};

use glutin::prelude::*;
use glutin::display::GetGlDisplay;
use glutin_winit::{DisplayBuilder, GlWindow};
use raw_window_handle::HasRawWindowHandle;
use glow::HasContext;

use crate::config::PlayerSettings;
use crate::playback::{ControlCommand, ControllerHandle, ControllerOptions, Cue, PlaybackController};
use crate::schedule::LocalClock;
use crate::source::{subscribe, SnapshotSource};
use crate::surface::{SurfaceError, SurfaceEvent, SurfaceResult};
use crate::ui::image_loader::DecodedImage;
use crate::ui::kiosk::{KioskView, BASE_FONT_SIZE};
use crate::ui::shortcuts::{KioskAction, ShortcutManager};
use crate::ui::window_surface::{KioskEvent, SharedListener, WindowSurface};

/// Per-request timeout for image downloads
const IMAGE_TIMEOUT: Duration = Duration::from_secs(30);

/// Run the kiosk window on this thread until quit. Playback runs on `rt`.
pub fn run_kiosk(
    rt: Runtime,
    mut settings: PlayerSettings,
    settings_path: Option<PathBuf>,
    source: Box<dyn SnapshotSource>,
) -> Result<()> {
    let event_loop = EventLoopBuilder::<KioskEvent>::with_user_event()
        .build()
        .context("failed to create event loop")?;
    let proxy = event_loop.create_proxy();

    // Build the window and GL display using glutin-winit
    let (window, gl_config) = DisplayBuilder::new()
        .with_window_builder(Some(
            WindowBuilder::new()
                .with_title(settings.window.title.as_str())
                .with_inner_size(winit::dpi::LogicalSize::new(
                    settings.window.width as f64,
                    settings.window.height as f64,
                )),
        ))
        .build(&event_loop, glutin::config::ConfigTemplateBuilder::new(), |configs| {
            configs
                .reduce(|best, c| if c.num_samples() > best.num_samples() { c } else { best })
                .expect("display offered no GL configs")
        })
        .map_err(|e| anyhow!("failed to create window and display: {e}"))?;

    let window = window.context("display builder returned no window")?;
    let gl_display = gl_config.display();

    let context = unsafe {
        gl_display.create_context(
            &gl_config,
            &glutin::context::ContextAttributesBuilder::new().build(Some(window.raw_window_handle())),
        )
    }
    .context("failed to create GL context")?;

    let attrs = window.build_surface_attributes(
        glutin::surface::SurfaceAttributesBuilder::<glutin::surface::WindowSurface>::new(),
    );
    let gl_surface = unsafe { gl_display.create_window_surface(&gl_config, &attrs) }
        .context("failed to create GL surface")?;
    let context = context
        .make_current(&gl_surface)
        .context("failed to make GL context current")?;

    let load = |name: &str| -> *const std::ffi::c_void {
        match std::ffi::CString::new(name) {
            Ok(name) => gl_display.get_proc_address(&name),
            Err(_) => std::ptr::null(),
        }
    };
    let gl = unsafe { glow::Context::from_loader_function(load) };
    // Second handle on the same GL context, for clearing and slide uploads
    let gl_direct = unsafe { glow::Context::from_loader_function(load) };

    // Set up imgui
    let mut imgui = Context::create();
    imgui.set_ini_filename(None::<PathBuf>);
    imgui.set_log_filename(None::<PathBuf>);

    let hidpi_factor = window.scale_factor();
    imgui.fonts().add_font(&[FontSource::DefaultFontData {
        config: Some(FontConfig {
            size_pixels: (BASE_FONT_SIZE as f64 * hidpi_factor) as f32,
            ..FontConfig::default()
        }),
    }]);
    imgui.io_mut().font_global_scale = (1.0 / hidpi_factor) as f32;

    let mut platform = WinitPlatform::init(&mut imgui);
    platform.attach_window(imgui.io_mut(), &window, HiDpiMode::Default);

    let mut renderer = imgui_glow_renderer::AutoRenderer::initialize(gl, &mut imgui)
        .map_err(|e| anyhow!("failed to initialize renderer: {e}"))?;

    // Playback side
    let listener = SharedListener::default();
    let fullscreen = Arc::new(AtomicBool::new(false));
    let client = reqwest::Client::builder()
        .timeout(IMAGE_TIMEOUT)
        .build()
        .context("failed to create HTTP client")?;
    let surface = WindowSurface::new(proxy.clone(), listener.clone(), fullscreen.clone(), client);

    let runtime_guard = rt.enter();
    let subscription = subscribe(source, settings.source.poll_interval());
    let (controller, handle) = PlaybackController::new(
        surface,
        LocalClock,
        ControllerOptions {
            reevaluate_every: settings.reevaluate_every(),
        },
    );
    let exit_proxy = proxy.clone();
    rt.spawn(async move {
        controller.run(subscription).await;
        // Window may already be gone
        let _ = exit_proxy.send_event(KioskEvent::Exit);
    });

    let mut view = KioskView::new(settings.window.show_overlay, handle.watch_status());
    let mut slide = SlideTexture::default();
    let shortcuts = ShortcutManager::new();
    let mut modifiers = ModifiersState::empty();
    let mut show_help = false;
    let mut quitting = false;
    let mut last_frame_time = Instant::now();

    info!(title = %settings.window.title, "kiosk window open");

    // Main loop
    event_loop
        .run(move |event, window_target| {
            platform.handle_event(imgui.io_mut(), &window, &event);

            match event {
                Event::NewEvents(_) => {
                    let now = Instant::now();
                    imgui.io_mut().update_delta_time(now - last_frame_time);
                    last_frame_time = now;
                }
                Event::AboutToWait => {
                    if let Err(e) = platform.prepare_frame(imgui.io_mut(), &window) {
                        warn!(error = %e, "failed to prepare frame");
                    }
                    window.request_redraw();
                }
                Event::UserEvent(kiosk_event) => match kiosk_event {
                    KioskEvent::Present { cue, plan, caption } => {
                        view.present(cue, plan, caption);
                        slide.release_unless(&gl_direct, view.image_cue());
                    }
                    KioskEvent::Clear => {
                        view.clear();
                        slide.release_unless(&gl_direct, None);
                    }
                    KioskEvent::ImageReady { cue, image } => {
                        if view.wants_image(cue) {
                            match slide.upload(&gl_direct, renderer.texture_map_mut(), cue, &image) {
                                Ok(texture) => {
                                    view.set_image(cue, texture, image.size());
                                }
                                Err(reason) => {
                                    listener.emit(SurfaceEvent::LoadFailed { cue, reason });
                                }
                            }
                        }
                    }
                    KioskEvent::SetFullscreen { fullscreen: on, reply } => {
                        let result = set_fullscreen(&window, on);
                        if result.is_ok() {
                            fullscreen.store(on, Ordering::SeqCst);
                        }
                        if let Some(reply) = reply {
                            let _ = reply.send(result);
                        }
                    }
                    KioskEvent::Exit => window_target.exit(),
                },
                Event::WindowEvent { event: WindowEvent::ModifiersChanged(m), .. } => {
                    modifiers = m.state();
                }
                Event::WindowEvent { event: WindowEvent::KeyboardInput { event: key, .. }, .. } => {
                    let action = shortcuts.process_event(
                        &key,
                        modifiers.control_key(),
                        modifiers.shift_key(),
                        modifiers.alt_key(),
                    );
                    match action {
                        Some(KioskAction::ExitFullscreen) => {
                            if window.fullscreen().is_some() {
                                window.set_fullscreen(None);
                                fullscreen.store(false, Ordering::SeqCst);
                                listener.emit(SurfaceEvent::FullscreenChanged(false));
                            }
                        }
                        Some(KioskAction::ToggleFullscreen) => {
                            let on = window.fullscreen().is_none();
                            match set_fullscreen(&window, on) {
                                Ok(()) => {
                                    fullscreen.store(on, Ordering::SeqCst);
                                    listener.emit(SurfaceEvent::FullscreenChanged(on));
                                }
                                Err(e) => warn!(error = %e, "fullscreen toggle failed"),
                            }
                        }
                        Some(KioskAction::ToggleOverlay) => {
                            view.show_overlay = !view.show_overlay;
                            settings.window.show_overlay = view.show_overlay;
                            if let Some(path) = &settings_path {
                                if let Err(e) = settings.save(path) {
                                    warn!(error = %e, "failed to save settings");
                                }
                            }
                        }
                        Some(KioskAction::ToggleHelp) => show_help = !show_help,
                        Some(KioskAction::Stop) => {
                            if !handle.try_send(ControlCommand::Stop) {
                                warn!("playback controller is not running");
                            }
                        }
                        Some(KioskAction::Quit) => {
                            request_quit(&handle, &mut quitting, window_target.exiting(), || window_target.exit())
                        }
                        None => {}
                    }
                }
                Event::WindowEvent { event: WindowEvent::Resized(size), .. } => {
                    if let (Some(w), Some(h)) = (NonZeroU32::new(size.width), NonZeroU32::new(size.height)) {
                        gl_surface.resize(&context, w, h);
                    }
                }
                Event::WindowEvent { event: WindowEvent::RedrawRequested, .. } => {
                    let ui = imgui.new_frame();
                    view.draw(ui);
                    if show_help {
                        shortcuts.render_help(ui, &mut show_help);
                    }

                    platform.prepare_render(ui, &window);
                    let draw_data = imgui.render();

                    unsafe {
                        gl_direct.clear_color(0.0, 0.0, 0.0, 1.0);
                        gl_direct.clear(glow::COLOR_BUFFER_BIT);
                    }

                    if let Err(e) = renderer.render(draw_data) {
                        error!(error = %e, "rendering failed");
                    }
                    if let Err(e) = gl_surface.swap_buffers(&context) {
                        error!(error = %e, "failed to swap buffers");
                    }
                }
                Event::WindowEvent { event: WindowEvent::CloseRequested, .. } => {
                    request_quit(&handle, &mut quitting, window_target.exiting(), || window_target.exit())
                }
                _ => {}
            }
        })
        .map_err(|e| anyhow!("event loop error: {e}"))?;

    drop(runtime_guard);
    rt.shutdown_timeout(Duration::from_secs(2));
    info!("kiosk window closed");
    Ok(())
}

/// Texture of the image item on screen, at most one at a time
#[derive(Default)]
struct SlideTexture {
    current: Option<(Cue, glow::Texture)>,
}

impl SlideTexture {
    fn upload(
        &mut self,
        gl: &glow::Context,
        textures: &mut impl TextureMap,
        cue: Cue,
        image: &DecodedImage,
    ) -> Result<TextureId, String> {
        let max = unsafe { gl.get_parameter_i32(glow::MAX_TEXTURE_SIZE) };
        if image.width as i32 > max || image.height as i32 > max {
            return Err(format!("{}x{} exceeds the {max}px texture limit", image.width, image.height));
        }

        let texture = unsafe {
            let texture = gl.create_texture()?;
            gl.bind_texture(glow::TEXTURE_2D, Some(texture));
            gl.tex_parameter_i32(glow::TEXTURE_2D, glow::TEXTURE_MIN_FILTER, glow::LINEAR as i32);
            gl.tex_parameter_i32(glow::TEXTURE_2D, glow::TEXTURE_MAG_FILTER, glow::LINEAR as i32);
            gl.tex_parameter_i32(glow::TEXTURE_2D, glow::TEXTURE_WRAP_S, glow::CLAMP_TO_EDGE as i32);
            gl.tex_parameter_i32(glow::TEXTURE_2D, glow::TEXTURE_WRAP_T, glow::CLAMP_TO_EDGE as i32);
            gl.pixel_store_i32(glow::UNPACK_ALIGNMENT, 1);
            gl.tex_image_2d(
                glow::TEXTURE_2D,
                0,
                glow::RGBA as i32,
                image.width as i32,
                image.height as i32,
                0,
                glow::RGBA,
                glow::UNSIGNED_BYTE,
                Some(&image.pixels),
            );
            gl.bind_texture(glow::TEXTURE_2D, None);
            texture
        };

        let Some(id) = textures.register(texture) else {
            unsafe { gl.delete_texture(texture) };
            return Err("renderer could not register texture".to_string());
        };

        self.release_unless(gl, None);
        self.current = Some((cue, texture));
        Ok(id)
    }

    /// Free the texture unless it belongs to `keep`
    fn release_unless(&mut self, gl: &glow::Context, keep: Option<Cue>) {
        if let Some((cue, texture)) = self.current {
            if Some(cue) != keep {
                unsafe { gl.delete_texture(texture) };
                self.current = None;
            }
        }
    }
}

/// First request shuts the controller down, which closes the window once
/// torn down; a second request, or a dead controller, exits at once.
fn request_quit<F: FnOnce()>(handle: &ControllerHandle, quitting: &mut bool, exiting: bool, exit: F) {
    if exiting {
        return;
    }
    if *quitting || !handle.try_send(ControlCommand::Shutdown) {
        exit();
        return;
    }
    info!("shutting down playback");
    *quitting = true;
}

fn set_fullscreen(window: &Window, on: bool) -> SurfaceResult<()> {
    if !on {
        window.set_fullscreen(None);
        return Ok(());
    }
    let monitor = window
        .current_monitor()
        .or_else(|| window.primary_monitor())
        .ok_or_else(|| SurfaceError::Refused("no monitor available".to_string()))?;
    window.set_fullscreen(Some(Fullscreen::Borderless(Some(monitor))));
    Ok(())
}
