use crate::host::platform::build_surface;
use crate::settings::InteropSettings;
use anyhow::Context;
use interop_core::{LifecyclePhase, ResizeOutcome, SurfaceEvents, TickOutcome};
use winit::application::ApplicationHandler;
use winit::dpi::PhysicalSize;
use winit::event::{ElementState, KeyEvent, WindowEvent};
use winit::event_loop::ActiveEventLoop;
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::window::{Window, WindowId};

/// Single-window application handler owning the surface lifecycle
pub struct InteropApp {
    settings: InteropSettings,
    // Dropped before the window it composes into.
    surface: Option<Box<dyn SurfaceEvents>>,
    window: Option<Window>,
    error: Option<anyhow::Error>,
}

impl InteropApp {
    pub fn new(settings: InteropSettings) -> Self {
        Self {
            settings,
            surface: None,
            window: None,
            error: None,
        }
    }

    /// The error that made the app exit, if any
    pub fn take_error(&mut self) -> Option<anyhow::Error> {
        self.error.take()
    }

    fn create_window(&self, event_loop: &ActiveEventLoop) -> anyhow::Result<Window> {
        let window = &self.settings.window;
        let attributes = Window::default_attributes()
            .with_title(window.title.clone())
            .with_inner_size(PhysicalSize::new(window.width, window.height));

        // DirectComposition content only shows on windows without a
        // redirection bitmap.
        #[cfg(windows)]
        let attributes = {
            use winit::platform::windows::WindowAttributesExtWindows;
            attributes.with_no_redirection_bitmap(true)
        };

        event_loop.create_window(attributes).context("Failed to create window")
    }

    fn start(&mut self, event_loop: &ActiveEventLoop) -> anyhow::Result<()> {
        let window = self.create_window(event_loop)?;
        let mut surface = build_surface(&window, &self.settings)?;

        let size = window.inner_size();
        surface
            .on_surface_loaded(size.width, size.height)
            .context("Failed to start the shared surface")?;

        tracing::info!("✅ Window ready at {}x{}", size.width, size.height);
        window.request_redraw();
        self.window = Some(window);
        self.surface = Some(surface);
        Ok(())
    }

    fn close(&mut self) {
        let Some(surface) = self.surface.as_mut() else {
            return;
        };
        if surface.phase() == LifecyclePhase::Released {
            return;
        }
        if let Err(err) = surface.on_surface_closed() {
            tracing::warn!("⚠️ Surface close failed: {err}");
        }
    }
}

impl ApplicationHandler for InteropApp {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }
        if let Err(err) = self.start(event_loop) {
            tracing::error!("❌ {err:#}");
            self.error = Some(err);
            event_loop.exit();
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _window_id: WindowId, event: WindowEvent) {
        let Some(surface) = self.surface.as_mut() else {
            return;
        };

        match event {
            WindowEvent::Resized(size) => match surface.on_surface_resized(size.width, size.height) {
                Ok(ResizeOutcome::Recreated(generation)) => {
                    tracing::debug!("Resized to {}x{} ({generation})", size.width, size.height);
                }
                Ok(ResizeOutcome::Ignored) => {}
                Err(err) => tracing::warn!("⚠️ Resize to {}x{} failed: {err}", size.width, size.height),
            },
            WindowEvent::CloseRequested => {
                self.close();
                event_loop.exit();
            }
            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        physical_key: PhysicalKey::Code(KeyCode::Space),
                        state: ElementState::Pressed,
                        repeat: false,
                        ..
                    },
                ..
            } => {
                let running = !surface.clock_running();
                surface.on_clock_toggle(running);
            }
            WindowEvent::RedrawRequested if surface.phase() != LifecyclePhase::Released => match surface.on_tick() {
                Ok(TickOutcome::Recovered(generation)) => {
                    tracing::info!("✅ Recovered from device loss ({generation})");
                }
                Ok(TickOutcome::Presented | TickOutcome::Skipped) => {}
                Err(err) => tracing::warn!("⚠️ Frame failed: {err}"),
            },
            _ => {}
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let (Some(window), Some(surface)) = (&self.window, &self.surface) {
            if surface.phase().accepts_ticks() {
                window.request_redraw();
            }
        }
    }

    fn exiting(&mut self, _event_loop: &ActiveEventLoop) {
        self.close();
    }
}
