//! Window host
//!
//! Maps winit events onto the surface lifecycle:
//!
//! ```text
//! resumed (first)          ──► on_surface_loaded(inner_size)
//! WindowEvent::Resized     ──► on_surface_resized
//! WindowEvent::CloseRequested ► on_surface_closed, then exit
//! Space                    ──► on_clock_toggle
//! RedrawRequested          ──► on_tick   (requested from about_to_wait while running)
//! ```

mod app;
mod platform;

pub use app::InteropApp;
pub use platform::build_surface;

use crate::settings::InteropSettings;
use anyhow::Context;
use winit::event_loop::{ControlFlow, EventLoop};

/// Run the event loop until the window closes. Returns the fatal error that
/// stopped it, if any.
pub fn run(settings: InteropSettings) -> anyhow::Result<()> {
    let event_loop = EventLoop::new().context("Failed to create event loop")?;
    event_loop.set_control_flow(ControlFlow::Wait);

    let mut app = InteropApp::new(settings);
    event_loop.run_app(&mut app).context("Event loop terminated abnormally")?;

    match app.take_error() {
        Some(err) => Err(err),
        None => Ok(()),
    }
}
