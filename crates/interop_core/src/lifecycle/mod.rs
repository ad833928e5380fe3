//! Surface Lifecycle Controller
//!
//! ```text
//! Uninitialized ──loaded──► DeviceReady ──bind──► Bound ──start──► Running ──closed──► Released
//!                                                                  │  ▲  │
//!                                                          resized └──┘  └─present: device lost─► Lost
//!                                                                                                  │
//!                                                                            Running ◄──recover────┘
//! ```
//!
//! [`states`] holds the typed states whose transitions consume `self`.
//! [`SurfaceLifecycle`] keeps whichever of them is current and turns host
//! notifications into transitions, rejecting events that arrive in a phase
//! where they make no sense.

mod states;

#[cfg(test)]
mod tests;

pub use states::{Bound, DeviceReady, Lost, Released, ResizeOutcome, Running, TickOutcome};

use crate::backend::{BackendBoundary, RenderBackend};
use crate::clock::Clock;
use crate::device::{CompositionApi, PresentationSink};
use crate::error::{HostEvent, InteropError};
use crate::presenter::FramePresenter;
use crate::types::{Extent, GenerationId, SharedHandle};

/// Tunables the host passes in when building the controller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LifecycleOptions {
    /// Present interval; 0 presents immediately
    pub sync_interval: u32,
    /// Rebuild device and generation when present reports device loss
    pub recover_device_lost: bool,
    /// Start the clock as soon as the surface is loaded
    pub start_clock: bool,
}

impl Default for LifecycleOptions {
    fn default() -> Self {
        Self {
            sync_interval: 0,
            recover_device_lost: true,
            start_clock: true,
        }
    }
}

/// Coarse view of the controller's state for hosts and logs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecyclePhase {
    Uninitialized,
    Running,
    /// Running without a generation after a failed resize
    Degraded,
    /// Device lost and recovery has not succeeded yet
    Lost,
    Released,
}

impl LifecyclePhase {
    pub fn name(self) -> &'static str {
        match self {
            Self::Uninitialized => "uninitialized",
            Self::Running => "running",
            Self::Degraded => "degraded",
            Self::Lost => "lost",
            Self::Released => "released",
        }
    }

    /// Whether the host should keep delivering ticks
    pub fn accepts_ticks(self) -> bool {
        matches!(self, Self::Running | Self::Degraded)
    }
}

/// Host notifications, as consumed from the UI framework
///
/// Object safe, so a host can drive a controller without naming the
/// compositing API or render backend types.
pub trait SurfaceEvents {
    fn on_surface_loaded(&mut self, width: u32, height: u32) -> Result<(), InteropError>;

    fn on_surface_resized(&mut self, width: u32, height: u32) -> Result<ResizeOutcome, InteropError>;

    fn on_surface_closed(&mut self) -> Result<(), InteropError>;

    fn on_clock_toggle(&mut self, running: bool);

    fn on_tick(&mut self) -> Result<TickOutcome, InteropError>;

    fn phase(&self) -> LifecyclePhase;

    fn clock_running(&self) -> bool;
}

enum Phase<A: CompositionApi> {
    Uninitialized,
    Running(Running<A::Device>),
    Lost(Lost),
    Released(Released),
}

/// Owns the compositing API entry point, the presentation sink, the render
/// backend and the clock, and sequences them through the lifecycle.
pub struct SurfaceLifecycle<A, S, R>
where
    A: CompositionApi,
    S: PresentationSink<A::Device>,
    R: RenderBackend,
{
    phase: Phase<A>,
    backend: BackendBoundary<R>,
    sink: S,
    api: A,
    clock: Clock,
    options: LifecycleOptions,
}

impl<A, S, R> SurfaceLifecycle<A, S, R>
where
    A: CompositionApi,
    S: PresentationSink<A::Device>,
    R: RenderBackend,
{
    pub fn new(api: A, sink: S, backend: R, options: LifecycleOptions) -> Self {
        Self {
            phase: Phase::Uninitialized,
            backend: BackendBoundary::new(backend),
            sink,
            api,
            clock: Clock::new(),
            options,
        }
    }

    pub fn clock(&self) -> &Clock {
        &self.clock
    }

    pub fn backend(&self) -> &R {
        self.backend.inner()
    }

    /// Handle of the generation currently on screen
    pub fn current_handle(&self) -> Option<SharedHandle> {
        match &self.phase {
            Phase::Running(running) => running.generation().map(|generation| generation.handle()),
            _ => None,
        }
    }

    /// Last size requested by the host, once loaded
    pub fn current_extent(&self) -> Option<Extent> {
        match &self.phase {
            Phase::Running(running) => Some(running.extent()),
            Phase::Lost(lost) => Some(lost.extent()),
            _ => None,
        }
    }

    pub fn frames_presented(&self) -> u64 {
        match &self.phase {
            Phase::Running(running) => running.frames_presented(),
            Phase::Released(released) => released.frames_presented(),
            _ => 0,
        }
    }

    fn reject<T>(&self, event: HostEvent) -> Result<T, InteropError> {
        let phase = self.phase().name();
        tracing::warn!("⚠️ Ignoring {event} while {phase}");
        Err(InteropError::InvalidTransition { event, phase })
    }

    fn try_recover(&mut self, lost: Lost) -> Result<GenerationId, InteropError> {
        let presenter = FramePresenter::new(self.options.sync_interval);
        let id = lost.next_generation();
        match lost.recover(&self.api, presenter, &mut self.sink, &mut self.backend) {
            Ok(running) => {
                tracing::info!("✅ Recovered from device loss with {id}");
                self.phase = Phase::Running(running);
                Ok(id)
            }
            Err(err) => {
                tracing::error!("❌ Device recovery failed, waiting for the next resize: {err}");
                self.phase = Phase::Lost(lost);
                Err(err)
            }
        }
    }
}

impl<A, S, R> SurfaceEvents for SurfaceLifecycle<A, S, R>
where
    A: CompositionApi,
    S: PresentationSink<A::Device>,
    R: RenderBackend,
{
    /// Create the device and the first generation, initialize the backend and
    /// start presenting. Any failure leaves the controller uninitialized with
    /// nothing allocated.
    fn on_surface_loaded(&mut self, width: u32, height: u32) -> Result<(), InteropError> {
        if !matches!(self.phase, Phase::Uninitialized) {
            return self.reject(HostEvent::SurfaceLoaded);
        }

        let extent = Extent::clamped(width, height);
        tracing::info!("🚀 Surface loaded at {extent}");

        let bound = DeviceReady::initialize(&self.api, GenerationId::new(1))?.bind(
            extent,
            &mut self.sink,
            &mut self.backend,
        )?;
        let running = bound.start(FramePresenter::new(self.options.sync_interval));

        if self.options.start_clock {
            self.clock.start();
        }
        self.phase = Phase::Running(running);
        Ok(())
    }

    fn on_surface_resized(&mut self, width: u32, height: u32) -> Result<ResizeOutcome, InteropError> {
        let extent = Extent::new(width, height);

        match &mut self.phase {
            Phase::Running(running) => running.resize(extent, &mut self.sink, &mut self.backend),
            Phase::Lost(_) if extent.is_empty() || !self.options.recover_device_lost => {
                Ok(ResizeOutcome::Ignored)
            }
            Phase::Lost(lost) => {
                let lost = lost.with_extent(extent);
                self.try_recover(lost).map(ResizeOutcome::Recreated)
            }
            Phase::Uninitialized | Phase::Released(_) => self.reject(HostEvent::SurfaceResized),
        }
    }

    fn on_surface_closed(&mut self) -> Result<(), InteropError> {
        let released = match std::mem::replace(&mut self.phase, Phase::Uninitialized) {
            Phase::Running(running) => running.release(&mut self.sink, &mut self.backend),
            Phase::Lost(_) | Phase::Uninitialized => {
                if let Err(err) = self.backend.clear() {
                    tracing::warn!("⚠️ Render backend clear failed during shutdown: {err}");
                }
                Released::default()
            }
            Phase::Released(released) => {
                self.phase = Phase::Released(released);
                return self.reject(HostEvent::SurfaceClosed);
            }
        };

        self.clock.stop();
        self.phase = Phase::Released(released);
        Ok(())
    }

    fn on_clock_toggle(&mut self, running: bool) {
        tracing::debug!("Clock {}", if running { "started" } else { "stopped" });
        self.clock.set_running(running);
    }

    /// Draw and present one frame. A present that reports device loss
    /// triggers recovery when enabled.
    fn on_tick(&mut self) -> Result<TickOutcome, InteropError> {
        match std::mem::replace(&mut self.phase, Phase::Uninitialized) {
            Phase::Running(mut running) => match running.tick(&self.clock, &mut self.backend) {
                Err(InteropError::DeviceLost(err)) => {
                    tracing::warn!("⚠️ Presentation device lost: {err}");
                    let lost = running.into_lost(&mut self.sink);
                    if self.options.recover_device_lost {
                        self.try_recover(lost).map(TickOutcome::Recovered)
                    } else {
                        self.phase = Phase::Lost(lost);
                        Err(InteropError::DeviceLost(err))
                    }
                }
                outcome => {
                    if let Err(err) = &outcome {
                        tracing::warn!("⚠️ Frame failed: {err}");
                    }
                    self.phase = Phase::Running(running);
                    outcome
                }
            },
            Phase::Lost(lost) => {
                self.phase = Phase::Lost(lost);
                Ok(TickOutcome::Skipped)
            }
            other => {
                self.phase = other;
                self.reject(HostEvent::Tick)
            }
        }
    }

    fn phase(&self) -> LifecyclePhase {
        match &self.phase {
            Phase::Uninitialized => LifecyclePhase::Uninitialized,
            Phase::Running(running) if running.is_degraded() => LifecyclePhase::Degraded,
            Phase::Running(_) => LifecyclePhase::Running,
            Phase::Lost(_) => LifecyclePhase::Lost,
            Phase::Released(_) => LifecyclePhase::Released,
        }
    }

    fn clock_running(&self) -> bool {
        self.clock.is_running()
    }
}
