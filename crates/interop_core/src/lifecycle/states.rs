//! Typed lifecycle states
//!
//! Each state owns exactly the resources that exist in it, and every
//! transition consumes the previous state. A resize before the device exists
//! or a tick after release has no method to call.

use crate::backend::{BackendBoundary, RenderBackend};
use crate::clock::Clock;
use crate::device::{CompositionApi, GraphicsDevice, PresentationDevice, PresentationSink};
use crate::error::InteropError;
use crate::presenter::FramePresenter;
use crate::surface::Generation;
use crate::types::{Extent, GenerationId};

/// Device created, nothing allocated yet
pub struct DeviceReady<D: GraphicsDevice> {
    device: PresentationDevice<D>,
    next_generation: GenerationId,
}

impl<D: GraphicsDevice> DeviceReady<D> {
    /// `first_generation` continues the numbering of a previous device, so
    /// handles handed to the backend keep increasing across recoveries.
    pub fn initialize<A>(api: &A, first_generation: GenerationId) -> Result<Self, InteropError>
    where
        A: CompositionApi<Device = D>,
    {
        Ok(Self {
            device: PresentationDevice::initialize(api)?,
            next_generation: first_generation,
        })
    }

    /// Allocate the first generation, attach it and hand its handle to the
    /// backend: `init` on a fresh backend, `resize` on one that survived a
    /// device loss.
    pub fn bind<S, R>(
        self,
        extent: Extent,
        sink: &mut S,
        backend: &mut BackendBoundary<R>,
    ) -> Result<Bound<D>, InteropError>
    where
        S: PresentationSink<D>,
        R: RenderBackend,
    {
        let id = self.next_generation;
        let generation = Generation::allocate(&self.device, id, extent)?;
        sink.attach(generation.swapchain()).map_err(InteropError::Bind)?;

        let notified = if backend.is_initialized() {
            backend.resize(generation.handle(), extent)
        } else {
            backend.init(generation.handle(), extent)
        };
        if let Err(err) = notified {
            detach_logged::<D, S>(sink);
            sink.reset();
            return Err(err);
        }

        Ok(Bound {
            generation,
            device: self.device,
            next_generation: id.next(),
            extent,
        })
    }
}

/// First generation attached and known to the backend, not yet ticking
pub struct Bound<D: GraphicsDevice> {
    generation: Generation<D>,
    device: PresentationDevice<D>,
    next_generation: GenerationId,
    extent: Extent,
}

impl<D: GraphicsDevice> Bound<D> {
    pub fn start(self, presenter: FramePresenter) -> Running<D> {
        tracing::info!("🚀 Presenting {} at {}", self.generation.id(), self.extent);
        Running {
            generation: Some(self.generation),
            device: self.device,
            presenter,
            next_generation: self.next_generation,
            extent: self.extent,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResizeOutcome {
    /// Zero-sized request, nothing touched
    Ignored,
    Recreated(GenerationId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    Presented,
    /// No generation to present (degraded or lost)
    Skipped,
    /// The device was lost on present and has been rebuilt
    Recovered(GenerationId),
}

/// Accepting ticks and resizes
///
/// `generation` is `None` while degraded: the last resize could not allocate
/// and the next one retries. Field order keeps the generation ahead of the
/// device it was created from.
pub struct Running<D: GraphicsDevice> {
    generation: Option<Generation<D>>,
    device: PresentationDevice<D>,
    presenter: FramePresenter,
    next_generation: GenerationId,
    extent: Extent,
}

impl<D: GraphicsDevice> Running<D> {
    pub fn generation(&self) -> Option<&Generation<D>> {
        self.generation.as_ref()
    }

    pub fn is_degraded(&self) -> bool {
        self.generation.is_none()
    }

    pub fn extent(&self) -> Extent {
        self.extent
    }

    pub fn frames_presented(&self) -> u64 {
        self.presenter.frames_presented()
    }

    /// Replace the current generation with one of `extent`.
    ///
    /// The old generation is released before the new one is created. If the
    /// allocation or the attach fails the controller is left degraded.
    pub fn resize<S, R>(
        &mut self,
        extent: Extent,
        sink: &mut S,
        backend: &mut BackendBoundary<R>,
    ) -> Result<ResizeOutcome, InteropError>
    where
        S: PresentationSink<D>,
        R: RenderBackend,
    {
        if extent.is_empty() {
            tracing::debug!("Ignoring resize to {extent}");
            return Ok(ResizeOutcome::Ignored);
        }

        if self.generation.is_some() {
            detach_logged::<D, S>(sink);
        }
        self.generation = None;
        self.extent = extent;

        let id = self.next_generation;
        self.next_generation = id.next();

        let generation = Generation::allocate(&self.device, id, extent).map_err(|err| {
            tracing::error!("❌ Resize to {extent} failed, surface is degraded: {err}");
            InteropError::from(err)
        })?;
        sink.attach(generation.swapchain()).map_err(|err| {
            tracing::error!("❌ Failed to attach {id}: {err}");
            InteropError::Bind(err)
        })?;

        let handle = generation.handle();
        self.generation = Some(generation);

        // The generation stays on screen even if the backend cannot follow;
        // draws are skipped until a later resize succeeds.
        backend.resize(handle, extent)?;
        Ok(ResizeOutcome::Recreated(id))
    }

    /// Draw into the current generation, then copy and present it.
    pub fn tick<R: RenderBackend>(
        &mut self,
        clock: &Clock,
        backend: &mut BackendBoundary<R>,
    ) -> Result<TickOutcome, InteropError> {
        let Some(generation) = &self.generation else {
            return Ok(TickOutcome::Skipped);
        };

        match backend.draw_frame(generation.id(), clock.elapsed_seconds()) {
            Ok(_) => {}
            Err(InteropError::Backend(err)) => tracing::warn!("⚠️ {err}"),
            Err(err) => return Err(err),
        }

        self.presenter
            .present_frame(&self.device, generation)
            .map_err(|err| {
                if err.is_device_lost() {
                    InteropError::DeviceLost(err)
                } else {
                    InteropError::Present(err)
                }
            })?;

        Ok(TickOutcome::Presented)
    }

    /// Tear down everything after the device was lost
    pub fn into_lost<S: PresentationSink<D>>(self, sink: &mut S) -> Lost {
        let Running {
            generation,
            device,
            next_generation,
            extent,
            ..
        } = self;

        if generation.is_some() {
            detach_logged::<D, S>(sink);
        }
        sink.reset();
        drop(generation);
        drop(device);

        Lost {
            extent,
            next_generation,
        }
    }

    /// Shut down: backend clear, detach, release generation, release device.
    ///
    /// Never fails; every error on the way is logged and skipped.
    pub fn release<S, R>(self, sink: &mut S, backend: &mut BackendBoundary<R>) -> Released
    where
        S: PresentationSink<D>,
        R: RenderBackend,
    {
        let Running {
            generation,
            device,
            presenter,
            ..
        } = self;

        if let Err(err) = backend.clear() {
            tracing::warn!("⚠️ Render backend clear failed during shutdown: {err}");
        }
        if generation.is_some() {
            detach_logged::<D, S>(sink);
        }
        sink.reset();
        drop(generation);
        drop(device);

        tracing::info!("✅ Surface released after {} frames", presenter.frames_presented());
        Released {
            frames_presented: presenter.frames_presented(),
        }
    }
}

/// The device is gone; only the size and generation numbering survive
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Lost {
    extent: Extent,
    next_generation: GenerationId,
}

impl Lost {
    pub fn extent(&self) -> Extent {
        self.extent
    }

    /// Id the rebuilt generation will carry
    pub fn next_generation(&self) -> GenerationId {
        self.next_generation
    }

    pub fn with_extent(self, extent: Extent) -> Self {
        Self { extent, ..self }
    }

    /// Rebuild device and generation at the remembered size.
    pub fn recover<A, S, R>(
        &self,
        api: &A,
        presenter: FramePresenter,
        sink: &mut S,
        backend: &mut BackendBoundary<R>,
    ) -> Result<Running<A::Device>, InteropError>
    where
        A: CompositionApi,
        S: PresentationSink<A::Device>,
        R: RenderBackend,
    {
        tracing::info!("🔄 Recreating presentation device at {}", self.extent);
        let bound = DeviceReady::initialize(api, self.next_generation)?.bind(self.extent, sink, backend)?;
        Ok(bound.start(presenter))
    }
}

/// Terminal state
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Released {
    frames_presented: u64,
}

impl Released {
    pub fn frames_presented(&self) -> u64 {
        self.frames_presented
    }
}

fn detach_logged<D: GraphicsDevice, S: PresentationSink<D>>(sink: &mut S) {
    if let Err(err) = sink.detach() {
        tracing::warn!("⚠️ Failed to detach swapchain from the display surface: {err}");
    }
}
