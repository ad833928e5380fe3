//! Render Backend boundary
//!
//! The rendering API that writes into the shared texture is an external
//! collaborator. The core hands it `(handle, extent)` on init/resize and an
//! elapsed time on draw, and only ever looks at a coarse success/failure.
//!
//! [`BackendBoundary`] wraps the collaborator and enforces the call contract:
//!
//! ```text
//! Fresh ──init──► Active(gen) ──resize──► Active(gen') ──clear──► Cleared
//!                   │    ▲
//!                   └draw┘
//! ```

use crate::error::{BackendError, InteropError};
use crate::types::{Extent, GenerationId, SharedHandle};

/// The three-plus-one entry points the core needs from a render backend
pub trait RenderBackend {
    fn init(&mut self, handle: SharedHandle, extent: Extent) -> Result<(), BackendError>;

    /// Re-import after a new generation. The previous handle is already invalid.
    fn resize(&mut self, handle: SharedHandle, extent: Extent) -> Result<(), BackendError>;

    /// Render one frame into the shared texture. Returns once the GPU work is submitted.
    fn draw_frame(&mut self, elapsed_seconds: f32) -> Result<(), BackendError>;

    fn clear(&mut self) -> Result<(), BackendError>;
}

impl<R: RenderBackend + ?Sized> RenderBackend for Box<R> {
    fn init(&mut self, handle: SharedHandle, extent: Extent) -> Result<(), BackendError> {
        (**self).init(handle, extent)
    }

    fn resize(&mut self, handle: SharedHandle, extent: Extent) -> Result<(), BackendError> {
        (**self).resize(handle, extent)
    }

    fn draw_frame(&mut self, elapsed_seconds: f32) -> Result<(), BackendError> {
        (**self).draw_frame(elapsed_seconds)
    }

    fn clear(&mut self) -> Result<(), BackendError> {
        (**self).clear()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BoundaryState {
    Fresh,
    /// `current` is the generation whose handle the backend holds, or `None`
    /// when the last resize failed and the backend may hold a stale handle.
    Active { current: Option<GenerationId> },
    Cleared,
}

/// Sequencing guard around a [`RenderBackend`]
pub struct BackendBoundary<R> {
    backend: R,
    state: BoundaryState,
}

impl<R: RenderBackend> BackendBoundary<R> {
    pub fn new(backend: R) -> Self {
        Self {
            backend,
            state: BoundaryState::Fresh,
        }
    }

    pub fn is_initialized(&self) -> bool {
        matches!(self.state, BoundaryState::Active { .. })
    }

    pub fn is_cleared(&self) -> bool {
        self.state == BoundaryState::Cleared
    }

    /// The generation the backend is currently rendering into, if any
    pub fn current_generation(&self) -> Option<GenerationId> {
        match self.state {
            BoundaryState::Active { current } => current,
            _ => None,
        }
    }

    pub fn init(&mut self, handle: SharedHandle, extent: Extent) -> Result<(), InteropError> {
        if self.state != BoundaryState::Fresh {
            return Err(InteropError::Contract("init called more than once"));
        }

        self.backend.init(handle, extent)?;
        self.state = BoundaryState::Active {
            current: Some(handle.generation()),
        };
        tracing::info!("✨ Render backend initialized with {handle} at {extent}");
        Ok(())
    }

    pub fn resize(&mut self, handle: SharedHandle, extent: Extent) -> Result<(), InteropError> {
        let BoundaryState::Active { current } = self.state else {
            return Err(InteropError::Contract("resize called outside an initialized backend"));
        };
        if current.is_some_and(|id| handle.generation() <= id) {
            return Err(InteropError::Contract("resize called with a handle that is not newer"));
        }

        // Whatever happens next, the old handle is gone.
        self.state = BoundaryState::Active { current: None };
        self.backend.resize(handle, extent)?;
        self.state = BoundaryState::Active {
            current: Some(handle.generation()),
        };
        tracing::debug!("✨ Render backend resized to {handle} at {extent}");
        Ok(())
    }

    /// Draw into `generation`. Skipped (returns `Ok(false)`) when the backend
    /// does not hold that generation's handle.
    pub fn draw_frame(&mut self, generation: GenerationId, elapsed_seconds: f32) -> Result<bool, InteropError> {
        match self.state {
            BoundaryState::Active { current: Some(id) } if id == generation => {
                self.backend.draw_frame(elapsed_seconds)?;
                Ok(true)
            }
            BoundaryState::Active { .. } => Ok(false),
            _ => Err(InteropError::Contract("draw_frame called outside an initialized backend")),
        }
    }

    /// Tell the backend to release everything. Runs at most once; a backend
    /// that was never initialized is not called.
    pub fn clear(&mut self) -> Result<(), InteropError> {
        match self.state {
            BoundaryState::Cleared => Err(InteropError::Contract("clear called more than once")),
            BoundaryState::Fresh => {
                self.state = BoundaryState::Cleared;
                Ok(())
            }
            BoundaryState::Active { .. } => {
                self.state = BoundaryState::Cleared;
                self.backend.clear()?;
                tracing::info!("✨ Render backend cleared");
                Ok(())
            }
        }
    }

    pub fn inner(&self) -> &R {
        &self.backend
    }
}
