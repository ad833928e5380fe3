//! In-memory compositing API and render backend for tests
//!
//! Every object the mock API creates registers with a shared
//! [`ResourceTracker`] and unregisters when dropped, so tests can assert that
//! acquisitions and releases balance and happen in the right order.

use crate::backend::RenderBackend;
use crate::device::{
    CompositionApi, GraphicsDevice, PresentationSink, SharedTexture, SurfaceInfo, Swapchain,
};
use crate::error::{BackendError, NativeError, NativeErrorKind};
use crate::types::{Extent, PixelFormat, SharedHandle, SharedTextureDesc, SwapchainDesc};
use parking_lot::{Mutex, MutexGuard};
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    Device,
    Swapchain,
    SharedTexture,
    BackBuffer,
}

#[derive(Default)]
struct TrackerState {
    acquired: HashMap<ResourceKind, usize>,
    released: HashMap<ResourceKind, usize>,
    releases: Vec<ResourceKind>,
    copies: usize,
    presents: Vec<u32>,
    next_id: usize,
}

#[derive(Clone, Default)]
pub struct ResourceTracker(Arc<Mutex<TrackerState>>);

impl ResourceTracker {
    fn acquire(&self, kind: ResourceKind) -> Tracked {
        *self.0.lock().acquired.entry(kind).or_default() += 1;
        Tracked {
            kind,
            tracker: self.clone(),
        }
    }

    fn release(&self, kind: ResourceKind) {
        let mut state = self.0.lock();
        *state.released.entry(kind).or_default() += 1;
        state.releases.push(kind);
    }

    fn next_id(&self) -> usize {
        let mut state = self.0.lock();
        state.next_id += 1;
        0x1000 + state.next_id * 0x10
    }

    pub fn acquired(&self, kind: ResourceKind) -> usize {
        self.0.lock().acquired.get(&kind).copied().unwrap_or(0)
    }

    pub fn live(&self, kind: ResourceKind) -> usize {
        let state = self.0.lock();
        state.acquired.get(&kind).copied().unwrap_or(0) - state.released.get(&kind).copied().unwrap_or(0)
    }

    pub fn total_acquired(&self) -> usize {
        self.0.lock().acquired.values().sum()
    }

    pub fn live_total(&self) -> usize {
        let state = self.0.lock();
        state.acquired.values().sum::<usize>() - state.released.values().sum::<usize>()
    }

    pub fn releases(&self) -> Vec<ResourceKind> {
        self.0.lock().releases.clone()
    }

    pub fn clear_releases(&self) {
        self.0.lock().releases.clear();
    }

    pub fn copies(&self) -> usize {
        self.0.lock().copies
    }

    pub fn presents(&self) -> Vec<u32> {
        self.0.lock().presents.clone()
    }
}

struct Tracked {
    kind: ResourceKind,
    tracker: ResourceTracker,
}

impl Drop for Tracked {
    fn drop(&mut self) {
        self.tracker.release(self.kind);
    }
}

/// Failure injection switches shared by everything one [`MockApi`] creates
#[derive(Default)]
pub struct MockFaults {
    pub device_unavailable: bool,
    pub fail_swapchain_creation: bool,
    pub fail_texture_creation: bool,
    /// Consumed by the next present
    pub present_error: Option<NativeErrorKind>,
}

#[derive(Clone, Default)]
pub struct MockApi {
    tracker: ResourceTracker,
    faults: Arc<Mutex<MockFaults>>,
}

impl MockApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tracker(&self) -> ResourceTracker {
        self.tracker.clone()
    }

    pub fn faults(&self) -> MutexGuard<'_, MockFaults> {
        self.faults.lock()
    }
}

impl CompositionApi for MockApi {
    type Device = MockDevice;

    fn create_device(&self) -> Result<MockDevice, NativeError> {
        if self.faults.lock().device_unavailable {
            return Err(NativeError::new("D3D11CreateDevice", 0x887A_0004, NativeErrorKind::Unsupported));
        }

        Ok(MockDevice {
            _token: self.tracker.acquire(ResourceKind::Device),
            tracker: self.tracker.clone(),
            faults: self.faults.clone(),
        })
    }
}

pub struct MockDevice {
    _token: Tracked,
    tracker: ResourceTracker,
    faults: Arc<Mutex<MockFaults>>,
}

impl GraphicsDevice for MockDevice {
    type Swapchain = MockSwapchain;
    type SharedTexture = MockTexture;
    type BackBuffer = MockBackBuffer;

    fn adapter_name(&self) -> String {
        "Mock Adapter".to_string()
    }

    fn create_swapchain(&self, desc: &SwapchainDesc) -> Result<MockSwapchain, NativeError> {
        if self.faults.lock().fail_swapchain_creation {
            return Err(NativeError::new("CreateSwapChainForComposition", 0x8007_000E, NativeErrorKind::OutOfMemory));
        }

        Ok(MockSwapchain {
            desc: *desc,
            id: self.tracker.next_id(),
            _token: self.tracker.acquire(ResourceKind::Swapchain),
            tracker: self.tracker.clone(),
            faults: self.faults.clone(),
        })
    }

    fn create_shared_texture(&self, desc: &SharedTextureDesc) -> Result<MockTexture, NativeError> {
        if self.faults.lock().fail_texture_creation {
            return Err(NativeError::new("CreateTexture2D", 0x8007_000E, NativeErrorKind::OutOfMemory));
        }

        Ok(MockTexture {
            desc: *desc,
            raw_handle: self.tracker.next_id(),
            _token: self.tracker.acquire(ResourceKind::SharedTexture),
        })
    }

    fn copy_resource(&self, dst: &MockBackBuffer, src: &MockTexture) {
        assert_eq!(dst.extent, src.desc.extent, "full-resource copy between different sizes");
        self.tracker.0.lock().copies += 1;
    }
}

pub struct MockSwapchain {
    desc: SwapchainDesc,
    id: usize,
    _token: Tracked,
    tracker: ResourceTracker,
    faults: Arc<Mutex<MockFaults>>,
}

impl MockSwapchain {
    pub fn desc(&self) -> SwapchainDesc {
        self.desc
    }

    pub fn id(&self) -> usize {
        self.id
    }
}

impl SurfaceInfo for MockSwapchain {
    fn extent(&self) -> Extent {
        self.desc.extent
    }

    fn format(&self) -> PixelFormat {
        self.desc.format
    }
}

impl Swapchain for MockSwapchain {
    type BackBuffer = MockBackBuffer;

    fn back_buffer(&self, index: u32) -> Result<MockBackBuffer, NativeError> {
        if index >= self.desc.buffer_count {
            return Err(NativeError::new("IDXGISwapChain1::GetBuffer", 0x8007_0057, NativeErrorKind::InvalidArgument));
        }

        Ok(MockBackBuffer {
            extent: self.desc.extent,
            format: self.desc.format,
            _token: self.tracker.acquire(ResourceKind::BackBuffer),
        })
    }

    fn present(&self, sync_interval: u32) -> Result<(), NativeError> {
        if let Some(kind) = self.faults.lock().present_error.take() {
            return Err(NativeError::new("IDXGISwapChain1::Present", 0x887A_0005, kind));
        }

        self.tracker.0.lock().presents.push(sync_interval);
        Ok(())
    }
}

pub struct MockTexture {
    desc: SharedTextureDesc,
    raw_handle: usize,
    _token: Tracked,
}

impl MockTexture {
    pub fn desc(&self) -> SharedTextureDesc {
        self.desc
    }
}

impl SurfaceInfo for MockTexture {
    fn extent(&self) -> Extent {
        self.desc.extent
    }

    fn format(&self) -> PixelFormat {
        self.desc.format
    }
}

impl SharedTexture for MockTexture {
    fn raw_shared_handle(&self) -> Result<usize, NativeError> {
        Ok(self.raw_handle)
    }
}

pub struct MockBackBuffer {
    extent: Extent,
    format: PixelFormat,
    _token: Tracked,
}

impl SurfaceInfo for MockBackBuffer {
    fn extent(&self) -> Extent {
        self.extent
    }

    fn format(&self) -> PixelFormat {
        self.format
    }
}

#[derive(Default)]
struct SinkState {
    attached: Option<usize>,
    attach_count: usize,
    replaced_while_attached: usize,
    reset_count: usize,
    fail_next_attach: bool,
}

/// Records which swapchain the "panel" currently shows
#[derive(Clone, Default)]
pub struct MockSink(Arc<Mutex<SinkState>>);

impl MockSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn attached(&self) -> Option<usize> {
        self.0.lock().attached
    }

    pub fn attach_count(&self) -> usize {
        self.0.lock().attach_count
    }

    /// Attaches that happened without a detach of the previous swapchain
    pub fn replaced_while_attached(&self) -> usize {
        self.0.lock().replaced_while_attached
    }

    /// Times the sink was told to drop its device-bound state
    pub fn reset_count(&self) -> usize {
        self.0.lock().reset_count
    }

    pub fn fail_next_attach(&self) {
        self.0.lock().fail_next_attach = true;
    }
}

impl PresentationSink<MockDevice> for MockSink {
    fn attach(&mut self, swapchain: &MockSwapchain) -> Result<(), NativeError> {
        let mut state = self.0.lock();
        if std::mem::take(&mut state.fail_next_attach) {
            return Err(NativeError::new("ISwapChainPanelNative::SetSwapChain", 0x8000_4005, NativeErrorKind::Other));
        }
        if state.attached.is_some() {
            state.replaced_while_attached += 1;
        }
        state.attached = Some(swapchain.id());
        state.attach_count += 1;
        Ok(())
    }

    fn detach(&mut self) -> Result<(), NativeError> {
        self.0.lock().attached = None;
        Ok(())
    }

    fn reset(&mut self) {
        let mut state = self.0.lock();
        state.attached = None;
        state.reset_count += 1;
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum BackendCall {
    Init(SharedHandle, Extent),
    Resize(SharedHandle, Extent),
    Draw(f32),
    Clear,
}

#[derive(Default)]
struct BackendLog {
    calls: Vec<BackendCall>,
    fail_init: bool,
    fail_next_resize: bool,
    fail_draw: bool,
    fail_clear: bool,
}

/// Render backend that only records what it was asked to do
#[derive(Clone, Default)]
pub struct RecordingBackend(Arc<Mutex<BackendLog>>);

impl RecordingBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<BackendCall> {
        self.0.lock().calls.clone()
    }

    pub fn draw_count(&self) -> usize {
        self.0
            .lock()
            .calls
            .iter()
            .filter(|call| matches!(call, BackendCall::Draw(_)))
            .count()
    }

    pub fn resizes(&self) -> Vec<(SharedHandle, Extent)> {
        self.0
            .lock()
            .calls
            .iter()
            .filter_map(|call| match call {
                BackendCall::Resize(handle, extent) => Some((*handle, *extent)),
                _ => None,
            })
            .collect()
    }

    /// The handle the backend would currently be writing into
    pub fn held_handle(&self) -> Option<SharedHandle> {
        self.0.lock().calls.iter().rev().find_map(|call| match call {
            BackendCall::Init(handle, _) | BackendCall::Resize(handle, _) => Some(*handle),
            BackendCall::Clear => None,
            BackendCall::Draw(_) => None,
        })
    }

    pub fn fail_init(&self) {
        self.0.lock().fail_init = true;
    }

    pub fn fail_next_resize(&self) {
        self.0.lock().fail_next_resize = true;
    }

    pub fn fail_draw(&self) {
        self.0.lock().fail_draw = true;
    }

    pub fn fail_clear(&self) {
        self.0.lock().fail_clear = true;
    }
}

impl RenderBackend for RecordingBackend {
    fn init(&mut self, handle: SharedHandle, extent: Extent) -> Result<(), BackendError> {
        let mut log = self.0.lock();
        log.calls.push(BackendCall::Init(handle, extent));
        if log.fail_init {
            return Err(BackendError::new("init", "injected failure"));
        }
        Ok(())
    }

    fn resize(&mut self, handle: SharedHandle, extent: Extent) -> Result<(), BackendError> {
        let mut log = self.0.lock();
        log.calls.push(BackendCall::Resize(handle, extent));
        if std::mem::take(&mut log.fail_next_resize) {
            return Err(BackendError::new("resize", "injected failure"));
        }
        Ok(())
    }

    fn draw_frame(&mut self, elapsed_seconds: f32) -> Result<(), BackendError> {
        let mut log = self.0.lock();
        log.calls.push(BackendCall::Draw(elapsed_seconds));
        if log.fail_draw {
            return Err(BackendError::new("draw_frame", "injected failure"));
        }
        Ok(())
    }

    fn clear(&mut self) -> Result<(), BackendError> {
        let mut log = self.0.lock();
        log.calls.push(BackendCall::Clear);
        if log.fail_clear {
            return Err(BackendError::new("clear", "injected failure"));
        }
        Ok(())
    }
}
