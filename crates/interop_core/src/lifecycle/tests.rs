use super::*;
use crate::error::{HostEvent, NativeErrorKind};
use crate::mock::{BackendCall, MockApi, MockSink, RecordingBackend, ResourceKind};

type MockLifecycle = SurfaceLifecycle<MockApi, MockSink, RecordingBackend>;

struct Harness {
    surface: MockLifecycle,
    api: MockApi,
    sink: MockSink,
    backend: RecordingBackend,
}

fn harness(options: LifecycleOptions) -> Harness {
    let api = MockApi::new();
    let sink = MockSink::new();
    let backend = RecordingBackend::new();
    let surface = SurfaceLifecycle::new(api.clone(), sink.clone(), backend.clone(), options);

    Harness {
        surface,
        api,
        sink,
        backend,
    }
}

fn loaded(width: u32, height: u32) -> Harness {
    let mut h = harness(LifecycleOptions::default());
    h.surface.on_surface_loaded(width, height).unwrap();
    h
}

fn count(calls: &[BackendCall], pred: impl Fn(&BackendCall) -> bool) -> usize {
    calls.iter().filter(|call| pred(call)).count()
}

#[test]
fn test_end_to_end_load_tick_resize_close() {
    let mut h = harness(LifecycleOptions::default());

    h.surface.on_surface_loaded(800, 600).unwrap();
    let h0 = h.surface.current_handle().unwrap();
    assert_eq!(h.backend.calls(), vec![BackendCall::Init(h0, Extent::new(800, 600))]);

    for frame in 1..=10 {
        assert_eq!(h.surface.on_tick().unwrap(), TickOutcome::Presented);
        assert_eq!(h.surface.current_handle(), Some(h0));
        assert_eq!(h.backend.draw_count(), frame);
        assert_eq!(h.api.tracker().presents().len(), frame);
    }
    assert_eq!(h.api.tracker().copies(), 10);

    let outcome = h.surface.on_surface_resized(1024, 768).unwrap();
    let h1 = h.surface.current_handle().unwrap();
    assert_eq!(outcome, ResizeOutcome::Recreated(h1.generation()));
    assert_ne!(h1, h0);
    assert_ne!(h1.raw(), h0.raw());
    assert_eq!(h.backend.resizes(), vec![(h1, Extent::new(1024, 768))]);

    let tracker = h.api.tracker();
    assert_eq!(tracker.acquired(ResourceKind::SharedTexture), 2);
    assert_eq!(tracker.live(ResourceKind::SharedTexture), 1);
    assert_eq!(tracker.live(ResourceKind::BackBuffer), 1);
    assert_eq!(tracker.live(ResourceKind::Swapchain), 1);

    for _ in 0..3 {
        assert_eq!(h.surface.on_tick().unwrap(), TickOutcome::Presented);
    }
    assert_eq!(h.backend.draw_count(), 13);

    h.surface.on_surface_closed().unwrap();
    let calls = h.backend.calls();
    assert_eq!(count(&calls, |call| *call == BackendCall::Clear), 1);
    assert_eq!(calls.last(), Some(&BackendCall::Clear));
    assert_eq!(tracker.live_total(), 0);
    assert_eq!(h.surface.phase(), LifecyclePhase::Released);
    assert_eq!(h.surface.frames_presented(), 13);
}

#[test]
fn test_init_precedes_everything_and_clear_is_last() {
    let mut h = loaded(320, 240);
    h.surface.on_tick().unwrap();
    h.surface.on_surface_resized(640, 480).unwrap();
    h.surface.on_tick().unwrap();
    h.surface.on_surface_closed().unwrap();

    let calls = h.backend.calls();
    assert!(matches!(calls.first(), Some(BackendCall::Init(..))));
    assert_eq!(count(&calls, |call| matches!(call, BackendCall::Init(..))), 1);
    assert_eq!(calls.last(), Some(&BackendCall::Clear));
}

#[test]
fn test_shutdown_releases_every_resource() {
    let mut h = loaded(1920, 1080);
    h.surface.on_surface_resized(1280, 720).unwrap();
    h.surface.on_surface_resized(1280, 720).unwrap();
    h.surface.on_tick().unwrap();

    let tracker = h.api.tracker();
    assert!(tracker.total_acquired() > 0);

    h.surface.on_surface_closed().unwrap();
    assert_eq!(tracker.live_total(), 0);
    assert_eq!(h.sink.attached(), None);
    assert!(!h.surface.clock_running());
}

#[test]
fn test_device_released_after_its_resources() {
    let mut h = loaded(64, 64);
    h.api.tracker().clear_releases();

    h.surface.on_surface_closed().unwrap();
    assert_eq!(
        h.api.tracker().releases(),
        vec![
            ResourceKind::SharedTexture,
            ResourceKind::BackBuffer,
            ResourceKind::Swapchain,
            ResourceKind::Device,
        ]
    );
}

#[test]
fn test_clear_failure_does_not_stop_shutdown() {
    let mut h = loaded(64, 64);
    h.backend.fail_clear();

    h.surface.on_surface_closed().unwrap();
    assert_eq!(h.api.tracker().live_total(), 0);
    assert_eq!(h.surface.phase(), LifecyclePhase::Released);
}

#[test]
fn test_zero_size_resize_is_ignored() {
    let mut h = loaded(800, 600);
    let before = h.surface.current_handle();
    let acquired = h.api.tracker().total_acquired();

    for (w, h_) in [(0, 0), (0, 600), (800, 0)] {
        assert_eq!(h.surface.on_surface_resized(w, h_).unwrap(), ResizeOutcome::Ignored);
    }

    assert_eq!(h.surface.current_handle(), before);
    assert_eq!(h.api.tracker().total_acquired(), acquired);
    assert!(h.backend.resizes().is_empty());
    assert_eq!(h.surface.current_extent(), Some(Extent::new(800, 600)));
}

#[test]
fn test_same_size_resize_recreates_once_per_event() {
    let mut h = loaded(800, 600);
    let h0 = h.surface.current_handle().unwrap();

    h.surface.on_surface_resized(800, 600).unwrap();
    let h1 = h.surface.current_handle().unwrap();
    h.surface.on_surface_resized(800, 600).unwrap();
    let h2 = h.surface.current_handle().unwrap();

    assert_ne!(h0.raw(), h1.raw());
    assert_ne!(h1.raw(), h2.raw());
    assert_eq!(
        h.backend.resizes(),
        vec![(h1, Extent::new(800, 600)), (h2, Extent::new(800, 600))]
    );
    assert_eq!(h.api.tracker().live(ResourceKind::SharedTexture), 1);
}

#[test]
fn test_backend_only_holds_current_handle_after_resize() {
    let mut h = loaded(800, 600);

    for (w, ht) in [(1024, 768), (640, 480), (1, 1), (2560, 1440)] {
        h.surface.on_surface_resized(w, ht).unwrap();
        assert_eq!(h.backend.held_handle(), h.surface.current_handle());
        assert_eq!(h.api.tracker().live(ResourceKind::Swapchain), 1);
    }

    assert_eq!(h.sink.attach_count(), 5);
    assert_eq!(h.sink.replaced_while_attached(), 0);
}

#[test]
fn test_failed_resize_degrades_until_next_resize() {
    let mut h = loaded(800, 600);
    h.surface.on_tick().unwrap();
    h.api.faults().fail_texture_creation = true;

    let err = h.surface.on_surface_resized(1024, 768).unwrap_err();
    assert!(matches!(err, InteropError::Surface(_)));
    assert_eq!(h.surface.phase(), LifecyclePhase::Degraded);
    assert_eq!(h.surface.current_handle(), None);

    let tracker = h.api.tracker();
    assert_eq!(tracker.live(ResourceKind::Swapchain), 0);
    assert_eq!(tracker.live(ResourceKind::SharedTexture), 0);
    assert_eq!(tracker.live(ResourceKind::Device), 1);
    assert!(h.backend.resizes().is_empty());

    assert_eq!(h.surface.on_tick().unwrap(), TickOutcome::Skipped);
    assert_eq!(h.backend.draw_count(), 1);

    h.api.faults().fail_texture_creation = false;
    h.surface.on_surface_resized(1024, 768).unwrap();
    assert_eq!(h.surface.phase(), LifecyclePhase::Running);
    assert_eq!(h.backend.held_handle(), h.surface.current_handle());

    assert_eq!(h.surface.on_tick().unwrap(), TickOutcome::Presented);
    assert_eq!(h.backend.draw_count(), 2);
}

#[test]
fn test_backend_resize_failure_keeps_presenting_without_drawing() {
    let mut h = loaded(800, 600);
    h.backend.fail_next_resize();

    let err = h.surface.on_surface_resized(1024, 768).unwrap_err();
    assert!(matches!(err, InteropError::Backend(_)));
    assert_eq!(h.surface.phase(), LifecyclePhase::Running);

    assert_eq!(h.surface.on_tick().unwrap(), TickOutcome::Presented);
    assert_eq!(h.backend.draw_count(), 0);
    assert_eq!(h.api.tracker().presents().len(), 1);

    h.surface.on_surface_resized(1024, 768).unwrap();
    h.surface.on_tick().unwrap();
    assert_eq!(h.backend.draw_count(), 1);
}

#[test]
fn test_draw_failure_still_presents() {
    let mut h = loaded(128, 128);
    h.backend.fail_draw();

    assert_eq!(h.surface.on_tick().unwrap(), TickOutcome::Presented);
    assert_eq!(h.api.tracker().presents().len(), 1);
}

#[test]
fn test_device_lost_recovers_without_second_init() {
    let mut h = loaded(800, 600);
    h.surface.on_tick().unwrap();
    let before = h.surface.current_handle().unwrap();
    h.api.faults().present_error = Some(NativeErrorKind::DeviceLost);

    let outcome = h.surface.on_tick().unwrap();
    let after = h.surface.current_handle().unwrap();
    assert_eq!(outcome, TickOutcome::Recovered(after.generation()));
    assert!(after.generation() > before.generation());

    let tracker = h.api.tracker();
    assert_eq!(tracker.acquired(ResourceKind::Device), 2);
    assert_eq!(tracker.live(ResourceKind::Device), 1);
    assert_eq!(tracker.live(ResourceKind::SharedTexture), 1);

    let calls = h.backend.calls();
    assert_eq!(count(&calls, |call| matches!(call, BackendCall::Init(..))), 1);
    assert_eq!(calls.last(), Some(&BackendCall::Resize(after, Extent::new(800, 600))));

    assert_eq!(h.surface.on_tick().unwrap(), TickOutcome::Presented);
    h.surface.on_surface_closed().unwrap();
    assert_eq!(tracker.live_total(), 0);
}

#[test]
fn test_device_lost_without_recovery_stays_lost() {
    let mut h = harness(LifecycleOptions {
        recover_device_lost: false,
        ..LifecycleOptions::default()
    });
    h.surface.on_surface_loaded(800, 600).unwrap();
    h.api.faults().present_error = Some(NativeErrorKind::DeviceLost);

    let err = h.surface.on_tick().unwrap_err();
    assert!(matches!(err, InteropError::DeviceLost(_)));
    assert_eq!(h.surface.phase(), LifecyclePhase::Lost);
    assert!(!h.surface.phase().accepts_ticks());

    let tracker = h.api.tracker();
    assert_eq!(tracker.acquired(ResourceKind::Device), 1);
    assert_eq!(tracker.live_total(), 0);

    // Nothing is drawn or presented on the lost device, and resizes don't
    // bring it back.
    let draws = h.backend.draw_count();
    assert_eq!(h.surface.on_tick().unwrap(), TickOutcome::Skipped);
    assert_eq!(h.backend.draw_count(), draws);
    assert_eq!(h.surface.on_surface_resized(640, 480).unwrap(), ResizeOutcome::Ignored);
    assert_eq!(h.surface.phase(), LifecyclePhase::Lost);
    assert_eq!(tracker.acquired(ResourceKind::Device), 1);

    h.surface.on_surface_closed().unwrap();
    assert_eq!(h.backend.calls().last(), Some(&BackendCall::Clear));
    assert_eq!(h.surface.phase(), LifecyclePhase::Released);
}

#[test]
fn test_sink_keeps_device_state_across_resizes() {
    let mut h = loaded(800, 600);
    for (width, height) in [(1024, 768), (640, 480), (1920, 1080)] {
        h.surface.on_surface_resized(width, height).unwrap();
        h.surface.on_tick().unwrap();
    }
    assert_eq!(h.sink.attach_count(), 4);
    assert_eq!(h.sink.reset_count(), 0);

    h.api.faults().present_error = Some(NativeErrorKind::DeviceLost);
    assert!(matches!(h.surface.on_tick().unwrap(), TickOutcome::Recovered(_)));
    assert_eq!(h.sink.reset_count(), 1);
    assert!(h.sink.attached().is_some());

    h.surface.on_surface_closed().unwrap();
    assert_eq!(h.sink.reset_count(), 2);
    assert_eq!(h.sink.attached(), None);
}

#[test]
fn test_failed_recovery_waits_for_resize() {
    let mut h = loaded(800, 600);
    h.api.faults().present_error = Some(NativeErrorKind::DeviceLost);
    h.api.faults().device_unavailable = true;

    let err = h.surface.on_tick().unwrap_err();
    assert!(matches!(err, InteropError::DeviceUnavailable(_)));
    assert_eq!(h.surface.phase(), LifecyclePhase::Lost);
    assert_eq!(h.api.tracker().live_total(), 0);

    assert_eq!(h.surface.on_tick().unwrap(), TickOutcome::Skipped);
    assert_eq!(h.surface.on_surface_resized(0, 0).unwrap(), ResizeOutcome::Ignored);

    h.api.faults().device_unavailable = false;
    assert!(matches!(
        h.surface.on_surface_resized(640, 480).unwrap(),
        ResizeOutcome::Recreated(_)
    ));
    assert_eq!(h.surface.phase(), LifecyclePhase::Running);
    assert_eq!(h.surface.current_extent(), Some(Extent::new(640, 480)));
    assert_eq!(
        h.backend.calls().last(),
        Some(&BackendCall::Resize(h.surface.current_handle().unwrap(), Extent::new(640, 480)))
    );
}

#[test]
fn test_close_while_lost_still_clears_backend() {
    let mut h = loaded(800, 600);
    h.api.faults().present_error = Some(NativeErrorKind::DeviceLost);
    h.api.faults().device_unavailable = true;
    let _ = h.surface.on_tick();

    h.surface.on_surface_closed().unwrap();
    assert_eq!(h.backend.calls().last(), Some(&BackendCall::Clear));
    assert_eq!(h.surface.phase(), LifecyclePhase::Released);
}

#[test]
fn test_missing_device_is_fatal_and_leaves_nothing() {
    let mut h = harness(LifecycleOptions::default());
    h.api.faults().device_unavailable = true;

    let err = h.surface.on_surface_loaded(800, 600).unwrap_err();
    assert!(err.is_fatal());
    assert_eq!(h.surface.phase(), LifecyclePhase::Uninitialized);
    assert_eq!(h.api.tracker().total_acquired(), 0);
    assert!(h.backend.calls().is_empty());
}

#[test]
fn test_backend_init_failure_unwinds_load() {
    let mut h = harness(LifecycleOptions::default());
    h.backend.fail_init();

    let err = h.surface.on_surface_loaded(800, 600).unwrap_err();
    assert!(matches!(err, InteropError::Backend(_)));
    assert_eq!(h.surface.phase(), LifecyclePhase::Uninitialized);
    assert_eq!(h.api.tracker().live_total(), 0);
    assert_eq!(h.sink.attached(), None);
}

#[test]
fn test_load_clamps_empty_surface() {
    let h = loaded(0, 0);
    assert!(matches!(
        h.backend.calls().first(),
        Some(BackendCall::Init(_, extent)) if *extent == Extent::new(1, 1)
    ));
}

#[test]
fn test_events_out_of_phase_are_rejected() {
    let mut h = harness(LifecycleOptions::default());

    assert!(matches!(
        h.surface.on_tick(),
        Err(InteropError::InvalidTransition { event: HostEvent::Tick, .. })
    ));
    assert!(matches!(
        h.surface.on_surface_resized(10, 10),
        Err(InteropError::InvalidTransition { event: HostEvent::SurfaceResized, .. })
    ));

    h.surface.on_surface_loaded(10, 10).unwrap();
    assert!(matches!(
        h.surface.on_surface_loaded(10, 10),
        Err(InteropError::InvalidTransition { event: HostEvent::SurfaceLoaded, .. })
    ));

    h.surface.on_surface_closed().unwrap();
    assert!(matches!(
        h.surface.on_surface_closed(),
        Err(InteropError::InvalidTransition { event: HostEvent::SurfaceClosed, .. })
    ));
    assert!(h.surface.on_tick().is_err());
    assert_eq!(h.surface.phase(), LifecyclePhase::Released);
    assert_eq!(count(&h.backend.calls(), |call| *call == BackendCall::Clear), 1);
}

#[test]
fn test_close_before_load_touches_nothing() {
    let mut h = harness(LifecycleOptions::default());
    h.surface.on_surface_closed().unwrap();

    assert_eq!(h.surface.phase(), LifecyclePhase::Released);
    assert!(h.backend.calls().is_empty());
    assert_eq!(h.api.tracker().total_acquired(), 0);
}

#[test]
fn test_clock_toggle() {
    let mut h = harness(LifecycleOptions {
        start_clock: false,
        ..LifecycleOptions::default()
    });
    h.surface.on_surface_loaded(64, 64).unwrap();
    assert!(!h.surface.clock_running());

    h.surface.on_clock_toggle(true);
    assert!(h.surface.clock_running());
    h.surface.on_clock_toggle(false);
    assert!(!h.surface.clock_running());

    h.surface.on_tick().unwrap();
    let frozen = h.surface.clock().elapsed_seconds();
    assert!(matches!(
        h.backend.calls().last(),
        Some(BackendCall::Draw(seconds)) if *seconds == frozen
    ));
}

#[test]
fn test_sync_interval_reaches_present() {
    let mut h = harness(LifecycleOptions {
        sync_interval: 1,
        ..LifecycleOptions::default()
    });
    h.surface.on_surface_loaded(64, 64).unwrap();
    h.surface.on_tick().unwrap();
    h.surface.on_tick().unwrap();

    assert_eq!(h.api.tracker().presents(), vec![1, 1]);
}

#[test]
fn test_driven_through_trait_object() {
    let mut h = harness(LifecycleOptions::default());
    let events: &mut dyn SurfaceEvents = &mut h.surface;

    events.on_surface_loaded(32, 32).unwrap();
    assert!(events.phase().accepts_ticks());
    events.on_tick().unwrap();
    events.on_surface_closed().unwrap();
    assert!(!events.phase().accepts_ticks());
}
