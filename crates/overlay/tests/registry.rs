mod common;

use anyhow::anyhow;
use common::{LogSlot, MockBackend, SharedLog, config, factory, pixels};
use proxy_overlay::{
    Frame, OverlayError, OverlayRegistry, backend::FrameRect, event::WindowId,
    state::LifecycleState,
};

fn create(registry: &OverlayRegistry<MockBackend>) -> (u32, SharedLog) {
    let slot = LogSlot::default();
    let id = registry.create(&config(), factory(&slot)).unwrap();

    let log = slot.lock().take().unwrap();
    (id, log)
}

#[test]
fn handles_are_unique_and_nonzero() {
    let registry = OverlayRegistry::new();
    let (a, _) = create(&registry);
    let (b, _) = create(&registry);

    assert_ne!(a, 0);
    assert_ne!(b, 0);
    assert_ne!(a, b);
    assert_eq!(registry.len(), 2);
}

#[test]
fn failed_creation_registers_nothing() {
    let registry = OverlayRegistry::<MockBackend>::new();
    let res = registry.create(&config(), |_| {
        Err(OverlayError::BackendInit(anyhow!("cannot open X display")))
    });

    assert!(matches!(res, Err(OverlayError::BackendInit(_))));
    assert!(registry.is_empty());
}

#[test]
fn operations_reach_surface() {
    let registry = OverlayRegistry::new();
    let (id, log) = create(&registry);

    registry.set_routing_target(id, 0x5e00007);
    registry.show(id);
    registry.set_frame(id, FrameRect::new(1, 2, 32, 16));

    let buf = pixels(32, 16);
    registry.render_frame(id, Frame::new(&buf, 32, 16));

    let surface = registry.get(id).unwrap();
    assert_eq!(surface.state(), LifecycleState::Shown);
    assert_eq!(surface.routing_target(), WindowId::new(0x5e00007));
    assert_eq!(log.lock().presents, 1);
    assert_eq!(log.lock().viewport, Some((32, 16)));

    registry.set_routing_target(id, 0);
    assert_eq!(surface.routing_target(), None);

    registry.hide(id);
    assert_eq!(surface.state(), LifecycleState::Hidden);
}

#[test]
fn unknown_handles_are_ignored() {
    let registry = OverlayRegistry::<MockBackend>::new();

    registry.show(42);
    registry.hide(42);
    registry.set_frame(42, FrameRect::new(0, 0, 1, 1));
    registry.set_routing_target(42, 7);
    registry.render_frame(42, Frame::new(&[], 0, 0));

    assert!(matches!(
        registry.get(42),
        Err(OverlayError::InvalidHandle(42))
    ));
    assert!(!registry.destroy(42));
}

#[test]
fn destroy_forgets_handle() {
    let registry = OverlayRegistry::new();
    let (id, log) = create(&registry);
    registry.show(id);

    let surface = registry.get(id).unwrap();
    assert!(registry.destroy(id));
    assert!(!registry.destroy(id));

    assert!(log.lock().dropped);
    assert_eq!(log.lock().foreign_calls, 0);
    assert!(surface.is_destroyed());
    assert!(registry.get(id).is_err());

    // late calls through a stale handle are no-ops
    registry.show(id);
    assert!(surface.is_destroyed());
}

#[test]
fn destroy_all_releases_every_surface() {
    let registry = OverlayRegistry::new();
    let logs = (0..3).map(|_| create(&registry).1).collect::<Vec<_>>();

    registry.destroy_all();

    assert!(registry.is_empty());
    for log in logs {
        assert!(log.lock().dropped);
    }
}
