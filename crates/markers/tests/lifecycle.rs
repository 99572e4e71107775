mod common;

use std::cell::Cell;
use std::rc::Rc;

use common::{engine, engine_with, entity, huddle, id, spread, surface};
use markers::{
    Cluster, ClusterContext, ClusteringStrategy, EngineConfig, EngineError, Marker, MarkerEngine,
    MarkerEvent, MarkerObserver, NotReadyReason, StrategyRegistry, UpdateStatus,
};
use pretty_assertions::assert_eq;
use runtime::{HandlerResult, ObserverError};

#[test]
fn dispose_releases_everything_the_engine_created() {
    let (mut engine, rec) = engine();
    let mut entities = spread();
    entities.extend(huddle());
    engine.update(&entities, Some(&id("e1")), 10.0);
    engine.update(&entities[..4], None, 18.0);
    let frame = engine.on_viewport_changed().unwrap();
    rec.take();

    engine.dispose();

    let s = engine.surface();
    let c = s.counters();
    assert_eq!(c.created, c.released);
    assert_eq!(c.attached, c.detached);
    assert_eq!(s.live_overlay_count(), 0);
    assert_eq!(s.attached_count(), 0);
    assert_eq!(c.listeners_added, 1);
    assert_eq!(c.listeners_removed, 1);
    assert!(s.pending_frames().is_empty());
    assert!(engine.is_empty());
    assert!(rec.take().is_empty());

    let writes = c.position_writes;
    assert_eq!(engine.on_animation_frame(frame), 0);
    assert_eq!(engine.surface().counters().position_writes, writes);
    assert_eq!(
        engine.update(&entities, None, 10.0),
        UpdateStatus::NotReady(NotReadyReason::Disposed)
    );
    assert_eq!(engine.surface().counters().created, c.created);
}

#[test]
fn viewport_changes_coalesce_into_one_frame() {
    let (mut engine, _) = engine();
    engine.update(&spread(), None, 10.0);
    assert_eq!(engine.surface().attached_count(), 3);

    engine.surface_mut().pan_by_px(50.0, 0.0);
    let first = engine.on_viewport_changed().unwrap();
    let second = engine.on_viewport_changed().unwrap();
    let last = engine.on_viewport_changed().unwrap();

    let c = engine.surface().counters();
    assert_eq!(c.frames_requested, 3);
    assert_eq!(c.frames_canceled, 2);
    assert_eq!(engine.surface().pending_frames(), vec![last]);
    assert_eq!(engine.pending_frame(), Some(last));

    assert_eq!(engine.on_animation_frame(first), 0);
    assert_eq!(engine.on_animation_frame(second), 0);
    let before = engine.surface().counters().position_writes;
    let fired = engine.surface_mut().fire_frame(last).unwrap();
    assert_eq!(engine.on_animation_frame(fired), 3);
    assert_eq!(engine.surface().counters().position_writes, before + 3);
    assert_eq!(engine.pending_frame(), None);
    assert!(engine.surface().pending_frames().is_empty());

    assert_eq!(engine.surface_mut().fire_frame(last), None);
    assert_eq!(engine.on_animation_frame(last), 0);
}

#[test]
fn frame_reclusters_after_zoom_change() {
    let (mut engine, rec) = engine();
    engine.update(&huddle(), None, 10.0);
    assert_eq!(engine.surface().attached_count(), 0);
    rec.take();

    engine.surface_mut().set_zoom(18.0);
    let frame = engine.on_viewport_changed().unwrap();
    let frame = engine.surface_mut().fire_frame(frame).unwrap();
    engine.on_animation_frame(frame);

    assert_eq!(engine.surface().attached_count(), 3);
    let shown = rec
        .take()
        .into_iter()
        .filter(|e| matches!(e, MarkerEvent::VisibilityChanged { visible: true, .. }))
        .count();
    assert_eq!(shown, 3);
}

#[test]
fn removed_marker_is_dropped_from_pending_frame() {
    let (mut engine, _) = engine();
    let entities = spread();
    engine.update(&entities, None, 10.0);
    engine.surface_mut().pan_by_px(0.0, 40.0);
    let frame = engine.on_viewport_changed().unwrap();

    engine.update(&entities[..2], None, 10.0);
    let frame = engine.surface_mut().fire_frame(frame).unwrap();
    assert_eq!(engine.on_animation_frame(frame), 0);
    assert_eq!(engine.surface().live_overlay_count(), 2);
}

struct Exploding;

impl MarkerObserver for Exploding {
    fn on_marker_created(&self, _marker: &Marker) -> HandlerResult {
        panic!("observer bug");
    }

    fn on_marker_removed(&self, id: &markers::EntityId) -> HandlerResult {
        Err(ObserverError::new(format!("cannot handle {id}")))
    }
}

#[test]
fn failing_observers_do_not_break_reconciliation() {
    let mut engine = MarkerEngine::initialize(surface(), EngineConfig::default()).unwrap();
    assert!(engine.add_observer(Rc::new(Exploding)));
    let rec = Rc::new(markers::EventRecorder::new());
    engine.add_observer(rec.clone());

    let entities = spread();
    assert!(engine.update(&entities, None, 10.0).is_applied());
    engine.update(&entities[..1], None, 10.0);

    assert_eq!(engine.marker_ids(), vec![id("p")]);
    let created = rec
        .events()
        .iter()
        .filter(|e| matches!(e, MarkerEvent::Created { .. }))
        .count();
    assert_eq!(created, 3);
    assert!(rec.events().contains(&MarkerEvent::Removed { id: id("q") }));
}

#[test]
fn removed_observer_stops_receiving() {
    let (mut engine, _) = engine();
    let extra = Rc::new(markers::EventRecorder::new());
    let handle: Rc<dyn MarkerObserver> = extra.clone();
    assert!(engine.add_observer(handle.clone()));
    assert!(!engine.add_observer(handle.clone()));

    engine.update(&spread()[..1], None, 10.0);
    assert!(engine.remove_observer(&handle));
    engine.update(&spread(), None, 10.0);

    let created = extra
        .events()
        .iter()
        .filter(|e| matches!(e, MarkerEvent::Created { .. }))
        .count();
    assert_eq!(created, 1);
}

#[test]
fn capped_policy_limits_overlays_but_not_the_selection() {
    let config = EngineConfig {
        visibility_strategy: "capped".to_string(),
        max_visible_overlays: 2,
        ..EngineConfig::default()
    };
    let (mut engine, _) = engine_with(config);
    let entities = vec![
        entity("a", 0.0, 0.0),
        entity("b", 0.2, 0.2),
        entity("c", -0.2, 0.3),
        entity("d", 0.3, -0.3),
    ];

    let status = engine.update(&entities, None, 10.0);
    assert_eq!(status.report().unwrap().visible, 2);
    assert!(engine.marker(&id("a")).unwrap().is_visible());
    assert!(engine.marker(&id("b")).unwrap().is_visible());

    let status = engine.update(&entities, Some(&id("d")), 10.0);
    assert_eq!(status.report().unwrap().visible, 3);
    assert!(engine.marker(&id("d")).unwrap().is_visible());
    assert!(!engine.marker(&id("c")).unwrap().is_visible());
}

#[test]
fn unknown_strategy_names_fail_initialize() {
    let config = EngineConfig {
        clustering_strategy: "kmeans".to_string(),
        ..EngineConfig::default()
    };
    let err = MarkerEngine::initialize(surface(), config).unwrap_err();
    assert_eq!(err, EngineError::UnknownClusteringStrategy("kmeans".to_string()));

    let config = EngineConfig {
        visibility_strategy: "always".to_string(),
        ..EngineConfig::default()
    };
    let err = MarkerEngine::initialize(surface(), config).unwrap_err();
    assert_eq!(err, EngineError::UnknownVisibilityStrategy("always".to_string()));
}

struct Singletons {
    calls: Rc<Cell<usize>>,
}

impl ClusteringStrategy for Singletons {
    fn name(&self) -> &str {
        "singletons"
    }

    fn cluster(&self, markers: &[&Marker], _ctx: &ClusterContext<'_>) -> Vec<Cluster> {
        self.calls.set(self.calls.get() + 1);
        markers
            .iter()
            .map(|m| Cluster::single(m.entity_id().clone(), m.position()))
            .collect()
    }
}

#[test]
fn custom_clustering_plugs_in_by_name() {
    let calls = Rc::new(Cell::new(0));
    let mut strategies = StrategyRegistry::with_defaults();
    let counter = calls.clone();
    strategies.register_clustering("singletons", move |_| {
        Box::new(Singletons {
            calls: counter.clone(),
        })
    });

    let config = EngineConfig {
        clustering_strategy: "singletons".to_string(),
        ..EngineConfig::default()
    };
    let mut engine = MarkerEngine::initialize_with(surface(), config, &strategies).unwrap();
    let status = engine.update(&huddle(), None, 10.0);

    assert_eq!(status.report().unwrap().visible, 3);
    assert_eq!(calls.get(), 1);
}
