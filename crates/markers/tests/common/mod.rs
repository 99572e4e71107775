#![allow(dead_code)]

use std::rc::Rc;

use foundation::LatLng;
use markers::{
    EngineConfig, Entity, EntityId, EntityStatus, EventRecorder, HeadlessSurface, MarkerEngine,
    MarkerEvent,
};

pub fn surface() -> HeadlessSurface {
    HeadlessSurface::new(LatLng::new(0.0, 0.0), 10.0, 800, 600)
}

pub fn engine_with(config: EngineConfig) -> (MarkerEngine<HeadlessSurface>, Rc<EventRecorder>) {
    let mut engine = MarkerEngine::initialize(surface(), config).unwrap();
    let rec = Rc::new(EventRecorder::new());
    engine.add_observer(rec.clone());
    (engine, rec)
}

pub fn engine() -> (MarkerEngine<HeadlessSurface>, Rc<EventRecorder>) {
    engine_with(EngineConfig::default())
}

pub fn entity(id: &str, lat: f64, lng: f64) -> Entity {
    Entity::new(id, LatLng::new(lat, lng), EntityStatus::Active, id)
}

pub fn id(s: &str) -> EntityId {
    EntityId::from(s)
}

/// Three entities sharing one 60px grid cell at zoom 10.
pub fn huddle() -> Vec<Entity> {
    vec![
        entity("e1", 0.0101, 0.0101),
        entity("e2", 0.0102, 0.0102),
        entity("e3", 0.0103, 0.0101),
    ]
}

/// Three entities in distinct cells, all inside the zoom-10 viewport.
pub fn spread() -> Vec<Entity> {
    vec![
        entity("p", 0.0, 0.0),
        entity("q", 0.2, 0.2),
        entity("r", -0.2, 0.3),
    ]
}

/// Create, update and remove events only.
pub fn lifecycle(events: Vec<MarkerEvent>) -> Vec<MarkerEvent> {
    events
        .into_iter()
        .filter(|e| {
            matches!(
                e,
                MarkerEvent::Created { .. } | MarkerEvent::Updated { .. } | MarkerEvent::Removed { .. }
            )
        })
        .collect()
}
