use std::cell::RefCell;

use runtime::{HandlerResult, ObserverBus};
use serde::Serialize;
use tracing::debug;

use crate::cluster::Cluster;
use crate::entity::EntityId;
use crate::error::CreateFailure;
use crate::factory::MarkerChanges;
use crate::marker::Marker;

pub const MARKER_CREATED: &str = "marker_created";
pub const MARKER_UPDATED: &str = "marker_updated";
pub const MARKER_REMOVED: &str = "marker_removed";
pub const MARKER_CREATE_FAILED: &str = "marker_create_failed";
pub const MARKER_SELECTED: &str = "marker_selected";
pub const CLUSTERING_CHANGED: &str = "clustering_changed";
pub const VISIBILITY_CHANGED: &str = "visibility_changed";

/// Lifecycle events published by one engine instance.
///
/// Every handler is optional. Returning an error (or panicking) is logged by
/// the bus and never reaches the reconciler.
pub trait MarkerObserver {
    fn on_marker_created(&self, _marker: &Marker) -> HandlerResult {
        Ok(())
    }

    fn on_marker_updated(&self, _marker: &Marker, _changes: &MarkerChanges) -> HandlerResult {
        Ok(())
    }

    fn on_marker_removed(&self, _id: &EntityId) -> HandlerResult {
        Ok(())
    }

    fn on_marker_create_failed(&self, _id: &EntityId, _failure: &CreateFailure) -> HandlerResult {
        Ok(())
    }

    fn on_marker_selected(
        &self,
        _current: Option<&EntityId>,
        _previous: Option<&EntityId>,
    ) -> HandlerResult {
        Ok(())
    }

    fn on_clustering_changed(&self, _clusters: &[Cluster]) -> HandlerResult {
        Ok(())
    }

    fn on_visibility_changed(&self, _id: &EntityId, _visible: bool) -> HandlerResult {
        Ok(())
    }
}

pub type MarkerObservers = ObserverBus<dyn MarkerObserver>;

/// Logs every event at `debug`.
#[derive(Debug, Default, Copy, Clone)]
pub struct TracingObserver;

impl MarkerObserver for TracingObserver {
    fn on_marker_created(&self, marker: &Marker) -> HandlerResult {
        debug!(id = %marker.entity_id(), "marker created");
        Ok(())
    }

    fn on_marker_updated(&self, marker: &Marker, changes: &MarkerChanges) -> HandlerResult {
        debug!(
            id = %marker.entity_id(),
            position = changes.position,
            status = changes.status,
            display_name = changes.display_name,
            thumbnail = changes.thumbnail,
            "marker updated"
        );
        Ok(())
    }

    fn on_marker_removed(&self, id: &EntityId) -> HandlerResult {
        debug!(%id, "marker removed");
        Ok(())
    }

    fn on_marker_create_failed(&self, id: &EntityId, failure: &CreateFailure) -> HandlerResult {
        debug!(%id, %failure, "marker create failed");
        Ok(())
    }

    fn on_marker_selected(
        &self,
        current: Option<&EntityId>,
        previous: Option<&EntityId>,
    ) -> HandlerResult {
        debug!(current = ?current, previous = ?previous, "selection changed");
        Ok(())
    }

    fn on_clustering_changed(&self, clusters: &[Cluster]) -> HandlerResult {
        let multi = clusters.iter().filter(|c| c.is_multi()).count();
        debug!(clusters = clusters.len(), multi, "clustering changed");
        Ok(())
    }

    fn on_visibility_changed(&self, id: &EntityId, visible: bool) -> HandlerResult {
        debug!(%id, visible, "visibility changed");
        Ok(())
    }
}

/// Owned copy of one published event.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum MarkerEvent {
    Created {
        id: EntityId,
    },
    Updated {
        id: EntityId,
        changes: MarkerChanges,
    },
    Removed {
        id: EntityId,
    },
    CreateFailed {
        id: EntityId,
        reason: String,
    },
    Selected {
        current: Option<EntityId>,
        previous: Option<EntityId>,
    },
    ClusteringChanged {
        clusters: Vec<Vec<EntityId>>,
    },
    VisibilityChanged {
        id: EntityId,
        visible: bool,
    },
}

/// Observer that keeps every event it receives, in order.
#[derive(Debug, Default)]
pub struct EventRecorder {
    events: RefCell<Vec<MarkerEvent>>,
}

impl EventRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<MarkerEvent> {
        self.events.borrow().clone()
    }

    /// Drains the recorded events.
    pub fn take(&self) -> Vec<MarkerEvent> {
        std::mem::take(&mut *self.events.borrow_mut())
    }

    fn push(&self, event: MarkerEvent) -> HandlerResult {
        self.events.borrow_mut().push(event);
        Ok(())
    }
}

impl MarkerObserver for EventRecorder {
    fn on_marker_created(&self, marker: &Marker) -> HandlerResult {
        self.push(MarkerEvent::Created {
            id: marker.entity_id().clone(),
        })
    }

    fn on_marker_updated(&self, marker: &Marker, changes: &MarkerChanges) -> HandlerResult {
        self.push(MarkerEvent::Updated {
            id: marker.entity_id().clone(),
            changes: *changes,
        })
    }

    fn on_marker_removed(&self, id: &EntityId) -> HandlerResult {
        self.push(MarkerEvent::Removed { id: id.clone() })
    }

    fn on_marker_create_failed(&self, id: &EntityId, failure: &CreateFailure) -> HandlerResult {
        self.push(MarkerEvent::CreateFailed {
            id: id.clone(),
            reason: failure.to_string(),
        })
    }

    fn on_marker_selected(
        &self,
        current: Option<&EntityId>,
        previous: Option<&EntityId>,
    ) -> HandlerResult {
        self.push(MarkerEvent::Selected {
            current: current.cloned(),
            previous: previous.cloned(),
        })
    }

    fn on_clustering_changed(&self, clusters: &[Cluster]) -> HandlerResult {
        self.push(MarkerEvent::ClusteringChanged {
            clusters: clusters.iter().map(|c| c.members.clone()).collect(),
        })
    }

    fn on_visibility_changed(&self, id: &EntityId, visible: bool) -> HandlerResult {
        self.push(MarkerEvent::VisibilityChanged {
            id: id.clone(),
            visible,
        })
    }
}
