use std::collections::{HashMap, HashSet};

use serde::Serialize;
use tracing::{debug, warn};

use crate::cluster::{ClusterContext, ClusteringStrategy};
use crate::entity::{Entity, EntityId};
use crate::factory::MarkerFactory;
use crate::marker::Marker;
use crate::observer::{
    MarkerObservers, CLUSTERING_CHANGED, MARKER_CREATED, MARKER_CREATE_FAILED, MARKER_REMOVED,
    MARKER_SELECTED, MARKER_UPDATED, VISIBILITY_CHANGED,
};
use crate::surface::{MapView, RenderSurface, ViewportState};
use crate::visibility::{VisibilityContext, VisibilityPolicy};

/// Ids touched by one [`MarkerRegistry::reconcile`] call.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct ReconcileOutcome {
    pub added: Vec<EntityId>,
    pub updated: Vec<EntityId>,
    pub removed: Vec<EntityId>,
    /// Entities skipped (or dropped) because they had no usable position.
    pub failed: Vec<EntityId>,
}

impl ReconcileOutcome {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty()
            && self.updated.is_empty()
            && self.removed.is_empty()
            && self.failed.is_empty()
    }
}

/// Result of one clustering + visibility pass.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct RefreshOutcome {
    pub clusters: usize,
    pub clustering_changed: bool,
    pub shown: Vec<EntityId>,
    pub hidden: Vec<EntityId>,
}

/// Authoritative entity id to marker map.
///
/// Markers are only inserted or removed by `reconcile` and `clear`. Every pass
/// walks ids in ascending order so events and strategy inputs are
/// deterministic regardless of hash order.
pub struct MarkerRegistry {
    markers: HashMap<EntityId, Marker>,
    factory: MarkerFactory,
    clustering: Box<dyn ClusteringStrategy>,
    visibility: Box<dyn VisibilityPolicy>,
    selected: Option<EntityId>,
    raise_selected: bool,
    last_membership: Vec<Vec<EntityId>>,
}

impl MarkerRegistry {
    pub fn new(
        factory: MarkerFactory,
        clustering: Box<dyn ClusteringStrategy>,
        visibility: Box<dyn VisibilityPolicy>,
    ) -> Self {
        Self {
            markers: HashMap::new(),
            factory,
            clustering,
            visibility,
            selected: None,
            raise_selected: false,
            last_membership: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.markers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.markers.is_empty()
    }

    pub fn get(&self, id: &EntityId) -> Option<&Marker> {
        self.markers.get(id)
    }

    pub fn contains(&self, id: &EntityId) -> bool {
        self.markers.contains_key(id)
    }

    /// Registered ids in ascending order.
    pub fn ids(&self) -> Vec<EntityId> {
        let mut ids: Vec<EntityId> = self.markers.keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Ids whose overlay is currently attached, ascending.
    pub fn attached_ids(&self) -> Vec<EntityId> {
        let mut ids: Vec<EntityId> = self
            .markers
            .values()
            .filter(|m| m.overlay().is_attached())
            .map(|m| m.entity_id().clone())
            .collect();
        ids.sort();
        ids
    }

    pub fn selected(&self) -> Option<&EntityId> {
        self.selected.as_ref()
    }

    pub fn factory(&self) -> &MarkerFactory {
        &self.factory
    }

    pub fn clustering(&self) -> &dyn ClusteringStrategy {
        self.clustering.as_ref()
    }

    pub fn visibility(&self) -> &dyn VisibilityPolicy {
        self.visibility.as_ref()
    }

    /// Brings the registry in line with `entities`.
    ///
    /// Removals are applied first (ascending id), then creations and updates
    /// in input order. Unchanged entities cost one comparison and emit
    /// nothing. For duplicate ids the first occurrence with a usable position
    /// wins; an id with no usable copy is reported as a create failure.
    pub fn reconcile<S>(
        &mut self,
        entities: &[Entity],
        surface: &mut S,
        observers: &MarkerObservers,
    ) -> ReconcileOutcome
    where
        S: MapView + RenderSurface + ?Sized,
    {
        let mut outcome = ReconcileOutcome::default();

        let placeable: HashSet<&EntityId> = entities
            .iter()
            .filter(|e| e.valid_position().is_ok())
            .map(|e| &e.id)
            .collect();
        let mut seen: HashSet<&EntityId> = HashSet::with_capacity(entities.len());
        let mut incoming: Vec<&Entity> = Vec::with_capacity(entities.len());
        for entity in entities {
            if entity.valid_position().is_err() && placeable.contains(&entity.id) {
                debug!(id = %entity.id, "unplaceable duplicate ignored");
                continue;
            }
            if seen.insert(&entity.id) {
                incoming.push(entity);
            } else {
                debug!(id = %entity.id, "duplicate entity id ignored");
            }
        }

        let mut gone: Vec<EntityId> = self
            .markers
            .keys()
            .filter(|id| !seen.contains(id))
            .cloned()
            .collect();
        gone.sort();
        for id in gone {
            self.remove(&id, surface, observers);
            outcome.removed.push(id);
        }

        for entity in incoming {
            let id = &entity.id;
            if let Some(marker) = self.markers.get_mut(id) {
                if let Err(failure) = entity.valid_position() {
                    warn!(%id, %failure, "entity lost its position, removing marker");
                    self.remove(id, surface, observers);
                    observers.notify(MARKER_CREATE_FAILED, |o| {
                        o.on_marker_create_failed(id, &failure)
                    });
                    outcome.removed.push(id.clone());
                    outcome.failed.push(id.clone());
                    continue;
                }

                let changes = self.factory.update(marker, entity, surface);
                if !changes.is_empty() {
                    let marker = &*marker;
                    observers.notify(MARKER_UPDATED, |o| o.on_marker_updated(marker, &changes));
                    outcome.updated.push(id.clone());
                }
                continue;
            }

            let selected = self.selected.as_ref() == Some(id);
            match self.factory.create(entity, surface, selected) {
                Ok(marker) => {
                    let marker = self.markers.entry(id.clone()).or_insert(marker);
                    let marker = &*marker;
                    observers.notify(MARKER_CREATED, |o| o.on_marker_created(marker));
                    outcome.added.push(id.clone());
                }
                Err(failure) => {
                    warn!(%id, %failure, "skipping entity");
                    observers.notify(MARKER_CREATE_FAILED, |o| {
                        o.on_marker_create_failed(id, &failure)
                    });
                    outcome.failed.push(id.clone());
                }
            }
        }

        debug!(
            added = outcome.added.len(),
            updated = outcome.updated.len(),
            removed = outcome.removed.len(),
            failed = outcome.failed.len(),
            live = self.markers.len(),
            "reconciled markers"
        );
        outcome
    }

    /// Moves the selection to `id`. An id that is not registered selects
    /// nothing. Returns `true` if the selection changed.
    pub fn select<S>(
        &mut self,
        id: Option<&EntityId>,
        surface: &mut S,
        observers: &MarkerObservers,
    ) -> bool
    where
        S: RenderSurface + ?Sized,
    {
        let next = id.filter(|id| self.markers.contains_key(*id)).cloned();
        if next == self.selected {
            return false;
        }
        let previous = std::mem::replace(&mut self.selected, next);

        if let Some(prev) = previous.as_ref()
            && let Some(marker) = self.markers.get_mut(prev)
        {
            self.factory.set_selected(marker, false, surface);
        }
        if let Some(cur) = self.selected.as_ref()
            && let Some(marker) = self.markers.get_mut(cur)
        {
            self.factory.set_selected(marker, true, surface);
            self.raise_selected = true;
        }

        let current = self.selected.as_ref();
        observers.notify(MARKER_SELECTED, |o| {
            o.on_marker_selected(current, previous.as_ref())
        });
        true
    }

    /// Runs one clustering pass and applies the visibility policy to every
    /// marker.
    ///
    /// Newly shown overlays are attached and positioned immediately; hidden
    /// ones are detached from the surface.
    pub fn refresh<S>(
        &mut self,
        viewport: ViewportState,
        surface: &mut S,
        observers: &MarkerObservers,
    ) -> RefreshOutcome
    where
        S: MapView + RenderSurface,
    {
        let ids = self.ids();
        let clusters = {
            let refs: Vec<&Marker> = ids.iter().filter_map(|id| self.markers.get(id)).collect();
            let ctx = ClusterContext {
                zoom: viewport.zoom,
                bounds: viewport.bounds,
                view: &*surface,
            };
            self.clustering.cluster(&refs, &ctx)
        };

        let mut outcome = RefreshOutcome {
            clusters: clusters.len(),
            ..RefreshOutcome::default()
        };

        let membership: Vec<Vec<EntityId>> = clusters.iter().map(|c| c.members.clone()).collect();
        if membership != self.last_membership {
            observers.notify(CLUSTERING_CHANGED, |o| o.on_clustering_changed(&clusters));
            self.last_membership = membership;
            outcome.clustering_changed = true;
        }

        let clustered: HashSet<&EntityId> = clusters
            .iter()
            .filter(|c| c.is_multi())
            .flat_map(|c| c.members.iter())
            .collect();

        self.visibility.begin_pass();
        let mut decisions = Vec::with_capacity(ids.len());
        for id in &ids {
            let Some(marker) = self.markers.get(id) else {
                continue;
            };
            let ctx = VisibilityContext {
                zoom: viewport.zoom,
                is_in_cluster: clustered.contains(id),
                is_selected: marker.is_selected(),
            };
            decisions.push(self.visibility.should_show(marker, &ctx));
        }

        let renderer = *self.factory.renderer();
        for (id, show) in ids.iter().zip(decisions) {
            let Some(marker) = self.markers.get_mut(id) else {
                continue;
            };
            if show == marker.is_visible {
                continue;
            }
            marker.is_visible = show;
            if show {
                renderer.attach(&mut marker.overlay, surface);
                if let Some(point) = surface.project(marker.position) {
                    renderer.reposition(&mut marker.overlay, surface, point);
                }
                outcome.shown.push(id.clone());
            } else {
                renderer.detach(&mut marker.overlay, surface);
                outcome.hidden.push(id.clone());
            }
            observers.notify(VISIBILITY_CHANGED, |o| o.on_visibility_changed(id, show));
        }
        // Newly attached overlays stack above the selection.
        if !outcome.shown.is_empty() && self.selected.is_some() {
            self.raise_selected = true;
        }

        if self.raise_selected
            && let Some(id) = self.selected.as_ref()
            && let Some(marker) = self.markers.get(id)
            && marker.is_visible
        {
            renderer.bring_to_front(&marker.overlay, surface);
            self.raise_selected = false;
        }

        outcome
    }

    /// Re-projects the attached overlays among `ids`. Returns the number of
    /// position writes; sub-pixel moves are skipped.
    pub fn reposition<S>(&mut self, ids: &[EntityId], surface: &mut S) -> usize
    where
        S: MapView + RenderSurface + ?Sized,
    {
        let renderer = *self.factory.renderer();
        let mut writes = 0;
        for id in ids {
            let Some(marker) = self.markers.get_mut(id) else {
                continue;
            };
            if !marker.overlay.is_attached() {
                continue;
            }
            if let Some(point) = surface.project(marker.position)
                && renderer.reposition(&mut marker.overlay, surface, point)
            {
                writes += 1;
            }
        }
        writes
    }

    /// Destroys every marker without publishing events.
    pub fn clear<S>(&mut self, surface: &mut S) -> usize
    where
        S: RenderSurface + ?Sized,
    {
        let count = self.markers.len();
        for id in self.ids() {
            if let Some(marker) = self.markers.remove(&id) {
                self.factory.destroy(marker, surface);
            }
        }
        self.selected = None;
        self.raise_selected = false;
        self.last_membership.clear();
        count
    }

    fn remove<S>(&mut self, id: &EntityId, surface: &mut S, observers: &MarkerObservers)
    where
        S: RenderSurface + ?Sized,
    {
        if let Some(marker) = self.markers.remove(id) {
            self.factory.destroy(marker, surface);
            observers.notify(MARKER_REMOVED, |o| o.on_marker_removed(id));
        }
    }
}

impl std::fmt::Debug for MarkerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MarkerRegistry")
            .field("markers", &self.markers.len())
            .field("clustering", &self.clustering.name())
            .field("visibility", &self.visibility.name())
            .field("selected", &self.selected)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::MarkerRegistry;
    use crate::cluster::GridClustering;
    use crate::entity::{Entity, EntityId, EntityStatus};
    use crate::factory::MarkerFactory;
    use crate::headless::HeadlessSurface;
    use crate::observer::{EventRecorder, MarkerEvent, MarkerObservers};
    use crate::overlay::OverlayRenderer;
    use crate::style::MarkerStyle;
    use crate::surface::ViewportState;
    use crate::visibility::ZoomThresholdPolicy;
    use foundation::LatLng;
    use pretty_assertions::assert_eq;
    use std::rc::Rc;

    fn registry() -> MarkerRegistry {
        MarkerRegistry::new(
            MarkerFactory::new(OverlayRenderer::default(), MarkerStyle::default()),
            Box::new(GridClustering::new(60.0, 50_000.0, 0.25)),
            Box::new(ZoomThresholdPolicy::new(18.0)),
        )
    }

    fn bus() -> (MarkerObservers, Rc<EventRecorder>) {
        let rec = Rc::new(EventRecorder::new());
        let mut bus = MarkerObservers::new();
        bus.subscribe(rec.clone());
        (bus, rec)
    }

    fn entity(id: &str, lat: f64, lng: f64) -> Entity {
        Entity::new(id, LatLng::new(lat, lng), EntityStatus::Active, id)
    }

    fn id(s: &str) -> EntityId {
        EntityId::from(s)
    }

    #[test]
    fn duplicate_ids_keep_the_first_entity() {
        let mut s = HeadlessSurface::new(LatLng::new(0.0, 0.0), 10.0, 800, 600);
        let (bus, _) = bus();
        let mut r = registry();

        let mut second = entity("a", 1.0, 1.0);
        second.display_name = "later".to_string();
        let out = r.reconcile(&[entity("a", 0.0, 0.0), second], &mut s, &bus);

        assert_eq!(out.added, vec![id("a")]);
        assert_eq!(r.len(), 1);
        assert_eq!(r.get(&id("a")).unwrap().snapshot().display_name, "a");
        assert_eq!(s.counters().created, 1);
    }

    #[test]
    fn later_placeable_duplicate_wins_over_unplaceable_first() {
        let mut s = HeadlessSurface::new(LatLng::new(0.0, 0.0), 10.0, 800, 600);
        let (bus, rec) = bus();
        let mut r = registry();

        let mut blank = entity("x", 0.0, 0.0);
        blank.position = None;
        let out = r.reconcile(&[blank.clone(), entity("x", 0.01, 0.01)], &mut s, &bus);

        assert_eq!(out.added, vec![id("x")]);
        assert!(out.failed.is_empty());
        assert_eq!(r.ids(), vec![id("x")]);
        assert_eq!(r.get(&id("x")).unwrap().position(), LatLng::new(0.01, 0.01));
        assert_eq!(rec.take(), vec![MarkerEvent::Created { id: id("x") }]);

        let out = r.reconcile(&[blank.clone(), blank], &mut s, &bus);
        assert_eq!(out.removed, vec![id("x")]);
        assert_eq!(out.failed, vec![id("x")]);
        assert!(r.is_empty());
    }

    #[test]
    fn entity_losing_position_is_removed_and_reported() {
        let mut s = HeadlessSurface::new(LatLng::new(0.0, 0.0), 10.0, 800, 600);
        let (bus, rec) = bus();
        let mut r = registry();
        r.reconcile(&[entity("a", 0.0, 0.0)], &mut s, &bus);
        rec.take();

        let mut lost = entity("a", 0.0, 0.0);
        lost.position = None;
        let out = r.reconcile(&[lost], &mut s, &bus);

        assert_eq!(out.removed, vec![id("a")]);
        assert_eq!(out.failed, vec![id("a")]);
        assert!(r.is_empty());
        assert_eq!(s.live_overlay_count(), 0);
        assert_eq!(
            rec.take(),
            vec![
                MarkerEvent::Removed { id: id("a") },
                MarkerEvent::CreateFailed {
                    id: id("a"),
                    reason: "entity has no position".to_string()
                },
            ]
        );
    }

    #[test]
    fn selecting_unknown_id_selects_nothing() {
        let mut s = HeadlessSurface::new(LatLng::new(0.0, 0.0), 10.0, 800, 600);
        let (bus, rec) = bus();
        let mut r = registry();
        r.reconcile(&[entity("a", 0.0, 0.0)], &mut s, &bus);
        rec.take();

        assert!(!r.select(Some(&id("zzz")), &mut s, &bus));
        assert_eq!(r.selected(), None);

        assert!(r.select(Some(&id("a")), &mut s, &bus));
        assert!(r.get(&id("a")).unwrap().is_selected());
        assert!(r.select(Some(&id("zzz")), &mut s, &bus));
        assert!(!r.get(&id("a")).unwrap().is_selected());
        assert_eq!(
            rec.take(),
            vec![
                MarkerEvent::Selected {
                    current: Some(id("a")),
                    previous: None
                },
                MarkerEvent::Selected {
                    current: None,
                    previous: Some(id("a"))
                },
            ]
        );
    }

    #[test]
    fn refresh_attaches_shown_and_detaches_hidden() {
        let mut s = HeadlessSurface::new(LatLng::new(0.0, 0.0), 10.0, 800, 600);
        let (bus, _) = bus();
        let mut r = registry();
        r.reconcile(
            &[entity("a", 0.0101, 0.0101), entity("b", 0.0102, 0.0102), entity("lone", -0.2, -0.2)],
            &mut s,
            &bus,
        );

        let vp = ViewportState::read(&s).unwrap();
        let out = r.refresh(vp, &mut s, &bus);
        assert_eq!(out.shown, vec![id("lone")]);
        assert_eq!(r.attached_ids(), vec![id("lone")]);
        assert_eq!(s.attached_count(), 1);

        s.set_zoom(18.0);
        let vp = ViewportState::read(&s).unwrap();
        let out = r.refresh(vp, &mut s, &bus);
        assert_eq!(out.shown, vec![id("a"), id("b")]);
        assert_eq!(s.attached_count(), 3);

        s.set_zoom(10.0);
        let vp = ViewportState::read(&s).unwrap();
        let out = r.refresh(vp, &mut s, &bus);
        assert_eq!(out.hidden, vec![id("a"), id("b")]);
        assert_eq!(s.attached_count(), 1);
    }

    #[test]
    fn selected_marker_is_raised_once() {
        let mut s = HeadlessSurface::new(LatLng::new(0.0, 0.0), 10.0, 800, 600);
        let (bus, _) = bus();
        let mut r = registry();
        r.reconcile(&[entity("a", 0.0101, 0.0101), entity("b", 0.0102, 0.0102)], &mut s, &bus);
        r.select(Some(&id("b")), &mut s, &bus);

        let vp = ViewportState::read(&s).unwrap();
        r.refresh(vp, &mut s, &bus);
        r.refresh(vp, &mut s, &bus);

        let handle = r.get(&id("b")).unwrap().overlay().handle();
        assert_eq!(s.frontmost(), Some(handle));
        assert_eq!(s.counters().raised, 1);
    }

    #[test]
    fn selection_stays_on_top_when_others_attach() {
        let mut s = HeadlessSurface::new(LatLng::new(0.0, 0.0), 10.0, 800, 600);
        let (bus, _) = bus();
        let mut r = registry();
        r.reconcile(&[entity("a", 0.0101, 0.0101), entity("b", 0.0102, 0.0102)], &mut s, &bus);
        r.select(Some(&id("b")), &mut s, &bus);
        let vp = ViewportState::read(&s).unwrap();
        r.refresh(vp, &mut s, &bus);

        s.set_zoom(18.0);
        let vp = ViewportState::read(&s).unwrap();
        let out = r.refresh(vp, &mut s, &bus);
        assert_eq!(out.shown, vec![id("a")]);

        let handle = r.get(&id("b")).unwrap().overlay().handle();
        assert_eq!(s.frontmost(), Some(handle));
        assert_eq!(s.counters().raised, 2);
    }

    #[test]
    fn clear_releases_everything_silently() {
        let mut s = HeadlessSurface::new(LatLng::new(0.0, 0.0), 10.0, 800, 600);
        let (bus, rec) = bus();
        let mut r = registry();
        r.reconcile(&[entity("a", 0.0, 0.0), entity("b", 0.3, 0.3)], &mut s, &bus);
        let vp = ViewportState::read(&s).unwrap();
        r.refresh(vp, &mut s, &bus);
        rec.take();

        assert_eq!(r.clear(&mut s), 2);
        assert!(rec.events().is_empty());
        let c = s.counters();
        assert_eq!(c.created, c.released);
        assert_eq!(c.attached, c.detached);
    }
}
