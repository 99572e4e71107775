use std::rc::Rc;

use runtime::{FrameCoalescer, FrameRequestId};
use serde::Serialize;
use tracing::{debug, info};

use crate::config::EngineConfig;
use crate::entity::{Entity, EntityId};
use crate::error::{EngineError, NotReadyReason};
use crate::factory::MarkerFactory;
use crate::marker::Marker;
use crate::observer::{MarkerObserver, MarkerObservers};
use crate::overlay::OverlayRenderer;
use crate::registry::{MarkerRegistry, ReconcileOutcome};
use crate::strategies::StrategyRegistry;
use crate::surface::{ListenerId, MapSurface, ViewportState};

/// Summary of one applied `update()`.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct UpdateReport {
    pub reconcile: ReconcileOutcome,
    pub selection_changed: bool,
    pub clusters: usize,
    pub clustering_changed: bool,
    /// Markers whose overlay is attached after the pass.
    pub visible: usize,
    pub position_writes: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateStatus {
    Applied(UpdateReport),
    NotReady(NotReadyReason),
}

impl UpdateStatus {
    pub fn is_applied(&self) -> bool {
        matches!(self, UpdateStatus::Applied(_))
    }

    pub fn report(&self) -> Option<&UpdateReport> {
        match self {
            UpdateStatus::Applied(report) => Some(report),
            UpdateStatus::NotReady(_) => None,
        }
    }
}

/// Host-facing entry point. Owns the surface, the registry and the observer
/// bus of one map.
///
/// Lifecycle:
/// - `initialize` registers one viewport listener on the surface.
/// - `update` reconciles, applies the selection, reclusters and repositions.
/// - `on_viewport_changed` / `on_animation_frame` are the host callbacks.
/// - `dispose` (also run on drop) tears everything down; later calls are
///   no-ops.
pub struct MarkerEngine<S: MapSurface> {
    surface: S,
    config: EngineConfig,
    registry: MarkerRegistry,
    observers: MarkerObservers,
    frames: FrameCoalescer<EntityId>,
    recluster_pending: bool,
    listener: Option<ListenerId>,
    alive: bool,
}

impl<S: MapSurface> MarkerEngine<S> {
    pub fn initialize(surface: S, config: EngineConfig) -> Result<Self, EngineError> {
        Self::initialize_with(surface, config, &StrategyRegistry::with_defaults())
    }

    /// Like [`MarkerEngine::initialize`], resolving strategy names against
    /// `strategies`.
    pub fn initialize_with(
        mut surface: S,
        config: EngineConfig,
        strategies: &StrategyRegistry,
    ) -> Result<Self, EngineError> {
        config.validate()?;
        let clustering = strategies.build_clustering(&config)?;
        let visibility = strategies.build_visibility(&config)?;
        let factory = MarkerFactory::new(
            OverlayRenderer::new(config.reposition_epsilon_px),
            config.style.clone(),
        );
        info!(
            clustering = clustering.name(),
            visibility = visibility.name(),
            zoom_threshold = config.zoom_threshold,
            grid_size = config.grid_size,
            "marker engine initialized"
        );

        let listener = surface.add_viewport_listener();
        Ok(Self {
            surface,
            registry: MarkerRegistry::new(factory, clustering, visibility),
            config,
            observers: MarkerObservers::new(),
            frames: FrameCoalescer::new(),
            recluster_pending: false,
            listener: Some(listener),
            alive: true,
        })
    }

    /// Reconciles `entities`, applies `selected` and runs a clustering and
    /// visibility pass at `zoom`.
    ///
    /// Attached overlays are repositioned before returning so the surface
    /// matches the new entity list immediately; only viewport motion goes
    /// through the frame coalescer.
    ///
    /// Returns `NotReady` without touching any state after `dispose`, or
    /// while the surface has no viewport.
    pub fn update(
        &mut self,
        entities: &[Entity],
        selected: Option<&EntityId>,
        zoom: f64,
    ) -> UpdateStatus {
        if !self.alive {
            return UpdateStatus::NotReady(NotReadyReason::Disposed);
        }
        let Some(bounds) = self.surface.bounds() else {
            debug!("update skipped, viewport unavailable");
            return UpdateStatus::NotReady(NotReadyReason::ViewportUnavailable);
        };
        if !zoom.is_finite() {
            debug!(zoom, "update skipped, zoom unusable");
            return UpdateStatus::NotReady(NotReadyReason::ViewportUnavailable);
        }

        let reconcile = self
            .registry
            .reconcile(entities, &mut self.surface, &self.observers);
        for id in &reconcile.removed {
            self.frames.forget(id);
        }
        let selection_changed = self
            .registry
            .select(selected, &mut self.surface, &self.observers);
        let refresh = self.registry.refresh(
            ViewportState { zoom, bounds },
            &mut self.surface,
            &self.observers,
        );
        self.recluster_pending = false;

        let attached = self.registry.attached_ids();
        let position_writes = self.registry.reposition(&attached, &mut self.surface);

        UpdateStatus::Applied(UpdateReport {
            reconcile,
            selection_changed,
            clusters: refresh.clusters,
            clustering_changed: refresh.clustering_changed,
            visible: attached.len(),
            position_writes,
        })
    }

    /// Viewport listener callback.
    ///
    /// Marks a recluster pending and (re)schedules one frame; repeated calls
    /// before the frame fires coalesce into that single frame.
    pub fn on_viewport_changed(&mut self) -> Option<FrameRequestId> {
        if !self.alive {
            return None;
        }
        self.recluster_pending = true;
        let attached = self.registry.attached_ids();
        Some(self.frames.schedule(&mut self.surface, attached))
    }

    /// Animation-frame callback. Returns the number of overlays moved.
    ///
    /// Stale frame ids (superseded or canceled requests) are ignored.
    pub fn on_animation_frame(&mut self, id: FrameRequestId) -> usize {
        if !self.alive {
            return 0;
        }
        let Some(mut due) = self.frames.take_due(id) else {
            debug!(frame = id.0, "stale animation frame ignored");
            return 0;
        };

        if self.recluster_pending
            && let Some(viewport) = ViewportState::read(&self.surface)
        {
            self.registry
                .refresh(viewport, &mut self.surface, &self.observers);
            self.recluster_pending = false;
            due = self.registry.attached_ids();
        }
        self.registry.reposition(&due, &mut self.surface)
    }

    /// Cancels pending frames, destroys every marker, drops the viewport
    /// listener and all observers. Idempotent.
    pub fn dispose(&mut self) {
        if !self.alive {
            return;
        }
        self.alive = false;

        self.frames.cancel(&mut self.surface);
        let destroyed = self.registry.clear(&mut self.surface);
        if let Some(listener) = self.listener.take() {
            self.surface.remove_viewport_listener(listener);
        }
        self.observers.clear();
        self.recluster_pending = false;
        info!(destroyed, "marker engine disposed");
    }

    /// Returns `false` if already subscribed or disposed.
    pub fn add_observer(&mut self, observer: Rc<dyn MarkerObserver>) -> bool {
        self.alive && self.observers.subscribe(observer)
    }

    pub fn remove_observer(&mut self, observer: &Rc<dyn MarkerObserver>) -> bool {
        self.observers.unsubscribe(observer)
    }

    pub fn marker(&self, id: &EntityId) -> Option<&Marker> {
        self.registry.get(id)
    }

    /// Live ids, ascending.
    pub fn marker_ids(&self) -> Vec<EntityId> {
        self.registry.ids()
    }

    pub fn len(&self) -> usize {
        self.registry.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registry.is_empty()
    }

    pub fn selected(&self) -> Option<&EntityId> {
        self.registry.selected()
    }

    pub fn is_alive(&self) -> bool {
        self.alive
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn pending_frame(&self) -> Option<FrameRequestId> {
        self.frames.pending()
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    /// Direct access to the host surface, e.g. to move the viewport.
    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }
}

impl<S: MapSurface> Drop for MarkerEngine<S> {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl<S: MapSurface> std::fmt::Debug for MarkerEngine<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MarkerEngine")
            .field("registry", &self.registry)
            .field("observers", &self.observers)
            .field("pending_frame", &self.frames.pending())
            .field("alive", &self.alive)
            .finish()
    }
}
