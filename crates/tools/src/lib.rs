//! Scenario replay against the headless map surface.
//!
//! A scenario is a JSON document:
//!
//! ```json
//! {
//!   "config": { "zoomThreshold": 18 },
//!   "viewport": { "center": { "lat": 0, "lng": 0 }, "zoom": 10, "width": 800, "height": 600 },
//!   "steps": [
//!     { "entities": [ ... ], "selected": "e2", "zoom": 10 },
//!     { "pan": [40, 0] }
//!   ]
//! }
//! ```
//!
//! A step without `entities` reuses the previous list. `pan` moves the
//! viewport after the update and fires the coalesced frame.

use std::path::Path;
use std::rc::Rc;

use foundation::LatLng;
use markers::{
    EngineConfig, EngineError, Entity, EntityId, EventRecorder, HeadlessSurface, MarkerEngine,
    MarkerEvent, SurfaceCounters, UpdateReport, UpdateStatus,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

#[derive(Debug)]
pub enum ReplayError {
    Io(String),
    Json(String),
    Engine(EngineError),
}

impl std::fmt::Display for ReplayError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReplayError::Io(msg) => write!(f, "scenario io error: {msg}"),
            ReplayError::Json(msg) => write!(f, "scenario json error: {msg}"),
            ReplayError::Engine(err) => write!(f, "engine error: {err}"),
        }
    }
}

impl std::error::Error for ReplayError {}

impl From<EngineError> for ReplayError {
    fn from(err: EngineError) -> Self {
        ReplayError::Engine(err)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Viewport {
    pub center: LatLng,
    pub zoom: f64,
    pub width: u32,
    pub height: u32,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            center: LatLng::new(0.0, 0.0),
            zoom: 10.0,
            width: 800,
            height: 600,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Step {
    #[serde(default)]
    pub entities: Option<Vec<Entity>>,
    #[serde(default)]
    pub selected: Option<EntityId>,
    /// Defaults to the viewport's current zoom.
    #[serde(default)]
    pub zoom: Option<f64>,
    #[serde(default)]
    pub pan: Option<[f64; 2]>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    #[serde(default)]
    pub config: EngineConfig,
    #[serde(default)]
    pub viewport: Viewport,
    #[serde(default)]
    pub steps: Vec<Step>,
}

impl Scenario {
    pub fn from_json_str(json: &str) -> Result<Self, ReplayError> {
        serde_json::from_str(json).map_err(|e| ReplayError::Json(e.to_string()))
    }

    pub fn load(path: &Path) -> Result<Self, ReplayError> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| ReplayError::Io(format!("read {}: {e}", path.display())))?;
        Self::from_json_str(&text)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StepSummary {
    pub step: usize,
    pub applied: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report: Option<UpdateReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frame_writes: Option<usize>,
    pub visible: Vec<EntityId>,
    pub events: Vec<MarkerEvent>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReplaySummary {
    pub steps: Vec<StepSummary>,
    /// Surface call counts after the engine was disposed.
    pub counters: SurfaceCounters,
    /// Overlays still alive on the surface after dispose.
    pub leaked_overlays: usize,
}

/// Runs every step of `scenario` on a fresh engine, then disposes it.
pub fn replay(scenario: &Scenario) -> Result<ReplaySummary, ReplayError> {
    let vp = &scenario.viewport;
    let surface = HeadlessSurface::new(vp.center, vp.zoom, vp.width, vp.height);
    let mut engine = MarkerEngine::initialize(surface, scenario.config.clone())?;
    let recorder = Rc::new(EventRecorder::new());
    engine.add_observer(recorder.clone());

    let mut entities: Vec<Entity> = Vec::new();
    let mut steps = Vec::with_capacity(scenario.steps.len());
    for (idx, step) in scenario.steps.iter().enumerate() {
        if let Some(next) = &step.entities {
            entities = next.clone();
        }
        let zoom = step.zoom.unwrap_or_else(|| engine.surface().zoom_level());
        engine.surface_mut().set_zoom(zoom);

        let status = engine.update(&entities, step.selected.as_ref(), zoom);
        let frame_writes = match step.pan {
            Some([dx, dy]) => {
                engine.surface_mut().pan_by_px(dx, dy);
                engine
                    .on_viewport_changed()
                    .and_then(|frame| engine.surface_mut().fire_frame(frame))
                    .map(|frame| engine.on_animation_frame(frame))
            }
            None => None,
        };

        let visible = engine
            .marker_ids()
            .into_iter()
            .filter(|id| engine.marker(id).is_some_and(|m| m.is_visible()))
            .collect();
        debug!(step = idx, applied = status.is_applied(), "replayed step");
        steps.push(StepSummary {
            step: idx,
            applied: status.is_applied(),
            report: match status {
                UpdateStatus::Applied(report) => Some(report),
                UpdateStatus::NotReady(_) => None,
            },
            frame_writes,
            visible,
            events: recorder.take(),
        });
    }

    engine.dispose();
    let counters = engine.surface().counters();
    let leaked_overlays = engine.surface().live_overlay_count();
    info!(steps = steps.len(), leaked_overlays, "replay finished");

    Ok(ReplaySummary {
        steps,
        counters,
        leaked_overlays,
    })
}
