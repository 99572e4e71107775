use crate::marker::Marker;

/// Per-marker inputs to a visibility decision.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct VisibilityContext {
    pub zoom: f64,
    /// Member of a cluster with two or more markers.
    pub is_in_cluster: bool,
    pub is_selected: bool,
}

/// Decides whether a marker's overlay renders individually.
///
/// The registry calls `begin_pass` once, then `should_show` for every marker
/// in ascending entity-id order.
pub trait VisibilityPolicy {
    fn name(&self) -> &str;

    fn begin_pass(&mut self) {}

    fn should_show(&mut self, marker: &Marker, ctx: &VisibilityContext) -> bool;
}

/// Selected, or zoomed in past the threshold, or not absorbed by a cluster.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct ZoomThresholdPolicy {
    threshold: f64,
}

impl ZoomThresholdPolicy {
    pub fn new(threshold: f64) -> Self {
        Self { threshold }
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    fn decide(&self, ctx: &VisibilityContext) -> bool {
        ctx.is_selected || ctx.zoom >= self.threshold || !ctx.is_in_cluster
    }
}

impl VisibilityPolicy for ZoomThresholdPolicy {
    fn name(&self) -> &str {
        "zoom"
    }

    fn should_show(&mut self, _marker: &Marker, ctx: &VisibilityContext) -> bool {
        self.decide(ctx)
    }
}

/// Zoom-threshold rule with a ceiling on simultaneously shown overlays.
///
/// The selected marker is always shown and does not count against the cap.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct CappedPolicy {
    zoom: ZoomThresholdPolicy,
    max_visible: usize,
    shown: usize,
}

impl CappedPolicy {
    pub fn new(threshold: f64, max_visible: usize) -> Self {
        Self {
            zoom: ZoomThresholdPolicy::new(threshold),
            max_visible,
            shown: 0,
        }
    }

    pub fn max_visible(&self) -> usize {
        self.max_visible
    }
}

impl VisibilityPolicy for CappedPolicy {
    fn name(&self) -> &str {
        "capped"
    }

    fn begin_pass(&mut self) {
        self.shown = 0;
    }

    fn should_show(&mut self, _marker: &Marker, ctx: &VisibilityContext) -> bool {
        if ctx.is_selected {
            return true;
        }
        if !self.zoom.decide(ctx) || self.shown >= self.max_visible {
            return false;
        }
        self.shown += 1;
        true
    }
}
