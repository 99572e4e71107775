use serde::{Deserialize, Serialize};

use crate::error::EngineError;
use crate::strategies::{GRID_CLUSTERING, ZOOM_VISIBILITY};
use crate::style::MarkerStyle;

/// Engine options recognized at construction time.
///
/// Grid size and cluster distance are empirical tuning knobs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EngineConfig {
    /// Zoom at or above which every marker renders individually.
    pub zoom_threshold: f64,
    /// Grid cell edge in screen pixels.
    pub grid_size: f64,
    /// Largest distance (km) between a cluster anchor and one of its members.
    pub max_cluster_distance: f64,
    pub clustering_strategy: String,
    pub visibility_strategy: String,
    /// Ceiling used by the `capped` visibility policy.
    pub max_visible_overlays: usize,
    /// Fraction of the viewport span added on each side before clustering.
    pub viewport_padding: f64,
    /// Pixel movement below which an overlay is not repositioned.
    pub reposition_epsilon_px: f64,
    pub style: MarkerStyle,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            zoom_threshold: 18.0,
            grid_size: 60.0,
            max_cluster_distance: 50_000.0,
            clustering_strategy: GRID_CLUSTERING.to_string(),
            visibility_strategy: ZOOM_VISIBILITY.to_string(),
            max_visible_overlays: 200,
            viewport_padding: 0.25,
            reposition_epsilon_px: 0.5,
            style: MarkerStyle::default(),
        }
    }
}

impl EngineConfig {
    /// Decodes a (possibly partial) JSON object; missing fields take defaults.
    pub fn from_json_str(json: &str) -> Result<Self, EngineError> {
        let config: EngineConfig =
            serde_json::from_str(json).map_err(|e| EngineError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), EngineError> {
        if !self.zoom_threshold.is_finite() {
            return Err(EngineError::InvalidConfig(
                "zoomThreshold must be finite".to_string(),
            ));
        }
        if !(self.grid_size.is_finite() && self.grid_size > 0.0) {
            return Err(EngineError::InvalidConfig(format!(
                "gridSize must be a positive number of pixels, got {}",
                self.grid_size
            )));
        }
        if self.max_cluster_distance.is_nan() || self.max_cluster_distance < 0.0 {
            return Err(EngineError::InvalidConfig(format!(
                "maxClusterDistance must be >= 0, got {}",
                self.max_cluster_distance
            )));
        }
        if !(self.viewport_padding.is_finite() && self.viewport_padding >= 0.0) {
            return Err(EngineError::InvalidConfig(format!(
                "viewportPadding must be >= 0, got {}",
                self.viewport_padding
            )));
        }
        if !(self.reposition_epsilon_px.is_finite() && self.reposition_epsilon_px >= 0.0) {
            return Err(EngineError::InvalidConfig(format!(
                "repositionEpsilonPx must be >= 0, got {}",
                self.reposition_epsilon_px
            )));
        }
        if self.max_visible_overlays == 0 {
            return Err(EngineError::InvalidConfig(
                "maxVisibleOverlays must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
