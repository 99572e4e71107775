use std::collections::BTreeMap;

use crate::cluster::{ClusteringStrategy, GridClustering};
use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::visibility::{CappedPolicy, VisibilityPolicy, ZoomThresholdPolicy};

pub const GRID_CLUSTERING: &str = "grid";
pub const ZOOM_VISIBILITY: &str = "zoom";
pub const CAPPED_VISIBILITY: &str = "capped";

pub type ClusteringCtor = Box<dyn Fn(&EngineConfig) -> Box<dyn ClusteringStrategy>>;
pub type VisibilityCtor = Box<dyn Fn(&EngineConfig) -> Box<dyn VisibilityPolicy>>;

/// Name-keyed constructors for the pluggable strategies.
///
/// `EngineConfig::clustering_strategy` and `visibility_strategy` are looked up
/// here when an engine is built. Registering an existing name replaces it.
pub struct StrategyRegistry {
    clustering: BTreeMap<String, ClusteringCtor>,
    visibility: BTreeMap<String, VisibilityCtor>,
}

impl StrategyRegistry {
    /// A registry with no strategies at all.
    pub fn empty() -> Self {
        Self {
            clustering: BTreeMap::new(),
            visibility: BTreeMap::new(),
        }
    }

    /// `grid` clustering plus `zoom` and `capped` visibility.
    pub fn with_defaults() -> Self {
        let mut r = Self::empty();
        r.register_clustering(GRID_CLUSTERING, |c| {
            Box::new(GridClustering::new(
                c.grid_size,
                c.max_cluster_distance,
                c.viewport_padding,
            ))
        });
        r.register_visibility(ZOOM_VISIBILITY, |c| {
            Box::new(ZoomThresholdPolicy::new(c.zoom_threshold))
        });
        r.register_visibility(CAPPED_VISIBILITY, |c| {
            Box::new(CappedPolicy::new(c.zoom_threshold, c.max_visible_overlays))
        });
        r
    }

    pub fn register_clustering<F>(&mut self, name: impl Into<String>, ctor: F)
    where
        F: Fn(&EngineConfig) -> Box<dyn ClusteringStrategy> + 'static,
    {
        self.clustering.insert(name.into(), Box::new(ctor));
    }

    pub fn register_visibility<F>(&mut self, name: impl Into<String>, ctor: F)
    where
        F: Fn(&EngineConfig) -> Box<dyn VisibilityPolicy> + 'static,
    {
        self.visibility.insert(name.into(), Box::new(ctor));
    }

    pub fn clustering_names(&self) -> impl Iterator<Item = &str> + '_ {
        self.clustering.keys().map(String::as_str)
    }

    pub fn visibility_names(&self) -> impl Iterator<Item = &str> + '_ {
        self.visibility.keys().map(String::as_str)
    }

    pub fn build_clustering(
        &self,
        config: &EngineConfig,
    ) -> Result<Box<dyn ClusteringStrategy>, EngineError> {
        let name = config.clustering_strategy.as_str();
        let ctor = self
            .clustering
            .get(name)
            .ok_or_else(|| EngineError::UnknownClusteringStrategy(name.to_string()))?;
        Ok(ctor(config))
    }

    pub fn build_visibility(
        &self,
        config: &EngineConfig,
    ) -> Result<Box<dyn VisibilityPolicy>, EngineError> {
        let name = config.visibility_strategy.as_str();
        let ctor = self
            .visibility
            .get(name)
            .ok_or_else(|| EngineError::UnknownVisibilityStrategy(name.to_string()))?;
        Ok(ctor(config))
    }
}

impl Default for StrategyRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}
