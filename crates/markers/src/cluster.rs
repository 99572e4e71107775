use std::collections::BTreeMap;

use foundation::math::haversine_km;
use foundation::{GeoBounds, LatLng};

use crate::entity::EntityId;
use crate::marker::Marker;
use crate::surface::MapView;

/// Ephemeral grouping produced by one clustering pass.
#[derive(Debug, Clone, PartialEq)]
pub struct Cluster {
    pub members: Vec<EntityId>,
    pub anchor: LatLng,
}

impl Cluster {
    pub fn single(id: EntityId, position: LatLng) -> Self {
        Self {
            members: vec![id],
            anchor: position,
        }
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Only clusters with two or more members absorb their markers.
    pub fn is_multi(&self) -> bool {
        self.members.len() > 1
    }

    pub fn contains(&self, id: &EntityId) -> bool {
        self.members.iter().any(|m| m == id)
    }
}

/// Viewport inputs available to a clustering pass.
pub struct ClusterContext<'a> {
    pub zoom: f64,
    pub bounds: GeoBounds,
    pub view: &'a dyn MapView,
}

/// Partitions the live marker set.
///
/// Every input marker must appear in exactly one output cluster.
pub trait ClusteringStrategy {
    fn name(&self) -> &str;
    fn cluster(&self, markers: &[&Marker], ctx: &ClusterContext<'_>) -> Vec<Cluster>;
}

/// Fixed pixel-grid bucketing.
///
/// Markers inside the padded viewport are hashed into square screen cells of
/// `grid_size_px`. Inside a cell, a marker joins the first cluster whose seed
/// lies within `max_distance_km`; otherwise it seeds a new cluster. Markers
/// outside the padded viewport, or that the host cannot project, come out as
/// singletons.
///
/// Ordering contract:
/// - Cell clusters first, in ascending `(cell_x, cell_y)` order, then singletons.
/// - Members keep input order.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct GridClustering {
    grid_size_px: f64,
    max_distance_km: f64,
    viewport_padding: f64,
}

struct CellCluster {
    seed: LatLng,
    members: Vec<(EntityId, LatLng)>,
}

impl GridClustering {
    pub fn new(grid_size_px: f64, max_distance_km: f64, viewport_padding: f64) -> Self {
        Self {
            grid_size_px,
            max_distance_km,
            viewport_padding,
        }
    }

    pub fn grid_size_px(&self) -> f64 {
        self.grid_size_px
    }

    pub fn max_distance_km(&self) -> f64 {
        self.max_distance_km
    }
}

impl ClusteringStrategy for GridClustering {
    fn name(&self) -> &str {
        "grid"
    }

    fn cluster(&self, markers: &[&Marker], ctx: &ClusterContext<'_>) -> Vec<Cluster> {
        let padded = ctx.bounds.padded(self.viewport_padding);
        let mut cells: BTreeMap<(i64, i64), Vec<CellCluster>> = BTreeMap::new();
        let mut singles = Vec::new();

        for marker in markers {
            let id = marker.entity_id().clone();
            let pos = marker.position();

            let cell = if padded.contains(pos) {
                ctx.view
                    .project(pos)
                    .filter(|p| p.is_finite())
                    .map(|p| p.cell(self.grid_size_px))
            } else {
                None
            };
            let Some(cell) = cell else {
                singles.push(Cluster::single(id, pos));
                continue;
            };

            let bucket = cells.entry(cell).or_default();
            match bucket
                .iter_mut()
                .find(|c| haversine_km(c.seed, pos) <= self.max_distance_km)
            {
                Some(c) => c.members.push((id, pos)),
                None => bucket.push(CellCluster {
                    seed: pos,
                    members: vec![(id, pos)],
                }),
            }
        }

        let mut out = Vec::with_capacity(markers.len());
        for bucket in cells.into_values() {
            for c in bucket {
                let anchor = LatLng::centroid(c.members.iter().map(|(_, p)| *p)).unwrap_or(c.seed);
                out.push(Cluster {
                    members: c.members.into_iter().map(|(id, _)| id).collect(),
                    anchor,
                });
            }
        }
        out.extend(singles);
        out
    }
}
