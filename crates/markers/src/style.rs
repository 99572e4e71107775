use serde::{Deserialize, Serialize};

use crate::entity::EntityStatus;

/// Linear RGBA in `[0, 1]`.
pub type Rgba = [f32; 4];

#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarkerStyle {
    pub active_color: Rgba,
    pub planned_color: Rgba,
    /// Border of the selected marker, regardless of status.
    pub selected_color: Rgba,
}

impl MarkerStyle {
    pub fn border_color(&self, status: EntityStatus, selected: bool) -> Rgba {
        if selected {
            return self.selected_color;
        }
        match status {
            EntityStatus::Active => self.active_color,
            EntityStatus::Planned => self.planned_color,
        }
    }
}

impl Default for MarkerStyle {
    fn default() -> Self {
        Self {
            active_color: [0.18, 0.62, 0.32, 1.0],
            planned_color: [0.95, 0.61, 0.07, 1.0],
            selected_color: [0.12, 0.42, 0.95, 1.0],
        }
    }
}
