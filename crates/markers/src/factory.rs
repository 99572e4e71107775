use serde::Serialize;

use crate::entity::Entity;
use crate::error::CreateFailure;
use crate::marker::Marker;
use crate::overlay::OverlayRenderer;
use crate::style::MarkerStyle;
use crate::surface::{MapView, RenderSurface};

/// What differed between a marker's snapshot and the incoming entity.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, Serialize)]
pub struct MarkerChanges {
    pub position: bool,
    pub status: bool,
    pub display_name: bool,
    pub thumbnail: bool,
}

impl MarkerChanges {
    pub fn between(previous: &Entity, next: &Entity) -> Self {
        Self {
            position: previous.position != next.position,
            status: previous.status != next.status,
            display_name: previous.display_name != next.display_name,
            thumbnail: previous.thumbnail_url != next.thumbnail_url,
        }
    }

    pub fn is_empty(&self) -> bool {
        !self.position && !self.visual()
    }

    /// True if the overlay content (not its placement) has to be repainted.
    pub fn visual(&self) -> bool {
        self.status || self.display_name || self.thumbnail
    }
}

/// Turns entities into marker + overlay pairs and keeps them in sync.
#[derive(Debug, Clone, PartialEq)]
pub struct MarkerFactory {
    renderer: OverlayRenderer,
    style: MarkerStyle,
}

impl MarkerFactory {
    pub fn new(renderer: OverlayRenderer, style: MarkerStyle) -> Self {
        Self { renderer, style }
    }

    pub fn renderer(&self) -> &OverlayRenderer {
        &self.renderer
    }

    pub fn style(&self) -> &MarkerStyle {
        &self.style
    }

    /// Builds a detached marker for `entity`.
    ///
    /// Fails without touching the surface when the entity has no usable
    /// position; callers skip such entities.
    pub fn create<S>(
        &self,
        entity: &Entity,
        surface: &mut S,
        selected: bool,
    ) -> Result<Marker, CreateFailure>
    where
        S: RenderSurface + ?Sized,
    {
        let position = entity.valid_position()?;
        let border = self.style.border_color(entity.status, selected);
        let overlay = self
            .renderer
            .create(surface, OverlayRenderer::content_for(entity, border));

        Ok(Marker {
            entity_id: entity.id.clone(),
            position,
            overlay,
            snapshot: entity.clone(),
            is_visible: false,
            is_selected: selected,
        })
    }

    /// Applies `entity` to an existing marker in place.
    ///
    /// The caller guarantees `entity` has a valid position. Unchanged
    /// entities cost one comparison and no surface work.
    pub fn update<S>(&self, marker: &mut Marker, entity: &Entity, surface: &mut S) -> MarkerChanges
    where
        S: MapView + RenderSurface + ?Sized,
    {
        let changes = MarkerChanges::between(&marker.snapshot, entity);
        if changes.is_empty() {
            return changes;
        }

        if changes.position
            && let Ok(position) = entity.valid_position()
        {
            marker.position = position;
            if let Some(point) = surface.project(position) {
                self.renderer.reposition(&mut marker.overlay, surface, point);
            }
        }
        if changes.visual() {
            let border = self.style.border_color(entity.status, marker.is_selected);
            self.renderer
                .repaint(&mut marker.overlay, surface, entity, border);
        }

        marker.snapshot = entity.clone();
        changes
    }

    /// Repaints the border for a selection flip. Returns `false` if unchanged.
    pub fn set_selected<S>(&self, marker: &mut Marker, selected: bool, surface: &mut S) -> bool
    where
        S: RenderSurface + ?Sized,
    {
        if marker.is_selected == selected {
            return false;
        }
        marker.is_selected = selected;
        let border = self.style.border_color(marker.snapshot.status, selected);
        self.renderer
            .repaint(&mut marker.overlay, surface, &marker.snapshot, border);
        true
    }

    /// Tears down the marker's overlay. The marker is consumed.
    pub fn destroy<S>(&self, marker: Marker, surface: &mut S)
    where
        S: RenderSurface + ?Sized,
    {
        self.renderer.release(marker.overlay, surface);
    }
}
