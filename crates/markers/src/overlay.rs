use foundation::ScreenPoint;

use crate::entity::Entity;
use crate::style::Rgba;
use crate::surface::{OverlayContent, OverlayHandle, RenderSurface};

/// Screen-space visual owned by exactly one marker.
///
/// Invariant: `attached` mirrors what the engine last told the surface.
#[derive(Debug, Clone, PartialEq)]
pub struct Overlay {
    handle: OverlayHandle,
    content: OverlayContent,
    screen: Option<ScreenPoint>,
    attached: bool,
}

impl Overlay {
    pub fn handle(&self) -> OverlayHandle {
        self.handle
    }

    pub fn content(&self) -> &OverlayContent {
        &self.content
    }

    /// Last position written to the surface.
    pub fn screen_position(&self) -> Option<ScreenPoint> {
        self.screen
    }

    pub fn is_attached(&self) -> bool {
        self.attached
    }
}

/// Parts of an overlay touched by one repaint.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub struct RepaintSummary {
    pub border: bool,
    pub image: bool,
    pub label: bool,
}

impl RepaintSummary {
    pub fn touched(&self) -> bool {
        self.border || self.image || self.label
    }
}

/// Creates, positions, repaints and tears down overlay elements.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct OverlayRenderer {
    epsilon_px: f64,
}

impl Default for OverlayRenderer {
    fn default() -> Self {
        Self { epsilon_px: 0.5 }
    }
}

impl OverlayRenderer {
    pub fn new(epsilon_px: f64) -> Self {
        Self {
            epsilon_px: epsilon_px.max(0.0),
        }
    }

    pub fn epsilon_px(&self) -> f64 {
        self.epsilon_px
    }

    pub fn content_for(entity: &Entity, border_color: Rgba) -> OverlayContent {
        OverlayContent {
            image_url: entity.thumbnail_url.clone(),
            label: entity.display_name.clone(),
            border_color,
        }
    }

    /// Creates the host element. It starts detached.
    pub fn create<R>(&self, surface: &mut R, content: OverlayContent) -> Overlay
    where
        R: RenderSurface + ?Sized,
    {
        let handle = surface.create_overlay(&content);
        Overlay {
            handle,
            content,
            screen: None,
            attached: false,
        }
    }

    /// Returns `false` if the overlay was already attached.
    pub fn attach<R>(&self, overlay: &mut Overlay, surface: &mut R) -> bool
    where
        R: RenderSurface + ?Sized,
    {
        if overlay.attached {
            return false;
        }
        surface.attach(overlay.handle);
        overlay.attached = true;
        true
    }

    /// Returns `false` if the overlay was not attached.
    pub fn detach<R>(&self, overlay: &mut Overlay, surface: &mut R) -> bool
    where
        R: RenderSurface + ?Sized,
    {
        if !overlay.attached {
            return false;
        }
        surface.detach(overlay.handle);
        overlay.attached = false;
        true
    }

    /// Moves an attached overlay to `point`.
    ///
    /// Skips the write (and returns `false`) when the overlay is detached, the
    /// point is not finite, or the move is below the epsilon.
    pub fn reposition<R>(&self, overlay: &mut Overlay, surface: &mut R, point: ScreenPoint) -> bool
    where
        R: RenderSurface + ?Sized,
    {
        if !overlay.attached || !point.is_finite() {
            return false;
        }
        if let Some(prev) = overlay.screen
            && prev.distance(point) < self.epsilon_px
        {
            return false;
        }
        surface.set_position(overlay.handle, point);
        overlay.screen = Some(point);
        true
    }

    /// Rewrites only the parts of the element whose content differs.
    pub fn repaint<R>(
        &self,
        overlay: &mut Overlay,
        surface: &mut R,
        snapshot: &Entity,
        border_color: Rgba,
    ) -> RepaintSummary
    where
        R: RenderSurface + ?Sized,
    {
        let mut summary = RepaintSummary::default();

        if overlay.content.border_color != border_color {
            surface.set_border_color(overlay.handle, border_color);
            overlay.content.border_color = border_color;
            summary.border = true;
        }
        if overlay.content.image_url != snapshot.thumbnail_url {
            surface.set_image(overlay.handle, snapshot.thumbnail_url.as_deref());
            overlay.content.image_url = snapshot.thumbnail_url.clone();
            summary.image = true;
        }
        if overlay.content.label != snapshot.display_name {
            surface.set_label(overlay.handle, &snapshot.display_name);
            overlay.content.label = snapshot.display_name.clone();
            summary.label = true;
        }

        summary
    }

    pub fn bring_to_front<R>(&self, overlay: &Overlay, surface: &mut R)
    where
        R: RenderSurface + ?Sized,
    {
        surface.bring_to_front(overlay.handle);
    }

    /// Detaches (if needed) and releases the host element.
    pub fn release<R>(&self, mut overlay: Overlay, surface: &mut R)
    where
        R: RenderSurface + ?Sized,
    {
        self.detach(&mut overlay, surface);
        surface.release_overlay(overlay.handle);
    }
}
