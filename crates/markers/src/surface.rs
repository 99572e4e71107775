//! Host capabilities the engine consumes.
//!
//! The engine assumes nothing about the map vendor beyond these traits:
//! overlays can be attached to and detached from a render surface, a
//! geographic to pixel projection exists, and the host reports viewport
//! changes by calling back into the engine.

use foundation::{GeoBounds, LatLng, ScreenPoint};
use runtime::FrameHost;

use crate::style::Rgba;

/// Host-side overlay element.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct OverlayHandle(pub u64);

/// Registration of the engine's viewport-change listener on the host map.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ListenerId(pub u64);

/// Everything an overlay element displays.
#[derive(Debug, Clone, PartialEq)]
pub struct OverlayContent {
    pub image_url: Option<String>,
    pub label: String,
    pub border_color: Rgba,
}

/// Zoom and visible area for one clustering pass.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct ViewportState {
    pub zoom: f64,
    pub bounds: GeoBounds,
}

impl ViewportState {
    /// Reads the host viewport. `None` while the map is not ready.
    pub fn read<V: MapView + ?Sized>(view: &V) -> Option<Self> {
        let zoom = view.zoom().filter(|z| z.is_finite())?;
        let bounds = view.bounds()?;
        Some(Self { zoom, bounds })
    }
}

/// Viewport and projection service.
///
/// `None` from any query means the map is not ready (e.g. still loading).
pub trait MapView {
    fn bounds(&self) -> Option<GeoBounds>;
    fn zoom(&self) -> Option<f64>;
    fn project(&self, position: LatLng) -> Option<ScreenPoint>;

    fn add_viewport_listener(&mut self) -> ListenerId;
    fn remove_viewport_listener(&mut self, id: ListenerId);
}

/// Element-level operations on the layer overlays are drawn into.
///
/// Each setter touches only the named part of the element.
pub trait RenderSurface {
    fn create_overlay(&mut self, content: &OverlayContent) -> OverlayHandle;
    fn release_overlay(&mut self, handle: OverlayHandle);

    fn attach(&mut self, handle: OverlayHandle);
    fn detach(&mut self, handle: OverlayHandle);

    fn set_position(&mut self, handle: OverlayHandle, point: ScreenPoint);
    fn set_border_color(&mut self, handle: OverlayHandle, color: Rgba);
    fn set_image(&mut self, handle: OverlayHandle, url: Option<&str>);
    fn set_label(&mut self, handle: OverlayHandle, text: &str);
    fn bring_to_front(&mut self, handle: OverlayHandle);
}

/// The full capability set a host map provides.
pub trait MapSurface: MapView + RenderSurface + FrameHost {}

impl<T> MapSurface for T where T: MapView + RenderSurface + FrameHost {}
