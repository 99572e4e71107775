//! In-memory map surface.
//!
//! Implements every host trait against a Web-Mercator viewport and a plain
//! handle table. Every call is counted so callers can check that overlay
//! creation and teardown stay symmetric.

use std::collections::{BTreeMap, BTreeSet};

use foundation::math::{project_world_px, unproject_world_px, world_size_px};
use foundation::{GeoBounds, LatLng, ScreenPoint};
use runtime::{FrameHost, FrameRequestId};
use serde::Serialize;
use tracing::warn;

use crate::style::Rgba;
use crate::surface::{ListenerId, MapView, OverlayContent, OverlayHandle, RenderSurface};

/// Call counts recorded by a [`HeadlessSurface`].
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, Serialize)]
pub struct SurfaceCounters {
    pub created: usize,
    pub released: usize,
    pub attached: usize,
    pub detached: usize,
    pub position_writes: usize,
    pub border_writes: usize,
    pub image_writes: usize,
    pub label_writes: usize,
    pub raised: usize,
    pub frames_requested: usize,
    pub frames_canceled: usize,
    pub listeners_added: usize,
    pub listeners_removed: usize,
}

/// State of one live overlay element.
#[derive(Debug, Clone, PartialEq)]
pub struct HeadlessOverlay {
    pub content: OverlayContent,
    pub attached: bool,
    pub position: Option<ScreenPoint>,
}

#[derive(Debug)]
pub struct HeadlessSurface {
    center: LatLng,
    zoom: f64,
    width: u32,
    height: u32,
    loaded: bool,
    overlays: BTreeMap<OverlayHandle, HeadlessOverlay>,
    pending_frames: BTreeSet<FrameRequestId>,
    listeners: BTreeSet<ListenerId>,
    /// Attached overlays, bottom to top.
    stack: Vec<OverlayHandle>,
    next_id: u64,
    counters: SurfaceCounters,
}

impl HeadlessSurface {
    /// A loaded map of `width` x `height` pixels centered on `center`.
    pub fn new(center: LatLng, zoom: f64, width: u32, height: u32) -> Self {
        Self {
            center,
            zoom,
            width,
            height,
            loaded: true,
            overlays: BTreeMap::new(),
            pending_frames: BTreeSet::new(),
            listeners: BTreeSet::new(),
            stack: Vec::new(),
            next_id: 1,
            counters: SurfaceCounters::default(),
        }
    }

    /// Same as [`HeadlessSurface::new`] but reporting no viewport until
    /// [`HeadlessSurface::set_loaded`] is called.
    pub fn unloaded(center: LatLng, zoom: f64, width: u32, height: u32) -> Self {
        Self {
            loaded: false,
            ..Self::new(center, zoom, width, height)
        }
    }

    pub fn set_loaded(&mut self, loaded: bool) {
        self.loaded = loaded;
    }

    pub fn center(&self) -> LatLng {
        self.center
    }

    pub fn size_px(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Current zoom, whether or not the map reports itself loaded.
    pub fn zoom_level(&self) -> f64 {
        self.zoom
    }

    pub fn set_zoom(&mut self, zoom: f64) {
        self.zoom = zoom;
    }

    pub fn set_view(&mut self, center: LatLng, zoom: f64) {
        self.center = center;
        self.zoom = zoom;
    }

    /// Moves the viewport center by a pixel offset at the current zoom.
    pub fn pan_by_px(&mut self, dx: f64, dy: f64) {
        let c = project_world_px(self.center, self.zoom);
        let moved = unproject_world_px(ScreenPoint::new(c.x + dx, c.y + dy), self.zoom);
        self.center = LatLng::new(moved.lat, wrap_lng(moved.lng));
    }

    pub fn counters(&self) -> SurfaceCounters {
        self.counters
    }

    pub fn overlay(&self, handle: OverlayHandle) -> Option<&HeadlessOverlay> {
        self.overlays.get(&handle)
    }

    /// Created and not yet released.
    pub fn live_overlay_count(&self) -> usize {
        self.overlays.len()
    }

    pub fn attached_count(&self) -> usize {
        self.overlays.values().filter(|o| o.attached).count()
    }

    /// Outstanding frame requests, oldest first.
    pub fn pending_frames(&self) -> Vec<FrameRequestId> {
        self.pending_frames.iter().copied().collect()
    }

    /// Delivers a pending frame: the request stops being outstanding and its
    /// id is handed back for the engine callback. Canceled or already fired
    /// ids yield `None`.
    pub fn fire_frame(&mut self, id: FrameRequestId) -> Option<FrameRequestId> {
        self.pending_frames.remove(&id).then_some(id)
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    /// Attached overlays from bottom to top. Attaching or raising an
    /// overlay puts it on top.
    pub fn stacking_order(&self) -> &[OverlayHandle] {
        &self.stack
    }

    pub fn frontmost(&self) -> Option<OverlayHandle> {
        self.stack.last().copied()
    }

    fn unstack(&mut self, handle: OverlayHandle) {
        self.stack.retain(|h| *h != handle);
    }

    fn next(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    fn live(&mut self, handle: OverlayHandle, op: &'static str) -> Option<&mut HeadlessOverlay> {
        let overlay = self.overlays.get_mut(&handle);
        if overlay.is_none() {
            warn!(handle = handle.0, op, "operation on unknown overlay");
        }
        overlay
    }
}

impl MapView for HeadlessSurface {
    fn bounds(&self) -> Option<GeoBounds> {
        if !self.loaded || !self.zoom.is_finite() {
            return None;
        }
        let c = project_world_px(self.center, self.zoom);
        let (hw, hh) = (f64::from(self.width) / 2.0, f64::from(self.height) / 2.0);
        let nw = unproject_world_px(ScreenPoint::new(c.x - hw, c.y - hh), self.zoom);
        let se = unproject_world_px(ScreenPoint::new(c.x + hw, c.y + hh), self.zoom);

        if f64::from(self.width) >= world_size_px(self.zoom) {
            return Some(GeoBounds::new(nw.lat, se.lat, 180.0, -180.0));
        }
        Some(GeoBounds::new(
            nw.lat,
            se.lat,
            wrap_lng(se.lng),
            wrap_lng(nw.lng),
        ))
    }

    fn zoom(&self) -> Option<f64> {
        (self.loaded && self.zoom.is_finite()).then_some(self.zoom)
    }

    fn project(&self, position: LatLng) -> Option<ScreenPoint> {
        if !self.loaded {
            return None;
        }
        let size = world_size_px(self.zoom);
        let c = project_world_px(self.center, self.zoom);
        let p = project_world_px(position, self.zoom);

        // Take the copy of the world nearest to the center.
        let mut dx = p.x - c.x;
        if dx > size / 2.0 {
            dx -= size;
        } else if dx < -size / 2.0 {
            dx += size;
        }
        Some(ScreenPoint::new(
            dx + f64::from(self.width) / 2.0,
            p.y - c.y + f64::from(self.height) / 2.0,
        ))
    }

    fn add_viewport_listener(&mut self) -> ListenerId {
        let id = ListenerId(self.next());
        self.listeners.insert(id);
        self.counters.listeners_added += 1;
        id
    }

    fn remove_viewport_listener(&mut self, id: ListenerId) {
        if self.listeners.remove(&id) {
            self.counters.listeners_removed += 1;
        }
    }
}

impl RenderSurface for HeadlessSurface {
    fn create_overlay(&mut self, content: &OverlayContent) -> OverlayHandle {
        let handle = OverlayHandle(self.next());
        self.overlays.insert(
            handle,
            HeadlessOverlay {
                content: content.clone(),
                attached: false,
                position: None,
            },
        );
        self.counters.created += 1;
        handle
    }

    fn release_overlay(&mut self, handle: OverlayHandle) {
        if self.overlays.remove(&handle).is_some() {
            self.unstack(handle);
            self.counters.released += 1;
        } else {
            warn!(handle = handle.0, "release of unknown overlay");
        }
    }

    fn attach(&mut self, handle: OverlayHandle) {
        if let Some(o) = self.live(handle, "attach") {
            o.attached = true;
            self.counters.attached += 1;
            self.unstack(handle);
            self.stack.push(handle);
        }
    }

    fn detach(&mut self, handle: OverlayHandle) {
        if let Some(o) = self.live(handle, "detach") {
            o.attached = false;
            self.counters.detached += 1;
            self.unstack(handle);
        }
    }

    fn set_position(&mut self, handle: OverlayHandle, point: ScreenPoint) {
        if let Some(o) = self.live(handle, "set_position") {
            o.position = Some(point);
            self.counters.position_writes += 1;
        }
    }

    fn set_border_color(&mut self, handle: OverlayHandle, color: Rgba) {
        if let Some(o) = self.live(handle, "set_border_color") {
            o.content.border_color = color;
            self.counters.border_writes += 1;
        }
    }

    fn set_image(&mut self, handle: OverlayHandle, url: Option<&str>) {
        if let Some(o) = self.live(handle, "set_image") {
            o.content.image_url = url.map(str::to_string);
            self.counters.image_writes += 1;
        }
    }

    fn set_label(&mut self, handle: OverlayHandle, text: &str) {
        if let Some(o) = self.live(handle, "set_label") {
            o.content.label = text.to_string();
            self.counters.label_writes += 1;
        }
    }

    fn bring_to_front(&mut self, handle: OverlayHandle) {
        let Some(attached) = self.live(handle, "bring_to_front").map(|o| o.attached) else {
            return;
        };
        self.counters.raised += 1;
        if attached {
            self.unstack(handle);
            self.stack.push(handle);
        }
    }
}

impl FrameHost for HeadlessSurface {
    fn request_frame(&mut self) -> FrameRequestId {
        let id = FrameRequestId(self.next());
        self.pending_frames.insert(id);
        self.counters.frames_requested += 1;
        id
    }

    fn cancel_frame(&mut self, id: FrameRequestId) {
        if self.pending_frames.remove(&id) {
            self.counters.frames_canceled += 1;
        }
    }
}

fn wrap_lng(lng: f64) -> f64 {
    (lng + 180.0).rem_euclid(360.0) - 180.0
}
