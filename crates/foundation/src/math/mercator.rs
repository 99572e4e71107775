use std::f64::consts::PI;

use crate::geo::LatLng;
use crate::screen::ScreenPoint;

/// Edge length of one Web-Mercator tile at zoom 0.
pub const TILE_SIZE_PX: f64 = 256.0;
/// Latitude limit of the square Web-Mercator world.
pub const MAX_MERCATOR_LAT: f64 = 85.051_128_779_806_59;

/// Width (and height) of the whole world in pixels at `zoom`.
pub fn world_size_px(zoom: f64) -> f64 {
    TILE_SIZE_PX * 2f64.powf(zoom)
}

/// Projects a position to absolute world pixels at `zoom`.
pub fn project_world_px(p: LatLng, zoom: f64) -> ScreenPoint {
    let size = world_size_px(zoom);
    let lat = p.lat.clamp(-MAX_MERCATOR_LAT, MAX_MERCATOR_LAT).to_radians();
    let x = (p.lng + 180.0) / 360.0;
    let y = (1.0 - (lat.tan() + 1.0 / lat.cos()).ln() / PI) / 2.0;
    ScreenPoint::new(x * size, y * size)
}

/// Inverse of [`project_world_px`].
pub fn unproject_world_px(px: ScreenPoint, zoom: f64) -> LatLng {
    let size = world_size_px(zoom);
    let x = px.x / size;
    let y = px.y / size;
    let lng = x * 360.0 - 180.0;
    let lat = (PI * (1.0 - 2.0 * y)).sinh().atan().to_degrees();
    LatLng::new(lat, lng)
}
