use crate::geo::LatLng;

/// Geographic bounding box in degrees.
///
/// `west > east` means the box crosses the antimeridian.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct GeoBounds {
    pub north: f64,
    pub south: f64,
    pub east: f64,
    pub west: f64,
}

impl GeoBounds {
    pub const fn new(north: f64, south: f64, east: f64, west: f64) -> Self {
        GeoBounds {
            north,
            south,
            east,
            west,
        }
    }

    /// Smallest box containing a single point.
    pub fn from_point(p: LatLng) -> Self {
        GeoBounds::new(p.lat, p.lat, p.lng, p.lng)
    }

    pub fn crosses_antimeridian(&self) -> bool {
        self.west > self.east
    }

    pub fn lat_span(&self) -> f64 {
        (self.north - self.south).max(0.0)
    }

    pub fn lng_span(&self) -> f64 {
        if self.crosses_antimeridian() {
            360.0 - (self.west - self.east)
        } else {
            self.east - self.west
        }
    }

    pub fn center(&self) -> LatLng {
        let lat = (self.north + self.south) * 0.5;
        let mut lng = self.west + self.lng_span() * 0.5;
        if lng > 180.0 {
            lng -= 360.0;
        }
        LatLng::new(lat, lng)
    }

    pub fn contains(&self, p: LatLng) -> bool {
        if p.lat < self.south || p.lat > self.north {
            return false;
        }
        if self.crosses_antimeridian() {
            p.lng >= self.west || p.lng <= self.east
        } else {
            p.lng >= self.west && p.lng <= self.east
        }
    }

    /// Grows the box by `ratio` of its span on every side.
    ///
    /// Latitude is clamped to the poles. Longitude saturates to the whole
    /// world once the padded span reaches 360 degrees.
    pub fn padded(&self, ratio: f64) -> Self {
        let ratio = ratio.max(0.0);
        let dlat = self.lat_span() * ratio;
        let dlng = self.lng_span() * ratio;

        let north = (self.north + dlat).min(90.0);
        let south = (self.south - dlat).max(-90.0);
        if self.lng_span() + 2.0 * dlng >= 360.0 {
            return GeoBounds::new(north, south, 180.0, -180.0);
        }
        GeoBounds::new(north, south, wrap_lng(self.east + dlng), wrap_lng(self.west - dlng))
    }

    /// Extends a non-wrapping box to include `p`.
    pub fn extend(&mut self, p: LatLng) {
        self.north = self.north.max(p.lat);
        self.south = self.south.min(p.lat);
        self.east = self.east.max(p.lng);
        self.west = self.west.min(p.lng);
    }
}

fn wrap_lng(lng: f64) -> f64 {
    if lng > 180.0 {
        lng - 360.0
    } else if lng < -180.0 {
        lng + 360.0
    } else {
        lng
    }
}

#[cfg(test)]
mod tests {
    use super::GeoBounds;
    use crate::geo::LatLng;

    #[test]
    fn contains_inclusive_edges() {
        let b = GeoBounds::new(10.0, 0.0, 10.0, 0.0);
        assert!(b.contains(LatLng::new(5.0, 5.0)));
        assert!(b.contains(LatLng::new(10.0, 0.0)));
        assert!(!b.contains(LatLng::new(10.1, 5.0)));
        assert!(!b.contains(LatLng::new(5.0, -0.1)));
    }

    #[test]
    fn antimeridian_box_contains_both_sides() {
        let b = GeoBounds::new(10.0, -10.0, -170.0, 170.0);
        assert!(b.crosses_antimeridian());
        assert_eq!(b.lng_span(), 20.0);
        assert!(b.contains(LatLng::new(0.0, 175.0)));
        assert!(b.contains(LatLng::new(0.0, -175.0)));
        assert!(!b.contains(LatLng::new(0.0, 0.0)));
    }

    #[test]
    fn padding_grows_each_side() {
        let b = GeoBounds::new(10.0, 0.0, 10.0, 0.0).padded(0.5);
        assert_eq!(b, GeoBounds::new(15.0, -5.0, 15.0, -5.0));
        assert!(b.contains(LatLng::new(-4.0, 14.0)));
    }

    #[test]
    fn padding_clamps_poles_and_saturates_longitude() {
        let b = GeoBounds::new(80.0, -80.0, 170.0, -170.0).padded(1.0);
        assert_eq!(b.north, 90.0);
        assert_eq!(b.south, -90.0);
        assert_eq!((b.west, b.east), (-180.0, 180.0));
    }

    #[test]
    fn extend_and_center() {
        let mut b = GeoBounds::from_point(LatLng::new(1.0, 1.0));
        b.extend(LatLng::new(3.0, 5.0));
        assert_eq!(b.center(), LatLng::new(2.0, 3.0));
    }
}
