use serde::{Deserialize, Serialize};

/// Geographic position in degrees (WGS84).
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

impl LatLng {
    pub const fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// True if both components are finite and inside the WGS84 degree ranges.
    pub fn is_valid(&self) -> bool {
        self.lat.is_finite()
            && self.lng.is_finite()
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.lng)
    }

    /// Arithmetic mean of a set of positions.
    ///
    /// Returns `None` for an empty input. This does not handle antimeridian
    /// wrap; callers only average points that already share a grid cell.
    pub fn centroid<I>(points: I) -> Option<Self>
    where
        I: IntoIterator<Item = LatLng>,
    {
        let mut n = 0usize;
        let mut lat = 0.0;
        let mut lng = 0.0;
        for p in points {
            lat += p.lat;
            lng += p.lng;
            n += 1;
        }
        if n == 0 {
            return None;
        }
        Some(Self::new(lat / n as f64, lng / n as f64))
    }
}

#[cfg(test)]
mod tests {
    use super::LatLng;

    #[test]
    fn validity_rejects_out_of_range_and_nan() {
        assert!(LatLng::new(45.0, -120.0).is_valid());
        assert!(LatLng::new(90.0, 180.0).is_valid());
        assert!(!LatLng::new(91.0, 0.0).is_valid());
        assert!(!LatLng::new(0.0, -180.5).is_valid());
        assert!(!LatLng::new(f64::NAN, 0.0).is_valid());
        assert!(!LatLng::new(0.0, f64::INFINITY).is_valid());
    }

    #[test]
    fn centroid_of_points() {
        let c = LatLng::centroid([LatLng::new(0.0, 0.0), LatLng::new(2.0, 4.0)]).unwrap();
        assert_eq!(c, LatLng::new(1.0, 2.0));
        assert!(LatLng::centroid(std::iter::empty()).is_none());
    }
}
