use glam::DVec2;

/// Equatorial earth radius in metres
const EARTH_RADIUS: f64 = 6_378_137.0;

/// Pure coordinate transform from geographic to ground-plane coordinates
pub trait MapProjection: Send + Sync {
    /// Planar position in metres, x east and z north of the origin
    fn to_xz(&self, lat: f64, lon: f64) -> DVec2;

    /// Inverse of `to_xz`
    fn to_lat_lon(&self, pos: DVec2) -> (f64, f64);
}

/// Equirectangular projection around an origin; accurate for city-sized areas
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LocalProjection {
    origin_lat: f64,
    origin_lon: f64,
    lon_scale: f64,
}

impl LocalProjection {
    pub fn new(origin_lat: f64, origin_lon: f64) -> Self {
        Self {
            origin_lat,
            origin_lon,
            lon_scale: origin_lat.to_radians().cos(),
        }
    }
}

impl MapProjection for LocalProjection {
    fn to_xz(&self, lat: f64, lon: f64) -> DVec2 {
        DVec2::new(
            (lon - self.origin_lon).to_radians() * EARTH_RADIUS * self.lon_scale,
            (lat - self.origin_lat).to_radians() * EARTH_RADIUS,
        )
    }

    fn to_lat_lon(&self, pos: DVec2) -> (f64, f64) {
        let lat = self.origin_lat + (pos.y / EARTH_RADIUS).to_degrees();
        let lon = self.origin_lon + (pos.x / (EARTH_RADIUS * self.lon_scale)).to_degrees();
        (lat, lon)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_origin_maps_to_zero() {
        let p = LocalProjection::new(48.1, 11.5);
        assert!(p.to_xz(48.1, 11.5).length() < 1e-9);
    }

    #[test]
    fn test_north_is_positive_z() {
        let p = LocalProjection::new(0.0, 0.0);
        let pos = p.to_xz(0.001, 0.0);
        assert!(pos.y > 100.0 && pos.y < 120.0);
        assert!(pos.x.abs() < 1e-9);
    }

    #[test]
    fn test_inverse() {
        let p = LocalProjection::new(52.5, 13.4);
        let pos = p.to_xz(52.501, 13.402);
        let (lat, lon) = p.to_lat_lon(pos);
        assert!((lat - 52.501).abs() < 1e-9);
        assert!((lon - 13.402).abs() < 1e-9);
    }
}
