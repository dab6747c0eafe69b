use serde::{Deserialize, Serialize};

/// A device coordinate pair.
///
/// Used only for auxiliary display (stream location, distance-to-viewer);
/// never required for session correctness.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoPoint {
    #[must_use]
    pub const fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Great-circle distance to another point, in kilometers (haversine).
    #[must_use]
    pub fn distance_km(&self, other: &Self) -> f64 {
        const EARTH_RADIUS_KM: f64 = 6371.0;

        let d_lat = (other.latitude - self.latitude).to_radians();
        let d_lon = (other.longitude - self.longitude).to_radians();
        let a = (d_lat / 2.0).sin().powi(2)
            + self.latitude.to_radians().cos()
                * other.latitude.to_radians().cos()
                * (d_lon / 2.0).sin().powi(2);
        let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());
        EARTH_RADIUS_KM * c
    }
}

/// Format a distance for display: meters below 1 km, otherwise one decimal.
#[must_use]
pub fn format_distance(km: f64) -> String {
    if km < 1.0 {
        format!("{}m", (km * 1000.0).round() as i64)
    } else {
        format!("{km:.1}km")
    }
}
