use chrono::{DateTime, Duration, Utc};
use geo_types::Point;
use serde::{Deserialize, Serialize};

/// Mean radius of the earth in meters.
pub const EARTH_RADIUS_METERS: f64 = 6_371_008.8;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinate {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && (-90.0..=90.0).contains(&self.latitude)
            && (-180.0..=180.0).contains(&self.longitude)
    }

    /// Great circle distance in meters, using the haversine formula.
    pub fn distance_to(&self, other: &Coordinate) -> f64 {
        let d_lat = (other.latitude - self.latitude).to_radians();
        let d_lon = (other.longitude - self.longitude).to_radians();
        let lat1 = self.latitude.to_radians();
        let lat2 = other.latitude.to_radians();

        let a = f64::sin(d_lat / 2.).powi(2)
            + f64::cos(lat1) * f64::cos(lat2) * f64::sin(d_lon / 2.).powi(2);
        let c = 2. * f64::asin(f64::sqrt(a).min(1.));

        EARTH_RADIUS_METERS * c
    }
}

impl From<Point> for Coordinate {
    fn from(point: Point) -> Self {
        Self::new(point.y(), point.x())
    }
}

impl From<Coordinate> for Point {
    fn from(coordinate: Coordinate) -> Self {
        Point::new(coordinate.longitude, coordinate.latitude)
    }
}

/// A single location sample as reported by the platform.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationFix {
    pub coordinate: Coordinate,
    pub timestamp: DateTime<Utc>,
    /// Radius of uncertainty in meters. Negative means the coordinate is invalid.
    pub horizontal_accuracy: f64,
}

impl LocationFix {
    pub fn new(coordinate: Coordinate, timestamp: DateTime<Utc>, horizontal_accuracy: f64) -> Self {
        Self {
            coordinate,
            timestamp,
            horizontal_accuracy,
        }
    }

    /// How far the fix is from `now`, in either direction.
    pub fn age_at(&self, now: DateTime<Utc>) -> Duration {
        now.signed_duration_since(self.timestamp).abs()
    }

    pub fn distance_to(&self, other: &LocationFix) -> f64 {
        self.coordinate.distance_to(&other.coordinate)
    }

    /// Same position and accuracy, reported at `timestamp`.
    pub fn restamped(&self, timestamp: DateTime<Utc>) -> Self {
        Self {
            timestamp,
            ..self.clone()
        }
    }
}
