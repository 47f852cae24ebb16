use async_trait::async_trait;
use geo_types::{coord, LineString};
use sikap_lib::location_fix::Coordinate;

use crate::{renderer::Bounds, SikapError};

/// An ordered path as returned by the directions provider. x is longitude.
pub type RoutePolyline = LineString<f64>;

#[derive(Debug, Clone, PartialEq)]
pub struct SearchResult {
    pub center: Coordinate,
    pub bounds: Option<Bounds>,
}

impl SearchResult {
    pub fn at(center: Coordinate) -> Self {
        Self { center, bounds: None }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportType {
    Walking,
}

/// Place search and routing.
#[async_trait]
pub trait DirectionsProvider: Send + Sync {
    async fn search(&self, query: &str) -> Result<SearchResult, SikapError>;

    async fn directions(&self, from: Coordinate, to: Coordinate, transport: TransportType) -> Result<Vec<RoutePolyline>, SikapError>;
}

/// Works without a network: queries must be a `lat,lon` pair and every route
/// is a straight line.
#[derive(Debug, Clone, Default)]
pub struct OfflineDirections;

impl OfflineDirections {
    fn parse_coordinate(query: &str) -> Option<Coordinate> {
        let (lat, lon) = query.split_once(',')?;
        let coordinate = Coordinate::new(lat.trim().parse().ok()?, lon.trim().parse().ok()?);
        coordinate.is_valid().then_some(coordinate)
    }
}

#[async_trait]
impl DirectionsProvider for OfflineDirections {
    async fn search(&self, query: &str) -> Result<SearchResult, SikapError> {
        Self::parse_coordinate(query)
            .map(SearchResult::at)
            .ok_or_else(|| SikapError::SearchFailed(format!("No match for {query:?}")))
    }

    async fn directions(&self, from: Coordinate, to: Coordinate, transport: TransportType) -> Result<Vec<RoutePolyline>, SikapError> {
        if !from.is_valid() || !to.is_valid() {
            return Err(SikapError::DirectionsFailed(format!("No route from {from:?} to {to:?}")));
        }
        tracing::debug!("Straight {:?} route from {:?} to {:?}", transport, from, to);

        let line = LineString::new(vec![
            coord! { x: from.longitude, y: from.latitude },
            coord! { x: to.longitude, y: to.latitude },
        ]);
        Ok(vec![line])
    }
}
