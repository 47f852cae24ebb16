use std::collections::BTreeMap;

use geo::BoundingRect;
use geo_types::{coord, LineString, MultiLineString, Rect};
use sikap_lib::location_fix::{Coordinate, LocationFix};

use crate::{navigation::{RoutePolyline, SearchResult}, SikapConfig};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct OverlayId(u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverlayStyle {
    /// The walked route.
    Tracked,
    /// A route suggested by the directions provider.
    Directions,
}

impl OverlayStyle {
    pub fn color(&self) -> &'static str {
        match self {
            OverlayStyle::Tracked => "rgb(0, 255, 255)",
            OverlayStyle::Directions => "rgb(41, 138, 67)",
        }
    }

    pub fn line_width(&self) -> f64 {
        match self {
            OverlayStyle::Tracked => 5.,
            OverlayStyle::Directions => 3.,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Span {
    Meters(f64),
    Degrees(f64),
}

/// A square viewport around a center.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Region {
    pub center: Coordinate,
    pub span: Span,
}

/// A lat/lon box, x is longitude and y is latitude.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds(pub Rect<f64>);

impl Bounds {
    pub fn of(line: &LineString<f64>) -> Option<Self> {
        line.bounding_rect().map(Bounds)
    }

    pub fn union(&self, other: &Bounds) -> Bounds {
        let (a, b) = (self.0, other.0);
        Bounds(Rect::new(
            coord! { x: a.min().x.min(b.min().x), y: a.min().y.min(b.min().y) },
            coord! { x: a.max().x.max(b.max().x), y: a.max().y.max(b.max().y) },
        ))
    }
}

/// A titled pin on the map.
#[derive(Debug, Clone, PartialEq)]
pub struct Annotation {
    pub coordinate: Coordinate,
    pub title: String,
}

/// The platform map surface.
pub trait MapView: Send {
    fn add_overlay(&mut self, id: OverlayId, line: &LineString<f64>, style: OverlayStyle);

    fn remove_overlay(&mut self, id: OverlayId);

    fn add_annotation(&mut self, annotation: Annotation);

    fn remove_annotations(&mut self);

    fn set_region(&mut self, region: Region);

    fn set_visible_bounds(&mut self, bounds: Bounds);
}

/// Keeps the route overlays on a map and moves its viewport.
///
/// Tracked segments accumulate for the whole session. Direction overlays come
/// and go with searches.
pub struct RouteRenderer<M: MapView> {
    map: M,
    next_id: u64,
    tracked: Vec<(OverlayId, LineString<f64>)>,
    directions: Vec<OverlayId>,
    search_span_degrees: f64,
    world_span_meters: f64,
}

impl<M: MapView> RouteRenderer<M> {
    pub fn new(map: M, config: &SikapConfig) -> Self {
        Self {
            map,
            next_id: 0,
            tracked: Vec::new(),
            directions: Vec::new(),
            search_span_degrees: config.search_span_degrees,
            world_span_meters: config.world_span_meters,
        }
    }

    pub fn map(&self) -> &M {
        &self.map
    }

    pub fn tracked_segments(&self) -> usize {
        self.tracked.len()
    }

    pub fn direction_overlays(&self) -> usize {
        self.directions.len()
    }

    fn next_overlay_id(&mut self) -> OverlayId {
        self.next_id += 1;
        OverlayId(self.next_id)
    }

    pub fn add_segment(&mut self, from: &LocationFix, to: &LocationFix) {
        let line: LineString<f64> = vec![from.coordinate, to.coordinate]
            .into_iter()
            .map(|c| coord! { x: c.longitude, y: c.latitude })
            .collect();

        let id = self.next_overlay_id();
        self.map.add_overlay(id, &line, OverlayStyle::Tracked);
        self.tracked.push((id, line));
    }

    pub fn recenter(&mut self, coordinate: Coordinate, span_meters: f64) {
        self.map.set_region(Region { center: coordinate, span: Span::Meters(span_meters) });
    }

    /// Removes every overlay and annotation.
    pub fn clear(&mut self) {
        for (id, _) in self.tracked.drain(..) {
            self.map.remove_overlay(id);
        }
        self.clear_directions();
    }

    pub fn clear_directions(&mut self) {
        for id in self.directions.drain(..) {
            self.map.remove_overlay(id);
        }
        self.map.remove_annotations();
    }

    /// Draws each route and fits the viewport around all of them.
    pub fn render_directions(&mut self, routes: &[RoutePolyline]) {
        let mut bounds: Option<Bounds> = None;
        for route in routes {
            let id = self.next_overlay_id();
            self.map.add_overlay(id, route, OverlayStyle::Directions);
            self.directions.push(id);

            if let Some(route_bounds) = Bounds::of(route) {
                bounds = Some(match bounds {
                    Some(bounds) => bounds.union(&route_bounds),
                    None => route_bounds,
                });
            }
        }

        if let Some(bounds) = bounds {
            self.map.set_visible_bounds(bounds);
        }
    }

    /// Pins the result. Shows the place's own extent when the provider knows
    /// it, otherwise a fixed span around the pin.
    pub fn show_search_result(&mut self, result: &SearchResult, title: &str) {
        self.map.add_annotation(Annotation { coordinate: result.center, title: title.to_string() });
        match result.bounds {
            Some(bounds) => self.map.set_visible_bounds(bounds),
            None => self.map.set_region(Region { center: result.center, span: Span::Degrees(self.search_span_degrees) }),
        }
    }

    /// Shows the whole walked route. Does nothing before the first segment.
    pub fn fit_tracked_route(&mut self) {
        let lines = MultiLineString::new(self.tracked.iter().map(|(_, line)| line.clone()).collect());
        if let Some(rect) = lines.bounding_rect() {
            self.map.set_visible_bounds(Bounds(rect));
        }
    }

    pub fn zoom_out(&mut self) {
        self.map.set_region(Region {
            center: Coordinate::new(0., 0.),
            span: Span::Meters(self.world_span_meters),
        });
    }
}

/// A map without a screen. Keeps what would be drawn so it can be inspected.
#[derive(Debug, Default)]
pub struct HeadlessMap {
    pub overlays: BTreeMap<OverlayId, (LineString<f64>, OverlayStyle)>,
    pub annotations: Vec<Annotation>,
    pub region: Option<Region>,
    pub visible_bounds: Option<Bounds>,
}

impl HeadlessMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn overlays_with_style(&self, style: OverlayStyle) -> usize {
        self.overlays.values().filter(|(_, s)| *s == style).count()
    }
}

impl MapView for HeadlessMap {
    fn add_overlay(&mut self, id: OverlayId, line: &LineString<f64>, style: OverlayStyle) {
        tracing::trace!("Overlay {:?} added with {} points", id, line.0.len());
        self.overlays.insert(id, (line.clone(), style));
    }

    fn remove_overlay(&mut self, id: OverlayId) {
        self.overlays.remove(&id);
    }

    fn add_annotation(&mut self, annotation: Annotation) {
        tracing::debug!("Annotation {:?} at {:?}", annotation.title, annotation.coordinate);
        self.annotations.push(annotation);
    }

    fn remove_annotations(&mut self) {
        self.annotations.clear();
    }

    fn set_region(&mut self, region: Region) {
        tracing::trace!("Region set to {:?}", region);
        self.region = Some(region);
        self.visible_bounds = None;
    }

    fn set_visible_bounds(&mut self, bounds: Bounds) {
        tracing::trace!("Visible bounds set to {:?}", bounds);
        self.visible_bounds = Some(bounds);
        self.region = None;
    }
}
