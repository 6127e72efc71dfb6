use std::sync::Arc;

use anyhow::Result;
use geo::{Geometry, Point, Polygon};
use rstar::{RTree, AABB};
use serde::Serialize;
use serde_json::{json, Value};
use tracing::debug;

use crate::{
    config::{AttributeKeys, CoverageConfig, CoverageCurve},
    geom::{circle_polygon, degree_span, haversine_m, Slot, EARTH_RADIUS_M},
    io::{geojson::first_number, geometry_to_geojson},
    types::Feature,
};

/// Service-area buffer around one facility.
#[derive(Debug, Clone, PartialEq)]
pub struct Circle {
    pub facility: Arc<str>,
    pub center: Point<f64>,
    pub radius_m: f64,
    pub polygon: Polygon<f64>, // geodesic approximation, lon/lat
}

/// A weighted location whose residents need service.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DemandPoint {
    pub location: Point<f64>,
    pub population: f64,
}

impl DemandPoint {
    /// Demand at a feature's anchor, weighted by its population attribute (1 when absent).
    pub fn from_feature(feature: &Feature, keys: &AttributeKeys) -> Option<Self> {
        let location = feature.anchor()?;
        let population = first_number(&feature.attributes.properties, &keys.population)
            .filter(|p| *p >= 0.0)
            .unwrap_or(1.0);
        Some(Self { location, population })
    }
}

/// Geometric estimate from demand points, reported next to the policy curve.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MeasuredCoverage {
    pub covered_population: f64,
    pub total_population: f64,
    pub covered_percent: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CoverageResult {
    pub radius_m: f64,          // after clamping
    pub radius_clamped: bool,   // the requested radius was out of range
    pub per_facility_buffer: Vec<Circle>,
    pub covered_percent: f64,
    pub covered_population: f64,
    pub measured: Option<MeasuredCoverage>,
}

impl CoverageResult {
    /// No facility contributed a buffer.
    #[inline] pub fn is_empty(&self) -> bool { self.per_facility_buffer.is_empty() }

    /// Summary plus the buffers as a GeoJSON FeatureCollection.
    pub fn to_json(&self) -> Value {
        let buffers: Vec<Value> = self.per_facility_buffer.iter().map(|c| json!({
            "type": "Feature",
            "id": &*c.facility,
            "geometry": geometry_to_geojson(&Geometry::Polygon(c.polygon.clone())),
            "properties": { "facility": &*c.facility, "radius_m": c.radius_m },
        })).collect();

        json!({
            "radius_m": self.radius_m,
            "radius_clamped": self.radius_clamped,
            "covered_percent": self.covered_percent,
            "covered_population": self.covered_population,
            "facilities": self.per_facility_buffer.len(),
            "measured": self.measured,
            "buffers": { "type": "FeatureCollection", "features": buffers },
        })
    }
}

/// Facility anchors in an R-tree for radius and nearest queries.
#[derive(Debug, Clone)]
pub struct FacilitySites {
    anchors: Vec<(usize, Point<f64>)>, // (index into the facility slice, anchor)
    rtree: RTree<Slot>,
}

impl FacilitySites {
    /// Index the anchors of `facilities`; features without a finite anchor are left out.
    pub fn new(facilities: &[Feature]) -> Self {
        let anchors: Vec<(usize, Point<f64>)> = facilities.iter().enumerate()
            .filter_map(|(i, f)| f.anchor().map(|p| (i, p)))
            .filter(|(_, p)| p.x().is_finite() && p.y().is_finite())
            .collect();
        let rtree = RTree::bulk_load(
            anchors.iter().enumerate()
                .filter_map(|(slot, (_, p))| Slot::from_point(slot, *p))
                .collect()
        );
        Self { anchors, rtree }
    }

    #[inline] pub fn len(&self) -> usize { self.anchors.len() }

    #[inline] pub fn is_empty(&self) -> bool { self.anchors.is_empty() }

    /// (facility index, distance in meters) of every site within `radius_m` of `point`.
    fn within(&self, point: Point<f64>, radius_m: f64) -> impl Iterator<Item = (usize, f64)> + '_ {
        let (dlon, dlat) = degree_span(point, radius_m);
        let envelope = AABB::from_corners(
            [point.x() - dlon, point.y() - dlat],
            [point.x() + dlon, point.y() + dlat],
        );
        self.rtree.locate_in_envelope_intersecting(&envelope)
            .map(move |b| {
                let (idx, site) = self.anchors[b.idx];
                (idx, haversine_m(point, site))
            })
            .filter(move |(_, d)| *d <= radius_m)
    }

    /// Whether any site lies within `radius_m` of `point`.
    pub fn covers(&self, point: Point<f64>, radius_m: f64) -> bool {
        self.within(point, radius_m).next().is_some()
    }

    /// Index and distance (meters) of the closest site to `point`.
    ///
    /// Searches a growing envelope; a hit at distance `d <= r` inside the
    /// envelope for radius `r` cannot be beaten by a site outside it.
    pub fn nearest(&self, point: Point<f64>) -> Option<(usize, f64)> {
        if self.is_empty() { return None }

        let mut radius_m = 500.0;
        while radius_m < std::f64::consts::PI * EARTH_RADIUS_M {
            let best = self.within(point, radius_m).min_by(|a, b| a.1.total_cmp(&b.1));
            if best.is_some() { return best }
            radius_m *= 4.0;
        }

        self.anchors.iter()
            .map(|(idx, site)| (*idx, haversine_m(point, *site)))
            .min_by(|a, b| a.1.total_cmp(&b.1))
    }
}

/// Radius-driven coverage estimate for a facility set.
#[derive(Debug, Clone, Default)]
pub struct CoverageAnalyzer {
    config: CoverageConfig,
    demand: Arc<[DemandPoint]>,
}

impl CoverageAnalyzer {
    /// Fails if the radius range or percent bounds are inverted or non-finite.
    pub fn new(config: CoverageConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config, demand: Arc::from(Vec::new()) })
    }

    /// Attach demand points so `analyze` also reports a measured coverage.
    pub fn with_population(mut self, demand: impl Into<Arc<[DemandPoint]>>) -> Self {
        self.demand = demand.into();
        self
    }

    #[inline] pub fn config(&self) -> &CoverageConfig { &self.config }

    /// Clamp a requested radius into the configured range. NaN maps to the minimum.
    pub fn clamp_radius(&self, radius_m: f64) -> f64 {
        if radius_m.is_nan() { return self.config.min_radius_m }
        radius_m.clamp(self.config.min_radius_m, self.config.max_radius_m)
    }

    /// Policy curve: covered percent at an (already clamped) radius, within [floor, ceiling].
    pub fn covered_percent(&self, radius_m: f64) -> f64 {
        let c = &self.config;
        let span = c.max_radius_m - c.min_radius_m;
        let t = if span <= 0.0 { 1.0 } else {
            let x = (self.clamp_radius(radius_m) - c.min_radius_m) / span;
            match c.curve {
                CoverageCurve::Linear => x,
                CoverageCurve::Saturating { rate_per_km } => {
                    let k = rate_per_km * span / 1_000.0;
                    (1.0 - (-k * x).exp()) / (1.0 - (-k).exp())
                }
            }
        };
        (c.floor_percent + (c.ceiling_percent - c.floor_percent) * t).clamp(c.floor_percent, c.ceiling_percent)
    }

    /// Per-facility buffers plus the city-wide estimate at `radius_m` (clamped, never rejected).
    ///
    /// The estimate always stays within [floor, ceiling], even for an empty
    /// facility set; `CoverageResult::is_empty` tells that case apart.
    pub fn analyze(&self, facilities: &[Feature], radius_m: f64) -> CoverageResult {
        let radius = self.clamp_radius(radius_m);
        let radius_clamped = radius != radius_m;

        let per_facility_buffer: Vec<Circle> = facilities.iter()
            .filter_map(|f| f.anchor().map(|p| (f, p)))
            .filter(|(_, p)| p.x().is_finite() && p.y().is_finite())
            .map(|(f, center)| Circle {
                facility: f.id.clone(),
                center,
                radius_m: radius,
                polygon: circle_polygon(center, radius, self.config.circle_segments),
            })
            .collect();

        let covered_percent = self.covered_percent(radius);
        let covered_population = self.config.city_population * covered_percent / 100.0;
        let measured = (!self.demand.is_empty()).then(|| self.measure(facilities, radius));

        debug!(radius, radius_clamped, facilities = per_facility_buffer.len(), covered_percent, "coverage analyzed");
        CoverageResult { radius_m: radius, radius_clamped, per_facility_buffer, covered_percent, covered_population, measured }
    }

    /// Closest facility to `point` and its distance in meters.
    pub fn nearest_facility<'f>(&self, facilities: &'f [Feature], point: Point<f64>) -> Option<(&'f Feature, f64)> {
        FacilitySites::new(facilities).nearest(point).map(|(idx, d)| (&facilities[idx], d))
    }

    fn measure(&self, facilities: &[Feature], radius_m: f64) -> MeasuredCoverage {
        let sites = FacilitySites::new(facilities);
        let (covered, total) = self.demand.iter().fold((0.0, 0.0), |(covered, total), d| {
            let hit = sites.covers(d.location, radius_m);
            (covered + if hit { d.population } else { 0.0 }, total + d.population)
        });
        MeasuredCoverage {
            covered_population: covered,
            total_population: total,
            covered_percent: if total > 0.0 { covered * 100.0 / total } else { 0.0 },
        }
    }
}
