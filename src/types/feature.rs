use std::{collections::BTreeMap, sync::Arc};

use chrono::{DateTime, Utc};
use geo::{Centroid, Geometry, Point};
use serde_json::{Map, Value};

use super::category::Category;

/// Optional, typed view of a feature's properties.
/// Source quality varies, so every field may be absent.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Attributes {
    pub district: Option<Arc<str>>,     // Kecamatan
    pub subdistrict: Option<Arc<str>>,  // Kelurahan
    pub block: Option<Arc<str>>,        // RT
    pub name: Option<Arc<str>>,         // Display name
    pub capacity: Option<f64>,
    pub usage: Option<f64>,
    pub composition: BTreeMap<String, f64>, // waste type -> share or mass
    pub timestamp: Option<DateTime<Utc>>,
    pub volume: Option<f64>,
    pub properties: Map<String, Value>, // Raw property bag, untouched
}

/// A single geospatial record.
/// Coordinates are always x = longitude, y = latitude.
#[derive(Debug, Clone, PartialEq)]
pub struct Feature {
    pub id: Arc<str>,
    pub category: Category,
    pub geometry: Geometry<f64>,
    pub attributes: Attributes,
}

impl Feature {
    pub fn new(id: impl Into<Arc<str>>, category: Category, geometry: impl Into<Geometry<f64>>) -> Self {
        Self { id: id.into(), category, geometry: geometry.into(), attributes: Attributes::default() }
    }

    /// Builder-style setter for the administrative attributes.
    pub fn with_admin(mut self, district: Option<&str>, subdistrict: Option<&str>, block: Option<&str>) -> Self {
        self.attributes.district = district.map(Arc::from);
        self.attributes.subdistrict = subdistrict.map(Arc::from);
        self.attributes.block = block.map(Arc::from);
        self
    }

    #[inline] pub fn district(&self) -> Option<&str> { self.attributes.district.as_deref() }

    #[inline] pub fn subdistrict(&self) -> Option<&str> { self.attributes.subdistrict.as_deref() }

    #[inline] pub fn block(&self) -> Option<&str> { self.attributes.block.as_deref() }

    /// Display name, falling back to the feature id.
    #[inline]
    pub fn label(&self) -> &str {
        self.attributes.name.as_deref().unwrap_or(&self.id)
    }

    /// Representative point (lon, lat): the point itself, or the centroid otherwise.
    pub fn anchor(&self) -> Option<Point<f64>> {
        match &self.geometry {
            Geometry::Point(p) => Some(*p),
            other => other.centroid(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::polygon;

    #[test]
    fn anchor_of_point_is_the_point() {
        let f = Feature::new("a", Category::WasteBank, Point::new(110.4, -7.0));
        assert_eq!(f.anchor(), Some(Point::new(110.4, -7.0)));
    }

    #[test]
    fn anchor_of_polygon_is_centroid() {
        let poly = polygon![(x: 0.0, y: 0.0), (x: 2.0, y: 0.0), (x: 2.0, y: 2.0), (x: 0.0, y: 2.0)];
        let f = Feature::new("b", Category::AdministrativeBoundary, poly);
        assert_eq!(f.anchor(), Some(Point::new(1.0, 1.0)));
    }

    #[test]
    fn label_falls_back_to_id() {
        let mut f = Feature::new("tps-7", Category::CollectionPoint, Point::new(0.0, 0.0));
        assert_eq!(f.label(), "tps-7");
        f.attributes.name = Some(Arc::from("TPS Pasar"));
        assert_eq!(f.label(), "TPS Pasar");
    }
}
