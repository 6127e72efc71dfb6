use std::collections::BTreeMap;

use serde_json::{json, Value};

use crate::{
    error::RenderError,
    layers::{category_color, BasemapSource, LatLng, LayerStyle, MapRenderer, Shape},
};

/// Opaque primitive handle issued by `GeoJsonRenderer`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PrimitiveId(u64);

#[derive(Debug, Clone)]
struct DrawnLayer {
    layer: String,
    shapes: Vec<Shape>,
    style: LayerStyle,
}

/// Headless renderer that validates primitives and exports the composed map as GeoJSON.
#[derive(Debug, Default)]
pub struct GeoJsonRenderer {
    next: u64,
    layers: BTreeMap<PrimitiveId, DrawnLayer>, // in insertion order (ids are increasing)
    tiles: BTreeMap<PrimitiveId, BasemapSource>,
}

impl GeoJsonRenderer {
    pub fn new() -> Self { Self::default() }

    /// Number of thematic primitives currently drawn.
    #[inline] pub fn layer_count(&self) -> usize { self.layers.len() }

    /// Number of tile primitives currently drawn.
    #[inline] pub fn tile_count(&self) -> usize { self.tiles.len() }

    /// Total shapes across all thematic primitives.
    pub fn shape_count(&self) -> usize { self.layers.values().map(|l| l.shapes.len()).sum() }

    fn issue(&mut self) -> PrimitiveId {
        self.next += 1;
        PrimitiveId(self.next)
    }

    /// The composed map: every drawn shape as a Feature (lon/lat order again),
    /// plus the active tile source as a foreign `basemap` member.
    pub fn to_geojson(&self) -> Value {
        let features: Vec<Value> = self.layers.values()
            .flat_map(|drawn| drawn.shapes.iter().map(move |shape| shape_to_geojson(drawn, shape)))
            .collect();

        let basemap = self.tiles.values().last().map(|b| json!({
            "id": b.id,
            "url_template": b.url_template,
            "attribution": b.attribution,
            "max_zoom": b.max_zoom,
        }));

        json!({
            "type": "FeatureCollection",
            "basemap": basemap,
            "features": features,
        })
    }
}

fn check(at: &LatLng) -> Result<(), RenderError> {
    if at.is_finite() { Ok(()) } else {
        Err(RenderError::MalformedGeometry(format!("non-finite coordinate ({}, {})", at.lat, at.lng)))
    }
}

fn validate(shape: &Shape) -> Result<(), RenderError> {
    match shape {
        Shape::Marker { at, .. } | Shape::Heat { at, .. } => check(at),
        Shape::Circle { center, radius_m, .. } => {
            check(center)?;
            if radius_m.is_finite() && *radius_m > 0.0 { Ok(()) } else {
                Err(RenderError::MalformedGeometry(format!("invalid circle radius {radius_m}")))
            }
        }
        Shape::Area { id, polygons, .. } => {
            if polygons.is_empty() { return Err(RenderError::MalformedGeometry(format!("area '{id}' has no polygons"))) }
            for rings in polygons {
                match rings.first() {
                    Some(exterior) if exterior.len() >= 4 => {}
                    _ => return Err(RenderError::MalformedGeometry(format!("area '{id}' has an empty or degenerate ring"))),
                }
                rings.iter().flatten().try_for_each(check)?;
            }
            Ok(())
        }
    }
}

fn position(at: &LatLng) -> [f64; 2] { [at.lng, at.lat] }

fn shape_to_geojson(drawn: &DrawnLayer, shape: &Shape) -> Value {
    let color = |category| drawn.style.color.unwrap_or_else(|| category_color(category)).to_hex();
    let opacity = drawn.style.opacity;

    match shape {
        Shape::Marker { id, label, category, at } => json!({
            "type": "Feature",
            "id": &**id,
            "geometry": { "type": "Point", "coordinates": position(at) },
            "properties": { "layer": drawn.layer, "kind": "marker", "label": label,
                            "category": category.to_str(), "color": color(*category), "opacity": opacity },
        }),
        Shape::Area { id, label, category, polygons } => {
            let coords: Vec<Vec<Vec<[f64; 2]>>> = polygons.iter()
                .map(|rings| rings.iter().map(|ring| ring.iter().map(position).collect()).collect())
                .collect();
            json!({
                "type": "Feature",
                "id": &**id,
                "geometry": { "type": "MultiPolygon", "coordinates": coords },
                "properties": { "layer": drawn.layer, "kind": "area", "label": label,
                                "category": category.to_str(), "color": color(*category), "opacity": opacity },
            })
        }
        Shape::Circle { id, center, radius_m } => json!({
            "type": "Feature",
            "id": &**id,
            "geometry": { "type": "Point", "coordinates": position(center) },
            "properties": { "layer": drawn.layer, "kind": "circle", "radius_m": radius_m, "opacity": opacity },
        }),
        Shape::Heat { at, intensity, radius_px, color } => json!({
            "type": "Feature",
            "geometry": { "type": "Point", "coordinates": position(at) },
            "properties": { "layer": drawn.layer, "kind": "heat", "intensity": intensity,
                            "radius_px": radius_px, "color": color.to_hex(), "opacity": opacity },
        }),
    }
}

impl MapRenderer for GeoJsonRenderer {
    type Handle = PrimitiveId;

    fn add_layer(&mut self, layer: &str, shapes: Vec<Shape>, style: &LayerStyle) -> Result<PrimitiveId, RenderError> {
        shapes.iter().try_for_each(validate)?;
        let id = self.issue();
        self.layers.insert(id, DrawnLayer { layer: layer.to_string(), shapes, style: style.clone() });
        Ok(id)
    }

    fn add_tiles(&mut self, source: &BasemapSource) -> Result<PrimitiveId, RenderError> {
        let t = &source.url_template;
        if !(t.contains("{z}") && t.contains("{x}") && t.contains("{y}")) {
            return Err(RenderError::InvalidTileSource(format!("'{}' lacks {{z}}/{{x}}/{{y}} placeholders", source.id)));
        }
        let id = self.issue();
        self.tiles.insert(id, source.clone());
        Ok(id)
    }

    fn remove(&mut self, handle: &PrimitiveId) {
        if self.layers.remove(handle).is_none() { self.tiles.remove(handle); }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Category;
    use std::sync::Arc;

    fn marker(lat: f64, lng: f64) -> Shape {
        Shape::Marker { id: Arc::from("m"), label: "M".into(), category: Category::WasteBank, at: LatLng { lat, lng } }
    }

    #[test]
    fn rejects_non_finite_and_empty_geometry() {
        let mut r = GeoJsonRenderer::new();
        let style = LayerStyle::default();
        assert!(r.add_layer("a", vec![marker(f64::NAN, 0.0)], &style).is_err());
        let empty = Shape::Area { id: Arc::from("p"), label: "P".into(), category: Category::AdministrativeBoundary, polygons: vec![vec![vec![]]] };
        assert!(matches!(r.add_layer("b", vec![empty], &style), Err(RenderError::MalformedGeometry(_))));
        assert_eq!(r.layer_count(), 0);
    }

    #[test]
    fn rejects_templates_without_placeholders() {
        let mut r = GeoJsonRenderer::new();
        let bad = BasemapSource::new("bad", "https://example.org/tile.png", "");
        assert!(matches!(r.add_tiles(&bad), Err(RenderError::InvalidTileSource(_))));
    }

    #[test]
    fn exports_in_lon_lat_order() {
        let mut r = GeoJsonRenderer::new();
        let handle = r.add_layer("tps", vec![marker(-7.0, 110.4)], &LayerStyle::default()).unwrap();
        r.add_tiles(&BasemapSource::new("osm", "https://t/{z}/{x}/{y}.png", "OSM")).unwrap();

        let doc = r.to_geojson();
        assert_eq!(doc["features"][0]["geometry"]["coordinates"], json!([110.4, -7.0]));
        assert_eq!(doc["features"][0]["properties"]["layer"], "tps");
        assert_eq!(doc["basemap"]["id"], "osm");

        r.remove(&handle);
        r.remove(&handle);
        assert_eq!(r.to_geojson()["features"], json!([]));
    }
}
