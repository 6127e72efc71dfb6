use std::{collections::{BTreeMap, HashMap}, sync::Arc};

use anyhow::{anyhow, bail, Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use geo::{Coord, Geometry, LineString, MultiPoint, MultiPolygon, Point, Polygon};
use serde_json::{json, Map, Value};
use tracing::warn;

use crate::{config::AttributeKeys, types::{Attributes, Category, Feature}};

/// Parses GeoJSON FeatureCollections into typed features.
#[derive(Debug, Clone, Copy)]
pub struct FeatureReader<'a> {
    pub keys: &'a AttributeKeys,
    pub aliases: &'a HashMap<String, Category>,
    /// When set, every feature of the collection gets this category.
    pub default_category: Option<Category>,
}

impl<'a> FeatureReader<'a> {
    pub fn new(keys: &'a AttributeKeys, aliases: &'a HashMap<String, Category>) -> Self {
        Self { keys, aliases, default_category: None }
    }

    pub fn with_default_category(mut self, category: Option<Category>) -> Self {
        self.default_category = category;
        self
    }

    /// Read features from FeatureCollection bytes.
    /// Features with a null or unsupported geometry are skipped with a warning.
    pub fn read_bytes(&self, collection: &str, bytes: &[u8]) -> Result<Vec<Feature>> {
        let value: Value = serde_json::from_slice(bytes).context("Failed to parse GeoJSON bytes")?;
        self.read_value(collection, &value)
    }

    pub fn read_value(&self, collection: &str, value: &Value) -> Result<Vec<Feature>> {
        match value["type"].as_str() {
            Some("FeatureCollection") => {}
            Some(other) => bail!("Expected a FeatureCollection, found '{other}'"),
            None => bail!("Missing 'type' discriminator"),
        }
        let features = value["features"].as_array()
            .ok_or_else(|| anyhow!("FeatureCollection has no 'features' list"))?;

        let mut out = Vec::with_capacity(features.len());
        for (idx, feature) in features.iter().enumerate() {
            let geometry = match feature.get("geometry") {
                None | Some(Value::Null) => {
                    warn!(collection, index = idx, "skipping feature without geometry");
                    continue;
                }
                Some(g) => match parse_geometry(g).with_context(|| format!("feature #{idx}"))? {
                    Some(geometry) => geometry,
                    None => {
                        warn!(collection, index = idx, kind = ?g["type"], "skipping unsupported geometry type");
                        continue;
                    }
                },
            };

            let empty = Map::new();
            let props = feature.get("properties").and_then(Value::as_object).unwrap_or(&empty);

            let id = feature.get("id").and_then(scalar_string)
                .or_else(|| first_string(props, &self.keys.id))
                .unwrap_or_else(|| format!("{collection}-{idx}"));

            let category = match self.default_category {
                Some(category) => category,
                None => first_string(props, &self.keys.category)
                    .map(|raw| Category::resolve(&raw, self.aliases))
                    .unwrap_or(Category::Unknown),
            };

            out.push(Feature {
                id: Arc::from(id),
                category,
                geometry,
                attributes: self.attributes(props),
            });
        }
        Ok(out)
    }

    fn attributes(&self, props: &Map<String, Value>) -> Attributes {
        let k = self.keys;
        Attributes {
            district: first_string(props, &k.district).map(Arc::from),
            subdistrict: first_string(props, &k.subdistrict).map(Arc::from),
            block: first_string(props, &k.block).map(Arc::from),
            name: first_string(props, &k.name).map(Arc::from),
            capacity: first_number(props, &k.capacity),
            usage: first_number(props, &k.usage),
            composition: first_composition(props, &k.composition),
            timestamp: first_timestamp(props, &k.timestamp),
            volume: first_number(props, &k.volume),
            properties: props.clone(),
        }
    }
}

/// String form of a scalar JSON value; blank strings count as missing.
fn scalar_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.trim()).filter(|s| !s.is_empty()).map(str::to_string),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

pub(crate) fn scalar_number(value: &Value) -> Option<f64> {
    let number = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().replace(',', ".").parse::<f64>().ok(),
        _ => None,
    };
    number.filter(|v| v.is_finite())
}

fn first_string(props: &Map<String, Value>, keys: &[String]) -> Option<String> {
    keys.iter().find_map(|key| props.get(key).and_then(scalar_string))
}

pub(crate) fn first_number(props: &Map<String, Value>, keys: &[String]) -> Option<f64> {
    keys.iter().find_map(|key| props.get(key).and_then(scalar_number))
}

fn first_composition(props: &Map<String, Value>, keys: &[String]) -> BTreeMap<String, f64> {
    keys.iter()
        .find_map(|key| props.get(key).and_then(Value::as_object))
        .map(|obj| obj.iter()
            .filter_map(|(kind, v)| scalar_number(v).filter(|v| *v >= 0.0).map(|v| (kind.clone(), v)))
            .collect())
        .unwrap_or_default()
}

fn first_timestamp(props: &Map<String, Value>, keys: &[String]) -> Option<DateTime<Utc>> {
    keys.iter().find_map(|key| props.get(key).and_then(parse_timestamp))
}

/// RFC 3339 strings, plain `YYYY-MM-DD` dates (midnight UTC) or unix seconds.
pub(crate) fn parse_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::String(s) => {
            let s = s.trim();
            DateTime::parse_from_rfc3339(s).map(|t| t.with_timezone(&Utc)).ok()
                .or_else(|| NaiveDate::parse_from_str(s, "%Y-%m-%d").ok()
                    .and_then(|d| d.and_hms_opt(0, 0, 0))
                    .map(|t| t.and_utc()))
        }
        Value::Number(n) => n.as_i64().and_then(|secs| DateTime::from_timestamp(secs, 0)),
        _ => None,
    }
}

/// Parse a GeoJSON geometry object. Returns `Ok(None)` for geometry types the engine does not use.
fn parse_geometry(g: &Value) -> Result<Option<Geometry<f64>>> {
    let coords = &g["coordinates"];
    let geometry = match g["type"].as_str() {
        Some("Point") => Geometry::Point(Point(parse_coord(coords)?)),
        Some("MultiPoint") => Geometry::MultiPoint(MultiPoint(
            as_array(coords)?.iter().map(|c| parse_coord(c).map(Point)).collect::<Result<_>>()?
        )),
        Some("Polygon") => Geometry::Polygon(parse_polygon(coords)?),
        Some("MultiPolygon") => Geometry::MultiPolygon(MultiPolygon(
            as_array(coords)?.iter().map(parse_polygon).collect::<Result<_>>()?
        )),
        _ => return Ok(None),
    };
    Ok(Some(geometry))
}

fn as_array(value: &Value) -> Result<&Vec<Value>> {
    value.as_array().ok_or_else(|| anyhow!("Invalid coordinates: expected an array"))
}

/// Parse a `[lon, lat]` position. Extra dimensions are ignored.
fn parse_coord(value: &Value) -> Result<Coord<f64>> {
    let pair = as_array(value)?;
    if pair.len() < 2 { bail!("Invalid position: expected [lon, lat]") }
    let x = pair[0].as_f64().ok_or_else(|| anyhow!("Invalid coordinate: longitude must be a number"))?;
    let y = pair[1].as_f64().ok_or_else(|| anyhow!("Invalid coordinate: latitude must be a number"))?;
    Ok(Coord { x, y })
}

/// Parse polygon rings: the first is the exterior, the rest are holes.
/// An empty ring list yields an empty polygon; renderers reject it later.
fn parse_polygon(value: &Value) -> Result<Polygon<f64>> {
    let mut rings = as_array(value)?.iter().map(parse_ring).collect::<Result<Vec<_>>>()?;
    if rings.is_empty() { return Ok(Polygon::new(LineString(vec![]), vec![])) }
    let exterior = rings.remove(0);
    Ok(Polygon::new(exterior, rings))
}

fn parse_ring(value: &Value) -> Result<LineString<f64>> {
    let mut points = as_array(value)?.iter().map(parse_coord).collect::<Result<Vec<_>>>()?;

    // Ensure ring is closed (first point == last point)
    if !points.is_empty() && points[0] != points[points.len() - 1] {
        points.push(points[0]);
    }
    Ok(LineString(points))
}

/// Convert a geometry back to a GeoJSON geometry object (lon/lat order).
pub fn geometry_to_geojson(geometry: &Geometry<f64>) -> Value {
    fn ring(ls: &LineString<f64>) -> Vec<[f64; 2]> { ls.coords().map(|c| [c.x, c.y]).collect() }
    fn rings(p: &Polygon<f64>) -> Vec<Vec<[f64; 2]>> {
        std::iter::once(ring(p.exterior())).chain(p.interiors().iter().map(ring)).collect()
    }

    match geometry {
        Geometry::Point(p) => json!({ "type": "Point", "coordinates": [p.x(), p.y()] }),
        Geometry::MultiPoint(mp) => json!({
            "type": "MultiPoint",
            "coordinates": mp.0.iter().map(|p| [p.x(), p.y()]).collect::<Vec<_>>(),
        }),
        Geometry::Polygon(p) => json!({ "type": "Polygon", "coordinates": rings(p) }),
        Geometry::MultiPolygon(mp) => json!({
            "type": "MultiPolygon",
            "coordinates": mp.0.iter().map(rings).collect::<Vec<_>>(),
        }),
        Geometry::LineString(ls) => json!({ "type": "LineString", "coordinates": ring(ls) }),
        _ => Value::Null,
    }
}

/// Export features as a GeoJSON FeatureCollection.
/// Properties are the original property bag plus the resolved `category`.
pub fn features_to_geojson<'f>(features: impl IntoIterator<Item = &'f Feature>) -> Value {
    let features: Vec<Value> = features.into_iter().map(|f| {
        let mut properties = f.attributes.properties.clone();
        properties.insert("category".to_string(), json!(f.category.to_str()));
        json!({
            "type": "Feature",
            "id": &*f.id,
            "geometry": geometry_to_geojson(&f.geometry),
            "properties": properties,
        })
    }).collect();

    json!({
        "type": "FeatureCollection",
        "features": features,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, TimeZone};

    fn read(json: &str, default_category: Option<Category>) -> Result<Vec<Feature>> {
        let keys = AttributeKeys::default();
        let aliases = HashMap::new();
        FeatureReader::new(&keys, &aliases)
            .with_default_category(default_category)
            .read_bytes("facilities", json.as_bytes())
    }

    #[test]
    fn reads_points_with_typed_attributes() {
        let features = read(r#"{
            "type": "FeatureCollection",
            "features": [{
                "type": "Feature",
                "id": 7,
                "geometry": { "type": "Point", "coordinates": [110.42, -6.99] },
                "properties": {
                    "kategori": "TPS3R", "KECAMATAN": "Tembalang", "kelurahan": "Bulusan",
                    "RT": 3, "nama": "TPS3R Bulusan", "kapasitas": "12,5",
                    "komposisi": { "organik": 60, "plastik": "25", "kaca": null },
                    "tanggal": "2024-03-05"
                }
            }]
        }"#, None).unwrap();

        assert_eq!(features.len(), 1);
        let f = &features[0];
        assert_eq!(&*f.id, "7");
        assert_eq!(f.category, Category::ReduceReuseRecycle);
        assert_eq!(f.geometry, Geometry::Point(Point::new(110.42, -6.99)));
        assert_eq!(f.district(), Some("Tembalang"));
        assert_eq!(f.subdistrict(), Some("Bulusan"));
        assert_eq!(f.block(), Some("3"));
        assert_eq!(f.attributes.capacity, Some(12.5));
        assert_eq!(f.attributes.composition.len(), 2);
        assert_eq!(f.attributes.composition["plastik"], 25.0);
        let ts = f.attributes.timestamp.unwrap();
        assert_eq!((ts.year(), ts.month(), ts.day()), (2024, 3, 5));
    }

    #[test]
    fn tolerates_missing_and_null_properties() {
        let features = read(r#"{
            "type": "FeatureCollection",
            "features": [
                { "type": "Feature", "geometry": { "type": "Point", "coordinates": [1, 2] } },
                { "type": "Feature", "geometry": { "type": "Point", "coordinates": [3, 4] },
                  "properties": { "kecamatan": null, "district": "A", "name": "   " } }
            ]
        }"#, None).unwrap();

        assert_eq!(&*features[0].id, "facilities-0");
        assert_eq!(features[0].category, Category::Unknown);
        assert_eq!(features[0].district(), None);
        assert_eq!(features[1].district(), Some("A"));
        assert_eq!(features[1].attributes.name, None);
    }

    #[test]
    fn default_category_is_authoritative() {
        let features = read(r#"{
            "type": "FeatureCollection",
            "features": [{ "type": "Feature", "geometry": { "type": "Point", "coordinates": [1, 2] },
                           "properties": { "NAMOBJ": "Bank Sampah Melati" } }]
        }"#, Some(Category::WasteBank)).unwrap();
        assert_eq!(features[0].category, Category::WasteBank);
    }

    #[test]
    fn skips_null_and_unsupported_geometries() {
        let features = read(r#"{
            "type": "FeatureCollection",
            "features": [
                { "type": "Feature", "geometry": null, "properties": {} },
                { "type": "Feature", "geometry": { "type": "LineString", "coordinates": [[0,0],[1,1]] } },
                { "type": "Feature", "geometry": { "type": "Polygon", "coordinates": [[[0,0],[1,0],[1,1]]] } }
            ]
        }"#, None).unwrap();
        assert_eq!(features.len(), 1);
        let Geometry::Polygon(p) = &features[0].geometry else { panic!("expected polygon") };
        // ring got closed
        assert_eq!(p.exterior().0.len(), 4);
    }

    #[test]
    fn rejects_non_collections_and_bad_coordinates() {
        assert!(read(r#"{ "type": "Feature", "geometry": null }"#, None).is_err());
        assert!(read("not json", None).is_err());
        assert!(read(r#"{
            "type": "FeatureCollection",
            "features": [{ "type": "Feature", "geometry": { "type": "Point", "coordinates": ["a", 2] } }]
        }"#, None).is_err());
    }

    #[test]
    fn parses_timestamp_forms() {
        let t = Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap();
        assert_eq!(parse_timestamp(&json!("2024-01-02T03:04:05Z")), Some(t));
        assert_eq!(parse_timestamp(&json!(t.timestamp())), Some(t));
        assert_eq!(parse_timestamp(&json!("yesterday")), None);
    }

    #[test]
    fn export_keeps_lon_lat_order_and_category() {
        let f = Feature::new("x", Category::Composting, Point::new(110.0, -7.0));
        let doc = features_to_geojson([&f]);
        assert_eq!(doc["type"], "FeatureCollection");
        assert_eq!(doc["features"][0]["geometry"]["coordinates"], json!([110.0, -7.0]));
        assert_eq!(doc["features"][0]["properties"]["category"], "composting");
        assert_eq!(doc["features"][0]["id"], "x");
    }
}
