use std::{collections::BTreeMap, sync::Arc};

use geo::{Coord, Geometry, LineString, Point, Polygon};
use tracing::{debug, info, warn};

use crate::{
    error::LayerDrawFailure,
    layers::{BasemapSource, LatLng, LayerContent, LayerSpec, MapRenderer, Shape},
    types::Feature,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToggleOutcome {
    Added,
    Removed,
}

/// Result of drawing several layers; failures never abort the batch.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DrawReport {
    pub drawn: Vec<Arc<str>>,
    pub failed: Vec<LayerDrawFailure>,
}

impl DrawReport {
    #[inline] pub fn is_clean(&self) -> bool { self.failed.is_empty() }
}

/// Sole owner of the renderer's layer registry.
///
/// Thematic layers and the basemap are tracked separately: basemap changes
/// never touch thematic handles and vice versa.
pub struct LayerCompositor<R: MapRenderer> {
    renderer: R,
    registry: BTreeMap<Arc<str>, LayerSpec>, // every known thematic layer
    active: Vec<(Arc<str>, R::Handle)>,      // drawn thematic layers, in draw order
    basemaps: Vec<BasemapSource>,
    basemap: Option<(String, R::Handle)>,
}

impl<R: MapRenderer> LayerCompositor<R> {
    pub fn new(renderer: R, basemaps: Vec<BasemapSource>) -> Self {
        Self { renderer, registry: BTreeMap::new(), active: Vec::new(), basemaps, basemap: None }
    }

    #[inline] pub fn renderer(&self) -> &R { &self.renderer }

    /// Active thematic layer ids, in draw order.
    pub fn current_layers(&self) -> Vec<&str> {
        self.active.iter().map(|(id, _)| &**id).collect()
    }

    #[inline]
    pub fn current_basemap(&self) -> Option<&str> {
        self.basemap.as_ref().map(|(id, _)| id.as_str())
    }

    #[inline]
    pub fn is_active(&self, id: &str) -> bool {
        self.active.iter().any(|(active, _)| &**active == id)
    }

    /// Ids of every registered layer, sorted.
    pub fn registered(&self) -> impl Iterator<Item = &str> {
        self.registry.keys().map(|id| &**id)
    }

    /// Make a layer available for toggling. Does not draw it; an already-active
    /// layer keeps its current drawing until `replace` is called.
    pub fn register(&mut self, spec: LayerSpec) {
        debug!(layer = %spec.id, items = spec.content.len(), "layer registered");
        self.registry.insert(spec.id.clone(), spec);
    }

    /// Add the layer if absent, remove it if present.
    pub fn toggle(&mut self, id: &str) -> Result<ToggleOutcome, LayerDrawFailure> {
        if self.hide(id) { return Ok(ToggleOutcome::Removed) }
        self.show(id).map(|()| ToggleOutcome::Added)
    }

    /// Draw a registered layer; a no-op if it is already active.
    pub fn show(&mut self, id: &str) -> Result<(), LayerDrawFailure> {
        if self.is_active(id) { return Ok(()) }
        let spec = self.registry.get(id)
            .ok_or_else(|| LayerDrawFailure::new(&Arc::from(id), "layer is not registered"))?;

        let handle = Self::draw(&mut self.renderer, spec)?;
        self.active.push((spec.id.clone(), handle));
        info!(layer = id, "layer added");
        Ok(())
    }

    /// Remove a layer's drawing, keeping it registered. Returns false if it was not active.
    pub fn hide(&mut self, id: &str) -> bool {
        let Some(pos) = self.active.iter().position(|(active, _)| &**active == id) else { return false };
        let (_, handle) = self.active.remove(pos);
        self.renderer.remove(&handle);
        info!(layer = id, "layer removed");
        true
    }

    /// Hide and unregister a layer. Returns false if it was unknown.
    pub fn remove(&mut self, id: &str) -> bool {
        let was_active = self.hide(id);
        self.registry.remove(id).is_some() || was_active
    }

    /// Swap a layer's content. If the layer is active it is redrawn in place;
    /// if the redraw fails the previous drawing and content stay.
    pub fn replace(&mut self, spec: LayerSpec) -> Result<(), LayerDrawFailure> {
        let Some(pos) = self.active.iter().position(|(active, _)| *active == spec.id) else {
            self.register(spec);
            return Ok(());
        };

        let handle = Self::draw(&mut self.renderer, &spec)?;
        let old = std::mem::replace(&mut self.active[pos].1, handle);
        self.renderer.remove(&old);
        debug!(layer = %spec.id, "layer redrawn");
        self.registry.insert(spec.id.clone(), spec);
        Ok(())
    }

    /// Show several layers. Each failure is reported; layers drawn before or after it stay.
    pub fn draw_batch<S: AsRef<str>>(&mut self, ids: &[S]) -> DrawReport {
        let mut report = DrawReport::default();
        for id in ids {
            match self.show(id.as_ref()) {
                Ok(()) => report.drawn.push(Arc::from(id.as_ref())),
                Err(failure) => report.failed.push(failure),
            }
        }
        report
    }

    /// Replace the basemap tile layer. Only the previous basemap primitive is removed.
    pub fn set_basemap(&mut self, id: &str) -> Result<(), LayerDrawFailure> {
        if self.current_basemap() == Some(id) { return Ok(()) }
        let source = self.basemaps.iter().find(|b| b.id == id)
            .ok_or_else(|| LayerDrawFailure::new(&Arc::from(id), "basemap is not configured"))?;

        let handle = self.renderer.add_tiles(source)
            .map_err(|e| LayerDrawFailure::new(&Arc::from(id), e.to_string()))?;
        if let Some((previous, old)) = self.basemap.replace((id.to_string(), handle)) {
            self.renderer.remove(&old);
            info!(from = %previous, to = id, "basemap swapped");
        } else {
            info!(basemap = id, "basemap set");
        }
        Ok(())
    }

    /// Release every renderer primitive this compositor owns.
    pub fn unmount(&mut self) {
        for (id, handle) in self.active.drain(..) {
            self.renderer.remove(&handle);
            debug!(layer = %id, "layer released");
        }
        if let Some((_, handle)) = self.basemap.take() {
            self.renderer.remove(&handle);
        }
    }

    fn draw(renderer: &mut R, spec: &LayerSpec) -> Result<R::Handle, LayerDrawFailure> {
        let shapes = shapes_of(&spec.content).map_err(|reason| {
            warn!(layer = %spec.id, %reason, "layer rejected");
            LayerDrawFailure::new(&spec.id, reason)
        })?;
        renderer.add_layer(&spec.id, shapes, &spec.style).map_err(|e| {
            warn!(layer = %spec.id, error = %e, "renderer rejected layer");
            LayerDrawFailure::new(&spec.id, e.to_string())
        })
    }
}

impl<R: MapRenderer> Drop for LayerCompositor<R> {
    fn drop(&mut self) { self.unmount() }
}

#[inline]
fn latlng(c: Coord<f64>) -> LatLng { Point(c).into() }

fn rings(p: &Polygon<f64>) -> Vec<Vec<LatLng>> {
    let ring = |ls: &LineString<f64>| ls.coords().map(|c| latlng(*c)).collect::<Vec<_>>();
    std::iter::once(ring(p.exterior())).chain(p.interiors().iter().map(ring)).collect()
}

/// Convert layer content to renderer shapes. This is the only place lon/lat becomes lat/lng.
fn shapes_of(content: &LayerContent) -> Result<Vec<Shape>, String> {
    match content {
        LayerContent::Features(features) => {
            let mut shapes = Vec::with_capacity(features.len());
            for feature in features.iter() {
                feature_shapes(feature, &mut shapes)?;
            }
            Ok(shapes)
        }
        LayerContent::Circles(circles) => Ok(circles.iter()
            .map(|c| Shape::Circle { id: c.facility.clone(), center: c.center.into(), radius_m: c.radius_m })
            .collect()),
        LayerContent::Heat { points, scale } => Ok(points.iter()
            .map(|p| {
                let visual = p.visual(scale);
                Shape::Heat { at: p.location.into(), intensity: p.intensity, radius_px: visual.radius_px, color: visual.color }
            })
            .collect()),
    }
}

fn feature_shapes(feature: &Feature, out: &mut Vec<Shape>) -> Result<(), String> {
    let (id, label, category) = (feature.id.clone(), feature.label().to_string(), feature.category);
    match &feature.geometry {
        Geometry::Point(p) => out.push(Shape::Marker { id, label, category, at: (*p).into() }),
        Geometry::MultiPoint(mp) => out.extend(mp.0.iter().map(|p| Shape::Marker {
            id: id.clone(), label: label.clone(), category, at: (*p).into(),
        })),
        Geometry::Polygon(p) => out.push(Shape::Area { id, label, category, polygons: vec![rings(p)] }),
        Geometry::MultiPolygon(mp) => out.push(Shape::Area {
            id, label, category, polygons: mp.0.iter().map(rings).collect(),
        }),
        _ => return Err(format!("feature '{}' has an unsupported geometry type", feature.id)),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{layers::GeoJsonRenderer, types::Category};

    fn point_layer(id: &str) -> LayerSpec {
        LayerSpec::features(id, vec![Feature::new(format!("{id}-1"), Category::WasteBank, Point::new(110.4, -7.0))])
    }

    fn compositor() -> LayerCompositor<GeoJsonRenderer> {
        let mut c = LayerCompositor::new(GeoJsonRenderer::new(), vec![
            BasemapSource::new("osm", "https://tile.openstreetmap.org/{z}/{x}/{y}.png", "OpenStreetMap"),
            BasemapSource::new("satellite", "https://tiles.example.org/sat/{z}/{x}/{y}.jpg", "Example"),
        ]);
        for id in ["tps", "banks", "compost"] { c.register(point_layer(id)) }
        c
    }

    #[test]
    fn toggle_pair_is_identity() {
        let mut c = compositor();
        c.show("tps").unwrap();
        let before: Vec<String> = c.current_layers().iter().map(|s| s.to_string()).collect();
        assert_eq!(c.toggle("banks"), Ok(ToggleOutcome::Added));
        assert_eq!(c.toggle("banks"), Ok(ToggleOutcome::Removed));
        assert_eq!(c.current_layers(), before);
        assert_eq!(c.renderer().layer_count(), 1);
    }

    #[test]
    fn show_twice_draws_once() {
        let mut c = compositor();
        c.show("tps").unwrap();
        c.show("tps").unwrap();
        assert_eq!(c.renderer().layer_count(), 1);
        assert!(c.hide("tps"));
        assert!(!c.hide("tps"));
    }

    #[test]
    fn basemap_swaps_never_touch_layers() {
        let mut c = compositor();
        let _ = c.draw_batch(&["tps", "banks"]);
        for id in ["osm", "satellite", "osm", "osm"] {
            c.set_basemap(id).unwrap();
            assert_eq!(c.current_layers(), vec!["tps", "banks"]);
            assert_eq!(c.renderer().tile_count(), 1);
        }
        assert_eq!(c.current_basemap(), Some("osm"));
        assert!(c.set_basemap("missing").is_err());
        assert_eq!(c.current_basemap(), Some("osm"));
    }

    #[test]
    fn bad_layer_is_isolated_in_batch() {
        let mut c = compositor();
        c.register(LayerSpec::features("broken", vec![
            Feature::new("nan", Category::CollectionPoint, Point::new(f64::NAN, -7.0)),
        ]));
        let report = c.draw_batch(&["tps", "broken", "banks", "unknown"]);
        assert_eq!(report.drawn.len(), 2);
        assert_eq!(report.failed.iter().map(|f| &*f.layer).collect::<Vec<_>>(), vec!["broken", "unknown"]);
        assert_eq!(c.current_layers(), vec!["tps", "banks"]);
        assert_eq!(c.renderer().layer_count(), 2);
    }

    #[test]
    fn replace_redraws_in_place_or_keeps_old_on_failure() {
        let mut c = compositor();
        let _ = c.draw_batch(&["tps", "banks"]);
        c.replace(LayerSpec::features("tps", vec![
            Feature::new("a", Category::CollectionPoint, Point::new(110.0, -7.0)),
            Feature::new("b", Category::CollectionPoint, Point::new(110.1, -7.0)),
        ])).unwrap();
        assert_eq!(c.current_layers(), vec!["tps", "banks"]);
        assert_eq!(c.renderer().shape_count(), 3);

        let bad = LayerSpec::features("tps", vec![Feature::new("x", Category::CollectionPoint, Point::new(f64::INFINITY, 0.0))]);
        assert!(c.replace(bad).is_err());
        assert_eq!(c.renderer().shape_count(), 3);
    }

    #[test]
    fn remove_unregisters() {
        let mut c = compositor();
        c.show("compost").unwrap();
        assert!(c.remove("compost"));
        assert!(!c.remove("compost"));
        assert!(c.toggle("compost").is_err());
        assert_eq!(c.renderer().layer_count(), 0);
    }

    #[test]
    fn unmount_releases_everything() {
        let mut c = compositor();
        let _ = c.draw_batch(&["tps", "banks", "compost"]);
        c.set_basemap("osm").unwrap();
        c.unmount();
        assert!(c.current_layers().is_empty());
        assert_eq!(c.current_basemap(), None);
        assert_eq!(c.renderer().layer_count() + c.renderer().tile_count(), 0);
    }

    #[test]
    fn converts_lon_lat_to_lat_lng() {
        let mut shapes = Vec::new();
        feature_shapes(&Feature::new("p", Category::WasteBank, Point::new(110.4, -7.0)), &mut shapes).unwrap();
        let Shape::Marker { at, .. } = &shapes[0] else { panic!("expected marker") };
        assert_eq!(*at, LatLng { lat: -7.0, lng: 110.4 });
    }
}
