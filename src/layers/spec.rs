use std::sync::Arc;

use geo::Point;
use serde::{Deserialize, Serialize};

use crate::{
    analysis::{Circle, IntensityPoint},
    config::HeatmapConfig,
    layers::Rgb,
    types::Feature,
};

/// A named tile source template, e.g. `https://tile.example.org/{z}/{x}/{y}.png`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BasemapSource {
    pub id: String,
    pub url_template: String,
    #[serde(default)]
    pub attribution: String,
    #[serde(default = "default_max_zoom")]
    pub max_zoom: u8,
}

fn default_max_zoom() -> u8 { 19 }

impl BasemapSource {
    pub fn new(id: impl Into<String>, url_template: impl Into<String>, attribution: impl Into<String>) -> Self {
        Self { id: id.into(), url_template: url_template.into(), attribution: attribution.into(), max_zoom: default_max_zoom() }
    }
}

/// Renderer-native coordinate, latitude first.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

impl LatLng {
    #[inline] pub fn is_finite(&self) -> bool { self.lat.is_finite() && self.lng.is_finite() }
}

impl From<Point<f64>> for LatLng {
    /// Point is (x = lon, y = lat).
    #[inline]
    fn from(p: Point<f64>) -> Self { LatLng { lat: p.y(), lng: p.x() } }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LayerStyle {
    pub color: Option<Rgb>, // None: per-category color
    pub opacity: f64,
}

impl Default for LayerStyle {
    fn default() -> Self { Self { color: None, opacity: 1.0 } }
}

/// What a layer draws.
#[derive(Debug, Clone)]
pub enum LayerContent {
    Features(Arc<[Feature]>),
    Circles(Arc<[Circle]>),
    Heat { points: Arc<[IntensityPoint]>, scale: HeatmapConfig },
}

impl LayerContent {
    pub fn len(&self) -> usize {
        match self {
            LayerContent::Features(fs) => fs.len(),
            LayerContent::Circles(cs) => cs.len(),
            LayerContent::Heat { points, .. } => points.len(),
        }
    }

    pub fn is_empty(&self) -> bool { self.len() == 0 }
}

/// A thematic layer known to the compositor.
#[derive(Debug, Clone)]
pub struct LayerSpec {
    pub id: Arc<str>,
    pub content: LayerContent,
    pub style: LayerStyle,
}

impl LayerSpec {
    pub fn new(id: impl Into<Arc<str>>, content: LayerContent) -> Self {
        Self { id: id.into(), content, style: LayerStyle::default() }
    }

    pub fn features(id: impl Into<Arc<str>>, features: impl Into<Arc<[Feature]>>) -> Self {
        Self::new(id, LayerContent::Features(features.into()))
    }

    pub fn with_style(mut self, style: LayerStyle) -> Self {
        self.style = style;
        self
    }
}
