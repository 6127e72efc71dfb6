use std::{fmt, sync::Arc};

use crate::{
    error::RenderError,
    layers::{BasemapSource, LatLng, LayerStyle, Rgb},
    types::Category,
};

/// One drawable primitive in renderer coordinates.
#[derive(Debug, Clone, PartialEq)]
pub enum Shape {
    Marker { id: Arc<str>, label: String, category: Category, at: LatLng },
    /// Polygons, each a list of rings (exterior first).
    Area { id: Arc<str>, label: String, category: Category, polygons: Vec<Vec<Vec<LatLng>>> },
    Circle { id: Arc<str>, center: LatLng, radius_m: f64 },
    Heat { at: LatLng, intensity: f64, radius_px: f64, color: Rgb },
}

/// The map surface the compositor draws on.
///
/// Handles are opaque; the compositor is the only caller and the only owner
/// of the handles it receives.
pub trait MapRenderer {
    type Handle: Clone + fmt::Debug;

    /// Add one thematic layer as a single primitive.
    fn add_layer(&mut self, layer: &str, shapes: Vec<Shape>, style: &LayerStyle) -> Result<Self::Handle, RenderError>;

    /// Add a tile layer for a basemap.
    fn add_tiles(&mut self, source: &BasemapSource) -> Result<Self::Handle, RenderError>;

    /// Remove a primitive. Removing an unknown handle is a no-op.
    fn remove(&mut self, handle: &Self::Handle);
}
