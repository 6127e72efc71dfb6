//! Thematic layers, basemaps and the compositor that owns the renderer.
//!
//! - `spec` - layer and basemap descriptions
//! - `renderer` - the `MapRenderer` seam and its primitive shapes
//! - `compositor` - active-layer / basemap state over a renderer
//! - `geojson_renderer` - headless renderer exporting GeoJSON
//! - `color` - marker and heat colors

mod color;
mod compositor;
mod geojson_renderer;
mod renderer;
mod spec;

pub use color::{category_color, heat_color, Rgb};
pub use compositor::{DrawReport, LayerCompositor, ToggleOutcome};
pub use geojson_renderer::{GeoJsonRenderer, PrimitiveId};
pub use renderer::{MapRenderer, Shape};
pub use spec::{BasemapSource, LatLng, LayerContent, LayerSpec, LayerStyle};
