#![doc = "Wastemap public API: geospatial data-and-layer engine for waste-management map views"]
mod admin;
mod analysis;
mod config;
mod error;
mod geom;
mod io;
mod layers;
mod session;
mod stats;
mod store;
mod types;

#[doc(inline)]
pub use types::{Attributes, Category, Feature, Role, Scope, ALL};

#[doc(inline)]
pub use config::{AttributeKeys, CoverageConfig, CoverageCurve, EngineConfig, HeatmapConfig};

#[doc(inline)]
pub use error::{AdminLevel, InvalidSelectionTransition, LayerDrawFailure, RenderError, SourceFetchError};

#[doc(inline)]
pub use io::{features_to_geojson, geometry_to_geojson, DefaultFetcher, FeatureReader, SourceDescriptor, SourceFetcher, SourceLocation};

#[doc(inline)]
pub use store::{FeatureStore, LoadOptions, LoadOutcome, StoreSnapshot, StoreState};

#[doc(inline)]
pub use admin::{collate, AdministrativeFilterController, AdministrativeIndex, AdministrativeSelection, TransitionOutcome};

#[doc(inline)]
pub use stats::{AggregateStats, FacilityAggregator};

#[doc(inline)]
pub use layers::{
    category_color, heat_color, BasemapSource, DrawReport, GeoJsonRenderer, LatLng, LayerCompositor, LayerContent,
    LayerSpec, LayerStyle, MapRenderer, PrimitiveId, Rgb, Shape, ToggleOutcome,
};

#[doc(inline)]
pub use analysis::{
    Circle, CoverageAnalyzer, CoverageResult, DemandPoint, FacilitySites, Frame, HeatmapAggregator, IntensityPoint,
    MeasuredCoverage, Observation, Visual,
};

#[doc(inline)]
pub use geom::{circle_polygon, destination, features_in_bounds, haversine_m, FeatureIndex};

#[doc(inline)]
pub use session::{MapSession, COVERAGE_LAYER, HEATMAP_LAYER};
