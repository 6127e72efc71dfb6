//! IO module for source retrieval and GeoJSON reading/writing.
//!
//! - `source` - source descriptors and the fetchers that retrieve raw documents
//! - `geojson` - FeatureCollection parsing into typed features, and export back to GeoJSON

pub(crate) mod geojson;
pub(crate) mod source;

pub use geojson::{features_to_geojson, geometry_to_geojson, FeatureReader};
pub use source::{DefaultFetcher, SourceDescriptor, SourceFetcher, SourceLocation};
