//! Pure analyzers whose output is drawn by the layer compositor.
//!
//! - `coverage` - radius buffers and covered-population estimates
//! - `heatmap` - time-framed intensity buckets

mod coverage;
mod heatmap;

pub use coverage::{Circle, CoverageAnalyzer, CoverageResult, DemandPoint, FacilitySites, MeasuredCoverage};
pub use heatmap::{Frame, HeatmapAggregator, IntensityPoint, Observation, Visual};
