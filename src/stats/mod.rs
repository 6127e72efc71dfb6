mod aggregate;

pub use aggregate::{AggregateStats, FacilityAggregator};
