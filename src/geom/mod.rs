//! Spherical geometry helpers and R-tree spatial indexing.

mod index;
mod slot;
mod sphere;

pub(crate) use slot::Slot;
pub use index::{features_in_bounds, FeatureIndex};
pub use sphere::{circle_polygon, degree_span, destination, haversine_m, EARTH_RADIUS_M};
