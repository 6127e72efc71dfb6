use geo::BoundingRect;
use rstar::{RTree, AABB};

use crate::{geom::Slot, types::Feature};

/// R-tree over the bounding boxes of a feature slice, addressed by slice index.
#[derive(Debug, Clone)]
pub struct FeatureIndex {
    rtree: RTree<Slot>,
}

impl FeatureIndex {
    /// Index every feature with a non-empty, finite bounding box.
    pub fn new(features: &[Feature]) -> Self {
        Self {
            rtree: RTree::bulk_load(
                features.iter().enumerate()
                    .filter_map(|(i, f)| Slot::from_rect(i, f.geometry.bounding_rect()?))
                    .collect()
            ),
        }
    }

    #[inline] pub fn len(&self) -> usize { self.rtree.size() }

    #[inline] pub fn is_empty(&self) -> bool { self.len() == 0 }

    /// Indices of features whose bounding box intersects `[min_lon, min_lat, max_lon, max_lat]`, ascending.
    pub fn query(&self, bounds: [f64; 4]) -> Vec<usize> {
        let [min_lon, min_lat, max_lon, max_lat] = bounds;
        let envelope = AABB::from_corners([min_lon, min_lat], [max_lon, max_lat]);
        let mut hits: Vec<usize> = self.rtree.locate_in_envelope_intersecting(&envelope)
            .map(|slot| slot.idx)
            .collect();
        hits.sort_unstable();
        hits
    }
}

/// Features whose bounding box intersects `[min_lon, min_lat, max_lon, max_lat]`, in input order.
pub fn features_in_bounds(features: &[Feature], bounds: [f64; 4]) -> Vec<&Feature> {
    FeatureIndex::new(features).query(bounds).into_iter()
        .map(|i| &features[i])
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Category;
    use geo::{polygon, Point};

    #[test]
    fn finds_points_and_polygons_in_bounds() {
        let features = vec![
            Feature::new("in", Category::WasteBank, Point::new(110.40, -7.00)),
            Feature::new("out", Category::WasteBank, Point::new(111.00, -7.00)),
            Feature::new("overlap", Category::AdministrativeBoundary,
                polygon![(x: 110.45, y: -7.05), (x: 110.60, y: -7.05), (x: 110.60, y: -6.90), (x: 110.45, y: -6.90)]),
        ];
        let ids: Vec<&str> = features_in_bounds(&features, [110.35, -7.02, 110.50, -6.95])
            .iter().map(|f| &*f.id).collect();
        assert_eq!(ids, vec!["in", "overlap"]);
    }

    #[test]
    fn skips_non_finite_geometry() {
        let features = vec![Feature::new("nan", Category::CollectionPoint, Point::new(f64::NAN, 0.0))];
        assert!(FeatureIndex::new(&features).is_empty());
    }
}
