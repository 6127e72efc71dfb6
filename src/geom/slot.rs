use geo::{Point, Rect};
use rstar::{RTreeObject, AABB};

/// Position of an item in its source slice, stored in an R-tree under its lon/lat envelope.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Slot {
    pub(crate) idx: usize,
    envelope: AABB<[f64; 2]>,
}

impl Slot {
    /// `None` unless every corner is finite.
    pub(crate) fn from_rect(idx: usize, rect: Rect<f64>) -> Option<Self> {
        let (min, max) = (rect.min(), rect.max());
        [min.x, min.y, max.x, max.y].iter().all(|v| v.is_finite())
            .then(|| Self { idx, envelope: AABB::from_corners([min.x, min.y], [max.x, max.y]) })
    }

    pub(crate) fn from_point(idx: usize, point: Point<f64>) -> Option<Self> {
        Self::from_rect(idx, Rect::new(point.0, point.0))
    }
}

impl RTreeObject for Slot {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope { self.envelope }
}
