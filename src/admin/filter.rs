use std::sync::Arc;

use tracing::debug;

use crate::{
    error::{AdminLevel, InvalidSelectionTransition},
    store::StoreSnapshot,
    types::{Feature, Scope},
};

/// The (district, subdistrict, block) triple.
///
/// Invariant: block concrete => subdistrict concrete => district concrete.
/// Fields are private; only `AdministrativeFilterController` mutates them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct AdministrativeSelection {
    district: Scope,
    subdistrict: Scope,
    block: Scope,
}

impl AdministrativeSelection {
    #[inline] pub fn district(&self) -> &Scope { &self.district }

    #[inline] pub fn subdistrict(&self) -> &Scope { &self.subdistrict }

    #[inline] pub fn block(&self) -> &Scope { &self.block }

    /// Whether the cascade invariant holds (always true for controller-produced selections).
    pub fn is_consistent(&self) -> bool {
        (self.block.is_all() || self.subdistrict.is_concrete())
            && (self.subdistrict.is_all() || self.district.is_concrete())
    }

    /// Exact-match AND across the concrete levels.
    pub fn matches(&self, feature: &Feature) -> bool {
        self.district.admits(feature.district())
            && self.subdistrict.admits(feature.subdistrict())
            && self.block.admits(feature.block())
    }

    #[inline]
    pub fn is_unfiltered(&self) -> bool {
        self.district.is_all() && self.subdistrict.is_all() && self.block.is_all()
    }
}

/// Status of a selection change. Rejected changes are reported, never thrown.
#[must_use]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransitionOutcome {
    /// The level changed; `cascaded` is true if child levels were forced back to "all".
    Applied { cascaded: bool },
    /// The requested value was already selected.
    Unchanged,
    /// The parent level is "all"; nothing changed.
    Ignored(InvalidSelectionTransition),
}

impl TransitionOutcome {
    #[inline] pub fn is_applied(&self) -> bool { matches!(self, TransitionOutcome::Applied { .. }) }
}

/// Holds the current administrative selection and enforces the cascade.
#[derive(Debug, Clone, Default)]
pub struct AdministrativeFilterController {
    selection: AdministrativeSelection,
}

impl AdministrativeFilterController {
    pub fn new() -> Self { Self::default() }

    #[inline] pub fn selection(&self) -> &AdministrativeSelection { &self.selection }

    /// Select a district; a different district resets subdistrict and block.
    pub fn set_district(&mut self, district: impl Into<Scope>) -> TransitionOutcome {
        let district = district.into();
        if district == self.selection.district { return TransitionOutcome::Unchanged }

        let cascaded = self.selection.subdistrict.is_concrete() || self.selection.block.is_concrete();
        debug!(%district, cascaded, "district selected");
        self.selection = AdministrativeSelection { district, ..Default::default() };
        TransitionOutcome::Applied { cascaded }
    }

    /// Select a subdistrict; requires a concrete district. A different subdistrict resets block.
    pub fn set_subdistrict(&mut self, subdistrict: impl Into<Scope>) -> TransitionOutcome {
        if self.selection.district.is_all() {
            return TransitionOutcome::Ignored(InvalidSelectionTransition {
                level: AdminLevel::Subdistrict,
                parent: AdminLevel::District,
            });
        }

        let subdistrict = subdistrict.into();
        if subdistrict == self.selection.subdistrict { return TransitionOutcome::Unchanged }

        let cascaded = self.selection.block.is_concrete();
        debug!(%subdistrict, cascaded, "subdistrict selected");
        self.selection.subdistrict = subdistrict;
        self.selection.block = Scope::All;
        TransitionOutcome::Applied { cascaded }
    }

    /// Select a block; requires a concrete subdistrict.
    pub fn set_block(&mut self, block: impl Into<Scope>) -> TransitionOutcome {
        if self.selection.subdistrict.is_all() {
            return TransitionOutcome::Ignored(InvalidSelectionTransition {
                level: AdminLevel::Block,
                parent: AdminLevel::Subdistrict,
            });
        }

        let block = block.into();
        if block == self.selection.block { return TransitionOutcome::Unchanged }

        debug!(%block, "block selected");
        self.selection.block = block;
        TransitionOutcome::Applied { cascaded: false }
    }

    /// Return every level to "all".
    pub fn reset(&mut self) {
        self.selection = AdministrativeSelection::default();
    }

    /// Features of `collection` matching the current selection.
    pub fn filtered_features<'s>(&self, snapshot: &'s StoreSnapshot, collection: &str) -> Vec<&'s Feature> {
        snapshot.features_of(collection).iter()
            .filter(|f| self.selection.matches(f))
            .collect()
    }

    /// Owned variant for handing to layers; shares the snapshot's allocation when unfiltered.
    pub fn filtered_collection(&self, snapshot: &StoreSnapshot, collection: &str) -> Arc<[Feature]> {
        if self.selection.is_unfiltered() { return snapshot.shared_features_of(collection) }
        self.filtered_features(snapshot, collection).into_iter().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Category;
    use geo::Point;

    fn feature(id: &str, d: &str, s: &str, b: &str) -> Feature {
        Feature::new(id, Category::WasteBank, Point::new(0.0, 0.0)).with_admin(Some(d), Some(s), Some(b))
    }

    fn snapshot() -> StoreSnapshot {
        StoreSnapshot::from_collections([("banks", vec![
            feature("1", "A", "x", "RT 1"),
            feature("2", "A", "y", "RT 1"),
            feature("3", "B", "z", "RT 2"),
        ])])
    }

    #[test]
    fn district_change_resets_children() {
        let mut c = AdministrativeFilterController::new();
        assert_eq!(c.set_district("A"), TransitionOutcome::Applied { cascaded: false });
        assert!(c.set_subdistrict("y").is_applied());
        assert_eq!(c.set_district("B"), TransitionOutcome::Applied { cascaded: true });
        assert_eq!(c.selection().subdistrict(), &Scope::All);
        assert_eq!(c.selection().block(), &Scope::All);
    }

    #[test]
    fn same_district_keeps_children() {
        let mut c = AdministrativeFilterController::new();
        let _ = c.set_district("A");
        let _ = c.set_subdistrict("x");
        assert_eq!(c.set_district("A"), TransitionOutcome::Unchanged);
        assert_eq!(c.selection().subdistrict(), &Scope::only("x"));
    }

    #[test]
    fn child_levels_require_concrete_parent() {
        let mut c = AdministrativeFilterController::new();
        let TransitionOutcome::Ignored(err) = c.set_subdistrict("x") else { panic!("expected ignored") };
        assert_eq!(err.level, AdminLevel::Subdistrict);
        assert!(matches!(c.set_block("RT 1"), TransitionOutcome::Ignored(_)));
        assert_eq!(c.selection(), &AdministrativeSelection::default());

        let _ = c.set_district("A");
        assert!(matches!(c.set_block("RT 1"), TransitionOutcome::Ignored(_)));
    }

    #[test]
    fn selecting_all_cascades_down() {
        let mut c = AdministrativeFilterController::new();
        let _ = c.set_district("A");
        let _ = c.set_subdistrict("x");
        let _ = c.set_block("RT 1");
        assert_eq!(c.set_subdistrict(Scope::All), TransitionOutcome::Applied { cascaded: true });
        assert_eq!(c.selection().block(), &Scope::All);
        assert_eq!(c.set_district("all"), TransitionOutcome::Applied { cascaded: false });
        assert!(c.selection().is_unfiltered());
    }

    #[test]
    fn invariant_holds_over_a_call_sequence() {
        let mut c = AdministrativeFilterController::new();
        let steps: Vec<Box<dyn Fn(&mut AdministrativeFilterController) -> TransitionOutcome>> = vec![
            Box::new(|c| c.set_block("RT 1")),
            Box::new(|c| c.set_district("A")),
            Box::new(|c| c.set_block("RT 1")),
            Box::new(|c| c.set_subdistrict("x")),
            Box::new(|c| c.set_block("RT 1")),
            Box::new(|c| c.set_district("all")),
            Box::new(|c| c.set_subdistrict("y")),
            Box::new(|c| c.set_district("B")),
            Box::new(|c| c.set_subdistrict("z")),
            Box::new(|c| c.set_subdistrict("all")),
            Box::new(|c| c.set_block("RT 2")),
        ];
        for step in steps {
            let _ = step(&mut c);
            assert!(c.selection().is_consistent(), "{:?}", c.selection());
        }
    }

    #[test]
    fn reset_returns_to_all() {
        let mut c = AdministrativeFilterController::new();
        let _ = c.set_district("A");
        let _ = c.set_subdistrict("x");
        c.reset();
        assert!(c.selection().is_unfiltered());
    }

    #[test]
    fn filters_by_concrete_levels_only() {
        let snap = snapshot();
        let mut c = AdministrativeFilterController::new();
        assert_eq!(c.filtered_features(&snap, "banks").len(), 3);

        let _ = c.set_district("A");
        let ids: Vec<&str> = c.filtered_features(&snap, "banks").iter().map(|f| &*f.id).collect();
        assert_eq!(ids, vec!["1", "2"]);

        let _ = c.set_subdistrict("y");
        let _ = c.set_block("RT 1");
        assert_eq!(c.filtered_collection(&snap, "banks").len(), 1);
        assert!(c.filtered_features(&snap, "missing").is_empty());
    }
}
