use std::{cmp::Ordering, sync::Arc};

use ahash::{AHashMap, AHashSet};

use crate::{store::StoreSnapshot, types::{Scope, ALL}};

/// Selectable district / subdistrict / block names, derived from a store snapshot.
///
/// Holds no state of its own beyond what it derived: rebuild it from every
/// new snapshot rather than patching it.
#[derive(Debug, Clone, Default)]
pub struct AdministrativeIndex {
    generation: u64,
    districts: Vec<Arc<str>>,
    subdistricts: AHashMap<Arc<str>, Vec<Arc<str>>>,
    blocks: AHashMap<Arc<str>, AHashMap<Arc<str>, Vec<Arc<str>>>>,
}

/// Locale-style ordering: case-insensitive first, exact string as tiebreak.
pub fn collate(a: &str, b: &str) -> Ordering {
    a.to_lowercase().cmp(&b.to_lowercase()).then_with(|| a.cmp(b))
}

fn sorted(set: AHashSet<Arc<str>>) -> Vec<Arc<str>> {
    let mut names: Vec<Arc<str>> = set.into_iter().collect();
    // Same order as `collate`, lowercasing each name once.
    names.sort_by_cached_key(|n| (n.to_lowercase(), n.clone()));
    names
}

/// Blank names and the reserved "all" token are never selectable values.
#[inline]
fn selectable(name: Option<&Arc<str>>) -> Option<&Arc<str>> {
    name.filter(|n| !n.trim().is_empty() && &***n != ALL)
}

impl AdministrativeIndex {
    /// Derive the index from every feature of every collection in `snapshot`.
    pub fn from_snapshot(snapshot: &StoreSnapshot) -> Self {
        // Dedup by exact string match before sorting.
        let mut districts: AHashSet<Arc<str>> = AHashSet::new();
        let mut subdistricts: AHashMap<Arc<str>, AHashSet<Arc<str>>> = AHashMap::new();
        let mut blocks: AHashMap<Arc<str>, AHashMap<Arc<str>, AHashSet<Arc<str>>>> = AHashMap::new();

        for feature in snapshot.all_features() {
            let attrs = &feature.attributes;
            let Some(district) = selectable(attrs.district.as_ref()) else { continue };
            districts.insert(district.clone());

            let Some(subdistrict) = selectable(attrs.subdistrict.as_ref()) else { continue };
            subdistricts.entry(district.clone()).or_default().insert(subdistrict.clone());

            let Some(block) = selectable(attrs.block.as_ref()) else { continue };
            blocks.entry(district.clone()).or_default()
                .entry(subdistrict.clone()).or_default()
                .insert(block.clone());
        }

        Self {
            generation: snapshot.generation(),
            districts: sorted(districts),
            subdistricts: subdistricts.into_iter().map(|(d, s)| (d, sorted(s))).collect(),
            blocks: blocks.into_iter()
                .map(|(d, subs)| (d, subs.into_iter().map(|(s, b)| (s, sorted(b))).collect()))
                .collect(),
        }
    }

    /// Generation of the snapshot this index was derived from.
    #[inline] pub fn generation(&self) -> u64 { self.generation }

    /// Every district present, sorted.
    #[inline] pub fn districts(&self) -> &[Arc<str>] { &self.districts }

    /// Subdistricts of `district`, sorted; empty if `district` is "all" or unknown.
    pub fn subdistricts(&self, district: &Scope) -> &[Arc<str>] {
        district.name()
            .and_then(|d| self.subdistricts.get(d))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Blocks of `subdistrict` within `district`, sorted; empty unless both are concrete.
    pub fn blocks(&self, district: &Scope, subdistrict: &Scope) -> &[Arc<str>] {
        match (district.name(), subdistrict.name()) {
            (Some(d), Some(s)) => self.blocks.get(d)
                .and_then(|subs| subs.get(s))
                .map(Vec::as_slice)
                .unwrap_or(&[]),
            _ => &[],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Category, Feature};
    use geo::Point;

    fn feature(id: &str, d: Option<&str>, s: Option<&str>, b: Option<&str>) -> Feature {
        Feature::new(id, Category::CollectionPoint, Point::new(0.0, 0.0)).with_admin(d, s, b)
    }

    fn names(list: &[Arc<str>]) -> Vec<&str> { list.iter().map(|s| &**s).collect() }

    #[test]
    fn three_feature_scenario() {
        let snap = StoreSnapshot::from_collections([("facilities", vec![
            feature("1", Some("A"), Some("x"), None),
            feature("2", Some("A"), Some("y"), None),
            feature("3", Some("B"), Some("z"), None),
        ])]);
        let index = AdministrativeIndex::from_snapshot(&snap);
        assert_eq!(names(index.districts()), vec!["A", "B"]);
        assert_eq!(names(index.subdistricts(&Scope::only("A"))), vec!["x", "y"]);
        assert_eq!(names(index.subdistricts(&Scope::only("B"))), vec!["z"]);
    }

    #[test]
    fn all_and_unknown_parents_yield_empty_lists() {
        let snap = StoreSnapshot::from_collections([("f", vec![feature("1", Some("A"), Some("x"), Some("RT 01"))])]);
        let index = AdministrativeIndex::from_snapshot(&snap);
        assert!(index.subdistricts(&Scope::All).is_empty());
        assert!(index.subdistricts(&Scope::only("C")).is_empty());
        assert!(index.blocks(&Scope::only("A"), &Scope::All).is_empty());
        assert!(index.blocks(&Scope::All, &Scope::only("x")).is_empty());
        assert_eq!(names(index.blocks(&Scope::only("A"), &Scope::only("x"))), vec!["RT 01"]);
    }

    #[test]
    fn merges_across_collections_and_deduplicates() {
        let snap = StoreSnapshot::from_collections([
            ("banks", vec![feature("1", Some("Tembalang"), Some("Bulusan"), None)]),
            ("tps", vec![
                feature("1", Some("Tembalang"), Some("Bulusan"), None),
                feature("2", Some("banyumanik"), None, None),
                feature("3", Some("Banyumanik"), None, None),
            ]),
        ]);
        let index = AdministrativeIndex::from_snapshot(&snap);
        assert_eq!(names(index.districts()), vec!["Banyumanik", "banyumanik", "Tembalang"]);
        assert_eq!(names(index.subdistricts(&Scope::only("Tembalang"))), vec!["Bulusan"]);
    }

    #[test]
    fn never_lists_all_or_blank_names() {
        let snap = StoreSnapshot::from_collections([("f", vec![
            feature("1", Some("all"), Some("x"), None),
            feature("2", Some("A"), Some("all"), None),
            feature("3", Some("A"), Some(" "), None),
            feature("4", None, Some("orphan"), Some("RT 1")),
        ])]);
        let index = AdministrativeIndex::from_snapshot(&snap);
        assert_eq!(names(index.districts()), vec!["A"]);
        assert!(index.subdistricts(&Scope::only("A")).is_empty());
    }

    #[test]
    fn case_insensitive_ordering() {
        assert_eq!(collate("alpha", "Beta"), Ordering::Less);
        assert_eq!(collate("Beta", "alpha"), Ordering::Greater);
        assert_eq!(collate("A", "a"), Ordering::Less);
    }

    #[test]
    fn sorted_names_follow_collate() {
        let set: AHashSet<Arc<str>> = ["beta", "Alpha", "alpha", "Gamma", "BETA"].into_iter().map(Arc::from).collect();
        let names = sorted(set);
        assert!(names.windows(2).all(|w| collate(&w[0], &w[1]) == Ordering::Less));
        assert_eq!(names.iter().map(|s| &**s).collect::<Vec<_>>(), vec!["Alpha", "alpha", "BETA", "beta", "Gamma"]);
    }
}
