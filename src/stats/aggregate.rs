use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;
use tracing::debug;

use crate::{
    config::EngineConfig,
    store::StoreSnapshot,
    types::{Category, Feature, Role},
};

/// Summary counts derived from one snapshot.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AggregateStats {
    /// Features counted, excluding administrative boundaries and redacted categories.
    pub total: usize,
    /// Count per category; every visible category is present, `Unknown` included.
    pub by_category: BTreeMap<Category, usize>,
    /// Unique (district, subdistrict) pairs served, per configured coverage category.
    pub coverage: BTreeMap<Category, usize>,
    /// Share of each waste type in percent (sums to 100 when any composition data exists).
    pub composition: BTreeMap<String, f64>,
    pub capacity_total: f64,
    pub usage_total: f64,
    /// True if sensitive categories were left out for this role.
    pub sensitive_redacted: bool,
}

impl AggregateStats {
    /// Count for one category (0 if absent or redacted).
    #[inline]
    pub fn count(&self, category: Category) -> usize {
        self.by_category.get(&category).copied().unwrap_or(0)
    }

    /// Usage as a percentage of capacity, if any capacity is known.
    pub fn utilization_percent(&self) -> Option<f64> {
        (self.capacity_total > 0.0).then(|| self.usage_total * 100.0 / self.capacity_total)
    }
}

/// Derives `AggregateStats` from the store's current feature set.
#[derive(Debug, Clone)]
pub struct FacilityAggregator {
    coverage_categories: Vec<Category>,
}

impl FacilityAggregator {
    pub fn new(config: &EngineConfig) -> Self {
        Self { coverage_categories: config.coverage_categories.clone() }
    }

    /// Statistics over every feature of every collection in `snapshot`.
    pub fn stats(&self, snapshot: &StoreSnapshot, role: Role) -> AggregateStats {
        self.stats_of(snapshot.all_features(), role)
    }

    /// Statistics over an arbitrary feature set (e.g. a filtered subset), in a single pass.
    pub fn stats_of<'a>(&self, features: impl IntoIterator<Item = &'a Feature>, role: Role) -> AggregateStats {
        let redact = !role.can_view_sensitive();

        let mut by_category: BTreeMap<Category, usize> = Category::order().into_iter()
            .filter(|c| !(redact && c.is_sensitive()))
            .map(|c| (c, 0))
            .collect();
        let mut served: BTreeMap<Category, BTreeSet<(Option<&str>, &str)>> = self.coverage_categories.iter()
            .filter(|c| !(redact && c.is_sensitive()))
            .map(|c| (*c, BTreeSet::new()))
            .collect();
        let mut composition: BTreeMap<String, f64> = BTreeMap::new();
        let mut stats = AggregateStats { sensitive_redacted: redact, ..Default::default() };

        for feature in features {
            if redact && feature.category.is_sensitive() { continue }

            *by_category.entry(feature.category).or_default() += 1;
            if feature.category != Category::AdministrativeBoundary { stats.total += 1 }

            if let (Some(subdistricts), Some(subdistrict)) = (served.get_mut(&feature.category), feature.subdistrict()) {
                subdistricts.insert((feature.district(), subdistrict));
            }

            let attrs = &feature.attributes;
            stats.capacity_total += attrs.capacity.unwrap_or(0.0);
            stats.usage_total += attrs.usage.unwrap_or(0.0);
            for (kind, amount) in &attrs.composition {
                *composition.entry(kind.clone()).or_default() += amount;
            }
        }

        let grand: f64 = composition.values().sum();
        if grand > 0.0 {
            stats.composition = composition.into_iter().map(|(k, v)| (k, v * 100.0 / grand)).collect();
        }
        stats.coverage = served.into_iter().map(|(c, set)| (c, set.len())).collect();
        stats.by_category = by_category;

        debug!(total = stats.total, redacted = redact, "aggregate stats computed");
        stats
    }
}
