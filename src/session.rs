//! UI-facing façade: one map view over a shared feature store.
//!
//! Data flows store -> {index, stats} -> filter -> compositor, with the
//! analyzers feeding overlay layers back into the compositor.

use std::{collections::BTreeSet, sync::Arc};

use anyhow::Result;
use chrono::{DateTime, Utc};
use tokio::sync::watch;
use tracing::{debug, warn};

use crate::{
    admin::{AdministrativeFilterController, AdministrativeIndex, AdministrativeSelection, TransitionOutcome},
    analysis::{CoverageAnalyzer, CoverageResult, DemandPoint, Frame, HeatmapAggregator, IntensityPoint, Observation},
    config::EngineConfig,
    error::LayerDrawFailure,
    io::SourceFetcher,
    layers::{DrawReport, LayerCompositor, LayerContent, LayerSpec, MapRenderer, ToggleOutcome},
    stats::{AggregateStats, FacilityAggregator},
    store::{FeatureStore, StoreSnapshot},
    types::{Feature, Role, Scope},
};

/// Layer id of the coverage buffer overlay.
pub const COVERAGE_LAYER: &str = "coverage";
/// Layer id of the heatmap overlay.
pub const HEATMAP_LAYER: &str = "heatmap";

pub struct MapSession<R: MapRenderer> {
    config: Arc<EngineConfig>,
    updates: watch::Receiver<Arc<StoreSnapshot>>,
    snapshot: Arc<StoreSnapshot>,
    index: AdministrativeIndex,
    aggregator: FacilityAggregator,
    filter: AdministrativeFilterController,
    compositor: LayerCompositor<R>,
    coverage: CoverageAnalyzer,
    heatmap: HeatmapAggregator,
    role: Role,
    collections: BTreeSet<String>, // layer ids backed by a store collection
    defaults_pending: bool,        // default layers wait for the first ready snapshot
}

impl<R: MapRenderer> MapSession<R> {
    /// Mount a map view: one layer per loaded collection, the configured
    /// default layers drawn, and the default basemap set.
    ///
    /// If the store is not ready yet, the default layers are drawn by the
    /// first `sync` that sees a ready snapshot.
    pub fn mount<F: SourceFetcher>(store: &FeatureStore<F>, renderer: R, role: Role) -> Result<(Self, DrawReport)> {
        let config = store.shared_config();
        let mut updates = store.subscribe();
        let snapshot = updates.borrow_and_update().clone();

        let mut session = Self {
            index: AdministrativeIndex::from_snapshot(&snapshot),
            aggregator: FacilityAggregator::new(&config),
            filter: AdministrativeFilterController::new(),
            compositor: LayerCompositor::new(renderer, config.basemaps.clone()),
            coverage: CoverageAnalyzer::new(config.coverage.clone())?,
            heatmap: HeatmapAggregator::new(config.heatmap.clone())?,
            role,
            snapshot,
            updates,
            config,
            collections: BTreeSet::new(),
            defaults_pending: false,
        };
        session.refresh_layers();

        let mut report = if session.snapshot.is_ready() {
            session.draw_defaults()
        } else {
            debug!("store not ready; default layers deferred");
            session.defaults_pending = true;
            DrawReport::default()
        };
        if let Some(id) = session.config.default_basemap.clone() {
            if let Err(failure) = session.compositor.set_basemap(&id) {
                warn!(layer = %failure.layer, reason = %failure.reason, "default basemap not set");
                report.failed.push(failure);
            }
        }
        Ok((session, report))
    }

    /// Attach demand points used for measured coverage.
    pub fn with_population(mut self, demand: impl Into<Arc<[DemandPoint]>>) -> Self {
        self.coverage = self.coverage.with_population(demand);
        self
    }

    /// Pick up a newly published store snapshot, if any. Returns true if views were rebuilt.
    pub fn sync(&mut self) -> bool {
        if !self.updates.has_changed().unwrap_or(false) { return false }
        self.snapshot = self.updates.borrow_and_update().clone();
        self.index = AdministrativeIndex::from_snapshot(&self.snapshot);
        debug!(generation = self.snapshot.generation(), "session synced to new snapshot");
        self.refresh_layers();
        if self.defaults_pending && self.snapshot.is_ready() {
            self.defaults_pending = false;
            self.draw_defaults();
        }
        true
    }

    #[inline] pub fn config(&self) -> &EngineConfig { &self.config }

    #[inline] pub fn snapshot(&self) -> &StoreSnapshot { &self.snapshot }

    #[inline] pub fn index(&self) -> &AdministrativeIndex { &self.index }

    #[inline] pub fn role(&self) -> Role { self.role }

    #[inline] pub fn compositor(&self) -> &LayerCompositor<R> { &self.compositor }

    #[inline] pub fn renderer(&self) -> &R { self.compositor.renderer() }

    /// Statistics over the whole snapshot.
    pub fn stats(&self) -> AggregateStats {
        self.aggregator.stats(&self.snapshot, self.role)
    }

    /// Statistics over the features matching the current selection.
    pub fn filtered_stats(&self) -> AggregateStats {
        let selection = self.filter.selection();
        self.aggregator.stats_of(self.snapshot.all_features().filter(|f| selection.matches(f)), self.role)
    }

    #[inline] pub fn selection(&self) -> &AdministrativeSelection { self.filter.selection() }

    pub fn filtered_features(&self, collection: &str) -> Vec<&Feature> {
        self.filter.filtered_features(&self.snapshot, collection)
    }

    pub fn set_district(&mut self, district: impl Into<Scope>) -> TransitionOutcome {
        let outcome = self.filter.set_district(district);
        self.after_transition(outcome)
    }

    pub fn set_subdistrict(&mut self, subdistrict: impl Into<Scope>) -> TransitionOutcome {
        let outcome = self.filter.set_subdistrict(subdistrict);
        self.after_transition(outcome)
    }

    pub fn set_block(&mut self, block: impl Into<Scope>) -> TransitionOutcome {
        let outcome = self.filter.set_block(block);
        self.after_transition(outcome)
    }

    pub fn reset_filter(&mut self) {
        self.filter.reset();
        self.refresh_layers();
    }

    pub fn toggle_layer(&mut self, id: &str) -> Result<ToggleOutcome, LayerDrawFailure> {
        self.compositor.toggle(id)
    }

    pub fn set_basemap(&mut self, id: &str) -> Result<(), LayerDrawFailure> {
        self.compositor.set_basemap(id)
    }

    pub fn current_layers(&self) -> Vec<&str> { self.compositor.current_layers() }

    pub fn current_basemap(&self) -> Option<&str> { self.compositor.current_basemap() }

    /// Coverage of the selected facilities at `radius_m`, drawn as the coverage overlay.
    pub fn show_coverage(&mut self, radius_m: f64) -> Result<CoverageResult, LayerDrawFailure> {
        let facilities = self.coverage_facilities();
        let result = self.coverage.analyze(&facilities, radius_m);
        let circles: Arc<[_]> = result.per_facility_buffer.clone().into();
        self.compositor.replace(LayerSpec::new(COVERAGE_LAYER, LayerContent::Circles(circles)))?;
        self.compositor.show(COVERAGE_LAYER)?;
        Ok(result)
    }

    /// Heat buckets for `frame` (limited to the period containing `at`, if given), drawn as the heatmap overlay.
    pub fn show_heatmap(&mut self, observations: &[Observation], frame: Frame, at: Option<DateTime<Utc>>) -> Result<Vec<IntensityPoint>, LayerDrawFailure> {
        let points = match at {
            Some(at) => self.heatmap.bucket_at(observations, frame, at),
            None => self.heatmap.bucket(observations, frame),
        };
        let content = LayerContent::Heat { points: points.clone().into(), scale: self.heatmap.config().clone() };
        self.compositor.replace(LayerSpec::new(HEATMAP_LAYER, content))?;
        self.compositor.show(HEATMAP_LAYER)?;
        Ok(points)
    }

    /// Observations from every selected feature with a timestamp.
    pub fn observations(&self) -> Vec<Observation> {
        let selection = self.filter.selection();
        self.snapshot.all_features()
            .filter(|f| selection.matches(f))
            .filter_map(Observation::from_feature)
            .collect()
    }

    /// Draw a registered layer if it is not already on the map.
    pub fn show_layer(&mut self, id: &str) -> Result<(), LayerDrawFailure> { self.compositor.show(id) }

    /// Take a layer (an analysis overlay or a collection) off the map without touching the others.
    pub fn hide_layer(&mut self, id: &str) -> bool { self.compositor.hide(id) }

    fn coverage_facilities(&self) -> Vec<Feature> {
        let selection = self.filter.selection();
        self.snapshot.all_features()
            .filter(|f| self.config.coverage_categories.contains(&f.category) && selection.matches(f))
            .cloned()
            .collect()
    }

    fn after_transition(&mut self, outcome: TransitionOutcome) -> TransitionOutcome {
        match &outcome {
            TransitionOutcome::Applied { .. } => self.refresh_layers(),
            TransitionOutcome::Ignored(reason) => debug!(%reason, "selection change ignored"),
            TransitionOutcome::Unchanged => {}
        }
        outcome
    }

    fn draw_defaults(&mut self) -> DrawReport {
        let report = self.compositor.draw_batch(self.config.default_layers.as_slice());
        for failure in &report.failed {
            warn!(layer = %failure.layer, reason = %failure.reason, "default layer not drawn");
        }
        report
    }

    /// Re-register every collection layer with the current selection; active ones are redrawn.
    /// Layers of collections missing from the snapshot (a failed or narrower load) are emptied.
    fn refresh_layers(&mut self) {
        let current: BTreeSet<String> = self.snapshot.collection_names().map(str::to_string).collect();
        for name in self.collections.difference(&current) {
            if let Err(failure) = self.compositor.replace(LayerSpec::features(name.as_str(), Vec::<Feature>::new())) {
                warn!(layer = %failure.layer, reason = %failure.reason, "stale layer could not be cleared");
            }
        }
        for name in &current {
            let features = self.filter.filtered_collection(&self.snapshot, name);
            if let Err(failure) = self.compositor.replace(LayerSpec::features(name.as_str(), features)) {
                warn!(layer = %failure.layer, reason = %failure.reason, "layer refresh failed; keeping previous drawing");
            }
        }
        self.collections.extend(current);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        io::SourceDescriptor,
        layers::{BasemapSource, GeoJsonRenderer},
        store::LoadOptions,
        types::Category,
    };

    const BANKS: &str = r#"{
        "type": "FeatureCollection",
        "features": [
            { "type": "Feature", "geometry": { "type": "Point", "coordinates": [110.40, -7.00] },
              "properties": { "kecamatan": "A", "kelurahan": "x", "tanggal": "2024-05-06", "tonase": 4 } },
            { "type": "Feature", "geometry": { "type": "Point", "coordinates": [110.41, -7.01] },
              "properties": { "kecamatan": "A", "kelurahan": "y", "tanggal": "2024-05-07", "tonase": 2 } },
            { "type": "Feature", "geometry": { "type": "Point", "coordinates": [110.50, -7.10] },
              "properties": { "kecamatan": "B", "kelurahan": "z" } }
        ]
    }"#;

    fn config() -> EngineConfig {
        EngineConfig {
            basemaps: vec![BasemapSource::new("osm", "https://t/{z}/{x}/{y}.png", "OSM")],
            default_basemap: Some("osm".into()),
            default_layers: vec!["banks".into()],
            ..Default::default()
        }
    }

    async fn loaded() -> FeatureStore {
        let store = FeatureStore::new(config());
        let sources = [SourceDescriptor::inline("banks", BANKS).with_category(Category::WasteBank)];
        store.load(&sources, LoadOptions::default()).await.unwrap();
        store
    }

    #[tokio::test]
    async fn mounts_defaults() {
        let store = loaded().await;
        let (session, report) = MapSession::mount(&store, GeoJsonRenderer::new(), Role::Public).unwrap();
        assert!(report.is_clean());
        assert_eq!(session.current_layers(), vec!["banks"]);
        assert_eq!(session.current_basemap(), Some("osm"));
        assert_eq!(session.stats().count(Category::WasteBank), 3);
    }

    #[tokio::test]
    async fn selection_redraws_collection_layers() {
        let store = loaded().await;
        let (mut session, _) = MapSession::mount(&store, GeoJsonRenderer::new(), Role::Admin).unwrap();
        assert!(session.set_district("A").is_applied());
        assert_eq!(session.renderer().shape_count(), 2);
        assert_eq!(session.filtered_stats().total, 2);
        assert!(matches!(session.set_block("RT 1"), TransitionOutcome::Ignored(_)));
        session.reset_filter();
        assert_eq!(session.renderer().shape_count(), 3);
    }

    #[tokio::test]
    async fn overlays_are_independent_of_basemap_and_each_other() {
        let store = loaded().await;
        let (mut session, _) = MapSession::mount(&store, GeoJsonRenderer::new(), Role::Admin).unwrap();

        let result = session.show_coverage(50.0).unwrap();
        assert!(result.radius_clamped);
        assert_eq!(result.per_facility_buffer.len(), 3);

        let observations = session.observations();
        assert_eq!(observations.len(), 2);
        let heat = session.show_heatmap(&observations, Frame::Weekly, None).unwrap();
        assert_eq!(heat.iter().map(|p| p.intensity).fold(0.0, f64::max), 1.0);
        assert_eq!(session.current_layers(), vec!["banks", COVERAGE_LAYER, HEATMAP_LAYER]);

        assert!(session.hide_layer(COVERAGE_LAYER));
        assert_eq!(session.current_layers(), vec!["banks", HEATMAP_LAYER]);
        assert_eq!(session.current_basemap(), Some("osm"));
    }

    #[tokio::test]
    async fn sync_picks_up_refresh() {
        let store = loaded().await;
        let (mut session, _) = MapSession::mount(&store, GeoJsonRenderer::new(), Role::Admin).unwrap();
        assert!(!session.sync());

        let one = r#"{ "type": "FeatureCollection", "features": [
            { "type": "Feature", "geometry": { "type": "Point", "coordinates": [110.0, -7.0] },
              "properties": { "kecamatan": "C" } } ] }"#;
        let sources = [SourceDescriptor::inline("banks", one)];
        store.load(&sources, LoadOptions::refresh()).await.unwrap();

        assert!(session.sync());
        assert_eq!(session.index().districts().len(), 1);
        assert_eq!(session.renderer().shape_count(), 1);
    }

    #[tokio::test]
    async fn failed_refresh_clears_collection_layers() {
        let store = loaded().await;
        let (mut session, _) = MapSession::mount(&store, GeoJsonRenderer::new(), Role::Admin).unwrap();
        assert_eq!(session.renderer().shape_count(), 3);

        let broken = [SourceDescriptor::inline("banks", "{ bad")];
        assert!(store.load(&broken, LoadOptions::refresh()).await.is_err());
        assert!(session.sync());
        assert_eq!(session.current_layers(), vec!["banks"]);
        assert_eq!(session.renderer().shape_count(), 0);
        assert_eq!(session.stats().total, 0);

        let sources = [SourceDescriptor::inline("banks", BANKS).with_category(Category::WasteBank)];
        store.load(&sources, LoadOptions::refresh()).await.unwrap();
        assert!(session.sync());
        assert_eq!(session.renderer().shape_count(), 3);
    }

    #[tokio::test]
    async fn narrower_refresh_clears_dropped_collection() {
        let store = loaded().await;
        let (mut session, _) = MapSession::mount(&store, GeoJsonRenderer::new(), Role::Admin).unwrap();

        let other = r#"{ "type": "FeatureCollection", "features": [
            { "type": "Feature", "geometry": { "type": "Point", "coordinates": [110.0, -7.0] }, "properties": {} } ] }"#;
        store.load(&[SourceDescriptor::inline("depots", other)], LoadOptions::refresh()).await.unwrap();

        assert!(session.sync());
        assert_eq!(session.current_layers(), vec!["banks"]);
        assert_eq!(session.renderer().shape_count(), 0);
    }

    #[tokio::test]
    async fn defaults_drawn_once_store_becomes_ready() {
        let store = FeatureStore::new(config());
        let (mut session, report) = MapSession::mount(&store, GeoJsonRenderer::new(), Role::Public).unwrap();
        assert!(report.is_clean());
        assert!(session.current_layers().is_empty());
        assert_eq!(session.current_basemap(), Some("osm"));

        let sources = [SourceDescriptor::inline("banks", BANKS).with_category(Category::WasteBank)];
        store.load(&sources, LoadOptions::default()).await.unwrap();
        assert!(session.sync());
        assert_eq!(session.current_layers(), vec!["banks"]);
        assert_eq!(session.renderer().shape_count(), 3);
        assert!(!session.sync());
    }
}
