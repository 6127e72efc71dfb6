use std::{
    collections::{BTreeMap, HashSet},
    sync::{atomic::{AtomicU64, AtomicUsize, Ordering}, Arc},
};

use futures::stream::{FuturesUnordered, StreamExt};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::{
    config::EngineConfig,
    error::SourceFetchError,
    io::{DefaultFetcher, FeatureReader, SourceDescriptor, SourceFetcher},
    store::{StoreSnapshot, StoreState},
    types::Feature,
};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadOptions {
    /// Re-fetch every source even if the store is already ready.
    pub force_refresh: bool,
}

impl LoadOptions {
    pub fn refresh() -> Self { Self { force_refresh: true } }
}

/// Result of a `load` call that did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    /// All sources resolved and a new snapshot was published.
    Ready,
    /// The store was already ready and no refresh was requested.
    AlreadyReady,
    /// A newer load was requested while this one was in flight; its result was discarded.
    Superseded,
}

/// Loads and caches feature collections, publishing immutable snapshots.
///
/// Sources are fetched concurrently; consumers only ever observe complete
/// snapshots, either through `snapshot()` or a `subscribe()` receiver.
pub struct FeatureStore<F: SourceFetcher = DefaultFetcher> {
    fetcher: F,
    config: Arc<EngineConfig>,
    latest: watch::Sender<Arc<StoreSnapshot>>,
    requested: AtomicU64, // generation of the most recently requested fetch
    in_flight: AtomicUsize,
}

/// Decrements the in-flight counter even if the load future is dropped mid-way.
struct InFlight<'a>(&'a AtomicUsize);

impl<'a> InFlight<'a> {
    fn enter(counter: &'a AtomicUsize) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(counter)
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) { self.0.fetch_sub(1, Ordering::SeqCst); }
}

impl FeatureStore<DefaultFetcher> {
    pub fn new(config: impl Into<Arc<EngineConfig>>) -> Self {
        Self::with_fetcher(DefaultFetcher::new(), config)
    }
}

impl<F: SourceFetcher> FeatureStore<F> {
    pub fn with_fetcher(fetcher: F, config: impl Into<Arc<EngineConfig>>) -> Self {
        let (latest, _) = watch::channel(Arc::new(StoreSnapshot::default()));
        Self {
            fetcher,
            config: config.into(),
            latest,
            requested: AtomicU64::new(0),
            in_flight: AtomicUsize::new(0),
        }
    }

    #[inline] pub fn config(&self) -> &EngineConfig { &self.config }

    #[inline] pub fn shared_config(&self) -> Arc<EngineConfig> { self.config.clone() }

    /// The current published snapshot.
    #[inline] pub fn snapshot(&self) -> Arc<StoreSnapshot> { self.latest.borrow().clone() }

    /// Receiver notified each time a new snapshot is published.
    #[inline] pub fn subscribe(&self) -> watch::Receiver<Arc<StoreSnapshot>> { self.latest.subscribe() }

    #[inline] pub fn state(&self) -> StoreState { self.latest.borrow().state().clone() }

    /// Whether any load is still awaiting its sources.
    #[inline] pub fn is_loading(&self) -> bool { self.in_flight.load(Ordering::SeqCst) > 0 }

    /// Features of a collection in the current snapshot; empty if unknown or not loaded.
    pub fn features_of(&self, collection: &str) -> Arc<[Feature]> {
        self.latest.borrow().shared_features_of(collection)
    }

    /// Fetch every source concurrently and publish one snapshot once all have settled.
    ///
    /// A no-op when already `Ready`, unless `options.force_refresh` is set.
    /// If any source fails, the store becomes `Failed` with the first error
    /// encountered and exposes no data. If a newer load is requested while
    /// this one is in flight, this one's result is discarded on arrival.
    pub async fn load(&self, sources: &[SourceDescriptor], options: LoadOptions) -> Result<LoadOutcome, SourceFetchError> {
        if !options.force_refresh && self.latest.borrow().is_ready() {
            debug!("store already ready; skipping load");
            return Ok(LoadOutcome::AlreadyReady);
        }

        let generation = self.requested.fetch_add(1, Ordering::SeqCst) + 1;
        let _guard = InFlight::enter(&self.in_flight);
        info!(generation, sources = sources.len(), force = options.force_refresh, "loading feature sources");

        let result = self.fetch_all(sources).await;

        let snapshot = match &result {
            Ok(collections) => StoreSnapshot::ready(generation, collections.clone()),
            Err(err) => StoreSnapshot::failed(generation, err.clone()),
        };

        // Check-and-publish under the channel lock so a stale result can never overwrite a newer one.
        let published = self.latest.send_if_modified(|current| {
            if self.requested.load(Ordering::SeqCst) != generation { return false }
            *current = Arc::new(snapshot);
            true
        });

        if !published {
            debug!(generation, "discarding superseded load result");
            return Ok(LoadOutcome::Superseded);
        }

        match result {
            Ok(collections) => {
                let total: usize = collections.values().map(|fs| fs.len()).sum();
                info!(generation, collections = collections.len(), features = total, "store ready");
                Ok(LoadOutcome::Ready)
            }
            Err(err) => {
                warn!(generation, collection = %err.collection, reason = %err.reason, "store failed");
                Err(err)
            }
        }
    }

    /// Fan out one fetch+parse per source; each result lands in its own slot.
    async fn fetch_all(&self, sources: &[SourceDescriptor]) -> Result<BTreeMap<String, Arc<[Feature]>>, SourceFetchError> {
        let mut seen = HashSet::new();
        if let Some(dup) = sources.iter().find(|s| !seen.insert(s.name.as_str())) {
            return Err(SourceFetchError {
                collection: dup.name.clone(),
                reason: "duplicate source name".to_string(),
            });
        }

        let mut slots: Vec<Option<Vec<Feature>>> = vec![None; sources.len()];
        let mut first_error: Option<SourceFetchError> = None;

        let mut pending: FuturesUnordered<_> = sources.iter().enumerate()
            .map(|(idx, source)| async move { (idx, self.fetch_one(source).await) })
            .collect();

        // Wait for every source to settle, remembering the first failure in completion order.
        while let Some((idx, result)) = pending.next().await {
            match result {
                Ok(features) => slots[idx] = Some(features),
                Err(err) => {
                    warn!(collection = %sources[idx].name, error = %err, "source failed");
                    first_error.get_or_insert(err);
                }
            }
        }

        if let Some(err) = first_error { return Err(err) }

        Ok(sources.iter().zip(slots)
            .map(|(source, features)| (source.name.clone(), Arc::from(features.unwrap_or_default())))
            .collect())
    }

    async fn fetch_one(&self, source: &SourceDescriptor) -> Result<Vec<Feature>, SourceFetchError> {
        debug!(collection = %source.name, location = %source.location, "fetching source");
        let bytes = self.fetcher.fetch(source).await
            .map_err(|e| SourceFetchError::new(&source.name, &e))?;

        let features = FeatureReader::new(&self.config.attributes, &self.config.category_aliases)
            .with_default_category(source.default_category)
            .read_bytes(&source.name, &bytes)
            .map_err(|e| SourceFetchError::new(&source.name, &e))?;

        debug!(collection = %source.name, features = features.len(), "source parsed");
        Ok(features)
    }
}
