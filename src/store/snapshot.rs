use std::{collections::BTreeMap, sync::Arc};

use crate::{error::SourceFetchError, types::Feature};

/// Overall store state as seen by consumers.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum StoreState {
    #[default]
    Idle,                     // Nothing loaded yet
    Ready,                    // Every source resolved
    Failed(SourceFetchError), // First error encountered; no data exposed
}

impl StoreState {
    #[inline] pub fn is_ready(&self) -> bool { matches!(self, StoreState::Ready) }

    #[inline] pub fn is_failed(&self) -> bool { matches!(self, StoreState::Failed(_)) }
}

/// An immutable, fully assembled view of every loaded collection.
/// A new snapshot replaces the old one atomically; nothing is patched in place.
#[derive(Debug, Clone, Default)]
pub struct StoreSnapshot {
    generation: u64,
    state: StoreState,
    collections: BTreeMap<String, Arc<[Feature]>>,
}

impl StoreSnapshot {
    pub(crate) fn ready(generation: u64, collections: BTreeMap<String, Arc<[Feature]>>) -> Self {
        Self { generation, state: StoreState::Ready, collections }
    }

    pub(crate) fn failed(generation: u64, error: SourceFetchError) -> Self {
        Self { generation, state: StoreState::Failed(error), collections: BTreeMap::new() }
    }

    /// Build a ready snapshot directly from in-memory collections.
    pub fn from_collections<I, S>(collections: I) -> Self
    where
        I: IntoIterator<Item = (S, Vec<Feature>)>,
        S: Into<String>,
    {
        Self::ready(0, collections.into_iter().map(|(name, fs)| (name.into(), Arc::from(fs))).collect())
    }

    /// Load request this snapshot answers (0 for the initial/in-memory snapshot).
    #[inline] pub fn generation(&self) -> u64 { self.generation }

    #[inline] pub fn state(&self) -> &StoreState { &self.state }

    #[inline] pub fn is_ready(&self) -> bool { self.state.is_ready() }

    /// Features of a collection; empty if the collection is unknown or not loaded.
    pub fn features_of(&self, collection: &str) -> &[Feature] {
        self.collections.get(collection).map(|fs| &fs[..]).unwrap_or(&[])
    }

    /// Shared handle to a collection's features (cheap to clone across layers).
    pub fn shared_features_of(&self, collection: &str) -> Arc<[Feature]> {
        self.collections.get(collection).cloned().unwrap_or_else(|| Arc::from(Vec::new()))
    }

    /// Names of the loaded collections, sorted.
    pub fn collection_names(&self) -> impl Iterator<Item = &str> {
        self.collections.keys().map(String::as_str)
    }

    /// Every feature across all collections.
    pub fn all_features(&self) -> impl Iterator<Item = &Feature> {
        self.collections.values().flat_map(|fs| fs.iter())
    }

    /// Total number of features across all collections.
    pub fn len(&self) -> usize { self.collections.values().map(|fs| fs.len()).sum() }

    pub fn is_empty(&self) -> bool { self.len() == 0 }
}
