mod snapshot;
mod store;

pub use snapshot::{StoreSnapshot, StoreState};
pub use store::{FeatureStore, LoadOptions, LoadOutcome};
