//! Administrative hierarchy (district > subdistrict > block).
//!
//! - `index` - selectable names at each level, derived from a store snapshot
//! - `filter` - the cascading selection state machine and feature filtering

mod filter;
mod index;

pub use filter::{AdministrativeFilterController, AdministrativeSelection, TransitionOutcome};
pub use index::{collate, AdministrativeIndex};
