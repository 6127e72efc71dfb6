mod category;
mod feature;
mod role;
mod scope;

pub use category::Category;
pub use feature::{Attributes, Feature};
pub use role::Role;
pub use scope::{Scope, ALL};
