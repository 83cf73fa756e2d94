pub mod child;
pub mod config_map;
pub mod deployment;
pub mod secret;
pub mod tier;

pub use child::{ChildKind, ChildObject, DesiredChildren};
pub use tier::{Tier, TIERS};
