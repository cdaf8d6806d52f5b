#![allow(clippy::module_inception)]

pub mod events;
pub mod organization;
pub mod value_objects;

// Re-export main types for convenience
pub use events::OrganizationEvent;
pub use organization::Organization;
pub use value_objects::{OrganizationStatus, Slug, Website};
