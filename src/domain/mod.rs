//! Domain layer: aggregates, value objects, events and the access policy.
pub mod aggregates;
pub mod events;
pub mod policy;
pub mod value_objects;
