//! Domain model: value objects, aggregates and the events workflows emit.
pub mod aggregates;
pub mod events;
pub mod value_objects;
