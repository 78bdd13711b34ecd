//! Catalog domain model.
//!
//! # Responsibility
//! - Define the five entity kinds and their typed attribute sets.
//! - Own identity, timestamp and validation rules shared by all kinds.
//!
//! # Invariants
//! - `id` is generated once and never reused across any entity kind.
//! - `created_at` is set once; `updated_at` moves strictly forward.
//! - Schema is strict: unknown attribute keys are a validation error.

pub mod amenity;
pub mod city;
pub mod entity;
pub mod kind;
pub mod place;
pub mod state;
pub mod user;

pub use amenity::Amenity;
pub use city::City;
pub use entity::{Entity, EntityId, ValidationError};
pub use kind::EntityKind;
pub use place::Place;
pub use state::State;
pub use user::User;
