//! Derived relationship views.
//!
//! # Responsibility
//! - Compute the non-stored one-to-many and many-to-many views
//!   (state→cities, city→places, user→places, place→amenities).
//!
//! # Invariants
//! - Views are computed fresh against the active backend on every
//!   call, never cached, so staged objects are always reflected.

use crate::model::{Amenity, City, Entity, EntityId, EntityKind, Place};
use crate::store::ObjectStore;

/// Cities whose `state_id` points at the given state.
pub fn state_cities<S: ObjectStore + ?Sized>(store: &S, state_id: EntityId) -> Vec<City> {
    store
        .all(EntityKind::City)
        .into_iter()
        .filter_map(|entity| match entity {
            Entity::City(city) if city.state_id == state_id => Some(city),
            _ => None,
        })
        .collect()
}

/// Places whose `city_id` points at the given city.
pub fn city_places<S: ObjectStore + ?Sized>(store: &S, city_id: EntityId) -> Vec<Place> {
    store
        .all(EntityKind::Place)
        .into_iter()
        .filter_map(|entity| match entity {
            Entity::Place(place) if place.city_id == city_id => Some(place),
            _ => None,
        })
        .collect()
}

/// Places owned by the given user.
pub fn user_places<S: ObjectStore + ?Sized>(store: &S, user_id: EntityId) -> Vec<Place> {
    store
        .all(EntityKind::Place)
        .into_iter()
        .filter_map(|entity| match entity {
            Entity::Place(place) if place.user_id == user_id => Some(place),
            _ => None,
        })
        .collect()
}

/// Amenities linked to the given place through the association set.
///
/// An unknown place id yields an empty view, matching the never-fails
/// contract of collection reads.
pub fn place_amenities<S: ObjectStore + ?Sized>(store: &S, place_id: EntityId) -> Vec<Amenity> {
    let Some(Entity::Place(place)) = store.get(EntityKind::Place, place_id) else {
        return Vec::new();
    };
    place
        .amenity_ids
        .iter()
        .filter_map(|amenity_id| match store.get(EntityKind::Amenity, *amenity_id) {
            Some(Entity::Amenity(amenity)) => Some(amenity),
            _ => None,
        })
        .collect()
}
